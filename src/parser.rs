/*!
Recursive-descent parser over the scanner's token stream.

Implemented as an `Iterator<Item = Result<Stmt>>`: each `.next()` yields one
top-level declaration or a syntax error. On error the parser `synchronize`s
to the next statement boundary and keeps going, so the host can drain the
stream and report *every* syntax error before giving up.

Grammar (EBNF — condensed)
--------------------------

```text
program        → declaration* EOF ;
declaration    → classDecl | funDecl | varDecl | statement ;
classDecl      → "class" IDENT ( "<" IDENT )? "{" function* "}" ;
funDecl        → "fn" function ;
function       → IDENT "(" parameters? ")" block ;
varDecl        → "var" IDENT ( "=" expression )? ";" ;
statement      → exprStmt | ifStmt | importStmt | includeStmt | forStmt
               | exitStmt | printStmt | returnStmt | throwStmt | tryStmt
               | whileStmt | block ;
importStmt     → "import" STRING ";" ;
includeStmt    → "include" STRING ";" ;
exitStmt       → "exit" expression? ";" ;
throwStmt      → "throw" expression ";" ;
tryStmt        → "try" statement
               ( "catch" "(" IDENT ( "," IDENT )* IDENT ")" statement )*
               ( "finally" statement )? ;
expression     → assignment ;
assignment     → lambda ( "=" assignment )? ;
lambda         → "|" parameters? "|" block | logic_or ;
logic_or       → logic_and ( ( "or" | "|" ) logic_and )* ;
logic_and      → equality  ( ( "and" | "&" ) equality )* ;
equality       → comparison ( ( "!=" | "==" ) comparison )* ;
comparison     → addition ( ( ">" | ">=" | "<" | "<=" ) addition )* ;
addition       → multiplication ( ( "-" | "+" ) multiplication )* ;
multiplication → unary ( ( "/" | "*" ) unary )* ;
unary          → ( "!" | "-" ) unary | call ;
call           → primary ( "(" arguments? ")" | "." IDENT )* ;
primary        → NUMBER | STRING | "true" | "false" | "nil" | "this"
               | "super" "." IDENT | IDENT | "(" expression ")" ;
```

`for` desugars here into `Block`/`While`, so the evaluator never sees it.

`include "path";` and `import "path";` load `<directory>/<path>.lox`
(falling back to the interpreter's `lib/` directory next to the binary),
scan and parse it with a nested parser, and splice the sub-tree into the
statement they produce. An `import` keeps only class and import
declarations from the loaded file; an `include` keeps everything.
Recursive inclusion is detected through a load-in-progress set shared with
nested parsers.
*/

use std::cell::RefCell;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use log::{debug, info};

use crate::error::{LoxError, Result};
use crate::expr::{Expr, ExprId, LiteralValue};
use crate::scanner::Scanner;
use crate::stmt::{CatchClause, FunctionDecl, Stmt};
use crate::token::{Token, TokenType};

/// Parameter and argument ceiling.
const MAX_PARAMETERS: usize = 8;

/// What the surrounding load operation keeps from this token stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    Normal,
    Import,
    Include,
}

/// Top‑level parser over an owned token vector.
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    state: ParseState,

    // Files currently being loaded, shared with nested parsers so cyclic
    // include/import chains surface as syntax errors instead of unbounded
    // recursion.
    loading: Rc<RefCell<HashSet<PathBuf>>>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        info!("Parser created over {} token(s)", tokens.len());

        Self {
            tokens,
            current: 0,
            state: ParseState::Normal,
            loading: Rc::new(RefCell::new(HashSet::new())),
        }
    }

    fn nested(
        tokens: Vec<Token>,
        state: ParseState,
        loading: Rc<RefCell<HashSet<PathBuf>>>,
    ) -> Self {
        Self {
            tokens,
            current: 0,
            state,
            loading,
        }
    }

    /// Parse a single expression — the `evaluate` and `parse` subcommands'
    /// entry point.
    pub fn parse_expression(&mut self) -> Result<Expr> {
        self.expression()
    }

    // ─────────────────────────── declarations ───────────────────────────────

    fn declaration(&mut self) -> Result<Stmt> {
        if self.match_token(&[TokenType::CLASS]) {
            return self.class_declaration();
        }
        if self.match_token(&[TokenType::FUN]) {
            return self.function("function");
        }
        if self.match_token(&[TokenType::VAR]) {
            return self.var_declaration();
        }

        self.statement()
    }

    fn class_declaration(&mut self) -> Result<Stmt> {
        let name = self.consume(&TokenType::IDENTIFIER, "Expected class name")?;

        let superclass = if self.match_token(&[TokenType::LESS]) {
            let superclass = self.consume(&TokenType::IDENTIFIER, "Expected super class name")?;
            Some(Expr::Variable {
                id: ExprId::next(),
                name: superclass,
            })
        } else {
            None
        };

        self.consume(&TokenType::LEFT_BRACE, "Expected '{' before class body")?;

        let mut methods = Vec::new();
        while !self.check(&TokenType::RIGHT_BRACE) && !self.is_at_end() {
            methods.push(Rc::new(self.function_decl("method")?));
        }

        self.consume(&TokenType::RIGHT_BRACE, "Expected '}' after class body")?;

        debug!(
            "Parsed class '{}' with {} method(s)",
            name.lexeme,
            methods.len()
        );

        Ok(Stmt::Class {
            name,
            superclass,
            methods,
        })
    }

    fn function(&mut self, kind: &str) -> Result<Stmt> {
        Ok(Stmt::Function(Rc::new(self.function_decl(kind)?)))
    }

    fn function_decl(&mut self, kind: &str) -> Result<FunctionDecl> {
        let name = self.consume(&TokenType::IDENTIFIER, format!("Expected {} name", kind))?;
        self.consume(
            &TokenType::LEFT_PAREN,
            format!("Expected '(' after {} name", kind),
        )?;

        let params = self.parameter_list()?;

        self.consume(&TokenType::RIGHT_PAREN, "Expected ')' after parameters")?;
        self.consume(
            &TokenType::LEFT_BRACE,
            format!("Expected '{{' before {} body", kind),
        )?;

        let body = self.block_statements()?;

        Ok(FunctionDecl {
            name,
            params,
            body: Rc::new(body),
        })
    }

    fn parameter_list(&mut self) -> Result<Vec<Token>> {
        let mut parameters = Vec::new();

        if !self.check(&TokenType::RIGHT_PAREN) && !self.check(&TokenType::PIPE) {
            loop {
                if parameters.len() >= MAX_PARAMETERS {
                    return Err(LoxError::parse(
                        self.peek(),
                        format!("Cannot have more than {} parameters", MAX_PARAMETERS),
                    ));
                }

                parameters.push(self.consume(&TokenType::IDENTIFIER, "Expected parameter name")?);

                if !self.match_token(&[TokenType::COMMA]) {
                    break;
                }
            }
        }

        Ok(parameters)
    }

    fn var_declaration(&mut self) -> Result<Stmt> {
        let name = self.consume(&TokenType::IDENTIFIER, "Expected variable name")?;

        let initializer = if self.match_token(&[TokenType::EQUAL]) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(
            &TokenType::SEMICOLON,
            "Expected ';' after variable declaration",
        )?;

        Ok(Stmt::Var { name, initializer })
    }

    // ─────────────────────────── statements ─────────────────────────────────

    fn statement(&mut self) -> Result<Stmt> {
        if self.match_token(&[TokenType::IF]) {
            return self.if_statement();
        }
        if self.match_token(&[TokenType::IMPORT]) {
            return self.import_statement();
        }
        if self.match_token(&[TokenType::INCLUDE]) {
            return self.include_statement();
        }
        if self.match_token(&[TokenType::FOR]) {
            return self.for_statement();
        }
        if self.match_token(&[TokenType::EXIT]) {
            return self.exit_statement();
        }
        if self.match_token(&[TokenType::PRINT]) {
            return self.print_statement();
        }
        if self.match_token(&[TokenType::RETURN]) {
            return self.return_statement();
        }
        if self.match_token(&[TokenType::THROW]) {
            return self.throw_statement();
        }
        if self.match_token(&[TokenType::TRY]) {
            return self.try_statement();
        }
        if self.match_token(&[TokenType::WHILE]) {
            return self.while_statement();
        }
        if self.match_token(&[TokenType::LEFT_BRACE]) {
            return Ok(Stmt::Block(self.block_statements()?));
        }

        self.expression_statement()
    }

    fn if_statement(&mut self) -> Result<Stmt> {
        self.consume(&TokenType::LEFT_PAREN, "Expected '(' after 'if'")?;
        let condition = self.expression()?;
        self.consume(&TokenType::RIGHT_PAREN, "Expected ')' after condition")?;

        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.match_token(&[TokenType::ELSE]) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn import_statement(&mut self) -> Result<Stmt> {
        let keyword = self.previous().clone();
        let loc = self.consume_string("Expected a string containing the location of the file to import")?;

        let (file, body) = self.load_module(&keyword, &loc, ParseState::Import)?;

        self.consume(&TokenType::SEMICOLON, "Expected ';' after import statement")?;

        Ok(Stmt::Import {
            keyword,
            file,
            body,
        })
    }

    fn include_statement(&mut self) -> Result<Stmt> {
        let keyword = self.previous().clone();
        let loc = self.consume_string("Expected a string containing the location of the file to include")?;

        let (file, body) = self.load_module(&keyword, &loc, ParseState::Include)?;

        self.consume(&TokenType::SEMICOLON, "Expected ';' after include statement")?;

        Ok(Stmt::Include {
            keyword,
            file,
            body,
        })
    }

    /// `for` desugars to `Block`/`While` — the evaluator has no for-loop.
    fn for_statement(&mut self) -> Result<Stmt> {
        let keyword = self.previous().clone();

        self.consume(&TokenType::LEFT_PAREN, "Expected '(' after 'for'")?;

        let initializer = if self.match_token(&[TokenType::SEMICOLON]) {
            None
        } else if self.match_token(&[TokenType::VAR]) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition = if !self.check(&TokenType::SEMICOLON) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(&TokenType::SEMICOLON, "Expected ';' after loop condition")?;

        let increment = if !self.check(&TokenType::RIGHT_PAREN) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(&TokenType::RIGHT_PAREN, "Expected ')' after for clauses")?;

        let mut body = self.statement()?;

        if let Some(increment) = increment {
            body = Stmt::Block(vec![body, Stmt::Expression(increment)]);
        }

        let condition = condition.unwrap_or(Expr::Literal(LiteralValue::True));
        body = Stmt::While {
            keyword,
            condition,
            body: Box::new(body),
        };

        if let Some(initializer) = initializer {
            body = Stmt::Block(vec![initializer, body]);
        }

        Ok(body)
    }

    fn exit_statement(&mut self) -> Result<Stmt> {
        let keyword = self.previous().clone();

        let code = if !self.check(&TokenType::SEMICOLON) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(&TokenType::SEMICOLON, "Expected ';' after exit statement")?;

        Ok(Stmt::Exit { keyword, code })
    }

    fn print_statement(&mut self) -> Result<Stmt> {
        let value = self.expression()?;
        self.consume(&TokenType::SEMICOLON, "Expected ';' after value")?;
        Ok(Stmt::Print(value))
    }

    fn return_statement(&mut self) -> Result<Stmt> {
        let keyword = self.previous().clone();

        let value = if !self.check(&TokenType::SEMICOLON) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(&TokenType::SEMICOLON, "Expected ';' after return value")?;

        Ok(Stmt::Return { keyword, value })
    }

    fn throw_statement(&mut self) -> Result<Stmt> {
        let keyword = self.previous().clone();
        let value = self.expression()?;

        self.consume(&TokenType::SEMICOLON, "Expected ';' after throw statement")?;

        Ok(Stmt::Throw { keyword, value })
    }

    fn try_statement(&mut self) -> Result<Stmt> {
        let keyword = self.previous().clone();

        let body = Box::new(self.statement()?);

        let mut catches = Vec::new();
        while self.match_token(&[TokenType::CATCH]) {
            let catch_keyword = self.previous().clone();

            self.consume(&TokenType::LEFT_PAREN, "Expected '(' after 'catch'")?;

            // `catch (ErrorA, ErrorB e)` — every identifier but the last
            // names an error class; the last binds the caught error.
            let mut classes = Vec::new();
            classes.push(self.consume(&TokenType::IDENTIFIER, "Expected error class identifier")?);
            while self.match_token(&[TokenType::COMMA]) {
                classes.push(
                    self.consume(&TokenType::IDENTIFIER, "Expected error class identifier")?,
                );
            }
            let identifier = self.consume(&TokenType::IDENTIFIER, "Expected variable identifier")?;

            self.consume(&TokenType::RIGHT_PAREN, "Expected ')' after error identifier")?;

            let body = Box::new(self.statement()?);

            catches.push(CatchClause {
                keyword: catch_keyword,
                classes,
                identifier,
                body,
            });
        }

        let finally = if self.match_token(&[TokenType::FINALLY]) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::Try {
            keyword,
            body,
            catches,
            finally,
        })
    }

    fn while_statement(&mut self) -> Result<Stmt> {
        let keyword = self.previous().clone();

        self.consume(&TokenType::LEFT_PAREN, "Expected '(' after 'while'")?;
        let condition = self.expression()?;
        self.consume(&TokenType::RIGHT_PAREN, "Expected ')' after condition")?;

        let body = Box::new(self.statement()?);

        Ok(Stmt::While {
            keyword,
            condition,
            body,
        })
    }

    fn expression_statement(&mut self) -> Result<Stmt> {
        let expr = self.expression()?;
        self.consume(&TokenType::SEMICOLON, "Expected ';' after value")?;
        Ok(Stmt::Expression(expr))
    }

    fn block_statements(&mut self) -> Result<Vec<Stmt>> {
        let mut statements = Vec::new();

        while !self.check(&TokenType::RIGHT_BRACE) && !self.is_at_end() {
            statements.push(self.declaration()?);
        }

        self.consume(&TokenType::RIGHT_BRACE, "Expected '}' after block")?;
        Ok(statements)
    }

    // ─────────────────────────── module loading ─────────────────────────────

    /// Resolve, read, scan, and parse an included/imported file. Tried
    /// relative to the including file's directory first, then under the
    /// interpreter's library directory.
    fn load_module(
        &mut self,
        keyword: &Token,
        loc: &str,
        state: ParseState,
    ) -> Result<(String, Vec<Stmt>)> {
        let local = Path::new(&*keyword.directory).join(format!("{}.lox", loc));
        let fallback = lib_dir().join(format!("{}.lox", loc));

        for path in [&local, &fallback] {
            match fs::read(path) {
                Ok(bytes) => return self.parse_module(keyword, path, &bytes, state),
                Err(_) => continue,
            }
        }

        Err(LoxError::parse(
            keyword,
            format!("Cannot find '{}'", local.display()),
        ))
    }

    fn parse_module(
        &mut self,
        keyword: &Token,
        path: &Path,
        bytes: &[u8],
        state: ParseState,
    ) -> Result<(String, Vec<Stmt>)> {
        let canonical = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());

        if !self.loading.borrow_mut().insert(canonical.clone()) {
            let what = if state == ParseState::Import {
                "importing"
            } else {
                "inclusion"
            };
            return Err(LoxError::parse(
                keyword,
                format!("Recursive code {} in file '{}'", what, path.display()),
            ));
        }

        info!("Loading module '{}'", path.display());

        let directory = path
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file = path.to_string_lossy().into_owned();

        let result: Result<(String, Vec<Stmt>)> = (|| {
            let mut tokens = Vec::new();
            for item in Scanner::with_origin(bytes, &directory, &file) {
                tokens.push(item?);
            }

            let mut body = Vec::new();
            for stmt in Parser::nested(tokens, state, self.loading.clone()) {
                body.push(stmt?);
            }

            Ok((file.clone(), body))
        })();

        self.loading.borrow_mut().remove(&canonical);

        result
    }

    // ─────────────────────────── expressions ────────────────────────────────

    fn expression(&mut self) -> Result<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr> {
        let expr = self.lambda()?;

        if self.match_token(&[TokenType::EQUAL]) {
            let equals = self.previous().clone();
            let value = Box::new(self.assignment()?);

            return match expr {
                Expr::Variable { name, .. } => Ok(Expr::Assign {
                    id: ExprId::next(),
                    name,
                    value,
                }),

                Expr::Get { object, name } => Ok(Expr::Set {
                    object,
                    name,
                    value,
                }),

                _ => Err(LoxError::parse(&equals, "Invalid assignment target")),
            };
        }

        Ok(expr)
    }

    /// A `|` in prefix position opens a lambda's parameter list; anywhere
    /// else it is the symbolic `or`.
    fn lambda(&mut self) -> Result<Expr> {
        if self.match_token(&[TokenType::PIPE]) {
            let params = self.parameter_list()?;

            self.consume(&TokenType::PIPE, "Expected '|' after lambda parameters")?;

            let keyword = self.consume(&TokenType::LEFT_BRACE, "Expected '{' before lambda body")?;
            let body = self.block_statements()?;

            return Ok(Expr::Lambda {
                keyword,
                params,
                body: Rc::new(body),
            });
        }

        self.or()
    }

    fn or(&mut self) -> Result<Expr> {
        let mut expr = self.and()?;

        while self.match_token(&[TokenType::OR, TokenType::PIPE]) {
            let operator = self.previous().clone();
            let right = self.and()?;
            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn and(&mut self) -> Result<Expr> {
        let mut expr = self.equality()?;

        while self.match_token(&[TokenType::AND, TokenType::AMPERSAND]) {
            let operator = self.previous().clone();
            let right = self.equality()?;
            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn equality(&mut self) -> Result<Expr> {
        let mut expr = self.comparison()?;

        while self.match_token(&[TokenType::BANG_EQUAL, TokenType::EQUAL_EQUAL]) {
            let operator = self.previous().clone();
            let right = self.comparison()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn comparison(&mut self) -> Result<Expr> {
        let mut expr = self.addition()?;

        while self.match_token(&[
            TokenType::GREATER,
            TokenType::GREATER_EQUAL,
            TokenType::LESS,
            TokenType::LESS_EQUAL,
        ]) {
            let operator = self.previous().clone();
            let right = self.addition()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn addition(&mut self) -> Result<Expr> {
        let mut expr = self.multiplication()?;

        while self.match_token(&[TokenType::PLUS, TokenType::MINUS]) {
            let operator = self.previous().clone();
            let right = self.multiplication()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn multiplication(&mut self) -> Result<Expr> {
        let mut expr = self.unary()?;

        while self.match_token(&[TokenType::STAR, TokenType::SLASH]) {
            let operator = self.previous().clone();
            let right = self.unary()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expr> {
        if self.match_token(&[TokenType::BANG, TokenType::MINUS]) {
            let operator = self.previous().clone();
            let right = Box::new(self.unary()?);
            return Ok(Expr::Unary { operator, right });
        }

        self.call()
    }

    fn call(&mut self) -> Result<Expr> {
        let mut expr = self.primary()?;

        loop {
            if self.match_token(&[TokenType::LEFT_PAREN]) {
                expr = self.finish_call(expr)?;
            } else if self.match_token(&[TokenType::DOT]) {
                let name =
                    self.consume(&TokenType::IDENTIFIER, "Expected property name after '.'")?;
                expr = Expr::Get {
                    object: Box::new(expr),
                    name,
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> Result<Expr> {
        let mut arguments = Vec::new();

        if !self.check(&TokenType::RIGHT_PAREN) {
            loop {
                if arguments.len() >= MAX_PARAMETERS {
                    return Err(LoxError::parse(
                        self.peek(),
                        format!("Cannot have more than {} arguments", MAX_PARAMETERS),
                    ));
                }

                arguments.push(self.expression()?);

                if !self.match_token(&[TokenType::COMMA]) {
                    break;
                }
            }
        }

        let paren = self.consume(&TokenType::RIGHT_PAREN, "Expected ')' after arguments")?;

        Ok(Expr::Call {
            callee: Box::new(callee),
            paren,
            arguments,
        })
    }

    fn primary(&mut self) -> Result<Expr> {
        if self.match_token(&[TokenType::NUMBER(0.0)]) {
            let n = match &self.previous().token_type {
                TokenType::NUMBER(n) => *n,
                _ => 0.0,
            };
            return Ok(Expr::Literal(LiteralValue::Number(n)));
        }

        if self.match_token(&[TokenType::STRING(String::new())]) {
            let s = match &self.previous().token_type {
                TokenType::STRING(s) => s.clone(),
                _ => String::new(),
            };
            return Ok(Expr::Literal(LiteralValue::Str(s)));
        }

        if self.match_token(&[TokenType::TRUE]) {
            return Ok(Expr::Literal(LiteralValue::True));
        }
        if self.match_token(&[TokenType::FALSE]) {
            return Ok(Expr::Literal(LiteralValue::False));
        }
        if self.match_token(&[TokenType::NIL]) {
            return Ok(Expr::Literal(LiteralValue::Nil));
        }

        if self.match_token(&[TokenType::THIS]) {
            return Ok(Expr::This {
                id: ExprId::next(),
                keyword: self.previous().clone(),
            });
        }

        if self.match_token(&[TokenType::SUPER]) {
            let keyword = self.previous().clone();
            self.consume(&TokenType::DOT, "Expected '.' after 'super'")?;
            let method =
                self.consume(&TokenType::IDENTIFIER, "Expected superclass method name")?;
            return Ok(Expr::Super {
                id: ExprId::next(),
                keyword,
                method,
            });
        }

        if self.match_token(&[TokenType::IDENTIFIER]) {
            return Ok(Expr::Variable {
                id: ExprId::next(),
                name: self.previous().clone(),
            });
        }

        if self.match_token(&[TokenType::LEFT_PAREN]) {
            let expr = self.expression()?;
            self.consume(&TokenType::RIGHT_PAREN, "Expected ')' after expression")?;
            return Ok(Expr::Grouping(Box::new(expr)));
        }

        Err(LoxError::parse(self.peek(), "Expected expression"))
    }

    // ─────────────────────────── primitives ─────────────────────────────────

    fn match_token(&mut self, types: &[TokenType]) -> bool {
        for token_type in types {
            if self.check(token_type) {
                self.advance();
                return true;
            }
        }

        false
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn consume<S: Into<String>>(&mut self, token_type: &TokenType, message: S) -> Result<Token> {
        if self.check(token_type) {
            return Ok(self.advance().clone());
        }

        Err(LoxError::parse(self.peek(), message))
    }

    /// Consume a string literal token and return its contents.
    fn consume_string<S: Into<String>>(&mut self, message: S) -> Result<String> {
        let token = self.consume(&TokenType::STRING(String::new()), message)?;
        match token.token_type {
            TokenType::STRING(s) => Ok(s),
            _ => Ok(String::new()),
        }
    }

    fn check(&self, token_type: &TokenType) -> bool {
        if self.is_at_end() {
            return false;
        }
        self.peek().token_type == *token_type
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    fn is_at_end(&self) -> bool {
        self.peek().token_type == TokenType::EOF
    }

    /// Discard tokens until the next likely statement boundary so one
    /// syntax error doesn't cascade into dozens.
    fn synchronize(&mut self) {
        self.advance();

        while !self.is_at_end() {
            if self.previous().token_type == TokenType::SEMICOLON {
                return;
            }

            match self.peek().token_type {
                TokenType::CLASS
                | TokenType::FUN
                | TokenType::VAR
                | TokenType::FOR
                | TokenType::IF
                | TokenType::WHILE
                | TokenType::PRINT
                | TokenType::RETURN
                | TokenType::EXIT => return,
                _ => {}
            }

            self.advance();
        }
    }
}

impl Iterator for Parser {
    type Item = Result<Stmt>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.is_at_end() {
            match self.declaration() {
                Ok(stmt) => {
                    // An imported file exposes only its classes and imports.
                    if self.state == ParseState::Import
                        && !matches!(stmt, Stmt::Class { .. } | Stmt::Import { .. })
                    {
                        continue;
                    }

                    return Some(Ok(stmt));
                }

                Err(e) => {
                    debug!("Parse error, synchronizing: {}", e);
                    self.synchronize();
                    return Some(Err(e));
                }
            }
        }

        None
    }
}

/// The interpreter's library directory: `lib/` next to the binary.
fn lib_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("lib")))
        .unwrap_or_else(|| PathBuf::from("lib"))
}
