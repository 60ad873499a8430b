//! Advisory static lint pass.
//!
//! Runs after resolution and before execution, and may abort nothing — it
//! only emits `Warning`-category diagnostics, sorted by line:
//!
//! - local variables, parameters, and functions that are never referenced
//! - statements that can never execute (following a `return`, `throw`, or
//!   `exit` in the same block)
//! - locals shadowing a declaration from an enclosing scope

use crate::error::Diagnostic;
use crate::expr::Expr;
use crate::stmt::Stmt;
use crate::token::Token;

/// Lint a resolved program. The result is purely advisory.
pub fn lint(statements: &[Stmt]) -> Vec<Diagnostic> {
    let mut linter = Linter {
        scopes: Vec::new(),
        warnings: Vec::new(),
    };

    linter.check_stmts(statements);

    linter.warnings.sort_by_key(|warning| warning.line);
    linter.warnings
}

struct Declared {
    token: Token,
    used: bool,
}

struct Linter {
    // One entry per lexical scope; the global scope is not tracked, so
    // top-level declarations never warn (a later prompt line may use them).
    scopes: Vec<Vec<Declared>>,
    warnings: Vec<Diagnostic>,
}

impl Linter {
    fn check_stmts(&mut self, statements: &[Stmt]) {
        let mut terminated = false;
        let mut reported = false;

        for stmt in statements {
            if terminated && !reported {
                if let Some(token) = stmt_token(stmt) {
                    self.warn(token, "Unreachable code");
                }
                reported = true;
            }

            self.check_stmt(stmt);

            if terminates(stmt) {
                terminated = true;
            }
        }
    }

    fn check_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expression(expr) | Stmt::Print(expr) => self.check_expr(expr),

            Stmt::Var { name, initializer } => {
                if let Some(init) = initializer {
                    self.check_expr(init);
                }
                self.declare(name);
            }

            Stmt::Block(statements) => {
                self.begin_scope();
                self.check_stmts(statements);
                self.end_scope();
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.check_expr(condition);
                self.check_stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.check_stmt(else_branch);
                }
            }

            Stmt::While {
                condition, body, ..
            } => {
                self.check_expr(condition);
                self.check_stmt(body);
            }

            Stmt::Function(declaration) => {
                self.declare(&declaration.name);
                self.check_function(&declaration.params, &declaration.body);
            }

            Stmt::Return { value, .. } => {
                if let Some(value) = value {
                    self.check_expr(value);
                }
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                self.declare(name);
                if let Some(superclass) = superclass {
                    self.check_expr(superclass);
                }
                for method in methods {
                    self.check_function(&method.params, &method.body);
                }
            }

            Stmt::Throw { value, .. } => self.check_expr(value),

            Stmt::Try {
                body,
                catches,
                finally,
                ..
            } => {
                self.check_stmt(body);

                for clause in catches {
                    self.begin_scope();
                    self.declare(&clause.identifier);
                    self.check_stmt(&clause.body);
                    self.end_scope();
                }

                if let Some(finally) = finally {
                    self.check_stmt(finally);
                }
            }

            Stmt::Exit { code, .. } => {
                if let Some(code) = code {
                    self.check_expr(code);
                }
            }

            Stmt::Import { body, .. } | Stmt::Include { body, .. } => {
                self.check_stmts(body);
            }
        }
    }

    fn check_function(&mut self, params: &[Token], body: &[Stmt]) {
        self.begin_scope();
        for param in params {
            self.declare(param);
        }
        self.check_stmts(body);
        self.end_scope();
    }

    fn check_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal(_) | Expr::This { .. } | Expr::Super { .. } => {}

            Expr::Grouping(inner) => self.check_expr(inner),

            Expr::Unary { right, .. } => self.check_expr(right),

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.check_expr(left);
                self.check_expr(right);
            }

            Expr::Variable { name, .. } => self.mark_used(name),

            Expr::Assign { name, value, .. } => {
                self.mark_used(name);
                self.check_expr(value);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.check_expr(callee);
                for argument in arguments {
                    self.check_expr(argument);
                }
            }

            Expr::Get { object, .. } => self.check_expr(object),

            Expr::Set { object, value, .. } => {
                self.check_expr(object);
                self.check_expr(value);
            }

            Expr::Lambda { params, body, .. } => self.check_function(params, body),
        }
    }

    fn begin_scope(&mut self) {
        self.scopes.push(Vec::new());
    }

    fn end_scope(&mut self) {
        if let Some(scope) = self.scopes.pop() {
            for declared in scope {
                if !declared.used {
                    let message = format!("Unused variable '{}'", declared.token.lexeme);
                    self.warn(&declared.token, message);
                }
            }
        }
    }

    fn declare(&mut self, name: &Token) {
        let shadows = self
            .scopes
            .iter()
            .any(|scope| scope.iter().any(|d| d.token.lexeme == name.lexeme));

        if shadows {
            let message = format!(
                "Variable '{}' shadows an earlier declaration",
                name.lexeme
            );
            self.warn(name, message);
        }

        if let Some(scope) = self.scopes.last_mut() {
            scope.push(Declared {
                token: name.clone(),
                used: false,
            });
        }
    }

    fn mark_used(&mut self, name: &Token) {
        for scope in self.scopes.iter_mut().rev() {
            if let Some(declared) = scope
                .iter_mut()
                .rev()
                .find(|d| d.token.lexeme == name.lexeme)
            {
                declared.used = true;
                return;
            }
        }
    }

    fn warn<S: Into<String>>(&mut self, token: &Token, message: S) {
        self.warnings.push(Diagnostic::new(
            &token.file,
            token.line,
            "Warning",
            "",
            message,
        ));
    }
}

/// Does this statement always transfer control away?
fn terminates(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Return { .. } | Stmt::Throw { .. } | Stmt::Exit { .. } => true,

        Stmt::Block(statements) => statements.iter().any(terminates),

        Stmt::If {
            then_branch,
            else_branch: Some(else_branch),
            ..
        } => terminates(then_branch) && terminates(else_branch),

        _ => false,
    }
}

/// A representative token for locating a statement in a warning.
fn stmt_token(stmt: &Stmt) -> Option<&Token> {
    match stmt {
        Stmt::Expression(expr) | Stmt::Print(expr) => expr_token(expr),
        Stmt::Var { name, .. } => Some(name),
        Stmt::Block(statements) => statements.iter().find_map(stmt_token),
        Stmt::If { condition, .. } => expr_token(condition),
        Stmt::While { keyword, .. } => Some(keyword),
        Stmt::Function(declaration) => Some(&declaration.name),
        Stmt::Return { keyword, .. } => Some(keyword),
        Stmt::Class { name, .. } => Some(name),
        Stmt::Throw { keyword, .. } => Some(keyword),
        Stmt::Try { keyword, .. } => Some(keyword),
        Stmt::Exit { keyword, .. } => Some(keyword),
        Stmt::Import { keyword, .. } | Stmt::Include { keyword, .. } => Some(keyword),
    }
}

fn expr_token(expr: &Expr) -> Option<&Token> {
    match expr {
        Expr::Literal(_) => None,
        Expr::Unary { operator, .. } => Some(operator),
        Expr::Binary { operator, .. } | Expr::Logical { operator, .. } => Some(operator),
        Expr::Grouping(inner) => expr_token(inner),
        Expr::Variable { name, .. } => Some(name),
        Expr::Assign { name, .. } => Some(name),
        Expr::Call { paren, .. } => Some(paren),
        Expr::Get { name, .. } | Expr::Set { name, .. } => Some(name),
        Expr::This { keyword, .. } | Expr::Super { keyword, .. } => Some(keyword),
        Expr::Lambda { keyword, .. } => Some(keyword),
    }
}
