//! Static resolver pass.
//!
//! One depth‑first walk over the AST does three things:
//! 1. Build lexical scopes (stack of `HashMap<String, bool>` tracking
//!    declared/defined).
//! 2. Report static errors (redeclaration, forward‑read in initializer,
//!    invalid `return`/`this`/`super`) — *all* of them: the walk runs to
//!    completion and any violation suppresses execution entirely.
//! 3. Record, for each variable occurrence, whether it's a local (and at
//!    what depth) or a global — so the interpreter never falls back to a
//!    dynamic lookup that would see a later shadowing local.
//!
//! The distances come back as a read‑only [`Locals`] table keyed by each
//! reference expression's [`ExprId`]; entries absent from the table mean
//! "resolve in the global scope at run time". Resolving the same AST twice
//! produces an identical table.

use std::collections::HashMap;

use log::{debug, info};

use crate::error::LoxError;
use crate::expr::{Expr, ExprId};
use crate::stmt::Stmt;
use crate::token::Token;

/// Variable‑distance table: reference expression → number of enclosing
/// scopes to traverse (0 = current scope).
pub type Locals = HashMap<ExprId, usize>;

/// What kind of function body we are inside. Used to validate `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Initializer,
    Method,
}

/// What kind of class body we are inside. Used to validate `this`/`super`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

/// Resolver: tracks scopes, enforces static rules, and records binding
/// distances (locals vs. globals).
pub struct Resolver {
    scopes: Vec<HashMap<String, bool>>, // false=declared, true=defined
    locals: Locals,
    errors: Vec<LoxError>,
    current_function: FunctionType,
    current_class: ClassType,
}

impl Resolver {
    pub fn new() -> Self {
        info!("Resolver instantiated");

        Resolver {
            scopes: Vec::new(),
            locals: Locals::new(),
            errors: Vec::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
        }
    }

    /// Walk all top‑level statements. On success the distance table comes
    /// back; otherwise every violation found does.
    pub fn resolve(mut self, statements: &[Stmt]) -> Result<Locals, Vec<LoxError>> {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        for stmt in statements {
            self.resolve_stmt(stmt);
        }

        if self.errors.is_empty() {
            Ok(self.locals)
        } else {
            Err(self.errors)
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(statements) => {
                self.begin_scope();
                for s in statements {
                    self.resolve_stmt(s);
                }
                self.end_scope();
            }

            // var declaration: declare → resolve initializer → define.
            // Between declare and define the name is poisoned, which is what
            // rejects `var x = x;` in a local scope.
            Stmt::Var { name, initializer } => {
                self.declare(name);
                if let Some(expr) = initializer {
                    self.resolve_expr(expr);
                }
                self.define(name);
            }

            // function declaration: the name is visible *inside* its own
            // body, enabling recursion.
            Stmt::Function(declaration) => {
                self.declare(&declaration.name);
                self.define(&declaration.name);
                self.resolve_function(&declaration.params, &declaration.body, FunctionType::Function);
            }

            Stmt::Expression(expr) | Stmt::Print(expr) => {
                self.resolve_expr(expr);
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(eb) = else_branch.as_deref() {
                    self.resolve_stmt(eb);
                }
            }

            Stmt::While {
                condition, body, ..
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(body);
            }

            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    self.error(keyword, "Cannot return from top-level code");
                }

                if let Some(expr) = value {
                    if self.current_function == FunctionType::Initializer {
                        self.error(keyword, "Cannot return a value from an initializer");
                    }
                    self.resolve_expr(expr);
                }
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                let enclosing = self.current_class;
                self.current_class = ClassType::Class;

                self.declare(name);

                if let Some(superclass) = superclass {
                    self.current_class = ClassType::Subclass;
                    self.resolve_expr(superclass);
                }

                self.define(name);

                // 'super' scope sits one level outside the 'this' scope —
                // the interpreter relies on that distance offset.
                if superclass.is_some() {
                    self.begin_scope();
                    self.define_name("super");
                }

                self.begin_scope();
                self.define_name("this");

                for method in methods {
                    let declaration = if method.name.lexeme == "init" {
                        FunctionType::Initializer
                    } else {
                        FunctionType::Method
                    };

                    self.resolve_function(&method.params, &method.body, declaration);
                }

                self.end_scope();

                if superclass.is_some() {
                    self.end_scope();
                }

                self.current_class = enclosing;
            }

            Stmt::Throw { value, .. } => {
                self.resolve_expr(value);
            }

            Stmt::Try {
                body,
                catches,
                finally,
                ..
            } => {
                self.resolve_stmt(body);

                for clause in catches {
                    self.begin_scope();
                    self.declare(&clause.identifier);
                    self.define(&clause.identifier);
                    self.resolve_stmt(&clause.body);
                    self.end_scope();
                }

                if let Some(finally) = finally {
                    self.resolve_stmt(finally);
                }
            }

            Stmt::Exit { code, .. } => {
                if let Some(code) = code {
                    self.resolve_expr(code);
                }
            }

            // Spliced sub-trees resolve in place — no scope of their own.
            Stmt::Import { body, .. } | Stmt::Include { body, .. } => {
                for s in body {
                    self.resolve_stmt(s);
                }
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal(_) => {}

            Expr::Grouping(inner) => {
                self.resolve_expr(inner);
            }

            Expr::Unary { right, .. } => {
                self.resolve_expr(right);
            }

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }

            Expr::Variable { id, name } => {
                // Cannot read in own initializer — but only when the name is
                // mid-declaration in the *innermost* scope; a closure may
                // still reference an outer binding of the same name.
                if let Some(scope) = self.scopes.last() {
                    if scope.get(&name.lexeme) == Some(&false) {
                        self.error(name, "Cannot read local variable in its own initializer");
                    }
                }

                self.resolve_local(*id, name);
            }

            Expr::Assign { id, name, value } => {
                // First resolve RHS, then bind LHS.
                self.resolve_expr(value);
                self.resolve_local(*id, name);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);
                for arg in arguments {
                    self.resolve_expr(arg);
                }
            }

            Expr::Get { object, .. } => self.resolve_expr(object),

            Expr::Set { object, value, .. } => {
                self.resolve_expr(object);
                self.resolve_expr(value);
            }

            Expr::This { id, keyword } => {
                if self.current_class == ClassType::None {
                    self.error(keyword, "Cannot use 'this' outside of a class");
                    return;
                }

                self.resolve_local(*id, keyword);
            }

            Expr::Super { id, keyword, .. } => {
                if self.current_class == ClassType::None {
                    self.error(keyword, "Cannot use 'super' outside of a class");
                } else if self.current_class != ClassType::Subclass {
                    self.error(keyword, "Cannot use 'super' in a class without a superclass");
                }

                self.resolve_local(*id, keyword);
            }

            Expr::Lambda { params, body, .. } => {
                self.resolve_function(params, body, FunctionType::Function);
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Function helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Enter a fresh scope for a function's parameters + body.
    fn resolve_function(&mut self, params: &[Token], body: &[Stmt], declaration: FunctionType) {
        let enclosing = self.current_function;
        self.current_function = declaration;

        self.begin_scope();

        for param in params {
            self.declare(param);
            self.define(param);
        }

        for stmt in body {
            self.resolve_stmt(stmt);
        }

        self.end_scope();

        self.current_function = enclosing;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────────

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    #[inline]
    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    /// Mark `name` declared-but-not-defined in the innermost scope. A
    /// duplicate in that exact scope is a violation (shadowing an *outer*
    /// scope is fine). No-op at the global level.
    fn declare(&mut self, name: &Token) {
        if self.scopes.is_empty() {
            return;
        }

        let duplicate = self
            .scopes
            .last()
            .is_some_and(|scope| scope.contains_key(&name.lexeme));

        if duplicate {
            self.error(name, "Variable with this name already declared in this scope");
        }

        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), false);
        }
    }

    /// Flip `name` to defined.
    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), true);
        }
    }

    /// Directly define an implicit binding (`this`/`super`) in the
    /// innermost scope.
    fn define_name(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_owned(), true);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Binding‑distance helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Record this variable occurrence as either a local at some depth, or
    /// a global if no scope contains it.
    fn resolve_local(&mut self, id: ExprId, name: &Token) {
        // 1. check innermost → outermost
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(&name.lexeme) {
                debug!("Resolved '{}' at depth {}", name.lexeme, depth);
                self.locals.insert(id, depth);
                return;
            }
        }

        // 2. not found in any local scope ⇒ global
        debug!("Resolved '{}' as global", name.lexeme);
    }

    fn error<S: Into<String>>(&mut self, token: &Token, message: S) {
        self.errors.push(LoxError::resolve(token, message));
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}
