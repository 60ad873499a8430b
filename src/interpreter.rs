use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;

use log::{debug, info};
use thiserror::Error; // for custom errors

use crate::class::{LoxClass, LoxInstance};
use crate::environment::Environment;
use crate::error::{Diagnostic, LoxError, Result};
use crate::expr::{Expr, ExprId, LiteralValue};
use crate::function::LoxFunction;
use crate::native;
use crate::resolver::Locals;
use crate::stmt::{CatchClause, FunctionDecl, Stmt};
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Ceiling for the explicit call/loop depth counter. Independent of the
/// host's own stack limit, so exhaustion is a language-level fault instead
/// of an uncontrolled crash.
const STACK_LIMIT: usize = 1024;

/// An internal runtime fault: type mismatch, undefined name or property,
/// arity mismatch, stack overflow.
///
/// Stack overflow is the sole fault with `catchable` unset — no `catch`
/// clause rescues it.
#[derive(Debug)]
pub struct Fault {
    pub token: Token,
    pub message: String,
    pub catchable: bool,
}

impl std::fmt::Display for Fault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [line {}]", self.message, self.token.line)
    }
}

/// A user `throw`: the thrown instance plus its stringified `message()`.
#[derive(Debug)]
pub struct Thrown {
    pub instance: Rc<LoxInstance>,
    pub message: String,
    pub token: Token,
}

impl std::fmt::Display for Thrown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.instance.class().name, self.message)
    }
}

/// The non-local control-transfer signals. Each unwinds the evaluation
/// stack through the `Err` channel of [`Exec`] until its own boundary
/// consumes it: `Return` at the nearest call, `Fault`/`Throw` at the
/// nearest matching `try`, `Exit` at the top level only.
///
/// This channel is strictly for control transfer — diagnostics surfacing to
/// the host travel as [`LoxError`], converted only at the top level.
#[derive(Error, Debug)]
pub enum Unwind {
    /// Internal runtime fault.
    #[error("Runtime error: {0}")]
    Fault(Fault),

    /// User-thrown error instance.
    #[error("{0}")]
    Throw(Thrown),

    /// Return signal carrying the function's result.
    #[error("Return signal with value: {0}")]
    Return(Value),

    /// Process-exit request; validated and surfaced by the top level.
    #[error("Exit requested")]
    Exit { keyword: Token, code: Value },
}

impl Unwind {
    /// A catchable runtime fault at `token`.
    pub fn fault<S: Into<String>>(token: &Token, message: S) -> Self {
        Unwind::Fault(Fault {
            token: token.clone(),
            message: message.into(),
            catchable: true,
        })
    }

    /// A fault no `catch` clause can rescue.
    pub fn uncatchable<S: Into<String>>(token: &Token, message: S) -> Self {
        Unwind::Fault(Fault {
            token: token.clone(),
            message: message.into(),
            catchable: false,
        })
    }
}

/// Convenient alias for evaluation results.
pub type Exec<T> = std::result::Result<T, Unwind>;

/// Where `print` and the printing builtins write.
#[derive(Debug, Clone)]
pub enum Sink {
    Stdout,
    Buffer(Rc<RefCell<String>>),
}

impl Sink {
    /// An in-memory sink, for tests and embedders.
    pub fn buffer() -> Self {
        Sink::Buffer(Rc::new(RefCell::new(String::new())))
    }

    pub fn write(&self, text: &str) {
        match self {
            Sink::Stdout => {
                print!("{}", text);
                let _ = std::io::stdout().flush();
            }
            Sink::Buffer(buffer) => buffer.borrow_mut().push_str(text),
        }
    }

    /// Everything written so far (empty for the stdout sink).
    pub fn contents(&self) -> String {
        match self {
            Sink::Stdout => String::new(),
            Sink::Buffer(buffer) => buffer.borrow().clone(),
        }
    }
}

/// How a program run ended when no diagnostic was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Every statement executed.
    Finished,

    /// An `exit` statement requested this process exit code.
    Exit(i32),
}

pub struct Interpreter {
    globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,
    locals: HashMap<ExprId, usize>,
    stack_size: usize,
    sink: Sink,
}

impl Interpreter {
    /// An interpreter writing to stdout, with the standard prelude seeded
    /// into its global frame.
    pub fn new() -> Self {
        Self::with_prelude(native::prelude(), Sink::Stdout)
    }

    /// Same prelude, custom output sink.
    pub fn with_sink(sink: Sink) -> Self {
        Self::with_prelude(native::prelude(), sink)
    }

    /// Construction-time seeding: the host hands over the builtins and base
    /// error class the global frame starts with.
    pub fn with_prelude(prelude: Vec<(String, Value)>, sink: Sink) -> Self {
        info!("Initializing Interpreter with {} builtins", prelude.len());

        let globals = Rc::new(RefCell::new(Environment::new()));

        for (name, value) in prelude {
            debug!("Seeding global '{}'", name);
            globals.borrow_mut().define(&name, value);
        }

        Self {
            environment: globals.clone(),
            globals,
            locals: HashMap::new(),
            stack_size: 0,
            sink,
        }
    }

    /// Interprets a list of statements (a "program") under the given
    /// variable-distance table.
    ///
    /// Distances accumulate across calls, so a prompt session can keep one
    /// interpreter and feed it line after line.
    pub fn interpret(&mut self, statements: &[Stmt], locals: Locals) -> Result<Completion> {
        debug!(
            "Interpreting {} statement(s) with {} resolved local(s)",
            statements.len(),
            locals.len()
        );

        self.locals.extend(locals);

        for stmt in statements {
            if let Err(unwind) = self.execute(stmt) {
                return match unwind {
                    Unwind::Exit { keyword, code } => Self::exit_completion(&keyword, code),
                    other => Err(Self::diagnose(other)),
                };
            }
        }

        info!("Interpretation completed successfully");

        Ok(Completion::Finished)
    }

    /// Convert an escaped signal into the host-facing diagnostic error.
    pub fn diagnose(unwind: Unwind) -> LoxError {
        match unwind {
            Unwind::Fault(fault) => LoxError::runtime(&fault.token, fault.message),

            Unwind::Throw(thrown) => LoxError::thrown(
                &thrown.instance.class().name,
                &thrown.token,
                thrown.message,
            ),

            Unwind::Return(_) => LoxError::Runtime(Diagnostic::new(
                "",
                0,
                "RuntimeError",
                "",
                "Unexpected 'return' outside of a function",
            )),

            Unwind::Exit { keyword, .. } => LoxError::runtime(&keyword, "Unexpected 'exit'"),
        }
    }

    /// Validate an exit request's code: must be an integral number.
    fn exit_completion(keyword: &Token, code: Value) -> Result<Completion> {
        match code {
            Value::Number(n) if n.fract() == 0.0 => {
                info!("Exit requested with code {}", n);
                Ok(Completion::Exit(n as i32))
            }

            Value::Number(_) => Err(LoxError::runtime(keyword, "Exit code must be an integer")),

            other => Err(LoxError::runtime(
                keyword,
                format!("Invalid exit code '{}'", other),
            )),
        }
    }

    // ───────────────────────── statement execution ──────────────────────────

    /// Executes a single statement.
    pub fn execute(&mut self, stmt: &Stmt) -> Exec<()> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(())
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                let text = self.stringify(&value)?;
                debug!("Printing value: {}", text);
                self.sink.write(&text);
                Ok(())
            }

            Stmt::Var { name, initializer } => {
                // A first-time global `var x = x;` reads nil, not an
                // undefined-variable fault; redefinitions see the old value.
                if initializer.is_some()
                    && Rc::ptr_eq(&self.environment, &self.globals)
                    && !self.globals.borrow().has(&name.lexeme)
                {
                    self.globals.borrow_mut().define(&name.lexeme, Value::Nil);
                }

                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                debug!("Defining variable '{}'", name.lexeme);
                self.environment.borrow_mut().define(&name.lexeme, value);
                Ok(())
            }

            Stmt::Block(statements) => {
                let environment = Environment::with_enclosing(self.environment.clone());
                self.execute_block(statements, Rc::new(RefCell::new(environment)))
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if is_truthy(&self.evaluate(condition)?) {
                    self.execute(then_branch)
                } else if let Some(else_stmt) = else_branch {
                    self.execute(else_stmt)
                } else {
                    Ok(())
                }
            }

            Stmt::While {
                keyword,
                condition,
                body,
            } => {
                // Loop entry and every iteration count against the depth
                // ceiling; pathological recursion-via-loop faults the same
                // way runaway calls do.
                let frame = self.push_frame(keyword)?;
                let result = self.run_while(keyword, condition, body);
                self.stack_size = frame;
                result
            }

            Stmt::Function(declaration) => {
                debug!("Defining function '{}'", declaration.name.lexeme);
                // Capture the current environment as the closure.
                let function = LoxFunction::from_decl(declaration, self.environment.clone(), false);
                self.environment
                    .borrow_mut()
                    .define(&declaration.name.lexeme, Value::Function(Rc::new(function)));
                Ok(())
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                debug!("Returning value: {}", value);
                Err(Unwind::Return(value))
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.execute_class(name, superclass.as_ref(), methods),

            Stmt::Throw { keyword, value } => self.execute_throw(keyword, value),

            Stmt::Try {
                body,
                catches,
                finally,
                ..
            } => self.execute_try(body, catches, finally.as_deref()),

            Stmt::Exit { keyword, code } => {
                let code = match code {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Number(0.0),
                };
                Err(Unwind::Exit {
                    keyword: keyword.clone(),
                    code,
                })
            }

            // Already spliced in by the parser; both run in the current
            // scope (import was filtered to class/import declarations there).
            Stmt::Import { body, .. } | Stmt::Include { body, .. } => {
                for statement in body {
                    self.execute(statement)?;
                }
                Ok(())
            }
        }
    }

    /// Execute `statements` inside `environment`, restoring the previous
    /// environment on every exit path.
    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: Rc<RefCell<Environment>>,
    ) -> Exec<()> {
        debug!("Entering block with {} statement(s)", statements.len());

        let previous = std::mem::replace(&mut self.environment, environment);

        let mut result = Ok(());
        for statement in statements {
            result = self.execute(statement);
            if result.is_err() {
                break;
            }
        }

        self.environment = previous;
        result
    }

    fn run_while(&mut self, keyword: &Token, condition: &Expr, body: &Stmt) -> Exec<()> {
        while is_truthy(&self.evaluate(condition)?) {
            self.push_frame(keyword)?;
            self.execute(body)?;
        }
        Ok(())
    }

    fn execute_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
    ) -> Exec<()> {
        debug!("Declaring class '{}'", name.lexeme);

        let superclass_value: Option<Rc<LoxClass>> = match superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Class(class) => Some(class),
                _ => {
                    let at = match expr {
                        Expr::Variable { name, .. } => name,
                        _ => name,
                    };
                    return Err(Unwind::fault(at, "Superclass must be a class"));
                }
            },
            None => None,
        };

        self.environment.borrow_mut().define(&name.lexeme, Value::Nil);

        // A subclass's methods close over a frame binding 'super'; the
        // resolver opened the matching scope one level outside 'this'.
        let defining = match &superclass_value {
            Some(class) => {
                let mut environment = Environment::with_enclosing(self.environment.clone());
                environment.define("super", Value::Class(class.clone()));
                Rc::new(RefCell::new(environment))
            }
            None => self.environment.clone(),
        };

        let mut table: HashMap<String, Rc<LoxFunction>> = HashMap::new();
        for method in methods {
            let is_initializer = method.name.lexeme == "init";
            let function = LoxFunction::from_decl(method, defining.clone(), is_initializer);
            table.insert(method.name.lexeme.clone(), Rc::new(function));
        }

        let class = LoxClass::new(&name.lexeme, superclass_value, table);
        self.environment
            .borrow_mut()
            .assign(name, Value::Class(Rc::new(class)))?;

        Ok(())
    }

    fn execute_throw(&mut self, keyword: &Token, value: &Expr) -> Exec<()> {
        let thrown = self.evaluate(value)?;

        let instance = match &thrown {
            Value::Instance(instance) if instance.class().inherits("RuntimeError") => {
                instance.clone()
            }
            _ => {
                return Err(Unwind::uncatchable(
                    keyword,
                    "Only objects extending 'RuntimeError' can be thrown",
                ));
            }
        };

        // Anything extending the base error class answers message().
        let message =
            LoxInstance::get(&instance, &Token::synthetic(TokenType::IDENTIFIER, "message"))?;
        let message = self.call_value(&message, keyword, &[])?;
        let message = self.stringify(&message)?;

        debug!("Throwing {} with message {:?}", instance.class().name, message);

        Err(Unwind::Throw(Thrown {
            instance,
            message,
            token: keyword.clone(),
        }))
    }

    fn execute_try(
        &mut self,
        body: &Stmt,
        catches: &[CatchClause],
        finally: Option<&Stmt>,
    ) -> Exec<()> {
        let result = self.execute(body);

        let result = match result {
            Err(Unwind::Fault(fault)) if fault.catchable => self.rescue_fault(catches, fault),
            Err(Unwind::Throw(thrown)) => self.rescue_throw(catches, thrown),
            other => other,
        };

        // Runs on every exit path — success, rescue, propagation, and an
        // in-flight return/throw/exit. A signal raised here supersedes the
        // one in flight.
        if let Some(finally) = finally {
            self.execute(finally)?;
        }

        result
    }

    fn rescue_fault(&mut self, catches: &[CatchClause], fault: Fault) -> Exec<()> {
        for clause in catches {
            let matches = clause.classes.iter().any(|class| {
                class.lexeme == "RuntimeError" || class.lexeme == "InterpreterRuntimeError"
            });

            if matches {
                debug!("Fault rescued: {}", fault.message);
                let bound = self.fault_instance(&fault);
                return self.run_catch(clause, bound);
            }
        }

        Err(Unwind::Fault(fault))
    }

    fn rescue_throw(&mut self, catches: &[CatchClause], thrown: Thrown) -> Exec<()> {
        for clause in catches {
            let matches = clause.classes.iter().any(|class| {
                class.lexeme == "RuntimeError" || thrown.instance.class().inherits(&class.lexeme)
            });

            if matches {
                debug!("Throw rescued: {}", thrown.message);
                let bound = Value::Instance(thrown.instance.clone());
                return self.run_catch(clause, bound);
            }
        }

        Err(Unwind::Throw(thrown))
    }

    /// Run a catch body with the error bound under the clause's identifier
    /// in a fresh scope.
    fn run_catch(&mut self, clause: &CatchClause, bound: Value) -> Exec<()> {
        let mut environment = Environment::with_enclosing(self.environment.clone());
        environment.define(&clause.identifier.lexeme, bound);

        let previous = std::mem::replace(&mut self.environment, Rc::new(RefCell::new(environment)));
        let result = self.execute(&clause.body);
        self.environment = previous;
        result
    }

    /// A synthetic instance exposing `message()`/`getType()` so catch bodies
    /// see one protocol for built-in and user-defined errors alike.
    fn fault_instance(&mut self, fault: &Fault) -> Value {
        let base = self
            .globals
            .borrow()
            .get(&Token::synthetic(TokenType::IDENTIFIER, "RuntimeError"))
            .ok()
            .and_then(|value| match value {
                Value::Class(class) => Some(class),
                _ => None,
            });

        let class = native::fault_class(base, &fault.message);
        Value::Instance(Rc::new(LoxInstance::new(class)))
    }

    // ───────────────────────── expression evaluation ────────────────────────

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr) -> Exec<Value> {
        let value = match expr {
            Expr::Literal(literal) => literal_value(literal),

            Expr::Unary { operator, right } => self.evaluate_unary(operator, right)?,

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right)?,

            Expr::Logical {
                left,
                operator,
                right,
            } => self.evaluate_logical(left, operator, right)?,

            Expr::Grouping(inner) => self.evaluate(inner)?,

            Expr::Variable { id, name } => self.look_up_variable(name, *id)?,

            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;
                debug!("Assigning {} to '{}'", value, name.lexeme);
                match self.locals.get(id) {
                    Some(&distance) => {
                        Environment::assign_at(&self.environment, distance, name, value.clone());
                    }
                    None => self.globals.borrow_mut().assign(name, value.clone())?,
                }
                value
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let frame = self.push_frame(paren)?;
                let result = self.run_call(callee, paren, arguments);
                self.stack_size = frame;
                result?
            }

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => LoxInstance::get(&instance, name)?,
                _ => return Err(Unwind::fault(name, "Only instances can have properties")),
            },

            Expr::Set {
                object,
                name,
                value,
            } => {
                let Value::Instance(instance) = self.evaluate(object)? else {
                    return Err(Unwind::fault(name, "Only instances have fields"));
                };
                let value = self.evaluate(value)?;
                instance.set(name, value.clone());
                value
            }

            Expr::This { id, keyword } => self.look_up_variable(keyword, *id)?,

            Expr::Super {
                id,
                keyword,
                method,
            } => self.evaluate_super(*id, keyword, method)?,

            Expr::Lambda { params, body, .. } => Value::Function(Rc::new(LoxFunction::lambda(
                params.clone(),
                body.clone(),
                self.environment.clone(),
            ))),
        };

        Ok(value)
    }

    /// Evaluates a unary expression.
    fn evaluate_unary(&mut self, operator: &Token, expr: &Expr) -> Exec<Value> {
        let right = self.evaluate(expr)?;

        match operator.token_type {
            TokenType::MINUS => match right {
                Value::Number(n) => Ok(Value::Number(-n)),
                _ => Err(Unwind::fault(operator, "Operand must be a number")),
            },

            TokenType::BANG => Ok(Value::Bool(!is_truthy(&right))),

            _ => Err(Unwind::fault(operator, "Invalid unary operator")),
        }
    }

    /// Evaluates a binary expression. Both operands evaluate before the
    /// operator applies.
    fn evaluate_binary(&mut self, left: &Expr, operator: &Token, right: &Expr) -> Exec<Value> {
        let left = self.evaluate(left)?;
        let right = self.evaluate(right)?;

        match operator.token_type {
            TokenType::EQUAL_EQUAL => Ok(Value::Bool(self.is_equal(&left, &right)?)),

            TokenType::BANG_EQUAL => Ok(Value::Bool(!self.is_equal(&left, &right)?)),

            // '+' also concatenates whenever either operand is a string.
            TokenType::PLUS => match (&left, &right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::String(_), _) | (_, Value::String(_)) => {
                    let mut text = self.stringify(&left)?;
                    text.push_str(&self.stringify(&right)?);
                    Ok(Value::String(text))
                }
                _ => Err(Unwind::fault(
                    operator,
                    "Operands must be two numbers or two strings",
                )),
            },

            TokenType::MINUS => {
                let (a, b) = Self::number_operands(operator, &left, &right)?;
                Ok(Value::Number(a - b))
            }

            TokenType::STAR => {
                let (a, b) = Self::number_operands(operator, &left, &right)?;
                Ok(Value::Number(a * b))
            }

            // IEEE semantics: dividing by zero yields an infinity.
            TokenType::SLASH => {
                let (a, b) = Self::number_operands(operator, &left, &right)?;
                Ok(Value::Number(a / b))
            }

            TokenType::GREATER => {
                let (a, b) = Self::number_operands(operator, &left, &right)?;
                Ok(Value::Bool(a > b))
            }

            TokenType::GREATER_EQUAL => {
                let (a, b) = Self::number_operands(operator, &left, &right)?;
                Ok(Value::Bool(a >= b))
            }

            TokenType::LESS => {
                let (a, b) = Self::number_operands(operator, &left, &right)?;
                Ok(Value::Bool(a < b))
            }

            TokenType::LESS_EQUAL => {
                let (a, b) = Self::number_operands(operator, &left, &right)?;
                Ok(Value::Bool(a <= b))
            }

            _ => Err(Unwind::fault(operator, "Invalid binary operator")),
        }
    }

    /// Short-circuiting `and`/`&` and `or`/`|`.
    fn evaluate_logical(&mut self, left: &Expr, operator: &Token, right: &Expr) -> Exec<Value> {
        let left = self.evaluate(left)?;

        let or_class = matches!(operator.token_type, TokenType::OR | TokenType::PIPE);

        if or_class {
            if is_truthy(&left) {
                return Ok(left);
            }
        } else if !is_truthy(&left) {
            return Ok(left);
        }

        self.evaluate(right)
    }

    fn number_operands(operator: &Token, left: &Value, right: &Value) -> Exec<(f64, f64)> {
        match (left, right) {
            (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
            _ => Err(Unwind::fault(operator, "Operands must be a number")),
        }
    }

    fn run_call(&mut self, callee: &Expr, paren: &Token, arguments: &[Expr]) -> Exec<Value> {
        let callee = self.evaluate(callee)?;

        let mut values = Vec::with_capacity(arguments.len());
        for argument in arguments {
            values.push(self.evaluate(argument)?);
        }

        self.call_value(&callee, paren, &values)
    }

    /// Invoke any callable value with an exact-arity check.
    pub fn call_value(&mut self, callee: &Value, paren: &Token, arguments: &[Value]) -> Exec<Value> {
        match callee {
            Value::Native(native) => {
                Self::check_arity(paren, native.arity, arguments.len())?;
                debug!("Calling native function '{}'", native.name);
                (native.func)(self, arguments)
            }

            Value::Function(function) => {
                Self::check_arity(paren, function.arity(), arguments.len())?;
                function.call(self, arguments)
            }

            Value::Class(class) => {
                Self::check_arity(paren, class.arity(), arguments.len())?;
                LoxClass::construct(class, self, arguments)
            }

            _ => Err(Unwind::fault(paren, "Can only call functions and classes")),
        }
    }

    fn check_arity(paren: &Token, arity: usize, got: usize) -> Exec<()> {
        if got != arity {
            return Err(Unwind::fault(
                paren,
                format!("Expected {} arguments but got {}", arity, got),
            ));
        }
        Ok(())
    }

    fn evaluate_super(&mut self, id: ExprId, keyword: &Token, method: &Token) -> Exec<Value> {
        let distance = match self.locals.get(&id) {
            Some(&distance) => distance,
            None => return Err(Unwind::fault(keyword, "Cannot use 'super' outside of a class")),
        };

        let superclass = match Environment::get_super_at(&self.environment, distance) {
            Some(Value::Class(class)) => class,
            _ => {
                return Err(Unwind::fault(
                    keyword,
                    "Cannot use 'super' in a class without a superclass",
                ));
            }
        };

        // 'this' always sits one frame nearer than 'super'.
        let object = match Environment::get_this_at(&self.environment, distance.saturating_sub(1)) {
            Some(Value::Instance(instance)) => instance,
            _ => return Err(Unwind::fault(keyword, "Cannot use 'super' outside of a method")),
        };

        match superclass.find_method(&object, &method.lexeme) {
            Some(found) => Ok(Value::Function(found)),
            None => Err(Unwind::fault(
                method,
                format!("Undefined property '{}'", method.lexeme),
            )),
        }
    }

    /// Read through the distance table when the resolver proved the
    /// binding's frame; fall back to the global scope otherwise.
    fn look_up_variable(&self, name: &Token, id: ExprId) -> Exec<Value> {
        match self.locals.get(&id) {
            Some(&distance) => Environment::get_at(&self.environment, distance, name),
            None => self.globals.borrow().get(name),
        }
    }

    // ───────────────────────── dynamic-semantics hooks ──────────────────────

    /// Language equality. `nil` only equals `nil`; an instance operand whose
    /// class defines a unary `equals` method decides the answer (left
    /// operand probed first); everything else compares structurally.
    pub fn is_equal(&mut self, left: &Value, right: &Value) -> Exec<bool> {
        if let (Value::Nil, Value::Nil) = (left, right) {
            return Ok(true);
        }
        if matches!(left, Value::Nil) || matches!(right, Value::Nil) {
            return Ok(false);
        }

        if let Some(result) = self.probe_equals(left, right)? {
            return Ok(result);
        }
        if let Some(result) = self.probe_equals(right, left)? {
            return Ok(result);
        }

        Ok(match (left, right) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            _ => false,
        })
    }

    /// The optional-capability probe behind user-overridable `==`.
    fn probe_equals(&mut self, candidate: &Value, other: &Value) -> Exec<Option<bool>> {
        let Value::Instance(instance) = candidate else {
            return Ok(None);
        };

        let Some(equals) = instance.class().find_method(instance, "equals") else {
            return Ok(None);
        };

        if equals.arity() != 1 {
            return Ok(None);
        }

        let result = equals.call(self, &[other.clone()])?;
        Ok(Some(is_truthy(&result)))
    }

    /// Display form of a value, honoring a zero-arity user `toString`.
    pub fn stringify(&mut self, value: &Value) -> Exec<String> {
        if let Value::Instance(instance) = value {
            if let Some(to_string) = instance.class().find_method(instance, "toString") {
                if to_string.arity() == 0 {
                    let text = to_string.call(self, &[])?;
                    if !matches!(text, Value::Nil) {
                        return Ok(text.to_string());
                    }
                }
            }
        }

        Ok(value.to_string())
    }

    // ───────────────────────── depth accounting ─────────────────────────────

    /// Claim one stack frame, failing with the uncatchable overflow fault at
    /// the ceiling. Returns the depth to restore afterwards.
    fn push_frame(&mut self, at: &Token) -> Exec<usize> {
        if self.stack_size >= STACK_LIMIT {
            return Err(Unwind::uncatchable(at, "Stack overflow"));
        }

        let depth = self.stack_size;
        self.stack_size += 1;
        Ok(depth)
    }

    // ───────────────────────── host access ──────────────────────────────────

    pub(crate) fn emit(&self, text: &str) {
        self.sink.write(text);
    }

    pub(crate) fn environment(&self) -> &Rc<RefCell<Environment>> {
        &self.environment
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

/// `nil`, `false`, and `0` are falsy; every other value — the empty string
/// included — is truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Nil => false,
        Value::Bool(b) => *b,
        Value::Number(n) => *n != 0.0,
        _ => true,
    }
}

fn literal_value(literal: &LiteralValue) -> Value {
    match literal {
        LiteralValue::Number(n) => Value::Number(*n),
        LiteralValue::Str(s) => Value::String(s.clone()),
        LiteralValue::True => Value::Bool(true),
        LiteralValue::False => Value::Bool(false),
        LiteralValue::Nil => Value::Nil,
    }
}
