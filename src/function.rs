use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::class::LoxInstance;
use crate::environment::Environment;
use crate::interpreter::{Exec, Interpreter, Unwind};
use crate::stmt::{FunctionDecl, Stmt};
use crate::token::Token;
use crate::value::Value;

/// How a function value was written down, which only affects its display
/// form (`<fn name>` vs `<lambda>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Function,
    Lambda,
}

/// A user-defined function value: parameters, a shared body, the captured
/// environment, and the initializer flag.
///
/// The captured environment is never copied — closures share the frame they
/// were created in, so mutations made through one closure are visible to
/// every other closure over the same frame.
pub struct LoxFunction {
    name: String,
    kind: FunctionKind,
    params: Vec<Token>,
    body: Rc<Vec<Stmt>>,
    closure: Rc<RefCell<Environment>>,
    is_initializer: bool,
}

impl LoxFunction {
    pub fn new(
        name: &str,
        kind: FunctionKind,
        params: Vec<Token>,
        body: Rc<Vec<Stmt>>,
        closure: Rc<RefCell<Environment>>,
        is_initializer: bool,
    ) -> Self {
        Self {
            name: name.to_owned(),
            kind,
            params,
            body,
            closure,
            is_initializer,
        }
    }

    /// A function value for a `fn` declaration or class method.
    pub fn from_decl(
        declaration: &FunctionDecl,
        closure: Rc<RefCell<Environment>>,
        is_initializer: bool,
    ) -> Self {
        Self::new(
            &declaration.name.lexeme,
            FunctionKind::Function,
            declaration.params.clone(),
            declaration.body.clone(),
            closure,
            is_initializer,
        )
    }

    /// A function value for a `|a, b| { ... }` lambda expression.
    pub fn lambda(
        params: Vec<Token>,
        body: Rc<Vec<Stmt>>,
        closure: Rc<RefCell<Environment>>,
    ) -> Self {
        Self::new("", FunctionKind::Lambda, params, body, closure, false)
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Produce a *new* function whose captured environment is a fresh child
    /// frame with `this` bound to `instance`. The original is untouched.
    pub fn bind(&self, instance: Rc<LoxInstance>) -> LoxFunction {
        let mut environment = Environment::with_enclosing(self.closure.clone());
        environment.define("this", Value::Instance(instance));

        Self::new(
            &self.name,
            self.kind,
            self.params.clone(),
            self.body.clone(),
            Rc::new(RefCell::new(environment)),
            self.is_initializer,
        )
    }

    /// Execute the body in a fresh child of the captured environment.
    ///
    /// An initializer always yields `this`, whatever its body returns.
    pub fn call(&self, interpreter: &mut Interpreter, arguments: &[Value]) -> Exec<Value> {
        debug!("Calling {} with {} argument(s)", self, arguments.len());

        let mut environment = Environment::with_enclosing(self.closure.clone());

        for (param, argument) in self.params.iter().zip(arguments) {
            environment.define(&param.lexeme, argument.clone());
        }

        let result = interpreter.execute_block(&self.body, Rc::new(RefCell::new(environment)));

        match result {
            Ok(()) => {
                if self.is_initializer {
                    Ok(self.bound_this())
                } else {
                    Ok(Value::Nil)
                }
            }

            Err(Unwind::Return(value)) => {
                if self.is_initializer {
                    Ok(self.bound_this())
                } else {
                    Ok(value)
                }
            }

            Err(other) => Err(other),
        }
    }

    /// The `this` a bound initializer constructs; its closure *is* the frame
    /// `bind` created.
    fn bound_this(&self) -> Value {
        self.closure.borrow().get_this().unwrap_or(Value::Nil)
    }
}

impl fmt::Display for LoxFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FunctionKind::Function => write!(f, "<fn {}>", self.name),
            FunctionKind::Lambda => write!(f, "<lambda>"),
        }
    }
}

// Closure environments reach back into frames holding this very function;
// a derived Debug would recurse through that cycle.
impl fmt::Debug for LoxFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoxFunction")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("arity", &self.params.len())
            .finish_non_exhaustive()
    }
}

/// A host-provided builtin: an opaque callable the runtime cannot look
/// inside. Seeded into the global frame at interpreter construction.
pub struct NativeFunction {
    pub name: &'static str,
    pub arity: usize,
    pub func: fn(&mut Interpreter, &[Value]) -> Exec<Value>,
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}
