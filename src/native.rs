//! Host-provided builtins.
//!
//! The interpreter's global frame starts empty; the host seeds it at
//! construction time with this prelude — a clock, a prompting line reader,
//! a printer, two reflection helpers, and the base error class every
//! throwable must extend. The runtime treats all of them as opaque
//! callables.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io;
use std::rc::Rc;

use chrono::Utc;
use log::debug;

use crate::class::{LoxClass, LoxInstance};
use crate::environment::Environment;
use crate::expr::{Expr, LiteralValue};
use crate::function::{FunctionKind, LoxFunction, NativeFunction};
use crate::interpreter::{Exec, Interpreter, Unwind};
use crate::stmt::Stmt;
use crate::token::{Token, TokenType};
use crate::value::Value;

/// The standard global seed: `(name, value)` pairs the host hands to
/// `Interpreter::with_prelude`.
pub fn prelude() -> Vec<(String, Value)> {
    vec![
        ("clock".to_owned(), native("clock", 0, clock)),
        ("input".to_owned(), native("input", 1, input)),
        ("println".to_owned(), native("println", 1, println)),
        ("getVar".to_owned(), native("getVar", 1, get_var)),
        (
            "getProperty".to_owned(),
            native("getProperty", 2, get_property),
        ),
        ("RuntimeError".to_owned(), Value::Class(base_error_class())),
    ]
}

fn native(
    name: &'static str,
    arity: usize,
    func: fn(&mut Interpreter, &[Value]) -> Exec<Value>,
) -> Value {
    Value::Native(Rc::new(NativeFunction { name, arity, func }))
}

// ───────────────────────────── native callables ─────────────────────────────

/// Seconds since the Unix epoch, with sub-second precision.
fn clock(_interpreter: &mut Interpreter, _arguments: &[Value]) -> Exec<Value> {
    debug!("Calling native function 'clock'");
    Ok(Value::Number(Utc::now().timestamp_millis() as f64 / 1000.0))
}

/// Write the prompt, then read one line from standard input.
fn input(interpreter: &mut Interpreter, arguments: &[Value]) -> Exec<Value> {
    let prompt = interpreter.stringify(&arguments[0])?;
    interpreter.emit(&prompt);

    let mut line = String::new();
    io::stdin().read_line(&mut line).map_err(|e| {
        Unwind::fault(
            &Token::synthetic(TokenType::IDENTIFIER, "input"),
            format!("Cannot read input: {}", e),
        )
    })?;

    Ok(Value::String(line.trim_end_matches(['\r', '\n']).to_owned()))
}

/// Print the stringified argument followed by a newline.
fn println(interpreter: &mut Interpreter, arguments: &[Value]) -> Exec<Value> {
    let text = interpreter.stringify(&arguments[0])?;
    interpreter.emit(&text);
    interpreter.emit("\n");
    Ok(Value::Nil)
}

/// Reflection: read a variable by name out of the calling scope.
fn get_var(interpreter: &mut Interpreter, arguments: &[Value]) -> Exec<Value> {
    let Value::String(name) = &arguments[0] else {
        return Ok(Value::Nil);
    };

    let name = Token::synthetic(TokenType::IDENTIFIER, name);
    let environment = interpreter.environment().clone();
    let value = environment.borrow().get(&name)?;
    Ok(value)
}

/// Reflection: read an instance property by name.
fn get_property(_interpreter: &mut Interpreter, arguments: &[Value]) -> Exec<Value> {
    let (Value::Instance(instance), Value::String(name)) = (&arguments[0], &arguments[1]) else {
        return Ok(Value::Nil);
    };

    LoxInstance::get(instance, &Token::synthetic(TokenType::IDENTIFIER, name))
}

// ───────────────────────────── error classes ────────────────────────────────

/// The base error class: `RuntimeError`, with `message()` and `getType()`
/// methods synthesized as ordinary functions over literal bodies.
pub fn base_error_class() -> Rc<LoxClass> {
    let mut methods = HashMap::new();
    methods.insert(
        "message".to_owned(),
        literal_method("message", "No message defined"),
    );
    methods.insert(
        "getType".to_owned(),
        literal_method("getType", "RuntimeError"),
    );

    Rc::new(LoxClass::new("RuntimeError", None, methods))
}

/// An anonymous class wrapping one internal fault so catch bodies can call
/// `message()`/`getType()` on it like on any thrown error. Extends the
/// seeded base class when it is still intact.
pub fn fault_class(base: Option<Rc<LoxClass>>, message: &str) -> Rc<LoxClass> {
    let mut methods = HashMap::new();
    methods.insert("message".to_owned(), literal_method("message", message));
    methods.insert(
        "getType".to_owned(),
        literal_method("getType", "InterpreterRuntimeError"),
    );

    Rc::new(LoxClass::new("InterpreterRuntimeError", base, methods))
}

/// A zero-parameter function whose whole body is `return "text";`.
fn literal_method(name: &str, text: &str) -> Rc<LoxFunction> {
    let body = vec![Stmt::Return {
        keyword: Token::synthetic(TokenType::RETURN, "return"),
        value: Some(Expr::Literal(LiteralValue::Str(text.to_owned()))),
    }];

    Rc::new(LoxFunction::new(
        name,
        FunctionKind::Function,
        Vec::new(),
        Rc::new(body),
        Rc::new(RefCell::new(Environment::new())),
        false,
    ))
}
