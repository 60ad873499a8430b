use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::interpreter::{Exec, Unwind};
use crate::token::Token;
use crate::value::Value;

/// One lexical scope frame: bindings plus an optional enclosing frame.
///
/// Frames are shared (`Rc<RefCell<_>>`) because any number of closures may
/// capture the same frame; a frame lives exactly as long as the last
/// closure, child frame, or call that can still reach it.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    pub enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment>>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Bind `name` in *this* frame, overwriting any existing binding here.
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_owned(), value);
    }

    /// Is `name` bound in *this* frame (enclosing frames not consulted)?
    pub fn has(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Look `name` up, walking outward through enclosing frames.
    pub fn get(&self, name: &Token) -> Exec<Value> {
        if let Some(value) = self.values.get(&name.lexeme) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            Err(Unwind::fault(
                name,
                format!("Undefined variable '{}'", name.lexeme),
            ))
        }
    }

    /// Reassign `name` wherever it is bound, walking outward. Assignment to
    /// an undeclared name is an error — never an implicit global create.
    pub fn assign(&mut self, name: &Token, value: Value) -> Exec<()> {
        if self.values.contains_key(&name.lexeme) {
            self.values.insert(name.lexeme.clone(), value);
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            Err(Unwind::fault(
                name,
                format!("Undefined variable '{}'", name.lexeme),
            ))
        }
    }

    /// Read `name` directly out of the frame exactly `distance` hops out,
    /// bypassing the outward search — the resolver already proved the
    /// binding's location.
    pub fn get_at(env: &Rc<RefCell<Environment>>, distance: usize, name: &Token) -> Exec<Value> {
        let frame = Self::ancestor(env, distance);
        let frame = frame.borrow();

        match frame.values.get(&name.lexeme) {
            Some(value) => Ok(value.clone()),
            None => Err(Unwind::fault(
                name,
                format!("Undefined variable '{}'", name.lexeme),
            )),
        }
    }

    /// Write `name` directly into the frame exactly `distance` hops out.
    pub fn assign_at(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
        name: &Token,
        value: Value,
    ) {
        Self::ancestor(env, distance)
            .borrow_mut()
            .values
            .insert(name.lexeme.clone(), value);
    }

    /// The `this` binding of *this* frame only.
    pub fn get_this(&self) -> Option<Value> {
        self.values.get("this").cloned()
    }

    /// The `this` binding of the frame `distance` hops out.
    pub fn get_this_at(env: &Rc<RefCell<Environment>>, distance: usize) -> Option<Value> {
        Self::ancestor(env, distance).borrow().get_this()
    }

    /// The `super` binding of the frame `distance` hops out.
    pub fn get_super_at(env: &Rc<RefCell<Environment>>, distance: usize) -> Option<Value> {
        Self::ancestor(env, distance).borrow().values.get("super").cloned()
    }

    fn ancestor(env: &Rc<RefCell<Environment>>, distance: usize) -> Rc<RefCell<Environment>> {
        let mut frame = env.clone();

        for _ in 0..distance {
            let next = frame
                .borrow()
                .enclosing
                .clone()
                .expect("resolver-verified distance exceeded the environment chain");
            frame = next;
        }

        frame
    }
}
