use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::function::LoxFunction;
use crate::interpreter::{Exec, Interpreter, Unwind};
use crate::token::Token;
use crate::value::Value;

/// A class value: name, optional superclass, and the method table.
///
/// Method resolution walks the superclass chain; a redefinition shadows the
/// ancestor's method of the same name.
pub struct LoxClass {
    pub name: String,
    pub superclass: Option<Rc<LoxClass>>,
    methods: HashMap<String, Rc<LoxFunction>>,
}

impl LoxClass {
    pub fn new(
        name: &str,
        superclass: Option<Rc<LoxClass>>,
        methods: HashMap<String, Rc<LoxFunction>>,
    ) -> Self {
        Self {
            name: name.to_owned(),
            superclass,
            methods,
        }
    }

    /// Unbound method lookup through the superclass chain.
    pub fn lookup(&self, name: &str) -> Option<Rc<LoxFunction>> {
        if let Some(method) = self.methods.get(name) {
            return Some(method.clone());
        }

        if let Some(superclass) = &self.superclass {
            return superclass.lookup(name);
        }

        None
    }

    /// Method lookup through the superclass chain; the hit is always bound
    /// to `instance` before being handed out.
    pub fn find_method(&self, instance: &Rc<LoxInstance>, name: &str) -> Option<Rc<LoxFunction>> {
        self.lookup(name)
            .map(|method| Rc::new(method.bind(instance.clone())))
    }

    /// True if this class is, or transitively extends, `name`. Used for
    /// `catch`-clause matching and the `throw` operand check.
    pub fn inherits(&self, name: &str) -> bool {
        if self.name == name {
            return true;
        }

        match &self.superclass {
            Some(superclass) => superclass.inherits(name),
            None => false,
        }
    }

    /// Arity of the class as a callable: its `init`'s arity, or 0.
    pub fn arity(&self) -> usize {
        self.lookup("init").map_or(0, |init| init.arity())
    }

    /// Calling a class allocates a new instance, runs a bound `init` if one
    /// exists (its return value is discarded), and yields the instance.
    pub fn construct(
        class: &Rc<LoxClass>,
        interpreter: &mut Interpreter,
        arguments: &[Value],
    ) -> Exec<Value> {
        debug!("Constructing instance of '{}'", class.name);

        let instance = Rc::new(LoxInstance::new(class.clone()));

        if let Some(initializer) = class.find_method(&instance, "init") {
            initializer.call(interpreter, arguments)?;
        }

        Ok(Value::Instance(instance))
    }
}

impl fmt::Debug for LoxClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoxClass")
            .field("name", &self.name)
            .field("methods", &self.methods.keys())
            .finish_non_exhaustive()
    }
}

/// One object: its class and a mutable field map.
///
/// Fields are created on first assignment — there is no declaration step.
/// Every holder of the `Rc` shares the same mutable object.
pub struct LoxInstance {
    class: Rc<LoxClass>,
    fields: RefCell<HashMap<String, Value>>,
}

impl LoxInstance {
    pub fn new(class: Rc<LoxClass>) -> Self {
        Self {
            class,
            fields: RefCell::new(HashMap::new()),
        }
    }

    pub fn class(&self) -> &Rc<LoxClass> {
        &self.class
    }

    /// Property access: own fields first, then bound-method lookup.
    pub fn get(instance: &Rc<Self>, name: &Token) -> Exec<Value> {
        if let Some(value) = instance.fields.borrow().get(&name.lexeme) {
            return Ok(value.clone());
        }

        if let Some(method) = instance.class.find_method(instance, &name.lexeme) {
            return Ok(Value::Function(method));
        }

        Err(Unwind::fault(
            name,
            format!("Undefined property '{}'", name.lexeme),
        ))
    }

    /// Field write: unconditional, creating the field if absent.
    pub fn set(&self, name: &Token, value: Value) {
        self.fields.borrow_mut().insert(name.lexeme.clone(), value);
    }
}

// Fields may hold the instance itself; a derived Debug would chase the cycle.
impl fmt::Debug for LoxInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<instance {}>", self.class.name)
    }
}
