//! Runtime value and object model: everything an expression can evaluate to.
//!
//! Functions, classes, and instances are shared by `Rc` handles, so a closure
//! keeps its defining environment alive and an instance keeps its class
//! alive, exactly mirroring the ownership the interpreter needs.  An instance
//! whose field holds a bound method forms an `Rc` cycle with the method's
//! `this` frame; such cycles are accepted as leaked‑until‑process‑exit.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::ast::Stmt;
use crate::environment::Environment;
use crate::token::Token;

/// Any value a Vesper expression can produce.
#[derive(Debug, Clone)]
pub enum Value<'a> {
    Number(f64),
    Str(String),
    Bool(bool),
    Nil,
    NativeFunction(NativeFunction<'a>),
    Function(Rc<Function<'a>>),
    Class(Rc<Class<'a>>),
    Instance(Rc<RefCell<Instance<'a>>>),
}

impl PartialEq for Value<'_> {
    /// `nil` equals only `nil`; primitives compare by value within the same
    /// type; callables and instances compare by identity.  Mismatched types
    /// are never equal — there is no coercion.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Nil, Value::Nil) => true,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            (Value::NativeFunction(a), Value::NativeFunction(b)) => {
                a.name == b.name && a.func == b.func
            }
            _ => false,
        }
    }
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Raw f64 form on purpose: `3` prints as `3`, `3.14` as `3.14`.
            Value::Number(n) => write!(f, "{}", n),

            Value::Str(s) => write!(f, "{}", s),

            Value::Bool(b) => write!(f, "{}", b),

            Value::Nil => write!(f, "nil"),

            Value::NativeFunction(native) => write!(f, "<native fn {}>", native.name),

            Value::Function(function) => match function.name {
                Some(name) => write!(f, "<fn {}>", name.lexeme),
                None => write!(f, "<fn>"),
            },

            Value::Class(class) => write!(f, "{}", class.name.lexeme),

            Value::Instance(instance) => {
                write!(f, "{} instance", instance.borrow().class.name.lexeme)
            }
        }
    }
}

/// A host‑provided function such as `clock`.
#[derive(Clone)]
pub struct NativeFunction<'a> {
    pub name: &'static str,
    pub arity: usize,
    pub func: fn(&[Value<'a>]) -> std::result::Result<Value<'a>, String>,
}

impl fmt::Debug for NativeFunction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeFunction({})", self.name)
    }
}

/// A user function, method, or lambda: parameter tokens and body borrowed
/// from the AST, plus the environment captured when the literal/declaration
/// was evaluated.
#[derive(Clone)]
pub struct Function<'a> {
    /// Declaration name; `None` for lambdas.
    pub name: Option<&'a Token<'a>>,
    pub params: &'a [&'a Token<'a>],
    pub body: &'a [Stmt<'a>],
    pub closure: Rc<RefCell<Environment<'a>>>,
    /// `init` methods always yield the instance, whatever the body returns.
    pub is_initializer: bool,
    /// Getters are invoked immediately on property access.
    pub is_getter: bool,
}

impl<'a> Function<'a> {
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Produce a copy of this function whose closure gains one extra frame
    /// defining `this`.  Each call yields a *distinct* function object, which
    /// is what makes bound methods compare by identity.
    pub fn bind(&self, instance: Rc<RefCell<Instance<'a>>>) -> Function<'a> {
        let mut frame = Environment::with_enclosing(Rc::clone(&self.closure));
        frame.define("this", Value::Instance(instance));

        Function {
            closure: Rc::new(RefCell::new(frame)),
            ..self.clone()
        }
    }
}

impl fmt::Debug for Function<'_> {
    // Shallow on purpose: the closure chain can reach back to this function.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name {
            Some(name) => write!(f, "Function({})", name.lexeme),
            None => write!(f, "Function(<lambda>)"),
        }
    }
}

/// A class: two method tables (instance and static) plus the optional
/// superclass used for method‑resolution fallback.  The class value itself
/// is callable — calling it constructs an instance.
pub struct Class<'a> {
    pub name: &'a Token<'a>,
    pub superclass: Option<Rc<Class<'a>>>,
    pub methods: HashMap<&'a str, Rc<Function<'a>>>,
    pub statics: HashMap<&'a str, Rc<Function<'a>>>,
}

impl<'a> Class<'a> {
    /// Instance‑method lookup, walking the superclass chain.
    pub fn find_method(&self, name: &str) -> Option<Rc<Function<'a>>> {
        if let Some(method) = self.methods.get(name) {
            return Some(Rc::clone(method));
        }

        self.superclass
            .as_ref()
            .and_then(|superclass| superclass.find_method(name))
    }

    /// Static lookup on this class only — statics are not inherited.
    pub fn find_static(&self, name: &str) -> Option<Rc<Function<'a>>> {
        self.statics.get(name).map(Rc::clone)
    }

    /// Constructor arity: the `init` method's, or 0 when absent.
    pub fn arity(&self) -> usize {
        self.find_method("init").map_or(0, |init| init.arity())
    }
}

impl fmt::Debug for Class<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Class({})", self.name.lexeme)
    }
}

/// An instance: its class plus a field map that grows on first assignment.
pub struct Instance<'a> {
    pub class: Rc<Class<'a>>,
    pub fields: HashMap<&'a str, Value<'a>>,
}

impl<'a> Instance<'a> {
    pub fn new(class: Rc<Class<'a>>) -> Self {
        Instance {
            class,
            fields: HashMap::new(),
        }
    }
}

impl fmt::Debug for Instance<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Instance({})", self.class.name.lexeme)
    }
}
