//! Lexical scope frames for the Vesper runtime.
//!
//! A frame maps names to values and owns a shared handle to its enclosing
//! frame; frames form a tree rooted at the global frame (which has no
//! parent), and the chain is never cyclic.  `get`/`assign` walk the chain
//! upward; `get_at`/`assign_at` jump exactly the resolver‑computed number of
//! frames and then look only in that one frame, which is how the interpreter
//! reaches resolved locals without re‑searching.

use crate::error::{Result, VesperError};
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug)]
pub struct Environment<'a> {
    values: HashMap<&'a str, Value<'a>>,
    enclosing: Option<Rc<RefCell<Environment<'a>>>>,
}

impl<'a> Environment<'a> {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment<'a>>>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Insert or overwrite a binding in *this* frame.
    pub fn define(&mut self, name: &'a str, value: Value<'a>) {
        self.values.insert(name, value);
    }

    /// Search this frame then the parent chain.
    pub fn get(&self, name: &str, line: usize) -> Result<Value<'a>> {
        if let Some(value) = self.values.get(name) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name, line)
        } else {
            Err(VesperError::runtime(
                line,
                format!("Undefined variable '{}'", name),
            ))
        }
    }

    /// Overwrite an *existing* binding, searching the chain.
    pub fn assign(&mut self, name: &'a str, value: Value<'a>, line: usize) -> Result<()> {
        if self.values.contains_key(name) {
            self.values.insert(name, value);
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value, line)
        } else {
            Err(VesperError::runtime(
                line,
                format!("Undefined variable '{}'", name),
            ))
        }
    }

    /// Walk exactly `distance` frames up the chain.  The resolver guarantees
    /// the chain is deep enough; a short chain is an interpreter bug.
    fn ancestor(
        env: &Rc<RefCell<Environment<'a>>>,
        distance: usize,
    ) -> Rc<RefCell<Environment<'a>>> {
        let mut frame: Rc<RefCell<Environment<'a>>> = Rc::clone(env);

        for _ in 0..distance {
            let next = frame
                .borrow()
                .enclosing
                .as_ref()
                .expect("resolved distance stays within the environment chain")
                .clone();

            frame = next;
        }

        frame
    }

    /// Direct lookup in the frame exactly `distance` hops up, bypassing the
    /// chain search.
    pub fn get_at(
        env: &Rc<RefCell<Environment<'a>>>,
        distance: usize,
        name: &str,
        line: usize,
    ) -> Result<Value<'a>> {
        let frame = Self::ancestor(env, distance);
        let value = frame.borrow().values.get(name).cloned();

        value.ok_or_else(|| VesperError::runtime(line, format!("Undefined variable '{}'", name)))
    }

    /// Direct overwrite in the frame exactly `distance` hops up.
    pub fn assign_at(
        env: &Rc<RefCell<Environment<'a>>>,
        distance: usize,
        name: &'a str,
        value: Value<'a>,
        line: usize,
    ) -> Result<()> {
        let frame = Self::ancestor(env, distance);
        let mut frame = frame.borrow_mut();

        if frame.values.contains_key(name) {
            frame.values.insert(name, value);
            Ok(())
        } else {
            Err(VesperError::runtime(
                line,
                format!("Undefined variable '{}'", name),
            ))
        }
    }
}

impl<'a> Default for Environment<'a> {
    fn default() -> Self {
        Self::new()
    }
}
