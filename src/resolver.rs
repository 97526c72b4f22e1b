//! Static resolver pass for the **Vesper** interpreter.
//!
//! This resolver does three things in one AST walk:
//! 1. Build lexical scopes (stack of `HashMap<&str,bool>` tracking declared/defined).
//! 2. Report static errors (redeclaration, forward‑read in initializer, invalid
//!    `return`, `this`/`super` misuse, self‑inheritance).  Errors accumulate —
//!    the whole tree is walked and every diagnostic reported; any one of them
//!    prevents execution from starting.
//! 3. Tell the interpreter, for *each* variable occurrence, at what depth its
//!    binding lives — so the interpreter never falls back to dynamic lookup
//!    that would see a later shadowing local.  Names found in no local scope
//!    are globals and get no table entry.
//!
//! The scope stack here must mirror the interpreter's runtime frame chain
//! exactly: one scope per block, one per function body (seeded with the
//! parameters), and for class bodies a `super` scope (when inheriting)
//! wrapping a `this` scope around the instance methods.

use crate::ast::{Expr, ExprId, Stmt};
use crate::error::VesperError;
use crate::interpreter::Interpreter;
use crate::token::Token;
use log::{debug, info};
use std::collections::HashMap;

/// What kind of function body encloses the current node.  Used to validate
/// `return`, `this`, and `super`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    StaticMethod,
    Method,
    Initializer,
}

/// Whether the current node sits inside a class body, and if so whether that
/// class inherits.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

/// Resolver: tracks scopes, enforces static rules, and *records* binding
/// distances by calling back into the interpreter's side table.
pub struct Resolver<'a, 'interp> {
    interpreter: &'interp mut Interpreter<'a>,
    scopes: Vec<HashMap<&'a str, bool>>, // false=declared, true=defined
    current_function: FunctionType,
    current_class: ClassType,
    diagnostics: Vec<VesperError>,
}

impl<'a, 'interp> Resolver<'a, 'interp> {
    /// Create a new resolver bound to the given interpreter.
    pub fn new(interpreter: &'interp mut Interpreter<'a>) -> Self {
        info!("Resolver instantiated");

        Resolver {
            interpreter,
            scopes: Vec::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
            diagnostics: Vec::new(),
        }
    }

    /// Walk all top‑level statements and return every static diagnostic.
    pub fn resolve(mut self, statements: &'a [Stmt<'a>]) -> Vec<VesperError> {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        for stmt in statements {
            self.resolve_stmt(stmt);
        }

        self.diagnostics
    }

    fn error<S: Into<String>>(&mut self, line: usize, msg: S) {
        self.diagnostics.push(VesperError::resolve(line, msg));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &'a Stmt<'a>) {
        debug!("Resolving stmt: {:?}", stmt);

        match stmt {
            Stmt::Block(statements) => {
                self.begin_scope();
                for s in statements {
                    self.resolve_stmt(s);
                }
                self.end_scope();
            }

            Stmt::Var { name, initializer } => {
                // declare → resolve initializer → define, so the initializer
                // cannot read the name it is initializing.
                self.declare(name);
                if let Some(expr) = initializer {
                    self.resolve_expr(expr);
                }
                self.define(name);
            }

            Stmt::Function {
                name, params, body, ..
            } => {
                // The name is visible *inside* its own body (recursion).
                self.declare(name);
                self.define(name);
                self.resolve_function(params, body, FunctionType::Function);
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

            Stmt::While { condition, body } => {
                self.resolve_expr(condition);
                self.resolve_stmt(body);
            }

            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    self.error(keyword.line, "Cannot return from top-level code");
                }

                if let Some(expr) = value {
                    if self.current_function == FunctionType::Initializer {
                        self.error(keyword.line, "Cannot return a value from an initializer");
                    }

                    self.resolve_expr(expr);
                }
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.resolve_class(name, superclass, methods),
        }
    }

    fn resolve_class(
        &mut self,
        name: &'a Token<'a>,
        superclass: &'a Option<Expr<'a>>,
        methods: &'a [Stmt<'a>],
    ) {
        let enclosing_class = self.current_class;
        self.current_class = ClassType::Class;

        self.declare(name);
        self.define(name);

        if let Some(superclass_expr) = superclass {
            if let Expr::Variable {
                name: super_name, ..
            } = superclass_expr
            {
                if super_name.lexeme == name.lexeme {
                    self.error(super_name.line, "A class cannot inherit from itself");
                }
            }

            self.current_class = ClassType::Subclass;
            self.resolve_expr(superclass_expr);

            // Synthetic scope holding `super` for the methods below.
            self.begin_scope();
            self.scope_insert("super");
        }

        // Statics never get a bound `this` frame at call time, so they are
        // resolved *outside* the `this` scope to keep distances aligned.
        for method in methods {
            if let Stmt::Function {
                params,
                body,
                is_static: true,
                ..
            } = method
            {
                self.resolve_function(params, body, FunctionType::StaticMethod);
            }
        }

        self.begin_scope();
        self.scope_insert("this");

        for method in methods {
            if let Stmt::Function {
                name: method_name,
                params,
                body,
                is_static: false,
                ..
            } = method
            {
                let declaration = if method_name.lexeme == "init" {
                    FunctionType::Initializer
                } else {
                    FunctionType::Method
                };

                self.resolve_function(params, body, declaration);
            }
        }

        self.end_scope();

        if superclass.is_some() {
            self.end_scope();
        }

        self.current_class = enclosing_class;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &'a Expr<'a>) {
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

            Expr::Conditional {
                condition,
                then_value,
                else_value,
            } => {
                self.resolve_expr(condition);
                self.resolve_expr(then_value);
                self.resolve_expr(else_value);
            }

            Expr::Variable { name, id } => {
                // Cannot read in own initializer.
                if let Some(scope) = self.scopes.last() {
                    if scope.get(name.lexeme) == Some(&false) {
                        self.error(
                            name.line,
                            "Cannot read local variable in its own initializer",
                        );
                    }
                }

                self.resolve_local(*id, name);
            }

            Expr::Assign { name, value, id } => {
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

            Expr::This { keyword, id } => {
                match self.current_class {
                    ClassType::None => {
                        self.error(keyword.line, "Cannot use 'this' outside of a class");
                        return;
                    }
                    _ if self.current_function == FunctionType::StaticMethod => {
                        self.error(keyword.line, "Cannot use 'this' in a static method");
                        return;
                    }
                    _ => {}
                }

                self.resolve_local(*id, keyword);
            }

            Expr::Super { keyword, id, .. } => {
                match self.current_class {
                    ClassType::None => {
                        self.error(keyword.line, "Cannot use 'super' outside of a class");
                        return;
                    }
                    ClassType::Class => {
                        self.error(
                            keyword.line,
                            "Cannot use 'super' in a class with no superclass",
                        );
                        return;
                    }
                    ClassType::Subclass if self.current_function == FunctionType::StaticMethod => {
                        self.error(keyword.line, "Cannot use 'super' in a static method");
                        return;
                    }
                    ClassType::Subclass => {}
                }

                self.resolve_local(*id, keyword);
            }

            Expr::Lambda { params, body } => {
                self.resolve_function(params, body, FunctionType::Function);
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Function helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Enter a fresh scope for a function’s parameters + body.
    fn resolve_function(
        &mut self,
        params: &'a [&'a Token<'a>],
        body: &'a [Stmt<'a>],
        ftype: FunctionType,
    ) {
        let enclosing = self.current_function;
        self.current_function = ftype;

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

    /// Insert a synthetic, already-defined binding (`this`/`super`) into the
    /// scope just pushed.
    fn scope_insert(&mut self, name: &'a str) {
        self.scopes
            .last_mut()
            .expect("scope_insert follows begin_scope")
            .insert(name, true);
    }

    fn declare(&mut self, name: &'a Token<'a>) {
        if let Some(scope) = self.scopes.last_mut() {
            if scope.contains_key(name.lexeme) {
                self.error(name.line, "Variable already declared in this scope");
                return;
            }

            scope.insert(name.lexeme, false);
        }
    }

    fn define(&mut self, name: &'a Token<'a>) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme, true);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Binding‑distance helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Record this variable occurrence as a local at depth `d`, or leave it
    /// for the global frame if no enclosing scope declares it.
    fn resolve_local(&mut self, id: ExprId, name: &Token<'_>) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(name.lexeme) {
                debug!("Resolved '{}' at depth {}", name.lexeme, depth);
                self.interpreter.resolve_local(id, depth);
                return;
            }
        }

        debug!("Resolved '{}' as global", name.lexeme);
    }
}
