//! Tree‑walking evaluator for Vesper.
//!
//! Dispatch is an exhaustive `match` over the AST variants: each expression
//! evaluates to a [`Value`], each statement executes for effect and reports
//! how control left it via [`Flow`].  `Flow::Returning` is the abrupt
//! completion signal for `return` — it propagates out of blocks without
//! executing further statements and is unwound by the nearest function‑call
//! handler, never observable beyond it.  Runtime errors travel in the `Err`
//! channel and are fail‑fast: the first one aborts the whole run.
//!
//! Variable access prefers the resolver's pre‑computed distances (held here
//! in a side table keyed by [`ExprId`]) and falls back to the global frame
//! when no distance was recorded.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info};

use crate::ast::{Expr, ExprId, LiteralValue, Stmt};
use crate::environment::Environment;
use crate::error::{Result, VesperError};
use crate::token::{Token, TokenType};
use crate::value::{Class, Function, Instance, NativeFunction, Value};

/// How control left a statement.
#[derive(Debug)]
pub enum Flow<'a> {
    /// Fell through normally; continue with the next statement.
    Normal,

    /// A `return` fired; carry the value to the enclosing function call.
    Returning(Value<'a>),
}

pub struct Interpreter<'a> {
    globals: Rc<RefCell<Environment<'a>>>,
    environment: Rc<RefCell<Environment<'a>>>,

    /// Resolver side table: expression identity → scope distance.
    locals: HashMap<ExprId, usize>,

    /// Destination for `print`; the driver passes stdout, tests a buffer.
    out: &'a mut dyn Write,
}

impl<'a> Interpreter<'a> {
    /// Creates a new Interpreter and defines native functions such as `clock`.
    pub fn new(out: &'a mut dyn Write) -> Self {
        info!("Initializing Interpreter");

        let globals = Rc::new(RefCell::new(Environment::new()));

        debug!("Defining native function 'clock'");

        globals.borrow_mut().define(
            "clock",
            Value::NativeFunction(NativeFunction {
                name: "clock",
                arity: 0,
                func: |_args| {
                    let timestamp: f64 = SystemTime::now()
                        .duration_since(UNIX_EPOCH)
                        .map_err(|e| format!("Clock error: {}", e))?
                        .as_secs_f64();
                    Ok(Value::Number(timestamp))
                },
            }),
        );

        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            out,
        }
    }

    /// Record a resolved scope distance for an expression.  Called by the
    /// resolver; expressions with no entry are globals.
    pub fn resolve_local(&mut self, id: ExprId, depth: usize) {
        self.locals.insert(id, depth);
    }

    /// Interprets a list of statements (a "program").
    pub fn interpret(&mut self, statements: &'a [Stmt<'a>]) -> Result<()> {
        debug!("Interpreting {} statements", statements.len());

        for stmt in statements {
            self.execute(stmt)?;
        }

        info!("Interpretation completed successfully");
        Ok(())
    }

    // ───────────────────────── statements ─────────────────────────

    /// Executes a single statement.
    pub fn execute(&mut self, stmt: &'a Stmt<'a>) -> Result<Flow<'a>> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(Flow::Normal)
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                writeln!(self.out, "{}", value)?;
                Ok(Flow::Normal)
            }

            Stmt::Var { name, initializer } => {
                debug!("Defining variable '{}'", name.lexeme);

                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                self.environment.borrow_mut().define(name.lexeme, value);
                Ok(Flow::Normal)
            }

            Stmt::Block(statements) => {
                let env = Environment::with_enclosing(Rc::clone(&self.environment));
                self.execute_block(statements, Rc::new(RefCell::new(env)))
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
                    Ok(Flow::Normal)
                }
            }

            Stmt::While { condition, body } => {
                while is_truthy(&self.evaluate(condition)?) {
                    if let Flow::Returning(value) = self.execute(body)? {
                        return Ok(Flow::Returning(value));
                    }
                }

                Ok(Flow::Normal)
            }

            Stmt::Function {
                name,
                params,
                body,
                is_getter,
                ..
            } => {
                debug!("Defining function '{}'", name.lexeme);

                // Capture the environment active *now*: closure semantics.
                let function = Function {
                    name: Some(*name),
                    params: params.as_slice(),
                    body: body.as_slice(),
                    closure: Rc::clone(&self.environment),
                    is_initializer: false,
                    is_getter: *is_getter,
                };

                self.environment
                    .borrow_mut()
                    .define(name.lexeme, Value::Function(Rc::new(function)));
                Ok(Flow::Normal)
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("Returning value: {}", value);
                Ok(Flow::Returning(value))
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.class_declaration(name, superclass, methods),
        }
    }

    /// Executes `statements` with `env` as the current frame, restoring the
    /// previous frame on every exit path.
    pub fn execute_block(
        &mut self,
        statements: &'a [Stmt<'a>],
        env: Rc<RefCell<Environment<'a>>>,
    ) -> Result<Flow<'a>> {
        let previous = std::mem::replace(&mut self.environment, env);

        let mut flow = Flow::Normal;

        for stmt in statements {
            match self.execute(stmt) {
                Ok(Flow::Normal) => {}

                Ok(returning) => {
                    flow = returning;
                    break;
                }

                Err(e) => {
                    self.environment = previous;
                    return Err(e);
                }
            }
        }

        self.environment = previous;
        Ok(flow)
    }

    fn class_declaration(
        &mut self,
        name: &'a Token<'a>,
        superclass_expr: &'a Option<Expr<'a>>,
        members: &'a [Stmt<'a>],
    ) -> Result<Flow<'a>> {
        let superclass: Option<Rc<Class<'a>>> = match superclass_expr {
            Some(expr) => {
                let line = superclass_line(expr, name);
                match self.evaluate(expr)? {
                    Value::Class(class) => Some(class),
                    other => {
                        return Err(VesperError::runtime(
                            line,
                            format!("Superclass must be a class, got {}", other),
                        ));
                    }
                }
            }
            None => None,
        };

        // Two-stage binding lets methods refer to the class by name.
        self.environment.borrow_mut().define(name.lexeme, Value::Nil);

        // Frame the methods close over; gains `super` when inheriting.
        let method_env: Rc<RefCell<Environment<'a>>> = match &superclass {
            Some(class) => {
                let mut frame = Environment::with_enclosing(Rc::clone(&self.environment));
                frame.define("super", Value::Class(Rc::clone(class)));
                Rc::new(RefCell::new(frame))
            }
            None => Rc::clone(&self.environment),
        };

        let mut methods: HashMap<&'a str, Rc<Function<'a>>> = HashMap::new();
        let mut statics: HashMap<&'a str, Rc<Function<'a>>> = HashMap::new();

        for member in members {
            if let Stmt::Function {
                name: method_name,
                params,
                body,
                is_getter,
                is_static,
            } = member
            {
                let function = Function {
                    name: Some(*method_name),
                    params: params.as_slice(),
                    body: body.as_slice(),
                    closure: Rc::clone(&method_env),
                    is_initializer: !*is_static && method_name.lexeme == "init",
                    is_getter: *is_getter,
                };

                // Last declaration wins on duplicate names.
                if *is_static {
                    statics.insert(method_name.lexeme, Rc::new(function));
                } else {
                    methods.insert(method_name.lexeme, Rc::new(function));
                }
            }
        }

        let class = Rc::new(Class {
            name,
            superclass,
            methods,
            statics,
        });

        self.environment
            .borrow_mut()
            .assign(name.lexeme, Value::Class(class), name.line)?;

        info!("Class '{}' declared", name.lexeme);
        Ok(Flow::Normal)
    }

    // ───────────────────────── expressions ────────────────────────

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &'a Expr<'a>) -> Result<Value<'a>> {
        match expr {
            Expr::Literal(lit) => Ok(match lit {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::Str(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => self.evaluate_unary(operator, right),

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right),

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left_val = self.evaluate(left)?;

                // The deciding operand *is* the result, not a coerced bool.
                match operator.token_type {
                    TokenType::OR if is_truthy(&left_val) => Ok(left_val),
                    TokenType::AND if !is_truthy(&left_val) => Ok(left_val),
                    _ => self.evaluate(right),
                }
            }

            Expr::Conditional {
                condition,
                then_value,
                else_value,
            } => {
                if is_truthy(&self.evaluate(condition)?) {
                    self.evaluate(then_value)
                } else {
                    self.evaluate(else_value)
                }
            }

            Expr::Variable { name, id } => self.lookup_variable(name, *id),

            Expr::This { keyword, id } => self.lookup_variable(keyword, *id),

            Expr::Assign { name, value, id } => {
                let value = self.evaluate(value)?;

                match self.locals.get(id) {
                    Some(&distance) => Environment::assign_at(
                        &self.environment,
                        distance,
                        name.lexeme,
                        value.clone(),
                        name.line,
                    )?,
                    None => self.globals.borrow_mut().assign(
                        name.lexeme,
                        value.clone(),
                        name.line,
                    )?,
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee_val = self.evaluate(callee)?;

                let mut args = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    args.push(self.evaluate(argument)?);
                }

                self.call_value(callee_val, paren, args)
            }

            Expr::Get { object, name } => self.property_access(object, name),

            Expr::Set {
                object,
                name,
                value,
            } => {
                let object_val = self.evaluate(object)?;

                match object_val {
                    Value::Instance(instance) => {
                        let value = self.evaluate(value)?;

                        // Writes always land in the instance's own field map,
                        // never in a superclass.
                        instance.borrow_mut().fields.insert(name.lexeme, value.clone());
                        Ok(value)
                    }

                    other => Err(VesperError::runtime(
                        name.line,
                        format!("Only instances have fields, got {}", other),
                    )),
                }
            }

            Expr::Super {
                keyword,
                method,
                id,
            } => self.super_access(keyword, method, *id),

            Expr::Lambda { params, body } => {
                let function = Function {
                    name: None,
                    params: params.as_slice(),
                    body: body.as_slice(),
                    closure: Rc::clone(&self.environment),
                    is_initializer: false,
                    is_getter: false,
                };

                Ok(Value::Function(Rc::new(function)))
            }
        }
    }

    fn evaluate_unary(&mut self, operator: &'a Token<'a>, right: &'a Expr<'a>) -> Result<Value<'a>> {
        let right_val = self.evaluate(right)?;

        match operator.token_type {
            TokenType::MINUS => match right_val {
                Value::Number(n) => Ok(Value::Number(-n)),
                other => Err(VesperError::runtime(
                    operator.line,
                    format!("Operand of '-' must be a number, got {}", other),
                )),
            },

            TokenType::BANG => Ok(Value::Bool(!is_truthy(&right_val))),

            _ => Err(VesperError::runtime(
                operator.line,
                format!("Invalid unary operator '{}'", operator.lexeme),
            )),
        }
    }

    fn evaluate_binary(
        &mut self,
        left: &'a Expr<'a>,
        operator: &'a Token<'a>,
        right: &'a Expr<'a>,
    ) -> Result<Value<'a>> {
        // The comma sequence: evaluate both, yield the right value.
        if operator.token_type == TokenType::COMMA {
            self.evaluate(left)?;
            return self.evaluate(right);
        }

        let left_val = self.evaluate(left)?;
        let right_val = self.evaluate(right)?;

        match operator.token_type {
            TokenType::PLUS => match (left_val, right_val) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::Str(a), Value::Str(b)) => Ok(Value::Str(a + &b)),
                (l, r) => Err(VesperError::runtime(
                    operator.line,
                    format!(
                        "Operands of '+' must be two numbers or two strings, got {} and {}",
                        l, r
                    ),
                )),
            },

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(left_val == right_val)),
            TokenType::BANG_EQUAL => Ok(Value::Bool(left_val != right_val)),

            TokenType::MINUS => {
                let (a, b) = numeric_operands(operator, left_val, right_val)?;
                Ok(Value::Number(a - b))
            }

            TokenType::STAR => {
                let (a, b) = numeric_operands(operator, left_val, right_val)?;
                Ok(Value::Number(a * b))
            }

            // IEEE division: x/0 is an infinity, not an error.
            TokenType::SLASH => {
                let (a, b) = numeric_operands(operator, left_val, right_val)?;
                Ok(Value::Number(a / b))
            }

            TokenType::GREATER => {
                let (a, b) = numeric_operands(operator, left_val, right_val)?;
                Ok(Value::Bool(a > b))
            }

            TokenType::GREATER_EQUAL => {
                let (a, b) = numeric_operands(operator, left_val, right_val)?;
                Ok(Value::Bool(a >= b))
            }

            TokenType::LESS => {
                let (a, b) = numeric_operands(operator, left_val, right_val)?;
                Ok(Value::Bool(a < b))
            }

            TokenType::LESS_EQUAL => {
                let (a, b) = numeric_operands(operator, left_val, right_val)?;
                Ok(Value::Bool(a <= b))
            }

            _ => Err(VesperError::runtime(
                operator.line,
                format!("Invalid binary operator '{}'", operator.lexeme),
            )),
        }
    }

    /// Distance-based lookup for resolved locals; globals have no entry in
    /// the side table and fall back to the global frame.
    fn lookup_variable(&self, name: &'a Token<'a>, id: ExprId) -> Result<Value<'a>> {
        match self.locals.get(&id) {
            Some(&distance) => {
                Environment::get_at(&self.environment, distance, name.lexeme, name.line)
            }
            None => self.globals.borrow().get(name.lexeme, name.line),
        }
    }

    // ───────────────────────── call machinery ─────────────────────

    fn call_value(
        &mut self,
        callee: Value<'a>,
        paren: &'a Token<'a>,
        arguments: Vec<Value<'a>>,
    ) -> Result<Value<'a>> {
        match callee {
            Value::NativeFunction(native) => {
                check_arity(native.arity, arguments.len(), paren)?;

                debug!("Calling native function '{}'", native.name);
                (native.func)(&arguments).map_err(|msg| VesperError::runtime(paren.line, msg))
            }

            Value::Function(function) => {
                check_arity(function.arity(), arguments.len(), paren)?;
                self.call_function(&function, arguments)
            }

            Value::Class(class) => {
                check_arity(class.arity(), arguments.len(), paren)?;
                self.instantiate(class, arguments)
            }

            other => Err(VesperError::runtime(
                paren.line,
                format!("Can only call functions and classes, got {}", other),
            )),
        }
    }

    /// One new frame chained to the closure, parameters bound positionally,
    /// body run as a block.  Initializers always yield their instance.
    fn call_function(
        &mut self,
        function: &Rc<Function<'a>>,
        arguments: Vec<Value<'a>>,
    ) -> Result<Value<'a>> {
        let mut frame = Environment::with_enclosing(Rc::clone(&function.closure));

        for (param, argument) in function.params.iter().zip(arguments) {
            frame.define(param.lexeme, argument);
        }

        let flow = self.execute_block(function.body, Rc::new(RefCell::new(frame)))?;

        if function.is_initializer {
            // The bound `this` frame sits directly above the body frame.
            let line = function.name.map_or(0, |name| name.line);
            return Environment::get_at(&function.closure, 0, "this", line);
        }

        match flow {
            Flow::Returning(value) => Ok(value),
            Flow::Normal => Ok(Value::Nil),
        }
    }

    fn instantiate(
        &mut self,
        class: Rc<Class<'a>>,
        arguments: Vec<Value<'a>>,
    ) -> Result<Value<'a>> {
        let instance = Rc::new(RefCell::new(Instance::new(Rc::clone(&class))));

        if let Some(init) = class.find_method("init") {
            let bound = Rc::new(init.bind(Rc::clone(&instance)));
            self.call_function(&bound, arguments)?;
        }

        Ok(Value::Instance(instance))
    }

    /// `object.name`: own fields first, then the class method table and its
    /// superclass chain; methods are bound to the receiver, getters run
    /// immediately.  On a class value, only the static table is consulted.
    fn property_access(&mut self, object: &'a Expr<'a>, name: &'a Token<'a>) -> Result<Value<'a>> {
        let object_val = self.evaluate(object)?;

        match object_val {
            Value::Instance(instance) => {
                let field = instance.borrow().fields.get(name.lexeme).cloned();
                if let Some(value) = field {
                    return Ok(value);
                }

                let method = instance.borrow().class.find_method(name.lexeme);
                if let Some(method) = method {
                    let bound = Rc::new(method.bind(Rc::clone(&instance)));

                    if bound.is_getter {
                        return self.call_function(&bound, Vec::new());
                    }

                    return Ok(Value::Function(bound));
                }

                Err(VesperError::runtime(
                    name.line,
                    format!("Undefined property '{}'", name.lexeme),
                ))
            }

            Value::Class(class) => class
                .find_static(name.lexeme)
                .map(Value::Function)
                .ok_or_else(|| {
                    VesperError::runtime(
                        name.line,
                        format!("Undefined property '{}'", name.lexeme),
                    )
                }),

            other => Err(VesperError::runtime(
                name.line,
                format!("Only instances have properties, got {}", other),
            )),
        }
    }

    /// `super.method`: the superclass comes from the statically captured
    /// `super` slot, the receiver from the `this` frame directly inside it,
    /// so dispatch lands on the declaring class's parent while `this` keeps
    /// pointing at the original receiver.
    fn super_access(
        &mut self,
        keyword: &'a Token<'a>,
        method: &'a Token<'a>,
        id: ExprId,
    ) -> Result<Value<'a>> {
        let distance = *self.locals.get(&id).ok_or_else(|| {
            VesperError::runtime(keyword.line, "Unresolved 'super' reference")
        })?;

        let superclass = match Environment::get_at(&self.environment, distance, "super", keyword.line)? {
            Value::Class(class) => class,
            _ => {
                return Err(VesperError::runtime(
                    keyword.line,
                    "'super' does not refer to a class",
                ));
            }
        };

        let object = match Environment::get_at(&self.environment, distance - 1, "this", keyword.line)? {
            Value::Instance(instance) => instance,
            _ => {
                return Err(VesperError::runtime(
                    keyword.line,
                    "'this' does not refer to an instance",
                ));
            }
        };

        let found = superclass.find_method(method.lexeme).ok_or_else(|| {
            VesperError::runtime(
                method.line,
                format!("Undefined property '{}'", method.lexeme),
            )
        })?;

        let bound = Rc::new(found.bind(object));

        if bound.is_getter {
            return self.call_function(&bound, Vec::new());
        }

        Ok(Value::Function(bound))
    }
}

// ───────────────────────── free helpers ───────────────────────────

/// `nil` and `false` are falsy; every other value (including `0` and the
/// empty string) is truthy.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Nil => false,
        Value::Bool(b) => *b,
        _ => true,
    }
}

fn numeric_operands<'a>(
    operator: &Token<'_>,
    left: Value<'a>,
    right: Value<'a>,
) -> Result<(f64, f64)> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((a, b)),
        (l, r) => Err(VesperError::runtime(
            operator.line,
            format!(
                "Operands of '{}' must be numbers, got {} and {}",
                operator.lexeme, l, r
            ),
        )),
    }
}

/// Best line to report a bad superclass at: the superclass name token when
/// the clause is the usual bare identifier, else the class name.
fn superclass_line(expr: &Expr<'_>, class_name: &Token<'_>) -> usize {
    match expr {
        Expr::Variable { name, .. } => name.line,
        _ => class_name.line,
    }
}

fn check_arity(expected: usize, actual: usize, paren: &Token<'_>) -> Result<()> {
    if expected != actual {
        return Err(VesperError::runtime(
            paren.line,
            format!("Expected {} arguments but got {}", expected, actual),
        ));
    }

    Ok(())
}
