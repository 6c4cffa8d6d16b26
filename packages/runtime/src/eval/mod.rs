//! Expression evaluation.
//!
//! Source text is compiled once per [`Evaluator`] and cached by text; a
//! compile failure is cached too so a broken binding is reported once per
//! evaluation but never re-parsed. The `evaluate`/`execute`/`assign` entry
//! points log failures and never propagate them; the `try_` variants return
//! the error for callers that need it.

mod builtins;

use crate::dom::NodeRef;
use crate::error::{EvalError, EvalResult};
use crate::reactive::{Callable, ReactiveObject, Value};
use crate::scope::Scope;
use builtins::{binary_op, get_index, get_member, global, set_index, set_member};
use indexmap::IndexMap;
use petal_parser::{
    parse_expression, parse_statements, ArrowBody, AssignOp, BinaryOp, Expression, LogicalOp,
    Program, Span, TemplatePart, UnaryOp, UpdateOp,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::{debug, warn};

const MAX_CALL_DEPTH: usize = 64;

thread_local! {
    static CALL_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Whether `name` resolves to a built-in (`Math`, `JSON`, `parseInt`, ...)
/// when no scope frame defines it
pub fn is_global(name: &str) -> bool {
    global(name).is_some()
}

/// What an expression can see besides its scope chain
#[derive(Clone)]
pub struct Env {
    pub scope: Scope,
    pub el: Option<NodeRef>,
    pub event: Value,
}

impl Env {
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            el: None,
            event: Value::Undefined,
        }
    }

    pub fn with_el(mut self, el: NodeRef) -> Self {
        self.el = Some(el);
        self
    }

    pub fn with_event(mut self, event: Value) -> Self {
        self.event = event;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Mode {
    Expression,
    Statements,
}

#[derive(Debug)]
enum Compiled {
    Expression(Expression),
    Statements(Program),
}

pub struct Evaluator {
    cache: RefCell<IndexMap<(Mode, String), EvalResult<Rc<Compiled>>>>,
    capacity: usize,
}

impl Evaluator {
    /// `capacity` bounds the compiled-expression cache; 0 disables caching
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: RefCell::new(IndexMap::new()),
            capacity,
        }
    }

    fn compile(&self, mode: Mode, source: &str) -> EvalResult<Rc<Compiled>> {
        let key = (mode, source.to_string());
        if let Some(hit) = self.cache.borrow().get(&key) {
            return hit.clone();
        }

        let compiled = match mode {
            Mode::Expression => parse_expression(source).map(Compiled::Expression),
            Mode::Statements => parse_statements(source).map(Compiled::Statements),
        }
        .map(Rc::new)
        .map_err(EvalError::from);

        if let Err(err) = &compiled {
            debug!(expression = source, error = %err, "Expression failed to compile");
        }

        if self.capacity > 0 {
            let mut cache = self.cache.borrow_mut();
            if cache.len() >= self.capacity {
                cache.shift_remove_index(0);
            }
            cache.insert(key, compiled.clone());
        }
        compiled
    }

    /// Compile without evaluating
    pub fn check(&self, source: &str) -> EvalResult<()> {
        self.compile(Mode::Expression, source).map(|_| ())
    }

    /// Whether `source` is a bare property path such as `save` or `todo.remove`
    pub fn is_simple_path(&self, source: &str) -> bool {
        match self.compile(Mode::Expression, source) {
            Ok(compiled) => {
                matches!(&*compiled, Compiled::Expression(expr) if expr.is_simple_path())
            }
            Err(_) => false,
        }
    }

    pub fn try_evaluate(&self, env: &Env, source: &str) -> EvalResult<Value> {
        run(env, &*self.compile(Mode::Expression, source)?)
    }

    pub fn evaluate(&self, env: &Env, source: &str) -> Value {
        self.try_evaluate(env, source).unwrap_or_else(|err| {
            warn!(expression = source, error = %err, "Expression evaluation failed");
            Value::Undefined
        })
    }

    /// Run `;`-separated statements, returning the last statement's value
    pub fn try_execute(&self, env: &Env, source: &str) -> EvalResult<Value> {
        run(env, &*self.compile(Mode::Statements, source)?)
    }

    pub fn execute(&self, env: &Env, source: &str) -> Value {
        self.try_execute(env, source).unwrap_or_else(|err| {
            warn!(statements = source, error = %err, "Statement execution failed");
            Value::Undefined
        })
    }

    /// Store `value` into the location `target` names (`name`, `a.b`, `list[i]`)
    pub fn try_assign(&self, env: &Env, target: &str, value: Value) -> EvalResult<()> {
        let compiled = self.compile(Mode::Expression, target)?;
        match &*compiled {
            Compiled::Expression(expr) if expr.is_assignable() => assign(env, expr, value),
            Compiled::Expression(expr) => Err(EvalError::InvalidAssignment { span: expr.span() }),
            Compiled::Statements(_) => Err(EvalError::InvalidAssignment {
                span: Span::new(0, target.len()),
            }),
        }
    }

    pub fn assign(&self, env: &Env, target: &str, value: Value) {
        if let Err(err) = self.try_assign(env, target, value) {
            warn!(target, error = %err, "Assignment failed");
        }
    }

    pub fn clear(&self) {
        self.cache.borrow_mut().clear();
    }

    pub fn len(&self) -> usize {
        self.cache.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn run(env: &Env, compiled: &Compiled) -> EvalResult<Value> {
    match compiled {
        Compiled::Expression(expr) => eval(env, expr),
        Compiled::Statements(program) => run_program(env, program),
    }
}

fn run_program(env: &Env, program: &Program) -> EvalResult<Value> {
    let mut last = Value::Undefined;
    for statement in &program.statements {
        last = eval(env, statement)?;
    }
    Ok(last)
}

pub(crate) fn call_function(function: &Callable, args: &[Value], span: Span) -> EvalResult<Value> {
    let depth = CALL_DEPTH.with(|d| {
        let next = d.get() + 1;
        d.set(next);
        next
    });
    let result = if depth > MAX_CALL_DEPTH {
        Err(EvalError::StackOverflow { span })
    } else {
        function.call(args)
    };
    CALL_DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
    result
}

fn eval(env: &Env, expr: &Expression) -> EvalResult<Value> {
    match expr {
        Expression::Number { value, .. } => Ok(Value::Number(*value)),
        Expression::String { value, .. } => Ok(Value::String(value.clone())),
        Expression::Boolean { value, .. } => Ok(Value::Bool(*value)),
        Expression::Null { .. } => Ok(Value::Null),
        Expression::Undefined { .. } => Ok(Value::Undefined),
        Expression::Identifier { name, span } => resolve(env, name, *span),
        Expression::Template { parts, .. } => {
            let mut out = String::new();
            for part in parts {
                match part {
                    TemplatePart::Literal(text) => out.push_str(text),
                    TemplatePart::Expression(expr) => out.push_str(&eval(env, expr)?.to_js_string()),
                }
            }
            Ok(Value::String(out))
        }
        Expression::Array { elements, .. } => {
            let items = elements
                .iter()
                .map(|element| eval(env, element))
                .collect::<EvalResult<Vec<_>>>()?;
            Ok(Value::array(items))
        }
        Expression::Object { properties, .. } => {
            let object = ReactiveObject::new();
            for property in properties {
                object.set(&property.key, eval(env, &property.value)?);
            }
            Ok(Value::Object(object))
        }
        Expression::Member { .. } | Expression::Index { .. } | Expression::Call { .. } => {
            Ok(eval_chain(env, expr)?.unwrap_or_default())
        }
        Expression::Unary {
            operator, operand, ..
        } => match operator {
            UnaryOp::Not => Ok(Value::Bool(!eval(env, operand)?.is_truthy())),
            UnaryOp::Negate => Ok(Value::Number(-eval(env, operand)?.to_number())),
            UnaryOp::Plus => Ok(Value::Number(eval(env, operand)?.to_number())),
            UnaryOp::Typeof => match eval(env, operand) {
                Ok(value) => Ok(Value::from(value.type_of())),
                Err(EvalError::ReferenceError { .. })
                    if matches!(operand.as_ref(), Expression::Identifier { .. }) =>
                {
                    Ok(Value::from("undefined"))
                }
                Err(err) => Err(err),
            },
        },
        Expression::Binary {
            left,
            operator,
            right,
            ..
        } => {
            let left = eval(env, left)?;
            let right = eval(env, right)?;
            Ok(binary_op(*operator, &left, &right))
        }
        Expression::Logical {
            left,
            operator,
            right,
            ..
        } => {
            let left = eval(env, left)?;
            let short_circuit = match operator {
                LogicalOp::And => !left.is_truthy(),
                LogicalOp::Or => left.is_truthy(),
                LogicalOp::Nullish => !left.is_nullish(),
            };
            if short_circuit {
                Ok(left)
            } else {
                eval(env, right)
            }
        }
        Expression::Conditional {
            test,
            consequent,
            alternate,
            ..
        } => {
            if eval(env, test)?.is_truthy() {
                eval(env, consequent)
            } else {
                eval(env, alternate)
            }
        }
        Expression::Assign {
            target,
            operator,
            value,
            ..
        } => {
            let next = match operator {
                AssignOp::Assign => eval(env, value)?,
                compound => {
                    let current = eval(env, target)?;
                    let rhs = eval(env, value)?;
                    let op = match compound {
                        AssignOp::Subtract => BinaryOp::Subtract,
                        AssignOp::Multiply => BinaryOp::Multiply,
                        AssignOp::Divide => BinaryOp::Divide,
                        AssignOp::Add | AssignOp::Assign => BinaryOp::Add,
                    };
                    binary_op(op, &current, &rhs)
                }
            };
            assign(env, target, next.clone())?;
            Ok(next)
        }
        Expression::Update {
            target,
            operator,
            prefix,
            ..
        } => {
            let old = eval(env, target)?.to_number();
            let new = match operator {
                UpdateOp::Increment => old + 1.0,
                UpdateOp::Decrement => old - 1.0,
            };
            assign(env, target, Value::Number(new))?;
            Ok(Value::Number(if *prefix { new } else { old }))
        }
        Expression::Arrow { params, body, .. } => Ok(make_arrow(env, params, body)),
    }
}

/// Member/index/call chains. `None` means an optional link (`?.`) hit a
/// nullish value and the rest of the chain is skipped.
fn eval_chain(env: &Env, expr: &Expression) -> EvalResult<Option<Value>> {
    match expr {
        Expression::Member {
            object,
            property,
            optional,
            span,
        } => {
            let Some(target) = eval_chain(env, object)? else {
                return Ok(None);
            };
            if *optional && target.is_nullish() {
                return Ok(None);
            }
            get_member(&target, property, *span).map(Some)
        }
        Expression::Index {
            object,
            index,
            span,
        } => {
            let Some(target) = eval_chain(env, object)? else {
                return Ok(None);
            };
            let key = eval(env, index)?;
            get_index(&target, &key, *span).map(Some)
        }
        Expression::Call {
            callee,
            arguments,
            span,
        } => {
            let Some(function) = eval_chain(env, callee)? else {
                return Ok(None);
            };
            let args = arguments
                .iter()
                .map(|arg| eval(env, arg))
                .collect::<EvalResult<Vec<_>>>()?;
            match function {
                Value::Function(function) => call_function(&function, &args, *span).map(Some),
                _ => Err(EvalError::type_error(
                    format!("{} is not a function", describe(callee)),
                    *span,
                )),
            }
        }
        other => eval(env, other).map(Some),
    }
}

fn describe(expr: &Expression) -> String {
    match expr {
        Expression::Identifier { name, .. } => name.clone(),
        Expression::Member {
            object, property, ..
        } => format!("{}.{}", describe(object), property),
        Expression::Index { object, .. } => format!("{}[...]", describe(object)),
        _ => "expression".to_string(),
    }
}

fn resolve(env: &Env, name: &str, span: Span) -> EvalResult<Value> {
    match name {
        "$el" => return Ok(env.el.clone().map(Value::Node).unwrap_or_default()),
        "$event" => return Ok(env.event.clone()),
        "$refs" => return Ok(env.scope.refs()),
        _ => {}
    }
    if let Some(value) = env.scope.lookup(name) {
        return Ok(value);
    }
    match name {
        "NaN" => Ok(Value::Number(f64::NAN)),
        "Infinity" => Ok(Value::Number(f64::INFINITY)),
        _ => global(name).ok_or_else(|| EvalError::reference(name, span)),
    }
}

fn assign(env: &Env, target: &Expression, value: Value) -> EvalResult<()> {
    match target {
        Expression::Identifier { name, .. } => {
            env.scope.set(name, value);
            Ok(())
        }
        Expression::Member {
            object,
            property,
            span,
            ..
        } => {
            let object = eval(env, object)?;
            set_member(&object, property, value, *span)
        }
        Expression::Index {
            object,
            index,
            span,
        } => {
            let object = eval(env, object)?;
            let key = eval(env, index)?;
            set_index(&object, &key, value, *span)
        }
        other => Err(EvalError::InvalidAssignment { span: other.span() }),
    }
}

fn make_arrow(env: &Env, params: &[String], body: &ArrowBody) -> Value {
    let env = env.clone();
    let params = params.to_vec();
    let body = Rc::new(body.clone());
    Value::function(move |args| {
        let frame = ReactiveObject::new();
        for (i, param) in params.iter().enumerate() {
            frame.set(param, args.get(i).cloned().unwrap_or_default());
        }
        let local = Env {
            scope: env.scope.child(frame),
            ..env.clone()
        };
        match body.as_ref() {
            ArrowBody::Expression(expr) => eval(&local, expr),
            ArrowBody::Block(program) => run_program(&local, program).map(|_| Value::Undefined),
        }
    })
}
