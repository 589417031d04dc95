//! Tree-walking interpreter over the same AST the code generator consumes.
//!
//! Scoping mirrors the emitted JavaScript: every function call gets one
//! frame holding its parameters and the locals from [`Scope::analyze`],
//! all bound to null on entry. A `fn` is bound when the block that
//! contains it is entered: at the top of a body it gets its own binding,
//! inside a nested block it is assigned to the local of that name.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;

use tracing::trace;

use super::ast::{BinaryOp, Else, Expr, FnDef, Stmt};
use super::builtins::{self, Builtin};
use super::scope::Scope;
use super::value::{Closure, Value, parse_number};
use crate::error::RuntimeError;
use crate::model::CompileOptions;

pub type Env = Rc<RefCell<Frame>>;

#[derive(Default)]
pub struct Frame {
    vars: HashMap<String, Value>,
    parent: Option<Env>,
}

impl Frame {
    fn child(parent: &Env) -> Env {
        Rc::new(RefCell::new(Frame {
            vars: HashMap::new(),
            parent: Some(Rc::clone(parent)),
        }))
    }
}

fn declare(env: &Env, name: &str, value: Value) {
    env.borrow_mut().vars.insert(name.to_string(), value);
}

fn lookup(env: &Env, name: &str) -> Option<Value> {
    let frame = env.borrow();
    match frame.vars.get(name) {
        Some(v) => Some(v.clone()),
        None => frame.parent.as_ref().and_then(|p| lookup(p, name)),
    }
}

/// Rebinds an existing variable in the nearest frame that has it.
fn assign(env: &Env, name: &str, value: Value) -> bool {
    let mut frame = env.borrow_mut();
    if let Some(slot) = frame.vars.get_mut(name) {
        *slot = value;
        return true;
    }
    match &frame.parent {
        Some(p) => assign(p, name, value),
        None => false,
    }
}

enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

/// Why evaluation stopped early: a runtime error or a thrown value.
/// Both can be caught by `try`.
enum Unwind {
    Error(RuntimeError),
    Throw(Value),
}

impl From<RuntimeError> for Unwind {
    fn from(e: RuntimeError) -> Self {
        Unwind::Error(e)
    }
}

type Exec<T> = Result<T, Unwind>;

/// Calls deeper than this raise [`RuntimeError::StackOverflow`].
pub const MAX_CALL_DEPTH: usize = 3_000;

pub struct Interpreter<'a> {
    file: &'a str,
    options: &'a CompileOptions,
    out: &'a mut dyn Write,
    err: &'a mut dyn Write,
    env: Env,
    depth: usize,
    max_depth: usize,
}

impl<'a> Interpreter<'a> {
    pub fn new(
        file: &'a str,
        options: &'a CompileOptions,
        out: &'a mut dyn Write,
        err: &'a mut dyn Write,
    ) -> Self {
        let builtins = Rc::new(RefCell::new(Frame::default()));
        for b in Builtin::ALL {
            declare(&builtins, b.name(), Value::Builtin(b));
        }
        let env = Frame::child(&builtins);
        Self {
            file,
            options,
            out,
            err,
            env,
            depth: 0,
            max_depth: MAX_CALL_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Runs a whole program. An uncaught `throw` becomes
    /// [`RuntimeError::Thrown`].
    pub fn run(&mut self, program: &[Stmt]) -> Result<(), RuntimeError> {
        for name in Scope::analyze(&[], program).locals {
            declare(&self.env, &name, Value::Null);
        }
        match self.exec_body(program) {
            Ok(_) => Ok(()),
            Err(Unwind::Error(e)) => Err(e),
            Err(Unwind::Throw(v)) => Err(RuntimeError::Thrown(v.to_string())),
        }
    }

    /// A block nested inside a body: `if` and `case` arms, loop bodies,
    /// `try` and `catch`.
    fn exec_block(&mut self, body: &[Stmt]) -> Exec<Flow> {
        for def in fns(body) {
            let f = self.closure(def);
            self.set_var(&def.name, f)?;
        }
        self.exec_stmts(body)
    }

    fn exec_stmts(&mut self, body: &[Stmt]) -> Exec<Flow> {
        for stmt in body {
            match self.exec(stmt)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn closure(&self, def: &FnDef) -> Value {
        Value::Func(Rc::new(Closure {
            def: def.clone(),
            env: Rc::clone(&self.env),
        }))
    }

    fn exec(&mut self, stmt: &Stmt) -> Exec<Flow> {
        match stmt {
            Stmt::Expr(e) => {
                self.eval(e)?;
            }
            Stmt::If(node) => {
                let mut node = node;
                loop {
                    if self.eval(&node.cond)?.truthy() {
                        return self.exec_block(&node.then_block);
                    }
                    match &node.else_branch {
                        Some(Else::If(next)) => node = &**next,
                        Some(Else::Block(body)) => return self.exec_block(body),
                        None => break,
                    }
                }
            }
            Stmt::While { cond, body } => {
                while self.eval(cond)?.truthy() {
                    match self.exec_block(body)? {
                        Flow::Break => break,
                        Flow::Return(v) => return Ok(Flow::Return(v)),
                        Flow::Normal | Flow::Continue => {}
                    }
                }
            }
            Stmt::DoWhile { cond, body } => loop {
                match self.exec_block(body)? {
                    Flow::Break => break,
                    Flow::Return(v) => return Ok(Flow::Return(v)),
                    Flow::Normal | Flow::Continue => {}
                }
                if !self.eval(cond)?.truthy() {
                    break;
                }
            },
            Stmt::For {
                var,
                iterable,
                body,
            } => {
                for item in self.eval(iterable)?.iter_values()? {
                    self.set_var(var, item)?;
                    match self.exec_block(body)? {
                        Flow::Break => break,
                        Flow::Return(v) => return Ok(Flow::Return(v)),
                        Flow::Normal | Flow::Continue => {}
                    }
                }
            }
            Stmt::ForIndexed {
                index,
                element,
                iterable,
                body,
            } => {
                for (i, item) in self.eval(iterable)?.entries()? {
                    self.set_var(index, i)?;
                    self.set_var(element, item)?;
                    match self.exec_block(body)? {
                        Flow::Break => break,
                        Flow::Return(v) => return Ok(Flow::Return(v)),
                        Flow::Normal | Flow::Continue => {}
                    }
                }
            }
            Stmt::Case { subject, arms } => {
                let subject = self.eval(subject)?;
                for arm in arms {
                    let mut hit = arm.is_default();
                    for p in &arm.patterns {
                        if hit {
                            break;
                        }
                        hit = self.eval(p)?.strict_eq(&subject);
                    }
                    if hit {
                        return self.exec_block(&arm.body);
                    }
                }
            }
            Stmt::Fn(_) | Stmt::Outer(_) => {}
            Stmt::Return(e) => return Ok(Flow::Return(self.eval(e)?)),
            Stmt::Break => return Ok(Flow::Break),
            Stmt::Continue => return Ok(Flow::Continue),
            Stmt::Assert { cond, line } => {
                if !self.eval(cond)?.truthy() {
                    let at = format!("{}:{line}", self.file);
                    return Err(RuntimeError::AssertFailed(at).into());
                }
            }
            Stmt::Throw(e) => return Err(Unwind::Throw(self.eval(e)?)),
            Stmt::Try { body, var, handler } => {
                let caught = match self.exec_block(body) {
                    Ok(flow) => return Ok(flow),
                    Err(Unwind::Throw(v)) => v,
                    Err(Unwind::Error(RuntimeError::Io(e))) => {
                        return Err(RuntimeError::Io(e).into());
                    }
                    Err(Unwind::Error(e)) => Value::Str(e.to_string()),
                };
                self.set_var(var, caught)?;
                return self.exec_block(handler);
            }
        }
        Ok(Flow::Normal)
    }

    fn set_var(&mut self, name: &str, value: Value) -> Exec<()> {
        if assign(&self.env, name, value) {
            Ok(())
        } else {
            Err(RuntimeError::Undefined(name.to_string()).into())
        }
    }

    fn eval(&mut self, e: &Expr) -> Exec<Value> {
        let v = match e {
            Expr::Ident(name) => match name.as_str() {
                "null" => Value::Null,
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                _ => lookup(&self.env, name)
                    .ok_or_else(|| RuntimeError::Undefined(name.clone()))?,
            },
            Expr::Number(text) => match parse_number(text) {
                Some(n) => Value::Num(n),
                None => {
                    return Err(RuntimeError::Type {
                        op: "read number".to_string(),
                        ty: text.clone(),
                    }
                    .into());
                }
            },
            Expr::Str(text) => Value::Str(unquote(text)),
            Expr::Undefined => Value::Null,
            Expr::Unary { op, operand } => Value::unary(*op, &self.eval(operand)?),
            Expr::Binary { op, lhs, rhs } => {
                let l = self.eval(lhs)?;
                match op {
                    BinaryOp::And if !l.truthy() => l,
                    BinaryOp::Or if l.truthy() => l,
                    BinaryOp::And | BinaryOp::Or => self.eval(rhs)?,
                    op => Value::binary(*op, &l, &self.eval(rhs)?),
                }
            }
            Expr::Assign { op, target, value } => self.eval_assign(*op, target, value)?,
            Expr::Call { callee, args } => {
                let f = self.eval(callee)?;
                let mut values = Vec::with_capacity(args.len());
                for a in args {
                    values.push(self.eval(a)?);
                }
                self.call(callee, f, values)?
            }
            Expr::Index { target, index } => {
                let t = self.eval(target)?;
                t.get(&self.eval(index)?)?
            }
            Expr::Slice { target, start, end } => {
                let t = self.eval(target)?;
                let (lo, hi) = (self.eval(start)?, self.eval(end)?);
                t.slice(&lo, &hi)?
            }
            Expr::Map(entries) => {
                let m = Value::map(Vec::with_capacity(entries.len()));
                for (k, v) in entries {
                    let k = self.eval(k)?;
                    let v = self.eval(v)?;
                    m.set(k, v)?;
                }
                m
            }
            Expr::List(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval(item)?);
                }
                Value::list(values)
            }
        };
        Ok(v)
    }

    fn eval_assign(&mut self, op: Option<BinaryOp>, target: &Expr, value: &Expr) -> Exec<Value> {
        match target {
            Expr::Ident(name) => {
                let v = match op {
                    None => self.eval(value)?,
                    Some(op) => {
                        let old = self.eval(target)?;
                        Value::binary(op, &old, &self.eval(value)?)
                    }
                };
                self.set_var(name, v.clone())?;
                Ok(v)
            }
            Expr::Index { target, index } => {
                let t = self.eval(target)?;
                let k = self.eval(index)?;
                let v = match op {
                    None => self.eval(value)?,
                    Some(op) => {
                        let old = t.get(&k)?;
                        Value::binary(op, &old, &self.eval(value)?)
                    }
                };
                Ok(t.set(k, v)?)
            }
            _ => Err(RuntimeError::Type {
                op: "assign to".to_string(),
                ty: "expression".to_string(),
            }
            .into()),
        }
    }

    fn call(&mut self, callee: &Expr, f: Value, args: Vec<Value>) -> Exec<Value> {
        match f {
            Value::Func(closure) => self.call_closure(&closure, args),
            Value::Builtin(b) => Ok(self.call_builtin(b, args)?),
            other => {
                let name = match callee {
                    Expr::Ident(name) => name.clone(),
                    _ => other.type_name().to_string(),
                };
                Err(RuntimeError::NotCallable(name).into())
            }
        }
    }

    fn call_closure(&mut self, closure: &Closure, args: Vec<Value>) -> Exec<Value> {
        let def = &closure.def;
        trace!(name = %def.name, args = args.len(), "call");

        let frame = Frame::child(&closure.env);
        let mut args = args.into_iter();
        for p in &def.params {
            declare(&frame, p, args.next().unwrap_or(Value::Null));
        }
        for name in Scope::analyze(&def.params, &def.body).locals {
            declare(&frame, &name, Value::Null);
        }

        if self.depth >= self.max_depth {
            return Err(RuntimeError::StackOverflow.into());
        }
        self.depth += 1;
        let caller = std::mem::replace(&mut self.env, frame);
        let result = self.exec_body(&def.body);
        self.env = caller;
        self.depth -= 1;

        match result? {
            Flow::Return(v) => Ok(v),
            _ => Ok(Value::Null),
        }
    }

    /// A function body or the whole program. Its `fn`s get bindings of
    /// their own; with implicit return the value of a trailing expression
    /// statement is the result of a function.
    fn exec_body(&mut self, body: &[Stmt]) -> Exec<Flow> {
        for def in fns(body) {
            let f = self.closure(def);
            declare(&self.env, &def.name, f);
        }
        let top_level = self.depth == 0;
        match body.split_last() {
            Some((Stmt::Expr(last), rest)) if self.options.implicit_return && !top_level => {
                match self.exec_stmts(rest)? {
                    Flow::Normal => Ok(Flow::Return(self.eval(last)?)),
                    flow => Ok(flow),
                }
            }
            _ => self.exec_stmts(body),
        }
    }

    fn call_builtin(&mut self, b: Builtin, args: Vec<Value>) -> Result<Value, RuntimeError> {
        let joined = || {
            args.iter()
                .map(|a| a.to_string())
                .collect::<Vec<_>>()
                .join(" ")
        };
        match b {
            Builtin::Print => {
                writeln!(self.out, "{}", joined())?;
                Ok(Value::Null)
            }
            Builtin::Eprint => {
                writeln!(self.err, "{}", joined())?;
                Ok(Value::Null)
            }
            b => builtins::call(b, &args),
        }
    }
}

fn fns(body: &[Stmt]) -> impl Iterator<Item = &FnDef> {
    body.iter().filter_map(|stmt| match stmt {
        Stmt::Fn(def) => Some(def),
        _ => None,
    })
}

/// Contents of a quoted string token, escapes resolved.
fn unquote(text: &str) -> String {
    let inner = text.get(1..text.len().saturating_sub(1)).unwrap_or("");
    let mut s = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            s.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => s.push('\n'),
            Some('t') => s.push('\t'),
            Some('r') => s.push('\r'),
            Some('0') => s.push('\0'),
            Some('b') => s.push('\u{8}'),
            Some('f') => s.push('\u{c}'),
            Some('v') => s.push('\u{b}'),
            Some('x') => {
                let hex: String = chars.by_ref().take(2).collect();
                s.extend(u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32));
            }
            Some('u') => {
                let rest = chars.as_str();
                let (hex, used) = match rest.strip_prefix('{') {
                    Some(braced) => {
                        let end = braced.find('}').unwrap_or(braced.len());
                        (&braced[..end], end + 2)
                    }
                    None => (rest.get(..4).unwrap_or(rest), 4),
                };
                s.extend(u32::from_str_radix(hex, 16).ok().and_then(char::from_u32));
                chars = rest.get(used..).unwrap_or("").chars();
            }
            Some(other) => s.push(other),
            None => {}
        }
    }
    s
}
