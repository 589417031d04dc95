//! Local-variable analysis for one function body (the top level counts as
//! a function without parameters).
//!
//! A local is any name bound by plain `=`, by a `for` header, by `catch`
//! or by a `fn` inside a nested block. Parameters, `outer` names and the
//! names of `fn`s at the top of the body are never locals. Nested `fn`
//! bodies are analysed separately.

use super::ast::{Else, Expr, If, Stmt};

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Scope {
    /// Locals in order of first binding, each exactly once.
    pub locals: Vec<String>,
}

#[derive(Default)]
struct Collector<'a> {
    bound: Vec<&'a str>,
    excluded: Vec<&'a str>,
    nesting: usize,
}

impl<'a> Collector<'a> {
    fn bind(&mut self, name: &'a str) {
        if !self.bound.contains(&name) {
            self.bound.push(name);
        }
    }

    fn block(&mut self, body: &'a [Stmt]) {
        self.nesting += 1;
        for stmt in body {
            self.stmt(stmt);
        }
        self.nesting -= 1;
    }

    fn stmt(&mut self, stmt: &'a Stmt) {
        match stmt {
            Stmt::Expr(e) | Stmt::Return(e) | Stmt::Throw(e) => self.expr(e),
            Stmt::Assert { cond, .. } => self.expr(cond),
            Stmt::If(node) => self.if_chain(node),
            Stmt::While { cond, body } | Stmt::DoWhile { cond, body } => {
                self.expr(cond);
                self.block(body);
            }
            Stmt::For {
                var,
                iterable,
                body,
            } => {
                self.bind(var);
                self.expr(iterable);
                self.block(body);
            }
            Stmt::ForIndexed {
                index,
                element,
                iterable,
                body,
            } => {
                self.bind(index);
                self.bind(element);
                self.expr(iterable);
                self.block(body);
            }
            Stmt::Case { subject, arms } => {
                self.expr(subject);
                for arm in arms {
                    arm.patterns.iter().for_each(|p| self.expr(p));
                    self.block(&arm.body);
                }
            }
            Stmt::Fn(def) if self.nesting == 0 => self.excluded.push(&def.name),
            Stmt::Fn(def) => self.bind(&def.name),
            Stmt::Outer(names) => self.excluded.extend(names.iter().map(String::as_str)),
            Stmt::Try { body, var, handler } => {
                self.block(body);
                self.bind(var);
                self.block(handler);
            }
            Stmt::Break | Stmt::Continue => {}
        }
    }

    fn if_chain(&mut self, node: &'a If) {
        self.expr(&node.cond);
        self.block(&node.then_block);
        match &node.else_branch {
            Some(Else::If(next)) => self.if_chain(next),
            Some(Else::Block(body)) => self.block(body),
            None => {}
        }
    }

    fn expr(&mut self, e: &'a Expr) {
        match e {
            Expr::Ident(_) | Expr::Number(_) | Expr::Str(_) | Expr::Undefined => {}
            Expr::Assign { op, target, value } => {
                if let (None, Expr::Ident(name)) = (op, target.as_ref()) {
                    self.bind(name);
                } else {
                    self.expr(target);
                }
                self.expr(value);
            }
            Expr::Unary { operand, .. } => self.expr(operand),
            Expr::Binary { lhs, rhs, .. } => {
                self.expr(lhs);
                self.expr(rhs);
            }
            Expr::Call { callee, args } => {
                self.expr(callee);
                args.iter().for_each(|a| self.expr(a));
            }
            Expr::Index { target, index } => {
                self.expr(target);
                self.expr(index);
            }
            Expr::Slice { target, start, end } => {
                self.expr(target);
                self.expr(start);
                self.expr(end);
            }
            Expr::Map(entries) => {
                for (k, v) in entries {
                    self.expr(k);
                    self.expr(v);
                }
            }
            Expr::List(items) => items.iter().for_each(|i| self.expr(i)),
        }
    }
}

impl Scope {
    pub fn analyze(params: &[String], body: &[Stmt]) -> Self {
        let mut c = Collector::default();
        for stmt in body {
            c.stmt(stmt);
        }

        let locals = c
            .bound
            .into_iter()
            .filter(|name| !params.iter().any(|p| p == name))
            .filter(|name| !c.excluded.contains(name))
            .map(str::to_string)
            .collect();
        Scope { locals }
    }
}
