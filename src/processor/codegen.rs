//! Lowers the AST to JavaScript module text.
//!
//! Each function body (and the top level) starts with its parameter
//! guards and one `let` per local from [`Scope::analyze`], so every name is
//! declared before any emitted statement touches it.

use super::ast::{BinaryOp, CaseArm, Else, Expr, FnDef, If, Stmt};
use super::scope::Scope;
use crate::model::CompileOptions;

const INDENT: &str = "    ";

/// JavaScript words that cannot be used as plain identifiers, plus the
/// globals generated code refers to. `true`, `false` and `null` are left
/// alone because they mean the same thing in both languages.
const RESERVED: &[&str] = &[
    "Map", "Math", "arguments", "await", "class", "const", "debugger", "default", "delete", "do",
    "enum", "eval", "export", "extends", "finally", "function", "implements", "import", "in",
    "instanceof", "interface", "let", "new", "package", "private", "protected", "public",
    "static", "super", "switch", "this", "typeof", "undefined", "var", "void", "with", "yield",
];

/// Identifier as it appears in the output.
///
/// Names the compiler itself introduces (`_e`, `_loop1`, the preamble's
/// `_get`) start with `_` and never end with one. A user name that could
/// clash, being reserved or starting or ending with `_`, gets a trailing
/// `_`, so distinct names stay distinct.
pub fn mangle(name: &str) -> String {
    if RESERVED.contains(&name) || name.starts_with('_') || name.ends_with('_') {
        format!("{name}_")
    } else {
        name.to_string()
    }
}

/// Compiles a whole program into module text, without the runtime preamble.
pub fn generate(file: &str, program: &[Stmt], options: &CompileOptions) -> String {
    let mut g = Codegen::new(file, options);
    g.compile_function_body(&[], program, true);
    g.out
}

pub struct Codegen<'a> {
    options: &'a CompileOptions,
    file: &'a str,
    out: String,
    indent: usize,
    /// Labels of the loops enclosing the current statement, innermost last.
    loops: Vec<String>,
    label_count: usize,
}

impl<'a> Codegen<'a> {
    pub fn new(file: &'a str, options: &'a CompileOptions) -> Self {
        Self {
            options,
            file,
            out: String::new(),
            indent: 0,
            loops: Vec::new(),
            label_count: 0,
        }
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    /// Appends one function body (or the program) to the output.
    pub fn compile_function_body(&mut self, params: &[String], body: &[Stmt], top_level: bool) {
        for p in params {
            let p = mangle(p);
            self.line(&format!("if ({p} === undefined) {p} = null;"));
        }
        for local in Scope::analyze(params, body).locals {
            self.line(&format!("let {} = null;", mangle(&local)));
        }

        let implicit_return = self.options.implicit_return && !top_level;
        for (i, stmt) in body.iter().enumerate() {
            match stmt {
                Stmt::Expr(e) if implicit_return && i + 1 == body.len() => {
                    let e = self.bare(e);
                    self.line(&format!("return {e};"));
                }
                _ => self.stmt(stmt),
            }
        }
    }

    /// A nested block. JavaScript would scope a function declaration to
    /// the block, so each `fn` is assigned to its local on entry instead.
    fn block(&mut self, body: &[Stmt]) {
        self.indent += 1;
        for stmt in body {
            if let Stmt::Fn(def) = stmt {
                self.function(def, true);
            }
        }
        for stmt in body {
            if !matches!(stmt, Stmt::Fn(_)) {
                self.stmt(stmt);
            }
        }
        self.indent -= 1;
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expr(e) => {
                let e = self.bare(e);
                self.line(&format!("{e};"));
            }
            Stmt::If(node) => self.if_chain(node),
            Stmt::While { cond, body } => {
                let label = self.new_label();
                let cond = self.bare(cond);
                self.line(&format!("{label}: while ({cond}) {{"));
                self.loop_body(label, body);
                self.line("}");
            }
            Stmt::DoWhile { cond, body } => {
                let label = self.new_label();
                self.line(&format!("{label}: do {{"));
                self.loop_body(label, body);
                let cond = self.bare(cond);
                self.line(&format!("}} while ({cond});"));
            }
            Stmt::For {
                var,
                iterable,
                body,
            } => {
                let label = self.new_label();
                let iterable = self.bare(iterable);
                self.line(&format!("{label}: for ({} of _iter({iterable})) {{", mangle(var)));
                self.loop_body(label, body);
                self.line("}");
            }
            Stmt::ForIndexed {
                index,
                element,
                iterable,
                body,
            } => {
                let label = self.new_label();
                let iterable = self.bare(iterable);
                self.line(&format!(
                    "{label}: for ([{}, {}] of _entries({iterable})) {{",
                    mangle(index),
                    mangle(element)
                ));
                self.loop_body(label, body);
                self.line("}");
            }
            Stmt::Case { subject, arms } => self.case(subject, arms),
            Stmt::Fn(def) => self.function(def, false),
            Stmt::Return(e) => {
                let e = self.bare(e);
                self.line(&format!("return {e};"));
            }
            Stmt::Outer(_) => {}
            Stmt::Break => self.jump("break"),
            Stmt::Continue => self.jump("continue"),
            Stmt::Assert { cond, line } => {
                let cond = self.bare(cond);
                let at = js_string(&format!("{}:{line}", self.file));
                self.line(&format!("_assert({cond}, {at});"));
            }
            Stmt::Throw(e) => {
                let e = self.bare(e);
                self.line(&format!("throw {e};"));
            }
            Stmt::Try { body, var, handler } => {
                self.line("try {");
                self.block(body);
                self.line("} catch (_e) {");
                self.indent += 1;
                self.line(&format!("{} = _caught(_e);", mangle(var)));
                self.indent -= 1;
                self.block(handler);
                self.line("}");
            }
        }
    }

    /// `else if` chains come out flat however deeply the elifs nest.
    fn if_chain(&mut self, node: &If) {
        let cond = self.bare(&node.cond);
        self.line(&format!("if ({cond}) {{"));
        self.block(&node.then_block);

        let mut rest = &node.else_branch;
        while let Some(branch) = rest {
            match branch {
                Else::If(next) => {
                    let cond = self.bare(&next.cond);
                    self.line(&format!("}} else if ({cond}) {{"));
                    self.block(&next.then_block);
                    rest = &next.else_branch;
                }
                Else::Block(body) => {
                    self.line("} else {");
                    self.block(body);
                    break;
                }
            }
        }
        self.line("}");
    }

    fn new_label(&mut self) -> String {
        self.label_count += 1;
        format!("_loop{}", self.label_count)
    }

    fn loop_body(&mut self, label: String, body: &[Stmt]) {
        self.loops.push(label);
        self.block(body);
        self.loops.pop();
    }

    /// Jumps name their loop so a `break` inside a `case` arm leaves the
    /// loop rather than the `switch`.
    fn jump(&mut self, keyword: &str) {
        let text = match self.loops.last() {
            Some(label) => format!("{keyword} {label};"),
            None => format!("{keyword};"),
        };
        self.line(&text);
    }

    /// Every arm ends in its own `break`, so control never falls into the
    /// next arm.
    fn case(&mut self, subject: &Expr, arms: &[CaseArm]) {
        let subject = self.bare(subject);
        self.line(&format!("switch ({subject}) {{"));
        for arm in arms {
            if arm.is_default() {
                self.line("default: {");
            } else {
                let (last, rest) = match arm.patterns.split_last() {
                    Some(split) => split,
                    None => continue,
                };
                for p in rest {
                    let p = self.bare(p);
                    self.line(&format!("case {p}:"));
                }
                let last = self.bare(last);
                self.line(&format!("case {last}: {{"));
            }
            self.block(&arm.body);
            self.indent += 1;
            self.line("break;");
            self.indent -= 1;
            self.line("}");
        }
        self.line("}");
    }

    fn function(&mut self, def: &FnDef, nested: bool) {
        let name = mangle(&def.name);
        let params: Vec<String> = def.params.iter().map(|p| mangle(p)).collect();
        let params = params.join(", ");
        if nested {
            self.line(&format!("{name} = function {name}({params}) {{"));
        } else {
            self.line(&format!("function {name}({params}) {{"));
        }

        let outer_loops = std::mem::take(&mut self.loops);
        self.indent += 1;
        self.compile_function_body(&def.params, &def.body, false);
        self.indent -= 1;
        self.loops = outer_loops;

        self.line(if nested { "};" } else { "}" });
    }

    /// Expression in a position where it needs no parentheses of its own:
    /// statements, conditions, arguments and elements.
    fn bare(&self, e: &Expr) -> String {
        self.operation(e).unwrap_or_else(|| self.term(e))
    }

    /// Expression as an operand of another operator.
    fn expr(&self, e: &Expr) -> String {
        match self.operation(e) {
            Some(op) => format!("({op})"),
            None => self.term(e),
        }
    }

    fn list(&self, items: &[Expr]) -> String {
        items
            .iter()
            .map(|e| self.bare(e))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Operator nodes, unparenthesised. `None` for everything else.
    fn operation(&self, e: &Expr) -> Option<String> {
        let text = match e {
            Expr::Unary { op, operand } => format!("{}{}", op.spelling(), self.expr(operand)),
            Expr::Binary { op, lhs, rhs } => {
                let (l, r) = (self.expr(lhs), self.expr(rhs));
                match op {
                    BinaryOp::Eq => format!("_eq({}, {})", self.bare(lhs), self.bare(rhs)),
                    BinaryOp::Ne => format!("!_eq({}, {})", self.bare(lhs), self.bare(rhs)),
                    BinaryOp::FloorDiv => format!("Math.floor({l} / {r})"),
                    op => format!("{l} {} {r}", op.spelling()),
                }
            }
            Expr::Assign { op, target, value } => self.assign(*op, target, value),
            _ => return None,
        };
        Some(text)
    }

    fn assign(&self, op: Option<BinaryOp>, target: &Expr, value: &Expr) -> String {
        match (target, op) {
            (Expr::Index { target, index }, None) => {
                format!("_set({}, {}, {})", self.bare(target), self.bare(index), self.bare(value))
            }
            (Expr::Index { target, index }, Some(op)) => {
                let (t, i) = (self.bare(target), self.bare(index));
                let v = self.expr(value);
                format!("_update({t}, {i}, (_v) => _v {} {v})", op.spelling())
            }
            (target, None) => format!("{} = {}", self.expr(target), self.bare(value)),
            (target, Some(op)) => {
                format!("{} {}= {}", self.expr(target), op.spelling(), self.bare(value))
            }
        }
    }

    fn term(&self, e: &Expr) -> String {
        match e {
            Expr::Ident(name) => mangle(name),
            Expr::Number(text) | Expr::Str(text) => text.clone(),
            Expr::Undefined => "undefined".to_string(),
            Expr::Call { callee, args } => format!("{}({})", self.expr(callee), self.list(args)),
            Expr::Index { target, index } => {
                format!("_get({}, {})", self.bare(target), self.bare(index))
            }
            Expr::Slice { target, start, end } => format!(
                "_slice({}, {}, {})",
                self.bare(target),
                self.bare(start),
                self.bare(end)
            ),
            Expr::Map(entries) if entries.is_empty() => "new Map()".to_string(),
            Expr::Map(entries) => {
                let pairs: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("[{}, {}]", self.bare(k), self.bare(v)))
                    .collect();
                format!("new Map([{}])", pairs.join(", "))
            }
            Expr::List(items) => format!("[{}]", self.list(items)),
            Expr::Unary { .. } | Expr::Binary { .. } | Expr::Assign { .. } => self.expr(e),
        }
    }
}

/// JavaScript string literal for arbitrary text.
fn js_string(text: &str) -> String {
    serde_json::Value::String(text.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::script_parser::parse;

    fn compile_with(src: &str, options: CompileOptions) -> String {
        let program = parse("test.va", src, &options).unwrap();
        generate("test.va", &program, &options)
    }

    fn compile(src: &str) -> String {
        compile_with(src, CompileOptions::default())
    }

    #[test]
    fn test_expressions() {
        let test_cases = vec![
            ("2 + 3 * 4\n", "2 + (3 * 4);\n"),
            ("(2 + 3) * 4\n", "(2 + 3) * 4;\n"),
            ("2 ** 3 ** 2\n", "2 ** (3 ** 2);\n"),
            ("-x ** 2\n", "(-x) ** 2;\n"),
            ("a == b\n", "_eq(a, b);\n"),
            ("a != b + 1\n", "!_eq(a, b + 1);\n"),
            ("a // b\n", "Math.floor(a / b);\n"),
            ("xs[i]\n", "_get(xs, i);\n"),
            ("o.name\n", "_get(o, \"name\");\n"),
            ("s[:n]\n", "_slice(s, undefined, n);\n"),
            ("{'a': 1, k: [1, 2]}\n", "new Map([['a', 1], [k, [1, 2]]]);\n"),
            ("{}\n", "new Map();\n"),
            ("f(a, b = 1)\n", "f(a, b = 1);\n"),
            ("o.f(1)\n", "_get(o, \"f\")(1);\n"),
            ("x += 1\n", "x += 1;\n"),
            ("xs[0] = 1\n", "_set(xs, 0, 1);\n"),
            ("o.n += 2\n", "_update(o, \"n\", (_v) => _v + 2);\n"),
            ("xs[k()] *= a + 1\n", "_update(xs, k(), (_v) => _v * (a + 1));\n"),
            ("xs : push 1\n", "push(xs, 1);\n"),
            ("class = new\n", "class_ = new_;\n"),
            ("_e = class_\n", "_e_ = class__;\n"),
            ("Math = len_ + _\n", "Math_ = len__ + __;\n"),
        ];

        for (src, expected) in test_cases {
            let out = compile(src);
            let body: String = out
                .lines()
                .filter(|l| !l.starts_with("let "))
                .map(|l| format!("{l}\n"))
                .collect();
            assert_eq!(body, expected, "source: {src:?}");
        }
    }

    #[test]
    fn test_end_to_end_shape() {
        let src = "x = 1\nif x > 0\n  y = 2\nelse\n  y = 3\nend\n";
        let expected = "\
let x = null;
let y = null;
x = 1;
if (x > 0) {
    y = 2;
} else {
    y = 3;
}
";
        assert_eq!(compile(src), expected);
    }

    #[test]
    fn test_elif_chain_is_flat() {
        let src = "if a\n  f()\nelif b\n  g()\nelif c\n  h()\nelse\n  k()\nend\n";
        let expected = "\
if (a) {
    f();
} else if (b) {
    g();
} else if (c) {
    h();
} else {
    k();
}
";
        assert_eq!(compile(src), expected);
    }

    #[test]
    fn test_case_never_falls_through() {
        let src = "\
case n
| 1, 2, 3
  print 'X'
| 4, 5, 6
  print 'Y'
else
  print 'Z'
end
";
        let expected = "\
switch (n) {
case 1:
case 2:
case 3: {
    print('X');
    break;
}
case 4:
case 5:
case 6: {
    print('Y');
    break;
}
default: {
    print('Z');
    break;
}
}
";
        assert_eq!(compile(src), expected);
    }

    #[test]
    fn test_function_declares_each_local_once() {
        let src = "\
fn f(a)
  outer g
  b = a
  g = b
  b = b + 1
  for x : a
    b = x
  end
  return b
end
";
        let out = compile(src);
        let expected = "\
function f(a) {
    if (a === undefined) a = null;
    let b = null;
    let x = null;
    b = a;
    g = b;
    b = b + 1;
    _loop1: for (x of _iter(a)) {
        b = x;
    }
    return b;
}
";
        assert_eq!(out, expected);
        assert_eq!(out.matches("let b").count(), 1);
        assert!(!out.contains("let g"));
        assert!(!out.contains("let a"));
    }

    #[test]
    fn test_loops_and_jumps() {
        let src = "\
while true
  case k
  | 1
    break
  end
  dowhile false
    continue
  end
end
for i, v : xs
end
";
        let expected = "\
let i = null;
let v = null;
_loop1: while (true) {
    switch (k) {
    case 1: {
        break _loop1;
        break;
    }
    }
    _loop2: do {
        continue _loop2;
    } while (false);
}
_loop3: for ([i, v] of _entries(xs)) {
}
";
        assert_eq!(compile(src), expected);
    }

    #[test]
    fn test_assert_throw_try() {
        let src = "try\n  assert x == 1\n  throw 'no'\ncatch e\n  print e\nend\n";
        let expected = "\
let e = null;
try {
    _assert(_eq(x, 1), \"test.va:2\");
    throw 'no';
} catch (_e) {
    e = _caught(_e);
    print(e);
}
";
        assert_eq!(compile(src), expected);
    }

    #[test]
    fn test_implicit_return_is_optional() {
        let src = "fn sq(n)\n  n * n\nend\nsq(2)\n";

        let plain = compile(src);
        assert!(plain.contains("    n * n;\n"));
        assert!(!plain.contains("return"));

        let options = CompileOptions {
            implicit_return: true,
            ..CompileOptions::default()
        };
        let implicit = compile_with(src, options);
        assert!(implicit.contains("    return n * n;\n"));
        // never at the top level
        assert!(implicit.ends_with("sq(2);\n"));
    }

    #[test]
    fn test_fn_in_a_block_is_assigned_on_entry() {
        let src = "\
if a
  x = 1
  fn f(n)
    return n
  end
end
";
        let expected = "\
let x = null;
let f = null;
if (a) {
    f = function f(n) {
        if (n === undefined) n = null;
        return n;
    };
    x = 1;
}
";
        assert_eq!(compile(src), expected);
    }

    #[test]
    fn test_catch_variable_never_meets_the_handler_parameter() {
        let src = "try\n  throw 1\ncatch _e\n  print _e\nend\n";
        let expected = "\
let _e_ = null;
try {
    throw 1;
} catch (_e) {
    _e_ = _caught(_e);
    print(_e_);
}
";
        assert_eq!(compile(src), expected);
    }
}
