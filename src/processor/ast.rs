//! AST for one source file *before* it is lowered to JavaScript.
//!
//! Every node owns its children; nothing is shared and nothing is mutated
//! once its subtree has been parsed.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnaryOp {
    Not,
    BitNot,
    Neg,
}

impl UnaryOp {
    pub fn spelling(self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
            UnaryOp::Neg => "-",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinaryOp {
    Pow,
    Mul,
    Div,
    Rem,
    FloorDiv,
    Add,
    Sub,
    Shl,
    Shr,
    UShr,
    BitAnd,
    BitXor,
    BitOr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    pub fn spelling(self) -> &'static str {
        match self {
            BinaryOp::Pow => "**",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::FloorDiv => "//",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::UShr => ">>>",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitXor => "^",
            BinaryOp::BitOr => "|",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expr {
    /// Identifier, including the literal words `true`, `false` and `null`.
    Ident(String),
    /// Number text exactly as written.
    Number(String),
    /// Quoted string, quotes and escapes kept verbatim.
    Str(String),
    /// Omitted slice bound, as in `xs[:n]`.
    Undefined,

    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// `target = value`, or `target op= value` when `op` is set.
    Assign {
        op: Option<BinaryOp>,
        target: Box<Expr>,
        value: Box<Expr>,
    },

    /// `callee(args...)`
    Call { callee: Box<Expr>, args: Vec<Expr> },
    /// `target[index]`; `target.name` parses to an index by the string `"name"`.
    Index { target: Box<Expr>, index: Box<Expr> },
    /// `target[start:end]`
    Slice {
        target: Box<Expr>,
        start: Box<Expr>,
        end: Box<Expr>,
    },

    /// `{key: value, ...}`
    Map(Vec<(Expr, Expr)>),
    /// `[a, b, ...]`
    List(Vec<Expr>),
}

impl Expr {
    pub fn null() -> Self {
        Expr::Ident("null".to_string())
    }

    pub fn is_assignable(&self) -> bool {
        matches!(self, Expr::Ident(_) | Expr::Index { .. })
    }
}

/// `if cond ... [elif ... | else ...] end`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct If {
    pub cond: Expr,
    pub then_block: Vec<Stmt>,
    pub else_branch: Option<Else>,
}

/// An `elif` is always an [`Else::If`] holding exactly one nested conditional;
/// a chain of them is a chain of nested nodes, never a flat list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Else {
    Block(Vec<Stmt>),
    If(Box<If>),
}

/// One `| p1, p2` arm of a `case`. No patterns marks the `else` arm.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseArm {
    pub patterns: Vec<Expr>,
    pub body: Vec<Stmt>,
}

impl CaseArm {
    pub fn is_default(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// `fn name(params...) ... end`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FnDef {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Stmt {
    /// Bare expression, including the command form `f a, b`.
    Expr(Expr),

    If(If),

    /// `while cond ... end`
    While { cond: Expr, body: Vec<Stmt> },

    /// `dowhile cond ... end` – body runs before the first test.
    DoWhile { cond: Expr, body: Vec<Stmt> },

    /// `for x : iterable ... end`
    For {
        var: String,
        iterable: Expr,
        body: Vec<Stmt>,
    },

    /// `for i, x : iterable ... end`
    ForIndexed {
        index: String,
        element: String,
        iterable: Expr,
        body: Vec<Stmt>,
    },

    /// `case subject | ... else ... end`
    Case { subject: Expr, arms: Vec<CaseArm> },

    Fn(FnDef),

    /// `return [value]`; a bare `return` carries `null`.
    Return(Expr),

    /// `outer a, b` – names that belong to an enclosing function.
    Outer(Vec<String>),

    Break,
    Continue,

    /// `assert cond`
    Assert { cond: Expr, line: usize },

    /// `throw value`
    Throw(Expr),

    /// `try ... catch name ... end`
    Try {
        body: Vec<Stmt>,
        var: String,
        handler: Vec<Stmt>,
    },
}
