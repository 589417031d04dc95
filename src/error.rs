//! Error types shared by the lexer, the parser and the interpreter.
//!
//! Compile errors are fatal for the file being compiled: the first one
//! raised aborts lexing/parsing and is handed back to the driver.

use std::fmt;

/// A fatal lexical or syntax error with its source position.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("{file}:{line}: {near}: {kind}")]
pub struct CompileError {
    pub file: String,
    pub line: usize,
    /// Offending character or token text, already quoted for display.
    pub near: String,
    pub kind: CompileErrorKind,
}

impl CompileError {
    pub fn new(file: &str, line: usize, near: &str, kind: CompileErrorKind) -> Self {
        Self {
            file: file.to_string(),
            line,
            near: quote_near(near),
            kind,
        }
    }
}

fn quote_near(text: &str) -> String {
    match text {
        " " => "end of file".to_string(),
        "\n" => "newline".to_string(),
        t => format!("'{t}'"),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CompileErrorKind {
    Lexical(LexErrorKind),
    /// Names the thing that was expected.
    Syntax(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum LexErrorKind {
    UnterminatedString,
    UnexpectedCharacter(char),
    MalformedNumber,
}

impl fmt::Display for CompileErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileErrorKind::Lexical(LexErrorKind::UnterminatedString) => {
                write!(f, "unterminated string")
            }
            CompileErrorKind::Lexical(LexErrorKind::UnexpectedCharacter(c)) => {
                write!(f, "unexpected character {c:?}")
            }
            CompileErrorKind::Lexical(LexErrorKind::MalformedNumber) => {
                write!(f, "malformed number")
            }
            CompileErrorKind::Syntax(msg) => write!(f, "{msg}"),
        }
    }
}

/// Errors raised while interpreting a program.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RuntimeError {
    #[error("uncaught exception: {0}")]
    Thrown(String),
    #[error("{0}: assertion failed")]
    AssertFailed(String),
    #[error("{0} is not defined")]
    Undefined(String),
    #[error("{0} is not a function")]
    NotCallable(String),
    #[error("cannot {op} {ty}")]
    Type { op: String, ty: String },
    #[error("range step cannot be zero")]
    ZeroStep,
    /// Same text as the RangeError JavaScript engines raise.
    #[error("Maximum call stack size exceeded")]
    StackOverflow,
    #[error("write failed: {0}")]
    Io(String),
}

impl From<std::io::Error> for RuntimeError {
    fn from(e: std::io::Error) -> Self {
        RuntimeError::Io(e.to_string())
    }
}
