use std::path::PathBuf;

use crate::processor::ast::Stmt;

/// Output file used when a single input is compiled without `-o`.
pub const DEFAULT_OUTPUT: &str = "a.mjs";

/// Extension given to each output when several inputs are compiled at once.
pub const OUTPUT_EXTENSION: &str = "mjs";

/// Dialect and code generation switches shared by every pipeline stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileOptions {
    /// The last expression statement of a function body becomes its
    /// return value.
    pub implicit_return: bool,
    /// Accept `$` as an identifier character.
    pub dollar_identifiers: bool,
}

/// One source file as it comes out of the loader.
///
/// `text` always ends in a newline.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    pub path: PathBuf,
    /// Name used in diagnostics.
    pub name: String,
    pub text: String,
}

/// Fully processed output handed to `writer`.
#[derive(Debug, Clone)]
pub struct CompiledUnit {
    pub name: String,
    pub program: Vec<Stmt>,
    /// Generated module body, without the runtime preamble.
    pub code: String,
}
