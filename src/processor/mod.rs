//! Component 3 – the functional core.
//!
//! Source text is lexed and parsed into an AST, which is then either
//! lowered to JavaScript or run directly by the reference interpreter.
pub mod ast;
pub mod builtins;
pub mod codegen;
pub mod lexer;
pub mod scope;
pub mod script_parser;
pub mod value;
pub mod vm;

use std::io::Write;
use std::thread;

use anyhow::{Context, Result};
use tracing::debug;

use crate::error::{CompileError, RuntimeError};
use crate::model::{CompileOptions, CompiledUnit, SourceUnit};

/// Parses and compiles one file. Nothing is shared between calls.
pub fn compile(unit: &SourceUnit, options: &CompileOptions) -> Result<CompiledUnit, CompileError> {
    let program = script_parser::parse(&unit.name, &unit.text, options)?;
    debug!(file = %unit.name, statements = program.len(), "parsed");

    let code = codegen::generate(&unit.name, &program, options);
    debug!(file = %unit.name, bytes = code.len(), "generated");

    Ok(CompiledUnit {
        name: unit.name.clone(),
        program,
        code,
    })
}

/// Deep Verbena recursion needs far more native stack than a default
/// thread has.
const INTERPRETER_STACK: usize = 512 * 1024 * 1024;

/// Parses one file and runs it with the reference interpreter on a
/// thread of its own.
pub fn interpret(
    unit: &SourceUnit,
    options: &CompileOptions,
    out: &mut (dyn Write + Send),
    err: &mut (dyn Write + Send),
) -> Result<()> {
    let program = script_parser::parse(&unit.name, &unit.text, options)?;
    debug!(file = %unit.name, statements = program.len(), "parsed");

    let outcome: Result<Result<(), RuntimeError>> = thread::scope(|s| {
        let handle = thread::Builder::new()
            .name("interpreter".to_string())
            .stack_size(INTERPRETER_STACK)
            .spawn_scoped(s, || {
                vm::Interpreter::new(&unit.name, options, out, err).run(&program)
            })
            .context("cannot start the interpreter thread")?;
        match handle.join() {
            Ok(result) => Ok(result),
            Err(panic) => std::panic::resume_unwind(panic),
        }
    });
    outcome??;
    Ok(())
}
