pub mod cli;
pub mod error;
pub mod loader;
pub mod model;
pub mod processor;
pub mod writer;

pub use error::{CompileError, RuntimeError};
pub use model::CompileOptions;

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use model::DEFAULT_OUTPUT;

pub fn run() -> Result<()> {
    let args = cli::Cli::parse();
    let options = args.options();

    // 1. ── Load ───────────────────────────────────────────────────────
    let units = args
        .inputs
        .iter()
        .map(|path| loader::load(path))
        .collect::<Result<Vec<_>>>()?;

    if args.run {
        // 2. ── Interpret ──────────────────────────────────────────────
        for unit in &units {
            info!(file = %unit.name, "running");
            processor::interpret(
                unit,
                &options,
                &mut io::stdout(),
                &mut io::stderr(),
            )
            .with_context(|| format!("Running {}", unit.name))?;
        }
        return Ok(());
    }

    // 2. ── Compile ────────────────────────────────────────────────────
    let compiled = units
        .iter()
        .map(|unit| {
            processor::compile(unit, &options).with_context(|| format!("Compiling {}", unit.name))
        })
        .collect::<Result<Vec<_>>>()?;

    // 3. ── Write outputs ──────────────────────────────────────────────
    let single = units.len() == 1;
    let output = match &args.output {
        Some(path) => path.clone(),
        None if single => PathBuf::from(DEFAULT_OUTPUT),
        None => PathBuf::from("."),
    };
    if !single {
        std::fs::create_dir_all(&output)
            .with_context(|| format!("Creating {}", output.display()))?;
    }

    for (unit, c) in units.iter().zip(&compiled) {
        let path = writer::output_path(&unit.path, &output, single);
        writer::js::emit(c, &path).with_context(|| format!("Writing {}", path.display()))?;
        info!(file = %unit.name, output = %path.display(), "module written");

        if args.emit_ast {
            let ast = writer::ast_path(&path);
            writer::ast::emit(c, &ast).with_context(|| format!("Writing {}", ast.display()))?;
        }
    }

    Ok(())
}
