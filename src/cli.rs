use clap::Parser;
use std::path::PathBuf;

use crate::model::CompileOptions;

/// Compile Verbena scripts to JavaScript modules.
#[derive(Parser, Debug)]
#[command(name = "verbena", author, version, about)]
pub struct Cli {
    /// Input .va source files
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output file (one input, default a.mjs) or directory (several inputs,
    /// default the current directory)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Return the value of the last expression statement of every function
    #[arg(long)]
    pub implicit_return: bool,

    /// Allow `$` in identifiers
    #[arg(long)]
    pub dollar_identifiers: bool,

    /// Also write the parsed program as JSON to <output>.ast.json
    #[arg(long)]
    pub emit_ast: bool,

    /// Interpret the inputs instead of compiling them
    #[arg(long)]
    pub run: bool,
}

impl Cli {
    pub fn options(&self) -> CompileOptions {
        CompileOptions {
            implicit_return: self.implicit_return,
            dollar_identifiers: self.dollar_identifiers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_map_to_options() {
        let cli = Cli::try_parse_from([
            "verbena",
            "--implicit-return",
            "--dollar-identifiers",
            "-o",
            "out.mjs",
            "main.va",
        ])
        .unwrap();

        assert_eq!(cli.inputs, vec![PathBuf::from("main.va")]);
        assert_eq!(cli.output, Some(PathBuf::from("out.mjs")));
        assert_eq!(
            cli.options(),
            CompileOptions {
                implicit_return: true,
                dollar_identifiers: true,
            }
        );
        assert!(!cli.run && !cli.emit_ast);
    }

    #[test]
    fn test_inputs_are_required() {
        assert!(Cli::try_parse_from(["verbena"]).is_err());
    }
}
