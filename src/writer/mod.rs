//! Component 4 – writing results to disk.

pub mod ast;
pub mod js;

use std::path::{Path, PathBuf};

use crate::model::OUTPUT_EXTENSION;

/// Runtime helpers every generated module calls into.
pub const PREAMBLE: &str = include_str!("preamble.mjs");

/// Where the module for `input` goes. With a single input `output` is the
/// file itself; with several it is a directory holding `<stem>.mjs` files.
pub fn output_path(input: &Path, output: &Path, single: bool) -> PathBuf {
    if single {
        return output.to_path_buf();
    }
    let mut name = input.file_stem().unwrap_or(input.as_os_str()).to_owned();
    name.push(".");
    name.push(OUTPUT_EXTENSION);
    output.join(name)
}

/// `<output>.ast.json`, next to the module.
pub fn ast_path(module: &Path) -> PathBuf {
    let mut name = module.as_os_str().to_owned();
    name.push(".ast.json");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::builtins::Builtin;

    #[test]
    fn test_output_paths() {
        let test_cases = vec![
            ("src/main.va", "a.mjs", true, "a.mjs"),
            ("src/main.va", "out", false, "out/main.mjs"),
            ("lib.va", ".", false, "./lib.mjs"),
            ("v1.2.va", "out", false, "out/v1.2.mjs"),
        ];

        for (input, output, single, expected) in test_cases {
            let got = output_path(Path::new(input), Path::new(output), single);
            assert_eq!(got, PathBuf::from(expected));
        }
    }

    #[test]
    fn test_ast_path() {
        assert_eq!(ast_path(Path::new("out/a.mjs")), PathBuf::from("out/a.mjs.ast.json"));
    }

    #[test]
    fn test_preamble_defines_runtime_helpers() {
        for name in [
            "_get", "_set", "_update", "_slice", "_iter", "_entries", "len", "print", "eprint",
            "_str", "_num", "_eq", "type", "range", "_assert", "_caught", "_radix",
        ] {
            assert!(
                PREAMBLE.contains(&format!("function {name}(")),
                "preamble is missing {name}"
            );
        }
    }

    #[test]
    fn test_preamble_defines_every_builtin() {
        for b in Builtin::ALL {
            let name = b.name();
            assert!(
                PREAMBLE.contains(&format!("function {name}(")),
                "preamble is missing {name}"
            );
        }
    }
}
