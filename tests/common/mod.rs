#![allow(dead_code)]

use std::path::PathBuf;

use verbena::model::SourceUnit;
use verbena::{CompileOptions, loader, processor};

pub fn fixture(name: &str) -> SourceUnit {
    let path = PathBuf::from(format!("tests/data/{name}.va"));
    loader::load(&path).unwrap()
}

/// Generated module body for a fixture, preamble excluded.
pub fn compile(name: &str) -> String {
    processor::compile(&fixture(name), &CompileOptions::default())
        .unwrap()
        .code
}

/// Everything the reference interpreter prints for a fixture.
pub fn run(name: &str) -> String {
    let mut out = Vec::new();
    let mut err = Vec::new();
    processor::interpret(&fixture(name), &CompileOptions::default(), &mut out, &mut err).unwrap();
    String::from_utf8(out).unwrap()
}
