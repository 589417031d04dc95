//! Dump the parsed program as pretty JSON (`--emit-ast`).

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::model::CompiledUnit;

pub fn emit(unit: &CompiledUnit, path: &Path) -> io::Result<()> {
    let mut f = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut f, &unit.program)?;
    writeln!(f)?;
    f.flush()
}
