//! Emit the JavaScript module: runtime preamble followed by the program.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use super::PREAMBLE;
use crate::model::CompiledUnit;

pub fn emit(unit: &CompiledUnit, path: &Path) -> io::Result<()> {
    let mut f = BufWriter::new(File::create(path)?);
    write_module(unit, &mut f)?;
    f.flush()
}

/// The program runs inside a function of its own, so its variables shadow
/// the preamble's helpers instead of clashing with them.
pub fn write_module(unit: &CompiledUnit, w: &mut impl Write) -> io::Result<()> {
    w.write_all(PREAMBLE.as_bytes())?;
    writeln!(w, "// ── {} ──", unit.name)?;
    writeln!(w, "(function () {{")?;
    w.write_all(unit.code.as_bytes())?;
    writeln!(w, "}})();")
}
