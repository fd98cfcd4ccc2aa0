//! Decoded stream writer.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::common::error::TraceError;
use crate::common::field::AddressField;
use crate::decode::DecodedCommand;

/// Header row of decoded stream files.
pub const HEADER: &str = "timestamp_sec,cmd,bg,bk,row,col,opc,mra,cycle";

/// Writes `commands` as CSV, one row per command. Absent fields are empty cells.
///
/// # Errors
///
/// Propagates write errors of `out`.
pub fn write_commands<W: Write>(mut out: W, commands: &[DecodedCommand]) -> io::Result<()> {
    writeln!(out, "{HEADER}")?;
    for command in commands {
        write!(out, "{},{}", command.timestamp, command.id)?;
        for field in AddressField::ALL {
            match command.fields.get(field) {
                Some(value) => write!(out, ",{value}")?,
                None => write!(out, ",")?,
            }
        }
        writeln!(out, ",{}", command.cycle)?;
    }
    out.flush()
}

/// Writes `commands` to the file at `path`, replacing it.
///
/// # Errors
///
/// Returns [`TraceError::Io`] if the file cannot be created or written.
pub fn write_file(path: &Path, commands: &[DecodedCommand]) -> Result<(), TraceError> {
    let io_err = |source| TraceError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(io_err)?;
    write_commands(BufWriter::new(file), commands).map_err(io_err)
}
