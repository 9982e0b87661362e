//! JSON output for the CLI
//!
//! One JSON object per line on stdout. Commands that print here route
//! their logs to stderr.

use std::io::{self, Write};

use serde::Serialize;

use super::errors::CliResult;

/// Write any serializable value as one line
pub fn write_json<T: Serialize>(value: &T) -> CliResult<()> {
    let mut stdout = io::stdout().lock();
    write_json_to(&mut stdout, value)
}

pub(crate) fn write_json_to<W: Write, T: Serialize>(writer: &mut W, value: &T) -> CliResult<()> {
    serde_json::to_writer(&mut *writer, value)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}
