//! JSON I/O handling for CLI
//!
//! - Input: newline-delimited JSON documents
//! - Output: one JSON object per line
//! - UTF-8 only

use std::io::{BufRead, Write};

use serde_json::{json, Value};

use crate::schema::ValidationErrors;

use super::errors::{CliError, CliResult};

/// One input line: blank lines are skipped, everything else is parsed.
pub enum InputLine {
    Document(Value),
    Malformed(CliError),
}

/// Read newline-delimited JSON documents, skipping blank lines
pub fn read_documents<R: BufRead>(reader: R) -> impl Iterator<Item = CliResult<InputLine>> {
    reader.lines().filter_map(|line| match line {
        Err(e) => Some(Err(CliError::from(e))),
        Ok(line) if line.trim().is_empty() => None,
        Ok(line) => Some(Ok(match serde_json::from_str(&line) {
            Ok(value) => InputLine::Document(value),
            Err(e) => InputLine::Malformed(CliError::from(e)),
        })),
    })
}

/// Write a success response
pub fn write_response<W: Write>(writer: &mut W, data: Value) -> CliResult<()> {
    write_line(writer, &json!({ "status": "ok", "data": data }))
}

/// Write a validation failure response
pub fn write_invalid<W: Write>(writer: &mut W, errors: &ValidationErrors) -> CliResult<()> {
    write_line(writer, &json!({ "status": "invalid", "errors": errors }))
}

/// Write an error response
pub fn write_error<W: Write>(writer: &mut W, code: &str, message: &str) -> CliResult<()> {
    write_line(
        writer,
        &json!({ "status": "error", "code": code, "message": message }),
    )
}

fn write_line<W: Write>(writer: &mut W, response: &Value) -> CliResult<()> {
    serde_json::to_writer(&mut *writer, response)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}
