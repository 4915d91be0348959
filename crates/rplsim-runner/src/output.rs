//! Writing the record stream.
//!
//! The text form is one record per line (`12.30 Node04 parent-set parent=Node01 ...`).
//! Its SHA-256 digest identifies a run: the same seed and configuration always
//! produce the same digest.

use crate::RunnerError;
use clap::ValueEnum;
use rplsim_common::EventRecord;
use sha2::{Digest, Sha256};
use std::io::Write;

/// Output format of the record stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum RecordFormat {
    /// Plain text, one record per line.
    #[default]
    Text,
    /// One JSON object per line.
    Jsonl,
}

/// Write every record to `out` in the given format.
pub fn write_records<W: Write>(
    out: &mut W,
    records: &[EventRecord],
    format: RecordFormat,
) -> Result<(), RunnerError> {
    for record in records {
        match format {
            RecordFormat::Text => writeln!(out, "{}", record)?,
            RecordFormat::Jsonl => {
                serde_json::to_writer(&mut *out, record)?;
                out.write_all(b"\n")?;
            }
        }
    }
    out.flush()?;
    Ok(())
}

/// Hex SHA-256 of the text form of the stream.
pub fn record_digest(records: &[EventRecord]) -> String {
    let mut hasher = Sha256::new();
    for record in records {
        hasher.update(record.to_string().as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}
