//! Text formats for memory snapshots and register dumps.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use vmips_core::RegisterFile;

use crate::errors::SimIoError;

/// Width of one register-dump column.
pub const COLUMN_WIDTH: usize = 13;

/// Parses a memory snapshot: one signed decimal word per line. Blank lines
/// are skipped.
///
/// # Errors
///
/// Returns [`SimIoError::Snapshot`] for the first line that is not a
/// signed 32-bit integer.
pub fn parse_words(path: &Path, text: &str) -> Result<Vec<i32>, SimIoError> {
    text.lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
        .map(|(line, item)| {
            item.parse::<i32>().map_err(|_| SimIoError::Snapshot {
                path: path.to_path_buf(),
                line,
                text: item.to_owned(),
            })
        })
        .collect()
}

/// Snapshot text for `words`, one per line.
#[must_use]
pub fn format_words(words: &[i32]) -> String {
    let mut text = String::with_capacity(words.len() * 2);
    for word in words {
        let _ = writeln!(text, "{word}");
    }
    text
}

/// Reads a memory snapshot file.
///
/// # Errors
///
/// Returns [`SimIoError::Io`] when the file cannot be read and
/// [`SimIoError::Snapshot`] when a line is malformed.
pub fn read_words(path: &Path) -> Result<Vec<i32>, SimIoError> {
    let text = fs::read_to_string(path).map_err(|source| SimIoError::io(path, source))?;
    parse_words(path, &text)
}

/// Writes a memory snapshot file.
///
/// # Errors
///
/// Returns [`SimIoError::Io`] when the file cannot be written.
pub fn write_words(path: &Path, words: &[i32]) -> Result<(), SimIoError> {
    fs::write(path, format_words(words)).map_err(|source| SimIoError::io(path, source))
}

/// Tabular dump of a register file: a header of lane indices, a dashed
/// rule, then one row per register. Every cell is left-aligned to
/// [`COLUMN_WIDTH`] characters.
#[must_use]
pub fn format_register_file(file: &RegisterFile) -> String {
    let lanes = file.lanes();
    let mut text = String::new();
    for lane in 0..lanes {
        let _ = write!(text, "{lane:<COLUMN_WIDTH$}");
    }
    text.push('\n');
    text.push_str(&"-".repeat(lanes * COLUMN_WIDTH));
    text.push('\n');
    for row in file.rows() {
        for value in row {
            let _ = write!(text, "{value:<COLUMN_WIDTH$}");
        }
        text.push('\n');
    }
    text
}
