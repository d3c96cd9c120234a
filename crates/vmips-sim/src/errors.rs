//! Error reporting for the input-directory driver.
//!
//! Every failure names the file it came from. Missing or unreadable inputs
//! are errors; nothing falls back to an empty program, zeroed memory, or a
//! default configuration.
//!
//! # Error Format
//!
//! ```text
//! error: run/Code.asm: line 4: unknown opcode `ADDX`
//! error: simulation fault: division by zero at pc 7
//! ```

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use vmips_core::{ConfigError, DecodeError, SimError, TraceParseError};

/// Failure while loading inputs, running an engine, or writing outputs.
#[derive(Debug, Error)]
pub enum SimIoError {
    /// File could not be read or written.
    #[error("{}: {source}", path.display())]
    Io {
        /// File being accessed.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// Memory snapshot line is not a signed 32-bit integer.
    #[error("{}: line {line}: expected a signed 32-bit integer, found `{text}`", path.display())]
    Snapshot {
        /// Snapshot file.
        path: PathBuf,
        /// 1-based line number.
        line: usize,
        /// Offending text.
        text: String,
    },
    /// Program text failed verification.
    #[error("{}: {source}", path.display())]
    Decode {
        /// Program file.
        path: PathBuf,
        /// Verifier diagnostic.
        #[source]
        source: DecodeError,
    },
    /// Trace text could not be parsed.
    #[error("{}: {source}", path.display())]
    Trace {
        /// Trace file.
        path: PathBuf,
        /// Parser diagnostic.
        #[source]
        source: TraceParseError,
    },
    /// Timing configuration was rejected.
    #[error("{}: {source}", path.display())]
    Config {
        /// Configuration file.
        path: PathBuf,
        /// Configuration diagnostic.
        #[source]
        source: ConfigError,
    },
    /// Fault raised by the functional or timing engine.
    #[error("simulation fault: {0}")]
    Fault(#[from] SimError),
}

impl SimIoError {
    /// Wraps an I/O failure on `path`.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Formats the error for stderr output.
    #[must_use]
    pub fn format_for_stderr(&self) -> String {
        format!("error: {self}")
    }
}
