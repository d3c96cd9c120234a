//! Input-directory driver for the VMIPS simulator.
//!
//! Loads programs, memory snapshots and timing configurations from disk,
//! runs the engines from `vmips-core`, and writes register and memory dumps
//! and traces back out.

use env_logger as _;

/// Error types for loading, running and dumping.
pub mod errors;
/// Input/output directory layout and run modes.
pub mod iodir;
/// Memory snapshot and register dump formats.
pub mod snapshot;

pub use errors::SimIoError;
pub use iodir::{
    read_timing_config, read_trace, replay, run_functional, run_timing, FunctionalOutcome, IoDir,
    CODE_FILE, CONFIG_FILE, TRACE_FILE,
};
