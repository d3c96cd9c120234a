//! Cycle-level timing engine.
//!
//! Replays a functional trace against a configurable micro-architecture:
//! a fetch/decode front end, a busy board for register hazards, three
//! bounded issue queues, four lane-pipelined vector functional units, a
//! bank-gated vector load/store unit, and a one-cycle scalar unit.

/// Register, mask and length hazard tracking.
pub mod busy_board;
/// Timing parameters and their text form.
pub mod config;
/// Bounded issue queues.
pub mod queue;
/// Cycle loop.
pub mod scheduler;
/// Back-end execution units.
pub mod unit;

pub use busy_board::{claims_of, BusyBoard, Claims, Resource};
pub use config::{ConfigError, TimingConfig, DEFAULT_CYCLE_LIMIT};
pub use queue::IssueQueue;
pub use scheduler::{IssueWindow, TimingReport, TimingSim};
pub use unit::{BankState, ScalarUnit, VectorComputeUnit, VectorDataUnit};
