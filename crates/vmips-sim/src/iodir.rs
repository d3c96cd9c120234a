//! Input/output directory layout and the three run modes built on it.
//!
//! An input directory holds `Code.asm`, the memory snapshots `SDMEM.txt`
//! and `VDMEM.txt`, and, for timing runs, `Config.txt`. Runs write the
//! register dumps `SRF.txt` and `VRF.txt`, the memory dumps `SDMEMOP.txt`
//! and `VDMEMOP.txt`, and optionally the trace `trace.asm`.

use std::fs;
use std::path::{Path, PathBuf};

use vmips_core::{
    AddressSpace, CoreConfig, CoreState, FunctionalEngine, Program, RunSummary, TimingConfig,
    TimingReport, TimingSim, TraceLog,
};

use crate::errors::SimIoError;
use crate::snapshot::{format_register_file, read_words, write_words};

/// Program text file.
pub const CODE_FILE: &str = "Code.asm";
/// Timing configuration file.
pub const CONFIG_FILE: &str = "Config.txt";
/// Persisted dynamic trace.
pub const TRACE_FILE: &str = "trace.asm";

/// One simulation directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IoDir {
    root: PathBuf,
}

impl IoDir {
    /// Directory rooted at `root`. Nothing is read until a load is requested.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory path.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a file inside the directory.
    #[must_use]
    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Initial snapshot of one address space.
    #[must_use]
    pub fn input_snapshot(&self, space: AddressSpace) -> PathBuf {
        self.path(&format!("{}.txt", space.name()))
    }

    /// Final dump of one address space.
    #[must_use]
    pub fn output_snapshot(&self, space: AddressSpace) -> PathBuf {
        self.path(&format!("{}OP.txt", space.name()))
    }

    /// Reads and verifies `Code.asm`.
    ///
    /// # Errors
    ///
    /// Returns [`SimIoError::Io`] when the file cannot be read and
    /// [`SimIoError::Decode`] when verification fails.
    pub fn load_program(&self, config: &CoreConfig) -> Result<Program, SimIoError> {
        let path = self.path(CODE_FILE);
        let text = fs::read_to_string(&path).map_err(|source| SimIoError::io(&path, source))?;
        let program = Program::parse_with_capacity(&text, config.instruction_memory_size)
            .map_err(|source| SimIoError::Decode { path, source })?;
        log::info!("loaded {} instructions from {CODE_FILE}", program.len());
        Ok(program)
    }

    /// Reset machine state with both memories loaded from their snapshots.
    ///
    /// # Errors
    ///
    /// Returns [`SimIoError`] when a snapshot is missing, malformed, or
    /// larger than its address space.
    pub fn load_state(&self, config: &CoreConfig) -> Result<CoreState, SimIoError> {
        let scalar = read_words(&self.input_snapshot(AddressSpace::Scalar))?;
        let vector = read_words(&self.input_snapshot(AddressSpace::Vector))?;
        log::debug!(
            "loaded {} scalar and {} vector memory words",
            scalar.len(),
            vector.len()
        );
        Ok(CoreState::with_memories(config, &scalar, &vector)?)
    }

    /// Reads `Config.txt`.
    ///
    /// # Errors
    ///
    /// Returns [`SimIoError::Io`] when the file cannot be read and
    /// [`SimIoError::Config`] when it is rejected.
    pub fn load_timing_config(&self) -> Result<TimingConfig, SimIoError> {
        read_timing_config(&self.path(CONFIG_FILE))
    }

    /// Writes the register and memory dumps for a final state.
    ///
    /// # Errors
    ///
    /// Returns [`SimIoError::Io`] when a dump cannot be written.
    pub fn dump_state(&self, state: &CoreState) -> Result<(), SimIoError> {
        for file in [&state.arch.srf, &state.arch.vrf] {
            let path = self.path(&format!("{}.txt", file.kind().name()));
            fs::write(&path, format_register_file(file))
                .map_err(|source| SimIoError::io(&path, source))?;
        }
        for space in AddressSpace::ALL {
            write_words(&self.output_snapshot(space), state.memory(space).words())?;
        }
        Ok(())
    }

    /// Writes `trace.asm`.
    ///
    /// # Errors
    ///
    /// Returns [`SimIoError::Io`] when the file cannot be written.
    pub fn save_trace(&self, trace: &TraceLog) -> Result<(), SimIoError> {
        let path = self.path(TRACE_FILE);
        fs::write(&path, trace.to_text()).map_err(|source| SimIoError::io(&path, source))?;
        log::info!("saved {} trace records to {}", trace.len(), path.display());
        Ok(())
    }
}

/// Reads a timing configuration file.
///
/// # Errors
///
/// Returns [`SimIoError::Io`] when the file cannot be read and
/// [`SimIoError::Config`] when it is rejected.
pub fn read_timing_config(path: &Path) -> Result<TimingConfig, SimIoError> {
    let text = fs::read_to_string(path).map_err(|source| SimIoError::io(path, source))?;
    TimingConfig::parse(&text).map_err(|source| SimIoError::Config {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads a saved trace file.
///
/// # Errors
///
/// Returns [`SimIoError::Io`] when the file cannot be read and
/// [`SimIoError::Trace`] when a line does not parse.
pub fn read_trace(path: &Path) -> Result<TraceLog, SimIoError> {
    let text = fs::read_to_string(path).map_err(|source| SimIoError::io(path, source))?;
    TraceLog::parse(&text).map_err(|source| SimIoError::Trace {
        path: path.to_path_buf(),
        source,
    })
}

/// Result of a functional run.
#[derive(Debug, Clone)]
pub struct FunctionalOutcome {
    /// Totals reported by the engine.
    pub summary: RunSummary,
    /// Final machine state.
    pub state: CoreState,
    /// Dynamic trace, `HALT` included.
    pub trace: TraceLog,
}

/// Loads a directory, runs the functional engine to `HALT`, and writes the
/// dumps. The trace is persisted when `save_trace` is set.
///
/// # Errors
///
/// Returns the first load failure or engine fault. Nothing is dumped after
/// a fault.
pub fn run_functional(
    dir: &IoDir,
    config: &CoreConfig,
    save_trace: bool,
) -> Result<FunctionalOutcome, SimIoError> {
    let program = dir.load_program(config)?;
    let state = dir.load_state(config)?;
    let mut engine = FunctionalEngine::new(program, state, config);
    let summary = engine.run()?;
    let (state, trace) = engine.into_parts();

    dir.dump_state(&state)?;
    if save_trace {
        dir.save_trace(&trace)?;
    }
    Ok(FunctionalOutcome {
        summary,
        state,
        trace,
    })
}

/// Full pipeline: functional run with dumps and a persisted trace, then the
/// timing engine over that trace with the directory's `Config.txt`.
///
/// # Errors
///
/// Returns the first load failure or engine fault. The configuration is
/// read before anything runs.
pub fn run_timing(dir: &IoDir, config: &CoreConfig) -> Result<TimingReport, SimIoError> {
    let timing = dir.load_timing_config()?;
    let outcome = run_functional(dir, config, true)?;
    Ok(TimingSim::new(outcome.trace.into_records(), &timing).run()?)
}

/// Times a saved trace against a configuration file.
///
/// # Errors
///
/// Returns the first load failure or timing fault.
pub fn replay(trace_path: &Path, config_path: &Path) -> Result<TimingReport, SimIoError> {
    let timing = read_timing_config(config_path)?;
    let trace = read_trace(trace_path)?;
    Ok(TimingSim::new(trace.into_records(), &timing).run()?)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use vmips_core::{AddressSpace, CoreConfig, RegisterIndex};

    use super::{replay, run_functional, run_timing, IoDir, CODE_FILE, CONFIG_FILE, TRACE_FILE};
    use crate::errors::SimIoError;

    fn small_config() -> CoreConfig {
        CoreConfig {
            max_vector_length: 4,
            scalar_address_bits: 4,
            vector_address_bits: 5,
            ..CoreConfig::default()
        }
    }

    fn fixture(code: &str, scalar: &str, vector: &str) -> (tempfile::TempDir, IoDir) {
        let temp = tempfile::tempdir().unwrap();
        let dir = IoDir::new(temp.path());
        fs::write(dir.path(CODE_FILE), code).unwrap();
        fs::write(dir.input_snapshot(AddressSpace::Scalar), scalar).unwrap();
        fs::write(dir.input_snapshot(AddressSpace::Vector), vector).unwrap();
        (temp, dir)
    }

    #[test]
    fn functional_run_writes_every_dump() {
        let (_temp, dir) = fixture(
            "LS SR1 SR0 0\nLS SR2 SR0 1\nADD SR3 SR1 SR2\nSS SR3 SR0 2\nHALT\n",
            "4\n5\n",
            "",
        );
        let outcome = run_functional(&dir, &small_config(), false).unwrap();
        assert_eq!(outcome.summary.retired, 4);
        assert_eq!(outcome.state.arch.srf.read_scalar(RegisterIndex::R3), 9);

        let scalar = fs::read_to_string(dir.output_snapshot(AddressSpace::Scalar)).unwrap();
        assert_eq!(scalar.lines().count(), 16);
        assert_eq!(scalar.lines().nth(2), Some("9"));
        let vector = fs::read_to_string(dir.output_snapshot(AddressSpace::Vector)).unwrap();
        assert_eq!(vector.lines().count(), 32);
        assert!(dir.path("SRF.txt").exists());
        assert!(dir.path("VRF.txt").exists());
        assert!(!dir.path(TRACE_FILE).exists());
    }

    #[test]
    fn saved_trace_replays_to_the_same_cycle_count() {
        let (_temp, dir) = fixture(
            "LV VR1 SR0\nADDVV VR2 VR1 VR1\nSV VR2 SR1\nHALT\n",
            "",
            "1\n2\n3\n4\n",
        );
        fs::write(dir.path(CONFIG_FILE), "numLanes = 2\nvdmNumBanks = 4\n").unwrap();
        let mut config = small_config();
        config.instruction_limit = 100;

        let direct = run_timing(&dir, &config).unwrap();
        let replayed = replay(&dir.path(TRACE_FILE), &dir.path(CONFIG_FILE)).unwrap();
        assert_eq!(direct, replayed);
        assert_eq!(direct.instructions, 3);

        let vector = fs::read_to_string(dir.output_snapshot(AddressSpace::Vector)).unwrap();
        let words: Vec<&str> = vector.lines().take(4).collect();
        assert_eq!(words, ["2", "4", "6", "8"]);
    }

    #[test]
    fn missing_snapshot_fails_fast() {
        let temp = tempfile::tempdir().unwrap();
        let dir = IoDir::new(temp.path());
        fs::write(dir.path(CODE_FILE), "HALT\n").unwrap();
        let error = run_functional(&dir, &small_config(), false).unwrap_err();
        assert!(matches!(error, SimIoError::Io { ref path, .. } if path.ends_with("SDMEM.txt")));
    }

    #[test]
    fn timing_run_requires_a_config_file() {
        let (_temp, dir) = fixture("HALT\n", "", "");
        let error = run_timing(&dir, &small_config()).unwrap_err();
        assert!(matches!(error, SimIoError::Io { ref path, .. } if path.ends_with(CONFIG_FILE)));
        assert!(!dir.path("SRF.txt").exists());
    }

    #[test]
    fn oversized_snapshot_is_rejected() {
        let words: String = (0..17).map(|word| format!("{word}\n")).collect();
        let (_temp, dir) = fixture("HALT\n", &words, "");
        let error = run_functional(&dir, &small_config(), false).unwrap_err();
        assert!(matches!(error, SimIoError::Fault(_)));
    }

    #[test]
    fn verifier_errors_carry_the_program_path() {
        let (_temp, dir) = fixture("ADD SR1 SR2\nHALT\n", "", "");
        let error = run_functional(&dir, &small_config(), false).unwrap_err();
        let SimIoError::Decode { path, source } = error else {
            panic!("expected a decode error");
        };
        assert!(path.ends_with(CODE_FILE));
        assert_eq!(source.line, 1);
    }
}
