//! Integration tests for the vmips-sim CLI.

use env_logger as _;
use log as _;
use thiserror as _;
use vmips_core as _;
use vmips_sim as _;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn binary_path() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop();
    path.pop();
    path.join("vmips-sim")
}

fn sim(args: &[&str]) -> Output {
    Command::new(binary_path())
        .args(args)
        .output()
        .expect("failed to run vmips-sim")
}

fn write_iodir(dir: &Path, code: &str, config: Option<&str>) {
    fs::write(dir.join("Code.asm"), code).unwrap();
    fs::write(dir.join("SDMEM.txt"), "4\n5\n").unwrap();
    fs::write(dir.join("VDMEM.txt"), "1\n2\n3\n4\n5\n6\n7\n8\n").unwrap();
    if let Some(config) = config {
        fs::write(dir.join("Config.txt"), config).unwrap();
    }
}

const SCALAR_ADD: &str = "\
# SR3 = mem[0] + mem[1]
LS SR1 SR0 0
LS SR2 SR0 1
ADD SR3 SR1 SR2
SS SR3 SR0 2
HALT
";

const DEFAULT_CONFIG: &str = "\
pipelineDepthAdd = 1
pipelineDepthMul = 1
pipelineDepthDiv = 1
pipelineDepthShuffle = 1
numLanes = 1
computeQueueDepth = 4
dataQueueDepth = 4
vlsPipelineDepth = 1
vdmNumBanks = 16
vdmBankBusyTime = 1
";

#[test]
fn run_dumps_registers_and_memories() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_iodir(temp_dir.path(), SCALAR_ADD, None);
    let iodir = temp_dir.path().to_str().unwrap();

    let output = sim(&["run", iodir]);
    assert!(output.status.success(), "{output:?}");
    assert!(String::from_utf8_lossy(&output.stdout).contains("Retired 4 instructions"));

    let sdmem = fs::read_to_string(temp_dir.path().join("SDMEMOP.txt")).unwrap();
    assert_eq!(sdmem.lines().count(), 1 << 13);
    assert_eq!(sdmem.lines().take(3).collect::<Vec<_>>(), ["4", "5", "9"]);
    let vdmem = fs::read_to_string(temp_dir.path().join("VDMEMOP.txt")).unwrap();
    assert_eq!(vdmem.lines().count(), 1 << 17);

    let srf = fs::read_to_string(temp_dir.path().join("SRF.txt")).unwrap();
    let rows: Vec<&str> = srf.lines().collect();
    assert_eq!(rows.len(), 10);
    assert_eq!(rows[5].trim_end(), "9");
    let vrf = fs::read_to_string(temp_dir.path().join("VRF.txt")).unwrap();
    assert_eq!(vrf.lines().nth(1).map(str::len), Some(64 * 13));

    assert!(!temp_dir.path().join("trace.asm").exists());
}

#[test]
fn run_with_trace_flag_writes_trace() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_iodir(temp_dir.path(), SCALAR_ADD, None);
    let iodir = temp_dir.path().to_str().unwrap();

    let output = sim(&["run", iodir, "--trace"]);
    assert!(output.status.success(), "{output:?}");

    let trace = fs::read_to_string(temp_dir.path().join("trace.asm")).unwrap();
    assert_eq!(
        trace,
        "LS SR1 SR0 0 @ 0\nLS SR2 SR0 1 @ 1\nADD SR3 SR1 SR2\nSS SR3 SR0 2 @ 2\nHALT\n"
    );
}

#[test]
fn time_prints_cycle_count() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_iodir(temp_dir.path(), "ADD SR1 SR2 SR3\nHALT\n", Some(DEFAULT_CONFIG));
    let iodir = temp_dir.path().to_str().unwrap();

    let output = sim(&["time", iodir]);
    assert!(output.status.success(), "{output:?}");
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "Cycles: 3");
    assert!(temp_dir.path().join("trace.asm").exists());
}

#[test]
fn replay_matches_time() {
    let temp_dir = tempfile::tempdir().unwrap();
    let code = "LV VR1 SR0\nMULVV VR2 VR1 VR1\nSV VR2 SR1\nHALT\n";
    write_iodir(temp_dir.path(), code, Some("numLanes = 4\nvdmNumBanks = 8\n"));
    let iodir = temp_dir.path().to_str().unwrap();

    let timed = sim(&["time", iodir]);
    assert!(timed.status.success(), "{timed:?}");

    let trace = temp_dir.path().join("trace.asm");
    let config = temp_dir.path().join("Config.txt");
    let replayed = sim(&[
        "replay",
        trace.to_str().unwrap(),
        config.to_str().unwrap(),
    ]);
    assert!(replayed.status.success(), "{replayed:?}");
    assert_eq!(timed.stdout, replayed.stdout);
}

#[test]
fn missing_input_file_fails() {
    let temp_dir = tempfile::tempdir().unwrap();
    fs::write(temp_dir.path().join("Code.asm"), "HALT\n").unwrap();
    let iodir = temp_dir.path().to_str().unwrap();

    let output = sim(&["run", iodir]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("SDMEM.txt"), "{stderr}");
    assert!(!temp_dir.path().join("SRF.txt").exists());
}

#[test]
fn verifier_rejects_bad_program() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_iodir(temp_dir.path(), "ADD SR1 SR2 SR9\nHALT\n", None);
    let iodir = temp_dir.path().to_str().unwrap();

    let output = sim(&["run", iodir]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Code.asm"), "{stderr}");
    assert!(stderr.contains("line 1"), "{stderr}");
}

#[test]
fn runtime_fault_is_reported() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_iodir(temp_dir.path(), "DIV SR1 SR1 SR0\nHALT\n", None);
    let iodir = temp_dir.path().to_str().unwrap();

    let output = sim(&["run", iodir]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("division by zero at pc 0"), "{stderr}");
}

#[test]
fn bad_config_is_reported() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_iodir(temp_dir.path(), "HALT\n", Some("numLanes = zero\n"));
    let iodir = temp_dir.path().to_str().unwrap();

    let output = sim(&["time", iodir]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Config.txt"), "{stderr}");
    assert!(stderr.contains("numLanes"), "{stderr}");
}

#[test]
fn help_prints_usage() {
    let output = sim(&["--help"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Usage: vmips-sim"));
}

#[test]
fn unknown_command_fails() {
    let output = sim(&["assemble", "x"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown command"));
}
