//! CLI entry point for the VMIPS simulator binary.

use std::env;
use std::ffi::OsString;
use std::path::PathBuf;

#[cfg(test)]
use tempfile as _;
use thiserror as _;
use vmips_core::{CoreConfig, TimingReport};
use vmips_sim::{replay, run_functional, run_timing, IoDir, SimIoError, TRACE_FILE};

const USAGE_TEXT: &str = "\
Usage: vmips-sim <command> [options]

Commands:
  run    <iodir> [--trace]   Run the functional engine and dump final state
  time   <iodir>             Run both engines and print the cycle count
  replay <trace> <config>    Time a saved trace against a configuration file

Options:
  -t, --trace  Save the dynamic trace to <iodir>/trace.asm (run only)
  -h, --help   Show this help message

Environment:
  RUST_LOG     Log filter (default: warn)

Examples:
  vmips-sim run tests/dot_product --trace
  vmips-sim time tests/dot_product
  vmips-sim replay tests/dot_product/trace.asm tests/dot_product/Config.txt
";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Run(RunArgs),
    Time(TimeArgs),
    Replay(ReplayArgs),
}

#[derive(Debug, PartialEq, Eq)]
struct RunArgs {
    iodir: PathBuf,
    trace: bool,
}

#[derive(Debug, PartialEq, Eq)]
struct TimeArgs {
    iodir: PathBuf,
}

#[derive(Debug, PartialEq, Eq)]
struct ReplayArgs {
    trace: PathBuf,
    config: PathBuf,
}

#[derive(Debug)]
enum ParseResult {
    Command(Command),
    Help,
}

fn parse_args(mut args: impl Iterator<Item = OsString>) -> Result<ParseResult, String> {
    let first = args.next().ok_or_else(|| "missing command".to_string())?;

    if first == "--help" || first == "-h" {
        return Ok(ParseResult::Help);
    }

    let command_str = first.to_string_lossy().to_string();

    match command_str.as_str() {
        "run" => parse_run_args(args)
            .map(Command::Run)
            .map(ParseResult::Command),
        "time" => parse_positionals(args, 1)
            .map(|mut paths| TimeArgs {
                iodir: paths.remove(0),
            })
            .map(Command::Time)
            .map(ParseResult::Command),
        "replay" => parse_positionals(args, 2)
            .map(|mut paths| ReplayArgs {
                config: paths.remove(1),
                trace: paths.remove(0),
            })
            .map(Command::Replay)
            .map(ParseResult::Command),
        other => Err(format!("unknown command: {other}")),
    }
}

fn parse_run_args(args: impl Iterator<Item = OsString>) -> Result<RunArgs, String> {
    let mut iodir: Option<PathBuf> = None;
    let mut trace = false;

    for arg in args {
        if arg == "--help" || arg == "-h" {
            return Err(USAGE_TEXT.to_string());
        }

        if arg == "--trace" || arg == "-t" {
            trace = true;
            continue;
        }

        if arg.to_string_lossy().starts_with('-') {
            return Err(format!("unknown option: {}", arg.to_string_lossy()));
        }

        if iodir.is_some() {
            return Err("multiple input directories provided".to_string());
        }
        iodir = Some(PathBuf::from(arg));
    }

    let iodir = iodir.ok_or_else(|| "missing input directory".to_string())?;
    Ok(RunArgs { iodir, trace })
}

fn parse_positionals(
    args: impl Iterator<Item = OsString>,
    expected: usize,
) -> Result<Vec<PathBuf>, String> {
    let mut paths = Vec::with_capacity(expected);

    for arg in args {
        if arg == "--help" || arg == "-h" {
            return Err(USAGE_TEXT.to_string());
        }

        if arg.to_string_lossy().starts_with('-') {
            return Err(format!("unknown option: {}", arg.to_string_lossy()));
        }

        paths.push(PathBuf::from(arg));
    }

    if paths.len() != expected {
        return Err(format!(
            "expected {expected} path argument(s), found {}",
            paths.len()
        ));
    }
    Ok(paths)
}

fn report_error(error: &SimIoError) -> i32 {
    eprintln!("{}", error.format_for_stderr());
    1
}

fn print_report(report: &TimingReport) {
    println!("Cycles: {}", report.cycles);
    log::info!(
        "{} instructions; stalls: {} data hazard, {} queue full, {} bank conflict",
        report.instructions,
        report.data_hazard_stalls,
        report.queue_full_stalls,
        report.bank_conflict_stalls
    );
}

fn run(args: &RunArgs) -> Result<(), i32> {
    let dir = IoDir::new(&args.iodir);
    let outcome =
        run_functional(&dir, &CoreConfig::default(), args.trace).map_err(|e| report_error(&e))?;

    println!(
        "Retired {} instructions; state dumped to {}",
        outcome.summary.retired,
        dir.root().display()
    );
    if args.trace {
        println!("Trace saved to {}", dir.path(TRACE_FILE).display());
    }
    Ok(())
}

fn time(args: &TimeArgs) -> Result<(), i32> {
    let dir = IoDir::new(&args.iodir);
    let report = run_timing(&dir, &CoreConfig::default()).map_err(|e| report_error(&e))?;
    print_report(&report);
    Ok(())
}

fn replay_trace(args: &ReplayArgs) -> Result<(), i32> {
    let report = replay(&args.trace, &args.config).map_err(|e| report_error(&e))?;
    print_report(&report);
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .init();

    let result = match parse_args(env::args_os().skip(1)) {
        Ok(ParseResult::Help) => {
            println!("{USAGE_TEXT}");
            Ok(())
        }
        Ok(ParseResult::Command(Command::Run(args))) => run(&args),
        Ok(ParseResult::Command(Command::Time(args))) => time(&args),
        Ok(ParseResult::Command(Command::Replay(args))) => replay_trace(&args),
        Err(error) => {
            if error.starts_with("Usage:") {
                println!("{error}");
            } else {
                eprintln!("error: {error}");
                eprintln!("{USAGE_TEXT}");
            }
            Err(1)
        }
    };

    std::process::exit(result.err().unwrap_or(0));
}
