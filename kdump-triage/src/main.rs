//! # kdump-triage - Main Entry Point
//!
//! One subcommand per selection step of the pipeline:
//! - `list` / `traces` / `locate`: browse crash dumps and their call traces
//! - `trace`: frames of a call trace plus the resolved fault site
//! - `frame` / `symbol`: resolve a single frame or function reference

use anyhow::{Context, Result};
use clap::Parser;
use kdump_triage::cli::{Args, Command};
use kdump_triage::crash_dump::{list_crash_directories, CrashLog};
use kdump_triage::domain::{FunctionRef, ModuleName, TriageError};
use kdump_triage::kernel_log::line_of_last_occurrence;
use kdump_triage::preflight::{check_crash_root, run_preflight_checks};
use kdump_triage::report::Reporter;
use kdump_triage::resolver::CrashTraceResolver;
use kdump_triage::symbolization::GdbSymbolizer;
use log::info;

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_USAGE: i32 = 2;
const EXIT_NOPERM: i32 = 77;

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(code) => code,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("error: {e:#}");
            code
        }
    });
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    if let Some(TriageError::DriverSourceNotConfigured) = err.downcast_ref::<TriageError>() {
        return EXIT_USAGE;
    }
    let msg = err.to_string().to_lowercase();
    if msg.contains("permission denied") {
        EXIT_NOPERM
    } else {
        EXIT_ERROR
    }
}

fn run() -> Result<i32> {
    let args = Args::parse();
    let reporter = Reporter::new(args.json);

    let result = run_preflight_checks(&args.debugger, args.quiet || args.json)
        .map_err(anyhow::Error::from)
        .and_then(|()| execute(&args, reporter));
    if let Err(e) = &result {
        reporter.error(e);
    }
    result
}

fn execute(args: &Args, reporter: Reporter) -> Result<i32> {
    let config = args.triage_config();

    match &args.command {
        Command::List => {
            let dirs = list_crash_directories(&config.crash_root)?;
            reporter.crash_directories(&dirs);
        }

        Command::Traces { dir } => {
            check_crash_root(&config.crash_root)?;
            let mut resolver = CrashTraceResolver::new(config, args.symbolizer());
            resolver.select_directory(dir)?;
            let blocks: Vec<_> = resolver.call_traces()?.collect();
            if let Some(log) = resolver.crash_log() {
                reporter.call_traces(log, &blocks);
            }
            if blocks.is_empty() {
                if !reporter.is_json() {
                    eprintln!("error: {}", TriageError::NoCallTraceFound);
                }
                return Ok(EXIT_ERROR);
            }
        }

        Command::Locate { dir, cursor } => {
            check_crash_root(&config.crash_root)?;
            let log = CrashLog::load(&config.crash_root, dir)?;
            let line = line_of_last_occurrence(log.text(), &config.call_trace_marker, *cursor)
                .ok_or(TriageError::NoCallTraceFound)?;
            reporter.trace_position(&log, line);
        }

        Command::Trace { dir, index } => {
            check_crash_root(&config.crash_root)?;
            let mut resolver = CrashTraceResolver::new(config, args.symbolizer());
            print_banner(args, &resolver);
            resolver.select_directory(dir)?;
            let trace = resolver.select_trace(*index)?;
            reporter.trace_selection(trace);
        }

        Command::Frame { dir, frame, trace } => {
            check_crash_root(&config.crash_root)?;
            let mut resolver = CrashTraceResolver::new(config, args.symbolizer());
            print_banner(args, &resolver);
            resolver.select_directory(dir)?;
            resolver.select_trace(*trace)?;
            let selection = resolver
                .select_frame(*frame)
                .with_context(|| format!("Failed to resolve frame {frame} of call trace {trace}"))?;
            reporter.frame_selection(selection);
        }

        Command::Symbol { module, function } => {
            let resolver = CrashTraceResolver::new(config, args.symbolizer());
            print_banner(args, &resolver);
            let location = resolver.resolve_symbol(
                &ModuleName::from(module.as_str()),
                &FunctionRef::from(function.as_str()),
            )?;
            reporter.location(&location);
        }
    }

    Ok(EXIT_SUCCESS)
}

fn print_banner(args: &Args, resolver: &CrashTraceResolver<GdbSymbolizer>) {
    if args.quiet || args.json {
        return;
    }
    let config = resolver.config();
    println!("kdump-triage v{}", env!("CARGO_PKG_VERSION"));
    println!("crash root: {}", config.crash_root.display());
    match &config.driver_root {
        Some(root) => println!("driver source: {root}"),
        None => println!("driver source: (not set, use --driver-src)"),
    }
    info!("debugger: {}", args.debugger);
}
