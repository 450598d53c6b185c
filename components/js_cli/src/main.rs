//! Corten JavaScript Runtime CLI
//!
//! Entry point for the runtime. Parses CLI arguments, runs the module and
//! maps the outcome onto the process exit status.

use std::process::ExitCode;

use clap::Parser;
use core_types::Value;
use js_cli::{run_file, Cli, CliError, CliResult, Host};
use tracing::debug;
use tracing_subscriber::filter::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::from(err.exit_code() as u8)
        }
    }
}

fn run(cli: &Cli) -> CliResult<()> {
    let path = cli.file.as_deref().ok_or(CliError::MissingFile)?;
    let mut host = Host::with_stdout(cli.runtime_config())?;
    let outcome = run_file(&mut host, path, cli.dump_bytecode);

    if cli.gc_stats {
        let stats = host.gc_stats();
        eprintln!(
            "gc: {} young, {} full, {} compactions, {} promoted, {} freed, {} live, max pause {}us",
            stats.young_collections,
            stats.full_collections,
            stats.compactions,
            stats.promoted_cells,
            stats.freed_cells,
            stats.live_cells,
            stats.max_pause_us,
        );
    }
    if let Some(snapshot) = &cli.heap_snapshot {
        host.write_heap_snapshot(snapshot)?;
    }

    let result = outcome?;
    if !matches!(result, Value::Undefined) {
        println!("{}", result);
    }
    Ok(())
}

fn report(err: &CliError) {
    match err {
        CliError::Engine(engine) => {
            debug!(target: "engine::cli", "script failed");
            eprintln!("{}", engine);
        }
        other => eprintln!("Error: {}", other),
    }
}
