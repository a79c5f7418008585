//! taskdeck - tasks, epics and subtasks with conflict-free scheduling
//!
//! A standalone CLI over a CSV snapshot: every invocation loads the file,
//! applies one command and writes the file back when something changed.

use clap::Parser;
use taskdeck::cli::Cli;
use taskdeck::output::{command_label, emit_error};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    // Tracing is opt-in via RUST_LOG.
    // Ignore invalid or oversized filters.
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|raw| {
            let raw = raw.trim();
            if raw.is_empty() || raw.len() > 4096 {
                return None;
            }
            EnvFilter::try_new(raw).ok()
        })
        .unwrap_or_else(|| EnvFilter::new("off"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let command = command_label(std::env::args().skip(1));
    let cli = Cli::parse();
    let json = cli.json;
    if let Err(err) = cli.run() {
        let _ = emit_error(&command, &err, json);
        std::process::exit(err.exit_code());
    }
}
