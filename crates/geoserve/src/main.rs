//! geoserve - WPS 2.0 server for session-scoped spatial processing
//!
//! Main entry point for the geoserve CLI.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod commands;

use commands::{processes, start};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// geoserve - WPS 2.0 server for session-scoped spatial processing
#[derive(Parser)]
#[command(name = "geoserve")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the WPS server
    Start(start::StartArgs),

    /// List the processes the server would offer
    Processes(processes::ProcessesArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _guard = init_tracing(cli.verbose);

    let ctx = commands::Context {
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Start(args) => start::run(args, &ctx).await,
        Commands::Processes(args) => processes::run(args, &ctx).await,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tracing
// ─────────────────────────────────────────────────────────────────────────────

const CRATES: [&str; 5] = [
    "geoserve",
    "geoserve_config",
    "geoserve_session",
    "geoserve_process",
    "geoserve_server",
];

fn directives(level: &str, fallback: &str) -> String {
    CRATES
        .iter()
        .map(|c| format!("{c}={level}"))
        .chain([fallback.to_string()])
        .collect::<Vec<_>>()
        .join(",")
}

/// Human-readable console output plus a daily JSON log under the config dir.
///
/// The returned guard flushes the file writer on drop.
fn init_tracing(verbose: bool) -> WorkerGuard {
    let console = if verbose {
        directives("debug", "tower_http=debug,info")
    } else {
        directives("info", "warn")
    };

    let log_dir = geoserve_config::user_config_dir()
        .map(|d| d.join("logs"))
        .unwrap_or_else(|| std::path::PathBuf::from("logs"));
    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(log_dir, "geoserve.log"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_filter(EnvFilter::new(console)))
        .with(
            fmt::layer()
                .json()
                .with_writer(writer)
                .with_filter(EnvFilter::new(directives("trace", "info"))),
        )
        .init();

    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directives_cover_every_crate() {
        let d = directives("debug", "warn");
        assert!(d.starts_with("geoserve=debug,geoserve_config=debug"));
        assert!(d.ends_with(",warn"));
        assert!(EnvFilter::try_new(d).is_ok());
    }
}
