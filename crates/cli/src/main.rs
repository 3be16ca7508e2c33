// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! relog - reliable append-only logging with deferred retries

mod adapters;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{jobs, log, pending, retry, timers, write};
use output::OutputFormat;
use std::path::{Path, PathBuf};

use crate::adapters::{resolve_state_dir, Context};

/// Environment variable holding the log filter, before `RUST_LOG`
const LOG_FILTER_ENV: &str = "RELOG_LOG";

#[derive(Parser)]
#[command(
    name = "relog",
    version,
    about = "relog commits messages to an append-only log, deferring to a retry when it is busy"
)]
struct Cli {
    /// State directory (default: $RELOG_STATE_DIR, then the platform data directory)
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    /// Output format
    #[arg(short = 'o', long, global = true, value_enum, default_value = "text")]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stage messages and commit them to the log
    Write(write::WriteArgs),
    /// Deliver pending rows; invoked when a retry timer fires
    Retry(retry::RetryArgs),
    /// Timer management and the timer runner
    Timers {
        #[command(subcommand)]
        command: timers::TimersCommand,
    },
    /// Scheduled job management
    Jobs {
        #[command(subcommand)]
        command: jobs::JobsCommand,
    },
    /// Pending queue inspection
    Pending {
        #[command(subcommand)]
        command: pending::PendingCommand,
    },
    /// Log inspection
    Log {
        #[command(subcommand)]
        command: log::LogCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_file = match &cli.command {
        Commands::Timers {
            command: timers::TimersCommand::Run { log_file, .. },
        } => log_file.clone(),
        _ => None,
    };
    let _guard = setup_logging(log_file.as_deref())?;

    let ctx = Context::open(resolve_state_dir(cli.state_dir)?)?;
    let format = cli.output;

    match cli.command {
        Commands::Write(args) => write::handle(&ctx, args, format).await,
        Commands::Retry(args) => retry::handle(&ctx, args, format).await,
        Commands::Timers { command } => timers::handle(&ctx, command, format).await,
        Commands::Jobs { command } => jobs::handle(&ctx, command, format).await,
        Commands::Pending { command } => pending::handle(&ctx, command, format).await,
        Commands::Log { command } => log::handle(&ctx, command, format).await,
    }
}

/// Diagnostics go to stderr, or to `log_file` through a non-blocking writer
/// whose guard must live until exit
fn setup_logging(
    log_file: Option<&Path>,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let Some(path) = log_file else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
        return Ok(None);
    };

    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("--log-file must name a file: {}", path.display()))?;
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let (non_blocking, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(Some(guard))
}
