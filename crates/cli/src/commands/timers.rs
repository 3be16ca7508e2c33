// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timer commands, including the runner that fires due timers

use super::write::{surface, CommitReport};
use crate::adapters::Context;
use crate::output::{self, OutputFormat};
use clap::Subcommand;
use relog_adapters::TimerEntry;
use relog_core::{Clock, LogSink};
use relog_storage::FileLogSink;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

#[derive(Subcommand)]
pub enum TimersCommand {
    /// Fire due timers until interrupted, invoking the retry entry point
    Run {
        /// Fire what is due now and exit
        #[arg(long)]
        once: bool,

        /// Log file for retries whose job does not record one, instead of the remembered log
        #[arg(long)]
        log: Option<PathBuf>,

        /// Write diagnostics to this file instead of stderr
        #[arg(long)]
        log_file: Option<PathBuf>,
    },
    /// List registered timers, fired or not
    List,
}

#[derive(Serialize)]
#[serde(transparent)]
struct TimerRow(TimerEntry);

impl fmt::Display for TimerRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<34} {:<28} {} {}",
            self.0.id,
            self.0.function,
            self.0.fire_at.to_rfc3339(),
            if self.0.fired { "fired" } else { "waiting" }
        )
    }
}

pub async fn handle(
    ctx: &Context,
    command: TimersCommand,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match command {
        TimersCommand::Run { once, log, .. } => run(ctx, once, log.as_deref(), format).await,
        TimersCommand::List => {
            let timers: Vec<TimerRow> = ctx.timers().entries()?.into_iter().map(TimerRow).collect();
            output::print_list(&timers, "No timers", format)
        }
    }
}

async fn run(
    ctx: &Context,
    once: bool,
    log: Option<&Path>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let interval = ctx.config.timer_poll_interval;
    info!(?interval, retry_job = %ctx.config.retry_job, "timer runner started");

    loop {
        fire_due(ctx, log, format).await?;
        if once {
            break;
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("timer runner stopping");
                break;
            }
        }
    }

    Ok(())
}

async fn fire_due(ctx: &Context, log: Option<&Path>, format: OutputFormat) -> anyhow::Result<()> {
    for handle in ctx.timers().due(ctx.adapters.clock.now())? {
        if !ctx.pipeline.is_retry_job(&handle.function) {
            warn!(id = %handle.id, function = %handle.function, "no handler for timer function");
            continue;
        }

        // Jobs record the log they were scheduled for; older records fall back to --log
        let recorded = match ctx.pipeline.scheduler().job_for_trigger(&handle.id).await {
            Ok(job) => job
                .and_then(|status| status.job.log)
                .map(|identity| FileLogSink::path_for(&identity)),
            Err(e) => {
                warn!(id = %handle.id, error = %e, "cannot read job record");
                None
            }
        };
        let sink = match ctx.open_log(recorded.as_deref().or(log)).await {
            Ok(sink) => sink,
            Err(e) => {
                error!(id = %handle.id, error = %e, "cannot open log for retry");
                continue;
            }
        };

        match ctx.pipeline.retry(&handle.id, &sink).await {
            Ok(outcome) => {
                output::print(&CommitReport::from_retry(outcome, &sink.identity()), format)?
            }
            Err(e) => {
                let e = surface(e);
                error!(id = %handle.id, error = %e, "retry failed");
            }
        }
    }
    Ok(())
}
