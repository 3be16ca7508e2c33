// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retry command: the entry point a fired retry timer invokes

use super::write::{surface, CommitReport};
use crate::adapters::Context;
use crate::output::{self, OutputFormat};
use clap::Args;
use relog_core::LogSink;
use std::path::PathBuf;

#[derive(Args)]
pub struct RetryArgs {
    /// Id of the timer that fired; an unknown id retries without deregistering anything
    #[arg(default_value = "manual")]
    pub trigger_id: String,

    /// Log file whose pending rows to deliver instead of the remembered log
    #[arg(long)]
    pub log: Option<PathBuf>,
}

pub async fn handle(ctx: &Context, args: RetryArgs, format: OutputFormat) -> anyhow::Result<()> {
    let sink = ctx.open_log(args.log.as_deref()).await?;
    let outcome = ctx
        .pipeline
        .retry(&args.trigger_id, &sink)
        .await
        .map_err(surface)?;
    output::print(&CommitReport::from_retry(outcome, &sink.identity()), format)
}
