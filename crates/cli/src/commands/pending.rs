// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pending queue commands

use super::log::Row;
use crate::adapters::Context;
use crate::output::{self, OutputFormat};
use clap::Subcommand;
use relog_core::LogSink;
use relog_storage::FileLogSink;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum PendingCommand {
    /// Print rows waiting for a retry, without taking them
    Show {
        /// Log file whose pending slot to read instead of the remembered log
        #[arg(long)]
        log: Option<PathBuf>,
    },
}

pub async fn handle(
    ctx: &Context,
    command: PendingCommand,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match command {
        PendingCommand::Show { log } => {
            let Some(path) = ctx.existing_log(log.as_deref()).await? else {
                return output::print_list::<Row>(&[], "No log yet", format);
            };

            let identity = FileLogSink::open(&path)?.identity();
            let rows: Vec<Row> = ctx
                .pipeline
                .pending()
                .peek(&identity)
                .await?
                .map(|batch| batch.into_rows().into_iter().map(Row).collect())
                .unwrap_or_default();

            output::print_list(&rows, "No pending rows", format)
        }
    }
}
