// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log commands

use crate::adapters::Context;
use crate::output::{self, OutputFormat};
use clap::Subcommand;
use relog_core::Envelope;
use relog_storage::FileLogSink;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum LogCommand {
    /// Print the rows of the log, oldest first
    Show {
        /// Log file to read instead of the remembered log
        #[arg(long)]
        log: Option<PathBuf>,

        /// Only print the last N rows
        #[arg(long)]
        tail: Option<usize>,
    },
}

/// One `[date, message]` row
#[derive(Serialize)]
#[serde(transparent)]
pub struct Row(pub Envelope);

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}  {}", self.0.timestamp, self.0.payload)
    }
}

pub async fn handle(ctx: &Context, command: LogCommand, format: OutputFormat) -> anyhow::Result<()> {
    match command {
        LogCommand::Show { log, tail } => {
            let Some(path) = ctx.existing_log(log.as_deref()).await? else {
                return output::print_list::<Row>(&[], "No log yet", format);
            };

            let mut rows = FileLogSink::read_rows(&path)?;
            if let Some(tail) = tail {
                rows.drain(..rows.len().saturating_sub(tail));
            }

            let rows: Vec<Row> = rows.into_iter().map(Row).collect();
            output::print_list(&rows, "Log is empty", format)
        }
    }
}
