// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Write command: stage messages and commit them to the log

use crate::adapters::Context;
use crate::output::{self, OutputFormat};
use anyhow::Context as _;
use clap::Args;
use relog_core::{
    CommitError, CommitOutcome, LogIdentity, LogSink, Logger, RetryOutcome, ScheduleOutcome,
};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

#[derive(Args)]
pub struct WriteArgs {
    /// Messages to log, one row each, in order
    #[arg(required = true)]
    pub messages: Vec<String>,

    /// Parse each message as JSON before staging it
    #[arg(long)]
    pub json: bool,

    /// Log file to append to instead of the remembered log
    #[arg(long)]
    pub log: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Committed,
    Deferred,
    Rejected,
    NothingPending,
}

/// What one commit or retry did, for display
#[derive(Debug, Serialize)]
pub struct CommitReport {
    pub status: Status,
    pub log: String,
    pub rows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry: Option<ScheduleOutcome>,
}

impl CommitReport {
    pub fn new(outcome: CommitOutcome, log: &LogIdentity) -> Self {
        let log = log.to_string();
        match outcome {
            CommitOutcome::Rejected(reason) => Self {
                status: Status::Rejected,
                log,
                rows: 0,
                reason: Some(reason.to_string()),
                retry: None,
            },
            CommitOutcome::Committed { rows } => Self {
                status: Status::Committed,
                log,
                rows,
                reason: None,
                retry: None,
            },
            CommitOutcome::Deferred { rows, cause, retry } => Self {
                status: Status::Deferred,
                log,
                rows,
                reason: Some(cause.to_string()),
                retry,
            },
        }
    }

    pub fn from_retry(outcome: RetryOutcome, log: &LogIdentity) -> Self {
        match outcome {
            RetryOutcome::Delivered(outcome) => Self::new(outcome, log),
            RetryOutcome::NothingPending => Self {
                status: Status::NothingPending,
                log: log.to_string(),
                rows: 0,
                reason: None,
                retry: None,
            },
        }
    }
}

fn rows(n: usize) -> String {
    if n == 1 {
        "1 row".to_string()
    } else {
        format!("{} rows", n)
    }
}

impl fmt::Display for CommitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = self.reason.as_deref().unwrap_or("unknown");
        match self.status {
            Status::Committed => write!(f, "committed {} to {}", rows(self.rows), self.log),
            Status::NothingPending => write!(f, "nothing pending for {}", self.log),
            Status::Rejected => write!(f, "nothing committed: {}", reason),
            Status::Deferred => {
                write!(f, "deferred {} ({})", rows(self.rows), reason)?;
                match &self.retry {
                    Some(ScheduleOutcome::Scheduled(handle)) => {
                        write!(f, "; retry scheduled as {}", handle.id)
                    }
                    Some(ScheduleOutcome::AlreadyScheduled(job)) => {
                        write!(f, "; retry already scheduled as {}", job.job_id)
                    }
                    None => write!(f, "; no retry scheduled, run `relog retry` to deliver"),
                }
            }
        }
    }
}

/// Turn a commit error into a CLI error, echoing stranded rows to stderr
/// so they are not lost with the process
pub fn surface(err: CommitError) -> anyhow::Error {
    if let CommitError::Stranded { batch, .. } = &err {
        for row in batch.rows() {
            match serde_json::to_string(row) {
                Ok(line) => eprintln!("{}", line),
                Err(_) => eprintln!("{}\t{}", row.timestamp, row.payload),
            }
        }
    }
    err.into()
}

pub async fn handle(ctx: &Context, args: WriteArgs, format: OutputFormat) -> anyhow::Result<()> {
    let sink = ctx.open_log(args.log.as_deref()).await?;
    let mut logger = Logger::new(&ctx.adapters, ctx.pipeline.clone());

    for message in args.messages {
        if args.json {
            let value: serde_json::Value = serde_json::from_str(&message)
                .with_context(|| format!("not valid JSON: {}", message))?;
            logger.stage(value);
        } else {
            logger.stage(message);
        }
    }

    let outcome = logger.commit_to_log(&sink).await.map_err(surface)?;
    output::print(&CommitReport::new(outcome, &sink.identity()), format)
}
