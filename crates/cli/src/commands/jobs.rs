// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduled job commands

use crate::adapters::Context;
use crate::output::{self, OutputFormat};
use clap::Subcommand;
use relog_core::{JobStatus, ScheduledJob};
use serde::Serialize;
use std::fmt;

#[derive(Subcommand)]
pub enum JobsCommand {
    /// List registered jobs and whether their timers are still live
    List,
    /// Cancel a job's timer and drop its record
    Cancel {
        /// Job name, e.g. the configured retry job
        name: String,
    },
}

#[derive(Serialize)]
#[serde(transparent)]
struct JobRow(JobStatus);

impl fmt::Display for JobRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let JobStatus { name, job, live } = &self.0;
        write!(
            f,
            "{:<28} {:<34} {} {}",
            name,
            job.job_id,
            job.run_by.to_rfc3339(),
            if *live { "live" } else { "stale" }
        )?;
        match &job.log {
            Some(log) => write!(f, " {}", log),
            None => Ok(()),
        }
    }
}

#[derive(Serialize)]
struct CancelReport {
    name: String,
    cancelled: Option<ScheduledJob>,
}

impl fmt::Display for CancelReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cancelled {
            Some(job) => write!(f, "cancelled {} ({})", self.name, job.job_id),
            None => write!(f, "no job named {}", self.name),
        }
    }
}

pub async fn handle(ctx: &Context, command: JobsCommand, format: OutputFormat) -> anyhow::Result<()> {
    let scheduler = ctx.pipeline.scheduler();
    match command {
        JobsCommand::List => {
            let jobs: Vec<JobRow> = scheduler.list_jobs().await?.into_iter().map(JobRow).collect();
            output::print_list(&jobs, "No scheduled jobs", format)
        }
        JobsCommand::Cancel { name } => {
            let cancelled = scheduler.cancel_job(&name).await?;
            output::print(&CancelReport { name, cancelled }, format)
        }
    }
}
