// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Commit pipeline: lock-guarded append with a durable retry path
//!
//! ```text
//! commit(rows)
//!   invalid batch ............................ Rejected
//!   process lock acquired, append ok ......... Committed
//!   lock timeout or append failure ........... queue rows, schedule retry, Deferred
//!
//! Each log gets its own retry job, named `<retry_job>-<fingerprint prefix>`.
//!
//! retry(trigger_id)
//!   deregister trigger, take pending rows, run the commit transition again
//! ```
//!
//! The caller lock used by the pending queue and the scheduler is only ever
//! taken after the process lock has been released.

use crate::adapters::{Adapters, LogIdentity, LogSink, SinkError};
use crate::batch::{Batch, InvalidBatch};
use crate::coordination::{LockManager, LockScope, DEFAULT_LOCK_WAIT};
use crate::envelope::Envelope;
use crate::pending::{PendingError, PendingQueue};
use crate::scheduler::{ScheduleOutcome, Scheduler};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

/// Function name the retry timer invokes unless configured otherwise
pub const DEFAULT_RETRY_JOB: &str = "commit-pending";

/// Delay before a deferred commit is retried
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Hex digits of the log fingerprint appended to the retry job name
const JOB_SUFFIX_LEN: usize = 12;

/// Tunables for one pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub retry_job: String,
    pub retry_delay: Duration,
    pub process_lock_wait: Duration,
    pub caller_lock_wait: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            retry_job: DEFAULT_RETRY_JOB.to_string(),
            retry_delay: DEFAULT_RETRY_DELAY,
            process_lock_wait: DEFAULT_LOCK_WAIT,
            caller_lock_wait: DEFAULT_LOCK_WAIT,
        }
    }
}

/// Why rows went to the pending queue instead of the log
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "cause", content = "detail", rename_all = "snake_case")]
pub enum DeferCause {
    /// Another instance held the process lock for the whole wait
    LockTimeout,
    /// The lock was held but the sink refused the append
    SinkFailed(String),
}

impl std::fmt::Display for DeferCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeferCause::LockTimeout => f.write_str("lock timeout"),
            DeferCause::SinkFailed(reason) => write!(f, "sink failed: {}", reason),
        }
    }
}

/// Terminal state of one commit attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Nothing valid to commit; no side effects
    Rejected(InvalidBatch),
    /// Rows were appended to the log
    Committed { rows: usize },
    /// Rows are durably queued; `retry` is `None` when scheduling failed
    Deferred {
        rows: usize,
        cause: DeferCause,
        retry: Option<ScheduleOutcome>,
    },
}

/// Result of one retry invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome {
    /// The pending slot was empty
    NothingPending,
    /// Pending rows went through the commit transition
    Delivered(CommitOutcome),
}

/// Errors that leave rows outside both the log and the pending queue,
/// or that keep a retry from reaching its rows
#[derive(Debug, Error)]
pub enum CommitError {
    #[error("{} rows could be neither appended nor queued: {source}", .batch.len())]
    Stranded {
        batch: Batch,
        #[source]
        source: PendingError,
    },
    #[error("pending queue unavailable: {0}")]
    Pending(#[from] PendingError),
}

enum Attempt {
    Appended,
    TimedOut,
    SinkFailed(SinkError),
}

/// Committer and retry entry point shared by every logger of a process
pub struct Pipeline<A: Adapters> {
    locks: LockManager<A::Lock>,
    pending: PendingQueue<A::Store, A::Lock>,
    scheduler: Scheduler<A>,
    config: PipelineConfig,
}

impl<A: Adapters> Pipeline<A> {
    pub fn new(adapters: &A, config: PipelineConfig) -> Self {
        let locks = LockManager::new(adapters.locks());
        Self {
            pending: PendingQueue::new(adapters.store(), locks.clone(), config.caller_lock_wait),
            scheduler: Scheduler::new(adapters, locks.clone(), config.caller_lock_wait),
            locks,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn pending(&self) -> &PendingQueue<A::Store, A::Lock> {
        &self.pending
    }

    pub fn scheduler(&self) -> &Scheduler<A> {
        &self.scheduler
    }

    /// Name of the retry job that delivers rows deferred for `log`
    pub fn retry_job_for(&self, log: &LogIdentity) -> String {
        let fingerprint = log.fingerprint();
        format!(
            "{}-{}",
            self.config.retry_job,
            &fingerprint[..JOB_SUFFIX_LEN.min(fingerprint.len())]
        )
    }

    /// Whether a timer invoking `function` is one of this pipeline's retries
    pub fn is_retry_job(&self, function: &str) -> bool {
        function
            .strip_prefix(self.config.retry_job.as_str())
            .and_then(|rest| rest.strip_prefix('-'))
            .is_some_and(|suffix| {
                suffix.len() == JOB_SUFFIX_LEN && suffix.chars().all(|c| c.is_ascii_hexdigit())
            })
    }

    /// Append `rows` to `sink` under the process lock, deferring on failure
    pub async fn commit<S>(&self, rows: Vec<Envelope>, sink: &S) -> Result<CommitOutcome, CommitError>
    where
        S: LogSink + ?Sized,
    {
        match Batch::new(rows) {
            Ok(batch) => self.deliver(batch, sink).await,
            Err(reason) => {
                warn!(%reason, "no valid messages to commit");
                Ok(CommitOutcome::Rejected(reason))
            }
        }
    }

    /// Entry point for a fired retry timer.
    ///
    /// Deregisters `trigger_id` before touching the pending rows, so a new
    /// retry can be scheduled while this one runs.
    pub async fn retry<S>(&self, trigger_id: &str, sink: &S) -> Result<RetryOutcome, CommitError>
    where
        S: LogSink + ?Sized,
    {
        if let Err(e) = self.scheduler.delete_scheduled_job(trigger_id).await {
            warn!(trigger_id, error = %e, "failed to deregister retry job");
        }

        let log = sink.identity();
        let Some(batch) = self.pending.get_messages_out(&log).await? else {
            info!(%log, trigger_id, "no pending messages");
            return Ok(RetryOutcome::NothingPending);
        };

        info!(%log, trigger_id, rows = batch.len(), "retrying pending messages");
        Ok(RetryOutcome::Delivered(self.deliver(batch, sink).await?))
    }

    async fn deliver<S>(&self, batch: Batch, sink: &S) -> Result<CommitOutcome, CommitError>
    where
        S: LogSink + ?Sized,
    {
        let log = sink.identity();
        let rows = &batch;

        let attempt = self
            .locks
            .with_lock(
                LockScope::Process,
                self.config.process_lock_wait,
                move || async move {
                    match sink.append(rows).await {
                        Ok(()) => Attempt::Appended,
                        Err(e) => Attempt::SinkFailed(e),
                    }
                },
                || async { Attempt::TimedOut },
            )
            .await;

        let cause = match attempt {
            Attempt::Appended => {
                info!(%log, rows = batch.len(), "committed messages");
                return Ok(CommitOutcome::Committed { rows: batch.len() });
            }
            Attempt::TimedOut => {
                warn!(%log, rows = batch.len(), "log is busy, deferring messages");
                DeferCause::LockTimeout
            }
            Attempt::SinkFailed(e) => {
                error!(%log, rows = batch.len(), error = %e, "append failed, deferring messages");
                DeferCause::SinkFailed(e.to_string())
            }
        };

        self.defer(batch, &log, cause).await
    }

    async fn defer(
        &self,
        batch: Batch,
        log: &LogIdentity,
        cause: DeferCause,
    ) -> Result<CommitOutcome, CommitError> {
        if let Err(source) = self.pending.add_messages(&batch, log).await {
            error!(%log, rows = batch.len(), error = %source, "could not queue messages for retry");
            return Err(CommitError::Stranded { batch, source });
        }

        let job = self.retry_job_for(log);
        let retry = match self
            .scheduler
            .schedule_job_for(&job, log, self.config.retry_delay)
            .await
        {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                warn!(%job, error = %e, "could not schedule retry, messages stay queued");
                None
            }
        };

        Ok(CommitOutcome::Deferred {
            rows: batch.len(),
            cause,
            retry,
        })
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
