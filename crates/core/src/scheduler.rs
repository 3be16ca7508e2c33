// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable registry of one-shot retry jobs
//!
//! At most one live job exists per name. A record is live while its timer is
//! still registered and its `run_by` deadline has not passed; anything else
//! is stale and gets replaced by the next schedule. Stale records are never
//! swept proactively.

use crate::adapters::{
    Adapters, JobHandle, LogIdentity, PropertyStore, StoreError, TimerError, TimerService,
};
use crate::clock::Clock;
use crate::coordination::{Lease, LockManager, LockScope};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Property key holding the job registry
pub const JOBS_KEY: &str = "relog.jobs";

/// Registry entry for one scheduled job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledJob {
    /// Id of the timer that will fire the job
    pub job_id: String,
    /// Deadline after which the record is stale
    pub run_by: DateTime<Utc>,
    /// Log the job delivers to, when it serves one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log: Option<LogIdentity>,
}

/// Result of asking for a job to be scheduled
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScheduleOutcome {
    /// A new timer was registered
    Scheduled(JobHandle),
    /// A live job already existed; nothing changed
    AlreadyScheduled(ScheduledJob),
}

/// A registry entry together with its current liveness
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobStatus {
    pub name: String,
    #[serde(flatten)]
    pub job: ScheduledJob,
    pub live: bool,
}

/// Errors from the scheduler
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("timed out waiting for the {0} lock")]
    LockTimeout(LockScope),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("timer error: {0}")]
    Timer(#[from] TimerError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

type Registry = BTreeMap<String, ScheduledJob>;

/// Schedules, deregisters and inspects retry jobs
#[derive(Clone)]
pub struct Scheduler<A: Adapters> {
    store: A::Store,
    timers: A::Timers,
    clock: A::Clock,
    locks: LockManager<A::Lock>,
    lock_wait: Duration,
}

impl<A: Adapters> Scheduler<A> {
    pub fn new(adapters: &A, locks: LockManager<A::Lock>, lock_wait: Duration) -> Self {
        Self {
            store: adapters.store(),
            timers: adapters.timers(),
            clock: adapters.clock(),
            locks,
            lock_wait,
        }
    }

    /// Register a one-shot timer for `name` unless a live one already exists
    pub async fn schedule_job(
        &self,
        name: &str,
        delay: Duration,
    ) -> Result<ScheduleOutcome, SchedulerError> {
        self.schedule(name, delay, None).await
    }

    /// Like [`schedule_job`](Self::schedule_job), recording the log the job
    /// delivers to so whoever fires it can find that log again
    pub async fn schedule_job_for(
        &self,
        name: &str,
        log: &LogIdentity,
        delay: Duration,
    ) -> Result<ScheduleOutcome, SchedulerError> {
        self.schedule(name, delay, Some(log.clone())).await
    }

    /// The registry record whose timer is `job_id`, with its name
    pub async fn job_for_trigger(&self, job_id: &str) -> Result<Option<JobStatus>, SchedulerError> {
        Ok(self
            .list_jobs()
            .await?
            .into_iter()
            .find(|status| status.job.job_id == job_id))
    }

    async fn schedule(
        &self,
        name: &str,
        delay: Duration,
        log: Option<LogIdentity>,
    ) -> Result<ScheduleOutcome, SchedulerError> {
        let _lease = self.lease().await?;
        let mut jobs = self.load().await?;

        if let Some(existing) = jobs.get(name) {
            let active = self.timers.list_active().await?;
            if self.is_live(existing, &active) {
                warn!(job = name, job_id = %existing.job_id, "job is already scheduled");
                return Ok(ScheduleOutcome::AlreadyScheduled(existing.clone()));
            }
            debug!(job = name, job_id = %existing.job_id, "replacing stale job record");
        }

        let handle = self.timers.schedule_once(name, delay).await?;
        let run_by = deadline(self.clock.now(), delay);
        jobs.insert(
            name.to_string(),
            ScheduledJob {
                job_id: handle.id.clone(),
                run_by,
                log,
            },
        );

        if let Err(e) = self.save(&jobs).await {
            // An unrecorded timer could never be deregistered
            if let Err(cancel_err) = self.timers.cancel(&handle).await {
                warn!(job_id = %handle.id, error = %cancel_err, "failed to cancel unrecorded timer");
            }
            return Err(e);
        }

        info!(job = name, job_id = %handle.id, %run_by, "created scheduled job");
        Ok(ScheduleOutcome::Scheduled(handle))
    }

    /// Cancel the timer `job_id` if it still exists and drop its record.
    ///
    /// Returns whether a record was removed. Fired jobs call this first
    /// thing, so the name can be scheduled again while they run.
    pub async fn delete_scheduled_job(&self, job_id: &str) -> Result<bool, SchedulerError> {
        let _lease = self.lease().await?;

        let active = self.timers.list_active().await?;
        if let Some(handle) = active.iter().find(|h| h.id == job_id) {
            self.timers.cancel(handle).await?;
        }

        let mut jobs = self.load().await?;
        let before = jobs.len();
        jobs.retain(|_, job| job.job_id != job_id);
        let removed = jobs.len() != before;
        if removed {
            self.save(&jobs).await?;
        }

        info!(job_id, removed, "deleted scheduled job");
        Ok(removed)
    }

    /// Cancel the job registered under `name`, live or stale
    pub async fn cancel_job(&self, name: &str) -> Result<Option<ScheduledJob>, SchedulerError> {
        let _lease = self.lease().await?;

        let mut jobs = self.load().await?;
        let Some(job) = jobs.remove(name) else {
            return Ok(None);
        };

        let active = self.timers.list_active().await?;
        if let Some(handle) = active.iter().find(|h| h.id == job.job_id) {
            self.timers.cancel(handle).await?;
        }
        self.save(&jobs).await?;

        info!(job = name, job_id = %job.job_id, "cancelled scheduled job");
        Ok(Some(job))
    }

    /// Every registry entry with its liveness, ordered by name
    pub async fn list_jobs(&self) -> Result<Vec<JobStatus>, SchedulerError> {
        let jobs = self.load().await?;
        if jobs.is_empty() {
            return Ok(Vec::new());
        }
        let active = self.timers.list_active().await?;

        Ok(jobs
            .into_iter()
            .map(|(name, job)| {
                let live = self.is_live(&job, &active);
                JobStatus { name, job, live }
            })
            .collect())
    }

    fn is_live(&self, job: &ScheduledJob, active: &[JobHandle]) -> bool {
        active.iter().any(|h| h.id == job.job_id) && self.clock.now() <= job.run_by
    }

    async fn lease(&self) -> Result<Lease<A::Lock>, SchedulerError> {
        self.locks
            .acquire(LockScope::Caller, self.lock_wait)
            .await
            .ok_or(SchedulerError::LockTimeout(LockScope::Caller))
    }

    async fn load(&self) -> Result<Registry, SchedulerError> {
        let Some(raw) = self.store.get_property(JOBS_KEY).await? else {
            return Ok(Registry::new());
        };
        match serde_json::from_str(&raw) {
            Ok(jobs) => Ok(jobs),
            Err(e) => {
                warn!(error = %e, "ignoring unreadable job registry");
                Ok(Registry::new())
            }
        }
    }

    async fn save(&self, jobs: &Registry) -> Result<(), SchedulerError> {
        if jobs.is_empty() {
            self.store.delete_property(JOBS_KEY).await?;
        } else {
            self.store
                .set_property(JOBS_KEY, &serde_json::to_string(jobs)?)
                .await?;
        }
        Ok(())
    }
}

fn deadline(now: DateTime<Utc>, delay: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(delay)
        .ok()
        .and_then(|delay| now.checked_add_signed(delay))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
