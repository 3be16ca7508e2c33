// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use async_trait::async_trait;
use relog_core::{Batch, JobHandle, LogIdentity, LogSink, TimerError, TimerService};
use std::time::{Duration, Instant};
use tracing::Instrument;

/// Wrapper that adds tracing to any LogSink
#[derive(Clone)]
pub struct TracedLogSink<S> {
    inner: S,
}

impl<S> TracedLogSink<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: LogSink> LogSink for TracedLogSink<S> {
    fn identity(&self) -> LogIdentity {
        self.inner.identity()
    }

    async fn append(&self, batch: &Batch) -> Result<(), relog_core::SinkError> {
        let span = tracing::info_span!("log.append", log = %self.inner.identity(), rows = batch.len());

        async {
            tracing::debug!("appending");

            let start = Instant::now();
            let result = self.inner.append(batch).await;
            let elapsed = start.elapsed();

            match &result {
                Ok(()) => tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "appended"),
                Err(e) => tracing::error!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %e,
                    "append failed"
                ),
            }

            result
        }
        .instrument(span)
        .await
    }
}

/// Wrapper that adds tracing to any TimerService
#[derive(Clone)]
pub struct TracedTimers<T> {
    inner: T,
}

impl<T> TracedTimers<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

#[async_trait]
impl<T: TimerService> TimerService for TracedTimers<T> {
    async fn schedule_once(&self, function: &str, delay: Duration) -> Result<JobHandle, TimerError> {
        let span = tracing::info_span!("timer.schedule", function, delay_ms = delay.as_millis() as u64);

        async {
            let result = self.inner.schedule_once(function, delay).await;
            match &result {
                Ok(handle) => tracing::info!(id = %handle.id, "scheduled"),
                Err(e) => tracing::error!(error = %e, "schedule failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn cancel(&self, handle: &JobHandle) -> Result<(), TimerError> {
        let span = tracing::info_span!("timer.cancel", id = %handle.id, function = %handle.function);

        async {
            let result = self.inner.cancel(handle).await;
            match &result {
                Ok(()) => tracing::info!("cancelled"),
                Err(e) => tracing::warn!(error = %e, "cancel failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn list_active(&self) -> Result<Vec<JobHandle>, TimerError> {
        let result = self.inner.list_active().await;
        tracing::trace!(active = ?result.as_ref().map(Vec::len).ok(), "listed timers");
        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
