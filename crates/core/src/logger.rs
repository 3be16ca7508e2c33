// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Caller-facing logger: stage messages, then commit them in one batch

use crate::adapters::{Adapters, LogSink};
use crate::envelope::Message;
use crate::pipeline::{CommitError, CommitOutcome, Pipeline};
use crate::staging::StagingBuffer;
use std::sync::Arc;

/// Owns one staging buffer and commits it through a shared pipeline
pub struct Logger<A: Adapters> {
    staging: StagingBuffer<A::Clock>,
    pipeline: Arc<Pipeline<A>>,
}

impl<A: Adapters> Logger<A> {
    pub fn new(adapters: &A, pipeline: Arc<Pipeline<A>>) -> Self {
        Self {
            staging: StagingBuffer::new(adapters.clock()),
            pipeline,
        }
    }

    pub fn stage(&mut self, message: impl Into<Message>) {
        self.staging.stage(message);
    }

    /// Messages staged since the last commit
    pub fn staged(&self) -> usize {
        self.staging.len()
    }

    /// Drain everything staged and commit it to `sink`.
    ///
    /// The buffer is empty afterwards whatever the outcome; rows that were
    /// not appended are either queued for retry or returned in the error.
    pub async fn commit_to_log<S>(&mut self, sink: &S) -> Result<CommitOutcome, CommitError>
    where
        S: LogSink + ?Sized,
    {
        let rows = self.staging.drain();
        self.pipeline.commit(rows, sink).await
    }

    pub fn pipeline(&self) -> &Arc<Pipeline<A>> {
        &self.pipeline
    }
}

#[cfg(test)]
#[path = "logger_tests.rs"]
mod tests;
