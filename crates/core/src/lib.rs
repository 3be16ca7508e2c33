// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! relog-core: reliable commit pipeline for append-only logs
//!
//! This crate provides:
//! - Envelopes, batches and the per-caller staging buffer
//! - A lock manager over an advisory lock primitive
//! - The durable pending queue and retry job scheduler
//! - The commit pipeline and its retry entry point
//! - Adapter traits for the log sink, property store, locks and timers

pub mod clock;
pub mod id;

pub mod adapters;
pub mod config;
pub mod coordination;

// Data, leaves first
pub mod envelope;
pub mod batch;
pub mod staging;

// Durable bookkeeping and orchestration
pub mod pending;
pub mod scheduler;
pub mod pipeline;
pub mod logger;

// Re-exports
pub use batch::{Batch, InvalidBatch};
pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{Config, ConfigError, CONFIG_FILE};
pub use coordination::{Lease, LockManager, LockScope, DEFAULT_LOCK_WAIT};
pub use envelope::{Envelope, Message};
pub use id::{IdGen, SequentialIdGen, UuidIdGen};
pub use logger::Logger;
pub use pending::{pending_key, PendingError, PendingQueue};
pub use pipeline::{
    CommitError, CommitOutcome, DeferCause, Pipeline, PipelineConfig, RetryOutcome,
    DEFAULT_RETRY_DELAY, DEFAULT_RETRY_JOB,
};
pub use scheduler::{JobStatus, ScheduleOutcome, ScheduledJob, Scheduler, SchedulerError, JOBS_KEY};
pub use staging::StagingBuffer;

// Re-export adapters
pub use adapters::{
    AdapterSet, Adapters, JobHandle, LockPrimitive, LogIdentity, LogSink, PropertyStore,
    SinkError, StoreError, TimerError, TimerService,
};
pub use adapters::{FakeAdapters, FakeLogSink};
