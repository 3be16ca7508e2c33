// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Adapter traits for the pipeline's external collaborators

pub mod fake;
pub mod traits;

// Re-export traits
pub use traits::{
    AdapterSet, Adapters, JobHandle, LockPrimitive, LogIdentity, LogSink, PropertyStore,
    SinkError, StoreError, TimerError, TimerService,
};

// Re-export fake adapters
pub use fake::{
    AdapterCall, FakeAdapters, FakeLockPrimitive, FakeLogSink, FakePropertyStore, FakeTimers,
};
