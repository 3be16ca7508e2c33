// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Adapter trait definitions for the pipeline's external collaborators

use crate::batch::Batch;
use crate::clock::Clock;
use crate::coordination::LockScope;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Log sink
// =============================================================================

/// Identity of one target log
///
/// Mirrors a sheet inside a parent document: two logs in the same parent
/// differ by `sheet_id`, and the same sheet name in two parents differ by
/// `parent_id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogIdentity {
    pub sheet_id: String,
    pub parent_id: String,
}

impl LogIdentity {
    pub fn new(sheet_id: impl Into<String>, parent_id: impl Into<String>) -> Self {
        Self {
            sheet_id: sheet_id.into(),
            parent_id: parent_id.into(),
        }
    }

    /// Stable hex digest used to key durable per-log state
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        // Length prefixes keep ("ab", "c") and ("a", "bc") apart.
        hasher.update(format!("{}:", self.sheet_id.len()));
        hasher.update(&self.sheet_id);
        hasher.update(format!("{}:", self.parent_id.len()));
        hasher.update(&self.parent_id);

        hasher
            .finalize()
            .iter()
            .fold(String::with_capacity(64), |mut hex, byte| {
                let _ = write!(hex, "{:02x}", byte);
                hex
            })
    }
}

impl std::fmt::Display for LogIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.parent_id, self.sheet_id)
    }
}

/// Errors from appending to a log
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("log not found: {0}")]
    NotFound(String),
    #[error("append rejected: {0}")]
    Rejected(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Two-column, append-only durable log
#[async_trait]
pub trait LogSink: Send + Sync {
    fn identity(&self) -> LogIdentity;

    /// Append rows after the last occupied row; never overwrites
    async fn append(&self, batch: &Batch) -> Result<(), SinkError>;
}

// =============================================================================
// Property store
// =============================================================================

/// Errors from the key-value property store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid property key: {0}")]
    InvalidKey(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Durable string-valued key-value store
#[async_trait]
pub trait PropertyStore: Clone + Send + Sync + 'static {
    async fn get_property(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set_property(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Deleting a missing key is not an error
    async fn delete_property(&self, key: &str) -> Result<(), StoreError>;

    async fn set_properties(&self, properties: &BTreeMap<String, String>)
        -> Result<(), StoreError>;
}

// =============================================================================
// Lock primitive
// =============================================================================

/// Advisory, named, non-reentrant mutual exclusion
#[async_trait]
pub trait LockPrimitive: Clone + Send + Sync + 'static {
    /// Wait up to `wait` for the lock; false when the deadline passes
    async fn try_acquire(&self, scope: LockScope, wait: Duration) -> bool;

    /// Release a held lock. Synchronous so leases can release on drop.
    fn release(&self, scope: LockScope);
}

// =============================================================================
// Timer facility
// =============================================================================

/// A registered one-shot timer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobHandle {
    /// Opaque id, handed back to the fired function as its trigger id
    pub id: String,
    /// Name of the function the timer invokes
    pub function: String,
}

/// Errors from the timer facility
#[derive(Debug, Error)]
pub enum TimerError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("timer facility unavailable: {0}")]
    Unavailable(String),
}

/// One-shot timers that invoke a named function later
#[async_trait]
pub trait TimerService: Clone + Send + Sync + 'static {
    async fn schedule_once(&self, function: &str, delay: Duration)
        -> Result<JobHandle, TimerError>;

    /// Cancelling an unknown timer is not an error
    async fn cancel(&self, handle: &JobHandle) -> Result<(), TimerError>;

    async fn list_active(&self) -> Result<Vec<JobHandle>, TimerError>;
}

// =============================================================================
// Adapter bundle
// =============================================================================

/// The collaborators a pipeline needs, bundled
pub trait Adapters: Clone + Send + Sync + 'static {
    type Store: PropertyStore;
    type Lock: LockPrimitive;
    type Timers: TimerService;
    type Clock: Clock;

    fn store(&self) -> Self::Store;
    fn locks(&self) -> Self::Lock;
    fn timers(&self) -> Self::Timers;
    fn clock(&self) -> Self::Clock;
}

/// Plain bundle of concrete adapters
#[derive(Clone)]
pub struct AdapterSet<P, L, T, C> {
    pub store: P,
    pub locks: L,
    pub timers: T,
    pub clock: C,
}

impl<P, L, T, C> Adapters for AdapterSet<P, L, T, C>
where
    P: PropertyStore,
    L: LockPrimitive,
    T: TimerService,
    C: Clock,
{
    type Store = P;
    type Lock = L;
    type Timers = T;
    type Clock = C;

    fn store(&self) -> P {
        self.store.clone()
    }

    fn locks(&self) -> L {
        self.locks.clone()
    }

    fn timers(&self) -> T {
        self.timers.clone()
    }

    fn clock(&self) -> C {
        self.clock.clone()
    }
}
