// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock manager for named, timeout-bounded mutual exclusion
//!
//! Two scopes exist. `Process` serializes every instance appending to a log;
//! `Caller` serializes one caller's read-modify-write of durable bookkeeping
//! (pending rows, job registry). Locks are not reentrant: acquiring a scope
//! the current call path already holds waits out the full timeout.

use crate::adapters::LockPrimitive;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Default time to wait for a lock before giving up
pub const DEFAULT_LOCK_WAIT: Duration = Duration::from_secs(60);

/// Granularity of a named lock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockScope {
    /// Shared by every instance of the program
    Process,
    /// Private to one caller identity
    Caller,
}

impl LockScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            LockScope::Process => "process",
            LockScope::Caller => "caller",
        }
    }
}

impl std::fmt::Display for LockScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A held lock, released when dropped
pub struct Lease<L: LockPrimitive> {
    primitive: L,
    scope: LockScope,
}

impl<L: LockPrimitive> Lease<L> {
    pub fn scope(&self) -> LockScope {
        self.scope
    }
}

impl<L: LockPrimitive> Drop for Lease<L> {
    fn drop(&mut self) {
        self.primitive.release(self.scope);
        debug!(scope = %self.scope, "released lock");
    }
}

/// Acquires and releases named locks with a bounded wait
#[derive(Clone)]
pub struct LockManager<L: LockPrimitive> {
    primitive: L,
}

impl<L: LockPrimitive> LockManager<L> {
    pub fn new(primitive: L) -> Self {
        Self { primitive }
    }

    /// Wait up to `wait` for `scope`; `None` on timeout
    pub async fn acquire(&self, scope: LockScope, wait: Duration) -> Option<Lease<L>> {
        debug!(%scope, wait_ms = wait.as_millis() as u64, "attempting to acquire lock");

        if !self.primitive.try_acquire(scope, wait).await {
            debug!(%scope, "lock wait timed out");
            return None;
        }

        debug!(%scope, "acquired lock");
        Some(Lease {
            primitive: self.primitive.clone(),
            scope,
        })
    }

    /// Run `on_acquired` while holding `scope`, or `on_timeout` if the lock
    /// cannot be had within `wait`. Exactly one of the two runs.
    pub async fn with_lock<T, A, AF, B, BF>(
        &self,
        scope: LockScope,
        wait: Duration,
        on_acquired: A,
        on_timeout: B,
    ) -> T
    where
        A: FnOnce() -> AF,
        AF: Future<Output = T>,
        B: FnOnce() -> BF,
        BF: Future<Output = T>,
    {
        match self.acquire(scope, wait).await {
            Some(_lease) => on_acquired().await,
            None => on_timeout().await,
        }
    }

    /// Like [`with_lock`](Self::with_lock), logging a warning on timeout
    pub async fn with_lock_or_warn<T, A, AF>(
        &self,
        scope: LockScope,
        wait: Duration,
        on_acquired: A,
    ) -> Option<T>
    where
        A: FnOnce() -> AF,
        AF: Future<Output = T>,
    {
        match self.acquire(scope, wait).await {
            Some(_lease) => Some(on_acquired().await),
            None => {
                warn!(%scope, wait_ms = wait.as_millis() as u64, "took too long to acquire lock");
                None
            }
        }
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
