// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable queue of rows that could not be committed yet
//!
//! Each target log owns one slot in the property store, keyed by the log's
//! fingerprint. Every read-modify-write of a slot happens under the caller
//! lock so concurrent instances never lose each other's rows.

use crate::adapters::{LockPrimitive, LogIdentity, PropertyStore, StoreError};
use crate::batch::Batch;
use crate::coordination::{LockManager, LockScope};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Prefix of every pending-slot property key
pub const PENDING_KEY_PREFIX: &str = "relog.pending.";

/// Property key holding the pending rows for `log`
pub fn pending_key(log: &LogIdentity) -> String {
    format!("{}{}", PENDING_KEY_PREFIX, log.fingerprint())
}

/// Errors from the pending queue
#[derive(Debug, Error)]
pub enum PendingError {
    #[error("timed out waiting for the {0} lock")]
    LockTimeout(LockScope),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Durable, per-log holding area for rows awaiting retry
#[derive(Clone)]
pub struct PendingQueue<P: PropertyStore, L: LockPrimitive> {
    store: P,
    locks: LockManager<L>,
    lock_wait: Duration,
}

impl<P: PropertyStore, L: LockPrimitive> PendingQueue<P, L> {
    pub fn new(store: P, locks: LockManager<L>, lock_wait: Duration) -> Self {
        Self {
            store,
            locks,
            lock_wait,
        }
    }

    /// Merge `batch` onto the end of whatever is already pending for `log`
    pub async fn add_messages(&self, batch: &Batch, log: &LogIdentity) -> Result<(), PendingError> {
        let key = pending_key(log);
        let _lease = self
            .locks
            .acquire(LockScope::Caller, self.lock_wait)
            .await
            .ok_or(PendingError::LockTimeout(LockScope::Caller))?;

        let merged = match self.read(&key).await? {
            Some(saved) => saved.concat(batch.clone()),
            None => batch.clone(),
        };
        self.store
            .set_property(&key, &serde_json::to_string(&merged)?)
            .await?;

        info!(%log, added = batch.len(), pending = merged.len(), "saved rows to pending queue");
        Ok(())
    }

    /// Take everything pending for `log`, leaving the slot empty.
    ///
    /// Read and clear share one critical section. Once the read has
    /// succeeded the slot is cleared, even when its contents were unusable.
    pub async fn get_messages_out(&self, log: &LogIdentity) -> Result<Option<Batch>, PendingError> {
        let key = pending_key(log);
        let _lease = self
            .locks
            .acquire(LockScope::Caller, self.lock_wait)
            .await
            .ok_or(PendingError::LockTimeout(LockScope::Caller))?;

        let pending = self.read(&key).await?;
        self.store.delete_property(&key).await?;
        debug!(%log, rows = pending.as_ref().map_or(0, Batch::len), "cleared pending queue");

        Ok(pending)
    }

    /// Look at the pending rows for `log` without taking them
    pub async fn peek(&self, log: &LogIdentity) -> Result<Option<Batch>, PendingError> {
        self.read(&pending_key(log)).await
    }

    async fn read(&self, key: &str) -> Result<Option<Batch>, PendingError> {
        let Some(raw) = self.store.get_property(key).await? else {
            return Ok(None);
        };

        let parsed = serde_json::from_str::<Value>(&raw)
            .map_err(|e| e.to_string())
            .and_then(|value| Batch::from_value(value).map_err(|e| e.to_string()));

        match parsed {
            Ok(batch) => Ok(Some(batch)),
            Err(reason) => {
                warn!(key, %reason, "discarding unreadable pending rows");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
#[path = "pending_tests.rs"]
mod tests;
