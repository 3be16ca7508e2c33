// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake adapter implementations for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::traits::*;
use crate::batch::Batch;
use crate::clock::{Clock, FakeClock};
use crate::coordination::LockScope;
use crate::envelope::Envelope;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Recorded call to an adapter method
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterCall {
    // Property store calls
    GetProperty { key: String },
    SetProperty { key: String },
    DeleteProperty { key: String },
    SetProperties { keys: Vec<String> },

    // Lock calls
    TryAcquire { scope: LockScope, granted: bool },
    Release { scope: LockScope },

    // Timer calls
    ScheduleOnce { function: String, id: String },
    CancelTimer { id: String },
    ListTimers,
}

#[derive(Debug, Clone)]
struct FakeTimer {
    handle: JobHandle,
    fire_at: DateTime<Utc>,
    fired: bool,
}

/// Shared state for fake adapters
#[derive(Default)]
struct FakeState {
    calls: Vec<AdapterCall>,
    properties: BTreeMap<String, String>,
    /// Scopes held through this fake
    held: HashSet<LockScope>,
    /// Scopes held by a simulated other instance
    foreign: HashSet<LockScope>,
    timers: Vec<FakeTimer>,
    next_timer: u64,
    store_fails: bool,
    timers_fail: bool,
}

/// Fake adapters with call recording for testing
#[derive(Clone)]
pub struct FakeAdapters {
    state: Arc<Mutex<FakeState>>,
    clock: FakeClock,
}

impl Default for FakeAdapters {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeAdapters {
    pub fn new() -> Self {
        Self::with_clock(FakeClock::new())
    }

    pub fn with_clock(clock: FakeClock) -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState::default())),
            clock,
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<AdapterCall> {
        self.lock_state().calls.clone()
    }

    /// Clear recorded calls
    pub fn clear_calls(&self) {
        self.lock_state().calls.clear();
    }

    /// Raw stored property value
    pub fn property(&self, key: &str) -> Option<String> {
        self.lock_state().properties.get(key).cloned()
    }

    /// Seed a property without recording a call
    pub fn put_property(&self, key: &str, value: &str) {
        self.lock_state()
            .properties
            .insert(key.to_string(), value.to_string());
    }

    /// Simulate another instance holding `scope`
    pub fn hold_externally(&self, scope: LockScope) {
        self.lock_state().foreign.insert(scope);
    }

    /// The simulated other instance lets go of `scope`
    pub fn release_externally(&self, scope: LockScope) {
        self.lock_state().foreign.remove(&scope);
    }

    /// Scopes currently held through these adapters
    pub fn held_scopes(&self) -> Vec<LockScope> {
        self.lock_state().held.iter().copied().collect()
    }

    /// Make every property store call fail
    pub fn set_store_fails(&self, fails: bool) {
        self.lock_state().store_fails = fails;
    }

    /// Make every timer call fail
    pub fn set_timers_fail(&self, fails: bool) {
        self.lock_state().timers_fail = fails;
    }

    /// Active timers, fired or not, in registration order
    pub fn active_timers(&self) -> Vec<JobHandle> {
        self.lock_state()
            .timers
            .iter()
            .map(|t| t.handle.clone())
            .collect()
    }

    /// Timers due at `now` that have not fired yet, earliest first.
    ///
    /// Fired timers stay registered until cancelled, like host triggers do.
    pub fn poll_timers(&self, now: DateTime<Utc>) -> Vec<JobHandle> {
        let mut state = self.lock_state();
        let mut due: Vec<&mut FakeTimer> = state
            .timers
            .iter_mut()
            .filter(|t| !t.fired && t.fire_at <= now)
            .collect();
        due.sort_by_key(|t| t.fire_at);

        due.into_iter()
            .map(|t| {
                t.fired = true;
                t.handle.clone()
            })
            .collect()
    }

    /// Drop a timer as if the host had garbage collected it
    pub fn forget_timer(&self, id: &str) {
        self.lock_state().timers.retain(|t| t.handle.id != id);
    }

    pub fn fake_clock(&self) -> FakeClock {
        self.clock.clone()
    }

    pub fn property_store(&self) -> FakePropertyStore {
        FakePropertyStore {
            state: self.state.clone(),
        }
    }

    pub fn lock_primitive(&self) -> FakeLockPrimitive {
        FakeLockPrimitive {
            state: self.state.clone(),
        }
    }

    pub fn timer_service(&self) -> FakeTimers {
        FakeTimers {
            state: self.state.clone(),
            clock: self.clock.clone(),
        }
    }
}

impl Adapters for FakeAdapters {
    type Store = FakePropertyStore;
    type Lock = FakeLockPrimitive;
    type Timers = FakeTimers;
    type Clock = FakeClock;

    fn store(&self) -> Self::Store {
        self.property_store()
    }

    fn locks(&self) -> Self::Lock {
        self.lock_primitive()
    }

    fn timers(&self) -> Self::Timers {
        self.timer_service()
    }

    fn clock(&self) -> Self::Clock {
        self.fake_clock()
    }
}

fn lock(state: &Mutex<FakeState>) -> MutexGuard<'_, FakeState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

// =============================================================================
// Property store
// =============================================================================

#[derive(Clone)]
pub struct FakePropertyStore {
    state: Arc<Mutex<FakeState>>,
}

impl FakePropertyStore {
    fn check(state: &FakeState) -> Result<(), StoreError> {
        if state.store_fails {
            return Err(StoreError::Unavailable("fake store failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl PropertyStore for FakePropertyStore {
    async fn get_property(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut state = lock(&self.state);
        state.calls.push(AdapterCall::GetProperty {
            key: key.to_string(),
        });
        Self::check(&state)?;
        Ok(state.properties.get(key).cloned())
    }

    async fn set_property(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut state = lock(&self.state);
        state.calls.push(AdapterCall::SetProperty {
            key: key.to_string(),
        });
        Self::check(&state)?;
        state.properties.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete_property(&self, key: &str) -> Result<(), StoreError> {
        let mut state = lock(&self.state);
        state.calls.push(AdapterCall::DeleteProperty {
            key: key.to_string(),
        });
        Self::check(&state)?;
        state.properties.remove(key);
        Ok(())
    }

    async fn set_properties(
        &self,
        properties: &BTreeMap<String, String>,
    ) -> Result<(), StoreError> {
        let mut state = lock(&self.state);
        state.calls.push(AdapterCall::SetProperties {
            keys: properties.keys().cloned().collect(),
        });
        Self::check(&state)?;
        state
            .properties
            .extend(properties.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(())
    }
}

// =============================================================================
// Lock primitive
// =============================================================================

/// Grants or refuses immediately; never actually waits
#[derive(Clone)]
pub struct FakeLockPrimitive {
    state: Arc<Mutex<FakeState>>,
}

#[async_trait]
impl LockPrimitive for FakeLockPrimitive {
    async fn try_acquire(&self, scope: LockScope, _wait: Duration) -> bool {
        let mut state = lock(&self.state);
        let granted = !state.held.contains(&scope) && !state.foreign.contains(&scope);
        if granted {
            state.held.insert(scope);
        }
        state.calls.push(AdapterCall::TryAcquire { scope, granted });
        granted
    }

    fn release(&self, scope: LockScope) {
        let mut state = lock(&self.state);
        state.held.remove(&scope);
        state.calls.push(AdapterCall::Release { scope });
    }
}

// =============================================================================
// Timers
// =============================================================================

#[derive(Clone)]
pub struct FakeTimers {
    state: Arc<Mutex<FakeState>>,
    clock: FakeClock,
}

impl FakeTimers {
    fn check(state: &FakeState) -> Result<(), TimerError> {
        if state.timers_fail {
            return Err(TimerError::Unavailable("fake timer failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl TimerService for FakeTimers {
    async fn schedule_once(
        &self,
        function: &str,
        delay: Duration,
    ) -> Result<JobHandle, TimerError> {
        let mut state = lock(&self.state);
        Self::check(&state)?;
        state.next_timer += 1;
        let handle = JobHandle {
            id: format!("timer-{}", state.next_timer),
            function: function.to_string(),
        };
        let delay = chrono::Duration::from_std(delay).unwrap_or(chrono::Duration::MAX);
        let now = self.clock.now();
        state.timers.push(FakeTimer {
            handle: handle.clone(),
            fire_at: now.checked_add_signed(delay).unwrap_or(now),
            fired: false,
        });
        state.calls.push(AdapterCall::ScheduleOnce {
            function: function.to_string(),
            id: handle.id.clone(),
        });
        Ok(handle)
    }

    async fn cancel(&self, handle: &JobHandle) -> Result<(), TimerError> {
        let mut state = lock(&self.state);
        state.calls.push(AdapterCall::CancelTimer {
            id: handle.id.clone(),
        });
        Self::check(&state)?;
        state.timers.retain(|t| t.handle.id != handle.id);
        Ok(())
    }

    async fn list_active(&self) -> Result<Vec<JobHandle>, TimerError> {
        let mut state = lock(&self.state);
        state.calls.push(AdapterCall::ListTimers);
        Self::check(&state)?;
        Ok(state.timers.iter().map(|t| t.handle.clone()).collect())
    }
}

// =============================================================================
// Log sink
// =============================================================================

#[derive(Default)]
struct SinkState {
    rows: Vec<Envelope>,
    appends: usize,
    fails: bool,
}

/// In-memory log that records appended rows
#[derive(Clone)]
pub struct FakeLogSink {
    identity: LogIdentity,
    state: Arc<Mutex<SinkState>>,
}

impl FakeLogSink {
    pub fn new(sheet_id: &str, parent_id: &str) -> Self {
        Self {
            identity: LogIdentity::new(sheet_id, parent_id),
            state: Arc::new(Mutex::new(SinkState::default())),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, SinkState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// All rows appended so far
    pub fn rows(&self) -> Vec<Envelope> {
        self.lock_state().rows.clone()
    }

    /// Payloads of all rows appended so far
    pub fn payloads(&self) -> Vec<String> {
        self.lock_state()
            .rows
            .iter()
            .map(|r| r.payload.clone())
            .collect()
    }

    /// Number of successful append calls
    pub fn appends(&self) -> usize {
        self.lock_state().appends
    }

    /// Configure appends to fail for testing error paths
    pub fn set_fails(&self, fails: bool) {
        self.lock_state().fails = fails;
    }
}

#[async_trait]
impl LogSink for FakeLogSink {
    fn identity(&self) -> LogIdentity {
        self.identity.clone()
    }

    async fn append(&self, batch: &Batch) -> Result<(), SinkError> {
        let mut state = self.lock_state();
        if state.fails {
            return Err(SinkError::Rejected("fake sink failure".to_string()));
        }
        state.rows.extend(batch.rows().iter().cloned());
        state.appends += 1;
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
