// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordination between concurrent instances sharing durable state

pub mod lock;

pub use lock::{Lease, LockManager, LockScope, DEFAULT_LOCK_WAIT};
