// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Durable file-backed storage for relog

pub mod bootstrap;
pub mod log_sink;
pub mod property_store;

pub use bootstrap::{open_or_create_log, remembered_log, BootstrapError};
pub use log_sink::FileLogSink;
pub use property_store::FilePropertyStore;
