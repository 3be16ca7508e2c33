// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI command implementations

pub mod jobs;
pub mod log;
pub mod pending;
pub mod retry;
pub mod timers;
pub mod write;
