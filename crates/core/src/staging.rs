// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory staging buffer owned by a single logger

use crate::clock::Clock;
use crate::envelope::{Envelope, Message};

/// Accumulates timestamped envelopes until the owner commits them
#[derive(Debug)]
pub struct StagingBuffer<C: Clock> {
    clock: C,
    staged: Vec<Envelope>,
}

impl<C: Clock> StagingBuffer<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            staged: Vec::new(),
        }
    }

    /// Timestamp and append a message
    pub fn stage(&mut self, message: impl Into<Message>) {
        let payload = message.into().render();
        self.staged.push(Envelope::new(self.clock.timestamp(), payload));
    }

    /// Remove and return everything staged so far, in staging order
    pub fn drain(&mut self) -> Vec<Envelope> {
        std::mem::take(&mut self.staged)
    }

    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }
}

#[cfg(test)]
#[path = "staging_tests.rs"]
mod tests;
