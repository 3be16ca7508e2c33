// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Validated batches of envelopes

use crate::envelope::Envelope;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Why a batch was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidBatch {
    #[error("batch is empty")]
    Empty,
    #[error("batch is not a sequence of rows")]
    NotASequence,
    #[error("row {index} is not a [timestamp, message] pair")]
    MalformedEntry { index: usize },
}

/// A non-empty, ordered sequence of envelopes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Batch(Vec<Envelope>);

impl Batch {
    pub fn new(rows: Vec<Envelope>) -> Result<Self, InvalidBatch> {
        if rows.is_empty() {
            return Err(InvalidBatch::Empty);
        }
        Ok(Self(rows))
    }

    /// Validate untyped rows, e.g. read back from durable storage
    pub fn from_value(value: Value) -> Result<Self, InvalidBatch> {
        let Value::Array(entries) = value else {
            return Err(InvalidBatch::NotASequence);
        };

        let rows = entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| match entry {
                Value::Array(mut pair) if pair.len() == 2 => {
                    match (pair.remove(0), pair.remove(0)) {
                        (Value::String(timestamp), Value::String(payload)) => {
                            Ok(Envelope { timestamp, payload })
                        }
                        _ => Err(InvalidBatch::MalformedEntry { index }),
                    }
                }
                _ => Err(InvalidBatch::MalformedEntry { index }),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(rows)
    }

    /// Append `other` after the rows already in this batch
    pub fn concat(mut self, other: Batch) -> Self {
        self.0.extend(other.0);
        self
    }

    pub fn rows(&self) -> &[Envelope] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; kept for clippy's `len_without_is_empty`
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_rows(self) -> Vec<Envelope> {
        self.0
    }
}

impl TryFrom<Vec<Envelope>> for Batch {
    type Error = InvalidBatch;

    fn try_from(rows: Vec<Envelope>) -> Result<Self, Self::Error> {
        Batch::new(rows)
    }
}

#[cfg(test)]
#[path = "batch_tests.rs"]
mod tests;
