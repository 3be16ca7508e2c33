// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Locate the log a process should write to
//!
//! The chosen log is remembered in the property store, so every instance
//! sharing the store appends to the same file.

use crate::log_sink::FileLogSink;
use relog_core::{LogIdentity, LogSink, PropertyStore, SinkError, StoreError};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Property holding the directory of the remembered log
pub const LOG_DIR_KEY: &str = "relog.log.dir";

/// Property holding the name of the remembered log
pub const LOG_SHEET_KEY: &str = "relog.log.sheet";

/// Name given to a log created on first use
pub const DEFAULT_LOG_NAME: &str = "Logs";

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("log error: {0}")]
    Sink(#[from] SinkError),
}

/// Path of the remembered log, if any
pub async fn remembered_log<P: PropertyStore>(store: &P) -> Result<Option<PathBuf>, StoreError> {
    let dir = store.get_property(LOG_DIR_KEY).await?;
    let sheet = store.get_property(LOG_SHEET_KEY).await?;
    Ok(match (dir, sheet) {
        (Some(dir), Some(sheet)) => Some(FileLogSink::path_for(&LogIdentity::new(sheet, dir))),
        _ => None,
    })
}

/// Open the remembered log, or create `<default_dir>/Logs.jsonl` and
/// remember it
pub async fn open_or_create_log<P: PropertyStore>(
    store: &P,
    default_dir: &Path,
) -> Result<FileLogSink, BootstrapError> {
    if let Some(path) = remembered_log(store).await? {
        match FileLogSink::open(&path) {
            Ok(sink) => return Ok(sink),
            Err(SinkError::NotFound(_)) => {
                warn!(path = %path.display(), "remembered log is gone, creating a new one");
            }
            Err(e) => return Err(e.into()),
        }
    }

    let sink = FileLogSink::open_or_create(default_dir, DEFAULT_LOG_NAME)?;
    remember(store, &sink).await?;
    info!(path = %sink.path().display(), "using log");
    Ok(sink)
}

/// Record `sink` as the log to use from now on
pub async fn remember<P: PropertyStore>(store: &P, sink: &FileLogSink) -> Result<(), StoreError> {
    let identity = sink.identity();
    store
        .set_properties(&BTreeMap::from([
            (LOG_DIR_KEY.to_string(), identity.parent_id),
            (LOG_SHEET_KEY.to_string(), identity.sheet_id),
        ]))
        .await
}

#[cfg(test)]
#[path = "bootstrap_tests.rs"]
mod tests;
