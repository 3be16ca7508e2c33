// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Two-column, append-only log file
//!
//! Each line is a JSON array `[date, message]`. The first line is the
//! header row `["Date","Message"]`.

use async_trait::async_trait;
use relog_core::{Batch, Envelope, LogIdentity, LogSink, SinkError};
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Column titles written as the first row of every new log
pub const HEADER: [&str; 2] = ["Date", "Message"];

/// File extension of log files
pub const LOG_EXTENSION: &str = "jsonl";

/// Append-only log file implementing [`LogSink`]
pub struct FileLogSink {
    path: PathBuf,
    identity: LogIdentity,
    file: Mutex<File>,
}

impl FileLogSink {
    /// Open an existing log
    pub fn open(path: &Path) -> Result<Self, SinkError> {
        let file = match OpenOptions::new().append(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(SinkError::NotFound(path.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        Self::from_file(path, file)
    }

    /// Open the log `<dir>/<name>.jsonl`, creating it with a header row
    /// if it does not exist yet
    pub fn open_or_create(dir: &Path, name: &str) -> Result<Self, SinkError> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.{}", name, LOG_EXTENSION));

        match OpenOptions::new().append(true).create_new(true).open(&path) {
            Ok(mut file) => {
                writeln!(file, "{}", serde_json::to_string(&HEADER)?)?;
                file.sync_all()?;
                tracing::info!(path = %path.display(), "created log");
                Self::from_file(&path, file)
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Self::open(&path),
            Err(e) => Err(e.into()),
        }
    }

    fn from_file(path: &Path, file: File) -> Result<Self, SinkError> {
        let path = path.canonicalize()?;
        let sheet_id = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let parent_id = path
            .parent()
            .map(|p| p.display().to_string())
            .unwrap_or_default();

        Ok(Self {
            identity: LogIdentity::new(sheet_id, parent_id),
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where the log with `identity` lives
    pub fn path_for(identity: &LogIdentity) -> PathBuf {
        Path::new(&identity.parent_id).join(format!("{}.{}", identity.sheet_id, LOG_EXTENSION))
    }

    /// Read every row after the header
    pub fn read_rows(path: &Path) -> Result<Vec<Envelope>, SinkError> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(SinkError::NotFound(path.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let header = serde_json::to_string(&HEADER)?;
        let mut rows = Vec::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.is_empty() || (index == 0 && line == header) {
                continue;
            }
            rows.push(serde_json::from_str(&line)?);
        }
        Ok(rows)
    }
}

#[async_trait]
impl LogSink for FileLogSink {
    fn identity(&self) -> LogIdentity {
        self.identity.clone()
    }

    async fn append(&self, batch: &Batch) -> Result<(), SinkError> {
        let mut buf = String::new();
        for row in batch.rows() {
            buf.push_str(&serde_json::to_string(row)?);
            buf.push('\n');
        }

        // Single write so the batch stays contiguous
        let mut file = self.file.lock().unwrap_or_else(|e| e.into_inner());
        file.write_all(buf.as_bytes())?;
        file.sync_all()?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "log_sink_tests.rs"]
mod tests;
