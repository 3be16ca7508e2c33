// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable one-shot timers stored as JSON files
//!
//! A timer is registered by [`TimerService::schedule_once`] and fired by a
//! runner polling [`FileTimers::due`]. Fired timers stay registered until
//! cancelled, which the fired job does when it deregisters itself.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fs2::FileExt;
use relog_core::{Clock, IdGen, JobHandle, TimerError, TimerService};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// One registered timer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerEntry {
    pub id: String,
    pub function: String,
    pub fire_at: DateTime<Utc>,
    #[serde(default)]
    pub fired: bool,
}

impl TimerEntry {
    pub fn handle(&self) -> JobHandle {
        JobHandle {
            id: self.id.clone(),
            function: self.function.clone(),
        }
    }
}

/// Timer facility keeping each timer in `<dir>/<id>.json`
#[derive(Clone)]
pub struct FileTimers<C: Clock, G: IdGen> {
    dir: PathBuf,
    clock: C,
    ids: G,
}

impl<C: Clock, G: IdGen> FileTimers<C, G> {
    pub fn open(dir: impl Into<PathBuf>, clock: C, ids: G) -> Result<Self, TimerError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, clock, ids })
    }

    /// Every registered timer, earliest first
    pub fn entries(&self) -> Result<Vec<TimerEntry>, TimerError> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match read_entry(&path) {
                Ok(Some(timer)) => entries.push(timer),
                // Cancelled between listing and reading
                Ok(None) => {}
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable timer"),
            }
        }
        entries.sort_by(|a, b| a.fire_at.cmp(&b.fire_at).then_with(|| a.id.cmp(&b.id)));
        Ok(entries)
    }

    /// Mark every unfired timer due at `now` as fired and return them,
    /// earliest first.
    ///
    /// Concurrent runners are serialized on a lock file, so each timer is
    /// handed out once.
    pub fn due(&self, now: DateTime<Utc>) -> Result<Vec<JobHandle>, TimerError> {
        let runner = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.dir.join("runner.lock"))?;
        runner.lock_exclusive()?;

        let mut fired = Vec::new();
        for mut entry in self.entries()? {
            if entry.fired || entry.fire_at > now {
                continue;
            }
            entry.fired = true;
            self.write(&entry)?;
            debug!(id = %entry.id, function = %entry.function, "timer fired");
            fired.push(entry.handle());
        }

        runner.unlock()?;
        Ok(fired)
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    fn write(&self, entry: &TimerEntry) -> Result<(), TimerError> {
        let path = self.path_for(&entry.id);
        let temp = self.dir.join(format!(".{}.tmp", entry.id));
        fs::write(&temp, serde_json::to_string_pretty(entry)?)?;
        fs::rename(&temp, &path)?;
        Ok(())
    }
}

fn read_entry(path: &Path) -> Result<Option<TimerEntry>, TimerError> {
    match fs::read_to_string(path) {
        Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Ids become file names; anything unusual cannot be one of ours
fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[async_trait]
impl<C: Clock, G: IdGen> TimerService for FileTimers<C, G> {
    async fn schedule_once(&self, function: &str, delay: Duration) -> Result<JobHandle, TimerError> {
        let now = self.clock.now();
        let fire_at = chrono::Duration::from_std(delay)
            .ok()
            .and_then(|delay| now.checked_add_signed(delay))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let entry = TimerEntry {
            id: self.ids.next(),
            function: function.to_string(),
            fire_at,
            fired: false,
        };
        self.write(&entry)?;

        info!(id = %entry.id, function, %fire_at, "registered timer");
        Ok(entry.handle())
    }

    async fn cancel(&self, handle: &JobHandle) -> Result<(), TimerError> {
        if !is_valid_id(&handle.id) {
            return Ok(());
        }
        match fs::remove_file(self.path_for(&handle.id)) {
            Ok(()) => {
                debug!(id = %handle.id, "cancelled timer");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_active(&self) -> Result<Vec<JobHandle>, TimerError> {
        Ok(self.entries()?.iter().map(TimerEntry::handle).collect())
    }
}

#[cfg(test)]
#[path = "timer_tests.rs"]
mod tests;
