// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Advisory file locks shared by every process on the host

use async_trait::async_trait;
use fs2::FileExt;
use relog_core::{LockPrimitive, LockScope};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// How often a contended lock is retried
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Lock primitive backed by `flock`-style exclusive file locks.
///
/// `Process` maps to `<dir>/process.lock`; `Caller` maps to
/// `<dir>/caller-<id>.lock`. Locks are not reentrant: a second acquire of a
/// held scope waits out its timeout.
#[derive(Clone)]
pub struct FileLockPrimitive {
    dir: PathBuf,
    caller_id: String,
    poll_interval: Duration,
    held: Arc<Mutex<HashMap<LockScope, File>>>,
}

impl FileLockPrimitive {
    pub fn new(dir: impl Into<PathBuf>, caller_id: impl Into<String>) -> io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            caller_id: caller_id.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            held: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn path_for(&self, scope: LockScope) -> PathBuf {
        match scope {
            LockScope::Process => self.dir.join("process.lock"),
            LockScope::Caller => self.dir.join(format!("caller-{}.lock", self.caller_id)),
        }
    }

    fn open(path: &Path) -> io::Result<File> {
        OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)
    }
}

#[async_trait]
impl LockPrimitive for FileLockPrimitive {
    async fn try_acquire(&self, scope: LockScope, wait: Duration) -> bool {
        let path = self.path_for(scope);
        let file = match Self::open(&path) {
            Ok(file) => file,
            Err(e) => {
                warn!(%scope, path = %path.display(), error = %e, "cannot open lock file");
                return false;
            }
        };

        // A wait too long to represent never runs out
        let deadline = Instant::now().checked_add(wait);
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => {
                    self.held
                        .lock()
                        .unwrap_or_else(|e| e.into_inner())
                        .insert(scope, file);
                    return true;
                }
                Err(e) => {
                    let now = Instant::now();
                    if deadline.is_some_and(|d| now >= d) {
                        debug!(%scope, error = %e, "lock still contended at deadline");
                        return false;
                    }
                    let pause = deadline
                        .map_or(self.poll_interval, |d| self.poll_interval.min(d - now));
                    tokio::time::sleep(pause).await;
                }
            }
        }
    }

    fn release(&self, scope: LockScope) {
        let file = self
            .held
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&scope);
        if let Some(file) = file {
            if let Err(e) = file.unlock() {
                warn!(%scope, error = %e, "failed to unlock, closing lock file instead");
            }
        }
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
