// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipeline factory for CLI commands

use anyhow::{Context as _, Result};
use relog_adapters::{FileLockPrimitive, FileTimers, TracedLogSink, TracedTimers};
use relog_core::{AdapterSet, Config, LogSink, Pipeline, SystemClock, UuidIdGen, CONFIG_FILE};
use relog_storage::{open_or_create_log, remembered_log, FileLogSink, FilePropertyStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Environment variable overriding the default state directory
pub const STATE_DIR_ENV: &str = "RELOG_STATE_DIR";

pub type Timers = FileTimers<SystemClock, UuidIdGen>;

pub type CliAdapters =
    AdapterSet<FilePropertyStore, FileLockPrimitive, TracedTimers<Timers>, SystemClock>;

/// Everything a command needs, rooted at one state directory
pub struct Context {
    pub state_dir: PathBuf,
    pub config: Config,
    pub adapters: CliAdapters,
    pub pipeline: Arc<Pipeline<CliAdapters>>,
}

impl Context {
    pub fn open(state_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&state_dir)
            .with_context(|| format!("cannot create state directory {}", state_dir.display()))?;
        let config = Config::load(&state_dir).with_context(|| {
            format!("cannot load {}", state_dir.join(CONFIG_FILE).display())
        })?;

        let store = FilePropertyStore::open(state_dir.join("properties"))?;
        let locks = FileLockPrimitive::new(state_dir.join("locks"), &config.caller_id)?;
        let timers = FileTimers::open(state_dir.join("timers"), SystemClock, UuidIdGen)?;
        let adapters = AdapterSet {
            store,
            locks,
            timers: TracedTimers::new(timers),
            clock: SystemClock,
        };
        let pipeline = Arc::new(Pipeline::new(&adapters, config.pipeline()));

        Ok(Self {
            state_dir,
            config,
            adapters,
            pipeline,
        })
    }

    /// Timer facility without the tracing wrapper, for polling and listing
    pub fn timers(&self) -> &Timers {
        self.adapters.timers.inner()
    }

    /// Open `path`, or the remembered log, creating a new log on first use
    pub async fn open_log(&self, path: Option<&Path>) -> Result<TracedLogSink<FileLogSink>> {
        let sink = match path {
            Some(path) => FileLogSink::open(path)?,
            None => open_or_create_log(&self.adapters.store, &self.state_dir.join("logs")).await?,
        };
        tracing::debug!(log = %sink.identity(), "opened log");
        Ok(TracedLogSink::new(sink))
    }

    /// Path of `path` or of the remembered log, without creating anything
    pub async fn existing_log(&self, path: Option<&Path>) -> Result<Option<PathBuf>> {
        match path {
            Some(path) => Ok(Some(path.to_path_buf())),
            None => Ok(remembered_log(&self.adapters.store).await?),
        }
    }
}

/// `--state-dir`, then `$RELOG_STATE_DIR`, then the platform data directory
pub fn resolve_state_dir(flag: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = flag {
        return Ok(dir);
    }
    if let Some(dir) = std::env::var_os(STATE_DIR_ENV).filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    dirs::data_local_dir()
        .map(|dir| dir.join("relog"))
        .ok_or_else(|| anyhow::anyhow!("no state directory; pass --state-dir or set {}", STATE_DIR_ENV))
}
