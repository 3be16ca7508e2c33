// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test utilities for CLI integration tests.

#![allow(dead_code)]

use assert_cmd::Command;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::Path;
use tempfile::TempDir;

/// Fresh state directory, cleaned up when dropped
pub fn setup_state() -> TempDir {
    TempDir::new().expect("Failed to create temp directory")
}

/// Setup a state directory with the given `relog.toml`
pub fn setup_state_with_config(config: &str) -> TempDir {
    let temp = setup_state();
    fs::write(temp.path().join("relog.toml"), config).expect("Failed to write config");
    temp
}

/// `relog` bound to `state`, with diagnostics quiet unless asked for
#[allow(deprecated)]
pub fn relog(state: &Path) -> Command {
    let mut cmd = Command::cargo_bin("relog").expect("relog binary should build");
    cmd.env("RELOG_STATE_DIR", state)
        .env_remove("RELOG_LOG")
        .env_remove("RUST_LOG");
    cmd
}

/// Hold the process lock from outside the CLI until the file is dropped
pub fn hold_process_lock(state: &Path) -> File {
    let dir = state.join("locks");
    fs::create_dir_all(&dir).expect("Failed to create lock dir");
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(dir.join("process.lock"))
        .expect("Failed to open lock file");
    file.lock_exclusive().expect("Failed to lock");
    file
}

/// Stdout of a successful run
pub fn stdout(cmd: &mut Command) -> String {
    let output = cmd.output().expect("Failed to run relog");
    assert!(
        output.status.success(),
        "relog failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).to_string()
}
