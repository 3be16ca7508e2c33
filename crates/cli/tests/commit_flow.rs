// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI integration tests for writing, deferring and retrying

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

mod common;

use common::{hold_process_lock, relog, setup_state, setup_state_with_config, stdout};
use predicates::prelude::*;
use std::fs;

#[test]
fn test_relog_help() {
    relog(setup_state().path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("append-only log"));
}

#[test]
fn test_write_commits_in_order() {
    let state = setup_state();

    relog(state.path())
        .args(["write", "first", "second"])
        .assert()
        .success()
        .stdout(predicate::str::contains("committed 2 rows"));

    let log = stdout(relog(state.path()).args(["log", "show"]));
    let first = log.find("first").expect("first row logged");
    let second = log.find("second").expect("second row logged");
    assert!(first < second, "rows out of order:\n{}", log);
}

#[test]
fn test_write_creates_log_with_header() {
    let state = setup_state();

    relog(state.path()).args(["write", "hello"]).assert().success();

    let content = std::fs::read_to_string(state.path().join("logs/Logs.jsonl")).unwrap();
    let mut lines = content.lines();
    assert_eq!(lines.next(), Some(r#"["Date","Message"]"#));
    assert!(lines.next().unwrap().ends_with(r#","hello"]"#));
}

#[test]
fn test_write_reuses_remembered_log() {
    let state = setup_state();

    relog(state.path()).args(["write", "one"]).assert().success();
    relog(state.path()).args(["write", "two"]).assert().success();

    let rows: serde_json::Value =
        serde_json::from_str(&stdout(relog(state.path()).args(["-o", "json", "log", "show"])))
            .unwrap();
    let payloads: Vec<&str> = rows
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row[1].as_str().unwrap())
        .collect();
    assert_eq!(payloads, vec!["one", "two"]);
}

#[test]
fn test_write_json_output() {
    let state = setup_state();

    let report: serde_json::Value = serde_json::from_str(&stdout(
        relog(state.path()).args(["-o", "json", "write", "hello"]),
    ))
    .unwrap();

    assert_eq!(report["status"], "committed");
    assert_eq!(report["rows"], 1);
}

#[test]
fn test_write_json_messages_render_compact() {
    let state = setup_state();

    relog(state.path())
        .args(["write", "--json", r#"{ "user": 7 }"#, r#""plain""#])
        .assert()
        .success();

    relog(state.path())
        .args(["log", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"{"user":7}"#))
        .stdout(predicate::str::contains("plain"));
}

#[test]
fn test_write_rejects_invalid_json() {
    let state = setup_state();

    relog(state.path())
        .args(["write", "--json", "{nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not valid JSON"));
}

#[test]
fn test_write_requires_a_message() {
    relog(setup_state().path()).arg("write").assert().failure();
}

#[test]
fn test_busy_log_defers_to_pending_queue() {
    let state = setup_state_with_config("process_lock_wait = \"50ms\"\nretry_delay = \"1h\"\n");
    let lock = hold_process_lock(state.path());

    relog(state.path())
        .args(["write", "late"])
        .assert()
        .success()
        .stdout(predicate::str::contains("deferred 1 row (lock timeout); retry scheduled as"));

    relog(state.path())
        .args(["pending", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("late"));
    relog(state.path())
        .args(["jobs", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("commit-pending").and(predicate::str::contains("live")));

    // A second deferral shares the scheduled retry
    relog(state.path())
        .args(["write", "later"])
        .assert()
        .success()
        .stdout(predicate::str::contains("retry already scheduled"));

    drop(lock);
    relog(state.path())
        .args(["log", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("late").not());
}

#[test]
fn test_timer_runner_delivers_deferred_rows() {
    let state = setup_state_with_config("process_lock_wait = \"50ms\"\nretry_delay = \"0s\"\n");
    let lock = hold_process_lock(state.path());

    relog(state.path()).args(["write", "queued"]).assert().success();
    drop(lock);

    relog(state.path())
        .args(["timers", "run", "--once"])
        .assert()
        .success()
        .stdout(predicate::str::contains("committed 1 row"));

    relog(state.path())
        .args(["log", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("queued"));
    relog(state.path())
        .args(["pending", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No pending rows"));
    relog(state.path())
        .args(["timers", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No timers"));
}

#[test]
fn test_timer_runner_delivers_to_each_deferred_log() {
    let state = setup_state_with_config("process_lock_wait = \"50ms\"\nretry_delay = \"0s\"\n");
    relog(state.path()).args(["write", "seed"]).assert().success();
    let other = state.path().join("Other.jsonl");
    fs::write(&other, "[\"Date\",\"Message\"]\n").unwrap();

    let lock = hold_process_lock(state.path());
    relog(state.path()).args(["write", "for-default"]).assert().success();
    relog(state.path())
        .args(["write", "--log"])
        .arg(&other)
        .arg("for-other")
        .assert()
        .success()
        .stdout(predicate::str::contains("retry scheduled as"));
    drop(lock);

    relog(state.path())
        .args(["timers", "run", "--once"])
        .assert()
        .success();

    relog(state.path())
        .args(["log", "show", "--log"])
        .arg(&other)
        .assert()
        .success()
        .stdout(predicate::str::contains("for-other"));
    relog(state.path())
        .args(["log", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("for-default").and(predicate::str::contains("for-other").not()));
    relog(state.path())
        .args(["pending", "show", "--log"])
        .arg(&other)
        .assert()
        .success()
        .stdout(predicate::str::contains("No pending rows"));
    relog(state.path())
        .args(["jobs", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No scheduled jobs"));
}

#[test]
fn test_manual_retry_delivers_pending_rows() {
    let state = setup_state_with_config("process_lock_wait = \"50ms\"\nretry_delay = \"1h\"\n");
    let lock = hold_process_lock(state.path());
    relog(state.path()).args(["write", "stuck"]).assert().success();
    drop(lock);

    relog(state.path())
        .arg("retry")
        .assert()
        .success()
        .stdout(predicate::str::contains("committed 1 row"));
    relog(state.path())
        .arg("retry")
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing pending"));
}

#[test]
fn test_retry_with_nothing_pending() {
    let state = setup_state();

    let report: serde_json::Value = serde_json::from_str(&stdout(
        relog(state.path()).args(["-o", "json", "retry", "timer-gone"]),
    ))
    .unwrap();

    assert_eq!(report["status"], "nothing_pending");
}
