// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::property_store::FilePropertyStore;
use relog_core::FakeAdapters;
use relog_core::Adapters;

#[tokio::test]
async fn first_use_creates_and_remembers_a_log() {
    let dir = tempfile::tempdir().unwrap();
    let adapters = FakeAdapters::new();
    let store = adapters.store();

    let sink = open_or_create_log(&store, dir.path()).await.unwrap();

    assert!(sink.path().ends_with("Logs.jsonl"));
    assert_eq!(adapters.property(LOG_SHEET_KEY), Some("Logs".to_string()));
    assert_eq!(
        remembered_log(&store).await.unwrap().as_deref(),
        Some(sink.path())
    );
}

#[tokio::test]
async fn remembered_log_is_reused() {
    let first_dir = tempfile::tempdir().unwrap();
    let second_dir = tempfile::tempdir().unwrap();
    let store = FilePropertyStore::open(first_dir.path().join("properties")).unwrap();

    let first = open_or_create_log(&store, first_dir.path()).await.unwrap();
    let second = open_or_create_log(&store, second_dir.path()).await.unwrap();

    assert_eq!(first.path(), second.path());
    assert_eq!(first.identity(), second.identity());
}

#[tokio::test]
async fn vanished_log_is_recreated() {
    let dir = tempfile::tempdir().unwrap();
    let store = FilePropertyStore::open(dir.path().join("properties")).unwrap();
    let first = open_or_create_log(&store, dir.path()).await.unwrap();
    std::fs::remove_file(first.path()).unwrap();

    let second = open_or_create_log(&store, dir.path()).await.unwrap();

    assert!(second.path().exists());
    assert!(FileLogSink::read_rows(second.path()).unwrap().is_empty());
}

#[tokio::test]
async fn nothing_remembered_yet() {
    let adapters = FakeAdapters::new();
    assert_eq!(remembered_log(&adapters.store()).await.unwrap(), None);
}
