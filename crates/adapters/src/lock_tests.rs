// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use relog_core::LockManager;

const SHORT: Duration = Duration::from_millis(30);

fn primitive(dir: &Path, caller: &str) -> FileLockPrimitive {
    FileLockPrimitive::new(dir, caller)
        .unwrap()
        .with_poll_interval(Duration::from_millis(5))
}

#[tokio::test]
async fn acquire_and_release() {
    let dir = tempfile::tempdir().unwrap();
    let locks = primitive(dir.path(), "web");

    assert!(locks.try_acquire(LockScope::Process, SHORT).await);
    locks.release(LockScope::Process);
    assert!(locks.try_acquire(LockScope::Process, SHORT).await);
}

#[tokio::test]
async fn contended_lock_times_out() {
    let dir = tempfile::tempdir().unwrap();
    let holder = primitive(dir.path(), "web");
    let waiter = primitive(dir.path(), "cron");

    assert!(holder.try_acquire(LockScope::Process, SHORT).await);

    let start = Instant::now();
    assert!(!waiter.try_acquire(LockScope::Process, SHORT).await);
    assert!(start.elapsed() >= SHORT);
}

#[tokio::test]
async fn waiter_gets_lock_once_released() {
    let dir = tempfile::tempdir().unwrap();
    let holder = primitive(dir.path(), "web");
    let waiter = primitive(dir.path(), "cron");
    assert!(holder.try_acquire(LockScope::Process, SHORT).await);

    let release = {
        let holder = holder.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            holder.release(LockScope::Process);
        })
    };

    assert!(waiter.try_acquire(LockScope::Process, Duration::from_secs(5)).await);
    release.await.unwrap();
}

#[tokio::test]
async fn unbounded_wait_acquires_free_lock() {
    let dir = tempfile::tempdir().unwrap();
    let locks = primitive(dir.path(), "web");

    assert!(locks.try_acquire(LockScope::Process, Duration::MAX).await);
}

#[tokio::test]
async fn unbounded_wait_outlasts_holder() {
    let dir = tempfile::tempdir().unwrap();
    let holder = primitive(dir.path(), "web");
    let waiter = primitive(dir.path(), "cron");
    assert!(holder.try_acquire(LockScope::Process, SHORT).await);

    let release = {
        let holder = holder.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            holder.release(LockScope::Process);
        })
    };

    assert!(waiter.try_acquire(LockScope::Process, Duration::MAX).await);
    release.await.unwrap();
}

#[tokio::test]
async fn caller_locks_are_per_caller_id() {
    let dir = tempfile::tempdir().unwrap();
    let web = primitive(dir.path(), "web");
    let cron = primitive(dir.path(), "cron");

    assert!(web.try_acquire(LockScope::Caller, SHORT).await);
    assert!(cron.try_acquire(LockScope::Caller, SHORT).await);
    assert_ne!(web.path_for(LockScope::Caller), cron.path_for(LockScope::Caller));
}

#[tokio::test]
async fn same_caller_id_shares_the_lock() {
    let dir = tempfile::tempdir().unwrap();
    let first = primitive(dir.path(), "web");
    let second = primitive(dir.path(), "web");

    assert!(first.try_acquire(LockScope::Caller, SHORT).await);
    assert!(!second.try_acquire(LockScope::Caller, SHORT).await);
}

#[tokio::test]
async fn lease_drop_releases_file_lock() {
    let dir = tempfile::tempdir().unwrap();
    let manager = LockManager::new(primitive(dir.path(), "web"));
    let other = primitive(dir.path(), "cron");

    let lease = manager.acquire(LockScope::Process, SHORT).await;
    assert!(lease.is_some());
    assert!(!other.try_acquire(LockScope::Process, SHORT).await);

    drop(lease);
    assert!(other.try_acquire(LockScope::Process, SHORT).await);
}

#[test]
fn release_of_unheld_scope_is_harmless() {
    let dir = tempfile::tempdir().unwrap();
    primitive(dir.path(), "web").release(LockScope::Caller);
}
