// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::adapters::{AdapterCall, FakeAdapters, FakeLogSink, JobHandle};
use crate::clock::Clock;
use crate::pending::pending_key;
use crate::scheduler::JOBS_KEY;
use yare::parameterized;

fn setup() -> (FakeAdapters, Pipeline<FakeAdapters>, FakeLogSink) {
    let adapters = FakeAdapters::new();
    let pipeline = Pipeline::new(&adapters, PipelineConfig::default());
    let sink = FakeLogSink::new("Log", "/srv/relog");
    (adapters, pipeline, sink)
}

fn rows(adapters: &FakeAdapters, payloads: &[&str]) -> Vec<Envelope> {
    let clock = adapters.fake_clock();
    payloads
        .iter()
        .map(|p| {
            clock.advance(Duration::from_millis(5));
            Envelope::new(clock.timestamp(), *p)
        })
        .collect()
}

fn pending_payloads(adapters: &FakeAdapters, sink: &FakeLogSink) -> Vec<String> {
    let Some(raw) = adapters.property(&pending_key(&sink.identity())) else {
        return Vec::new();
    };
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    Batch::from_value(value)
        .unwrap()
        .rows()
        .iter()
        .map(|r| r.payload.clone())
        .collect()
}

fn scheduled(outcome: &CommitOutcome) -> JobHandle {
    match outcome {
        CommitOutcome::Deferred {
            retry: Some(ScheduleOutcome::Scheduled(handle)),
            ..
        } => handle.clone(),
        other => panic!("expected a freshly scheduled retry, got {:?}", other),
    }
}

#[tokio::test]
async fn commit_with_free_lock_appends_in_order() {
    let (adapters, pipeline, sink) = setup();
    let staged = rows(&adapters, &["a", "b"]);

    let outcome = pipeline.commit(staged.clone(), &sink).await.unwrap();

    assert_eq!(outcome, CommitOutcome::Committed { rows: 2 });
    assert_eq!(sink.rows(), staged);
    assert!(pending_payloads(&adapters, &sink).is_empty());
    assert!(adapters.active_timers().is_empty());
    assert!(adapters.held_scopes().is_empty());
}

#[tokio::test]
async fn commit_with_busy_lock_queues_and_schedules_once() {
    let (adapters, pipeline, sink) = setup();
    adapters.hold_externally(LockScope::Process);

    let outcome = pipeline
        .commit(rows(&adapters, &["x"]), &sink)
        .await
        .unwrap();

    let handle = scheduled(&outcome);
    assert_eq!(handle.function, pipeline.retry_job_for(&sink.identity()));
    assert!(pipeline.is_retry_job(&handle.function));
    assert!(sink.rows().is_empty());
    assert_eq!(pending_payloads(&adapters, &sink), vec!["x"]);
    assert_eq!(adapters.active_timers(), vec![handle]);
}

#[tokio::test]
async fn second_deferral_reuses_the_scheduled_retry() {
    let (adapters, pipeline, sink) = setup();
    adapters.hold_externally(LockScope::Process);

    let first = pipeline
        .commit(rows(&adapters, &["x"]), &sink)
        .await
        .unwrap();
    let second = pipeline
        .commit(rows(&adapters, &["y"]), &sink)
        .await
        .unwrap();

    let handle = scheduled(&first);
    match second {
        CommitOutcome::Deferred {
            retry: Some(ScheduleOutcome::AlreadyScheduled(job)),
            cause: DeferCause::LockTimeout,
            rows: 1,
        } => assert_eq!(job.job_id, handle.id),
        other => panic!("expected reuse of the retry, got {:?}", other),
    }
    assert_eq!(adapters.active_timers().len(), 1);
    assert_eq!(pending_payloads(&adapters, &sink), vec!["x", "y"]);
}

#[tokio::test]
async fn empty_commit_is_rejected_without_side_effects() {
    let (adapters, pipeline, sink) = setup();

    let outcome = pipeline.commit(Vec::new(), &sink).await.unwrap();

    assert_eq!(outcome, CommitOutcome::Rejected(InvalidBatch::Empty));
    assert!(adapters.calls().is_empty());
    assert_eq!(sink.appends(), 0);
}

#[tokio::test]
async fn sink_failure_is_deferred() {
    let (adapters, pipeline, sink) = setup();
    sink.set_fails(true);

    let outcome = pipeline
        .commit(rows(&adapters, &["x"]), &sink)
        .await
        .unwrap();

    match &outcome {
        CommitOutcome::Deferred {
            cause: DeferCause::SinkFailed(reason),
            ..
        } => assert!(reason.contains("fake sink failure")),
        other => panic!("expected sink failure deferral, got {:?}", other),
    }
    scheduled(&outcome);
    assert_eq!(pending_payloads(&adapters, &sink), vec!["x"]);
}

#[tokio::test]
async fn caller_lock_is_never_taken_inside_the_process_lock() {
    let (adapters, pipeline, sink) = setup();
    sink.set_fails(true);

    pipeline
        .commit(rows(&adapters, &["x"]), &sink)
        .await
        .unwrap();

    let lock_calls: Vec<_> = adapters
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            AdapterCall::TryAcquire { scope, .. } => Some(format!("+{}", scope)),
            AdapterCall::Release { scope } => Some(format!("-{}", scope)),
            _ => None,
        })
        .collect();
    assert_eq!(
        lock_calls,
        vec!["+process", "-process", "+caller", "-caller", "+caller", "-caller"]
    );
}

#[tokio::test]
async fn stranded_rows_are_handed_back() {
    let (adapters, pipeline, sink) = setup();
    adapters.hold_externally(LockScope::Process);
    adapters.hold_externally(LockScope::Caller);
    let staged = rows(&adapters, &["x", "y"]);

    let err = pipeline.commit(staged.clone(), &sink).await.unwrap_err();

    match err {
        CommitError::Stranded { batch, source } => {
            assert_eq!(batch.into_rows(), staged);
            assert!(matches!(source, PendingError::LockTimeout(LockScope::Caller)));
        }
        other => panic!("expected stranded rows, got {:?}", other),
    }
    assert!(adapters.active_timers().is_empty());
}

#[tokio::test]
async fn scheduling_failure_still_defers() {
    let (adapters, pipeline, sink) = setup();
    adapters.hold_externally(LockScope::Process);
    adapters.set_timers_fail(true);

    let outcome = pipeline
        .commit(rows(&adapters, &["x"]), &sink)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        CommitOutcome::Deferred {
            rows: 1,
            cause: DeferCause::LockTimeout,
            retry: None
        }
    );
    assert_eq!(pending_payloads(&adapters, &sink), vec!["x"]);
}

#[tokio::test]
async fn retry_appends_pending_in_stored_order() {
    let (adapters, pipeline, sink) = setup();
    adapters.hold_externally(LockScope::Process);
    let first = pipeline
        .commit(rows(&adapters, &["x"]), &sink)
        .await
        .unwrap();
    pipeline
        .commit(rows(&adapters, &["y"]), &sink)
        .await
        .unwrap();
    let handle = scheduled(&first);

    adapters.release_externally(LockScope::Process);
    let clock = adapters.fake_clock();
    clock.advance(DEFAULT_RETRY_DELAY);
    assert_eq!(adapters.poll_timers(clock.now()), vec![handle.clone()]);
    adapters.clear_calls();

    let outcome = pipeline.retry(&handle.id, &sink).await.unwrap();

    assert_eq!(
        outcome,
        RetryOutcome::Delivered(CommitOutcome::Committed { rows: 2 })
    );
    assert_eq!(sink.payloads(), vec!["x", "y"]);
    assert!(pending_payloads(&adapters, &sink).is_empty());
    assert!(adapters.active_timers().is_empty());
    assert_eq!(adapters.property(JOBS_KEY), None);
}

#[tokio::test]
async fn retry_deregisters_before_the_append() {
    let (adapters, pipeline, sink) = setup();
    adapters.hold_externally(LockScope::Process);
    let handle = scheduled(
        &pipeline
            .commit(rows(&adapters, &["x"]), &sink)
            .await
            .unwrap(),
    );
    adapters.release_externally(LockScope::Process);
    adapters.clear_calls();

    pipeline.retry(&handle.id, &sink).await.unwrap();

    let calls = adapters.calls();
    let cancelled = calls
        .iter()
        .position(|c| *c == AdapterCall::CancelTimer { id: handle.id.clone() });
    let appended_under = calls.iter().position(|c| {
        *c == AdapterCall::TryAcquire {
            scope: LockScope::Process,
            granted: true,
        }
    });
    assert!(cancelled.is_some());
    assert!(cancelled < appended_under);
}

#[tokio::test]
async fn retry_with_nothing_pending() {
    let (adapters, pipeline, sink) = setup();

    let outcome = pipeline.retry("timer-9", &sink).await.unwrap();

    assert_eq!(outcome, RetryOutcome::NothingPending);
    assert_eq!(sink.appends(), 0);
    assert!(adapters.active_timers().is_empty());
}

#[tokio::test]
async fn retry_while_still_busy_requeues_and_reschedules() {
    let (adapters, pipeline, sink) = setup();
    adapters.hold_externally(LockScope::Process);
    let handle = scheduled(
        &pipeline
            .commit(rows(&adapters, &["x"]), &sink)
            .await
            .unwrap(),
    );

    let outcome = pipeline.retry(&handle.id, &sink).await.unwrap();

    let RetryOutcome::Delivered(deferred) = outcome else {
        panic!("expected a delivery attempt");
    };
    let next = scheduled(&deferred);
    assert_ne!(next.id, handle.id);
    assert_eq!(pending_payloads(&adapters, &sink), vec!["x"]);
    assert_eq!(adapters.active_timers(), vec![next]);
}

#[tokio::test]
async fn retry_only_drains_its_own_log() {
    let (adapters, pipeline, sink) = setup();
    let other = FakeLogSink::new("Log", "/srv/other");
    adapters.hold_externally(LockScope::Process);
    pipeline
        .commit(rows(&adapters, &["mine"]), &sink)
        .await
        .unwrap();
    pipeline
        .commit(rows(&adapters, &["theirs"]), &other)
        .await
        .unwrap();
    adapters.release_externally(LockScope::Process);

    pipeline.retry("timer-1", &sink).await.unwrap();

    assert_eq!(sink.payloads(), vec!["mine"]);
    assert_eq!(pending_payloads(&adapters, &other), vec!["theirs"]);
    let jobs = pipeline.scheduler().list_jobs().await.unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].name, pipeline.retry_job_for(&other.identity()));
    assert_eq!(jobs[0].job.log, Some(other.identity()));
    assert!(jobs[0].live);
}

#[tokio::test]
async fn each_log_gets_its_own_retry() {
    let (adapters, pipeline, sink) = setup();
    let other = FakeLogSink::new("Log", "/srv/other");
    adapters.hold_externally(LockScope::Process);

    let mine = pipeline
        .commit(rows(&adapters, &["mine"]), &sink)
        .await
        .unwrap();
    let theirs = pipeline
        .commit(rows(&adapters, &["theirs"]), &other)
        .await
        .unwrap();

    let (mine, theirs) = (scheduled(&mine), scheduled(&theirs));
    assert_ne!(mine.id, theirs.id);
    assert_ne!(mine.function, theirs.function);
    assert_eq!(adapters.active_timers().len(), 2);

    let routed = pipeline
        .scheduler()
        .job_for_trigger(&theirs.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(routed.job.log, Some(other.identity()));
}

#[parameterized(
    per_log = { "commit-pending-0123456789ab", true },
    bare_name = { "commit-pending", false },
    short_suffix = { "commit-pending-0123", false },
    not_hex = { "commit-pending-0123456789xz", false },
    other_job = { "rotate-logs-0123456789ab", false },
)]
fn recognises_retry_jobs(function: &str, expected: bool) {
    let adapters = FakeAdapters::new();
    let pipeline = Pipeline::new(&adapters, PipelineConfig::default());
    assert_eq!(pipeline.is_retry_job(function), expected);
}

#[tokio::test]
async fn retry_survives_deregistration_failure() {
    let (adapters, pipeline, sink) = setup();
    adapters.put_property(
        &pending_key(&sink.identity()),
        r#"[["2026-01-01T00:00:00.000Z","x"]]"#,
    );
    adapters.set_timers_fail(true);

    let outcome = pipeline.retry("timer-1", &sink).await.unwrap();

    assert_eq!(
        outcome,
        RetryOutcome::Delivered(CommitOutcome::Committed { rows: 1 })
    );
}

#[tokio::test]
async fn retry_reports_unreachable_pending_queue() {
    let (adapters, pipeline, sink) = setup();
    adapters.hold_externally(LockScope::Caller);

    let err = pipeline.retry("timer-1", &sink).await.unwrap_err();

    assert!(matches!(err, CommitError::Pending(PendingError::LockTimeout(_))));
}

#[test]
fn custom_retry_job_name_is_used() {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    runtime.block_on(async {
        let adapters = FakeAdapters::new();
        let pipeline = Pipeline::new(
            &adapters,
            PipelineConfig {
                retry_job: "flush-audit-log".to_string(),
                ..PipelineConfig::default()
            },
        );
        let sink = FakeLogSink::new("Audit", "/srv/relog");
        adapters.hold_externally(LockScope::Process);

        let outcome = pipeline
            .commit(rows(&adapters, &["x"]), &sink)
            .await
            .unwrap();

        let function = scheduled(&outcome).function;
        assert!(function.starts_with("flush-audit-log-"), "{}", function);
        assert!(pipeline.is_retry_job(&function));
    });
}

#[test]
fn defer_cause_display() {
    assert_eq!(DeferCause::LockTimeout.to_string(), "lock timeout");
    assert_eq!(
        DeferCause::SinkFailed("disk full".to_string()).to_string(),
        "sink failed: disk full"
    );
}
