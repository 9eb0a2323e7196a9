// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use pj_core::test_support::structure_request;
use pj_core::{FakeClock, Job, JobConfig};
use tempfile::TempDir;

fn setup() -> (TempDir, JobStore, FakeClock) {
    let dir = tempfile::tempdir().unwrap();
    let store = JobStore::open(dir.path()).unwrap();
    (dir, store, FakeClock::new())
}

fn create(store: &JobStore, clock: &FakeClock, id: &str) -> JobId {
    let id = JobId::from_string(id);
    let config = JobConfig::builder(id.clone(), structure_request())
        .output_dir(store.default_output_dir(&id))
        .log_path(store.log_path(&id))
        .build();
    store.create(Job::new(config, clock)).unwrap().id
}

#[test]
fn running_jobs_fail_and_pending_jobs_requeue_in_order() {
    let (_dir, store, clock) = setup();
    let done = create(&store, &clock, "job-done");
    let p2 = create(&store, &clock, "job-p2");
    let live = create(&store, &clock, "job-live");
    let p1 = create(&store, &clock, "job-p1");

    store.update(&done, |j| j.mark_running(Some(10), 1)).unwrap();
    store.update(&done, |j| j.mark_completed(0, 2)).unwrap();
    store.update(&live, |j| j.mark_running(Some(4242), 3)).unwrap();

    clock.set_epoch_ms(5_000);
    let pending = reconcile(&store, &clock).unwrap();
    assert_eq!(pending, vec![p2, p1]);

    let job = store.read(&live).unwrap();
    assert_eq!(job.state, JobState::Failed);
    assert_eq!(job.failure, Some(FailureKind::InterruptedByRestart));
    assert_eq!(job.error.as_deref(), Some(RESTART_ERROR));
    assert_eq!(job.finished_at_ms, Some(5_000));
    assert_eq!(job.pid, None);
    assert_eq!(job.states(), vec![JobState::Pending, JobState::Running, JobState::Failed]);

    let log = store.read_log(&live, None).unwrap().content;
    assert!(
        log.contains("scheduler restarted while the worker (pid 4242) was running"),
        "log: {log}"
    );

    assert_eq!(store.read(&done).unwrap().state, JobState::Completed);
}

#[test]
fn empty_store_is_a_no_op() {
    let (_dir, store, clock) = setup();
    assert!(reconcile(&store, &clock).unwrap().is_empty());
}

#[test]
fn second_pass_changes_nothing() {
    let (_dir, store, clock) = setup();
    let live = create(&store, &clock, "job-live");
    store.update(&live, |j| j.mark_running(None, 1)).unwrap();

    reconcile(&store, &clock).unwrap();
    let first = store.read(&live).unwrap();
    reconcile(&store, &clock).unwrap();
    assert_eq!(store.read(&live).unwrap(), first);
}
