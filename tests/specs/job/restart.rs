// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Restart specs
//!
//! Verify recovery from a store left behind by a scheduler that went away.

use crate::prelude::*;
use pj_core::{Job, JobConfig, SystemClock};
use pj_storage::{JobStore, StoreError};

/// Write a record directly, as a previous scheduler would have.
fn seed(project: &Project, id: &str, running_pid: Option<u32>) -> JobId {
    let store = JobStore::open(project.state_dir()).unwrap();
    let id = JobId::from_string(id);
    let config = JobConfig::builder(id.clone(), structure_request())
        .output_dir(store.default_output_dir(&id))
        .log_path(store.log_path(&id))
        .build();
    store.create(Job::new(config, &SystemClock)).unwrap();
    if let Some(pid) = running_pid {
        store.update(&id, |j| j.mark_running(Some(pid), 1)).unwrap();
    }
    id
}

#[tokio::test]
async fn running_record_without_a_process_fails_on_restart() {
    let project = Project::empty();
    let orphan = seed(&project, "job-orphan", Some(999_999));

    let service = project.service(PREDICT_OK);
    let status = service.status(&orphan).unwrap();
    assert_eq!(status.state, JobState::Failed);
    assert_eq!(status.failure, Some(FailureKind::InterruptedByRestart));
    assert_eq!(states(&status), vec![JobState::Pending, JobState::Running, JobState::Failed]);
    assert!(status.error.is_some());

    let err = service.result(&orphan).unwrap_err();
    assert!(matches!(err, EngineError::JobFailed { .. }), "got {err:?}");
}

#[tokio::test]
async fn pending_records_are_requeued_in_creation_order() {
    let project = Project::empty();
    let first = seed(&project, "job-b", None);
    let second = seed(&project, "job-a", None);

    let service = project.start(project.config(PREDICT_OK).max_running(1));
    let a = service.wait(&first, WAIT).await.unwrap();
    let b = service.wait(&second, WAIT).await.unwrap();
    assert_eq!(a.state, JobState::Completed);
    assert_eq!(b.state, JobState::Completed);
    assert!(b.started_at_ms.unwrap() >= a.finished_at_ms.unwrap());
}

#[tokio::test]
async fn graceful_restart_keeps_finished_jobs() {
    let project = Project::empty();
    let id = {
        let service = project.service(PREDICT_OK);
        let id = service.submit(structure_request()).unwrap();
        service.wait(&id, WAIT).await.unwrap();
        service.shutdown().await;
        id
    };

    let service = project.service(PREDICT_OK);
    assert_eq!(service.status(&id).unwrap().state, JobState::Completed);
    assert_eq!(service.list(None).unwrap().len(), 1);
    // The fresh generator reissues job-1; the store refuses to overwrite it
    let err = service.submit(structure_request()).unwrap_err();
    assert!(matches!(err, EngineError::Store(StoreError::DuplicateId(_))), "got {err:?}");
    assert_eq!(service.status(&id).unwrap().state, JobState::Completed);
}

#[tokio::test]
async fn one_scheduler_per_state_directory() {
    let project = Project::empty();
    let _first = project.service(PREDICT_OK);
    let second = pj_engine::JobService::start(project.config(PREDICT_OK));
    assert!(matches!(second, Err(EngineError::LockFailed(_))));
}
