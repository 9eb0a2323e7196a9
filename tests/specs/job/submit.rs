// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Submission specs
//!
//! Verify that submit is fast, durable and rejects malformed requests
//! without creating anything.

use crate::prelude::*;
use std::time::{Duration, Instant};

#[tokio::test]
async fn status_is_pending_right_after_submit() {
    let project = Project::empty();
    let service = project.service(PREDICT_OK);

    let id = service.submit(structure_request()).unwrap();
    let status = service.status(&id).unwrap();
    assert_eq!(status.state, JobState::Pending);
    assert_eq!(states(&status), vec![JobState::Pending]);
    assert_eq!(status.started_at_ms, None);
}

#[tokio::test]
async fn submit_returns_before_the_worker_finishes() {
    let project = Project::empty();
    let service = project.service(&format!("sleep 2\n{PREDICT_OK}"));

    let started = Instant::now();
    let id = service.submit(structure_request()).unwrap();
    assert!(started.elapsed() < Duration::from_secs(1));

    wait_running(&service, &id).await;
    assert!(!service.status(&id).unwrap().state.is_terminal());
    assert_eq!(service.wait(&id, WAIT).await.unwrap().state, JobState::Completed);
}

#[tokio::test]
async fn submitted_job_survives_a_restart_as_pending() {
    let project = Project::empty();
    let id = {
        let service = project.start(project.config(PREDICT_OK).max_running(1));
        let id = service.submit(structure_request()).unwrap();
        // Stop before the event loop ever runs
        service.shutdown().await;
        id
    };

    let record_path = project.state_dir().join("jobs").join(id.as_str()).join("job.json");
    let raw = std::fs::read_to_string(record_path).unwrap();
    let record: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(record["job"]["state"], "pending");
}

#[tokio::test]
async fn malformed_requests_are_rejected_without_side_effects() {
    let project = Project::empty();
    let service = project.service(PREDICT_OK);
    let kept = service.submit(structure_request()).unwrap();
    service.cancel(&kept).unwrap();
    let before = service.list(None).unwrap();

    let missing = project.path().join("missing.yaml");
    let bad = [
        PredictionRequest::structure_sequence(""),
        PredictionRequest::structure_sequence("   "),
        PredictionRequest::structure_file(&missing),
        PredictionRequest::batch(Vec::<String>::new()),
        PredictionRequest::batch(["MKTAYIAKQR", " "]),
        PredictionRequest::affinity_smiles("", "CCO"),
    ];
    for request in bad {
        let err = service.submit(request.clone()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidRequest(_)), "{request:?} gave {err:?}");
    }

    assert_eq!(service.list(None).unwrap(), before);
    let job_dirs = std::fs::read_dir(project.state_dir().join("jobs")).unwrap().count();
    assert_eq!(job_dirs, 1);
}
