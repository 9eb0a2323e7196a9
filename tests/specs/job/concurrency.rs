// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Concurrency specs
//!
//! Verify the running bound and that queued jobs start as slots free up.

use crate::prelude::*;
use std::time::Duration;

#[tokio::test]
async fn never_more_than_max_running() {
    let project = Project::empty();
    let service =
        project.start(project.config(&format!("sleep 0.2\n{PREDICT_OK}")).max_running(2));
    let ids: Vec<JobId> = (0..5).map(|_| service.submit(structure_request()).unwrap()).collect();

    let mut peak = 0;
    let deadline = tokio::time::Instant::now() + Duration::from_secs(30);
    loop {
        let jobs = service.list(None).unwrap();
        let running = jobs.iter().filter(|j| j.state == JobState::Running).count();
        assert!(running <= 2, "{running} jobs running at once");
        peak = peak.max(running);
        if jobs.iter().all(|j| j.state.is_terminal()) {
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "jobs did not finish");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(peak, 2);
    for id in &ids {
        assert_eq!(service.status(id).unwrap().state, JobState::Completed);
    }
}

#[tokio::test]
async fn queued_job_starts_when_a_slot_frees() {
    let project = Project::empty();
    let service =
        project.start(project.config(&format!("sleep 0.3\n{PREDICT_OK}")).max_running(1));
    let first = service.submit(structure_request()).unwrap();
    let second = service.submit(structure_request()).unwrap();

    wait_running(&service, &first).await;
    let waiting = service.status(&second).unwrap();
    assert_eq!(waiting.state, JobState::Pending);
    assert_eq!(waiting.progress, ProgressHint::Queued { position: 0 });

    let a = service.wait(&first, WAIT).await.unwrap();
    let b = service.wait(&second, WAIT).await.unwrap();
    let (freed, started) = (a.finished_at_ms.unwrap(), b.started_at_ms.unwrap());
    assert!(started >= freed);
    assert!(started - freed < 1000, "second job waited {}ms", started - freed);
}

#[tokio::test]
async fn dispatch_is_first_in_first_out() {
    let project = Project::empty();
    let service =
        project.start(project.config(&format!("sleep 0.05\n{PREDICT_OK}")).max_running(1));
    let ids: Vec<JobId> = (0..4).map(|_| service.submit(structure_request()).unwrap()).collect();

    let mut starts = Vec::new();
    for id in &ids {
        starts.push(service.wait(id, WAIT).await.unwrap().started_at_ms.unwrap());
    }
    assert!(starts.windows(2).all(|w| w[0] <= w[1]), "start order {starts:?}");
}
