// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cancellation specs
//!
//! Verify cancel dispositions in each state and that running workers are
//! actually gone once the job reads CANCELLED.

use crate::prelude::*;
use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use std::path::Path;
use std::time::Duration;

/// Worker that records its pid in `pid_file` and then runs `rest`.
fn pid_recording(pid_file: &Path, rest: &str) -> String {
    format!("echo $$ > '{}'\n{rest}", pid_file.display())
}

async fn read_pid(pid_file: &Path) -> i32 {
    let written = wait_for(5000, || async move {
        std::fs::read_to_string(pid_file).is_ok_and(|s| s.trim().parse::<i32>().is_ok())
    })
    .await;
    assert!(written, "worker never wrote its pid");
    std::fs::read_to_string(pid_file).unwrap().trim().parse().unwrap()
}

fn is_gone(pid: i32) -> bool {
    kill(Pid::from_raw(pid), None) == Err(Errno::ESRCH)
}

#[tokio::test]
async fn cancelling_a_completed_job_is_a_no_op() {
    let project = Project::empty();
    let service = project.service(PREDICT_OK);
    let id = service.submit(structure_request()).unwrap();
    let done = service.wait(&id, WAIT).await.unwrap();
    assert_eq!(done.state, JobState::Completed);

    let ack = service.cancel(&id).unwrap();
    assert_eq!(ack.disposition, CancelDisposition::AlreadyTerminal);
    assert_eq!(ack.state, JobState::Completed);

    let after = service.status(&id).unwrap();
    assert_eq!(after.state, JobState::Completed);
    assert_eq!(after.history, done.history);
    assert!(service.result(&id).is_ok());
}

#[tokio::test]
async fn cancelling_a_running_job_stops_it_within_the_grace_period() {
    let project = Project::empty();
    let pid_file = project.path().join("worker.pid");
    let service = project.service(&pid_recording(&pid_file, "exec sleep 30"));
    let id = service.submit(structure_request()).unwrap();
    wait_running(&service, &id).await;
    let pid = read_pid(&pid_file).await;

    let ack = service.cancel(&id).unwrap();
    assert_eq!(ack.disposition, CancelDisposition::Requested);

    // Grace is 2s; allow poll slack on top
    let status = service.wait(&id, Some(Duration::from_secs(3))).await.unwrap();
    assert_eq!(status.state, JobState::Cancelled);
    assert_eq!(states(&status), vec![JobState::Pending, JobState::Running, JobState::Cancelled]);
    assert!(is_gone(pid), "worker {pid} still alive");
}

#[tokio::test]
async fn workers_ignoring_sigterm_are_killed_after_grace() {
    let project = Project::empty();
    let pid_file = project.path().join("worker.pid");
    let script = format!("trap '' TERM\n{}", pid_recording(&pid_file, "while :; do sleep 1; done"));
    let config = project.config(&script).cancel_grace(Duration::from_millis(300));
    let service = project.start(config);
    let id = service.submit(structure_request()).unwrap();
    let pid = read_pid(&pid_file).await;

    service.cancel(&id).unwrap();
    let status = service.wait(&id, Some(Duration::from_secs(5))).await.unwrap();
    assert_eq!(status.state, JobState::Cancelled);
    assert_eq!(status.exit_code, Some(137));
    assert!(is_gone(pid), "worker {pid} still alive");
    assert!(service.log(&id, None).unwrap().content.contains("grace period"));
}

#[tokio::test]
async fn cancelling_a_queued_job_frees_nothing_and_starts_nothing() {
    let project = Project::empty();
    let service = project.start(project.config("exec sleep 30").max_running(1));
    let busy = service.submit(structure_request()).unwrap();
    let queued = service.submit(structure_request()).unwrap();
    wait_running(&service, &busy).await;

    let ack = service.cancel(&queued).unwrap();
    assert_eq!(ack.disposition, CancelDisposition::Cancelled);
    assert_eq!(service.status(&queued).unwrap().started_at_ms, None);
    assert_eq!(service.status(&busy).unwrap().state, JobState::Running);

    service.cancel(&busy).unwrap();
    assert_eq!(service.wait(&busy, WAIT).await.unwrap().state, JobState::Cancelled);
}
