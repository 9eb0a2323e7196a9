// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job log specs
//!
//! Worker stdout and stderr land in the job log between the runner's
//! `[pj ...]` start and exit notes.

use crate::prelude::*;

fn worker_lines(content: &str) -> Vec<&str> {
    content.lines().filter(|l| !l.starts_with("[pj ")).collect()
}

#[tokio::test]
async fn short_log_tail_returns_every_line() {
    let project = Project::empty();
    let service = project.service(&format!("echo alpha\necho beta >&2\necho gamma\n{PREDICT_OK}"));
    let id = service.submit(structure_request()).unwrap();
    service.wait(&id, WAIT).await.unwrap();

    let log = service.log(&id, Some(10)).unwrap();
    assert_eq!(worker_lines(&log.content), ["alpha", "beta", "gamma"]);
    assert_eq!(log.total_lines, 5);
    assert_eq!(log, service.log(&id, None).unwrap());
}

#[tokio::test]
async fn long_log_tail_returns_last_lines_in_order() {
    let project = Project::empty();
    let script =
        format!("i=1\nwhile [ $i -le 1000 ]; do echo \"line $i\"; i=$((i+1)); done\n{PREDICT_OK}");
    let service = project.service(&script);
    let id = service.submit(structure_request()).unwrap();
    service.wait(&id, WAIT).await.unwrap();

    let log = service.log(&id, Some(10)).unwrap();
    assert_eq!(log.total_lines, 1002);
    let lines: Vec<&str> = log.content.lines().collect();
    assert_eq!(lines.len(), 10);
    let expected: Vec<String> = (992..=1000).map(|i| format!("line {i}")).collect();
    assert_eq!(lines[..9], expected.iter().map(String::as_str).collect::<Vec<_>>()[..]);
    assert!(lines[9].contains("worker exited with code 0"));
}

#[tokio::test]
async fn log_without_output_is_empty() {
    let project = Project::empty();
    let service = project.service(PREDICT_OK);
    let id = service.submit(structure_request()).unwrap();

    let log = service.log(&id, Some(10)).unwrap();
    assert_eq!(log.content, "");
    assert_eq!(log.total_lines, 0);
    service.cancel(&id).unwrap();
}

#[tokio::test]
async fn log_since_picks_up_where_it_left_off() {
    let project = Project::empty();
    let service = project.service(&format!("echo one\nsleep 0.3\necho two\n{PREDICT_OK}"));
    let id = service.submit(structure_request()).unwrap();

    let mut offset = 0;
    let mut seen = String::new();
    while !service.status(&id).unwrap().state.is_terminal() {
        let chunk = service.log_since(&id, offset).unwrap();
        offset = chunk.offset;
        seen.push_str(&chunk.content);
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    seen.push_str(&service.log_since(&id, offset).unwrap().content);

    assert_eq!(seen, service.log(&id, None).unwrap().content);
    assert_eq!(worker_lines(&seen), ["one", "two"]);
}
