// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job lifecycle specs
//!
//! Verify how worker exits map to terminal states and that every recorded
//! history follows the state machine.

use crate::prelude::*;
use std::path::PathBuf;

const BATCH_OK: &str = r#"ls "$1"
for i in 0 1 2; do
  mkdir -p "$3/predictions/seq_$i"
  echo ATOM > "$3/predictions/seq_$i/seq_${i}_model_0.pdb"
done"#;

fn assert_follows_machine(status: &pj_engine::JobStatus) {
    let states = states(status);
    assert_eq!(states.first(), Some(&JobState::Pending), "history: {states:?}");
    for pair in states.windows(2) {
        assert!(pair[0].can_transition_to(pair[1]), "illegal step in {states:?}");
    }
    assert_eq!(states.last(), Some(&status.state));
}

#[tokio::test]
async fn clean_exit_with_output_completes() {
    let project = Project::empty();
    let service = project.service(PREDICT_OK);
    let id = service.submit(structure_request()).unwrap();

    let status = service.wait(&id, WAIT).await.unwrap();
    assert_eq!(status.state, JobState::Completed);
    assert_follows_machine(&status);

    let result = service.result(&id).unwrap();
    assert_eq!(
        result.artifacts.structures,
        vec![PathBuf::from("predictions/input/input_model_0.pdb")]
    );
    assert_eq!(result.output_dir, status.output_dir);
}

#[tokio::test]
async fn exit_one_fails_with_exit_code() {
    let project = Project::empty();
    let service = project.service("echo 'model weights not found' >&2\nexit 1");
    let id = service.submit(structure_request()).unwrap();

    let status = service.wait(&id, WAIT).await.unwrap();
    assert_eq!(status.state, JobState::Failed);
    assert_eq!(status.exit_code, Some(1));
    assert_eq!(status.failure, Some(FailureKind::NonZeroExit));
    assert!(status.error.unwrap().contains("model weights not found"));
    assert_follows_machine(&service.status(&id).unwrap());
}

#[tokio::test]
async fn batch_completes_only_with_every_structure() {
    let project = Project::empty();
    let service = project.service(BATCH_OK);

    let full = service.submit(batch_request(3)).unwrap();
    let short = service.submit(batch_request(4)).unwrap();
    assert_eq!(service.wait(&full, WAIT).await.unwrap().state, JobState::Completed);

    let status = service.wait(&short, WAIT).await.unwrap();
    assert_eq!(status.failure, Some(FailureKind::IncompleteOutput));
    assert!(status.error.unwrap().contains("expected 4 structure file(s), found 3"));

    // The worker was handed the descriptor directory
    let log = service.log(&full, None).unwrap().content;
    assert!(log.contains("seq_0.yaml") && log.contains("seq_2.yaml"), "log: {log}");
    assert_eq!(service.result(&full).unwrap().structure_paths().len(), 3);
}

#[tokio::test]
async fn every_outcome_has_a_legal_history() {
    let project = Project::empty();
    let script = r#"case "$(cat "$1")" in *GGG*) exit 2 ;; esac
sleep 0.2
mkdir -p "$3/predictions/x" && touch "$3/predictions/x/x.cif""#;
    let service = project.start(project.config(script).max_running(1));

    let ok = service.submit(structure_request()).unwrap();
    let bad = service.submit(PredictionRequest::structure_sequence("MKGGGA")).unwrap();
    let dropped = service.submit(structure_request()).unwrap();
    service.cancel(&dropped).unwrap();

    for id in [&ok, &bad, &dropped] {
        let status = service.wait(id, WAIT).await.unwrap();
        assert_follows_machine(&status);
    }
    assert_eq!(service.status(&ok).unwrap().state, JobState::Completed);
    assert_eq!(service.status(&bad).unwrap().exit_code, Some(2));
    assert_eq!(service.status(&dropped).unwrap().state, JobState::Cancelled);
}
