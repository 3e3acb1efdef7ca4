// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use axis_engine::{NerveCenter, NerveCenterConfig};
use axis_store::LocalStore;
use serde_json::Value;
use tempfile::TempDir;

async fn embedded_backend(dir: &TempDir) -> Backend {
    let store = LocalStore::open(dir.path().join("history/state.json")).unwrap();
    let instructions = dir.path().join(".axis/instructions");
    let config = NerveCenterConfig {
        instructions_dir: instructions.clone(),
        ..NerveCenterConfig::default()
    };
    let nerve = Arc::new(NerveCenter::new(Arc::new(store), config));
    let project = nerve.resolve_project("demo", "local").await.unwrap();
    Backend::embedded(
        Embedded { nerve, project },
        dir.path().to_path_buf(),
        instructions,
    )
}

fn parse_frame(text: &str) -> Value {
    serde_json::from_str(text).unwrap()
}

#[tokio::test]
async fn post_claim_complete_round() {
    let dir = TempDir::new().unwrap();
    let backend = embedded_backend(&dir).await;

    let posted = parse_frame(
        &backend
            .post_job("Fix parser".into(), "details".into(), Some("high".into()), vec![])
            .await
            .unwrap(),
    );
    assert_eq!(posted["status"], "POSTED");
    let job_id = posted["job_id"].as_str().unwrap().to_string();
    let key = posted["completion_key"].as_str().unwrap().to_string();
    assert_eq!(key.len(), 8);

    let claimed = parse_frame(&backend.claim_next_job("A").await.unwrap());
    assert_eq!(claimed["status"], "CLAIMED");
    assert_eq!(claimed["job"]["id"], job_id.as_str());

    // A non-assignee completes with the handed-off key.
    let completed =
        parse_frame(&backend.complete_job("B", &job_id, "done by B", Some(&key)).await.unwrap());
    assert_eq!(completed["status"], "COMPLETED");
}

#[tokio::test]
async fn post_rejects_bad_priority() {
    let dir = TempDir::new().unwrap();
    let backend = embedded_backend(&dir).await;
    let err = backend
        .post_job("t".into(), String::new(), Some("urgent".into()), vec![])
        .await
        .unwrap_err();
    assert!(matches!(err, CoordError::BadRequest(_)));
}

#[tokio::test]
async fn lock_denial_is_a_frame_not_an_error() {
    let dir = TempDir::new().unwrap();
    let backend = embedded_backend(&dir).await;

    let granted =
        parse_frame(&backend.propose_file_access("A", "src/x.ts", "edit", "p").await.unwrap());
    assert_eq!(granted["status"], "GRANTED");

    let denied =
        parse_frame(&backend.propose_file_access("B", "src/x.ts", "edit", "p").await.unwrap());
    assert_eq!(denied["status"], "REQUIRES_ORCHESTRATION");
    assert_eq!(denied["current_lock"]["agent_id"], "A");

    let unlocked = parse_frame(&backend.force_unlock("src/x.ts", None).await.unwrap());
    assert_eq!(unlocked["status"], "UNLOCKED");
}

#[tokio::test]
async fn context_and_soul_render() {
    let dir = TempDir::new().unwrap();
    let backend = embedded_backend(&dir).await;
    backend.update_shared_context("A", "hello team").await.unwrap();

    let context = backend.read_context().await.unwrap();
    assert!(context.contains("## Shared Notepad"));
    assert!(context.contains("hello team"));

    // No instruction files yet: placeholder text, not an error.
    let soul = backend.get_project_soul();
    assert!(soul.contains("(no context.md found"));

    backend.update_context("## Today\nworked on locks\n").await.unwrap();
    let activity = dir.path().join(".axis/instructions/activity.md");
    assert!(activity.exists());
}

#[tokio::test]
async fn usage_stats_and_subscription_frames() {
    let dir = TempDir::new().unwrap();
    let backend = embedded_backend(&dir).await;
    backend.post_job("a".into(), String::new(), None, vec![]).await.unwrap();

    let stats = parse_frame(&backend.usage_stats().await.unwrap());
    assert_eq!(stats["jobs"]["todo"], 1);

    let status = parse_frame(&backend.subscription_status().await.unwrap());
    assert_eq!(status["valid"], true);
    assert_eq!(status["plan"], "local");
}

#[tokio::test]
async fn index_file_requires_existing_file() {
    let dir = TempDir::new().unwrap();
    let backend = embedded_backend(&dir).await;
    let err = backend.index_file("missing.md").await.unwrap_err();
    assert!(matches!(err, CoordError::NotFound(_)));
}
