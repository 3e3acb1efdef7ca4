// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::{ClaimResult, LockAttempt, Store};
use axis_core::{JobBuilder, JobPriority, JobStatus, DEFAULT_LOCK_TTL};
use tempfile::TempDir;

const TTL_MS: u64 = 30 * 60 * 1000;

fn store_in(dir: &TempDir) -> LocalStore {
    LocalStore::open(dir.path().join("nerve-center-state.json")).unwrap()
}

async fn seeded(dir: &TempDir) -> (LocalStore, ProjectId) {
    let store = store_in(dir);
    let project = store.resolve_project("demo", "owner-1").await.unwrap();
    (store, project)
}

fn job_for(project: &ProjectId) -> Job {
    JobBuilder::default().project_id(project.clone()).build()
}

#[tokio::test]
async fn resolve_project_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let (store, project) = seeded(&dir).await;
    let again = store.resolve_project("demo", "owner-1").await.unwrap();
    assert_eq!(project, again);

    // Different owner gets a different project under the same name.
    let other = store.resolve_project("demo", "owner-2").await.unwrap();
    assert_ne!(project, other);
}

#[tokio::test]
async fn state_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nerve-center-state.json");

    let project = {
        let store = LocalStore::open(&path).unwrap();
        let project = store.resolve_project("demo", "owner-1").await.unwrap();
        store.insert_job(&job_for(&project)).await.unwrap();
        store.append_notepad(&project, "\n[JOB POSTED] test").await.unwrap();
        project
    };

    let reopened = LocalStore::open(&path).unwrap();
    let jobs = reopened.select_project_jobs(&project).await.unwrap();
    assert_eq!(jobs.len(), 1);
    let notepad = reopened.read_notepad(&project).await.unwrap();
    assert_eq!(notepad, "\n[JOB POSTED] test");
}

#[tokio::test]
async fn conditional_claim_is_single_winner() {
    let dir = TempDir::new().unwrap();
    let (store, project) = seeded(&dir).await;
    let job = job_for(&project);
    store.insert_job(&job).await.unwrap();

    let first = store.conditional_claim_job(&project, &job.id, "A", 2_000).await.unwrap();
    let ClaimResult::Claimed(claimed) = first else {
        panic!("first claim should succeed");
    };
    assert_eq!(claimed.status, JobStatus::InProgress);
    assert_eq!(claimed.assigned_to.as_deref(), Some("A"));

    let second = store.conditional_claim_job(&project, &job.id, "B", 2_001).await.unwrap();
    assert_eq!(second, ClaimResult::AlreadyTaken);
}

#[tokio::test]
async fn claim_of_unknown_job_is_already_taken() {
    let dir = TempDir::new().unwrap();
    let (store, project) = seeded(&dir).await;
    let ghost = JobId::from("job-ghost");
    let result = store.conditional_claim_job(&project, &ghost, "A", 1_000).await.unwrap();
    assert_eq!(result, ClaimResult::AlreadyTaken);
}

#[tokio::test]
async fn update_job_applies_allow_listed_fields() {
    let dir = TempDir::new().unwrap();
    let (store, project) = seeded(&dir).await;
    let job = job_for(&project);
    store.insert_job(&job).await.unwrap();

    let updated = store
        .update_job(
            &project,
            &job.id,
            &[
                JobUpdate::SetStatus(JobStatus::Cancelled),
                JobUpdate::SetCancelReason("out of scope".into()),
                JobUpdate::SetPriority(JobPriority::Low),
            ],
            5_000,
        )
        .await
        .unwrap();
    assert_eq!(updated.status, JobStatus::Cancelled);
    assert_eq!(updated.cancel_reason.as_deref(), Some("out of scope"));
    assert_eq!(updated.priority, JobPriority::Low);
    assert_eq!(updated.updated_at_ms, 5_000);
}

#[tokio::test]
async fn lock_acquire_conflict_and_takeover() {
    let dir = TempDir::new().unwrap();
    let (store, project) = seeded(&dir).await;

    let lock_a = FileLock::new(project.clone(), "src/x.ts", "A", "edit", "prompt-a", 1_000);
    assert_eq!(store.try_acquire_lock(&lock_a, DEFAULT_LOCK_TTL).await.unwrap(), LockAttempt::Acquired);

    // A live lock held by another agent denies, reporting the incumbent.
    let lock_b = FileLock::new(project.clone(), "src/x.ts", "B", "edit", "prompt-b", 2_000);
    let LockAttempt::Held(incumbent) =
        store.try_acquire_lock(&lock_b, DEFAULT_LOCK_TTL).await.unwrap()
    else {
        panic!("live foreign lock must deny");
    };
    assert_eq!(incumbent.agent_id, "A");
    assert_eq!(incumbent.intent, "edit");

    // Once stale (TTL + 1 minute), any agent takes over.
    let later = 1_000 + TTL_MS + 60_000;
    let lock_b2 = FileLock::new(project.clone(), "src/x.ts", "B", "edit", "prompt-b", later);
    assert_eq!(store.try_acquire_lock(&lock_b2, DEFAULT_LOCK_TTL).await.unwrap(), LockAttempt::Acquired);
    let locks = store.select_project_locks(&project).await.unwrap();
    assert_eq!(locks.len(), 1);
    assert_eq!(locks[0].agent_id, "B");
}

#[tokio::test]
async fn owner_refresh_keeps_created_at() {
    let dir = TempDir::new().unwrap();
    let (store, project) = seeded(&dir).await;

    let lock = FileLock::new(project.clone(), "src/y.ts", "A", "edit", "first", 1_000);
    store.try_acquire_lock(&lock, DEFAULT_LOCK_TTL).await.unwrap();

    let refresh = FileLock::new(project.clone(), "src/y.ts", "A", "review", "second", 9_000);
    assert_eq!(store.try_acquire_lock(&refresh, DEFAULT_LOCK_TTL).await.unwrap(), LockAttempt::Acquired);

    let locks = store.select_project_locks(&project).await.unwrap();
    assert_eq!(locks[0].created_at_ms, 1_000);
    assert_eq!(locks[0].updated_at_ms, 9_000);
    assert_eq!(locks[0].intent, "review");
}

#[tokio::test]
async fn reclaim_drops_only_stale_locks() {
    let dir = TempDir::new().unwrap();
    let (store, project) = seeded(&dir).await;

    let old = FileLock::new(project.clone(), "src/old.ts", "A", "edit", "p", 1_000);
    store.try_acquire_lock(&old, DEFAULT_LOCK_TTL).await.unwrap();
    let fresh_at = 1_000 + TTL_MS;
    let fresh = FileLock::new(project.clone(), "src/new.ts", "B", "edit", "p", fresh_at);
    store.try_acquire_lock(&fresh, DEFAULT_LOCK_TTL).await.unwrap();

    let now = 1_000 + TTL_MS + 1;
    let reclaimed = store.reclaim_stale_locks(&project, DEFAULT_LOCK_TTL, now).await.unwrap();
    assert_eq!(reclaimed, 1);

    let locks = store.select_project_locks(&project).await.unwrap();
    assert_eq!(locks.len(), 1);
    assert_eq!(locks[0].file_path, "src/new.ts");
}

#[tokio::test]
async fn notepad_appends_and_resets() {
    let dir = TempDir::new().unwrap();
    let (store, project) = seeded(&dir).await;

    store.append_notepad(&project, "\n[LOCK] A locked src/x.ts").await.unwrap();
    store.append_notepad(&project, "\n- [A] working on parser").await.unwrap();
    let notepad = store.read_notepad(&project).await.unwrap();
    assert!(notepad.contains("[LOCK]"));
    assert!(notepad.ends_with("working on parser"));

    store.reset_notepad(&project, "Session Start: 2026-08-01T00:00:00Z\n").await.unwrap();
    let notepad = store.read_notepad(&project).await.unwrap();
    assert_eq!(notepad, "Session Start: 2026-08-01T00:00:00Z\n");
}

#[tokio::test]
async fn archive_writes_markdown_file() {
    let dir = TempDir::new().unwrap();
    let (store, project) = seeded(&dir).await;

    let receipt = store
        .archive_session(&project, "Session one", "summary", "full notepad text", 1_700_000_000_000)
        .await
        .unwrap();
    let path = receipt.path.expect("local archives have a path");
    assert!(path.exists());
    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.starts_with("# Session one"));
    assert!(contents.contains("full notepad text"));
}

#[tokio::test]
async fn purge_removes_only_terminal_jobs() {
    let dir = TempDir::new().unwrap();
    let (store, project) = seeded(&dir).await;

    let todo = JobBuilder::default().project_id(project.clone()).build();
    let done = JobBuilder::default()
        .project_id(project.clone())
        .status(JobStatus::Done)
        .assigned_to("A")
        .build();
    let cancelled =
        JobBuilder::default().project_id(project.clone()).status(JobStatus::Cancelled).build();
    for job in [&todo, &done, &cancelled] {
        store.insert_job(job).await.unwrap();
    }

    let purged = store.purge_terminal_jobs(&project).await.unwrap();
    assert_eq!(purged, 2);
    let jobs = store.select_project_jobs(&project).await.unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].id, todo.id);
}

#[tokio::test]
async fn embeddings_round_trip_by_similarity() {
    let dir = TempDir::new().unwrap();
    let (store, project) = seeded(&dir).await;

    let near = vec![1.0, 0.0, 0.0];
    let far = vec![0.0, 1.0, 0.0];
    store
        .insert_embedding(&project, "near doc", &near, &serde_json::json!({"k": 1}), 1_000)
        .await
        .unwrap();
    store
        .insert_embedding(&project, "far doc", &far, &serde_json::json!({}), 1_000)
        .await
        .unwrap();

    let query = vec![0.9, 0.1, 0.0];
    let matches = store.match_embeddings(&project, &query, 0.5, 10).await.unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].content, "near doc");
    assert!(matches[0].similarity > 0.9);
}

#[test]
fn cosine_similarity_edge_cases() {
    assert_eq!(cosine_similarity(&[], &[]), 0.0);
    assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
    assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    let sim = cosine_similarity(&[1.0, 2.0], &[1.0, 2.0]);
    assert!((sim - 1.0).abs() < 1e-6);
}
