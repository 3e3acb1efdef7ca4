// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::{AccessOutcome, ClaimOutcome};
use axis_core::{FakeClock, JobId, JobPriority, JobStatus, JobUpdate, NewJob};
use axis_store::LocalStore;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

struct Harness {
    nerve: Arc<NerveCenter<FakeClock>>,
    project: ProjectId,
    clock: FakeClock,
    _dir: TempDir,
}

async fn harness() -> Harness {
    let dir = TempDir::new().unwrap();
    let store = LocalStore::open(dir.path().join("history/nerve-center-state.json")).unwrap();
    let clock = FakeClock::new();
    let config = NerveCenterConfig {
        instructions_dir: dir.path().join(".axis/instructions"),
        ..NerveCenterConfig::default()
    };
    let nerve = Arc::new(NerveCenter::with_clock(Arc::new(store), config, clock.clone()));
    let project = nerve.resolve_project("demo", "owner-1").await.unwrap();
    Harness { nerve, project, clock, _dir: dir }
}

fn titled(title: &str, priority: JobPriority) -> NewJob {
    NewJob { title: title.into(), description: "desc".into(), priority, dependencies: vec![] }
}

// S1: a live foreign lock denies without mutating anything.
#[tokio::test]
async fn lock_conflict_reports_incumbent() {
    let h = harness().await;

    let granted = h
        .nerve
        .propose_file_access(&h.project, "A", "src/x.ts", "edit", "prompt-a")
        .await
        .unwrap();
    assert!(matches!(granted, AccessOutcome::Granted));

    let denied = h
        .nerve
        .propose_file_access(&h.project, "B", "src/x.ts", "edit", "prompt-b")
        .await
        .unwrap();
    let AccessOutcome::RequiresOrchestration { current_lock } = denied else {
        panic!("foreign live lock must deny");
    };
    assert_eq!(current_lock.agent_id, "A");
    assert_eq!(current_lock.intent, "edit");

    // B's denial changed nothing: the lock is still A's.
    let locks = h.nerve.list_locks(&h.project).await.unwrap();
    assert_eq!(locks.len(), 1);
    assert_eq!(locks[0].agent_id, "A");
    assert_eq!(locks[0].user_prompt, "prompt-a");
}

// S2: completion by key from a non-assignee, wrong key rejected.
#[tokio::test]
async fn completion_by_key() {
    let h = harness().await;

    let posted = h.nerve.post_job(&h.project, titled("Title", JobPriority::Medium)).await.unwrap();
    let key = posted.completion_key.as_str().to_string();

    let ClaimOutcome::Claimed { job } = h.nerve.claim_next_job(&h.project, "A").await.unwrap()
    else {
        panic!("claim should succeed");
    };
    assert_eq!(job.id, posted.id);
    assert_eq!(job.assigned_to.as_deref(), Some("A"));

    let done =
        h.nerve.complete_job(&h.project, "B", &posted.id, "done by B", Some(&key)).await.unwrap();
    assert_eq!(done.status, JobStatus::Done);
    assert_eq!(done.assigned_to.as_deref(), Some("B"));

    let err = h
        .nerve
        .complete_job(&h.project, "C", &posted.id, "x", Some("WRONGKEY"))
        .await
        .unwrap_err();
    assert!(matches!(err, CoordError::Conflict(_)), "terminal job conflicts, got {err:?}");

    // Job unchanged by the failed attempt.
    let jobs = h.nerve.list_jobs(&h.project).await.unwrap();
    assert_eq!(jobs[0].assigned_to.as_deref(), Some("B"));
}

// S3: non-assignee without a key is rejected and nothing mutates.
#[tokio::test]
async fn completion_without_key_rejected() {
    let h = harness().await;
    let posted = h.nerve.post_job(&h.project, titled("Title", JobPriority::Medium)).await.unwrap();
    let ClaimOutcome::Claimed { .. } = h.nerve.claim_next_job(&h.project, "A").await.unwrap()
    else {
        panic!("claim should succeed");
    };

    let err = h.nerve.complete_job(&h.project, "B", &posted.id, "done by B", None).await.unwrap_err();
    assert!(matches!(err, CoordError::Unauthorized(_)));

    let jobs = h.nerve.list_jobs(&h.project).await.unwrap();
    assert_eq!(jobs[0].status, JobStatus::InProgress);
    assert_eq!(jobs[0].assigned_to.as_deref(), Some("A"));
}

// The assignee itself may complete without a key.
#[tokio::test]
async fn assignee_completes_by_identity() {
    let h = harness().await;
    let posted = h.nerve.post_job(&h.project, titled("Title", JobPriority::Low)).await.unwrap();
    let ClaimOutcome::Claimed { .. } = h.nerve.claim_next_job(&h.project, "A").await.unwrap()
    else {
        panic!("claim should succeed");
    };
    let done = h.nerve.complete_job(&h.project, "A", &posted.id, "shipped", None).await.unwrap();
    assert_eq!(done.status, JobStatus::Done);
}

// S4: priority first, then oldest within a priority.
#[tokio::test]
async fn claim_order_priority_then_age() {
    let h = harness().await;

    let j1 = h.nerve.post_job(&h.project, titled("J1", JobPriority::Medium)).await.unwrap();
    h.clock.advance(Duration::from_secs(1));
    let j2 = h.nerve.post_job(&h.project, titled("J2", JobPriority::High)).await.unwrap();
    h.clock.advance(Duration::from_secs(1));
    let j3 = h.nerve.post_job(&h.project, titled("J3", JobPriority::High)).await.unwrap();

    for (agent, expected) in [("A", &j2.id), ("B", &j3.id), ("C", &j1.id)] {
        let ClaimOutcome::Claimed { job } =
            h.nerve.claim_next_job(&h.project, agent).await.unwrap()
        else {
            panic!("claim for {agent} should succeed");
        };
        assert_eq!(&job.id, expected);
    }

    assert!(matches!(
        h.nerve.claim_next_job(&h.project, "D").await.unwrap(),
        ClaimOutcome::NoJobsAvailable
    ));
}

// S5: a stale lock is reclaimed and re-granted to the next proposer.
#[tokio::test]
async fn ttl_reclaim_grants_to_new_agent() {
    let h = harness().await;

    let granted =
        h.nerve.propose_file_access(&h.project, "A", "f", "edit", "p").await.unwrap();
    assert!(matches!(granted, AccessOutcome::Granted));

    h.clock.advance(DEFAULT_LOCK_TTL + Duration::from_secs(60));

    let granted = h.nerve.propose_file_access(&h.project, "B", "f", "edit", "p").await.unwrap();
    assert!(matches!(granted, AccessOutcome::Granted));

    let locks = h.nerve.list_locks(&h.project).await.unwrap();
    assert_eq!(locks.len(), 1);
    assert_eq!(locks[0].agent_id, "B");
}

// S6 + property 7: finalize leaves no locks, no terminal jobs, a fresh
// notepad, and an archive on disk.
#[tokio::test]
async fn finalize_resets_session() {
    let h = harness().await;

    let done_job = h.nerve.post_job(&h.project, titled("done", JobPriority::High)).await.unwrap();
    let todo_job = h.nerve.post_job(&h.project, titled("todo", JobPriority::Low)).await.unwrap();
    let ClaimOutcome::Claimed { .. } = h.nerve.claim_next_job(&h.project, "A").await.unwrap()
    else {
        panic!("claim should succeed");
    };
    h.nerve.complete_job(&h.project, "A", &done_job.id, "finished", None).await.unwrap();
    h.nerve.propose_file_access(&h.project, "A", "src/a.ts", "edit", "p").await.unwrap();
    h.nerve.propose_file_access(&h.project, "B", "src/b.ts", "edit", "p").await.unwrap();
    h.nerve.update_shared_context(&h.project, "A", "wrapping up").await.unwrap();

    let receipt = h.nerve.finalize_session(&h.project).await.unwrap();
    let archive = receipt.path.expect("local archive path");
    assert!(archive.exists());
    let archived = std::fs::read_to_string(&archive).unwrap();
    assert!(archived.contains("wrapping up"));

    let locks = h.nerve.list_locks(&h.project).await.unwrap();
    assert!(locks.is_empty());

    let jobs = h.nerve.list_jobs(&h.project).await.unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].id, todo_job.id);

    let context = h.nerve.get_core_context(&h.project).await.unwrap();
    assert!(context.contains("Session Start: "));
    let notepad = h.nerve.cached_notepad(&h.project).expect("mirror refreshed");
    assert!(notepad.starts_with("Session Start: "));
}

// Property 2: at most one CLAIMED per job under concurrent callers.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_claims_are_distinct() {
    let h = harness().await;
    for i in 0..3 {
        h.nerve.post_job(&h.project, titled(&format!("job {i}"), JobPriority::Medium)).await.unwrap();
    }

    let mut handles = Vec::new();
    for agent in ["A", "B", "C", "D", "E"] {
        let nerve = Arc::clone(&h.nerve);
        let project = h.project.clone();
        handles.push(tokio::spawn(async move {
            nerve.claim_next_job(&project, agent).await.unwrap()
        }));
    }

    let mut claimed_ids: Vec<JobId> = Vec::new();
    let mut empty = 0;
    for handle in handles {
        match handle.await.unwrap() {
            ClaimOutcome::Claimed { job } => claimed_ids.push(job.id),
            ClaimOutcome::NoJobsAvailable => empty += 1,
        }
    }
    claimed_ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    claimed_ids.dedup();
    assert_eq!(claimed_ids.len(), 3, "each job claimed exactly once");
    assert_eq!(empty, 2);
}

// Property 4: unfinished dependencies gate claims; cancelled ones block too.
#[tokio::test]
async fn dependency_gating() {
    let h = harness().await;

    let dep = h.nerve.post_job(&h.project, titled("dep", JobPriority::Low)).await.unwrap();
    let gated = h
        .nerve
        .post_job(
            &h.project,
            NewJob {
                title: "gated".into(),
                description: String::new(),
                priority: JobPriority::Critical,
                dependencies: vec![dep.id.clone()],
            },
        )
        .await
        .unwrap();

    // The critical job is ineligible while its dependency is todo; the
    // dependency itself is the best claimable candidate.
    let ClaimOutcome::Claimed { job } = h.nerve.claim_next_job(&h.project, "A").await.unwrap()
    else {
        panic!("claim should succeed");
    };
    assert_eq!(job.id, dep.id);

    // An in-progress dependency still blocks.
    assert!(matches!(
        h.nerve.claim_next_job(&h.project, "B").await.unwrap(),
        ClaimOutcome::NoJobsAvailable
    ));

    h.nerve.complete_job(&h.project, "A", &dep.id, "done", None).await.unwrap();
    let ClaimOutcome::Claimed { job } = h.nerve.claim_next_job(&h.project, "B").await.unwrap()
    else {
        panic!("gated job should now be claimable");
    };
    assert_eq!(job.id, gated.id);
}

#[tokio::test]
async fn cancelled_dependency_blocks_forever() {
    let h = harness().await;
    let dep = h.nerve.post_job(&h.project, titled("dep", JobPriority::Low)).await.unwrap();
    let _gated = h
        .nerve
        .post_job(
            &h.project,
            NewJob {
                title: "gated".into(),
                description: String::new(),
                priority: JobPriority::High,
                dependencies: vec![dep.id.clone()],
            },
        )
        .await
        .unwrap();

    h.nerve.cancel_job(&h.project, &dep.id, "not needed").await.unwrap();
    assert!(matches!(
        h.nerve.claim_next_job(&h.project, "A").await.unwrap(),
        ClaimOutcome::NoJobsAvailable
    ));
}

#[tokio::test]
async fn post_rejects_unknown_and_duplicate_dependencies() {
    let h = harness().await;
    let err = h
        .nerve
        .post_job(
            &h.project,
            NewJob {
                title: "bad deps".into(),
                description: String::new(),
                priority: JobPriority::Medium,
                dependencies: vec![JobId::from("job-missing")],
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CoordError::BadRequest(_)));

    let dep = h.nerve.post_job(&h.project, titled("dep", JobPriority::Low)).await.unwrap();
    let err = h
        .nerve
        .post_job(
            &h.project,
            NewJob {
                title: "dup deps".into(),
                description: String::new(),
                priority: JobPriority::Medium,
                dependencies: vec![dep.id.clone(), dep.id.clone()],
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CoordError::BadRequest(_)));
}

#[tokio::test]
async fn post_rejects_empty_title() {
    let h = harness().await;
    let err = h.nerve.post_job(&h.project, titled("   ", JobPriority::Low)).await.unwrap_err();
    assert!(matches!(err, CoordError::BadRequest(_)));
}

#[tokio::test]
async fn cancel_is_terminal_and_conflicts_after() {
    let h = harness().await;
    let job = h.nerve.post_job(&h.project, titled("doomed", JobPriority::Low)).await.unwrap();
    let cancelled = h.nerve.cancel_job(&h.project, &job.id, "scope cut").await.unwrap();
    assert_eq!(cancelled.status, JobStatus::Cancelled);
    assert_eq!(cancelled.cancel_reason.as_deref(), Some("scope cut"));

    let err = h.nerve.cancel_job(&h.project, &job.id, "again").await.unwrap_err();
    assert!(matches!(err, CoordError::Conflict(_)));
}

// Cancelling a claimed job drops its assignee (assignee iff active).
#[tokio::test]
async fn cancel_of_claimed_job_clears_assignee() {
    let h = harness().await;
    let job = h.nerve.post_job(&h.project, titled("claimed", JobPriority::Medium)).await.unwrap();
    let ClaimOutcome::Claimed { .. } = h.nerve.claim_next_job(&h.project, "A").await.unwrap()
    else {
        panic!("claim should succeed");
    };

    let cancelled = h.nerve.cancel_job(&h.project, &job.id, "abandoned").await.unwrap();
    assert_eq!(cancelled.status, JobStatus::Cancelled);
    assert!(cancelled.assigned_to.is_none());
}

// Property 6: the notepad only grows until finalize.
#[tokio::test]
async fn notepad_is_monotonic_within_session() {
    let h = harness().await;
    let mut last_len = 0;

    h.nerve.post_job(&h.project, titled("a", JobPriority::Low)).await.unwrap();
    for text in ["first note", "second note", "third note"] {
        h.nerve.update_shared_context(&h.project, "A", text).await.unwrap();
        let notepad = h.nerve.cached_notepad(&h.project).unwrap();
        assert!(notepad.len() > last_len);
        last_len = notepad.len();
    }

    let notepad = h.nerve.cached_notepad(&h.project).unwrap();
    assert!(notepad.contains("[JOB POSTED] a"));
    assert!(notepad.contains("- [A] first note"));
}

// Completing a job leaves the agent's locks in place; only finalize,
// force-unlock, or TTL expiry release them.
#[tokio::test]
async fn complete_does_not_release_locks() {
    let h = harness().await;
    let job = h.nerve.post_job(&h.project, titled("locked work", JobPriority::Medium)).await.unwrap();
    let ClaimOutcome::Claimed { .. } = h.nerve.claim_next_job(&h.project, "A").await.unwrap()
    else {
        panic!("claim should succeed");
    };
    h.nerve.propose_file_access(&h.project, "A", "src/w.ts", "edit", "p").await.unwrap();
    h.nerve.complete_job(&h.project, "A", &job.id, "done", None).await.unwrap();

    let locks = h.nerve.list_locks(&h.project).await.unwrap();
    assert_eq!(locks.len(), 1, "completion must not implicitly unlock");

    h.nerve.force_unlock(&h.project, "src/w.ts", "stale").await.unwrap();
    assert!(h.nerve.list_locks(&h.project).await.unwrap().is_empty());
}

#[tokio::test]
async fn owner_refresh_extends_lease() {
    let h = harness().await;
    h.nerve.propose_file_access(&h.project, "A", "src/x.ts", "edit", "p1").await.unwrap();

    h.clock.advance(Duration::from_secs(20 * 60));
    // Re-proposal by the owner refreshes rather than denies.
    let outcome = h.nerve.propose_file_access(&h.project, "A", "src/x.ts", "edit", "p2").await.unwrap();
    assert!(matches!(outcome, AccessOutcome::Granted));

    // 20 more minutes: past the original lease, inside the refreshed one.
    h.clock.advance(Duration::from_secs(20 * 60));
    let denied = h.nerve.propose_file_access(&h.project, "B", "src/x.ts", "edit", "p").await.unwrap();
    assert!(matches!(denied, AccessOutcome::RequiresOrchestration { .. }));
}

#[tokio::test]
async fn update_job_enforces_assignee_invariant() {
    let h = harness().await;
    let job = h.nerve.post_job(&h.project, titled("manual", JobPriority::Medium)).await.unwrap();

    let err = h
        .nerve
        .update_job(&h.project, &job.id, vec![JobUpdate::SetStatus(JobStatus::InProgress)])
        .await
        .unwrap_err();
    assert!(matches!(err, CoordError::BadRequest(_)));

    // An assignee on a todo job is just as invalid as the reverse.
    let err = h
        .nerve
        .update_job(&h.project, &job.id, vec![JobUpdate::SetAssignee(Some("A".into()))])
        .await
        .unwrap_err();
    assert!(matches!(err, CoordError::BadRequest(_)));

    let updated = h
        .nerve
        .update_job(
            &h.project,
            &job.id,
            vec![
                JobUpdate::SetAssignee(Some("A".into())),
                JobUpdate::SetStatus(JobStatus::InProgress),
            ],
        )
        .await
        .unwrap();
    assert_eq!(updated.status, JobStatus::InProgress);
    assert_eq!(updated.assigned_to.as_deref(), Some("A"));

    // Clearing the assignee of an in-progress job must be rejected too.
    let err = h
        .nerve
        .update_job(&h.project, &job.id, vec![JobUpdate::SetAssignee(None)])
        .await
        .unwrap_err();
    assert!(matches!(err, CoordError::BadRequest(_)));

    let jobs = h.nerve.list_jobs(&h.project).await.unwrap();
    assert_eq!(jobs[0].assigned_to.as_deref(), Some("A"), "rejected updates must not mutate");
}

#[tokio::test]
async fn core_context_renders_three_sections() {
    let h = harness().await;
    h.nerve.post_job(&h.project, titled("visible job", JobPriority::High)).await.unwrap();
    h.nerve.propose_file_access(&h.project, "A", "src/x.ts", "edit", "p").await.unwrap();
    h.nerve.update_shared_context(&h.project, "A", "note to the team").await.unwrap();

    let context = h.nerve.get_core_context(&h.project).await.unwrap();
    assert!(context.starts_with("# Live Coordination Context"));
    assert!(context.contains("## Job Board"));
    assert!(context.contains("visible job"));
    assert!(context.contains("## Active File Locks"));
    assert!(context.contains("src/x.ts held by A"));
    assert!(context.contains("## Shared Notepad"));
    assert!(context.contains("note to the team"));
}

#[tokio::test]
async fn terminal_jobs_hidden_from_context() {
    let h = harness().await;
    let job = h.nerve.post_job(&h.project, titled("short lived", JobPriority::Low)).await.unwrap();
    h.nerve.cancel_job(&h.project, &job.id, "nope").await.unwrap();

    let context = h.nerve.get_core_context(&h.project).await.unwrap();
    assert!(context.contains("No open jobs."));
}

#[tokio::test]
async fn project_soul_degrades_to_placeholder() {
    let h = harness().await;
    let soul = h.nerve.get_project_soul();
    assert!(soul.contains("(no context.md found"));
    assert!(soul.contains("(no conventions.md found"));

    let dir = &h.nerve.config.instructions_dir;
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(dir.join("context.md"), "# What this project is\n").unwrap();
    std::fs::write(dir.join("conventions.md"), "# How we write code\n").unwrap();

    let soul = h.nerve.get_project_soul();
    assert!(soul.contains("What this project is"));
    assert!(soul.contains("How we write code"));
}

#[tokio::test]
async fn usage_stats_counts_board_state() {
    let h = harness().await;
    h.nerve.post_job(&h.project, titled("a", JobPriority::Low)).await.unwrap();
    h.nerve.post_job(&h.project, titled("b", JobPriority::Low)).await.unwrap();
    let ClaimOutcome::Claimed { .. } = h.nerve.claim_next_job(&h.project, "A").await.unwrap()
    else {
        panic!("claim should succeed");
    };

    let stats = h.nerve.usage_stats(&h.project).await.unwrap();
    assert_eq!(stats["jobs"]["todo"], 1);
    assert_eq!(stats["jobs"]["in_progress"], 1);
    assert_eq!(stats["locks"], 0);
}

#[tokio::test]
async fn search_without_embedder_is_not_configured() {
    let h = harness().await;
    let err = h.nerve.search_docs(&h.project, "anything").await.unwrap_err();
    assert!(matches!(err, CoordError::NotConfigured(_)));
}
