// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;
use yare::parameterized;

#[test]
fn job_id_has_prefix() {
    let id = JobId::generate();
    assert!(id.as_str().starts_with("job-"));
}

#[test]
fn job_id_serde_is_transparent() {
    let id = JobId::from("job-abc");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"job-abc\"");
    let parsed: JobId = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, id);
}

#[parameterized(
    critical = { JobPriority::Critical, 0 },
    high = { JobPriority::High, 1 },
    medium = { JobPriority::Medium, 2 },
    low = { JobPriority::Low, 3 },
)]
fn priority_rank(priority: JobPriority, rank: u8) {
    assert_eq!(priority.rank(), rank);
}

#[parameterized(
    low = { "low", JobPriority::Low },
    medium = { "medium", JobPriority::Medium },
    high = { "high", JobPriority::High },
    critical = { "critical", JobPriority::Critical },
)]
fn priority_round_trip(text: &str, priority: JobPriority) {
    assert_eq!(text.parse::<JobPriority>().unwrap(), priority);
    assert_eq!(priority.to_string(), text);
}

#[test]
fn priority_parse_rejects_unknown() {
    assert!("urgent".parse::<JobPriority>().is_err());
}

#[test]
fn status_terminality() {
    assert!(!JobStatus::Todo.is_terminal());
    assert!(!JobStatus::InProgress.is_terminal());
    assert!(JobStatus::Done.is_terminal());
    assert!(JobStatus::Cancelled.is_terminal());
}

#[test]
fn completion_key_shape() {
    let key = CompletionKey::generate();
    assert_eq!(key.as_str().len(), CompletionKey::LEN);
    assert!(key
        .as_str()
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
}

#[test]
fn completion_key_matches_exactly() {
    let key = CompletionKey::from_string("ABCD1234");
    assert!(key.matches("ABCD1234"));
    assert!(!key.matches("abcd1234"));
    assert!(!key.matches("ABCD123"));
    assert!(!key.matches("ABCD12345"));
}

proptest! {
    #[test]
    fn completion_keys_stay_in_alphabet(_seed in 0u8..16) {
        let key = CompletionKey::generate();
        prop_assert_eq!(key.as_str().len(), 8);
        prop_assert!(key.as_str().bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()));
    }
}

#[test]
fn posted_job_starts_todo_unassigned() {
    let job = Job::post(
        ProjectId::from("prj-1"),
        NewJob {
            title: "Build the thing".into(),
            description: "details".into(),
            priority: JobPriority::High,
            dependencies: vec![],
        },
        5_000,
    );
    assert_eq!(job.status, JobStatus::Todo);
    assert!(job.assigned_to.is_none());
    assert_eq!(job.created_at_ms, 5_000);
    assert_eq!(job.updated_at_ms, 5_000);
    assert_eq!(job.completion_key.as_str().len(), 8);
}

#[test]
fn ranking_orders_priority_then_age() {
    let older_high = JobBuilder::default().priority(JobPriority::High).created_at_ms(100).build();
    let newer_high = JobBuilder::default().priority(JobPriority::High).created_at_ms(200).build();
    let critical = JobBuilder::default().priority(JobPriority::Critical).created_at_ms(900).build();

    let mut jobs = vec![&newer_high, &critical, &older_high];
    jobs.sort_by_key(|j| j.ranking_key());

    assert_eq!(jobs[0].id, critical.id);
    assert_eq!(jobs[1].id, older_high.id);
    assert_eq!(jobs[2].id, newer_high.id);
}

#[parameterized(
    todo = { JobStatus::Todo },
    cancelled = { JobStatus::Cancelled },
)]
fn apply_inactive_status_clears_assignee(status: JobStatus) {
    let mut job = JobBuilder::default()
        .status(JobStatus::InProgress)
        .assigned_to("agent-a")
        .build();
    job.apply(&JobUpdate::SetStatus(status), 9_000);
    assert_eq!(job.status, status);
    assert!(job.assigned_to.is_none());
    assert_eq!(job.updated_at_ms, 9_000);
}

#[parameterized(
    in_progress = { JobStatus::InProgress },
    done = { JobStatus::Done },
)]
fn apply_active_status_keeps_assignee(status: JobStatus) {
    let mut job = JobBuilder::default()
        .status(JobStatus::InProgress)
        .assigned_to("agent-a")
        .build();
    job.apply(&JobUpdate::SetStatus(status), 9_000);
    assert_eq!(job.assigned_to.as_deref(), Some("agent-a"));
}

#[test]
fn apply_updates_touch_updated_at() {
    let mut job = JobBuilder::default().build();
    job.apply(&JobUpdate::SetPriority(JobPriority::Critical), 7_500);
    assert_eq!(job.priority, JobPriority::Critical);
    assert_eq!(job.updated_at_ms, 7_500);

    job.apply(&JobUpdate::SetCancelReason("superseded".into()), 7_600);
    assert_eq!(job.cancel_reason.as_deref(), Some("superseded"));
}

#[test]
fn job_update_serde_tags() {
    let update = JobUpdate::SetStatus(JobStatus::Done);
    let json = serde_json::to_value(&update).unwrap();
    assert_eq!(json["set"], "set_status");
    assert_eq!(json["value"], "done");
}
