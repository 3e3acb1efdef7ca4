// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rendered context documents: the live coordination view and the
//! on-disk project instructions ("project soul").

use crate::NerveCenter;
use axis_core::{Clock, CoordError, Job, JobStatus, ProjectId};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Concatenate the standing instruction files (`context.md`,
/// `conventions.md`). Missing files degrade to a placeholder line.
pub fn project_soul(instructions_dir: &Path) -> String {
    let mut soul = String::new();
    for name in ["context.md", "conventions.md"] {
        let path = instructions_dir.join(name);
        match fs::read_to_string(&path) {
            Ok(text) => {
                soul.push_str(&text);
                if !text.ends_with('\n') {
                    soul.push('\n');
                }
                soul.push('\n');
            }
            Err(_) => {
                let _ = writeln!(soul, "(no {name} found in {})\n", path.display());
            }
        }
    }
    soul.trim_end().to_string()
}

/// Rewrite the activity instructions file (`update_context` tool).
pub fn record_activity(instructions_dir: &Path, text: &str) -> Result<(), CoordError> {
    fs::create_dir_all(instructions_dir).map_err(|e| CoordError::Store(e.to_string()))?;
    let path = instructions_dir.join("activity.md");
    fs::write(&path, text).map_err(|e| CoordError::Store(e.to_string()))
}

impl<C: Clock> NerveCenter<C> {
    /// Render the live context document: open jobs, live locks, notepad.
    pub async fn get_core_context(&self, project: &ProjectId) -> Result<String, CoordError> {
        let _gate = self.gate.lock().await;

        let now_ms = self.clock.epoch_ms();
        let mut jobs = self.store_call(self.store.select_project_jobs(project)).await?;
        jobs.retain(|j| !j.is_terminal());
        jobs.sort_by_key(Job::ranking_key);

        self.store_call(self.store.reclaim_stale_locks(project, self.config.lock_ttl, now_ms))
            .await?;
        let mut locks = self.store_call(self.store.select_project_locks(project)).await?;
        locks.sort_by(|a, b| a.file_path.cmp(&b.file_path));

        let notepad = self.store_call(self.store.read_notepad(project)).await?;
        self.refresh_mirror(project, &notepad);

        let mut doc = String::from("# Live Coordination Context\n\n## Job Board\n");
        if jobs.is_empty() {
            doc.push_str("No open jobs.\n");
        }
        for job in &jobs {
            let _ = writeln!(doc, "- [{}/{}] {} ({})", job.priority, job.status, job.title, job.id);
            if let Some(assignee) = &job.assigned_to {
                let _ = writeln!(doc, "  - assigned: {assignee}");
            }
            if !job.dependencies.is_empty() {
                let deps: Vec<&str> = job.dependencies.iter().map(|d| d.as_str()).collect();
                let _ = writeln!(doc, "  - depends on: {}", deps.join(", "));
            }
        }

        doc.push_str("\n## Active File Locks\n");
        if locks.is_empty() {
            doc.push_str("No active locks.\n");
        }
        for lock in &locks {
            let age_mins = lock.age(now_ms).as_secs() / 60;
            let _ = writeln!(
                doc,
                "- {} held by {} ({}, {}m)",
                lock.file_path, lock.agent_id, lock.intent, age_mins
            );
        }

        doc.push_str("\n## Shared Notepad\n");
        doc.push_str(&notepad);
        if !notepad.ends_with('\n') {
            doc.push('\n');
        }
        Ok(doc)
    }

    /// Concatenate the project's standing instructions. Missing files
    /// degrade to a placeholder rather than an error.
    pub fn get_project_soul(&self) -> String {
        project_soul(&self.config.instructions_dir)
    }

    /// Rewrite the activity instructions file (`update_context` tool).
    pub fn record_activity(&self, text: &str) -> Result<(), CoordError> {
        record_activity(&self.config.instructions_dir, text)
    }

    /// Board and lock counters for the usage-stats tool.
    pub async fn usage_stats(&self, project: &ProjectId) -> Result<serde_json::Value, CoordError> {
        let _gate = self.gate.lock().await;
        let jobs = self.store_call(self.store.select_project_jobs(project)).await?;
        let locks = self.store_call(self.store.select_project_locks(project)).await?;
        let notepad = self.store_call(self.store.read_notepad(project)).await?;

        let count = |status: JobStatus| jobs.iter().filter(|j| j.status == status).count();
        Ok(serde_json::json!({
            "jobs": {
                "todo": count(JobStatus::Todo),
                "in_progress": count(JobStatus::InProgress),
                "done": count(JobStatus::Done),
                "cancelled": count(JobStatus::Cancelled),
            },
            "locks": locks.len(),
            "notepad_chars": notepad.chars().count(),
        }))
    }
}
