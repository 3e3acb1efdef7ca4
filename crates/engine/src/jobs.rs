// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job board operations: post, claim, complete, cancel, update.

use crate::outcome::ClaimOutcome;
use crate::NerveCenter;
use axis_core::{Clock, CoordError, Job, JobId, JobStatus, JobUpdate, NewJob, ProjectId};
use axis_store::ClaimResult;
use std::collections::HashSet;
use tracing::{debug, info};

const MAX_TITLE_LEN: usize = 500;
const MAX_DESCRIPTION_LEN: usize = 10_000;

impl<C: Clock> NerveCenter<C> {
    /// Post a new job. Returns the full record; the completion key in it
    /// is the only time the key is handed out.
    pub async fn post_job(
        &self,
        project: &ProjectId,
        new_job: NewJob,
    ) -> Result<Job, CoordError> {
        if new_job.title.trim().is_empty() {
            return Err(CoordError::BadRequest("job title must not be empty".to_string()));
        }
        if new_job.title.chars().count() > MAX_TITLE_LEN {
            return Err(CoordError::BadRequest(format!(
                "job title exceeds {MAX_TITLE_LEN} characters"
            )));
        }
        if new_job.description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(CoordError::BadRequest(format!(
                "job description exceeds {MAX_DESCRIPTION_LEN} characters"
            )));
        }

        let _gate = self.gate.lock().await;

        // Dependencies must name existing jobs in this project, once each.
        if !new_job.dependencies.is_empty() {
            let existing = self.store_call(self.store.select_project_jobs(project)).await?;
            let known: HashSet<&str> = existing.iter().map(|j| j.id.as_str()).collect();
            let mut seen = HashSet::new();
            for dep in &new_job.dependencies {
                if !known.contains(dep.as_str()) {
                    return Err(CoordError::BadRequest(format!("unknown dependency {dep}")));
                }
                if !seen.insert(dep.as_str()) {
                    return Err(CoordError::BadRequest(format!("duplicate dependency {dep}")));
                }
            }
        }

        let job = Job::post(project.clone(), new_job, self.clock.epoch_ms());
        self.store_call(self.store.insert_job(&job)).await?;
        info!(job = %job.id, priority = %job.priority, "job posted");
        self.note(project, &format!("[JOB POSTED] {} ({}, {})", job.title, job.id, job.priority))
            .await;
        Ok(job)
    }

    /// Claim the best eligible job for `agent_id`.
    ///
    /// Eligible: status todo with every direct dependency done. Order:
    /// priority (critical first), then oldest. Candidates are claimed
    /// conditionally in order; a lost race just moves to the next one.
    pub async fn claim_next_job(
        &self,
        project: &ProjectId,
        agent_id: &str,
    ) -> Result<ClaimOutcome, CoordError> {
        let _gate = self.gate.lock().await;

        let jobs = self.store_call(self.store.select_project_jobs(project)).await?;
        let done: HashSet<&str> = jobs
            .iter()
            .filter(|j| j.status == JobStatus::Done)
            .map(|j| j.id.as_str())
            .collect();

        let mut candidates: Vec<&Job> = jobs
            .iter()
            .filter(|j| j.status == JobStatus::Todo)
            .filter(|j| j.dependencies.iter().all(|d| done.contains(d.as_str())))
            .collect();
        candidates.sort_by_key(|j| j.ranking_key());

        for candidate in candidates {
            let claim = self
                .store_call(self.store.conditional_claim_job(
                    project,
                    &candidate.id,
                    agent_id,
                    self.clock.epoch_ms(),
                ))
                .await?;
            match claim {
                ClaimResult::Claimed(job) => {
                    info!(job = %job.id, agent = agent_id, "job claimed");
                    self.note(
                        project,
                        &format!("[JOB CLAIMED] {} -> {} ({})", agent_id, job.title, job.id),
                    )
                    .await;
                    return Ok(ClaimOutcome::Claimed { job });
                }
                ClaimResult::AlreadyTaken => {
                    debug!(job = %candidate.id, "claim lost, trying next candidate");
                }
            }
        }
        Ok(ClaimOutcome::NoJobsAvailable)
    }

    /// Complete a job.
    ///
    /// Authorised iff the caller is the assignee or supplied the job's
    /// completion key; the dual rule lets a second agent close out work
    /// started by a crashed one. Unauthorised calls mutate nothing.
    /// Completing a job does not release the agent's file locks.
    pub async fn complete_job(
        &self,
        project: &ProjectId,
        agent_id: &str,
        job_id: &JobId,
        outcome: &str,
        completion_key: Option<&str>,
    ) -> Result<Job, CoordError> {
        let _gate = self.gate.lock().await;

        let job = self
            .store_call(self.store.get_job(project, job_id))
            .await?
            .ok_or_else(|| CoordError::NotFound(format!("job {job_id}")))?;

        if job.is_terminal() {
            return Err(CoordError::Conflict(format!("job {job_id} is already {}", job.status)));
        }

        let by_identity = job.assigned_to.as_deref() == Some(agent_id);
        let by_key = completion_key.is_some_and(|k| job.completion_key.matches(k));
        if !by_identity && !by_key {
            return Err(CoordError::Unauthorized(
                "completion requires the assignee identity or a valid completion key".to_string(),
            ));
        }

        let updated = self
            .store_call(self.store.update_job(
                project,
                job_id,
                &[
                    JobUpdate::SetStatus(JobStatus::Done),
                    JobUpdate::SetAssignee(Some(agent_id.to_string())),
                ],
                self.clock.epoch_ms(),
            ))
            .await?;
        info!(job = %job_id, agent = agent_id, "job completed");
        self.note(
            project,
            &format!("[JOB DONE] {} ({}) by {}: {}", updated.title, job_id, agent_id, outcome),
        )
        .await;
        Ok(updated)
    }

    /// Cancel a job, recording the reason. Any project member may cancel;
    /// there is deliberately no caller authorisation beyond that.
    pub async fn cancel_job(
        &self,
        project: &ProjectId,
        job_id: &JobId,
        reason: &str,
    ) -> Result<Job, CoordError> {
        let _gate = self.gate.lock().await;

        let job = self
            .store_call(self.store.get_job(project, job_id))
            .await?
            .ok_or_else(|| CoordError::NotFound(format!("job {job_id}")))?;
        if job.is_terminal() {
            return Err(CoordError::Conflict(format!("job {job_id} is already {}", job.status)));
        }

        let updated = self
            .store_call(self.store.update_job(
                project,
                job_id,
                &[
                    JobUpdate::SetStatus(JobStatus::Cancelled),
                    JobUpdate::SetCancelReason(reason.to_string()),
                ],
                self.clock.epoch_ms(),
            ))
            .await?;
        info!(job = %job_id, "job cancelled");
        self.note(project, &format!("[JOB CANCELLED] {} ({}): {}", updated.title, job_id, reason))
            .await;
        Ok(updated)
    }

    /// Apply allow-listed updates (the HTTP `update` action).
    pub async fn update_job(
        &self,
        project: &ProjectId,
        job_id: &JobId,
        updates: Vec<JobUpdate>,
    ) -> Result<Job, CoordError> {
        if updates.is_empty() {
            return Err(CoordError::BadRequest("no updates supplied".to_string()));
        }

        let _gate = self.gate.lock().await;

        let job = self
            .store_call(self.store.get_job(project, job_id))
            .await?
            .ok_or_else(|| CoordError::NotFound(format!("job {job_id}")))?;

        let sets_status = updates.iter().any(|u| matches!(u, JobUpdate::SetStatus(_)));
        if sets_status && job.is_terminal() {
            return Err(CoordError::Conflict(format!("job {job_id} is already {}", job.status)));
        }

        // Invariant: assignee set iff status is in_progress or done.
        // Preview the applied updates so the check covers the resulting
        // pair whichever field the caller touched.
        let mut preview = job.clone();
        for update in &updates {
            preview.apply(update, 0);
        }
        let active = matches!(preview.status, JobStatus::InProgress | JobStatus::Done);
        if active && preview.assigned_to.is_none() {
            return Err(CoordError::BadRequest(
                "status in_progress/done requires an assignee".to_string(),
            ));
        }
        if !active && preview.assigned_to.is_some() {
            return Err(CoordError::BadRequest(
                "an assignee requires status in_progress or done".to_string(),
            ));
        }

        let updated = self
            .store_call(self.store.update_job(project, job_id, &updates, self.clock.epoch_ms()))
            .await?;
        self.note(project, &format!("[JOB UPDATED] {} ({})", updated.title, job_id)).await;
        Ok(updated)
    }

    /// All jobs for a project, oldest first.
    pub async fn list_jobs(&self, project: &ProjectId) -> Result<Vec<Job>, CoordError> {
        let _gate = self.gate.lock().await;
        let mut jobs = self.store_call(self.store.select_project_jobs(project)).await?;
        jobs.sort_by_key(|j| j.created_at_ms);
        Ok(jobs)
    }
}
