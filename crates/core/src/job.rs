// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job board entities: priority, status, completion key, and the job record.

use crate::error::ParseEnumError;
use crate::project::ProjectId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a posted job.
    pub struct JobId("job-");
}

/// Job priority. Claim order is critical > high > medium > low.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl JobPriority {
    /// Ranking key for claim selection. Lower claims first.
    pub fn rank(self) -> u8 {
        match self {
            JobPriority::Critical => 0,
            JobPriority::High => 1,
            JobPriority::Medium => 2,
            JobPriority::Low => 3,
        }
    }
}

impl Default for JobPriority {
    fn default() -> Self {
        JobPriority::Medium
    }
}

impl std::str::FromStr for JobPriority {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(JobPriority::Low),
            "medium" => Ok(JobPriority::Medium),
            "high" => Ok(JobPriority::High),
            "critical" => Ok(JobPriority::Critical),
            other => Err(ParseEnumError::new("priority", other)),
        }
    }
}

crate::simple_display! {
    JobPriority {
        Low => "low",
        Medium => "medium",
        High => "high",
        Critical => "critical",
    }
}

/// Job lifecycle status. `Done` and `Cancelled` are sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Todo,
    InProgress,
    Done,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Cancelled)
    }
}

impl std::str::FromStr for JobStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "todo" => Ok(JobStatus::Todo),
            "in_progress" => Ok(JobStatus::InProgress),
            "done" => Ok(JobStatus::Done),
            "cancelled" => Ok(JobStatus::Cancelled),
            other => Err(ParseEnumError::new("status", other)),
        }
    }
}

crate::simple_display! {
    JobStatus {
        Todo => "todo",
        InProgress => "in_progress",
        Done => "done",
        Cancelled => "cancelled",
    }
}

/// Token issued at post time that authorises completion by a non-assignee.
///
/// 8 uppercase-alphanumeric characters from the OS cryptographic RNG.
/// Comparison is exact; no downstream validation constrains the alphabet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompletionKey(String);

impl CompletionKey {
    pub const LEN: usize = 8;
    const ALPHABET: &'static [u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

    pub fn generate() -> Self {
        use rand::{rngs::OsRng, Rng};
        let key = (0..Self::LEN)
            .map(|_| Self::ALPHABET[OsRng.gen_range(0..Self::ALPHABET.len())] as char)
            .collect();
        Self(key)
    }

    /// Exact comparison against a caller-supplied key.
    pub fn matches(&self, candidate: &str) -> bool {
        self.0 == candidate
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Rehydrate a stored key. Keys are only ever generated by
    /// [`CompletionKey::generate`]; this exists for persistence layers.
    pub fn from_string(key: impl Into<String>) -> Self {
        Self(key.into())
    }
}

/// Input for posting a new job.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewJob {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub priority: JobPriority,
    #[serde(default)]
    pub dependencies: Vec<JobId>,
}

/// A job on the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub project_id: ProjectId,
    pub title: String,
    pub description: String,
    pub priority: JobPriority,
    pub status: JobStatus,
    /// Set iff status is in_progress or done.
    #[serde(default)]
    pub assigned_to: Option<String>,
    /// Direct dependencies; all must be done before this job is claimable.
    #[serde(default)]
    pub dependencies: Vec<JobId>,
    pub completion_key: CompletionKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel_reason: Option<String>,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
}

impl Job {
    /// Create a new todo job with a fresh id and completion key.
    pub fn post(project_id: ProjectId, new_job: NewJob, epoch_ms: u64) -> Self {
        Self {
            id: JobId::generate(),
            project_id,
            title: new_job.title,
            description: new_job.description,
            priority: new_job.priority,
            status: JobStatus::Todo,
            assigned_to: None,
            dependencies: new_job.dependencies,
            completion_key: CompletionKey::generate(),
            cancel_reason: None,
            created_at_ms: epoch_ms,
            updated_at_ms: epoch_ms,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Claim selection key: `(priority_rank, created_at asc)`.
    pub fn ranking_key(&self) -> (u8, u64) {
        (self.priority.rank(), self.created_at_ms)
    }

    /// Apply one allow-listed field update.
    pub fn apply(&mut self, update: &JobUpdate, now_ms: u64) {
        match update {
            JobUpdate::SetStatus(status) => {
                self.status = *status;
                // Assignee set iff status is in_progress or done.
                if !matches!(status, JobStatus::InProgress | JobStatus::Done) {
                    self.assigned_to = None;
                }
            }
            JobUpdate::SetPriority(priority) => self.priority = *priority,
            JobUpdate::SetAssignee(assignee) => self.assigned_to = assignee.clone(),
            JobUpdate::SetCancelReason(reason) => self.cancel_reason = Some(reason.clone()),
        }
        self.updated_at_ms = now_ms;
    }
}

/// Allow-listed job field updates.
///
/// The closed set of mutations the store accepts; anything else is
/// rejected at the surface before it reaches persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "set", content = "value", rename_all = "snake_case")]
pub enum JobUpdate {
    SetStatus(JobStatus),
    SetPriority(JobPriority),
    SetAssignee(Option<String>),
    SetCancelReason(String),
}

/// Test builder for [`Job`].
#[cfg(any(test, feature = "test-support"))]
pub struct JobBuilder {
    project_id: ProjectId,
    title: String,
    priority: JobPriority,
    status: JobStatus,
    assigned_to: Option<String>,
    dependencies: Vec<JobId>,
    completion_key: CompletionKey,
    created_at_ms: u64,
}

#[cfg(any(test, feature = "test-support"))]
impl Default for JobBuilder {
    fn default() -> Self {
        Self {
            project_id: ProjectId::from("prj-test"),
            title: "test job".to_string(),
            priority: JobPriority::Medium,
            status: JobStatus::Todo,
            assigned_to: None,
            dependencies: Vec::new(),
            completion_key: CompletionKey::from_string("TESTKEY0"),
            created_at_ms: 1_000_000,
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
impl JobBuilder {
    pub fn project_id(mut self, v: impl Into<ProjectId>) -> Self {
        self.project_id = v.into();
        self
    }

    pub fn title(mut self, v: impl Into<String>) -> Self {
        self.title = v.into();
        self
    }

    pub fn priority(mut self, v: JobPriority) -> Self {
        self.priority = v;
        self
    }

    pub fn status(mut self, v: JobStatus) -> Self {
        self.status = v;
        self
    }

    pub fn assigned_to(mut self, v: impl Into<String>) -> Self {
        self.assigned_to = Some(v.into());
        self
    }

    pub fn dependencies(mut self, v: Vec<JobId>) -> Self {
        self.dependencies = v;
        self
    }

    pub fn completion_key(mut self, v: impl Into<String>) -> Self {
        self.completion_key = CompletionKey::from_string(v);
        self
    }

    pub fn created_at_ms(mut self, v: u64) -> Self {
        self.created_at_ms = v;
        self
    }

    pub fn build(self) -> Job {
        Job {
            id: JobId::generate(),
            project_id: self.project_id,
            title: self.title,
            description: String::new(),
            priority: self.priority,
            status: self.status,
            assigned_to: self.assigned_to,
            dependencies: self.dependencies,
            completion_key: self.completion_key,
            cancel_reason: None,
            created_at_ms: self.created_at_ms,
            updated_at_ms: self.created_at_ms,
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
