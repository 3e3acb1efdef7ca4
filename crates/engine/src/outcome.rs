// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed operation outcomes, serialised with the status vocabulary the
//! surfaces expose (`CLAIMED`, `NO_JOBS_AVAILABLE`, `GRANTED`, ...).

use axis_core::{FileLock, Job};
use serde::Serialize;

/// Result of `claim_next_job`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClaimOutcome {
    Claimed { job: Job },
    NoJobsAvailable,
}

/// Incumbent metadata returned with a denied lock proposal.
#[derive(Debug, Clone, Serialize)]
pub struct LockHolder {
    pub agent_id: String,
    pub intent: String,
    pub file_path: String,
}

impl From<&FileLock> for LockHolder {
    fn from(lock: &FileLock) -> Self {
        Self {
            agent_id: lock.agent_id.clone(),
            intent: lock.intent.clone(),
            file_path: lock.file_path.clone(),
        }
    }
}

/// Result of `propose_file_access`. A denial carries the incumbent so
/// the caller can route around it; it never blocks or queues.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessOutcome {
    Granted,
    RequiresOrchestration { current_lock: LockHolder },
}
