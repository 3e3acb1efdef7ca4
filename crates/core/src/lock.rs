// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-path lock records and TTL liveness.

use crate::project::ProjectId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default lock TTL: 30 minutes. Expiry is lazy; read/write paths reclaim.
pub const DEFAULT_LOCK_TTL: Duration = Duration::from_secs(30 * 60);

/// An advisory claim on a file path, held by one agent.
///
/// `(project_id, file_path)` is the primary key: at most one live lock
/// per file per project. Age is measured from `updated_at_ms`, so a
/// refresh by the owner extends the lease.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileLock {
    pub project_id: ProjectId,
    pub file_path: String,
    pub agent_id: String,
    pub intent: String,
    pub user_prompt: String,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
}

impl FileLock {
    pub fn new(
        project_id: ProjectId,
        file_path: impl Into<String>,
        agent_id: impl Into<String>,
        intent: impl Into<String>,
        user_prompt: impl Into<String>,
        now_ms: u64,
    ) -> Self {
        Self {
            project_id,
            file_path: file_path.into(),
            agent_id: agent_id.into(),
            intent: intent.into(),
            user_prompt: user_prompt.into(),
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
        }
    }

    /// Age of the lock relative to `now_ms`.
    pub fn age(&self, now_ms: u64) -> Duration {
        Duration::from_millis(now_ms.saturating_sub(self.updated_at_ms))
    }

    /// Live iff `now - updated_at <= ttl`. A stale lock is treated as absent.
    pub fn is_live(&self, now_ms: u64, ttl: Duration) -> bool {
        self.age(now_ms) <= ttl
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
