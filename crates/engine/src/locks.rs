// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock registry operations.

use crate::outcome::{AccessOutcome, LockHolder};
use crate::NerveCenter;
use axis_core::{Clock, CoordError, FileLock, ProjectId};
use axis_store::LockAttempt;
use tracing::info;

impl<C: Clock> NerveCenter<C> {
    /// Propose access to a file path.
    ///
    /// Protocol: lazy TTL reclamation, then one atomic try-acquire. A
    /// live foreign lock yields `REQUIRES_ORCHESTRATION` with the
    /// incumbent's metadata; the caller is expected to work on something
    /// else. Never blocks, never queues.
    pub async fn propose_file_access(
        &self,
        project: &ProjectId,
        agent_id: &str,
        file_path: &str,
        intent: &str,
        user_prompt: &str,
    ) -> Result<AccessOutcome, CoordError> {
        if file_path.trim().is_empty() {
            return Err(CoordError::BadRequest("file path must not be empty".to_string()));
        }
        if agent_id.trim().is_empty() {
            return Err(CoordError::BadRequest("agent id must not be empty".to_string()));
        }

        let _gate = self.gate.lock().await;

        let now_ms = self.clock.epoch_ms();
        self.store_call(self.store.reclaim_stale_locks(project, self.config.lock_ttl, now_ms))
            .await?;

        let lock =
            FileLock::new(project.clone(), file_path, agent_id, intent, user_prompt, now_ms);
        let attempt =
            self.store_call(self.store.try_acquire_lock(&lock, self.config.lock_ttl)).await?;

        match attempt {
            LockAttempt::Acquired => {
                info!(agent = agent_id, path = file_path, "lock granted");
                self.note(project, &format!("[LOCK] {agent_id} locked {file_path} ({intent})"))
                    .await;
                Ok(AccessOutcome::Granted)
            }
            LockAttempt::Held(incumbent) => Ok(AccessOutcome::RequiresOrchestration {
                current_lock: LockHolder::from(&incumbent),
            }),
        }
    }

    /// Remove any current lock on `file_path`, no questions asked.
    ///
    /// Stuck-lock recovery. That agents only force-unlock stale locks is
    /// convention, not something the registry enforces.
    pub async fn force_unlock(
        &self,
        project: &ProjectId,
        file_path: &str,
        reason: &str,
    ) -> Result<(), CoordError> {
        let _gate = self.gate.lock().await;
        let existed = self.store_call(self.store.delete_lock(project, file_path)).await?;
        if existed {
            info!(path = file_path, reason, "lock force-unlocked");
            self.note(project, &format!("[LOCK] force-unlocked {file_path}: {reason}")).await;
        }
        Ok(())
    }

    /// Live locks for a project, reclaiming stale ones first.
    pub async fn list_locks(&self, project: &ProjectId) -> Result<Vec<FileLock>, CoordError> {
        let _gate = self.gate.lock().await;
        let now_ms = self.clock.epoch_ms();
        self.store_call(self.store.reclaim_stale_locks(project, self.config.lock_ttl, now_ms))
            .await?;
        let mut locks = self.store_call(self.store.select_project_locks(project)).await?;
        locks.sort_by(|a, b| a.file_path.cmp(&b.file_path));
        Ok(locks)
    }
}
