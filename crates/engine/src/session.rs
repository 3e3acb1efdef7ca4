// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared-context notes, session sync, and the session archiver.

use crate::NerveCenter;
use axis_core::{session_start_marker, summarize, Clock, CoordError, ProjectId};
use axis_store::ArchiveReceipt;
use tracing::info;

const MAX_NOTE_LEN: usize = 10_000;

impl<C: Clock> NerveCenter<C> {
    /// Append a free-form agent note to the shared notepad.
    pub async fn update_shared_context(
        &self,
        project: &ProjectId,
        agent_id: &str,
        text: &str,
    ) -> Result<(), CoordError> {
        if text.trim().is_empty() {
            return Err(CoordError::BadRequest("context text must not be empty".to_string()));
        }
        if text.chars().count() > MAX_NOTE_LEN {
            return Err(CoordError::BadRequest(format!(
                "context text exceeds {MAX_NOTE_LEN} characters"
            )));
        }
        let _gate = self.gate.lock().await;
        // The note itself is the mutation here, so a failed append must
        // surface instead of being swallowed like piggyback records.
        let entry = format!("\n- [{agent_id}] {text}");
        self.store_call(self.store.append_notepad(project, &entry)).await?;
        let mut mirror = self.notepad_mirror.lock();
        mirror.entry(project.clone()).or_default().push_str(&entry);
        Ok(())
    }

    /// Archive a snapshot without touching live state (`/v1/sessions/sync`).
    pub async fn sync_session(
        &self,
        project: &ProjectId,
        title: &str,
        content: &str,
    ) -> Result<ArchiveReceipt, CoordError> {
        let _gate = self.gate.lock().await;
        let receipt = self
            .store_call(self.store.archive_session(
                project,
                title,
                &summarize(content),
                content,
                self.clock.epoch_ms(),
            ))
            .await?;
        Ok(receipt)
    }

    /// Finalize the current session.
    ///
    /// Order matters: read the notepad, write the archive (abort on
    /// failure, live state untouched), reset the notepad, clear all
    /// locks, purge terminal jobs. Todo and in-progress jobs survive.
    pub async fn finalize_session(
        &self,
        project: &ProjectId,
    ) -> Result<ArchiveReceipt, CoordError> {
        let _gate = self.gate.lock().await;

        let iso = self.clock.iso_now();
        let notepad = self.store_call(self.store.read_notepad(project)).await?;

        let receipt = self
            .store_call(self.store.archive_session(
                project,
                &format!("Session {iso}"),
                &summarize(&notepad),
                &notepad,
                self.clock.epoch_ms(),
            ))
            .await?;

        let marker = session_start_marker(&iso);
        self.store_call(self.store.reset_notepad(project, &marker)).await?;
        self.refresh_mirror(project, &marker);

        let locks = self.store_call(self.store.delete_project_locks(project)).await?;
        let jobs = self.store_call(self.store.purge_terminal_jobs(project)).await?;
        info!(project = %project, locks, jobs, archive = %receipt.id, "session finalized");
        Ok(receipt)
    }
}
