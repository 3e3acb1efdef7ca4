// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session archive records and notepad markers.

use crate::project::ProjectId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Identifier for an archived session.
    pub struct ArchiveId("ses-");
}

/// Archive summaries keep the first 500 characters of the notepad.
pub const SUMMARY_LEN: usize = 500;

/// The line the notepad is reset to when a session is finalized.
pub fn session_start_marker(iso: &str) -> String {
    format!("Session Start: {iso}\n")
}

/// First [`SUMMARY_LEN`] characters of the notepad, on a char boundary.
pub fn summarize(notepad: &str) -> String {
    notepad.chars().take(SUMMARY_LEN).collect()
}

/// A write-once snapshot of a finalized session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionArchive {
    pub id: ArchiveId,
    pub project_id: ProjectId,
    pub title: String,
    pub summary: String,
    pub created_at_ms: u64,
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
