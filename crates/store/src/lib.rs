// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! axis-store: the persistence boundary.
//!
//! One [`Store`] trait, two implementations with identical externally
//! observable behaviour: [`LocalStore`] (single process, one JSON file)
//! and [`PgStore`] (shared relational store, cross-process). The only
//! permitted divergence is scope of cross-process visibility.

mod local;
mod pg;

pub use local::LocalStore;
pub use pg::PgStore;

use async_trait::async_trait;
use axis_core::{ArchiveId, CoordError, FileLock, Job, JobId, JobUpdate, ProjectId};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors from the persistence boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(String),

    #[error("not found: {0}")]
    NotFound(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => StoreError::NotFound("row not found".to_string()),
            other => StoreError::Database(other.to_string()),
        }
    }
}

impl From<StoreError> for CoordError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => CoordError::NotFound(what),
            other => CoordError::Store(other.to_string()),
        }
    }
}

/// Outcome of a conditional claim. `AlreadyTaken` covers both a lost
/// race (status moved off todo) and a job that no longer exists.
#[derive(Debug, Clone, PartialEq)]
pub enum ClaimResult {
    Claimed(Job),
    AlreadyTaken,
}

/// Outcome of an atomic lock acquisition attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum LockAttempt {
    Acquired,
    Held(FileLock),
}

/// Reference to a written session archive: a row id in the shared
/// store, or a Markdown file path in local mode.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveReceipt {
    pub id: ArchiveId,
    pub path: Option<PathBuf>,
}

/// One scored hit from a vector search.
#[derive(Debug, Clone, serde::Serialize)]
pub struct EmbeddingMatch {
    pub id: String,
    pub content: String,
    pub metadata: serde_json::Value,
    pub similarity: f32,
}

/// Typed persistence operations shared by both store implementations.
///
/// Conditional operations (`conditional_claim_job`, `try_acquire_lock`)
/// must be atomic with respect to other writers of the same backend;
/// a read-then-write across two round trips is incorrect in the shared
/// store. Timestamps are caller-supplied epoch milliseconds so the
/// facade clock stays authoritative.
#[async_trait]
pub trait Store: Send + Sync {
    /// Resolve a project by `(name, owner)`, creating it if absent.
    async fn resolve_project(&self, name: &str, owner_id: &str) -> Result<ProjectId, StoreError>;

    async fn insert_job(&self, job: &Job) -> Result<(), StoreError>;

    async fn get_job(&self, project: &ProjectId, job: &JobId) -> Result<Option<Job>, StoreError>;

    async fn select_project_jobs(&self, project: &ProjectId) -> Result<Vec<Job>, StoreError>;

    /// Claim `job` for `agent_id` iff it is still in todo.
    async fn conditional_claim_job(
        &self,
        project: &ProjectId,
        job: &JobId,
        agent_id: &str,
        now_ms: u64,
    ) -> Result<ClaimResult, StoreError>;

    /// Apply allow-listed updates and return the updated job.
    async fn update_job(
        &self,
        project: &ProjectId,
        job: &JobId,
        updates: &[JobUpdate],
        now_ms: u64,
    ) -> Result<Job, StoreError>;

    /// Acquire or refresh the lock described by `lock` (whose
    /// `updated_at_ms` carries the caller's now). Succeeds when the slot
    /// is free, stale past `ttl`, or held by the same agent.
    async fn try_acquire_lock(
        &self,
        lock: &FileLock,
        ttl: Duration,
    ) -> Result<LockAttempt, StoreError>;

    async fn select_project_locks(&self, project: &ProjectId)
        -> Result<Vec<FileLock>, StoreError>;

    /// Delete the lock on `file_path`. Returns whether a lock existed.
    async fn delete_lock(&self, project: &ProjectId, file_path: &str)
        -> Result<bool, StoreError>;

    /// Drop every lock older than `ttl`. Returns the number reclaimed.
    async fn reclaim_stale_locks(
        &self,
        project: &ProjectId,
        ttl: Duration,
        now_ms: u64,
    ) -> Result<u64, StoreError>;

    async fn read_notepad(&self, project: &ProjectId) -> Result<String, StoreError>;

    async fn append_notepad(&self, project: &ProjectId, text: &str) -> Result<(), StoreError>;

    async fn reset_notepad(&self, project: &ProjectId, marker: &str) -> Result<(), StoreError>;

    async fn archive_session(
        &self,
        project: &ProjectId,
        title: &str,
        summary: &str,
        full: &str,
        now_ms: u64,
    ) -> Result<ArchiveReceipt, StoreError>;

    /// Delete jobs in done/cancelled. Returns the number purged.
    async fn purge_terminal_jobs(&self, project: &ProjectId) -> Result<u64, StoreError>;

    /// Delete every lock for the project. Returns the number deleted.
    async fn delete_project_locks(&self, project: &ProjectId) -> Result<u64, StoreError>;

    async fn insert_embedding(
        &self,
        project: &ProjectId,
        content: &str,
        vector: &[f32],
        metadata: &serde_json::Value,
        now_ms: u64,
    ) -> Result<String, StoreError>;

    async fn match_embeddings(
        &self,
        project: &ProjectId,
        vector: &[f32],
        threshold: f32,
        count: usize,
    ) -> Result<Vec<EmbeddingMatch>, StoreError>;
}
