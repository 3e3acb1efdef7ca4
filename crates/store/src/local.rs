// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-process store backed by one JSON document.
//!
//! Every mutation rewrites the file in full (temp file + rename, the
//! simplest crash-safe option at this size). Session archives are
//! written as Markdown files next to the state file.

use crate::{ArchiveReceipt, ClaimResult, EmbeddingMatch, LockAttempt, Store, StoreError};
use async_trait::async_trait;
use axis_core::clock::iso_from_epoch_ms;
use axis_core::{ArchiveId, FileLock, Job, JobId, JobUpdate, ProjectId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// File-backed store for local mode. One process owns the file.
pub struct LocalStore {
    state_path: PathBuf,
    history_dir: PathBuf,
    inner: Mutex<StateFile>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StateFile {
    #[serde(default)]
    projects: Vec<ProjectState>,
}

/// Per-project slice of the state document: the spec's
/// `{locks, jobs, live_notepad}` layout plus identity and embeddings.
#[derive(Debug, Serialize, Deserialize)]
struct ProjectState {
    id: ProjectId,
    name: String,
    owner_id: String,
    #[serde(default)]
    locks: HashMap<String, FileLock>,
    #[serde(default)]
    jobs: HashMap<String, Job>,
    #[serde(default)]
    live_notepad: String,
    #[serde(default)]
    embeddings: Vec<StoredEmbedding>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEmbedding {
    id: String,
    content: String,
    vector: Vec<f32>,
    metadata: serde_json::Value,
    created_at_ms: u64,
}

impl LocalStore {
    /// Open (or create) the state file at `state_path`. Archives land in
    /// the same directory.
    pub fn open(state_path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let state_path = state_path.into();
        let history_dir = state_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        fs::create_dir_all(&history_dir)?;

        let state = if state_path.exists() {
            let raw = fs::read_to_string(&state_path)?;
            serde_json::from_str(&raw)?
        } else {
            StateFile::default()
        };

        Ok(Self { state_path, history_dir, inner: Mutex::new(state) })
    }

    /// Rewrite the state document atomically.
    fn flush(&self, state: &StateFile) -> Result<(), StoreError> {
        let raw = serde_json::to_string_pretty(state)?;
        let tmp = self.state_path.with_extension("json.tmp");
        fs::write(&tmp, raw)?;
        fs::rename(&tmp, &self.state_path)?;
        Ok(())
    }

    fn project_index(state: &StateFile, project: &ProjectId) -> Result<usize, StoreError> {
        state
            .projects
            .iter()
            .position(|p| &p.id == project)
            .ok_or_else(|| StoreError::NotFound(format!("project {project}")))
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl Store for LocalStore {
    async fn resolve_project(&self, name: &str, owner_id: &str) -> Result<ProjectId, StoreError> {
        let mut state = self.inner.lock();
        if let Some(existing) =
            state.projects.iter().find(|p| p.name == name && p.owner_id == owner_id)
        {
            return Ok(existing.id.clone());
        }

        let id = ProjectId::generate();
        debug!(project = %id, name, "creating project");
        state.projects.push(ProjectState {
            id: id.clone(),
            name: name.to_string(),
            owner_id: owner_id.to_string(),
            locks: HashMap::new(),
            jobs: HashMap::new(),
            live_notepad: String::new(),
            embeddings: Vec::new(),
        });
        self.flush(&state)?;
        Ok(id)
    }

    async fn insert_job(&self, job: &Job) -> Result<(), StoreError> {
        let mut state = self.inner.lock();
        let idx = Self::project_index(&state, &job.project_id)?;
        state.projects[idx].jobs.insert(job.id.as_str().to_string(), job.clone());
        self.flush(&state)
    }

    async fn get_job(&self, project: &ProjectId, job: &JobId) -> Result<Option<Job>, StoreError> {
        let state = self.inner.lock();
        let idx = Self::project_index(&state, project)?;
        Ok(state.projects[idx].jobs.get(job.as_str()).cloned())
    }

    async fn select_project_jobs(&self, project: &ProjectId) -> Result<Vec<Job>, StoreError> {
        let state = self.inner.lock();
        let idx = Self::project_index(&state, project)?;
        Ok(state.projects[idx].jobs.values().cloned().collect())
    }

    async fn conditional_claim_job(
        &self,
        project: &ProjectId,
        job: &JobId,
        agent_id: &str,
        now_ms: u64,
    ) -> Result<ClaimResult, StoreError> {
        let mut state = self.inner.lock();
        let idx = Self::project_index(&state, project)?;
        let Some(record) = state.projects[idx].jobs.get_mut(job.as_str()) else {
            return Ok(ClaimResult::AlreadyTaken);
        };
        if record.status != axis_core::JobStatus::Todo {
            return Ok(ClaimResult::AlreadyTaken);
        }
        record.status = axis_core::JobStatus::InProgress;
        record.assigned_to = Some(agent_id.to_string());
        record.updated_at_ms = now_ms;
        let claimed = record.clone();
        self.flush(&state)?;
        Ok(ClaimResult::Claimed(claimed))
    }

    async fn update_job(
        &self,
        project: &ProjectId,
        job: &JobId,
        updates: &[JobUpdate],
        now_ms: u64,
    ) -> Result<Job, StoreError> {
        let mut state = self.inner.lock();
        let idx = Self::project_index(&state, project)?;
        let record = state.projects[idx]
            .jobs
            .get_mut(job.as_str())
            .ok_or_else(|| StoreError::NotFound(format!("job {job}")))?;
        for update in updates {
            record.apply(update, now_ms);
        }
        let updated = record.clone();
        self.flush(&state)?;
        Ok(updated)
    }

    async fn try_acquire_lock(
        &self,
        lock: &FileLock,
        ttl: Duration,
    ) -> Result<LockAttempt, StoreError> {
        let now_ms = lock.updated_at_ms;
        let mut state = self.inner.lock();
        let idx = Self::project_index(&state, &lock.project_id)?;
        let locks = &mut state.projects[idx].locks;

        match locks.get(&lock.file_path) {
            Some(incumbent)
                if incumbent.agent_id != lock.agent_id && incumbent.is_live(now_ms, ttl) =>
            {
                return Ok(LockAttempt::Held(incumbent.clone()));
            }
            Some(incumbent) if incumbent.agent_id == lock.agent_id => {
                // Refresh by the owner keeps the original acquisition time.
                let mut refreshed = lock.clone();
                refreshed.created_at_ms = incumbent.created_at_ms;
                locks.insert(lock.file_path.clone(), refreshed);
            }
            _ => {
                locks.insert(lock.file_path.clone(), lock.clone());
            }
        }
        self.flush(&state)?;
        Ok(LockAttempt::Acquired)
    }

    async fn select_project_locks(
        &self,
        project: &ProjectId,
    ) -> Result<Vec<FileLock>, StoreError> {
        let state = self.inner.lock();
        let idx = Self::project_index(&state, project)?;
        Ok(state.projects[idx].locks.values().cloned().collect())
    }

    async fn delete_lock(
        &self,
        project: &ProjectId,
        file_path: &str,
    ) -> Result<bool, StoreError> {
        let mut state = self.inner.lock();
        let idx = Self::project_index(&state, project)?;
        let removed = state.projects[idx].locks.remove(file_path).is_some();
        if removed {
            self.flush(&state)?;
        }
        Ok(removed)
    }

    async fn reclaim_stale_locks(
        &self,
        project: &ProjectId,
        ttl: Duration,
        now_ms: u64,
    ) -> Result<u64, StoreError> {
        let mut state = self.inner.lock();
        let idx = Self::project_index(&state, project)?;
        let locks = &mut state.projects[idx].locks;
        let before = locks.len();
        locks.retain(|_, l| l.is_live(now_ms, ttl));
        let reclaimed = (before - locks.len()) as u64;
        if reclaimed > 0 {
            debug!(project = %project, reclaimed, "reclaimed stale locks");
            self.flush(&state)?;
        }
        Ok(reclaimed)
    }

    async fn read_notepad(&self, project: &ProjectId) -> Result<String, StoreError> {
        let state = self.inner.lock();
        let idx = Self::project_index(&state, project)?;
        Ok(state.projects[idx].live_notepad.clone())
    }

    async fn append_notepad(&self, project: &ProjectId, text: &str) -> Result<(), StoreError> {
        let mut state = self.inner.lock();
        let idx = Self::project_index(&state, project)?;
        state.projects[idx].live_notepad.push_str(text);
        self.flush(&state)
    }

    async fn reset_notepad(&self, project: &ProjectId, marker: &str) -> Result<(), StoreError> {
        let mut state = self.inner.lock();
        let idx = Self::project_index(&state, project)?;
        state.projects[idx].live_notepad = marker.to_string();
        self.flush(&state)
    }

    async fn archive_session(
        &self,
        project: &ProjectId,
        title: &str,
        _summary: &str,
        full: &str,
        now_ms: u64,
    ) -> Result<ArchiveReceipt, StoreError> {
        // The Markdown archive keeps the full content; the summary column
        // only exists in the shared store.
        Self::project_index(&self.inner.lock(), project)?;

        fs::create_dir_all(&self.history_dir)?;
        let path = self.history_dir.join(format!("session-{}.md", iso_from_epoch_ms(now_ms)));
        let document = format!("# {title}\n\n{full}\n");
        fs::write(&path, document)?;
        Ok(ArchiveReceipt { id: ArchiveId::generate(), path: Some(path) })
    }

    async fn purge_terminal_jobs(&self, project: &ProjectId) -> Result<u64, StoreError> {
        let mut state = self.inner.lock();
        let idx = Self::project_index(&state, project)?;
        let jobs = &mut state.projects[idx].jobs;
        let before = jobs.len();
        jobs.retain(|_, j| !j.is_terminal());
        let purged = (before - jobs.len()) as u64;
        if purged > 0 {
            self.flush(&state)?;
        }
        Ok(purged)
    }

    async fn delete_project_locks(&self, project: &ProjectId) -> Result<u64, StoreError> {
        let mut state = self.inner.lock();
        let idx = Self::project_index(&state, project)?;
        let deleted = state.projects[idx].locks.len() as u64;
        state.projects[idx].locks.clear();
        if deleted > 0 {
            self.flush(&state)?;
        }
        Ok(deleted)
    }

    async fn insert_embedding(
        &self,
        project: &ProjectId,
        content: &str,
        vector: &[f32],
        metadata: &serde_json::Value,
        now_ms: u64,
    ) -> Result<String, StoreError> {
        let mut state = self.inner.lock();
        let idx = Self::project_index(&state, project)?;
        let id = format!("emb-{}", nanoid::nanoid!(12));
        state.projects[idx].embeddings.push(StoredEmbedding {
            id: id.clone(),
            content: content.to_string(),
            vector: vector.to_vec(),
            metadata: metadata.clone(),
            created_at_ms: now_ms,
        });
        self.flush(&state)?;
        Ok(id)
    }

    async fn match_embeddings(
        &self,
        project: &ProjectId,
        vector: &[f32],
        threshold: f32,
        count: usize,
    ) -> Result<Vec<EmbeddingMatch>, StoreError> {
        let state = self.inner.lock();
        let idx = Self::project_index(&state, project)?;
        let mut matches: Vec<EmbeddingMatch> = state.projects[idx]
            .embeddings
            .iter()
            .map(|e| EmbeddingMatch {
                id: e.id.clone(),
                content: e.content.clone(),
                metadata: e.metadata.clone(),
                similarity: cosine_similarity(&e.vector, vector),
            })
            .filter(|m| m.similarity >= threshold)
            .collect();
        matches.sort_by(|a, b| {
            b.similarity.partial_cmp(&a.similarity).unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(count);
        Ok(matches)
    }
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;
