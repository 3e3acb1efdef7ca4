// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared relational store (Postgres via sqlx).
//!
//! Conditional operations are single statements: claims are gated on
//! `status = 'todo'`, lock acquisition is one upsert whose `DO UPDATE`
//! is guarded by owner/staleness, and stale-lock reclamation is one
//! gated delete. Timestamps are epoch-millisecond BIGINTs supplied by
//! the caller so TTL classification matches the local store exactly.

use crate::{ArchiveReceipt, ClaimResult, EmbeddingMatch, LockAttempt, Store, StoreError};
use async_trait::async_trait;
use axis_core::{ArchiveId, CompletionKey, FileLock, Job, JobId, JobUpdate, ProjectId};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::time::Duration;
use tracing::{debug, warn};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS projects (
    id            TEXT PRIMARY KEY,
    name          TEXT NOT NULL,
    owner_id      TEXT NOT NULL,
    live_notepad  TEXT NOT NULL DEFAULT '',
    UNIQUE (name, owner_id)
);

CREATE TABLE IF NOT EXISTS jobs (
    id              TEXT PRIMARY KEY,
    project_id      TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    title           TEXT NOT NULL,
    description     TEXT NOT NULL DEFAULT '',
    priority        TEXT NOT NULL CHECK (priority IN ('low', 'medium', 'high', 'critical')),
    status          TEXT NOT NULL CHECK (status IN ('todo', 'in_progress', 'done', 'cancelled')),
    assigned_to     TEXT,
    dependencies    JSONB NOT NULL DEFAULT '[]'::jsonb,
    completion_key  TEXT NOT NULL,
    cancel_reason   TEXT,
    created_at      BIGINT NOT NULL,
    updated_at      BIGINT NOT NULL
);

CREATE INDEX IF NOT EXISTS jobs_project_status_idx ON jobs (project_id, status);

CREATE TABLE IF NOT EXISTS locks (
    project_id   TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    file_path    TEXT NOT NULL,
    agent_id     TEXT NOT NULL,
    intent       TEXT NOT NULL DEFAULT '',
    user_prompt  TEXT NOT NULL DEFAULT '',
    created_at   BIGINT NOT NULL,
    updated_at   BIGINT NOT NULL,
    PRIMARY KEY (project_id, file_path)
);

CREATE TABLE IF NOT EXISTS sessions (
    id          TEXT PRIMARY KEY,
    project_id  TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    title       TEXT NOT NULL,
    summary     TEXT NOT NULL,
    content     TEXT NOT NULL,
    created_at  BIGINT NOT NULL
);
"#;

// Requires the pgvector extension; bootstrapped separately so a database
// without it still serves the coordination tables.
const EMBEDDINGS_SCHEMA: &str = r#"
CREATE EXTENSION IF NOT EXISTS vector;

CREATE TABLE IF NOT EXISTS embeddings (
    id          TEXT PRIMARY KEY,
    project_id  TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    content     TEXT NOT NULL,
    embedding   vector(1536) NOT NULL,
    metadata    JSONB NOT NULL DEFAULT '{}'::jsonb,
    created_at  BIGINT NOT NULL
);
"#;

/// Cross-process store over a shared Postgres database.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect and bootstrap the schema idempotently.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(8)
            .acquire_timeout(Duration::from_secs(15))
            .connect(database_url)
            .await?;

        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        if let Err(e) = sqlx::raw_sql(EMBEDDINGS_SCHEMA).execute(&pool).await {
            warn!("embeddings schema unavailable (pgvector missing?): {e}");
        }

        Ok(Self { pool })
    }
}

fn job_from_row(row: &PgRow) -> Result<Job, StoreError> {
    let decode = |e: axis_core::ParseEnumError| StoreError::Database(e.to_string());
    let deps: sqlx::types::Json<Vec<String>> = row.try_get("dependencies")?;
    Ok(Job {
        id: JobId::from_string(row.try_get::<String, _>("id")?),
        project_id: ProjectId::from_string(row.try_get::<String, _>("project_id")?),
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        priority: row.try_get::<String, _>("priority")?.parse().map_err(decode)?,
        status: row.try_get::<String, _>("status")?.parse().map_err(decode)?,
        assigned_to: row.try_get("assigned_to")?,
        dependencies: deps.0.into_iter().map(JobId::from_string).collect(),
        completion_key: CompletionKey::from_string(row.try_get::<String, _>("completion_key")?),
        cancel_reason: row.try_get("cancel_reason")?,
        created_at_ms: row.try_get::<i64, _>("created_at")? as u64,
        updated_at_ms: row.try_get::<i64, _>("updated_at")? as u64,
    })
}

fn lock_from_row(row: &PgRow) -> Result<FileLock, StoreError> {
    Ok(FileLock {
        project_id: ProjectId::from_string(row.try_get::<String, _>("project_id")?),
        file_path: row.try_get("file_path")?,
        agent_id: row.try_get("agent_id")?,
        intent: row.try_get("intent")?,
        user_prompt: row.try_get("user_prompt")?,
        created_at_ms: row.try_get::<i64, _>("created_at")? as u64,
        updated_at_ms: row.try_get::<i64, _>("updated_at")? as u64,
    })
}

fn deps_json(job: &Job) -> sqlx::types::Json<Vec<String>> {
    sqlx::types::Json(job.dependencies.iter().map(|d| d.as_str().to_string()).collect())
}

fn vector_literal(vector: &[f32]) -> String {
    let parts: Vec<String> = vector.iter().map(|v| v.to_string()).collect();
    format!("[{}]", parts.join(","))
}

#[async_trait]
impl Store for PgStore {
    async fn resolve_project(&self, name: &str, owner_id: &str) -> Result<ProjectId, StoreError> {
        // The no-op DO UPDATE makes RETURNING yield the existing id on conflict.
        let row = sqlx::query(
            "INSERT INTO projects (id, name, owner_id, live_notepad)
             VALUES ($1, $2, $3, '')
             ON CONFLICT (name, owner_id) DO UPDATE SET name = EXCLUDED.name
             RETURNING id",
        )
        .bind(ProjectId::generate().as_str())
        .bind(name)
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(ProjectId::from_string(row.try_get::<String, _>("id")?))
    }

    async fn insert_job(&self, job: &Job) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO jobs (id, project_id, title, description, priority, status,
                               assigned_to, dependencies, completion_key, cancel_reason,
                               created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(job.id.as_str())
        .bind(job.project_id.as_str())
        .bind(&job.title)
        .bind(&job.description)
        .bind(job.priority.to_string())
        .bind(job.status.to_string())
        .bind(&job.assigned_to)
        .bind(deps_json(job))
        .bind(job.completion_key.as_str())
        .bind(&job.cancel_reason)
        .bind(job.created_at_ms as i64)
        .bind(job.updated_at_ms as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_job(&self, project: &ProjectId, job: &JobId) -> Result<Option<Job>, StoreError> {
        let row = sqlx::query("SELECT * FROM jobs WHERE id = $1 AND project_id = $2")
            .bind(job.as_str())
            .bind(project.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(job_from_row).transpose()
    }

    async fn select_project_jobs(&self, project: &ProjectId) -> Result<Vec<Job>, StoreError> {
        let rows = sqlx::query("SELECT * FROM jobs WHERE project_id = $1")
            .bind(project.as_str())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(job_from_row).collect()
    }

    async fn conditional_claim_job(
        &self,
        project: &ProjectId,
        job: &JobId,
        agent_id: &str,
        now_ms: u64,
    ) -> Result<ClaimResult, StoreError> {
        let row = sqlx::query(
            "UPDATE jobs
             SET status = 'in_progress', assigned_to = $3, updated_at = $4
             WHERE id = $1 AND project_id = $2 AND status = 'todo'
             RETURNING *",
        )
        .bind(job.as_str())
        .bind(project.as_str())
        .bind(agent_id)
        .bind(now_ms as i64)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(ClaimResult::Claimed(job_from_row(&row)?)),
            None => Ok(ClaimResult::AlreadyTaken),
        }
    }

    async fn update_job(
        &self,
        project: &ProjectId,
        job: &JobId,
        updates: &[JobUpdate],
        now_ms: u64,
    ) -> Result<Job, StoreError> {
        let mut tx = self.pool.begin().await?;

        for update in updates {
            match update {
                JobUpdate::SetStatus(status) => {
                    // Assignee set iff status is in_progress or done,
                    // matching Job::apply in the local store.
                    sqlx::query(
                        "UPDATE jobs
                         SET status = $3,
                             assigned_to = CASE WHEN $3 IN ('in_progress', 'done')
                                                THEN assigned_to ELSE NULL END,
                             updated_at = $4
                         WHERE id = $1 AND project_id = $2",
                    )
                    .bind(job.as_str())
                    .bind(project.as_str())
                    .bind(status.to_string())
                    .bind(now_ms as i64)
                    .execute(&mut *tx)
                    .await?;
                }
                JobUpdate::SetPriority(priority) => {
                    sqlx::query(
                        "UPDATE jobs SET priority = $3, updated_at = $4
                         WHERE id = $1 AND project_id = $2",
                    )
                    .bind(job.as_str())
                    .bind(project.as_str())
                    .bind(priority.to_string())
                    .bind(now_ms as i64)
                    .execute(&mut *tx)
                    .await?;
                }
                JobUpdate::SetAssignee(assignee) => {
                    sqlx::query(
                        "UPDATE jobs SET assigned_to = $3, updated_at = $4
                         WHERE id = $1 AND project_id = $2",
                    )
                    .bind(job.as_str())
                    .bind(project.as_str())
                    .bind(assignee)
                    .bind(now_ms as i64)
                    .execute(&mut *tx)
                    .await?;
                }
                JobUpdate::SetCancelReason(reason) => {
                    sqlx::query(
                        "UPDATE jobs SET cancel_reason = $3, updated_at = $4
                         WHERE id = $1 AND project_id = $2",
                    )
                    .bind(job.as_str())
                    .bind(project.as_str())
                    .bind(reason)
                    .bind(now_ms as i64)
                    .execute(&mut *tx)
                    .await?;
                }
            }
        }

        let row = sqlx::query("SELECT * FROM jobs WHERE id = $1 AND project_id = $2")
            .bind(job.as_str())
            .bind(project.as_str())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("job {job}")))?;
        let updated = job_from_row(&row)?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn try_acquire_lock(
        &self,
        lock: &FileLock,
        ttl: Duration,
    ) -> Result<LockAttempt, StoreError> {
        let ttl_ms = ttl.as_millis() as i64;

        // Single-statement compare-and-set: the DO UPDATE only fires for
        // the same owner (refresh) or a stale incumbent (takeover).
        // A read-then-write pair here would be incorrect.
        for _ in 0..3 {
            let acquired = sqlx::query(
                "INSERT INTO locks (project_id, file_path, agent_id, intent, user_prompt,
                                    created_at, updated_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $6)
                 ON CONFLICT (project_id, file_path) DO UPDATE SET
                     agent_id = EXCLUDED.agent_id,
                     intent = EXCLUDED.intent,
                     user_prompt = EXCLUDED.user_prompt,
                     updated_at = EXCLUDED.updated_at,
                     created_at = CASE WHEN locks.agent_id = EXCLUDED.agent_id
                                       THEN locks.created_at
                                       ELSE EXCLUDED.created_at END
                 WHERE locks.agent_id = EXCLUDED.agent_id
                    OR EXCLUDED.updated_at - locks.updated_at > $7
                 RETURNING agent_id",
            )
            .bind(lock.project_id.as_str())
            .bind(&lock.file_path)
            .bind(&lock.agent_id)
            .bind(&lock.intent)
            .bind(&lock.user_prompt)
            .bind(lock.updated_at_ms as i64)
            .bind(ttl_ms)
            .fetch_optional(&self.pool)
            .await?;

            if acquired.is_some() {
                return Ok(LockAttempt::Acquired);
            }

            let incumbent =
                sqlx::query("SELECT * FROM locks WHERE project_id = $1 AND file_path = $2")
                    .bind(lock.project_id.as_str())
                    .bind(&lock.file_path)
                    .fetch_optional(&self.pool)
                    .await?;

            match incumbent {
                Some(row) => return Ok(LockAttempt::Held(lock_from_row(&row)?)),
                // The incumbent vanished between statements; retry the insert.
                None => continue,
            }
        }
        Err(StoreError::Database("lock acquisition did not settle".to_string()))
    }

    async fn select_project_locks(
        &self,
        project: &ProjectId,
    ) -> Result<Vec<FileLock>, StoreError> {
        let rows = sqlx::query("SELECT * FROM locks WHERE project_id = $1")
            .bind(project.as_str())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(lock_from_row).collect()
    }

    async fn delete_lock(
        &self,
        project: &ProjectId,
        file_path: &str,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM locks WHERE project_id = $1 AND file_path = $2")
            .bind(project.as_str())
            .bind(file_path)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn reclaim_stale_locks(
        &self,
        project: &ProjectId,
        ttl: Duration,
        now_ms: u64,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "DELETE FROM locks WHERE project_id = $1 AND $2 - updated_at > $3",
        )
        .bind(project.as_str())
        .bind(now_ms as i64)
        .bind(ttl.as_millis() as i64)
        .execute(&self.pool)
        .await?;
        let reclaimed = result.rows_affected();
        if reclaimed > 0 {
            debug!(project = %project, reclaimed, "reclaimed stale locks");
        }
        Ok(reclaimed)
    }

    async fn read_notepad(&self, project: &ProjectId) -> Result<String, StoreError> {
        let row = sqlx::query("SELECT live_notepad FROM projects WHERE id = $1")
            .bind(project.as_str())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("project {project}")))?;
        Ok(row.try_get("live_notepad")?)
    }

    async fn append_notepad(&self, project: &ProjectId, text: &str) -> Result<(), StoreError> {
        let result =
            sqlx::query("UPDATE projects SET live_notepad = live_notepad || $2 WHERE id = $1")
                .bind(project.as_str())
                .bind(text)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("project {project}")));
        }
        Ok(())
    }

    async fn reset_notepad(&self, project: &ProjectId, marker: &str) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE projects SET live_notepad = $2 WHERE id = $1")
            .bind(project.as_str())
            .bind(marker)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("project {project}")));
        }
        Ok(())
    }

    async fn archive_session(
        &self,
        project: &ProjectId,
        title: &str,
        summary: &str,
        full: &str,
        now_ms: u64,
    ) -> Result<ArchiveReceipt, StoreError> {
        let id = ArchiveId::generate();
        sqlx::query(
            "INSERT INTO sessions (id, project_id, title, summary, content, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(id.as_str())
        .bind(project.as_str())
        .bind(title)
        .bind(summary)
        .bind(full)
        .bind(now_ms as i64)
        .execute(&self.pool)
        .await?;
        Ok(ArchiveReceipt { id, path: None })
    }

    async fn purge_terminal_jobs(&self, project: &ProjectId) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "DELETE FROM jobs WHERE project_id = $1 AND status IN ('done', 'cancelled')",
        )
        .bind(project.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn delete_project_locks(&self, project: &ProjectId) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM locks WHERE project_id = $1")
            .bind(project.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn insert_embedding(
        &self,
        project: &ProjectId,
        content: &str,
        vector: &[f32],
        metadata: &serde_json::Value,
        now_ms: u64,
    ) -> Result<String, StoreError> {
        let id = format!("emb-{}", nanoid::nanoid!(12));
        sqlx::query(
            "INSERT INTO embeddings (id, project_id, content, embedding, metadata, created_at)
             VALUES ($1, $2, $3, $4::vector, $5, $6)",
        )
        .bind(&id)
        .bind(project.as_str())
        .bind(content)
        .bind(vector_literal(vector))
        .bind(sqlx::types::Json(metadata.clone()))
        .bind(now_ms as i64)
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    async fn match_embeddings(
        &self,
        project: &ProjectId,
        vector: &[f32],
        threshold: f32,
        count: usize,
    ) -> Result<Vec<EmbeddingMatch>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, content, metadata,
                    1 - (embedding <=> $2::vector) AS similarity
             FROM embeddings
             WHERE project_id = $1 AND 1 - (embedding <=> $2::vector) >= $3
             ORDER BY embedding <=> $2::vector
             LIMIT $4",
        )
        .bind(project.as_str())
        .bind(vector_literal(vector))
        .bind(threshold as f64)
        .bind(count as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let metadata: sqlx::types::Json<serde_json::Value> = row.try_get("metadata")?;
                Ok(EmbeddingMatch {
                    id: row.try_get("id")?,
                    content: row.try_get("content")?,
                    metadata: metadata.0,
                    similarity: row.try_get::<f64, _>("similarity")? as f32,
                })
            })
            .collect()
    }
}
