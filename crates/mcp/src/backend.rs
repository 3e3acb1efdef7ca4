// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tool dispatch. The mode is picked once at startup and never
//! branched on per concern: embedded calls the facade, remote forwards
//! to the HTTP API. Instruction files and the codebase scan are local
//! disk in both modes.

use crate::codebase;
use crate::remote::RemoteClient;
use axis_core::{CoordError, JobId, JobPriority, NewJob, ProjectId, SystemClock};
use axis_engine::{project_soul, record_activity, EmbedItem, NerveCenter};
use reqwest::Method;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;

/// Embedded mode: the facade and the project it is bound to.
pub struct Embedded {
    pub nerve: Arc<NerveCenter<SystemClock>>,
    pub project: ProjectId,
}

enum Mode {
    Embedded(Embedded),
    Remote(RemoteClient),
}

/// Backend for the tool surface, bound to one project.
pub struct Backend {
    mode: Mode,
    project_root: PathBuf,
    instructions_dir: PathBuf,
}

impl Backend {
    pub fn embedded(
        embedded: Embedded,
        project_root: PathBuf,
        instructions_dir: PathBuf,
    ) -> Self {
        Self { mode: Mode::Embedded(embedded), project_root, instructions_dir }
    }

    pub fn remote(client: RemoteClient, project_root: PathBuf, instructions_dir: PathBuf) -> Self {
        Self { mode: Mode::Remote(client), project_root, instructions_dir }
    }

    pub async fn post_job(
        &self,
        title: String,
        description: String,
        priority: Option<String>,
        dependencies: Vec<String>,
    ) -> Result<String, CoordError> {
        match &self.mode {
            Mode::Embedded(e) => {
                let priority = priority
                    .as_deref()
                    .map(|p| p.parse::<JobPriority>())
                    .transpose()?
                    .unwrap_or_default();
                let job = e
                    .nerve
                    .post_job(
                        &e.project,
                        NewJob {
                            title,
                            description,
                            priority,
                            dependencies: dependencies.into_iter().map(JobId::from).collect(),
                        },
                    )
                    .await?;
                Ok(json!({
                    "status": "POSTED",
                    "job_id": job.id,
                    "completion_key": job.completion_key.as_str(),
                })
                .to_string())
            }
            Mode::Remote(r) => {
                r.call_ok(
                    Method::POST,
                    "/v1/jobs",
                    Some(&json!({
                        "action": "post",
                        "title": title,
                        "description": description,
                        "priority": priority,
                        "dependencies": dependencies,
                    })),
                )
                .await
            }
        }
    }

    pub async fn claim_next_job(&self, agent_id: &str) -> Result<String, CoordError> {
        match &self.mode {
            Mode::Embedded(e) => {
                let outcome = e.nerve.claim_next_job(&e.project, agent_id).await?;
                serde_json::to_string(&outcome).map_err(|err| CoordError::Store(err.to_string()))
            }
            Mode::Remote(r) => {
                r.call_ok(
                    Method::POST,
                    "/v1/jobs",
                    Some(&json!({ "action": "claim", "agentId": agent_id })),
                )
                .await
            }
        }
    }

    pub async fn complete_job(
        &self,
        agent_id: &str,
        job_id: &str,
        outcome: &str,
        completion_key: Option<&str>,
    ) -> Result<String, CoordError> {
        match &self.mode {
            Mode::Embedded(e) => {
                let job = e
                    .nerve
                    .complete_job(
                        &e.project,
                        agent_id,
                        &JobId::from(job_id),
                        outcome,
                        completion_key,
                    )
                    .await?;
                Ok(json!({ "status": "COMPLETED", "job_id": job.id }).to_string())
            }
            // The REST surface has no dedicated complete action; closing
            // out happens through the allow-listed update.
            Mode::Remote(r) => {
                r.call_ok(
                    Method::POST,
                    "/v1/jobs",
                    Some(&json!({
                        "action": "update",
                        "jobId": job_id,
                        "status": "done",
                        "assigned_to": agent_id,
                    })),
                )
                .await
            }
        }
    }

    pub async fn cancel_job(&self, job_id: &str, reason: &str) -> Result<String, CoordError> {
        match &self.mode {
            Mode::Embedded(e) => {
                e.nerve.cancel_job(&e.project, &JobId::from(job_id), reason).await?;
                Ok(json!({ "status": "CANCELLED", "job_id": job_id }).to_string())
            }
            Mode::Remote(r) => {
                r.call_ok(
                    Method::POST,
                    "/v1/jobs",
                    Some(&json!({
                        "action": "update",
                        "jobId": job_id,
                        "status": "cancelled",
                        "cancel_reason": reason,
                    })),
                )
                .await
            }
        }
    }

    pub async fn propose_file_access(
        &self,
        agent_id: &str,
        file_path: &str,
        intent: &str,
        user_prompt: &str,
    ) -> Result<String, CoordError> {
        match &self.mode {
            Mode::Embedded(e) => {
                let outcome = e
                    .nerve
                    .propose_file_access(&e.project, agent_id, file_path, intent, user_prompt)
                    .await?;
                serde_json::to_string(&outcome).map_err(|err| CoordError::Store(err.to_string()))
            }
            Mode::Remote(r) => {
                // 409 here is a denial frame, not a failure.
                let (_, body) = r
                    .call(
                        Method::POST,
                        "/v1/locks",
                        Some(&json!({
                            "action": "lock",
                            "filePath": file_path,
                            "agentId": agent_id,
                            "intent": intent,
                            "userPrompt": user_prompt,
                        })),
                    )
                    .await?;
                Ok(body)
            }
        }
    }

    pub async fn force_unlock(
        &self,
        file_path: &str,
        reason: Option<&str>,
    ) -> Result<String, CoordError> {
        let reason = reason.unwrap_or("stuck lock recovery");
        match &self.mode {
            Mode::Embedded(e) => {
                e.nerve.force_unlock(&e.project, file_path, reason).await?;
                Ok(json!({ "status": "UNLOCKED", "file_path": file_path }).to_string())
            }
            Mode::Remote(r) => {
                r.call_ok(
                    Method::POST,
                    "/v1/locks",
                    Some(&json!({ "action": "unlock", "filePath": file_path })),
                )
                .await
            }
        }
    }

    pub async fn update_shared_context(
        &self,
        agent_id: &str,
        text: &str,
    ) -> Result<String, CoordError> {
        match &self.mode {
            Mode::Embedded(e) => {
                e.nerve.update_shared_context(&e.project, agent_id, text).await?;
                Ok(json!({ "status": "OK" }).to_string())
            }
            Mode::Remote(r) => {
                r.call_ok(
                    Method::POST,
                    "/v1/sessions/sync",
                    Some(&json!({
                        "title": "Shared context update",
                        "context": format!("- [{agent_id}] {text}"),
                    })),
                )
                .await
            }
        }
    }

    pub async fn finalize_session(&self) -> Result<String, CoordError> {
        match &self.mode {
            Mode::Embedded(e) => {
                let receipt = e.nerve.finalize_session(&e.project).await?;
                Ok(json!({
                    "status": "SESSION_FINALIZED",
                    "archive_id": receipt.id,
                    "archive_path": receipt.path,
                })
                .to_string())
            }
            Mode::Remote(r) => {
                r.call_ok(Method::POST, "/v1/sessions/finalize", Some(&json!({ "content": "" })))
                    .await
            }
        }
    }

    pub async fn read_context(&self) -> Result<String, CoordError> {
        match &self.mode {
            Mode::Embedded(e) => e.nerve.get_core_context(&e.project).await,
            Mode::Remote(r) => {
                let jobs = r.call_ok(Method::GET, "/v1/jobs", None).await?;
                let locks = r.call_ok(Method::GET, "/v1/locks", None).await?;
                Ok(format!(
                    "# Live Coordination Context\n\n## Job Board\n{jobs}\n\n## Active File Locks\n{locks}\n\n## Shared Notepad\n(held by the coordination server)\n"
                ))
            }
        }
    }

    pub fn get_project_soul(&self) -> String {
        project_soul(&self.instructions_dir)
    }

    pub async fn update_context(&self, content: &str) -> Result<String, CoordError> {
        record_activity(&self.instructions_dir, content)?;
        if let Mode::Embedded(e) = &self.mode {
            e.nerve.update_shared_context(&e.project, "context", "activity instructions updated")
                .await?;
        }
        Ok(json!({ "status": "OK" }).to_string())
    }

    pub async fn search_docs(&self, query: &str) -> Result<String, CoordError> {
        match &self.mode {
            Mode::Embedded(e) => {
                let matches = e.nerve.search_docs(&e.project, query).await?;
                serde_json::to_string(&json!({ "results": matches }))
                    .map_err(|err| CoordError::Store(err.to_string()))
            }
            Mode::Remote(r) => {
                r.call_ok(Method::POST, "/v1/search", Some(&json!({ "query": query }))).await
            }
        }
    }

    pub async fn index_file(&self, file_path: &str) -> Result<String, CoordError> {
        let full = self.project_root.join(file_path);
        let content = std::fs::read_to_string(&full)
            .map_err(|_| CoordError::NotFound(format!("file {file_path}")))?;
        let metadata = json!({ "path": file_path });

        match &self.mode {
            Mode::Embedded(e) => {
                let ids = e
                    .nerve
                    .embed_items(&e.project, vec![EmbedItem { content, metadata }])
                    .await?;
                Ok(json!({ "results": ids }).to_string())
            }
            Mode::Remote(r) => {
                r.call_ok(
                    Method::POST,
                    "/v1/embed",
                    Some(&json!({ "items": [{ "content": content, "metadata": metadata }] })),
                )
                .await
            }
        }
    }

    pub async fn subscription_status(&self) -> Result<String, CoordError> {
        match &self.mode {
            Mode::Embedded(_) => {
                Ok(json!({ "valid": true, "plan": "local", "validUntil": Value::Null })
                    .to_string())
            }
            Mode::Remote(r) => r.call_ok(Method::GET, "/v1/verify", None).await,
        }
    }

    pub async fn usage_stats(&self) -> Result<String, CoordError> {
        match &self.mode {
            Mode::Embedded(e) => {
                let stats = e.nerve.usage_stats(&e.project).await?;
                Ok(stats.to_string())
            }
            Mode::Remote(r) => {
                let jobs: Value = parse(&r.call_ok(Method::GET, "/v1/jobs", None).await?)?;
                let locks: Value = parse(&r.call_ok(Method::GET, "/v1/locks", None).await?)?;
                let count = |status: &str| {
                    jobs["jobs"]
                        .as_array()
                        .map(|a| a.iter().filter(|j| j["status"] == status).count())
                        .unwrap_or(0)
                };
                Ok(json!({
                    "jobs": {
                        "todo": count("todo"),
                        "in_progress": count("in_progress"),
                        "done": count("done"),
                        "cancelled": count("cancelled"),
                    },
                    "locks": locks["locks"].as_array().map(Vec::len).unwrap_or(0),
                })
                .to_string())
            }
        }
    }

    pub fn search_codebase(
        &self,
        pattern: &str,
        max_results: Option<usize>,
    ) -> Result<String, CoordError> {
        codebase::search(
            &self.project_root,
            pattern,
            max_results.unwrap_or(codebase::DEFAULT_MAX_RESULTS),
        )
        .map_err(CoordError::BadRequest)
    }
}

fn parse(text: &str) -> Result<Value, CoordError> {
    serde_json::from_str(text).map_err(|e| CoordError::Store(e.to_string()))
}

#[cfg(test)]
#[path = "backend_tests.rs"]
mod tests;
