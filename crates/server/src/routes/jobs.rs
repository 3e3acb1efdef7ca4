// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `/v1/jobs`: list, post, claim, update.

use super::ProjectQuery;
use crate::auth::Identity;
use crate::error::ApiError;
use crate::state::SharedState;
use axis_core::{CoordError, JobId, JobPriority, JobStatus, JobUpdate, NewJob};
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

pub async fn list(
    State(state): State<SharedState>,
    identity: Identity,
    Query(query): Query<ProjectQuery>,
) -> Result<Response, ApiError> {
    let project = state.project(query.project_name.as_deref(), &identity.owner_id).await?;
    let jobs = state.nerve.list_jobs(&project).await.map_err(|e| state.fail(e))?;
    Ok(Json(json!({ "jobs": jobs })).into_response())
}

/// Body of `POST /v1/jobs`, discriminated by `action`.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum JobsAction {
    Post {
        title: String,
        #[serde(default)]
        description: String,
        #[serde(default)]
        priority: Option<String>,
        #[serde(default)]
        dependencies: Option<Vec<String>>,
        #[serde(rename = "projectName")]
        project_name: Option<String>,
    },
    Claim {
        #[serde(rename = "agentId")]
        agent_id: String,
        #[serde(rename = "projectName")]
        project_name: Option<String>,
    },
    Update {
        #[serde(rename = "jobId")]
        job_id: String,
        status: Option<String>,
        assigned_to: Option<String>,
        priority: Option<String>,
        cancel_reason: Option<String>,
        #[serde(rename = "projectName")]
        project_name: Option<String>,
    },
}

pub async fn action(
    State(state): State<SharedState>,
    identity: Identity,
    Json(body): Json<JobsAction>,
) -> Result<Response, ApiError> {
    match body {
        JobsAction::Post { title, description, priority, dependencies, project_name } => {
            let project = state.project(project_name.as_deref(), &identity.owner_id).await?;
            let priority = priority
                .as_deref()
                .map(|p| p.parse::<JobPriority>())
                .transpose()
                .map_err(|e| state.fail(CoordError::from(e)))?
                .unwrap_or_default();
            let dependencies =
                dependencies.unwrap_or_default().into_iter().map(JobId::from).collect();
            let job = state
                .nerve
                .post_job(&project, NewJob { title, description, priority, dependencies })
                .await
                .map_err(|e| state.fail(e))?;
            Ok(Json(job).into_response())
        }

        JobsAction::Claim { agent_id, project_name } => {
            let project = state.project(project_name.as_deref(), &identity.owner_id).await?;
            let outcome =
                state.nerve.claim_next_job(&project, &agent_id).await.map_err(|e| state.fail(e))?;
            Ok(Json(outcome).into_response())
        }

        JobsAction::Update { job_id, status, assigned_to, priority, cancel_reason, project_name } => {
            let project = state.project(project_name.as_deref(), &identity.owner_id).await?;

            // Assignee first so a status change sees it (assignee-iff-active).
            let mut updates = Vec::new();
            if let Some(assignee) = assigned_to {
                updates.push(JobUpdate::SetAssignee(Some(assignee)));
            }
            if let Some(raw) = status {
                let status: JobStatus =
                    raw.parse().map_err(|e| state.fail(CoordError::from(e)))?;
                updates.push(JobUpdate::SetStatus(status));
            }
            if let Some(raw) = priority {
                updates.push(JobUpdate::SetPriority(
                    raw.parse().map_err(|e| state.fail(CoordError::from(e)))?,
                ));
            }
            if let Some(reason) = cancel_reason {
                updates.push(JobUpdate::SetCancelReason(reason));
            }

            let job = state
                .nerve
                .update_job(&project, &JobId::from(job_id), updates)
                .await
                .map_err(|e| state.fail(e))?;
            Ok(Json(job).into_response())
        }
    }
}
