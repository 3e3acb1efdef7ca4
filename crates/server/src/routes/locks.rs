// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `/v1/locks`: list, lock, unlock.

use super::ProjectQuery;
use crate::auth::Identity;
use crate::error::ApiError;
use crate::state::SharedState;
use axis_engine::AccessOutcome;
use axum::extract::{Query, State};
use axum::http::StatusCode;
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
    let locks = state.nerve.list_locks(&project).await.map_err(|e| state.fail(e))?;
    Ok(Json(json!({ "locks": locks })).into_response())
}

/// Body of `POST /v1/locks`, discriminated by `action`.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum LocksAction {
    Lock {
        #[serde(rename = "filePath")]
        file_path: String,
        #[serde(rename = "agentId")]
        agent_id: String,
        #[serde(default)]
        intent: String,
        #[serde(rename = "userPrompt", default)]
        user_prompt: String,
        #[serde(rename = "projectName")]
        project_name: Option<String>,
    },
    Unlock {
        #[serde(rename = "filePath")]
        file_path: String,
        #[serde(rename = "projectName")]
        project_name: Option<String>,
    },
}

pub async fn action(
    State(state): State<SharedState>,
    identity: Identity,
    Json(body): Json<LocksAction>,
) -> Result<Response, ApiError> {
    match body {
        LocksAction::Lock { file_path, agent_id, intent, user_prompt, project_name } => {
            let project = state.project(project_name.as_deref(), &identity.owner_id).await?;
            let outcome = state
                .nerve
                .propose_file_access(&project, &agent_id, &file_path, &intent, &user_prompt)
                .await
                .map_err(|e| state.fail(e))?;
            match outcome {
                AccessOutcome::Granted => Ok(Json(json!({ "status": "GRANTED" })).into_response()),
                AccessOutcome::RequiresOrchestration { current_lock } => Ok((
                    StatusCode::CONFLICT,
                    Json(json!({ "status": "DENIED", "current_lock": current_lock })),
                )
                    .into_response()),
            }
        }

        LocksAction::Unlock { file_path, project_name } => {
            let project = state.project(project_name.as_deref(), &identity.owner_id).await?;
            state
                .nerve
                .force_unlock(&project, &file_path, "released via api")
                .await
                .map_err(|e| state.fail(e))?;
            Ok(Json(json!({ "success": true })).into_response())
        }
    }
}
