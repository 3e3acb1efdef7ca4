// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `/v1/sessions`: sync (archive-only snapshot) and finalize.

use crate::auth::Identity;
use crate::error::ApiError;
use crate::state::SharedState;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
pub struct SyncBody {
    pub title: String,
    pub context: String,
    #[serde(default)]
    #[allow(dead_code)]
    pub metadata: Option<serde_json::Value>,
    #[serde(rename = "projectName")]
    pub project_name: Option<String>,
}

pub async fn sync(
    State(state): State<SharedState>,
    identity: Identity,
    Json(body): Json<SyncBody>,
) -> Result<Response, ApiError> {
    let project = state.project(body.project_name.as_deref(), &identity.owner_id).await?;
    let receipt = state
        .nerve
        .sync_session(&project, &body.title, &body.context)
        .await
        .map_err(|e| state.fail(e))?;
    Ok(Json(json!({
        "success": true,
        "sessionId": receipt.id,
        "projectId": project,
    }))
    .into_response())
}

#[derive(Debug, Deserialize)]
pub struct FinalizeBody {
    #[serde(rename = "projectName")]
    pub project_name: Option<String>,
    #[serde(default)]
    pub content: String,
}

pub async fn finalize(
    State(state): State<SharedState>,
    identity: Identity,
    Json(body): Json<FinalizeBody>,
) -> Result<Response, ApiError> {
    let project = state.project(body.project_name.as_deref(), &identity.owner_id).await?;

    // A non-empty body lands the client's closing context in the notepad
    // so the archive written below captures it.
    if !body.content.trim().is_empty() {
        state
            .nerve
            .update_shared_context(&project, "client", &body.content)
            .await
            .map_err(|e| state.fail(e))?;
    }

    let receipt = state.nerve.finalize_session(&project).await.map_err(|e| state.fail(e))?;
    Ok(Json(json!({
        "success": true,
        "status": "SESSION_FINALIZED",
        "archiveId": receipt.id,
        "archivePath": receipt.path,
    }))
    .into_response())
}
