// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `/v1/embed` and `/v1/search`: the thin RAG surface.

use crate::auth::Identity;
use crate::error::ApiError;
use crate::state::SharedState;
use axis_engine::EmbedItem;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
pub struct EmbedBody {
    pub items: Vec<EmbedItem>,
    #[serde(rename = "projectName")]
    pub project_name: Option<String>,
}

pub async fn embed(
    State(state): State<SharedState>,
    identity: Identity,
    Json(body): Json<EmbedBody>,
) -> Result<Response, ApiError> {
    let project = state.project(body.project_name.as_deref(), &identity.owner_id).await?;
    let ids =
        state.nerve.embed_items(&project, body.items).await.map_err(|e| state.fail(e))?;
    Ok(Json(json!({ "results": ids })).into_response())
}

#[derive(Debug, Deserialize)]
pub struct SearchBody {
    pub query: String,
    #[serde(rename = "projectName")]
    pub project_name: Option<String>,
}

pub async fn search(
    State(state): State<SharedState>,
    identity: Identity,
    Json(body): Json<SearchBody>,
) -> Result<Response, ApiError> {
    let project = state.project(body.project_name.as_deref(), &identity.owner_id).await?;
    let matches =
        state.nerve.search_docs(&project, &body.query).await.map_err(|e| state.fail(e))?;
    Ok(Json(json!({ "results": matches })).into_response())
}
