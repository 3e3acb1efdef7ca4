// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OpenAI embeddings client and the facade's vector-search operations.
//!
//! Outbound calls use the same 15-second timeout as store calls, with
//! exponential retry (three attempts, 1s/2s/4s) on 5xx responses only.
//! 4xx responses are never retried.

use crate::NerveCenter;
use axis_core::{Clock, CoordError, ProjectId};
use axis_store::EmbeddingMatch;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

pub const EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const EMBEDDING_DIMS: usize = 1536;

const EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";
const BACKOFF_SECS: [u64; 3] = [1, 2, 4];
const DEFAULT_MATCH_THRESHOLD: f32 = 0.3;
const DEFAULT_MATCH_COUNT: usize = 10;

/// One item submitted for indexing.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct EmbedItem {
    pub content: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

/// Minimal client for the OpenAI embeddings endpoint.
pub struct EmbeddingsClient {
    http: reqwest::Client,
    api_key: String,
    url: String,
}

impl EmbeddingsClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, CoordError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| CoordError::Store(e.to_string()))?;
        Ok(Self { http, api_key: api_key.into(), url: EMBEDDINGS_URL.to_string() })
    }

    /// Point the client at a different endpoint (tests).
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Embed a batch of inputs, one vector per input.
    pub async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, CoordError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        let body = serde_json::json!({ "model": EMBEDDING_MODEL, "input": inputs });

        let mut last_err = CoordError::Store("embedding request not attempted".to_string());
        for (attempt, backoff) in BACKOFF_SECS.iter().enumerate() {
            let response = self
                .http
                .post(&self.url)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await;

            match response {
                Ok(resp) if resp.status().is_success() => {
                    let parsed: EmbeddingsResponse =
                        resp.json().await.map_err(|e| CoordError::Store(e.to_string()))?;
                    return Ok(parsed.data.into_iter().map(|d| d.embedding).collect());
                }
                Ok(resp) if resp.status().is_server_error() => {
                    warn!(status = %resp.status(), attempt, "embedding request failed, retrying");
                    last_err =
                        CoordError::Store(format!("embeddings endpoint returned {}", resp.status()));
                }
                Ok(resp) => {
                    // 4xx is terminal: never retried.
                    return Err(match resp.status().as_u16() {
                        401 | 403 => {
                            CoordError::Unauthorized("embeddings credential rejected".to_string())
                        }
                        429 => CoordError::RateLimited,
                        code => CoordError::BadRequest(format!(
                            "embeddings endpoint rejected request ({code})"
                        )),
                    });
                }
                Err(e) => return Err(CoordError::Store(e.to_string())),
            }
            // Sleep only between attempts, not after the last one.
            if attempt + 1 < BACKOFF_SECS.len() {
                tokio::time::sleep(Duration::from_secs(*backoff)).await;
            }
        }
        Err(last_err)
    }
}

impl<C: Clock> NerveCenter<C> {
    fn embedder(&self) -> Result<&EmbeddingsClient, CoordError> {
        self.embedder.as_ref().ok_or_else(|| {
            CoordError::NotConfigured("OPENAI_API_KEY is required for embeddings".to_string())
        })
    }

    /// Embed and persist a batch of items. Returns the stored ids.
    ///
    /// The embedding HTTP call runs outside the facade gate; only store
    /// writes happen inside it.
    pub async fn embed_items(
        &self,
        project: &ProjectId,
        items: Vec<EmbedItem>,
    ) -> Result<Vec<String>, CoordError> {
        if items.is_empty() {
            return Err(CoordError::BadRequest("no items to embed".to_string()));
        }
        let inputs: Vec<String> = items.iter().map(|i| i.content.clone()).collect();
        let vectors = self.embedder()?.embed(&inputs).await?;
        if vectors.len() != items.len() {
            return Err(CoordError::Store("embedding count mismatch".to_string()));
        }

        let _gate = self.gate.lock().await;
        let mut ids = Vec::with_capacity(items.len());
        for (item, vector) in items.iter().zip(&vectors) {
            let id = self
                .store_call(self.store.insert_embedding(
                    project,
                    &item.content,
                    vector,
                    &item.metadata,
                    self.clock.epoch_ms(),
                ))
                .await?;
            ids.push(id);
        }
        debug!(project = %project, count = ids.len(), "embedded items");
        Ok(ids)
    }

    /// Vector search over the project's indexed documents.
    pub async fn search_docs(
        &self,
        project: &ProjectId,
        query: &str,
    ) -> Result<Vec<EmbeddingMatch>, CoordError> {
        if query.trim().is_empty() {
            return Err(CoordError::BadRequest("query must not be empty".to_string()));
        }
        let vectors = self.embedder()?.embed(&[query.to_string()]).await?;
        let vector = vectors
            .into_iter()
            .next()
            .ok_or_else(|| CoordError::Store("embeddings endpoint returned no vector".to_string()))?;

        let _gate = self.gate.lock().await;
        self.store_call(self.store.match_embeddings(
            project,
            &vector,
            DEFAULT_MATCH_THRESHOLD,
            DEFAULT_MATCH_COUNT,
        ))
        .await
    }
}
