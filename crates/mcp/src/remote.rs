// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP client for hosted mode: the tool surface forwards to the REST
//! API instead of owning a store.
//!
//! Calls use a 15-second timeout and exponential retry on 5xx only
//! (three attempts, 1s/2s/4s). 4xx responses are never retried.

use axis_core::CoordError;
use reqwest::Method;
use serde_json::Value;
use std::time::Duration;
use tracing::warn;

const BACKOFF_SECS: [u64; 3] = [1, 2, 4];

pub struct RemoteClient {
    http: reqwest::Client,
    base_url: String,
    secret: String,
}

impl RemoteClient {
    pub fn new(base_url: impl Into<String>, secret: impl Into<String>) -> Result<Self, CoordError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| CoordError::Store(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            secret: secret.into(),
        })
    }

    /// Perform one API call, retrying 5xx. Returns the final status code
    /// and body text; 4xx classification is left to the caller because
    /// some conflicts (a denied lock) are legitimate tool results.
    pub async fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<(u16, String), CoordError> {
        let url = format!("{}{}", self.base_url, path);
        let mut last_status = 0;

        for (attempt, backoff) in BACKOFF_SECS.iter().enumerate() {
            let mut request =
                self.http.request(method.clone(), &url).bearer_auth(&self.secret);
            if let Some(body) = body {
                request = request.json(body);
            }
            let response =
                request.send().await.map_err(|e| CoordError::Store(e.to_string()))?;

            let status = response.status();
            if status.is_server_error() {
                warn!(%status, attempt, url, "remote call failed");
                last_status = status.as_u16();
                // Sleep only between attempts, not after the last one.
                if attempt + 1 < BACKOFF_SECS.len() {
                    tokio::time::sleep(Duration::from_secs(*backoff)).await;
                }
                continue;
            }
            let text = response.text().await.map_err(|e| CoordError::Store(e.to_string()))?;
            return Ok((status.as_u16(), text));
        }
        Err(CoordError::Store(format!("remote endpoint kept failing ({last_status})")))
    }

    /// Like [`call`](Self::call) but any non-2xx becomes an error kind.
    pub async fn call_ok(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<String, CoordError> {
        let (status, text) = self.call(method, path, body).await?;
        match status {
            200..=299 => Ok(text),
            401 | 403 => Err(CoordError::Unauthorized(text)),
            404 => Err(CoordError::NotFound(text)),
            409 => Err(CoordError::Conflict(text)),
            429 => Err(CoordError::RateLimited),
            _ => Err(CoordError::BadRequest(text)),
        }
    }
}
