// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bearer-token authentication.
//!
//! Two token shapes: an HS256 session JWT signed with
//! `APP_SESSION_SECRET`, or a raw API key prefixed `sk_sc_` compared by
//! SHA-256 digest against the configured key.

use crate::error::ApiError;
use crate::state::SharedState;
use axis_core::CoordError;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use sha2::{Digest, Sha256};

pub const API_KEY_PREFIX: &str = "sk_sc_";

#[derive(Debug, Clone)]
pub struct AuthConfig {
    session_secret: Option<String>,
    api_key_digest: Option<[u8; 32]>,
    plan: String,
}

impl AuthConfig {
    pub fn new(session_secret: Option<String>, api_key: Option<String>, plan: String) -> Self {
        let api_key_digest = api_key.filter(|k| !k.is_empty()).map(|k| digest(&k));
        Self {
            session_secret: session_secret.filter(|s| !s.is_empty()),
            api_key_digest,
            plan,
        }
    }

    pub fn plan(&self) -> &str {
        &self.plan
    }
}

fn digest(token: &str) -> [u8; 32] {
    Sha256::digest(token.as_bytes()).into()
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    #[allow(dead_code)]
    exp: usize,
}

/// The authenticated principal of a request.
#[derive(Debug, Clone)]
pub struct Identity {
    pub owner_id: String,
    pub plan: String,
}

impl AuthConfig {
    /// Validate a raw bearer token.
    pub fn authenticate(&self, token: &str) -> Result<Identity, CoordError> {
        if token.starts_with(API_KEY_PREFIX) {
            let Some(expected) = self.api_key_digest else {
                return Err(CoordError::NotConfigured(
                    "no API key configured on this deployment".to_string(),
                ));
            };
            if digest(token) != expected {
                return Err(CoordError::Unauthorized("unknown API key".to_string()));
            }
            return Ok(Identity { owner_id: "api-key".to_string(), plan: self.plan.clone() });
        }

        let Some(secret) = &self.session_secret else {
            return Err(CoordError::NotConfigured(
                "APP_SESSION_SECRET is not configured".to_string(),
            ));
        };
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|e| CoordError::Unauthorized(format!("invalid session token: {e}")))?;
        Ok(Identity { owner_id: data.claims.sub, plan: self.plan.clone() })
    }
}

impl FromRequestParts<SharedState> for Identity {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| {
                state.fail(CoordError::Unauthorized("missing bearer token".to_string()))
            })?;
        state.auth.authenticate(token).map_err(|e| state.fail(e))
    }
}
