// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error kinds shared by the facade and its surfaces.

use thiserror::Error;

/// Failure of a coordination operation.
///
/// Every facade operation returns `Result<T, CoordError>`; the HTTP and
/// tool surfaces translate the kind into their own status vocabulary.
#[derive(Debug, Clone, Error)]
pub enum CoordError {
    /// Required credential or backend missing.
    #[error("not configured: {0}")]
    NotConfigured(String),

    /// Missing or invalid session/key, or a caller that fails the
    /// completion authorisation rule.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Lock held by another agent, lost claim race, or a mutation on a
    /// terminal job.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Malformed payload, unknown action, enum out of range, size over limit.
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("rate limited")]
    RateLimited,

    /// Backend I/O failure (includes bounded-timeout expiry).
    #[error("store error: {0}")]
    Store(String),
}

impl CoordError {
    /// Stable category string for production error bodies.
    pub fn category(&self) -> &'static str {
        match self {
            CoordError::NotConfigured(_) => "not_configured",
            CoordError::Unauthorized(_) => "unauthorized",
            CoordError::NotFound(_) => "not_found",
            CoordError::Conflict(_) => "conflict",
            CoordError::BadRequest(_) => "bad_request",
            CoordError::RateLimited => "rate_limited",
            CoordError::Store(_) => "store_error",
        }
    }
}

/// Failed parse of a closed enum (priority, status) from its wire form.
#[derive(Debug, Clone, Error)]
#[error("unknown {what}: {value}")]
pub struct ParseEnumError {
    pub what: &'static str,
    pub value: String,
}

impl ParseEnumError {
    pub fn new(what: &'static str, value: impl Into<String>) -> Self {
        Self { what, value: value.into() }
    }
}

impl From<ParseEnumError> for CoordError {
    fn from(e: ParseEnumError) -> Self {
        CoordError::BadRequest(e.to_string())
    }
}
