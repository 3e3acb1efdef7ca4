// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Facade-error to HTTP translation.

use axis_core::CoordError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

/// An error ready to leave the HTTP surface.
///
/// In non-production the body carries the short message; in production
/// only the stable category string (no stack traces, no paths).
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub category: &'static str,
    pub message: String,
    pub expose_message: bool,
}

impl ApiError {
    pub fn from_coord(err: CoordError, expose_message: bool) -> Self {
        let status = match &err {
            CoordError::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
            CoordError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            CoordError::NotFound(_) => StatusCode::NOT_FOUND,
            CoordError::Conflict(_) => StatusCode::CONFLICT,
            CoordError::BadRequest(_) => StatusCode::BAD_REQUEST,
            CoordError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            CoordError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self { status, category: err.category(), message: err.to_string(), expose_message }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error = if self.expose_message { self.message } else { self.category.to_string() };
        (self.status, Json(serde_json::json!({ "error": error }))).into_response()
    }
}
