// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared application state passed to all handlers via the axum
//! `State` extractor.

use crate::auth::AuthConfig;
use crate::error::ApiError;
use axis_core::{CoordError, ProjectId, SystemClock};
use axis_engine::NerveCenter;
use std::sync::Arc;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub nerve: Arc<NerveCenter<SystemClock>>,
    pub auth: AuthConfig,
    /// Project used when a request names none (`PROJECT_NAME`).
    pub default_project: String,
    /// Production mode strips error messages down to category strings.
    pub production: bool,
}

impl AppState {
    pub fn new(
        nerve: Arc<NerveCenter<SystemClock>>,
        auth: AuthConfig,
        default_project: String,
        production: bool,
    ) -> SharedState {
        Arc::new(Self { nerve, auth, default_project, production })
    }

    /// Translate a facade error into an HTTP error body.
    pub fn fail(&self, err: CoordError) -> ApiError {
        ApiError::from_coord(err, !self.production)
    }

    /// Resolve the target project for a request.
    pub async fn project(
        &self,
        name: Option<&str>,
        owner_id: &str,
    ) -> Result<ProjectId, ApiError> {
        let name = name.filter(|n| !n.trim().is_empty()).unwrap_or(&self.default_project);
        self.nerve.resolve_project(name, owner_id).await.map_err(|e| self.fail(e))
    }
}
