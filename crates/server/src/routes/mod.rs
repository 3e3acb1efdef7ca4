// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Route handlers, one module per resource.

pub mod jobs;
pub mod locks;
pub mod search;
pub mod sessions;
pub mod verify;

use serde::Deserialize;

/// Common `?projectName=` query parameter.
#[derive(Debug, Deserialize)]
pub struct ProjectQuery {
    #[serde(rename = "projectName")]
    pub project_name: Option<String>,
}
