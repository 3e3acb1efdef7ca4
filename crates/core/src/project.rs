// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project identity. Jobs, locks, notepads, and archives are all
//! project-scoped; destroying a project destroys them with it.

use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Stable identifier for a project, created on first reference.
    pub struct ProjectId("prj-");
}

/// A coordination scope. `(name, owner_id)` is unique and immutable
/// after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub owner_id: String,
}
