// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tool parameter schemas.

use schemars::JsonSchema;
use serde::Deserialize;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct PostJobParams {
    /// Short imperative title for the job
    pub title: String,
    /// What needs to be done and any context the claimant needs
    #[serde(default)]
    pub description: String,
    /// One of: low, medium, high, critical (default medium)
    #[serde(default)]
    pub priority: Option<String>,
    /// Job ids that must be done before this job becomes claimable
    #[serde(default)]
    pub dependencies: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ClaimNextJobParams {
    /// Your agent id
    pub agent_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CompleteJobParams {
    /// Your agent id
    pub agent_id: String,
    /// Id of the job to complete
    pub job_id: String,
    /// Short description of the outcome, recorded in the notepad
    pub outcome: String,
    /// The job's completion key; required unless you are the assignee
    #[serde(default)]
    pub completion_key: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CancelJobParams {
    /// Id of the job to cancel
    pub job_id: String,
    /// Why the job is no longer needed
    pub reason: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ForceUnlockParams {
    /// Path whose lock should be removed
    pub file_path: String,
    /// Why you are overriding the lock (convention: only for stale locks)
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ProposeFileAccessParams {
    /// Your agent id
    pub agent_id: String,
    /// Path you want to work on
    pub file_path: String,
    /// What you intend to do (e.g. "edit", "refactor")
    pub intent: String,
    /// The user request that motivated this access
    #[serde(default)]
    pub user_prompt: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateSharedContextParams {
    /// Your agent id
    pub agent_id: String,
    /// Note to append to the shared notepad
    pub text: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateContextParams {
    /// Markdown replacing the activity instructions file
    pub content: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchCodebaseParams {
    /// Regex pattern to match against source lines
    pub pattern: String,
    /// Maximum matches to return (default 50)
    #[serde(default)]
    pub max_results: Option<usize>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchDocsParams {
    /// Natural-language query over indexed documents
    pub query: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct IndexFileParams {
    /// Project-relative path of the file to embed
    pub file_path: String,
}
