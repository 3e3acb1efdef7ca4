// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Nerve Center: construction, the facade mutex, and the bounded
//! store-call helper shared by every operation.

use crate::embeddings::EmbeddingsClient;
use axis_core::{Clock, CoordError, ProjectId, SystemClock, DEFAULT_LOCK_TTL};
use axis_store::{Store, StoreError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Facade configuration. Defaults match the documented contracts:
/// 30-minute lock TTL, 15-second store timeout, `.axis/instructions`.
#[derive(Debug, Clone)]
pub struct NerveCenterConfig {
    pub lock_ttl: Duration,
    pub store_timeout: Duration,
    pub instructions_dir: PathBuf,
}

impl Default for NerveCenterConfig {
    fn default() -> Self {
        Self {
            lock_ttl: DEFAULT_LOCK_TTL,
            store_timeout: Duration::from_secs(15),
            instructions_dir: PathBuf::from(".axis/instructions"),
        }
    }
}

/// The Coordination Facade.
///
/// Every externally triggered operation takes the `gate` mutex for its
/// full read-compute-write span, so within one process agents observe a
/// total order. The only suspension points inside the gate are store
/// I/O. Cross-process correctness comes from the store's conditional
/// primitives, not from this mutex.
pub struct NerveCenter<C: Clock = SystemClock> {
    pub(crate) store: Arc<dyn Store>,
    pub(crate) clock: C,
    pub(crate) config: NerveCenterConfig,
    pub(crate) gate: tokio::sync::Mutex<()>,
    /// Local read mirror of each project's notepad. Writes always go
    /// through the store; in hosted mode the store is the source of truth.
    pub(crate) notepad_mirror: Mutex<HashMap<ProjectId, String>>,
    pub(crate) embedder: Option<EmbeddingsClient>,
}

impl NerveCenter<SystemClock> {
    pub fn new(store: Arc<dyn Store>, config: NerveCenterConfig) -> Self {
        Self::with_clock(store, config, SystemClock)
    }
}

impl<C: Clock> NerveCenter<C> {
    pub fn with_clock(store: Arc<dyn Store>, config: NerveCenterConfig, clock: C) -> Self {
        Self {
            store,
            clock,
            config,
            gate: tokio::sync::Mutex::new(()),
            notepad_mirror: Mutex::new(HashMap::new()),
            embedder: None,
        }
    }

    /// Attach an embeddings client (enables `embed_items`/`search_docs`).
    pub fn with_embedder(mut self, embedder: EmbeddingsClient) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Run a store future under the bounded timeout. Timeouts surface as
    /// store errors; the facade never panics on store failure.
    pub(crate) async fn store_call<T>(
        &self,
        fut: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, CoordError> {
        match tokio::time::timeout(self.config.store_timeout, fut).await {
            Ok(result) => result.map_err(CoordError::from),
            Err(_) => Err(CoordError::Store("store call timed out".to_string())),
        }
    }

    /// Append one record line to the project notepad and mirror it.
    ///
    /// A failed append after a successful mutation is logged, not
    /// surfaced: the operation itself already committed and the store
    /// notepad is only advisory ordering, never a rollback point.
    pub(crate) async fn note(&self, project: &ProjectId, line: &str) {
        let entry = format!("\n{line}");
        match self.store_call(self.store.append_notepad(project, &entry)).await {
            Ok(()) => {
                let mut mirror = self.notepad_mirror.lock();
                mirror.entry(project.clone()).or_default().push_str(&entry);
            }
            Err(e) => warn!(project = %project, "notepad append failed: {e}"),
        }
    }

    /// Last notepad text this process observed for `project`.
    pub fn cached_notepad(&self, project: &ProjectId) -> Option<String> {
        self.notepad_mirror.lock().get(project).cloned()
    }

    pub(crate) fn refresh_mirror(&self, project: &ProjectId, text: &str) {
        self.notepad_mirror.lock().insert(project.clone(), text.to_string());
    }

    /// Resolve a project by name and owner, creating it on first reference.
    pub async fn resolve_project(
        &self,
        name: &str,
        owner_id: &str,
    ) -> Result<ProjectId, CoordError> {
        if name.trim().is_empty() {
            return Err(CoordError::BadRequest("project name must not be empty".to_string()));
        }
        let _gate = self.gate.lock().await;
        self.store_call(self.store.resolve_project(name, owner_id)).await
    }

    pub fn lock_ttl(&self) -> Duration {
        self.config.lock_ttl
    }
}

#[cfg(test)]
#[path = "facade_tests.rs"]
mod tests;
