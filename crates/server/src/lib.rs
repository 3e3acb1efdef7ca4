// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! axis-server: the REST surface over the Coordination Facade.
//!
//! Every route authenticates a bearer token (session JWT or `sk_sc_`
//! API key), resolves the target project, and forwards to the facade.

mod auth;
mod error;
mod routes;
mod state;

pub use auth::{AuthConfig, Identity};
pub use error::ApiError;
pub use state::{AppState, SharedState};

use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Build the `/v1` router.
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/v1/jobs", get(routes::jobs::list).post(routes::jobs::action))
        .route("/v1/locks", get(routes::locks::list).post(routes::locks::action))
        .route("/v1/sessions/sync", post(routes::sessions::sync))
        .route("/v1/sessions/finalize", post(routes::sessions::finalize))
        .route("/v1/embed", post(routes::search::embed))
        .route("/v1/search", post(routes::search::search))
        .route("/v1/verify", get(routes::verify::verify))
        .with_state(state)
}

/// Bind and serve until the process exits.
pub async fn serve(addr: SocketAddr, state: SharedState) -> Result<(), ServerError> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "http api listening");
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
#[path = "routes_tests.rs"]
mod tests;
