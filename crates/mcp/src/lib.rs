// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! axis-mcp: the tool surface.
//!
//! Speaks MCP over standard streams. Each tool returns a single text
//! content frame; structured outcomes are rendered as compact JSON.
//! The backend is chosen once at startup: embedded facade, or the
//! remote HTTP API when `SHARED_CONTEXT_API_URL` is configured.

mod backend;
mod codebase;
mod params;
mod remote;
mod server;

pub use backend::{Backend, Embedded};
pub use remote::RemoteClient;
pub use server::AxisMcpServer;

use rmcp::{transport::stdio, ServiceExt};

/// Serve the tool surface on stdin/stdout until the client disconnects.
///
/// Anything logged while serving must go to stderr; stdout belongs to
/// the protocol.
pub async fn serve_stdio(
    server: AxisMcpServer,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let service = server.serve(stdio()).await?;
    service.waiting().await?;
    Ok(())
}
