// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! axis: CLI entry point for the coordination service.

mod env;

use anyhow::{anyhow, Result};
use axis_engine::{EmbeddingsClient, NerveCenter, NerveCenterConfig};
use axis_mcp::{AxisMcpServer, Backend, Embedded, RemoteClient};
use axis_server::{AppState, AuthConfig};
use axis_store::{LocalStore, PgStore, Store};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "axis", version, about = "Coordination service for teams of coding agents")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1:8787")]
        addr: SocketAddr,
    },
    /// Run the MCP tool surface on stdin/stdout
    Mcp,
    /// Print the rendered live coordination context
    Context,
    /// Finalize the current session (archive, clear locks, purge terminal jobs)
    Finalize,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // In MCP mode stdout belongs to the protocol; log to stderr there.
    // (Server mode logs to stderr too, which keeps the two consistent.)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Serve { addr } => {
            let nerve = build_nerve().await?;
            let auth = AuthConfig::new(
                env::session_secret(),
                env::shared_context_api_secret(),
                env::plan(),
            );
            let state =
                AppState::new(nerve, auth, env::project_name(), env::is_production());
            axis_server::serve(addr, state).await?;
            Ok(())
        }

        Command::Mcp => {
            let root = std::env::current_dir()?;
            let instructions = env::instructions_dir();
            let backend = match (env::shared_context_api_url(), env::shared_context_api_secret())
            {
                (Some(url), Some(secret)) => {
                    info!(url, "tool surface in remote mode");
                    Backend::remote(RemoteClient::new(url, secret)?, root, instructions)
                }
                _ => {
                    let nerve = build_nerve().await?;
                    let project =
                        nerve.resolve_project(&env::project_name(), "local").await?;
                    Backend::embedded(Embedded { nerve, project }, root, instructions)
                }
            };
            axis_mcp::serve_stdio(AxisMcpServer::new(backend)).await.map_err(|e| anyhow!(e))
        }

        Command::Context => {
            let nerve = build_nerve().await?;
            let project = nerve.resolve_project(&env::project_name(), "local").await?;
            let context = nerve.get_core_context(&project).await?;
            println!("{context}");
            Ok(())
        }

        Command::Finalize => {
            let nerve = build_nerve().await?;
            let project = nerve.resolve_project(&env::project_name(), "local").await?;
            let receipt = nerve.finalize_session(&project).await?;
            match receipt.path {
                Some(path) => println!("session finalized: {}", path.display()),
                None => println!("session finalized: {}", receipt.id),
            }
            Ok(())
        }
    }
}

/// Build the facade over the store the environment selects: Postgres
/// when `DATABASE_URL` is set, otherwise the local JSON file. Picked
/// once here; nothing downstream branches on mode.
async fn build_nerve() -> Result<Arc<NerveCenter>> {
    let store: Arc<dyn Store> = match env::database_url() {
        Some(url) => {
            info!("using shared store (postgres)");
            Arc::new(PgStore::connect(&url).await?)
        }
        None => {
            let path = env::state_file();
            info!(path = %path.display(), "using local store");
            Arc::new(LocalStore::open(path)?)
        }
    };

    let config = NerveCenterConfig {
        lock_ttl: env::lock_ttl(),
        instructions_dir: env::instructions_dir(),
        ..NerveCenterConfig::default()
    };

    let mut nerve = NerveCenter::new(store, config);
    if let Some(key) = env::openai_api_key() {
        nerve = nerve.with_embedder(EmbeddingsClient::new(key)?);
    }
    Ok(Arc::new(nerve))
}
