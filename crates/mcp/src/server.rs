// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The MCP server: tool vocabulary and the live-context resource.

use crate::backend::Backend;
use crate::params::*;
use axis_core::CoordError;
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::*;
use rmcp::service::{RequestContext, RoleServer};
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use std::sync::Arc;

const CONTEXT_RESOURCE_URI: &str = "mcp://context/current";

#[derive(Clone)]
pub struct AxisMcpServer {
    backend: Arc<Backend>,
    tool_router: ToolRouter<Self>,
}

fn frame(result: Result<String, CoordError>) -> Result<CallToolResult, ErrorData> {
    match result {
        Ok(text) => Ok(CallToolResult::success(vec![Content::text(text)])),
        Err(e) => Ok(CallToolResult::error(vec![Content::text(format!(
            "{}: {}",
            e.category(),
            e
        ))])),
    }
}

#[tool_router]
impl AxisMcpServer {
    pub fn new(backend: Backend) -> Self {
        Self { backend: Arc::new(backend), tool_router: Self::tool_router() }
    }

    #[tool(
        description = "Post a job to the shared board. Returns the job id and its completion key; hand the key off if another agent may need to close the job out for you."
    )]
    async fn post_job(
        &self,
        params: Parameters<PostJobParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let p = params.0;
        frame(
            self.backend
                .post_job(p.title, p.description, p.priority, p.dependencies.unwrap_or_default())
                .await,
        )
    }

    #[tool(
        description = "Atomically claim the best available job: highest priority first, oldest first within a priority. Jobs with unfinished dependencies are skipped. Returns NO_JOBS_AVAILABLE when the board has nothing for you."
    )]
    async fn claim_next_job(
        &self,
        params: Parameters<ClaimNextJobParams>,
    ) -> Result<CallToolResult, ErrorData> {
        frame(self.backend.claim_next_job(&params.0.agent_id).await)
    }

    #[tool(
        description = "Mark a job done. Allowed for the assignee, or for any agent holding the job's completion key. Note: completing a job does NOT release your file locks; unlock explicitly or finalize the session."
    )]
    async fn complete_job(
        &self,
        params: Parameters<CompleteJobParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let p = params.0;
        frame(
            self.backend
                .complete_job(&p.agent_id, &p.job_id, &p.outcome, p.completion_key.as_deref())
                .await,
        )
    }

    #[tool(description = "Cancel a job with a reason. Any agent on the project may cancel.")]
    async fn cancel_job(
        &self,
        params: Parameters<CancelJobParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let p = params.0;
        frame(self.backend.cancel_job(&p.job_id, &p.reason).await)
    }

    #[tool(
        description = "Ask for a file-path lock before editing. GRANTED means the path is yours (30-minute lease, refreshed on re-proposal). REQUIRES_ORCHESTRATION means another agent holds it: work on something else instead of waiting."
    )]
    async fn propose_file_access(
        &self,
        params: Parameters<ProposeFileAccessParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let p = params.0;
        frame(
            self.backend
                .propose_file_access(&p.agent_id, &p.file_path, &p.intent, &p.user_prompt)
                .await,
        )
    }

    #[tool(
        description = "Remove a lock unconditionally. Convention: only use this on locks whose holder is gone (stale or crashed)."
    )]
    async fn force_unlock(
        &self,
        params: Parameters<ForceUnlockParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let p = params.0;
        frame(self.backend.force_unlock(&p.file_path, p.reason.as_deref()).await)
    }

    #[tool(
        description = "Append a note to the shared live notepad so other agents see what you are doing."
    )]
    async fn update_shared_context(
        &self,
        params: Parameters<UpdateSharedContextParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let p = params.0;
        frame(self.backend.update_shared_context(&p.agent_id, &p.text).await)
    }

    #[tool(
        description = "Archive the current session: snapshot the notepad, clear every lock, purge done/cancelled jobs, reset the notepad. Todo and in-progress jobs survive."
    )]
    async fn finalize_session(&self) -> Result<CallToolResult, ErrorData> {
        frame(self.backend.finalize_session().await)
    }

    #[tool(
        description = "Read the project's standing instructions (context and conventions files)."
    )]
    async fn get_project_soul(&self) -> Result<CallToolResult, ErrorData> {
        frame(Ok(self.backend.get_project_soul()))
    }

    #[tool(
        description = "Read the rendered live context: open jobs, active locks, and the shared notepad."
    )]
    async fn read_context(&self) -> Result<CallToolResult, ErrorData> {
        frame(self.backend.read_context().await)
    }

    #[tool(description = "Replace the project's activity instructions file with new content.")]
    async fn update_context(
        &self,
        params: Parameters<UpdateContextParams>,
    ) -> Result<CallToolResult, ErrorData> {
        frame(self.backend.update_context(&params.0.content).await)
    }

    #[tool(
        description = "Scan project files for a regex pattern. Bounded and shallow; for quick orientation, not a full search engine."
    )]
    async fn search_codebase(
        &self,
        params: Parameters<SearchCodebaseParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let p = params.0;
        frame(self.backend.search_codebase(&p.pattern, p.max_results))
    }

    #[tool(description = "Semantic search over documents indexed with index_file.")]
    async fn search_docs(
        &self,
        params: Parameters<SearchDocsParams>,
    ) -> Result<CallToolResult, ErrorData> {
        frame(self.backend.search_docs(&params.0.query).await)
    }

    #[tool(description = "Embed a project file into the document index for semantic search.")]
    async fn index_file(
        &self,
        params: Parameters<IndexFileParams>,
    ) -> Result<CallToolResult, ErrorData> {
        frame(self.backend.index_file(&params.0.file_path).await)
    }

    #[tool(description = "Check the subscription/plan status of this deployment.")]
    async fn get_subscription_status(&self) -> Result<CallToolResult, ErrorData> {
        frame(self.backend.subscription_status().await)
    }

    #[tool(description = "Board and lock counters for the current project.")]
    async fn get_usage_stats(&self) -> Result<CallToolResult, ErrorData> {
        frame(self.backend.usage_stats().await)
    }
}

#[tool_handler]
impl ServerHandler for AxisMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            instructions: Some(
                "Coordination tools for agent teams: a shared job board with atomic \
                 claims, advisory file locks with a 30-minute TTL, and a live notepad. \
                 Propose file access before editing, keep the notepad current, and \
                 finalize the session when the team is done."
                    .to_string(),
            ),
            ..Default::default()
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, ErrorData> {
        Ok(ListResourcesResult {
            meta: None,
            resources: vec![RawResource::new(CONTEXT_RESOURCE_URI, "Live coordination context")
                .no_annotation()],
            next_cursor: None,
        })
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, ErrorData> {
        if request.uri != CONTEXT_RESOURCE_URI {
            return Err(ErrorData::resource_not_found(
                format!("unknown resource {}", request.uri),
                None,
            ));
        }
        let doc = self
            .backend
            .read_context()
            .await
            .map_err(|e| ErrorData::internal_error(e.to_string(), None))?;
        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(doc, CONTEXT_RESOURCE_URI)],
        })
    }
}
