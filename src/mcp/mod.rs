//! MCP server for Moss: exposes entry and link operations via the Model
//! Context Protocol.
//!
//! Tools: 7 entry + 6 link = 13 total.

pub mod params;

use params::*;
use crate::config::MossConfig;
use crate::error::{DomainError, DomainResult, ErrorKind};
use crate::model::ValidationError;
use crate::{MossApi, OpenStore, SqliteStore};
use chrono::{DateTime, Utc};
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt,
};
use serde::Serialize;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn ok_text(text: String) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

fn err_text(msg: String) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::error(vec![Content::text(msg)]))
}

/// Stable status code that prefixes every tool error
pub fn status_code(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::InvalidInput => "invalid_argument",
        ErrorKind::Unauthorized => "permission_denied",
        ErrorKind::NotFound => "not_found",
        ErrorKind::Internal => "internal",
    }
}

/// Pretty JSON on success, `<status>: <message>` on failure.
fn render<T: Serialize>(result: DomainResult<T>) -> Result<String, String> {
    match result {
        Ok(value) => serde_json::to_string_pretty(&value)
            .map_err(|e| format!("{}: failed to encode result: {}", status_code(ErrorKind::Internal), e)),
        Err(e) => Err(format!("{}: {}", status_code(e.kind()), e)),
    }
}

fn reply<T: Serialize>(result: DomainResult<T>) -> Result<CallToolResult, McpError> {
    match render(result) {
        Ok(text) => ok_text(text),
        Err(msg) => err_text(msg),
    }
}

fn parse_since(raw: &str) -> DomainResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| DomainError::InvalidInput(ValidationError::Timestamp(format!("'{raw}': {e}"))))
}

// ---------------------------------------------------------------------------
// MossMcpServer
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct MossMcpServer {
    api: MossApi,
    config: Arc<MossConfig>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl MossMcpServer {
    pub fn new(api: MossApi, config: MossConfig) -> Self {
        Self {
            api,
            config: Arc::new(config),
            tool_router: Self::tool_router(),
        }
    }

    // ── Entry tools ─────────────────────────────────────────────────────

    #[tool(description = "Create an entry (a note with a growth stage) owned by a user")]
    async fn create_entry(
        &self,
        Parameters(p): Parameters<CreateEntryParams>,
    ) -> Result<CallToolResult, McpError> {
        let ctx = self.config.call_context();
        reply(
            self.api
                .create_entry(&ctx, &p.owner, &p.title, &p.content, &p.growth_stage)
                .await,
        )
    }

    #[tool(description = "Get an entry; the requester must own it")]
    async fn get_entry(
        &self,
        Parameters(p): Parameters<EntryAccessParams>,
    ) -> Result<CallToolResult, McpError> {
        let ctx = self.config.call_context();
        reply(self.api.get_entry(&ctx, &p.id, &p.requester).await)
    }

    #[tool(description = "Get an entry together with the number of links leaving it")]
    async fn get_entry_with_links(
        &self,
        Parameters(p): Parameters<EntryAccessParams>,
    ) -> Result<CallToolResult, McpError> {
        let ctx = self.config.call_context();
        reply(self.api.get_entry_with_links(&ctx, &p.id, &p.requester).await)
    }

    #[tool(description = "Replace the title, content and growth stage of an entry")]
    async fn update_entry(
        &self,
        Parameters(p): Parameters<UpdateEntryParams>,
    ) -> Result<CallToolResult, McpError> {
        let ctx = self.config.call_context();
        reply(
            self.api
                .update_entry(&ctx, &p.id, &p.owner, &p.title, &p.content, &p.growth_stage)
                .await,
        )
    }

    #[tool(description = "Delete an entry and every link touching it")]
    async fn delete_entry(
        &self,
        Parameters(p): Parameters<EntryAccessParams>,
    ) -> Result<CallToolResult, McpError> {
        let ctx = self.config.call_context();
        match self.api.delete_entry(&ctx, &p.id, &p.requester).await {
            Ok(()) => ok_text(format!("deleted entry {}", p.id)),
            Err(e) => reply::<()>(Err(e)),
        }
    }

    #[tool(description = "List all entries of an owner, oldest first")]
    async fn list_entries(
        &self,
        Parameters(p): Parameters<ListEntriesParams>,
    ) -> Result<CallToolResult, McpError> {
        let ctx = self.config.call_context();
        reply(self.api.list_entries(&ctx, &p.owner).await)
    }

    #[tool(description = "List entries of an owner updated at or after a timestamp")]
    async fn list_entries_since(
        &self,
        Parameters(p): Parameters<ListEntriesSinceParams>,
    ) -> Result<CallToolResult, McpError> {
        let since = match parse_since(&p.since) {
            Ok(t) => t,
            Err(e) => return reply::<()>(Err(e)),
        };
        let ctx = self.config.call_context();
        reply(self.api.list_entries_since(&ctx, &p.owner, since).await)
    }

    // ── Link tools ──────────────────────────────────────────────────────

    #[tool(description = "Create a directed link between two entries of the same owner")]
    async fn create_link(
        &self,
        Parameters(p): Parameters<CreateLinkParams>,
    ) -> Result<CallToolResult, McpError> {
        let ctx = self.config.call_context();
        reply(
            self.api
                .create_link(&ctx, &p.source_id, &p.target_id, &p.owner)
                .await,
        )
    }

    #[tool(description = "Remove the link from source to target; the requester must own it")]
    async fn delete_link(
        &self,
        Parameters(p): Parameters<DeleteLinkParams>,
    ) -> Result<CallToolResult, McpError> {
        let ctx = self.config.call_context();
        match self
            .api
            .delete_link(&ctx, &p.source_id, &p.target_id, &p.requester)
            .await
        {
            Ok(()) => ok_text(format!("deleted link {} -> {}", p.source_id, p.target_id)),
            Err(e) => reply::<()>(Err(e)),
        }
    }

    #[tool(description = "List links leaving an entry")]
    async fn list_links_by_source(
        &self,
        Parameters(p): Parameters<EntryIdParams>,
    ) -> Result<CallToolResult, McpError> {
        let ctx = self.config.call_context();
        reply(self.api.list_links_by_source(&ctx, &p.entry_id).await)
    }

    #[tool(description = "List links arriving at an entry")]
    async fn list_links_by_target(
        &self,
        Parameters(p): Parameters<EntryIdParams>,
    ) -> Result<CallToolResult, McpError> {
        let ctx = self.config.call_context();
        reply(self.api.list_links_by_target(&ctx, &p.entry_id).await)
    }

    #[tool(description = "Count links leaving an entry")]
    async fn count_links_by_source(
        &self,
        Parameters(p): Parameters<EntryIdParams>,
    ) -> Result<CallToolResult, McpError> {
        let ctx = self.config.call_context();
        reply(self.api.count_links_by_source(&ctx, &p.entry_id).await)
    }

    #[tool(description = "Count links arriving at an entry")]
    async fn count_links_by_target(
        &self,
        Parameters(p): Parameters<EntryIdParams>,
    ) -> Result<CallToolResult, McpError> {
        let ctx = self.config.call_context();
        reply(self.api.count_links_by_target(&ctx, &p.entry_id).await)
    }
}

#[tool_handler]
impl ServerHandler for MossMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Moss MCP server: owned garden entries with growth stages and directed links between them"
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run_mcp_server(config: MossConfig) -> i32 {
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("failed to create tokio runtime: {}", e);
            return 1;
        }
    };

    rt.block_on(async {
        let store = match SqliteStore::open(&config.db_path) {
            Ok(s) => Arc::new(s),
            Err(e) => {
                tracing::error!("failed to open database at {}: {}", config.db_path.display(), e);
                return 1;
            }
        };

        tracing::info!(db = %config.db_path.display(), "moss mcp server starting on stdio");
        let server = MossMcpServer::new(MossApi::new(store), config);

        let service = match server.serve(rmcp::transport::stdio()).await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!("failed to start MCP server: {}", e);
                return 1;
            }
        };

        if let Err(e) = service.waiting().await {
            tracing::error!("MCP server error: {}", e);
            return 1;
        }

        0
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::{EntryId, LinkKey, StorageError, UserId};

    fn server() -> MossMcpServer {
        let api = MossApi::new(Arc::new(MemoryStore::new()));
        MossMcpServer::new(api, MossConfig::default())
    }

    #[test]
    fn every_kind_has_its_status_code() {
        assert_eq!(status_code(ErrorKind::InvalidInput), "invalid_argument");
        assert_eq!(status_code(ErrorKind::Unauthorized), "permission_denied");
        assert_eq!(status_code(ErrorKind::NotFound), "not_found");
        assert_eq!(status_code(ErrorKind::Internal), "internal");
    }

    #[test]
    fn errors_render_with_status_prefix() {
        let cases: Vec<(DomainError, &str)> = vec![
            (ValidationError::EmptyField("title").into(), "invalid_argument: "),
            (DomainError::unauthorized("entry e1", Some(&UserId::from("u2"))), "permission_denied: "),
            (StorageError::LinkNotFound(LinkKey::new("a", "b")).into(), "not_found: "),
            (StorageError::EntryNotFound(EntryId::from("e1")).into(), "not_found: "),
            (StorageError::Cancelled.into(), "internal: "),
        ];
        for (err, prefix) in cases {
            let text = render::<()>(Err(err)).unwrap_err();
            assert!(text.starts_with(prefix), "{text}");
        }
    }

    #[test]
    fn bad_since_is_invalid_argument() {
        let err = parse_since("yesterday").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(parse_since("2024-03-01T10:00:00Z").is_ok());
    }

    // === Scenario: tools reach the garden through the API ===
    #[tokio::test]
    async fn tools_report_success_and_failure() {
        let server = server();
        let created = server
            .create_entry(Parameters(CreateEntryParams {
                owner: "u1".into(),
                title: "A".into(),
                content: "x".into(),
                growth_stage: "seed".into(),
            }))
            .await
            .unwrap();
        assert_eq!(created.is_error, Some(false));

        let rejected = server
            .create_entry(Parameters(CreateEntryParams {
                owner: "u1".into(),
                title: "A".into(),
                content: "x".into(),
                growth_stage: "wilted".into(),
            }))
            .await
            .unwrap();
        assert_eq!(rejected.is_error, Some(true));

        let missing = server
            .get_entry(Parameters(EntryAccessParams {
                id: "nope".into(),
                requester: "u1".into(),
            }))
            .await
            .unwrap();
        assert_eq!(missing.is_error, Some(true));
    }
}
