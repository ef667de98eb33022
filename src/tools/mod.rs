pub mod params;

use params::{IndexMemoryParams, ListEntriesParams, ReindexMemoriesParams, SearchMemoriesParams};
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use std::sync::Arc;

use keepsake::config::KeepsakeConfig;
use keepsake::memory::service::MemoryService;

/// The keepsake MCP tool handler. Holds the shared [`MemoryService`] and config
/// and exposes the tools via the `#[tool_router]` macro.
#[derive(Clone)]
pub struct KeepsakeTools {
    tool_router: ToolRouter<Self>,
    service: Arc<MemoryService>,
    config: Arc<KeepsakeConfig>,
}

#[tool_router]
impl KeepsakeTools {
    pub fn new(service: Arc<MemoryService>, config: Arc<KeepsakeConfig>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            service,
            config,
        }
    }

    /// Index (or re-embed) one memory folder.
    #[tool(description = "Index one memory: build a document from its captions, transcript, tagged faces and story, embed it, and store it in the search index. Set force=true to re-embed an already indexed memory.")]
    async fn index_memory(
        &self,
        Parameters(params): Parameters<IndexMemoryParams>,
    ) -> Result<String, String> {
        let force = params.force.unwrap_or(false);
        tracing::info!(memory_id = %params.memory_id, force, "index_memory called");

        let service = Arc::clone(&self.service);
        let memory_id = params.memory_id;
        let outcome = tokio::task::spawn_blocking(move || {
            if force {
                service.reembed_memory(&memory_id)
            } else {
                service.index_memory(&memory_id)
            }
        })
        .await
        .map_err(|e| format!("index task failed: {e}"))?
        .map_err(|e| format!("index failed: {e}"))?;

        serde_json::to_string(&outcome).map_err(|e| format!("serialization failed: {e}"))
    }

    /// Search memories using a natural language query.
    #[tool(description = "Search memories by natural language query. Returns up to k memory ids ranked by similarity (score = 1 - cosine distance), optionally restricted to memories tagged with a person.")]
    async fn search_memories(
        &self,
        Parameters(params): Parameters<SearchMemoriesParams>,
    ) -> Result<String, String> {
        let k = params.k.unwrap_or(self.config.retrieval.default_k);
        tracing::info!(query = %params.query, k, person = ?params.person, "search_memories called");

        let service = Arc::clone(&self.service);
        let query = params.query;
        let person = params.person;
        let hits = tokio::task::spawn_blocking(move || service.search(&query, k, person.as_deref()))
            .await
            .map_err(|e| format!("search task failed: {e}"))?
            .map_err(|e| format!("search failed: {e}"))?;

        Ok(serde_json::json!({
            "results": hits,
            "total": hits.len(),
        })
        .to_string())
    }

    /// Rebuild the index from every memory folder.
    #[tool(description = "Re-index every memory folder under the media root. Memories that fail are skipped and reported.")]
    async fn reindex_memories(
        &self,
        Parameters(_params): Parameters<ReindexMemoriesParams>,
    ) -> Result<String, String> {
        tracing::info!("reindex_memories called");

        let service = Arc::clone(&self.service);
        let report = tokio::task::spawn_blocking(move || service.reindex_all())
            .await
            .map_err(|e| format!("reindex task failed: {e}"))?
            .map_err(|e| format!("reindex failed: {e}"))?;

        serde_json::to_string(&report).map_err(|e| format!("serialization failed: {e}"))
    }

    #[tool(description = "List every indexed memory with its document, people, story flag and embedding provider.")]
    async fn list_entries(
        &self,
        Parameters(_params): Parameters<ListEntriesParams>,
    ) -> Result<String, String> {
        tracing::info!("list_entries called");

        let service = Arc::clone(&self.service);
        let entries = tokio::task::spawn_blocking(move || service.index().list())
            .await
            .map_err(|e| format!("list task failed: {e}"))?
            .map_err(|e| format!("list failed: {e}"))?;

        Ok(serde_json::json!({
            "entries": entries,
            "total": entries.len(),
        })
        .to_string())
    }
}

#[tool_handler]
impl ServerHandler for KeepsakeTools {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            instructions: Some(
                "keepsake searches a personal memory archive. Use search_memories to find \
                 memories by description, index_memory after a memory's artifacts change, \
                 and list_entries to see what is indexed."
                    .into(),
            ),
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}
