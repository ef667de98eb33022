//! MCP tool parameter definitions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `index_memory` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct IndexMemoryParams {
    #[schemars(description = "Memory id (folder name under the media root)")]
    pub memory_id: String,

    #[schemars(description = "Force a fresh embedding even if the memory is already indexed (default: false)")]
    pub force: Option<bool>,
}

/// Parameters for the `search_memories` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SearchMemoriesParams {
    /// Natural language query. An empty query returns no results.
    #[schemars(description = "Natural language description of the memory, e.g. 'birthday at the lake'")]
    pub query: String,

    /// Maximum number of results. Defaults to the configured `default_k`.
    #[schemars(description = "Maximum number of results to return. Defaults to 5.")]
    pub k: Option<usize>,

    #[schemars(description = "Only return memories tagged with this person (exact name)")]
    pub person: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct ReindexMemoriesParams {}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct ListEntriesParams {}
