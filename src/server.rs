//! MCP server over stdio.
//!
//! [`serve_stdio`] opens the index, builds the embedding provider, and hands a
//! shared [`MemoryService`] to the tool handler.

use crate::tools::KeepsakeTools;
use anyhow::Result;
use keepsake::config::KeepsakeConfig;
use keepsake::memory::service::MemoryService;
use rmcp::ServiceExt;
use std::sync::Arc;

/// Start the MCP server over stdio transport.
pub async fn serve_stdio(config: KeepsakeConfig) -> Result<()> {
    tracing::info!("starting keepsake MCP server on stdio");

    let service = Arc::new(MemoryService::from_config(&config)?);
    tracing::info!(
        db = %config.resolved_db_path().display(),
        media_root = %service.media_root().display(),
        "memory index ready"
    );

    let tools = KeepsakeTools::new(service, Arc::new(config));
    let transport = rmcp::transport::stdio();

    let server = tools.serve(transport).await?;
    tracing::info!("MCP server running, waiting for client");

    server.waiting().await?;
    tracing::info!("MCP server shut down");

    Ok(())
}
