mod cli;
mod server;
mod tools;

use anyhow::Result;
use clap::{Parser, Subcommand};
use keepsake::config;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "keepsake", version, about = "Semantic search over a personal memory archive")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the MCP server (stdio transport)
    Serve,
    /// Index one memory folder
    Index {
        /// Memory id (folder name under the media root)
        memory_id: String,
    },
    /// Force a fresh embedding for one memory
    Reembed {
        memory_id: String,
    },
    /// Index every memory folder, skipping failures
    Reindex,
    /// Search memories by natural language
    Search {
        query: String,
        /// Number of results
        #[arg(short, long)]
        k: Option<usize>,
        /// Only memories tagged with this person
        #[arg(short, long)]
        person: Option<String>,
    },
    /// List index entries, or show one in full
    Inspect {
        memory_id: Option<String>,
    },
    /// Remove a memory from the index
    Forget {
        memory_id: String,
    },
    /// Check index health and provider configuration
    Doctor,
    /// Manage the local embedding model
    Model {
        #[command(subcommand)]
        action: ModelAction,
    },
}

#[derive(Subcommand)]
enum ModelAction {
    /// Download the embedding model to ~/.keepsake/models/
    Download,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::KeepsakeConfig::load()?;

    // Log to stderr so stdout stays clean for MCP JSON-RPC.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve => server::serve_stdio(config).await?,
        Command::Index { memory_id } => cli::index::index(&config, &memory_id, false).await?,
        Command::Reembed { memory_id } => cli::index::index(&config, &memory_id, true).await?,
        Command::Reindex => cli::index::reindex(&config).await?,
        Command::Search { query, k, person } => {
            let k = k.unwrap_or(config.retrieval.default_k);
            cli::search::search(&config, &query, k, person.as_deref()).await?
        }
        Command::Inspect { memory_id } => cli::inspect::inspect(&config, memory_id.as_deref())?,
        Command::Forget { memory_id } => cli::forget::forget(&config, &memory_id)?,
        Command::Doctor => cli::doctor::doctor(&config)?,
        Command::Model { action } => match action {
            ModelAction::Download => cli::model_download(&config.embedding).await?,
        },
    }

    Ok(())
}
