//! Semantic search over a personal memory archive.
//!
//! Each memory is a folder of derived artifacts (image captions, an audio
//! transcript, tagged faces, a generated story). keepsake turns those
//! artifacts into one descriptive document, embeds it, stores it in a
//! persistent vector index, and answers natural-language queries such as
//! "the birthday at the lake", optionally restricted to memories tagged with a
//! given person.
//!
//! # Architecture
//!
//! - **Documents**: deterministic synthesis from `captions.json`,
//!   `transcript.txt`, `faces.json`, and `story.txt`
//! - **Embeddings**: Gemini `text-embedding-004` when a key is available,
//!   otherwise local ONNX Runtime with all-MiniLM-L6-v2; chosen per call
//! - **Storage**: SQLite with [sqlite-vec](https://github.com/asg017/sqlite-vec)
//!   providing exact cosine distance
//! - **Transport**: CLI, or MCP over stdio
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from TOML files and environment variables
//! - [`db`]: SQLite database initialization, schema, and health checks
//! - [`embedding`]: Embedding providers and per-call backend selection
//! - [`memory`]: Artifacts, document synthesis, vector index, and the search service
//! - [`error`]: Error taxonomy shared by the core

pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod memory;

pub use error::{Error, Result};
