//! Indexing and search entry points.
//!
//! [`MemoryService`] owns the vector index and the embedding provider and is
//! built once at startup. Indexing reads a memory folder, synthesizes its
//! document, embeds it, and upserts it; search embeds a query and ranks index
//! entries by `1 - cosine distance`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::config::KeepsakeConfig;
use crate::embedding::{self, EmbeddingProvider};
use crate::error::{Error, Result};
use crate::memory::artifacts::{self, MemoryArtifacts};
use crate::memory::document::synthesize;
use crate::memory::index::MemoryIndex;
use crate::memory::types::{MemoryDocument, SearchHit};

/// What a successful index call wrote.
#[derive(Debug, Clone, Serialize)]
pub struct IndexOutcome {
    pub memory_id: String,
    pub provider: String,
    pub dimensions: usize,
    pub people: Vec<String>,
    pub has_story: bool,
    pub document: String,
}

/// Result of indexing as a side effect of a larger pipeline. The caller
/// inspects it; a failure never aborts the pipeline.
#[derive(Debug)]
pub enum IndexAttempt {
    Indexed(IndexOutcome),
    Failed { memory_id: String, reason: String },
}

impl IndexAttempt {
    pub fn is_indexed(&self) -> bool {
        matches!(self, Self::Indexed(_))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedMemory {
    pub memory_id: String,
    pub reason: String,
}

/// Summary of a bulk reindex.
#[derive(Debug, Default, Serialize)]
pub struct ReindexReport {
    pub indexed: Vec<String>,
    pub skipped: Vec<SkippedMemory>,
}

pub struct MemoryService {
    index: MemoryIndex,
    embedder: Arc<dyn EmbeddingProvider>,
    media_root: PathBuf,
}

impl MemoryService {
    pub fn new(
        index: MemoryIndex,
        embedder: Arc<dyn EmbeddingProvider>,
        media_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            index,
            embedder,
            media_root: media_root.into(),
        }
    }

    /// Open the configured index and build the configured provider.
    pub fn from_config(config: &KeepsakeConfig) -> anyhow::Result<Self> {
        let db_path = config.resolved_db_path();
        let index = MemoryIndex::open(&db_path)?;

        let embedder: Arc<dyn EmbeddingProvider> =
            Arc::from(embedding::create_provider(&config.embedding)?);

        if let Ok(Some(recorded)) = index.provider() {
            let active = embedder.model_id();
            if recorded != active {
                tracing::warn!(
                    recorded = %recorded,
                    active = %active,
                    "embedding provider differs from the one that built the index; run `keepsake reindex`"
                );
            }
        }

        Ok(Self::new(index, embedder, config.resolved_media_root()))
    }

    pub fn index(&self) -> &MemoryIndex {
        &self.index
    }

    pub fn media_root(&self) -> &Path {
        &self.media_root
    }

    /// Folder for `memory_id`, which must exist.
    pub fn memory_folder(&self, memory_id: &str) -> Result<PathBuf> {
        if memory_id.is_empty()
            || memory_id == "."
            || memory_id == ".."
            || memory_id.contains(['/', '\\'])
        {
            return Err(Error::InvalidInput(format!("invalid memory id: {memory_id:?}")));
        }
        let folder = self.media_root.join(memory_id);
        if !folder.is_dir() {
            return Err(Error::NotFound(memory_id.to_string()));
        }
        Ok(folder)
    }

    /// Build the document for a memory without touching the index.
    pub fn synthesize_memory(&self, memory_id: &str) -> Result<MemoryDocument> {
        let folder = self.memory_folder(memory_id)?;
        Ok(synthesize(&MemoryArtifacts::load(&folder)))
    }

    /// Synthesize, embed, and upsert one memory.
    pub fn index_memory(&self, memory_id: &str) -> Result<IndexOutcome> {
        let document = self.synthesize_memory(memory_id)?;

        let (provider, embedding) = self.embedder.embed_tagged(&document.text)?;

        self.index.upsert(
            memory_id,
            &embedding,
            &document.text,
            &document.metadata(),
            &provider,
        )?;

        tracing::info!(
            memory_id = %memory_id,
            provider = %provider,
            dims = embedding.len(),
            people = document.people.len(),
            has_story = document.has_story,
            "memory indexed"
        );

        Ok(IndexOutcome {
            memory_id: memory_id.to_string(),
            provider,
            dimensions: embedding.len(),
            people: document.people,
            has_story: document.has_story,
            document: document.text,
        })
    }

    /// Force a fresh embedding for one memory (backfill/repair). Idempotent.
    pub fn reembed_memory(&self, memory_id: &str) -> Result<IndexOutcome> {
        tracing::info!(memory_id = %memory_id, "forced re-embed");
        self.index_memory(memory_id)
    }

    /// Index as part of a larger processing pipeline: failures are logged and
    /// returned as [`IndexAttempt::Failed`], never propagated.
    pub fn index_best_effort(&self, memory_id: &str) -> IndexAttempt {
        match self.index_memory(memory_id) {
            Ok(outcome) => IndexAttempt::Indexed(outcome),
            Err(e) => {
                tracing::warn!(memory_id = %memory_id, error = %e, "indexing failed, continuing");
                IndexAttempt::Failed {
                    memory_id: memory_id.to_string(),
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Index every memory folder under the media root.
    pub fn reindex_all(&self) -> Result<ReindexReport> {
        self.reindex_all_with(|_, _| {})
    }

    /// Like [`reindex_all`](Self::reindex_all), reporting each attempt to
    /// `on_attempt` as it completes.
    pub fn reindex_all_with(
        &self,
        mut on_attempt: impl FnMut(&str, &IndexAttempt),
    ) -> Result<ReindexReport> {
        let ids = artifacts::list_memory_ids(&self.media_root).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound(format!("media root {}", self.media_root.display()))
            } else {
                Error::Io(e)
            }
        })?;

        let mut report = ReindexReport::default();
        for id in ids {
            let attempt = self.index_best_effort(&id);
            on_attempt(&id, &attempt);
            match attempt {
                IndexAttempt::Indexed(_) => report.indexed.push(id),
                IndexAttempt::Failed { memory_id, reason } => {
                    report.skipped.push(SkippedMemory { memory_id, reason })
                }
            }
        }

        tracing::info!(
            indexed = report.indexed.len(),
            skipped = report.skipped.len(),
            "reindex complete"
        );
        Ok(report)
    }

    /// Semantic search. A blank query returns no hits without calling the
    /// embedding provider.
    pub fn search(&self, query: &str, k: usize, person: Option<&str>) -> Result<Vec<SearchHit>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!(query = %query, k, person = ?person, "searching memories");

        let embedding = self.embedder.embed(query)?;
        let hits = self
            .index
            .query(&embedding, k, person)?
            .into_iter()
            .map(|(memory_id, distance)| SearchHit {
                thumbnail: artifacts::thumbnail(&self.media_root, &memory_id),
                score: 1.0 - distance,
                memory_id,
            })
            .collect();

        Ok(hits)
    }

    /// Remove a memory from the index. Returns whether it was indexed.
    pub fn forget(&self, memory_id: &str) -> Result<bool> {
        let removed = self.index.remove(memory_id)?;
        tracing::info!(memory_id = %memory_id, removed, "index entry removed");
        Ok(removed)
    }
}
