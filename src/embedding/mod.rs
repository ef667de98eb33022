//! Text-to-vector embedding pipeline.
//!
//! Provides the [`EmbeddingProvider`] trait and two interchangeable backends:
//! a local all-MiniLM-L6-v2 model (384 dimensions, L2-normalized, via ONNX
//! Runtime) and the Gemini embedding API. [`create_provider`] wraps them in an
//! [`EmbeddingRouter`] that picks a backend on every call.
//!
//! The two backends do not share a vector space. Vectors from one must never be
//! compared with vectors from the other; the index tags every entry with
//! [`EmbeddingProvider::model_id`] and rejects dimension changes.

pub mod gemini;
pub mod local;
pub mod router;

pub use gemini::GeminiEmbeddingProvider;
pub use local::{LazyLocalProvider, LocalEmbeddingProvider};
pub use router::{Backend, Credential, EmbeddingRouter};

use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};

/// Number of dimensions produced by the local model (all-MiniLM-L6-v2).
pub const EMBEDDING_DIM: usize = 384;

/// Trait for embedding text into vectors.
///
/// All methods are synchronous; callers in async contexts should use
/// `tokio::task::spawn_blocking`.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text string into a vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of text strings, preserving order. Implementations may
    /// override for batched inference.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Number of dimensions this provider produces.
    fn dimensions(&self) -> usize;

    /// Tag identifying the backend and model, e.g. `local:all-MiniLM-L6-v2`.
    fn model_id(&self) -> String;

    /// Embed `text` and return the tag of the backend that produced the vector.
    fn embed_tagged(&self, text: &str) -> Result<(String, Vec<f32>)> {
        let tag = self.model_id();
        Ok((tag, self.embed(text)?))
    }
}

/// Create the configured embedding provider.
///
/// `"gemini"` prefers the remote backend whenever a key is available and falls
/// back to the local model otherwise; `"local"` always uses the local model.
/// The local model is only loaded on first use.
pub fn create_provider(config: &EmbeddingConfig) -> Result<Box<dyn EmbeddingProvider>> {
    match config.provider.to_lowercase().as_str() {
        "gemini" | "local" => Ok(Box::new(EmbeddingRouter::from_config(config))),
        other => Err(Error::InvalidInput(format!(
            "unknown embedding provider: {other}. Supported: gemini, local"
        ))),
    }
}

/// Check that a backend returned exactly one vector per input.
pub(crate) fn ensure_batch_len(expected: usize, vectors: &[Vec<f32>]) -> Result<()> {
    if vectors.len() != expected {
        return Err(Error::Provider(format!(
            "expected {expected} embeddings, backend returned {}",
            vectors.len()
        )));
    }
    Ok(())
}

/// A vector cosine distance is defined for: every component finite and a
/// non-zero L2 norm.
pub fn is_usable_vector(vector: &[f32]) -> bool {
    vector.iter().all(|x| x.is_finite()) && vector.iter().any(|&x| x != 0.0)
}
