//! Local ONNX Runtime embedding provider.
//!
//! Implements [`EmbeddingProvider`] using the all-MiniLM-L6-v2 model via `ort`.
//! Handles tokenization, inference, mean pooling, and L2 normalization, so
//! cosine distance and dot-product distance coincide for its vectors.

use std::sync::{Arc, Mutex};

use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;

use super::{ensure_batch_len, EmbeddingProvider, EMBEDDING_DIM};
use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};

/// Maximum sequence length for all-MiniLM-L6-v2 (trained at 256).
const MAX_SEQ_LEN: usize = 256;

/// Local ONNX-based embedding provider using all-MiniLM-L6-v2.
pub struct LocalEmbeddingProvider {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    model: String,
}

// Safety: Tokenizer is Send+Sync. Session is behind a Mutex.
// The Mutex guarantees exclusive access during run().
unsafe impl Send for LocalEmbeddingProvider {}
unsafe impl Sync for LocalEmbeddingProvider {}

impl LocalEmbeddingProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let cache_dir = crate::config::expand_tilde(&config.cache_dir);
        let model_path = cache_dir.join("model.onnx");
        let tokenizer_path = cache_dir.join("tokenizer.json");

        if !model_path.exists() {
            return Err(Error::Provider(format!(
                "ONNX model not found at {}. Run `keepsake model download` first.",
                model_path.display()
            )));
        }
        if !tokenizer_path.exists() {
            return Err(Error::Provider(format!(
                "tokenizer not found at {}. Run `keepsake model download` first.",
                tokenizer_path.display()
            )));
        }

        let session = Session::builder()
            .map_err(Error::provider)?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)
            .map_err(Error::provider)?
            .with_intra_threads(4)
            .map_err(Error::provider)?
            .commit_from_file(&model_path)
            .map_err(|e| Error::Provider(format!("failed to load ONNX model: {e}")))?;

        tracing::info!(model = %model_path.display(), "ONNX model loaded");

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| Error::Provider(format!("failed to load tokenizer: {e}")))?;

        tokenizer
            .with_truncation(Some(tokenizers::TruncationParams {
                max_length: MAX_SEQ_LEN,
                ..Default::default()
            }))
            .map_err(|e| Error::Provider(format!("failed to set truncation: {e}")))?;

        tokenizer.with_padding(Some(tokenizers::PaddingParams {
            strategy: tokenizers::PaddingStrategy::BatchLongest,
            ..Default::default()
        }));

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            model: config.model.clone(),
        })
    }
}

impl EmbeddingProvider for LocalEmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])?
            .pop()
            .ok_or_else(|| Error::provider("local model returned no embedding"))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| Error::Provider(format!("tokenization failed: {e}")))?;

        let batch_size = encodings.len();
        let seq_len = encodings[0].get_ids().len();

        let mut input_ids_flat = Vec::with_capacity(batch_size * seq_len);
        let mut attention_mask_flat = Vec::with_capacity(batch_size * seq_len);
        for encoding in &encodings {
            input_ids_flat.extend(encoding.get_ids().iter().map(|&id| id as i64));
            attention_mask_flat.extend(encoding.get_attention_mask().iter().map(|&m| m as i64));
        }

        let shape = vec![batch_size as i64, seq_len as i64];
        let input_ids = Tensor::from_array((shape.clone(), input_ids_flat.into_boxed_slice()))
            .map_err(Error::provider)?;
        let attention_mask =
            Tensor::from_array((shape.clone(), attention_mask_flat.clone().into_boxed_slice()))
                .map_err(Error::provider)?;
        // single sentence, no segment B
        let token_type_ids =
            Tensor::from_array((shape, vec![0i64; batch_size * seq_len].into_boxed_slice()))
                .map_err(Error::provider)?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| Error::Provider(format!("session lock poisoned: {e}")))?;

        let outputs = session
            .run(ort::inputs! {
                "input_ids" => input_ids,
                "attention_mask" => attention_mask,
                "token_type_ids" => token_type_ids,
            })
            .map_err(|e| Error::Provider(format!("inference failed: {e}")))?;

        // Output name varies by ONNX export; fall back to the first output.
        let token_emb_value = outputs
            .get("token_embeddings")
            .or_else(|| outputs.get("last_hidden_state"))
            .unwrap_or_else(|| &outputs[0]);

        let (out_shape, data) = token_emb_value
            .try_extract_tensor::<f32>()
            .map_err(|e| Error::Provider(format!("failed to extract token embeddings: {e}")))?;

        let dims: &[i64] = &out_shape;
        if dims.len() != 3 || dims[2] != EMBEDDING_DIM as i64 {
            return Err(Error::Provider(format!(
                "unexpected token_embeddings shape: {dims:?}, expected [batch, seq, {EMBEDDING_DIM}]"
            )));
        }
        let hidden_dim = dims[2] as usize;
        let actual_seq_len = dims[1] as usize;

        let results: Vec<Vec<f32>> = (0..batch_size)
            .map(|b| {
                let mask = &attention_mask_flat[b * seq_len..(b + 1) * seq_len];
                let rows = &data[b * actual_seq_len * hidden_dim..(b + 1) * actual_seq_len * hidden_dim];
                l2_normalize(&mean_pool(rows, mask, hidden_dim))
            })
            .collect();

        ensure_batch_len(texts.len(), &results)?;
        Ok(results)
    }

    fn dimensions(&self) -> usize {
        EMBEDDING_DIM
    }

    fn model_id(&self) -> String {
        format!("local:{}", self.model)
    }
}

/// Average the token rows whose attention mask is set.
fn mean_pool(rows: &[f32], mask: &[i64], hidden_dim: usize) -> Vec<f32> {
    let mut sum = vec![0.0f32; hidden_dim];
    let mut count = 0.0f32;

    for (row, &m) in rows.chunks_exact(hidden_dim).zip(mask.iter()) {
        if m > 0 {
            let weight = m as f32;
            for (acc, &x) in sum.iter_mut().zip(row) {
                *acc += x * weight;
            }
            count += weight;
        }
    }

    if count > 0.0 {
        sum.iter_mut().for_each(|x| *x /= count);
    }
    sum
}

/// L2-normalize a vector. Returns the input unchanged if its norm is zero.
fn l2_normalize(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}

/// Defers loading the ONNX model until the first embedding request, so a
/// process that only ever uses the remote backend never touches model files.
pub struct LazyLocalProvider {
    config: EmbeddingConfig,
    inner: Mutex<Option<Arc<LocalEmbeddingProvider>>>,
}

impl LazyLocalProvider {
    pub fn new(config: EmbeddingConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(None),
        }
    }

    fn get(&self) -> Result<Arc<LocalEmbeddingProvider>> {
        let mut slot = self
            .inner
            .lock()
            .map_err(|e| Error::Provider(format!("local provider lock poisoned: {e}")))?;
        if let Some(provider) = slot.as_ref() {
            return Ok(Arc::clone(provider));
        }
        let provider = Arc::new(LocalEmbeddingProvider::new(&self.config)?);
        *slot = Some(Arc::clone(&provider));
        Ok(provider)
    }
}

impl EmbeddingProvider for LazyLocalProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.get()?.embed(text)
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.get()?.embed_batch(texts)
    }

    fn dimensions(&self) -> usize {
        EMBEDDING_DIM
    }

    fn model_id(&self) -> String {
        format!("local:{}", self.config.model)
    }
}
