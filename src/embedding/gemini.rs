//! Remote embedding provider backed by the Gemini `embedContent` API.
//!
//! One HTTP request per input text, no batching and no retries. The API key is
//! resolved from its [`Credential`] on every request.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use reqwest::blocking::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use super::{ensure_batch_len, is_usable_vector, Credential, EmbeddingProvider};
use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};

/// Output dimensionality of `text-embedding-004`.
pub const GEMINI_EMBEDDING_DIM: usize = 768;

#[derive(Serialize)]
struct EmbedContentRequest<'a> {
    model: String,
    content: Content<'a>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct EmbedContentResponse {
    embedding: Option<ContentEmbedding>,
}

#[derive(Deserialize)]
struct ContentEmbedding {
    #[serde(default)]
    values: Vec<f32>,
}

pub struct GeminiEmbeddingProvider {
    base_url: String,
    model: String,
    timeout: Duration,
    credential: Arc<Credential>,
    // Built on first use: the blocking client must not be created on an async worker.
    client: OnceLock<Client>,
}

impl GeminiEmbeddingProvider {
    pub fn new(config: &EmbeddingConfig, credential: Arc<Credential>) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.remote_model.clone(),
            timeout: config.timeout(),
            credential,
            client: OnceLock::new(),
        }
    }

    fn client(&self) -> Result<&Client> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| Error::Provider(format!("failed to build HTTP client: {e}")))?;
        Ok(self.client.get_or_init(|| client))
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:embedContent", self.base_url, self.model)
    }

    fn request_one(&self, text: &str) -> Result<Vec<f32>> {
        let key = self
            .credential
            .resolve()
            .ok_or_else(|| Error::provider("no Gemini API key available"))?;

        let body = EmbedContentRequest {
            model: format!("models/{}", self.model),
            content: Content {
                parts: vec![Part { text }],
            },
        };

        tracing::debug!(model = %self.model, text_len = text.len(), "requesting remote embedding");

        let response = self
            .client()?
            .post(self.endpoint())
            .header("x-goog-api-key", key.expose_secret())
            .json(&body)
            .send()
            .map_err(|e| Error::Provider(format!("embedding request failed: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|e| Error::Provider(format!("failed to read embedding response: {e}")))?;

        if !status.is_success() {
            return Err(Error::Provider(format!(
                "embedding API returned HTTP {status}: {}",
                snippet(&text)
            )));
        }

        parse_embedding(&text)
    }
}

impl EmbeddingProvider for GeminiEmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.request_one(text)
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let vectors = texts
            .iter()
            .map(|t| self.request_one(t))
            .collect::<Result<Vec<_>>>()?;
        ensure_batch_len(texts.len(), &vectors)?;
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        GEMINI_EMBEDDING_DIM
    }

    fn model_id(&self) -> String {
        format!("gemini:{}", self.model)
    }
}

/// Extract `embedding.values` from an `embedContent` response body.
fn parse_embedding(body: &str) -> Result<Vec<f32>> {
    let parsed: EmbedContentResponse = serde_json::from_str(body)
        .map_err(|e| Error::Provider(format!("malformed embedding response: {e}")))?;
    match parsed.embedding {
        Some(embedding) if embedding.values.is_empty() => {
            Err(Error::provider("embedding response contained no values"))
        }
        Some(embedding) if !is_usable_vector(&embedding.values) => Err(Error::provider(
            "embedding response has zero norm or non-finite values",
        )),
        Some(embedding) => Ok(embedding.values),
        None => Err(Error::provider("embedding response contained no values")),
    }
}

fn snippet(body: &str) -> String {
    body.chars().take(200).collect()
}
