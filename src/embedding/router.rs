//! Per-call backend selection between the remote and local providers.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};

use super::{EmbeddingProvider, GeminiEmbeddingProvider, LazyLocalProvider};
use crate::config::EmbeddingConfig;
use crate::error::Result;

/// Source of the remote API key, read on every call.
///
/// The environment variable wins; the configured key is the fallback. Empty
/// values count as absent.
pub struct Credential {
    env_var: String,
    fallback: Option<SecretString>,
}

impl Credential {
    pub fn new(env_var: impl Into<String>, fallback: Option<String>) -> Self {
        Self {
            env_var: env_var.into(),
            fallback: fallback.filter(|k| !k.is_empty()).map(SecretString::from),
        }
    }

    pub fn from_config(config: &EmbeddingConfig) -> Self {
        Self::new(config.api_key_env.clone(), config.api_key.clone())
    }

    pub fn resolve(&self) -> Option<SecretString> {
        match std::env::var(&self.env_var) {
            Ok(val) if !val.is_empty() => Some(SecretString::from(val)),
            _ => self
                .fallback
                .as_ref()
                .map(|k| SecretString::from(k.expose_secret().to_owned())),
        }
    }

    pub fn is_present(&self) -> bool {
        self.resolve().is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Remote,
    Local,
}

/// Routes each call to the remote backend when it is preferred and a key is
/// present, otherwise to the local backend.
///
/// The decision is not cached: removing the key changes the backend on the
/// very next call.
pub struct EmbeddingRouter {
    prefer_remote: bool,
    credential: Arc<Credential>,
    remote: Arc<dyn EmbeddingProvider>,
    local: Arc<dyn EmbeddingProvider>,
}

impl EmbeddingRouter {
    pub fn new(
        prefer_remote: bool,
        credential: Arc<Credential>,
        remote: Arc<dyn EmbeddingProvider>,
        local: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        Self {
            prefer_remote,
            credential,
            remote,
            local,
        }
    }

    pub fn from_config(config: &EmbeddingConfig) -> Self {
        let credential = Arc::new(Credential::from_config(config));
        let remote = Arc::new(GeminiEmbeddingProvider::new(config, Arc::clone(&credential)));
        let local = Arc::new(LazyLocalProvider::new(config.clone()));
        Self::new(config.prefers_remote(), credential, remote, local)
    }

    /// Which backend the next call would use.
    pub fn backend(&self) -> Backend {
        if self.prefer_remote && self.credential.is_present() {
            Backend::Remote
        } else {
            Backend::Local
        }
    }

    fn active(&self) -> &dyn EmbeddingProvider {
        match self.backend() {
            Backend::Remote => self.remote.as_ref(),
            Backend::Local => self.local.as_ref(),
        }
    }
}

impl EmbeddingProvider for EmbeddingRouter {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let provider = self.active();
        tracing::debug!(provider = %provider.model_id(), "embedding text");
        provider.embed(text)
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let provider = self.active();
        tracing::debug!(provider = %provider.model_id(), count = texts.len(), "embedding batch");
        provider.embed_batch(texts)
    }

    fn embed_tagged(&self, text: &str) -> Result<(String, Vec<f32>)> {
        let provider = self.active();
        let tag = provider.model_id();
        tracing::debug!(provider = %tag, "embedding text");
        Ok((tag, provider.embed(text)?))
    }

    fn dimensions(&self) -> usize {
        self.active().dimensions()
    }

    fn model_id(&self) -> String {
        self.active().model_id()
    }
}
