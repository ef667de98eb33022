use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct KeepsakeConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
    /// Directory holding one sub-folder per memory id.
    pub media_root: String,
}

#[derive(Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// `"gemini"` prefers the remote backend when a key is present; anything else is local-only.
    pub provider: String,
    /// Local ONNX model name.
    pub model: String,
    pub cache_dir: String,
    pub remote_model: String,
    pub base_url: String,
    /// Environment variable checked for the remote API key on every call.
    pub api_key_env: String,
    /// Key from the config file, used when the environment variable is unset.
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub default_k: usize,
}

impl Default for KeepsakeConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            embedding: EmbeddingConfig::default(),
            retrieval: RetrievalConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let dir = default_keepsake_dir();
        Self {
            db_path: dir.join("index.db").to_string_lossy().into_owned(),
            media_root: dir.join("memories").to_string_lossy().into_owned(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        let cache_dir = default_keepsake_dir()
            .join("models")
            .to_string_lossy()
            .into_owned();
        Self {
            provider: "gemini".into(),
            model: "all-MiniLM-L6-v2".into(),
            cache_dir,
            remote_model: "text-embedding-004".into(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".into(),
            api_key_env: "GEMINI_API_KEY".into(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

impl std::fmt::Debug for EmbeddingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("cache_dir", &self.cache_dir)
            .field("remote_model", &self.remote_model)
            .field("base_url", &self.base_url)
            .field("api_key_env", &self.api_key_env)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl EmbeddingConfig {
    /// Whether the configuration asks for the remote backend at all.
    pub fn prefers_remote(&self) -> bool {
        self.provider.eq_ignore_ascii_case("gemini")
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { default_k: 5 }
    }
}

/// Returns `~/.keepsake/`
pub fn default_keepsake_dir() -> PathBuf {
    dirs::home_dir()
        .expect("home directory must exist")
        .join(".keepsake")
}

/// Returns the default config file path: `~/.keepsake/config.toml`
pub fn default_config_path() -> PathBuf {
    default_keepsake_dir().join("config.toml")
}

impl KeepsakeConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            KeepsakeConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    /// (KEEPSAKE_DB, KEEPSAKE_MEDIA_ROOT, KEEPSAKE_LOG_LEVEL, LLM_PROVIDER).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("KEEPSAKE_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("KEEPSAKE_MEDIA_ROOT") {
            self.storage.media_root = val;
        }
        if let Ok(val) = std::env::var("KEEPSAKE_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("LLM_PROVIDER") {
            self.embedding.provider = val.to_lowercase();
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }

    /// Resolve the media root, expanding `~` if needed.
    pub fn resolved_media_root(&self) -> PathBuf {
        expand_tilde(&self.storage.media_root)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .expect("home directory must exist")
            .join(rest)
    } else {
        PathBuf::from(path)
    }
}
