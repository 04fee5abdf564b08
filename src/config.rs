use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::corpus::CorpusPaths;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct MiseConfig {
    pub server: ServerConfig,
    pub data: DataConfig,
    pub cache: CacheConfig,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DataConfig {
    pub recipes_path: String,
    pub embeddings_path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub redis_url: String,
    pub ttl_secs: u64,
    pub key_prefix: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// `"local"` (ONNX Runtime) or `"none"` to disable embedding search.
    pub provider: String,
    pub model: String,
    pub cache_dir: String,
    pub dimensions: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub default_top_n: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8000,
            log_level: "info".into(),
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        let data_dir = default_mise_dir().join("data");
        Self {
            recipes_path: data_dir
                .join("recipes.csv")
                .to_string_lossy()
                .into_owned(),
            embeddings_path: data_dir
                .join("recipe_embeddings.npy")
                .to_string_lossy()
                .into_owned(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            redis_url: "redis://127.0.0.1:6379".into(),
            ttl_secs: 3600,
            key_prefix: "mise".into(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        let cache_dir = default_mise_dir()
            .join("models")
            .to_string_lossy()
            .into_owned();
        Self {
            provider: "local".into(),
            model: "all-MiniLM-L6-v2".into(),
            cache_dir,
            dimensions: 384,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { default_top_n: 3 }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Returns `~/.mise/`, or `./.mise/` when no home directory is known.
pub fn default_mise_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".mise")
}

/// Returns the default config file path: `~/.mise/config.toml`
pub fn default_config_path() -> PathBuf {
    default_mise_dir().join("config.toml")
}

impl MiseConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            MiseConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    /// (MISE_RECIPES, MISE_EMBEDDINGS, MISE_REDIS_URL, MISE_LOG_LEVEL, MISE_PORT).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("MISE_RECIPES") {
            self.data.recipes_path = val;
        }
        if let Ok(val) = std::env::var("MISE_EMBEDDINGS") {
            self.data.embeddings_path = val;
        }
        if let Ok(val) = std::env::var("MISE_REDIS_URL") {
            self.cache.redis_url = val;
        }
        if let Ok(val) = std::env::var("MISE_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("MISE_PORT") {
            match val.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!(value = %val, "ignoring invalid MISE_PORT"),
            }
        }
    }

    /// Corpus artifact paths with `~` expanded.
    pub fn corpus_paths(&self) -> CorpusPaths {
        CorpusPaths {
            recipes: expand_tilde(&self.data.recipes_path),
            embeddings: expand_tilde(&self.data.embeddings_path),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
