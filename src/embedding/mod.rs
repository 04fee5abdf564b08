//! Query-text embedding.
//!
//! The ranking engine only consumes vectors; [`EmbeddingProvider`] is the seam
//! that produces them. [`local::LocalEmbeddingProvider`] runs a sentence
//! embedding model through ONNX Runtime. The model must match the one used to
//! precompute the corpus matrix, or dimensions (and scores) will not line up.

pub mod local;

use std::sync::Arc;

use anyhow::Result;

use crate::config::EmbeddingConfig;

/// Turns text into a fixed-length vector.
///
/// Implementations are synchronous; async callers should use
/// `tokio::task::spawn_blocking`.
pub trait EmbeddingProvider: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Length of every vector [`embed`](Self::embed) returns.
    fn dimensions(&self) -> usize;
}

/// Build the configured provider, or `None` when `provider = "none"`.
pub fn create_provider(config: &EmbeddingConfig) -> Result<Option<Arc<dyn EmbeddingProvider>>> {
    match config.provider.as_str() {
        "local" => {
            let provider = local::LocalEmbeddingProvider::new(config)?;
            Ok(Some(Arc::new(provider)))
        }
        "none" => Ok(None),
        other => anyhow::bail!("unknown embedding provider: {other}. Supported: local, none"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_provider_disables_embedding() {
        let config = EmbeddingConfig {
            provider: "none".into(),
            ..EmbeddingConfig::default()
        };
        assert!(create_provider(&config).unwrap().is_none());
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let config = EmbeddingConfig {
            provider: "openai".into(),
            ..EmbeddingConfig::default()
        };
        let err = create_provider(&config).err().unwrap();
        assert!(err.to_string().contains("unknown embedding provider"));
    }
}
