//! Typed failures surfaced by the recommendation engine.
//!
//! [`EngineError`] separates "your input was invalid" ([`EngineError::InvalidArgument`],
//! [`EngineError::DimensionMismatch`]) from "the system's data is broken"
//! ([`EngineError::DataLoad`], [`EngineError::DataFormat`]) so callers can decide
//! whether a retry with the same input makes sense.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Corpus construction failed. Fatal: no engine can run without a corpus.
    #[error("failed to load corpus: {0}")]
    DataLoad(String),

    /// Rejected before any computation (bad `top_n`, malformed query).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Query vector length differs from the corpus embedding dimension.
    #[error("query vector has {actual} dimensions, corpus expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A selected record's serialized fields failed to parse.
    #[error("malformed recipe data: {0}")]
    DataFormat(String),

    /// The embedding producer failed to turn query text into a vector.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// No embedding producer is configured for this process.
    #[error("embedding search is unavailable: no embedding provider configured")]
    EmbeddingUnavailable,
}

impl EngineError {
    /// Stable snake_case label, used in API error bodies and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DataLoad(_) => "data_load",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::DimensionMismatch { .. } => "dimension_mismatch",
            Self::DataFormat(_) => "data_format",
            Self::Embedding(_) => "embedding",
            Self::EmbeddingUnavailable => "embedding_unavailable",
        }
    }

    /// True when the request itself was at fault and must change before a retry.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument(_) | Self::DimensionMismatch { .. }
        )
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub(crate) fn load(msg: impl Into<String>) -> Self {
        Self::DataLoad(msg.into())
    }
}
