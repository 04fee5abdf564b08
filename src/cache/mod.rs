//! TTL response cache in front of the filter and ranking engines.
//!
//! [`ResponseCache`] stores opaque serialized payloads in a [`CacheStore`]
//! (Redis in production, [`MemoryStore`] in-process). The cache is purely an
//! optimization: when the store is missing or failing, lookups report absent
//! and writes are dropped, and callers compute results as if no cache existed.

pub mod key;
pub mod memory;
pub mod redis;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::metrics::Metrics;
use crate::recommend::QuerySpec;

pub use self::key::{build_key, Operation};
pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache store unavailable: {0}")]
    Unavailable(String),
}

/// A key/value store with per-entry expiry.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// The value for `key`, or `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store `value`, replacing any existing entry, expiring `ttl` from now.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    /// Check the store is reachable.
    async fn ping(&self) -> Result<(), CacheError>;
}

/// Reported by [`ResponseCache::health`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheHealth {
    Connected,
    Unavailable,
    Disabled,
}

impl CacheHealth {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Unavailable => "unavailable",
            Self::Disabled => "disabled",
        }
    }
}

/// Cache facade with degraded-mode semantics and hit/miss reporting.
#[derive(Clone)]
pub struct ResponseCache {
    store: Option<Arc<dyn CacheStore>>,
    metrics: Metrics,
    prefix: String,
}

impl ResponseCache {
    pub fn new(store: Arc<dyn CacheStore>, metrics: Metrics, prefix: impl Into<String>) -> Self {
        Self {
            store: Some(store),
            metrics,
            prefix: prefix.into(),
        }
    }

    /// A cache that never stores anything.
    pub fn disabled(metrics: Metrics) -> Self {
        Self {
            store: None,
            metrics,
            prefix: "mise".into(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    /// Key for `spec` under `op`, scoped to a corpus generation.
    pub fn key(&self, generation: u64, op: Operation, spec: &QuerySpec) -> String {
        build_key(&self.prefix, generation, op, spec)
    }

    /// Cached value for `key`. Store failures read as a miss.
    pub async fn get(&self, op: Operation, key: &str) -> Option<String> {
        let found = match &self.store {
            Some(store) => match store.get(key).await {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!(error = %e, key, "cache get failed, continuing uncached");
                    None
                }
            },
            None => None,
        };

        let hit = found.is_some();
        self.metrics.record_cache(op.as_str(), hit);
        tracing::debug!(key, hit, "cache lookup");
        found
    }

    /// Store `value` under `key`. Store failures are logged and dropped.
    pub async fn set(&self, key: &str, value: &str, ttl: Duration) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(e) = store.set(key, value, ttl).await {
            tracing::warn!(error = %e, key, "cache set failed, result not cached");
        }
    }

    pub async fn health(&self) -> CacheHealth {
        match &self.store {
            None => CacheHealth::Disabled,
            Some(store) => match store.ping().await {
                Ok(()) => CacheHealth::Connected,
                Err(_) => CacheHealth::Unavailable,
            },
        }
    }
}
