//! Recipe recommendations from free-text ingredients and preferences.
//!
//! Mise answers two kinds of query over a fixed recipe corpus:
//!
//! | Operation | Selection | Ordering |
//! |-----------|-----------|----------|
//! | `recommend` | case-insensitive substring match on preprocessed ingredients | corpus order |
//! | `recommend_by_embedding` | cosine similarity to the embedded query text | score, then corpus index |
//!
//! Both sit behind a TTL response cache. The cache is an optimization only:
//! when its store is unreachable every lookup misses and results are computed
//! directly.
//!
//! # Architecture
//!
//! - **Corpus**: CSV recipe table + `.npy` embedding matrix, loaded once into an
//!   immutable snapshot and swapped atomically on reload
//! - **Engines**: pure functions over a snapshot; no locks on the read path
//! - **Cache**: Redis (or in-process) key/value store with per-entry TTL
//! - **Embeddings**: local ONNX Runtime sentence-embedding model
//! - **Transport**: JSON over HTTP (axum), Prometheus metrics at `/metrics`
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from TOML files and environment variables
//! - [`corpus`]: Recipe records, embedding matrix, loading, and the swappable handle
//! - [`engine`]: Substring filter and cosine-similarity ranker
//! - [`cache`]: Cache keys, stores, and the degraded-mode response cache
//! - [`recommend`]: The request pipeline tying cache and engines together
//! - [`embedding`]: Query-text embedding via ONNX Runtime
//! - [`server`]: HTTP routes and middleware

pub mod cache;
pub mod config;
pub mod corpus;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod recommend;
pub mod server;
pub mod substitute;

pub use error::EngineError;
