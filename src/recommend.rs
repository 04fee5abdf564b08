//! Request pipeline: cache lookup, engine dispatch, cache population.
//!
//! Each call takes one corpus snapshot up front and uses it for the key and
//! the computation, so a concurrent reload never mixes two corpora in one
//! response.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::cache::{Operation, ResponseCache};
use crate::corpus::{Corpus, CorpusHandle, RecipeRecord};
use crate::embedding::EmbeddingProvider;
use crate::engine;
use crate::error::EngineError;
use crate::metrics::Metrics;

pub const DEFAULT_TOP_N: i64 = 3;

fn default_top_n() -> i64 {
    DEFAULT_TOP_N
}

/// One recommendation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySpec {
    #[serde(default)]
    pub ingredients: Option<String>,
    #[serde(default)]
    pub preferences: Option<Vec<String>>,
    #[serde(default = "default_top_n")]
    pub top_n: i64,
}

impl Default for QuerySpec {
    fn default() -> Self {
        Self {
            ingredients: None,
            preferences: None,
            top_n: DEFAULT_TOP_N,
        }
    }
}

impl QuerySpec {
    /// `top_n` as a count, rejecting zero and negatives.
    pub fn limit(&self) -> Result<usize, EngineError> {
        match usize::try_from(self.top_n) {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(EngineError::invalid(format!(
                "top_n must be positive, got {}",
                self.top_n
            ))),
        }
    }

    /// Text handed to the embedding producer: ingredients, then each preference.
    pub fn query_text(&self) -> Result<String, EngineError> {
        let ingredients = self
            .ingredients
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| EngineError::invalid("ingredients are required for embedding search"))?;

        let mut parts = vec![ingredients];
        if let Some(prefs) = &self.preferences {
            parts.extend(prefs.iter().map(|p| p.trim()).filter(|p| !p.is_empty()));
        }
        Ok(parts.join(", "))
    }
}

/// A recipe as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeView {
    pub title: String,
    pub ingredients: Vec<String>,
    pub directions: Vec<String>,
}

impl RecipeView {
    /// Parse the record's list fields. Fails with [`EngineError::DataFormat`].
    pub fn from_record(record: &RecipeRecord) -> Result<Self, EngineError> {
        Ok(Self {
            title: record.title.clone(),
            ingredients: record.ingredients()?,
            directions: record.directions()?,
        })
    }
}

/// A similarity-ranked recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRecipe {
    #[serde(flatten)]
    pub recipe: RecipeView,
    pub score: f32,
}

/// Ties the corpus, cache, and embedding producer into one request/response cycle.
#[derive(Clone)]
pub struct Recommender {
    corpus: Arc<CorpusHandle>,
    cache: ResponseCache,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    metrics: Metrics,
    ttl: Duration,
}

impl Recommender {
    pub fn new(corpus: Arc<CorpusHandle>, cache: ResponseCache, metrics: Metrics) -> Self {
        Self {
            corpus,
            cache,
            embedder: None,
            metrics,
            ttl: Duration::from_secs(3600),
        }
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn corpus(&self) -> &Arc<CorpusHandle> {
        &self.corpus
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Substring-filtered recipes, first `top_n` matches in corpus order.
    pub async fn recommend(&self, spec: &QuerySpec) -> Result<Vec<RecipeView>, EngineError> {
        let limit = spec.limit()?;
        self.cached(Operation::Recommend, spec, |corpus| async move {
            engine::filter(
                &corpus,
                spec.ingredients.as_deref(),
                spec.preferences.as_deref(),
            )
            .into_iter()
            .take(limit)
            .map(RecipeView::from_record)
            .collect::<Result<Vec<_>, _>>()
        })
        .await
    }

    /// Recipes ranked by cosine similarity to the embedded query text.
    pub async fn recommend_by_embedding(
        &self,
        spec: &QuerySpec,
    ) -> Result<Vec<ScoredRecipe>, EngineError> {
        let limit = spec.limit()?;
        let text = spec.query_text()?;
        let embedder = self
            .embedder
            .clone()
            .ok_or(EngineError::EmbeddingUnavailable)?;

        self.cached(Operation::RecommendByEmbedding, spec, |corpus| async move {
            let vector = tokio::task::spawn_blocking(move || embedder.embed(&text))
                .await
                .map_err(|e| EngineError::Embedding(format!("embedding task failed: {e}")))?
                .map_err(|e| EngineError::Embedding(format!("{e:#}")))?;

            engine::rank(&corpus, &vector, limit)?
                .into_iter()
                .map(|(record, score)| {
                    RecipeView::from_record(record).map(|recipe| ScoredRecipe { recipe, score })
                })
                .collect::<Result<Vec<_>, _>>()
        })
        .await
    }

    /// lookup → [compute → store] → respond, timed per operation.
    async fn cached<T, F, Fut>(
        &self,
        op: Operation,
        spec: &QuerySpec,
        compute: F,
    ) -> Result<T, EngineError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(Arc<Corpus>) -> Fut,
        Fut: Future<Output = Result<T, EngineError>>,
    {
        let started = Instant::now();
        let corpus = self.corpus.snapshot();
        let key = self.cache.key(corpus.generation(), op, spec);

        let result = match self.lookup::<T>(op, &key).await {
            Some(value) => Ok(value),
            None => match compute(corpus).await {
                Ok(value) => {
                    self.store(&key, &value).await;
                    Ok(value)
                }
                Err(e) => Err(e),
            },
        };

        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => e.kind(),
        };
        self.metrics
            .observe_operation(op.as_str(), outcome, started.elapsed());
        if let Err(e) = &result {
            tracing::warn!(operation = %op, error = %e, "recommendation failed");
        }
        result
    }

    async fn lookup<T: DeserializeOwned>(&self, op: Operation, key: &str) -> Option<T> {
        let raw = self.cache.get(op, key).await?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "discarding undecodable cache entry");
                None
            }
        }
    }

    async fn store<T: Serialize>(&self, key: &str, value: &T) {
        match serde_json::to_string(value) {
            Ok(raw) => self.cache.set(key, &raw, self.ttl).await,
            Err(e) => tracing::warn!(key, error = %e, "result not serializable, skipping cache"),
        }
    }
}
