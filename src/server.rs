//! HTTP transport.
//!
//! [`build_recommender`] wires the corpus, cache store, metrics, and embedding
//! provider together; [`router`] exposes them over axum; [`serve`] binds and
//! runs until ctrl-c.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::extract::{MatchedPath, Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::cache::{RedisStore, ResponseCache};
use crate::config::MiseConfig;
use crate::corpus::{self, CorpusHandle, CorpusPaths};
use crate::embedding;
use crate::error::EngineError;
use crate::metrics::Metrics;
use crate::recommend::{QuerySpec, RecipeView, Recommender, ScoredRecipe};
use crate::substitute::suggest_substitutions;

/// Load the corpus and connect collaborators.
///
/// A corpus load failure is fatal. An unreachable cache or a missing embedding
/// model only disables that feature.
pub async fn build_recommender(config: &MiseConfig) -> Result<Recommender> {
    let paths = config.corpus_paths();
    let corpus = tokio::task::spawn_blocking(move || corpus::load(&paths))
        .await
        .context("corpus loader panicked")?
        .context("failed to load corpus")?;
    let dimension = corpus.embedding_dimension();
    let handle = Arc::new(CorpusHandle::new(corpus));

    let metrics = Metrics::new();
    let cache = if config.cache.enabled {
        match RedisStore::connect(&config.cache.redis_url).await {
            Ok(store) => ResponseCache::new(Arc::new(store), metrics.clone(), &config.cache.key_prefix),
            Err(e) => {
                tracing::warn!(error = %e, "redis unavailable, caching disabled");
                ResponseCache::disabled(metrics.clone())
            }
        }
    } else {
        tracing::info!("caching disabled by config");
        ResponseCache::disabled(metrics.clone())
    };

    let mut recommender =
        Recommender::new(handle, cache, metrics).with_ttl(config.cache.ttl());

    match embedding::create_provider(&config.embedding) {
        Ok(Some(provider)) => {
            if provider.dimensions() != dimension {
                tracing::warn!(
                    model = provider.dimensions(),
                    corpus = dimension,
                    "embedding model and corpus dimensions differ; embedding search will reject queries"
                );
            }
            recommender = recommender.with_embedder(provider);
        }
        Ok(None) => tracing::info!("embedding search disabled by config"),
        Err(e) => tracing::warn!(error = %e, "embedding provider unavailable, embedding search disabled"),
    }

    Ok(recommender)
}

#[derive(Clone)]
pub struct AppState {
    pub recommender: Recommender,
    pub corpus_paths: Arc<CorpusPaths>,
    /// `top_n` used when a request body omits it.
    pub default_top_n: i64,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/recommend", post(recommend))
        .route("/recommend_by_embedding", post(recommend_by_embedding))
        .route("/substitute", post(substitute))
        .route("/reload", post(reload))
        .route_layer(middleware::from_fn_with_state(state.clone(), track_requests))
        .with_state(state)
}

/// Bind to the configured address and serve until ctrl-c.
pub async fn serve(config: MiseConfig) -> Result<()> {
    let bind_addr = config.bind_addr();
    let recommender = build_recommender(&config).await?;
    let state = AppState {
        recommender,
        corpus_paths: Arc::new(config.corpus_paths()),
        default_top_n: config.retrieval.default_top_n,
    };

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!(addr = %bind_addr, "recipe API listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
            }
            tracing::info!("shutting down");
        })
        .await?;

    Ok(())
}

async fn track_requests(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().to_string();
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let response = next.run(request).await;

    let elapsed = started.elapsed();
    let status = response.status().as_u16();
    state
        .recommender
        .metrics()
        .record_request(&method, &endpoint, status, elapsed);
    tracing::info!(
        method = %method,
        endpoint = %endpoint,
        status,
        elapsed_ms = elapsed.as_secs_f64() * 1000.0,
        "request completed"
    );
    response
}

/// JSON error body: `{"error": "...", "kind": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
}

#[derive(Serialize, Deserialize)]
struct ErrorBody {
    error: String,
    kind: String,
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        let status = match &err {
            EngineError::InvalidArgument(_) | EngineError::DimensionMismatch { .. } => {
                StatusCode::BAD_REQUEST
            }
            EngineError::EmbeddingUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            EngineError::Embedding(_) => StatusCode::BAD_GATEWAY,
            EngineError::DataFormat(_) | EngineError::DataLoad(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
            kind: self.kind.to_string(),
        };
        (self.status, Json(body)).into_response()
    }
}

#[derive(Serialize)]
struct Message {
    message: &'static str,
}

async fn root() -> Json<Message> {
    Json(Message {
        message: "Welcome to the Recipe API!",
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    cache: &'static str,
    corpus_size: usize,
    generation: u64,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let corpus = state.recommender.corpus().snapshot();
    Json(HealthResponse {
        status: "ok",
        cache: state.recommender.cache().health().await.as_str(),
        corpus_size: corpus.size(),
        generation: corpus.generation(),
    })
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.recommender.metrics().render(),
    )
}

/// Request body for both recommendation routes. `top_n` falls back to the
/// configured default.
#[derive(Deserialize)]
struct RecommendRequest {
    #[serde(default)]
    ingredients: Option<String>,
    #[serde(default)]
    preferences: Option<Vec<String>>,
    #[serde(default)]
    top_n: Option<i64>,
}

impl RecommendRequest {
    fn into_spec(self, default_top_n: i64) -> QuerySpec {
        QuerySpec {
            ingredients: self.ingredients,
            preferences: self.preferences,
            top_n: self.top_n.unwrap_or(default_top_n),
        }
    }
}

async fn recommend(
    State(state): State<AppState>,
    Json(request): Json<RecommendRequest>,
) -> Result<Json<Vec<RecipeView>>, ApiError> {
    let spec = request.into_spec(state.default_top_n);
    Ok(Json(state.recommender.recommend(&spec).await?))
}

async fn recommend_by_embedding(
    State(state): State<AppState>,
    Json(request): Json<RecommendRequest>,
) -> Result<Json<Vec<ScoredRecipe>>, ApiError> {
    let spec = request.into_spec(state.default_top_n);
    Ok(Json(state.recommender.recommend_by_embedding(&spec).await?))
}

#[derive(Deserialize)]
struct SubstituteRequest {
    ingredient: String,
}

#[derive(Serialize)]
struct SubstituteResponse {
    substitutions: &'static [&'static str],
}

async fn substitute(Json(request): Json<SubstituteRequest>) -> Result<Json<SubstituteResponse>, ApiError> {
    let substitutions = suggest_substitutions(&request.ingredient);
    if substitutions.is_empty() {
        return Err(ApiError {
            status: StatusCode::NOT_FOUND,
            kind: "not_found",
            message: "No substitutions found.".into(),
        });
    }
    Ok(Json(SubstituteResponse { substitutions }))
}

#[derive(Serialize)]
struct ReloadResponse {
    generation: u64,
    corpus_size: usize,
}

async fn reload(State(state): State<AppState>) -> Result<Json<ReloadResponse>, ApiError> {
    let handle = Arc::clone(state.recommender.corpus());
    let paths = Arc::clone(&state.corpus_paths);
    let generation = tokio::task::spawn_blocking(move || handle.reload(&paths))
        .await
        .map_err(|e| EngineError::load(format!("reload task failed: {e}")))??;

    let corpus_size = state.recommender.corpus().snapshot().size();
    Ok(Json(ReloadResponse {
        generation,
        corpus_size,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use crate::corpus::{Corpus, RecipeRecord};
    use axum::body::Body;
    use axum::http::Request;
    use ndarray::array;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        let corpus = Corpus::new(
            vec![
                RecipeRecord::new("Bruschetta", "['tomato', 'garlic']", "['toast']", "tomato garlic"),
                RecipeRecord::new("Caprese", "['tomato', 'basil']", "['slice']", "tomato basil cheese"),
            ],
            array![[1.0, 0.0], [0.0, 1.0]],
        )
        .unwrap();
        let metrics = Metrics::new();
        let cache = ResponseCache::new(Arc::new(MemoryStore::new()), metrics.clone(), "test");
        AppState {
            recommender: Recommender::new(Arc::new(CorpusHandle::new(corpus)), cache, metrics),
            corpus_paths: Arc::new(CorpusPaths {
                recipes: "/nonexistent/recipes.csv".into(),
                embeddings: "/nonexistent/embeddings.npy".into(),
            }),
            default_top_n: 3,
        }
    }

    async fn post_json(router: Router, uri: &str, body: &str) -> (StatusCode, serde_json::Value) {
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null))
    }

    #[tokio::test]
    async fn recommend_filters_by_ingredient() {
        let (status, body) = post_json(
            router(test_state()),
            "/recommend",
            r#"{"ingredients": "tomato", "preferences": ["cheese"]}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["title"], "Caprese");
        assert_eq!(body[0]["ingredients"][1], "basil");
    }

    #[tokio::test]
    async fn missing_top_n_uses_configured_default() {
        let state = AppState {
            default_top_n: 1,
            ..test_state()
        };
        let (status, body) =
            post_json(router(state), "/recommend", r#"{"ingredients": "tomato"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["title"], "Bruschetta");

        let (_, body) = post_json(
            router(test_state()),
            "/recommend",
            r#"{"ingredients": "tomato", "top_n": 5}"#,
        )
        .await;
        assert_eq!(body.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn invalid_top_n_is_bad_request() {
        let (status, body) =
            post_json(router(test_state()), "/recommend", r#"{"top_n": 0}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "invalid_argument");
    }

    #[tokio::test]
    async fn embedding_without_provider_is_unavailable() {
        let (status, body) = post_json(
            router(test_state()),
            "/recommend_by_embedding",
            r#"{"ingredients": "tomato"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["kind"], "embedding_unavailable");
    }

    #[tokio::test]
    async fn substitute_known_and_unknown() {
        let (status, body) =
            post_json(router(test_state()), "/substitute", r#"{"ingredient": "Butter"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["substitutions"][0], "avocado");

        let (status, _) =
            post_json(router(test_state()), "/substitute", r#"{"ingredient": "saffron"}"#).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn failed_reload_keeps_serving_old_corpus() {
        let state = test_state();
        let (status, body) = post_json(router(state.clone()), "/reload", "").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["kind"], "data_load");
        assert_eq!(state.recommender.corpus().snapshot().size(), 2);
        assert_eq!(state.recommender.corpus().snapshot().generation(), 1);
    }

    #[tokio::test]
    async fn requests_are_counted_and_exposed() {
        let state = test_state();
        let app = router(state.clone());
        let _ = post_json(app.clone(), "/recommend", r#"{"ingredients": "garlic"}"#).await;

        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        let request_line = text
            .lines()
            .find(|l| l.starts_with("api_requests_total{") && l.contains("endpoint=\"/recommend\""))
            .unwrap();
        assert!(request_line.contains("http_status=\"200\""));
        assert!(request_line.ends_with(" 1"));
        assert!(text.contains("cache_misses_total{operation=\"recommend\"} 1"));
    }
}
