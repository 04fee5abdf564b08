#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mise::cache::{CacheError, CacheStore, MemoryStore, ResponseCache};
use mise::corpus::{npy, Corpus, CorpusHandle, CorpusPaths, RecipeRecord};
use mise::embedding::EmbeddingProvider;
use mise::metrics::Metrics;
use mise::recommend::Recommender;
use ndarray::Array2;
use tempfile::TempDir;

/// One CSV row: title, ingredients literal, directions literal, preprocessed blob.
pub type Row<'a> = (&'a str, &'a str, &'a str, &'a str);

/// The three-recipe corpus used across the suites.
pub fn sample_rows() -> Vec<Row<'static>> {
    vec![
        (
            "Caprese",
            "['2 tomatoes', '1 ball mozzarella', 'basil']",
            "['Slice.', 'Layer.']",
            "tomato mozzarella basil",
        ),
        (
            "Pancakes",
            "['1 cup flour', '1 egg', '1 cup milk']",
            "['Whisk.', 'Fry.']",
            "flour egg milk",
        ),
        (
            "Pizza",
            "['dough', 'tomato sauce', 'cheese']",
            "['Stretch.', 'Top.', 'Bake.']",
            "dough tomato sauce cheese",
        ),
    ]
}

pub fn sample_embeddings() -> Array2<f32> {
    ndarray::array![[1.0, 0.0], [0.0, 1.0], [0.7, 0.7]]
}

/// Write `recipes.csv` and `embeddings.npy` into a temp dir.
pub fn write_corpus(rows: &[Row<'_>], embeddings: &Array2<f32>) -> (TempDir, CorpusPaths) {
    let tmp = TempDir::new().unwrap();
    let paths = CorpusPaths {
        recipes: tmp.path().join("recipes.csv"),
        embeddings: tmp.path().join("embeddings.npy"),
    };
    write_csv(&paths.recipes, rows);
    std::fs::write(&paths.embeddings, npy::encode(embeddings)).unwrap();
    (tmp, paths)
}

pub fn write_csv(path: &Path, rows: &[Row<'_>]) {
    let mut writer = csv::Writer::from_path(path).unwrap();
    writer
        .write_record(["title", "ingredients", "directions", "preprocessed_ingredients"])
        .unwrap();
    for (title, ingredients, directions, blob) in rows {
        writer
            .write_record([*title, *ingredients, *directions, *blob])
            .unwrap();
    }
    writer.flush().unwrap();
}

/// Build a corpus in memory, skipping the filesystem.
pub fn corpus(rows: &[Row<'_>], embeddings: Array2<f32>) -> Corpus {
    let records = rows
        .iter()
        .map(|(title, ingredients, directions, blob)| {
            RecipeRecord::new(*title, *ingredients, *directions, *blob)
        })
        .collect();
    Corpus::new(records, embeddings).unwrap()
}

pub fn sample_corpus() -> Corpus {
    corpus(&sample_rows(), sample_embeddings())
}

/// Embedder that always returns the same vector and counts its calls.
pub struct FixedEmbedder {
    pub vector: Vec<f32>,
    pub calls: AtomicUsize,
}

impl FixedEmbedder {
    pub fn new(vector: Vec<f32>) -> Arc<Self> {
        Arc::new(Self {
            vector,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EmbeddingProvider for FixedEmbedder {
    fn embed(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.vector.clone())
    }

    fn dimensions(&self) -> usize {
        self.vector.len()
    }
}

/// A store whose every call fails, as if the cache server were down.
pub struct DownStore;

#[async_trait]
impl CacheStore for DownStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Err(CacheError::Unavailable("connection refused".into()))
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".into()))
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".into()))
    }
}

/// Recommender over `corpus` with the given store (or no cache).
pub fn recommender(corpus: Corpus, store: Option<Arc<dyn CacheStore>>) -> Recommender {
    let metrics = Metrics::new();
    let cache = match store {
        Some(store) => ResponseCache::new(store, metrics.clone(), "test"),
        None => ResponseCache::disabled(metrics.clone()),
    };
    Recommender::new(Arc::new(CorpusHandle::new(corpus)), cache, metrics)
        .with_ttl(Duration::from_secs(60))
}

/// Recommender over the sample corpus with an in-memory cache.
pub fn cached_recommender() -> (Recommender, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let recommender = recommender(sample_corpus(), Some(store.clone() as Arc<dyn CacheStore>));
    (recommender, store)
}
