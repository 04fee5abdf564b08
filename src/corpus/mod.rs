//! The recipe corpus: records paired 1:1 with embedding rows.
//!
//! A [`Corpus`] is built once (from disk via [`load`], or in memory via
//! [`Corpus::new`]) and never mutated. [`CorpusHandle`] holds the process-wide
//! snapshot; a reload builds a fresh corpus and swaps the pointer, so readers
//! that already took a snapshot keep using it until they drop it.

pub mod literal;
pub mod npy;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use ndarray::{Array1, Array2, Axis};

use crate::error::EngineError;
use literal::{parse_list_literal, preprocess_ingredients};

/// A single recipe row. Ingredient and direction lists are kept in their
/// serialized form and parsed on demand.
#[derive(Debug, Clone)]
pub struct RecipeRecord {
    /// Row index in the corpus (and in the embedding matrix).
    pub id: usize,
    pub title: String,
    ingredients_raw: String,
    directions_raw: String,
    preprocessed_ingredients: String,
    folded: String,
}

impl RecipeRecord {
    /// Build a record from serialized list fields. The id is assigned when the
    /// record is placed into a [`Corpus`].
    pub fn new(
        title: impl Into<String>,
        ingredients_raw: impl Into<String>,
        directions_raw: impl Into<String>,
        preprocessed_ingredients: impl Into<String>,
    ) -> Self {
        let preprocessed_ingredients = preprocessed_ingredients.into();
        Self {
            id: 0,
            title: title.into(),
            ingredients_raw: ingredients_raw.into(),
            directions_raw: directions_raw.into(),
            folded: preprocessed_ingredients.to_lowercase(),
            preprocessed_ingredients,
        }
    }

    /// Parsed ingredient list.
    pub fn ingredients(&self) -> Result<Vec<String>, EngineError> {
        parse_list_literal(&self.ingredients_raw).map_err(|e| {
            EngineError::DataFormat(format!("recipe {} ingredients: {e}", self.id))
        })
    }

    /// Parsed direction steps.
    pub fn directions(&self) -> Result<Vec<String>, EngineError> {
        parse_list_literal(&self.directions_raw).map_err(|e| {
            EngineError::DataFormat(format!("recipe {} directions: {e}", self.id))
        })
    }

    /// The blob substring filters run against.
    pub fn preprocessed_ingredients(&self) -> &str {
        &self.preprocessed_ingredients
    }

    /// Lowercased copy of the preprocessed blob.
    pub(crate) fn folded_ingredients(&self) -> &str {
        &self.folded
    }
}

/// Immutable records + embedding matrix.
#[derive(Debug)]
pub struct Corpus {
    records: Vec<RecipeRecord>,
    embeddings: Array2<f32>,
    norms: Array1<f32>,
    generation: u64,
}

impl Corpus {
    /// Pair records with their embedding rows. Fails if the row counts differ
    /// or any embedding value is NaN or infinite.
    pub fn new(mut records: Vec<RecipeRecord>, embeddings: Array2<f32>) -> Result<Self, EngineError> {
        if records.len() != embeddings.nrows() {
            return Err(EngineError::load(format!(
                "{} recipes but {} embedding rows",
                records.len(),
                embeddings.nrows()
            )));
        }
        if let Some(row) = embeddings
            .outer_iter()
            .position(|row| row.iter().any(|x| !x.is_finite()))
        {
            return Err(EngineError::load(format!(
                "embedding row {row} contains non-finite values"
            )));
        }
        for (i, record) in records.iter_mut().enumerate() {
            record.id = i;
        }
        let norms = embeddings.map_axis(Axis(1), |row| row.dot(&row).sqrt());
        Ok(Self {
            records,
            embeddings,
            norms,
            generation: 0,
        })
    }

    pub fn size(&self) -> usize {
        self.records.len()
    }

    pub fn embedding_dimension(&self) -> usize {
        self.embeddings.ncols()
    }

    pub fn records(&self) -> &[RecipeRecord] {
        &self.records
    }

    pub fn record(&self, id: usize) -> Option<&RecipeRecord> {
        self.records.get(id)
    }

    pub fn embeddings(&self) -> &Array2<f32> {
        &self.embeddings
    }

    /// Precomputed L2 norm of every embedding row.
    pub fn norms(&self) -> &Array1<f32> {
        &self.norms
    }

    /// Installation counter assigned by [`CorpusHandle`]; 0 if never installed.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Locations of the two corpus artifacts.
#[derive(Debug, Clone)]
pub struct CorpusPaths {
    /// CSV with `title`, `ingredients`, `directions` and optionally
    /// `preprocessed_ingredients` columns.
    pub recipes: PathBuf,
    /// `.npy` matrix, one row per CSV row.
    pub embeddings: PathBuf,
}

/// Load and validate a corpus from disk.
///
/// Fails with [`EngineError::DataLoad`] if either file is unreadable, the row
/// counts differ, or any ingredient/direction field does not parse.
pub fn load(paths: &CorpusPaths) -> Result<Corpus, EngineError> {
    let records = read_recipes(&paths.recipes)?;
    let embeddings = npy::read_matrix(&paths.embeddings)?;

    if records.len() != embeddings.nrows() {
        return Err(EngineError::load(format!(
            "{} has {} rows but {} has {}",
            paths.recipes.display(),
            records.len(),
            paths.embeddings.display(),
            embeddings.nrows()
        )));
    }

    for (row, record) in records.iter().enumerate() {
        for raw in [&record.ingredients_raw, &record.directions_raw] {
            parse_list_literal(raw).map_err(|e| {
                EngineError::load(format!("{} row {row}: {e}", paths.recipes.display()))
            })?;
        }
    }

    let corpus = Corpus::new(records, embeddings)?;
    tracing::info!(
        records = corpus.size(),
        dimension = corpus.embedding_dimension(),
        recipes = %paths.recipes.display(),
        "corpus loaded"
    );
    Ok(corpus)
}

fn read_recipes(path: &Path) -> Result<Vec<RecipeRecord>, EngineError> {
    let csv_err = |e: csv::Error| EngineError::load(format!("{}: {e}", path.display()));

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(csv_err)?;

    let headers = reader.headers().map_err(csv_err)?.clone();
    let column = |name: &str| headers.iter().position(|h| h.trim() == name);
    let required = |name: &str| {
        column(name).ok_or_else(|| {
            EngineError::load(format!("{} is missing column '{name}'", path.display()))
        })
    };
    let title = required("title")?;
    let ingredients = required("ingredients")?;
    let directions = required("directions")?;
    let preprocessed = column("preprocessed_ingredients");

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(csv_err)?;
        let field = |idx: usize| row.get(idx).unwrap_or_default();

        let ingredients_raw = field(ingredients);
        let blob = match preprocessed.map(field) {
            Some(blob) if !blob.is_empty() => blob.to_string(),
            _ => derive_blob(ingredients_raw),
        };
        records.push(RecipeRecord::new(
            field(title),
            ingredients_raw,
            field(directions),
            blob,
        ));
    }
    Ok(records)
}

fn derive_blob(ingredients_raw: &str) -> String {
    match parse_list_literal(ingredients_raw) {
        Ok(items) => preprocess_ingredients(&items.join(" ")),
        Err(_) => preprocess_ingredients(ingredients_raw),
    }
}

/// Process-wide, atomically swappable corpus reference.
pub struct CorpusHandle {
    current: ArcSwap<Corpus>,
    generations: AtomicU64,
}

impl CorpusHandle {
    /// Install the initial corpus as generation 1.
    pub fn new(corpus: Corpus) -> Self {
        let generations = AtomicU64::new(1);
        let corpus = Corpus {
            generation: 1,
            ..corpus
        };
        Self {
            current: ArcSwap::from_pointee(corpus),
            generations,
        }
    }

    /// The corpus new requests should read.
    pub fn snapshot(&self) -> Arc<Corpus> {
        self.current.load_full()
    }

    /// Install `corpus` and return its generation.
    pub fn replace(&self, corpus: Corpus) -> u64 {
        let generation = self.generations.fetch_add(1, Ordering::SeqCst) + 1;
        self.current.store(Arc::new(Corpus {
            generation,
            ..corpus
        }));
        tracing::info!(generation, records = self.current.load().size(), "corpus swapped");
        generation
    }

    /// Load from disk and swap in. On failure the current corpus stays installed.
    pub fn reload(&self, paths: &CorpusPaths) -> Result<u64, EngineError> {
        let corpus = load(paths)?;
        Ok(self.replace(corpus))
    }
}
