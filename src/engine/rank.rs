use std::cmp::Ordering;

use ndarray::ArrayView1;

use crate::corpus::{Corpus, RecipeRecord};
use crate::error::EngineError;

/// Cosine similarity. Returns 0.0 when either vector has zero norm or the
/// lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let a = ArrayView1::from(a);
    let b = ArrayView1::from(b);
    let norm_a = a.dot(&a).sqrt();
    let norm_b = b.dot(&b).sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        a.dot(&b) / (norm_a * norm_b)
    }
}

/// Top-`top_n` records by cosine similarity to `query`, best first.
///
/// Equal scores are ordered by ascending corpus index. A `top_n` above the
/// corpus size returns every record.
pub fn rank<'c>(
    corpus: &'c Corpus,
    query: &[f32],
    top_n: usize,
) -> Result<Vec<(&'c RecipeRecord, f32)>, EngineError> {
    if top_n == 0 {
        return Err(EngineError::invalid("top_n must be positive"));
    }
    let expected = corpus.embedding_dimension();
    if query.len() != expected {
        return Err(EngineError::DimensionMismatch {
            expected,
            actual: query.len(),
        });
    }
    if query.iter().any(|x| !x.is_finite()) {
        return Err(EngineError::invalid("query vector contains non-finite values"));
    }

    let mut scored = scores(corpus, query);
    let keep = top_n.min(scored.len());
    if keep < scored.len() {
        scored.select_nth_unstable_by(keep, by_score_then_index);
        scored.truncate(keep);
    }
    scored.sort_unstable_by(by_score_then_index);

    Ok(scored
        .into_iter()
        .map(|(idx, score)| (&corpus.records()[idx], score))
        .collect())
}

/// Cosine score for every row, paired with its index.
fn scores(corpus: &Corpus, query: &[f32]) -> Vec<(usize, f32)> {
    let query = ArrayView1::from(query);
    let query_norm = query.dot(&query).sqrt();
    let dots = corpus.embeddings().dot(&query);

    dots.iter()
        .zip(corpus.norms().iter())
        .enumerate()
        .map(|(idx, (&dot, &norm))| {
            let score = if query_norm == 0.0 || norm == 0.0 {
                0.0
            } else {
                dot / (norm * query_norm)
            };
            (idx, score)
        })
        .collect()
}

fn by_score_then_index(a: &(usize, f32), b: &(usize, f32)) -> Ordering {
    b.1.total_cmp(&a.1).then(a.0.cmp(&b.0))
}
