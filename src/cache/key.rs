use std::fmt::Write;

use crate::recommend::QuerySpec;

/// The two cached request kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Recommend,
    RecommendByEmbedding,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Recommend => "recommend",
            Self::RecommendByEmbedding => "recommend_by_embedding",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deterministic, collision-free cache key for a query.
///
/// Layout: `{prefix}:g{generation}:{operation}:i{ingredients}p{preferences}n{top_n}`.
/// Text fields are written as `{byte_len}:{value}` and absent fields as `-`,
/// so a separator inside a value can never be mistaken for a field boundary.
/// Filter queries match case-insensitively, so their text is lowercased first.
pub fn build_key(prefix: &str, generation: u64, op: Operation, spec: &QuerySpec) -> String {
    let normalize = |s: &str| match op {
        Operation::Recommend => s.to_lowercase(),
        Operation::RecommendByEmbedding => s.to_string(),
    };

    let mut key = format!("{prefix}:g{generation}:{op}:i");
    match spec.ingredients.as_deref() {
        Some(text) => push_field(&mut key, &normalize(text)),
        None => key.push('-'),
    }
    key.push('p');
    match spec.preferences.as_deref() {
        Some(prefs) => {
            let _ = write!(key, "{}", prefs.len());
            for pref in prefs {
                key.push('|');
                push_field(&mut key, &normalize(pref));
            }
        }
        None => key.push('-'),
    }
    let _ = write!(key, "n{}", spec.top_n);
    key
}

fn push_field(key: &mut String, value: &str) {
    let _ = write!(key, "{}:{value}", value.len());
}
