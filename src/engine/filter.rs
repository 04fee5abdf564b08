use crate::corpus::{Corpus, RecipeRecord};

/// Select records whose preprocessed ingredients contain `ingredients` and
/// every entry of `preferences`, compared case-insensitively.
///
/// `None` places no constraint. `Some("")` matches every record, as does an
/// empty preference string. Results keep corpus order.
pub fn filter<'c>(
    corpus: &'c Corpus,
    ingredients: Option<&str>,
    preferences: Option<&[String]>,
) -> Vec<&'c RecipeRecord> {
    let mut needles: Vec<String> = Vec::new();
    if let Some(ingredients) = ingredients {
        needles.push(ingredients.to_lowercase());
    }
    if let Some(preferences) = preferences {
        needles.extend(preferences.iter().map(|p| p.to_lowercase()));
    }

    corpus
        .records()
        .iter()
        .filter(|record| {
            let blob = record.folded_ingredients();
            needles.iter().all(|needle| blob.contains(needle.as_str()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::RecipeRecord;
    use ndarray::Array2;

    fn corpus(blobs: &[&str]) -> Corpus {
        let records = blobs
            .iter()
            .enumerate()
            .map(|(i, blob)| RecipeRecord::new(format!("recipe {i}"), "[]", "[]", *blob))
            .collect();
        Corpus::new(records, Array2::zeros((blobs.len(), 2))).unwrap()
    }

    fn ids(records: &[&RecipeRecord]) -> Vec<usize> {
        records.iter().map(|r| r.id).collect()
    }

    #[test]
    fn no_constraints_returns_everything_in_order() {
        let c = corpus(&["b", "a", "c"]);
        assert_eq!(ids(&filter(&c, None, None)), vec![0, 1, 2]);
    }

    #[test]
    fn ingredients_and_preferences_compose() {
        let c = corpus(&["tomato garlic", "tomato basil cheese", "onion garlic"]);
        let prefs = vec!["cheese".to_string()];
        assert_eq!(ids(&filter(&c, Some("tomato"), Some(prefs.as_slice()))), vec![1]);
        assert_eq!(ids(&filter(&c, Some("garlic"), None)), vec![0, 2]);
        assert_eq!(ids(&filter(&c, None, Some(prefs.as_slice()))), vec![1]);
    }

    #[test]
    fn matching_ignores_case() {
        let c = corpus(&["Tomato Garlic", "onion"]);
        assert_eq!(ids(&filter(&c, Some("TOMATO"), None)), vec![0]);
    }

    #[test]
    fn empty_string_passes_everything_through() {
        let c = corpus(&["tomato", "onion"]);
        assert_eq!(ids(&filter(&c, Some(""), None)), vec![0, 1]);
        let prefs = vec![String::new()];
        assert_eq!(ids(&filter(&c, None, Some(prefs.as_slice()))), vec![0, 1]);
    }

    #[test]
    fn preferences_only_narrow() {
        let c = corpus(&["tomato garlic", "tomato basil cheese", "tomato cheese", "onion"]);
        let base = ids(&filter(&c, Some("tomato"), None));
        for prefs in [vec!["cheese"], vec!["cheese", "basil"], vec!["garlic"], vec!["nothing"]] {
            let prefs: Vec<String> = prefs.into_iter().map(String::from).collect();
            let narrowed = ids(&filter(&c, Some("tomato"), Some(prefs.as_slice())));
            assert!(narrowed.iter().all(|id| base.contains(id)));
        }
        let prefs = vec!["basil".to_string(), "cheese".to_string()];
        let reversed = vec!["cheese".to_string(), "basil".to_string()];
        assert_eq!(
            filter(&c, Some("tomato"), Some(prefs.as_slice())).len(),
            filter(&c, Some("tomato"), Some(reversed.as_slice())).len()
        );
    }
}
