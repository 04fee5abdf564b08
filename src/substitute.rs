/// Common swaps for an ingredient, matched case-insensitively. Empty when none are known.
pub fn suggest_substitutions(ingredient: &str) -> &'static [&'static str] {
    match ingredient.trim().to_lowercase().as_str() {
        "butter" => &["avocado", "coconut oil"],
        "milk" => &["almond milk", "soy milk"],
        "sugar" => &["honey", "maple syrup"],
        _ => &[],
    }
}
