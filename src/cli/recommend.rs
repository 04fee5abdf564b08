use anyhow::Result;
use mise::config::MiseConfig;
use mise::recommend::{QuerySpec, RecipeView};

pub struct Request {
    pub ingredients: String,
    pub preferences: Vec<String>,
    pub top_n: i64,
    pub embedding: bool,
}

/// Run one recommendation from the terminal and print the results.
pub async fn recommend(config: &MiseConfig, request: Request) -> Result<()> {
    let recommender = mise::server::build_recommender(config).await?;

    let spec = QuerySpec {
        ingredients: Some(request.ingredients),
        preferences: (!request.preferences.is_empty()).then_some(request.preferences),
        top_n: request.top_n,
    };

    if request.embedding {
        let results = recommender.recommend_by_embedding(&spec).await?;
        if results.is_empty() {
            println!("No results found.");
            return Ok(());
        }
        println!("Found {} recipe(s)\n", results.len());
        for (i, scored) in results.iter().enumerate() {
            print_recipe(i, &scored.recipe, Some(scored.score));
        }
    } else {
        let results = recommender.recommend(&spec).await?;
        if results.is_empty() {
            println!("No results found.");
            return Ok(());
        }
        println!("Found {} recipe(s)\n", results.len());
        for (i, recipe) in results.iter().enumerate() {
            print_recipe(i, recipe, None);
        }
    }

    Ok(())
}

fn print_recipe(i: usize, recipe: &RecipeView, score: Option<f32>) {
    match score {
        Some(score) => println!("  {}. {} (score: {:.4})", i + 1, recipe.title, score),
        None => println!("  {}. {}", i + 1, recipe.title),
    }

    let ingredients = recipe.ingredients.join(", ");
    let preview = match ingredients.char_indices().nth(120) {
        Some((cut, _)) => format!("{}...", &ingredients[..cut]),
        None => ingredients,
    };
    println!("     {preview}");
    println!("     {} step(s)", recipe.directions.len());
    println!();
}
