//! CLI `inspect` command: load the corpus and report on it and its collaborators.

use anyhow::Result;
use mise::config::MiseConfig;

const SAMPLE_TITLES: usize = 5;

pub async fn inspect(config: &MiseConfig) -> Result<()> {
    let paths = config.corpus_paths();
    let recommender = mise::server::build_recommender(config).await?;
    let corpus = recommender.corpus().snapshot();

    println!("Mise Corpus Report");
    println!("==================");
    println!();
    println!("Recipes file:      {}", paths.recipes.display());
    println!("Embeddings file:   {}", paths.embeddings.display());
    println!("Recipes:           {}", corpus.size());
    println!("Dimension:         {}", corpus.embedding_dimension());
    println!("Generation:        {}", corpus.generation());
    println!();
    println!("Cache:             {}", recommender.cache().health().await.as_str());
    println!("Embedding model:   {} ({})", config.embedding.model, config.embedding.provider);
    if config.embedding.dimensions != corpus.embedding_dimension() {
        println!(
            "  WARNING: model produces {} dims but corpus has {}.",
            config.embedding.dimensions,
            corpus.embedding_dimension()
        );
    }
    println!();

    println!("Sample titles:");
    for record in corpus.records().iter().take(SAMPLE_TITLES) {
        println!("  [{}] {}", record.id, record.title);
    }

    Ok(())
}
