mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use mise::config::MiseConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mise", version, about = "Recipe recommendation engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP API
    Serve,
    /// Recommend recipes from the terminal
    Recommend {
        /// Ingredients to match (or embed, with --embedding)
        ingredients: String,
        /// Extra ingredients every result must contain (repeatable)
        #[arg(long = "prefer")]
        preferences: Vec<String>,
        /// Number of results
        #[arg(long)]
        top_n: Option<i64>,
        /// Rank by embedding similarity instead of substring filtering
        #[arg(long)]
        embedding: bool,
    },
    /// Print corpus and collaborator status
    Inspect,
    /// Manage the embedding model
    Model {
        #[command(subcommand)]
        action: ModelAction,
    },
}

#[derive(Subcommand)]
enum ModelAction {
    /// Download the embedding model to the configured cache directory
    Download,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = MiseConfig::load()?;

    // Log to stderr so stdout stays clean for command output.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve => mise::server::serve(config).await?,
        Command::Recommend {
            ingredients,
            preferences,
            top_n,
            embedding,
        } => {
            let request = cli::recommend::Request {
                ingredients,
                preferences,
                top_n: top_n.unwrap_or(config.retrieval.default_top_n),
                embedding,
            };
            cli::recommend::recommend(&config, request).await?;
        }
        Command::Inspect => cli::inspect::inspect(&config).await?,
        Command::Model { action } => match action {
            ModelAction::Download => cli::model_download(&config.embedding).await?,
        },
    }

    Ok(())
}
