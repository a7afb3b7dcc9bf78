//! semsearch CLI - Command-line interface
//!
//! Usage:
//!   semsearch init
//!   semsearch add <id> <text> [--meta key=value]...
//!   semsearch search <query> [--limit N] [--threshold F]
//!   semsearch info
//!   semsearch clear
//!   semsearch embed <text>...
//!   semsearch health

use anyhow::Context;
use clap::{Parser, Subcommand};
use semsearch_core::{AppConfig, LoggingConfig, Metadata, MetadataValue, SearchParams};
use semsearch_vector::{
    create_embedding_client, EmbeddingGenerator, QdrantIndex, VectorStoreManager,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "semsearch")]
#[command(about = "Semantic product search over Qdrant")]
#[command(version)]
struct Cli {
    /// Path to a TOML config file (environment variables take precedence)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the products collection if missing
    Init,
    /// Embed and store a product
    Add {
        /// Product identifier
        id: String,
        /// Product description
        text: String,
        /// Extra metadata as key=value
        #[arg(long = "meta", value_parser = parse_metadata)]
        metadata: Vec<(String, MetadataValue)>,
    },
    /// Search for similar products
    Search {
        /// Query text
        query: String,
        /// Maximum number of results
        #[arg(long)]
        limit: Option<u64>,
        /// Minimum similarity score
        #[arg(long)]
        threshold: Option<f32>,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show collection information
    Info,
    /// Delete and recreate the products collection
    Clear,
    /// Generate embeddings for one or more texts
    Embed {
        #[arg(required = true)]
        texts: Vec<String>,
    },
    /// Check that the embedding model responds
    Health,
}

fn parse_metadata(raw: &str) -> Result<(String, MetadataValue), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{raw}`"))?;
    if key.is_empty() {
        return Err(format!("empty metadata key in `{raw}`"));
    }
    let value = match value.parse::<MetadataValue>() {
        Ok(v) => v,
        Err(never) => match never {},
    };
    Ok((key.to_string(), value))
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::from_file(path)?.with_env_override()?,
        None => AppConfig::from_env()?,
    };
    Ok(config)
}

fn init_tracing(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "semsearch={0},semsearch_vector={0}",
            config.level
        ))
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_writer(std::io::stderr);

    if config.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config).context("Failed to load configuration")?;
    init_tracing(&config.logging);

    let client = create_embedding_client(&config.embedding)?;
    let embeddings = EmbeddingGenerator::new(client);
    let index = QdrantIndex::new(&config.qdrant)?;
    let manager = VectorStoreManager::new(Arc::new(index), embeddings);

    match cli.command {
        Commands::Init => {
            manager.initialize_collection().await?;
            println!("Collection `{}` ready", manager.collection().name);
        }
        Commands::Add { id, text, metadata } => {
            let metadata: Metadata = metadata.into_iter().collect();
            manager.add_document(&id, &text, Some(metadata)).await?;
            println!("Indexed product {id}");
        }
        Commands::Search {
            query,
            limit,
            threshold,
            json,
        } => {
            let params = SearchParams::default()
                .with_limit(limit.unwrap_or(config.search.limit))
                .with_score_threshold(threshold.unwrap_or(config.search.score_threshold));

            let results = manager.search_similar(&query, params).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else if results.is_empty() {
                println!("No products matched `{query}`");
            } else {
                for (rank, result) in results.iter().enumerate() {
                    println!(
                        "{}. [{:.4}] {} - {}",
                        rank + 1,
                        result.score,
                        result.id,
                        result.product_text().unwrap_or("")
                    );
                }
            }
        }
        Commands::Info => {
            let info = manager.get_collection_info().await?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        Commands::Clear => {
            manager.clear_collection().await?;
            println!("Collection `{}` cleared", manager.collection().name);
        }
        Commands::Embed { texts } => {
            let embeddings = manager
                .embeddings()
                .generate_embeddings_batch(texts.iter().cloned())
                .await?;
            for text in &texts {
                match embeddings.get(text) {
                    Some(vector) => println!("{} dims  {text}", vector.len()),
                    None => println!("no embedding  {text}"),
                }
            }
        }
        Commands::Health => {
            if manager.embeddings().check_availability().await {
                println!("Embedding model available");
            } else {
                tracing::error!("Embedding model unavailable");
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_metadata() {
        assert_eq!(
            parse_metadata("price=19.99").unwrap(),
            ("price".to_string(), MetadataValue::Float(19.99))
        );
        assert_eq!(
            parse_metadata("note=a=b").unwrap(),
            ("note".to_string(), MetadataValue::String("a=b".to_string()))
        );
        assert!(parse_metadata("missing").is_err());
        assert!(parse_metadata("=value").is_err());
    }

    #[test]
    fn test_cli_parses_search() {
        let cli = Cli::try_parse_from([
            "semsearch",
            "search",
            "shirt",
            "--limit",
            "1",
            "--threshold",
            "0.0",
        ])
        .unwrap();

        match cli.command {
            Commands::Search {
                query,
                limit,
                threshold,
                json,
            } => {
                assert_eq!(query, "shirt");
                assert_eq!(limit, Some(1));
                assert_eq!(threshold, Some(0.0));
                assert!(!json);
            }
            _ => panic!("expected search command"),
        }
    }

    #[test]
    fn test_cli_parses_metadata_flags() {
        let cli = Cli::try_parse_from([
            "semsearch",
            "add",
            "p1",
            "red cotton t-shirt",
            "--meta",
            "brand=acme",
            "--meta",
            "in_stock=true",
        ])
        .unwrap();

        match cli.command {
            Commands::Add { id, metadata, .. } => {
                assert_eq!(id, "p1");
                assert_eq!(metadata.len(), 2);
                assert_eq!(metadata[1].1, MetadataValue::Bool(true));
            }
            _ => panic!("expected add command"),
        }
    }
}
