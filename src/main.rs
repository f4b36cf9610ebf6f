use clap::{Parser, Subcommand};
use local_rag::Result;
use local_rag::chunker::ChunkingConfig;
use local_rag::commands;
use local_rag::config::{Config, ConfigError, run_interactive_config, show_config};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "local-rag")]
#[command(about = "Retrieval-augmented question answering over scraped documents with a local Ollama model")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure Ollama connection and generation settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Fetch the pages listed in a URL file and store their text
    Scrape {
        /// File with one URL per line
        #[arg(long)]
        urls: PathBuf,
        /// Where to write one text file per page
        #[arg(long, default_value = "data/raw")]
        out_dir: PathBuf,
        /// Render pages with a headless browser when a plain fetch fails
        #[arg(long)]
        browser: bool,
    },
    /// Split a text document into overlapping word chunks
    Chunk {
        #[arg(long, default_value = "knowledge_base/loan_data.txt")]
        input: PathBuf,
        #[arg(long, default_value = "knowledge_base/chunks.json")]
        out_json: PathBuf,
        /// Words per chunk
        #[arg(long)]
        chunk_size: Option<usize>,
        /// Words shared by consecutive chunks
        #[arg(long)]
        overlap: Option<usize>,
    },
    /// Embed chunks and write the vector index
    Build {
        #[arg(long, default_value = "knowledge_base/chunks.json")]
        chunks: PathBuf,
        #[arg(long, default_value = "vector_store")]
        out_dir: PathBuf,
        /// Embedding model to use instead of the configured one. The index
        /// takes the dimension this model produces.
        #[arg(long)]
        model: Option<String>,
    },
    /// Answer questions interactively
    Ask {
        #[arg(long, default_value = "vector_store")]
        index_dir: PathBuf,
        /// Generation model to use instead of the configured one
        #[arg(long)]
        model: Option<String>,
        /// Embedding model the index was built with, if not the configured one
        #[arg(long)]
        embed_model: Option<String>,
        /// Number of chunks to retrieve per question
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Answer a single question
    Query {
        question: String,
        #[arg(long, default_value = "vector_store")]
        index_dir: PathBuf,
        /// Generation model to use instead of the configured one
        #[arg(long)]
        model: Option<String>,
        /// Embedding model the index was built with, if not the configured one
        #[arg(long)]
        embed_model: Option<String>,
        /// Number of chunks to retrieve
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Copy the index and derived chunk files into a processed-data folder
    Export {
        #[arg(long, default_value = "vector_store")]
        index_dir: PathBuf,
        #[arg(long, default_value = "data_processed")]
        out_dir: PathBuf,
    },
}

/// Apply per-run overrides of the generation model and retrieval depth
fn query_config(model: Option<String>, top_k: Option<usize>) -> Result<Config> {
    let mut config = Config::load_default()?;
    if let Some(model) = model {
        config.ollama.set_generation_model(model)?;
    }
    if let Some(top_k) = top_k {
        config.retrieval.top_k = top_k;
    }
    config.validate()?;
    Ok(config)
}

/// Reject an empty embedding model override
fn embedding_model(model: Option<String>) -> Result<Option<String>> {
    match model {
        Some(model) if model.trim().is_empty() => Err(ConfigError::InvalidModel(model).into()),
        model => Ok(model),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                run_interactive_config()?;
            }
        }
        Commands::Scrape {
            urls,
            out_dir,
            browser,
        } => {
            let config = Config::load_default()?;
            commands::scrape(&config, &urls, &out_dir, browser).await?;
        }
        Commands::Chunk {
            input,
            out_json,
            chunk_size,
            overlap,
        } => {
            let defaults = Config::load_default()?.chunking;
            let chunking = ChunkingConfig::new(
                chunk_size.unwrap_or(defaults.chunk_size),
                overlap.unwrap_or(defaults.overlap),
            )?;
            commands::chunk(&input, &out_json, &chunking)?;
        }
        Commands::Build {
            chunks,
            out_dir,
            model,
        } => {
            let config = Config::load_default()?;
            let model = embedding_model(model)?;
            commands::build(&config, &chunks, &out_dir, model.as_deref()).await?;
        }
        Commands::Ask {
            index_dir,
            model,
            embed_model,
            top_k,
        } => {
            let config = query_config(model, top_k)?;
            let embed_model = embedding_model(embed_model)?;
            commands::ask(&config, &index_dir, embed_model.as_deref()).await?;
        }
        Commands::Query {
            question,
            index_dir,
            model,
            embed_model,
            top_k,
        } => {
            let config = query_config(model, top_k)?;
            let embed_model = embedding_model(embed_model)?;
            commands::query(&config, &index_dir, &question, embed_model.as_deref()).await?;
        }
        Commands::Export { index_dir, out_dir } => {
            commands::export(&index_dir, &out_dir)?;
        }
    }

    Ok(())
}
