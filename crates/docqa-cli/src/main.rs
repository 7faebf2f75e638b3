//! docqa CLI - ask questions about a local document set.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use docqa_core::{DocqaConfig, Result};
use docqa_service::{AskRequest, DocqaService, SearchRequest};

/// docqa - grounded question answering over your documents
#[derive(Parser)]
#[command(name = "docqa")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (default: user config dir, then ./docqa.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Index file, overriding the configuration
    #[arg(short, long, global = true)]
    store: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index files or directories (.txt, .md, .markdown)
    Ingest {
        /// Files or directories to index
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Answer a question from the indexed documents
    Ask {
        question: String,

        /// Number of passages given to the model [default: retrieval.default_top_k]
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Sampling temperature [default: generation.temperature]
        #[arg(long)]
        temperature: Option<f32>,

        /// Answer length limit [default: generation.max_tokens]
        #[arg(long)]
        max_tokens: Option<u32>,
    },

    /// Show the passages retrieved for a query
    Search {
        query: String,

        /// Maximum number of results [default: retrieval.default_top_k]
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// List indexed files
    Sources,

    /// Show index and model status
    Health,
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn load_config(cli: &Cli) -> Result<DocqaConfig> {
    let mut config = match &cli.config {
        Some(path) => DocqaConfig::load(path)?,
        None => DocqaConfig::load_default()?,
    };
    config.apply_env_overrides()?;

    if let Some(store) = &cli.store {
        config.store.path = store.clone();
    }
    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error [{}]: {}", e.error_code(), e);
        std::process::exit(1);
    }

    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    let service = DocqaService::open(config)?;

    match cli.command {
        Commands::Ingest { paths } => {
            let report = service.ingest_paths(&paths).await?;
            if cli.json {
                return print_json(&report);
            }
            for file in &report.indexed_files {
                println!("  {} - {} chunks", file.filename, file.chunks);
            }
            println!(
                "\nIndexed {} chunks ({} new)",
                report.total_chunks, report.new_chunks
            );
        }
        Commands::Ask {
            question,
            top_k,
            temperature,
            max_tokens,
        } => {
            let request = AskRequest {
                question,
                top_k,
                temperature,
                max_tokens,
            };
            let response = service.ask(request).await?;
            if cli.json {
                return print_json(&response);
            }
            println!("{}\n", response.answer.trim());
            if !response.context_sources.is_empty() {
                println!("Sources:");
                for source in &response.context_sources {
                    println!("  - {}", source);
                }
            }
            println!(
                "\n({} / {}, {}ms, avg similarity {:.3})",
                response.metadata.provider,
                response.metadata.model,
                response.metadata.latency_ms,
                response.metadata.avg_similarity
            );
        }
        Commands::Search { query, top_k } => {
            let response = service.search(SearchRequest { query, top_k }).await?;
            if cli.json {
                return print_json(&response);
            }
            println!(
                "Found {} results in {}ms:\n",
                response.hits.len(),
                response.latency_ms
            );
            for hit in &response.hits {
                println!("---\n[{}] {} (score: {:.3})", hit.rank, hit.source, hit.score);
                println!("{}\n", hit.content);
            }
        }
        Commands::Sources => {
            let report = service.sources().await?;
            if cli.json {
                return print_json(&report);
            }
            if report.documents.is_empty() {
                println!("No documents indexed.");
                return Ok(());
            }
            for doc in &report.documents {
                println!("- {}: {} chunks", doc.filename, doc.chunks);
            }
            println!("\nTotal: {} chunks", report.total_chunks);
        }
        Commands::Health => {
            let health = service.health().await;
            if cli.json {
                return print_json(&health);
            }
            println!("Status: {}", health.status);
            println!("Index ready: {}", health.vector_index_ready);
            println!("Model: {} ({})", health.model, health.provider);
        }
    }

    Ok(())
}
