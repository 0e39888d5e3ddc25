//! # Omnivault CLI
//!
//! Multimodal ingestion and cross-modal semantic retrieval.
//!
//! Files are classified, described, embedded into a shared vector space and
//! copied into a content-addressed storage layout; natural-language queries
//! return ranked matches across every modality.
//!
//! ## Commands
//!
//! - `omnivault serve` - Run the HTTP API server
//! - `omnivault ingest <PATHS>...` - Ingest files or directories
//! - `omnivault search <QUERY>` - Query the index
//! - `omnivault state` - Show stored collections and media directories
//!
//! ## Examples
//!
//! ```bash
//! # Ingest a folder of mixed uploads
//! omnivault ingest ~/uploads
//!
//! # Search across everything ingested in this process
//! omnivault search "caching scheme" -k 5
//!
//! # Serve the HTTP API
//! omnivault serve --bind 0.0.0.0:8000
//! ```
//!
//! Configuration comes from the environment; see `VaultConfig`.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use omnivault_core::VaultConfig;
use omnivault_ingest::IngestFile;

mod context;
mod server;
mod state;

use context::AppContext;

#[derive(Parser)]
#[command(name = "omnivault")]
#[command(about = "Multimodal ingestion and cross-modal semantic retrieval")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API server
    Serve {
        /// Bind address
        #[arg(long, default_value = "0.0.0.0:8000")]
        bind: String,
    },

    /// Ingest files or directories
    Ingest {
        /// Files or directories to ingest
        paths: Vec<PathBuf>,

        /// Optional metadata string attached to the batch
        #[arg(short, long)]
        metadata: Option<String>,
    },

    /// Search ingested content
    Search {
        /// Natural-language query
        query: String,

        /// Maximum results
        #[arg(short, long, default_value = "10")]
        k: usize,
    },

    /// Show the current database state
    State,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    let config = VaultConfig::from_env();
    let ctx = Arc::new(AppContext::initialize(config).context("Failed to initialize")?);

    match cli.command {
        Commands::Serve { bind } => {
            server::run_server(ctx, &bind).await?;
        }

        Commands::Ingest { paths, metadata } => {
            if paths.is_empty() {
                anyhow::bail!("No paths given");
            }

            let files = collect_files(&paths)?;
            if files.is_empty() {
                anyhow::bail!("No files found under the given paths");
            }
            info!("Ingesting {} files", files.len());

            let coordinator = ctx.coordinator();
            let report = coordinator.process_batch(&files, metadata.as_deref()).await;

            match cli.format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                }
                OutputFormat::Text => {
                    println!(
                        "Batch {}: {} files ({} media, {} text)",
                        report.batch_id,
                        report.total_files,
                        report.media_count,
                        report.text_count
                    );
                    for result in &report.results {
                        let status = if result.errors.is_empty() {
                            "ok".to_string()
                        } else {
                            format!("{} errors", result.errors.len())
                        };
                        println!(
                            "  {} -> {} [{}] ({} vectors, {status})",
                            result.original_name,
                            result.collection.as_deref().unwrap_or("-"),
                            result.modality,
                            result.embedding_count,
                        );
                        for err in &result.errors {
                            println!("      {}: {}", err.code, err.message);
                        }
                    }
                }
            }
        }

        Commands::Search { query, k } => {
            let response = ctx
                .search_engine()
                .search(&query, k, None)
                .await
                .context("Search failed")?;

            match cli.format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&response)?);
                }
                OutputFormat::Text => {
                    println!("Query: {query} (source: {:?})\n", response.source);
                    if response.results.is_empty() {
                        println!("No results found.");
                    }
                    for (i, hit) in response.results.iter().enumerate() {
                        println!(
                            "{}. {} (score: {:.3}, {})",
                            i + 1,
                            hit.name,
                            hit.similarity,
                            hit.modality
                        );
                        if let Some(path) = &hit.path {
                            println!("   Path: {path}");
                        }
                        println!("   {}", truncate(&hit.description, 120));
                        println!();
                    }
                }
            }
        }

        Commands::State => {
            let state = state::database_state(&ctx).await?;
            match cli.format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&state)?);
                }
                OutputFormat::Text => {
                    println!("Collections ({}):", state.collections.len());
                    for collection in &state.collections {
                        println!("  {collection}");
                    }
                    println!("Media directories ({}):", state.media_directories.len());
                    for dir in &state.media_directories {
                        println!("  {} ({} files)", dir.path, dir.files.len());
                    }
                }
            }
        }
    }

    Ok(())
}

/// Expand files and directories (recursively) into the ingest list.
fn collect_files(paths: &[PathBuf]) -> Result<Vec<IngestFile>> {
    fn visit(path: &PathBuf, out: &mut Vec<IngestFile>) -> Result<()> {
        if path.is_file() {
            out.push(IngestFile::from_path(path.clone()));
        } else if path.is_dir() {
            for entry in std::fs::read_dir(path)
                .with_context(|| format!("Cannot read directory {}", path.display()))?
            {
                let entry = entry?;
                visit(&entry.path(), out)?;
            }
        }
        Ok(())
    }

    let mut files = Vec::new();
    for path in paths {
        if !path.exists() {
            anyhow::bail!("Path does not exist: {}", path.display());
        }
        visit(path, &mut files)?;
    }
    // Deterministic batch order regardless of directory iteration order.
    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

/// Truncate a string for display, adding an ellipsis if needed.
fn truncate(s: &str, max_chars: usize) -> String {
    let flat = s.replace(['\n', '\r'], " ");
    if flat.chars().count() <= max_chars {
        flat
    } else {
        let head: String = flat.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{head}...")
    }
}
