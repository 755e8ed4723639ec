use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use montaigne::api::{self, AppState};
use montaigne::config::Settings;
use montaigne::db::Store;
use montaigne::fetch::Fetcher;
use montaigne::ingest::Ingestor;
use montaigne::parser::extract_html;
use montaigne::Document;
use rayon::prelude::*;
use tracing::info;

#[derive(Parser)]
#[command(name = "montaigne", about = "Extract titled sections from web pages and serve them")]
struct Cli {
    /// Settings file (default: ./montaigne.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// SQLite database path, overrides settings
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the source API
    Serve {
        /// Address to listen on, overrides settings
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Fetch, extract and store one or more pages
    Ingest {
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// Extract local HTML files and print the documents as JSON
    Extract {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(long)]
        pretty: bool,
    },
    /// List stored titles
    Titles,
    /// Print the stored source with this title
    Show { title: String },
    /// Delete the stored source with this title
    Delete { title: String },
    /// Show storage statistics
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let mut settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;
    if let Some(db) = cli.db {
        settings.database_path = db;
    }

    let result = match cli.command {
        Commands::Serve { bind } => {
            let store = Arc::new(open_store(&settings)?);
            let ingestor = Ingestor::new(Fetcher::new(&settings.fetch)?, settings.extract.clone());
            let app = api::router(AppState { store, ingestor });

            let addr = bind.unwrap_or_else(|| settings.bind_addr.clone());
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("Failed to bind {}", addr))?;
            info!("listening on {}", addr);
            axum::serve(listener, app).await.context("Server error")?;
            Ok(())
        }
        Commands::Ingest { urls } => {
            let store = Arc::new(open_store(&settings)?);
            let ingestor = Ingestor::new(Fetcher::new(&settings.fetch)?, settings.extract.clone());
            println!("Ingesting {} pages...", urls.len());
            let stats = ingestor
                .ingest_many(store, urls, settings.ingest.concurrency)
                .await?;
            println!(
                "Done: {} pages ({} ok, {} errors).",
                stats.total, stats.ok, stats.errors
            );
            Ok(())
        }
        Commands::Extract { files, pretty } => {
            let results: Vec<_> = files
                .par_iter()
                .map(|path| extract_file(path, &settings))
                .collect();
            for doc in results {
                let doc = doc?;
                let json = if pretty {
                    serde_json::to_string_pretty(&doc)?
                } else {
                    serde_json::to_string(&doc)?
                };
                println!("{}", json);
            }
            Ok(())
        }
        Commands::Titles => {
            let titles = open_store(&settings)?.titles()?;
            if titles.is_empty() {
                println!("No sources stored. Run 'ingest' first.");
            }
            for title in titles {
                println!("{}", title);
            }
            Ok(())
        }
        Commands::Show { title } => {
            let doc = open_store(&settings)?.source(&title)?;
            println!("{}", serde_json::to_string_pretty(&doc)?);
            Ok(())
        }
        Commands::Delete { title } => {
            open_store(&settings)?.delete(&title)?;
            println!("Deleted '{}'.", title);
            Ok(())
        }
        Commands::Stats => {
            let s = open_store(&settings)?.stats()?;
            println!("Sources:    {}", s.sources);
            println!("Sections:   {}", s.sections);
            println!("Paragraphs: {}", s.paragraphs);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn open_store(settings: &Settings) -> anyhow::Result<Store> {
    Store::open(&settings.database_path)
        .with_context(|| format!("Failed to open {:?}", settings.database_path))
}

fn extract_file(path: &Path, settings: &Settings) -> anyhow::Result<Document> {
    let file = std::fs::File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let url = format!("file://{}", path.display());
    let doc = extract_html(std::io::BufReader::new(file), &url, &settings.extract)
        .with_context(|| format!("Failed to read {:?}", path))?;
    Ok(doc)
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
