//! One-shot command-line entrypoint.
//!
//! Runs a single indexing pass or a single query with the same configuration as the HTTP
//! binary, printing the outcome to stdout.
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use rustysearch::{
    config, logging,
    processing::{DEFAULT_SEARCH_LIMIT, DirectoryReport, ProcessingService, SearchHit},
};

#[derive(Parser)]
#[command(
    name = "rustysearch-cli",
    about = "Index text files into Qdrant or query them from the terminal"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Index every .txt file under a directory.
    Index {
        /// Directory to scan; defaults to DATA_DIR.
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Search indexed chunks.
    Search {
        query: String,
        #[arg(long, default_value_t = DEFAULT_SEARCH_LIMIT)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    config::init_config();
    logging::init_tracing();

    let config = config::get_config();
    let service = ProcessingService::from_config(config)
        .context("failed to initialize processing service")?;

    match cli.command {
        Command::Index { dir } => {
            let dir = dir.unwrap_or_else(|| config.data_dir.clone());
            let report = service
                .index_directory(&dir)
                .await
                .with_context(|| format!("failed to index {}", dir.display()))?;
            print_report(&report);
            if !report.failures.is_empty() {
                bail!("{} file(s) failed to index", report.failures.len());
            }
        }
        Command::Search { query, limit } => {
            let hits = service.search(&query, limit).await.context("search failed")?;
            print_hits(&hits);
        }
    }
    Ok(())
}

fn print_report(report: &DirectoryReport) {
    println!(
        "files found: {}, indexed: {}, failed: {}, chunks inserted: {}, chunks skipped: {}",
        report.files_found,
        report.indexed.len(),
        report.failures.len(),
        report.inserted(),
        report.skipped()
    );
    for file in &report.indexed {
        println!(
            "  ok   {} ({} chunks, {} new)",
            file.file_path, file.chunk_count, file.inserted
        );
    }
    for failure in &report.failures {
        println!("  fail {}: {}", failure.file_path.display(), failure.error);
    }
    if report.cancelled {
        println!("pass was cancelled before completion");
    }
}

fn print_hits(hits: &[SearchHit]) {
    if hits.is_empty() {
        println!("no results");
        return;
    }
    for (rank, hit) in hits.iter().enumerate() {
        println!(
            "{}. [{:.3}] {} #{}",
            rank + 1,
            hit.score,
            hit.file_name,
            hit.chunk_index
        );
        println!("   {}", hit.text_snippet.replace('\n', " "));
    }
}
