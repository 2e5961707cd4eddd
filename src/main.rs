use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use docqa::backend::Indexer;
use docqa::backend::azure::AzureSearchClient;
use docqa::backend::openai::OpenAiGenerator;
use docqa::config::Config;
use docqa::documents;
use docqa::pipeline::{AnswerResult, Pipeline};
use docqa::server::{self, AppState};

#[derive(Parser)]
#[command(name = "docqa", version, about = "Enterprise document Q&A over a managed search index")]
struct Cli {
    /// Path to the configuration file
    #[arg(long, default_value = "config.json")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP API server
    Serve {
        /// Listen address
        #[arg(long, default_value = "0.0.0.0:5000")]
        addr: String,
    },
    /// Create or update the search index schema
    SetupIndex {
        /// Rebuild the schema even if the index already exists
        #[arg(long)]
        recreate: bool,
    },
    /// Upload documents (files or directories) to the search index
    Upload {
        /// Files or directories to upload
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Ask a question (interactive loop when omitted)
    Ask { question: Option<String> },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = Config::load(&cli.config)?;
    config.apply_env_overrides();
    config.validate()?;

    match cli.command {
        Command::Serve { addr } => serve(config, &addr).await,
        Command::SetupIndex { recreate } => setup_index(config, recreate).await,
        Command::Upload { paths } => upload(config, &paths).await,
        Command::Ask { question } => ask(config, question).await,
    }
}

async fn serve(config: Config, addr: &str) -> Result<()> {
    config.require_credentials()?;

    let search = Arc::new(AzureSearchClient::new(&config.search));
    let generator = Arc::new(OpenAiGenerator::new(&config.ai));
    let pipeline = Pipeline::new(&config, search.clone(), generator);

    let state = Arc::new(AppState {
        pipeline,
        search,
    });

    server::serve(state, addr).await
}

async fn setup_index(config: Config, recreate: bool) -> Result<()> {
    config.require_credentials()?;
    let search = AzureSearchClient::new(&config.search);

    if search.index_exists().await? && !recreate {
        info!(
            "Index '{}' already exists (use --recreate to rebuild the schema)",
            search.index_name()
        );
        return Ok(());
    }

    search.create_index().await?;
    info!("Index setup completed successfully");
    Ok(())
}

async fn upload(config: Config, paths: &[PathBuf]) -> Result<()> {
    config.require_credentials()?;
    let search = AzureSearchClient::new(&config.search);

    if !search.index_exists().await? {
        anyhow::bail!(
            "Index '{}' does not exist; run `docqa setup-index` first",
            search.index_name()
        );
    }

    let files = collect_files(paths, &config)?;
    if files.is_empty() {
        warn!(
            "No documents found (supported formats: {})",
            config.upload.allowed_file_types.join(", ")
        );
        return Ok(());
    }

    info!("Found {} document(s)", files.len());
    let progress = indicatif::ProgressBar::new(files.len() as u64);

    let mut succeeded = 0usize;
    let mut failed = 0usize;

    for file in &files {
        match upload_file(file, &config, &search).await {
            Ok((accepted, total)) if accepted == total => {
                info!("DOC_UPLOAD - Success: {}", file.display());
                succeeded += 1;
            }
            Ok((accepted, total)) => {
                error!(
                    "DOC_UPLOAD - Failed: {} - Error: only {accepted}/{total} chunks accepted",
                    file.display()
                );
                failed += 1;
            }
            Err(e) => {
                error!("DOC_UPLOAD - Failed: {} - Error: {e:#}", file.display());
                failed += 1;
            }
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    info!("Upload complete: {succeeded} succeeded, {failed} failed");
    Ok(())
}

/// Validate, extract, chunk, and upload a single document.
/// Returns (accepted, total) chunk counts.
async fn upload_file(
    path: &Path,
    config: &Config,
    indexer: &AzureSearchClient,
) -> Result<(usize, usize)> {
    documents::validate_file(path, config)?;
    let text = documents::extract_text(path)?;
    let chunks = documents::prepare_chunks(path, &text, config)?;
    let accepted = indexer.upload(&chunks).await?;
    Ok((accepted, chunks.len()))
}

/// Expand directories into their supported files; pass files through.
fn collect_files(paths: &[PathBuf], config: &Config) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_dir() {
            for file_type in &config.upload.allowed_file_types {
                let pattern = format!("{}/*.{file_type}", path.display());
                for entry in glob::glob(&pattern)
                    .context("invalid glob pattern")?
                    .flatten()
                {
                    files.push(entry);
                }
            }
        } else {
            files.push(path.clone());
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}

async fn ask(config: Config, question: Option<String>) -> Result<()> {
    config.require_credentials()?;

    let retriever = Arc::new(AzureSearchClient::new(&config.search));
    let generator = Arc::new(OpenAiGenerator::new(&config.ai));
    let pipeline = Pipeline::new(&config, retriever, generator);

    if let Some(question) = question {
        let result = pipeline.ask(&question).await;
        print_answer(&result);
        return Ok(());
    }

    println!("Ask questions about the indexed documents. Type 'quit' or 'exit' to stop.");
    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if matches!(question.to_lowercase().as_str(), "quit" | "exit" | "q") {
            break;
        }

        let result = pipeline.ask(question).await;
        print_answer(&result);
    }

    Ok(())
}

fn print_answer(result: &AnswerResult) {
    println!("\n{}\n", result.answer);
    if !result.sources.is_empty() {
        println!("Sources: {}", result.sources.join(", "));
    }
    if let Some(tokens) = result.tokens_used {
        println!("Tokens used: {tokens}");
    }
}
