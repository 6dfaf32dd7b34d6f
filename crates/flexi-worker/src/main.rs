//! Worker process for the Flexi function platform
//!
//! Feeds execution requests into the dispatcher, either as a stream of queue
//! messages or as a single ad-hoc request, and offers a helper for computing
//! the stored blob name of an upload.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use flexi_core::blob::{binary_blob_name, text_blob_name};
use flexi_core::config::{ConfigLoader, FlexiConfig};
use flexi_core::store::{Catalog, InMemoryStore, JsonlLogSink};
use flexi_core::{Dispatcher, ExecutionQueue, ExecutionRequest};
use log::LevelFilter;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

#[derive(Parser, Debug)]
#[clap(author, version, about = "Flexi Worker - Execute stored functions from the execution queue")]
struct Cli {
    #[clap(subcommand)]
    command: Commands,

    #[clap(long, short, help = "YAML configuration file (defaults plus FLEXI_* environment when omitted)")]
    config: Option<PathBuf>,

    #[clap(long, help = "Catalog of functions and users, overrides storage.catalog")]
    catalog: Option<PathBuf>,

    #[clap(long, short, help = "Log level, overrides logging.level")]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Consume newline-delimited JSON queue messages until input ends
    Run {
        #[clap(long, short, help = "Message file; stdin when omitted")]
        input: Option<PathBuf>,

        #[clap(long, help = "Concurrent executions, overrides queue.concurrency")]
        concurrency: Option<usize>,
    },
    /// Handle one request and print its execution log as JSON
    Exec {
        #[clap(long)]
        function_id: i64,

        #[clap(long)]
        user_id: i64,

        #[clap(long, default_value = "")]
        input: String,
    },
    /// Print the stored blob name for an upload
    BlobName {
        #[clap(subcommand)]
        upload: BlobUpload,
    },
}

#[derive(Subcommand, Debug)]
enum BlobUpload {
    /// Uploaded source file
    Binary { file_name: String },
    /// Pasted source text
    Text {
        #[clap(long)]
        user_id: i64,
        #[clap(long)]
        name: String,
        #[clap(long)]
        runtime: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ConfigLoader::from_file(path).await,
        None => ConfigLoader::from_environment(),
    }
    .context("Failed to load configuration")?;

    // Initialize logger
    let level = cli.log_level.as_deref().unwrap_or(&config.logging.level);
    env_logger::Builder::new()
        .filter_level(level.parse().unwrap_or(LevelFilter::Info))
        .init();

    match cli.command {
        Commands::Run { input, concurrency } => {
            let dispatcher = build_dispatcher(&config, cli.catalog).await?;
            let concurrency = concurrency.unwrap_or(config.queue.concurrency);
            match input {
                Some(path) => {
                    let file = tokio::fs::File::open(&path)
                        .await
                        .with_context(|| format!("Failed to open {}", path.display()))?;
                    run_queue(&config, dispatcher, concurrency, BufReader::new(file)).await
                }
                None => {
                    run_queue(&config, dispatcher, concurrency, BufReader::new(tokio::io::stdin()))
                        .await
                }
            }
        }
        Commands::Exec {
            function_id,
            user_id,
            input,
        } => {
            let dispatcher = build_dispatcher(&config, cli.catalog).await?;
            let request = ExecutionRequest::new(function_id, user_id, input);
            let record = dispatcher.handle_with_outcome(request).await.ok_or_else(|| {
                anyhow::anyhow!(
                    "Request dropped: function {} or user {} not found",
                    function_id,
                    user_id
                )
            })?;
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }
        Commands::BlobName { upload } => {
            let name = match upload {
                BlobUpload::Binary { file_name } => binary_blob_name(&file_name),
                BlobUpload::Text {
                    user_id,
                    name,
                    runtime,
                } => text_blob_name(user_id, &name, &runtime),
            };
            println!("{}", name);
            Ok(())
        }
    }
}

async fn build_dispatcher(config: &FlexiConfig, catalog: Option<PathBuf>) -> Result<Arc<Dispatcher>> {
    let catalog_path = catalog
        .or_else(|| config.storage.catalog.clone())
        .ok_or_else(|| anyhow::anyhow!("No catalog configured; pass --catalog or set storage.catalog"))?;
    log::info!("Loading catalog from: {}", catalog_path.display());
    let catalog = Catalog::from_file(&catalog_path).await?;
    log::info!(
        "Catalog loaded: {} functions, {} users",
        catalog.functions.len(),
        catalog.users.len()
    );

    let store = Arc::new(InMemoryStore::from_catalog(catalog));
    let sink = Arc::new(JsonlLogSink::new(config.storage.execution_log.clone()));
    let dispatcher = Dispatcher::with_http_crypto(config, store.clone(), store, sink)?;
    log::info!(
        "Dispatcher ready: crypto service at {}, logs to {}",
        config.crypto.base_url,
        config.storage.execution_log.display()
    );
    Ok(Arc::new(dispatcher))
}

async fn run_queue<R>(
    config: &FlexiConfig,
    dispatcher: Arc<Dispatcher>,
    concurrency: usize,
    reader: R,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let (producer, consumer) = ExecutionQueue::bounded(config.queue.name.clone(), config.queue.capacity);
    let worker = tokio::spawn(consumer.run(dispatcher, concurrency));

    let mut lines = reader.lines();
    let mut line_no = 0usize;
    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }
        match producer.enqueue_message(line.as_bytes()).await {
            Ok(ack) => log::debug!("Line {} queued as {}", line_no, ack.message_id),
            Err(e) => log::warn!("Skipping line {}: {}", line_no, e),
        }
    }
    drop(producer);

    let handled = worker.await?;
    log::info!("Worker finished: {} requests handled", handled);
    Ok(())
}
