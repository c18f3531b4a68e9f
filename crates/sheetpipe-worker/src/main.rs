//! sheetpipe worker: batch spreadsheet import and processing.
//!
//! Two flows, selected by subcommand and coordinated only through status
//! columns in the record store:
//!   - `import`: claim pending uploads, parse, persist extracted rows
//!   - `process`: claim pending rows, dedup, transform, persist results

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use sheetpipe_cache::{DuplicateCache, RedisDuplicateCache};
use sheetpipe_core::store::{RowStore, UploadStore};
use sheetpipe_core::WorkerConfig;
use sheetpipe_db::{RowRepository, UploadRepository};
use sheetpipe_parser::FileFetcher;
use sheetpipe_processors::builtin_registry;
use sheetpipe_worker::{runner, setup, telemetry, ImportEngine, ProcessEngine};

const DEDUP_KEY_PREFIX: &str = "sheetpipe:dedup";

#[derive(Parser)]
#[command(name = "sheetpipe", about = "Spreadsheet batch import and processing workers")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the import flow: claim pending uploads, parse, persist rows
    Import,
    /// Run the process flow: claim pending rows, dedup, transform, persist
    Process,
    /// Enqueue a spreadsheet file or URL for import
    Enqueue {
        /// Local path or HTTP(S) URL of the spreadsheet
        path: String,
        /// File type discriminator used for processor dispatch
        #[arg(long, default_value = "default")]
        file_type: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing();

    let cli = Cli::parse();
    let config = WorkerConfig::from_env().context("Failed to load configuration")?;

    let pool = setup::setup_database(&config).await?;
    let uploads: Arc<dyn UploadStore> = Arc::new(UploadRepository::new(pool.clone()));

    match cli.command {
        Commands::Import => {
            let fetcher = FileFetcher::new(&config.temp_dir, config.download_timeout)
                .context("Failed to initialize file fetcher")?;
            let engine = ImportEngine::new(uploads, fetcher, config.import_batch_size);
            runner::run_import_flow(engine, &config).await
        }
        Commands::Process => {
            let rows: Arc<dyn RowStore> = Arc::new(RowRepository::new(pool.clone()));
            let cache: Arc<dyn DuplicateCache> = Arc::new(
                RedisDuplicateCache::new(&config.redis_url)
                    .await
                    .map_err(|err| anyhow::anyhow!("Failed to connect to Redis: {}", err))?
                    .with_prefix(DEDUP_KEY_PREFIX),
            );
            let registry = Arc::new(builtin_registry());
            let engine = ProcessEngine::new(
                rows,
                uploads,
                cache,
                registry,
                config.process_batch_size,
                config.duplicate_ttl,
            );
            runner::run_process_flow(engine, &config).await
        }
        Commands::Enqueue { path, file_type } => {
            let upload = uploads
                .create(&path, &file_type)
                .await
                .context("Failed to enqueue upload")?;
            println!("{}", serde_json::to_string_pretty(&upload)?);
            Ok(())
        }
    }
}
