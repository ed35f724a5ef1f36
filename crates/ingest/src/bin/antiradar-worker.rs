//! antiradar-worker — listens to the chat gateway and turns location
//! mentions into geotagged records.
//!
//! ```text
//! antiradar-worker [run] [--dry-run]        run the pipeline (default)
//! antiradar-worker recent --hours 6         stored records as JSON lines
//! antiradar-worker recent --since <RFC3339>
//! antiradar-worker by-town Ochla --limit 20  records by town, newest first
//! antiradar-worker get 42
//! antiradar-worker count
//! ```

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing::{error, info};

use antiradar_core::config::{load_dotenv, Config};
use antiradar_geocode::{Geocoder, GeocoderAdapter, NominatimGeocoder};
use antiradar_ingest::{spawn_signal_handlers, Consumer, RecordAssembler, Supervisor};
use antiradar_llm::{create_provider, Extractor};
use antiradar_queue::{ingestion_queue, Credentials, GatewaySource, Listener, MessageSource};
use antiradar_storage::{MemoryRecordStore, PersistenceSink, PgRecordStore, RecordStore};

// ── CLI ─────────────────────────────────────────────────────────────

/// Geotag ingestion worker.
#[derive(Parser, Debug)]
#[command(name = "antiradar-worker", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the listener and consumer until SIGINT/SIGTERM or a fatal error.
    Run {
        /// Keep records in memory instead of PostgreSQL.
        #[arg(long)]
        dry_run: bool,
    },
    /// Print stored records as JSON lines, oldest first.
    Recent {
        /// Records from the last N hours (default 24, at most ten years).
        #[arg(
            long,
            conflicts_with = "since",
            value_parser = clap::value_parser!(u32).range(1..=MAX_RECENT_HOURS)
        )]
        hours: Option<u32>,
        /// Records posted at or after this RFC 3339 timestamp.
        #[arg(long)]
        since: Option<DateTime<Utc>>,
    },
    /// Print records whose town contains TOWN as JSON lines, newest first.
    ByTown {
        town: String,
        #[arg(long, default_value_t = 20)]
        limit: u32,
        #[arg(long, default_value_t = 0)]
        offset: u32,
    },
    /// Print one record as JSON.
    Get { id: i64 },
    /// Print the number of stored records.
    Count,
}

const MAX_RECENT_HOURS: i64 = 24 * 365 * 10;

// ── main ────────────────────────────────────────────────────────────

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    load_dotenv();
    let cli = Cli::parse();

    let result = match cli.command.unwrap_or(Command::Run { dry_run: false }) {
        Command::Run { dry_run } => run(dry_run).await,
        Command::Recent { hours, since } => recent(hours, since).await,
        Command::ByTown {
            town,
            limit,
            offset,
        } => by_town(&town, limit, offset).await,
        Command::Get { id } => get(id).await,
        Command::Count => count().await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(dry_run: bool) -> anyhow::Result<()> {
    let config = Config::from_env().context("failed to read configuration")?;
    config.validate(!dry_run).context("invalid configuration")?;
    config.log_summary();

    // Everything that can fail on bad configuration happens before any task starts.
    let prompt = config.extraction.load_prompt()?;
    let credentials_path = config
        .source
        .credentials_path
        .as_deref()
        .context("SOURCE_CREDENTIALS_PATH not set")?;
    let credentials = Credentials::load(credentials_path)?;

    let provider = create_provider(&config.llm, &config.ollama)?;
    info!(provider = %provider.name(), "LLM provider ready");
    let extractor = Extractor::new(
        provider,
        prompt,
        config.llm.temperature,
        config.llm.max_tokens,
    );

    let geocoder: Arc<dyn Geocoder> = Arc::new(NominatimGeocoder::from_config(&config.geocoder)?);
    let adapter = GeocoderAdapter::new(geocoder, config.geocoder.region.clone());
    let assembler = RecordAssembler::new(config.geocoder.default_town.clone());

    let store: Arc<dyn RecordStore> = if dry_run {
        info!("dry run: records are kept in memory only");
        Arc::new(MemoryRecordStore::new())
    } else {
        Arc::new(PgRecordStore::connect(&config.postgres).await?)
    };
    let sink = PersistenceSink::new(store);

    let source: Arc<dyn MessageSource> = Arc::new(GatewaySource::from_config(&config.source)?);

    let (queue_tx, queue_rx) = ingestion_queue();
    let listener = Listener::new(source, credentials, queue_tx);
    let consumer = Consumer::new(queue_rx, extractor, adapter, assembler, sink);

    let supervisor = Supervisor::new(listener, consumer);
    spawn_signal_handlers(supervisor.cancellation_token());

    supervisor.run().await?;
    Ok(())
}

async fn connect_store() -> anyhow::Result<PgRecordStore> {
    let config = Config::from_env().context("failed to read configuration")?;
    let store = PgRecordStore::connect(&config.postgres)
        .await
        .context("failed to open record store")?;
    Ok(store)
}

async fn recent(hours: Option<u32>, since: Option<DateTime<Utc>>) -> anyhow::Result<()> {
    let store = connect_store().await?;
    let records = match since {
        Some(since) => store.query_range(since).await?,
        None => store.recent(hours.unwrap_or(24)).await?,
    };
    for record in &records {
        println!("{}", serde_json::to_string(record)?);
    }
    info!(count = records.len(), "records printed");
    Ok(())
}

async fn by_town(town: &str, limit: u32, offset: u32) -> anyhow::Result<()> {
    let store = connect_store().await?;
    let records = store
        .by_town(town, i64::from(limit), i64::from(offset))
        .await?;
    for record in &records {
        println!("{}", serde_json::to_string(record)?);
    }
    info!(count = records.len(), town = %town, "records printed");
    Ok(())
}

async fn get(id: i64) -> anyhow::Result<()> {
    let store = connect_store().await?;
    let record = store
        .get(id)
        .await?
        .with_context(|| format!("record {id} not found"))?;
    println!("{}", serde_json::to_string(&record)?);
    Ok(())
}

async fn count() -> anyhow::Result<()> {
    let store = connect_store().await?;
    println!("{}", store.count().await?);
    Ok(())
}
