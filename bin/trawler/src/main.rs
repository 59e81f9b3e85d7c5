//! Trawler - ERC20 Transfer event indexer.
//!
//! # Usage
//!
//! ```bash
//! # Continuous ingestion plus the query API
//! RPC_URL=http://localhost:8545 CONTRACT_ADDRESS=0x... trawler
//!
//! # Scan to the head once and exit
//! trawler --once --start-block 19000000
//!
//! # Query API only (no chain settings)
//! DATABASE_URL=postgres://localhost/trawler trawler
//! ```

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::signal;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info, info_span, warn};
use tracing_subscriber::{EnvFilter, fmt};

use trawler_api::{ApiState, ServerConfig, serve_with_shutdown};
use trawler_core::error::IndexerError;
use trawler_core::metrics::init_metrics;
use trawler_core::models::MAX_DECIMALS;
use trawler_core::ports::Repositories;
use trawler_core::services::{
    DEFAULT_CHUNK_SIZE, IngestionConfig, IngestionService, IngestionTarget, QueryConfig,
    QueryService,
};
use trawler_evm::{EvmLogReader, EvmLogReaderConfig};
use trawler_storage::{Database, DatabaseConfig, PgRepositories};

/// Trawler CLI - ERC20 Transfer indexer.
#[derive(Parser, Debug)]
#[command(name = "trawler")]
#[command(about = "Trawler - ERC20 Transfer event indexer with an HTTP query API")]
#[command(version)]
struct Cli {
    /// EVM JSON-RPC endpoint (HTTP).
    #[arg(long, env = "RPC_URL")]
    rpc_url: Option<String>,

    /// ERC20 contract whose Transfer events are indexed.
    #[arg(long, env = "CONTRACT_ADDRESS")]
    contract_address: Option<String>,

    /// First block to scan when no checkpoint exists (default: current head).
    #[arg(long, env = "START_BLOCK")]
    start_block: Option<u64>,

    /// Maximum blocks per eth_getLogs request.
    #[arg(
        long,
        env = "CHUNK_SIZE",
        default_value_t = DEFAULT_CHUNK_SIZE,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    chunk_size: u64,

    /// Delay between scans in continuous mode, in milliseconds.
    #[arg(
        long,
        env = "POLL_INTERVAL_MS",
        default_value = "15000",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    poll_interval_ms: u64,

    /// Token decimals used for formatted amounts.
    #[arg(long, env = "TOKEN_DECIMALS", default_value = "18")]
    token_decimals: u8,

    /// PostgreSQL database URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost/trawler"
    )]
    database_url: String,

    /// HTTP query API port.
    #[arg(long, env = "HTTP_PORT", default_value = "3001")]
    http_port: u16,

    /// Prometheus metrics port.
    #[arg(long, env = "METRICS_PORT", default_value = "9090")]
    metrics_port: u16,

    /// Enable JSON log output.
    #[arg(long, env = "JSON_LOGS")]
    json_logs: bool,

    /// Scan once from the checkpoint to the head and exit.
    #[arg(long)]
    once: bool,

    /// Create the schema and exit.
    #[arg(long)]
    init_only: bool,

    /// Purge all indexed data from the database and exit.
    ///
    /// This deletes every transfer and resets the checkpoint. The schema is
    /// preserved.
    #[arg(long)]
    purge: bool,

    /// Skip confirmation prompt for destructive operations (like --purge).
    #[arg(long, short = 'y')]
    yes: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.json_logs);

    if cli.token_decimals > MAX_DECIMALS {
        bail!(
            "TOKEN_DECIMALS must be at most {}, got {}",
            MAX_DECIMALS,
            cli.token_decimals
        );
    }

    // ─────────────────────────────────────────────────────────────────────────
    // 🚀 STARTUP
    // ─────────────────────────────────────────────────────────────────────────
    info!("🚀 Starting Trawler");
    debug!(database_url = %mask_password(&cli.database_url), "Database endpoint");

    let target = IngestionTarget::resolve(cli.rpc_url.as_deref(), cli.contract_address.as_deref());

    // ─────────────────────────────────────────────────────────────────────────
    // 🗄️ DATABASE
    // ─────────────────────────────────────────────────────────────────────────
    info!("🗄️  Connecting to database...");
    let db = Database::connect(&DatabaseConfig::for_indexer(&cli.database_url))
        .await
        .context("Failed to connect to database")?;

    db.init_schema().await.context("Failed to create schema")?;
    info!("🗄️  Database ready (schema ensured)");

    if cli.init_only {
        info!("🛑 --init-only flag set, exiting");
        return Ok(());
    }

    if cli.purge {
        return handle_purge(&db, cli.yes).await;
    }

    let db = Arc::new(db);
    let indexer_repositories = Arc::new(PgRepositories::new(db.clone()));

    if cli.once {
        let target = target.context("One-shot mode needs RPC_URL and CONTRACT_ADDRESS")?;
        let result = run_once(&cli, target, indexer_repositories).await;
        db.close().await;
        return result;
    }

    // Prometheus metrics exporter (optional - failures don't crash the app)
    let metrics_addr = format!("0.0.0.0:{}", cli.metrics_port);
    let metrics_enabled = match metrics_addr.parse::<std::net::SocketAddr>() {
        Ok(metrics_addr) => {
            match PrometheusBuilder::new()
                .with_http_listener(metrics_addr)
                .install()
            {
                Ok(()) => {
                    init_metrics();
                    true
                }
                Err(e) => {
                    warn!(
                        "⚠️  Failed to start metrics exporter: {}. Continuing without metrics.",
                        e
                    );
                    false
                }
            }
        }
        Err(e) => {
            warn!("⚠️  Invalid metrics address: {}. Continuing without metrics.", e);
            false
        }
    };

    let api_db = Arc::new(
        Database::connect(&DatabaseConfig::for_api(&cli.database_url))
            .await
            .context("Failed to create API database pool")?,
    );
    let api_repositories: Arc<dyn Repositories> = Arc::new(PgRepositories::new(api_db.clone()));

    // ─────────────────────────────────────────────────────────────────────────
    // 📡 CHAIN CONNECTION
    // ─────────────────────────────────────────────────────────────────────────
    let contract = target.as_ref().ok().map(|t| t.contract);
    let ingestion = match target {
        Ok(target) => {
            info!("📡 Connecting to RPC endpoint...");
            let reader = connect_reader(&target).await?;
            let mut config = IngestionConfig::new(target.contract);
            config.start_block = cli.start_block;
            config.chunk_size = cli.chunk_size;
            config.poll_interval = Duration::from_millis(cli.poll_interval_ms);
            Some(IngestionService::new(config, reader, indexer_repositories))
        }
        Err(e) => {
            warn!("⚠️  Ingestion disabled: {}. Serving queries only.", e);
            None
        }
    };

    let query_config = QueryConfig {
        contract,
        decimals: cli.token_decimals,
        configured: ingestion.is_some(),
    };
    let api_state = Arc::new(ApiState::new(QueryService::new(query_config, api_repositories)));

    // ─────────────────────────────────────────────────────────────────────────
    // ⚡ SERVICES START
    // ─────────────────────────────────────────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut api_shutdown_rx = shutdown_tx.subscribe();

    let server_config = ServerConfig {
        host: "0.0.0.0".to_string(),
        port: cli.http_port,
    };

    let mut api_handle = tokio::spawn(
        async move {
            let shutdown_signal = async move {
                while !*api_shutdown_rx.borrow() {
                    if api_shutdown_rx.changed().await.is_err() {
                        break;
                    }
                }
            };

            if let Err(e) = serve_with_shutdown(api_state, server_config, shutdown_signal).await {
                error!(error = %e, "❌ Server error");
            }
            debug!("Server stopped");
        }
        .instrument(info_span!("api")),
    );

    let ingestion_handle = ingestion.map(|ingestion| {
        tokio::spawn(
            async move {
                if let Err(e) = ingestion.run(shutdown_rx).await
                    && !matches!(e, IndexerError::ShutdownRequested)
                {
                    error!(error = ?e, "❌ Ingestion error");
                }
            }
            .instrument(info_span!("ingestion")),
        )
    });

    // ─────────────────────────────────────────────────────────────────────────
    // ✅ READY
    // ─────────────────────────────────────────────────────────────────────────
    info!("✅ Trawler ready");
    info!("   ⚡ API:      http://localhost:{}/transfers/{{address}}", cli.http_port);
    if ingestion_handle.is_some() {
        info!("   ⛓️  Ingestion: running");
    } else {
        info!("   ⛓️  Ingestion: not configured");
    }
    if metrics_enabled {
        info!(
            "   📊 Metrics:  http://localhost:{}/metrics",
            cli.metrics_port
        );
    } else {
        info!("   📊 Metrics:  disabled");
    }
    info!("   Press Ctrl+C to stop");

    shutdown_signal().await;

    // ─────────────────────────────────────────────────────────────────────────
    // 🛑 SHUTDOWN
    // ─────────────────────────────────────────────────────────────────────────
    info!("🛑 Shutting down...");
    let _ = shutdown_tx.send(true);

    // Aborted tasks release their pooled connections before the pools close
    if let Some(mut handle) = ingestion_handle {
        join_or_abort(&mut handle, Duration::from_secs(30), "Ingestion").await;
    }
    join_or_abort(&mut api_handle, Duration::from_secs(10), "API").await;

    db.close().await;
    api_db.close().await;

    info!("🛑 Shutdown complete");
    Ok(())
}

/// Wait for a worker to finish, aborting it once `limit` elapses.
///
/// Returns whether the worker stopped on its own.
async fn join_or_abort(handle: &mut JoinHandle<()>, limit: Duration, name: &str) -> bool {
    match tokio::time::timeout(limit, &mut *handle).await {
        Ok(_) => {
            debug!("{} stopped", name);
            true
        }
        Err(_) => {
            warn!("⚠️  {} shutdown timed out, aborting", name);
            handle.abort();
            false
        }
    }
}

/// Build the RPC client and log what the endpoint reports.
async fn connect_reader(target: &IngestionTarget) -> Result<Arc<EvmLogReader>> {
    let reader = EvmLogReader::connect(EvmLogReaderConfig::new(&target.rpc_url))
        .context("Failed to create RPC client")?;

    // The endpoint may be down right now; ingestion retries on its own
    match reader.chain_id().await {
        Ok(chain_id) => info!(
            chain_id,
            contract = %target.contract,
            "🔗 Chain connected"
        ),
        Err(e) => warn!(error = %e, "⚠️  RPC endpoint not reachable yet"),
    }

    Ok(Arc::new(reader))
}

/// Handle the --once command.
async fn run_once(
    cli: &Cli,
    target: IngestionTarget,
    repositories: Arc<PgRepositories>,
) -> Result<()> {
    let reader = connect_reader(&target).await?;

    let mut config = IngestionConfig::new(target.contract);
    config.start_block = cli.start_block;
    config.chunk_size = cli.chunk_size;

    let ingestion = IngestionService::new(config, reader, repositories);
    let summary = ingestion
        .run_once()
        .await
        .context("One-shot scan failed")?;

    info!("   🎯 Head:       {}", summary.head);
    info!("   📦 Chunks:     {}", summary.chunks);
    info!("   📝 Inserted:   {}", summary.inserted);
    info!("   ♻️  Duplicates: {}", summary.duplicates);

    Ok(())
}

/// Initialize tracing subscriber.
fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        fmt().with_env_filter(filter).json().init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .init();
    }
}

/// Mask password in database URL for logging.
fn mask_password(url_str: &str) -> String {
    match url::Url::parse(url_str) {
        Ok(mut url) => {
            if url.password().is_some() {
                let _ = url.set_password(Some("****"));
            }
            url.to_string()
        }
        Err(_) => url_str.to_string(),
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "❌ Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "❌ Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Handle the --purge command.
async fn handle_purge(db: &Database, skip_confirmation: bool) -> Result<()> {
    warn!("⚠️  PURGE MODE: This will delete ALL indexed transfers!");
    warn!("   - The checkpoint will be reset");
    warn!("   - The schema will be preserved");

    if !skip_confirmation {
        print!("\n🔴 Are you sure you want to purge all data? [y/N] ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            info!("❌ Purge cancelled");
            return Ok(());
        }
    }

    info!("🗑️  Purging database...");

    let stats = db.purge().await.context("Failed to purge database")?;

    info!("✅ Database purged successfully");
    info!("   📝 Transfers removed: {}", stats.transfers_removed);
    match stats.previous_checkpoint {
        Some(block) => info!("   ⛓️  Previous checkpoint: block {}", block),
        None => info!("   ⛓️  No checkpoint was set"),
    }
    info!("   The indexer will start from START_BLOCK (or the head) on next run");

    Ok(())
}
