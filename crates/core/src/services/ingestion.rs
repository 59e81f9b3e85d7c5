//! Ingestion service - scans contract logs from the checkpoint to the head.
//!
//! One scan walks `[checkpoint + 1, head]` in bounded chunks. Each chunk's
//! records are durable before the checkpoint moves to the chunk end, so a
//! crash at any point leaves at worst a rescan whose inserts are absorbed
//! by the store's uniqueness key.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::{StreamExt, TryStreamExt, stream};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::error::{ChainError, ConfigError, IndexerError, IndexerResult};
use crate::metrics::{
    ScanTimer, record_chunk_indexed, record_range_shrink, record_scan_error, record_scan_skipped,
};
use crate::models::{Address, BlockRange, TRANSFER_EVENT_SIGNATURE, TransferRecord};
use crate::ports::{LogReader, RawTransferLog, Repositories};

/// Default maximum number of blocks per log query.
pub const DEFAULT_CHUNK_SIZE: u64 = 2000;

/// Default delay between scans in continuous mode.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(15_000);

/// Concurrent `block_timestamp` calls per chunk.
const TIMESTAMP_FETCH_CONCURRENCY: usize = 8;

// =============================================================================
// Configuration
// =============================================================================

/// Validated chain settings needed to ingest anything at all.
///
/// Without both values the process can still serve queries, but no
/// ingestion worker is started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionTarget {
    /// JSON-RPC endpoint.
    pub rpc_url: String,
    /// Observed ERC20 contract.
    pub contract: Address,
}

impl IngestionTarget {
    /// Resolve raw optional settings. Blank values count as missing.
    pub fn resolve(
        rpc_url: Option<&str>,
        contract_address: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let rpc_url = rpc_url
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("RPC_URL"))?;
        match url::Url::parse(rpc_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => {
                return Err(ConfigError::Invalid {
                    name: "RPC_URL",
                    reason: format!(
                        "unsupported scheme '{}', expected http or https",
                        url.scheme()
                    ),
                });
            }
            Err(e) => {
                return Err(ConfigError::Invalid {
                    name: "RPC_URL",
                    reason: e.to_string(),
                });
            }
        }
        let contract = contract_address
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("CONTRACT_ADDRESS"))?;
        let contract = Address::from_hex(contract).map_err(|e| ConfigError::Invalid {
            name: "CONTRACT_ADDRESS",
            reason: e.to_string(),
        })?;

        Ok(Self {
            rpc_url: rpc_url.to_string(),
            contract,
        })
    }
}

/// Configuration for the ingestion service.
#[derive(Debug, Clone)]
pub struct IngestionConfig {
    /// Contract whose `Transfer` logs are ingested.
    pub contract: Address,
    /// First block to scan when no checkpoint exists. `None` means the head.
    pub start_block: Option<u64>,
    /// Maximum blocks per log query.
    pub chunk_size: u64,
    /// Delay between scans in continuous mode.
    pub poll_interval: Duration,
}

impl IngestionConfig {
    /// Configuration with default chunking and polling.
    pub fn new(contract: Address) -> Self {
        Self {
            contract,
            start_block: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

// =============================================================================
// Scan bookkeeping
// =============================================================================

/// Outcome of one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Head observed at scan start.
    pub head: u64,
    /// Range covered, or `None` when already caught up.
    pub range: Option<BlockRange>,
    /// Chunks checkpointed.
    pub chunks: u64,
    /// Records newly written.
    pub inserted: u64,
    /// Records already present (rescans).
    pub duplicates: u64,
}

/// Single-slot flag held for the duration of a scan.
struct ScanGuard<'a>(&'a AtomicBool);

impl<'a> ScanGuard<'a> {
    fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for ScanGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// =============================================================================
// IngestionService
// =============================================================================

/// Ingestion worker for one contract.
///
/// # Flow
///
/// 1. Read the head and the checkpoint
/// 2. For each chunk in increasing order, fetch `Transfer` logs
/// 3. Resolve block timestamps (once per block per scan)
/// 4. Insert the chunk's records
/// 5. Advance the checkpoint to the chunk end
pub struct IngestionService<L: LogReader, R: Repositories> {
    config: IngestionConfig,
    log_reader: Arc<L>,
    repositories: Arc<R>,
    scanning: AtomicBool,
}

impl<L: LogReader, R: Repositories> IngestionService<L, R> {
    pub fn new(config: IngestionConfig, log_reader: Arc<L>, repositories: Arc<R>) -> Self {
        Self {
            config,
            log_reader,
            repositories,
            scanning: AtomicBool::new(false),
        }
    }

    /// Scan once from the checkpoint to the current head.
    ///
    /// Fails with [`IndexerError::ScanInProgress`] if another scan holds the slot.
    pub async fn scan(&self) -> IndexerResult<ScanSummary> {
        self.scan_until(None).await
    }

    /// One-shot mode: scan to the head and report.
    #[instrument(skip_all, fields(contract = %self.config.contract))]
    pub async fn run_once(&self) -> IndexerResult<ScanSummary> {
        info!("⛓️  Starting one-shot scan");
        let summary = self.scan().await?;
        match summary.range {
            Some(range) => info!(
                range = %range,
                chunks = summary.chunks,
                inserted = summary.inserted,
                duplicates = summary.duplicates,
                "✅ Scan complete"
            ),
            None => info!(head = summary.head, "✅ Already at head"),
        }
        Ok(summary)
    }

    /// Continuous mode: scan on every tick until shutdown.
    ///
    /// Ticks that elapse during a scan are dropped, not queued. A failed
    /// scan is retried with exponential backoff capped at the poll interval.
    #[instrument(skip_all, fields(contract = %self.config.contract))]
    pub async fn run(&self, mut shutdown_rx: watch::Receiver<bool>) -> IndexerResult<()> {
        info!(
            poll_ms = self.config.poll_interval.as_millis(),
            chunk_size = self.config.chunk_size,
            "⛓️  Starting ingestion"
        );

        // Exponential backoff configuration
        const INITIAL_RETRY_DELAY: Duration = Duration::from_millis(500);
        let max_retry_delay = self.config.poll_interval.max(INITIAL_RETRY_DELAY);
        let mut retry_delay: Option<Duration> = None;

        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            if *shutdown_rx.borrow() {
                debug!("Shutdown requested");
                return Err(IndexerError::ShutdownRequested);
            }

            tokio::select! {
                _ = ticker.tick(), if retry_delay.is_none() => {}
                _ = tokio::time::sleep(retry_delay.unwrap_or_default()), if retry_delay.is_some() => {
                    debug!(
                        retry_delay_ms = retry_delay.unwrap_or_default().as_millis(),
                        "🔄 Retrying scan..."
                    );
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        return Err(IndexerError::ShutdownRequested);
                    }
                    continue;
                }
            }

            match self.scan_until(Some(&shutdown_rx)).await {
                Ok(summary) => {
                    retry_delay = None;
                    match summary.range {
                        Some(range) if summary.inserted > 0 => info!(
                            range = %range,
                            inserted = summary.inserted,
                            "⛓️  Transfers indexed"
                        ),
                        Some(range) => debug!(range = %range, "Range indexed, no new transfers"),
                        None => trace!(head = summary.head, "At head"),
                    }
                }
                Err(IndexerError::ShutdownRequested) => {
                    debug!("Shutdown requested mid-scan");
                    return Err(IndexerError::ShutdownRequested);
                }
                Err(IndexerError::ScanInProgress) => {
                    record_scan_skipped();
                    debug!("Scan already running, tick skipped");
                }
                Err(e) => {
                    record_scan_error(e.kind());
                    let delay = retry_delay
                        .map(|d| (d * 2).min(max_retry_delay))
                        .unwrap_or(INITIAL_RETRY_DELAY);
                    match &e {
                        IndexerError::Storage(s) if !s.is_transient() => {
                            error!(error = %e, "❌ Scan failed on storage");
                        }
                        _ => warn!(
                            error = %e,
                            retry_in_ms = delay.as_millis(),
                            "⚠️  Scan failed, retrying..."
                        ),
                    }
                    retry_delay = Some(delay);
                }
            }
        }
    }

    /// Scan routine shared by both modes.
    ///
    /// The shutdown flag is honoured between chunks only, so an in-flight
    /// chunk always completes and checkpoints.
    #[instrument(skip_all)]
    async fn scan_until(
        &self,
        shutdown_rx: Option<&watch::Receiver<bool>>,
    ) -> IndexerResult<ScanSummary> {
        let Some(_guard) = ScanGuard::try_acquire(&self.scanning) else {
            return Err(IndexerError::ScanInProgress);
        };
        let _timer = ScanTimer::new();

        let head = self.log_reader.head_block().await?;
        let checkpoint = self.repositories.checkpoint().get().await?;
        let start = match checkpoint {
            Some(cp) => match cp.last_indexed_block.checked_add(1) {
                Some(next) => next,
                None => {
                    return Ok(ScanSummary {
                        head,
                        ..Default::default()
                    });
                }
            },
            None => self.config.start_block.unwrap_or(head),
        };

        let mut summary = ScanSummary {
            head,
            ..Default::default()
        };

        let Some(range) = BlockRange::new(start, head) else {
            trace!(start, head, "Nothing to scan");
            return Ok(summary);
        };
        debug!(range = %range, "Scanning");
        summary.range = Some(range);

        let mut width = self.config.chunk_size.max(1);
        let mut timestamps: HashMap<u64, u64> = HashMap::new();
        let mut remaining = Some(range);

        while let Some(pending) = remaining {
            if shutdown_rx.is_some_and(|rx| *rx.borrow()) {
                return Err(IndexerError::ShutdownRequested);
            }

            let (chunk, rest) = pending.split_first(width);
            let logs = match self
                .log_reader
                .fetch_logs(
                    &self.config.contract,
                    &TRANSFER_EVENT_SIGNATURE,
                    chunk.from,
                    chunk.to,
                )
                .await
            {
                Ok(logs) => logs,
                Err(ChainError::RangeTooWide { message, .. }) if width > 1 => {
                    width = (width / 2).max(1);
                    record_range_shrink();
                    warn!(
                        chunk = %chunk,
                        new_width = width,
                        reason = %message,
                        "⚠️  Range rejected, shrinking chunk"
                    );
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            self.resolve_timestamps(&logs, &mut timestamps).await?;
            let records = logs
                .iter()
                .map(|log| to_record(log, &timestamps))
                .collect::<Result<Vec<_>, _>>()?;

            let inserted = if records.is_empty() {
                0
            } else {
                self.repositories.transfers().insert_batch(&records).await?
            };
            let duplicates = (records.len() as u64).saturating_sub(inserted);

            self.repositories.checkpoint().set(chunk.to).await?;

            record_chunk_indexed(inserted, duplicates, chunk.to);
            debug!(
                chunk = %chunk,
                logs = records.len(),
                inserted,
                duplicates,
                "Chunk indexed"
            );

            summary.chunks += 1;
            summary.inserted += inserted;
            summary.duplicates += duplicates;
            remaining = rest;
        }

        Ok(summary)
    }

    /// Fetch timestamps for blocks not yet in the per-scan cache.
    async fn resolve_timestamps(
        &self,
        logs: &[RawTransferLog],
        cache: &mut HashMap<u64, u64>,
    ) -> IndexerResult<()> {
        let mut missing: Vec<u64> = logs
            .iter()
            .map(|log| log.block_number)
            .filter(|n| !cache.contains_key(n))
            .collect();
        missing.sort_unstable();
        missing.dedup();

        if missing.is_empty() {
            return Ok(());
        }

        let fetched: Vec<(u64, u64)> = stream::iter(missing)
            .map(|block| async move {
                self.log_reader
                    .block_timestamp(block)
                    .await
                    .map(|ts| (block, ts))
            })
            .buffer_unordered(TIMESTAMP_FETCH_CONCURRENCY)
            .try_collect()
            .await?;

        trace!(blocks = fetched.len(), "Timestamps resolved");
        cache.extend(fetched);
        Ok(())
    }
}

/// Combine a decoded log with its block timestamp.
fn to_record(
    log: &RawTransferLog,
    timestamps: &HashMap<u64, u64>,
) -> Result<TransferRecord, ChainError> {
    let timestamp = timestamps
        .get(&log.block_number)
        .copied()
        .ok_or(ChainError::BlockNotFound(log.block_number))?;

    Ok(TransferRecord {
        tx_hash: log.tx_hash,
        block_number: log.block_number,
        timestamp,
        from: log.from,
        to: log.to,
        value: log.value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TxHash, U256};
    use crate::testing::{FakeLogReader, MemoryRepositories};

    const CONTRACT: Address = Address([0xc0; 20]);
    const ALICE: Address = Address([0xa1; 20]);
    const BOB: Address = Address([0xb0; 20]);

    fn service(
        reader: &Arc<FakeLogReader>,
        repos: &Arc<MemoryRepositories>,
        start_block: Option<u64>,
        chunk_size: u64,
    ) -> IngestionService<FakeLogReader, MemoryRepositories> {
        let config = IngestionConfig {
            start_block,
            chunk_size,
            poll_interval: Duration::from_millis(10),
            ..IngestionConfig::new(CONTRACT)
        };
        IngestionService::new(config, reader.clone(), repos.clone())
    }

    async fn stored_blocks(repos: &MemoryRepositories) -> Vec<u64> {
        let mut blocks: Vec<u64> = repos
            .transfers_snapshot()
            .await
            .iter()
            .map(|r| r.block_number)
            .collect();
        blocks.sort_unstable();
        blocks
    }

    async fn checkpoint(repos: &MemoryRepositories) -> Option<u64> {
        repos
            .checkpoint()
            .get()
            .await
            .unwrap()
            .map(|cp| cp.last_indexed_block)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Configuration
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn target_requires_both_settings() {
        assert!(matches!(
            IngestionTarget::resolve(None, Some("0xc0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0")),
            Err(ConfigError::Missing("RPC_URL"))
        ));
        assert!(matches!(
            IngestionTarget::resolve(Some("http://localhost:8545"), Some("  ")),
            Err(ConfigError::Missing("CONTRACT_ADDRESS"))
        ));
        assert!(matches!(
            IngestionTarget::resolve(Some("http://localhost:8545"), Some("0x1234")),
            Err(ConfigError::Invalid { name: "CONTRACT_ADDRESS", .. })
        ));

        let target = IngestionTarget::resolve(
            Some("http://localhost:8545"),
            Some("0xC0C0C0C0C0C0C0C0C0C0C0C0C0C0C0C0C0C0C0C0"),
        )
        .unwrap();
        assert_eq!(target.contract, CONTRACT);
    }

    #[test]
    fn target_rejects_unusable_rpc_url() {
        let contract = "0xc0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0";
        for rpc_url in ["8545", "localhost:8545", "ws://localhost:8546", "http://"] {
            assert!(
                matches!(
                    IngestionTarget::resolve(Some(rpc_url), Some(contract)),
                    Err(ConfigError::Invalid { name: "RPC_URL", .. })
                ),
                "{rpc_url}"
            );
        }
        let target = IngestionTarget::resolve(Some(" https://rpc.example.org/v1 "), Some(contract));
        assert_eq!(target.unwrap().rpc_url, "https://rpc.example.org/v1");
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scan behaviour
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn resumes_without_gaps_after_failed_chunk() {
        let reader = Arc::new(FakeLogReader::new(CONTRACT, 30));
        reader.push_transfer(10, TxHash([1; 32]), ALICE, BOB, U256::from(1));
        reader.push_transfer(15, TxHash([2; 32]), BOB, ALICE, U256::from(2));
        reader.push_transfer(22, TxHash([3; 32]), ALICE, BOB, U256::from(3));
        let repos = Arc::new(MemoryRepositories::default());
        let svc = service(&reader, &repos, Some(10), 6);

        // [10,15] succeeds, [16,21] fails
        reader.fail_fetch_once_at(16);
        assert!(matches!(svc.scan().await, Err(IndexerError::Chain(_))));
        assert_eq!(checkpoint(&repos).await, Some(15));
        assert_eq!(stored_blocks(&repos).await, vec![10, 15]);

        let summary = svc.scan().await.unwrap();
        assert_eq!(summary.range, BlockRange::new(16, 30));
        assert_eq!(checkpoint(&repos).await, Some(30));
        assert_eq!(stored_blocks(&repos).await, vec![10, 15, 22]);
    }

    #[tokio::test]
    async fn crash_between_insert_and_checkpoint_is_absorbed() {
        let reader = Arc::new(FakeLogReader::new(CONTRACT, 30));
        reader.push_transfer(10, TxHash([1; 32]), ALICE, BOB, U256::from(1));
        reader.push_transfer(15, TxHash([2; 32]), BOB, ALICE, U256::from(2));
        reader.push_transfer(22, TxHash([3; 32]), ALICE, BOB, U256::from(3));
        let repos = Arc::new(MemoryRepositories::default());
        let svc = service(&reader, &repos, Some(10), 6);

        // Records of [10,15] land but the checkpoint write fails
        repos.fail_next_checkpoint_set();
        assert!(matches!(svc.scan().await, Err(IndexerError::Storage(_))));
        assert_eq!(checkpoint(&repos).await, None);
        assert_eq!(stored_blocks(&repos).await, vec![10, 15]);

        let summary = svc.scan().await.unwrap();
        assert_eq!(summary.range, BlockRange::new(10, 30));
        assert_eq!(summary.duplicates, 2);
        assert_eq!(summary.inserted, 1);
        assert_eq!(stored_blocks(&repos).await, vec![10, 15, 22]);
    }

    #[tokio::test]
    async fn checkpoint_is_monotonic_and_bounded_by_head() {
        let reader = Arc::new(FakeLogReader::new(CONTRACT, 47));
        let repos = Arc::new(MemoryRepositories::default());
        let svc = service(&reader, &repos, Some(0), 10);

        svc.scan().await.unwrap();
        reader.set_head(95);
        svc.scan().await.unwrap();
        svc.scan().await.unwrap();

        let history = repos.checkpoint_history().await;
        assert_eq!(history, vec![9, 19, 29, 39, 47, 57, 67, 77, 87, 95]);
        assert!(history.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn chunk_width_does_not_change_results() {
        let mut results = Vec::new();
        for width in [10, 100] {
            let reader = Arc::new(FakeLogReader::new(CONTRACT, 100));
            reader.push_transfer(5, TxHash([5; 32]), ALICE, BOB, U256::from(5));
            reader.push_transfer(50, TxHash([50; 32]), BOB, ALICE, U256::from(50));
            reader.push_transfer(95, TxHash([95; 32]), ALICE, BOB, U256::from(95));
            let repos = Arc::new(MemoryRepositories::default());
            service(&reader, &repos, Some(0), width).scan().await.unwrap();

            let mut records = repos.transfers_snapshot().await;
            records.sort_by_key(|r| r.block_number);
            results.push((records, checkpoint(&repos).await));
        }
        assert_eq!(results[0], results[1]);
        assert_eq!(results[0].0.len(), 3);
        assert_eq!(results[0].1, Some(100));
    }

    #[tokio::test]
    async fn rejected_range_is_halved_until_accepted() {
        let reader = Arc::new(FakeLogReader::new(CONTRACT, 99));
        reader.set_max_range(25);
        reader.push_transfer(3, TxHash([3; 32]), ALICE, BOB, U256::from(3));
        reader.push_transfer(88, TxHash([88; 32]), ALICE, BOB, U256::from(88));
        let repos = Arc::new(MemoryRepositories::default());

        service(&reader, &repos, Some(0), 100).scan().await.unwrap();

        assert_eq!(stored_blocks(&repos).await, vec![3, 88]);
        assert_eq!(checkpoint(&repos).await, Some(99));
        let accepted: Vec<_> = reader
            .fetch_calls()
            .into_iter()
            .filter(|(from, to)| to - from < 25)
            .collect();
        assert_eq!(accepted, vec![(0, 24), (25, 49), (50, 74), (75, 99)]);
    }

    #[tokio::test]
    async fn timestamps_fetched_once_per_block() {
        let reader = Arc::new(FakeLogReader::new(CONTRACT, 20));
        reader.push_transfer(7, TxHash([1; 32]), ALICE, BOB, U256::from(1));
        reader.push_transfer(7, TxHash([2; 32]), ALICE, BOB, U256::from(2));
        reader.push_transfer(7, TxHash([3; 32]), BOB, ALICE, U256::from(3));
        reader.push_transfer(12, TxHash([4; 32]), BOB, ALICE, U256::from(4));
        let repos = Arc::new(MemoryRepositories::default());

        service(&reader, &repos, Some(0), 1000).scan().await.unwrap();

        assert_eq!(reader.timestamp_calls(), 2);
        let records = repos.transfers_snapshot().await;
        assert!(
            records
                .iter()
                .all(|r| r.timestamp == FakeLogReader::timestamp_of(r.block_number))
        );
    }

    #[tokio::test]
    async fn start_past_head_is_a_noop() {
        let reader = Arc::new(FakeLogReader::new(CONTRACT, 50));
        let repos = Arc::new(MemoryRepositories::default());
        repos.checkpoint().set(50).await.unwrap();

        let summary = service(&reader, &repos, Some(0), 10).scan().await.unwrap();

        assert_eq!(summary.range, None);
        assert!(reader.fetch_calls().is_empty());
        assert_eq!(checkpoint(&repos).await, Some(50));
    }

    #[tokio::test]
    async fn no_checkpoint_and_no_start_block_begins_at_head() {
        let reader = Arc::new(FakeLogReader::new(CONTRACT, 500));
        let repos = Arc::new(MemoryRepositories::default());

        let summary = service(&reader, &repos, None, 10).scan().await.unwrap();

        assert_eq!(summary.range, BlockRange::new(500, 500));
        assert_eq!(reader.fetch_calls(), vec![(500, 500)]);
    }

    #[tokio::test]
    async fn other_contracts_are_ignored() {
        let reader = Arc::new(FakeLogReader::new(Address([0xee; 20]), 10));
        reader.push_transfer(1, TxHash([1; 32]), ALICE, BOB, U256::from(1));
        let repos = Arc::new(MemoryRepositories::default());

        service(&reader, &repos, Some(0), 10).scan().await.unwrap();

        assert!(repos.transfers_snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn overlapping_scan_is_rejected() {
        let reader = Arc::new(FakeLogReader::new(CONTRACT, 10));
        let repos = Arc::new(MemoryRepositories::default());
        let svc = service(&reader, &repos, Some(0), 10);

        let _held = ScanGuard::try_acquire(&svc.scanning).unwrap();
        assert!(matches!(svc.scan().await, Err(IndexerError::ScanInProgress)));
        drop(_held);
        assert!(svc.scan().await.is_ok());
    }

    #[tokio::test]
    async fn shutdown_is_observed_between_chunks() {
        let reader = Arc::new(FakeLogReader::new(CONTRACT, 100));
        let repos = Arc::new(MemoryRepositories::default());
        let svc = service(&reader, &repos, Some(0), 10);

        let (_tx, rx) = watch::channel(true);
        assert!(matches!(
            svc.scan_until(Some(&rx)).await,
            Err(IndexerError::ShutdownRequested)
        ));
        assert_eq!(checkpoint(&repos).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn continuous_mode_indexes_and_stops_on_shutdown() {
        let reader = Arc::new(FakeLogReader::new(CONTRACT, 40));
        reader.push_transfer(12, TxHash([1; 32]), ALICE, BOB, U256::from(1));
        let repos = Arc::new(MemoryRepositories::default());
        let svc = Arc::new(service(&reader, &repos, Some(0), 10));

        // First scan fails; the retry picks it up
        reader.fail_fetch_once_at(0);

        let (tx, rx) = watch::channel(false);
        let worker = {
            let svc = svc.clone();
            tokio::spawn(async move { svc.run(rx).await })
        };

        // Paused clock: sleeps advance virtual time once the worker is idle
        tokio::time::sleep(Duration::from_millis(800)).await;
        assert_eq!(stored_blocks(&repos).await, vec![12]);
        assert_eq!(checkpoint(&repos).await, Some(40));

        reader.push_transfer(45, TxHash([2; 32]), BOB, ALICE, U256::from(2));
        reader.set_head(50);
        tokio::time::sleep(Duration::from_millis(50)).await;

        tx.send(true).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(5), worker)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(result, Err(IndexerError::ShutdownRequested)));
        assert_eq!(stored_blocks(&repos).await, vec![12, 45]);
        assert_eq!(checkpoint(&repos).await, Some(50));
    }
}
