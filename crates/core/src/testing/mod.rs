//! In-memory implementations of the ports for tests.
//!
//! Available under `cfg(test)` and behind the `testing` feature for
//! downstream crates.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{ChainError, ChainResult, StorageError, StorageResult};
use crate::models::{
    Address, EventSignature, IndexCheckpoint, TRANSFER_EVENT_SIGNATURE, TransferKey,
    TransferRecord, TxHash, U256,
};
use crate::ports::{
    CheckpointRepository, LogReader, RawTransferLog, Repositories, TransferRepository,
};

// =============================================================================
// FakeLogReader
// =============================================================================

#[derive(Debug, Default)]
struct FakeChain {
    head: u64,
    logs: Vec<RawTransferLog>,
    max_range: Option<u64>,
    fail_fetch_at: Option<u64>,
    fetch_calls: Vec<(u64, u64)>,
}

/// Scripted chain for a single contract.
#[derive(Debug)]
pub struct FakeLogReader {
    contract: Address,
    chain: Mutex<FakeChain>,
    timestamp_calls: AtomicU64,
}

impl FakeLogReader {
    pub fn new(contract: Address, head: u64) -> Self {
        Self {
            contract,
            chain: Mutex::new(FakeChain {
                head,
                ..Default::default()
            }),
            timestamp_calls: AtomicU64::new(0),
        }
    }

    /// Deterministic timestamp served for `block`.
    pub fn timestamp_of(block: u64) -> u64 {
        1_700_000_000 + block * 12
    }

    /// Add a `Transfer` log emitted by the contract.
    pub fn push_transfer(
        &self,
        block: u64,
        tx_hash: TxHash,
        from: Address,
        to: Address,
        value: U256,
    ) {
        let mut chain = self.lock();
        let log_index = chain.logs.iter().filter(|l| l.block_number == block).count() as u64;
        chain.logs.push(RawTransferLog {
            tx_hash,
            block_number: block,
            log_index: Some(log_index),
            from,
            to,
            value,
        });
    }

    pub fn set_head(&self, head: u64) {
        self.lock().head = head;
    }

    /// Reject log queries spanning more than `blocks` blocks.
    pub fn set_max_range(&self, blocks: u64) {
        self.lock().max_range = Some(blocks);
    }

    /// Fail the next log query whose range contains `block`.
    pub fn fail_fetch_once_at(&self, block: u64) {
        self.lock().fail_fetch_at = Some(block);
    }

    /// Every `(from, to)` passed to `fetch_logs`, rejected calls included.
    pub fn fetch_calls(&self) -> Vec<(u64, u64)> {
        self.lock().fetch_calls.clone()
    }

    /// Number of `block_timestamp` calls served.
    pub fn timestamp_calls(&self) -> u64 {
        self.timestamp_calls.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeChain> {
        self.chain.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl LogReader for FakeLogReader {
    async fn fetch_logs(
        &self,
        address: &Address,
        signature: &EventSignature,
        from_block: u64,
        to_block: u64,
    ) -> ChainResult<Vec<RawTransferLog>> {
        let mut chain = self.lock();
        chain.fetch_calls.push((from_block, to_block));

        if let Some(max) = chain.max_range
            && to_block - from_block + 1 > max
        {
            return Err(ChainError::RangeTooWide {
                from: from_block,
                to: to_block,
                message: format!("range exceeds {max} blocks"),
            });
        }
        if let Some(block) = chain.fail_fetch_at
            && (from_block..=to_block).contains(&block)
        {
            chain.fail_fetch_at = None;
            return Err(ChainError::RpcError("injected failure".into()));
        }
        if *address != self.contract || *signature != TRANSFER_EVENT_SIGNATURE {
            return Ok(Vec::new());
        }

        Ok(chain
            .logs
            .iter()
            .filter(|l| (from_block..=to_block).contains(&l.block_number))
            .cloned()
            .collect())
    }

    async fn block_timestamp(&self, block_number: u64) -> ChainResult<u64> {
        if block_number > self.lock().head {
            return Err(ChainError::BlockNotFound(block_number));
        }
        self.timestamp_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Self::timestamp_of(block_number))
    }

    async fn head_block(&self) -> ChainResult<u64> {
        Ok(self.lock().head)
    }
}

// =============================================================================
// MemoryRepositories
// =============================================================================

#[derive(Debug, Default)]
struct StoredTransfers {
    keys: HashSet<TransferKey>,
    records: Vec<TransferRecord>,
}

/// Idempotent in-memory transfer store.
#[derive(Debug, Default)]
pub struct MemoryTransferRepository {
    inner: RwLock<StoredTransfers>,
}

#[async_trait]
impl TransferRepository for MemoryTransferRepository {
    async fn insert(&self, record: &TransferRecord) -> StorageResult<bool> {
        let mut inner = self.inner.write().await;
        if !inner.keys.insert(record.key()) {
            return Ok(false);
        }
        inner.records.push(record.clone());
        Ok(true)
    }

    async fn insert_batch(&self, records: &[TransferRecord]) -> StorageResult<u64> {
        let mut inner = self.inner.write().await;
        let mut inserted = 0;
        for record in records {
            if inner.keys.insert(record.key()) {
                inner.records.push(record.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn query(&self, address: &Address, limit: u32) -> StorageResult<Vec<TransferRecord>> {
        let inner = self.inner.read().await;
        let mut matches: Vec<TransferRecord> = inner
            .records
            .iter()
            .filter(|r| r.involves(address))
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.block_number.cmp(&a.block_number));
        matches.truncate(limit as usize);
        Ok(matches)
    }
}

/// Single-row in-memory checkpoint with write history.
#[derive(Debug, Default)]
pub struct MemoryCheckpointRepository {
    history: RwLock<Vec<IndexCheckpoint>>,
    fail_next_set: AtomicBool,
}

#[async_trait]
impl CheckpointRepository for MemoryCheckpointRepository {
    async fn get(&self) -> StorageResult<Option<IndexCheckpoint>> {
        Ok(self.history.read().await.last().cloned())
    }

    async fn set(&self, block_number: u64) -> StorageResult<()> {
        if self.fail_next_set.swap(false, Ordering::SeqCst) {
            return Err(StorageError::ConnectionError("injected failure".into()));
        }
        let mut history = self.history.write().await;
        let next = history
            .last()
            .map_or(block_number, |cp| cp.last_indexed_block.max(block_number));
        history.push(IndexCheckpoint {
            last_indexed_block: next,
            updated_at: chrono::Utc::now(),
        });
        Ok(())
    }
}

/// In-memory [`Repositories`].
#[derive(Debug, Default)]
pub struct MemoryRepositories {
    transfers: MemoryTransferRepository,
    checkpoint: MemoryCheckpointRepository,
}

impl MemoryRepositories {
    /// Every stored record, in insertion order.
    pub async fn transfers_snapshot(&self) -> Vec<TransferRecord> {
        self.transfers.inner.read().await.records.clone()
    }

    /// Every value written by `set`, after the monotonic clamp.
    pub async fn checkpoint_history(&self) -> Vec<u64> {
        self.checkpoint
            .history
            .read()
            .await
            .iter()
            .map(|cp| cp.last_indexed_block)
            .collect()
    }

    /// Make the next checkpoint write fail as if the process died before it.
    pub fn fail_next_checkpoint_set(&self) {
        self.checkpoint.fail_next_set.store(true, Ordering::SeqCst);
    }
}

impl Repositories for MemoryRepositories {
    fn transfers(&self) -> &dyn TransferRepository {
        &self.transfers
    }

    fn checkpoint(&self) -> &dyn CheckpointRepository {
        &self.checkpoint
    }
}
