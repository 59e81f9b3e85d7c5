//! Port traits for data repositories.
//!
//! These traits define the storage interface used by the domain layer.
//! Implementations live in the infrastructure layer (e.g., `trawler-storage`).

use async_trait::async_trait;

use crate::error::StorageResult;
use crate::models::{Address, IndexCheckpoint, TransferRecord};

// =============================================================================
// Repository Traits
// =============================================================================

/// Repository for transfer records.
///
/// Inserts are idempotent on (`tx_hash`, `from`, `to`, `value`): storing a
/// record that already exists is a silent no-op, never an error.
#[async_trait]
pub trait TransferRepository: Send + Sync {
    /// Insert one record. Returns `true` if a new row was written.
    async fn insert(&self, record: &TransferRecord) -> StorageResult<bool>;

    /// Insert a batch of records in one transaction.
    ///
    /// Returns the number of newly written rows; duplicates are not counted.
    async fn insert_batch(&self, records: &[TransferRecord]) -> StorageResult<u64>;

    /// Up to `limit` records where `address` is sender or recipient,
    /// newest block first.
    async fn query(&self, address: &Address, limit: u32) -> StorageResult<Vec<TransferRecord>>;
}

/// Repository for ingestion progress.
#[async_trait]
pub trait CheckpointRepository: Send + Sync {
    /// Current checkpoint, or `None` if ingestion never completed a chunk.
    async fn get(&self) -> StorageResult<Option<IndexCheckpoint>>;

    /// Record that every block up to `block_number` is durable (upsert).
    ///
    /// A lower value than the stored one leaves the checkpoint unchanged.
    async fn set(&self, block_number: u64) -> StorageResult<()>;
}

// =============================================================================
// Composite Repository
// =============================================================================

/// Combined repository access for the services.
pub trait Repositories: Send + Sync {
    /// Access the transfer repository.
    fn transfers(&self) -> &dyn TransferRepository;

    /// Access the checkpoint repository.
    fn checkpoint(&self) -> &dyn CheckpointRepository;
}
