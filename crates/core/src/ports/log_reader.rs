//! Port trait for the chain log source.
//!
//! This trait defines the interface for reading contract logs and block
//! metadata from an EVM chain. Implementations live in the infrastructure
//! layer (e.g., `trawler-evm`).

use async_trait::async_trait;

use crate::error::ChainResult;
use crate::models::{Address, EventSignature, TxHash, U256};

/// A decoded `Transfer` log before timestamp resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTransferLog {
    /// Transaction that emitted the log.
    pub tx_hash: TxHash,
    /// Block containing the transaction.
    pub block_number: u64,
    /// Position of the log in the block (informational).
    pub log_index: Option<u64>,
    /// Sender (topic 1).
    pub from: Address,
    /// Recipient (topic 2).
    pub to: Address,
    /// Amount (data word).
    pub value: U256,
}

/// Port trait for reading logs from a chain.
///
/// Implementations do not retry; the ingestion loop owns the retry policy.
#[async_trait]
pub trait LogReader: Send + Sync {
    /// Every log matching `signature` emitted by `address` in `[from_block, to_block]`.
    ///
    /// Fails with [`ChainError::RangeTooWide`](crate::error::ChainError::RangeTooWide)
    /// when the endpoint refuses the range size.
    async fn fetch_logs(
        &self,
        address: &Address,
        signature: &EventSignature,
        from_block: u64,
        to_block: u64,
    ) -> ChainResult<Vec<RawTransferLog>>;

    /// Unix timestamp (seconds) of a block.
    async fn block_timestamp(&self, block_number: u64) -> ChainResult<u64>;

    /// Most recent block number the endpoint considers canonical.
    async fn head_block(&self) -> ChainResult<u64>;
}
