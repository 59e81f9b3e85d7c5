//! Read-only façade over the stores.
//!
//! Never writes and never depends on the ingestion worker being alive, so
//! queries keep working when the chain side is unconfigured or failing.

use std::sync::Arc;

use tracing::instrument;

use crate::error::{DomainError, IndexerResult};
use crate::models::{Address, TransferRecord, format_units};
use crate::ports::Repositories;

/// Page size used when the caller gives none.
pub const DEFAULT_QUERY_LIMIT: u32 = 100;

/// Largest page size served.
pub const MAX_QUERY_LIMIT: u32 = 1000;

/// Apply the default and clamp to `1..=MAX_QUERY_LIMIT`.
pub fn clamp_limit(limit: Option<u32>) -> u32 {
    limit
        .unwrap_or(DEFAULT_QUERY_LIMIT)
        .clamp(1, MAX_QUERY_LIMIT)
}

/// Static settings reported by the query side.
#[derive(Debug, Clone)]
pub struct QueryConfig {
    /// Observed contract, if configured.
    pub contract: Option<Address>,
    /// Token decimals used for `value_formatted`.
    pub decimals: u8,
    /// Whether an ingestion worker was started.
    pub configured: bool,
}

/// A stored transfer with its human-readable amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedTransfer {
    pub record: TransferRecord,
    /// `value / 10^decimals`, trailing zeros trimmed.
    pub value_formatted: String,
}

/// Result of an address lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferPage {
    /// Normalized address that was queried.
    pub address: Address,
    /// Matching transfers, newest block first.
    pub transfers: Vec<FormattedTransfer>,
}

/// Ingestion progress as seen by readers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexingStatus {
    pub last_indexed_block: Option<u64>,
    pub contract: Option<Address>,
    pub configured: bool,
}

/// Query service for transfer lookups and status.
pub struct QueryService<R: Repositories + ?Sized> {
    config: QueryConfig,
    repositories: Arc<R>,
}

impl<R: Repositories + ?Sized> QueryService<R> {
    pub fn new(config: QueryConfig, repositories: Arc<R>) -> Self {
        Self {
            config,
            repositories,
        }
    }

    /// Transfers where `address` is sender or recipient.
    ///
    /// `address` is parsed case-insensitively; an unparseable value is a
    /// [`DomainError::InvalidAddress`].
    #[instrument(skip(self))]
    pub async fn transfers_for(
        &self,
        address: &str,
        limit: Option<u32>,
    ) -> IndexerResult<TransferPage> {
        let parsed = Address::from_hex(address.trim())
            .map_err(|e| DomainError::InvalidAddress(format!("{address}: {e}")))?;
        let limit = clamp_limit(limit);

        let records = self.repositories.transfers().query(&parsed, limit).await?;
        let transfers = records
            .into_iter()
            .map(|record| {
                let value_formatted = format_units(record.value, self.config.decimals)?;
                Ok(FormattedTransfer {
                    record,
                    value_formatted,
                })
            })
            .collect::<Result<Vec<_>, DomainError>>()?;

        Ok(TransferPage {
            address: parsed,
            transfers,
        })
    }

    /// Current checkpoint plus static configuration.
    pub async fn status(&self) -> IndexerResult<IndexingStatus> {
        let checkpoint = self.repositories.checkpoint().get().await?;
        Ok(IndexingStatus {
            last_indexed_block: checkpoint.map(|cp| cp.last_indexed_block),
            contract: self.config.contract,
            configured: self.config.configured,
        })
    }
}
