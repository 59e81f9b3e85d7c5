//! Core services orchestrating ingestion and reads.

mod ingestion;
mod query;

pub use ingestion::{
    DEFAULT_CHUNK_SIZE, DEFAULT_POLL_INTERVAL, IngestionConfig, IngestionService, IngestionTarget,
    ScanSummary,
};
pub use query::{
    DEFAULT_QUERY_LIMIT, FormattedTransfer, IndexingStatus, MAX_QUERY_LIMIT, QueryConfig,
    QueryService, TransferPage, clamp_limit,
};
