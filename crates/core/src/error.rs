//! Error types for the indexer domain layer.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`DomainError`] - Input validation errors
//! - [`StorageError`] - Database/repository errors
//! - [`ChainError`] - EVM JSON-RPC errors
//! - [`ConfigError`] - Missing or malformed settings
//! - [`IndexerError`] - Top-level orchestration errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Domain Errors
// =============================================================================

/// Input validation failures.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Account address failed validation.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Token amount could not be parsed or formatted.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Storage operation failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Database and repository errors.
///
/// These errors originate from storage operations like queries,
/// transactions, and data serialization.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Failed to establish database connection.
    #[error("Database connection error: {0}")]
    ConnectionError(String),

    /// SQL query execution failed.
    #[error("Query execution error: {0}")]
    QueryError(String),

    /// Database constraint was violated (other than the transfer dedup key).
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Schema creation failed.
    #[error("Schema error: {0}")]
    SchemaError(String),

    /// Transaction commit/rollback failed.
    #[error("Transaction error: {0}")]
    TransactionError(String),

    /// Data serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl StorageError {
    /// Whether retrying the same operation later can succeed.
    ///
    /// Connection and transaction failures are transient. Everything else
    /// points at bad data or a broken schema and must not be retried blindly.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ConnectionError(_) | Self::TransactionError(_))
    }
}

// =============================================================================
// Chain Errors
// =============================================================================

/// EVM JSON-RPC errors.
///
/// All chain errors are transient from the indexer's point of view: they
/// abort the current scan before any checkpoint moves.
#[derive(Debug, Error)]
pub enum ChainError {
    /// HTTP transport failed or the endpoint is unreachable.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// RPC request failed.
    #[error("RPC error: {0}")]
    RpcError(String),

    /// The endpoint refused the log query because the block range is too wide.
    #[error("Block range {from}..={to} rejected by provider: {message}")]
    RangeTooWide {
        /// First block of the rejected range.
        from: u64,
        /// Last block of the rejected range.
        to: u64,
        /// Provider message.
        message: String,
    },

    /// Block is not visible on the endpoint yet.
    #[error("Block not found: {0}")]
    BlockNotFound(u64),

    /// Log payload could not be decoded.
    #[error("Decode error: {0}")]
    DecodeError(String),
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Missing or malformed configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required setting was not provided.
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    /// A setting was provided but is not usable.
    #[error("Invalid setting {name}: {reason}")]
    Invalid {
        /// Setting name (environment variable).
        name: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

// =============================================================================
// Indexer Errors
// =============================================================================

/// Top-level indexer orchestration errors.
///
/// This is the main error type returned by [`crate::services::IngestionService`]
/// and [`crate::services::QueryService`].
#[derive(Debug, Error)]
pub enum IndexerError {
    /// Domain logic error.
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Storage/database error.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Blockchain connectivity error.
    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Another scan holds the scan slot.
    #[error("Scan already in progress")]
    ScanInProgress,

    /// Graceful shutdown was requested.
    ///
    /// This is not really an error but uses the error type for control flow.
    #[error("Indexer shutdown requested")]
    ShutdownRequested,
}

impl IndexerError {
    /// Short label used for the `kind` metric dimension.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Domain(_) => "domain",
            Self::Storage(_) => "storage",
            Self::Chain(_) => "chain",
            Self::Config(_) => "config",
            Self::ScanInProgress => "scan_in_progress",
            Self::ShutdownRequested => "shutdown",
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for indexer operations.
pub type IndexerResult<T> = Result<T, IndexerError>;

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type for chain operations.
pub type ChainResult<T> = Result<T, ChainError>;
