//! Core domain layer for the Trawler transfer indexer.
//!
//! This crate contains the domain models, port traits (interfaces), and
//! services for indexing ERC20 `Transfer` events. It follows hexagonal
//! architecture principles - this is the innermost layer with no
//! dependencies on infrastructure.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     trawler (binary)                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │        trawler-api          │         trawler-evm           │
//! │          (HTTP)             │        (JSON-RPC logs)        │
//! ├─────────────────────────────┴───────────────────────────────┤
//! │                    trawler-storage                          │
//! │                     (PostgreSQL)                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │                     trawler-core  ← YOU ARE HERE            │
//! │               (models, ports, services)                     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`models`] - Domain models (TransferRecord, Address, TxHash, ...)
//! - [`ports`] - Interface traits for adapters to implement
//! - [`services`] - Ingestion loop and query façade
//! - [`error`] - Domain error types
//! - [`metrics`] - Prometheus metrics definitions
//!
//! # Ingestion Lifecycle
//!
//! 1. Read the checkpoint (or fall back to the configured start block)
//! 2. Split `[start, head]` into chunks of bounded width
//! 3. Fetch `Transfer` logs for each chunk and resolve block timestamps
//! 4. Insert the chunk's records idempotently
//! 5. Advance the checkpoint to the chunk end

pub mod error;
pub mod metrics;
pub mod models;
pub mod ports;
pub mod services;

#[cfg(any(test, feature = "testing"))]
pub mod testing;
