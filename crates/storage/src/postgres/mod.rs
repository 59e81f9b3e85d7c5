//! PostgreSQL storage adapter.
//!
//! This module implements the repository traits defined in `trawler-core`
//! using PostgreSQL as the backing store.
//!
//! # Architecture
//!
//! - [`Database`] - Connection pool and schema
//! - [`PgRepositories`] - Composite repository implementing `Repositories` trait
//! - Individual repos: [`PgTransferRepository`], [`PgCheckpointRepository`]

mod checkpoint_repo;
mod database;
mod helpers;
mod schema;
mod transfer_repo;

pub use checkpoint_repo::PgCheckpointRepository;
pub use database::{Database, DatabaseConfig, PurgeStats};
pub use transfer_repo::PgTransferRepository;

use std::sync::Arc;

use trawler_core::ports::{CheckpointRepository, Repositories, TransferRepository};

// =============================================================================
// Composite Repository
// =============================================================================

/// Aggregated PostgreSQL repositories implementing the `Repositories` trait.
pub struct PgRepositories {
    transfers: PgTransferRepository,
    checkpoint: PgCheckpointRepository,
}

impl PgRepositories {
    /// Create a new repository aggregate from a database connection.
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            transfers: PgTransferRepository::new(&db),
            checkpoint: PgCheckpointRepository::new(&db),
        }
    }
}

impl Repositories for PgRepositories {
    fn transfers(&self) -> &dyn TransferRepository {
        &self.transfers
    }

    fn checkpoint(&self) -> &dyn CheckpointRepository {
        &self.checkpoint
    }
}
