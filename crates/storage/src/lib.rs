//! Storage layer for the Trawler transfer indexer.
//!
//! This crate provides PostgreSQL implementations of the repository traits
//! defined in `trawler-core`. It handles connection pooling, schema
//! creation, and the transfer/checkpoint tables.
//!
//! # Architecture
//!
//! The storage layer follows the repository pattern:
//!
//! - [`postgres::Database`] - Connection pool management
//! - [`postgres::PgRepositories`] - Composite repository for transfers and checkpoint
//!
//! # Usage
//!
//! ```ignore
//! use trawler_storage::{Database, DatabaseConfig, PgRepositories};
//!
//! // Connect to the database
//! let config = DatabaseConfig::for_indexer(&database_url);
//! let db = Database::connect(&config).await?;
//!
//! // Create tables if missing
//! db.init_schema().await?;
//!
//! // Create repositories
//! let repositories = Arc::new(PgRepositories::new(Arc::new(db)));
//! ```

pub mod postgres;

pub use postgres::{Database, DatabaseConfig, PgRepositories, PurgeStats};
