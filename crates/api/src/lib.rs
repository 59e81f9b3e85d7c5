//! HTTP query API for the Trawler indexer.
//!
//! Exposes indexed transfers and ingestion status as JSON over axum.
//!
//! # Endpoints
//!
//! - `GET /transfers/{address}?limit=N` - transfers where `address` is sender or recipient
//! - `GET /indexing/status` - last checkpoint, observed contract, configuration state
//! - `GET /health` - liveness
//!
//! The two data endpoints are also served under `/api`.
//!
//! # Usage
//!
//! ```ignore
//! use trawler_api::{ApiState, ServerConfig, serve_with_shutdown};
//!
//! let state = Arc::new(ApiState::new(query_service));
//! serve_with_shutdown(state, ServerConfig::default(), shutdown_signal).await?;
//! ```

mod handlers;
mod server;
mod types;

pub use handlers::{ApiState, create_api_router};
pub use server::{ServerConfig, serve_with_shutdown};
pub use types::{ApiError, StatusResponse, TransferDto, TransfersResponse};
