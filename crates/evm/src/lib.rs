//! EVM JSON-RPC adapter for the Trawler indexer.
//!
//! This crate implements the [`LogReader`] port from `trawler-core`,
//! reading ERC20 `Transfer` logs and block timestamps over HTTP JSON-RPC
//! with alloy.
//!
//! # Features
//!
//! - `eth_getLogs` over an explicit block range, filtered by contract and topic 0
//! - `Transfer` decoding via `sol!` bindings; undecodable logs are skipped
//! - Provider range-limit rejections surfaced as `ChainError::RangeTooWide`
//! - Per-request timeout
//!
//! # Usage
//!
//! ```ignore
//! use trawler_evm::{EvmLogReader, EvmLogReaderConfig};
//!
//! let reader = EvmLogReader::connect(EvmLogReaderConfig::new("http://localhost:8545"))?;
//! let head = reader.head_block().await?;
//! let logs = reader
//!     .fetch_logs(&contract, &TRANSFER_EVENT_SIGNATURE, head - 100, head)
//!     .await?;
//! ```
//!
//! [`LogReader`]: trawler_core::ports::LogReader

mod client;
mod events;

pub use client::{EvmLogReader, EvmLogReaderConfig};
pub use events::{Transfer, decode_transfer};
