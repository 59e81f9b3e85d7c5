//! Solidity event bindings and log decoding.

use alloy::rpc::types::Log;
use alloy::sol;

use trawler_core::error::{ChainError, ChainResult};
use trawler_core::models::{Address, TxHash};
use trawler_core::ports::RawTransferLog;

sol! {
    /// ERC20 `Transfer` event.
    #[derive(Debug, PartialEq, Eq)]
    event Transfer(address indexed from, address indexed to, uint256 value);
}

/// Decode an RPC log into a [`RawTransferLog`].
///
/// Fails for pending logs (no block number or transaction hash), removed
/// logs, and anything that is not an ERC20 `Transfer` shape, such as an
/// ERC721 `Transfer` with an indexed token id.
pub fn decode_transfer(log: &Log) -> ChainResult<RawTransferLog> {
    if log.removed {
        return Err(ChainError::DecodeError("log was removed by a reorg".into()));
    }
    let tx_hash = log
        .transaction_hash
        .ok_or_else(|| ChainError::DecodeError("log has no transaction hash".into()))?;
    let block_number = log
        .block_number
        .ok_or_else(|| ChainError::DecodeError("log has no block number".into()))?;

    let decoded = log
        .log_decode::<Transfer>()
        .map_err(|e| ChainError::DecodeError(e.to_string()))?;
    let event = &decoded.inner.data;

    Ok(RawTransferLog {
        tx_hash: TxHash(tx_hash.0),
        block_number,
        log_index: log.log_index,
        from: Address(event.from.0.0),
        to: Address(event.to.0.0),
        value: event.value,
    })
}
