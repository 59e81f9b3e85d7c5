//! HTTP JSON-RPC client implementing the LogReader port.

use std::future::Future;
use std::time::Duration;

use alloy::eips::BlockNumberOrTag;
use alloy::primitives::{self, B256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::Filter;
use alloy::transports::{TransportError, http::reqwest::Url};
use async_trait::async_trait;
use tracing::{debug, instrument, trace, warn};

use trawler_core::error::{ChainError, ChainResult};
use trawler_core::metrics::record_decode_error;
use trawler_core::models::{Address, EventSignature};
use trawler_core::ports::{LogReader, RawTransferLog};

use crate::events::decode_transfer;

/// JSON-RPC error code several providers use for "limit exceeded".
const LIMIT_EXCEEDED_CODE: i64 = -32005;

/// Fragments of provider messages that mean "ask for fewer blocks".
const RANGE_ERROR_FRAGMENTS: &[&str] = &[
    "block range",
    "range too large",
    "range is too large",
    "range too wide",
    "more than 10000 results",
    "query returned more than",
    "response size exceeded",
    "log response size",
    "too many logs",
    "exceed maximum block range",
];

/// Configuration for the EVM client.
#[derive(Debug, Clone)]
pub struct EvmLogReaderConfig {
    /// HTTP JSON-RPC URL (e.g., "http://localhost:8545").
    pub rpc_url: String,
    /// Upper bound on a single RPC call.
    pub request_timeout: Duration,
}

impl EvmLogReaderConfig {
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// EVM adapter implementing the LogReader port.
pub struct EvmLogReader {
    provider: DynProvider,
    request_timeout: Duration,
}

impl EvmLogReader {
    /// Build an HTTP provider for the endpoint.
    ///
    /// No request is sent; an unreachable node surfaces on the first call.
    #[instrument(skip_all, fields(url = %config.rpc_url))]
    pub fn connect(config: EvmLogReaderConfig) -> ChainResult<Self> {
        let url = Url::parse(&config.rpc_url)
            .map_err(|e| ChainError::ConnectionFailed(format!("invalid RPC URL: {e}")))?;
        let provider = ProviderBuilder::new().connect_http(url);

        debug!("Provider ready");

        Ok(Self {
            provider: DynProvider::new(provider),
            request_timeout: config.request_timeout,
        })
    }

    /// Chain id reported by the endpoint.
    pub async fn chain_id(&self) -> ChainResult<u64> {
        self.call(self.provider.get_chain_id(), ChainError::RpcError)
            .await
    }

    /// Run an RPC future under the request timeout.
    async fn call<T, F>(&self, fut: F, map_err: impl FnOnce(String) -> ChainError) -> ChainResult<T>
    where
        F: Future<Output = Result<T, TransportError>>,
    {
        match tokio::time::timeout(self.request_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(classify_error(&e, map_err)),
            Err(_) => Err(ChainError::ConnectionFailed(format!(
                "request timed out after {}s",
                self.request_timeout.as_secs()
            ))),
        }
    }
}

#[async_trait]
impl LogReader for EvmLogReader {
    #[instrument(skip(self, address, signature))]
    async fn fetch_logs(
        &self,
        address: &Address,
        signature: &EventSignature,
        from_block: u64,
        to_block: u64,
    ) -> ChainResult<Vec<RawTransferLog>> {
        let filter = Filter::new()
            .address(primitives::Address::from(address.0))
            .event_signature(B256::from(signature.0))
            .from_block(from_block)
            .to_block(to_block);

        let logs = match tokio::time::timeout(self.request_timeout, self.provider.get_logs(&filter))
            .await
        {
            Ok(Ok(logs)) => logs,
            Ok(Err(e)) => {
                let message = error_message(&e);
                if is_range_error(&e, &message) {
                    return Err(ChainError::RangeTooWide {
                        from: from_block,
                        to: to_block,
                        message,
                    });
                }
                return Err(classify_error(&e, ChainError::RpcError));
            }
            Err(_) => {
                return Err(ChainError::ConnectionFailed(format!(
                    "eth_getLogs timed out after {}s",
                    self.request_timeout.as_secs()
                )));
            }
        };

        trace!(count = logs.len(), "Logs received");

        let mut transfers = Vec::with_capacity(logs.len());
        for log in &logs {
            match decode_transfer(log) {
                Ok(transfer) => transfers.push(transfer),
                Err(e) => {
                    record_decode_error();
                    warn!(
                        tx = ?log.transaction_hash,
                        block = ?log.block_number,
                        error = %e,
                        "⚠️  Skipping undecodable log"
                    );
                }
            }
        }

        Ok(transfers)
    }

    async fn block_timestamp(&self, block_number: u64) -> ChainResult<u64> {
        let block = self
            .call(
                self.provider
                    .get_block_by_number(BlockNumberOrTag::Number(block_number))
                    .into_future(),
                ChainError::RpcError,
            )
            .await?
            .ok_or(ChainError::BlockNotFound(block_number))?;

        Ok(block.header.timestamp)
    }

    async fn head_block(&self) -> ChainResult<u64> {
        self.call(self.provider.get_block_number(), ChainError::RpcError)
            .await
    }
}

// =============================================================================
// Error classification
// =============================================================================

/// Message of a JSON-RPC error response, or the transport error text.
fn error_message(err: &TransportError) -> String {
    match err.as_error_resp() {
        Some(payload) => payload.message.to_string(),
        None => err.to_string(),
    }
}

/// Whether the provider refused the request because of its range size.
fn is_range_error(err: &TransportError, message: &str) -> bool {
    if err
        .as_error_resp()
        .is_some_and(|payload| payload.code == LIMIT_EXCEEDED_CODE)
    {
        return true;
    }
    is_range_message(message)
}

fn is_range_message(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    RANGE_ERROR_FRAGMENTS
        .iter()
        .any(|fragment| message.contains(fragment))
}

/// Transport failures are connection errors; everything else goes through `map_err`.
fn classify_error(err: &TransportError, map_err: impl FnOnce(String) -> ChainError) -> ChainError {
    if err.is_transport_error() {
        ChainError::ConnectionFailed(err.to_string())
    } else {
        map_err(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::rpc::json_rpc::ErrorPayload;
    use alloy::transports::{RpcError, TransportErrorKind};

    fn error_response(code: i64, message: &'static str) -> TransportError {
        RpcError::ErrorResp(ErrorPayload {
            code,
            message: message.into(),
            data: None,
        })
    }

    #[test]
    fn provider_range_messages_are_recognized() {
        for message in [
            "query returned more than 10000 results",
            "Block range is too large",
            "eth_getLogs block range too wide",
            "Log response size exceeded. Use up to a 2K block range",
            "exceed maximum block range: 5000",
        ] {
            assert!(is_range_message(message), "{message}");
        }
        assert!(!is_range_message("execution reverted"));
        assert!(!is_range_message("invalid params"));
    }

    #[test]
    fn limit_exceeded_code_is_a_range_error() {
        let err = error_response(LIMIT_EXCEEDED_CODE, "limit exceeded");
        assert!(is_range_error(&err, &error_message(&err)));

        let err = error_response(-32602, "invalid argument 0");
        assert!(!is_range_error(&err, &error_message(&err)));
    }

    #[test]
    fn transport_failures_are_connection_errors() {
        let err: TransportError = TransportErrorKind::custom_str("connection refused");
        assert!(matches!(
            classify_error(&err, ChainError::RpcError),
            ChainError::ConnectionFailed(_)
        ));

        let err = error_response(-32000, "header not found");
        assert!(matches!(
            classify_error(&err, ChainError::RpcError),
            ChainError::RpcError(_)
        ));
    }

    #[test]
    fn invalid_url_fails_fast() {
        assert!(matches!(
            EvmLogReader::connect(EvmLogReaderConfig::new("not a url")),
            Err(ChainError::ConnectionFailed(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_connection_error() {
        let reader = EvmLogReader::connect(EvmLogReaderConfig {
            rpc_url: "http://127.0.0.1:1".into(),
            request_timeout: Duration::from_secs(5),
        })
        .unwrap();
        assert!(matches!(
            reader.head_block().await,
            Err(ChainError::ConnectionFailed(_))
        ));
    }
}
