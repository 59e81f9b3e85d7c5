//! JSON request and response types.

use serde::{Deserialize, Serialize};

use trawler_core::services::{FormattedTransfer, IndexingStatus, TransferPage};

/// Query string of `GET /transfers/{address}`.
#[derive(Debug, Default, Deserialize)]
pub struct LimitParams {
    pub limit: Option<u32>,
}

/// One transfer as served to clients.
///
/// `value` is the exact integer as a decimal string; `value_formatted` is
/// scaled by the token decimals for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferDto {
    pub tx_hash: String,
    pub block_number: u64,
    pub timestamp: u64,
    pub from: String,
    pub to: String,
    pub value: String,
    pub value_formatted: String,
}

impl From<FormattedTransfer> for TransferDto {
    fn from(t: FormattedTransfer) -> Self {
        Self {
            tx_hash: t.record.tx_hash.to_hex(),
            block_number: t.record.block_number,
            timestamp: t.record.timestamp,
            from: t.record.from.to_hex(),
            to: t.record.to.to_hex(),
            value: t.record.value.to_string(),
            value_formatted: t.value_formatted,
        }
    }
}

/// Response of `GET /transfers/{address}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransfersResponse {
    pub address: String,
    pub total: usize,
    pub data: Vec<TransferDto>,
}

impl From<TransferPage> for TransfersResponse {
    fn from(page: TransferPage) -> Self {
        let data: Vec<TransferDto> = page.transfers.into_iter().map(TransferDto::from).collect();
        Self {
            address: page.address.to_hex(),
            total: data.len(),
            data,
        }
    }
}

/// Response of `GET /indexing/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub last_indexed_block: Option<u64>,
    pub contract_address: Option<String>,
    pub configured: bool,
}

impl From<IndexingStatus> for StatusResponse {
    fn from(status: IndexingStatus) -> Self {
        Self {
            last_indexed_block: status.last_indexed_block,
            contract_address: status.contract.map(|c| c.to_hex()),
            configured: status.configured,
        }
    }
}

/// Error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub message: String,
}
