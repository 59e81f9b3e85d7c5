//! Route handlers and error mapping.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;
use tracing::{debug, error};

use trawler_core::error::{DomainError, IndexerError};
use trawler_core::ports::Repositories;
use trawler_core::services::QueryService;

use crate::types::{ApiError, LimitParams, StatusResponse, TransfersResponse};

/// Shared state of the API router.
pub struct ApiState {
    pub query: QueryService<dyn Repositories>,
}

impl ApiState {
    pub fn new(query: QueryService<dyn Repositories>) -> Self {
        Self { query }
    }
}

/// Build the router.
///
/// Data routes are mounted both at the root and under `/api`.
pub fn create_api_router(state: Arc<ApiState>) -> Router {
    let data_routes = Router::new()
        .route("/transfers/{address}", get(get_transfers))
        .route("/indexing/status", get(get_indexing_status));

    Router::new()
        .route("/health", get(health_check))
        .merge(data_routes.clone())
        .nest("/api", data_routes)
        .with_state(state)
}

// =============================================================================
// Handlers
// =============================================================================

async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "trawler",
    }))
}

async fn get_transfers(
    State(state): State<Arc<ApiState>>,
    Path(address): Path<String>,
    params: Result<Query<LimitParams>, QueryRejection>,
) -> Result<Json<TransfersResponse>, ApiErrorResponse> {
    let Query(params) = params.map_err(|e| ApiErrorResponse::bad_request(e.body_text()))?;

    debug!(address = %address, limit = ?params.limit, "Transfers lookup");

    let page = state.query.transfers_for(&address, params.limit).await?;
    Ok(Json(TransfersResponse::from(page)))
}

async fn get_indexing_status(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<StatusResponse>, ApiErrorResponse> {
    let status = state.query.status().await?;
    Ok(Json(StatusResponse::from(status)))
}

// =============================================================================
// Errors
// =============================================================================

/// Error response with status code and JSON body.
pub struct ApiErrorResponse {
    status: StatusCode,
    body: Json<ApiError>,
}

impl ApiErrorResponse {
    pub fn new(status: StatusCode, error: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: Json(ApiError {
                error: error.to_string(),
                message: message.into(),
            }),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        let message = message.into();
        error!("Internal server error: {}", message);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
    }
}

impl From<IndexerError> for ApiErrorResponse {
    fn from(err: IndexerError) -> Self {
        match err {
            IndexerError::Domain(DomainError::InvalidAddress(msg)) => {
                Self::new(StatusCode::BAD_REQUEST, "invalid_address", msg)
            }
            other => Self::internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (self.status, self.body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::U256;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;
    use trawler_core::models::{Address, TransferRecord, TxHash};
    use trawler_core::services::QueryConfig;
    use trawler_core::testing::MemoryRepositories;

    const TOKEN: Address = Address([0xc0; 20]);
    const ALICE: Address = Address([0xa1; 20]);
    const BOB: Address = Address([0xb0; 20]);

    async fn router(repos: Arc<MemoryRepositories>, configured: bool) -> Router {
        let config = QueryConfig {
            contract: configured.then_some(TOKEN),
            decimals: 18,
            configured,
        };
        let repos: Arc<dyn Repositories> = repos;
        create_api_router(Arc::new(ApiState::new(QueryService::new(config, repos))))
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn transfer(block: u64, tx: u8, value: U256) -> TransferRecord {
        TransferRecord {
            tx_hash: TxHash([tx; 32]),
            block_number: block,
            timestamp: 1_700_000_000 + block * 12,
            from: ALICE,
            to: BOB,
            value,
        }
    }

    #[tokio::test]
    async fn health_is_ok() {
        let app = router(Arc::new(MemoryRepositories::default()), false).await;
        let (status, body) = get_json(app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn transfers_keep_full_precision() {
        let repos = Arc::new(MemoryRepositories::default());
        let value: U256 = "123456789012345678901234567890".parse().unwrap();
        repos.transfers().insert(&transfer(7, 1, value)).await.unwrap();
        let app = router(repos, true).await;

        let uri = format!("/transfers/{}", BOB.to_hex().to_uppercase().replacen("0X", "0x", 1));
        let (status, body) = get_json(app, &uri).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["address"], BOB.to_hex());
        assert_eq!(body["total"], 1);
        let item = &body["data"][0];
        assert_eq!(item["txHash"], TxHash([1; 32]).to_hex());
        assert_eq!(item["blockNumber"], 7);
        assert_eq!(item["timestamp"], 1_700_000_084u64);
        assert_eq!(item["from"], ALICE.to_hex());
        assert_eq!(item["to"], BOB.to_hex());
        assert_eq!(item["value"], "123456789012345678901234567890");
        assert_eq!(item["valueFormatted"], "123456789012.34567890123456789");
    }

    #[tokio::test]
    async fn limit_is_applied_under_api_prefix() {
        let repos = Arc::new(MemoryRepositories::default());
        for block in 1..=5u8 {
            repos
                .transfers()
                .insert(&transfer(block as u64, block, U256::from(1)))
                .await
                .unwrap();
        }
        let app = router(repos, true).await;

        let uri = format!("/api/transfers/{}?limit=2", ALICE.to_hex());
        let (status, body) = get_json(app, &uri).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 2);
        assert_eq!(body["data"][0]["blockNumber"], 5);
        assert_eq!(body["data"][1]["blockNumber"], 4);
    }

    #[tokio::test]
    async fn invalid_address_is_bad_request() {
        let app = router(Arc::new(MemoryRepositories::default()), true).await;
        let (status, body) = get_json(app, "/transfers/0x1234").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_address");
    }

    #[tokio::test]
    async fn malformed_limit_is_bad_request() {
        let app = router(Arc::new(MemoryRepositories::default()), true).await;
        let uri = format!("/transfers/{}?limit=lots", ALICE.to_hex());
        let (status, body) = get_json(app, &uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "bad_request");
    }

    #[tokio::test]
    async fn status_reports_degraded_mode() {
        let app = router(Arc::new(MemoryRepositories::default()), false).await;
        let (status, body) = get_json(app, "/indexing/status").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["configured"], false);
        assert!(body["lastIndexedBlock"].is_null());
        assert!(body["contractAddress"].is_null());
    }

    #[tokio::test]
    async fn status_reports_checkpoint() {
        let repos = Arc::new(MemoryRepositories::default());
        repos.checkpoint().set(1234).await.unwrap();
        let app = router(repos, true).await;

        let (_, body) = get_json(app, "/api/indexing/status").await;

        assert_eq!(body["configured"], true);
        assert_eq!(body["lastIndexedBlock"], 1234);
        assert_eq!(body["contractAddress"], TOKEN.to_hex());
    }
}
