//! # Stockbridge Sync API
//!
//! HTTP surface of the ERP product sync.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Sync API Server                                  │
//! │                                                                         │
//! │  Admin UI ──► GET /sync?action=… ──► SyncOrchestrator ──┐              │
//! │  Admin UI ──► GET /sync/logs ─────► SyncLogStore        │              │
//! │  ERP ───────► POST /webhooks/erp ─► WebhookReceiver ────┼──► Postgres  │
//! │  ERP ───────► GET /webhooks/erp ──► challenge echo      │              │
//! │  Probes ────► GET /health                               ▼              │
//! │                                                      ERP API           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use axum::Router;
use tower_http::trace::TraceLayer;

pub use crate::config::{ConfigError, ServerConfig};
pub use crate::error::{ApiError, ApiResult, ErrorCode};
pub use crate::state::AppState;

/// Builds the application router.
///
/// Shared by the binary and the route tests so both see the same stack.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .merge(routes::sync::router())
        .merge(routes::webhook::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// Route Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::{DateTime, Utc};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use stockbridge_core::signature::generate_signature;
    use stockbridge_core::{
        ExternalProduct, NewSyncLogEntry, Pagination, ProductBatch, ProductPage, SyncStats,
        SyncStatus, SyncType,
    };
    use stockbridge_db::{CatalogStore, MemoryCatalog, MemorySyncLog, SyncLogStore};
    use stockbridge_sync::{
        ConnectionInfo, ProductSource, SyncError, SyncOrchestrator, SyncResult, SyncSettings,
        WebhookReceiver, WebhookSettings,
    };
    use tower::ServiceExt;

    const SECRET: &str = "route-secret";

    struct StaticSource {
        products: Vec<ExternalProduct>,
        down: bool,
    }

    impl StaticSource {
        fn fetch(&self) -> SyncResult<Vec<ExternalProduct>> {
            if self.down {
                Err(SyncError::ConnectionFailed("connection refused".into()))
            } else {
                Ok(self.products.clone())
            }
        }
    }

    #[async_trait]
    impl ProductSource for StaticSource {
        async fn authenticate(&self) -> bool {
            true
        }

        async fn test_connection(&self) -> SyncResult<ConnectionInfo> {
            self.fetch().map(|_| ConnectionInfo::default())
        }

        async fn get_products(&self, page: u32, limit: u32) -> SyncResult<ProductPage> {
            let products = self.fetch()?;
            let total = products.len() as u64;
            Ok(ProductPage {
                items: ProductBatch::from_products(
                    products.into_iter().take(limit as usize).collect(),
                ),
                pagination: Pagination::from_row_count(page, limit, total),
            })
        }

        async fn get_all_products(&self) -> SyncResult<ProductBatch> {
            self.fetch().map(ProductBatch::from_products)
        }

        async fn get_modified_products(&self, _since: DateTime<Utc>) -> SyncResult<ProductBatch> {
            self.fetch().map(ProductBatch::from_products)
        }

        async fn get_product(&self, id: i64) -> SyncResult<ExternalProduct> {
            self.fetch()?
                .into_iter()
                .find(|p| p.id == id)
                .ok_or_else(|| SyncError::ErpRejected("not found".into()))
        }
    }

    struct TestApp {
        router: Router,
        catalog: Arc<MemoryCatalog>,
        logs: Arc<MemorySyncLog>,
    }

    fn app(down: bool, webhook: WebhookSettings) -> TestApp {
        let products = vec![
            ExternalProduct {
                no: Some("PIPE-01".into()),
                name: Some("PVC Pipe 3/4\"".into()),
                unit_price: Some(42000.0),
                ..ExternalProduct::with_id(1)
            },
            ExternalProduct {
                no: Some("PIPE-02".into()),
                name: Some("PVC Pipe 1\"".into()),
                ..ExternalProduct::with_id(2)
            },
        ];
        let source: Arc<dyn ProductSource> = Arc::new(StaticSource { products, down });
        let catalog = Arc::new(MemoryCatalog::new());
        let logs = Arc::new(MemorySyncLog::new());

        let orchestrator = SyncOrchestrator::new(
            source.clone(),
            catalog.clone(),
            logs.clone(),
            SyncSettings::default(),
        );
        let webhooks = WebhookReceiver::new(source, catalog.clone(), logs.clone(), webhook);

        let state = AppState {
            orchestrator: Arc::new(orchestrator),
            webhooks: Arc::new(webhooks),
            sync_logs: logs.clone(),
            database: None,
        };

        TestApp {
            router: build_router(state),
            catalog,
            logs,
        }
    }

    fn signed_settings() -> WebhookSettings {
        WebhookSettings {
            secret: Some(SECRET.into()),
            verify_token: Some("tok".into()),
            allow_unsigned: false,
        }
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, body.to_vec())
    }

    async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
        let (status, body) = send(router, Request::get(uri).body(Body::empty()).unwrap()).await;
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    fn webhook_post(body: &str, signature: Option<&str>) -> Request<Body> {
        let mut request = Request::post("/webhooks/erp").header("content-type", "application/json");
        if let Some(sig) = signature {
            request = request.header("x-signature", sig);
        }
        request.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = app(false, signed_settings());
        let (status, body) = get(&app.router, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert!(body["db_healthy"].is_null());
    }

    #[tokio::test]
    async fn test_sync_success() {
        let app = app(false, signed_settings());
        let (status, body) = get(&app.router, "/sync?action=sync").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["stats"]["created"], 2);
        assert!(body.get("errors").is_none());
        assert_eq!(app.catalog.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_full_sync_failure_is_500() {
        let app = app(true, signed_settings());
        let (status, body) = get(&app.router, "/sync?action=full-sync").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert!(body["errors"][0].as_str().unwrap().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_connection_test_route() {
        let app = app(false, signed_settings());
        let (status, body) = get(&app.router, "/sync?action=test-connection").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["details"]["totalProducts"], 2);
        assert!(app.logs.entries().await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_or_missing_action() {
        let app = app(false, signed_settings());

        let (status, body) = get(&app.router, "/sync?action=purge").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "BAD_REQUEST");

        let (status, _) = get(&app.router, "/sync").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_sync_logs_newest_first() {
        let app = app(false, signed_settings());
        for sync_type in [SyncType::Products, SyncType::ProductsFull, SyncType::Webhook] {
            app.logs
                .append(&NewSyncLogEntry::new(
                    sync_type,
                    SyncStatus::Completed,
                    SyncStats::default(),
                    json!({}),
                ))
                .await
                .unwrap();
        }

        let (status, body) = get(&app.router, "/sync/logs?limit=2").await;
        assert_eq!(status, StatusCode::OK);
        let logs = body["logs"].as_array().unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0]["sync_type"], "webhook");
    }

    #[tokio::test]
    async fn test_webhook_signed_event_applied() {
        let app = app(false, signed_settings());
        let body = r#"{"event":"item.created","data":{"id":1,"itemNo":"PIPE-01"}}"#;
        let signature = generate_signature(body, SECRET);

        let (status, raw) = send(&app.router, webhook_post(body, Some(&signature))).await;
        let json: Value = serde_json::from_slice(&raw).unwrap();

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["processed"], 1);
        assert!(app.catalog.find_by_external_id(1).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_webhook_bad_signature_is_401_without_writes() {
        let app = app(false, signed_settings());
        let body = r#"{"event":"item.created","data":{"id":1}}"#;

        let (status, raw) = send(&app.router, webhook_post(body, Some("00ff"))).await;
        let json: Value = serde_json::from_slice(&raw).unwrap();

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["code"], "INVALID_SIGNATURE");
        assert_eq!(app.catalog.count().await.unwrap(), 0);
        assert!(app.logs.entries().await.is_empty());
    }

    #[tokio::test]
    async fn test_webhook_unconfigured_is_503() {
        let app = app(false, WebhookSettings::default());
        let (status, _) = send(&app.router, webhook_post("{}", None)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_webhook_malformed_and_unsupported_are_400() {
        let app = app(false, signed_settings());

        let garbage = "not json";
        let sig = generate_signature(garbage, SECRET);
        let (status, _) = send(&app.router, webhook_post(garbage, Some(&sig))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let unsupported = r#"{"event":"order.created","data":{"id":5}}"#;
        let sig = generate_signature(unsupported, SECRET);
        let (status, raw) = send(&app.router, webhook_post(unsupported, Some(&sig))).await;
        let json: Value = serde_json::from_slice(&raw).unwrap();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "UNSUPPORTED_EVENT");
    }

    #[tokio::test]
    async fn test_webhook_processing_failure_is_500() {
        let app = app(true, signed_settings());
        let body = r#"{"event":"item.updated","data":{"id":1}}"#;
        let sig = generate_signature(body, SECRET);

        let (status, raw) = send(&app.router, webhook_post(body, Some(&sig))).await;
        let json: Value = serde_json::from_slice(&raw).unwrap();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn test_challenge_echo_and_forbidden() {
        let app = app(false, signed_settings());

        let (status, body) = send(
            &app.router,
            Request::get("/webhooks/erp?challenge=abc&verify_token=tok")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"abc");

        let (status, _) = get(&app.router, "/webhooks/erp?challenge=abc&verify_token=nope").await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = get(&app.router, "/webhooks/erp?verify_token=tok").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
