//! # Webhook Receiver
//!
//! Verifies and applies item events pushed by the ERP.
//!
//! ## Event Handling
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         WebhookReceiver                                 │
//! │                                                                         │
//! │  raw body + x-signature                                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  verify ── secret set ──► HMAC-SHA256(body) == header ? ok : 401       │
//! │         ── no secret ───► allow_unsigned ? ok : 503                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  handle(payload)                                                        │
//! │       ├── log `webhook` entry (running)                                 │
//! │       ├── item.created / item.updated                                   │
//! │       │      authenticate ──► get_product(id) ──► upsert                │
//! │       ├── item.deleted                                                  │
//! │       │      find_by_external_id ──► soft_delete  (absent: no-op)       │
//! │       └── finalize entry (completed | failed)                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::client::ProductSource;
use crate::config::WebhookSettings;
use crate::error::{SyncError, SyncResult};
use crate::orchestrator::{apply_product, Applied};
use stockbridge_core::signature::verify_signature;
use stockbridge_core::{
    NewSyncLogEntry, SyncStats, SyncStatus, SyncType, WebhookEvent, WebhookOutcome,
    WebhookPayload,
};
use stockbridge_db::{CatalogStore, SyncLogStore};

pub struct WebhookReceiver {
    source: Arc<dyn ProductSource>,
    catalog: Arc<dyn CatalogStore>,
    logs: Arc<dyn SyncLogStore>,
    settings: WebhookSettings,
}

impl WebhookReceiver {
    pub fn new(
        source: Arc<dyn ProductSource>,
        catalog: Arc<dyn CatalogStore>,
        logs: Arc<dyn SyncLogStore>,
        settings: WebhookSettings,
    ) -> Self {
        WebhookReceiver {
            source,
            catalog,
            logs,
            settings,
        }
    }

    // =========================================================================
    // Verification
    // =========================================================================

    /// Checks the `x-signature` header against the raw request body.
    ///
    /// Must run before the body is parsed: the signature covers the exact
    /// bytes received.
    pub fn verify(&self, body: &[u8], signature: Option<&str>) -> SyncResult<()> {
        let Some(secret) = self.settings.secret.as_deref() else {
            if self.settings.allow_unsigned {
                warn!("Accepting unsigned webhook (ACCURATE_WEBHOOK_ALLOW_UNSIGNED)");
                return Ok(());
            }
            return Err(SyncError::WebhookNotConfigured);
        };

        let signature = signature
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(SyncError::InvalidSignature)?;
        let body = std::str::from_utf8(body).map_err(|_| SyncError::InvalidSignature)?;

        if verify_signature(signature, body, secret) {
            Ok(())
        } else {
            warn!("Webhook signature mismatch");
            Err(SyncError::InvalidSignature)
        }
    }

    /// Answers the ERP's subscription handshake by echoing `challenge`.
    pub fn verify_challenge(
        &self,
        challenge: Option<&str>,
        verify_token: Option<&str>,
    ) -> SyncResult<String> {
        if let Some(expected) = self.settings.verify_token.as_deref() {
            if verify_token != Some(expected) {
                return Err(SyncError::Forbidden);
            }
        }

        challenge
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .ok_or_else(|| SyncError::InvalidPayload("missing challenge".to_string()))
    }

    // =========================================================================
    // Handling
    // =========================================================================

    /// Applies one verified event.
    ///
    /// Unknown events are an error; processing failures come back as an
    /// outcome with `success = false`.
    pub async fn handle(&self, payload: &WebhookPayload) -> SyncResult<WebhookOutcome> {
        let event: WebhookEvent = payload
            .event
            .parse()
            .map_err(|_| SyncError::UnsupportedEvent(payload.event.clone()))?;
        let external_id = payload.data.id;

        info!(event = event.as_str(), external_id, "Received ERP webhook");

        let log_id = self.start_log(event, payload).await;
        let outcome = match event {
            WebhookEvent::ItemCreated | WebhookEvent::ItemUpdated => {
                self.upsert_item(external_id).await
            }
            WebhookEvent::ItemDeleted => self.delete_item(external_id).await,
        };
        let (outcome, stats) = match outcome {
            Ok(done) => done,
            Err(message) => {
                warn!(event = event.as_str(), external_id, error = %message, "Webhook processing failed");
                let stats = SyncStats {
                    processed: 1,
                    failed: 1,
                    ..SyncStats::default()
                };
                let outcome = WebhookOutcome::failed(
                    format!("Failed to process {}", event.as_str()),
                    vec![message],
                );
                (outcome, stats)
            }
        };

        if let Some(id) = log_id {
            self.finish_log(id, event, &outcome, stats).await;
        }
        Ok(outcome)
    }

    async fn upsert_item(&self, external_id: i64) -> Result<(WebhookOutcome, SyncStats), String> {
        if !self.source.authenticate().await {
            return Err(SyncError::InvalidToken.to_string());
        }

        let product = self
            .source
            .get_product(external_id)
            .await
            .map_err(|e| format!("{}: {}", external_id, e))?;
        let applied = apply_product(self.catalog.as_ref(), &product, Utc::now()).await?;

        let mut stats = SyncStats {
            processed: 1,
            ..SyncStats::default()
        };
        let verb = match applied {
            Applied::Created => {
                stats.created = 1;
                "created"
            }
            Applied::Updated => {
                stats.updated = 1;
                "updated"
            }
        };
        debug!(external_id, verb, "Webhook upsert applied");
        Ok((
            WebhookOutcome::processed(format!("Product {} {}", external_id, verb), 1),
            stats,
        ))
    }

    async fn delete_item(&self, external_id: i64) -> Result<(WebhookOutcome, SyncStats), String> {
        let existing = self
            .catalog
            .find_by_external_id(external_id)
            .await
            .map_err(|e| format!("{}: {}", external_id, e))?;

        let Some(product) = existing else {
            debug!(external_id, "Deleted item not in catalog");
            return Ok((
                WebhookOutcome::processed(format!("Product {} not in catalog", external_id), 0),
                SyncStats::default(),
            ));
        };

        self.catalog
            .soft_delete(product.id, Utc::now())
            .await
            .map_err(|e| format!("{}: {}", product.sku, e))?;

        Ok((
            WebhookOutcome::processed(format!("Product {} deactivated", external_id), 1),
            SyncStats {
                processed: 1,
                updated: 1,
                ..SyncStats::default()
            },
        ))
    }

    // =========================================================================
    // Audit Log
    // =========================================================================

    async fn start_log(&self, event: WebhookEvent, payload: &WebhookPayload) -> Option<Uuid> {
        let entry = NewSyncLogEntry::new(
            SyncType::Webhook,
            SyncStatus::Running,
            SyncStats::default(),
            json!({
                "event": event.as_str(),
                "externalId": payload.data.id,
                "itemNo": payload.data.item_no,
                "timestamp": payload.data.timestamp,
            }),
        );

        match self.logs.append(&entry).await {
            Ok(stored) => Some(stored.id),
            Err(e) => {
                warn!(error = %e, "Failed to write webhook log");
                None
            }
        }
    }

    async fn finish_log(
        &self,
        id: Uuid,
        event: WebhookEvent,
        outcome: &WebhookOutcome,
        stats: SyncStats,
    ) {
        let status = if outcome.success {
            SyncStatus::Completed
        } else {
            SyncStatus::Failed
        };

        let details = json!({
            "event": event.as_str(),
            "message": outcome.message,
            "errors": outcome.errors,
        });
        if let Err(e) = self.logs.finalize(id, status, stats, details).await {
            warn!(error = %e, log_id = %id, "Failed to finalize webhook log");
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ConnectionInfo;
    use async_trait::async_trait;
    use chrono::DateTime;
    use stockbridge_core::mapping::map_external_product;
    use stockbridge_core::signature::generate_signature;
    use stockbridge_core::{ExternalProduct, ProductBatch, ProductPage, WebhookData};
    use stockbridge_db::{MemoryCatalog, MemorySyncLog};

    struct DetailSource {
        products: Vec<ExternalProduct>,
    }

    #[async_trait]
    impl ProductSource for DetailSource {
        async fn authenticate(&self) -> bool {
            true
        }

        async fn test_connection(&self) -> SyncResult<ConnectionInfo> {
            Ok(ConnectionInfo::default())
        }

        async fn get_products(&self, _page: u32, _limit: u32) -> SyncResult<ProductPage> {
            Err(SyncError::Internal("not used".into()))
        }

        async fn get_all_products(&self) -> SyncResult<ProductBatch> {
            Err(SyncError::Internal("not used".into()))
        }

        async fn get_modified_products(&self, _since: DateTime<Utc>) -> SyncResult<ProductBatch> {
            Err(SyncError::Internal("not used".into()))
        }

        async fn get_product(&self, id: i64) -> SyncResult<ExternalProduct> {
            self.products
                .iter()
                .find(|p| p.id == id)
                .cloned()
                .ok_or_else(|| SyncError::ErpRejected("Barang tidak ditemukan".into()))
        }
    }

    const SECRET: &str = "webhook-secret";

    fn receiver(
        products: Vec<ExternalProduct>,
        settings: WebhookSettings,
    ) -> (WebhookReceiver, Arc<MemoryCatalog>, Arc<MemorySyncLog>) {
        let catalog = Arc::new(MemoryCatalog::new());
        let logs = Arc::new(MemorySyncLog::new());
        let receiver = WebhookReceiver::new(
            Arc::new(DetailSource { products }),
            catalog.clone(),
            logs.clone(),
            settings,
        );
        (receiver, catalog, logs)
    }

    fn signed() -> WebhookSettings {
        WebhookSettings {
            secret: Some(SECRET.into()),
            verify_token: Some("verify-me".into()),
            allow_unsigned: false,
        }
    }

    fn payload(event: &str, id: i64) -> WebhookPayload {
        WebhookPayload {
            event: event.to_string(),
            data: WebhookData {
                id,
                item_no: Some(format!("SKU-{}", id)),
                timestamp: None,
            },
        }
    }

    fn erp_item(id: i64) -> ExternalProduct {
        ExternalProduct {
            no: Some(format!("SKU-{}", id)),
            name: Some("Ball Valve 1/2\"".into()),
            unit_price: Some(85000.0),
            ..ExternalProduct::with_id(id)
        }
    }

    #[test]
    fn test_verify_accepts_valid_signature() {
        let (receiver, _, _) = receiver(Vec::new(), signed());
        let body = br#"{"event":"item.updated","data":{"id":1}}"#;
        let signature = generate_signature(std::str::from_utf8(body).unwrap(), SECRET);

        assert!(receiver.verify(body, Some(&signature)).is_ok());
    }

    #[test]
    fn test_verify_rejects_bad_or_missing_signature() {
        let (receiver, _, _) = receiver(Vec::new(), signed());
        let body = br#"{"event":"item.updated","data":{"id":1}}"#;

        assert!(matches!(
            receiver.verify(body, Some("deadbeef")),
            Err(SyncError::InvalidSignature)
        ));
        assert!(matches!(
            receiver.verify(body, None),
            Err(SyncError::InvalidSignature)
        ));
    }

    #[test]
    fn test_verify_without_secret() {
        let (strict, _, _) = receiver(Vec::new(), WebhookSettings::default());
        assert!(matches!(
            strict.verify(b"{}", None),
            Err(SyncError::WebhookNotConfigured)
        ));

        let open = WebhookSettings {
            allow_unsigned: true,
            ..WebhookSettings::default()
        };
        let (lenient, _, _) = receiver(Vec::new(), open);
        assert!(lenient.verify(b"{}", None).is_ok());
    }

    #[test]
    fn test_verify_challenge() {
        let (receiver, _, _) = receiver(Vec::new(), signed());

        assert_eq!(
            receiver
                .verify_challenge(Some("abc123"), Some("verify-me"))
                .unwrap(),
            "abc123"
        );
        assert!(matches!(
            receiver.verify_challenge(Some("abc123"), Some("wrong")),
            Err(SyncError::Forbidden)
        ));
        assert!(matches!(
            receiver.verify_challenge(None, Some("verify-me")),
            Err(SyncError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_challenge_without_verify_token_configured() {
        let (receiver, _, _) = receiver(Vec::new(), WebhookSettings::default());
        assert_eq!(receiver.verify_challenge(Some("xyz"), None).unwrap(), "xyz");
    }

    #[tokio::test]
    async fn test_item_created_inserts_and_finalizes_log() {
        let (receiver, catalog, logs) = receiver(vec![erp_item(7)], signed());

        let outcome = receiver.handle(&payload("item.created", 7)).await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.processed, 1);

        let product = catalog.find_by_external_id(7).await.unwrap().unwrap();
        assert_eq!(product.sku, "SKU-7");
        assert_eq!(product.price_cents, 8_500_000);

        let entries = logs.entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].sync_type, SyncType::Webhook);
        assert_eq!(entries[0].status, SyncStatus::Completed);
        assert!(entries[0].completed_at.is_some());
    }

    #[tokio::test]
    async fn test_item_updated_overwrites_existing() {
        let (receiver, catalog, _) = receiver(vec![erp_item(7)], signed());
        let mut stale = erp_item(7);
        stale.unit_price = Some(1.0);
        catalog
            .insert(&map_external_product(&stale, Utc::now()))
            .await
            .unwrap();

        let outcome = receiver.handle(&payload("item.updated", 7)).await.unwrap();
        assert!(outcome.message.contains("updated"));
        assert_eq!(catalog.count().await.unwrap(), 1);
        assert_eq!(
            catalog.find_by_external_id(7).await.unwrap().unwrap().price_cents,
            8_500_000
        );
    }

    #[tokio::test]
    async fn test_item_deleted_soft_deletes() {
        let (receiver, catalog, _) = receiver(Vec::new(), signed());
        catalog
            .insert(&map_external_product(&erp_item(3), Utc::now()))
            .await
            .unwrap();

        let outcome = receiver.handle(&payload("item.deleted", 3)).await.unwrap();
        assert_eq!(outcome.processed, 1);
        assert!(!catalog.find_by_external_id(3).await.unwrap().unwrap().is_active);
    }

    #[tokio::test]
    async fn test_deleting_unknown_item_is_noop() {
        let (receiver, catalog, _) = receiver(Vec::new(), signed());

        let outcome = receiver.handle(&payload("item.deleted", 404)).await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.processed, 0);
        assert_eq!(catalog.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unsupported_event() {
        let (receiver, _, logs) = receiver(Vec::new(), signed());

        let err = receiver
            .handle(&payload("order.created", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::UnsupportedEvent(e) if e == "order.created"));
        assert!(logs.entries().await.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_failure_finalizes_failed() {
        let (receiver, catalog, logs) = receiver(Vec::new(), signed());

        let outcome = receiver.handle(&payload("item.updated", 99)).await.unwrap();
        assert!(!outcome.success);
        assert!(outcome.errors.unwrap()[0].contains("Barang tidak ditemukan"));
        assert_eq!(catalog.count().await.unwrap(), 0);

        let entries = logs.entries().await;
        assert_eq!(entries[0].status, SyncStatus::Failed);
        assert_eq!(entries[0].records_failed, 1);
    }
}
