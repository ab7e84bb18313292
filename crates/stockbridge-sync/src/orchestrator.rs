//! # Sync Orchestrator
//!
//! Runs the incremental sync, the full sync and the connection test, and
//! writes one audit entry per sync run.
//!
//! ## Runs
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        SyncOrchestrator                                 │
//! │                                                                         │
//! │  INCREMENTAL                                                            │
//! │  ───────────                                                            │
//! │  authenticate ──► latest completed `products` log?                      │
//! │                     ├── yes ──► get_modified_products(log cursor)       │
//! │                     └── no  ──► get_all_products()                      │
//! │                 ──► upsert each ──► log `products`                      │
//! │                                                                         │
//! │  FULL (replace, default)          FULL (reconcile)                      │
//! │  ───────────────────────          ────────────────                      │
//! │  authenticate                     authenticate                          │
//! │  delete_all   ◄── catalog empty   get_all_products                      │
//! │  get_all_products                 upsert each                           │
//! │  insert each                      deactivate_missing(fetched ids)       │
//! │  log `products_full`              log `products_full`                   │
//! │                                                                         │
//! │  PER RECORD                                                             │
//! │  ──────────                                                             │
//! │  map ──► validate ──► find_by_external_id ──► update | insert           │
//! │    failure: errors += "<sku>: <error>", failed += 1, continue           │
//! │    undecodable ERP items count as failures the same way                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A replace-mode fetch failure after the delete leaves the catalog empty.
//! Reconcile mode never has that window.
//!
//! The delta cursor is the `startedAt` detail of the last completed
//! `products` run, taken before its fetch. Entries without it fall back to
//! `created_at`.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::client::ProductSource;
use crate::config::{FullSyncMode, SyncSettings};
use crate::error::{SyncError, SyncResult};
use stockbridge_core::mapping::map_external_product;
use stockbridge_core::validation::validate_upsert;
use stockbridge_core::{
    ExternalProduct, NewSyncLogEntry, ProductBatch, SyncLogEntry, SyncOutcome, SyncStats,
    SyncStatus, SyncType, CONNECTION_TEST_SAMPLE_SIZE,
};
use stockbridge_db::{CatalogStore, SyncLogStore};

// =============================================================================
// Per-Record Upsert
// =============================================================================

/// What a single upsert did to the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Applied {
    Created,
    Updated,
}

/// Maps, validates and writes one ERP item. Errors carry the item's SKU.
pub(crate) async fn apply_product(
    catalog: &dyn CatalogStore,
    product: &ExternalProduct,
    synced_at: DateTime<Utc>,
) -> Result<Applied, String> {
    let upsert = map_external_product(product, synced_at);

    let result: SyncResult<Applied> = async {
        validate_upsert(&upsert)?;
        match catalog.find_by_external_id(upsert.external_id).await? {
            Some(existing) => {
                catalog.update(existing.id, &upsert).await?;
                Ok(Applied::Updated)
            }
            None => {
                catalog.insert(&upsert).await?;
                Ok(Applied::Created)
            }
        }
    }
    .await;

    result.map_err(|e| format!("{}: {}", upsert.sku, e))
}

/// Detail key of a run's start time; the next delta run reads from it.
const CURSOR_KEY: &str = "startedAt";

/// Where the next delta run starts after `entry`.
fn cursor_of(entry: &SyncLogEntry) -> DateTime<Utc> {
    entry
        .details
        .get(CURSOR_KEY)
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or(entry.created_at)
}

/// Counters and messages of one upsert pass.
#[derive(Debug, Default)]
struct Tally {
    stats: SyncStats,
    errors: Vec<String>,
}

impl Tally {
    fn summary(&self) -> String {
        format!(
            "{} processed, {} created, {} updated, {} failed",
            self.stats.processed, self.stats.created, self.stats.updated, self.stats.failed
        )
    }
}

// =============================================================================
// Orchestrator
// =============================================================================

pub struct SyncOrchestrator {
    source: Arc<dyn ProductSource>,
    catalog: Arc<dyn CatalogStore>,
    logs: Arc<dyn SyncLogStore>,
    settings: SyncSettings,
}

impl SyncOrchestrator {
    pub fn new(
        source: Arc<dyn ProductSource>,
        catalog: Arc<dyn CatalogStore>,
        logs: Arc<dyn SyncLogStore>,
        settings: SyncSettings,
    ) -> Self {
        SyncOrchestrator {
            source,
            catalog,
            logs,
            settings,
        }
    }

    // =========================================================================
    // Incremental Sync
    // =========================================================================

    /// Syncs items changed since the last completed incremental run, or
    /// everything when there is none.
    pub async fn run_incremental_sync(&self) -> SyncOutcome {
        info!("Starting incremental product sync");
        let started = Utc::now();

        if !self.source.authenticate().await {
            return self
                .fail(SyncType::Products, "ERP authentication failed", &SyncError::InvalidToken)
                .await;
        }

        let since = match self.logs.latest_completed(SyncType::Products).await {
            Ok(entry) => entry.as_ref().map(cursor_of),
            Err(e) => {
                return self
                    .fail(SyncType::Products, "Failed to read sync history", &e.into())
                    .await
            }
        };

        let fetched = match since {
            Some(since) => {
                debug!(%since, "Fetching products modified since last sync");
                self.source.get_modified_products(since).await
            }
            None => {
                debug!("No previous sync, fetching all products");
                self.source.get_all_products().await
            }
        };
        let products = match fetched {
            Ok(products) => products,
            Err(e) => {
                return self
                    .fail(SyncType::Products, "Failed to fetch products from ERP", &e)
                    .await
            }
        };

        let batch = self.upsert_all(&products, started).await;
        let mut details = json!({
            "mode": if since.is_some() { "delta" } else { "initial" },
            "since": since,
        });
        details[CURSOR_KEY] = json!(started.to_rfc3339());

        self.complete(
            SyncType::Products,
            format!("Product sync completed: {}", batch.summary()),
            batch,
            details,
        )
        .await
    }

    // =========================================================================
    // Full Sync
    // =========================================================================

    /// Rebuilds the catalog from the full ERP item list in the configured
    /// [`FullSyncMode`].
    pub async fn run_full_sync(&self) -> SyncOutcome {
        info!(mode = %self.settings.full_mode, "Starting full product sync");

        if !self.source.authenticate().await {
            return self
                .fail(
                    SyncType::ProductsFull,
                    "ERP authentication failed",
                    &SyncError::InvalidToken,
                )
                .await;
        }

        match self.settings.full_mode {
            FullSyncMode::Replace => self.full_replace().await,
            FullSyncMode::Reconcile => self.full_reconcile().await,
        }
    }

    async fn full_replace(&self) -> SyncOutcome {
        let started = Utc::now();

        let deleted = match self.catalog.delete_all().await {
            Ok(n) => n,
            Err(e) => {
                return self
                    .fail(SyncType::ProductsFull, "Failed to clear catalog", &e.into())
                    .await
            }
        };
        warn!(deleted, "Cleared catalog for full sync");

        let products = match self.source.get_all_products().await {
            Ok(products) => products,
            Err(e) => {
                error!(deleted, "Full sync fetch failed after clearing the catalog");
                return self
                    .fail(SyncType::ProductsFull, "Failed to fetch products from ERP", &e)
                    .await;
            }
        };

        let batch = self.upsert_all(&products, started).await;
        self.complete(
            SyncType::ProductsFull,
            format!("Full sync completed: {}", batch.summary()),
            batch,
            json!({ "mode": "replace", "deleted": deleted }),
        )
        .await
    }

    async fn full_reconcile(&self) -> SyncOutcome {
        let started = Utc::now();

        let products = match self.source.get_all_products().await {
            Ok(products) => products,
            Err(e) => {
                return self
                    .fail(SyncType::ProductsFull, "Failed to fetch products from ERP", &e)
                    .await
            }
        };

        let batch = self.upsert_all(&products, started).await;

        // An item that failed to decode without an id could be any row.
        let unidentified = products
            .rejected
            .iter()
            .filter(|r| r.external_id.is_none())
            .count();
        let deactivated = if products.is_empty() {
            warn!("ERP returned no products; skipping deactivation");
            0
        } else if unidentified > 0 {
            warn!(unidentified, "ERP items without a usable id; skipping deactivation");
            0
        } else {
            let keep: Vec<i64> = products
                .products
                .iter()
                .map(|p| p.id)
                .chain(products.rejected.iter().filter_map(|r| r.external_id))
                .collect();
            match self.catalog.deactivate_missing(&keep, Utc::now()).await {
                Ok(n) => n,
                Err(e) => {
                    return self
                        .fail(
                            SyncType::ProductsFull,
                            "Failed to deactivate products missing from ERP",
                            &e.into(),
                        )
                        .await
                }
            }
        };

        self.complete(
            SyncType::ProductsFull,
            format!(
                "Full sync completed: {}, {} deactivated",
                batch.summary(),
                deactivated
            ),
            batch,
            json!({ "mode": "reconcile", "deactivated": deactivated }),
        )
        .await
    }

    // =========================================================================
    // Connection Test
    // =========================================================================

    /// Checks credentials and reads a small sample. Writes nothing.
    pub async fn run_connection_test(&self) -> SyncOutcome {
        if !self.source.authenticate().await {
            return SyncOutcome::failed(
                "ERP authentication failed",
                SyncStats::default(),
                vec![SyncError::InvalidToken.to_string()],
            );
        }

        let info = match self.source.test_connection().await {
            Ok(info) => info,
            Err(e) => {
                return SyncOutcome::failed(
                    "ERP connection test failed",
                    SyncStats::default(),
                    vec![e.to_string()],
                )
            }
        };

        let page = match self
            .source
            .get_products(1, CONNECTION_TEST_SAMPLE_SIZE)
            .await
        {
            Ok(page) => page,
            Err(e) => {
                return SyncOutcome::failed(
                    "Connected, but fetching products failed",
                    SyncStats::default(),
                    vec![e.to_string()],
                )
            }
        };

        let sample: Vec<Value> = page
            .items
            .products
            .iter()
            .map(|p| json!({ "id": p.id, "no": p.no, "name": p.name }))
            .collect();
        let stats = SyncStats {
            processed: page.items.products.len() as u32,
            ..SyncStats::default()
        };

        SyncOutcome::completed("Connection successful", stats, Vec::new()).with_details(json!({
            "connection": info,
            "sampleSize": sample.len(),
            "totalProducts": page.pagination.row_count,
            "sample": sample,
        }))
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn upsert_all(&self, fetched: &ProductBatch, synced_at: DateTime<Utc>) -> Tally {
        let mut batch = Tally::default();

        for rejected in &fetched.rejected {
            batch.stats.processed += 1;
            batch.stats.failed += 1;
            batch.errors.push(rejected.message());
        }

        for product in &fetched.products {
            batch.stats.processed += 1;
            match apply_product(self.catalog.as_ref(), product, synced_at).await {
                Ok(Applied::Created) => batch.stats.created += 1,
                Ok(Applied::Updated) => batch.stats.updated += 1,
                Err(message) => {
                    warn!(external_id = product.id, error = %message, "Product upsert failed");
                    batch.stats.failed += 1;
                    batch.errors.push(message);
                }
            }
        }

        batch
    }

    /// Logs a completed run. A failed audit write turns the outcome into a
    /// failure.
    async fn complete(
        &self,
        sync_type: SyncType,
        message: String,
        batch: Tally,
        mut details: Value,
    ) -> SyncOutcome {
        if let Value::Object(map) = &mut details {
            if !batch.errors.is_empty() {
                map.insert("errors".to_string(), json!(batch.errors));
            }
        }

        let entry = NewSyncLogEntry::new(
            sync_type,
            SyncStatus::Completed,
            batch.stats,
            details.clone(),
        );
        if let Err(e) = self.logs.append(&entry).await {
            error!(error = %e, sync_type = %sync_type, "Failed to write sync log");
            let mut errors = batch.errors;
            errors.push(format!("sync log: {}", e));
            return SyncOutcome::failed(
                format!("{} (sync log not written)", message),
                batch.stats,
                errors,
            )
            .with_details(details);
        }

        info!(
            sync_type = %sync_type,
            processed = batch.stats.processed,
            created = batch.stats.created,
            updated = batch.stats.updated,
            failed = batch.stats.failed,
            "Sync completed"
        );
        SyncOutcome::completed(message, batch.stats, batch.errors).with_details(details)
    }

    /// Logs a failed run and builds the failure outcome.
    async fn fail(&self, sync_type: SyncType, message: &str, err: &SyncError) -> SyncOutcome {
        let retryable = err.is_retryable();
        error!(sync_type = %sync_type, error = %err, retryable, "{}", message);

        let entry = NewSyncLogEntry::new(
            sync_type,
            SyncStatus::Failed,
            SyncStats::default(),
            json!({ "error": err.to_string(), "message": message, "retryable": retryable }),
        );
        if let Err(e) = self.logs.append(&entry).await {
            warn!(error = %e, "Failed to write sync failure log");
        }

        SyncOutcome::failed(message, SyncStats::default(), vec![err.to_string()])
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
