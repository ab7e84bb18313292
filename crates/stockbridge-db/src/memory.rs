//! # In-Memory Stores
//!
//! [`CatalogStore`] and [`SyncLogStore`] over `tokio::sync::RwLock<Vec<_>>`,
//! used as test doubles by the sync engine and the HTTP app.
//!
//! Behavior mirrors the Postgres repositories: `external_id` is unique,
//! `append` sets `completed_at` unless the entry is `running`, and `recent`
//! returns newest first. [`MemoryCatalog::fail_on`] makes writes for one
//! external id fail, so per-record error handling can be exercised.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashSet;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::{CatalogStore, SyncLogStore};
use stockbridge_core::{
    CatalogProduct, NewSyncLogEntry, ProductUpsert, SyncLogEntry, SyncStats, SyncStatus, SyncType,
};

// =============================================================================
// Memory Catalog
// =============================================================================

#[derive(Debug, Default)]
pub struct MemoryCatalog {
    products: RwLock<Vec<CatalogProduct>>,
    failing: RwLock<HashSet<i64>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes insert and update fail for `external_id`.
    pub async fn fail_on(&self, external_id: i64) {
        self.failing.write().await.insert(external_id);
    }

    async fn check_failure(&self, external_id: i64) -> DbResult<()> {
        if self.failing.read().await.contains(&external_id) {
            return Err(DbError::QueryFailed(format!(
                "simulated failure for external id {}",
                external_id
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    async fn find_by_external_id(&self, external_id: i64) -> DbResult<Option<CatalogProduct>> {
        Ok(self
            .products
            .read()
            .await
            .iter()
            .find(|p| p.external_id == Some(external_id))
            .cloned())
    }

    async fn insert(&self, upsert: &ProductUpsert) -> DbResult<CatalogProduct> {
        self.check_failure(upsert.external_id).await?;

        let mut products = self.products.write().await;
        if products
            .iter()
            .any(|p| p.external_id == Some(upsert.external_id))
        {
            return Err(DbError::duplicate(
                "external_id",
                upsert.external_id.to_string(),
            ));
        }

        let product = CatalogProduct::from_upsert(Uuid::new_v4(), upsert, Utc::now());
        products.push(product.clone());
        Ok(product)
    }

    async fn update(&self, id: Uuid, upsert: &ProductUpsert) -> DbResult<CatalogProduct> {
        self.check_failure(upsert.external_id).await?;

        let mut products = self.products.write().await;
        let product = products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| DbError::not_found("CatalogProduct", id))?;

        product.apply(upsert, Utc::now());
        Ok(product.clone())
    }

    async fn soft_delete(&self, id: Uuid, at: DateTime<Utc>) -> DbResult<()> {
        let mut products = self.products.write().await;
        let product = products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| DbError::not_found("CatalogProduct", id))?;

        product.is_active = false;
        product.external_last_modified = Some(at);
        product.updated_at = at;
        Ok(())
    }

    async fn delete_all(&self) -> DbResult<u64> {
        let mut products = self.products.write().await;
        let deleted = products.len() as u64;
        products.clear();
        Ok(deleted)
    }

    async fn deactivate_missing(&self, keep: &[i64], at: DateTime<Utc>) -> DbResult<u64> {
        let keep: HashSet<i64> = keep.iter().copied().collect();
        let mut deactivated = 0;

        for product in self.products.write().await.iter_mut() {
            let Some(external_id) = product.external_id else {
                continue;
            };
            if product.is_active && !keep.contains(&external_id) {
                product.is_active = false;
                product.updated_at = at;
                deactivated += 1;
            }
        }

        Ok(deactivated)
    }

    async fn count(&self) -> DbResult<i64> {
        Ok(self.products.read().await.len() as i64)
    }
}

// =============================================================================
// Memory Sync Log
// =============================================================================

#[derive(Debug, Default)]
pub struct MemorySyncLog {
    entries: RwLock<Vec<SyncLogEntry>>,
}

impl MemorySyncLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries in insertion order.
    pub async fn entries(&self) -> Vec<SyncLogEntry> {
        self.entries.read().await.clone()
    }

    /// Inserts a fully formed entry, e.g. a past completed run.
    pub async fn seed(&self, entry: SyncLogEntry) {
        self.entries.write().await.push(entry);
    }
}

#[async_trait]
impl SyncLogStore for MemorySyncLog {
    async fn append(&self, entry: &NewSyncLogEntry) -> DbResult<SyncLogEntry> {
        let now = Utc::now();
        let stored = SyncLogEntry {
            id: Uuid::new_v4(),
            sync_type: entry.sync_type,
            status: entry.status,
            records_processed: entry.stats.processed,
            records_created: entry.stats.created,
            records_updated: entry.stats.updated,
            records_failed: entry.stats.failed,
            details: entry.details.clone(),
            created_at: now,
            completed_at: (entry.status != SyncStatus::Running).then_some(now),
        };
        self.entries.write().await.push(stored.clone());
        Ok(stored)
    }

    async fn finalize(
        &self,
        id: Uuid,
        status: SyncStatus,
        stats: SyncStats,
        details: Value,
    ) -> DbResult<()> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| DbError::not_found("SyncLogEntry", id))?;

        entry.status = status;
        entry.records_processed = stats.processed;
        entry.records_created = stats.created;
        entry.records_updated = stats.updated;
        entry.records_failed = stats.failed;
        entry.details = details;
        entry.completed_at = Some(Utc::now());
        Ok(())
    }

    async fn latest_completed(&self, sync_type: SyncType) -> DbResult<Option<SyncLogEntry>> {
        Ok(self
            .entries
            .read()
            .await
            .iter()
            .filter(|e| e.sync_type == sync_type && e.status == SyncStatus::Completed)
            .max_by_key(|e| e.created_at)
            .cloned())
    }

    async fn recent(&self, limit: u32) -> DbResult<Vec<SyncLogEntry>> {
        let mut entries = self.entries.read().await.clone();
        // Stable sort keeps insertion order for equal timestamps; reverse
        // afterwards so the last appended comes first.
        entries.sort_by_key(|e| e.created_at);
        entries.reverse();
        entries.truncate(limit as usize);
        Ok(entries)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stockbridge_core::mapping::map_external_product;
    use stockbridge_core::ExternalProduct;

    fn upsert(id: i64) -> ProductUpsert {
        map_external_product(&ExternalProduct::with_id(id), Utc::now())
    }

    #[tokio::test]
    async fn test_insert_then_find() {
        let catalog = MemoryCatalog::new();
        let created = catalog.insert(&upsert(1)).await.unwrap();

        let found = catalog.find_by_external_id(1).await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert!(catalog.find_by_external_id(2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_external_id_rejected() {
        let catalog = MemoryCatalog::new();
        catalog.insert(&upsert(1)).await.unwrap();
        let err = catalog.insert(&upsert(1)).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_fail_on_simulates_write_error() {
        let catalog = MemoryCatalog::new();
        catalog.fail_on(3).await;
        assert!(catalog.insert(&upsert(3)).await.is_err());
        assert_eq!(catalog.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_deactivate_missing() {
        let catalog = MemoryCatalog::new();
        for id in 1..=3 {
            catalog.insert(&upsert(id)).await.unwrap();
        }

        let deactivated = catalog.deactivate_missing(&[1, 3], Utc::now()).await.unwrap();
        assert_eq!(deactivated, 1);

        let two = catalog.find_by_external_id(2).await.unwrap().unwrap();
        assert!(!two.is_active);
    }

    #[tokio::test]
    async fn test_running_entry_finalized() {
        let log = MemorySyncLog::new();
        let entry = log
            .append(&NewSyncLogEntry::new(
                SyncType::Webhook,
                SyncStatus::Running,
                SyncStats::default(),
                json!({}),
            ))
            .await
            .unwrap();
        assert!(entry.completed_at.is_none());

        log.finalize(entry.id, SyncStatus::Failed, SyncStats::default(), json!({}))
            .await
            .unwrap();
        let stored = &log.entries().await[0];
        assert_eq!(stored.status, SyncStatus::Failed);
        assert!(stored.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_latest_completed_ignores_failed() {
        let log = MemorySyncLog::new();
        let ok = log
            .append(&NewSyncLogEntry::new(
                SyncType::Products,
                SyncStatus::Completed,
                SyncStats::default(),
                json!({}),
            ))
            .await
            .unwrap();
        log.append(&NewSyncLogEntry::new(
            SyncType::Products,
            SyncStatus::Failed,
            SyncStats::default(),
            json!({}),
        ))
        .await
        .unwrap();

        let latest = log.latest_completed(SyncType::Products).await.unwrap().unwrap();
        assert_eq!(latest.id, ok.id);
        assert!(log.latest_completed(SyncType::ProductsFull).await.unwrap().is_none());
    }
}
