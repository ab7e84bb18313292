//! # Repository Module
//!
//! Store traits and their Postgres implementations.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Store Traits and Implementations                     │
//! │                                                                         │
//! │  SyncOrchestrator / WebhookReceiver                                     │
//! │       │                                                                 │
//! │       │  catalog.find_by_external_id(42)                                │
//! │       ▼                                                                 │
//! │  trait CatalogStore            trait SyncLogStore                       │
//! │  ├── find_by_external_id       ├── append                               │
//! │  ├── insert / update           ├── finalize                             │
//! │  ├── soft_delete               ├── latest_completed                     │
//! │  ├── delete_all                └── recent                               │
//! │  └── deactivate_missing                                                 │
//! │       │                                │                                │
//! │       ├── CatalogRepository (Postgres) ├── SyncLogRepository (Postgres) │
//! │       └── MemoryCatalog (tests)        └── MemorySyncLog (tests)        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`CatalogRepository`](product::CatalogRepository) - Catalog product writes and lookups
//! - [`SyncLogRepository`](sync_log::SyncLogRepository) - Sync audit trail

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::error::DbResult;
use stockbridge_core::{
    CatalogProduct, NewSyncLogEntry, ProductUpsert, SyncLogEntry, SyncStats, SyncStatus, SyncType,
};

pub mod product;
pub mod sync_log;

// =============================================================================
// Catalog Store
// =============================================================================

/// Write access to the storefront catalog.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Looks up a row by ERP item id.
    async fn find_by_external_id(&self, external_id: i64) -> DbResult<Option<CatalogProduct>>;

    /// Inserts a new row; the backend assigns the id.
    async fn insert(&self, upsert: &ProductUpsert) -> DbResult<CatalogProduct>;

    /// Overwrites every mutable field of an existing row.
    async fn update(&self, id: Uuid, upsert: &ProductUpsert) -> DbResult<CatalogProduct>;

    /// Sets `is_active = false` and stamps `external_last_modified` and
    /// `updated_at` with `at`.
    async fn soft_delete(&self, id: Uuid, at: DateTime<Utc>) -> DbResult<()>;

    /// Removes every catalog row. Returns the number of rows deleted.
    async fn delete_all(&self) -> DbResult<u64>;

    /// Deactivates active synced rows whose external id is not in `keep`.
    /// Returns the number of rows deactivated.
    async fn deactivate_missing(&self, keep: &[i64], at: DateTime<Utc>) -> DbResult<u64>;

    /// Number of catalog rows.
    async fn count(&self) -> DbResult<i64>;
}

// =============================================================================
// Sync Log Store
// =============================================================================

/// Append-mostly audit trail of sync runs and webhook events.
#[async_trait]
pub trait SyncLogStore: Send + Sync {
    async fn append(&self, entry: &NewSyncLogEntry) -> DbResult<SyncLogEntry>;

    /// Moves a `running` entry to its terminal status and sets `completed_at`.
    async fn finalize(
        &self,
        id: Uuid,
        status: SyncStatus,
        stats: SyncStats,
        details: Value,
    ) -> DbResult<()>;

    /// Most recent `completed` entry of the given type.
    async fn latest_completed(&self, sync_type: SyncType) -> DbResult<Option<SyncLogEntry>>;

    /// Newest entries first.
    async fn recent(&self, limit: u32) -> DbResult<Vec<SyncLogEntry>>;
}

// =============================================================================
// Count Conversions
// =============================================================================

// Audit counts are INTEGER columns.
pub(crate) fn count_to_db(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

pub(crate) fn count_from_db(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}
