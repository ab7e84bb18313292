//! # stockbridge-db: Database Layer for the ERP → Catalog Bridge
//!
//! This crate provides persistence for the storefront catalog and the sync
//! audit log. It talks to the hosted Postgres backend with sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockbridge Data Flow                            │
//! │                                                                         │
//! │  SyncOrchestrator / WebhookReceiver                                     │
//! │       │  Arc<dyn CatalogStore>, Arc<dyn SyncLogStore>                   │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  stockbridge-db (THIS CRATE)                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ CatalogRepo   │    │ 001_catalog_ │  │   │
//! │  │   │ PgPool        │◄───│ SyncLogRepo   │    │   sync.sql   │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   memory.rs (feature "memory"): MemoryCatalog, MemorySyncLog    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │   Postgres: catalog_products, sync_logs                         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Store traits and Postgres repositories
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stockbridge_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("postgres://localhost/shop")).await?;
//!
//! let product = db.catalog().find_by_external_id(42).await?;
//! let history = db.sync_logs().recent(20).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
#[cfg(feature = "memory")]
pub mod memory;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::product::CatalogRepository;
pub use repository::sync_log::SyncLogRepository;
pub use repository::{CatalogStore, SyncLogStore};

#[cfg(feature = "memory")]
pub use memory::{MemoryCatalog, MemorySyncLog};
