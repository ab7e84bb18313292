//! # stockbridge-core: Pure Logic for the ERP → Catalog Bridge
//!
//! This crate holds everything in the synchronization pipeline that does
//! not touch the network or the database.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockbridge Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    apps/sync-api (axum)                         │   │
//! │  │     GET /sync?action=...          POST /webhooks/erp            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │        stockbridge-sync (ERP client, orchestrator, webhook)     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ stockbridge-core (THIS CRATE) ★                   │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │  mapping  │  │ signature │  │ validation│  │   │
//! │  │   │ External  │  │ ERP item  │  │ HMAC-SHA  │  │  upsert   │  │   │
//! │  │   │ Catalog   │  │ → catalog │  │ timestamp │  │  rules    │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 stockbridge-db (Postgres layer)                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - ERP records, catalog rows, audit log entries, sync results
//! - [`money`] - Money type with integer minor units
//! - [`mapping`] - ExternalProduct → ProductUpsert transform
//! - [`signature`] - ERP timestamps and HMAC signatures
//! - [`validation`] - Rules a row must meet before it reaches the catalog
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::Utc;
//! use stockbridge_core::mapping::map_external_product;
//! use stockbridge_core::types::ExternalProduct;
//!
//! let item = ExternalProduct::with_id(42);
//! let row = map_external_product(&item, Utc::now());
//!
//! assert_eq!(row.sku, "ACC-42");
//! assert_eq!(row.unit, "pcs");
//! assert_eq!(row.price_cents, 0);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod mapping;
pub mod money;
pub mod signature;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Unit of measure used when the ERP record carries none.
pub const DEFAULT_UNIT: &str = "pcs";

/// Prefix of the fallback SKU (`ACC-<external id>`) for items without an
/// item number, so every catalog row has a usable SKU.
pub const SKU_FALLBACK_PREFIX: &str = "ACC-";

/// The ERP operates in Asia/Jakarta (UTC+07:00, no daylight saving).
pub const ERP_UTC_OFFSET_SECS: i32 = 7 * 3600;

/// Number of products fetched by the connection test.
pub const CONNECTION_TEST_SAMPLE_SIZE: u32 = 5;
