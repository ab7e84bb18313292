//! # stockbridge-sync: ERP Synchronization Engine
//!
//! Pulls item data from the ERP and keeps the storefront catalog current,
//! either on demand (incremental / full sync) or as items change (webhooks).
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   ┌───────────────┐  signed GET    ┌───────────────────────────────┐   │
//! │   │   ErpClient   │ ─────────────► │   ERP item API                │   │
//! │   │ (ProductSource│ ◄───────────── │   api-token / list / detail   │   │
//! │   │     trait)    │  {s, d, sp}    └───────────────────────────────┘   │
//! │   └───────┬───────┘                                                     │
//! │           │                                                             │
//! │     ┌─────┴──────────────┐                                              │
//! │     ▼                    ▼                                              │
//! │  ┌──────────────────┐  ┌──────────────────┐   ◄── POST /webhooks/erp   │
//! │  │ SyncOrchestrator │  │ WebhookReceiver  │                             │
//! │  │ incremental/full │  │ HMAC verify,     │                             │
//! │  │ connection test  │  │ item events      │                             │
//! │  └────────┬─────────┘  └────────┬─────────┘                             │
//! │           └──────────┬──────────┘                                       │
//! │                      ▼                                                  │
//! │          CatalogStore + SyncLogStore (stockbridge-db)                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`client`] - `ProductSource` trait and the reqwest `ErpClient`
//! - [`config`] - `[erp]`, `[webhook]` and `[sync]` settings (TOML + env)
//! - [`error`] - Sync error types
//! - [`orchestrator`] - Incremental sync, full sync, connection test
//! - [`protocol`] - ERP endpoints, query parameters and response envelope
//! - [`webhook`] - Signature check, challenge handshake, item events
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use stockbridge_sync::{BridgeConfig, ErpClient, SyncOrchestrator};
//!
//! let config = BridgeConfig::load(None)?;
//! let client = Arc::new(ErpClient::new(&config)?);
//! let orchestrator = SyncOrchestrator::new(
//!     client,
//!     Arc::new(db.catalog()),
//!     Arc::new(db.sync_logs()),
//!     config.sync.clone(),
//! );
//!
//! let outcome = orchestrator.run_incremental_sync().await;
//! println!("{}", outcome.message);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod client;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod protocol;
pub mod webhook;

// =============================================================================
// Re-exports
// =============================================================================

pub use client::{AuthState, ErpClient, ProductSource};
pub use config::{BridgeConfig, ErpSettings, FullSyncMode, SyncSettings, WebhookSettings};
pub use error::{SyncError, SyncResult};
pub use orchestrator::SyncOrchestrator;
pub use protocol::ConnectionInfo;
pub use webhook::WebhookReceiver;
