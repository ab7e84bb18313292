//! Shared application state.

use std::sync::Arc;

use stockbridge_db::{Database, SyncLogStore};
use stockbridge_sync::{SyncOrchestrator, WebhookReceiver};

/// State available to all handlers via `State<AppState>`.
///
/// Cheap to clone; everything is behind `Arc` or already reference counted.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<SyncOrchestrator>,
    pub webhooks: Arc<WebhookReceiver>,
    /// Read side of the audit log for `GET /sync/logs`.
    pub sync_logs: Arc<dyn SyncLogStore>,
    /// `None` when running on in-memory stores (tests).
    pub database: Option<Database>,
}
