//! Manual sync triggers and sync history.

use std::str::FromStr;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::{routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use stockbridge_core::{SyncLogEntry, SyncOutcome};
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Default and maximum number of entries returned by `GET /sync/logs`.
pub const DEFAULT_LOG_LIMIT: u32 = 20;
pub const MAX_LOG_LIMIT: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    TestConnection,
    Incremental,
    Full,
}

impl FromStr for SyncAction {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "test-connection" => Ok(SyncAction::TestConnection),
            "sync" => Ok(SyncAction::Incremental),
            "full-sync" => Ok(SyncAction::Full),
            other => Err(ApiError::bad_request(format!(
                "Unknown action '{}'; expected test-connection, sync or full-sync",
                other
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SyncQuery {
    pub action: Option<String>,
}

/// GET /sync?action=test-connection|sync|full-sync
///
/// 200 with the outcome, or 500 with the same body when the run failed.
pub async fn trigger_sync(
    State(state): State<AppState>,
    Query(query): Query<SyncQuery>,
) -> ApiResult<(StatusCode, Json<SyncOutcome>)> {
    let action: SyncAction = query
        .action
        .as_deref()
        .ok_or_else(|| ApiError::bad_request("Missing 'action' query parameter"))?
        .parse()?;

    info!(?action, "Sync triggered over HTTP");
    let outcome = match action {
        SyncAction::TestConnection => state.orchestrator.run_connection_test().await,
        SyncAction::Incremental => state.orchestrator.run_incremental_sync().await,
        SyncAction::Full => state.orchestrator.run_full_sync().await,
    };

    let status = if outcome.success {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    Ok((status, Json(outcome)))
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct LogsResponse {
    pub success: bool,
    pub logs: Vec<SyncLogEntry>,
}

/// GET /sync/logs?limit=N (newest first)
pub async fn list_logs(
    State(state): State<AppState>,
    Query(query): Query<LogsQuery>,
) -> ApiResult<Json<LogsResponse>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LOG_LIMIT)
        .clamp(1, MAX_LOG_LIMIT);
    let logs = state.sync_logs.recent(limit).await?;

    Ok(Json(LogsResponse {
        success: true,
        logs,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sync", get(trigger_sync))
        .route("/sync/logs", get(list_logs))
}
