//! Liveness and database health.

use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when the database is unreachable.
    pub status: &'static str,
    pub version: &'static str,
    /// `None` when no database is attached.
    pub db_healthy: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub migrations: Option<MigrationStatus>,
}

#[derive(Debug, Serialize)]
pub struct MigrationStatus {
    pub total: usize,
    pub applied: usize,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let (db_healthy, migrations) = match &state.database {
        Some(db) => {
            let healthy = db.health_check().await;
            let migrations = match db.migration_status().await {
                Ok((total, applied)) => Some(MigrationStatus { total, applied }),
                Err(_) => None,
            };
            (Some(healthy), migrations)
        }
        None => (None, None),
    };

    let status = if db_healthy == Some(false) {
        "degraded"
    } else {
        "ok"
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
        migrations,
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
