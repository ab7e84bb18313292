//! ERP webhook endpoint.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::{routing::get, Json, Router};
use serde::Deserialize;
use stockbridge_core::{WebhookOutcome, WebhookPayload};
use stockbridge_sync::SyncError;

use crate::error::ApiResult;
use crate::state::AppState;

pub const SIGNATURE_HEADER: &str = "x-signature";

/// POST /webhooks/erp
///
/// The body is taken raw so the signature is checked over the exact bytes
/// received, before any parsing.
pub async fn receive_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<WebhookOutcome>)> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    state.webhooks.verify(&body, signature)?;

    let payload: WebhookPayload = serde_json::from_slice(&body)
        .map_err(|e| SyncError::InvalidPayload(e.to_string()))?;

    let outcome = state.webhooks.handle(&payload).await?;
    let status = if outcome.success {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    Ok((status, Json(outcome)))
}

#[derive(Debug, Deserialize)]
pub struct ChallengeQuery {
    pub challenge: Option<String>,
    pub verify_token: Option<String>,
}

/// GET /webhooks/erp?challenge=…&verify_token=…
///
/// Echoes the challenge as plain text.
pub async fn verify_subscription(
    State(state): State<AppState>,
    Query(query): Query<ChallengeQuery>,
) -> ApiResult<String> {
    let challenge = state
        .webhooks
        .verify_challenge(query.challenge.as_deref(), query.verify_token.as_deref())?;
    Ok(challenge)
}

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/webhooks/erp",
        get(verify_subscription).post(receive_event),
    )
}
