//! # Sync Error Types
//!
//! Error types for ERP traffic, sync runs and webhook handling.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Transport     │  │     ERP API             │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Connection     │  │  HttpStatus             │ │
//! │  │  InvalidUrl     │  │  Timeout        │  │  ErpRejected            │ │
//! │  │  ConfigLoad     │  │                 │  │  InvalidResponse        │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Authentication │  │    Webhook      │  │   Data                  │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidToken   │  │  InvalidSig.    │  │  Validation             │ │
//! │  │  AuthFailed     │  │  NotConfigured  │  │  Database               │ │
//! │  │                 │  │  Unsupported    │  │                         │ │
//! │  │                 │  │  InvalidPayload │  │                         │ │
//! │  │                 │  │  Forbidden      │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use stockbridge_core::ValidationError;
use thiserror::Error;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Sync error type covering every failure of the bridge.
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid ERP base URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Failed to read or parse the config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    // =========================================================================
    // Authentication Errors
    // =========================================================================
    /// Bearer token missing or malformed; no request was sent.
    #[error("ERP API token is missing or malformed")]
    InvalidToken,

    /// The ERP did not accept the credentials.
    #[error("ERP authentication failed: {0}")]
    AuthenticationFailed(String),

    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// Could not reach the ERP.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Request exceeded the configured timeout.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    // =========================================================================
    // ERP API Errors
    // =========================================================================
    /// Non-2xx response.
    #[error("ERP returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// The ERP answered with its success flag false.
    #[error("ERP rejected the request: {0}")]
    ErpRejected(String),

    /// Body was not the expected JSON envelope.
    #[error("Invalid ERP response: {0}")]
    InvalidResponse(String),

    // =========================================================================
    // Webhook Errors
    // =========================================================================
    /// Signature header missing or not matching the body.
    #[error("Invalid webhook signature")]
    InvalidSignature,

    /// No webhook secret configured and unsigned mode is off.
    #[error("Webhook secret is not configured")]
    WebhookNotConfigured,

    /// Event type outside `item.created|updated|deleted`.
    #[error("Unsupported webhook event: {0}")]
    UnsupportedEvent(String),

    /// Malformed webhook body or query.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Verification token mismatch.
    #[error("Verification token mismatch")]
    Forbidden,

    // =========================================================================
    // Data Errors
    // =========================================================================
    /// A mapped record failed catalog validation.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Catalog or audit-log operation failed.
    #[error("Database error: {0}")]
    Database(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<stockbridge_db::DbError> for SyncError {
    fn from(err: stockbridge_db::DbError) -> Self {
        SyncError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::InvalidResponse(err.to_string())
    }
}

impl From<url::ParseError> for SyncError {
    fn from(err: url::ParseError) -> Self {
        SyncError::InvalidUrl(err.to_string())
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl SyncError {
    /// Classifies a reqwest failure. `timeout_secs` is reported for timeouts.
    pub fn from_transport(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            SyncError::Timeout(timeout_secs)
        } else if err.is_decode() {
            SyncError::InvalidResponse(err.to_string())
        } else {
            SyncError::ConnectionFailed(err.to_string())
        }
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl SyncError {
    /// Returns true if the operation could succeed when tried again.
    ///
    /// Nothing in the bridge retries automatically; this tells callers
    /// (and the HTTP layer) whether a rerun is worthwhile.
    ///
    /// ## Retryable Errors
    /// - Connection failures and timeouts
    /// - HTTP 429 and 5xx from the ERP
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::ConnectionFailed(_) | SyncError::Timeout(_) => true,
            SyncError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Returns true if the ERP refused the credentials.
    pub fn is_auth_error(&self) -> bool {
        match self {
            SyncError::InvalidToken | SyncError::AuthenticationFailed(_) => true,
            SyncError::HttpStatus { status, .. } => *status == 401 || *status == 403,
            _ => false,
        }
    }
}
