//! # ERP Client
//!
//! Authenticated HTTP access to the ERP item API.
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         ErpClient Request                               │
//! │                                                                         │
//! │  get_products(page, limit)                                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  GET {base}/api/item/list.do?sp.page=page-1&sp.pageSize=limit&fields=… │
//! │       │   Authorization: Bearer aat.…                                   │
//! │       │   X-Api-Timestamp: 05/03/2024 17:15:00                          │
//! │       │   X-Api-Signature: hmac_sha256(timestamp, secret)               │
//! │       │   X-Company-Id: … (when configured)                             │
//! │       ▼                                                                 │
//! │  HTTP status ── non-2xx ──► SyncError::HttpStatus                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  JSON envelope ── not JSON ──► SyncError::InvalidResponse              │
//! │       │        ── s=false ──► SyncError::ErpRejected                   │
//! │       ▼                                                                 │
//! │  ProductPage { items: decoded + rejected, pagination }                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Auth State
//! ```text
//!   Uninitialized ──authenticate ok──► Authenticated
//!         │                                 ▲
//!         └──authenticate fails──► AuthFailed ──authenticate ok──┘
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::AUTHORIZATION;
use reqwest::RequestBuilder;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::BridgeConfig;
use crate::error::{SyncError, SyncResult};
use crate::protocol::{
    self, ConnectionInfo, Envelope, API_TOKEN_PATH, HEADER_COMPANY_ID, HEADER_SIGNATURE,
    HEADER_TIMESTAMP, ITEM_DETAIL_PATH, ITEM_LIST_PATH,
};
use stockbridge_core::signature::{
    format_erp_timestamp, generate_signature, generate_timestamp, validate_bearer_token,
};
use stockbridge_core::validation::validate_page_request;
use stockbridge_core::{ExternalProduct, ProductBatch, ProductPage};

/// Upper bound on pages walked by one listing.
const MAX_PAGES: u32 = 10_000;

// =============================================================================
// Product Source Trait
// =============================================================================

/// Read access to ERP products.
///
/// Implemented by [`ErpClient`]; the orchestrator and webhook receiver only
/// see this trait, so tests can substitute a fake.
#[async_trait]
pub trait ProductSource: Send + Sync {
    /// Checks the token format, then the credentials against the ERP.
    async fn authenticate(&self) -> bool;

    async fn test_connection(&self) -> SyncResult<ConnectionInfo>;

    /// One list page; `page` is 1-based.
    async fn get_products(&self, page: u32, limit: u32) -> SyncResult<ProductPage>;

    /// Every item, walking all pages.
    async fn get_all_products(&self) -> SyncResult<ProductBatch>;

    /// Items modified at or after `since`, walking all pages.
    async fn get_modified_products(&self, since: DateTime<Utc>) -> SyncResult<ProductBatch>;

    /// One item by ERP id.
    async fn get_product(&self, id: i64) -> SyncResult<ExternalProduct>;
}

// =============================================================================
// Auth State
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthState {
    #[default]
    Uninitialized,
    Authenticated,
    AuthFailed,
}

// =============================================================================
// ERP Client
// =============================================================================

/// reqwest-backed [`ProductSource`].
pub struct ErpClient {
    http: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
    signature_secret: Option<String>,
    company_id: Option<String>,
    timeout_secs: u64,
    page_size: u32,
    delta_page_size: u32,
    page_delay: Duration,
    auth: RwLock<AuthState>,
}

impl ErpClient {
    /// Builds a client from validated configuration.
    pub fn new(config: &BridgeConfig) -> SyncResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.erp.timeout())
            .build()
            .map_err(|e| SyncError::Internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(ErpClient {
            http,
            base_url: config.erp.base_url.trim_end_matches('/').to_string(),
            api_token: config.erp.api_token.clone(),
            signature_secret: config.erp.signature_secret.clone(),
            company_id: config.erp.company_id.clone(),
            timeout_secs: config.erp.timeout_secs,
            page_size: config.sync.page_size,
            delta_page_size: config.sync.delta_page_size,
            page_delay: config.sync.page_delay(),
            auth: RwLock::new(AuthState::Uninitialized),
        })
    }

    pub async fn auth_state(&self) -> AuthState {
        *self.auth.read().await
    }

    async fn set_auth_state(&self, state: AuthState) {
        *self.auth.write().await = state;
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Adds bearer, timestamp, signature and company headers.
    fn signed(&self, request: RequestBuilder) -> RequestBuilder {
        let timestamp = generate_timestamp();
        let mut request = request.header(HEADER_TIMESTAMP, &timestamp);

        if let Some(token) = &self.api_token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        if let Some(secret) = &self.signature_secret {
            request = request.header(HEADER_SIGNATURE, generate_signature(&timestamp, secret));
        }
        if let Some(company) = &self.company_id {
            request = request.header(HEADER_COMPANY_ID, company);
        }
        request
    }

    /// Sends a signed GET and returns the successful envelope.
    async fn get_envelope(&self, path: &str, query: &[(&str, String)]) -> SyncResult<Envelope> {
        debug!(path, "ERP request");

        let response = self
            .signed(self.http.get(self.url(path)).query(query))
            .send()
            .await
            .map_err(|e| SyncError::from_transport(e, self.timeout_secs))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SyncError::from_transport(e, self.timeout_secs))?;

        if !status.is_success() {
            let preview: String = body.chars().take(200).collect();
            return Err(SyncError::HttpStatus {
                status: status.as_u16(),
                body: preview,
            });
        }

        Envelope::parse(&body)?.into_success()
    }

    /// One list page, optionally filtered to `lastUpdate >= since`.
    async fn fetch_page(
        &self,
        page: u32,
        limit: u32,
        since: Option<&str>,
    ) -> SyncResult<ProductPage> {
        validate_page_request(page, limit)?;

        let query = match since {
            Some(since) => protocol::delta_query(since, page, limit),
            None => protocol::list_query(page, limit),
        };
        let envelope = self.get_envelope(ITEM_LIST_PATH, &query).await?;
        let items = envelope.products()?;
        let pagination = envelope.pagination(page, limit, items.len());

        debug!(
            page,
            returned = items.len(),
            rejected = items.rejected.len(),
            page_count = pagination.page_count,
            "Fetched ERP product page"
        );

        Ok(ProductPage { items, pagination })
    }

    /// Walks list pages until the ERP reports the last one.
    ///
    /// A page ends the walk when it holds fewer raw items than `limit`,
    /// counting items that did not decode.
    async fn walk_pages(&self, limit: u32, since: Option<&str>) -> SyncResult<ProductBatch> {
        let mut all = ProductBatch::default();
        let mut page = 1;

        loop {
            let result = self.fetch_page(page, limit, since).await?;
            let returned = result.items.len();
            let last = result.pagination.is_last_page();
            all.append(result.items);

            if returned == 0 || returned < limit as usize || last {
                break;
            }
            if page >= MAX_PAGES {
                warn!(page, "Stopping pagination at page limit");
                break;
            }

            page += 1;
            tokio::time::sleep(self.page_delay).await;
        }

        info!(
            total = all.len(),
            rejected = all.rejected.len(),
            pages = page,
            delta = since.is_some(),
            "Fetched ERP products"
        );
        Ok(all)
    }
}

#[async_trait]
impl ProductSource for ErpClient {
    async fn authenticate(&self) -> bool {
        if self.auth_state().await == AuthState::Authenticated {
            return true;
        }

        let token_ok = self
            .api_token
            .as_deref()
            .map(validate_bearer_token)
            .unwrap_or(false);
        if !token_ok {
            warn!("ERP API token is missing or malformed");
            self.set_auth_state(AuthState::AuthFailed).await;
            return false;
        }

        match self.test_connection().await {
            Ok(info) => {
                info!(database = ?info.database_alias, "Authenticated with ERP");
                self.set_auth_state(AuthState::Authenticated).await;
                true
            }
            Err(e) if e.is_auth_error() => {
                warn!(error = %e, "ERP rejected the credentials");
                self.set_auth_state(AuthState::AuthFailed).await;
                false
            }
            Err(e) => {
                warn!(
                    error = %e,
                    retryable = e.is_retryable(),
                    "ERP unreachable during authentication"
                );
                self.set_auth_state(AuthState::AuthFailed).await;
                false
            }
        }
    }

    async fn test_connection(&self) -> SyncResult<ConnectionInfo> {
        match self.get_envelope(API_TOKEN_PATH, &[]).await {
            Ok(envelope) => Ok(ConnectionInfo::from_value(&envelope.d)),
            // A login page served with 200, or s=false, means the session
            // was not accepted.
            Err(SyncError::InvalidResponse(msg)) | Err(SyncError::ErpRejected(msg)) => {
                Err(SyncError::AuthenticationFailed(msg))
            }
            Err(SyncError::HttpStatus { status, body }) if status == 401 || status == 403 => {
                Err(SyncError::AuthenticationFailed(format!("HTTP {}: {}", status, body)))
            }
            Err(other) => Err(other),
        }
    }

    async fn get_products(&self, page: u32, limit: u32) -> SyncResult<ProductPage> {
        self.fetch_page(page, limit, None).await
    }

    async fn get_all_products(&self) -> SyncResult<ProductBatch> {
        self.walk_pages(self.page_size, None).await
    }

    async fn get_modified_products(&self, since: DateTime<Utc>) -> SyncResult<ProductBatch> {
        let since_erp = format_erp_timestamp(since);
        debug!(since = %since_erp, "Fetching modified ERP products");
        self.walk_pages(self.delta_page_size, Some(since_erp.as_str())).await
    }

    async fn get_product(&self, id: i64) -> SyncResult<ExternalProduct> {
        let envelope = self
            .get_envelope(ITEM_DETAIL_PATH, &[("id", id.to_string())])
            .await?;
        envelope.product()
    }
}

// =============================================================================
// Tests (against a local fake ERP)
// =============================================================================
