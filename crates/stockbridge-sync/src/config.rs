//! # Bridge Configuration
//!
//! Configuration for the ERP client, the webhook receiver and sync runs.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority, `.env` loaded by the app)  │
//! │     ACCURATE_API_URL=https://public.accurate.id/accurate               │
//! │     ACCURATE_API_TOKEN=aat.xxxxx                                        │
//! │                                                                         │
//! │  2. TOML Config File (path from STOCKBRIDGE_CONFIG)                     │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     page size 100, delta page size 1000, 200 ms page delay,            │
//! │     30 s timeout, full-sync mode "replace"                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [erp]
//! base_url = "https://public.accurate.id/accurate"
//! company_id = "123456"
//! timeout_secs = 30
//!
//! [webhook]
//! allow_unsigned = false
//!
//! [sync]
//! page_size = 100
//! delta_page_size = 1000
//! page_delay_ms = 200
//! full_mode = "replace"  # replace | reconcile
//! ```
//!
//! Secrets (`api_token`, `signature_secret`, webhook `secret` and
//! `verify_token`) may be set in the file too, but are usually supplied by
//! the environment. `Debug` output never shows them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{SyncError, SyncResult};
use stockbridge_core::validation::MAX_PAGE_SIZE;

// =============================================================================
// Full Sync Mode
// =============================================================================

/// How a full sync treats the existing catalog.
///
/// ## Mode Comparison
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  REPLACE (Default)                  │  RECONCILE                        │
/// │  ─────────────────                  │  ─────────                        │
/// │  1. delete every catalog row        │  1. fetch every ERP item          │
/// │  2. fetch every ERP item            │  2. upsert by external id         │
/// │  3. insert                          │  3. deactivate rows not fetched   │
/// │                                     │                                   │
/// │  fetch failure after step 1         │  fetch failure: catalog is        │
/// │  leaves the catalog EMPTY           │  left untouched                   │
/// │  row ids change on every run        │  row ids are stable               │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FullSyncMode {
    #[default]
    Replace,
    Reconcile,
}

impl fmt::Display for FullSyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FullSyncMode::Replace => write!(f, "replace"),
            FullSyncMode::Reconcile => write!(f, "reconcile"),
        }
    }
}

impl std::str::FromStr for FullSyncMode {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "replace" => Ok(FullSyncMode::Replace),
            "reconcile" => Ok(FullSyncMode::Reconcile),
            other => Err(SyncError::InvalidConfig(format!(
                "Unknown full sync mode: '{}'. Valid options: replace, reconcile",
                other
            ))),
        }
    }
}

// =============================================================================
// ERP Settings
// =============================================================================

/// Connection settings for the ERP API.
#[derive(Clone, Serialize, Deserialize)]
pub struct ErpSettings {
    /// Base URL; endpoint paths such as `/api/item/list.do` are appended.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token (`aat.` prefix).
    #[serde(default)]
    pub api_token: Option<String>,

    /// HMAC key for `X-Api-Signature`.
    #[serde(default)]
    pub signature_secret: Option<String>,

    /// Sent as `X-Company-Id` when set.
    #[serde(default)]
    pub company_id: Option<String>,

    /// Per-request timeout (seconds).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://public.accurate.id/accurate".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for ErpSettings {
    fn default() -> Self {
        ErpSettings {
            base_url: default_base_url(),
            api_token: None,
            signature_secret: None,
            company_id: None,
            timeout_secs: default_timeout(),
        }
    }
}

impl ErpSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl fmt::Debug for ErpSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErpSettings")
            .field("base_url", &self.base_url)
            .field("api_token", &redacted(&self.api_token))
            .field("signature_secret", &redacted(&self.signature_secret))
            .field("company_id", &self.company_id)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

// =============================================================================
// Webhook Settings
// =============================================================================

/// Settings of the inbound webhook endpoint.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct WebhookSettings {
    /// HMAC key for the `x-signature` header.
    #[serde(default)]
    pub secret: Option<String>,

    /// Token the ERP echoes during endpoint verification.
    #[serde(default)]
    pub verify_token: Option<String>,

    /// Accept unsigned events when no secret is configured.
    #[serde(default)]
    pub allow_unsigned: bool,
}

impl fmt::Debug for WebhookSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookSettings")
            .field("secret", &redacted(&self.secret))
            .field("verify_token", &redacted(&self.verify_token))
            .field("allow_unsigned", &self.allow_unsigned)
            .finish()
    }
}

// =============================================================================
// Sync Settings
// =============================================================================

/// Paging and full-sync behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Page size while walking the whole item list.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Page size of the single delta request.
    #[serde(default = "default_delta_page_size")]
    pub delta_page_size: u32,

    /// Pause between list pages (milliseconds).
    #[serde(default = "default_page_delay")]
    pub page_delay_ms: u64,

    #[serde(default)]
    pub full_mode: FullSyncMode,
}

fn default_page_size() -> u32 {
    100
}

fn default_delta_page_size() -> u32 {
    1000
}

fn default_page_delay() -> u64 {
    200
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            page_size: default_page_size(),
            delta_page_size: default_delta_page_size(),
            page_delay_ms: default_page_delay(),
            full_mode: FullSyncMode::default(),
        }
    }
}

impl SyncSettings {
    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }
}

// =============================================================================
// Main Bridge Configuration
// =============================================================================

/// Complete bridge configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub erp: ErpSettings,

    #[serde(default)]
    pub webhook: WebhookSettings,

    #[serde(default)]
    pub sync: SyncSettings,
}

impl BridgeConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file, if `config_path` is given and exists
    /// 3. Environment variables
    pub fn load(config_path: Option<&Path>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path {
            if path.exists() {
                info!(?path, "Loading bridge config from file");
                let contents = std::fs::read_to_string(path)?;
                config = toml::from_str(&contents)?;
            } else {
                warn!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Parses a TOML document (no environment overrides).
    pub fn from_toml(contents: &str) -> SyncResult<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        let url = Url::parse(&self.erp.base_url)?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(SyncError::InvalidUrl(format!(
                "ERP base URL must start with http:// or https://, got: {}",
                self.erp.base_url
            )));
        }

        if self.erp.timeout_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        for (name, value) in [
            ("page_size", self.sync.page_size),
            ("delta_page_size", self.sync.delta_page_size),
        ] {
            if value == 0 || value > MAX_PAGE_SIZE {
                return Err(SyncError::InvalidConfig(format!(
                    "{} must be between 1 and {}",
                    name, MAX_PAGE_SIZE
                )));
            }
        }

        if self.erp.api_token.is_none() {
            warn!("ACCURATE_API_TOKEN is not set; ERP calls will fail authentication");
        }
        if self.webhook.secret.is_none() && self.webhook.allow_unsigned {
            warn!("Webhook signature verification is disabled (unsigned mode)");
        }

        Ok(())
    }

    /// Applies overrides from a key lookup (the environment in production).
    ///
    /// Empty values count as unset.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("ACCURATE_API_URL") {
            debug!(url = %url, "Overriding ERP base URL from environment");
            self.erp.base_url = url;
        }
        if let Some(token) = get("ACCURATE_API_TOKEN") {
            self.erp.api_token = Some(token);
        }
        if let Some(secret) = get("ACCURATE_SIGNATURE_SECRET") {
            self.erp.signature_secret = Some(secret);
        }
        if let Some(company) = get("ACCURATE_COMPANY_ID") {
            self.erp.company_id = Some(company);
        }
        if let Some(timeout) = get("ACCURATE_TIMEOUT_SECS") {
            match timeout.parse::<u64>() {
                Ok(t) => self.erp.timeout_secs = t,
                Err(_) => warn!(value = %timeout, "Ignoring invalid ACCURATE_TIMEOUT_SECS"),
            }
        }

        if let Some(secret) = get("ACCURATE_WEBHOOK_SECRET") {
            self.webhook.secret = Some(secret);
        }
        if let Some(token) = get("ACCURATE_WEBHOOK_VERIFY_TOKEN") {
            self.webhook.verify_token = Some(token);
        }
        if let Some(flag) = get("ACCURATE_WEBHOOK_ALLOW_UNSIGNED") {
            self.webhook.allow_unsigned = matches!(
                flag.trim().to_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }

        if let Some(mode) = get("SYNC_FULL_MODE") {
            match mode.parse() {
                Ok(parsed) => {
                    debug!(mode = %mode, "Overriding full sync mode from environment");
                    self.sync.full_mode = parsed;
                }
                Err(e) => warn!(error = %e, "Ignoring invalid SYNC_FULL_MODE"),
            }
        }
        if let Some(size) = get("SYNC_PAGE_SIZE") {
            match size.parse::<u32>() {
                Ok(s) => self.sync.page_size = s,
                Err(_) => warn!(value = %size, "Ignoring invalid SYNC_PAGE_SIZE"),
            }
        }
        if let Some(delay) = get("SYNC_PAGE_DELAY_MS") {
            match delay.parse::<u64>() {
                Ok(d) => self.sync.page_delay_ms = d,
                Err(_) => warn!(value = %delay, "Ignoring invalid SYNC_PAGE_DELAY_MS"),
            }
        }
    }
}

fn redacted(value: &Option<String>) -> &'static str {
    match value {
        Some(_) => "<set>",
        None => "<unset>",
    }
}
