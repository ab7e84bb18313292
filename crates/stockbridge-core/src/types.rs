//! # Domain Types
//!
//! Types shared by every layer of the bridge.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   mapping    ┌─────────────────┐                   │
//! │  │ ExternalProduct │ ───────────► │  ProductUpsert  │                   │
//! │  │  (ERP, read)    │              │  (write set)    │                   │
//! │  │  id: i64        │              │  sku, price...  │                   │
//! │  └─────────────────┘              └────────┬────────┘                   │
//! │                                            │ insert / update            │
//! │                                            ▼                            │
//! │                                   ┌─────────────────┐                   │
//! │                                   │ CatalogProduct  │                   │
//! │                                   │  id: UUID       │                   │
//! │                                   │  external_id ◄──┼── join key        │
//! │                                   └─────────────────┘                   │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  SyncLogEntry   │   │   SyncOutcome   │   │ WebhookPayload  │       │
//! │  │  audit trail    │   │  API response   │   │  ERP event      │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Catalog rows have:
//! - `id`: UUID v4 - assigned by the backend, used by the storefront
//! - `external_id`: the ERP item id - unique, decides update vs. insert

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;
use uuid::Uuid;

use crate::error::CoreError;

// =============================================================================
// External Product (ERP side)
// =============================================================================

/// An item record as returned by the ERP item endpoints.
///
/// Every field except `id` is optional on the wire. The ERP is loose with
/// types, so numbers may arrive as strings and the active flag as
/// `true`, `1` or `"true"`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalProduct {
    /// ERP item id.
    #[serde(deserialize_with = "de::flexible_i64")]
    pub id: i64,

    /// Item number, used as the catalog SKU.
    #[serde(default, alias = "itemNo")]
    pub no: Option<String>,

    /// Display name.
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default, alias = "notes")]
    pub description: Option<String>,

    #[serde(default, deserialize_with = "de::flexible_f64")]
    pub unit_price: Option<f64>,

    /// Average cost.
    #[serde(default, alias = "averageCost", deserialize_with = "de::flexible_f64")]
    pub avg_cost: Option<f64>,

    /// On-hand quantity.
    #[serde(default, alias = "availableToSell", deserialize_with = "de::flexible_f64")]
    pub quantity: Option<f64>,

    /// Unit of measure.
    #[serde(default, alias = "unit1Name")]
    pub unit_name: Option<String>,

    #[serde(default, alias = "itemCategoryId", deserialize_with = "de::flexible_opt_i64")]
    pub category_id: Option<i64>,

    #[serde(default, alias = "itemCategoryName")]
    pub category_name: Option<String>,

    #[serde(default, deserialize_with = "de::flexible_opt_i64")]
    pub brand_id: Option<i64>,

    #[serde(default)]
    pub brand_name: Option<String>,

    #[serde(default, deserialize_with = "de::flexible_bool")]
    pub active: Option<bool>,

    /// Last modification time in ERP wire format.
    #[serde(default, alias = "lastUpdate")]
    pub last_modified: Option<String>,

    /// Creation time in ERP wire format.
    #[serde(default, alias = "createDate")]
    pub created: Option<String>,
}

impl ExternalProduct {
    /// An otherwise empty record with the given id.
    pub fn with_id(id: i64) -> Self {
        ExternalProduct {
            id,
            ..Default::default()
        }
    }
}

// =============================================================================
// Catalog Product (backend side)
// =============================================================================

/// The mutable field set of a catalog row, produced by the mapping layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductUpsert {
    pub external_id: i64,
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub cost_price_cents: i64,
    pub stock_quantity: i64,
    pub unit: String,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub brand_id: Option<i64>,
    pub brand_name: Option<String>,
    pub is_active: bool,
    pub external_last_modified: Option<DateTime<Utc>>,
    pub external_created_at: Option<DateTime<Utc>>,
    pub last_synced_at: DateTime<Utc>,
}

/// A product row in the storefront catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CatalogProduct {
    /// Backend-assigned identifier.
    pub id: Uuid,

    /// ERP item id; `None` for rows created outside the sync.
    pub external_id: Option<i64>,

    pub sku: String,
    pub name: String,
    pub description: Option<String>,

    /// Price in minor units.
    pub price_cents: i64,

    /// Cost price in minor units.
    pub cost_price_cents: i64,

    pub stock_quantity: i64,
    pub unit: String,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub brand_id: Option<i64>,
    pub brand_name: Option<String>,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    pub external_last_modified: Option<DateTime<Utc>>,
    pub external_created_at: Option<DateTime<Utc>>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CatalogProduct {
    /// Builds a fresh row from an upsert payload.
    pub fn from_upsert(id: Uuid, upsert: &ProductUpsert, now: DateTime<Utc>) -> Self {
        let mut product = CatalogProduct {
            id,
            external_id: Some(upsert.external_id),
            sku: String::new(),
            name: String::new(),
            description: None,
            price_cents: 0,
            cost_price_cents: 0,
            stock_quantity: 0,
            unit: String::new(),
            category_id: None,
            category_name: None,
            brand_id: None,
            brand_name: None,
            is_active: true,
            external_last_modified: None,
            external_created_at: None,
            last_synced_at: None,
            created_at: now,
            updated_at: now,
        };
        product.apply(upsert, now);
        product
    }

    /// Overwrites every mutable field with the upsert payload.
    pub fn apply(&mut self, upsert: &ProductUpsert, now: DateTime<Utc>) {
        self.external_id = Some(upsert.external_id);
        self.sku = upsert.sku.clone();
        self.name = upsert.name.clone();
        self.description = upsert.description.clone();
        self.price_cents = upsert.price_cents;
        self.cost_price_cents = upsert.cost_price_cents;
        self.stock_quantity = upsert.stock_quantity;
        self.unit = upsert.unit.clone();
        self.category_id = upsert.category_id;
        self.category_name = upsert.category_name.clone();
        self.brand_id = upsert.brand_id;
        self.brand_name = upsert.brand_name.clone();
        self.is_active = upsert.is_active;
        self.external_last_modified = upsert.external_last_modified;
        self.external_created_at = upsert.external_created_at;
        self.last_synced_at = Some(upsert.last_synced_at);
        self.updated_at = now;
    }
}

// =============================================================================
// ERP Pagination
// =============================================================================

/// Pagination metadata reported by the ERP list endpoint (1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
    pub page_count: u32,
    pub row_count: u64,
}

impl Pagination {
    /// Builds pagination from a row count: `ceil(row_count / page_size)` pages.
    pub fn from_row_count(page: u32, page_size: u32, row_count: u64) -> Self {
        let page_count = if page_size == 0 {
            0
        } else {
            row_count.div_ceil(page_size as u64).min(u32::MAX as u64) as u32
        };
        Pagination {
            page,
            page_size,
            page_count,
            row_count,
        }
    }

    /// True when no page follows this one.
    pub fn is_last_page(&self) -> bool {
        self.page >= self.page_count
    }
}

/// An ERP list item that did not decode into an [`ExternalProduct`].
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedItem {
    /// Item number when present, otherwise the id or the position on the page.
    pub reference: String,
    /// ERP id, when the raw item carries a usable one.
    pub external_id: Option<i64>,
    pub error: String,
}

impl RejectedItem {
    /// `"<reference>: <error>"`, the same shape as per-record upsert errors.
    pub fn message(&self) -> String {
        format!("{}: {}", self.reference, self.error)
    }
}

/// Decoded products of one or more list pages, plus the items that did not
/// decode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductBatch {
    pub products: Vec<ExternalProduct>,
    pub rejected: Vec<RejectedItem>,
}

impl ProductBatch {
    pub fn from_products(products: Vec<ExternalProduct>) -> Self {
        ProductBatch {
            products,
            rejected: Vec::new(),
        }
    }

    /// Raw item count: decoded and rejected.
    pub fn len(&self) -> usize {
        self.products.len() + self.rejected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn append(&mut self, other: ProductBatch) {
        self.products.extend(other.products);
        self.rejected.extend(other.rejected);
    }
}

/// One page of ERP products.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductPage {
    pub items: ProductBatch,
    pub pagination: Pagination,
}

// =============================================================================
// Sync Log
// =============================================================================

/// Which flow produced an audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SyncType {
    /// Incremental product sync.
    Products,
    /// Full (replace or reconcile) product sync.
    ProductsFull,
    /// A single webhook event.
    Webhook,
}

impl SyncType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncType::Products => "products",
            SyncType::ProductsFull => "products_full",
            SyncType::Webhook => "webhook",
        }
    }
}

impl fmt::Display for SyncType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "products" => Ok(SyncType::Products),
            "products_full" => Ok(SyncType::ProductsFull),
            "webhook" => Ok(SyncType::Webhook),
            other => Err(CoreError::UnknownVariant {
                kind: "sync type",
                value: other.to_string(),
            }),
        }
    }
}

/// Status of an audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Completed,
    Failed,
    /// Written before a webhook is dispatched; finalized afterwards.
    Running,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Completed => "completed",
            SyncStatus::Failed => "failed",
            SyncStatus::Running => "running",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(SyncStatus::Completed),
            "failed" => Ok(SyncStatus::Failed),
            "running" => Ok(SyncStatus::Running),
            other => Err(CoreError::UnknownVariant {
                kind: "sync status",
                value: other.to_string(),
            }),
        }
    }
}

/// Aggregate counters of one sync pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SyncStats {
    pub processed: u32,
    pub created: u32,
    pub updated: u32,
    pub failed: u32,
}

/// An audit entry about to be appended.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSyncLogEntry {
    pub sync_type: SyncType,
    pub status: SyncStatus,
    pub stats: SyncStats,
    pub details: Value,
}

impl NewSyncLogEntry {
    pub fn new(sync_type: SyncType, status: SyncStatus, stats: SyncStats, details: Value) -> Self {
        NewSyncLogEntry {
            sync_type,
            status,
            stats,
            details,
        }
    }
}

/// A persisted audit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SyncLogEntry {
    pub id: Uuid,
    pub sync_type: SyncType,
    pub status: SyncStatus,
    pub records_processed: u32,
    pub records_created: u32,
    pub records_updated: u32,
    pub records_failed: u32,
    pub details: Value,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl SyncLogEntry {
    pub fn stats(&self) -> SyncStats {
        SyncStats {
            processed: self.records_processed,
            created: self.records_created,
            updated: self.records_updated,
            failed: self.records_failed,
        }
    }
}

// =============================================================================
// Sync Outcome (API response)
// =============================================================================

/// Result of a sync or connection-test invocation.
///
/// `success` is false only when the ERP fetch itself failed or the pass
/// hit an unexpected error; per-record failures keep it true and show up in
/// `stats.failed` and `errors`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SyncOutcome {
    pub success: bool,
    pub message: String,
    pub stats: SyncStats,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub errors: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub details: Option<Value>,
}

impl SyncOutcome {
    /// A completed pass; `errors` is omitted when empty.
    pub fn completed(message: impl Into<String>, stats: SyncStats, errors: Vec<String>) -> Self {
        SyncOutcome {
            success: true,
            message: message.into(),
            stats,
            errors: if errors.is_empty() { None } else { Some(errors) },
            details: None,
        }
    }

    /// A failed pass.
    pub fn failed(message: impl Into<String>, stats: SyncStats, errors: Vec<String>) -> Self {
        SyncOutcome {
            success: false,
            message: message.into(),
            stats,
            errors: if errors.is_empty() { None } else { Some(errors) },
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

// =============================================================================
// Webhook
// =============================================================================

/// Item events the ERP delivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookEvent {
    ItemCreated,
    ItemUpdated,
    ItemDeleted,
}

impl WebhookEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookEvent::ItemCreated => "item.created",
            WebhookEvent::ItemUpdated => "item.updated",
            WebhookEvent::ItemDeleted => "item.deleted",
        }
    }
}

impl FromStr for WebhookEvent {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "item.created" => Ok(WebhookEvent::ItemCreated),
            "item.updated" => Ok(WebhookEvent::ItemUpdated),
            "item.deleted" => Ok(WebhookEvent::ItemDeleted),
            other => Err(CoreError::UnknownVariant {
                kind: "webhook event",
                value: other.to_string(),
            }),
        }
    }
}

/// Body of `POST /webhooks/erp`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub event: String,
    pub data: WebhookData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookData {
    #[serde(deserialize_with = "de::flexible_i64")]
    pub id: i64,
    #[serde(default)]
    pub item_no: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Result of handling one webhook event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct WebhookOutcome {
    pub success: bool,
    pub message: String,
    pub processed: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub errors: Option<Vec<String>>,
}

impl WebhookOutcome {
    pub fn processed(message: impl Into<String>, processed: u32) -> Self {
        WebhookOutcome {
            success: true,
            message: message.into(),
            processed,
            errors: None,
        }
    }

    pub fn failed(message: impl Into<String>, errors: Vec<String>) -> Self {
        WebhookOutcome {
            success: false,
            message: message.into(),
            processed: 0,
            errors: Some(errors),
        }
    }
}

// =============================================================================
// Lenient Deserializers
// =============================================================================

mod de {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn value_to_i64<E: Error>(value: &Value) -> Result<Option<i64>, E> {
        match value {
            Value::Null => Ok(None),
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                .map(Some)
                .ok_or_else(|| E::custom(format!("expected integer id, got {}", n))),
            Value::String(s) if s.trim().is_empty() => Ok(None),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(Some)
                .map_err(|_| E::custom(format!("expected integer id, got '{}'", s))),
            other => Err(E::custom(format!("expected integer id, got {}", other))),
        }
    }

    pub fn flexible_i64<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        let value = Value::deserialize(d)?;
        value_to_i64(&value)?.ok_or_else(|| D::Error::custom("id is required"))
    }

    pub fn flexible_opt_i64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        let value = Option::<Value>::deserialize(d)?.unwrap_or(Value::Null);
        value_to_i64(&value)
    }

    pub fn flexible_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        match Option::<Value>::deserialize(d)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => Ok(n.as_f64()),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .map(Some)
                .map_err(|_| D::Error::custom(format!("expected number, got '{}'", s))),
            Some(other) => Err(D::Error::custom(format!("expected number, got {}", other))),
        }
    }

    pub fn flexible_bool<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
        match Option::<Value>::deserialize(d)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(b)),
            Some(Value::Number(n)) => Ok(Some(n.as_f64().map(|f| f != 0.0).unwrap_or(false))),
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "y" => Ok(Some(true)),
                "false" | "0" | "no" | "n" | "" => Ok(Some(false)),
                other => Err(D::Error::custom(format!("expected boolean, got '{}'", other))),
            },
            Some(other) => Err(D::Error::custom(format!("expected boolean, got {}", other))),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_external_product_lenient_fields() {
        let product: ExternalProduct = serde_json::from_value(json!({
            "id": "17",
            "no": "PMP-100",
            "name": "Centrifugal Pump",
            "unitPrice": "1500000.5",
            "quantity": 3,
            "itemCategoryId": 4,
            "active": "1",
            "lastUpdate": "05/03/2024 10:15:00"
        }))
        .unwrap();

        assert_eq!(product.id, 17);
        assert_eq!(product.unit_price, Some(1_500_000.5));
        assert_eq!(product.quantity, Some(3.0));
        assert_eq!(product.category_id, Some(4));
        assert_eq!(product.active, Some(true));
        assert_eq!(product.last_modified.as_deref(), Some("05/03/2024 10:15:00"));
        assert_eq!(product.brand_id, None);
    }

    #[test]
    fn test_external_product_requires_id() {
        let result = serde_json::from_value::<ExternalProduct>(json!({ "name": "No id" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_sync_type_round_trips_through_str() {
        for t in [SyncType::Products, SyncType::ProductsFull, SyncType::Webhook] {
            assert_eq!(t.as_str().parse::<SyncType>().unwrap(), t);
        }
        assert!("orders".parse::<SyncType>().is_err());
    }

    #[test]
    fn test_sync_status_serializes_snake_case() {
        assert_eq!(json!(SyncStatus::Completed), json!("completed"));
        assert_eq!("running".parse::<SyncStatus>().unwrap(), SyncStatus::Running);
    }

    #[test]
    fn test_pagination_ceil() {
        let p = Pagination::from_row_count(1, 100, 250);
        assert_eq!(p.page_count, 3);
        assert!(!p.is_last_page());

        let last = Pagination::from_row_count(3, 100, 250);
        assert!(last.is_last_page());

        let empty = Pagination::from_row_count(1, 100, 0);
        assert_eq!(empty.page_count, 0);
        assert!(empty.is_last_page());
    }

    #[test]
    fn test_product_batch_counts_rejected_items() {
        let mut batch = ProductBatch::from_products(vec![ExternalProduct::with_id(1)]);
        batch.append(ProductBatch {
            products: vec![ExternalProduct::with_id(2)],
            rejected: vec![RejectedItem {
                reference: "PMP-9".into(),
                external_id: Some(9),
                error: "expected number, got 'N/A'".into(),
            }],
        });

        assert_eq!(batch.len(), 3);
        assert_eq!(batch.products.len(), 2);
        assert_eq!(batch.rejected[0].message(), "PMP-9: expected number, got 'N/A'");
        assert!(ProductBatch::default().is_empty());
    }

    #[test]
    fn test_sync_outcome_omits_empty_errors() {
        let outcome = SyncOutcome::completed("done", SyncStats::default(), vec![]);
        let value = serde_json::to_value(&outcome).unwrap();
        assert!(value.get("errors").is_none());
        assert!(value.get("details").is_none());
        assert_eq!(value["stats"]["processed"], 0);
    }

    #[test]
    fn test_webhook_payload_accepts_numeric_or_string_id() {
        let a: WebhookPayload = serde_json::from_value(json!({
            "event": "item.updated",
            "data": { "id": 55, "itemNo": "VLV-2", "timestamp": "01/02/2024 08:00:00" }
        }))
        .unwrap();
        let b: WebhookPayload = serde_json::from_value(json!({
            "event": "item.updated",
            "data": { "id": "55" }
        }))
        .unwrap();

        assert_eq!(a.data.id, 55);
        assert_eq!(a.data.item_no.as_deref(), Some("VLV-2"));
        assert_eq!(b.data.id, 55);
    }

    #[test]
    fn test_webhook_event_parse() {
        assert_eq!(
            "item.deleted".parse::<WebhookEvent>().unwrap(),
            WebhookEvent::ItemDeleted
        );
        assert!("order.created".parse::<WebhookEvent>().is_err());
    }

    #[test]
    fn test_catalog_product_apply_overwrites_fields() {
        let now = Utc::now();
        let upsert = ProductUpsert {
            external_id: 9,
            sku: "GR-9".to_string(),
            name: "Grinder".to_string(),
            description: None,
            price_cents: 1000,
            cost_price_cents: 600,
            stock_quantity: 2,
            unit: "unit".to_string(),
            category_id: None,
            category_name: None,
            brand_id: Some(3),
            brand_name: Some("Makita".to_string()),
            is_active: true,
            external_last_modified: None,
            external_created_at: None,
            last_synced_at: now,
        };
        let mut product = CatalogProduct::from_upsert(Uuid::new_v4(), &upsert, now);
        assert_eq!(product.sku, "GR-9");
        assert_eq!(product.last_synced_at, Some(now));

        let changed = ProductUpsert {
            price_cents: 1200,
            ..upsert
        };
        product.apply(&changed, now);
        assert_eq!(product.price_cents, 1200);
        assert_eq!(product.external_id, Some(9));
    }
}
