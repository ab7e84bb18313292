//! # ERP Wire Protocol
//!
//! Endpoints, query parameters and the response envelope of the ERP API.
//!
//! ## Response Envelope
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Success                              │  Failure (HTTP 200 as well!)    │
//! │  {                                    │  {                              │
//! │    "s": true,                         │    "s": false,                  │
//! │    "d": [ {item}, {item}, ... ],      │    "d": ["Data tidak ditemukan"]│
//! │    "sp": {                            │  }                              │
//! │      "page": 1, "pageSize": 100,      │                                 │
//! │      "pageCount": 5, "rowCount": 450  │  An HTML login page with 200    │
//! │    }                                  │  is not an envelope at all and  │
//! │  }                                    │  counts as an auth failure.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Paging on the request side is 0-based (`sp.page=0` is the first page);
//! the bridge exposes 1-based pages everywhere else.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{SyncError, SyncResult};
use stockbridge_core::{ExternalProduct, Pagination, ProductBatch, RejectedItem};

// =============================================================================
// Endpoints & Headers
// =============================================================================

/// Session info; used as the connection test.
pub const API_TOKEN_PATH: &str = "/api/api-token.do";

/// Paged item list.
pub const ITEM_LIST_PATH: &str = "/api/item/list.do";

/// Single item by id.
pub const ITEM_DETAIL_PATH: &str = "/api/item/detail.do";

pub const HEADER_TIMESTAMP: &str = "X-Api-Timestamp";
pub const HEADER_SIGNATURE: &str = "X-Api-Signature";
pub const HEADER_COMPANY_ID: &str = "X-Company-Id";

/// Fields requested from the item list.
pub const ITEM_FIELDS: &str = "id,no,name,notes,unitPrice,avgCost,quantity,unit1Name,\
itemCategoryId,itemCategoryName,brandId,brandName,active,lastUpdate,createDate";

// =============================================================================
// Query Builders
// =============================================================================

/// Query of one list page. `page` is 1-based.
pub fn list_query(page: u32, limit: u32) -> Vec<(&'static str, String)> {
    vec![
        ("sp.page", page.saturating_sub(1).to_string()),
        ("sp.pageSize", limit.to_string()),
        ("fields", ITEM_FIELDS.to_string()),
    ]
}

/// Query of one delta page: items with `lastUpdate >= since`. `page` is 1-based.
pub fn delta_query(
    since_erp_timestamp: &str,
    page: u32,
    limit: u32,
) -> Vec<(&'static str, String)> {
    let mut query = list_query(page, limit);
    query.push(("filter.lastUpdate.op", "GREATER_EQUAL".to_string()));
    query.push(("filter.lastUpdate.val", since_erp_timestamp.to_string()));
    query
}

// =============================================================================
// Envelope
// =============================================================================

/// Page metadata in the `sp` member.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    #[serde(default)]
    pub page_count: Option<u32>,
    #[serde(default)]
    pub row_count: Option<u64>,
}

/// The ERP's response envelope. `d` stays raw until the success flag is known.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    #[serde(alias = "success")]
    pub s: bool,
    #[serde(default)]
    pub d: Value,
    #[serde(default)]
    pub sp: Option<PageInfo>,
}

impl Envelope {
    /// Parses a response body. Anything that is not a JSON envelope is an
    /// `InvalidResponse`.
    pub fn parse(body: &str) -> SyncResult<Self> {
        serde_json::from_str::<Envelope>(body).map_err(|_| {
            let preview: String = body.chars().take(80).collect();
            SyncError::InvalidResponse(format!("expected JSON envelope, got: {}", preview.trim()))
        })
    }

    /// Returns the envelope if `s` is true, otherwise `ErpRejected` with the
    /// ERP's message.
    pub fn into_success(self) -> SyncResult<Self> {
        if self.s {
            Ok(self)
        } else {
            Err(SyncError::ErpRejected(error_message(&self.d)))
        }
    }

    /// Decodes `d` as a list of items. Items that do not decode (no id, a
    /// price of `"N/A"`) come back in `rejected`.
    pub fn products(&self) -> SyncResult<ProductBatch> {
        let items = match &self.d {
            Value::Array(items) => items,
            Value::Null => return Ok(ProductBatch::default()),
            other => {
                return Err(SyncError::InvalidResponse(format!(
                    "expected item list, got {}",
                    json_kind(other)
                )))
            }
        };

        let mut batch = ProductBatch::default();
        for (index, item) in items.iter().enumerate() {
            match serde_json::from_value::<ExternalProduct>(item.clone()) {
                Ok(product) => batch.products.push(product),
                Err(e) => {
                    let rejected = rejected_item(item, index, &e);
                    warn!(item = %rejected.reference, error = %e, "Undecodable ERP item");
                    batch.rejected.push(rejected);
                }
            }
        }
        Ok(batch)
    }

    /// Decodes `d` as a single item.
    pub fn product(&self) -> SyncResult<ExternalProduct> {
        Ok(serde_json::from_value(self.d.clone())?)
    }

    /// Pagination of a list response for a 1-based `page` request.
    ///
    /// `page_count` falls back to `ceil(row_count / limit)`. Without any
    /// `sp` block a full page implies another page may follow.
    pub fn pagination(&self, page: u32, limit: u32, returned: usize) -> Pagination {
        let info = self.sp.clone().unwrap_or_default();
        match (info.page_count, info.row_count) {
            (Some(page_count), row_count) => Pagination {
                page,
                page_size: limit,
                page_count,
                row_count: row_count.unwrap_or(page_count as u64 * limit as u64),
            },
            (None, Some(row_count)) => Pagination::from_row_count(page, limit, row_count),
            (None, None) => {
                let seen = (page.saturating_sub(1) as u64) * limit as u64 + returned as u64;
                Pagination {
                    page,
                    page_size: limit,
                    page_count: if returned as u64 >= limit as u64 { page + 1 } else { page },
                    row_count: seen,
                }
            }
        }
    }
}

/// Names a raw item that failed to decode by whatever it still carries.
fn rejected_item(item: &Value, index: usize, err: &serde_json::Error) -> RejectedItem {
    let external_id = item.get("id").and_then(|id| match id {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    });
    let number = item
        .get("no")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|no| !no.is_empty());

    let reference = match (number, external_id) {
        (Some(no), _) => no.to_string(),
        (None, Some(id)) => format!("id {}", id),
        (None, None) => format!("item #{}", index + 1),
    };

    RejectedItem {
        reference,
        external_id,
        error: err.to_string(),
    }
}

/// Extracts a readable message from a failed envelope's `d`.
pub fn error_message(d: &Value) -> String {
    match d {
        Value::String(s) => s.clone(),
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect();
            if parts.is_empty() {
                "no message".to_string()
            } else {
                parts.join("; ")
            }
        }
        Value::Null => "no message".to_string(),
        other => other.to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// =============================================================================
// Connection Info
// =============================================================================

/// What the session-info endpoint tells about the credentials.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_alias: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
}

impl ConnectionInfo {
    /// Reads the known fields of the session-info `d` block; unknown shapes
    /// yield an empty info.
    pub fn from_value(d: &Value) -> Self {
        let database = d.get("database").unwrap_or(d);
        ConnectionInfo {
            database_id: database.get("id").and_then(Value::as_i64),
            database_alias: database
                .get("alias")
                .and_then(Value::as_str)
                .map(str::to_string),
            user_name: d
                .get("user")
                .and_then(|u| u.get("name"))
                .and_then(Value::as_str)
                .map(str::to_string),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
