//! # Mapping Layer
//!
//! Pure transform from an ERP item record to the catalog write set.
//!
//! ## Field Rules
//! ```text
//! ┌──────────────────────┬──────────────────────┬──────────────────────────┐
//! │ ExternalProduct      │ ProductUpsert        │ When missing / blank     │
//! ├──────────────────────┼──────────────────────┼──────────────────────────┤
//! │ id                   │ external_id          │ (required)               │
//! │ no                   │ sku                  │ "ACC-" + id              │
//! │ name                 │ name                 │ the SKU                  │
//! │ description          │ description          │ None                     │
//! │ unit_price           │ price_cents          │ 0                        │
//! │ avg_cost             │ cost_price_cents     │ 0                        │
//! │ quantity             │ stock_quantity       │ 0 (rounded otherwise)    │
//! │ unit_name            │ unit                 │ "pcs"                    │
//! │ category / brand     │ category / brand     │ None                     │
//! │ active               │ is_active            │ true                     │
//! │ last_modified        │ external_last_mod... │ None (also if unparsable)│
//! │ created              │ external_created_at  │ None (also if unparsable)│
//! │ -                    │ last_synced_at       │ caller-supplied          │
//! └──────────────────────┴──────────────────────┴──────────────────────────┘
//! ```

use chrono::{DateTime, Utc};

use crate::money::Money;
use crate::signature::parse_erp_timestamp;
use crate::types::{ExternalProduct, ProductUpsert};
use crate::{DEFAULT_UNIT, SKU_FALLBACK_PREFIX};

/// Maps an ERP record to the catalog write set.
///
/// Deterministic: the only time-dependent field is `last_synced_at`, which
/// the caller supplies.
pub fn map_external_product(product: &ExternalProduct, synced_at: DateTime<Utc>) -> ProductUpsert {
    let sku = non_blank(product.no.as_deref())
        .map(str::to_string)
        .unwrap_or_else(|| fallback_sku(product.id));

    let name = non_blank(product.name.as_deref())
        .map(str::to_string)
        .unwrap_or_else(|| sku.clone());

    ProductUpsert {
        external_id: product.id,
        sku,
        name,
        description: non_blank(product.description.as_deref()).map(str::to_string),
        price_cents: Money::from_decimal(product.unit_price).cents(),
        cost_price_cents: Money::from_decimal(product.avg_cost).cents(),
        stock_quantity: round_quantity(product.quantity),
        unit: non_blank(product.unit_name.as_deref())
            .unwrap_or(DEFAULT_UNIT)
            .to_string(),
        category_id: product.category_id,
        category_name: non_blank(product.category_name.as_deref()).map(str::to_string),
        brand_id: product.brand_id,
        brand_name: non_blank(product.brand_name.as_deref()).map(str::to_string),
        is_active: product.active.unwrap_or(true),
        external_last_modified: product.last_modified.as_deref().and_then(parse_erp_timestamp),
        external_created_at: product.created.as_deref().and_then(parse_erp_timestamp),
        last_synced_at: synced_at,
    }
}

/// `ACC-<id>`, the SKU of items without an item number.
pub fn fallback_sku(external_id: i64) -> String {
    format!("{}{}", SKU_FALLBACK_PREFIX, external_id)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// Float-to-int `as` saturates and maps NaN to zero.
fn round_quantity(quantity: Option<f64>) -> i64 {
    quantity.map(|q| q.round() as i64).unwrap_or(0)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn full_item() -> ExternalProduct {
        ExternalProduct {
            id: 101,
            no: Some("CMP-101".to_string()),
            name: Some("Air Compressor 50L".to_string()),
            description: Some("Oil-free, 2HP".to_string()),
            unit_price: Some(2_750_000.0),
            avg_cost: Some(1_980_000.25),
            quantity: Some(12.6),
            unit_name: Some("unit".to_string()),
            category_id: Some(3),
            category_name: Some("Compressors".to_string()),
            brand_id: Some(8),
            brand_name: Some("Lakoni".to_string()),
            active: Some(false),
            last_modified: Some("05/03/2024 17:15:00".to_string()),
            created: Some("2023-01-10T02:00:00Z".to_string()),
        }
    }

    #[test]
    fn test_maps_every_field() {
        let now = Utc::now();
        let row = map_external_product(&full_item(), now);

        assert_eq!(row.external_id, 101);
        assert_eq!(row.sku, "CMP-101");
        assert_eq!(row.name, "Air Compressor 50L");
        assert_eq!(row.description.as_deref(), Some("Oil-free, 2HP"));
        assert_eq!(row.price_cents, 275_000_000);
        assert_eq!(row.cost_price_cents, 198_000_025);
        assert_eq!(row.stock_quantity, 13);
        assert_eq!(row.unit, "unit");
        assert_eq!(row.category_id, Some(3));
        assert_eq!(row.brand_name.as_deref(), Some("Lakoni"));
        assert!(!row.is_active);
        assert_eq!(
            row.external_last_modified,
            Some(Utc.with_ymd_and_hms(2024, 3, 5, 10, 15, 0).unwrap())
        );
        assert_eq!(
            row.external_created_at,
            Some(Utc.with_ymd_and_hms(2023, 1, 10, 2, 0, 0).unwrap())
        );
        assert_eq!(row.last_synced_at, now);
    }

    #[test]
    fn test_defaults_for_sparse_record() {
        let row = map_external_product(&ExternalProduct::with_id(7), Utc::now());

        assert_eq!(row.sku, "ACC-7");
        assert_eq!(row.name, "ACC-7");
        assert_eq!(row.description, None);
        assert_eq!(row.price_cents, 0);
        assert_eq!(row.cost_price_cents, 0);
        assert_eq!(row.stock_quantity, 0);
        assert_eq!(row.unit, "pcs");
        assert_eq!(row.category_id, None);
        assert_eq!(row.brand_id, None);
        assert!(row.is_active);
        assert_eq!(row.external_last_modified, None);
    }

    #[test]
    fn test_name_falls_back_to_item_number() {
        let item = ExternalProduct {
            no: Some("VLV-9".to_string()),
            name: Some("   ".to_string()),
            unit_name: Some("".to_string()),
            ..ExternalProduct::with_id(9)
        };
        let row = map_external_product(&item, Utc::now());
        assert_eq!(row.sku, "VLV-9");
        assert_eq!(row.name, "VLV-9");
        assert_eq!(row.unit, "pcs");
    }

    #[test]
    fn test_unparsable_timestamp_is_dropped() {
        let item = ExternalProduct {
            last_modified: Some("not a date".to_string()),
            ..ExternalProduct::with_id(1)
        };
        assert_eq!(map_external_product(&item, Utc::now()).external_last_modified, None);
    }

    #[test]
    fn test_mapping_is_deterministic() {
        let now = Utc::now();
        let item = full_item();
        assert_eq!(map_external_product(&item, now), map_external_product(&item, now));
    }

    #[test]
    fn test_negative_quantity_rounds() {
        let item = ExternalProduct {
            quantity: Some(-2.4),
            ..ExternalProduct::with_id(1)
        };
        assert_eq!(map_external_product(&item, Utc::now()).stock_quantity, -2);
    }
}
