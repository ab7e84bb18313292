//! # Validation Module
//!
//! Rules a mapped ERP record must meet before it is written to the catalog,
//! plus the bounds of ERP page requests.
//!
//! ## Where Validation Sits
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ERP JSON ──► serde (types)       shape: id present, numbers parse      │
//! │           ──► mapping             defaults: SKU, unit, zero prices      │
//! │           ──► THIS MODULE         catalog rules: lengths, signs         │
//! │           ──► Postgres            NOT NULL, UNIQUE(external_id)         │
//! │                                                                         │
//! │  A record failing here is counted as `failed` for that record only;     │
//! │  the rest of the batch continues.                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use stockbridge_core::validation::{validate_sku, validate_page_request};
//!
//! assert!(validate_sku("PMP-100/A").is_ok());
//! assert!(validate_sku("").is_err());
//! assert!(validate_page_request(0, 100).is_err());
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::ProductUpsert;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Column width of `catalog_products.sku`.
pub const MAX_SKU_LEN: usize = 100;

/// Column width of `catalog_products.name`.
pub const MAX_NAME_LEN: usize = 255;

/// Largest page size the ERP list endpoint serves.
pub const MAX_PAGE_SIZE: u32 = 1000;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU.
///
/// ## Rules
/// - Must not be blank
/// - At most 100 characters
///
/// ERP item numbers may contain spaces, dots or slashes, so no character
/// class is enforced.
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }

    if sku.chars().count() > MAX_SKU_LEN {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: MAX_SKU_LEN,
        });
    }

    Ok(())
}

/// Validates a product name (not blank, at most 255 characters).
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a catalog amount. Zero is allowed.
pub fn validate_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a 1-based ERP page request.
///
/// ## Rules
/// - `page >= 1`
/// - `1 <= limit <= 1000`
pub fn validate_page_request(page: u32, limit: u32) -> ValidationResult<()> {
    if page == 0 {
        return Err(ValidationError::OutOfRange {
            field: "page".to_string(),
            min: 1,
            max: u32::MAX as i64,
        });
    }

    if limit == 0 || limit > MAX_PAGE_SIZE {
        return Err(ValidationError::OutOfRange {
            field: "limit".to_string(),
            min: 1,
            max: MAX_PAGE_SIZE as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Composite Validators
// =============================================================================

/// Validates a mapped record before it reaches the catalog.
///
/// Stock may be negative: the ERP allows overselling and the catalog
/// mirrors it.
pub fn validate_upsert(upsert: &ProductUpsert) -> ValidationResult<()> {
    validate_sku(&upsert.sku)?;
    validate_product_name(&upsert.name)?;
    validate_amount("price", Money::from_cents(upsert.price_cents))?;
    validate_amount("cost_price", Money::from_cents(upsert.cost_price_cents))?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::map_external_product;
    use crate::types::ExternalProduct;
    use chrono::Utc;

    fn mapped(item: ExternalProduct) -> ProductUpsert {
        map_external_product(&item, Utc::now())
    }

    #[test]
    fn test_validate_sku() {
        assert!(validate_sku("CMP-101").is_ok());
        assert!(validate_sku("PIPE 1/2\" SCH40").is_ok());
        assert!(matches!(
            validate_sku("   "),
            Err(ValidationError::Required { .. })
        ));
        assert!(matches!(
            validate_sku(&"X".repeat(101)),
            Err(ValidationError::TooLong { max: 100, .. })
        ));
    }

    #[test]
    fn test_validate_product_name() {
        assert!(validate_product_name("Submersible Pump 1HP").is_ok());
        assert!(validate_product_name("").is_err());
        assert!(validate_product_name(&"n".repeat(256)).is_err());
        assert!(validate_product_name(&"é".repeat(255)).is_ok());
    }

    #[test]
    fn test_validate_amount() {
        assert!(validate_amount("price", Money::zero()).is_ok());
        assert!(validate_amount("price", Money::from_decimal(Some(0.01))).is_ok());
        let err = validate_amount("price", Money::from_cents(-1)).unwrap_err();
        assert_eq!(err.to_string(), "price must not be negative");
    }

    #[test]
    fn test_validate_page_request() {
        assert!(validate_page_request(1, 100).is_ok());
        assert!(validate_page_request(1, 1000).is_ok());
        assert!(validate_page_request(0, 100).is_err());
        assert!(validate_page_request(1, 0).is_err());
        assert!(validate_page_request(1, 1001).is_err());
    }

    #[test]
    fn test_validate_upsert_accepts_sparse_record() {
        assert!(validate_upsert(&mapped(ExternalProduct::with_id(5))).is_ok());
    }

    #[test]
    fn test_validate_upsert_rejects_negative_price() {
        let item = ExternalProduct {
            unit_price: Some(-10.0),
            ..ExternalProduct::with_id(5)
        };
        assert!(matches!(
            validate_upsert(&mapped(item)),
            Err(ValidationError::MustNotBeNegative { .. })
        ));
    }

    #[test]
    fn test_validate_upsert_allows_negative_stock() {
        let item = ExternalProduct {
            quantity: Some(-3.0),
            ..ExternalProduct::with_id(5)
        };
        assert!(validate_upsert(&mapped(item)).is_ok());
    }

    #[test]
    fn test_validate_upsert_rejects_long_item_number() {
        let item = ExternalProduct {
            no: Some("A".repeat(150)),
            ..ExternalProduct::with_id(5)
        };
        assert!(matches!(
            validate_upsert(&mapped(item)),
            Err(ValidationError::TooLong { .. })
        ));
    }
}
