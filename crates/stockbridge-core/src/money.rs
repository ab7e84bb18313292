//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  The ERP sends prices as JSON numbers:                                  │
//! │    "unitPrice": 1250000.5                                               │
//! │                                                                         │
//! │  Stored as float, repeated syncs can drift:                             │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: convert ONCE at the ERP boundary                         │
//! │    1250000.5  ──► Money::from_decimal ──► 125000050 (minor units)       │
//! │    Catalog stores BIGINT; the storefront formats for display            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use stockbridge_core::money::Money;
//!
//! let price = Money::from_decimal(Some(10.99));
//! assert_eq!(price.cents(), 1099);
//!
//! // Missing or non-finite ERP values become zero
//! assert_eq!(Money::from_decimal(None), Money::zero());
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (1/100 of the major unit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Wraps an amount already in minor units, such as a stored catalog price.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Converts an optional ERP decimal into minor units.
    ///
    /// ## Rules
    /// - `None`, NaN and infinities become zero
    /// - Rounds half away from zero to the nearest minor unit
    /// - Saturates at the i64 range instead of wrapping
    pub fn from_decimal(value: Option<f64>) -> Self {
        match value {
            Some(v) if v.is_finite() => {
                let scaled = (v * 100.0).round();
                if scaled >= i64::MAX as f64 {
                    Money(i64::MAX)
                } else if scaled <= i64::MIN as f64 {
                    Money(i64::MIN)
                } else {
                    Money(scaled as i64)
                }
            }
            _ => Money::zero(),
        }
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Zero money.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the amount is negative.
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_decimal_rounds_to_minor_units() {
        assert_eq!(Money::from_decimal(Some(10.99)).cents(), 1099);
        assert_eq!(Money::from_decimal(Some(0.005)).cents(), 1);
        assert_eq!(Money::from_decimal(Some(1_250_000.5)).cents(), 125_000_050);
    }

    #[test]
    fn test_from_decimal_defaults_to_zero() {
        assert_eq!(Money::from_decimal(None), Money::zero());
        assert_eq!(Money::from_decimal(Some(f64::NAN)), Money::zero());
        assert_eq!(Money::from_decimal(Some(f64::INFINITY)), Money::zero());
    }

    #[test]
    fn test_from_decimal_saturates() {
        assert_eq!(Money::from_decimal(Some(1e30)).cents(), i64::MAX);
    }

    #[test]
    fn test_is_negative() {
        assert!(Money::from_cents(-1).is_negative());
        assert!(!Money::zero().is_negative());
    }
}
