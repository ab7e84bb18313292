//! # Signature Utility
//!
//! Timestamp formatting and HMAC-SHA256 signatures for the ERP API.
//!
//! ## Request Signing
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  OUTBOUND (bridge → ERP)                                                │
//! │                                                                         │
//! │   now (UTC) ──► +07:00 ──► "05/03/2024 17:15:00"  ──► X-Api-Timestamp   │
//! │                                   │                                     │
//! │                                   ▼                                     │
//! │                    HMAC-SHA256(key = secret) ──► hex ──► X-Api-Signature│
//! │                                                                         │
//! │  INBOUND (ERP → /webhooks/erp)                                          │
//! │                                                                         │
//! │   raw body ──► HMAC-SHA256(key = webhook secret) ──► constant-time      │
//! │                                                 compare with x-signature│
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! None of these functions panic. Malformed input yields `false` or `None`.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, TimeZone, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::ERP_UTC_OFFSET_SECS;

type HmacSha256 = Hmac<Sha256>;

/// Wire format of ERP timestamps.
pub const ERP_TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// Prefix every ERP API token carries.
pub const BEARER_TOKEN_PREFIX: &str = "aat.";

/// Shortest token accepted by [`validate_bearer_token`].
pub const BEARER_TOKEN_MIN_LEN: usize = 20;

// =============================================================================
// Timestamps
// =============================================================================

fn erp_offset() -> FixedOffset {
    // 7 * 3600 is always within the ±86_400 bound FixedOffset accepts.
    FixedOffset::east_opt(ERP_UTC_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// Current wall-clock time in ERP format and time zone.
pub fn generate_timestamp() -> String {
    format_erp_timestamp(Utc::now())
}

/// Formats an instant as `dd/mm/yyyy HH:mm:ss` in the ERP time zone.
pub fn format_erp_timestamp(at: DateTime<Utc>) -> String {
    at.with_timezone(&erp_offset())
        .format(ERP_TIMESTAMP_FORMAT)
        .to_string()
}

/// Parses an ERP timestamp.
///
/// Accepts `dd/mm/yyyy HH:mm:ss` (interpreted in the ERP time zone), the
/// same without seconds, and RFC 3339.
pub fn parse_erp_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(raw, ERP_TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%d/%m/%Y %H:%M"))
        .ok()?;

    erp_offset()
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

// =============================================================================
// HMAC
// =============================================================================

/// HMAC-SHA256 of `message` keyed by `secret`, lowercase hex.
pub fn generate_signature(message: &str, secret: &str) -> String {
    match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mut mac) => {
            mac.update(message.as_bytes());
            hex::encode(mac.finalize().into_bytes())
        }
        // HMAC takes keys of any length; this arm is unreachable in practice.
        Err(_) => String::new(),
    }
}

/// Checks a hex signature against `message` in constant time.
pub fn verify_signature(received: &str, message: &str, secret: &str) -> bool {
    let received = received.trim();
    if received.is_empty() {
        return false;
    }

    let Ok(bytes) = hex::decode(received) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(message.as_bytes());
    mac.verify_slice(&bytes).is_ok()
}

// =============================================================================
// Bearer Token
// =============================================================================

/// Shape check of an ERP API token. Says nothing about whether the ERP
/// will accept it.
pub fn validate_bearer_token(token: &str) -> bool {
    token.starts_with(BEARER_TOKEN_PREFIX)
        && token.len() >= BEARER_TOKEN_MIN_LEN
        && !token.chars().any(char::is_whitespace)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    const SECRET: &str = "s3cr3t-key";

    #[test]
    fn test_format_uses_erp_offset() {
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 10, 15, 0).unwrap();
        assert_eq!(format_erp_timestamp(at), "05/03/2024 17:15:00");

        // Crosses midnight into the next ERP day
        let late = Utc.with_ymd_and_hms(2024, 12, 31, 20, 0, 5).unwrap();
        assert_eq!(format_erp_timestamp(late), "01/01/2025 03:00:05");
    }

    #[test]
    fn test_generate_timestamp_shape() {
        let ts = generate_timestamp();
        assert_eq!(ts.len(), 19);
        assert!(parse_erp_timestamp(&ts).is_some());
    }

    #[test]
    fn test_parse_erp_timestamp_formats() {
        let parsed = parse_erp_timestamp("05/03/2024 17:15:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 3, 5, 10, 15, 0).unwrap());

        let no_seconds = parse_erp_timestamp("05/03/2024 17:15").unwrap();
        assert_eq!(no_seconds.minute(), 15);

        let rfc = parse_erp_timestamp("2024-03-05T10:15:00Z").unwrap();
        assert_eq!(rfc.day(), 5);
        assert_eq!(rfc.hour(), 10);
    }

    #[test]
    fn test_parse_erp_timestamp_rejects_garbage() {
        assert!(parse_erp_timestamp("").is_none());
        assert!(parse_erp_timestamp("yesterday").is_none());
        assert!(parse_erp_timestamp("32/13/2024 25:00:00").is_none());
    }

    #[test]
    fn test_signature_is_deterministic_hex() {
        let a = generate_signature("05/03/2024 17:15:00", SECRET);
        let b = generate_signature("05/03/2024 17:15:00", SECRET);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(a, generate_signature("05/03/2024 17:15:01", SECRET));
    }

    #[test]
    fn test_verify_accepts_generated_signature() {
        for ts in ["01/01/2024 00:00:00", "31/12/2030 23:59:59", ""] {
            let sig = generate_signature(ts, SECRET);
            assert!(verify_signature(&sig, ts, SECRET));
            assert!(verify_signature(&sig.to_uppercase(), ts, SECRET));
        }
    }

    #[test]
    fn test_verify_rejects_malformed_input() {
        let ts = "05/03/2024 17:15:00";
        let sig = generate_signature(ts, SECRET);

        assert!(!verify_signature("", ts, SECRET));
        assert!(!verify_signature("zz-not-hex", ts, SECRET));
        assert!(!verify_signature(&sig[..62], ts, SECRET));
        assert!(!verify_signature(&format!("{}00", sig), ts, SECRET));
        assert!(!verify_signature(&sig, ts, "other-secret"));
        assert!(!verify_signature("abc", ts, SECRET));
    }

    #[test]
    fn test_validate_bearer_token() {
        assert!(validate_bearer_token("aat.MTAw.eyJhbGciOiJIUzI1NiJ9"));
        assert!(!validate_bearer_token("MTAw.eyJhbGciOiJIUzI1NiJ9.xx"));
        assert!(!validate_bearer_token("aat.short"));
        assert!(!validate_bearer_token("aat.MTAw eyJhbGciOiJIUzI1NiJ9"));
        assert!(!validate_bearer_token(""));
    }
}
