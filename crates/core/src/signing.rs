//! Webhook request signing.
//!
//! The receiving robot endpoint authenticates a request by recomputing an
//! HMAC-SHA256 over `"{timestamp}\n{secret}"` and comparing it with the
//! `sign` query parameter. The timestamp is Unix milliseconds and bounds the
//! window in which a captured URL can be replayed.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Query parameter carrying the signing timestamp.
pub const TIMESTAMP_PARAM: &str = "timestamp";

/// Query parameter carrying the base64 signature.
pub const SIGN_PARAM: &str = "sign";

/// The string that gets signed for a given timestamp.
pub fn string_to_sign(timestamp_millis: i64, secret: &str) -> String {
    format!("{timestamp_millis}\n{secret}")
}

/// Compute the base64-encoded HMAC-SHA256 signature for a webhook call.
///
/// The key is the UTF-8 bytes of `secret`. The returned value is plain
/// (padded) base64; percent-encoding happens when it is placed in the URL.
pub fn compute_webhook_signature(secret: &str, timestamp_millis: i64) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(string_to_sign(timestamp_millis, secret).as_bytes());
    STANDARD.encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn golden_signature() {
        assert_eq!(
            compute_webhook_signature("abc", 1_700_000_000_000),
            "op8PfVzJL3l7ytCWjPLUMemWOtOBySrLOe22d7A7me4="
        );
    }

    #[test]
    fn string_to_sign_uses_newline_separator() {
        assert_eq!(string_to_sign(1_700_000_000_000, "abc"), "1700000000000\nabc");
    }

    #[test]
    fn signature_is_deterministic() {
        let a = compute_webhook_signature("SEC123", 1_700_000_000_000);
        let b = compute_webhook_signature("SEC123", 1_700_000_000_000);
        assert_eq!(a, b);
        assert_eq!(a, "lkcPI1uoxBY1gUnCnnPH1Kkru0Hqjo7rFpA3haIVhEQ=");
    }

    #[test]
    fn signature_changes_with_timestamp() {
        let a = compute_webhook_signature("abc", 1_700_000_000_000);
        let b = compute_webhook_signature("abc", 1_700_000_000_001);
        assert_ne!(a, b);
    }

    #[test]
    fn signature_changes_with_secret() {
        let a = compute_webhook_signature("secret_a", 1);
        let b = compute_webhook_signature("secret_b", 1);
        assert_ne!(a, b);
    }
}
