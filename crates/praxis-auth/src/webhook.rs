//! Payment webhook signatures.
//!
//! The provider sends `t=<unix seconds>,v1=<hex>` where the hex value is
//! HMAC-SHA256 over `"{t}.{payload}"` keyed with the endpoint secret. During
//! secret rotation several `v1` entries may be present.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::AuthError;

type HmacSha256 = Hmac<Sha256>;

struct ParsedHeader<'a> {
    timestamp: i64,
    signatures: Vec<&'a str>,
}

fn parse_header(header: &str) -> Result<ParsedHeader<'_>, AuthError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => {
                timestamp = Some(value.parse::<i64>().map_err(|_| {
                    AuthError::InvalidSignature(format!("bad timestamp '{value}'"))
                })?);
            }
            "v1" => signatures.push(value),
            _ => {}
        }
    }

    let timestamp =
        timestamp.ok_or_else(|| AuthError::InvalidSignature("missing timestamp".into()))?;
    if signatures.is_empty() {
        return Err(AuthError::InvalidSignature("no v1 signature".into()));
    }
    Ok(ParsedHeader {
        timestamp,
        signatures,
    })
}

fn mac_for(secret: &str, timestamp: i64, payload: &[u8]) -> Result<HmacSha256, AuthError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AuthError::InvalidSignature(format!("bad secret: {e}")))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Verify a signature header against the raw request body.
///
/// `now` is unix seconds. Timestamps further than `tolerance_secs` from
/// `now` in either direction are rejected.
///
/// # Errors
///
/// Returns `AuthError::InvalidSignature` for malformed headers or when no
/// `v1` entry matches, and `AuthError::StaleSignature` for old timestamps.
pub fn verify_signature(
    header: &str,
    payload: &[u8],
    secret: &str,
    now: i64,
    tolerance_secs: i64,
) -> Result<(), AuthError> {
    let parsed = parse_header(header)?;
    let skew = now
        .checked_sub(parsed.timestamp)
        .and_then(i64::checked_abs)
        .ok_or(AuthError::StaleSignature)?;
    if skew > tolerance_secs {
        return Err(AuthError::StaleSignature);
    }

    let mac = mac_for(secret, parsed.timestamp, payload)?;
    let matched = parsed.signatures.iter().any(|sig| {
        hex::decode(sig).is_ok_and(|bytes| mac.clone().verify_slice(&bytes).is_ok())
    });
    if matched {
        Ok(())
    } else {
        Err(AuthError::InvalidSignature("no matching signature".into()))
    }
}

/// Build a header for `payload` signed at `timestamp`.
///
/// # Errors
///
/// Returns `AuthError::InvalidSignature` if the secret is unusable.
pub fn sign(payload: &[u8], secret: &str, timestamp: i64) -> Result<String, AuthError> {
    let mac = mac_for(secret, timestamp, payload)?;
    Ok(format!(
        "t={timestamp},v1={}",
        hex::encode(mac.finalize().into_bytes())
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";
    const NOW: i64 = 1_760_000_000;

    #[test]
    fn valid_signature_passes() {
        let payload = br#"{"id":"evt_1"}"#;
        let header = sign(payload, SECRET, NOW).unwrap();
        assert!(verify_signature(&header, payload, SECRET, NOW + 10, 300).is_ok());
    }

    #[test]
    fn tampered_payload_fails() {
        let header = sign(b"original", SECRET, NOW).unwrap();
        let err = verify_signature(&header, b"tampered", SECRET, NOW, 300).unwrap_err();
        assert!(matches!(err, AuthError::InvalidSignature(_)));
    }

    #[test]
    fn wrong_secret_fails() {
        let header = sign(b"body", "other", NOW).unwrap();
        assert!(verify_signature(&header, b"body", SECRET, NOW, 300).is_err());
    }

    #[test]
    fn stale_timestamp_fails() {
        let header = sign(b"body", SECRET, NOW).unwrap();
        let err = verify_signature(&header, b"body", SECRET, NOW + 301, 300).unwrap_err();
        assert!(matches!(err, AuthError::StaleSignature));
    }

    #[test]
    fn extreme_timestamps_are_stale() {
        for header in ["t=-9223372036854775808,v1=00", "t=9223372036854775807,v1=00"] {
            let err = verify_signature(header, b"{}", SECRET, NOW, 300).unwrap_err();
            assert!(matches!(err, AuthError::StaleSignature), "{header}: {err:?}");
        }
        let err = verify_signature("t=-9223372036854775808,v1=00", b"{}", SECRET, -1, 300)
            .unwrap_err();
        assert!(matches!(err, AuthError::StaleSignature));
    }

    #[test]
    fn any_matching_v1_entry_is_enough() {
        let good = sign(b"body", SECRET, NOW).unwrap();
        let good_sig = good.split("v1=").nth(1).unwrap();
        let header = format!("t={NOW},v1=deadbeef,v1={good_sig}");
        assert!(verify_signature(&header, b"body", SECRET, NOW, 300).is_ok());
    }

    #[test]
    fn malformed_headers_fail() {
        assert!(verify_signature("v1=abcd", b"x", SECRET, NOW, 300).is_err());
        assert!(verify_signature(&format!("t={NOW}"), b"x", SECRET, NOW, 300).is_err());
        assert!(verify_signature("t=soon,v1=ab", b"x", SECRET, NOW, 300).is_err());
    }
}
