//! Clerk webhook signature verification.
//!
//! Clerk delivers webhooks through Svix, which signs each request using
//! HMAC-SHA256. Reference: https://docs.svix.com/receiving/verifying-payloads/how-manual

use std::time::{SystemTime, UNIX_EPOCH};

use axum::http::HeaderMap;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

/// Prefix Clerk puts in front of the base64 signing secret.
pub const SECRET_PREFIX: &str = "whsec_";

/// Header names accepted for each delivery field, in lookup order.
pub const ID_HEADERS: [&str; 3] = ["svix-id", "webhook-id", "delivery-id"];
pub const TIMESTAMP_HEADERS: [&str; 3] = ["svix-timestamp", "webhook-timestamp", "delivery-timestamp"];
pub const SIGNATURE_HEADERS: [&str; 3] = ["svix-signature", "webhook-signature", "delivery-signature"];

/// Reasons a delivery fails verification.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("timestamp header is not a unix timestamp")]
    InvalidTimestamp,

    #[error("timestamp is too old")]
    TimestampTooOld,

    #[error("timestamp is too far in the future")]
    TimestampTooNew,

    #[error("signature header contains no signatures")]
    InvalidSignatureHeader,

    #[error("no matching signature found")]
    NoMatchingSignature,
}

/// Errors decoding the configured signing secret.
#[derive(Debug, Error, Clone)]
pub enum SecretError {
    #[error("signing secret is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("signing secret is not a usable HMAC key")]
    InvalidKey,
}

/// Keyed HMAC built from the decoded signing secret.
#[derive(Clone)]
pub struct SigningSecret(HmacSha256);

impl SigningSecret {
    /// Decode a `whsec_`-prefixed (or bare) base64 secret.
    pub fn parse(secret: &str) -> Result<Self, SecretError> {
        let encoded = secret.trim();
        let encoded = encoded.strip_prefix(SECRET_PREFIX).unwrap_or(encoded);
        let key = STANDARD.decode(encoded)?;
        let mac = HmacSha256::new_from_slice(&key).map_err(|_| SecretError::InvalidKey)?;
        Ok(Self(mac))
    }

    fn mac(&self) -> HmacSha256 {
        self.0.clone()
    }
}

impl std::fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SigningSecret(..)")
    }
}

/// The three transport headers a delivery is signed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryHeaders {
    pub id: String,
    pub timestamp: String,
    pub signature: String,
}

/// Header fields absent from a delivery.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("missing webhook headers: {}", .missing.join(", "))]
pub struct MissingHeaders {
    pub missing: Vec<&'static str>,
}

impl DeliveryHeaders {
    /// Extract the delivery headers, reporting every field that is missing.
    pub fn from_header_map(headers: &HeaderMap) -> Result<Self, MissingHeaders> {
        let id = first_header(headers, &ID_HEADERS);
        let timestamp = first_header(headers, &TIMESTAMP_HEADERS);
        let signature = first_header(headers, &SIGNATURE_HEADERS);

        match (id, timestamp, signature) {
            (Some(id), Some(timestamp), Some(signature)) => Ok(Self {
                id,
                timestamp,
                signature,
            }),
            (id, timestamp, signature) => {
                let mut missing = Vec::new();
                if id.is_none() {
                    missing.push("id");
                }
                if timestamp.is_none() {
                    missing.push("timestamp");
                }
                if signature.is_none() {
                    missing.push("signature");
                }
                Err(MissingHeaders { missing })
            }
        }
    }
}

fn first_header(headers: &HeaderMap, names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        headers
            .get(*name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    })
}

/// Compute the base64 `v1` signature for a delivery.
///
/// The signed content is `"{id}.{timestamp}."` followed by the raw body.
pub fn sign(secret: &SigningSecret, id: &str, timestamp: &str, body: &[u8]) -> String {
    let mut mac = secret.mac();
    mac.update(id.as_bytes());
    mac.update(b".");
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(body);
    STANDARD.encode(mac.finalize().into_bytes())
}

/// Verify a delivery against the current time.
///
/// `body` must be the exact bytes received; re-serialized JSON will not match.
pub fn verify_webhook(
    secret: &SigningSecret,
    headers: &DeliveryHeaders,
    body: &[u8],
    tolerance_secs: u64,
) -> Result<(), SignatureError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    verify_webhook_at(secret, headers, body, tolerance_secs, now)
}

/// Verify a delivery as of `now` (unix seconds).
pub fn verify_webhook_at(
    secret: &SigningSecret,
    headers: &DeliveryHeaders,
    body: &[u8],
    tolerance_secs: u64,
    now: u64,
) -> Result<(), SignatureError> {
    // Reject stale or future timestamps (prevents replay attacks)
    let webhook_time: u64 = match headers.timestamp.parse() {
        Ok(t) => t,
        Err(_) => {
            warn!(timestamp = %headers.timestamp, "webhook_signature_invalid_timestamp");
            return Err(SignatureError::InvalidTimestamp);
        }
    };

    if now > webhook_time && now - webhook_time > tolerance_secs {
        warn!(
            webhook_time = webhook_time,
            current_time = now,
            age_seconds = now - webhook_time,
            max_age_seconds = tolerance_secs,
            "webhook_signature_stale"
        );
        return Err(SignatureError::TimestampTooOld);
    }

    if webhook_time > now && webhook_time - now > tolerance_secs {
        warn!(
            webhook_time = webhook_time,
            current_time = now,
            "webhook_signature_future"
        );
        return Err(SignatureError::TimestampTooNew);
    }

    let expected = sign(secret, &headers.id, &headers.timestamp, body);

    // Header is a space-delimited list of "version,signature" pairs
    let candidates: Vec<&str> = headers
        .signature
        .split_whitespace()
        .filter_map(|entry| entry.split_once(','))
        .filter(|(version, _)| *version == "v1")
        .map(|(_, sig)| sig)
        .collect();

    if candidates.is_empty() {
        warn!(header = %headers.signature, "webhook_signature_header_invalid");
        return Err(SignatureError::InvalidSignatureHeader);
    }

    // Constant-time comparison to prevent timing attacks
    if candidates
        .iter()
        .any(|candidate| constant_time_compare(&expected, candidate))
    {
        return Ok(());
    }

    warn!(
        message_id = %headers.id,
        candidates = candidates.len(),
        "webhook_signature_mismatch"
    );
    Err(SignatureError::NoMatchingSignature)
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const NOW: u64 = 1_700_000_000;
    const BODY: &[u8] = br#"{"type":"user.created","data":{"id":"u1"}}"#;

    fn secret() -> SigningSecret {
        // base64("test-signing-secret")
        SigningSecret::parse("whsec_dGVzdC1zaWduaW5nLXNlY3JldA==").unwrap()
    }

    fn signed_headers(timestamp: u64, body: &[u8]) -> DeliveryHeaders {
        let timestamp = timestamp.to_string();
        let signature = format!("v1,{}", sign(&secret(), "msg_1", &timestamp, body));
        DeliveryHeaders {
            id: "msg_1".to_string(),
            timestamp,
            signature,
        }
    }

    #[test]
    fn test_secret_parse() {
        assert!(SigningSecret::parse("whsec_dGVzdA==").is_ok());
        assert!(SigningSecret::parse("dGVzdA==").is_ok());
        assert!(SigningSecret::parse("whsec_not base64!").is_err());
    }

    #[test]
    fn test_prefixed_and_bare_secret_sign_identically() {
        let prefixed = SigningSecret::parse("whsec_dGVzdA==").unwrap();
        let bare = SigningSecret::parse("dGVzdA==").unwrap();
        assert_eq!(
            sign(&prefixed, "id", "1", b"{}"),
            sign(&bare, "id", "1", b"{}")
        );
    }

    #[test]
    fn test_verify_valid() {
        let headers = signed_headers(NOW, BODY);
        assert_eq!(verify_webhook_at(&secret(), &headers, BODY, 300, NOW), Ok(()));
    }

    #[test]
    fn test_verify_valid_against_clock() {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();
        let headers = signed_headers(now, BODY);
        assert!(verify_webhook(&secret(), &headers, BODY, 300).is_ok());
    }

    #[test]
    fn test_verify_tampered_body() {
        let headers = signed_headers(NOW, BODY);
        let tampered = br#"{"type":"user.created","data":{"id":"u2"}}"#;
        assert_eq!(
            verify_webhook_at(&secret(), &headers, tampered, 300, NOW),
            Err(SignatureError::NoMatchingSignature)
        );
    }

    #[test]
    fn test_verify_reserialized_body_fails() {
        let headers = signed_headers(NOW, BODY);
        let value: serde_json::Value = serde_json::from_slice(BODY).unwrap();
        let pretty = serde_json::to_vec_pretty(&value).unwrap();
        assert!(verify_webhook_at(&secret(), &headers, &pretty, 300, NOW).is_err());
    }

    #[test]
    fn test_verify_wrong_secret() {
        let headers = signed_headers(NOW, BODY);
        let other = SigningSecret::parse("whsec_b3RoZXItc2VjcmV0").unwrap();
        assert_eq!(
            verify_webhook_at(&other, &headers, BODY, 300, NOW),
            Err(SignatureError::NoMatchingSignature)
        );
    }

    #[test]
    fn test_verify_invalid_timestamp() {
        let mut headers = signed_headers(NOW, BODY);
        headers.timestamp = "not-a-number".to_string();
        assert_eq!(
            verify_webhook_at(&secret(), &headers, BODY, 300, NOW),
            Err(SignatureError::InvalidTimestamp)
        );
    }

    #[test]
    fn test_verify_stale_and_future() {
        let stale = signed_headers(NOW - 301, BODY);
        assert_eq!(
            verify_webhook_at(&secret(), &stale, BODY, 300, NOW),
            Err(SignatureError::TimestampTooOld)
        );

        let future = signed_headers(NOW + 301, BODY);
        assert_eq!(
            verify_webhook_at(&secret(), &future, BODY, 300, NOW),
            Err(SignatureError::TimestampTooNew)
        );

        let edge = signed_headers(NOW - 300, BODY);
        assert!(verify_webhook_at(&secret(), &edge, BODY, 300, NOW).is_ok());
    }

    #[test]
    fn test_verify_multiple_signatures() {
        let mut headers = signed_headers(NOW, BODY);
        headers.signature = format!("v1,b2xkLXNpZw== v2,ignored {}", headers.signature);
        assert!(verify_webhook_at(&secret(), &headers, BODY, 300, NOW).is_ok());
    }

    #[test]
    fn test_verify_requires_v1_entry() {
        let mut headers = signed_headers(NOW, BODY);
        headers.signature = headers.signature.replacen("v1,", "v2,", 1);
        assert_eq!(
            verify_webhook_at(&secret(), &headers, BODY, 300, NOW),
            Err(SignatureError::InvalidSignatureHeader)
        );

        headers.signature = "garbage".to_string();
        assert_eq!(
            verify_webhook_at(&secret(), &headers, BODY, 300, NOW),
            Err(SignatureError::InvalidSignatureHeader)
        );
    }

    #[test]
    fn test_delivery_headers_prefixes() {
        let mut map = HeaderMap::new();
        map.insert("svix-id", HeaderValue::from_static("msg_svix"));
        map.insert("webhook-timestamp", HeaderValue::from_static("123"));
        map.insert("delivery-signature", HeaderValue::from_static("v1,abc"));

        let headers = DeliveryHeaders::from_header_map(&map).unwrap();
        assert_eq!(headers.id, "msg_svix");
        assert_eq!(headers.timestamp, "123");
        assert_eq!(headers.signature, "v1,abc");
    }

    #[test]
    fn test_delivery_headers_missing() {
        let mut map = HeaderMap::new();
        map.insert("delivery-id", HeaderValue::from_static("msg_1"));
        map.insert("delivery-timestamp", HeaderValue::from_static(""));

        let err = DeliveryHeaders::from_header_map(&map).unwrap_err();
        assert_eq!(err.missing, vec!["timestamp", "signature"]);
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "abcd"));
    }
}
