//! Webhook signature verification.
//!
//! The platform signs the raw request body with HMAC-SHA256 using the shared
//! webhook secret and sends `sha256=<hex digest>` in one of two headers.

use axum::http::HeaderMap;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use relay_core::error::RelayError;

/// Headers that may carry the signature, in lookup order.
pub const SIGNATURE_HEADERS: [&str; 2] = ["x-smooch-signature", "x-zendesk-webhook-signature"];

const PREFIX: &str = "sha256=";

/// First non-empty signature header value.
pub fn signature_header(headers: &HeaderMap) -> Option<&str> {
    SIGNATURE_HEADERS
        .iter()
        .filter_map(|name| headers.get(*name))
        .filter_map(|value| value.to_str().ok())
        .find(|value| !value.trim().is_empty())
}

/// Verify `signature` over `body`.
///
/// Always succeeds when no secret is configured. Comparison is constant time.
pub fn verify_signature(
    body: &[u8],
    signature: Option<&str>,
    secret: Option<&str>,
) -> Result<(), RelayError> {
    let Some(secret) = secret.filter(|s| !s.is_empty()) else {
        return Ok(());
    };
    let Some(signature) = signature else {
        return Err(RelayError::SignatureInvalid(
            "missing X-Smooch-Signature or X-Zendesk-Webhook-Signature header".into(),
        ));
    };

    let invalid = || RelayError::SignatureInvalid("signature mismatch".into());
    let hex_digest = signature.trim().strip_prefix(PREFIX).ok_or_else(invalid)?;
    let expected = hex::decode(hex_digest).map_err(|_| invalid())?;

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| RelayError::SignatureInvalid(e.to_string()))?;
    mac.update(body);
    mac.verify_slice(&expected).map_err(|_| invalid())
}

/// Compute the `sha256=<hex>` signature for `body`.
pub fn sign(body: &[u8], secret: &str) -> Result<String, RelayError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| RelayError::SignatureInvalid(e.to_string()))?;
    mac.update(body);
    Ok(format!("{}{}", PREFIX, hex::encode(mac.finalize().into_bytes())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const BODY: &[u8] = br#"{"events":[]}"#;

    #[test]
    fn test_correct_signature_verifies() {
        let sig = sign(BODY, "s3cret").unwrap();
        assert!(sig.starts_with("sha256="));
        assert!(verify_signature(BODY, Some(&sig), Some("s3cret")).is_ok());
    }

    #[test]
    fn test_wrong_signature_rejected() {
        let sig = sign(BODY, "other").unwrap();
        let err = verify_signature(BODY, Some(&sig), Some("s3cret")).unwrap_err();
        assert!(matches!(err, RelayError::SignatureInvalid(_)));
    }

    #[test]
    fn test_tampered_body_rejected() {
        let sig = sign(BODY, "s3cret").unwrap();
        assert!(verify_signature(br#"{"events":[1]}"#, Some(&sig), Some("s3cret")).is_err());
    }

    #[test]
    fn test_missing_or_malformed_header_rejected() {
        assert!(verify_signature(BODY, None, Some("s3cret")).is_err());
        assert!(verify_signature(BODY, Some("sha256=zz"), Some("s3cret")).is_err());

        let bare = sign(BODY, "s3cret").unwrap().trim_start_matches("sha256=").to_string();
        assert!(verify_signature(BODY, Some(&bare), Some("s3cret")).is_err());
    }

    #[test]
    fn test_no_secret_always_valid() {
        assert!(verify_signature(BODY, None, None).is_ok());
        assert!(verify_signature(BODY, Some("garbage"), None).is_ok());
        assert!(verify_signature(BODY, Some("garbage"), Some("")).is_ok());
    }

    #[test]
    fn test_signature_header_lookup() {
        let mut headers = HeaderMap::new();
        assert!(signature_header(&headers).is_none());

        headers.insert("x-zendesk-webhook-signature", HeaderValue::from_static("sha256=bb"));
        assert_eq!(signature_header(&headers), Some("sha256=bb"));

        headers.insert("x-smooch-signature", HeaderValue::from_static("sha256=aa"));
        assert_eq!(signature_header(&headers), Some("sha256=aa"));
    }
}
