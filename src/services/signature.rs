//! HMAC-SHA256 signing shared by gateway callbacks and business webhooks.
//!
//! Header format on both sides: `sha256=<hex_encoded_hmac>`.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_PREFIX: &str = "sha256=";

fn mac(secret: &str) -> Result<HmacSha256, AppError> {
    HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| AppError::InvalidRequest("Invalid signing key".to_string()))
}

/// Sign `payload` with `secret`.
pub fn sign(secret: &str, payload: &[u8]) -> Result<String, AppError> {
    let mut mac = mac(secret)?;
    mac.update(payload);
    Ok(format!(
        "{SIGNATURE_PREFIX}{}",
        hex::encode(mac.finalize().into_bytes())
    ))
}

/// Verify a `sha256=<hex>` header against `payload` in constant time.
///
/// # Errors
///
/// `InvalidSignature` if the header is missing, malformed, or does not match.
pub fn verify(secret: &str, payload: &[u8], header: Option<&str>) -> Result<(), AppError> {
    let expected = header
        .and_then(|h| h.trim().strip_prefix(SIGNATURE_PREFIX))
        .and_then(|hex_sig| hex::decode(hex_sig).ok())
        .ok_or(AppError::InvalidSignature)?;

    let mut mac = mac(secret)?;
    mac.update(payload);
    mac.verify_slice(&expected)
        .map_err(|_| AppError::InvalidSignature)
}

/// SHA-256 hex digest, used to store API keys and compare bearer secrets.
pub fn sha256_hex(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generate a random secret of 32 bytes as 64 hex characters.
pub fn generate_secret() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const SECRET: &str = "whsec_test";
    const BODY: &[u8] = br#"{"order_id":"BT-7KQ2MZ9X","status":"paid"}"#;

    #[rstest]
    fn signed_payload_verifies() {
        let header = sign(SECRET, BODY).expect("signs");
        assert!(header.starts_with("sha256="));
        assert_eq!(header.len(), "sha256=".len() + 64);
        assert!(verify(SECRET, BODY, Some(&header)).is_ok());
    }

    #[rstest]
    fn tampered_body_is_rejected() {
        let header = sign(SECRET, BODY).expect("signs");
        let tampered = br#"{"order_id":"BT-7KQ2MZ9X","status":"failed"}"#;
        assert!(matches!(
            verify(SECRET, tampered, Some(&header)),
            Err(AppError::InvalidSignature)
        ));
    }

    #[rstest]
    fn wrong_secret_is_rejected() {
        let header = sign("another-secret", BODY).expect("signs");
        assert!(verify(SECRET, BODY, Some(&header)).is_err());
    }

    #[rstest]
    #[case(None)]
    #[case(Some(""))]
    #[case(Some("md5=abcdef"))]
    #[case(Some("sha256=not-hex"))]
    fn malformed_headers_are_rejected(#[case] header: Option<&str>) {
        assert!(matches!(
            verify(SECRET, BODY, header),
            Err(AppError::InvalidSignature)
        ));
    }

    #[rstest]
    fn sha256_hex_matches_known_vector() {
        assert_eq!(
            sha256_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[rstest]
    fn secrets_are_random_hex() {
        let a = generate_secret();
        let b = generate_secret();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }
}
