use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Hex-encoded SHA-256 of a secret, as stored in identity tables.
pub fn sha256_hex(secret: &str) -> String {
    hex::encode(Sha256::digest(secret.as_bytes()))
}

/// Compares a secret against a stored hex digest in constant time.
pub fn matches_digest(secret: &str, stored_hex: &str) -> bool {
    let Ok(stored) = hex::decode(stored_hex.trim()) else {
        return false;
    };
    let computed = Sha256::digest(secret.as_bytes());
    computed.as_slice().ct_eq(&stored).into()
}
