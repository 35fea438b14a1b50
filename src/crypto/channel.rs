use rand::rngs::OsRng;
use rsa::{
    pkcs1::DecodeRsaPublicKey,
    pkcs8::{DecodePublicKey, EncodePublicKey, LineEnding},
    traits::PublicKeyParts,
    Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey,
};
use crate::error::{AppError, Result};

/// Bytes of PKCS#1 v1.5 padding overhead per block.
pub const PKCS1_V15_OVERHEAD: usize = 11;

/// A freshly generated server key pair.
///
/// The private half zeroizes itself on drop and is never serialized.
pub struct KeyPair {
    /// PEM-encoded SubjectPublicKeyInfo, safe to hand to clients and stores.
    pub public_pem: String,
    pub private: RsaPrivateKey,
}

/// An encryption-only handle around a remote party's public key.
#[derive(Clone, Debug)]
pub struct PublicHandle {
    key: RsaPublicKey,
}

impl PublicHandle {
    /// The largest plaintext a single block can carry.
    pub fn max_plaintext_len(&self) -> usize {
        self.key.size().saturating_sub(PKCS1_V15_OVERHEAD)
    }
}

/// Generates a new RSA key pair.
///
/// # Arguments
///
/// * `bits` - The modulus size.
///
/// # Returns
///
/// The `KeyPair`, with the public half already PEM encoded.
pub fn generate(bits: usize) -> Result<KeyPair> {
    let private = RsaPrivateKey::new(&mut OsRng, bits)
        .map_err(|e| AppError::CryptoFailure(format!("Key generation failed: {}", e)))?;
    let public_pem = RsaPublicKey::from(&private)
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| AppError::CryptoFailure(format!("Public key encoding failed: {}", e)))?;

    Ok(KeyPair { public_pem, private })
}

/// Wraps PEM-encoded public key material into an encryption handle.
///
/// Accepts both `PUBLIC KEY` (SPKI) and `RSA PUBLIC KEY` (PKCS#1) blocks.
pub fn wrap(public_pem: &str) -> Result<PublicHandle> {
    let pem = public_pem.trim();
    if pem.is_empty() {
        return Err(AppError::InvalidKey("Public key is empty".to_string()));
    }

    let key = RsaPublicKey::from_public_key_pem(pem)
        .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
        .map_err(|e| AppError::InvalidKey(format!("Unparseable public key: {}", e)))?;

    Ok(PublicHandle { key })
}

/// Encrypts `plaintext` for the holder of the handle's private key.
///
/// Plaintext larger than one block is rejected, never truncated.
pub fn encrypt(handle: &PublicHandle, plaintext: &[u8]) -> Result<Vec<u8>> {
    let max = handle.max_plaintext_len();
    if plaintext.len() > max {
        return Err(AppError::PayloadTooLarge {
            len: plaintext.len(),
            max,
        });
    }

    handle
        .key
        .encrypt(&mut OsRng, Pkcs1v15Encrypt, plaintext)
        .map_err(|e| match e {
            rsa::Error::MessageTooLong => AppError::PayloadTooLarge {
                len: plaintext.len(),
                max,
            },
            other => AppError::CryptoFailure(format!("Encryption failed: {}", other)),
        })
}

/// Decrypts a single PKCS#1 v1.5 block.
pub fn decrypt(private: &RsaPrivateKey, ciphertext: &[u8]) -> Result<Vec<u8>> {
    private
        .decrypt(Pkcs1v15Encrypt, ciphertext)
        .map_err(|e| AppError::CryptoFailure(format!("Decryption failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::pkcs1::EncodeRsaPublicKey;
    use std::sync::OnceLock;

    fn shared_pair() -> &'static KeyPair {
        static PAIR: OnceLock<KeyPair> = OnceLock::new();
        PAIR.get_or_init(|| generate(1024).expect("generate key pair"))
    }

    #[test]
    fn round_trip_up_to_block_limit() {
        let pair = shared_pair();
        let handle = wrap(&pair.public_pem).unwrap();
        assert_eq!(handle.max_plaintext_len(), 128 - PKCS1_V15_OVERHEAD);

        for len in [0usize, 1, 20, handle.max_plaintext_len()] {
            let plaintext: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
            let ciphertext = encrypt(&handle, &plaintext).unwrap();
            assert_eq!(ciphertext.len(), 128);
            assert_eq!(decrypt(&pair.private, &ciphertext).unwrap(), plaintext);
        }
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let pair = shared_pair();
        let handle = wrap(&pair.public_pem).unwrap();
        let plaintext = vec![7u8; handle.max_plaintext_len() + 1];

        match encrypt(&handle, &plaintext) {
            Err(AppError::PayloadTooLarge { len, max }) => {
                assert_eq!(len, 118);
                assert_eq!(max, 117);
            }
            other => panic!("expected PayloadTooLarge, got {:?}", other.map(|c| c.len())),
        }
    }

    #[test]
    fn wrap_accepts_pkcs1_pem() {
        let pair = shared_pair();
        let pkcs1 = RsaPublicKey::from(&pair.private)
            .to_pkcs1_pem(LineEnding::LF)
            .unwrap();
        let handle = wrap(&pkcs1).unwrap();
        let ciphertext = encrypt(&handle, b"hello").unwrap();
        assert_eq!(decrypt(&pair.private, &ciphertext).unwrap(), b"hello");
    }

    #[test]
    fn wrap_rejects_garbage() {
        assert!(matches!(wrap(""), Err(AppError::InvalidKey(_))));
        assert!(matches!(
            wrap("-----BEGIN PUBLIC KEY-----\nnope\n-----END PUBLIC KEY-----"),
            Err(AppError::InvalidKey(_))
        ));
    }

    #[test]
    fn truncated_ciphertext_fails_to_decrypt() {
        let pair = shared_pair();
        let handle = wrap(&pair.public_pem).unwrap();
        let mut ciphertext = encrypt(&handle, b"payload").unwrap();
        ciphertext.truncate(100);
        assert!(matches!(
            decrypt(&pair.private, &ciphertext),
            Err(AppError::CryptoFailure(_))
        ));
    }
}
