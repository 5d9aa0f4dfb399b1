//! Credential Vault: symmetric encrypt/decrypt of provider API keys at rest.
//!
//! Uses AES-256-GCM via `ring::aead` — the teacher already depends on `ring`
//! for HMAC secret hashing (`src/llm/security.rs`); this reuses the same
//! crate for authenticated encryption rather than adding a new dependency.

use ring::aead::{self, BoundKey, Nonce, NonceSequence, UnboundKey, AES_256_GCM};
use ring::rand::{SecureRandom, SystemRandom};

use crate::error::{GatewayError, GatewayResult};

const NONCE_LEN: usize = 12;

struct SingleUseNonce([u8; NONCE_LEN]);

impl NonceSequence for SingleUseNonce {
    fn advance(&mut self) -> Result<Nonce, ring::error::Unspecified> {
        Nonce::try_assume_unique_for_key(&self.0)
    }
}

/// Encrypts `plaintext` with `key` (32 raw bytes), returning a base64 blob
/// that embeds the nonce ahead of the ciphertext+tag.
///
/// Errors only on the process RNG failing, which is treated as an internal
/// error rather than a decrypt-style failure.
pub fn encrypt(plaintext: &str, key: &[u8; 32]) -> GatewayResult<String> {
    let unbound = UnboundKey::new(&AES_256_GCM, key)
        .map_err(|_| GatewayError::Internal("invalid encryption key length".to_string()))?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    SystemRandom::new()
        .fill(&mut nonce_bytes)
        .map_err(|_| GatewayError::Internal("failed to generate nonce".to_string()))?;

    let mut sealing_key = aead::SealingKey::new(unbound, SingleUseNonce(nonce_bytes));
    let mut in_out = plaintext.as_bytes().to_vec();
    sealing_key
        .seal_in_place_append_tag(aead::Aad::empty(), &mut in_out)
        .map_err(|_| GatewayError::Internal("encryption failed".to_string()))?;

    let mut blob = Vec::with_capacity(NONCE_LEN + in_out.len());
    blob.extend_from_slice(&nonce_bytes);
    blob.extend_from_slice(&in_out);

    Ok(base64::Engine::encode(
        &base64::engine::general_purpose::STANDARD,
        blob,
    ))
}

/// Decrypts a ciphertext produced by [`encrypt`]. Any tamper, truncation, or
/// key mismatch fails with [`GatewayError::EncryptionError`] — plaintext is
/// never partially returned and ciphertext is never echoed back.
pub fn decrypt(ciphertext_b64: &str, key: &[u8; 32]) -> GatewayResult<String> {
    let blob = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, ciphertext_b64)
        .map_err(|_| GatewayError::EncryptionError)?;

    if blob.len() < NONCE_LEN {
        return Err(GatewayError::EncryptionError);
    }
    let (nonce_bytes, sealed) = blob.split_at(NONCE_LEN);
    let nonce: [u8; NONCE_LEN] = nonce_bytes
        .try_into()
        .map_err(|_| GatewayError::EncryptionError)?;

    let unbound = UnboundKey::new(&AES_256_GCM, key).map_err(|_| GatewayError::EncryptionError)?;
    let mut opening_key = aead::OpeningKey::new(unbound, SingleUseNonce(nonce));

    let mut in_out = sealed.to_vec();
    let plaintext = opening_key
        .open_in_place(aead::Aad::empty(), &mut in_out)
        .map_err(|_| GatewayError::EncryptionError)?;

    String::from_utf8(plaintext.to_vec()).map_err(|_| GatewayError::EncryptionError)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> [u8; 32] {
        [7u8; 32]
    }

    #[test]
    fn round_trips_plaintext() {
        let key = test_key();
        let ciphertext = encrypt("sk-test-12345", &key).unwrap();
        assert_eq!(decrypt(&ciphertext, &key).unwrap(), "sk-test-12345");
    }

    #[test]
    fn wrong_key_fails_to_decrypt() {
        let ciphertext = encrypt("sk-test-12345", &test_key()).unwrap();
        let other_key = [9u8; 32];
        assert!(decrypt(&ciphertext, &other_key).is_err());
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let key = test_key();
        let ciphertext = encrypt("sk-test-12345", &key).unwrap();
        let mut blob = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, &ciphertext).unwrap();
        let last = blob.len() - 1;
        blob[last] ^= 0xFF;
        let tampered = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, blob);
        assert!(decrypt(&tampered, &key).is_err());
    }
}
