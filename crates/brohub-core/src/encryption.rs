//! At-rest encryption for registry credentials (token + password).
//!
//! Uses AES-256-GCM with a random nonce prefixed to the ciphertext, the whole
//! blob base64-encoded. The key comes from `CREDENTIALS_ENCRYPTION_KEY`
//! (base64, 32 bytes).

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose, Engine as _};
use std::env;

use crate::AppError;

#[derive(Clone)]
pub struct EncryptionService {
    cipher: Aes256Gcm,
}

impl EncryptionService {
    /// Build from a raw 32-byte key. Used by tests to avoid env mutation.
    pub fn from_key_bytes(key_bytes: &[u8]) -> Result<Self, AppError> {
        if key_bytes.len() != 32 {
            return Err(AppError::Internal(
                "Encryption key must be 32 bytes (256 bits)".to_string(),
            ));
        }
        let key = Key::<Aes256Gcm>::from_slice(key_bytes);
        Ok(Self {
            cipher: Aes256Gcm::new(key),
        })
    }

    /// Build from the `CREDENTIALS_ENCRYPTION_KEY` environment variable.
    pub fn from_env() -> Result<Self, AppError> {
        let key_str = env::var("CREDENTIALS_ENCRYPTION_KEY").map_err(|_| {
            AppError::Internal("CREDENTIALS_ENCRYPTION_KEY environment variable not set".to_string())
        })?;

        let key_bytes = general_purpose::STANDARD
            .decode(&key_str)
            .map_err(|e| AppError::Internal(format!("Failed to decode encryption key: {}", e)))?;

        Self::from_key_bytes(&key_bytes)
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, AppError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| AppError::Internal(format!("Encryption failed: {}", e)))?;

        let mut combined = nonce.to_vec();
        combined.extend_from_slice(&ciphertext);
        Ok(general_purpose::STANDARD.encode(&combined))
    }

    pub fn decrypt(&self, encrypted: &str) -> Result<String, AppError> {
        let combined = general_purpose::STANDARD
            .decode(encrypted)
            .map_err(|e| AppError::Internal(format!("Failed to decode encrypted data: {}", e)))?;

        if combined.len() < 12 {
            return Err(AppError::Internal("Encrypted data too short".to_string()));
        }

        // Nonce is the first 12 bytes, ciphertext is the rest.
        let nonce = Nonce::from_slice(&combined[..12]);
        let plaintext = self
            .cipher
            .decrypt(nonce, &combined[12..])
            .map_err(|e| AppError::Internal(format!("Decryption failed: {}", e)))?;

        String::from_utf8(plaintext)
            .map_err(|e| AppError::Internal(format!("Invalid UTF-8 in decrypted data: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_service() -> EncryptionService {
        EncryptionService::from_key_bytes(b"01234567890123456789012345678901").unwrap()
    }

    #[test]
    fn encrypt_decrypt_round_trip() {
        let service = test_service();
        let encrypted = service.encrypt("bro-token-12345").unwrap();
        assert_ne!(encrypted, "bro-token-12345");
        assert_eq!(service.decrypt(&encrypted).unwrap(), "bro-token-12345");
    }

    #[test]
    fn nonces_differ_between_calls() {
        let service = test_service();
        let a = service.encrypt("geheim").unwrap();
        let b = service.encrypt("geheim").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn rejects_short_key() {
        assert!(EncryptionService::from_key_bytes(b"too short").is_err());
    }

    #[test]
    fn rejects_truncated_blob() {
        let service = test_service();
        assert!(service.decrypt("AAAA").is_err());
    }
}
