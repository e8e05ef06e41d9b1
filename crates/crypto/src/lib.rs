//! Credential encryption for sandbox passwords.
//!
//! Passwords are encrypted with AES-256-GCM under a key derived from the
//! configured key material, and stored as base64 of `nonce || ciphertext`.

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use sha2::{Digest, Sha256};

use sqlab_models::{SqlabError, SqlabResult};

/// GCM nonce length in bytes.
const NONCE_LEN: usize = 12;

/// Encrypts and decrypts sandbox credentials with a single service-wide key.
#[derive(Clone)]
pub struct CredentialVault {
    key: [u8; 32],
}

impl CredentialVault {
    /// Derive the encryption key from arbitrary key material via SHA-256.
    pub fn new(key_material: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(key_material);
        let key: [u8; 32] = hasher.finalize().into();
        Self { key }
    }

    /// Encrypt a password. Returns base64 of `nonce || ciphertext`; the GCM
    /// tag rides inside the ciphertext. A fresh nonce is drawn per call, so
    /// equal plaintexts never produce equal outputs.
    pub fn encrypt(&self, plaintext: &str) -> SqlabResult<String> {
        if plaintext.is_empty() {
            return Err(SqlabError::validation("cannot encrypt an empty password"));
        }

        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| SqlabError::crypto(format!("cipher init failed: {}", e)))?;
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

        let ciphertext = cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| SqlabError::crypto(format!("encryption failed: {}", e)))?;

        let mut combined = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        combined.extend_from_slice(&nonce);
        combined.extend_from_slice(&ciphertext);

        Ok(BASE64.encode(combined))
    }

    /// Decrypt a value produced by [`encrypt`](Self::encrypt). Truncated or
    /// tampered input fails authentication and is reported as a crypto error.
    pub fn decrypt(&self, encoded: &str) -> SqlabResult<String> {
        let combined = BASE64
            .decode(encoded)
            .map_err(|e| SqlabError::crypto(format!("invalid base64: {}", e)))?;

        if combined.len() <= NONCE_LEN {
            return Err(SqlabError::crypto("ciphertext too short"));
        }
        let (nonce_bytes, ciphertext) = combined.split_at(NONCE_LEN);

        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| SqlabError::crypto(format!("cipher init failed: {}", e)))?;
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext = cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| SqlabError::crypto("decryption failed"))?;

        String::from_utf8(plaintext)
            .map_err(|_| SqlabError::crypto("decrypted payload is not valid UTF-8"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vault() -> CredentialVault {
        CredentialVault::new(b"test key material")
    }

    #[test]
    fn round_trip_recovers_plaintext() {
        let v = vault();
        let encrypted = v.encrypt("s3cr3t-P@ss").unwrap();
        assert_eq!(v.decrypt(&encrypted).unwrap(), "s3cr3t-P@ss");
    }

    #[test]
    fn empty_plaintext_is_rejected() {
        assert!(matches!(
            vault().encrypt(""),
            Err(SqlabError::Validation { .. })
        ));
    }

    #[test]
    fn equal_plaintexts_encrypt_differently() {
        let v = vault();
        let a = v.encrypt("same password").unwrap();
        let b = v.encrypt("same password").unwrap();
        assert_ne!(a, b);
        assert_eq!(v.decrypt(&a).unwrap(), v.decrypt(&b).unwrap());
    }

    #[test]
    fn tampered_ciphertext_fails_authentication() {
        let v = vault();
        let encrypted = v.encrypt("s3cr3t").unwrap();
        let mut raw = BASE64.decode(&encrypted).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0x01;
        let tampered = BASE64.encode(raw);
        assert!(matches!(
            v.decrypt(&tampered),
            Err(SqlabError::Crypto { .. })
        ));
    }

    #[test]
    fn wrong_key_cannot_decrypt() {
        let encrypted = vault().encrypt("s3cr3t").unwrap();
        let other = CredentialVault::new(b"different material");
        assert!(other.decrypt(&encrypted).is_err());
    }

    #[test]
    fn truncated_input_is_rejected() {
        let v = vault();
        assert!(v.decrypt("").is_err());
        assert!(v.decrypt(&BASE64.encode([0u8; 8])).is_err());
    }
}
