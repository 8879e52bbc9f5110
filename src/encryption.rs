//! Symmetric encryption of the stored serial.
//!
//! AES-256-GCM, so a modified ciphertext fails to decrypt on its own even
//! before the record's integrity tag is checked.
//!
//! Output format (base64, standard alphabet, padded):
//!   [nonce (12 bytes)] || [ciphertext+tag]

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};

use rand::rngs::OsRng;
use rand::TryRngCore;

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;

use ring::digest::{digest, SHA256};

use crate::errors::{LicenseError, LicenseResult};

/// AES-256 key size in bytes.
pub const KEY_SIZE: usize = 32;

/// GCM nonce size in bytes (96-bit).
pub const NONCE_SIZE: usize = 12;

/// Encrypts and decrypts the serial stored in a license record.
pub trait SerialCipher: Send + Sync {
    fn encrypt(&self, plaintext: &str) -> LicenseResult<String>;
    fn decrypt(&self, ciphertext: &str) -> LicenseResult<String>;
}

/// Default [`SerialCipher`] backed by AES-256-GCM.
pub struct AesGcmSerialCipher {
    key: [u8; KEY_SIZE],
}

impl AesGcmSerialCipher {
    pub fn new(key: [u8; KEY_SIZE]) -> Self {
        Self { key }
    }

    /// Derive the AES key from an arbitrary-length secret:
    ///   key = SHA256(secret)
    pub fn from_secret(secret: &[u8]) -> Self {
        let hash = digest(&SHA256, secret);
        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(hash.as_ref());
        Self { key }
    }
}

impl SerialCipher for AesGcmSerialCipher {
    fn encrypt(&self, plaintext: &str) -> LicenseResult<String> {
        encrypt_to_base64(plaintext.as_bytes(), &self.key)
    }

    fn decrypt(&self, ciphertext: &str) -> LicenseResult<String> {
        let bytes = decrypt_from_base64(ciphertext, &self.key)?;
        String::from_utf8(bytes)
            .map_err(|e| LicenseError::DecryptionError(format!("plaintext is not UTF-8: {e}")))
    }
}

impl std::fmt::Debug for AesGcmSerialCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AesGcmSerialCipher").finish_non_exhaustive()
    }
}

/// Encrypt arbitrary bytes using AES-256-GCM.
pub fn encrypt_bytes(plaintext: &[u8], key: &[u8]) -> LicenseResult<Vec<u8>> {
    if key.len() != KEY_SIZE {
        return Err(LicenseError::EncryptionError(format!(
            "invalid key length: expected {} bytes, got {}",
            KEY_SIZE,
            key.len()
        )));
    }

    let key = Key::<Aes256Gcm>::from_slice(key);
    let cipher = Aes256Gcm::new(key);

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    OsRng
        .try_fill_bytes(&mut nonce_bytes)
        .map_err(|e| LicenseError::EncryptionError(format!("nonce generation failed: {e}")))?;
    let nonce = Nonce::from_slice(&nonce_bytes);

    let mut ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| LicenseError::EncryptionError(format!("encryption failed: {e}")))?;

    let mut output = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    output.extend_from_slice(&nonce_bytes);
    output.append(&mut ciphertext);

    Ok(output)
}

/// Decrypt bytes produced by `encrypt_bytes`.
pub fn decrypt_bytes(ciphertext: &[u8], key: &[u8]) -> LicenseResult<Vec<u8>> {
    if key.len() != KEY_SIZE {
        return Err(LicenseError::DecryptionError(format!(
            "invalid key length: expected {} bytes, got {}",
            KEY_SIZE,
            key.len()
        )));
    }

    if ciphertext.len() <= NONCE_SIZE {
        return Err(LicenseError::DecryptionError(
            "ciphertext too short".to_string(),
        ));
    }

    let (nonce_bytes, ct) = ciphertext.split_at(NONCE_SIZE);
    let nonce = Nonce::from_slice(nonce_bytes);

    let key = Key::<Aes256Gcm>::from_slice(key);
    let cipher = Aes256Gcm::new(key);

    cipher
        .decrypt(nonce, ct)
        .map_err(|e| LicenseError::DecryptionError(format!("decryption failed: {e}")))
}

/// Encrypt bytes and return a Base64 string.
pub fn encrypt_to_base64(plaintext: &[u8], key: &[u8]) -> LicenseResult<String> {
    let encrypted = encrypt_bytes(plaintext, key)?;
    Ok(B64.encode(encrypted))
}

/// Decrypt a Base64 ciphertext previously produced by `encrypt_to_base64`.
pub fn decrypt_from_base64(ciphertext_b64: &str, key: &[u8]) -> LicenseResult<Vec<u8>> {
    let decoded = B64
        .decode(ciphertext_b64)
        .map_err(|e| LicenseError::DecryptionError(format!("base64 decode failed: {e}")))?;
    decrypt_bytes(&decoded, key)
}
