//! Key derivation and authenticated encryption for stored credentials.
//!
//! The encryption key is derived from the account password with Argon2id
//! and a per-store salt, so the same password always reproduces the same
//! key for a given store. Records are sealed with XChaCha20-Poly1305;
//! a wrong key fails the tag check and surfaces as `InvalidCredentials`.

use argon2::{Algorithm, Argon2, Params, Version};
use chacha20poly1305::aead::{Aead, KeyInit, OsRng};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::CredentialError;

/// Argon2id time cost (iterations).
const KDF_TIME_COST: u32 = 3;

/// Argon2id memory cost in KiB (64 MiB).
const KDF_MEMORY_COST: u32 = 65536;

/// Argon2id degree of parallelism.
const KDF_PARALLELISM: u32 = 4;

/// Derived key length in bytes (XChaCha20-Poly1305 key size).
const DERIVED_KEY_LEN: usize = 32;

/// Per-store salt length in bytes.
pub const SALT_LEN: usize = 16;

/// XChaCha20 nonce length in bytes.
pub const NONCE_LEN: usize = 24;

/// Symmetric key protecting credentials at rest.
///
/// Held in memory for the life of the process and zeroized on drop;
/// never written to disk in any form.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey([u8; DERIVED_KEY_LEN]);

impl EncryptionKey {
    /// Derive a key from `secret` and a per-store salt. Deterministic:
    /// the same secret and salt always produce the same key.
    pub fn derive(secret: &str, salt: &[u8]) -> Result<Self, CredentialError> {
        let params = Params::new(
            KDF_MEMORY_COST,
            KDF_TIME_COST,
            KDF_PARALLELISM,
            Some(DERIVED_KEY_LEN),
        )
        .map_err(|e| CredentialError::Crypto(format!("argon2 params: {e}")))?;

        let argon = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let mut key = [0u8; DERIVED_KEY_LEN];
        argon
            .hash_password_into(secret.as_bytes(), salt, &mut key)
            .map_err(|e| CredentialError::Crypto(format!("argon2 derive: {e}")))?;

        Ok(Self(key))
    }

    /// Seal `plaintext` under a fresh random nonce.
    /// Returns the nonce and the ciphertext with the auth tag appended.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<([u8; NONCE_LEN], Vec<u8>), CredentialError> {
        let cipher = XChaCha20Poly1305::new(Key::from_slice(&self.0));
        let nonce = generate_nonce();
        let ciphertext = cipher
            .encrypt(XNonce::from_slice(&nonce), plaintext)
            .map_err(|e| CredentialError::Crypto(format!("encrypt: {e}")))?;
        Ok((nonce, ciphertext))
    }

    /// Open a sealed record. A tag mismatch (wrong key, tampered or
    /// truncated ciphertext) maps to `InvalidCredentials`.
    pub fn decrypt(&self, nonce: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CredentialError> {
        if nonce.len() != NONCE_LEN {
            return Err(CredentialError::Malformed(format!(
                "nonce length {} (expected {})",
                nonce.len(),
                NONCE_LEN
            )));
        }
        let cipher = XChaCha20Poly1305::new(Key::from_slice(&self.0));
        cipher
            .decrypt(XNonce::from_slice(nonce), ciphertext)
            .map_err(|_| CredentialError::InvalidCredentials)
    }
}

pub fn generate_nonce() -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    salt
}
