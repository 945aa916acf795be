//! Credential-state subsystem: encrypted at-rest storage for login sessions.
//!
//! This module provides:
//! - `EncryptionKey`: symmetric key derived from the account password
//! - `CredentialStore`: one encrypted record per user on disk
//! - `SessionState` / `LocalUser`: the in-memory active session
//!
//! Records are sealed with XChaCha20-Poly1305, so decrypting with the
//! wrong key fails verifiably instead of returning garbage.

pub mod crypto;
pub mod session;
pub mod store;

use thiserror::Error;

pub use crypto::EncryptionKey;
pub use session::{LocalUser, SessionState};
pub use store::{CredentialStore, EncryptedRecord};

#[derive(Error, Debug)]
pub enum CredentialError {
    /// The stored record failed AEAD verification with the current key.
    /// Usually means the account password changed since the record was
    /// written, or the record was corrupted on disk.
    #[error("stored credentials could not be decrypted with the current key")]
    InvalidCredentials,

    #[error("no encryption key has been set for this session")]
    MissingKey,

    #[error("malformed credential record: {0}")]
    Malformed(String),

    #[error("crypto failure: {0}")]
    Crypto(String),

    #[error("credential storage I/O: {0}")]
    Io(#[from] std::io::Error),
}
