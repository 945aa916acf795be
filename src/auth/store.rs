//! Durable encrypted storage for login sessions, one record per user.
//!
//! Each record is a small JSON envelope on disk: plaintext `user_id` and
//! `email` for lookup, plus an XChaCha20-Poly1305 ciphertext wrapping the
//! full serialized `LocalUser`. Tokens and the device UUID only exist
//! inside the ciphertext.
//!
//! The store is process-local. Concurrent processes sharing a storage
//! directory are not coordinated.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::crypto::{generate_salt, EncryptionKey, SALT_LEN};
use super::{CredentialError, LocalUser};

/// File extension for per-user record envelopes.
const RECORD_EXT: &str = "user";

/// Per-store key-derivation salt, created once on first use.
const SALT_FILE: &str = "store.salt";

/// On-disk envelope for one user's encrypted session.
///
/// `user_id` and `email` are the plaintext-safe index fields; everything
/// sensitive lives in `ciphertext` (base64, auth tag included).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedRecord {
    pub user_id: i64,
    pub email: String,
    pub nonce: String,
    pub ciphertext: String,
    pub saved_at: DateTime<Utc>,
}

/// Maps user ids to encrypted session records on durable storage.
pub struct CredentialStore {
    dir: PathBuf,
    key: Option<EncryptionKey>,
    /// Record paths written since the last `save`, pending fsync.
    dirty: Vec<PathBuf>,
}

impl CredentialStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CredentialError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            key: None,
            dirty: Vec::new(),
        })
    }

    /// True once a key has been derived in this process.
    pub fn has_encryption_key(&self) -> bool {
        self.key.is_some()
    }

    /// Derive the store key from `secret` and the per-store salt.
    ///
    /// The salt is created and persisted on first use so the same secret
    /// reproduces the same key across restarts. Callers only invoke this
    /// when no key is set; a mid-process password change requires a
    /// process restart to re-derive.
    pub fn set_encryption_key(&mut self, secret: &str) -> Result<(), CredentialError> {
        let salt = self.load_or_create_salt()?;
        self.key = Some(EncryptionKey::derive(secret, &salt)?);
        Ok(())
    }

    fn load_or_create_salt(&self) -> Result<[u8; SALT_LEN], CredentialError> {
        let path = self.dir.join(SALT_FILE);
        if path.exists() {
            let bytes = fs::read(&path)?;
            let salt: [u8; SALT_LEN] = bytes
                .try_into()
                .map_err(|_| CredentialError::Malformed("salt file has wrong length".into()))?;
            return Ok(salt);
        }
        let salt = generate_salt();
        fs::write(&path, salt)?;
        Ok(salt)
    }

    /// Find the persisted record for `email`, if any.
    ///
    /// Matches on the envelope's plaintext email field; no key is needed
    /// for the lookup itself. Unreadable envelopes are skipped with a
    /// warning rather than failing the scan.
    pub fn get_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<EncryptedRecord>, CredentialError> {
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXT) {
                continue;
            }
            match Self::read_record(&path) {
                Ok(record) if record.email == email => {
                    debug!(user_id = record.user_id, "found stored session for email");
                    return Ok(Some(record));
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable credential record");
                }
            }
        }
        Ok(None)
    }

    fn read_record(path: &Path) -> Result<EncryptedRecord, CredentialError> {
        let contents = fs::read_to_string(path)?;
        serde_json::from_str(&contents).map_err(|e| CredentialError::Malformed(e.to_string()))
    }

    /// Decrypt a record with the current key.
    ///
    /// Fails with `InvalidCredentials` when the key does not match the
    /// one the record was sealed under (wrong or changed password).
    pub fn decrypt(&self, record: &EncryptedRecord) -> Result<LocalUser, CredentialError> {
        let key = self.key.as_ref().ok_or(CredentialError::MissingKey)?;

        let nonce = B64
            .decode(&record.nonce)
            .map_err(|e| CredentialError::Malformed(format!("nonce: {e}")))?;
        let ciphertext = B64
            .decode(&record.ciphertext)
            .map_err(|e| CredentialError::Malformed(format!("ciphertext: {e}")))?;

        let plaintext = key.decrypt(&nonce, &ciphertext)?;
        serde_json::from_slice(&plaintext).map_err(|e| CredentialError::Malformed(e.to_string()))
    }

    /// Delete the persisted record for `user_id`, if present.
    ///
    /// Called after a failed decrypt so a stale record isn't retried on
    /// every login.
    pub fn destroy(&mut self, user_id: i64) -> Result<(), CredentialError> {
        let path = self.record_path(user_id);
        if path.exists() {
            fs::remove_file(&path)?;
            debug!(user_id, "destroyed stored session record");
        }
        self.dirty.retain(|p| p != &path);
        Ok(())
    }

    /// Encrypt `user` and write/overwrite its record.
    ///
    /// The envelope is written atomically (temp file + rename) so a crash
    /// mid-write never leaves a truncated record behind.
    pub fn set_user(&mut self, user: &LocalUser) -> Result<(), CredentialError> {
        let key = self.key.as_ref().ok_or(CredentialError::MissingKey)?;

        let plaintext =
            serde_json::to_vec(user).map_err(|e| CredentialError::Malformed(e.to_string()))?;
        let (nonce, ciphertext) = key.encrypt(&plaintext)?;

        let record = EncryptedRecord {
            user_id: user.user_id,
            email: user.email.clone(),
            nonce: B64.encode(nonce),
            ciphertext: B64.encode(ciphertext),
            saved_at: Utc::now(),
        };

        let path = self.record_path(user.user_id);
        let tmp = path.with_extension("tmp");
        let contents = serde_json::to_string_pretty(&record)
            .map_err(|e| CredentialError::Malformed(e.to_string()))?;
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &path)?;

        if !self.dirty.contains(&path) {
            self.dirty.push(path);
        }
        Ok(())
    }

    /// Flush written records to durable storage (fsync).
    pub fn save(&mut self) -> Result<(), CredentialError> {
        for path in self.dirty.drain(..) {
            if path.exists() {
                File::open(&path)?.sync_all()?;
            }
        }
        Ok(())
    }

    fn record_path(&self, user_id: i64) -> PathBuf {
        self.dir.join(format!("{}.{}", user_id, RECORD_EXT))
    }
}
