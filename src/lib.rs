//! Client library for the Yay! social networking API.
//!
//! The crate authenticates a user, keeps their session credentials
//! encrypted on disk, and exposes typed wrappers over the service's
//! auth endpoints. Stored sessions let a client restart without a
//! network login: [`Client::login`] reuses a cached session when one
//! decrypts with the current password, and only goes to the network on
//! a cache miss.
//!
//! ```no_run
//! use yay_client::{Client, Config};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let mut client = Client::with_config(Config::default())?;
//! let session = client.login("a@x.com", "password", None).await?;
//! println!("logged in as {}", session.user_id);
//! # Ok(())
//! # }
//! ```
//!
//! Credentials at rest are sealed with XChaCha20-Poly1305 under a key
//! derived from the account password (Argon2id). A wrong or changed
//! password fails decryption verifiably; the stale record is purged and
//! the error surfaced so the caller can log in again deliberately.
//!
//! The credential store is process-local: concurrent processes sharing
//! one storage directory are not coordinated.

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod models;
pub mod utils;

pub use api::{ApiClient, ApiError};
pub use auth::{CredentialError, CredentialStore, LocalUser, SessionState};
pub use client::Client;
pub use config::Config;
pub use models::{LoginUpdateResponse, LoginUserResponse, TokenResponse};
