//! Typed response objects for the Yay! API.
//!
//! Only the authentication surface is modeled here:
//!
//! - `LoginUserResponse`: result of a login or account restore
//! - `TokenResponse`: result of an OAuth token grant/refresh
//! - `LoginUpdateResponse`: result of email/password account updates

pub mod auth;

pub use auth::{LoginUpdateResponse, LoginUserResponse, TokenResponse};
