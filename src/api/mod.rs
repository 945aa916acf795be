//! HTTP dispatch layer for the Yay! REST API.
//!
//! This module provides the `ApiClient` that executes requests against
//! the configured API host and maps JSON responses to typed objects.
//!
//! Authenticated endpoints use a bearer access token obtained through
//! the login flow in `crate::client`.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
