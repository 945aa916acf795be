//! Utility helpers for request signing.

pub mod sign;

pub use sign::signed_info;
