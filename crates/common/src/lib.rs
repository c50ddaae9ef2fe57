//! Common utilities shared across authorizer components.

#![warn(clippy::pedantic)]

/// Module for JWT utilities (structure checks, header decoding, temporal claims)
pub mod jwt;
