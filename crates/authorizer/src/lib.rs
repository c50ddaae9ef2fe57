//! Bearer Token Authorizer Library
//!
//! Decides whether a request's `Authorization` header carries a valid RS256
//! bearer token, verified against a key published in a remote key set, and
//! answers with an Allow or Deny policy decision. Every failure yields the
//! same Deny.
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> handlers/*.rs -> authorizer.rs -> auth/{bearer, jwt, jwks, cache, pem}.rs
//! ```
//!
//! # Modules
//!
//! - `auth` - Token extraction, key set resolution, signature verification
//! - `authorizer` - Decision pipeline
//! - `config` - Service configuration from environment
//! - `errors` - Error taxonomy
//! - `handlers` - HTTP request handlers
//! - `models` - HTTP data models
//! - `policy` - Decision document
//! - `routes` - Axum router setup
//! - `shutdown` - Drain and cancellation sequencing

pub mod auth;
pub mod authorizer;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod policy;
pub mod routes;
pub mod shutdown;
