//! Bearer token authentication.
//!
//! - [`bearer`] extracts the token from the `Authorization` header
//! - [`pem`] turns published certificates into PEM blocks
//! - [`jwks`] fetches the key set and resolves signing keys by kid
//! - [`cache`] optionally caches resolved keys
//! - [`jwt`] verifies RS256 signatures and claims

pub mod bearer;
pub mod cache;
pub mod claims;
pub mod jwks;
pub mod jwt;
pub mod pem;

pub use bearer::{extract_bearer_token, parse_user_id};
pub use cache::CachingKeySetResolver;
pub use claims::{Audience, Claims};
pub use jwks::{
    HttpKeySetFetcher, Jwk, JwkSet, KeyMaterial, KeySetFetcher, KeySetResolver,
    ResolvedSigningKey, SigningKeyResolver,
};
pub use jwt::{JwtVerifier, VerificationOptions};
pub use pem::certificate_to_pem;
