//! # Authorizer Test Utilities
//!
//! Shared test utilities for the authorizer service.
//!
//! This crate provides:
//! - Deterministic crypto fixtures (checked-in RSA keys and certificates)
//! - Token builders (`TestTokenBuilder`) signing with the fixture keys
//! - Key set document builders (`JwksBuilder`)
//! - A wiremock-backed key set endpoint (`MockKeySet`)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use authorizer_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let key_set = MockKeySet::start(
//!         JwksBuilder::new().with_certificate_key(TEST_KID, PRIMARY_X5C),
//!     )
//!     .await;
//!
//!     let token = TestTokenBuilder::new().for_user("user-42").build();
//!     let header = format!("Bearer {token}");
//! }
//! ```

pub mod crypto_fixtures;
pub mod jwks_builders;
pub mod mock_key_set;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use jwks_builders::*;
pub use mock_key_set::*;
pub use token_builders::*;
