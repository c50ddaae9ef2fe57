//! Deterministic crypto fixtures for reproducible tests
//!
//! Two 2048-bit RSA key pairs generated once with openssl and checked in
//! under `fixtures/`, each with a self-signed certificate. The `*_X5C`
//! constants are the certificate DER in standard base64 as published in a
//! key set `x5c` chain; `*_MODULUS` is the base64url `n` parameter.

/// Key id the primary key is published under in most tests.
pub const TEST_KID: &str = "abc123";

/// Key id for the secondary key.
pub const SECONDARY_KID: &str = "def456";

/// Base64url RSA public exponent (65537) shared by both fixture keys.
pub const RSA_EXPONENT: &str = "AQAB";

/// PKCS#1 private key of the primary pair.
pub const PRIMARY_RSA_PRIVATE_PEM: &str = include_str!("../fixtures/primary_rsa_private.pem");

/// Self-signed certificate of the primary pair, as openssl writes it.
pub const PRIMARY_CERT_PEM: &str = include_str!("../fixtures/primary_cert.pem");

/// `x5c[0]` for the primary certificate.
pub const PRIMARY_X5C: &str = include_str!("../fixtures/primary_x5c.txt");

/// `n` for the primary key.
pub const PRIMARY_MODULUS: &str = include_str!("../fixtures/primary_modulus.txt");

/// PKCS#1 private key of the secondary pair.
pub const SECONDARY_RSA_PRIVATE_PEM: &str = include_str!("../fixtures/secondary_rsa_private.pem");

/// Self-signed certificate of the secondary pair.
pub const SECONDARY_CERT_PEM: &str = include_str!("../fixtures/secondary_cert.pem");

/// `x5c[0]` for the secondary certificate.
pub const SECONDARY_X5C: &str = include_str!("../fixtures/secondary_x5c.txt");

/// `n` for the secondary key.
pub const SECONDARY_MODULUS: &str = include_str!("../fixtures/secondary_modulus.txt");
