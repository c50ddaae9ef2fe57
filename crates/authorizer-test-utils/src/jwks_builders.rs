//! Builders for key set (JWKS) documents

use serde_json::{json, Value};

/// Builder for `{ "keys": [...] }` documents
///
/// # Example
/// ```rust,ignore
/// let jwks = JwksBuilder::new()
///     .with_certificate_key("abc123", PRIMARY_X5C)
///     .with_rsa_components_key("def456", SECONDARY_MODULUS, RSA_EXPONENT)
///     .build();
/// ```
#[derive(Debug, Clone, Default)]
pub struct JwksBuilder {
    keys: Vec<Value>,
}

impl JwksBuilder {
    /// Create an empty key set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an RSA signing key published as a certificate chain
    pub fn with_certificate_key(self, kid: &str, x5c: &str) -> Self {
        self.with_key(certificate_jwk(kid, x5c))
    }

    /// Add an RSA signing key published only as modulus and exponent
    pub fn with_rsa_components_key(self, kid: &str, n: &str, e: &str) -> Self {
        self.with_key(rsa_components_jwk(kid, n, e))
    }

    /// Add an arbitrary entry
    pub fn with_key(mut self, key: Value) -> Self {
        self.keys.push(key);
        self
    }

    /// The document as JSON
    pub fn build(self) -> Value {
        json!({ "keys": self.keys })
    }
}

/// RSA signing key entry carrying an `x5c` chain
pub fn certificate_jwk(kid: &str, x5c: &str) -> Value {
    json!({
        "alg": "RS256",
        "kty": "RSA",
        "use": "sig",
        "kid": kid,
        "x5t": "test-thumbprint",
        "x5c": [x5c],
    })
}

/// RSA signing key entry carrying only `n` and `e`
pub fn rsa_components_jwk(kid: &str, n: &str, e: &str) -> Value {
    json!({
        "alg": "RS256",
        "kty": "RSA",
        "use": "sig",
        "kid": kid,
        "n": n,
        "e": e,
    })
}
