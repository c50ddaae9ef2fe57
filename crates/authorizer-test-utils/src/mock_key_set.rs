//! Mock key set endpoint backed by wiremock

use crate::jwks_builders::JwksBuilder;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path the mock publishes its key set under
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// A running key set endpoint
///
/// # Example
/// ```rust,ignore
/// let jwks = JwksBuilder::new().with_certificate_key(TEST_KID, PRIMARY_X5C);
/// let key_set = MockKeySet::start(jwks).await;
/// let config = Config::from_vars(&vars_with("JWKS_URL", &key_set.url()))?;
/// ```
pub struct MockKeySet {
    server: MockServer,
}

impl MockKeySet {
    /// Serve `jwks` with status 200
    pub async fn start(jwks: JwksBuilder) -> Self {
        Self::start_with(ResponseTemplate::new(200).set_body_json(jwks.build())).await
    }

    /// Serve `jwks` after `delay`
    pub async fn start_delayed(jwks: JwksBuilder, delay: Duration) -> Self {
        Self::start_with(
            ResponseTemplate::new(200)
                .set_body_json(jwks.build())
                .set_delay(delay),
        )
        .await
    }

    /// Answer every key set request with `status` and an empty body
    pub async fn start_failing(status: u16) -> Self {
        Self::start_with(ResponseTemplate::new(status)).await
    }

    /// Answer every key set request with `response`
    pub async fn start_with(response: ResponseTemplate) -> Self {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(response)
            .mount(&server)
            .await;
        Self { server }
    }

    /// Full key set URL
    pub fn url(&self) -> String {
        format!("{}{}", self.server.uri(), JWKS_PATH)
    }

    /// Number of key set requests received so far
    pub async fn request_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|requests| requests.len())
            .unwrap_or(0)
    }
}
