//! Authorization pipeline integration tests.
//!
//! Runs the full decision pipeline against a mocked key set endpoint.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use authorizer::authorizer::Authorizer;
use authorizer::config::Config;
use authorizer::errors::AuthError;
use authorizer::policy::{AuthorizationDecision, Effect};
use authorizer_test_utils::{
    JwksBuilder, MockKeySet, TestTokenBuilder, PRIMARY_MODULUS, PRIMARY_X5C, RSA_EXPONENT,
    SECONDARY_KID, SECONDARY_RSA_PRIVATE_PEM, SECONDARY_X5C, TEST_KID,
};
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;

fn config_for(key_set: &MockKeySet, extra: &[(&str, &str)]) -> Config {
    let mut vars = HashMap::from([("JWKS_URL".to_string(), key_set.url())]);
    for (name, value) in extra {
        vars.insert((*name).to_string(), (*value).to_string());
    }
    Config::from_vars(&vars).expect("test config should be valid")
}

/// Key set publishing the primary key as `abc123`.
async fn primary_key_set() -> MockKeySet {
    MockKeySet::start(JwksBuilder::new().with_certificate_key(TEST_KID, PRIMARY_X5C)).await
}

fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_valid_token_allows_subject() {
    let key_set = primary_key_set().await;
    let authorizer = Authorizer::from_config(&config_for(&key_set, &[]));
    let token = TestTokenBuilder::new()
        .with_kid("abc123")
        .for_user("user-42")
        .expires_in(3600)
        .build();

    let decision = authorizer.authorize(Some(&bearer(&token))).await;

    assert_eq!(decision.effect(), Effect::Allow);
    assert_eq!(decision.principal_id, "user-42");
    assert_eq!(
        serde_json::to_value(&decision).unwrap(),
        json!({
            "principalId": "user-42",
            "policyDocument": {
                "Version": "2012-10-17",
                "Statement": [{
                    "Action": "execute-api:Invoke",
                    "Effect": "Allow",
                    "Resource": "*"
                }]
            }
        })
    );
}

#[tokio::test]
async fn test_lowercase_scheme_allows() {
    let key_set = primary_key_set().await;
    let authorizer = Authorizer::from_config(&config_for(&key_set, &[]));
    let token = TestTokenBuilder::new().for_user("user-42").build();

    let decision = authorizer.authorize(Some(&format!("bearer {token}"))).await;

    assert_eq!(decision, AuthorizationDecision::allow("user-42"));
}

#[tokio::test]
async fn test_basic_scheme_denies_without_fetching() {
    let key_set = primary_key_set().await;
    let authorizer = Authorizer::from_config(&config_for(&key_set, &[]));

    let decision = authorizer.authorize(Some("Basic xyz")).await;

    assert_eq!(decision, AuthorizationDecision::deny());
    assert_eq!(key_set.request_count().await, 0);
}

#[tokio::test]
async fn test_unknown_kid_denies() {
    let key_set = primary_key_set().await;
    let authorizer = Authorizer::from_config(&config_for(&key_set, &[]));
    let token = TestTokenBuilder::new().with_kid("unknown").build();

    let decision = authorizer.authorize(Some(&bearer(&token))).await;

    assert_eq!(decision, AuthorizationDecision::deny());
}

#[tokio::test]
async fn test_expired_token_denies() {
    let key_set = primary_key_set().await;
    let authorizer = Authorizer::from_config(&config_for(&key_set, &[]));
    let token = TestTokenBuilder::new().expires_in(-3600).build();

    let decision = authorizer.authorize(Some(&bearer(&token))).await;

    assert_eq!(decision, AuthorizationDecision::deny());
}

// ============================================================================
// Properties
// ============================================================================

#[tokio::test]
async fn test_missing_or_empty_header_denies() {
    let key_set = primary_key_set().await;
    let authorizer = Authorizer::from_config(&config_for(&key_set, &[]));

    for header in [None, Some(""), Some("   ")] {
        assert_eq!(
            authorizer.authorize(header).await,
            AuthorizationDecision::deny()
        );
    }
}

#[tokio::test]
async fn test_non_bearer_inputs_deny() {
    let key_set = primary_key_set().await;
    let authorizer = Authorizer::from_config(&config_for(&key_set, &[]));
    let token = TestTokenBuilder::new().build();

    for header in [
        token.clone(),
        format!("Token {token}"),
        format!("Bearer{token}"),
        format!("Digest {token}"),
    ] {
        assert_eq!(
            authorizer.authorize(Some(&header)).await,
            AuthorizationDecision::deny(),
            "header should be denied"
        );
    }
}

#[tokio::test]
async fn test_tampered_payload_denies() {
    let key_set = primary_key_set().await;
    let authorizer = Authorizer::from_config(&config_for(&key_set, &[]));
    let token = TestTokenBuilder::new().for_user("user-42").build();
    let forged_claims = TestTokenBuilder::new().for_user("admin").claims();
    let tampered = authorizer_test_utils::with_replaced_payload(&token, &forged_claims);

    let decision = authorizer.authorize(Some(&bearer(&tampered))).await;

    assert_eq!(decision, AuthorizationDecision::deny());
}

#[tokio::test]
async fn test_token_signed_by_other_key_denies() {
    let key_set = primary_key_set().await;
    let authorizer = Authorizer::from_config(&config_for(&key_set, &[]));
    // Claims to be abc123 but is signed by the secondary key
    let token = TestTokenBuilder::new().sign_with(SECONDARY_RSA_PRIVATE_PEM);

    let rejection = authorizer
        .evaluate(Some(&bearer(&token)))
        .await
        .unwrap_err();

    assert!(matches!(rejection.error, AuthError::SignatureInvalid(_)));
}

#[tokio::test]
async fn test_algorithm_confusion_denies() {
    let key_set = primary_key_set().await;
    let authorizer = Authorizer::from_config(&config_for(&key_set, &[]));
    // HMAC keyed with the published certificate text
    let token = TestTokenBuilder::new().sign_hs256(PRIMARY_X5C.as_bytes());

    let decision = authorizer.authorize(Some(&bearer(&token))).await;

    assert_eq!(decision, AuthorizationDecision::deny());
    assert_eq!(key_set.request_count().await, 0);
}

#[tokio::test]
async fn test_each_kid_selects_its_own_key() {
    let key_set = MockKeySet::start(
        JwksBuilder::new()
            .with_certificate_key(TEST_KID, PRIMARY_X5C)
            .with_certificate_key(SECONDARY_KID, SECONDARY_X5C),
    )
    .await;
    let authorizer = Authorizer::from_config(&config_for(&key_set, &[]));

    let primary = TestTokenBuilder::new().for_user("alice").build();
    let secondary = TestTokenBuilder::new()
        .for_user("bob")
        .with_kid(SECONDARY_KID)
        .sign_with(SECONDARY_RSA_PRIVATE_PEM);

    assert_eq!(
        authorizer.authorize(Some(&bearer(&primary))).await,
        AuthorizationDecision::allow("alice")
    );
    assert_eq!(
        authorizer.authorize(Some(&bearer(&secondary))).await,
        AuthorizationDecision::allow("bob")
    );
}

#[tokio::test]
async fn test_key_published_as_rsa_components_allows() {
    let key_set = MockKeySet::start(JwksBuilder::new().with_rsa_components_key(
        TEST_KID,
        PRIMARY_MODULUS,
        RSA_EXPONENT,
    ))
    .await;
    let authorizer = Authorizer::from_config(&config_for(&key_set, &[]));
    let token = TestTokenBuilder::new().for_user("user-42").build();

    let decision = authorizer.authorize(Some(&bearer(&token))).await;

    assert_eq!(decision, AuthorizationDecision::allow("user-42"));
}

#[tokio::test]
async fn test_non_signing_entries_are_ignored() {
    let key_set = MockKeySet::start(
        JwksBuilder::new()
            .with_key(json!({"kid": TEST_KID, "kty": "RSA", "use": "enc", "x5c": [PRIMARY_X5C]}))
            .with_key(json!({"kid": TEST_KID, "kty": "EC", "use": "sig", "crv": "P-256"})),
    )
    .await;
    let authorizer = Authorizer::from_config(&config_for(&key_set, &[]));
    let token = TestTokenBuilder::new().build();

    let rejection = authorizer
        .evaluate(Some(&bearer(&token)))
        .await
        .unwrap_err();

    assert_eq!(rejection.error, AuthError::KeyNotFound(TEST_KID.to_string()));
}

#[tokio::test]
async fn test_malformed_certificate_denies() {
    let key_set = MockKeySet::start(
        JwksBuilder::new().with_certificate_key(TEST_KID, "!!!not-base64!!!"),
    )
    .await;
    let authorizer = Authorizer::from_config(&config_for(&key_set, &[]));
    let token = TestTokenBuilder::new().build();

    let rejection = authorizer
        .evaluate(Some(&bearer(&token)))
        .await
        .unwrap_err();

    assert!(matches!(
        rejection.error,
        AuthError::InvalidCertificateEncoding(_)
    ));
}

#[tokio::test]
async fn test_issuer_and_audience_enforced_when_configured() {
    let key_set = primary_key_set().await;
    let authorizer = Authorizer::from_config(&config_for(
        &key_set,
        &[
            ("JWT_ISSUER", "https://issuer.example/"),
            ("JWT_AUDIENCE", "products-api"),
        ],
    ));

    let good = TestTokenBuilder::new()
        .with_issuer("https://issuer.example/")
        .with_audience("products-api")
        .build();
    let no_audience = TestTokenBuilder::new()
        .with_issuer("https://issuer.example/")
        .build();

    assert!(authorizer.authorize(Some(&bearer(&good))).await.is_allow());
    assert_eq!(
        authorizer.authorize(Some(&bearer(&no_audience))).await,
        AuthorizationDecision::deny()
    );
}

// ============================================================================
// Key set failures
// ============================================================================

#[tokio::test]
async fn test_key_set_server_error_denies() {
    let key_set = MockKeySet::start_failing(500).await;
    let authorizer = Authorizer::from_config(&config_for(&key_set, &[]));
    let token = TestTokenBuilder::new().build();

    let rejection = authorizer
        .evaluate(Some(&bearer(&token)))
        .await
        .unwrap_err();

    assert!(matches!(rejection.error, AuthError::KeySetFetch(_)));
}

#[tokio::test]
async fn test_key_set_timeout_denies_promptly() {
    let key_set = MockKeySet::start_delayed(
        JwksBuilder::new().with_certificate_key(TEST_KID, PRIMARY_X5C),
        Duration::from_secs(10),
    )
    .await;
    let authorizer = Authorizer::from_config(&config_for(
        &key_set,
        &[("JWKS_FETCH_TIMEOUT_SECONDS", "1")],
    ));
    let token = TestTokenBuilder::new().build();

    let decision = tokio::time::timeout(
        Duration::from_secs(5),
        authorizer.authorize(Some(&bearer(&token))),
    )
    .await
    .expect("fetch timeout should bound the authorization");

    assert_eq!(decision, AuthorizationDecision::deny());
}

#[tokio::test]
async fn test_failure_does_not_affect_next_request() {
    let key_set = primary_key_set().await;
    let authorizer = Authorizer::from_config(&config_for(&key_set, &[]));
    let expired = TestTokenBuilder::new().expires_in(-60).build();
    let valid = TestTokenBuilder::new().build();

    assert!(!authorizer.authorize(Some(&bearer(&expired))).await.is_allow());
    assert!(authorizer.authorize(Some(&bearer(&valid))).await.is_allow());
}

// ============================================================================
// Fetch behavior
// ============================================================================

#[tokio::test]
async fn test_uncached_fetches_once_per_request() {
    let key_set = primary_key_set().await;
    let authorizer = Authorizer::from_config(&config_for(&key_set, &[]));
    let token = TestTokenBuilder::new().build();

    for _ in 0..3 {
        assert!(authorizer.authorize(Some(&bearer(&token))).await.is_allow());
    }

    assert_eq!(key_set.request_count().await, 3);
}

#[tokio::test]
async fn test_cache_ttl_zero_keeps_fetching() {
    let key_set = primary_key_set().await;
    let authorizer = Authorizer::from_config(&config_for(
        &key_set,
        &[("JWKS_CACHE_TTL_SECONDS", "0")],
    ));
    let token = TestTokenBuilder::new().build();

    authorizer.authorize(Some(&bearer(&token))).await;
    authorizer.authorize(Some(&bearer(&token))).await;

    assert_eq!(key_set.request_count().await, 2);
}

#[tokio::test]
async fn test_cached_keys_avoid_refetching() {
    let key_set = primary_key_set().await;
    let authorizer = Authorizer::from_config(&config_for(
        &key_set,
        &[("JWKS_CACHE_TTL_SECONDS", "300")],
    ));
    let token = TestTokenBuilder::new().build();

    for _ in 0..3 {
        assert!(authorizer.authorize(Some(&bearer(&token))).await.is_allow());
    }

    assert_eq!(key_set.request_count().await, 1);
}

#[tokio::test]
async fn test_cache_does_not_change_outcomes() {
    let key_set = primary_key_set().await;
    let uncached = Authorizer::from_config(&config_for(&key_set, &[]));
    let cached = Authorizer::from_config(&config_for(
        &key_set,
        &[("JWKS_CACHE_TTL_SECONDS", "300")],
    ));

    let headers = [
        bearer(&TestTokenBuilder::new().build()),
        bearer(&TestTokenBuilder::new().with_kid("unknown").build()),
        bearer(&TestTokenBuilder::new().expires_in(-10).build()),
        bearer(&TestTokenBuilder::new().sign_with(SECONDARY_RSA_PRIVATE_PEM)),
        "Basic xyz".to_string(),
    ];

    for header in &headers {
        // Twice, so the cached authorizer answers from cache on the second pass
        for _ in 0..2 {
            assert_eq!(
                cached.authorize(Some(header)).await,
                uncached.authorize(Some(header)).await
            );
        }
    }
}

#[tokio::test]
async fn test_concurrent_cached_requests_share_one_fetch() {
    let key_set = MockKeySet::start_delayed(
        JwksBuilder::new().with_certificate_key(TEST_KID, PRIMARY_X5C),
        Duration::from_millis(100),
    )
    .await;
    let authorizer = Authorizer::from_config(&config_for(
        &key_set,
        &[("JWKS_CACHE_TTL_SECONDS", "300")],
    ));
    let header = bearer(&TestTokenBuilder::new().build());

    let decisions =
        futures::future::join_all((0..10).map(|_| authorizer.authorize(Some(&header)))).await;

    assert!(decisions.iter().all(AuthorizationDecision::is_allow));
    assert_eq!(key_set.request_count().await, 1);
}
