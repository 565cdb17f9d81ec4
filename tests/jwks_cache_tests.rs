//! Tests for the JWKS cache
//!
//! # Test Coverage
//!
//! - TTL behavior: at most one fetch inside the window, exactly one more
//!   after it elapses
//! - Unconfigured provider URL: no network access, `None`
//! - Malformed documents are discarded; a stale snapshot is served but not
//!   re-stamped fresh (every later call retries)
//! - Network failure: stale snapshot if one exists, else `None`
//! - Empty `keys` arrays are accepted as valid documents
//!
//! # Test Strategy
//!
//! Each test constructs its own isolated cache with a short TTL against a
//! counting mock endpoint ([`common::jwks::MockJwksServer`]), so tests can
//! assert exact fetch counts without shared process state.

use serde_json::json;
use std::time::Duration;
use tabularis_auth::JwksCache;

mod common;
use common::jwks::{dead_endpoint, MockJwksServer};
use common::keys;

fn rsa_document() -> String {
    json!({
        "keys": [
            {"kty": "RSA", "kid": "k1", "n": keys::RSA_N, "e": keys::RSA_E}
        ]
    })
    .to_string()
}

fn short_ttl_cache(base_url: &str) -> JwksCache {
    JwksCache::new(Some(base_url.to_string()))
        .cache_ttl(Duration::from_millis(150))
        .fetch_timeout(Duration::from_secs(1))
}

#[test]
fn test_fresh_window_fetches_at_most_once() {
    common::init_tracing();
    let server = MockJwksServer::start(rsa_document());
    let cache = short_ttl_cache(server.base_url());

    let first = cache.get_keys().expect("first fetch should succeed");
    assert_eq!(first.keys.len(), 1);
    let second = cache.get_keys().expect("second call should hit the cache");
    assert_eq!(second.keys.len(), 1);
    assert_eq!(server.hits(), 1);
}

#[test]
fn test_expired_window_fetches_exactly_once_more() {
    common::init_tracing();
    let server = MockJwksServer::start(rsa_document());
    let cache = short_ttl_cache(server.base_url());

    assert!(cache.get_keys().is_some());
    assert_eq!(server.hits(), 1);

    std::thread::sleep(Duration::from_millis(250));
    assert!(cache.get_keys().is_some());
    assert_eq!(server.hits(), 2);

    // and the refreshed snapshot is fresh again
    assert!(cache.get_keys().is_some());
    assert_eq!(server.hits(), 2);
}

#[test]
fn test_unconfigured_provider_returns_none_without_network() {
    let cache = JwksCache::new(None);
    assert!(cache.get_keys().is_none());

    let cache = JwksCache::new(Some(String::new()));
    assert!(cache.get_keys().is_none());
}

#[test]
fn test_network_failure_without_prior_cache_returns_none() {
    common::init_tracing();
    let cache = short_ttl_cache(&dead_endpoint());
    assert!(cache.get_keys().is_none());
}

#[test]
fn test_network_failure_serves_stale_snapshot() {
    common::init_tracing();
    let server = MockJwksServer::start(rsa_document());
    let cache = short_ttl_cache(server.base_url());

    assert!(cache.get_keys().is_some());
    server.shutdown();

    std::thread::sleep(Duration::from_millis(250));
    let stale = cache.get_keys().expect("stale snapshot should be served");
    assert_eq!(stale.keys.len(), 1);
}

#[test]
fn test_malformed_document_is_discarded_and_stale_is_not_restamped() {
    common::init_tracing();
    let server = MockJwksServer::start(rsa_document());
    let cache = short_ttl_cache(server.base_url());

    assert!(cache.get_keys().is_some());
    assert_eq!(server.hits(), 1);

    // Provider starts answering garbage after the window expires.
    server.set_body(json!({"nokeys": true}).to_string());
    std::thread::sleep(Duration::from_millis(250));

    let stale = cache.get_keys().expect("previous document should survive");
    assert_eq!(stale.keys[0].kid.as_deref(), Some("k1"));
    assert_eq!(server.hits(), 2);

    // Not re-stamped fresh: the very next call retries immediately.
    let stale = cache.get_keys().expect("previous document should survive");
    assert_eq!(stale.keys[0].kid.as_deref(), Some("k1"));
    assert_eq!(server.hits(), 3);
}

#[test]
fn test_non_json_document_without_prior_cache_returns_none() {
    common::init_tracing();
    let server = MockJwksServer::start("<html>not a key set</html>".to_string());
    let cache = short_ttl_cache(server.base_url());
    assert!(cache.get_keys().is_none());
    assert_eq!(server.hits(), 1);
}

#[test]
fn test_empty_keys_array_is_a_valid_document() {
    common::init_tracing();
    let server = MockJwksServer::start(json!({"keys": []}).to_string());
    let cache = short_ttl_cache(server.base_url());
    let document = cache.get_keys().expect("empty key set is still a document");
    assert!(document.keys.is_empty());
}

#[test]
fn test_recovery_after_provider_comes_back_wrong_then_right() {
    common::init_tracing();
    let server = MockJwksServer::start(json!({"keys": "bogus"}).to_string());
    let cache = short_ttl_cache(server.base_url());

    // shape failure, nothing cached yet
    assert!(cache.get_keys().is_none());

    // provider fixed; next call picks the document up
    server.set_body(rsa_document());
    let document = cache.get_keys().expect("recovered document");
    assert_eq!(document.keys.len(), 1);
}
