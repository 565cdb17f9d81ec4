//! Tests for published key records and key materialization
//!
//! # Test Coverage
//!
//! - RSA reconstruction from `n`/`e` components
//! - EC P-256 reconstruction from `x`/`y` coordinates
//! - Hard failure on missing or undecodable material (no silent defaults)
//! - Closed key-type set: unsupported `kty` and curves are rejected
//! - Document parsing tolerance: one bogus record fails at materialization,
//!   not at document parse

use serde_json::json;
use tabularis_auth::{materialize, Jwk, JwkSet, MaterializeError};

mod common;
use common::keys;

fn jwk(value: serde_json::Value) -> Jwk {
    serde_json::from_value(value).unwrap()
}

#[test]
fn test_rsa_key_materializes() {
    let key = jwk(json!({
        "kty": "RSA",
        "kid": "k1",
        "alg": "RS256",
        "use": "sig",
        "n": keys::RSA_N,
        "e": keys::RSA_E,
    }));
    assert!(materialize(&key).is_ok());
}

#[test]
fn test_ec_p256_key_materializes() {
    let key = jwk(json!({
        "kty": "EC",
        "kid": "k2",
        "crv": "P-256",
        "x": keys::EC_X,
        "y": keys::EC_Y,
    }));
    assert!(materialize(&key).is_ok());
}

#[test]
fn test_rsa_missing_exponent_is_malformed() {
    let key = jwk(json!({"kty": "RSA", "n": keys::RSA_N}));
    assert!(matches!(
        materialize(&key),
        Err(MaterializeError::MalformedKey(_))
    ));
}

#[test]
fn test_rsa_non_base64_modulus_is_malformed() {
    let key = jwk(json!({"kty": "RSA", "n": "!!!not-base64!!!", "e": keys::RSA_E}));
    assert!(matches!(
        materialize(&key),
        Err(MaterializeError::MalformedKey(_))
    ));
}

#[test]
fn test_rsa_non_string_modulus_is_malformed() {
    // wrong JSON type decodes as absent and fails here, per-key
    let key = jwk(json!({"kty": "RSA", "n": 123456, "e": keys::RSA_E}));
    assert!(matches!(
        materialize(&key),
        Err(MaterializeError::MalformedKey(_))
    ));
}

#[test]
fn test_ec_missing_coordinate_is_malformed() {
    let key = jwk(json!({"kty": "EC", "crv": "P-256", "x": keys::EC_X}));
    assert!(matches!(
        materialize(&key),
        Err(MaterializeError::MalformedKey(_))
    ));
}

#[test]
fn test_ec_missing_curve_is_malformed() {
    let key = jwk(json!({"kty": "EC", "x": keys::EC_X, "y": keys::EC_Y}));
    assert!(matches!(
        materialize(&key),
        Err(MaterializeError::MalformedKey(_))
    ));
}

#[test]
fn test_ec_other_curve_is_unsupported() {
    let key = jwk(json!({
        "kty": "EC",
        "crv": "P-384",
        "x": keys::EC_X,
        "y": keys::EC_Y,
    }));
    assert!(matches!(
        materialize(&key),
        Err(MaterializeError::UnsupportedKeyType(_))
    ));
}

#[test]
fn test_symmetric_and_okp_kty_are_unsupported() {
    for kty in ["oct", "OKP", "anything-else"] {
        let key = jwk(json!({"kty": kty, "k": "c2VjcmV0"}));
        assert!(
            matches!(
                materialize(&key),
                Err(MaterializeError::UnsupportedKeyType(_))
            ),
            "kty {:?} should be unsupported",
            kty
        );
    }
}

#[test]
fn test_missing_kty_is_unsupported() {
    let key = jwk(json!({"kid": "k1"}));
    assert!(matches!(
        materialize(&key),
        Err(MaterializeError::UnsupportedKeyType(_))
    ));
}

#[test]
fn test_document_with_one_bogus_record_still_parses() {
    let document: JwkSet = serde_json::from_value(json!({
        "keys": [
            {"kty": "RSA", "kid": "bogus", "n": 42, "e": true},
            {"kty": "RSA", "kid": "good", "n": keys::RSA_N, "e": keys::RSA_E},
        ]
    }))
    .unwrap();
    assert_eq!(document.keys.len(), 2);
    assert!(materialize(&document.keys[0]).is_err());
    assert!(materialize(&document.keys[1]).is_ok());
}

#[test]
fn test_empty_document_parses() {
    let document: JwkSet = serde_json::from_value(json!({"keys": []})).unwrap();
    assert!(document.keys.is_empty());
}
