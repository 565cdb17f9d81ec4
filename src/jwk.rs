//! # Published Key Records
//!
//! Types for the identity provider's published key set and reconstruction of
//! verifier-usable public keys from them.
//!
//! ## Overview
//!
//! A JWKS document is `{"keys": [ ... ]}` where each record carries a key
//! type discriminant (`kty`) plus type-specific material: modulus/exponent
//! (`n`/`e`) for RSA, curve and point coordinates (`crv`/`x`/`y`) for EC.
//! [`materialize`] turns one record into a [`DecodingKey`] the signature
//! check can use.
//!
//! The supported set is deliberately closed - RSA and EC P-256 are the two
//! key shapes Supabase signs with - so this is a single match over a tagged
//! variant, not an extensible plugin point.
//!
//! Field handling is strict at materialization time: a record whose declared
//! `kty` lacks the required material, or whose material is not base64url, is
//! a hard [`MaterializeError::MalformedKey`], never a silent default.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use jsonwebtoken::DecodingKey;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;

/// Failure to reconstruct a public key from a published record.
#[derive(Debug, Error)]
pub enum MaterializeError {
    /// The record's key type or curve is outside the supported set.
    #[error("unsupported key type: {0}")]
    UnsupportedKeyType(String),

    /// The record is missing required material or the material is invalid.
    #[error("malformed key: {0}")]
    MalformedKey(String),
}

/// One published key record.
///
/// All material fields are optional at parse time; which ones are required
/// is decided by `kty` inside [`materialize`]. A field carrying the wrong
/// JSON type decodes as absent, so a single bogus record fails key
/// reconstruction rather than poisoning the whole document fetch.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    /// Key type discriminant: `"RSA"` or `"EC"` are supported.
    #[serde(default, deserialize_with = "string_or_none")]
    pub kty: Option<String>,
    /// Key id, matched against the token header's `kid` hint.
    #[serde(default, deserialize_with = "string_or_none")]
    pub kid: Option<String>,
    /// Declared algorithm, informational.
    #[serde(default, deserialize_with = "string_or_none")]
    pub alg: Option<String>,
    /// Intended key use (`"sig"`), informational.
    #[serde(default, rename = "use", deserialize_with = "string_or_none")]
    pub key_use: Option<String>,
    /// RSA modulus, base64url big-endian.
    #[serde(default, deserialize_with = "string_or_none")]
    pub n: Option<String>,
    /// RSA public exponent, base64url big-endian.
    #[serde(default, deserialize_with = "string_or_none")]
    pub e: Option<String>,
    /// EC curve name; only `"P-256"` is supported.
    #[serde(default, deserialize_with = "string_or_none")]
    pub crv: Option<String>,
    /// EC point x coordinate, base64url big-endian.
    #[serde(default, deserialize_with = "string_or_none")]
    pub x: Option<String>,
    /// EC point y coordinate, base64url big-endian.
    #[serde(default, deserialize_with = "string_or_none")]
    pub y: Option<String>,
}

/// The provider's published key set.
///
/// May be empty (the provider published nothing yet); the verifier treats an
/// empty set the same as an unavailable one.
#[derive(Debug, Clone, Deserialize)]
pub struct JwkSet {
    /// Published records, in provider order. Order matters: when a token
    /// carries no usable `kid`, the verifier falls back to the first record.
    pub keys: Vec<Jwk>,
}

// Non-string values decode as None so the mismatch is reported per-key at
// materialization time instead of failing the document parse.
fn string_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => Some(s),
        _ => None,
    })
}

/// Reconstruct a verifier-usable public key from a published record.
///
/// # Errors
///
/// - [`MaterializeError::UnsupportedKeyType`] for a `kty` outside
///   `{RSA, EC}` or an EC curve other than P-256.
/// - [`MaterializeError::MalformedKey`] when required material for the
///   declared `kty` is missing, non-string, or not valid base64url.
pub fn materialize(jwk: &Jwk) -> Result<DecodingKey, MaterializeError> {
    match jwk.kty.as_deref() {
        Some("RSA") => rsa_key(jwk),
        Some("EC") => ec_key(jwk),
        Some(other) => Err(MaterializeError::UnsupportedKeyType(other.to_string())),
        None => Err(MaterializeError::UnsupportedKeyType(
            "missing 'kty'".to_string(),
        )),
    }
}

fn rsa_key(jwk: &Jwk) -> Result<DecodingKey, MaterializeError> {
    let n = require(&jwk.n, "RSA", "n")?;
    let e = require(&jwk.e, "RSA", "e")?;
    decodable(n, "n")?;
    decodable(e, "e")?;
    DecodingKey::from_rsa_components(n, e).map_err(|err| {
        MaterializeError::MalformedKey(format!("RSA components rejected: {}", err))
    })
}

fn ec_key(jwk: &Jwk) -> Result<DecodingKey, MaterializeError> {
    match jwk.crv.as_deref() {
        Some("P-256") => {}
        Some(other) => {
            return Err(MaterializeError::UnsupportedKeyType(format!(
                "EC curve {}",
                other
            )))
        }
        None => {
            return Err(MaterializeError::MalformedKey(
                "EC key missing 'crv'".to_string(),
            ))
        }
    }
    let x = require(&jwk.x, "EC", "x")?;
    let y = require(&jwk.y, "EC", "y")?;
    decodable(x, "x")?;
    decodable(y, "y")?;
    DecodingKey::from_ec_components(x, y).map_err(|err| {
        MaterializeError::MalformedKey(format!("EC components rejected: {}", err))
    })
}

fn require<'a>(
    field: &'a Option<String>,
    kty: &str,
    name: &str,
) -> Result<&'a str, MaterializeError> {
    field.as_deref().ok_or_else(|| {
        MaterializeError::MalformedKey(format!("{} key missing '{}'", kty, name))
    })
}

// jsonwebtoken defers some component validation; reject undecodable
// material here so the error is attributed to the key, not the token.
fn decodable(material: &str, name: &str) -> Result<(), MaterializeError> {
    URL_SAFE_NO_PAD.decode(material).map(|_| ()).map_err(|err| {
        MaterializeError::MalformedKey(format!("'{}' is not base64url: {}", name, err))
    })
}
