//! # Unverified Token Inspection
//!
//! Structural decoding of a bearer token's header and payload segments,
//! performed **before** any signature check.
//!
//! ## Overview
//!
//! A JWT is three dot-separated base64url segments: `header.payload.signature`.
//! The functions here decode the first two segments so the verifier can pick
//! an algorithm and key (`alg`, `kid`) and so log lines can carry claim
//! context for a token that is about to be rejected.
//!
//! Nothing returned from this module is authenticated. [`UnverifiedHeader`]
//! drives dispatch only, and the claims value from [`inspect_claims`] is log
//! context only. Authorization decisions must use
//! [`VerifiedClaims`](crate::claims::VerifiedClaims), which only the verifier
//! can produce.
//!
//! Malformed input is reported through [`InspectError`], never a panic; these
//! functions run against attacker-controlled bytes.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Failure to structurally decode a token segment.
#[derive(Debug, Error)]
pub enum InspectError {
    /// The token is not exactly three dot-separated segments.
    #[error("token is not three dot-separated segments")]
    SegmentCount,

    /// A segment is not valid unpadded base64url.
    #[error("token segment is not valid base64url: {0}")]
    SegmentEncoding(#[from] base64::DecodeError),

    /// A decoded segment is not valid JSON.
    #[error("token segment is not valid JSON: {0}")]
    SegmentJson(#[from] serde_json::Error),

    /// The payload decoded to JSON but is not an object.
    #[error("token payload is not a JSON object")]
    PayloadShape,
}

/// Token header fields extracted without trust.
///
/// `alg` selects the verification path and `kid` hints at which published
/// key signed the token. Neither is authenticated at this point - a forged
/// header can claim any algorithm, which is why the verifier only accepts a
/// closed set and verifies the signature against keys *it* selects.
#[derive(Debug, Clone, Deserialize)]
pub struct UnverifiedHeader {
    /// Declared signing algorithm. Empty when the header omits `alg`;
    /// the verifier rejects anything outside its supported set either way.
    #[serde(default)]
    pub alg: String,
    /// Key id hint for JWKS key selection.
    #[serde(default)]
    pub kid: Option<String>,
    /// Token type, typically `"JWT"`.
    #[serde(default)]
    pub typ: Option<String>,
}

fn segments(token: &str) -> Result<(&str, &str, &str), InspectError> {
    let mut parts = token.split('.');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(header), Some(payload), Some(signature), None) => {
            Ok((header, payload, signature))
        }
        _ => Err(InspectError::SegmentCount),
    }
}

/// Decode the header segment of `token` without verifying anything.
///
/// # Errors
///
/// Returns [`InspectError`] when the token does not have three segments or
/// the header segment is not base64url-encoded JSON.
pub fn inspect_header(token: &str) -> Result<UnverifiedHeader, InspectError> {
    let (header, _, _) = segments(token)?;
    let bytes = URL_SAFE_NO_PAD.decode(header)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Decode the payload segment of `token` without verifying anything.
///
/// The returned claims map must never be treated as authenticated; it exists
/// so rejection logs can mention claim context (issuer, subject) for
/// operator correlation.
///
/// # Errors
///
/// Returns [`InspectError`] when the token does not have three segments, the
/// payload is not base64url-encoded JSON, or the payload is not a JSON
/// object.
pub fn inspect_claims(token: &str) -> Result<Value, InspectError> {
    let (_, payload, _) = segments(token)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload)?;
    let claims: Value = serde_json::from_slice(&bytes)?;
    if !claims.is_object() {
        return Err(InspectError::PayloadShape);
    }
    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_requires_exactly_three() {
        assert!(segments("a.b.c").is_ok());
        assert!(matches!(segments("a.b"), Err(InspectError::SegmentCount)));
        assert!(matches!(
            segments("a.b.c.d"),
            Err(InspectError::SegmentCount)
        ));
        assert!(matches!(segments(""), Err(InspectError::SegmentCount)));
    }

    #[test]
    fn header_without_alg_decodes_to_empty() {
        let header = URL_SAFE_NO_PAD.encode(r#"{"typ":"JWT"}"#);
        let token = format!("{}.e30.sig", header);
        let parsed = inspect_header(&token).unwrap();
        assert_eq!(parsed.alg, "");
        assert_eq!(parsed.typ.as_deref(), Some("JWT"));
    }
}
