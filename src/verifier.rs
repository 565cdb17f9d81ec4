//! # Token Verifier
//!
//! The orchestrator: given a bearer token and provider configuration, decide
//! which verification path applies, obtain key material, check the signature
//! and expiry, and return an explicit [`VerificationOutcome`].
//!
//! ## Verification Flow
//!
//! 1. Decode the token header without trust (`alg`, `kid`)
//! 2. Dispatch on the declared algorithm:
//!    - `HS256` - verify with the configured shared secret
//!    - `RS256` / `ES256` - fetch the provider's key set through the
//!      [`JwksCache`], select a key by `kid`, reconstruct the public key
//!    - anything else (including `none`) - reject, no guessing
//! 3. Verify signature and `exp` with zero leeway
//! 4. Return `Verified(claims)` or `Rejected(reason)`
//!
//! ## Failure Policy
//!
//! Every failure is a [`RejectReason`] value, never a panic or bare error
//! bubble. The taxonomy exists for server-side logs; callers answer every
//! rejection with the same generic 401 body ([`REJECTION_MESSAGE`]) so the
//! precise reason never reaches a probing client.
//!
//! The audience claim is deliberately NOT validated: Supabase audience
//! values are not constrained by this service. Pin audiences upstream if a
//! deployment requires it.
//!
//! ## Logging
//!
//! Every branch logs the token fingerprint, the algorithm, and the key id
//! when present - never the secret, the full token, or signature bytes.
//! Routine expiry logs at info; a missing shared secret is a deployment
//! misconfiguration and logs at error (once, then debug).

use crate::claims::VerifiedClaims;
use crate::fingerprint::fingerprint;
use crate::jwk::{materialize, Jwk, JwkSet};
use crate::jwks_cache::JwksCache;
use crate::token::inspect_header;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde_json::Value;
use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// The one user-visible message for every rejection, regardless of kind.
/// Differentiated reasons live in server-side logs only.
pub const REJECTION_MESSAGE: &str = "Invalid or expired token";

/// Why a token was rejected. Logged server-side; callers must not branch on
/// the kind beyond treating every rejection as unauthenticated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    /// Token segments are structurally invalid.
    #[error("malformed token")]
    MalformedToken,
    /// Declared algorithm is outside the supported set {HS256, RS256, ES256}.
    #[error("unsupported algorithm")]
    UnsupportedAlgorithm,
    /// HS256 token presented but no shared secret is configured.
    #[error("shared secret not configured")]
    MissingSecret,
    /// Provider key set is unconfigured, unreachable, or empty.
    #[error("provider keys unavailable")]
    KeysUnavailable,
    /// Key set was fetched but contains no record to select.
    #[error("no matching key")]
    NoMatchingKey,
    /// The selected key record does not reconstruct a valid public key.
    #[error("malformed provider key")]
    MalformedKey,
    /// The token's `exp` is in the past.
    #[error("token expired")]
    ExpiredSignature,
    /// Claim values are missing or malformed.
    #[error("invalid claims")]
    ClaimsInvalid,
    /// The signature does not verify against the selected key.
    #[error("signature mismatch")]
    SignatureMismatch,
    /// Any decode/verify failure not classified above.
    #[error("verification failed")]
    VerificationFailed,
}

/// Result of verifying one token.
///
/// A sum type rather than an error-raising call so callers can branch
/// without depending on an error hierarchy.
#[derive(Debug, Clone, PartialEq)]
pub enum VerificationOutcome {
    /// Signature and temporal claims check out; the payload may be trusted.
    Verified(VerifiedClaims),
    /// The token is not acceptable; treat the request as unauthenticated.
    Rejected(RejectReason),
}

impl VerificationOutcome {
    /// Whether the token verified.
    pub fn is_verified(&self) -> bool {
        matches!(self, VerificationOutcome::Verified(_))
    }

    /// The verified claims, if any.
    pub fn claims(&self) -> Option<&VerifiedClaims> {
        match self {
            VerificationOutcome::Verified(claims) => Some(claims),
            VerificationOutcome::Rejected(_) => None,
        }
    }

    /// The rejection reason, if any.
    pub fn rejection(&self) -> Option<&RejectReason> {
        match self {
            VerificationOutcome::Verified(_) => None,
            VerificationOutcome::Rejected(reason) => Some(reason),
        }
    }
}

/// Identity-provider configuration for the verifier.
///
/// Both fields are optional: an absent shared secret makes HS256 tokens fail
/// closed, an absent provider URL makes RS256/ES256 tokens fail closed.
/// Empty strings are normalized to absent.
#[derive(Debug, Clone, Default)]
pub struct VerifierConfig {
    /// Shared secret for HS256 verification (Supabase "JWT secret").
    pub shared_secret: Option<String>,
    /// Provider base URL, e.g. `https://project.supabase.co`.
    pub provider_base_url: Option<String>,
}

impl VerifierConfig {
    /// Load configuration from the environment.
    ///
    /// Reads `SUPABASE_JWT_SECRET` and `SUPABASE_URL`; unset or empty
    /// variables leave the corresponding path unconfigured (fail closed).
    pub fn from_env() -> Self {
        Self {
            shared_secret: env::var("SUPABASE_JWT_SECRET").ok(),
            provider_base_url: env::var("SUPABASE_URL").ok(),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// A missing shared secret is a deployment misconfiguration. Report it loudly
// the first time, then stop flooding the error log for every HS256 token.
static MISSING_SECRET_REPORTED: AtomicBool = AtomicBool::new(false);

/// Bearer-token verifier for one identity provider.
///
/// Owns its [`JwksCache`]; construct one verifier per provider and share it
/// across request handlers.
///
/// # Usage
///
/// ```rust,no_run
/// use tabularis_auth::{TokenVerifier, VerificationOutcome, VerifierConfig};
///
/// let verifier = TokenVerifier::new(VerifierConfig::from_env());
/// match verifier.verify("eyJhbGciOiJIUzI1NiJ9.e30.sig") {
///     VerificationOutcome::Verified(claims) => {
///         println!("user {}", claims.subject().unwrap_or("<none>"));
///     }
///     VerificationOutcome::Rejected(_) => {
///         // answer 401 with the generic message, log the detail
///     }
/// }
/// ```
pub struct TokenVerifier {
    shared_secret: Option<String>,
    jwks: JwksCache,
}

impl TokenVerifier {
    /// Create a verifier from configuration, with a cache using default TTL
    /// and fetch timeout.
    pub fn new(config: VerifierConfig) -> Self {
        let jwks = JwksCache::new(non_empty(config.provider_base_url));
        Self {
            shared_secret: non_empty(config.shared_secret),
            jwks,
        }
    }

    /// Create a verifier around an explicitly constructed cache.
    ///
    /// Tests use this to inject short TTLs and mock endpoints; the
    /// `provider_base_url` of `config` is ignored in favor of the cache's.
    pub fn with_jwks_cache(config: VerifierConfig, jwks: JwksCache) -> Self {
        Self {
            shared_secret: non_empty(config.shared_secret),
            jwks,
        }
    }

    /// Verify one bearer token.
    ///
    /// Never panics and never returns a bare error; every failure mode maps
    /// to a [`RejectReason`].
    pub fn verify(&self, token: &str) -> VerificationOutcome {
        let fp = fingerprint(token);
        let header = match inspect_header(token) {
            Ok(header) => header,
            Err(err) => {
                debug!("token {} rejected: malformed ({})", fp, err);
                return VerificationOutcome::Rejected(RejectReason::MalformedToken);
            }
        };
        match header.alg.as_str() {
            "HS256" => self.verify_shared_secret(token, &fp),
            "RS256" => self.verify_published_key(token, Algorithm::RS256, header.kid.as_deref(), &fp),
            "ES256" => self.verify_published_key(token, Algorithm::ES256, header.kid.as_deref(), &fp),
            other => {
                warn!(
                    "token {} rejected: unsupported algorithm '{}' (kid {})",
                    fp,
                    other,
                    header.kid.as_deref().unwrap_or("-")
                );
                VerificationOutcome::Rejected(RejectReason::UnsupportedAlgorithm)
            }
        }
    }

    fn verify_shared_secret(&self, token: &str, fp: &str) -> VerificationOutcome {
        let secret = match self.shared_secret.as_deref() {
            Some(secret) => secret,
            None => {
                if !MISSING_SECRET_REPORTED.swap(true, Ordering::Relaxed) {
                    error!(
                        "token {} rejected: HS256 token presented but no shared secret is configured",
                        fp
                    );
                } else {
                    debug!("token {} rejected: no shared secret configured", fp);
                }
                return VerificationOutcome::Rejected(RejectReason::MissingSecret);
            }
        };
        let key = DecodingKey::from_secret(secret.as_bytes());
        self.check_signature(token, &key, Algorithm::HS256, None, fp)
    }

    fn verify_published_key(
        &self,
        token: &str,
        alg: Algorithm,
        kid: Option<&str>,
        fp: &str,
    ) -> VerificationOutcome {
        let document = match self.jwks.get_keys() {
            Some(document) if !document.keys.is_empty() => document,
            Some(_) => {
                warn!(
                    "token {} rejected: provider published an empty key set (alg {:?}, kid {})",
                    fp,
                    alg,
                    kid.unwrap_or("-")
                );
                return VerificationOutcome::Rejected(RejectReason::KeysUnavailable);
            }
            None => {
                warn!(
                    "token {} rejected: provider key set unavailable (alg {:?}, kid {})",
                    fp,
                    alg,
                    kid.unwrap_or("-")
                );
                return VerificationOutcome::Rejected(RejectReason::KeysUnavailable);
            }
        };
        let jwk = match select_key(&document, kid) {
            Some(jwk) => jwk,
            None => {
                warn!(
                    "token {} rejected: no usable key in provider key set (kid {})",
                    fp,
                    kid.unwrap_or("-")
                );
                return VerificationOutcome::Rejected(RejectReason::NoMatchingKey);
            }
        };
        let key = match materialize(jwk) {
            Ok(key) => key,
            Err(err) => {
                warn!(
                    "token {} rejected: selected key '{}' failed to materialize: {}",
                    fp,
                    jwk.kid.as_deref().unwrap_or("-"),
                    err
                );
                return VerificationOutcome::Rejected(RejectReason::MalformedKey);
            }
        };
        self.check_signature(token, &key, alg, jwk.kid.as_deref(), fp)
    }

    fn check_signature(
        &self,
        token: &str,
        key: &DecodingKey,
        alg: Algorithm,
        kid: Option<&str>,
        fp: &str,
    ) -> VerificationOutcome {
        let mut validation = Validation::new(alg);
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp"]);
        // Strict expiry: the provider's own clocks sign these tokens.
        validation.leeway = 0;
        // Supabase audience values are not constrained by this service.
        validation.validate_aud = false;

        match jsonwebtoken::decode::<Value>(token, key, &validation) {
            Ok(data) => {
                debug!(
                    "token {} verified (alg {:?}, kid {})",
                    fp,
                    alg,
                    kid.unwrap_or("-")
                );
                VerificationOutcome::Verified(VerifiedClaims::new(data.claims))
            }
            Err(err) => {
                let reason = classify(&err);
                match reason {
                    // Expired sessions are routine traffic, not incidents.
                    RejectReason::ExpiredSignature => info!(
                        "token {} rejected: expired (alg {:?}, kid {})",
                        fp,
                        alg,
                        kid.unwrap_or("-")
                    ),
                    _ => warn!(
                        "token {} rejected: {} (alg {:?}, kid {}, detail {:?})",
                        fp,
                        reason,
                        alg,
                        kid.unwrap_or("-"),
                        err.kind()
                    ),
                }
                VerificationOutcome::Rejected(reason)
            }
        }
    }
}

/// Select the published key for a token.
///
/// Prefers the record whose `kid` matches the token header. When the header
/// has no `kid`, or nothing matches, falls back to the first published
/// record: rotation windows typically publish one active signing key. Known
/// limitation: with two simultaneously valid keys this fallback can pick
/// the wrong one, and the token is then rejected on signature mismatch.
fn select_key<'a>(document: &'a JwkSet, kid: Option<&str>) -> Option<&'a Jwk> {
    if let Some(kid) = kid {
        if let Some(jwk) = document
            .keys
            .iter()
            .find(|key| key.kid.as_deref() == Some(kid))
        {
            return Some(jwk);
        }
        debug!(
            "no published key matches kid '{}', falling back to the first key",
            kid
        );
    }
    document.keys.first()
}

fn classify(err: &jsonwebtoken::errors::Error) -> RejectReason {
    use jsonwebtoken::errors::ErrorKind;
    match err.kind() {
        ErrorKind::ExpiredSignature => RejectReason::ExpiredSignature,
        ErrorKind::InvalidSignature => RejectReason::SignatureMismatch,
        ErrorKind::MissingRequiredClaim(_) => RejectReason::ClaimsInvalid,
        ErrorKind::InvalidIssuer | ErrorKind::InvalidAudience | ErrorKind::InvalidSubject => {
            RejectReason::ClaimsInvalid
        }
        _ => RejectReason::VerificationFailed,
    }
}
