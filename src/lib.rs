//! # tabularis-auth
//!
//! **tabularis-auth** is the bearer-token verification core of the Tabularis
//! server: it authenticates callers presenting JWTs issued by Supabase Auth,
//! validating signature and temporal claims without trusting anything the
//! caller sent.
//!
//! ## Overview
//!
//! The surrounding HTTP service hands this crate a raw bearer token plus
//! identity-provider configuration and gets back exactly one thing: a
//! [`VerificationOutcome`] - either verified claims it may trust, or an
//! explicit rejection it must answer with a generic 401. Three signature
//! schemes are supported:
//!
//! - **HS256** - symmetric, against the deployment's shared Supabase JWT
//!   secret
//! - **RS256** / **ES256** - asymmetric, against public keys the provider
//!   publishes in its JWKS document and rotates over time
//!
//! ## Architecture
//!
//! The library is organized into small, separately testable modules:
//!
//! - **[`token`]** - unverified header/claims inspection (algorithm and key
//!   id dispatch, log context)
//! - **[`jwk`]** - published key records and reconstruction of usable
//!   public keys (RSA modulus/exponent, EC P-256 coordinates)
//! - **[`jwks_cache`]** - time-bounded cache of the provider's key set,
//!   refreshed lazily on a monotonic clock
//! - **[`verifier`]** - algorithm dispatch, signature and expiry checks,
//!   the pass/fail decision
//! - **[`claims`]** - the authenticated claims wrapper downstream code
//!   consumes
//! - **[`fingerprint`]** - short one-way token ids for log correlation
//!
//! ### Verification Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Caller as HTTP layer
//!     participant Verifier as TokenVerifier
//!     participant Inspect as token::inspect_header
//!     participant Cache as JwksCache
//!     participant Jwk as jwk::materialize
//!
//!     Caller->>Verifier: verify(bearer token)
//!     Verifier->>Inspect: decode header (no trust)
//!     Inspect-->>Verifier: alg, kid
//!
//!     alt alg = HS256
//!         Verifier->>Verifier: shared secret configured?
//!         Note over Verifier: absent secret rejects<br/>(MissingSecret, logged at error)
//!     else alg = RS256 / ES256
//!         Verifier->>Cache: get_keys()
//!         Cache->>Cache: fresh snapshot? (10 min, monotonic)
//!         Cache-->>Verifier: JWKS document | None
//!         Verifier->>Jwk: materialize(selected key)
//!         Jwk-->>Verifier: DecodingKey | MalformedKey
//!     else anything else
//!         Verifier-->>Caller: Rejected(UnsupportedAlgorithm)
//!     end
//!
//!     Verifier->>Verifier: verify signature + exp (zero leeway)
//!     Verifier-->>Caller: Verified(claims) | Rejected(reason)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tabularis_auth::{TokenVerifier, VerificationOutcome, VerifierConfig};
//!
//! let verifier = TokenVerifier::new(VerifierConfig {
//!     shared_secret: Some("supabase-jwt-secret".to_string()),
//!     provider_base_url: Some("https://project.supabase.co".to_string()),
//! });
//!
//! let token = "eyJhbGciOiJIUzI1NiJ9.e30.sig";
//! match verifier.verify(token) {
//!     VerificationOutcome::Verified(claims) => {
//!         let _user_id = claims.subject(); // stable identifier
//!         let _email = claims.email(); // optional, used for provisioning
//!     }
//!     VerificationOutcome::Rejected(_reason) => {
//!         // reason goes to the server log; the client sees only
//!         // tabularis_auth::REJECTION_MESSAGE with a 401
//!     }
//! }
//! ```
//!
//! ## Failure Policy
//!
//! Everything fails closed. No configured secret means HS256 tokens are
//! rejected; no provider URL (or an unreachable provider) means RS256/ES256
//! tokens are rejected; `alg: none` and every algorithm outside the
//! supported set are rejected without guessing. Rejections are values
//! ([`RejectReason`]), never panics - this code runs against
//! attacker-controlled input.
//!
//! ## Logging
//!
//! Log lines carry a token [`fingerprint`](fingerprint::fingerprint)
//! (truncated SHA-256), the algorithm, and the key id - never the token,
//! the secret, or signature bytes. Install any `tracing` subscriber to
//! collect them.

pub mod claims;
pub mod fingerprint;
pub mod jwk;
pub mod jwks_cache;
pub mod token;
pub mod verifier;

pub use claims::VerifiedClaims;
pub use fingerprint::fingerprint;
pub use jwk::{materialize, Jwk, JwkSet, MaterializeError};
pub use jwks_cache::JwksCache;
pub use token::{inspect_claims, inspect_header, InspectError, UnverifiedHeader};
pub use verifier::{
    RejectReason, TokenVerifier, VerificationOutcome, VerifierConfig, REJECTION_MESSAGE,
};
