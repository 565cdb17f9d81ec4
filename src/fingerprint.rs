//! # Token Fingerprinting
//!
//! Short correlation ids for bearer tokens. Every log line the verifier
//! emits carries a fingerprint instead of the token itself, so operators can
//! correlate repeated failures for one credential without the log store ever
//! holding material that grants access.

use sha2::{Digest, Sha256};
use std::fmt::Write as _;

/// Digest bytes kept in the printable fingerprint (16 hex chars).
const FINGERPRINT_BYTES: usize = 8;

/// Produce a short, irreversible correlation id for `token`.
///
/// Deterministic: the same token always fingerprints to the same id, so
/// repeated rejections of one credential group together in logs. One-way:
/// a truncated SHA-256 digest cannot be inverted to recover the token.
///
/// Pure function, no shared state.
pub fn fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    let mut out = String::with_capacity(FINGERPRINT_BYTES * 2);
    for byte in &digest[..FINGERPRINT_BYTES] {
        // write! to a String cannot fail
        let _ = write!(out, "{:02x}", byte);
    }
    out
}
