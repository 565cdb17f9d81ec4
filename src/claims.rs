//! # Verified Claims
//!
//! The authenticated output of a successful verification. This is the only
//! claims representation downstream code may trust; it can only be
//! constructed by the verifier, after signature and temporal checks passed.

use serde_json::Value;

/// Claims that survived signature and expiry validation.
///
/// The surrounding service reads [`subject`](VerifiedClaims::subject) as the
/// stable user identifier and [`email`](VerifiedClaims::email) to provision
/// a local user record; everything else is available through
/// [`get`](VerifiedClaims::get).
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedClaims(Value);

impl VerifiedClaims {
    pub(crate) fn new(claims: Value) -> Self {
        Self(claims)
    }

    /// Stable user identifier (`sub`).
    ///
    /// Supabase always includes it; a verified token without `sub` is
    /// unusable for identification, so callers treat `None` as
    /// unauthenticated.
    pub fn subject(&self) -> Option<&str> {
        self.get("sub").and_then(Value::as_str)
    }

    /// Email address if the provider included one.
    ///
    /// Checks `email` first, then the `email_address` spelling some
    /// provider configurations emit.
    pub fn email(&self) -> Option<&str> {
        self.get("email")
            .and_then(Value::as_str)
            .or_else(|| self.get("email_address").and_then(Value::as_str))
    }

    /// Provider role claim (`role`), e.g. `"authenticated"`.
    pub fn role(&self) -> Option<&str> {
        self.get("role").and_then(Value::as_str)
    }

    /// Expiry as a Unix timestamp (`exp`). Already validated; exposed for
    /// callers that surface session lifetime.
    pub fn expires_at(&self) -> Option<i64> {
        self.get("exp").and_then(Value::as_i64)
    }

    /// Look up an arbitrary claim by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Borrow the full claims object.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Consume into the full claims object.
    pub fn into_value(self) -> Value {
        self.0
    }
}
