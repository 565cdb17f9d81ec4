//! # JWKS Cache
//!
//! Time-bounded cache of the identity provider's published key set.
//!
//! ## Overview
//!
//! Supabase publishes its verification keys at
//! `{base}/auth/v1/.well-known/jwks.json`. Fetching that document on every
//! request would put the provider on the hot path of every verification, so
//! the cache holds the last good document and refreshes it lazily once it is
//! older than the TTL.
//!
//! ## Behavior
//!
//! - Freshness is measured on the monotonic clock ([`Instant`]), immune to
//!   wall-clock adjustment.
//! - The cached document is replaced wholesale on a successful refresh,
//!   never mutated in place, so concurrent readers always see a complete
//!   snapshot.
//! - A failed or malformed fetch leaves the previous document in place
//!   without re-stamping it fresh: callers keep getting the stale snapshot
//!   and every subsequent call retries the fetch.
//! - An unconfigured provider URL short-circuits to `None` with no network
//!   access; verification then fails closed upstream.
//! - The lock is never held across the network call. Concurrent misses are
//!   collapsed into a single in-flight fetch by a debounce flag; waiters
//!   fall back to whatever snapshot exists once the refresh settles.

use crate::jwk::JwkSet;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

/// How long a fetched key set stays fresh. Rotation lag is bounded by this.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(600);

/// Upper bound on one JWKS fetch; a slow provider must not stall callers.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(3);

/// Path under the provider base URL where Supabase publishes its key set.
const JWKS_PATH: &str = "/auth/v1/.well-known/jwks.json";

struct CachedJwks {
    document: JwkSet,
    fetched_at: Instant,
}

impl CachedJwks {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }
}

/// Process-lifetime cache of the provider's published key set.
///
/// Construct one per provider and share it behind the verifier; tests
/// construct isolated instances with their own TTL instead of relying on
/// process-global state.
///
/// # Usage
///
/// ```rust
/// use tabularis_auth::JwksCache;
/// use std::time::Duration;
///
/// let cache = JwksCache::new(Some("https://project.supabase.co".to_string()))
///     .cache_ttl(Duration::from_secs(300))
///     .fetch_timeout(Duration::from_secs(2));
/// ```
pub struct JwksCache {
    jwks_url: Option<String>,
    ttl: Duration,
    timeout: Duration,
    state: Mutex<Option<CachedJwks>>,
    refresh_in_progress: AtomicBool,
}

impl JwksCache {
    /// Create a cache for the given provider base URL.
    ///
    /// An empty or missing URL produces a permanently empty cache -
    /// [`JwksCache::get_keys`] returns `None` without network access. An
    /// unparseable URL is logged and treated the same way; a verification
    /// core fails closed on bad configuration rather than panicking.
    pub fn new(provider_base_url: Option<String>) -> Self {
        let jwks_url = provider_base_url
            .as_deref()
            .map(str::trim)
            .filter(|base| !base.is_empty())
            .and_then(|base| match Url::parse(base) {
                Ok(_) => Some(format!("{}{}", base.trim_end_matches('/'), JWKS_PATH)),
                Err(err) => {
                    warn!(
                        "provider base URL '{}' is not a valid URL ({}); JWKS disabled",
                        base, err
                    );
                    None
                }
            });
        Self {
            jwks_url,
            ttl: DEFAULT_CACHE_TTL,
            timeout: DEFAULT_FETCH_TIMEOUT,
            state: Mutex::new(None),
            refresh_in_progress: AtomicBool::new(false),
        }
    }

    /// Configure how long a fetched document stays fresh.
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Configure the bound on a single JWKS fetch.
    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Whether a provider URL is configured at all.
    pub fn is_configured(&self) -> bool {
        self.jwks_url.is_some()
    }

    /// Return the provider's key set, refreshing it if stale.
    ///
    /// Returns `None` when no provider URL is configured, or when no
    /// document has ever been fetched successfully and the current attempt
    /// failed. Absence of keys is a normal, handleable outcome - the caller
    /// fails verification closed; no error is raised from here.
    pub fn get_keys(&self) -> Option<JwkSet> {
        let jwks_url = self.jwks_url.as_deref()?;

        {
            let guard = self
                .state
                .lock()
                .expect("JWKS cache mutex poisoned - critical error");
            if let Some(cached) = guard.as_ref() {
                if cached.is_fresh(self.ttl) {
                    return Some(cached.document.clone());
                }
            }
        }

        // Stale or empty. Let one caller fetch; everyone else waits briefly
        // for the refresh to settle and then reads whatever snapshot exists.
        if self
            .refresh_in_progress
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            self.wait_for_refresh();
            let guard = self
                .state
                .lock()
                .expect("JWKS cache mutex poisoned - critical error");
            return guard.as_ref().map(|cached| cached.document.clone());
        }

        let fetched = self.fetch(jwks_url);
        let result = {
            let mut guard = self
                .state
                .lock()
                .expect("JWKS cache mutex poisoned - critical error");
            match fetched {
                Some(document) => {
                    *guard = Some(CachedJwks {
                        document: document.clone(),
                        fetched_at: Instant::now(),
                    });
                    Some(document)
                }
                // Keep the stale snapshot without re-stamping it; the next
                // call retries the fetch.
                None => guard.as_ref().map(|cached| cached.document.clone()),
            }
        };
        self.refresh_in_progress.store(false, Ordering::Release);
        result
    }

    fn wait_for_refresh(&self) {
        let start = Instant::now();
        // timeout + buffer: the fetching thread is itself bounded
        let deadline = self.timeout + Duration::from_millis(500);
        let mut wait_ms = 10;
        while self.refresh_in_progress.load(Ordering::Acquire) {
            if start.elapsed() >= deadline {
                warn!("JWKS refresh still in flight past its deadline, using current snapshot");
                return;
            }
            std::thread::sleep(Duration::from_millis(wait_ms));
            wait_ms = (wait_ms * 2).min(100);
        }
    }

    // One bounded fetch attempt, no retries. Returns None on any network,
    // status, parse, or shape failure.
    fn fetch(&self, jwks_url: &str) -> Option<JwkSet> {
        let started = Instant::now();
        let client = match reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
        {
            Ok(client) => client,
            Err(err) => {
                warn!("failed to build JWKS HTTP client: {}", err);
                return None;
            }
        };
        let response = match client
            .get(jwks_url)
            .send()
            .and_then(|resp| resp.error_for_status())
        {
            Ok(resp) => resp,
            Err(err) => {
                warn!("JWKS fetch from {} failed: {}", jwks_url, err);
                return None;
            }
        };
        let body = match response.text() {
            Ok(body) => body,
            Err(err) => {
                warn!("JWKS response body unreadable: {}", err);
                return None;
            }
        };
        let parsed: serde_json::Value = match serde_json::from_str(&body) {
            Ok(value) => value,
            Err(err) => {
                warn!("JWKS response is not valid JSON: {}", err);
                return None;
            }
        };
        // Shape rule: a JSON object with a `keys` array, nothing else counts.
        if !parsed.get("keys").map(Value::is_array).unwrap_or(false) {
            warn!("JWKS response is not an object with a 'keys' array, discarding");
            return None;
        }
        match serde_json::from_value::<JwkSet>(parsed) {
            Ok(document) => {
                debug!(
                    "JWKS refreshed in {:?} ({} keys)",
                    started.elapsed(),
                    document.keys.len()
                );
                Some(document)
            }
            Err(err) => {
                warn!("JWKS 'keys' entries are not key records: {}", err);
                None
            }
        }
    }
}
