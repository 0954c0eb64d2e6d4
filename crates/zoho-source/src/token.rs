//! OAuth access token cache.

use std::time::{Duration, Instant};

/// Tokens are treated as expired this long before Zoho says they are.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Lifetime assumed when the token response carries no `expires_in`.
pub(crate) const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// Access token with its expiry.
///
/// Owned by one [`ZohoClient`](crate::ZohoClient); there is no process-wide
/// token state.
#[derive(Debug, Default)]
pub struct TokenCache {
    token: Option<CachedToken>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached token if it is still valid at `now`.
    pub fn get(&self, now: Instant) -> Option<&str> {
        self.token
            .as_ref()
            .filter(|t| now < t.expires_at)
            .map(|t| t.access_token.as_str())
    }

    /// Store a freshly issued token valid for `expires_in` from `now`.
    pub fn store(&mut self, access_token: String, expires_in: Duration, now: Instant) {
        let lifetime = expires_in.saturating_sub(EXPIRY_MARGIN);
        self.token = Some(CachedToken {
            access_token,
            expires_at: now + lifetime,
        });
    }

    /// Forget the cached token, forcing a refresh on next use.
    pub fn invalidate(&mut self) {
        self.token = None;
    }
}
