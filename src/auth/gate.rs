//! Load-time authentication gate.
//!
//! Runs once per application load and decides, from the stored token alone,
//! whether the user starts signed in. A token that cannot be used is removed so
//! it is never retried.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::{decode_claims, Identity, TokenStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    LoggedOut,
    LoggedIn(Identity),
}

impl AuthState {
    pub fn is_logged_in(&self) -> bool {
        matches!(self, AuthState::LoggedIn(_))
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            AuthState::LoggedIn(identity) => Some(identity),
            AuthState::LoggedOut => None,
        }
    }
}

/// Decide the authentication state from the stored token. Never fails.
pub fn evaluate(store: &dyn TokenStore, now: DateTime<Utc>) -> AuthState {
    let token = match store.load() {
        Ok(Some(token)) => token,
        Ok(None) => {
            debug!("No stored token");
            return AuthState::LoggedOut;
        }
        Err(e) => {
            warn!(error = %e, "Stored token unreadable, discarding");
            discard(store);
            return AuthState::LoggedOut;
        }
    };

    let claims = match decode_claims(&token) {
        Ok(claims) => claims,
        Err(e) => {
            info!(error = %e, "Stored token malformed, discarding");
            discard(store);
            return AuthState::LoggedOut;
        }
    };

    if claims.is_expired_at(now) {
        info!(exp = claims.expires_at_secs(), "Stored token expired, discarding");
        discard(store);
        return AuthState::LoggedOut;
    }

    let identity = claims.identity();
    debug!(email = %identity.email, roles = ?identity.roles, "Stored token accepted");
    AuthState::LoggedIn(identity)
}

fn discard(store: &dyn TokenStore) {
    if let Err(e) = store.clear() {
        warn!(error = %e, "Failed to remove stored token");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::testutil::make_token;
    use crate::auth::token_store::testutil::MemoryTokenStore;
    use anyhow::Result;
    use serde_json::json;

    #[test]
    fn test_no_token_is_logged_out() {
        let store = MemoryTokenStore::default();
        assert_eq!(evaluate(&store, Utc::now()), AuthState::LoggedOut);
        assert_eq!(store.removals(), 0);
    }

    #[test]
    fn test_future_expiry_is_logged_in() {
        let now = Utc::now();
        let token = make_token(json!({
            "sub": "a@b.com",
            "auth": ["USER"],
            "exp": now.timestamp() + 3600,
        }));
        let store = MemoryTokenStore::with_token(&token);

        let state = evaluate(&store, now);
        assert_eq!(
            state,
            AuthState::LoggedIn(Identity {
                email: "a@b.com".to_string(),
                roles: vec!["USER".to_string()],
            })
        );
        assert!(state.is_logged_in());
        // Token stays in place
        assert_eq!(store.current(), Some(token));
    }

    #[test]
    fn test_past_expiry_removes_token() {
        let now = Utc::now();
        let token = make_token(json!({"sub": "a@b.com", "exp": now.timestamp() - 10}));
        let store = MemoryTokenStore::with_token(&token);

        assert_eq!(evaluate(&store, now), AuthState::LoggedOut);
        assert_eq!(store.current(), None);
        assert_eq!(store.removals(), 1);
    }

    #[test]
    fn test_expiry_equal_to_now_is_logged_out() {
        let now = Utc::now();
        let token = make_token(json!({"sub": "a@b.com", "exp": now.timestamp()}));
        let store = MemoryTokenStore::with_token(&token);

        assert_eq!(evaluate(&store, now), AuthState::LoggedOut);
        assert_eq!(store.current(), None);
    }

    #[test]
    fn test_expired_tokens_always_logged_out() {
        let now = Utc::now();
        for offset in [0, 1, 59, 3600, 86_400 * 365] {
            let token = make_token(json!({"sub": "x@y.z", "exp": now.timestamp() - offset}));
            let store = MemoryTokenStore::with_token(&token);
            assert_eq!(evaluate(&store, now), AuthState::LoggedOut, "offset {}", offset);
            assert_eq!(store.removals(), 1);
        }
    }

    #[test]
    fn test_malformed_token_removed() {
        let store = MemoryTokenStore::with_token("definitely-not-a-jwt");
        assert_eq!(evaluate(&store, Utc::now()), AuthState::LoggedOut);
        assert_eq!(store.current(), None);
        assert_eq!(store.removals(), 1);
    }

    struct BrokenStore;

    impl TokenStore for BrokenStore {
        fn load(&self) -> Result<Option<String>> {
            Err(anyhow::anyhow!("disk on fire"))
        }

        fn save(&self, _token: &str) -> Result<()> {
            Err(anyhow::anyhow!("disk on fire"))
        }

        fn clear(&self) -> Result<bool> {
            Err(anyhow::anyhow!("disk on fire"))
        }
    }

    #[test]
    fn test_unreadable_store_is_logged_out() {
        assert_eq!(evaluate(&BrokenStore, Utc::now()), AuthState::LoggedOut);
    }
}
