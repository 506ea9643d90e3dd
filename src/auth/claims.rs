//! JWT claims decoding.
//!
//! The client never verifies the token signature: it only reads the payload
//! to learn who is signed in and when the token stops being valid. The server
//! remains the authority on every authenticated request.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

use super::AuthError;

/// Claims consumed from the token payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenClaims {
    /// Subject - the account email.
    #[serde(default)]
    pub sub: String,
    /// Granted roles. Issued either as a JSON array or as a comma-joined string.
    #[serde(default, deserialize_with = "deserialize_roles")]
    pub auth: Vec<String>,
    /// Expiration time (seconds since epoch).
    pub exp: Option<i64>,
}

/// Identity of the signed-in user for the rest of the application session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub email: String,
    pub roles: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawRoles {
    List(Vec<String>),
    Joined(String),
}

fn deserialize_roles<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawRoles>::deserialize(deserializer)?;
    let roles = match raw {
        None => Vec::new(),
        Some(RawRoles::List(list)) => list,
        Some(RawRoles::Joined(joined)) => joined.split(',').map(str::to_string).collect(),
    };
    Ok(roles
        .into_iter()
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .collect())
}

impl TokenClaims {
    /// Expiry claim. Present on every successfully decoded token.
    pub fn expires_at_secs(&self) -> i64 {
        self.exp.unwrap_or(0)
    }

    /// A token whose expiry is at or before `now` no longer grants access.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at_secs() <= now.timestamp()
    }

    pub fn identity(&self) -> Identity {
        Identity {
            email: self.sub.clone(),
            roles: self.auth.clone(),
        }
    }
}

/// Decode the claims of a JWT without verifying its signature.
///
/// # Errors
///
/// Returns [`AuthError::InvalidTokenFormat`] when the token does not have three
/// dot-separated parts or the payload is not base64url-encoded JSON, and
/// [`AuthError::MissingClaim`] when `sub` or `exp` is absent.
pub fn decode_claims(token: &str) -> Result<TokenClaims, AuthError> {
    let parts: Vec<&str> = token.trim().split('.').collect();
    if parts.len() != 3 {
        return Err(AuthError::invalid_token_format(
            "JWT must have 3 parts separated by dots",
        ));
    }

    // Some issuers keep the base64 padding
    let payload = parts[1].trim_end_matches('=');
    let payload_bytes = URL_SAFE_NO_PAD.decode(payload).map_err(|e| {
        AuthError::invalid_token_format(format!("Failed to decode JWT payload: {}", e))
    })?;

    let claims: TokenClaims = serde_json::from_slice(&payload_bytes).map_err(|e| {
        AuthError::invalid_token_format(format!("Failed to parse JWT claims: {}", e))
    })?;

    if claims.sub.trim().is_empty() {
        return Err(AuthError::MissingClaim("sub"));
    }
    if claims.exp.is_none() {
        return Err(AuthError::MissingClaim("exp"));
    }

    Ok(claims)
}


#[cfg(test)]
mod tests {
    use super::testutil::make_token;
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    #[test]
    fn test_decode_roles_as_list() {
        let token = make_token(json!({"sub": "a@b.com", "auth": ["USER"], "exp": 4102444800_i64}));
        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.sub, "a@b.com");
        assert_eq!(claims.auth, vec!["USER".to_string()]);
        assert_eq!(claims.exp, Some(4102444800));
    }

    #[test]
    fn test_decode_roles_as_joined_string() {
        let token = make_token(json!({"sub": "a@b.com", "auth": "ROLE_USER, ROLE_ADMIN,", "exp": 1}));
        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.auth, vec!["ROLE_USER".to_string(), "ROLE_ADMIN".to_string()]);
    }

    #[test]
    fn test_decode_missing_roles() {
        let token = make_token(json!({"sub": "a@b.com", "exp": 1}));
        let claims = decode_claims(&token).unwrap();
        assert!(claims.auth.is_empty());
    }

    #[test]
    fn test_decode_rejects_wrong_part_count() {
        assert!(matches!(
            decode_claims("not-a-token"),
            Err(AuthError::InvalidTokenFormat(_))
        ));
        assert!(matches!(
            decode_claims("a.b.c.d"),
            Err(AuthError::InvalidTokenFormat(_))
        ));
    }

    #[test]
    fn test_decode_rejects_garbage_payload() {
        assert!(matches!(
            decode_claims("eyJhbGciOiJIUzUxMiJ9.!!!.sig"),
            Err(AuthError::InvalidTokenFormat(_))
        ));
        let not_json = format!("h.{}.s", URL_SAFE_NO_PAD.encode("hello"));
        assert!(matches!(
            decode_claims(&not_json),
            Err(AuthError::InvalidTokenFormat(_))
        ));
    }

    #[test]
    fn test_decode_requires_sub_and_exp() {
        let no_sub = make_token(json!({"exp": 1}));
        assert!(matches!(decode_claims(&no_sub), Err(AuthError::MissingClaim("sub"))));

        let no_exp = make_token(json!({"sub": "a@b.com"}));
        assert!(matches!(decode_claims(&no_exp), Err(AuthError::MissingClaim("exp"))));
    }

    #[test]
    fn test_is_expired_at_boundary() {
        let now = Utc::now();
        let claims = TokenClaims {
            sub: "a@b.com".to_string(),
            auth: vec![],
            exp: Some(now.timestamp()),
        };
        assert!(claims.is_expired_at(now));
        assert!(!claims.is_expired_at(now - Duration::seconds(1)));
    }
}
