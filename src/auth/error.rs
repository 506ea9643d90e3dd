//! Token error types.

use thiserror::Error;

/// Errors raised while reading a bearer token's claims.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Token cannot be split or decoded into JSON claims.
    #[error("Invalid token format: {0}")]
    InvalidTokenFormat(String),

    /// A claim the client depends on is absent or empty.
    #[error("Missing claim: {0}")]
    MissingClaim(&'static str),
}

impl AuthError {
    pub fn invalid_token_format(msg: impl Into<String>) -> Self {
        Self::InvalidTokenFormat(msg.into())
    }
}
