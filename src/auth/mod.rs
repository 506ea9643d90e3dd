//! Authentication module for the client-side session.
//!
//! This module provides:
//! - `TokenStore`: the single persistent slot holding the bearer token
//! - `TokenClaims` / `Identity`: claims decoded from the token payload
//! - `gate`: the once-per-load decision whether a stored token still grants access
//!
//! Presence of a token is the only "logged in" signal; its `exp` claim is authoritative.

pub mod claims;
pub mod error;
pub mod gate;
pub mod token_store;

pub use claims::{decode_claims, Identity, TokenClaims};
pub use error::AuthError;
pub use gate::AuthState;
pub use token_store::{open_token_store, TokenStore};
