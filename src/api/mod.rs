//! REST API client module for the ADaide backend.
//!
//! This module provides the `ApiClient` for signing in, reading the signed-in
//! user's profile and notifying the backend on logout.
//!
//! Authenticated requests carry the JWT bearer token issued by `/auth/login`.

pub mod client;
pub mod error;

pub use client::{is_unauthorized, ApiClient, Profile};
pub use error::ApiError;
