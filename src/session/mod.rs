//! Inactivity-based session expiry.
//!
//! While the authenticated view is mounted a [`SessionManager`] owns:
//! - an [`ActivityMonitor`] refreshed by qualifying terminal input
//! - an [`ExpiryCountdown`] that re-derives the remaining time every second
//!   from the wall clock, so time spent suspended still counts
//!
//! When the countdown reaches zero, or the user signs out, the
//! [`LogoutCoordinator`] clears the token, notifies the backend and tells the
//! application to reload.

pub mod activity;
pub mod clock;
pub mod countdown;
pub mod logout;
pub mod manager;

pub use activity::ActivityMonitor;
pub use clock::{system_clock, SharedClock};
pub use countdown::{format_remaining, ExpiryCountdown};
pub use logout::{LogoutCoordinator, LogoutNotifier, LogoutReason, SessionEvent};
pub use manager::SessionManager;
