//! Session termination.
//!
//! Ordering is fixed: the local token goes first, then the backend is told,
//! then the application is asked to show the reason and reload. Only the first
//! of any number of concurrent calls does anything.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures::future::BoxFuture;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::auth::TokenStore;

/// Upper bound on waiting for the backend to acknowledge a logout.
const LOGOUT_NOTIFY_TIMEOUT: Duration = Duration::from_secs(5);

/// Best-effort server-side session invalidation.
pub trait LogoutNotifier: Send + Sync {
    fn notify_logout(&self) -> BoxFuture<'_, Result<()>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
    /// The user asked to sign out
    UserInitiated,
    /// The inactivity budget ran out
    Expired,
    /// The backend rejected the token
    Unauthorized,
}

impl LogoutReason {
    /// Text shown to the user before the application reloads.
    pub fn message(&self, server_notified: bool) -> &'static str {
        match self {
            LogoutReason::UserInitiated if server_notified => "You have been signed out.",
            LogoutReason::UserInitiated => {
                "Signing out hit an error, but your session has been ended."
            }
            LogoutReason::Expired => {
                "You were signed out due to inactivity. Please sign in again."
            }
            LogoutReason::Unauthorized => {
                "Your session has expired or sign-in is required. Please sign in again."
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedOut {
        reason: LogoutReason,
        server_notified: bool,
    },
}

impl SessionEvent {
    pub fn message(&self) -> &'static str {
        match self {
            SessionEvent::LoggedOut {
                reason,
                server_notified,
            } => reason.message(*server_notified),
        }
    }
}

struct Inner {
    store: Arc<dyn TokenStore>,
    notifier: Arc<dyn LogoutNotifier>,
    events: mpsc::UnboundedSender<SessionEvent>,
    in_flight: AtomicBool,
}

/// Shared by the countdown task and the input handler. Clones share one guard.
#[derive(Clone)]
pub struct LogoutCoordinator {
    inner: Arc<Inner>,
}

impl LogoutCoordinator {
    pub fn new(
        store: Arc<dyn TokenStore>,
        notifier: Arc<dyn LogoutNotifier>,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                notifier,
                events,
                in_flight: AtomicBool::new(false),
            }),
        }
    }

    /// True once any logout has started.
    pub fn has_logged_out(&self) -> bool {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    /// Terminate the session. Returns false if another call already did.
    pub async fn logout(&self, reason: LogoutReason) -> bool {
        if self.inner.in_flight.swap(true, Ordering::SeqCst) {
            debug!(?reason, "Logout already in progress, ignoring");
            return false;
        }
        info!(?reason, "Logging out");

        match self.inner.store.clear() {
            Ok(true) => debug!("Token removed"),
            Ok(false) => debug!("No token to remove"),
            Err(e) => warn!(error = %e, "Failed to remove token"),
        }

        let server_notified =
            match tokio::time::timeout(LOGOUT_NOTIFY_TIMEOUT, self.inner.notifier.notify_logout())
                .await
            {
                Ok(Ok(())) => true,
                Ok(Err(e)) => {
                    warn!(error = %e, "Logout notification failed");
                    false
                }
                Err(_) => {
                    warn!(
                        timeout_secs = LOGOUT_NOTIFY_TIMEOUT.as_secs(),
                        "Logout notification timed out"
                    );
                    false
                }
            };

        let event = SessionEvent::LoggedOut {
            reason,
            server_notified,
        };
        if self.inner.events.send(event).is_err() {
            debug!("Session event receiver gone");
        }
        true
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::future::FutureExt;

    use super::*;

    /// Counts notifications. Yields once before answering so concurrent
    /// callers get a chance to interleave.
    #[derive(Default)]
    pub struct CountingNotifier {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingNotifier {
        pub fn failing() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: true,
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl LogoutNotifier for CountingNotifier {
        fn notify_logout(&self) -> BoxFuture<'_, Result<()>> {
            async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                tokio::task::yield_now().await;
                if self.fail {
                    Err(anyhow::anyhow!("connection refused"))
                } else {
                    Ok(())
                }
            }
            .boxed()
        }
    }

    /// Never answers.
    pub struct HangingNotifier;

    impl LogoutNotifier for HangingNotifier {
        fn notify_logout(&self) -> BoxFuture<'_, Result<()>> {
            futures::future::pending().boxed()
        }
    }
}
