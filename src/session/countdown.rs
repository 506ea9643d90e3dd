//! Inactivity countdown.
//!
//! Every tick re-derives `remaining = budget - (now - last_activity)` from the
//! shared activity timestamp and the wall clock, so there is no counter to
//! drift and a suspended machine wakes up to the time it actually missed.
//! The tokio interval only decides when to look.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};

use super::clock::SharedClock;
use super::{ActivityMonitor, LogoutCoordinator, LogoutReason};

/// Countdown tick period; also the display refresh rate.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

pub struct ExpiryCountdown {
    budget: Duration,
    clock: SharedClock,
    activity: watch::Receiver<DateTime<Utc>>,
    remaining: Arc<watch::Sender<Duration>>,
    coordinator: LogoutCoordinator,
    task: Option<JoinHandle<()>>,
}

impl ExpiryCountdown {
    pub fn new(budget: Duration, monitor: &ActivityMonitor, coordinator: LogoutCoordinator) -> Self {
        let (remaining, _rx) = watch::channel(budget);
        Self {
            budget,
            clock: monitor.clock().clone(),
            activity: monitor.subscribe(),
            remaining: Arc::new(remaining),
            coordinator,
            task: None,
        }
    }

    /// Spawn the tick task. No-op if it is already running.
    pub fn start(&mut self) {
        if self.is_running() {
            debug!("Countdown already running");
            return;
        }
        debug!(budget_secs = self.budget.as_secs(), "Starting countdown");
        self.task = Some(tokio::spawn(run(
            self.budget,
            self.clock.clone(),
            self.activity.clone(),
            self.remaining.clone(),
            self.coordinator.clone(),
        )));
    }

    /// Cancel the tick task immediately.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("Countdown stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Remaining time as of the last tick.
    pub fn remaining(&self) -> Duration {
        *self.remaining.borrow()
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }
}

impl Drop for ExpiryCountdown {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run(
    budget: Duration,
    clock: SharedClock,
    activity: watch::Receiver<DateTime<Utc>>,
    remaining: Arc<watch::Sender<Duration>>,
    coordinator: LogoutCoordinator,
) {
    let mut ticker = time::interval(TICK_PERIOD);
    // A stalled process catches up with one tick, not a burst
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        let last_activity = *activity.borrow();
        let left = remaining_at(budget, last_activity, clock.now());
        remaining.send_replace(left);
        if left.is_zero() {
            break;
        }
    }

    info!(budget_secs = budget.as_secs(), "Inactivity budget exhausted");
    coordinator.logout(LogoutReason::Expired).await;
}

/// Time left before forced logout, saturating at zero. A clock set back
/// behind the last activity counts as no idle time.
pub fn remaining_at(budget: Duration, last_activity: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    let idle = (now - last_activity).to_std().unwrap_or(Duration::ZERO);
    budget.saturating_sub(idle)
}

/// Format as `MMm SSs`.
pub fn format_remaining(remaining: Duration) -> String {
    let total = remaining.as_secs();
    format!("{:02}m {:02}s", total / 60, total % 60)
}
