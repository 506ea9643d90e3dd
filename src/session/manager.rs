//! Lifecycle for one mount of the authenticated view.

use std::time::Duration;

use crossterm::event::Event;

use super::clock::SharedClock;
use super::{ActivityMonitor, ExpiryCountdown, LogoutCoordinator};

/// Owns the activity monitor and the countdown for as long as the
/// authenticated view is on screen. Dropping it stops the countdown.
pub struct SessionManager {
    monitor: ActivityMonitor,
    countdown: ExpiryCountdown,
}

impl SessionManager {
    pub fn new(budget: Duration, clock: SharedClock, coordinator: LogoutCoordinator) -> Self {
        let monitor = ActivityMonitor::new(clock);
        let countdown = ExpiryCountdown::new(budget, &monitor, coordinator);
        Self { monitor, countdown }
    }

    /// Begin counting from now.
    pub fn start(&mut self) {
        self.monitor.on_activity();
        self.countdown.start();
    }

    pub fn stop(&mut self) {
        self.countdown.stop();
    }

    pub fn is_running(&self) -> bool {
        self.countdown.is_running()
    }

    /// Route a terminal event to the activity monitor.
    pub fn on_event(&self, event: &Event) -> bool {
        self.monitor.observe(event)
    }

    pub fn remaining(&self) -> Duration {
        self.countdown.remaining()
    }

    pub fn budget(&self) -> Duration {
        self.countdown.budget()
    }
}
