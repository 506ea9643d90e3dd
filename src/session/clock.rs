//! Wall-clock source for the inactivity budget.
//!
//! Activity stamps and the countdown both read wall time, so time spent with
//! the machine suspended counts against the session. Monotonic clocks stop
//! while suspended.

use std::sync::Arc;

use chrono::{DateTime, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

pub type SharedClock = Arc<dyn Clock>;

pub fn system_clock() -> SharedClock {
    Arc::new(SystemClock)
}

#[cfg(test)]
pub(crate) mod testutil {
    use std::sync::Mutex;
    use std::time::Duration;

    use chrono::{DateTime, TimeZone, Utc};
    use tokio::time::Instant;

    use super::Clock;

    /// Wall clock that follows tokio's (possibly paused) time, plus any
    /// jumps applied with [`TestClock::jump`] to stand in for a suspend.
    pub struct TestClock {
        base: DateTime<Utc>,
        start: Instant,
        skew: Mutex<Duration>,
    }

    impl TestClock {
        pub fn new() -> Self {
            Self {
                base: Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap(),
                start: Instant::now(),
                skew: Mutex::new(Duration::ZERO),
            }
        }

        /// Move wall time forward without moving tokio time.
        pub fn jump(&self, by: Duration) {
            *self.skew.lock().unwrap() += by;
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> DateTime<Utc> {
            let elapsed = self.start.elapsed() + *self.skew.lock().unwrap();
            self.base + chrono::Duration::from_std(elapsed).unwrap()
        }
    }
}
