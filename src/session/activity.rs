//! User-presence tracking.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use crossterm::event::{Event, KeyEventKind, MouseEventKind};
use tokio::sync::watch;

use super::clock::SharedClock;

/// Holds the single most recent activity time, read from the wall clock.
///
/// Clones share the same timestamp. The countdown subscribes to it and reads
/// the latest value on every tick.
#[derive(Clone)]
pub struct ActivityMonitor {
    clock: SharedClock,
    last_activity: Arc<watch::Sender<DateTime<Utc>>>,
}

impl ActivityMonitor {
    pub fn new(clock: SharedClock) -> Self {
        let (tx, _rx) = watch::channel(clock.now());
        Self {
            clock,
            last_activity: Arc::new(tx),
        }
    }

    /// Record live user presence now.
    pub fn on_activity(&self) {
        self.last_activity.send_replace(self.clock.now());
    }

    /// Feed a terminal event. Returns true if it counted as activity.
    pub fn observe(&self, event: &Event) -> bool {
        if is_qualifying(event) {
            self.on_activity();
            true
        } else {
            false
        }
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        *self.last_activity.borrow()
    }

    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<DateTime<Utc>> {
        self.last_activity.subscribe()
    }
}

/// Key presses, pointer movement and button presses count; everything else
/// (key release/repeat, scroll, resize, focus, paste) does not.
pub fn is_qualifying(event: &Event) -> bool {
    match event {
        Event::Key(key) => key.kind == KeyEventKind::Press,
        Event::Mouse(mouse) => matches!(mouse.kind, MouseEventKind::Moved | MouseEventKind::Down(_)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::clock::testutil::TestClock;
    use crossterm::event::{
        KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent,
    };
    use std::time::Duration;

    fn mouse(kind: MouseEventKind) -> Event {
        Event::Mouse(MouseEvent {
            kind,
            column: 10,
            row: 5,
            modifiers: KeyModifiers::NONE,
        })
    }

    fn monitor() -> ActivityMonitor {
        ActivityMonitor::new(Arc::new(TestClock::new()))
    }

    #[test]
    fn test_qualifying_events() {
        let press = Event::Key(KeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE));
        assert!(is_qualifying(&press));
        assert!(is_qualifying(&mouse(MouseEventKind::Moved)));
        assert!(is_qualifying(&mouse(MouseEventKind::Down(MouseButton::Left))));
    }

    #[test]
    fn test_non_qualifying_events() {
        let release = Event::Key(KeyEvent::new_with_kind(
            KeyCode::Char('a'),
            KeyModifiers::NONE,
            KeyEventKind::Release,
        ));
        assert!(!is_qualifying(&release));
        assert!(!is_qualifying(&mouse(MouseEventKind::ScrollDown)));
        assert!(!is_qualifying(&mouse(MouseEventKind::Up(MouseButton::Left))));
        assert!(!is_qualifying(&Event::Resize(80, 24)));
        assert!(!is_qualifying(&Event::FocusGained));
    }

    #[tokio::test(start_paused = true)]
    async fn test_on_activity_moves_timestamp_forward() {
        let monitor = monitor();
        let start = monitor.last_activity();

        tokio::time::advance(Duration::from_secs(5)).await;
        monitor.on_activity();
        assert_eq!(monitor.last_activity() - start, chrono::Duration::seconds(5));
        assert_eq!(monitor.last_activity(), monitor.clock().now());
    }

    #[tokio::test(start_paused = true)]
    async fn test_observe_only_resets_on_qualifying_events() {
        let monitor = monitor();
        let start = monitor.last_activity();

        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(!monitor.observe(&Event::Resize(100, 40)));
        assert_eq!(monitor.last_activity(), start);

        assert!(monitor.observe(&mouse(MouseEventKind::Moved)));
        assert_eq!(monitor.last_activity() - start, chrono::Duration::seconds(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clones_share_timestamp() {
        let monitor = monitor();
        let other = monitor.clone();
        let rx = monitor.subscribe();

        tokio::time::advance(Duration::from_secs(2)).await;
        other.on_activity();
        assert_eq!(monitor.last_activity(), other.last_activity());
        assert_eq!(*rx.borrow(), other.last_activity());
    }
}
