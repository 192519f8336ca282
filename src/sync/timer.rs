//! Cancellable one-shot timers driven by an explicit clock
//!
//! Timers never wake anything themselves. The owner asks for the next
//! deadline, sleeps however it likes (a real tokio sleep, or a test simply
//! passing a later `Instant`), then calls [`OneShot::fire`].

use tokio::time::Instant;

/// A timer that fires at most once per arming.
///
/// Re-arming replaces the previous deadline and tag: only the most recently
/// armed timer can ever fire.
#[derive(Debug, Clone)]
pub struct OneShot<T> {
    armed: Option<(Instant, T)>,
}

impl<T> OneShot<T> {
    pub fn new() -> Self {
        Self { armed: None }
    }

    /// Arm (or re-arm) to fire at `deadline`, carrying `tag`
    pub fn arm(&mut self, deadline: Instant, tag: T) {
        self.armed = Some((deadline, tag));
    }

    /// Disarm. Returns the tag of the pending timer, if any.
    pub fn cancel(&mut self) -> Option<T> {
        self.armed.take().map(|(_, tag)| tag)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.armed.as_ref().map(|(deadline, _)| *deadline)
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Fire if the deadline has passed, disarming and returning the tag.
    pub fn fire(&mut self, now: Instant) -> Option<T> {
        let due = matches!(&self.armed, Some((deadline, _)) if *deadline <= now);
        if due {
            self.cancel()
        } else {
            None
        }
    }
}

impl<T> Default for OneShot<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Earliest of several optional deadlines
pub fn earliest(deadlines: impl IntoIterator<Item = Option<Instant>>) -> Option<Instant> {
    deadlines.into_iter().flatten().min()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn fires_once_after_deadline() {
        let t0 = Instant::now();
        let mut timer = OneShot::new();
        timer.arm(t0 + Duration::from_millis(100), "a");

        assert_eq!(timer.fire(t0 + Duration::from_millis(99)), None);
        assert_eq!(timer.fire(t0 + Duration::from_millis(100)), Some("a"));
        assert_eq!(timer.fire(t0 + Duration::from_millis(500)), None);
        assert!(!timer.is_armed());
    }

    #[test]
    fn rearm_replaces_pending_timer() {
        let t0 = Instant::now();
        let mut timer = OneShot::new();
        timer.arm(t0 + Duration::from_millis(100), 1);
        timer.arm(t0 + Duration::from_millis(300), 2);

        assert_eq!(timer.fire(t0 + Duration::from_millis(200)), None);
        assert_eq!(timer.fire(t0 + Duration::from_millis(300)), Some(2));
    }

    #[test]
    fn cancel_prevents_firing() {
        let t0 = Instant::now();
        let mut timer = OneShot::new();
        timer.arm(t0, ());
        assert_eq!(timer.cancel(), Some(()));
        assert_eq!(timer.fire(t0 + Duration::from_secs(1)), None);
        assert_eq!(timer.deadline(), None);
    }

    #[test]
    fn earliest_ignores_unarmed() {
        let t0 = Instant::now();
        let later = t0 + Duration::from_secs(1);
        assert_eq!(earliest([None, Some(later), Some(t0)]), Some(t0));
        assert_eq!(earliest([None, None]), None);
    }
}
