//! Self-reverting boolean used to debounce door, motion and person triggers.
//!
//! A latch rests in its default state until activated. Activation flips the
//! value and arms a single expiry at `now + hold`; the first evaluation
//! strictly after that instant reverts the value and clears the expiry.
//!
//! Re-activating a latch that is already active extends the window to
//! `now + hold` without flipping the value again and without reporting a
//! rising edge, so one physical event that keeps its sensor asserted
//! produces exactly one alert.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceLatch {
    value: bool,
    at_rest: bool,
    expires_at: Option<Instant>,
    hold: Duration,
}

impl DebounceLatch {
    /// Latch resting at `false` with the given default hold window.
    pub fn new(hold: Duration) -> Self {
        Self::with_rest_state(false, hold)
    }

    pub fn with_rest_state(at_rest: bool, hold: Duration) -> Self {
        Self {
            value: at_rest,
            at_rest,
            expires_at: None,
            hold,
        }
    }

    /// Current value, reverting to the rest state first if the window has elapsed.
    pub fn evaluate(&mut self, now: Instant) -> bool {
        if let Some(exp) = self.expires_at
            && now > exp
        {
            self.expires_at = None;
            self.value = self.at_rest;
        }
        self.value
    }

    /// Flip away from the rest state for `hold`. Returns true on a rising edge.
    pub fn activate(&mut self, now: Instant, hold: Duration) -> bool {
        let rising = !self.is_active(now);
        // Unrepresentable instants keep the previous expiry rather than expiring early.
        let expires = now.checked_add(hold).or(self.expires_at).unwrap_or(now);
        self.expires_at = Some(expires);
        self.value = !self.at_rest;
        rising
    }

    /// `activate` with the latch's configured hold window.
    pub fn trigger(&mut self, now: Instant) -> bool {
        self.activate(now, self.hold)
    }

    pub fn is_active(&mut self, now: Instant) -> bool {
        self.evaluate(now) != self.at_rest
    }

    /// Time left in the current window, if active.
    pub fn remaining(&mut self, now: Instant) -> Option<Duration> {
        if !self.is_active(now) {
            return None;
        }
        self.expires_at.map(|exp| exp.saturating_duration_since(now))
    }

    pub fn expires_at(&self) -> Option<Instant> {
        self.expires_at
    }

    pub fn hold(&self) -> Duration {
        self.hold
    }

    /// Drop any pending window and return to the rest state.
    pub fn reset(&mut self) {
        self.expires_at = None;
        self.value = self.at_rest;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn door_window_scenario() {
        let base = Instant::now();
        let mut latch = DebounceLatch::new(secs(300));
        assert!(latch.activate(base + secs(1000), secs(300)));
        assert!(latch.evaluate(base + secs(1250)));
        assert!(latch.evaluate(base + secs(1300)), "window end is inclusive");
        assert!(!latch.evaluate(base + secs(1301)));
        assert_eq!(latch.expires_at(), None);
    }

    #[test]
    fn retrigger_extends_without_second_edge() {
        let base = Instant::now();
        let mut latch = DebounceLatch::new(secs(10));
        assert!(latch.trigger(base));
        assert!(!latch.trigger(base + secs(8)), "still active: no new edge");
        assert!(latch.evaluate(base + secs(15)), "window was extended to t=18");
        assert!(!latch.evaluate(base + secs(19)));
        assert!(latch.trigger(base + secs(20)), "new edge after expiry");
    }

    #[test]
    fn retrigger_never_toggles_value_back() {
        let base = Instant::now();
        let mut latch = DebounceLatch::new(secs(5));
        latch.trigger(base);
        latch.trigger(base + secs(1));
        latch.trigger(base + secs(2));
        assert!(latch.evaluate(base + secs(3)));
    }

    #[test]
    fn rest_state_true_inverts_semantics() {
        let base = Instant::now();
        let mut latch = DebounceLatch::with_rest_state(true, secs(2));
        assert!(latch.evaluate(base));
        assert!(latch.trigger(base));
        assert!(!latch.evaluate(base + secs(1)));
        assert!(latch.is_active(base + secs(1)));
        assert!(latch.evaluate(base + secs(3)));
    }

    #[test]
    fn remaining_and_reset() {
        let base = Instant::now();
        let mut latch = DebounceLatch::new(secs(60));
        assert_eq!(latch.remaining(base), None);
        latch.trigger(base);
        assert_eq!(latch.remaining(base + secs(15)), Some(secs(45)));
        latch.reset();
        assert!(!latch.evaluate(base + secs(16)));
        assert_eq!(latch.expires_at(), None);
    }
}
