use std::time::{Duration, Instant};

use proptest::prelude::*;
use turret_core::DebounceLatch;

proptest! {
    // Active for every t in (t0, t0 + d], back at rest for every t > t0 + d.
    #[test]
    fn window_is_exact(t0_ms in 0u64..1_000_000, d_ms in 1u64..600_000, at_ms in 0u64..1_200_000) {
        let base = Instant::now();
        let t0 = base + Duration::from_millis(t0_ms);
        let d = Duration::from_millis(d_ms);
        let mut latch = DebounceLatch::new(d);
        prop_assert!(latch.activate(t0, d));

        let t = t0 + Duration::from_millis(at_ms);
        let expected = at_ms <= d_ms;
        prop_assert_eq!(latch.evaluate(t), expected);
        if !expected {
            prop_assert_eq!(latch.expires_at(), None);
        }
    }

    // However often it is re-triggered inside the window, only the first
    // activation is a rising edge and expiry follows the last one.
    #[test]
    fn retriggers_extend_from_the_last_activation(gaps in proptest::collection::vec(0u64..50, 1..20)) {
        let base = Instant::now();
        let hold = Duration::from_millis(60);
        let mut latch = DebounceLatch::new(hold);
        prop_assert!(latch.trigger(base));
        let mut t = base;
        for g in gaps {
            t += Duration::from_millis(g);
            prop_assert!(!latch.trigger(t));
        }
        prop_assert!(latch.evaluate(t + hold));
        prop_assert!(!latch.evaluate(t + hold + Duration::from_millis(1)));
    }
}

#[test]
fn door_hold_of_five_minutes() {
    let base = Instant::now();
    let mut door = DebounceLatch::new(Duration::from_secs(300));
    assert!(!door.evaluate(base));
    door.activate(base + Duration::from_secs(1000), Duration::from_secs(300));
    assert!(door.evaluate(base + Duration::from_secs(1250)));
    assert!(!door.evaluate(base + Duration::from_secs(1301)));
    // Reverted latch can go active again with a fresh edge.
    assert!(door.trigger(base + Duration::from_secs(1400)));
}
