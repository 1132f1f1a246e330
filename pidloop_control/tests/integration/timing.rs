//! Sample timing across the 32-bit millisecond counter wrap.

use pidloop_common::control::{Gains, Polarity};
use pidloop_control::clock::{Clock, ManualClock};
use pidloop_control::controller::{Controller, UpdateOutcome};

const NEAR_WRAP: u32 = u32::MAX - 149;

#[test]
fn sample_period_respected_across_wrap() {
    let clock = ManualClock::new(NEAR_WRAP);
    let mut c = Controller::new(Polarity::Direct);
    assert!(c.begin(Gains::new(0.0, 1.0, 0.0), 10.0, clock.now_ms()));

    let mut sampled_at = Vec::new();
    for _ in 0..40 {
        clock.advance(10);
        if let Ok(UpdateOutcome::Sampled(_)) = c.update(0.0, clock.now_ms()) {
            sampled_at.push(clock.now_ms());
        }
    }
    // Samples every 100 ms: NEAR_WRAP + 100, then +200 (wrapped to 50) ...
    assert_eq!(sampled_at, vec![NEAR_WRAP + 100, 50, 150, 250]);

    // Every sample saw dt = 0.1 s: integral = 4 * 1 * 10 * 0.1.
    assert!((c.integral() - 4.0).abs() < 1e-9);
}

#[test]
fn derivative_uses_wrapped_interval() {
    let mut c = Controller::new(Polarity::Direct);
    assert!(c.begin(Gains::new(0.0, 0.0, 1.0), 100.0, NEAR_WRAP));
    assert!(c.set_output_limits(-1000.0, 1000.0));
    c.update(10.0, NEAR_WRAP + 100).unwrap();
    c.update(20.0, 50).unwrap();
    // 10 units over 200 ms would be 50/s; the real interval is 100 ms.
    assert!((c.derivative() - 100.0).abs() < 1e-9);
}

#[test]
fn stale_tolerance_across_wrap() {
    let mut c = Controller::new(Polarity::Direct);
    assert!(c.begin(Gains::new(1.0, 0.0, 0.0), 100.0, NEAR_WRAP));
    assert!(c.set_stale_detection(0.5, 500));
    c.update(20.0, NEAR_WRAP + 50).unwrap();
    assert!(c.update(20.0, 400).is_ok());
    assert!(c.update(20.0, 500).is_err());
}
