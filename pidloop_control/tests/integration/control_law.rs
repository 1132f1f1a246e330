//! Control law behaviour through the public controller API.

use pidloop_common::control::{Gains, Polarity, Terms};
use pidloop_common::state::LoopState;
use pidloop_control::controller::{Controller, UpdateOutcome};

// ── Helpers ─────────────────────────────────────────────────────────

fn started(polarity: Polarity, gains: Gains, setpoint: f64) -> Controller {
    let mut c = Controller::new(polarity);
    assert!(c.begin(gains, setpoint, 0));
    assert_eq!(c.state(), LoopState::Armed);
    c
}

// ── Tests ───────────────────────────────────────────────────────────

#[test]
fn proportional_reference_case() {
    let mut c = started(Polarity::Direct, Gains::new(2.0, 0.0, 0.0), 100.0);
    assert_eq!(c.update(90.0, 100), Ok(UpdateOutcome::Sampled(20.0)));
    assert_eq!(c.terms(), Terms { p: 20.0, i: 0.0, d: 0.0 });
    assert_eq!(c.output(), 20.0);
}

#[test]
fn proportional_reference_case_after_longer_gap() {
    let mut c = started(Polarity::Direct, Gains::new(2.0, 0.0, 0.0), 100.0);
    assert_eq!(c.update(90.0, 350), Ok(UpdateOutcome::Sampled(20.0)));
}

#[test]
fn reverse_polarity_reference_case() {
    let mut c = started(Polarity::Reverse, Gains::new(2.0, 0.0, 0.0), 100.0);
    assert_eq!(c.update(90.0, 100), Ok(UpdateOutcome::Sampled(0.0)));
    assert_eq!(c.proportional(), -20.0);
}

#[test]
fn reverse_polarity_drives_cooling_output() {
    let mut c = started(Polarity::Reverse, Gains::new(2.0, 0.0, 0.0), 20.0);
    // Measurement above setpoint → positive command under reverse action.
    assert_eq!(c.update(30.0, 100), Ok(UpdateOutcome::Sampled(20.0)));
}

#[test]
fn early_update_changes_nothing() {
    let mut c = started(Polarity::Direct, Gains::new(1.0, 1.0, 1.0), 50.0);
    c.update(40.0, 100).unwrap();
    let before = c.snapshot();

    assert_eq!(c.update(10.0, 199), Ok(UpdateOutcome::Waiting));
    assert_eq!(c.snapshot(), before);

    // Previous measurement must still be 40: D is computed against it.
    c.update(41.0, 200).unwrap();
    assert!((c.derivative() - 10.0).abs() < 1e-9);
}

#[test]
fn retuning_resets_integral() {
    let mut c = started(Polarity::Direct, Gains::new(0.0, 5.0, 0.0), 50.0);
    for t in (100..=1000).step_by(100) {
        c.update(40.0, t).unwrap();
    }
    assert!(c.integral() > 0.0);
    assert!(c.set_gains(Gains::new(1.0, 5.0, 0.0)));
    assert_eq!(c.integral(), 0.0);
}

#[test]
fn integral_windup_is_bounded() {
    let mut c = started(Polarity::Direct, Gains::new(0.0, 10.0, 0.0), 1000.0);
    assert!(c.set_integral_limits(-50.0, 50.0));
    for t in (100..=100_000).step_by(100) {
        c.update(0.0, t).unwrap();
    }
    assert_eq!(c.integral(), 50.0);
    assert_eq!(c.output(), 50.0);

    // Once the error reverses the output starts coming down on the very next
    // sample instead of unwinding a huge accumulator.
    c.update(2000.0, 100_100).unwrap();
    assert!(c.output() < 50.0);
}

#[test]
fn reset_keeps_configuration() {
    let mut c = started(Polarity::Direct, Gains::new(1.0, 1.0, 0.0), 50.0);
    assert!(c.set_output_limits(-10.0, 10.0));
    c.update(40.0, 100).unwrap();
    c.reset(150);
    assert_eq!(c.integral(), 0.0);
    assert_eq!(c.terms(), Terms::ZERO);
    assert_eq!(c.gains(), Gains::new(1.0, 1.0, 0.0));
    assert_eq!(c.setpoint(), 50.0);
    assert_eq!(c.output_limits().max, 10.0);
    assert_eq!(c.update(40.0, 200), Ok(UpdateOutcome::Waiting));
    assert!(matches!(c.update(40.0, 250), Ok(UpdateOutcome::Sampled(_))));
}

#[test]
fn setpoint_change_does_not_kick_derivative() {
    let mut c = started(Polarity::Direct, Gains::new(0.0, 0.0, 10.0), 20.0);
    assert!(c.set_output_limits(-1000.0, 1000.0));
    c.update(20.0, 100).unwrap();
    assert!(c.set_setpoint(80.0));
    c.update(20.0, 200).unwrap();
    assert_eq!(c.derivative(), 0.0);
    assert_eq!(c.output(), 0.0);
}
