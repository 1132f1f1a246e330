//! Integration test: fault latch lifecycle.
//!
//! 1. Armed loop receives a rejected measurement → Faulted, output neutral
//! 2. Faulted loop refuses enable and ignores measurements
//! 3. Clear → Disabled (not re-armed) → enable → normal output

use pidloop_common::control::{Gains, Polarity, Terms};
use pidloop_common::safety::{FaultFlags, MeasurementFault};
use pidloop_common::state::LoopState;
use pidloop_control::controller::{Controller, UpdateOutcome};

fn started(setpoint: f64) -> Controller {
    let mut c = Controller::new(Polarity::Direct);
    assert!(c.begin(Gains::new(2.0, 0.5, 0.0), setpoint, 0));
    c
}

#[test]
fn out_of_range_measurement_faults() {
    let mut c = started(50.0);
    assert!(c.set_range_validation(0.0, 100.0));
    c.update(40.0, 100).unwrap();
    assert!(c.output() > 0.0);

    let err = c.update(150.0, 200).unwrap_err();
    assert_eq!(
        err,
        MeasurementFault::OutOfRange {
            value: 150.0,
            min: 0.0,
            max: 100.0
        }
    );
    assert_eq!(c.state(), LoopState::Faulted);
    assert_eq!(c.output(), 0.0);
    assert_eq!(c.terms(), Terms::ZERO);
    assert_eq!(c.fault(), FaultFlags::OUT_OF_RANGE);
}

#[test]
fn non_finite_faults_regardless_of_other_checks() {
    for (range, stale) in [(false, false), (true, false), (false, true), (true, true)] {
        let mut c = started(50.0);
        if range {
            assert!(c.set_range_validation(-1e9, 1e9));
        }
        if stale {
            assert!(c.set_stale_detection(0.1, 1000));
        }
        for value in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let mut c = c.clone();
            let err = c.update(value, 100).unwrap_err();
            assert!(matches!(err, MeasurementFault::InvalidMeasurement { .. }));
            assert!(c.is_faulted());
        }
        c.disable();
    }
}

#[test]
fn stale_sensor_faults_after_tolerance() {
    let mut c = started(100.0);
    assert!(c.set_stale_detection(0.5, 2000));

    // Frozen reading far from setpoint.
    for t in (100..=2000).step_by(100) {
        assert!(c.update(30.0, t).is_ok(), "rejected early at t={t}");
    }
    // Baseline was recorded at t=100, so the stall exceeds 2000 ms at 2200.
    assert!(c.update(30.0, 2100).is_ok());
    let err = c.update(30.0, 2200).unwrap_err();
    assert!(matches!(err, MeasurementFault::Stale { stalled_ms: 2100, .. }));
    assert_eq!(c.fault(), FaultFlags::STALE_MEASUREMENT);
}

#[test]
fn settled_process_is_never_stale() {
    let mut c = started(100.0);
    assert!(c.set_stale_detection(0.5, 1000));
    for t in (100..=20_000).step_by(100) {
        assert!(c.update(100.2, t).is_ok());
    }
    assert_eq!(c.state(), LoopState::Armed);
}

#[test]
fn moving_process_is_not_stale() {
    let mut c = started(100.0);
    assert!(c.set_stale_detection(0.5, 1000));
    let mut pv = 20.0;
    for t in (100..=10_000).step_by(100) {
        pv += 0.1; // 1 unit/s
        assert!(c.update(pv, t).is_ok());
    }
}

#[test]
fn faulted_loop_holds_neutral_for_any_input() {
    let mut c = started(50.0);
    let _ = c.update(f64::NAN, 100);
    for (t, value) in [(200, 10.0), (300, f64::NAN), (400, 1e12)] {
        assert_eq!(c.update(value, t), Ok(UpdateOutcome::Inactive));
        assert_eq!(c.output(), 0.0);
        assert_eq!(c.terms(), Terms::ZERO);
    }
    assert!(!c.enable(500));
    assert_eq!(c.state(), LoopState::Faulted);
}

#[test]
fn clear_then_enable_recovers_within_one_period() {
    let mut c = started(50.0);
    assert!(c.set_range_validation(0.0, 100.0));
    c.update(150.0, 100).unwrap_err();

    c.clear_fault();
    assert_eq!(c.state(), LoopState::Disabled);
    assert_eq!(c.update(40.0, 150), Ok(UpdateOutcome::Inactive));

    assert!(c.enable(200));
    assert_eq!(c.update(40.0, 250), Ok(UpdateOutcome::Waiting));
    let out = c.update(40.0, 300).unwrap();
    assert!(matches!(out, UpdateOutcome::Sampled(v) if v > 0.0));
}

#[test]
fn clear_resets_stale_baseline() {
    let mut c = started(100.0);
    assert!(c.set_stale_detection(0.5, 1000));
    c.update(30.0, 100).unwrap();
    c.update(30.0, 1200).unwrap_err();

    c.clear_fault();
    assert!(c.enable(60_000));
    // A distant baseline would reject this immediately.
    assert!(c.update(30.0, 60_100).is_ok());
    assert!(c.update(30.0, 60_500).is_ok());
}

#[test]
fn enable_resets_stale_baseline() {
    let mut c = started(100.0);
    assert!(c.set_stale_detection(0.5, 1000));
    c.update(30.0, 100).unwrap();
    c.disable();
    assert!(c.enable(50_000));
    assert!(c.update(30.0, 50_100).is_ok());
}
