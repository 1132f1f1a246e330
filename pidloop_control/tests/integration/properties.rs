//! Property tests: bounds hold for arbitrary gains and measurement streams.

use pidloop_common::control::{Gains, Polarity, Terms};
use pidloop_control::controller::Controller;
use proptest::prelude::*;

fn gains() -> impl Strategy<Value = Gains> {
    (-50.0..50.0_f64, -50.0..50.0_f64, -5.0..5.0_f64).prop_map(|(kp, ki, kd)| Gains::new(kp, ki, kd))
}

fn limits() -> impl Strategy<Value = (f64, f64)> {
    (-500.0..500.0_f64, 0.1..500.0_f64).prop_map(|(min, width)| (min, min + width))
}

fn polarity() -> impl Strategy<Value = Polarity> {
    prop_oneof![Just(Polarity::Direct), Just(Polarity::Reverse)]
}

proptest! {
    #[test]
    fn output_and_integral_stay_in_bounds(
        gains in gains(),
        polarity in polarity(),
        (out_min, out_max) in limits(),
        (int_min, int_max) in limits(),
        setpoint in -1000.0..1000.0_f64,
        steps in prop::collection::vec((-1000.0..1000.0_f64, 1u32..400), 1..60),
        limits_first in any::<bool>(),
    ) {
        let mut c = Controller::new(polarity);
        if limits_first {
            prop_assert!(c.set_output_limits(out_min, out_max));
            prop_assert!(c.set_integral_limits(int_min, int_max));
            prop_assert!(c.begin(gains, setpoint, 0));
        } else {
            prop_assert!(c.begin(gains, setpoint, 0));
            prop_assert!(c.set_output_limits(out_min, out_max));
            prop_assert!(c.set_integral_limits(int_min, int_max));
        }
        prop_assert!(c.output() >= out_min && c.output() <= out_max);
        prop_assert!(c.integral() >= int_min && c.integral() <= int_max);

        let mut now = 0u32;
        for (measurement, dt) in steps {
            now = now.wrapping_add(dt);
            prop_assert!(c.update(measurement, now).is_ok());
            prop_assert!(c.output() >= out_min && c.output() <= out_max);
            prop_assert!(c.integral() >= int_min && c.integral() <= int_max);
        }
    }

    #[test]
    fn disabled_or_faulted_is_always_neutral(
        gains in gains(),
        measurements in prop::collection::vec(prop_oneof![
            -1000.0..1000.0_f64,
            Just(f64::NAN),
            Just(f64::INFINITY),
        ], 1..40),
        fault_first in any::<bool>(),
    ) {
        let mut c = Controller::new(Polarity::Direct);
        prop_assert!(c.begin(gains, 50.0, 0));
        if fault_first {
            prop_assert!(c.update(f64::NAN, 100).is_err());
        } else {
            c.disable();
        }

        let mut now = 100u32;
        for m in measurements {
            now += 100;
            let _ = c.update(m, now);
            prop_assert_eq!(c.output(), 0.0);
            prop_assert_eq!(c.terms(), Terms::ZERO);
        }
    }

    #[test]
    fn retuning_always_zeroes_integral(
        first in gains(),
        second in gains(),
        steps in 1usize..30,
    ) {
        let mut c = Controller::new(Polarity::Direct);
        prop_assert!(c.begin(first, 100.0, 0));
        for n in 1..=steps {
            let _ = c.update(25.0, n as u32 * 100);
        }
        prop_assert!(c.set_gains(second));
        prop_assert_eq!(c.integral(), 0.0);
    }
}
