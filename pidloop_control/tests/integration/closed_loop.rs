//! Closed-loop tests: controller + cycle runner + simulated process.
//!
//! Verifies convergence on a first-order plant and that injected sensor
//! faults latch the loop and drive the actuator to neutral.

use pidloop_common::control::{Gains, Polarity};
use pidloop_common::safety::FaultFlags;
use pidloop_common::state::LoopState;
use pidloop_control::clock::{Clock, ManualClock};
use pidloop_control::config::CycleSettings;
use pidloop_control::controller::Controller;
use pidloop_control::cycle::{ControlLoop, CycleRunner};
use pidloop_control::io::ActuationSink;
use pidloop_control::sim::plant::{FirstOrderPlant, PlantConfig, SensorFault};

const CYCLE_MS: u32 = 10;

/// Plant with a 2 s time constant starting at 20, stepped at the cycle rate.
fn plant() -> FirstOrderPlant {
    FirstOrderPlant::new(
        PlantConfig {
            gain: 1.0,
            time_constant_s: 2.0,
            ambient: 20.0,
        },
        f64::from(CYCLE_MS) / 1000.0,
    )
}

fn reference_controller(setpoint: f64) -> Controller {
    let mut c = Controller::new(Polarity::Direct);
    assert!(c.begin(Gains::new(4.0, 2.0, 0.1), setpoint, 0));
    c
}

/// Run `cycles` cycles, advancing the manual clock by one cycle each time.
fn run_cycles(runner: &mut CycleRunner<&ManualClock>, clock: &ManualClock, plant: &mut FirstOrderPlant, cycles: u32) {
    for _ in 0..cycles {
        clock.advance(CYCLE_MS);
        runner.tick(plant);
    }
}

#[test]
fn converges_to_setpoint() {
    let clock = ManualClock::new(0);
    let mut plant = plant();
    let mut runner = CycleRunner::new(
        ControlLoop::new(reference_controller(60.0)),
        &clock,
        &CycleSettings::default(),
    );

    // 60 s of simulated time.
    run_cycles(&mut runner, &clock, &mut plant, 6000);

    let error = (plant.process_value() - 60.0).abs();
    assert!(error < 0.1, "steady-state error {error}");
    assert_eq!(runner.stats().faults, 0);
    assert_eq!(runner.stats().samples, 600);
}

#[test]
fn stuck_sensor_latches_stale_fault() {
    let clock = ManualClock::new(0);
    let mut plant = plant();
    let mut controller = reference_controller(60.0);
    assert!(controller.set_stale_detection(0.2, 1500));
    let mut runner = CycleRunner::new(ControlLoop::new(controller), &clock, &CycleSettings::default());

    // Inject once the first sample has driven the actuator.
    run_cycles(&mut runner, &clock, &mut plant, 10);
    assert!(plant.drive() > 0.0);
    plant.inject(SensorFault::Stuck);
    run_cycles(&mut runner, &clock, &mut plant, 300);

    let ctrl = runner.control().controller();
    assert_eq!(ctrl.state(), LoopState::Faulted);
    assert_eq!(ctrl.fault(), FaultFlags::STALE_MEASUREMENT);
    assert_eq!(plant.drive(), 0.0);
    assert_eq!(runner.stats().faults, 1);
}

#[test]
fn offline_sensor_latches_invalid_fault() {
    let clock = ManualClock::new(0);
    let mut plant = plant();
    plant.schedule_fault(50, SensorFault::Offline);
    let mut runner = CycleRunner::new(
        ControlLoop::new(reference_controller(60.0)),
        &clock,
        &CycleSettings::default(),
    );

    run_cycles(&mut runner, &clock, &mut plant, 49);
    assert!(plant.drive() > 0.0);
    run_cycles(&mut runner, &clock, &mut plant, 5);

    let ctrl = runner.control().controller();
    assert_eq!(ctrl.fault(), FaultFlags::INVALID_MEASUREMENT);
    assert_eq!(plant.drive(), 0.0);
}

#[test]
fn offset_sensor_trips_range_validation() {
    let clock = ManualClock::new(0);
    let mut plant = plant();
    let mut controller = reference_controller(60.0);
    assert!(controller.set_range_validation(0.0, 1000.0));
    let mut runner = CycleRunner::new(ControlLoop::new(controller), &clock, &CycleSettings::default());

    run_cycles(&mut runner, &clock, &mut plant, 100);
    plant.inject(SensorFault::Offset(2000.0));
    run_cycles(&mut runner, &clock, &mut plant, 1);

    assert_eq!(runner.control().controller().fault(), FaultFlags::OUT_OF_RANGE);
    assert_eq!(plant.drive(), 0.0);
}

#[test]
fn recovery_after_clear_and_enable() {
    let clock = ManualClock::new(0);
    let mut plant = plant();
    let mut runner = CycleRunner::new(
        ControlLoop::new(reference_controller(60.0)),
        &clock,
        &CycleSettings::default(),
    );

    plant.inject(SensorFault::NotANumber);
    run_cycles(&mut runner, &clock, &mut plant, 1);
    assert!(runner.control().controller().is_faulted());

    plant.inject(SensorFault::Healthy);
    let ctrl = runner.control_mut().controller_mut();
    ctrl.clear_fault();
    assert!(ctrl.enable(clock.now_ms()));

    run_cycles(&mut runner, &clock, &mut plant, 10);
    assert!(runner.control().controller().is_enabled());
    assert!(plant.drive() > 0.0);
}

#[test]
fn disable_through_loop_writes_neutral() {
    let clock = ManualClock::new(0);
    let mut plant = plant();
    let mut runner = CycleRunner::new(
        ControlLoop::new(reference_controller(60.0)),
        &clock,
        &CycleSettings::default(),
    );
    run_cycles(&mut runner, &clock, &mut plant, 20);
    assert!(plant.drive() > 0.0);

    runner.control_mut().disable(&mut plant);
    assert_eq!(plant.drive(), 0.0);

    plant.write(12.0);
    run_cycles(&mut runner, &clock, &mut plant, 20);
    // Output did not change (still neutral), so no further write happened.
    assert_eq!(plant.drive(), 12.0);
}
