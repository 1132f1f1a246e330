//! Configuration file → controller → running loop.

use std::io::Write;
use std::path::Path;

use pidloop_common::config::ConfigError;
use pidloop_common::control::Polarity;
use pidloop_common::state::LoopState;
use pidloop_control::clock::ManualClock;
use pidloop_control::config::{load_config, load_config_from_str};
use pidloop_control::controller::Controller;
use pidloop_control::cycle::{ControlLoop, CycleRunner};
use pidloop_control::sim::plant::FirstOrderPlant;

const LOOP_TOML: &str = r#"
[shared]
service_name = "chiller"

[controller]
setpoint = 5.0
polarity = "reverse"
start_enabled = true
gains = { kp = 10.0, ki = 1.0 }

[safety.range]
enabled = true
min = -30.0
max = 60.0

[plant]
gain = -0.1
time_constant_s = 1.0
ambient = 25.0
"#;

#[test]
fn shipped_config_is_valid() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../config/pidloop.toml");
    let cfg = load_config(&path).unwrap();
    let ctrl = Controller::from_settings(&cfg.controller, &cfg.safety, 0).unwrap();
    assert!(ctrl.is_enabled());
    assert!(cfg.safety.stale.enabled);
}

#[test]
fn config_file_builds_running_loop() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(LOOP_TOML.as_bytes()).unwrap();
    let cfg = load_config(file.path()).unwrap();

    let ctrl = Controller::from_settings(&cfg.controller, &cfg.safety, 0).unwrap();
    assert_eq!(ctrl.polarity(), Polarity::Reverse);
    assert_eq!(ctrl.state(), LoopState::Armed);
    assert_eq!(ctrl.gains().kd, 0.0);
    assert_eq!(ctrl.safety_config().range.max, 60.0);

    let clock = ManualClock::new(0);
    let step_s = f64::from(cfg.cycle.cycle_time_us) / 1e6;
    let mut plant = FirstOrderPlant::new(cfg.plant, step_s);
    let mut runner = CycleRunner::new(ControlLoop::new(ctrl), &clock, &cfg.cycle);
    for _ in 0..3000 {
        clock.advance(10);
        runner.tick(&mut plant);
    }
    // Reverse-acting loop pulls the warm process down toward 5.
    assert!(plant.process_value() < 10.0);
    assert_eq!(runner.stats().faults, 0);
}

#[test]
fn controller_not_armed_without_start_flag() {
    let cfg = load_config_from_str("[shared]\nservice_name = \"idle\"\n").unwrap();
    let ctrl = Controller::from_settings(&cfg.controller, &cfg.safety, 0).unwrap();
    assert_eq!(ctrl.state(), LoopState::Disabled);
    assert_eq!(ctrl.output_limits().max, 255.0);
}

#[test]
fn missing_service_name_rejected() {
    let err = load_config_from_str("[shared]\nservice_name = \"\"\n").unwrap_err();
    assert!(matches!(err, ConfigError::ValidationError(_)));
}

#[test]
fn unparseable_file_rejected() {
    let err = load_config_from_str("[shared\nservice_name=").unwrap_err();
    assert!(matches!(err, ConfigError::ParseError(_)));
}
