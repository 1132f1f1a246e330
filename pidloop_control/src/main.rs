//! # pidloop Control
//!
//! Runs one supervised PID loop against the simulated first-order process.
//! Loads a loop TOML, performs RT setup, and paces the loop until Ctrl-C or
//! the optional duration elapses. A sensor fault can be scheduled to watch
//! the supervisor latch.

use clap::{Parser, ValueEnum};
use pidloop_common::consts::DEFAULT_CONFIG_PATH;
use pidloop_control::clock::{Clock, MonotonicClock};
use pidloop_control::config::{LoopConfig, load_config};
use pidloop_control::controller::Controller;
use pidloop_control::cycle::{ControlLoop, CycleRunner, rt_setup};
use pidloop_control::sim::plant::{FirstOrderPlant, SensorFault};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

/// Sensor fault to inject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FaultKind {
    /// Reading freezes at its current value.
    Stuck,
    /// Reading becomes NaN.
    Nan,
    /// Reading becomes unavailable.
    Offline,
    /// Reading gains a constant offset (--fault-offset).
    Offset,
}

/// pidloop Control — supervised PID loop on a simulated process
#[derive(Parser, Debug)]
#[command(name = "pidloop_control")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Supervised PID control loop with fault latch")]
struct Args {
    /// Path to the loop configuration TOML.
    #[arg(default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Stop after this many seconds (default: run until Ctrl-C).
    #[arg(long, value_name = "SECONDS")]
    duration_s: Option<u64>,

    /// Inject a sensor fault after this many milliseconds.
    #[arg(long, value_name = "MS", requires = "fault")]
    fault_at_ms: Option<u64>,

    /// Kind of sensor fault to inject.
    #[arg(long, value_enum)]
    fault: Option<FaultKind>,

    /// Offset applied by `--fault offset`.
    #[arg(long, default_value_t = 50.0)]
    fault_offset: f64,

    /// CPU core to pin the loop thread to (default: 1).
    #[arg(long, default_value_t = 1)]
    cpu_core: usize,

    /// SCHED_FIFO priority (default: 80).
    #[arg(long, default_value_t = 80)]
    rt_priority: i32,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    let loaded = load_config(&args.config);

    let level = match (&loaded, args.verbose) {
        (_, true) => Level::DEBUG,
        (Ok(cfg), false) => cfg.shared.log_level.into(),
        (Err(_), false) => Level::INFO,
    };
    setup_tracing(level, args.json);

    info!("pidloop control v{} starting...", env!("CARGO_PKG_VERSION"));

    let result = loaded
        .map_err(|e| Box::new(e) as Box<dyn std::error::Error>)
        .and_then(|config| run(&args, config));
    if let Err(e) = result {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("pidloop control shutdown complete");
}

fn run(args: &Args, config: LoopConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        "Config OK: service={}, cycle_time={}µs, sample_period={}ms",
        config.shared.service_name, config.cycle.cycle_time_us, config.controller.sample_period_ms,
    );

    rt_setup(args.cpu_core, args.rt_priority)?;
    info!(
        "RT setup complete (cpu_core={}, priority={})",
        args.cpu_core, args.rt_priority
    );

    let clock = MonotonicClock::starting_at(config.cycle.clock_start_ms);
    let now = clock.now_ms();
    let mut controller = Controller::from_settings(&config.controller, &config.safety, now)?;
    if !controller.is_enabled() {
        controller.enable(now);
    }

    let step_s = f64::from(config.cycle.cycle_time_us) / 1e6;
    let mut plant = FirstOrderPlant::new(config.plant, step_s);
    if let (Some(at_ms), Some(kind)) = (args.fault_at_ms, args.fault) {
        let fault = match kind {
            FaultKind::Stuck => SensorFault::Stuck,
            FaultKind::Nan => SensorFault::NotANumber,
            FaultKind::Offline => SensorFault::Offline,
            FaultKind::Offset => SensorFault::Offset(args.fault_offset),
        };
        let reads = at_ms * 1000 / u64::from(config.cycle.cycle_time_us);
        plant.schedule_fault(reads, fault);
        info!("Scheduled {fault:?} after {at_ms}ms ({reads} cycles)");
    }

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    })?;

    if let Some(seconds) = args.duration_s {
        let r = running.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_secs(seconds));
            r.store(false, Ordering::SeqCst);
        });
    }

    let mut runner = CycleRunner::new(ControlLoop::new(controller), clock, &config.cycle);
    info!("CycleRunner initialized, entering loop");

    let result = runner.run(&mut plant, &running);

    let stats = runner.stats();
    let ctrl = runner.control().controller();
    let (_, slowest) = stats.busy_range().unwrap_or_default();
    info!(
        "Cycles={} samples={} faults={} overruns={} mean={:?} slowest={:?} worst_latency={:?}",
        stats.cycles,
        stats.samples,
        stats.faults,
        stats.overruns,
        stats.mean_busy(),
        slowest,
        stats.worst_latency(),
    );
    info!(
        "Final: state={:?} pv={:.3} sp={} fault={:?}",
        ctrl.state(),
        plant.process_value(),
        ctrl.setpoint(),
        ctrl.last_fault(),
    );

    result.map_err(|e| {
        error!("Loop error: {e}");
        Box::new(e) as Box<dyn std::error::Error>
    })
}

fn setup_tracing(level: Level, json: bool) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
