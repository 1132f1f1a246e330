//! # pidloop Tune
//!
//! Runs the simulated loop from a loop TOML and exposes it over the
//! line-delimited JSON tuning protocol on stdin/stdout. Logs go to stderr.

use clap::Parser;
use pidloop_common::consts::DEFAULT_CONFIG_PATH;
use pidloop_control::clock::{Clock, MonotonicClock};
use pidloop_control::controller::Controller;
use pidloop_control::cycle::ControlLoop;
use pidloop_control::sim::plant::FirstOrderPlant;
use pidloop_tune::config::{TuneConfig, load_config};
use pidloop_tune::session::TuneSession;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Duration;
use tracing::{Level, debug, error, info};
use tracing_subscriber::EnvFilter;

/// pidloop Tune — JSON tuning channel for a simulated loop
#[derive(Parser, Debug)]
#[command(name = "pidloop_tune")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Line-delimited JSON tuning interface over stdin/stdout")]
struct Args {
    /// Path to the loop configuration TOML.
    #[arg(default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

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
        (Ok(cfg), false) => cfg.loop_config.shared.log_level.into(),
        (Err(_), false) => Level::INFO,
    };
    setup_tracing(level, args.json);

    info!("pidloop tune v{} starting...", env!("CARGO_PKG_VERSION"));

    let result = loaded
        .map_err(|e| Box::new(e) as Box<dyn std::error::Error>)
        .and_then(run);
    if let Err(e) = result {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("pidloop tune shutdown complete");
}

fn run(config: TuneConfig) -> Result<(), Box<dyn std::error::Error>> {
    let loop_config = &config.loop_config;
    info!(
        "Config OK: service={}, data_interval={}ms, step_test={}ms",
        loop_config.shared.service_name,
        config.tune.data_interval_ms,
        config.tune.step_test_duration_ms,
    );

    let clock = MonotonicClock::starting_at(loop_config.cycle.clock_start_ms);
    let controller = Controller::from_settings(&loop_config.controller, &loop_config.safety, clock.now_ms())?;
    let mut control = ControlLoop::new(controller);

    let step_s = f64::from(loop_config.cycle.cycle_time_us) / 1e6;
    let mut plant = FirstOrderPlant::new(loop_config.plant, step_s);
    let cycle = Duration::from_micros(u64::from(loop_config.cycle.cycle_time_us));

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    })?;

    let input = spawn_stdin_reader(running.clone());
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let mut session = TuneSession::new(&config.tune);
    session.begin(control.controller(), clock.now_ms(), &mut out)?;
    out.flush()?;

    let mut incoming = Vec::new();
    while running.load(Ordering::SeqCst) {
        let now = clock.now_ms();
        let report = control.step(&mut plant, now);

        incoming.clear();
        loop {
            match input.try_recv() {
                Ok(chunk) => incoming.extend_from_slice(&chunk),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    info!("Input closed");
                    running.store(false, Ordering::SeqCst);
                    break;
                }
            }
        }

        let pv = report.measurement.unwrap_or(f64::NAN);
        session.service(control.controller_mut(), &incoming, pv, now, &mut out)?;
        // Commands may have changed the output (stop, reset).
        control.sync_output(&mut plant);
        out.flush()?;

        thread::sleep(cycle);
    }

    control.disable(&mut plant);
    let ctrl = control.controller();
    info!(
        "Final: state={:?} pv={:.3} sp={} fault={:?}",
        ctrl.state(),
        plant.process_value(),
        ctrl.setpoint(),
        ctrl.last_fault(),
    );
    Ok(())
}

/// Forward raw stdin chunks to the loop thread.
fn spawn_stdin_reader(running: Arc<AtomicBool>) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut stdin = io::stdin();
        let mut buf = [0u8; 256];
        while running.load(Ordering::SeqCst) {
            match stdin.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    if tx.send(buf[..n].to_vec()).is_err() {
                        break;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    debug!("stdin read failed: {e}");
                    break;
                }
            }
        }
    });
    rx
}

fn setup_tracing(level: Level, json: bool) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .compact()
            .init();
    }
}
