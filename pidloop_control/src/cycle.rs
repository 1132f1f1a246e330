//! Deterministic cycle: read → supervise/compute → write.
//!
//! ## Cycle Loop
//! With the `rt` feature, absolute-time sleep on `CLOCK_MONOTONIC`;
//! otherwise `std::thread::sleep` for the remaining cycle time. The loop
//! stops when the shared `running` flag is cleared, after writing neutral
//! output to the actuator.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use pidloop_common::safety::MeasurementFault;
use pidloop_common::time::{Millis, elapsed_ms};
use thiserror::Error;
use tracing::info;

use crate::clock::Clock;
use crate::config::CycleSettings;
use crate::controller::{Controller, UpdateOutcome};
use crate::io::{ActuationSink, MeasurementSource};

// ─── Cycle Statistics ───────────────────────────────────────────────

/// Wall-clock timing of one paced cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleTiming {
    /// Time spent in the cycle body.
    pub busy: Duration,
    /// Distance between the scheduled and the actual wake-up.
    pub wake_latency: Duration,
}

/// Running per-cycle counters. O(1), no allocation.
#[derive(Debug, Clone)]
pub struct CycleStats {
    budget: Duration,
    /// Cycles executed, paced or not.
    pub cycles: u64,
    /// Cycles in which the control law produced a new sample.
    pub samples: u64,
    /// Measurements rejected by the supervisor.
    pub faults: u64,
    /// Timed cycles whose body exceeded the budget.
    pub overruns: u64,
    timed: u64,
    busy_total: Duration,
    busy_range: Option<(Duration, Duration)>,
    worst_latency: Duration,
}

impl CycleStats {
    pub const fn new(budget: Duration) -> Self {
        Self {
            budget,
            cycles: 0,
            samples: 0,
            faults: 0,
            overruns: 0,
            timed: 0,
            busy_total: Duration::ZERO,
            busy_range: None,
            worst_latency: Duration::ZERO,
        }
    }

    /// Account for one cycle. `timing` is `None` for unpaced ticks.
    ///
    /// Returns true if the cycle body overran the budget.
    pub fn record(
        &mut self,
        outcome: &Result<UpdateOutcome, MeasurementFault>,
        timing: Option<CycleTiming>,
    ) -> bool {
        self.cycles += 1;
        match outcome {
            Ok(UpdateOutcome::Sampled(_)) => self.samples += 1,
            Err(_) => self.faults += 1,
            Ok(_) => {}
        }

        let Some(CycleTiming { busy, wake_latency }) = timing else {
            return false;
        };
        self.timed += 1;
        self.busy_total += busy;
        self.busy_range = Some(match self.busy_range {
            Some((lo, hi)) => (lo.min(busy), hi.max(busy)),
            None => (busy, busy),
        });
        self.worst_latency = self.worst_latency.max(wake_latency);

        let overran = busy > self.budget;
        if overran {
            self.overruns += 1;
        }
        overran
    }

    #[inline]
    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Mean body time over timed cycles (zero before the first one).
    pub fn mean_busy(&self) -> Duration {
        match self.timed {
            0 => Duration::ZERO,
            n => Duration::from_nanos((self.busy_total.as_nanos() / u128::from(n)) as u64),
        }
    }

    /// Fastest and slowest body time seen.
    #[inline]
    pub fn busy_range(&self) -> Option<(Duration, Duration)> {
        self.busy_range
    }

    #[inline]
    pub fn worst_latency(&self) -> Duration {
        self.worst_latency
    }
}

// ─── RT Setup ───────────────────────────────────────────────────────

/// Errors during RT setup or cycle execution.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("{call} failed: {reason}")]
    RtSetup { call: &'static str, reason: String },
    /// Fatal only in RT builds; simulation counts overruns instead.
    #[cfg(feature = "rt")]
    #[error("cycle overrun: {actual:?} > {budget:?} budget")]
    CycleOverrun { actual: Duration, budget: Duration },
}

const STACK_PREFAULT_BYTES: usize = 256 * 1024;

/// Touch the stack once so the loop does not page-fault on first use.
fn prefault_stack() {
    let mut frame = [0u8; STACK_PREFAULT_BYTES];
    std::hint::black_box(&mut frame).fill(0xFF);
}

#[cfg(feature = "rt")]
mod rt {
    use nix::errno::Errno;
    use nix::sched::{CpuSet, sched_setaffinity};
    use nix::sys::mman::{MlockallFlags, mlockall};
    use nix::unistd::Pid;

    use super::CycleError;

    fn failed(call: &'static str) -> impl FnOnce(Errno) -> CycleError {
        move |e| CycleError::RtSetup {
            call,
            reason: e.to_string(),
        }
    }

    pub(super) fn lock_memory() -> Result<(), CycleError> {
        mlockall(MlockallFlags::MCL_CURRENT | MlockallFlags::MCL_FUTURE).map_err(failed("mlockall"))
    }

    pub(super) fn pin_to_core(cpu: usize) -> Result<(), CycleError> {
        let mut set = CpuSet::new();
        set.set(cpu).map_err(failed("CpuSet::set"))?;
        sched_setaffinity(Pid::from_raw(0), &set).map_err(failed("sched_setaffinity"))
    }

    pub(super) fn set_fifo_priority(priority: i32) -> Result<(), CycleError> {
        let param = libc::sched_param {
            sched_priority: priority,
        };
        // SAFETY: pid 0 is the calling thread; `param` outlives the call.
        if unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) } != 0 {
            return Err(failed("sched_setscheduler")(Errno::last()));
        }
        Ok(())
    }
}

/// Prepare the calling thread for the cycle loop. Call once before
/// [`CycleRunner::run`].
///
/// With the `rt` feature: lock memory, prefault the stack, pin to
/// `cpu_core` and switch to SCHED_FIFO at `rt_priority`. Otherwise only
/// the stack is prefaulted.
pub fn rt_setup(cpu_core: usize, rt_priority: i32) -> Result<(), CycleError> {
    #[cfg(feature = "rt")]
    rt::lock_memory()?;
    prefault_stack();
    #[cfg(feature = "rt")]
    {
        rt::pin_to_core(cpu_core)?;
        rt::set_fifo_priority(rt_priority)?;
    }
    #[cfg(not(feature = "rt"))]
    let _ = (cpu_core, rt_priority);
    Ok(())
}

// ─── Control Loop ───────────────────────────────────────────────────

/// Result of one control step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    /// Raw reading (`None` = source unavailable).
    pub measurement: Option<f64>,
    pub outcome: Result<UpdateOutcome, MeasurementFault>,
    /// Command in effect after the step.
    pub output: f64,
}

/// Controller bound to the process boundary.
///
/// Writes the actuator only when the command changes, so a faulted or
/// disabled loop writes neutral exactly once.
#[derive(Debug, Clone)]
pub struct ControlLoop {
    controller: Controller,
    last_written: Option<f64>,
}

impl ControlLoop {
    pub fn new(controller: Controller) -> Self {
        Self {
            controller,
            last_written: None,
        }
    }

    /// Read → update → write.
    pub fn step<D>(&mut self, io: &mut D, now: Millis) -> StepReport
    where
        D: MeasurementSource + ActuationSink,
    {
        let measurement = io.read();
        let outcome = self
            .controller
            .update(measurement.unwrap_or(f64::NAN), now);
        let output = self.sync_output(io);
        StepReport {
            measurement,
            outcome,
            output,
        }
    }

    /// Disable the controller and write neutral immediately.
    pub fn disable<A: ActuationSink>(&mut self, sink: &mut A) {
        self.controller.disable();
        self.sync_output(sink);
    }

    /// Write the controller output if it differs from the last command.
    pub fn sync_output<A: ActuationSink>(&mut self, sink: &mut A) -> f64 {
        let output = self.controller.output();
        if self.last_written != Some(output) {
            sink.write(output);
            self.last_written = Some(output);
        }
        output
    }

    #[inline]
    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    #[inline]
    pub fn controller_mut(&mut self) -> &mut Controller {
        &mut self.controller
    }

    /// Last command written to the actuator.
    #[inline]
    pub fn last_written(&self) -> Option<f64> {
        self.last_written
    }
}

// ─── Cycle Runner ───────────────────────────────────────────────────

/// Paces a [`ControlLoop`] at a fixed cycle time.
pub struct CycleRunner<C: Clock> {
    control: ControlLoop,
    clock: C,
    stats: CycleStats,
    telemetry_interval_ms: u32,
    last_telemetry: Option<Millis>,
}

impl<C: Clock> CycleRunner<C> {
    pub fn new(control: ControlLoop, clock: C, settings: &CycleSettings) -> Self {
        Self {
            control,
            clock,
            stats: CycleStats::new(Duration::from_micros(u64::from(settings.cycle_time_us))),
            telemetry_interval_ms: settings.telemetry_interval_ms,
            last_telemetry: None,
        }
    }

    /// Run until `running` is cleared, then write neutral output.
    ///
    /// # Errors
    /// With the `rt` feature, returns `CycleError::CycleOverrun` on the first
    /// cycle that exceeds its budget.
    pub fn run<D>(&mut self, io: &mut D, running: &AtomicBool) -> Result<(), CycleError>
    where
        D: MeasurementSource + ActuationSink,
    {
        #[cfg(feature = "rt")]
        let result = self.run_rt_loop(io, running);

        #[cfg(not(feature = "rt"))]
        let result = self.run_sim_loop(io, running);

        self.control.disable(io);
        info!("Cycle loop stopped, output neutral");
        result
    }

    /// RT cycle loop using `clock_nanosleep(TIMER_ABSTIME)`.
    #[cfg(feature = "rt")]
    fn run_rt_loop<D>(&mut self, io: &mut D, running: &AtomicBool) -> Result<(), CycleError>
    where
        D: MeasurementSource + ActuationSink,
    {
        use nix::sys::time::TimeSpec;
        use nix::time::{ClockId, ClockNanosleepFlags, clock_gettime, clock_nanosleep};

        let clock = ClockId::CLOCK_MONOTONIC;
        let gettime = || {
            clock_gettime(clock).map_err(|e| CycleError::RtSetup {
                call: "clock_gettime",
                reason: e.to_string(),
            })
        };
        let gap = |a: &TimeSpec, b: &TimeSpec| {
            let ns = (a.tv_sec() - b.tv_sec()) * 1_000_000_000 + (a.tv_nsec() - b.tv_nsec());
            Duration::from_nanos(ns.unsigned_abs())
        };

        let budget = self.stats.budget();
        let period = TimeSpec::from(budget);
        let mut next_wake = gettime()?;

        while running.load(Ordering::Relaxed) {
            next_wake = next_wake + period;

            let start = gettime()?;
            let report = self.cycle_body(io);
            let end = gettime()?;

            let timing = CycleTiming {
                busy: gap(&end, &start),
                wake_latency: gap(&start, &next_wake),
            };
            if self.stats.record(&report.outcome, Some(timing)) {
                return Err(CycleError::CycleOverrun {
                    actual: timing.busy,
                    budget,
                });
            }

            let _ = clock_nanosleep(clock, ClockNanosleepFlags::TIMER_ABSTIME, &next_wake);
        }
        Ok(())
    }

    /// Simulation cycle loop using `std::thread::sleep`. Overruns are
    /// counted, not fatal.
    #[cfg(not(feature = "rt"))]
    fn run_sim_loop<D>(&mut self, io: &mut D, running: &AtomicBool) -> Result<(), CycleError>
    where
        D: MeasurementSource + ActuationSink,
    {
        use std::time::Instant;

        let budget = self.stats.budget();
        while running.load(Ordering::Relaxed) {
            let start = Instant::now();
            let report = self.cycle_body(io);
            let busy = start.elapsed();

            self.stats.record(&report.outcome, Some(CycleTiming {
                busy,
                wake_latency: Duration::ZERO,
            }));

            if let Some(remaining) = budget.checked_sub(busy) {
                std::thread::sleep(remaining);
            }
        }
        Ok(())
    }

    /// One unpaced cycle: step, count, emit telemetry.
    pub fn tick<D>(&mut self, io: &mut D) -> StepReport
    where
        D: MeasurementSource + ActuationSink,
    {
        let report = self.cycle_body(io);
        self.stats.record(&report.outcome, None);
        report
    }

    fn cycle_body<D>(&mut self, io: &mut D) -> StepReport
    where
        D: MeasurementSource + ActuationSink,
    {
        let now = self.clock.now_ms();
        let report = self.control.step(io, now);
        self.maybe_emit_telemetry(&report, now);
        report
    }

    fn maybe_emit_telemetry(&mut self, report: &StepReport, now: Millis) {
        if let Some(last) = self.last_telemetry {
            if elapsed_ms(now, last) < self.telemetry_interval_ms {
                return;
            }
        }
        self.last_telemetry = Some(now);

        let ctrl = self.control.controller();
        let terms = ctrl.terms();
        info!(
            target: "pidloop::telemetry",
            time = now,
            pv = report.measurement.unwrap_or(f64::NAN),
            sp = ctrl.setpoint(),
            output = report.output,
            error = ctrl.error(),
            p = terms.p,
            i = terms.i,
            d = terms.d,
            state = ?ctrl.state(),
        );
    }

    #[inline]
    pub fn stats(&self) -> &CycleStats {
        &self.stats
    }

    #[inline]
    pub fn control(&self) -> &ControlLoop {
        &self.control
    }

    #[inline]
    pub fn control_mut(&mut self) -> &mut ControlLoop {
        &mut self.control
    }

    #[inline]
    pub fn clock(&self) -> &C {
        &self.clock
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::io::{RecordingSink, SplitIo};
    use pidloop_common::control::{Gains, Polarity};

    fn armed_controller() -> Controller {
        let mut c = Controller::new(Polarity::Direct);
        assert!(c.begin(Gains::new(2.0, 0.0, 0.0), 100.0, 0));
        c
    }

    fn timing(busy_us: u64, late_us: u64) -> Option<CycleTiming> {
        Some(CycleTiming {
            busy: Duration::from_micros(busy_us),
            wake_latency: Duration::from_micros(late_us),
        })
    }

    #[test]
    fn stats_track_busy_time_and_overruns() {
        let mut s = CycleStats::new(Duration::from_micros(1000));
        assert!(!s.record(&Ok(UpdateOutcome::Waiting), timing(200, 5)));
        assert!(!s.record(&Ok(UpdateOutcome::Sampled(1.0)), timing(600, 30)));
        assert!(s.record(&Ok(UpdateOutcome::Waiting), timing(1300, 2)));

        assert_eq!(s.cycles, 3);
        assert_eq!(s.samples, 1);
        assert_eq!(s.overruns, 1);
        assert_eq!(s.mean_busy(), Duration::from_micros(700));
        assert_eq!(
            s.busy_range(),
            Some((Duration::from_micros(200), Duration::from_micros(1300)))
        );
        assert_eq!(s.worst_latency(), Duration::from_micros(30));
    }

    #[test]
    fn unpaced_cycles_count_outcomes_only() {
        let mut s = CycleStats::new(Duration::from_micros(1000));
        let fault = MeasurementFault::InvalidMeasurement { value: f64::NAN };
        assert!(!s.record(&Err(fault), None));
        assert_eq!(s.cycles, 1);
        assert_eq!(s.faults, 1);
        assert_eq!(s.mean_busy(), Duration::ZERO);
        assert_eq!(s.busy_range(), None);
    }

    #[test]
    fn step_writes_only_on_change() {
        let mut io = SplitIo::new(|| Some(90.0), RecordingSink::default());
        let mut lp = ControlLoop::new(armed_controller());

        let r = lp.step(&mut io, 50);
        assert_eq!(r.outcome, Ok(UpdateOutcome::Waiting));
        assert_eq!(io.sink.writes, 1); // initial neutral
        lp.step(&mut io, 60);
        assert_eq!(io.sink.writes, 1);

        let r = lp.step(&mut io, 100);
        assert_eq!(r.output, 20.0);
        assert_eq!(io.sink.last, Some(20.0));
        assert_eq!(io.sink.writes, 2);
    }

    #[test]
    fn unavailable_reading_faults_and_writes_neutral() {
        let mut reads = 0;
        let source = move || {
            reads += 1;
            if reads < 3 { Some(90.0) } else { None }
        };
        let mut io = SplitIo::new(source, RecordingSink::default());
        let mut lp = ControlLoop::new(armed_controller());

        lp.step(&mut io, 100);
        lp.step(&mut io, 200);
        assert_eq!(io.sink.last, Some(20.0));
        let r = lp.step(&mut io, 300);
        assert!(matches!(r.outcome, Err(MeasurementFault::InvalidMeasurement { .. })));
        assert_eq!(io.sink.last, Some(0.0));
        assert!(lp.controller().is_faulted());
    }

    #[test]
    fn disable_writes_neutral_immediately() {
        let mut io = SplitIo::new(|| Some(90.0), RecordingSink::default());
        let mut lp = ControlLoop::new(armed_controller());
        lp.step(&mut io, 100);
        assert_eq!(io.sink.last, Some(20.0));
        lp.disable(&mut io);
        assert_eq!(io.sink.last, Some(0.0));
    }

    #[test]
    fn tick_uses_clock_and_counts_outcomes() {
        let clock = ManualClock::new(0);
        let mut io = SplitIo::new(|| Some(90.0), RecordingSink::default());
        let mut runner = CycleRunner::new(
            ControlLoop::new(armed_controller()),
            &clock,
            &CycleSettings::default(),
        );
        for _ in 0..10 {
            clock.advance(50);
            runner.tick(&mut io);
        }
        // 500 ms at a 100 ms sample period.
        assert_eq!(runner.stats().samples, 5);
        assert_eq!(runner.stats().faults, 0);
        assert_eq!(runner.stats().cycles, 10);
        assert_eq!(runner.stats().busy_range(), None);
    }

    #[test]
    fn run_returns_when_flag_cleared_and_leaves_neutral() {
        let running = AtomicBool::new(false);
        let mut io = SplitIo::new(|| Some(90.0), RecordingSink::default());
        let mut runner = CycleRunner::new(
            ControlLoop::new(armed_controller()),
            ManualClock::new(0),
            &CycleSettings::default(),
        );
        assert!(runner.run(&mut io, &running).is_ok());
        assert_eq!(io.sink.last, Some(0.0));
        assert!(!runner.control().controller().is_enabled());
    }
}
