//! Tuning session: command dispatch, periodic data and fault reporting.
//!
//! Per `service` call, in order: decode and execute every complete line in
//! `incoming`, report a newly latched fault once, send a data sample if the
//! data interval has elapsed, then advance the step test.

use std::io::Write;

use pidloop_common::control::Gains;
use pidloop_common::time::{Millis, elapsed_ms};
use pidloop_control::controller::Controller;
use tracing::debug;

use crate::config::TuneSettings;
use crate::error::TuneError;
use crate::protocol::command::{Command, SetParams, parse_command};
use crate::protocol::framing::LineBuffer;
use crate::protocol::message::{Data, ErrorReply, Message, Status, write_line};
use crate::step_test::StepTest;

/// Protocol state for one tuning connection.
#[derive(Debug)]
pub struct TuneSession {
    framing: LineBuffer,
    step: StepTest,
    running: bool,
    data_interval_ms: u32,
    last_data: Millis,
    fault_reported: bool,
}

impl Default for TuneSession {
    fn default() -> Self {
        Self::new(&TuneSettings::default())
    }
}

impl TuneSession {
    pub fn new(settings: &TuneSettings) -> Self {
        Self {
            framing: LineBuffer::new(),
            step: StepTest::new(settings.step_test_duration_ms),
            running: false,
            data_interval_ms: settings.data_interval_ms.max(1),
            last_data: 0,
            fault_reported: false,
        }
    }

    /// Announce the session: status followed by a ready line.
    pub fn begin<W: Write>(
        &mut self,
        controller: &Controller,
        now: Millis,
        out: &mut W,
    ) -> Result<(), TuneError> {
        self.running = controller.is_enabled();
        self.last_data = now;
        self.send_status(controller, out)?;
        send(out, &Message::Debug {
            debug: "PID tuning interface ready",
        })
    }

    /// Process `incoming` bytes and emit whatever is due at `now`.
    pub fn service<W: Write>(
        &mut self,
        controller: &mut Controller,
        incoming: &[u8],
        pv: f64,
        now: Millis,
        out: &mut W,
    ) -> Result<(), TuneError> {
        for &byte in incoming {
            if let Some(line) = self.framing.push(byte) {
                self.handle_line(controller, &line, now, out)?;
            }
        }

        self.report_fault(controller, out)?;

        if elapsed_ms(now, self.last_data) >= self.data_interval_ms {
            let data = Data::new(&controller.snapshot(), pv, now);
            send(out, &Message::Data(data))?;
            self.last_data = now;
        }

        if self.step.poll(controller, now) {
            send(out, &Message::StepTestComplete)?;
        }
        Ok(())
    }

    fn handle_line<W: Write>(
        &mut self,
        controller: &mut Controller,
        line: &[u8],
        now: Millis,
        out: &mut W,
    ) -> Result<(), TuneError> {
        let command = match parse_command(line) {
            Ok(command) => command,
            Err(e) => {
                debug!("Rejected line ({e}): {}", String::from_utf8_lossy(line));
                return write_line(out, &ErrorReply::from(e));
            }
        };
        debug!("Command: {command:?}");

        match command {
            Command::SetParams(params) => self.apply_params(controller, &params, out),
            Command::SetSp { value } => match value {
                Some(sp) if !controller.set_setpoint(sp) => send(out, &Message::Debug {
                    debug: "Setpoint rejected",
                }),
                _ => Ok(()),
            },
            Command::Start => {
                send(out, &Message::Debug {
                    debug: "Received start command",
                })?;
                self.running = controller.enable(now);
                send(out, &Message::Debug {
                    debug: if self.running {
                        "Control started"
                    } else {
                        "Enable refused: fault latched"
                    },
                })?;
                self.send_status(controller, out)
            }
            Command::Stop => {
                send(out, &Message::Debug {
                    debug: "Received stop command",
                })?;
                self.running = false;
                controller.disable();
                send(out, &Message::Debug {
                    debug: "Control stopped",
                })?;
                self.send_status(controller, out)
            }
            Command::GetStatus => self.send_status(controller, out),
            Command::StepTest { amplitude } => match amplitude {
                Some(amplitude) if self.step.start(controller, amplitude, now) => {
                    send(out, &Message::StepTestStarted { amplitude })
                }
                _ => Ok(()),
            },
            Command::ClearFault => {
                controller.clear_fault();
                self.fault_reported = false;
                send(out, &Message::Debug {
                    debug: "Fault cleared",
                })?;
                self.send_status(controller, out)
            }
            Command::Reset => {
                controller.reset(now);
                send(out, &Message::Debug {
                    debug: "Controller reset",
                })?;
                self.send_status(controller, out)
            }
        }
    }

    fn apply_params<W: Write>(
        &mut self,
        controller: &mut Controller,
        params: &SetParams,
        out: &mut W,
    ) -> Result<(), TuneError> {
        let current = controller.gains();
        let gains = Gains::new(
            params.kp.unwrap_or(current.kp),
            params.ki.unwrap_or(current.ki),
            params.kd.unwrap_or(current.kd),
        );
        if !controller.set_gains(gains) {
            send(out, &Message::Debug {
                debug: "Gains rejected",
            })?;
        }
        let period_ok = params
            .loop_period
            .is_none_or(|period| controller.set_sample_period(period));
        if !period_ok {
            send(out, &Message::Debug {
                debug: "Loop period rejected",
            })?;
        }
        let output_ok = params
            .output_limits()
            .is_none_or(|(min, max)| controller.set_output_limits(min, max));
        if !output_ok {
            send(out, &Message::Debug {
                debug: "Output limits rejected",
            })?;
        }
        let integral_ok = params
            .integral_limits()
            .is_none_or(|(min, max)| controller.set_integral_limits(min, max));
        if !integral_ok {
            send(out, &Message::Debug {
                debug: "Integral limits rejected",
            })?;
        }
        Ok(())
    }

    fn report_fault<W: Write>(&mut self, controller: &Controller, out: &mut W) -> Result<(), TuneError> {
        if !controller.is_faulted() {
            self.fault_reported = false;
            return Ok(());
        }
        if self.fault_reported {
            return Ok(());
        }
        self.fault_reported = true;
        self.running = false;
        let fault = controller.fault().label().unwrap_or("fault");
        let detail = controller
            .last_fault()
            .map(|f| f.to_string())
            .unwrap_or_default();
        send(out, &Message::Fault { fault, detail })
    }

    fn send_status<W: Write>(&self, controller: &Controller, out: &mut W) -> Result<(), TuneError> {
        let status = Status::new(&controller.snapshot(), self.running);
        send(out, &Message::Status(status))
    }

    /// Session run flag (toggled by `start`/`stop`).
    #[inline]
    pub fn is_running(&self) -> bool {
        self.running
    }

    #[inline]
    pub fn step_test(&self) -> &StepTest {
        &self.step
    }

    #[inline]
    pub fn data_interval_ms(&self) -> u32 {
        self.data_interval_ms
    }
}

fn send<W: Write>(out: &mut W, message: &Message) -> Result<(), TuneError> {
    write_line(out, message)
}
