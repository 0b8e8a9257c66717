//! Run controller: the hexagonal core.
//!
//! [`RunController`] owns the active flow strategy, the run flags, the
//! sample log and the periodic tick registration.  All I/O flows through
//! the port traits it was built with, so the whole run lifecycle can be
//! driven by mock adapters.
//!
//! ```text
//!   DevicePort ◀─▶ ┌──────────────────────────────┐ ──▶ EventSink
//!                  │        RunController         │
//!    ClockPort ──▶ │ FlowStrategy · RunState · Log│ ──▶ RunLogSink
//!                  └──────────────────────────────┘
//! ```
//!
//! ## Tick protocol
//!
//! 1. Refresh all four temperatures.
//! 2. While running: compute the flow target, append a sample when
//!    logging, write the target, and stop a triggered run that has
//!    overrun its limit (then run the time-exceeded action).
//! 3. While cooling: release the interlock once channel 3 is below the
//!    threshold and, with repeat enabled, start the next triggered run.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};

use crate::config::{CHANNEL_COUNT, ControllerConfig};
use crate::control::flow::{ControlMode, FlowStrategy};
use crate::control::program::{self, FALLBACK_PROGRAM};
use crate::control::pulse::{PulseParameters, PulseTiming};
use crate::error::{CommandError, ProgramError, PulseError, RunLogError};
use crate::fsm::context::{RunState, SensorSnapshot};
use crate::fsm::{PhaseTracker, RunPhase};
use crate::scheduler::TickSchedule;
use crate::sensors::SensorHub;

use super::commands::AppCommand;
use super::events::{AppEvent, TelemetryData};
use super::ports::{
    COOLING_CHANNEL, ClockPort, DevicePort, EventSink, FLOW_OUTPUT, PULSE_CHANNEL, RunLogSink,
    TRIGGER_CHANNEL,
};
use super::record::{LogSample, format_hms};

/// Flow target before the first run.
const INITIAL_FLOW_RATE: f64 = 1.0;
/// Cooling thresholds strictly inside this window arm the interlock.
const COOLING_WINDOW_C: (f64, f64) = (20.0, 250.0);

// ───────────────────────────────────────────────────────────────
// Start outcome and cancellation
// ───────────────────────────────────────────────────────────────

/// How a call to [`RunController::start`] resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// The run is now active.
    Started,
    /// The trigger wait was cancelled; nothing is running.
    Cancelled,
    /// Refused because the oven interlock is still cooling.
    OvenCooling,
}

/// Shared flag that aborts a blocking trigger wait at its next poll.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }
}

// ───────────────────────────────────────────────────────────────
// RunController
// ───────────────────────────────────────────────────────────────

/// Orchestrates flow control, run lifecycle and the cooling interlock.
pub struct RunController<D: DevicePort, C: ClockPort> {
    config: ControllerConfig,
    device: D,
    clock: C,
    run_log: Box<dyn RunLogSink>,
    events: Box<dyn EventSink>,

    sensors: SensorHub,
    snapshot: SensorSnapshot,
    strategy: FlowStrategy,
    state: RunState,
    phase: PhaseTracker,
    pulse: PulseTiming,
    schedule: TickSchedule,
    cancel: CancelHandle,

    log: Vec<LogSample>,
    current_flow: f64,
    tick_count: u64,
}

impl<D: DevicePort, C: ClockPort> RunController<D, C> {
    /// Build the controller in manual mode and register the periodic tick.
    ///
    /// One tick fires immediately so temperatures are populated before the
    /// first call returns.  `config` is expected to have passed
    /// [`ControllerConfig::validate`]; invalid pulse timing falls back to
    /// [`PulseTiming::default`].
    pub fn new(
        config: ControllerConfig,
        device: D,
        clock: C,
        run_log: Box<dyn RunLogSink>,
        events: Box<dyn EventSink>,
    ) -> Self {
        let now = clock.now_secs();
        let wall = clock.wall_clock();
        let pulse = PulseTiming::new(config.pulse_period_secs, config.pulse_width_ms)
            .unwrap_or_else(|e| {
                warn!("PULSE: configured timing rejected ({e}), using defaults");
                PulseTiming::default()
            });

        let mut ctl = Self {
            sensors: SensorHub::new(&config.calibration),
            snapshot: SensorSnapshot::default(),
            strategy: FlowStrategy::configured(ControlMode::Manual, &config),
            state: RunState::new(now, wall, config.max_run_secs()),
            phase: PhaseTracker::new(RunPhase::Idle),
            pulse,
            schedule: TickSchedule::new("update", config.tick_secs()),
            cancel: CancelHandle::new(),
            log: Vec::new(),
            current_flow: INITIAL_FLOW_RATE,
            tick_count: 0,
            config,
            device,
            clock,
            run_log,
            events,
        };
        let threshold = ctl.config.cooling_temperature_c;
        ctl.set_cooling_threshold(threshold);

        if !ctl.device.is_attached() {
            warn!("RUN: no device attached, running as simulation");
        }
        info!(
            "RunController started in {:?} mode (limit {})",
            ctl.strategy.mode(),
            format_hms(ctl.state.max_duration_secs)
        );
        ctl.schedule_job();
        ctl
    }

    // ── Mode and strategy setters ─────────────────────────────

    /// Replace the flow strategy with a fresh instance for `mode`.
    pub fn set_mode(&mut self, mode: ControlMode) {
        self.strategy = FlowStrategy::configured(mode, &self.config);
        info!("RUN: mode set to {:?}", mode);
        self.events.emit(&AppEvent::ModeChanged(mode));
    }

    /// Manual setpoint.  Out-of-range values and non-manual modes are ignored.
    pub fn set_flow_rate(&mut self, flow: f64) {
        if self.strategy.set_flow_rate(flow) {
            return;
        }
        match &self.strategy {
            FlowStrategy::Manual(m) => {
                let (lo, hi) = m.limits();
                warn!("RUN: flow rate {flow} outside [{lo}, {hi}] L/min, keeping {}", m.flow_rate());
            }
            other => debug!("RUN: flow rate {flow} ignored in {:?} mode", other.mode()),
        }
    }

    pub fn set_program(&mut self, program: Vec<f64>) {
        self.strategy.set_program(program);
    }

    /// Load a time program from disk.  On failure the fallback program is
    /// applied and the error returned.
    pub fn load_program_file(&mut self, path: &Path) -> Result<usize, ProgramError> {
        match program::load_program(path) {
            Ok(values) => {
                let len = values.len();
                info!("RUN: loaded {len} program steps from {}", path.display());
                self.strategy.set_program(values);
                Ok(len)
            }
            Err(e) => {
                warn!("RUN: program {} unusable ({e}), using fallback", path.display());
                self.strategy.set_program(FALLBACK_PROGRAM.to_vec());
                Err(e)
            }
        }
    }

    pub fn set_time_interval(&mut self, secs: f64) {
        self.strategy.set_time_interval(secs);
    }

    // ── Run parameters ────────────────────────────────────────

    /// Store the cooling threshold and arm the interlock when it lies
    /// strictly inside (20, 250) °C.
    pub fn set_cooling_threshold(&mut self, temp_c: f64) {
        self.state.cooling_threshold = Some(temp_c);
        self.state.cool_oven = temp_c > COOLING_WINDOW_C.0 && temp_c < COOLING_WINDOW_C.1;
        debug!(
            "COOL: threshold {temp_c} °C, interlock {}",
            if self.state.cool_oven { "armed" } else { "disabled" }
        );
    }

    pub fn set_repeat(&mut self, repeat: bool) {
        self.state.auto_repeat = repeat;
    }

    /// Maximum length of a triggered run.  Non-positive values are ignored.
    pub fn set_max_duration(&mut self, secs: f64) {
        if secs.is_finite() && secs > 0.0 {
            self.state.max_duration_secs = secs;
        } else {
            warn!("RUN: max duration {secs} s ignored");
        }
    }

    /// Apply each field independently; a rejected field keeps its old value.
    pub fn set_pulse_timing(&mut self, period_secs: f64, width_ms: f64) {
        self.set_pulse_period(period_secs);
        self.set_pulse_width(width_ms);
    }

    pub fn set_pulse_period(&mut self, period_secs: f64) {
        match self.pulse.with_period(period_secs) {
            Ok(t) => self.pulse = t,
            Err(e) => warn!("PULSE: {e}, keeping {} s", self.pulse.period_secs()),
        }
    }

    pub fn set_pulse_width(&mut self, width_ms: f64) {
        match self.pulse.with_width(width_ms) {
            Ok(t) => self.pulse = t,
            Err(e) => warn!("PULSE: {e}, keeping {} ms", self.pulse.width_ms()),
        }
    }

    // ── Run lifecycle ─────────────────────────────────────────

    /// Begin a run.
    ///
    /// With `wait_for_trigger` this blocks, polling the trigger input until
    /// it reads low or the [`CancelHandle`] fires.  Elapsed time is reset
    /// at the trigger moment when `reset_time` is set.
    pub fn start(&mut self, wait_for_trigger: bool, reset_time: bool) -> StartOutcome {
        if self.state.oven_is_cooling {
            warn!("RUN: start refused, oven still cooling");
            return StartOutcome::OvenCooling;
        }

        self.log.clear();
        self.state.logging_active = wait_for_trigger;
        if reset_time {
            self.reset_elapsed();
        }
        self.state.triggered_start = wait_for_trigger;

        if wait_for_trigger && !self.wait_for_trigger() {
            self.state.logging_active = false;
            self.state.triggered_start = false;
            self.events.emit(&AppEvent::TriggerCancelled);
            self.sync_phase();
            return StartOutcome::Cancelled;
        }

        self.state.is_running = true;
        if reset_time {
            self.reset_elapsed();
        }
        info!(
            "RUN: started in {:?} mode ({})",
            self.strategy.mode(),
            if wait_for_trigger { "triggered" } else { "immediate" }
        );
        self.events.emit(&AppEvent::RunStarted {
            triggered: wait_for_trigger,
        });

        self.schedule_job();

        if self.strategy.mode().is_programmed() && self.state.triggered_start {
            if let Err(e) = self.start_pulse() {
                warn!("PULSE: not armed: {e}");
            }
        }
        StartOutcome::Started
    }

    /// Stop the active run.  A triggered run's samples are flushed to the
    /// run log; the run counts as stopped even if the flush fails.
    ///
    /// Returns the written log path, or `None` when nothing was flushed.
    pub fn stop_run(&mut self) -> Result<Option<PathBuf>, RunLogError> {
        let was_running = self.state.is_running;
        self.state.is_running = false;
        self.state.logging_active = false;
        self.sync_phase();

        if !was_running {
            return Ok(None);
        }

        let elapsed = self.elapsed_secs();
        info!("RUN: stopped after {}", format_hms(elapsed));
        self.events.emit(&AppEvent::RunStopped {
            elapsed_secs: elapsed,
        });

        if !self.state.triggered_start {
            self.log.clear();
            return Ok(None);
        }

        let samples = std::mem::take(&mut self.log);
        match self.run_log.write_run(self.state.started_wall, &samples) {
            Ok(path) => {
                info!("RUN: {} samples written to {}", samples.len(), path.display());
                self.events.emit(&AppEvent::LogFlushed {
                    path: path.clone(),
                    rows: samples.len(),
                });
                Ok(Some(path))
            }
            Err(e) => {
                warn!("RUN: log flush failed: {e}");
                self.events.emit(&AppEvent::LogFlushFailed {
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Stop the run and drop the periodic tick.  Idempotent.
    pub fn stop_all(&mut self) -> Result<Option<PathBuf>, RunLogError> {
        let result = self.stop_run();
        self.schedule.cancel();
        result
    }

    /// Handle that aborts a pending trigger wait.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    // ── Pulse output ──────────────────────────────────────────

    /// Program the device clock and PWM from the current pulse timing.
    pub fn start_pulse(&mut self) -> Result<PulseParameters, PulseError> {
        let params = PulseParameters::for_timing(
            self.pulse,
            self.config.core_frequency_hz,
            self.config.clock_divisor,
        )?;
        self.device
            .configure_clock(params.clock_divisor, params.roll_value);
        self.device.configure_pwm(params.high_count);
        info!(
            "PULSE: armed {} s / {} ms (roll={}, high={})",
            self.pulse.period_secs(),
            self.pulse.width_ms(),
            params.roll_value,
            params.high_count
        );
        self.events.emit(&AppEvent::PulseArmed {
            roll_value: params.roll_value,
            high_count: params.high_count,
        });
        Ok(params)
    }

    /// Disable the PWM output and hold the pulse line low.
    pub fn stop_pulse(&mut self) {
        self.device.disable_pwm();
        self.device.write_digital(PULSE_CHANNEL, false);
        info!("PULSE: disarmed");
        self.events.emit(&AppEvent::PulseDisarmed);
    }

    // ── Scheduling ────────────────────────────────────────────

    /// Drive the periodic tick from the host loop.  Returns `true` when a
    /// tick ran.
    pub fn poll(&mut self) -> bool {
        let now = self.clock.now_secs();
        if self.schedule.poll(now) {
            self.tick();
            true
        } else {
            false
        }
    }

    /// Seconds until the next tick is due, `None` once stopped.
    pub fn next_tick_in(&self) -> Option<f64> {
        self.schedule
            .next_due()
            .map(|due| (due - self.clock.now_secs()).max(0.0))
    }

    pub fn is_scheduled(&self) -> bool {
        self.schedule.is_armed()
    }

    /// One control cycle.  Normally called through [`poll`](Self::poll).
    pub fn tick(&mut self) {
        self.tick_count += 1;
        self.phase.tick();
        self.snapshot = self.sensors.read_all(&mut self.device);

        if self.state.is_running {
            let elapsed = self.elapsed_secs();
            let flow = self
                .strategy
                .flow_rate(elapsed, self.snapshot.temperature(0));
            self.current_flow = flow;
            if self.state.logging_active {
                self.log.push(LogSample::new(
                    elapsed / 60.0,
                    flow,
                    self.snapshot.temperatures,
                ));
            }
            self.send_flow_rate(flow);

            if self.state.time_exceeded(elapsed) {
                info!("RUN: time exceeded at {}", format_hms(elapsed));
                self.events.emit(&AppEvent::TimeExceeded {
                    elapsed_secs: elapsed,
                });
                if let Err(e) = self.stop_run() {
                    warn!("RUN: run stopped without a log: {e}");
                }
                self.time_exceeded_action();
            }
        }

        if self.state.oven_is_cooling {
            self.check_cooling();
        }

        self.sync_phase();
        let telemetry = self.telemetry();
        self.events.emit(&AppEvent::Telemetry(telemetry));
    }

    // ── Commands ──────────────────────────────────────────────

    /// Single entry point for adapters driving the controller.
    pub fn handle_command(&mut self, cmd: AppCommand) -> Result<(), CommandError> {
        match cmd {
            AppCommand::Start {
                wait_for_trigger,
                reset_time,
            } => match self.start(wait_for_trigger, reset_time) {
                StartOutcome::Started => {}
                other => return Err(CommandError::NotStarted(other)),
            },
            AppCommand::StopRun => {
                self.stop_run()?;
            }
            AppCommand::StopAll => {
                self.stop_all()?;
            }
            AppCommand::CancelTrigger => self.cancel.cancel(),
            AppCommand::SetMode(mode) => self.set_mode(mode),
            AppCommand::SetRepeat(repeat) => self.set_repeat(repeat),
            AppCommand::SetFlowRate(flow) => self.set_flow_rate(flow),
            AppCommand::SetProgram(values) => self.set_program(values),
            AppCommand::LoadProgram(path) => {
                self.load_program_file(&path)?;
            }
            AppCommand::SetTimeInterval(secs) => self.set_time_interval(secs),
            AppCommand::SetCoolingThreshold(temp) => self.set_cooling_threshold(temp),
            AppCommand::SetMaxDuration(secs) => self.set_max_duration(secs),
            AppCommand::SetPulsePeriod(secs) => self.set_pulse_period(secs),
            AppCommand::SetPulseWidth(ms) => self.set_pulse_width(ms),
            AppCommand::StartPulse => {
                self.start_pulse()?;
            }
            AppCommand::StopPulse => self.stop_pulse(),
        }
        Ok(())
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn mode(&self) -> ControlMode {
        self.strategy.mode()
    }

    pub fn strategy(&self) -> &FlowStrategy {
        &self.strategy
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running
    }

    pub fn current_flow_rate(&self) -> f64 {
        self.current_flow
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.clock.now_secs() - self.state.started_at
    }

    /// Last temperature read on `channel`; `None` when unavailable.
    pub fn temperature(&self, channel: usize) -> Option<f64> {
        self.snapshot.temperature(channel)
    }

    pub fn temperatures(&self) -> [Option<f64>; CHANNEL_COUNT] {
        self.snapshot.temperatures
    }

    pub fn triggered_start(&self) -> bool {
        self.state.triggered_start
    }

    pub fn oven_is_cooling(&self) -> bool {
        self.state.oven_is_cooling
    }

    pub fn repeat_enabled(&self) -> bool {
        self.state.auto_repeat
    }

    pub fn phase(&self) -> RunPhase {
        self.state.phase()
    }

    pub fn pulse_timing(&self) -> PulseTiming {
        self.pulse
    }

    pub fn cooling_threshold(&self) -> Option<f64> {
        self.state.cooling_threshold
    }

    pub fn cools_oven(&self) -> bool {
        self.state.cool_oven
    }

    pub fn max_duration_secs(&self) -> f64 {
        self.state.max_duration_secs
    }

    pub fn time_interval(&self) -> Option<f64> {
        self.strategy.time_interval()
    }

    /// Samples buffered for the current run.
    pub fn log_len(&self) -> usize {
        self.log.len()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn telemetry(&self) -> TelemetryData {
        TelemetryData {
            phase: self.state.phase(),
            mode: self.strategy.mode(),
            elapsed_secs: self.elapsed_secs(),
            flow_rate: self.current_flow,
            temperatures: self.snapshot.temperatures,
            logged_rows: self.log.len(),
        }
    }

    // ── Internals ─────────────────────────────────────────────

    /// Runs once, after the overrun check has stopped the run.
    fn time_exceeded_action(&mut self) {
        if self.state.is_running {
            return;
        }
        let safe = self.config.safe_flow_rate;
        self.current_flow = safe;
        self.send_flow_rate(safe);

        if self.state.cool_oven {
            self.device.write_digital(COOLING_CHANNEL, true);
            self.state.oven_is_cooling = true;
            info!("COOL: interlock on, waiting for oven below threshold");
            self.events.emit(&AppEvent::CoolingStarted);
            self.sync_phase();
        } else if self.state.auto_repeat {
            info!("RUN: repeating without cooling");
            self.start(true, true);
        }
    }

    fn check_cooling(&mut self) {
        let temp = match (self.snapshot.temperature(3), self.state.cooling_threshold) {
            (Some(temp), Some(threshold)) if temp < threshold => temp,
            _ => return,
        };
        self.device.write_digital(COOLING_CHANNEL, false);
        self.state.oven_is_cooling = false;
        info!("COOL: oven at {temp:.1} °C, interlock off");
        self.events.emit(&AppEvent::CoolingFinished {
            temperature_c: temp,
        });
        self.sync_phase();

        if self.state.auto_repeat {
            info!("RUN: restarting after cooling");
            self.start(true, true);
        }
    }

    /// Blocks until the trigger reads low.  Returns `false` if cancelled.
    ///
    /// A cancel requested while no wait is pending aborts the next wait.
    /// The flag is cleared once the wait resolves either way.
    fn wait_for_trigger(&mut self) -> bool {
        let fired = if self.cancel.is_cancelled() {
            false
        } else if self.device.is_attached() {
            self.poll_trigger()
        } else {
            info!("RUN: no device, trigger assumed");
            true
        };
        self.cancel.reset();

        if fired {
            info!("RUN: trigger received");
            self.events.emit(&AppEvent::TriggerReceived);
        } else {
            info!("RUN: trigger wait cancelled");
        }
        fired
    }

    fn poll_trigger(&mut self) -> bool {
        self.state.awaiting_trigger = true;
        self.sync_phase();
        info!("RUN: waiting for trigger on FIO{TRIGGER_CHANNEL}");

        let interval = Duration::from_millis(self.config.trigger_poll_interval_ms);
        let fired = loop {
            if self.cancel.is_cancelled() {
                break false;
            }
            if self.device.read_trigger_input() == Some(false) {
                break true;
            }
            if !interval.is_zero() {
                thread::sleep(interval);
            }
        };
        self.state.awaiting_trigger = false;
        fired
    }

    fn reset_elapsed(&mut self) {
        self.state.started_at = self.clock.now_secs();
        self.state.started_wall = self.clock.wall_clock();
    }

    /// Replace any pending registration and fire one tick right away.
    fn schedule_job(&mut self) {
        self.schedule.arm(self.clock.now_secs());
        self.tick();
    }

    fn send_flow_rate(&mut self, flow: f64) {
        let volts = flow / self.config.flow_volts_divisor;
        self.device.write_analog(FLOW_OUTPUT, volts);
        debug!("RUN: flow rate set to {flow:.2} L/min ({volts:.3} V)");
    }

    fn sync_phase(&mut self) {
        if let Some((from, to)) = self.phase.observe(self.state.phase()) {
            self.events.emit(&AppEvent::StateChanged { from, to });
        }
    }
}
