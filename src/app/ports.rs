//! Port traits: the hexagonal boundary between the run controller and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ RunController (domain)
//! ```
//!
//! Driven adapters (instrument I/O, clocks, log writers, event sinks,
//! config storage) implement these traits.  The
//! [`RunController`](super::controller::RunController) owns them, so the
//! domain core never touches hardware or the filesystem directly.
//!
//! ## Availability notes
//!
//! - **DevicePort** implementations never fail a write: a missing unit
//!   turns writes into no-ops and reads into `None`.
//! - **RunLogSink** failures are returned to whoever stopped the run; the
//!   run is already stopped by then.

use std::path::PathBuf;

use chrono::NaiveDateTime;

use crate::config::ControllerConfig;
use crate::error::{ConfigError, RunLogError};

use super::events::AppEvent;
use super::record::LogSample;

// ───────────────────────────────────────────────────────────────
// Instrument wiring
// ───────────────────────────────────────────────────────────────

/// Analog output driving the mass-flow controller setpoint.
pub const FLOW_OUTPUT: &str = "DAC0";
/// Digital line carrying the hot-jet pulse.
pub const PULSE_CHANNEL: u8 = 0;
/// Digital line the autosampler pulls low to start a run.
pub const TRIGGER_CHANNEL: u8 = 1;
/// Digital line driving the oven cooling interlock.
pub const COOLING_CHANNEL: u8 = 2;

// ───────────────────────────────────────────────────────────────
// Device port (driven adapter: domain ↔ instrument I/O unit)
// ───────────────────────────────────────────────────────────────

/// Everything the controller needs from the data-acquisition unit.
pub trait DevicePort {
    /// `false` when no physical unit is connected.
    fn is_attached(&self) -> bool;

    /// Raw analog input voltage for thermocouple channel `index`.
    /// `None` when the read fails or no unit is attached.
    fn read_channel(&mut self, index: usize) -> Option<f64>;

    /// Write an analog output by register name (e.g. [`FLOW_OUTPUT`]).
    fn write_analog(&mut self, name: &str, value: f64);

    /// Drive a digital output line.
    fn write_digital(&mut self, channel: u8, state: bool);

    /// Program the pulse clock (turns it off, loads both registers, turns it on).
    fn configure_clock(&mut self, divisor: u32, roll_value: u32);

    /// Program and enable PWM on [`PULSE_CHANNEL`] against the pulse clock.
    fn configure_pwm(&mut self, high_count: u32);

    /// Disable the PWM feature on [`PULSE_CHANNEL`].
    fn disable_pwm(&mut self);

    /// Level of the trigger input on [`TRIGGER_CHANNEL`].
    /// `Some(false)` means the autosampler has fired.
    fn read_trigger_input(&mut self) -> Option<bool>;
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Time source for elapsed-time tracking and log naming.
pub trait ClockPort {
    /// Monotonic seconds since an arbitrary origin.
    fn now_secs(&self) -> f64;

    /// Local wall-clock time, used to name run logs.
    fn wall_clock(&self) -> NaiveDateTime;
}

// ───────────────────────────────────────────────────────────────
// Run log port (driven adapter: domain → persisted run records)
// ───────────────────────────────────────────────────────────────

/// Persists the samples of one finished triggered run.
pub trait RunLogSink {
    /// Write `samples` for the run that started at `started`.
    /// Returns where the record was written.
    fn write_run(
        &mut self,
        started: NaiveDateTime,
        samples: &[LogSample],
    ) -> Result<PathBuf, RunLogError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`]s through this port.  Adapters
/// decide where they go (console log, UI model, test recorder).
pub trait EventSink {
    fn emit(&mut self, event: &AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists controller configuration.
///
/// Implementations MUST validate before persisting: invalid ranges are
/// rejected with [`ConfigError::ValidationFailed`], not silently clamped.
pub trait ConfigPort {
    /// Load configuration.  Returns [`ControllerConfig::default()`] if no
    /// stored config exists.
    fn load(&self) -> Result<ControllerConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &ControllerConfig) -> Result<(), ConfigError>;
}
