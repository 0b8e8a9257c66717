//! Controller configuration parameters
//!
//! All tunable parameters for the GCxGC flow controller.
//! Values can be overridden from a JSON file through [`ConfigPort`](crate::app::ports::ConfigPort).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::control::pulse::{PERIOD_RANGE_SECS, WIDTH_RANGE_MS};
use crate::error::ConfigError;

/// Number of thermocouple channels wired to the instrument.
pub const CHANNEL_COUNT: usize = 4;

/// Linear thermocouple-amplifier calibration for one analog input.
///
/// `temp = (chart_span * volts + 10 * t_nom) / 10`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelCalibration {
    /// Temperature at 0 V (°C).
    pub t_nom: f64,
    /// Span of the amplifier chart (°C per 10 V).
    pub chart_span: f64,
}

/// Core controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    // --- Timing ---
    /// Control loop interval (milliseconds)
    pub tick_interval_ms: u64,
    /// Delay between trigger-input polls while waiting (milliseconds)
    pub trigger_poll_interval_ms: u64,
    /// GC run length after which a triggered run is stopped (minutes)
    pub max_run_minutes: f64,

    // --- Flow ---
    /// Manual-mode flow limits (L/min), inclusive
    pub flow_limits: (f64, f64),
    /// Flow written when a run times out (L/min)
    pub safe_flow_rate: f64,
    /// Flow-controller scaling: volts = flow / divisor
    pub flow_volts_divisor: f64,
    /// Step length of a time program (seconds)
    pub time_program_interval_secs: f64,
    /// Informational update interval of the temperature program (seconds)
    pub temp_program_interval_secs: f64,

    // --- Hot jet pulse ---
    /// Pulse period (seconds, 1-20)
    pub pulse_period_secs: f64,
    /// Pulse width (milliseconds, 100-1000)
    pub pulse_width_ms: f64,
    /// Device core clock feeding the PWM divisor (Hz)
    pub core_frequency_hz: u32,
    /// Clock divisor programmed into the PWM clock
    pub clock_divisor: u32,

    // --- Oven cooling ---
    /// Channel-3 temperature the oven must fall below before the next run (°C).
    /// Values outside (20, 250) disable cooling.
    pub cooling_temperature_c: f64,

    // --- Sensors ---
    pub calibration: [ChannelCalibration; CHANNEL_COUNT],

    // --- Logging ---
    /// Directory that receives one tab-delimited file per triggered run
    pub log_dir: PathBuf,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            // Timing
            tick_interval_ms: 1000,       // 1 Hz
            trigger_poll_interval_ms: 10, // 100 Hz poll
            max_run_minutes: 50.0,

            // Flow
            flow_limits: (0.0, 20.0),
            safe_flow_rate: 1.0,
            flow_volts_divisor: 4.0,
            time_program_interval_secs: 60.0,
            temp_program_interval_secs: 10.0,

            // Pulse
            pulse_period_secs: 6.0,
            pulse_width_ms: 300.0,
            core_frequency_hz: 80_000_000,
            clock_divisor: 256,

            // Cooling
            cooling_temperature_c: 999.0, // disabled

            // Sensors: oven, cold jet, hot jet, second oven
            calibration: [
                ChannelCalibration { t_nom: 0.0, chart_span: 1000.0 },
                ChannelCalibration { t_nom: -200.0, chart_span: 1000.0 },
                ChannelCalibration { t_nom: 0.0, chart_span: 1000.0 },
                ChannelCalibration { t_nom: 0.0, chart_span: 1000.0 },
            ],

            log_dir: PathBuf::from("."),
        }
    }
}

impl ControllerConfig {
    /// Tick period in seconds.
    pub fn tick_secs(&self) -> f64 {
        self.tick_interval_ms as f64 / 1000.0
    }

    /// Run length limit in seconds.
    pub fn max_run_secs(&self) -> f64 {
        self.max_run_minutes * 60.0
    }

    /// Reject values that would make the control loop misbehave.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed("tick_interval_ms must be > 0"));
        }
        if !(self.max_run_minutes.is_finite() && self.max_run_minutes > 0.0) {
            return Err(ConfigError::ValidationFailed("max_run_minutes must be > 0"));
        }
        let (lo, hi) = self.flow_limits;
        if !(lo.is_finite() && hi.is_finite() && lo <= hi) {
            return Err(ConfigError::ValidationFailed("flow_limits must be finite with min <= max"));
        }
        if !(self.flow_volts_divisor.is_finite() && self.flow_volts_divisor > 0.0) {
            return Err(ConfigError::ValidationFailed("flow_volts_divisor must be > 0"));
        }
        if !(self.time_program_interval_secs.is_finite() && self.time_program_interval_secs > 0.0) {
            return Err(ConfigError::ValidationFailed("time_program_interval_secs must be > 0"));
        }
        if !PERIOD_RANGE_SECS.contains(&self.pulse_period_secs) {
            return Err(ConfigError::ValidationFailed("pulse_period_secs must be in [1, 20]"));
        }
        if !WIDTH_RANGE_MS.contains(&self.pulse_width_ms) {
            return Err(ConfigError::ValidationFailed("pulse_width_ms must be in [100, 1000]"));
        }
        if self.core_frequency_hz == 0 || self.clock_divisor == 0 {
            return Err(ConfigError::ValidationFailed("core_frequency_hz and clock_divisor must be > 0"));
        }
        // Longest accepted pulse period gives the largest roll value.
        let max_roll = f64::from(self.core_frequency_hz) * PERIOD_RANGE_SECS.end()
            / f64::from(self.clock_divisor);
        if max_roll > f64::from(u32::MAX) {
            return Err(ConfigError::ValidationFailed(
                "core_frequency_hz / clock_divisor overflows the pulse roll register",
            ));
        }
        if self
            .calibration
            .iter()
            .any(|c| !(c.t_nom.is_finite() && c.chart_span.is_finite()))
        {
            return Err(ConfigError::ValidationFailed("calibration values must be finite"));
        }
        Ok(())
    }
}
