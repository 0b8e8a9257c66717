//! Flow-rate strategies.
//!
//! The active [`FlowStrategy`] turns elapsed run time and the oven
//! temperature into the flow target written to the mass-flow controller.
//! Every variant is total: any elapsed time (negative, huge, NaN) and any
//! temperature, including "unavailable", yields a finite-or-fallback value.
//!
//! Setters that do not apply to the active variant are silent no-ops, so
//! command handlers can forward them without checking the mode first.

use serde::{Deserialize, Serialize};

use crate::config::ControllerConfig;

/// Flow returned by a time program that has no steps loaded (L/min).
pub const EMPTY_PROGRAM_FLOW: f64 = 1.0;

/// Oven temperature above which the temperature program curve applies (°C).
pub const TEMP_PROGRAM_THRESHOLD_C: f64 = 60.0;

/// Flow used at or below the threshold, or without a temperature (L/min).
pub const TEMP_PROGRAM_FALLBACK_FLOW: f64 = 15.0;

/// Constant added to the temperature program curve (L/min).
pub const TEMP_PROGRAM_OFFSET: f64 = 0.5;

/// Selects which strategy the controller runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ControlMode {
    Manual = 0,
    TimeProgram = 1,
    TempProgram = 2,
}

impl ControlMode {
    /// Map the numeric mode used on the command surface.
    pub fn from_index(idx: u8) -> Option<Self> {
        match idx {
            0 => Some(Self::Manual),
            1 => Some(Self::TimeProgram),
            2 => Some(Self::TempProgram),
            _ => None,
        }
    }

    /// Programmed modes arm the hot-jet pulse on a triggered start.
    pub fn is_programmed(self) -> bool {
        matches!(self, Self::TimeProgram | Self::TempProgram)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Manual
// ═══════════════════════════════════════════════════════════════

/// Fixed operator setpoint bounded by inclusive limits.
#[derive(Debug, Clone, PartialEq)]
pub struct ManualFlow {
    limits: (f64, f64),
    flow_rate: f64,
}

impl Default for ManualFlow {
    fn default() -> Self {
        Self::new(0.0, (0.0, 20.0))
    }
}

impl ManualFlow {
    /// An out-of-range `initial` leaves the setpoint at 0.0.
    pub fn new(initial: f64, limits: (f64, f64)) -> Self {
        let mut flow = Self { limits, flow_rate: 0.0 };
        flow.set_flow_rate(initial);
        flow
    }

    /// Apply a new setpoint.  Values outside the limits are rejected, not
    /// clamped.  Returns whether the value was accepted.
    pub fn set_flow_rate(&mut self, flow: f64) -> bool {
        if flow >= self.limits.0 && flow <= self.limits.1 {
            self.flow_rate = flow;
            true
        } else {
            false
        }
    }

    pub fn flow_rate(&self) -> f64 {
        self.flow_rate
    }

    pub fn limits(&self) -> (f64, f64) {
        self.limits
    }
}

// ═══════════════════════════════════════════════════════════════
//  Time program
// ═══════════════════════════════════════════════════════════════

/// Step program: one flow value per `interval_secs` slot, holding the last
/// value once the program runs out.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeProgram {
    program: Vec<f64>,
    interval_secs: f64,
}

impl Default for TimeProgram {
    fn default() -> Self {
        Self {
            program: Vec::new(),
            interval_secs: 1.0,
        }
    }
}

impl TimeProgram {
    pub fn new(program: Vec<f64>, interval_secs: f64) -> Self {
        let mut p = Self {
            program,
            ..Self::default()
        };
        p.set_time_interval(interval_secs);
        p
    }

    pub fn set_program(&mut self, program: Vec<f64>) {
        self.program = program;
    }

    pub fn program(&self) -> &[f64] {
        &self.program
    }

    /// Non-positive or non-finite intervals are ignored.
    pub fn set_time_interval(&mut self, secs: f64) {
        if secs.is_finite() && secs > 0.0 {
            self.interval_secs = secs;
        }
    }

    pub fn time_interval(&self) -> f64 {
        self.interval_secs
    }

    /// Program slot for `elapsed_secs`, clamped into the program.
    fn step_index(&self, elapsed_secs: f64) -> usize {
        let last = self.program.len().saturating_sub(1);
        let slot = (elapsed_secs / self.interval_secs).floor();
        // NaN and negative elapsed time both land on the first step.
        if slot.is_nan() || slot < 0.0 {
            return 0;
        }
        // `as usize` saturates for +inf and huge values.
        (slot as usize).min(last)
    }

    pub fn flow_at(&self, elapsed_secs: f64) -> f64 {
        if self.program.is_empty() {
            return EMPTY_PROGRAM_FLOW;
        }
        self.program[self.step_index(elapsed_secs)]
    }
}

// ═══════════════════════════════════════════════════════════════
//  Temperature program
// ═══════════════════════════════════════════════════════════════

/// Flow as a cubic of oven temperature above [`TEMP_PROGRAM_THRESHOLD_C`].
#[derive(Debug, Clone, PartialEq)]
pub struct TempProgram {
    /// Reported to the operator only; the curve is evaluated every tick.
    interval_secs: f64,
}

impl Default for TempProgram {
    fn default() -> Self {
        Self {
            interval_secs: 30.0,
        }
    }
}

impl TempProgram {
    pub fn set_time_interval(&mut self, secs: f64) {
        if secs.is_finite() && secs > 0.0 {
            self.interval_secs = secs;
        }
    }

    pub fn time_interval(&self) -> f64 {
        self.interval_secs
    }

    /// Threshold is exclusive: exactly 60 °C still returns the fallback.
    pub fn temp_to_flow(&self, temp_c: f64) -> f64 {
        if temp_c > TEMP_PROGRAM_THRESHOLD_C {
            -4.366e-7 * temp_c.powi(3) + 4.625e-4 * temp_c.powi(2) - 0.1678 * temp_c
                + 22.69
                + TEMP_PROGRAM_OFFSET
        } else {
            TEMP_PROGRAM_FALLBACK_FLOW
        }
    }

    pub fn flow_at(&self, temp_c: Option<f64>) -> f64 {
        temp_c.map_or(TEMP_PROGRAM_FALLBACK_FLOW, |t| self.temp_to_flow(t))
    }
}

// ═══════════════════════════════════════════════════════════════
//  Strategy dispatch
// ═══════════════════════════════════════════════════════════════

/// The active flow algorithm.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowStrategy {
    Manual(ManualFlow),
    TimeProgram(TimeProgram),
    TempProgram(TempProgram),
}

impl FlowStrategy {
    /// Library defaults for `mode`.
    pub fn for_mode(mode: ControlMode) -> Self {
        match mode {
            ControlMode::Manual => Self::Manual(ManualFlow::default()),
            ControlMode::TimeProgram => Self::TimeProgram(TimeProgram::default()),
            ControlMode::TempProgram => Self::TempProgram(TempProgram::default()),
        }
    }

    /// Fresh instance for `mode` using the configured limits and intervals.
    pub fn configured(mode: ControlMode, config: &ControllerConfig) -> Self {
        match mode {
            ControlMode::Manual => Self::Manual(ManualFlow::new(0.0, config.flow_limits)),
            ControlMode::TimeProgram => Self::TimeProgram(TimeProgram::new(
                Vec::new(),
                config.time_program_interval_secs,
            )),
            ControlMode::TempProgram => {
                let mut p = TempProgram::default();
                p.set_time_interval(config.temp_program_interval_secs);
                Self::TempProgram(p)
            }
        }
    }

    pub fn mode(&self) -> ControlMode {
        match self {
            Self::Manual(_) => ControlMode::Manual,
            Self::TimeProgram(_) => ControlMode::TimeProgram,
            Self::TempProgram(_) => ControlMode::TempProgram,
        }
    }

    /// Flow target for this tick.  Never fails.
    pub fn flow_rate(&self, elapsed_secs: f64, temp_c: Option<f64>) -> f64 {
        match self {
            Self::Manual(m) => m.flow_rate(),
            Self::TimeProgram(p) => p.flow_at(elapsed_secs),
            Self::TempProgram(p) => p.flow_at(temp_c),
        }
    }

    /// Manual only.  Returns `false` when ignored or rejected.
    pub fn set_flow_rate(&mut self, flow: f64) -> bool {
        match self {
            Self::Manual(m) => m.set_flow_rate(flow),
            _ => false,
        }
    }

    /// Time program only.
    pub fn set_program(&mut self, program: Vec<f64>) {
        if let Self::TimeProgram(p) = self {
            p.set_program(program);
        }
    }

    /// Time and temperature programs.
    pub fn set_time_interval(&mut self, secs: f64) {
        match self {
            Self::Manual(_) => {}
            Self::TimeProgram(p) => p.set_time_interval(secs),
            Self::TempProgram(p) => p.set_time_interval(secs),
        }
    }

    pub fn time_interval(&self) -> Option<f64> {
        match self {
            Self::Manual(_) => None,
            Self::TimeProgram(p) => Some(p.time_interval()),
            Self::TempProgram(p) => Some(p.time_interval()),
        }
    }
}
