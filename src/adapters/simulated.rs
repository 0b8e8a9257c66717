//! Simulated acquisition unit.
//!
//! Stands in for the real instrument on the host: a first-order oven
//! model, jet temperatures derived from it, and an autosampler trigger
//! that fires after a fixed number of polls.  Temperatures are reported
//! as amplifier voltages so the controller's calibration path is the same
//! as on hardware.
//!
//! ```text
//!   oven  ── heats at `heat_rate` toward `setpoint` ──┐
//!            cools toward `ambient` while interlocked ◀┘ (digital 2)
//!   jet_cold = fixed, jet_hot = oven + 30
//! ```

use log::debug;

use crate::app::ports::{COOLING_CHANNEL, ClockPort, DevicePort, PULSE_CHANNEL};
use crate::config::{CHANNEL_COUNT, ChannelCalibration};

use super::time::SimClock;

/// Oven behaviour of the simulated instrument.
#[derive(Debug, Clone, Copy)]
pub struct OvenModel {
    pub ambient_c: f64,
    /// Temperature the oven program heats toward (°C).
    pub setpoint_c: f64,
    /// Heating ramp (°C/s).
    pub heat_rate: f64,
    /// Fraction of the gap to ambient closed per second while cooling.
    pub cool_fraction: f64,
    pub cold_jet_c: f64,
    pub hot_jet_offset_c: f64,
}

impl Default for OvenModel {
    fn default() -> Self {
        Self {
            ambient_c: 25.0,
            setpoint_c: 300.0,
            heat_rate: 0.5,
            cool_fraction: 0.02,
            cold_jet_c: -150.0,
            hot_jet_offset_c: 30.0,
        }
    }
}

pub struct SimulatedDevice {
    clock: SimClock,
    calibration: [ChannelCalibration; CHANNEL_COUNT],
    model: OvenModel,
    oven_c: f64,
    last_update: f64,

    /// Trigger reads low after this many polls of a wait.
    trigger_after_polls: u32,
    polls: u32,

    cooling: bool,
}

impl SimulatedDevice {
    pub fn new(
        clock: SimClock,
        calibration: [ChannelCalibration; CHANNEL_COUNT],
        model: OvenModel,
        trigger_after_polls: u32,
    ) -> Self {
        let last_update = clock.now_secs();
        Self {
            clock,
            calibration,
            oven_c: model.ambient_c,
            model,
            last_update,
            trigger_after_polls,
            polls: 0,
            cooling: false,
        }
    }

    /// Force the oven to `temp_c`; the model continues from there.
    pub fn set_oven_temperature(&mut self, temp_c: f64) {
        self.oven_c = temp_c;
    }

    /// Advance the oven model to the current simulated time.
    fn update(&mut self) {
        let now = self.clock.now_secs();
        let dt = (now - self.last_update).max(0.0);
        self.last_update = now;
        if dt == 0.0 {
            return;
        }
        let m = &self.model;
        if self.cooling {
            let keep = (1.0 - m.cool_fraction).clamp(0.0, 1.0).powf(dt);
            self.oven_c = m.ambient_c + (self.oven_c - m.ambient_c) * keep;
        } else {
            self.oven_c = (self.oven_c + m.heat_rate * dt).min(m.setpoint_c);
        }
    }

    fn channel_temperature(&self, index: usize) -> Option<f64> {
        match index {
            0 | 3 => Some(self.oven_c),
            1 => Some(self.model.cold_jet_c),
            2 => Some(self.oven_c + self.model.hot_jet_offset_c),
            _ => None,
        }
    }

    /// Inverse of the amplifier calibration.
    fn to_volts(cal: ChannelCalibration, temp_c: f64) -> Option<f64> {
        if cal.chart_span == 0.0 {
            return None;
        }
        Some(10.0 * (temp_c - cal.t_nom) / cal.chart_span)
    }
}

impl DevicePort for SimulatedDevice {
    fn is_attached(&self) -> bool {
        true
    }

    fn read_channel(&mut self, index: usize) -> Option<f64> {
        self.update();
        let cal = *self.calibration.get(index)?;
        Self::to_volts(cal, self.channel_temperature(index)?)
    }

    fn write_analog(&mut self, name: &str, value: f64) {
        debug!("SimDevice: {name} <- {value:.3} V");
    }

    fn write_digital(&mut self, channel: u8, state: bool) {
        self.update();
        if channel == COOLING_CHANNEL {
            self.cooling = state;
        }
        debug!("SimDevice: FIO{channel} <- {}", u8::from(state));
    }

    fn configure_clock(&mut self, divisor: u32, roll_value: u32) {
        debug!("SimDevice: clock divisor={divisor} roll={roll_value}");
    }

    fn configure_pwm(&mut self, high_count: u32) {
        debug!("SimDevice: PWM on FIO{PULSE_CHANNEL}, high={high_count}");
    }

    fn disable_pwm(&mut self) {
        debug!("SimDevice: PWM off");
    }

    fn read_trigger_input(&mut self) -> Option<bool> {
        self.polls += 1;
        if self.polls >= self.trigger_after_polls {
            self.polls = 0;
            Some(false)
        } else {
            Some(true)
        }
    }
}
