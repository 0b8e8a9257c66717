//! Thermocouple amplifier channel.
//!
//! Each channel is a thermocouple amplifier whose analog output spans
//! `chart_span` °C over 10 V, offset by the nominal temperature at 0 V.
//!
//! ```text
//!   T = (chart_span * V + 10 * t_nom) / 10
//! ```

use crate::config::ChannelCalibration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureChannel {
    calibration: ChannelCalibration,
}

impl TemperatureChannel {
    pub fn new(calibration: ChannelCalibration) -> Self {
        Self { calibration }
    }

    /// Convert an amplifier voltage to °C.  Non-finite input (or a result
    /// that overflows) reads as unavailable.
    pub fn volts_to_celsius(&self, volts: f64) -> Option<f64> {
        if !volts.is_finite() {
            return None;
        }
        let c = &self.calibration;
        let celsius = (c.chart_span * volts + 10.0 * c.t_nom) / 10.0;
        celsius.is_finite().then_some(celsius)
    }
}
