//! Adapter for running without an acquisition unit.
//!
//! Every read is unavailable and every write is dropped; the controller
//! still runs its lifecycle against it.

use crate::app::ports::DevicePort;

#[derive(Debug, Default, Clone, Copy)]
pub struct DetachedDevice;

impl DevicePort for DetachedDevice {
    fn is_attached(&self) -> bool {
        false
    }

    fn read_channel(&mut self, _index: usize) -> Option<f64> {
        None
    }

    fn write_analog(&mut self, _name: &str, _value: f64) {}

    fn write_digital(&mut self, _channel: u8, _state: bool) {}

    fn configure_clock(&mut self, _divisor: u32, _roll_value: u32) {}

    fn configure_pwm(&mut self, _high_count: u32) {}

    fn disable_pwm(&mut self) {}

    fn read_trigger_input(&mut self) -> Option<bool> {
        None
    }
}
