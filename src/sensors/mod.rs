//! Sensor subsystem: per-channel conversion and the aggregating [`SensorHub`].
//!
//! The hub owns one [`TemperatureChannel`] per thermocouple input and
//! produces a [`SensorSnapshot`] each tick from raw device voltages.

pub mod temperature;

use log::debug;

use crate::app::ports::DevicePort;
use crate::config::{CHANNEL_COUNT, ChannelCalibration};
use crate::fsm::context::SensorSnapshot;
use temperature::TemperatureChannel;

/// Aggregates all temperature channels and produces a unified snapshot.
pub struct SensorHub {
    channels: [TemperatureChannel; CHANNEL_COUNT],
}

impl SensorHub {
    pub fn new(calibration: &[ChannelCalibration; CHANNEL_COUNT]) -> Self {
        Self {
            channels: calibration.map(TemperatureChannel::new),
        }
    }

    /// Read every channel once and return a unified snapshot.
    ///
    /// A failed read leaves that channel `None` for this tick; the other
    /// channels are still reported.
    pub fn read_all<D: DevicePort + ?Sized>(&self, device: &mut D) -> SensorSnapshot {
        let mut snapshot = SensorSnapshot::default();
        for (index, channel) in self.channels.iter().enumerate() {
            let reading = device
                .read_channel(index)
                .and_then(|volts| channel.volts_to_celsius(volts));
            if reading.is_none() && device.is_attached() {
                debug!("SENSOR | channel {index} unavailable");
            }
            snapshot.temperatures[index] = reading;
        }
        snapshot
    }
}
