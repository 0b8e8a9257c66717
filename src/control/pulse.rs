//! Hot-jet pulse timing.
//!
//! The device generates the pulse with a clock (core frequency / divisor,
//! rolling over every `roll_value` counts) feeding a PWM output that stays
//! high for `high_count` counts of each roll.
//!
//! ```text
//!   roll_value = floor(core_hz / (divisor * (1 / period_s)))
//!   high_count = floor(roll_value / (period_s * 1000 / width_ms))
//! ```

use core::ops::RangeInclusive;

use crate::error::PulseError;

/// Accepted pulse period (seconds).
pub const PERIOD_RANGE_SECS: RangeInclusive<f64> = 1.0..=20.0;
/// Accepted pulse width (milliseconds).
pub const WIDTH_RANGE_MS: RangeInclusive<f64> = 100.0..=1000.0;

/// Operator-facing pulse timing, always within the accepted ranges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PulseTiming {
    period_secs: f64,
    width_ms: f64,
}

impl PulseTiming {
    pub fn new(period_secs: f64, width_ms: f64) -> Result<Self, PulseError> {
        check_period(period_secs)?;
        check_width(width_ms)?;
        Ok(Self {
            period_secs,
            width_ms,
        })
    }

    pub fn period_secs(&self) -> f64 {
        self.period_secs
    }

    pub fn width_ms(&self) -> f64 {
        self.width_ms
    }

    /// Replace the period, keeping the width.
    pub fn with_period(self, period_secs: f64) -> Result<Self, PulseError> {
        check_period(period_secs)?;
        Ok(Self {
            period_secs,
            ..self
        })
    }

    /// Replace the width, keeping the period.
    pub fn with_width(self, width_ms: f64) -> Result<Self, PulseError> {
        check_width(width_ms)?;
        Ok(Self { width_ms, ..self })
    }
}

impl Default for PulseTiming {
    /// 1 s period, 500 ms width.
    fn default() -> Self {
        Self {
            period_secs: 1.0,
            width_ms: 500.0,
        }
    }
}

fn check_period(period_secs: f64) -> Result<(), PulseError> {
    if period_secs == 0.0 {
        return Err(PulseError::ZeroPeriod);
    }
    if !PERIOD_RANGE_SECS.contains(&period_secs) {
        return Err(PulseError::OutOfRange {
            field: "period_secs",
            value: period_secs,
            min: *PERIOD_RANGE_SECS.start(),
            max: *PERIOD_RANGE_SECS.end(),
        });
    }
    Ok(())
}

fn check_width(width_ms: f64) -> Result<(), PulseError> {
    if width_ms == 0.0 {
        return Err(PulseError::ZeroWidth);
    }
    if !WIDTH_RANGE_MS.contains(&width_ms) {
        return Err(PulseError::OutOfRange {
            field: "width_ms",
            value: width_ms,
            min: *WIDTH_RANGE_MS.start(),
            max: *WIDTH_RANGE_MS.end(),
        });
    }
    Ok(())
}

/// Register values for the device clock and PWM output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseParameters {
    pub clock_divisor: u32,
    pub roll_value: u32,
    pub high_count: u32,
}

impl PulseParameters {
    /// Derive register values.  Inputs are validated first so the ratios
    /// below never divide by zero.
    pub fn derive(
        period_secs: f64,
        width_ms: f64,
        core_frequency_hz: u32,
        clock_divisor: u32,
    ) -> Result<Self, PulseError> {
        check_period(period_secs)?;
        check_width(width_ms)?;
        if core_frequency_hz == 0 || clock_divisor == 0 {
            return Err(PulseError::InvalidClock);
        }

        let frequency_hz = 1.0 / period_secs;
        let roll_value = (f64::from(core_frequency_hz) / (f64::from(clock_divisor) * frequency_hz)).floor();
        if roll_value > f64::from(u32::MAX) {
            return Err(PulseError::RegisterOverflow { roll_value });
        }
        let duty_cycle_div = period_secs * 1000.0 / width_ms;
        let high_count = (roll_value / duty_cycle_div).floor();

        Ok(Self {
            clock_divisor,
            roll_value: roll_value as u32,
            high_count: high_count as u32,
        })
    }

    pub fn for_timing(
        timing: PulseTiming,
        core_frequency_hz: u32,
        clock_divisor: u32,
    ) -> Result<Self, PulseError> {
        Self::derive(
            timing.period_secs,
            timing.width_ms,
            core_frequency_hz,
            clock_divisor,
        )
    }

    /// Fraction of each period the output is high.
    pub fn duty_cycle(&self) -> f64 {
        if self.roll_value == 0 {
            return 0.0;
        }
        f64::from(self.high_count) / f64::from(self.roll_value)
    }

    /// Actual pulse frequency produced by these registers.
    pub fn output_frequency_hz(&self, core_frequency_hz: u32) -> f64 {
        let counts = f64::from(self.clock_divisor) * f64::from(self.roll_value);
        if counts == 0.0 {
            return 0.0;
        }
        f64::from(core_frequency_hz) / counts
    }
}
