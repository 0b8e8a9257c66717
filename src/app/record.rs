//! Run log record model and text formatting.
//!
//! One [`LogSample`] is captured per tick while a triggered run is logging.
//! Rows are rendered tab-delimited with two decimals:
//!
//! ```text
//! minutes \t flow \t T0 \t T1 \t T2 \t T3
//! ```

use crate::config::CHANNEL_COUNT;

/// One tick of a logged run.  Immutable once appended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogSample {
    elapsed_minutes: f64,
    flow_rate: f64,
    temperatures: [Option<f64>; CHANNEL_COUNT],
}

impl LogSample {
    pub fn new(
        elapsed_minutes: f64,
        flow_rate: f64,
        temperatures: [Option<f64>; CHANNEL_COUNT],
    ) -> Self {
        Self {
            elapsed_minutes,
            flow_rate,
            temperatures,
        }
    }

    pub fn elapsed_minutes(&self) -> f64 {
        self.elapsed_minutes
    }

    pub fn flow_rate(&self) -> f64 {
        self.flow_rate
    }

    pub fn temperatures(&self) -> &[Option<f64>; CHANNEL_COUNT] {
        &self.temperatures
    }

    /// Tab-delimited row without a line terminator.
    /// Unavailable temperatures are written as `NaN`.
    pub fn to_row(&self) -> String {
        let mut row = format!("{:.2}\t{:.2}", self.elapsed_minutes, self.flow_rate);
        for t in &self.temperatures {
            row.push('\t');
            row.push_str(&format!("{:.2}", t.unwrap_or(f64::NAN)));
        }
        row
    }
}

/// Seconds as decimal minutes, e.g. `754.0` → `"12.57"`.
pub fn format_minutes(seconds: f64) -> String {
    format!("{:.2}", seconds / 60.0)
}

/// Seconds as `HH:MM:SS`.  Negative and non-finite input renders as zero.
pub fn format_hms(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total / 60) % 60,
        total % 60
    )
}
