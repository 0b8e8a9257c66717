//! Outbound application events.
//!
//! The [`RunController`](super::controller::RunController) emits these
//! through the [`EventSink`](super::ports::EventSink) port.  Adapters on
//! the other side decide what to do with them: log to the console, drive a
//! status display, or record them in a test.

use std::path::PathBuf;

use crate::config::CHANNEL_COUNT;
use crate::control::flow::ControlMode;
use crate::fsm::RunPhase;

/// Structured events emitted by the run controller.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// Per-tick telemetry snapshot.
    Telemetry(TelemetryData),

    /// The derived run phase changed.
    StateChanged { from: RunPhase, to: RunPhase },

    /// A run began (carries whether it was trigger-gated).
    RunStarted { triggered: bool },

    /// A run stopped (carries the elapsed seconds at stop time).
    RunStopped { elapsed_secs: f64 },

    /// The autosampler trigger edge was seen.
    TriggerReceived,

    /// A blocking trigger wait was abandoned.
    TriggerCancelled,

    /// A triggered run passed its maximum duration.
    TimeExceeded { elapsed_secs: f64 },

    /// The cooling interlock was energised.
    CoolingStarted,

    /// The second oven dropped below the cooling threshold.
    CoolingFinished { temperature_c: f64 },

    /// Pulse output was programmed with these register values.
    PulseArmed { roll_value: u32, high_count: u32 },

    /// Pulse output was disabled.
    PulseDisarmed,

    /// Control mode switched.
    ModeChanged(ControlMode),

    /// A run log was written.
    LogFlushed { path: PathBuf, rows: usize },

    /// Writing a run log failed; the samples were discarded.
    LogFlushFailed { reason: String },
}

/// A point-in-time telemetry snapshot suitable for logging or display.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryData {
    pub phase: RunPhase,
    pub mode: ControlMode,
    pub elapsed_secs: f64,
    pub flow_rate: f64,
    pub temperatures: [Option<f64>; CHANNEL_COUNT],
    pub logged_rows: usize,
}
