//! Unified error types for the run controller.
//!
//! Every fallible edge of the controller has its own small enum so callers
//! can match on exactly what went wrong.  None of these are fatal to the
//! control loop: configuration problems are clamped or ignored at the
//! command surface, sensor gaps travel as `Option<f64>`, and a failed log
//! flush is reported after the run has already been stopped.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::app::controller::StartOutcome;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Errors from loading, validating or persisting [`ControllerConfig`](crate::config::ControllerConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    #[error("validation failed: {0}")]
    ValidationFailed(&'static str),
    /// The backing file could not be read or written.
    #[error("config I/O error: {0}")]
    Io(#[from] io::Error),
    /// The stored config is not valid JSON for this schema.
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Pulse derivation
// ---------------------------------------------------------------------------

/// Rejected inputs to [`PulseParameters::derive`](crate::control::pulse::PulseParameters::derive).
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum PulseError {
    #[error("pulse period must be non-zero")]
    ZeroPeriod,
    #[error("pulse width must be non-zero")]
    ZeroWidth,
    /// Input is finite and non-zero but outside the accepted window.
    #[error("{field} = {value} outside [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("clock divisor and core frequency must be positive")]
    InvalidClock,
    /// The derived roll value does not fit the 32-bit clock register.
    #[error("roll value {roll_value} exceeds the 32-bit clock register")]
    RegisterOverflow { roll_value: f64 },
}

// ---------------------------------------------------------------------------
// Run log flush
// ---------------------------------------------------------------------------

/// Failure while writing a finished run's samples to disk.
#[derive(Debug, Error)]
pub enum RunLogError {
    #[error("failed to write run log {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

// ---------------------------------------------------------------------------
// Flow programs
// ---------------------------------------------------------------------------

/// Errors from reading a time-programmed flow file.
#[derive(Debug, Error)]
pub enum ProgramError {
    #[error("program I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("line {line}: '{text}' is not a flow rate")]
    InvalidLine { line: usize, text: String },
    #[error("program contains no flow values")]
    Empty,
}

// ---------------------------------------------------------------------------
// Command surface
// ---------------------------------------------------------------------------

/// Failure reported by [`RunController::handle_command`](crate::app::controller::RunController::handle_command).
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Log(#[from] RunLogError),
    #[error(transparent)]
    Program(#[from] ProgramError),
    #[error(transparent)]
    Pulse(#[from] PulseError),
    #[error("run not started: {0:?}")]
    NotStarted(StartOutcome),
}
