//! Inbound commands to the run controller.
//!
//! These represent operator actions (CLI, front panel, scripted sequence)
//! that the [`RunController`](super::controller::RunController)
//! interprets and acts upon.

use std::path::PathBuf;

use crate::control::flow::ControlMode;

/// Commands that external adapters can send into the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    /// Start a run, optionally gated on the trigger and resetting elapsed time.
    Start { wait_for_trigger: bool, reset_time: bool },

    /// Stop the current run and flush its log.
    StopRun,

    /// Stop the run and the periodic tick.
    StopAll,

    /// Abandon a blocking trigger wait.
    CancelTrigger,

    SetMode(ControlMode),
    SetRepeat(bool),
    SetFlowRate(f64),
    SetProgram(Vec<f64>),

    /// Load a flow program from a text file (one value per line).
    LoadProgram(PathBuf),

    SetTimeInterval(f64),
    SetCoolingThreshold(f64),
    SetMaxDuration(f64),
    SetPulsePeriod(f64),
    SetPulseWidth(f64),

    StartPulse,
    StopPulse,
}
