//! Run flags and the latest sensor snapshot.
//!
//! `RunState` is the blackboard the tick protocol reads and writes.  Its
//! flags are evaluated in a fixed order each tick; [`RunState::phase`]
//! condenses them into the [`RunPhase`] reported to the outside world.

use chrono::NaiveDateTime;

use crate::config::CHANNEL_COUNT;

use super::RunPhase;

// ---------------------------------------------------------------------------
// Sensor snapshot (written by the sensor hub once per tick)
// ---------------------------------------------------------------------------

/// Oven/jet temperatures read at the start of a tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SensorSnapshot {
    /// °C per channel; `None` when the channel could not be read.
    /// 0 = oven, 1 = cold jet, 2 = hot jet, 3 = second oven.
    pub temperatures: [Option<f64>; CHANNEL_COUNT],
}

impl SensorSnapshot {
    /// Temperature of `channel`; `None` when unavailable or out of range.
    pub fn temperature(&self, channel: usize) -> Option<f64> {
        self.temperatures.get(channel).copied().flatten()
    }
}

// ---------------------------------------------------------------------------
// RunState
// ---------------------------------------------------------------------------

/// Lifecycle flags for the current (or last) run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunState {
    pub is_running: bool,
    /// Run was (or is being) gated on the external trigger.
    pub triggered_start: bool,
    /// Blocking trigger wait in progress.
    pub awaiting_trigger: bool,
    /// Cooling interlock is energised; never true while `is_running`.
    pub oven_is_cooling: bool,
    pub auto_repeat: bool,
    pub logging_active: bool,
    /// Set when the cooling threshold lies inside (20, 250) °C.
    pub cool_oven: bool,

    /// Monotonic origin of elapsed time (seconds).
    pub started_at: f64,
    /// Wall-clock time of the same origin, used to name the run log.
    pub started_wall: NaiveDateTime,

    pub max_duration_secs: f64,
    pub cooling_threshold: Option<f64>,
}

impl RunState {
    pub fn new(started_at: f64, started_wall: NaiveDateTime, max_duration_secs: f64) -> Self {
        Self {
            is_running: false,
            triggered_start: false,
            awaiting_trigger: false,
            oven_is_cooling: false,
            auto_repeat: false,
            logging_active: false,
            cool_oven: false,
            started_at,
            started_wall,
            max_duration_secs,
            cooling_threshold: None,
        }
    }

    /// Phase implied by the flags.
    pub fn phase(&self) -> RunPhase {
        if self.awaiting_trigger {
            RunPhase::WaitingForTrigger
        } else if self.is_running {
            RunPhase::Running
        } else if self.oven_is_cooling {
            RunPhase::Cooling
        } else {
            RunPhase::Idle
        }
    }

    /// Triggered run past its time limit.
    pub fn time_exceeded(&self, elapsed_secs: f64) -> bool {
        self.triggered_start && elapsed_secs > self.max_duration_secs
    }
}
