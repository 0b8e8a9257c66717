//! Run lifecycle state machine.
//!
//! The controller keeps its lifecycle as a handful of flags in
//! [`RunState`](context::RunState), because the tick protocol evaluates
//! them in a fixed order.  The phase below is *derived* from those flags
//! and tracked so every transition is logged and reported exactly once.
//!
//! ```text
//!        start(trigger)             trigger edge
//!  IDLE ────────────────▶ WAITING ──────────────▶ RUNNING
//!    ▲ ╲                                         │    │
//!    │  ╲──────────── start(no trigger) ────────▶│    │
//!    │                                           │    │
//!    ├─────────────── stop_run ──────────────────┘    │
//!    │                                   time exceeded│+ cooling
//!    │                                                ▼
//!    └──────────[below threshold, no repeat]──── COOLING
//!                                                     │
//!       WAITING ◀──────[below threshold, repeat]──────┘
//! ```

pub mod context;

use log::debug;

// ---------------------------------------------------------------------------
// Phase identity
// ---------------------------------------------------------------------------

/// Enumeration of all run phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RunPhase {
    Idle = 0,
    WaitingForTrigger = 1,
    Running = 2,
    Cooling = 3,
}

impl RunPhase {
    pub fn name(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::WaitingForTrigger => "WaitingForTrigger",
            Self::Running => "Running",
            Self::Cooling => "Cooling",
        }
    }
}

// ---------------------------------------------------------------------------
// Phase tracker
// ---------------------------------------------------------------------------

/// Remembers the last observed phase and how long it has lasted.
pub struct PhaseTracker {
    current: RunPhase,
    /// Monotonically increasing tick counter.
    tick_count: u64,
    /// Tick at which the current phase was entered.
    phase_entry_tick: u64,
}

impl PhaseTracker {
    pub fn new(initial: RunPhase) -> Self {
        Self {
            current: initial,
            tick_count: 0,
            phase_entry_tick: 0,
        }
    }

    /// Count one control tick.
    pub fn tick(&mut self) {
        self.tick_count += 1;
    }

    /// Record the phase derived from the run flags.
    /// Returns `Some((from, to))` when it differs from the last one seen.
    pub fn observe(&mut self, phase: RunPhase) -> Option<(RunPhase, RunPhase)> {
        if phase == self.current {
            return None;
        }
        let from = self.current;
        debug!(
            "FSM transition: {} -> {} after {} ticks",
            from.name(),
            phase.name(),
            self.ticks_in_current_phase()
        );
        self.current = phase;
        self.phase_entry_tick = self.tick_count;
        Some((from, phase))
    }

    pub fn current(&self) -> RunPhase {
        self.current
    }

    /// How many ticks the controller has been in the current phase.
    fn ticks_in_current_phase(&self) -> u64 {
        self.tick_count - self.phase_entry_tick
    }
}
