//! Clock adapters.
//!
//! - [`SystemClock`] wraps `std::time::Instant` for the monotonic axis and
//!   the local time zone for log naming.
//! - [`SimClock`] is a shared, manually advanced clock for simulation and
//!   tests.  Clones observe the same time.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

use chrono::{Local, NaiveDateTime, TimeDelta};

use crate::app::ports::ClockPort;

/// Real-time clock for the host binary.
pub struct SystemClock {
    start: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl ClockPort for SystemClock {
    fn now_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    fn wall_clock(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Simulated clock.  Time only moves when [`advance`](Self::advance) or
/// [`set`](Self::set) is called.
#[derive(Debug, Clone)]
pub struct SimClock {
    now: Rc<Cell<f64>>,
    epoch: NaiveDateTime,
}

impl SimClock {
    /// Clock at t = 0 whose wall time starts at `epoch`.
    pub fn new(epoch: NaiveDateTime) -> Self {
        Self {
            now: Rc::new(Cell::new(0.0)),
            epoch,
        }
    }

    pub fn advance(&self, secs: f64) {
        self.now.set(self.now.get() + secs);
    }

    pub fn set(&self, secs: f64) {
        self.now.set(secs);
    }
}

impl ClockPort for SimClock {
    fn now_secs(&self) -> f64 {
        self.now.get()
    }

    fn wall_clock(&self) -> NaiveDateTime {
        let offset = TimeDelta::try_milliseconds((self.now.get() * 1000.0) as i64)
            .unwrap_or(TimeDelta::zero());
        self.epoch
            .checked_add_signed(offset)
            .unwrap_or(self.epoch)
    }
}
