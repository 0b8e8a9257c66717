//! Fixed-period tick scheduling.
//!
//! The controller owns exactly one [`TickSchedule`].  Re-registering the
//! job replaces the pending one; the host loop only has to call
//! [`RunController::poll`](crate::app::controller::RunController::poll)
//! often enough.
//!
//! ```text
//!   schedule(now) ──▶ fire now, next_due = now + period
//!                          │
//!   poll(t) ── t < next_due ──▶ (nothing)
//!          └─ t >= next_due ──▶ fire, next_due += period
//!                               (skips forward past missed periods)
//!   cancel() ──▶ disarmed, poll never fires
//! ```

use log::info;

// ═══════════════════════════════════════════════════════════════
//  Schedule engine
// ═══════════════════════════════════════════════════════════════

/// A single periodic job registration.
#[derive(Debug, Clone)]
pub struct TickSchedule {
    /// Human-readable label used in log lines.
    label: &'static str,
    period_secs: f64,
    /// Monotonic time the next tick is due, `None` when not registered.
    next_due: Option<f64>,
    /// Number of ticks fired through `poll`.
    fired: u64,
}

impl TickSchedule {
    /// A disarmed schedule.  Non-positive or non-finite periods fall back to 1 s.
    pub fn new(label: &'static str, period_secs: f64) -> Self {
        let period_secs = if period_secs.is_finite() && period_secs > 0.0 {
            period_secs
        } else {
            1.0
        };
        Self {
            label,
            period_secs,
            next_due: None,
            fired: 0,
        }
    }

    /// Register (or re-register) the job.  The caller fires the immediate
    /// tick; the next one falls due one period after `now`.
    pub fn arm(&mut self, now: f64) {
        if self.next_due.is_some() {
            info!("Scheduler: '{}' replaced pending registration", self.label);
        } else {
            info!("Scheduler: '{}' armed every {}s", self.label, self.period_secs);
        }
        self.next_due = Some(now + self.period_secs);
    }

    /// Drop the registration.  Safe to call when already disarmed.
    pub fn cancel(&mut self) {
        if self.next_due.take().is_some() {
            info!("Scheduler: '{}' cancelled", self.label);
        }
    }

    pub fn is_armed(&self) -> bool {
        self.next_due.is_some()
    }

    pub fn period_secs(&self) -> f64 {
        self.period_secs
    }

    pub fn next_due(&self) -> Option<f64> {
        self.next_due
    }

    pub fn fired(&self) -> u64 {
        self.fired
    }

    /// Returns `true` when a tick is due at `now`, re-arming for the next
    /// period.  Missed periods collapse into a single tick.
    pub fn poll(&mut self, now: f64) -> bool {
        let Some(due) = self.next_due else {
            return false;
        };
        if now < due {
            return false;
        }
        let missed = ((now - due) / self.period_secs).floor();
        let mut next = due + (missed + 1.0) * self.period_secs;
        if next <= now {
            next += self.period_secs;
        }
        self.next_due = Some(next);
        self.fired += 1;
        true
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
