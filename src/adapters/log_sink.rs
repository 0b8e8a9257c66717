//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured controller events to the
//! `log` facade (console via `env_logger` in the host binary).  A display
//! or network adapter would implement the same trait.

use log::{debug, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`].
pub struct LogEventSink;

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

fn temp(t: Option<f64>) -> String {
    t.map_or_else(|| "--".to_string(), |v| format!("{v:.1}"))
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Telemetry(t) => {
                debug!(
                    "TELEM | phase={} mode={:?} | t={:.1}s | flow={:.2}L/min | \
                     T=[{}, {}, {}, {}]\u{00b0}C | rows={}",
                    t.phase.name(),
                    t.mode,
                    t.elapsed_secs,
                    t.flow_rate,
                    temp(t.temperatures[0]),
                    temp(t.temperatures[1]),
                    temp(t.temperatures[2]),
                    temp(t.temperatures[3]),
                    t.logged_rows,
                );
            }
            AppEvent::StateChanged { from, to } => {
                info!("STATE | {} -> {}", from.name(), to.name());
            }
            AppEvent::RunStarted { triggered } => {
                info!("RUN | started (triggered={})", triggered);
            }
            AppEvent::RunStopped { elapsed_secs } => {
                info!("RUN | stopped at {:.1}s", elapsed_secs);
            }
            AppEvent::TriggerReceived => info!("TRIG | received"),
            AppEvent::TriggerCancelled => info!("TRIG | cancelled"),
            AppEvent::TimeExceeded { elapsed_secs } => {
                info!("RUN | time exceeded at {:.1}s", elapsed_secs);
            }
            AppEvent::CoolingStarted => info!("COOL | interlock on"),
            AppEvent::CoolingFinished { temperature_c } => {
                info!("COOL | interlock off at {:.1}\u{00b0}C", temperature_c);
            }
            AppEvent::PulseArmed {
                roll_value,
                high_count,
            } => {
                info!("PULSE | armed roll={} high={}", roll_value, high_count);
            }
            AppEvent::PulseDisarmed => info!("PULSE | disarmed"),
            AppEvent::ModeChanged(mode) => info!("MODE | {:?}", mode),
            AppEvent::LogFlushed { path, rows } => {
                info!("LOG | {} rows -> {}", rows, path.display());
            }
            AppEvent::LogFlushFailed { reason } => {
                warn!("LOG | flush failed: {}", reason);
            }
        }
    }
}
