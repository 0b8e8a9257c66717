//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements   | Connects to                    |
//! |----------------|--------------|--------------------------------|
//! | `config_store` | ConfigPort   | JSON file on disk              |
//! | `detached`     | DevicePort   | nothing (no unit attached)     |
//! | `log_sink`     | EventSink    | `log` facade / console         |
//! | `run_log`      | RunLogSink   | one TSV file per run           |
//! | `simulated`    | DevicePort   | in-process oven/trigger model  |
//! | `time`         | ClockPort    | `Instant` + local time, or sim |

pub mod config_store;
pub mod detached;
pub mod log_sink;
pub mod run_log;
pub mod simulated;
pub mod time;
