//! Control algorithms: pure numeric logic with no I/O.
//!
//! - [`flow`]: the flow-rate strategies (manual setpoint, time program,
//!   temperature program) dispatched once per tick.
//! - [`pulse`]: clock divisor / roll value / high-count derivation for the
//!   hot-jet PWM generator.
//! - [`program`]: parsing of time-programmed flow files.

pub mod flow;
pub mod program;
pub mod pulse;
