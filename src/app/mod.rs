//! Application core: run lifecycle and flow control, no direct I/O.
//!
//! This module contains the controller that ties flow strategies, the
//! cooling interlock and run logging together.  All interaction with the
//! instrument happens through **port traits** defined in [`ports`],
//! keeping this layer fully testable without real hardware.

pub mod commands;
pub mod controller;
pub mod events;
pub mod ports;
pub mod record;
