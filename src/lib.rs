//! GCxGC flow controller library.
//!
//! Exposes the run controller, flow strategies and adapters for the host
//! binary and for integration testing.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod control;
pub mod error;
pub mod fsm;
pub mod scheduler;
pub mod sensors;
