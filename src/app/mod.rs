//! Application core: pure domain logic, zero I/O.
//!
//! Channel control, ramping, status cadence and persistence policy for the
//! dimmer.  All interaction with hardware happens through **port traits**
//! defined in [`ports`], keeping this layer fully testable without real
//! peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
