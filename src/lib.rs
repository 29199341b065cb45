//! Fishtank dimmer firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod channel;
pub mod config;
pub mod duty;
pub mod error;
pub mod events;
pub mod persist;
pub mod pins;
pub mod ramp;
pub mod report;
pub mod topic;

pub mod adapters;
pub mod drivers;
pub mod sensors;
