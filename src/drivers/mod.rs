//! Tick timer, watchdog and restart drivers.

pub mod hw_timer;
pub mod reset;
pub mod watchdog;
