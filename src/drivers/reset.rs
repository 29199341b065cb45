//! Chip restart.
//!
//! Returning from `main` does not reset an ESP32: `app_main` returns, the
//! main task is deleted and every other task keeps running.  Anything that
//! must end in a reboot goes through [`restart`] instead.

use core::fmt::Display;

use log::error;

/// Reboot into whatever partition is marked for boot.
#[cfg(target_os = "espidf")]
pub fn restart() -> ! {
    esp_idf_svc::hal::reset::restart()
}

/// Simulation: there is no chip to reset, so unwind instead.
#[cfg(not(target_os = "espidf"))]
pub fn restart() -> ! {
    panic!("restart requested")
}

/// Log an unrecoverable error and reboot.  Used when an output write
/// fails and the lamp state can no longer be trusted.
pub fn fatal(err: &impl Display) -> ! {
    error!("fatal: {}, restarting", err);
    restart()
}
