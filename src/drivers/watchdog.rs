//! Task Watchdog Timer (TWDT) driver.
//!
//! Resets the device if the dispatch loop stalls.  The loop feeds once per
//! iteration; iterations are at most one tick apart while the timer runs.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use log::{info, warn};

/// Default stall budget.  Long enough to cover an HTTP OTA chunk write.
pub const DEFAULT_TIMEOUT_MS: u32 = 10_000;

pub struct Watchdog {
    subscribed: bool,
    #[cfg(not(target_os = "espidf"))]
    feeds: core::cell::Cell<u64>,
}

impl Default for Watchdog {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT_MS)
    }
}

impl Watchdog {
    /// Configure the TWDT and subscribe the calling task.
    pub fn new(timeout_ms: u32) -> Self {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: plain FFI calls with a stack-owned config; the null
            // task handle means "the calling task".
            let subscribed = unsafe {
                let cfg = esp_task_wdt_config_t {
                    timeout_ms,
                    idle_core_mask: 0,
                    trigger_panic: true,
                };
                let ret = esp_task_wdt_reconfigure(&cfg);
                if ret != ESP_OK {
                    warn!("Watchdog: reconfigure returned {}", ret);
                }
                esp_task_wdt_add(core::ptr::null_mut()) == ESP_OK
            };
            if subscribed {
                info!("Watchdog: subscribed ({} ms, panic on trigger)", timeout_ms);
            } else {
                warn!("Watchdog: subscribe failed, running unguarded");
            }
            Self { subscribed }
        }

        #[cfg(not(target_os = "espidf"))]
        {
            info!("Watchdog(sim): {} ms, no-op", timeout_ms);
            if timeout_ms == 0 {
                warn!("Watchdog(sim): zero timeout ignored");
            }
            Self {
                subscribed: true,
                feeds: core::cell::Cell::new(0),
            }
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    /// Feed the watchdog.
    pub fn feed(&self) {
        #[cfg(target_os = "espidf")]
        if self.subscribed {
            // SAFETY: resets the calling task's own TWDT entry.
            unsafe {
                esp_task_wdt_reset();
            }
        }

        #[cfg(not(target_os = "espidf"))]
        self.feeds.set(self.feeds.get() + 1);
    }

    /// Simulation: number of feeds so far.
    #[cfg(not(target_os = "espidf"))]
    pub fn feeds(&self) -> u64 {
        self.feeds.get()
    }
}
