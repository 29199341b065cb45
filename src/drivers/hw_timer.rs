//! Ramp engine tick source, built on ESP-IDF's esp_timer API.
//!
//! One periodic timer pushes [`Event::Tick`] into the event queue.  The
//! callback runs in the esp_timer task (not ISR), and `push_event` never
//! blocks, so a busy main loop costs dropped ticks rather than a stalled
//! timer task.

#[cfg(target_os = "espidf")]
use crate::events::{push_event, Event};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
static mut TICK_TIMER: esp_timer_handle_t = core::ptr::null_mut();

#[cfg(target_os = "espidf")]
unsafe extern "C" fn tick_cb(_arg: *mut core::ffi::c_void) {
    if !push_event(Event::Tick) {
        log::debug!("hw_timer: queue full, tick dropped");
    }
}

/// Timer period in microseconds for a tick interval in milliseconds.
pub const fn period_us(tick_interval_ms: u32) -> u64 {
    tick_interval_ms as u64 * 1_000
}

/// Start the periodic tick timer.
#[cfg(target_os = "espidf")]
pub fn start_tick_timer(tick_interval_ms: u32) -> Result<(), crate::error::Error> {
    use crate::error::Error;

    // SAFETY: TICK_TIMER is written here once at boot from the main task,
    // before the timer can fire.  The callback never touches it.
    unsafe {
        let args = esp_timer_create_args_t {
            callback: Some(tick_cb),
            arg: core::ptr::null_mut(),
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
            name: c"tick".as_ptr(),
            skip_unhandled_events: true,
        };
        let ret = esp_timer_create(&args, &raw mut TICK_TIMER);
        if ret != ESP_OK {
            log::error!("hw_timer: create failed (rc={})", ret);
            return Err(Error::Init("tick timer create"));
        }
        let ret = esp_timer_start_periodic(TICK_TIMER, period_us(tick_interval_ms));
        if ret != ESP_OK {
            log::error!("hw_timer: start failed (rc={})", ret);
            return Err(Error::Init("tick timer start"));
        }
    }
    log::info!("hw_timer: tick every {} ms", tick_interval_ms);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn start_tick_timer(tick_interval_ms: u32) -> Result<(), crate::error::Error> {
    log::info!(
        "hw_timer(sim): {} ms tick not started (tests push Event::Tick directly)",
        tick_interval_ms
    );
    Ok(())
}
