//! Hardware timer module using ESP-IDF's esp_timer API.
//!
//! Creates periodic timers that push events into the lock-free SPSC queue.
//! On simulation targets the timers are not started; tests drive the loop
//! directly.
//!
//! Timer callbacks execute in the ESP timer task context (not ISR), so
//! they can safely call push_event().

#[cfg(target_os = "espidf")]
use crate::events::{Event, push_event};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

/// Telemetry base tick period — the fastest publish cadence.
pub const TELEMETRY_BASE_PERIOD_US: u64 = 10_000_000;

#[cfg(target_os = "espidf")]
static mut CONTROL_TIMER: esp_timer_handle_t = core::ptr::null_mut();
#[cfg(target_os = "espidf")]
static mut TELEMETRY_TIMER: esp_timer_handle_t = core::ptr::null_mut();

/// SAFETY: CONTROL_TIMER is written once in `start_timers()` before any
/// timer callbacks fire.  Only called from the single main task.
#[cfg(target_os = "espidf")]
unsafe fn control_timer() -> esp_timer_handle_t {
    unsafe { CONTROL_TIMER }
}

/// SAFETY: Same invariants as `control_timer()`.
#[cfg(target_os = "espidf")]
unsafe fn telemetry_timer() -> esp_timer_handle_t {
    unsafe { TELEMETRY_TIMER }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn control_tick_cb(_arg: *mut core::ffi::c_void) {
    push_event(Event::ControlTick);
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn telemetry_tick_cb(_arg: *mut core::ffi::c_void) {
    push_event(Event::TelemetryBaseTick);
}

/// Start the hardware tick timers.
///
/// - control tick at `control_period_ms` (20 Hz by default)
/// - telemetry base tick at 10 s
#[cfg(target_os = "espidf")]
pub fn start_timers(control_period_ms: u32) {
    // SAFETY: CONTROL_TIMER and TELEMETRY_TIMER are written here once at
    // boot from the single main-task context before any callbacks fire.
    // The callbacks themselves only call push_event(), which is lock-free.
    unsafe {
        let control_args = esp_timer_create_args_t {
            callback: Some(control_tick_cb),
            arg: core::ptr::null_mut(),
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
            name: b"control\0".as_ptr() as *const _,
            skip_unhandled_events: false,
        };
        let ret = esp_timer_create(&control_args, &raw mut CONTROL_TIMER);
        if ret != ESP_OK {
            log::error!(
                "hw_timer: control timer create failed (rc={}) — continuing without ticks",
                ret
            );
            return;
        }
        let ret = esp_timer_start_periodic(CONTROL_TIMER, u64::from(control_period_ms) * 1_000);
        if ret != ESP_OK {
            log::error!("hw_timer: control timer start failed (rc={})", ret);
            return;
        }

        let telemetry_args = esp_timer_create_args_t {
            callback: Some(telemetry_tick_cb),
            arg: core::ptr::null_mut(),
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
            name: b"telemetry\0".as_ptr() as *const _,
            skip_unhandled_events: false,
        };
        let ret = esp_timer_create(&telemetry_args, &raw mut TELEMETRY_TIMER);
        if ret != ESP_OK {
            log::error!("hw_timer: telemetry timer create failed (rc={})", ret);
            return;
        }
        let ret = esp_timer_start_periodic(TELEMETRY_TIMER, TELEMETRY_BASE_PERIOD_US);
        if ret != ESP_OK {
            log::error!("hw_timer: telemetry timer start failed (rc={})", ret);
            return;
        }

        info!(
            "hw_timer: control@{}ms + telemetry@10s started",
            control_period_ms
        );
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn start_timers(_control_period_ms: u32) {
    log::info!("hw_timer(sim): timers not started (events driven by test loop)");
}

/// Stop all hardware tick timers.
#[cfg(target_os = "espidf")]
pub fn stop_timers() {
    // SAFETY: handles are valid if start_timers() succeeded; the null
    // check prevents stopping a timer that was never created.
    unsafe {
        let ct = control_timer();
        if !ct.is_null() {
            esp_timer_stop(ct);
        }
        let tt = telemetry_timer();
        if !tt.is_null() {
            esp_timer_stop(tt);
        }
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn stop_timers() {}
