//! Runtime diagnostics reported through the telemetry entities.
//!
//! Covers the bookkeeping the hub displays alongside the lift state:
//! firmware version, formatted uptime, and free heap.

use heapless::String;

/// Firmware version string published with the `version` entity.
pub fn firmware_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Format an uptime for the hub's duration entity: `"3d 04:05:06"`.
pub fn format_uptime(uptime_secs: u64) -> String<24> {
    let days = uptime_secs / 86_400;
    let hours = (uptime_secs % 86_400) / 3_600;
    let mins = (uptime_secs % 3_600) / 60;
    let secs = uptime_secs % 60;

    let mut out = String::new();
    // 24 bytes always fits "<u64>d hh:mm:ss"; format failures truncate.
    if days > 0 {
        let _ = core::fmt::write(
            &mut out,
            format_args!("{days}d {hours:02}:{mins:02}:{secs:02}"),
        );
    } else {
        let _ = core::fmt::write(&mut out, format_args!("{hours:02}:{mins:02}:{secs:02}"));
    }
    out
}

/// Free heap in bytes (0 on host targets).
#[cfg(target_os = "espidf")]
pub fn free_heap_bytes() -> u32 {
    unsafe { esp_idf_svc::sys::esp_get_free_heap_size() }
}

/// Free heap in bytes (0 on host targets).
#[cfg(not(target_os = "espidf"))]
pub fn free_heap_bytes() -> u32 {
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_nonempty() {
        assert!(!firmware_version().is_empty());
    }

    #[test]
    fn uptime_formatting() {
        assert_eq!(format_uptime(0).as_str(), "00:00:00");
        assert_eq!(format_uptime(61).as_str(), "00:01:01");
        assert_eq!(format_uptime(3_600 * 5 + 62).as_str(), "05:01:02");
        assert_eq!(format_uptime(86_400 * 3 + 3_906).as_str(), "3d 01:05:06");
    }
}
