//! Timer-driven event system.
//!
//! Events are produced by:
//! - esp_timer callbacks (control tick, ten-second telemetry base tick)
//! - the comms task (inbound command arrived, hub came back online)
//! - software (watchdog heartbeat)
//!
//! Events are consumed by the main control loop, which processes them one
//! at a time in FIFO order.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ Timer task  │────▶│              │     │              │
//! │ Comms task  │────▶│  Event Queue │────▶│  Main Loop   │
//! │ Software    │────▶│  (lock-free) │     │  (consumer)  │
//! └─────────────┘     └──────────────┘     └──────────────┘
//! ```

use core::sync::atomic::{AtomicU8, Ordering};

/// Maximum number of pending events.
/// Power of 2 for efficient ring buffer modulo.
const EVENT_QUEUE_CAP: usize = 32;

/// System event types, ordered by rough priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Event {
    // ── Control ───────────────────────────────────────────
    /// Control loop tick (20 Hz by default).
    ControlTick = 0,

    // ── Communication ─────────────────────────────────────
    /// An inbound command was queued by the comms task.
    CommandReceived = 10,
    /// The home-automation hub restarted — republish everything.
    HubOnline = 11,
    /// Ten-second telemetry base tick; the cadence scheduler derives the
    /// slower classes from it.
    TelemetryBaseTick = 12,

    // ── Housekeeping ──────────────────────────────────────
    /// Watchdog heartbeat.
    WatchdogTick = 20,
}

// ── Lock-free SPSC ring buffer ────────────────────────────────
//
// Timer/comms tasks write (produce), main loop reads (consume).
// Uses atomic head/tail indices.  The buffer is intentionally kept in a
// static so timer callbacks can access it.

static EVENT_HEAD: AtomicU8 = AtomicU8::new(0);
static EVENT_TAIL: AtomicU8 = AtomicU8::new(0);
// SAFETY: EVENT_BUFFER is accessed exclusively through the SPSC discipline
// below.  Producer (push_event): timer-task context — one writer.
// Consumer (pop_event): main-loop task — one reader.  The atomics on
// head/tail order the accesses.
static mut EVENT_BUFFER: [u8; EVENT_QUEUE_CAP] = [0; EVENT_QUEUE_CAP];

/// Push an event into the queue.
/// Safe to call from timer-callback context (lock-free).
/// Returns `false` if the queue is full (event dropped).
pub fn push_event(event: Event) -> bool {
    let head = EVENT_HEAD.load(Ordering::Relaxed);
    let tail = EVENT_TAIL.load(Ordering::Acquire);
    let next_head = (head + 1) % EVENT_QUEUE_CAP as u8;

    if next_head == tail {
        return false; // Queue full — drop event.
    }

    // SAFETY: single producer; the head slot is not visible to the consumer
    // until the Release store below.
    unsafe {
        EVENT_BUFFER[head as usize] = event as u8;
    }

    EVENT_HEAD.store(next_head, Ordering::Release);
    true
}

/// Pop the next event from the queue.
/// Called from the main loop (single consumer).
/// Returns `None` if the queue is empty.
pub fn pop_event() -> Option<Event> {
    let tail = EVENT_TAIL.load(Ordering::Relaxed);
    let head = EVENT_HEAD.load(Ordering::Acquire);

    if tail == head {
        return None; // Empty.
    }

    let raw = unsafe { EVENT_BUFFER[tail as usize] };
    EVENT_TAIL.store((tail + 1) % EVENT_QUEUE_CAP as u8, Ordering::Release);

    event_from_u8(raw)
}

/// Drain all pending events into a callback, FIFO order.
pub fn drain_events(mut handler: impl FnMut(Event)) {
    while let Some(event) = pop_event() {
        handler(event);
    }
}

/// Check if the event queue is empty.
pub fn queue_is_empty() -> bool {
    let tail = EVENT_TAIL.load(Ordering::Relaxed);
    let head = EVENT_HEAD.load(Ordering::Acquire);
    tail == head
}

/// Number of pending events.
pub fn queue_len() -> usize {
    let head = EVENT_HEAD.load(Ordering::Relaxed) as usize;
    let tail = EVENT_TAIL.load(Ordering::Relaxed) as usize;
    (head + EVENT_QUEUE_CAP - tail) % EVENT_QUEUE_CAP
}

// ── Internal ──────────────────────────────────────────────────

fn event_from_u8(raw: u8) -> Option<Event> {
    match raw {
        0 => Some(Event::ControlTick),
        10 => Some(Event::CommandReceived),
        11 => Some(Event::HubOnline),
        12 => Some(Event::TelemetryBaseTick),
        20 => Some(Event::WatchdogTick),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The queue is a process-wide static; run the assertions as one test
    // to avoid cross-test interference.
    #[test]
    fn fifo_push_pop_drain() {
        while pop_event().is_some() {}

        assert!(queue_is_empty());
        assert!(push_event(Event::ControlTick));
        assert!(push_event(Event::TelemetryBaseTick));
        assert_eq!(queue_len(), 2);

        assert_eq!(pop_event(), Some(Event::ControlTick));
        assert_eq!(pop_event(), Some(Event::TelemetryBaseTick));
        assert_eq!(pop_event(), None);

        for _ in 0..5 {
            push_event(Event::WatchdogTick);
        }
        let mut seen = 0;
        drain_events(|e| {
            assert_eq!(e, Event::WatchdogTick);
            seen += 1;
        });
        assert_eq!(seen, 5);
        assert!(queue_is_empty());
    }
}
