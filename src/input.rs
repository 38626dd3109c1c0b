//! Debounced input reader — sensor hysteresis plus button gesture detection.
//!
//! Raw GPIO levels come in through [`InputPort`](crate::app::ports::InputPort)
//! once per control tick; this module turns them into trusted readings:
//!
//! - each sensor and button line must hold a new level for four consecutive
//!   samples before the debounced state flips (`debouncr` stateful debouncer);
//! - debounced button activity is classified into gestures:
//!
//! | Gesture       | Condition                                   |
//! |---------------|---------------------------------------------|
//! | Short press   | Release before the long-press threshold     |
//! | Long press    | Hold past `LiftConfig::long_press_ms`       |
//! | Both pressed  | Both buttons down together (emergency stop) |
//!
//! Two simultaneous presses are always one `BothPressed` gesture, never two
//! independent single-button events.  The reader has no side effects; it
//! never touches actuation.

use debouncr::{DebouncerStateful, Repeat4, debounce_stateful_4};
use heapless::Vec;

use crate::config::LiftConfig;
use crate::fleet::MAX_PODS;

/// Raw input levels for one pod, normalised to logical polarity by the
/// hardware adapter (`true` = sensor in contact / button held down).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawInputs {
    pub top_sensor: bool,
    pub bot_sensor: bool,
    pub up_button: bool,
    pub down_button: bool,
}

/// Which of the two pod buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonId {
    Up,
    Down,
}

/// A classified button gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonGesture {
    Short(ButtonId),
    Long(ButtonId),
    BothPressed,
}

/// Debounced reading for one pod on one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebouncedInputs {
    pub top_wet: bool,
    pub bot_wet: bool,
    /// At most one gesture completes per tick.
    pub gesture: Option<ButtonGesture>,
}

// ---------------------------------------------------------------------------
// Gesture state machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GesturePhase {
    Idle,
    /// One button held; waiting for release, the long-press threshold, or
    /// the second button.
    Held { btn: ButtonId, since_ms: u32 },
    /// A long press or both-press already fired; swallow input until both
    /// buttons are released.
    WaitRelease,
}

struct PodInputState {
    top: DebouncerStateful<u8, Repeat4>,
    bot: DebouncerStateful<u8, Repeat4>,
    up_btn: DebouncerStateful<u8, Repeat4>,
    down_btn: DebouncerStateful<u8, Repeat4>,
    phase: GesturePhase,
}

impl PodInputState {
    fn new() -> Self {
        Self {
            top: debounce_stateful_4(false),
            bot: debounce_stateful_4(false),
            up_btn: debounce_stateful_4(false),
            down_btn: debounce_stateful_4(false),
            phase: GesturePhase::Idle,
        }
    }
}

/// Per-pod debouncers and gesture classifiers.
pub struct InputReader {
    pods: Vec<PodInputState, MAX_PODS>,
    long_press_ms: u32,
}

impl InputReader {
    pub fn new(config: &LiftConfig) -> Self {
        let mut pods = Vec::new();
        for _ in 0..config.pod_count.min(MAX_PODS) {
            // Capacity is MAX_PODS and the count is clamped above.
            let _ = pods.push(PodInputState::new());
        }
        Self {
            pods,
            long_press_ms: config.long_press_ms,
        }
    }

    /// Pick up runtime-updated timing parameters.
    pub fn reconfigure(&mut self, config: &LiftConfig) {
        self.long_press_ms = config.long_press_ms;
    }

    /// Feed one raw sample for `pod` and return the debounced reading.
    ///
    /// `now_ms` is a monotonic millisecond clock; callers advance it by the
    /// tick period, which lets tests simulate elapsed time without delays.
    pub fn sample(&mut self, pod: usize, raw: RawInputs, now_ms: u32) -> DebouncedInputs {
        let Some(state) = self.pods.get_mut(pod) else {
            return DebouncedInputs {
                top_wet: false,
                bot_wet: false,
                gesture: None,
            };
        };

        state.top.update(raw.top_sensor);
        state.bot.update(raw.bot_sensor);
        state.up_btn.update(raw.up_button);
        state.down_btn.update(raw.down_button);

        let up = state.up_btn.is_high();
        let down = state.down_btn.is_high();
        let gesture = Self::classify(&mut state.phase, up, down, now_ms, self.long_press_ms);

        DebouncedInputs {
            top_wet: state.top.is_high(),
            bot_wet: state.bot.is_high(),
            gesture,
        }
    }

    fn classify(
        phase: &mut GesturePhase,
        up: bool,
        down: bool,
        now_ms: u32,
        long_press_ms: u32,
    ) -> Option<ButtonGesture> {
        match *phase {
            GesturePhase::Idle => {
                if up && down {
                    *phase = GesturePhase::WaitRelease;
                    return Some(ButtonGesture::BothPressed);
                }
                if up {
                    *phase = GesturePhase::Held {
                        btn: ButtonId::Up,
                        since_ms: now_ms,
                    };
                } else if down {
                    *phase = GesturePhase::Held {
                        btn: ButtonId::Down,
                        since_ms: now_ms,
                    };
                }
                None
            }

            GesturePhase::Held { btn, since_ms } => {
                // Second button joining upgrades the gesture.
                if up && down {
                    *phase = GesturePhase::WaitRelease;
                    return Some(ButtonGesture::BothPressed);
                }

                let still_held = match btn {
                    ButtonId::Up => up,
                    ButtonId::Down => down,
                };

                if !still_held {
                    *phase = GesturePhase::Idle;
                    return Some(ButtonGesture::Short(btn));
                }

                if now_ms.wrapping_sub(since_ms) >= long_press_ms {
                    *phase = GesturePhase::WaitRelease;
                    return Some(ButtonGesture::Long(btn));
                }

                None
            }

            GesturePhase::WaitRelease => {
                if !up && !down {
                    *phase = GesturePhase::Idle;
                }
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICK_MS: u32 = 50;

    fn reader() -> InputReader {
        InputReader::new(&LiftConfig::default())
    }

    /// Run `n` ticks of the same raw sample, returning the last reading.
    fn run(r: &mut InputReader, raw: RawInputs, now_ms: &mut u32, n: u32) -> DebouncedInputs {
        let mut last = DebouncedInputs {
            top_wet: false,
            bot_wet: false,
            gesture: None,
        };
        for _ in 0..n {
            *now_ms += TICK_MS;
            last = r.sample(0, raw, *now_ms);
        }
        last
    }

    #[test]
    fn sensor_needs_four_stable_samples() {
        let mut r = reader();
        let mut now = 0;
        let wet = RawInputs {
            top_sensor: true,
            ..Default::default()
        };
        assert!(!run(&mut r, wet, &mut now, 3).top_wet);
        assert!(run(&mut r, wet, &mut now, 1).top_wet);
    }

    #[test]
    fn sensor_glitch_is_filtered() {
        let mut r = reader();
        let mut now = 0;
        let wet = RawInputs {
            bot_sensor: true,
            ..Default::default()
        };
        run(&mut r, wet, &mut now, 2);
        // Two wet samples, one dry — counter resets, stays dry.
        let out = run(&mut r, RawInputs::default(), &mut now, 1);
        assert!(!out.bot_wet);
        assert!(!run(&mut r, wet, &mut now, 3).bot_wet);
    }

    #[test]
    fn short_press_fires_on_release() {
        let mut r = reader();
        let mut now = 0;
        let pressed = RawInputs {
            up_button: true,
            ..Default::default()
        };
        // Debounce in, hold briefly, release.
        assert_eq!(run(&mut r, pressed, &mut now, 6).gesture, None);
        let mut released = None;
        for _ in 0..6 {
            now += TICK_MS;
            if let Some(g) = r.sample(0, RawInputs::default(), now).gesture {
                released = Some(g);
            }
        }
        assert_eq!(released, Some(ButtonGesture::Short(ButtonId::Up)));
    }

    #[test]
    fn long_press_fires_while_held() {
        let mut r = reader();
        let mut now = 0;
        let pressed = RawInputs {
            down_button: true,
            ..Default::default()
        };
        let ticks = 4 + LiftConfig::default().long_press_ms / TICK_MS + 1;
        let mut fired = None;
        for _ in 0..ticks {
            now += TICK_MS;
            if let Some(g) = r.sample(0, pressed, now).gesture {
                fired = Some(g);
            }
        }
        assert_eq!(fired, Some(ButtonGesture::Long(ButtonId::Down)));

        // Still held: nothing further until release.
        assert_eq!(run(&mut r, pressed, &mut now, 10).gesture, None);
    }

    #[test]
    fn both_buttons_yield_single_combined_gesture() {
        let mut r = reader();
        let mut now = 0;
        let both = RawInputs {
            up_button: true,
            down_button: true,
            ..Default::default()
        };
        let mut gestures = vec![];
        for _ in 0..20 {
            now += TICK_MS;
            if let Some(g) = r.sample(0, both, now).gesture {
                gestures.push(g);
            }
        }
        assert_eq!(gestures, vec![ButtonGesture::BothPressed]);

        // Release both, then a fresh press classifies normally again.
        run(&mut r, RawInputs::default(), &mut now, 6);
        let up = RawInputs {
            up_button: true,
            ..Default::default()
        };
        run(&mut r, up, &mut now, 6);
        let mut released = None;
        for _ in 0..6 {
            now += TICK_MS;
            if let Some(g) = r.sample(0, RawInputs::default(), now).gesture {
                released = Some(g);
            }
        }
        assert_eq!(released, Some(ButtonGesture::Short(ButtonId::Up)));
    }

    #[test]
    fn second_button_upgrades_held_press() {
        let mut r = reader();
        let mut now = 0;
        let up = RawInputs {
            up_button: true,
            ..Default::default()
        };
        run(&mut r, up, &mut now, 6);
        let both = RawInputs {
            up_button: true,
            down_button: true,
            ..Default::default()
        };
        let mut fired = None;
        for _ in 0..6 {
            now += TICK_MS;
            if let Some(g) = r.sample(0, both, now).gesture {
                fired = Some(g);
            }
        }
        assert_eq!(fired, Some(ButtonGesture::BothPressed));
    }

    #[test]
    fn out_of_range_pod_reads_inactive() {
        let mut r = reader();
        let out = r.sample(
            MAX_PODS + 1,
            RawInputs {
                top_sensor: true,
                ..Default::default()
            },
            0,
        );
        assert!(!out.top_wet);
        assert_eq!(out.gesture, None);
    }
}
