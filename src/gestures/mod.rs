//! Gesture recognition over per-frame contact sets.
//!
//! The recogniser is an explicit state machine fed once per `SYN_REPORT`
//! frame with the current slot table. It tracks the previous contact count,
//! the previous two-finger distance, the last tap, and a snapshot of the
//! slots taken when the contact count leaves zero, and emits
//! [`TouchEvent`]s for the transitions it observes.
//!
//! Thresholds: swipes need 50 px of dominant-axis travel (and twice the
//! cross-axis travel), pinches need a 20 px distance change, long presses
//! need 500 ms under 20 px of drift, double taps need a second release
//! within 300 ms and 30 px.

use serde::{Deserialize, Serialize};

use crate::pump::{TouchSlot, MAX_SLOTS};

/// Minimum dominant-axis travel for a swipe, in pixels.
pub const SWIPE_MIN_DISTANCE: i32 = 50;
/// Minimum distance delta for a pinch step, in pixels.
pub const PINCH_THRESHOLD: f64 = 20.0;
/// Hold time for a long press, in milliseconds.
pub const LONG_PRESS_THRESHOLD_MS: i64 = 500;
/// Maximum gap between taps of a double tap, in milliseconds.
pub const DOUBLE_TAP_THRESHOLD_MS: i64 = 300;

/// Maximum per-axis drift for a contact to still count as stationary.
const PRESS_DRIFT_PX: i32 = 20;
/// Maximum distance between the taps of a double tap.
const TAP_RADIUS_PX: i32 = 30;

/// Kinds of events the recogniser emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GestureKind {
    /// Contact count left zero.
    TouchDown,
    /// Contact count returned to zero.
    TouchUp,
    /// Contacts moved without changing count.
    TouchMove,
    /// Single contact travelled left.
    SwipeLeft,
    /// Single contact travelled right.
    SwipeRight,
    /// Single contact travelled up.
    SwipeUp,
    /// Single contact travelled down.
    SwipeDown,
    /// Two contacts moved together.
    PinchIn,
    /// Two contacts moved apart.
    PinchOut,
    /// Contact held in place past the hold threshold.
    LongPress,
    /// Two taps in quick succession at the same spot.
    DoubleTap,
    /// Reserved; never emitted by this version.
    Rotate,
}

/// A recognised touch event with the slot state at emission time.
#[derive(Debug, Clone)]
pub struct TouchEvent {
    /// What happened.
    pub kind: GestureKind,
    /// Number of active contacts at emission.
    pub touch_count: usize,
    /// Primary X: mean of the active contacts' calibrated positions.
    pub x: i32,
    /// Primary Y.
    pub y: i32,
    /// Mean raw X of the active contacts.
    pub raw_x: i32,
    /// Mean raw Y.
    pub raw_y: i32,
    /// Gesture magnitude: swipe travel or pinch delta, in pixels.
    pub value: i32,
    /// Snapshot of the active slots at emission.
    pub touches: Vec<TouchSlot>,
    /// Emission time, monotonic milliseconds.
    pub timestamp_ms: i64,
}

/// The gesture state machine.
///
/// Rotation detection is a documented extension point: the two-contact
/// branch already has both positions in hand, but no [`GestureKind::Rotate`]
/// events are produced yet.
#[derive(Debug)]
pub struct GestureRecognizer {
    prev_count: usize,
    prev_distance: f64,
    last_tap_time_ms: i64,
    last_tap_x: i32,
    last_tap_y: i32,
    start_slots: [TouchSlot; MAX_SLOTS],
}

impl Default for GestureRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl GestureRecognizer {
    /// A recogniser with no gesture history.
    pub fn new() -> Self {
        Self {
            prev_count: 0,
            prev_distance: 0.0,
            last_tap_time_ms: 0,
            last_tap_x: 0,
            last_tap_y: 0,
            start_slots: [TouchSlot::default(); MAX_SLOTS],
        }
    }

    /// Process one frame of slot state; returns the events it produced, in
    /// emission order.
    ///
    /// On the transition out of zero contacts the slots' start positions
    /// and timestamps are (re)latched to the current frame, and the table
    /// is snapshotted for later swipe/long-press deltas.
    pub fn on_frame(&mut self, slots: &mut [TouchSlot; MAX_SLOTS], now_ms: i64) -> Vec<TouchEvent> {
        let active: Vec<usize> = (0..MAX_SLOTS).filter(|&i| slots[i].is_active()).collect();
        let count = active.len();

        let (x, y, raw_x, raw_y) = self.primary_position(slots, &active);

        let snapshot = |slots: &[TouchSlot; MAX_SLOTS]| -> Vec<TouchSlot> {
            slots.iter().filter(|s| s.is_active()).copied().collect()
        };

        let mut events = Vec::new();
        let mut emit = |kind, touch_count, px: i32, py: i32, value: i32, slots: &[TouchSlot; MAX_SLOTS]| {
            events.push(TouchEvent {
                kind,
                touch_count,
                x: px,
                y: py,
                raw_x,
                raw_y,
                value,
                touches: snapshot(slots),
                timestamp_ms: now_ms,
            });
        };

        if count > 0 && self.prev_count == 0 {
            for &i in &active {
                slots[i].start_x = slots[i].x;
                slots[i].start_y = slots[i].y;
                slots[i].timestamp_ms = now_ms;
            }
            self.start_slots = *slots;
            emit(GestureKind::TouchDown, count, x, y, 0, slots);
        }

        if count == 0 && self.prev_count > 0 {
            emit(GestureKind::TouchUp, 0, x, y, 0, slots);

            for i in 0..MAX_SLOTS {
                if !self.start_slots[i].is_active() {
                    continue;
                }
                let dx = (slots[i].x - self.start_slots[i].x).abs();
                let dy = (slots[i].y - self.start_slots[i].y).abs();
                let held = now_ms - self.start_slots[i].timestamp_ms;
                if dx < PRESS_DRIFT_PX && dy < PRESS_DRIFT_PX && held >= LONG_PRESS_THRESHOLD_MS {
                    emit(
                        GestureKind::LongPress,
                        1,
                        self.start_slots[i].x,
                        self.start_slots[i].y,
                        0,
                        slots,
                    );
                }
            }

            if self.prev_count == 1 {
                let dx = (x - self.last_tap_x).abs();
                let dy = (y - self.last_tap_y).abs();
                if dx < TAP_RADIUS_PX
                    && dy < TAP_RADIUS_PX
                    && now_ms - self.last_tap_time_ms < DOUBLE_TAP_THRESHOLD_MS
                {
                    emit(GestureKind::DoubleTap, 1, x, y, 0, slots);
                }
                self.last_tap_time_ms = now_ms;
                self.last_tap_x = x;
                self.last_tap_y = y;
            }

            if self.prev_count == 1 {
                if let Some(i) = (0..MAX_SLOTS).find(|&i| self.start_slots[i].is_active()) {
                    let dx = slots[i].x - self.start_slots[i].x;
                    let dy = slots[i].y - self.start_slots[i].y;
                    if dx.abs() > SWIPE_MIN_DISTANCE && dx.abs() > 2 * dy.abs() {
                        let kind = if dx > 0 {
                            GestureKind::SwipeRight
                        } else {
                            GestureKind::SwipeLeft
                        };
                        emit(kind, 1, x, y, dx.abs(), slots);
                    } else if dy.abs() > SWIPE_MIN_DISTANCE && dy.abs() > 2 * dx.abs() {
                        let kind = if dy > 0 {
                            GestureKind::SwipeDown
                        } else {
                            GestureKind::SwipeUp
                        };
                        emit(kind, 1, x, y, dy.abs(), slots);
                    }
                }
            }
        }

        if count > 0 && count == self.prev_count {
            emit(GestureKind::TouchMove, count, x, y, 0, slots);
        }

        if count == 2 && self.prev_count == 2 {
            let a = &slots[active[0]];
            let b = &slots[active[1]];
            let distance = (((a.x - b.x).pow(2) + (a.y - b.y).pow(2)) as f64).sqrt();
            if self.prev_distance > 0.0 {
                let delta = distance - self.prev_distance;
                if delta.abs() > PINCH_THRESHOLD {
                    let kind = if delta > 0.0 {
                        GestureKind::PinchOut
                    } else {
                        GestureKind::PinchIn
                    };
                    emit(kind, 2, x, y, delta.abs().round() as i32, slots);
                }
            }
            self.prev_distance = distance;
        } else if count != 2 {
            // A stale distance must not seed the next two-finger gesture.
            self.prev_distance = 0.0;
        }

        self.prev_count = count;
        events
    }

    /// Mean position of the active contacts; when none are active, the mean
    /// of the gesture's contacts at their last known position.
    fn primary_position(
        &self,
        slots: &[TouchSlot; MAX_SLOTS],
        active: &[usize],
    ) -> (i32, i32, i32, i32) {
        let indices: Vec<usize> = if active.is_empty() {
            (0..MAX_SLOTS)
                .filter(|&i| self.start_slots[i].is_active())
                .collect()
        } else {
            active.to_vec()
        };
        if indices.is_empty() {
            return (0, 0, 0, 0);
        }
        let n = indices.len() as i64;
        let sum = indices.iter().fold((0i64, 0i64, 0i64, 0i64), |acc, &i| {
            (
                acc.0 + slots[i].x as i64,
                acc.1 + slots[i].y as i64,
                acc.2 + slots[i].raw_x as i64,
                acc.3 + slots[i].raw_y as i64,
            )
        });
        (
            (sum.0 / n) as i32,
            (sum.1 / n) as i32,
            (sum.2 / n) as i32,
            (sum.3 / n) as i32,
        )
    }
}
