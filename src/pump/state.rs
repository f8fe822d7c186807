//! Frame assembly and the bounded event queue.
//!
//! The reader thread decodes kernel events into [`PumpInput`]s and feeds
//! them through [`PumpState::apply`]. All per-slot updates between two
//! `SYN_REPORT`s belong to one frame and are applied atomically under the
//! touch lock before any gesture is emitted for that frame.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::trace;

use crate::calibration::Calibration;
use crate::gestures::{GestureKind, GestureRecognizer, TouchEvent};

use super::mitm::MitmRepublisher;
use super::slots::{TouchSlot, MAX_SLOTS};

/// Queue capacity; on overflow the oldest event is dropped.
pub const MAX_EVENTS: usize = 32;

/// Raw range the PS/2 mouse emulation confines its synthetic contact to.
const MOUSE_RAW_MAX: i32 = 4095;

/// Monotonic milliseconds since the first call in this process.
pub(crate) fn now_ms() -> i64 {
    use std::sync::OnceLock;
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    EPOCH.get_or_init(Instant::now).elapsed().as_millis() as i64
}

/// One decoded kernel event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PumpInput {
    /// `ABS_MT_SLOT`: select the slot subsequent events address.
    Slot(i32),
    /// `ABS_MT_TRACKING_ID`: activate (>= 0) or release (-1) the slot.
    TrackingId(i32),
    /// `ABS_MT_POSITION_X` for the current slot.
    PositionX(i32),
    /// `ABS_MT_POSITION_Y` for the current slot.
    PositionY(i32),
    /// Single-touch `ABS_X`, always slot 0.
    AbsoluteX(i32),
    /// Single-touch `ABS_Y`, always slot 0.
    AbsoluteY(i32),
    /// Contact key (`BTN_TOUCH`, or the pen/left-button fallback).
    Contact(bool),
    /// `REL_X`, accumulated into slot 0 while it is active.
    RelativeX(i32),
    /// `REL_Y`, accumulated into slot 0 while it is active.
    RelativeY(i32),
    /// PS/2 left button state; activation seeds the contact at raw centre.
    MouseButton(bool),
    /// PS/2 movement deltas (Y already flipped to screen orientation).
    MouseMove(i32, i32),
    /// `SYN_REPORT`: close the frame.
    SynReport,
}

/// Mutable pump state guarded by the touch mutex.
pub(crate) struct PumpState {
    pub slots: [TouchSlot; MAX_SLOTS],
    pub calibration: Calibration,
    pub recognizer: GestureRecognizer,
    pub mitm: Option<MitmRepublisher>,
    current_slot: i32,
    dirty: bool,
}

impl PumpState {
    pub(crate) fn new() -> Self {
        Self {
            slots: [TouchSlot::default(); MAX_SLOTS],
            calibration: Calibration::default(),
            recognizer: GestureRecognizer::new(),
            mitm: None,
            current_slot: 0,
            dirty: false,
        }
    }

    fn current(&mut self) -> Option<&mut TouchSlot> {
        usize::try_from(self.current_slot)
            .ok()
            .filter(|&i| i < MAX_SLOTS)
            .map(|i| &mut self.slots[i])
    }

    fn recalibrate(slot: &mut TouchSlot, calibration: &Calibration) {
        let (x, y) = calibration.apply(slot.raw_x, slot.raw_y);
        slot.x = x;
        slot.y = y;
    }

    /// Apply one decoded event. Returns the frame's gesture events when the
    /// input closes a frame that changed anything, an empty vector
    /// otherwise.
    pub(crate) fn apply(&mut self, input: PumpInput, now_ms: i64) -> Vec<TouchEvent> {
        match input {
            PumpInput::Slot(index) => {
                // Out-of-range slots park the state so their events are
                // ignored until the next ABS_MT_SLOT.
                self.current_slot = index;
            }
            PumpInput::TrackingId(id) => {
                let calibration = self.calibration.clone();
                if let Some(slot) = self.current() {
                    slot.tracking_id = id;
                    if id >= 0 {
                        Self::recalibrate(slot, &calibration);
                        slot.start_x = slot.x;
                        slot.start_y = slot.y;
                        slot.timestamp_ms = now_ms;
                    }
                    self.dirty = true;
                }
            }
            PumpInput::PositionX(raw) => {
                let calibration = self.calibration.clone();
                if let Some(slot) = self.current() {
                    slot.raw_x = raw;
                    Self::recalibrate(slot, &calibration);
                    self.dirty = true;
                }
            }
            PumpInput::PositionY(raw) => {
                let calibration = self.calibration.clone();
                if let Some(slot) = self.current() {
                    slot.raw_y = raw;
                    Self::recalibrate(slot, &calibration);
                    self.dirty = true;
                }
            }
            PumpInput::AbsoluteX(raw) => {
                self.slots[0].raw_x = raw;
                Self::recalibrate(&mut self.slots[0], &self.calibration);
                self.dirty = true;
            }
            PumpInput::AbsoluteY(raw) => {
                self.slots[0].raw_y = raw;
                Self::recalibrate(&mut self.slots[0], &self.calibration);
                self.dirty = true;
            }
            PumpInput::Contact(pressed) => {
                let slot = &mut self.slots[0];
                if pressed {
                    if !slot.is_active() {
                        slot.tracking_id = 0;
                        slot.start_x = slot.x;
                        slot.start_y = slot.y;
                        slot.timestamp_ms = now_ms;
                    }
                } else {
                    slot.tracking_id = -1;
                }
                self.dirty = true;
            }
            PumpInput::RelativeX(delta) => {
                if self.slots[0].is_active() {
                    self.slots[0].raw_x += delta;
                    Self::recalibrate(&mut self.slots[0], &self.calibration);
                    self.dirty = true;
                }
            }
            PumpInput::RelativeY(delta) => {
                if self.slots[0].is_active() {
                    self.slots[0].raw_y += delta;
                    Self::recalibrate(&mut self.slots[0], &self.calibration);
                    self.dirty = true;
                }
            }
            PumpInput::MouseButton(pressed) => {
                let calibration = self.calibration.clone();
                let slot = &mut self.slots[0];
                if pressed {
                    if !slot.is_active() {
                        slot.tracking_id = 0;
                        slot.raw_x = MOUSE_RAW_MAX / 2 + 1;
                        slot.raw_y = MOUSE_RAW_MAX / 2 + 1;
                        Self::recalibrate(slot, &calibration);
                        slot.start_x = slot.x;
                        slot.start_y = slot.y;
                        slot.timestamp_ms = now_ms;
                    }
                } else if slot.is_active() {
                    slot.tracking_id = -1;
                }
                self.dirty = true;
            }
            PumpInput::MouseMove(dx, dy) => {
                let calibration = self.calibration.clone();
                let slot = &mut self.slots[0];
                if slot.is_active() {
                    slot.raw_x = (slot.raw_x + dx).clamp(0, MOUSE_RAW_MAX);
                    slot.raw_y = (slot.raw_y + dy).clamp(0, MOUSE_RAW_MAX);
                    Self::recalibrate(slot, &calibration);
                    self.dirty = true;
                }
            }
            PumpInput::SynReport => {
                if self.dirty {
                    self.dirty = false;
                    return self.close_frame(now_ms);
                }
            }
        }
        Vec::new()
    }

    /// Run the gesture pass and mirror the frame to the MITM device.
    fn close_frame(&mut self, now_ms: i64) -> Vec<TouchEvent> {
        let events = self.recognizer.on_frame(&mut self.slots, now_ms);
        if let Some(mitm) = self.mitm.as_mut() {
            for event in &events {
                match event.kind {
                    GestureKind::TouchDown | GestureKind::TouchMove => {
                        mitm.emit_touch(event.x, event.y);
                    }
                    GestureKind::TouchUp => mitm.emit_release(),
                    _ => {}
                }
            }
        }
        trace!(count = events.len(), "frame closed");
        events
    }

    pub(crate) fn touch_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_active()).count()
    }

    /// The `index`-th active slot, counted in table order.
    pub(crate) fn active_slot(&self, index: usize) -> Option<&TouchSlot> {
        self.slots.iter().filter(|s| s.is_active()).nth(index)
    }

    pub(crate) fn active_touches(&self) -> Vec<TouchSlot> {
        self.slots.iter().filter(|s| s.is_active()).copied().collect()
    }
}

/// Bounded event queue shared between the reader thread and consumers.
pub(crate) struct EventQueue {
    inner: Mutex<VecDeque<TouchEvent>>,
    cv: Condvar,
}

impl EventQueue {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(MAX_EVENTS)),
            cv: Condvar::new(),
        }
    }

    /// Enqueue, dropping the oldest event when full. Never blocks.
    pub(crate) fn push(&self, event: TouchEvent) {
        let mut queue = self.inner.lock();
        if queue.len() == MAX_EVENTS {
            queue.pop_front();
        }
        queue.push_back(event);
        drop(queue);
        self.cv.notify_one();
    }

    pub(crate) fn pop(&self) -> Option<TouchEvent> {
        self.inner.lock().pop_front()
    }

    pub(crate) fn clear(&self) {
        self.inner.lock().clear();
    }

    /// Block until an event arrives, the timeout lapses, or `running`
    /// clears. Each internal wait is bounded to one second so a stop
    /// becomes visible even on an unbounded timeout.
    pub(crate) fn wait(&self, timeout: Option<Duration>, running: &AtomicBool) -> Option<TouchEvent> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut queue = self.inner.lock();
        loop {
            if let Some(event) = queue.pop_front() {
                return Some(event);
            }
            if !running.load(Ordering::Acquire) {
                return None;
            }
            let max_slice = Duration::from_secs(1);
            let slice = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return None;
                    }
                    remaining.min(max_slice)
                }
                None => max_slice,
            };
            self.cv.wait_for(&mut queue, slice);
        }
    }

    /// Wake all waiters (used by stop).
    pub(crate) fn notify_all(&self) {
        self.cv.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gestures::GestureKind;

    fn mt_frame(state: &mut PumpState, inputs: &[PumpInput], now: i64) -> Vec<TouchEvent> {
        let mut events = Vec::new();
        for &input in inputs {
            events.extend(state.apply(input, now));
        }
        events.extend(state.apply(PumpInput::SynReport, now));
        events
    }

    fn calibrated_state() -> PumpState {
        let mut state = PumpState::new();
        state.calibration = Calibration::minmax(0.0, 4095.0, 0.0, 4095.0, 1920, 1080);
        state
    }

    #[test]
    fn single_touch_tap_scenario() {
        let mut state = calibrated_state();

        let events = mt_frame(
            &mut state,
            &[
                PumpInput::Slot(0),
                PumpInput::TrackingId(123),
                PumpInput::PositionX(2048),
                PumpInput::PositionY(1024),
            ],
            0,
        );
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, GestureKind::TouchDown);
        assert_eq!(events[0].touch_count, 1);
        assert_eq!((events[0].x, events[0].y), (960, 270));
        assert_eq!((events[0].raw_x, events[0].raw_y), (2048, 1024));

        let events = mt_frame(&mut state, &[PumpInput::TrackingId(-1)], 50);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, GestureKind::TouchUp);
        assert_eq!(events[0].touch_count, 0);
        assert_eq!(state.touch_count(), 0);
    }

    #[test]
    fn swipe_right_scenario() {
        let mut state = calibrated_state();

        mt_frame(
            &mut state,
            &[
                PumpInput::Slot(0),
                PumpInput::TrackingId(5),
                PumpInput::PositionX(500),
                PumpInput::PositionY(2048),
            ],
            0,
        );
        for (t, raw_x) in [(10, 1500), (20, 2600), (30, 3800)] {
            mt_frame(&mut state, &[PumpInput::PositionX(raw_x)], t);
        }
        let events = mt_frame(&mut state, &[PumpInput::TrackingId(-1)], 40);

        let swipe = events
            .iter()
            .find(|e| e.kind == GestureKind::SwipeRight)
            .expect("swipe expected");
        // First x = 234, last x = 1781 under this calibration.
        assert_eq!(swipe.value, 1781 - 234);
    }

    #[test]
    fn long_press_scenario() {
        let mut state = calibrated_state();

        mt_frame(
            &mut state,
            &[
                PumpInput::Slot(0),
                PumpInput::TrackingId(8),
                PumpInput::PositionX(2133),
                PumpInput::PositionY(3796),
            ],
            0,
        );
        let events = mt_frame(&mut state, &[PumpInput::TrackingId(-1)], 700);
        let kinds: Vec<GestureKind> = events.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![GestureKind::TouchUp, GestureKind::LongPress]);
        assert_eq!((events[1].x, events[1].y), (1000, 1000));
    }

    #[test]
    fn pinch_out_scenario() {
        let mut state = calibrated_state();

        // Two contacts whose calibrated distance is ~100 px.
        mt_frame(
            &mut state,
            &[
                PumpInput::Slot(0),
                PumpInput::TrackingId(1),
                PumpInput::PositionX(1066),
                PumpInput::PositionY(1024),
                PumpInput::Slot(1),
                PumpInput::TrackingId(2),
                PumpInput::PositionX(1279),
                PumpInput::PositionY(1024),
            ],
            0,
        );
        // Seed prev_distance.
        mt_frame(&mut state, &[PumpInput::Slot(0), PumpInput::PositionX(1066)], 10);
        // Spread the contacts.
        let events = mt_frame(
            &mut state,
            &[
                PumpInput::Slot(0),
                PumpInput::PositionX(640),
                PumpInput::Slot(1),
                PumpInput::PositionX(1706),
            ],
            20,
        );
        let pinch = events
            .iter()
            .find(|e| e.kind == GestureKind::PinchOut)
            .expect("pinch expected");
        assert!(pinch.value > 150, "value={}", pinch.value);
    }

    #[test]
    fn events_for_invalid_slots_are_ignored() {
        let mut state = calibrated_state();

        let events = mt_frame(
            &mut state,
            &[
                PumpInput::Slot(MAX_SLOTS as i32),
                PumpInput::TrackingId(9),
                PumpInput::PositionX(100),
            ],
            0,
        );
        assert!(events.is_empty());
        assert_eq!(state.touch_count(), 0);

        // Selecting a valid slot again resumes processing.
        let events = mt_frame(
            &mut state,
            &[PumpInput::Slot(2), PumpInput::TrackingId(9)],
            10,
        );
        assert_eq!(events.len(), 1);
        assert_eq!(state.touch_count(), 1);
    }

    #[test]
    fn empty_frames_emit_nothing() {
        let mut state = calibrated_state();
        assert!(state.apply(PumpInput::SynReport, 0).is_empty());
        assert!(state.apply(PumpInput::SynReport, 10).is_empty());
    }

    #[test]
    fn contact_key_drives_slot_zero() {
        let mut state = calibrated_state();

        mt_frame(
            &mut state,
            &[PumpInput::AbsoluteX(2048), PumpInput::AbsoluteY(2048)],
            0,
        );
        assert_eq!(state.touch_count(), 0, "position alone must not activate");

        let events = mt_frame(&mut state, &[PumpInput::Contact(true)], 10);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, GestureKind::TouchDown);

        let events = mt_frame(&mut state, &[PumpInput::Contact(false)], 20);
        assert_eq!(events[0].kind, GestureKind::TouchUp);
    }

    #[test]
    fn relative_motion_requires_active_contact() {
        let mut state = calibrated_state();

        let events = mt_frame(&mut state, &[PumpInput::RelativeX(50)], 0);
        assert!(events.is_empty());

        mt_frame(&mut state, &[PumpInput::Contact(true)], 10);
        let before = state.slots[0].raw_x;
        mt_frame(&mut state, &[PumpInput::RelativeX(50)], 20);
        assert_eq!(state.slots[0].raw_x, before + 50);
    }

    #[test]
    fn mouse_button_seeds_centre_and_moves_clamp() {
        let mut state = calibrated_state();

        let events = mt_frame(&mut state, &[PumpInput::MouseButton(true)], 0);
        assert_eq!(events[0].kind, GestureKind::TouchDown);
        assert_eq!(state.slots[0].raw_x, 2048);

        mt_frame(&mut state, &[PumpInput::MouseMove(-10_000, 0)], 10);
        assert_eq!(state.slots[0].raw_x, 0);

        let events = mt_frame(&mut state, &[PumpInput::MouseButton(false)], 20);
        assert_eq!(events[0].kind, GestureKind::TouchUp);
    }

    #[test]
    fn calibration_updates_are_visible_to_later_frames() {
        let mut state = calibrated_state();
        mt_frame(
            &mut state,
            &[
                PumpInput::Slot(0),
                PumpInput::TrackingId(1),
                PumpInput::PositionX(4095),
                PumpInput::PositionY(0),
            ],
            0,
        );
        assert_eq!((state.slots[0].x, state.slots[0].y), (1919, 0));

        state.calibration = Calibration::minmax(0.0, 4095.0, 0.0, 4095.0, 800, 480);
        mt_frame(&mut state, &[PumpInput::PositionX(4095)], 10);
        assert_eq!(state.slots[0].x, 799);
    }

    #[test]
    fn queue_drops_oldest_on_overflow() {
        let queue = EventQueue::new();
        let template = TouchEvent {
            kind: GestureKind::TouchMove,
            touch_count: 1,
            x: 0,
            y: 0,
            raw_x: 0,
            raw_y: 0,
            value: 0,
            touches: Vec::new(),
            timestamp_ms: 0,
        };
        for i in 0..(MAX_EVENTS + 8) {
            let mut event = template.clone();
            event.value = i as i32;
            queue.push(event);
        }
        let first = queue.pop().unwrap();
        assert_eq!(first.value, 8, "oldest events must have been dropped");
        let mut count = 1;
        while queue.pop().is_some() {
            count += 1;
        }
        assert_eq!(count, MAX_EVENTS);
    }

    #[test]
    fn wait_returns_none_when_not_running() {
        let queue = EventQueue::new();
        let running = AtomicBool::new(false);
        assert!(queue
            .wait(Some(Duration::from_millis(10)), &running)
            .is_none());
    }

    #[test]
    fn wait_times_out_without_events() {
        let queue = EventQueue::new();
        let running = AtomicBool::new(true);
        let started = Instant::now();
        assert!(queue
            .wait(Some(Duration::from_millis(25)), &running)
            .is_none());
        assert!(started.elapsed() >= Duration::from_millis(25));
    }
}
