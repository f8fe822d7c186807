//! The public pump surface and its reader thread.

use std::fs::File;
use std::io::Read;
use std::os::fd::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use evdev::{AbsoluteAxisCode, Device, EventType, InputEvent, KeyCode, RelativeAxisCode, SynchronizationCode};
use parking_lot::{Condvar, Mutex};
use tracing::{debug, info, warn};

use crate::calibration::{fit_from_corners, Calibration, CalibrationMode};
use crate::gestures::{GestureKind, TouchEvent};

use super::mitm::MitmRepublisher;
use super::slots::TouchSlot;
use super::state::{now_ms, EventQueue, PumpInput, PumpState};
use super::{PumpError, Result};

/// Poll timeout for the reader loop; bounds how long stop and grab
/// requests wait for the loop to notice them.
const POLL_SLICE_MS: i32 = 250;

type EventCallback = Arc<dyn Fn(&TouchEvent) + Send + Sync>;

struct Shared {
    running: AtomicBool,
    grab_requested: AtomicBool,
    touch: Mutex<PumpState>,
    queue: EventQueue,
    callback: Mutex<Option<EventCallback>>,
    selected_device: Mutex<Option<PathBuf>>,
}

impl Shared {
    fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            grab_requested: AtomicBool::new(false),
            touch: Mutex::new(PumpState::new()),
            queue: EventQueue::new(),
            callback: Mutex::new(None),
            selected_device: Mutex::new(None),
        }
    }

    /// Close one frame's worth of inputs: run the gesture pass under the
    /// touch lock, then enqueue and deliver outside it. Lock order is
    /// always touch before queue.
    fn feed(&self, input: PumpInput) {
        let now = now_ms();
        let events = self.touch.lock().apply(input, now);
        if events.is_empty() {
            return;
        }
        let callback = self.callback.lock().clone();
        for event in events {
            self.queue.push(event.clone());
            if let Some(callback) = &callback {
                callback(&event);
            }
        }
    }
}

/// Options for an interactive four-corner calibration run.
#[derive(Debug, Clone)]
pub struct CalibrationRun {
    /// Target screen width in pixels.
    pub screen_width: i32,
    /// Target screen height.
    pub screen_height: i32,
    /// Fit model to solve for.
    pub mode: CalibrationMode,
    /// Dead-zone margin per side, percent of the raw range.
    pub margin_percent: f64,
    /// How long to wait for each corner touch.
    pub corner_timeout: Duration,
}

impl CalibrationRun {
    /// Defaults: MinMax fit, no margin, 15 s per corner.
    pub fn new(screen_width: i32, screen_height: i32) -> Self {
        Self {
            screen_width,
            screen_height,
            mode: CalibrationMode::MinMax,
            margin_percent: 0.0,
            corner_timeout: Duration::from_secs(15),
        }
    }
}

/// The touch event pump.
///
/// Dropping a running pump stops it: the reader thread is joined, an
/// exclusive grab is released, and the MITM device is destroyed.
///
/// Calibration and offset setters are safe to call while the reader is
/// running; the next frame picks up the new mapping. The event callback
/// runs on the reader thread and must not re-enter pump APIs.
pub struct TouchPump {
    shared: Arc<Shared>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl Default for TouchPump {
    fn default() -> Self {
        Self::new()
    }
}

impl TouchPump {
    /// A pump with default calibration and no device.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared::new()),
            reader: Mutex::new(None),
        }
    }

    /// Open `path` and start the reader thread.
    ///
    /// Nodes whose name contains `mouse` are read as 3-byte PS/2 packets;
    /// anything else is treated as an evdev node.
    pub fn start(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if self.shared.running.load(Ordering::Acquire) {
            return Err(PumpError::AlreadyRunning);
        }

        let is_mouse = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.contains("mouse"));

        let backend = if is_mouse {
            let file = File::open(path).map_err(|source| PumpError::OpenDevice {
                path: path.to_path_buf(),
                source,
            })?;
            Backend::Mouse(file)
        } else {
            let device = Device::open(path).map_err(|source| PumpError::OpenDevice {
                path: path.to_path_buf(),
                source,
            })?;
            let has_btn_touch = device
                .supported_keys()
                .is_some_and(|keys| keys.contains(KeyCode::BTN_TOUCH));
            debug!(
                path = %path.display(),
                name = device.name().unwrap_or("?"),
                has_btn_touch,
                "opened input device"
            );
            Backend::Evdev {
                device,
                has_btn_touch,
            }
        };

        *self.shared.selected_device.lock() = Some(path.to_path_buf());
        self.shared.running.store(true, Ordering::Release);

        let shared = self.shared.clone();
        let handle = thread::Builder::new()
            .name("touchmap-reader".into())
            .spawn(move || reader_main(shared, backend))
            .map_err(|e| {
                self.shared.running.store(false, Ordering::Release);
                PumpError::Io(e)
            })?;
        *self.reader.lock() = Some(handle);

        info!(path = %path.display(), "pump started");
        Ok(())
    }

    /// Probe `/dev/input` for a usable device: mouse-like nodes first, then
    /// `event*` nodes, then everything else. The first node that starts
    /// successfully wins.
    pub fn start_auto(&self) -> Result<()> {
        if self.shared.running.load(Ordering::Acquire) {
            return Err(PumpError::AlreadyRunning);
        }

        let mut mice = Vec::new();
        let mut events = Vec::new();
        let mut others = Vec::new();
        let entries = std::fs::read_dir("/dev/input")?;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                continue;
            }
            match path.file_name().and_then(|n| n.to_str()) {
                Some(name) if name.contains("mouse") => mice.push(path),
                Some(name) if name.contains("event") => events.push(path),
                Some(_) => others.push(path),
                None => {}
            }
        }
        mice.sort();
        events.sort();
        others.sort();

        for candidate in mice.into_iter().chain(events).chain(others) {
            match self.start(&candidate) {
                Ok(()) => {
                    info!(path = %candidate.display(), "auto-detected input device");
                    return Ok(());
                }
                Err(e) => debug!(path = %candidate.display(), "candidate rejected: {e}"),
            }
        }
        Err(PumpError::NoDevice)
    }

    /// Stop the reader thread and release all resources. Idempotent; a
    /// caller blocked in [`wait_for_event`](Self::wait_for_event) returns
    /// within a second.
    pub fn stop(&self) {
        self.shared.running.store(false, Ordering::Release);
        self.shared.queue.notify_all();
        if let Some(handle) = self.reader.lock().take() {
            if let Err(e) = handle.join() {
                warn!("reader thread panicked: {e:?}");
            }
        }
        // The uinput device is destroyed when the republisher drops.
        self.shared.touch.lock().mitm = None;
        self.shared.grab_requested.store(false, Ordering::Release);
        info!("pump stopped");
    }

    /// Whether the reader thread is alive.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// The device node the pump is reading, once started.
    pub fn selected_device(&self) -> Option<PathBuf> {
        self.shared.selected_device.lock().clone()
    }

    /// Register the event callback, replacing any previous one. It is
    /// invoked on the reader thread after the event is enqueued.
    pub fn set_callback<F>(&self, callback: F)
    where
        F: Fn(&TouchEvent) + Send + Sync + 'static,
    {
        *self.shared.callback.lock() = Some(Arc::new(callback));
    }

    /// Remove the event callback.
    pub fn clear_callback(&self) {
        *self.shared.callback.lock() = None;
    }

    /// Number of currently active contacts.
    pub fn touch_count(&self) -> usize {
        self.shared.touch.lock().touch_count()
    }

    /// Calibrated position of the `index`-th active contact.
    pub fn touch_position(&self, index: usize) -> Option<(i32, i32)> {
        self.shared
            .touch
            .lock()
            .active_slot(index)
            .map(|s| (s.x, s.y))
    }

    /// Raw position of the `index`-th active contact.
    pub fn raw_position(&self, index: usize) -> Option<(i32, i32)> {
        self.shared
            .touch
            .lock()
            .active_slot(index)
            .map(|s| (s.raw_x, s.raw_y))
    }

    /// Snapshot of all active contacts.
    pub fn active_touches(&self) -> Vec<TouchSlot> {
        self.shared.touch.lock().active_touches()
    }

    /// Pop the next queued event without blocking.
    pub fn next_event(&self) -> Option<TouchEvent> {
        self.shared.queue.pop()
    }

    /// Block until an event arrives or `timeout` lapses; `None` timeout
    /// waits until stop. Returns `None` on timeout or when stopped.
    pub fn wait_for_event(&self, timeout: Option<Duration>) -> Option<TouchEvent> {
        self.shared.queue.wait(timeout, &self.shared.running)
    }

    /// Discard all queued events.
    pub fn clear_events(&self) {
        self.shared.queue.clear();
    }

    /// Switch to MinMax calibration with the given ranges and screen size.
    pub fn set_minmax_calibration(
        &self,
        min_x: f64,
        max_x: f64,
        min_y: f64,
        max_y: f64,
        screen_width: i32,
        screen_height: i32,
    ) {
        self.shared
            .touch
            .lock()
            .calibration
            .set_minmax(min_x, max_x, min_y, max_y, screen_width, screen_height);
    }

    /// Switch to affine calibration with the given coefficients.
    pub fn set_affine_calibration(&self, coeffs: [f64; 6], screen_width: i32, screen_height: i32) {
        self.shared
            .touch
            .lock()
            .calibration
            .set_affine(coeffs, screen_width, screen_height);
    }

    /// Set the post-mapping pixel offset.
    pub fn set_offset(&self, x_offset: i32, y_offset: i32) {
        self.shared
            .touch
            .lock()
            .calibration
            .set_offset(x_offset, y_offset);
    }

    /// Set the dead-zone margin percentage.
    pub fn set_margin(&self, margin_percent: f64) {
        self.shared
            .touch
            .lock()
            .calibration
            .set_margin(margin_percent);
    }

    /// The current calibration.
    pub fn calibration(&self) -> Calibration {
        self.shared.touch.lock().calibration.clone()
    }

    /// Replace the whole calibration.
    pub fn set_calibration(&self, calibration: Calibration) {
        self.shared.touch.lock().calibration = calibration;
    }

    /// Load calibration from an INI file, keeping current values for keys
    /// the file does not carry.
    pub fn load_calibration(&self, path: impl AsRef<Path>) -> Result<()> {
        self.shared
            .touch
            .lock()
            .calibration
            .load_file(path.as_ref())?;
        Ok(())
    }

    /// Save the current calibration to an INI file.
    pub fn save_calibration(&self, path: impl AsRef<Path>) -> Result<()> {
        self.shared
            .touch
            .lock()
            .calibration
            .save_file(path.as_ref())?;
        Ok(())
    }

    /// Run the interactive four-corner calibration with stdout prompts.
    pub fn run_calibration(&self, screen_width: i32, screen_height: i32) -> Result<Calibration> {
        self.run_calibration_with(CalibrationRun::new(screen_width, screen_height), |msg| {
            println!("{msg}");
        })
    }

    /// Run the interactive four-corner calibration.
    ///
    /// Walks the user through touching the four screen corners (prompted
    /// through `prompt`), fits the requested model, installs it as the
    /// active calibration (keeping the current offsets) and returns it.
    ///
    /// # Errors
    ///
    /// [`PumpError::NotRunning`] without a reader thread,
    /// [`PumpError::CornerTimeout`] when a corner is not touched in time,
    /// and any fit error.
    pub fn run_calibration_with(
        &self,
        run: CalibrationRun,
        prompt: impl Fn(&str),
    ) -> Result<Calibration> {
        if !self.is_running() {
            return Err(PumpError::NotRunning);
        }

        let capture: Arc<(Mutex<Option<(f64, f64)>>, Condvar)> =
            Arc::new((Mutex::new(None), Condvar::new()));
        let previous = self.shared.callback.lock().clone();

        {
            let capture = capture.clone();
            self.set_callback(move |event| {
                if event.kind == GestureKind::TouchDown && !event.touches.is_empty() {
                    let mut point = capture.0.lock();
                    *point = Some((
                        event.touches[0].raw_x as f64,
                        event.touches[0].raw_y as f64,
                    ));
                    capture.1.notify_all();
                }
            });
        }

        let restore = |shared: &Shared| {
            *shared.callback.lock() = previous.clone();
        };

        let w = run.screen_width as f64;
        let h = run.screen_height as f64;
        let targets = [
            (20.0, 20.0),
            (w - 20.0, 20.0),
            (w - 20.0, h - 20.0),
            (20.0, h - 20.0),
        ];
        let labels = ["top-left", "top-right", "bottom-right", "bottom-left"];

        let mut samples = [(0.0f64, 0.0f64); 4];
        for (i, label) in labels.iter().enumerate() {
            *capture.0.lock() = None;
            prompt(&format!("Touch the {label} corner of the screen"));

            let deadline = Instant::now() + run.corner_timeout;
            let mut point = capture.0.lock();
            loop {
                if let Some(sample) = point.take() {
                    samples[i] = sample;
                    break;
                }
                if !self.is_running() || Instant::now() >= deadline {
                    drop(point);
                    restore(&self.shared);
                    return Err(PumpError::CornerTimeout { corner: label });
                }
                capture
                    .1
                    .wait_for(&mut point, Duration::from_millis(100));
            }
            drop(point);
            prompt(&format!(
                "Captured raw point ({:.0}, {:.0})",
                samples[i].0, samples[i].1
            ));

            // Let the finger lift before prompting the next corner.
            thread::sleep(Duration::from_millis(500));
        }

        restore(&self.shared);

        let mut fitted = fit_from_corners(
            &samples,
            &targets,
            run.mode,
            run.margin_percent,
            run.screen_width,
            run.screen_height,
        )?;

        let mut state = self.shared.touch.lock();
        fitted.x_offset = state.calibration.x_offset;
        fitted.y_offset = state.calibration.y_offset;
        state.calibration = fitted.clone();
        drop(state);

        info!(mode = fitted.mode.as_str(), "calibration fitted");
        Ok(fitted)
    }

    /// Enable or disable the MITM republisher.
    ///
    /// Enabling creates the uinput device sized to the current calibrated
    /// screen; with `grab_source` the raw device is exclusively grabbed so
    /// only the synthetic device is visible downstream. A uinput failure is
    /// an error; a grab failure is only a warning. Disabling releases the
    /// grab and destroys the synthetic device.
    pub fn enable_mitm(&self, enable: bool, grab_source: bool) -> Result<()> {
        if enable {
            let mut state = self.shared.touch.lock();
            if state.mitm.is_none() {
                let device = MitmRepublisher::create(
                    state.calibration.screen_width,
                    state.calibration.screen_height,
                )
                .map_err(PumpError::UinputUnavailable)?;
                state.mitm = Some(device);
            }
            drop(state);
            self.shared
                .grab_requested
                .store(grab_source, Ordering::Release);
        } else {
            self.shared.grab_requested.store(false, Ordering::Release);
            self.shared.touch.lock().mitm = None;
        }
        Ok(())
    }
}

impl Drop for TouchPump {
    fn drop(&mut self) {
        self.stop();
    }
}

enum Backend {
    Evdev { device: Device, has_btn_touch: bool },
    Mouse(File),
}

/// Wait for the fd to become readable (or broken) within `timeout_ms`.
fn wait_readable(fd: RawFd, timeout_ms: i32) -> bool {
    let mut pfd = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };
    let rc = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
    rc > 0 && (pfd.revents & (libc::POLLIN | libc::POLLERR | libc::POLLHUP)) != 0
}

/// Decode one kernel event into a pump input.
fn decode(event: &InputEvent, has_btn_touch: bool) -> Option<PumpInput> {
    let code = event.code();
    let value = event.value();
    match event.event_type() {
        EventType::ABSOLUTE => {
            if code == AbsoluteAxisCode::ABS_MT_SLOT.0 {
                Some(PumpInput::Slot(value))
            } else if code == AbsoluteAxisCode::ABS_MT_TRACKING_ID.0 {
                Some(PumpInput::TrackingId(value))
            } else if code == AbsoluteAxisCode::ABS_MT_POSITION_X.0 {
                Some(PumpInput::PositionX(value))
            } else if code == AbsoluteAxisCode::ABS_MT_POSITION_Y.0 {
                Some(PumpInput::PositionY(value))
            } else if code == AbsoluteAxisCode::ABS_X.0 {
                Some(PumpInput::AbsoluteX(value))
            } else if code == AbsoluteAxisCode::ABS_Y.0 {
                Some(PumpInput::AbsoluteY(value))
            } else {
                None
            }
        }
        EventType::KEY => {
            let is_contact = code == KeyCode::BTN_TOUCH.0
                || (!has_btn_touch
                    && (code == KeyCode::BTN_TOOL_PEN.0 || code == KeyCode::BTN_LEFT.0));
            is_contact.then_some(PumpInput::Contact(value != 0))
        }
        EventType::RELATIVE => {
            if code == RelativeAxisCode::REL_X.0 {
                Some(PumpInput::RelativeX(value))
            } else if code == RelativeAxisCode::REL_Y.0 {
                Some(PumpInput::RelativeY(value))
            } else {
                None
            }
        }
        EventType::SYNCHRONIZATION => {
            (code == SynchronizationCode::SYN_REPORT.0).then_some(PumpInput::SynReport)
        }
        _ => None,
    }
}

fn reader_main(shared: Arc<Shared>, backend: Backend) {
    match backend {
        Backend::Evdev {
            device,
            has_btn_touch,
        } => evdev_loop(&shared, device, has_btn_touch),
        Backend::Mouse(file) => mouse_loop(&shared, file),
    }
    shared.running.store(false, Ordering::Release);
    shared.queue.notify_all();
    debug!("reader thread exited");
}

fn evdev_loop(shared: &Shared, mut device: Device, has_btn_touch: bool) {
    let fd = device.as_raw_fd();
    let mut grabbed = false;

    while shared.running.load(Ordering::Acquire) {
        let want_grab = shared.grab_requested.load(Ordering::Acquire);
        if want_grab != grabbed {
            if want_grab {
                match device.grab() {
                    Ok(()) => grabbed = true,
                    Err(e) => {
                        warn!("exclusive grab failed: {e}");
                        // Stop retrying until the next enable.
                        shared.grab_requested.store(false, Ordering::Release);
                    }
                }
            } else {
                if let Err(e) = device.ungrab() {
                    warn!("grab release failed: {e}");
                }
                grabbed = false;
            }
        }

        if !wait_readable(fd, POLL_SLICE_MS) {
            continue;
        }

        match device.fetch_events() {
            Ok(events) => {
                for event in events {
                    if let Some(input) = decode(&event, has_btn_touch) {
                        shared.feed(input);
                    }
                }
            }
            Err(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::Interrupted
                ) =>
            {
                continue;
            }
            Err(e) => {
                warn!("device read failed permanently: {e}");
                break;
            }
        }
    }

    // Release the grab before the device (and its fd) drop.
    if grabbed {
        if let Err(e) = device.ungrab() {
            warn!("grab release failed on shutdown: {e}");
        }
    }
}

/// PS/2 packet loop for `/dev/input/mouseN` nodes. Three-byte packets:
/// buttons and sign bits, then X and Y deltas. Partial packets are
/// discarded; bytes without the always-set bit 3 are skipped to resync.
fn mouse_loop(shared: &Shared, mut file: File) {
    let fd = file.as_raw_fd();
    let mut packet = [0u8; 3];
    let mut filled = 0usize;

    while shared.running.load(Ordering::Acquire) {
        if !wait_readable(fd, POLL_SLICE_MS) {
            continue;
        }

        let mut byte = [0u8; 1];
        match file.read(&mut byte) {
            Ok(1) => {}
            Ok(_) => {
                warn!("mouse device closed");
                break;
            }
            Err(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::Interrupted
                ) =>
            {
                continue;
            }
            Err(e) => {
                warn!("mouse read failed permanently: {e}");
                break;
            }
        }

        if filled == 0 && byte[0] & 0x08 == 0 {
            // Mid-packet byte; wait for a header to resync.
            continue;
        }
        packet[filled] = byte[0];
        filled += 1;
        if filled < 3 {
            continue;
        }
        filled = 0;

        let left = packet[0] & 0x01 != 0;
        let dx = packet[1] as i32 - if packet[0] & 0x10 != 0 { 256 } else { 0 };
        let dy = packet[2] as i32 - if packet[0] & 0x20 != 0 { 256 } else { 0 };

        shared.feed(PumpInput::MouseButton(left));
        // PS/2 Y grows upward; the slot table is screen-oriented.
        shared.feed(PumpInput::MouseMove(dx, -dy));
        shared.feed(PumpInput::SynReport);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_multitouch_events() {
        let ev = InputEvent::new(EventType::ABSOLUTE.0, AbsoluteAxisCode::ABS_MT_SLOT.0, 3);
        assert_eq!(decode(&ev, true), Some(PumpInput::Slot(3)));

        let ev = InputEvent::new(
            EventType::ABSOLUTE.0,
            AbsoluteAxisCode::ABS_MT_TRACKING_ID.0,
            -1,
        );
        assert_eq!(decode(&ev, true), Some(PumpInput::TrackingId(-1)));

        let ev = InputEvent::new(
            EventType::ABSOLUTE.0,
            AbsoluteAxisCode::ABS_MT_POSITION_X.0,
            2048,
        );
        assert_eq!(decode(&ev, true), Some(PumpInput::PositionX(2048)));

        let ev = InputEvent::new(EventType::SYNCHRONIZATION.0, 0, 0);
        assert_eq!(decode(&ev, true), Some(PumpInput::SynReport));
    }

    #[test]
    fn decode_contact_key_fallbacks() {
        let touch = InputEvent::new(EventType::KEY.0, KeyCode::BTN_TOUCH.0, 1);
        assert_eq!(decode(&touch, true), Some(PumpInput::Contact(true)));
        assert_eq!(decode(&touch, false), Some(PumpInput::Contact(true)));

        // Pen and left button count only when BTN_TOUCH is unsupported.
        let pen = InputEvent::new(EventType::KEY.0, KeyCode::BTN_TOOL_PEN.0, 1);
        assert_eq!(decode(&pen, true), None);
        assert_eq!(decode(&pen, false), Some(PumpInput::Contact(true)));

        let left = InputEvent::new(EventType::KEY.0, KeyCode::BTN_LEFT.0, 0);
        assert_eq!(decode(&left, true), None);
        assert_eq!(decode(&left, false), Some(PumpInput::Contact(false)));

        let other = InputEvent::new(EventType::KEY.0, KeyCode::KEY_A.0, 1);
        assert_eq!(decode(&other, false), None);
    }

    #[test]
    fn decode_relative_and_unknown() {
        let rel = InputEvent::new(EventType::RELATIVE.0, RelativeAxisCode::REL_X.0, -4);
        assert_eq!(decode(&rel, true), Some(PumpInput::RelativeX(-4)));

        let wheel = InputEvent::new(EventType::RELATIVE.0, RelativeAxisCode::REL_WHEEL.0, 1);
        assert_eq!(decode(&wheel, true), None);

        let misc = InputEvent::new(EventType::MISC.0, 0, 1);
        assert_eq!(decode(&misc, true), None);
    }

    #[test]
    fn stop_is_idempotent_without_start() {
        let pump = TouchPump::new();
        pump.stop();
        pump.stop();
        assert!(!pump.is_running());
        assert!(pump.selected_device().is_none());
    }

    #[test]
    fn queries_work_without_a_device() {
        let pump = TouchPump::new();
        assert_eq!(pump.touch_count(), 0);
        assert!(pump.touch_position(0).is_none());
        assert!(pump.raw_position(0).is_none());
        assert!(pump.active_touches().is_empty());
        assert!(pump.next_event().is_none());
        assert!(pump
            .wait_for_event(Some(Duration::from_millis(5)))
            .is_none());
    }

    #[test]
    fn calibration_setters_are_always_available() {
        let pump = TouchPump::new();
        pump.set_minmax_calibration(0.0, 4095.0, 0.0, 4095.0, 1920, 1080);
        pump.set_offset(10, 20);
        pump.set_margin(0.5);
        let cal = pump.calibration();
        assert_eq!(cal.screen_width, 1920);
        assert_eq!(cal.x_offset, 10);
        assert_eq!(cal.margin_percent, 0.5);

        pump.set_affine_calibration([1.0, 0.0, 0.0, 0.0, 1.0, 0.0], 800, 480);
        assert_eq!(pump.calibration().mode, CalibrationMode::Affine);
    }

    #[test]
    fn run_calibration_requires_running_pump() {
        let pump = TouchPump::new();
        let err = pump.run_calibration(1920, 1080).unwrap_err();
        assert!(matches!(err, PumpError::NotRunning));
    }
}
