//! Uinput republisher for the man-in-the-middle mode.
//!
//! Creates a synthetic absolute-axis touch device and mirrors the
//! calibrated primary contact to it. Consumers (the X server, libinput)
//! then see already-calibrated coordinates, and the raw source device can
//! be exclusively grabbed to silence its uncalibrated stream.

use evdev::uinput::VirtualDevice;
use evdev::{
    AbsInfo, AbsoluteAxisCode, AttributeSet, BusType, EventType, InputEvent, InputId, KeyCode,
    UinputAbsSetup,
};
use tracing::{debug, warn};

/// Name the synthetic device registers under.
pub const MITM_DEVICE_NAME: &str = "touchmap calibrated touchscreen";

const MITM_VENDOR: u16 = 0x1234;
const MITM_PRODUCT: u16 = 0x5678;

/// The synthetic output device.
///
/// Dropping it destroys the kernel device before the uinput fd closes.
pub(crate) struct MitmRepublisher {
    device: VirtualDevice,
}

impl MitmRepublisher {
    /// Create the uinput device with absolute ranges matching the
    /// calibrated screen window.
    pub(crate) fn create(screen_width: i32, screen_height: i32) -> std::io::Result<Self> {
        let mut keys = AttributeSet::<KeyCode>::new();
        keys.insert(KeyCode::BTN_TOUCH);

        let abs_x = UinputAbsSetup::new(
            AbsoluteAxisCode::ABS_X,
            AbsInfo::new(0, 0, (screen_width - 1).max(1), 0, 0, 0),
        );
        let abs_y = UinputAbsSetup::new(
            AbsoluteAxisCode::ABS_Y,
            AbsInfo::new(0, 0, (screen_height - 1).max(1), 0, 0, 0),
        );

        let device = VirtualDevice::builder()?
            .name(MITM_DEVICE_NAME)
            .input_id(InputId::new(BusType::BUS_USB, MITM_VENDOR, MITM_PRODUCT, 1))
            .with_keys(&keys)?
            .with_absolute_axis(&abs_x)?
            .with_absolute_axis(&abs_y)?
            .build()?;

        debug!(
            width = screen_width,
            height = screen_height,
            "created uinput republisher device"
        );
        Ok(Self { device })
    }

    /// Emit a contact frame at the calibrated primary position.
    pub(crate) fn emit_touch(&mut self, x: i32, y: i32) {
        let events = [
            InputEvent::new(EventType::KEY.0, KeyCode::BTN_TOUCH.0, 1),
            InputEvent::new(EventType::ABSOLUTE.0, AbsoluteAxisCode::ABS_X.0, x),
            InputEvent::new(EventType::ABSOLUTE.0, AbsoluteAxisCode::ABS_Y.0, y),
        ];
        // emit() terminates the batch with a SYN_REPORT.
        if let Err(e) = self.device.emit(&events) {
            warn!("uinput emit failed: {e}");
        }
    }

    /// Emit a release frame.
    pub(crate) fn emit_release(&mut self) {
        let events = [InputEvent::new(EventType::KEY.0, KeyCode::BTN_TOUCH.0, 0)];
        if let Err(e) = self.device.emit(&events) {
            warn!("uinput emit failed: {e}");
        }
    }
}
