//! touchmap library
//!
//! Linux user-space touch/tablet input pipeline:
//!
//! - [`pump`] reads raw multi-touch events from a kernel input device node,
//!   maintains a per-slot contact table and a bounded event queue, and can
//!   republish the calibrated stream through a synthetic uinput device.
//! - [`calibration`] converts raw device coordinates into logical screen
//!   coordinates (axis-aligned MinMax or six-parameter affine).
//! - [`gestures`] turns contact-set transitions into higher-level events:
//!   down/up/move, swipes, pinch, long press, double tap.
//! - [`layout`] queries the X11 display layout, fingerprints it, and derives
//!   per-monitor Coordinate Transformation Matrices.
//! - [`profile`] persists a device/monitor/CTM binding keyed by the layout
//!   fingerprint.
//! - [`config`] is the ordered INI store the persistence formats build on.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod calibration;
pub mod config;
pub mod gestures;
pub mod layout;
pub mod profile;
pub mod pump;

pub use calibration::{Calibration, CalibrationMode};
pub use gestures::{GestureKind, TouchEvent};
pub use layout::{DesktopLayout, Monitor, Rotation};
pub use profile::Profile;
pub use pump::{TouchPump, TouchSlot};
