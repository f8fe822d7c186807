//! The event pump: device I/O, contact tracking, event queue, MITM output.
//!
//! One [`TouchPump`] owns the device file descriptor, a background reader
//! thread, the fixed slot table, the gesture recogniser and the bounded
//! event queue. Consumers poll [`TouchPump::next_event`], block in
//! [`TouchPump::wait_for_event`], or register a callback that runs on the
//! reader thread.

mod mitm;
mod reader;
mod slots;
mod state;

pub use mitm::MITM_DEVICE_NAME;
pub use reader::{CalibrationRun, TouchPump};
pub use slots::{TouchSlot, MAX_SLOTS};
pub use state::MAX_EVENTS;

use std::path::PathBuf;

use thiserror::Error;

/// Result type for pump operations.
pub type Result<T> = std::result::Result<T, PumpError>;

/// Event pump error types.
#[derive(Error, Debug)]
pub enum PumpError {
    /// The pump already has a running reader thread.
    #[error("pump is already running")]
    AlreadyRunning,

    /// The operation needs a running reader thread.
    #[error("pump is not running")]
    NotRunning,

    /// The input device node could not be opened, typically permissions.
    #[error("cannot open input device {path}: {source}")]
    OpenDevice {
        /// Device node that failed to open.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Auto-detection found no usable input device.
    #[error("no usable input device found")]
    NoDevice,

    /// `/dev/uinput` is absent or not writable; MITM mode unavailable.
    #[error("uinput unavailable: {0}")]
    UinputUnavailable(std::io::Error),

    /// An interactive calibration corner was not touched in time.
    #[error("timed out waiting for the {corner} corner")]
    CornerTimeout {
        /// Corner label ("top-left", ...).
        corner: &'static str,
    },

    /// Corner fit failed.
    #[error(transparent)]
    Calibration(#[from] crate::calibration::CalibrationError),

    /// Reader thread could not be spawned.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
