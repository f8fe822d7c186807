//! Per-slot contact tracking.

use serde::{Deserialize, Serialize};

/// Number of tracked multitouch slots. Events addressing slots at or past
/// this index are ignored; the fixed table caps memory and matches what the
/// hardware this targets actually reports.
pub const MAX_SLOTS: usize = 10;

/// State of one multitouch slot.
///
/// A slot is active iff `tracking_id >= 0`; activation and release are
/// driven by `ABS_MT_TRACKING_ID` (or `BTN_TOUCH` on single-touch devices).
/// Coordinates persist after release so gesture deltas can compare against
/// the contact's final position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TouchSlot {
    /// Kernel tracking id; -1 when the slot is inactive.
    pub tracking_id: i32,
    /// Last raw device X.
    pub raw_x: i32,
    /// Last raw device Y.
    pub raw_y: i32,
    /// Calibrated screen X.
    pub x: i32,
    /// Calibrated screen Y.
    pub y: i32,
    /// Calibrated X at gesture start.
    pub start_x: i32,
    /// Calibrated Y at gesture start.
    pub start_y: i32,
    /// Activation time, monotonic milliseconds.
    pub timestamp_ms: i64,
}

impl Default for TouchSlot {
    fn default() -> Self {
        Self {
            tracking_id: -1,
            raw_x: 0,
            raw_y: 0,
            x: 0,
            y: 0,
            start_x: 0,
            start_y: 0,
            timestamp_ms: 0,
        }
    }
}

impl TouchSlot {
    /// Whether a contact currently occupies this slot.
    pub fn is_active(&self) -> bool {
        self.tracking_id >= 0
    }
}
