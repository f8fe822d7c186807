//! Coordinate Transformation Matrix derivation.
//!
//! The X11 input extension applies a 3x3 affine matrix to pointer
//! coordinates normalised to the `[0, 1]²` desktop. For a device mapped to
//! the whole desktop, the matrix below restricts it to one monitor's
//! sub-rectangle, compensating for the monitor's rotation and scale. The
//! matrix is only computed here; pushing it to the server's device property
//! is an external operator action.

use super::{DesktopLayout, Monitor, Rotation};

/// The identity matrix, used for whole-desktop mapping.
pub fn identity_ctm() -> [f64; 9] {
    [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]
}

/// Derive the CTM restricting a full-desktop pointer to `monitor`.
///
/// With `Dw`/`Dh` the desktop size, `ox`/`oy` the monitor offset from the
/// desktop origin and `W`/`H` the scaled monitor size, the unrotated matrix
/// maps `(0,0) -> (ox/Dw, oy/Dh)` and `(1,1) -> ((ox+W)/Dw, (oy+H)/Dh)`.
/// The rotated variants swap and mirror the axes so that device-up stays
/// monitor-up.
pub fn compute_ctm(layout: &DesktopLayout, monitor: &Monitor) -> [f64; 9] {
    let dw = (layout.width as f64).max(1.0);
    let dh = (layout.height as f64).max(1.0);

    let mut ox = (monitor.x - layout.origin_x) as f64;
    let mut oy = (monitor.y - layout.origin_y) as f64;
    let mut w = monitor.width as f64;
    let mut h = monitor.height as f64;

    if monitor.scale_x > 0.0 {
        w *= monitor.scale_x;
        ox *= monitor.scale_x;
    }
    if monitor.scale_y > 0.0 {
        h *= monitor.scale_y;
        oy *= monitor.scale_y;
    }

    let (m0, m1, m2, m3, m4, m5) = match monitor.rotation {
        Rotation::Normal => (w, 0.0, ox, 0.0, h, oy),
        Rotation::Inverted => (-w, 0.0, ox + w, 0.0, -h, oy + h),
        Rotation::Left => (0.0, h, ox, -w, 0.0, oy + w),
        Rotation::Right => (0.0, -h, ox + h, w, 0.0, oy),
    };

    [
        m0 / dw,
        m1 / dw,
        m2 / dw,
        m3 / dh,
        m4 / dh,
        m5 / dh,
        0.0,
        0.0,
        1.0,
    ]
}
