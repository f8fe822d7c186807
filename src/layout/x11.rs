//! Native X11 RandR layout query.
//!
//! Speaks the RandR protocol directly through `x11rb` rather than scraping
//! xrandr output, which avoids locale and shell-escaping hazards. Each
//! monitor's first output supplies rotation (crtc), scale (crtc transform
//! diagonal) and EDID (output property).

use tracing::{debug, warn};
use x11rb::connection::Connection;
use x11rb::protocol::randr::{self, ConnectionExt as _};
use x11rb::protocol::xproto::{AtomEnum, ConnectionExt as _};

use super::{fnv1a_hex, DesktopLayout, LayoutError, Monitor, Result, Rotation};

impl From<x11rb::errors::ConnectError> for LayoutError {
    fn from(e: x11rb::errors::ConnectError) -> Self {
        LayoutError::DisplayUnavailable(e.to_string())
    }
}

impl From<x11rb::errors::ConnectionError> for LayoutError {
    fn from(e: x11rb::errors::ConnectionError) -> Self {
        LayoutError::Request(e.to_string())
    }
}

impl From<x11rb::errors::ReplyError> for LayoutError {
    fn from(e: x11rb::errors::ReplyError) -> Self {
        LayoutError::Request(e.to_string())
    }
}

fn rotation_from_randr(bits: u16) -> Rotation {
    if bits & u16::from(randr::Rotation::ROTATE90) != 0 {
        Rotation::Left
    } else if bits & u16::from(randr::Rotation::ROTATE180) != 0 {
        Rotation::Inverted
    } else if bits & u16::from(randr::Rotation::ROTATE270) != 0 {
        Rotation::Right
    } else {
        Rotation::Normal
    }
}

/// Query the current desktop layout from the X server.
///
/// # Errors
///
/// [`LayoutError::DisplayUnavailable`] when no X11 display can be reached
/// (typically a Wayland-only session — kernel-side reading still works in
/// that case, only CTM-related operations are affected), and
/// [`LayoutError::NoMonitors`] when the server reports none.
pub fn read_layout() -> Result<DesktopLayout> {
    let (conn, screen_num) = x11rb::connect(None)?;
    let root = conn.setup().roots[screen_num].root;

    let resources = conn.randr_get_screen_resources_current(root)?.reply()?;
    let monitors_reply = conn.randr_get_monitors(root, true)?.reply()?;
    let edid_atom = conn.intern_atom(false, b"EDID")?.reply()?.atom;

    let mut monitors = Vec::with_capacity(monitors_reply.monitors.len());
    for (index, info) in monitors_reply.monitors.iter().enumerate() {
        let name = match conn.get_atom_name(info.name) {
            Ok(cookie) => cookie
                .reply()
                .map(|r| String::from_utf8_lossy(&r.name).into_owned())
                .unwrap_or_default(),
            Err(_) => String::new(),
        };

        let mut monitor = Monitor::new(
            index as i32,
            name,
            i32::from(info.x),
            i32::from(info.y),
            i32::from(info.width),
            i32::from(info.height),
        );
        monitor.primary = info.primary;

        if let Some(&output) = info.outputs.first() {
            match fill_output_details(&conn, output, resources.config_timestamp, edid_atom, &mut monitor) {
                Ok(()) => {}
                Err(e) => {
                    // A hotplug race can invalidate output handles mid-query;
                    // the monitor keeps its defaults.
                    warn!(output, "output detail query failed: {e}");
                }
            }
        }

        debug!(
            name = %monitor.name,
            x = monitor.x,
            y = monitor.y,
            width = monitor.width,
            height = monitor.height,
            rotation = monitor.rotation.as_str(),
            "detected monitor"
        );
        monitors.push(monitor);
    }

    DesktopLayout::from_monitors(monitors)
}

fn fill_output_details(
    conn: &impl Connection,
    output: randr::Output,
    timestamp: x11rb::protocol::xproto::Timestamp,
    edid_atom: x11rb::protocol::xproto::Atom,
    monitor: &mut Monitor,
) -> Result<()> {
    let output_info = conn.randr_get_output_info(output, timestamp)?.reply()?;

    if output_info.crtc != 0 {
        let crtc = conn.randr_get_crtc_info(output_info.crtc, timestamp)?.reply()?;
        monitor.rotation = rotation_from_randr(u16::from(crtc.rotation));

        let transform = conn.randr_get_crtc_transform(output_info.crtc)?.reply()?;
        let m = transform.current_transform;
        // A pure scale transform has the factors on the diagonal in 16.16
        // fixed point; anything fancier is left at 1.0.
        if m.matrix12 == 0 && m.matrix21 == 0 && m.matrix33 == 65536 {
            let sx = m.matrix11 as f64 / 65536.0;
            let sy = m.matrix22 as f64 / 65536.0;
            if sx > 0.0 {
                monitor.scale_x = sx;
            }
            if sy > 0.0 {
                monitor.scale_y = sy;
            }
        }
    }

    let edid = conn
        .randr_get_output_property(output, edid_atom, AtomEnum::ANY, 0, 256, false, false)?
        .reply()?;
    if edid.format == 8 && !edid.data.is_empty() {
        let hex: String = edid.data.iter().map(|b| format!("{b:02x}")).collect();
        monitor.edid_hash = fnv1a_hex(hex.as_bytes());
    }

    Ok(())
}
