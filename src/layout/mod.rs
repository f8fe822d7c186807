//! Desktop layout discovery and fingerprinting.
//!
//! A [`DesktopLayout`] is the list of monitors the display server reports,
//! together with the bounding box of the virtual desktop and a stable
//! 64-bit FNV-1a fingerprint over a canonical encoding. The fingerprint
//! changes whenever any monitor's geometry, rotation, scale, name or EDID
//! changes, and is what gates profile re-application after the user
//! rearranges monitors.
//!
//! Layouts come from two sources: the native RandR query in
//! [`read_layout`], or the textual report parsers in [`parse`] which accept
//! captured `xrandr --listmonitors` / `xrandr --verbose` output.

pub mod ctm;
pub mod parse;
mod x11;

pub use ctm::{compute_ctm, identity_ctm};
pub use x11::read_layout;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for layout operations.
pub type Result<T> = std::result::Result<T, LayoutError>;

/// Layout discovery error types.
#[derive(Error, Debug)]
pub enum LayoutError {
    /// No X11 display is reachable (typically a Wayland-only session).
    #[error("X11 display unavailable: {0}")]
    DisplayUnavailable(String),

    /// The display server reported no active monitors.
    #[error("no active monitors detected")]
    NoMonitors,

    /// An X11 request failed mid-query.
    #[error("X11 request failed: {0}")]
    Request(String),

    /// A monitor with the requested index or name does not exist.
    #[error("monitor not found: {0}")]
    MonitorNotFound(String),
}

/// Monitor rotation as reported by the display server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rotation {
    /// Unrotated.
    #[default]
    Normal,
    /// Rotated 180 degrees.
    Inverted,
    /// Rotated 90 degrees counter-clockwise.
    Left,
    /// Rotated 90 degrees clockwise.
    Right,
}

impl Rotation {
    /// Parse a rotation token, defaulting to normal for unknown input.
    pub fn parse(token: &str) -> Self {
        match token.to_ascii_lowercase().as_str() {
            "inverted" => Rotation::Inverted,
            "left" => Rotation::Left,
            "right" => Rotation::Right,
            _ => Rotation::Normal,
        }
    }

    /// Canonical token used in fingerprints and profile files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Rotation::Normal => "normal",
            Rotation::Inverted => "inverted",
            Rotation::Left => "left",
            Rotation::Right => "right",
        }
    }
}

/// One monitor in the virtual desktop, geometry in device pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Monitor {
    /// Index in the display server's monitor list.
    pub index: i32,
    /// Output name (e.g. `DP-1`).
    pub name: String,
    /// Whether the server marks this monitor primary.
    pub primary: bool,
    /// X position in the virtual desktop.
    pub x: i32,
    /// Y position in the virtual desktop.
    pub y: i32,
    /// Width in device pixels.
    pub width: i32,
    /// Height in device pixels.
    pub height: i32,
    /// Horizontal scale factor (1.0 when unscaled).
    pub scale_x: f64,
    /// Vertical scale factor (1.0 when unscaled).
    pub scale_y: f64,
    /// Rotation.
    pub rotation: Rotation,
    /// FNV-1a hash of the monitor's EDID hex dump, empty when unknown.
    pub edid_hash: String,
}

impl Monitor {
    /// A monitor with defaults for everything but name and geometry.
    pub fn new(index: i32, name: impl Into<String>, x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            index,
            name: name.into(),
            primary: false,
            x,
            y,
            width,
            height,
            scale_x: 1.0,
            scale_y: 1.0,
            rotation: Rotation::Normal,
            edid_hash: String::new(),
        }
    }
}

/// The full desktop: monitors plus bounding box and fingerprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesktopLayout {
    /// Monitors in server list order.
    pub monitors: Vec<Monitor>,
    /// Left edge of the bounding box.
    pub origin_x: i32,
    /// Top edge of the bounding box.
    pub origin_y: i32,
    /// Bounding box width.
    pub width: i32,
    /// Bounding box height.
    pub height: i32,
    /// FNV-1a 64-bit fingerprint, lowercase hex.
    pub hash: String,
}

impl DesktopLayout {
    /// Build a layout from a monitor list, computing the bounding box and
    /// fingerprint.
    ///
    /// # Errors
    ///
    /// [`LayoutError::NoMonitors`] when the list is empty.
    pub fn from_monitors(monitors: Vec<Monitor>) -> Result<Self> {
        let first = monitors.first().ok_or(LayoutError::NoMonitors)?;

        let mut min_x = first.x;
        let mut min_y = first.y;
        let mut max_x = first.x + first.width;
        let mut max_y = first.y + first.height;
        for m in &monitors {
            min_x = min_x.min(m.x);
            min_y = min_y.min(m.y);
            max_x = max_x.max(m.x + m.width);
            max_y = max_y.max(m.y + m.height);
        }

        let mut layout = Self {
            monitors,
            origin_x: min_x,
            origin_y: min_y,
            width: max_x - min_x,
            height: max_y - min_y,
            hash: String::new(),
        };
        layout.hash = fingerprint(&layout);
        Ok(layout)
    }

    /// Find a monitor by list index.
    pub fn monitor_by_index(&self, index: i32) -> Option<&Monitor> {
        self.monitors
            .iter()
            .find(|m| m.index == index)
            .or_else(|| usize::try_from(index).ok().and_then(|i| self.monitors.get(i)))
    }

    /// Find a monitor by name, case-insensitively.
    pub fn monitor_by_name(&self, name: &str) -> Option<&Monitor> {
        self.monitors
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(name))
    }

    /// The primary monitor, falling back to the first.
    pub fn primary(&self) -> Option<&Monitor> {
        self.monitors
            .iter()
            .find(|m| m.primary)
            .or_else(|| self.monitors.first())
    }
}

/// 64-bit FNV-1a over a byte string.
pub(crate) fn fnv1a(data: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for &byte in data {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

/// FNV-1a rendered as lowercase hex with no leading zeros.
pub(crate) fn fnv1a_hex(data: &[u8]) -> String {
    format!("{:x}", fnv1a(data))
}

/// Canonical fingerprint: bounding box, then each monitor's identity tuple.
///
/// Tuples are sorted before hashing so that two layouts with the same
/// monitor set fingerprint identically regardless of server list order.
fn fingerprint(layout: &DesktopLayout) -> String {
    let mut canon = format!(
        "{},{},{},{};",
        layout.origin_x, layout.origin_y, layout.width, layout.height
    );
    let mut tuples: Vec<String> = layout
        .monitors
        .iter()
        .map(|m| {
            format!(
                "{}|{}|{}|{}|{}|{}|{}|{}|{};",
                m.name,
                m.x,
                m.y,
                m.width,
                m.height,
                m.rotation.as_str(),
                m.scale_x,
                m.scale_y,
                m.edid_hash
            )
        })
        .collect();
    tuples.sort_unstable();
    for tuple in tuples {
        canon.push_str(&tuple);
    }
    fnv1a_hex(canon.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_monitors() -> Vec<Monitor> {
        vec![
            Monitor::new(0, "DP-1", 0, 0, 1920, 1080),
            Monitor::new(1, "HDMI-1", 1920, 0, 1920, 1080),
        ]
    }

    #[test]
    fn bounding_box_spans_all_monitors() {
        let layout = DesktopLayout::from_monitors(two_monitors()).unwrap();
        assert_eq!(layout.origin_x, 0);
        assert_eq!(layout.origin_y, 0);
        assert_eq!(layout.width, 3840);
        assert_eq!(layout.height, 1080);
    }

    #[test]
    fn bounding_box_handles_negative_origins() {
        let monitors = vec![
            Monitor::new(0, "DP-1", -1920, -500, 1920, 1080),
            Monitor::new(1, "HDMI-1", 0, 0, 2560, 1440),
        ];
        let layout = DesktopLayout::from_monitors(monitors).unwrap();
        assert_eq!(layout.origin_x, -1920);
        assert_eq!(layout.origin_y, -500);
        assert_eq!(layout.width, 4480);
        assert_eq!(layout.height, 1940);
    }

    #[test]
    fn empty_layout_is_an_error() {
        assert!(matches!(
            DesktopLayout::from_monitors(vec![]),
            Err(LayoutError::NoMonitors)
        ));
    }

    #[test]
    fn fingerprint_is_stable() {
        let a = DesktopLayout::from_monitors(two_monitors()).unwrap();
        let b = DesktopLayout::from_monitors(two_monitors()).unwrap();
        assert_eq!(a.hash, b.hash);
        assert!(!a.hash.is_empty());
    }

    #[test]
    fn fingerprint_changes_on_any_field() {
        let base = DesktopLayout::from_monitors(two_monitors()).unwrap();

        let mut m = two_monitors();
        m[1].x = 1921;
        assert_ne!(DesktopLayout::from_monitors(m).unwrap().hash, base.hash);

        let mut m = two_monitors();
        m[0].rotation = Rotation::Left;
        assert_ne!(DesktopLayout::from_monitors(m).unwrap().hash, base.hash);

        let mut m = two_monitors();
        m[0].scale_x = 1.5;
        assert_ne!(DesktopLayout::from_monitors(m).unwrap().hash, base.hash);

        let mut m = two_monitors();
        m[0].edid_hash = "abc123".into();
        assert_ne!(DesktopLayout::from_monitors(m).unwrap().hash, base.hash);

        let mut m = two_monitors();
        m[1].name = "HDMI-2".into();
        assert_ne!(DesktopLayout::from_monitors(m).unwrap().hash, base.hash);
    }

    #[test]
    fn fingerprint_is_order_independent() {
        let a = DesktopLayout::from_monitors(two_monitors()).unwrap();
        let mut swapped = two_monitors();
        swapped.swap(0, 1);
        let b = DesktopLayout::from_monitors(swapped).unwrap();
        assert_eq!(a.hash, b.hash);
    }

    #[test]
    fn fingerprint_ignores_primary_and_index() {
        // Identity tuple covers geometry and identity, not transient flags.
        let base = DesktopLayout::from_monitors(two_monitors()).unwrap();
        let mut m = two_monitors();
        m[1].primary = true;
        assert_eq!(DesktopLayout::from_monitors(m).unwrap().hash, base.hash);
    }

    #[test]
    fn monitor_lookup() {
        let layout = DesktopLayout::from_monitors(two_monitors()).unwrap();
        assert_eq!(layout.monitor_by_index(1).unwrap().name, "HDMI-1");
        assert_eq!(layout.monitor_by_name("hdmi-1").unwrap().index, 1);
        assert!(layout.monitor_by_name("eDP-1").is_none());
        assert_eq!(layout.primary().unwrap().index, 0);
    }

    #[test]
    fn fnv1a_known_vectors() {
        // Standard FNV-1a test vectors.
        assert_eq!(fnv1a(b""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(fnv1a(b"a"), 0xaf63_dc4c_8601_ec8c);
        assert_eq!(fnv1a_hex(b"a"), "af63dc4c8601ec8c");
    }
}
