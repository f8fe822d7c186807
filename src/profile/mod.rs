//! Monitor-mapping profiles.
//!
//! A profile binds a device identity, a desktop layout fingerprint, the
//! chosen monitor and the precomputed CTM into one INI file, so a known
//! arrangement can be reapplied without re-running discovery. Loading is
//! gated on the current layout hash matching the stored one unless the
//! caller explicitly overrides.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::IniFile;
use crate::layout::{identity_ctm, DesktopLayout, Monitor, Rotation};

/// Result type for profile operations.
pub type Result<T> = std::result::Result<T, ProfileError>;

/// Profile error types.
#[derive(Error, Debug)]
pub enum ProfileError {
    /// Profile file could not be read or written.
    #[error("profile I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Profile file was readable but not a profile.
    #[error("malformed profile: {0}")]
    Malformed(String),

    /// The desktop layout changed since the profile was saved.
    #[error("layout changed since profile was saved (expected {expected}, found {actual})")]
    LayoutChanged {
        /// Fingerprint stored in the profile.
        expected: String,
        /// Fingerprint of the current layout.
        actual: String,
    },
}

/// A persisted device-to-monitor mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// Profile name (the file stem).
    pub name: String,
    /// X input device id the mapping was saved for, -1 when unknown.
    pub device_id: i32,
    /// Input device name.
    pub device_name: String,
    /// Fingerprint of the layout the mapping belongs to.
    pub layout_hash: String,
    /// The target monitor as it looked when saved.
    pub monitor: Monitor,
    /// Whether related tool devices (stylus, eraser, pad) get the CTM too.
    pub include_related: bool,
    /// Lower-case substrings selecting which tool devices to touch.
    pub tool_filters: Vec<String>,
    /// Saved layout origin.
    pub layout_origin: (i32, i32),
    /// Saved layout size.
    pub layout_size: (i32, i32),
    /// The precomputed 9-element CTM.
    pub ctm: [f64; 9],
}

impl Profile {
    /// A profile for `monitor` within `layout`, carrying `ctm`.
    pub fn new(
        name: impl Into<String>,
        layout: &DesktopLayout,
        monitor: &Monitor,
        ctm: [f64; 9],
    ) -> Self {
        Self {
            name: name.into(),
            device_id: -1,
            device_name: String::new(),
            layout_hash: layout.hash.clone(),
            monitor: monitor.clone(),
            include_related: true,
            tool_filters: Vec::new(),
            layout_origin: (layout.origin_x, layout.origin_y),
            layout_size: (layout.width, layout.height),
            ctm,
        }
    }

    /// Check the profile against the current layout fingerprint.
    ///
    /// # Errors
    ///
    /// [`ProfileError::LayoutChanged`] on mismatch; pass `force` to accept
    /// the profile anyway.
    pub fn verify_layout(&self, layout: &DesktopLayout, force: bool) -> Result<()> {
        if force || self.layout_hash == layout.hash {
            Ok(())
        } else {
            Err(ProfileError::LayoutChanged {
                expected: self.layout_hash.clone(),
                actual: layout.hash.clone(),
            })
        }
    }

    /// Save the profile to `dir/<name>.ini`.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.ini", self.name));

        let mut doc = IniFile::new();
        doc.set("Profile", "device_id", self.device_id.to_string());
        doc.set("Profile", "device_name", self.device_name.clone());
        doc.set("Profile", "layout_hash", self.layout_hash.clone());
        doc.set("Profile", "monitor_name", self.monitor.name.clone());
        doc.set("Profile", "monitor_index", self.monitor.index.to_string());
        doc.set("Profile", "monitor_x", self.monitor.x.to_string());
        doc.set("Profile", "monitor_y", self.monitor.y.to_string());
        doc.set("Profile", "monitor_width", self.monitor.width.to_string());
        doc.set("Profile", "monitor_height", self.monitor.height.to_string());
        doc.set("Profile", "monitor_rotation", self.monitor.rotation.as_str());
        doc.set("Profile", "monitor_scale_x", format!("{:.6}", self.monitor.scale_x));
        doc.set("Profile", "monitor_scale_y", format!("{:.6}", self.monitor.scale_y));
        doc.set(
            "Profile",
            "include_related",
            if self.include_related { "1" } else { "0" },
        );
        if !self.tool_filters.is_empty() {
            doc.set("Profile", "tool_filters", self.tool_filters.join(","));
        }

        doc.set("Layout", "origin_x", self.layout_origin.0.to_string());
        doc.set("Layout", "origin_y", self.layout_origin.1.to_string());
        doc.set("Layout", "width", self.layout_size.0.to_string());
        doc.set("Layout", "height", self.layout_size.1.to_string());

        for (i, value) in self.ctm.iter().enumerate() {
            doc.set("CTM", &format!("m{i}"), format!("{value:.6}"));
        }

        doc.save(&path).map_err(|e| match e {
            crate::config::ConfigError::Io(io) => ProfileError::Io(io),
        })?;
        debug!(path = %path.display(), "profile saved");
        Ok(path)
    }

    /// Load a profile from a file; the profile name is the file stem.
    pub fn load(path: &Path) -> Result<Self> {
        let doc = IniFile::load(path).map_err(|e| match e {
            crate::config::ConfigError::Io(io) => ProfileError::Io(io),
        })?;
        if !doc.has_section("Profile") {
            return Err(ProfileError::Malformed(format!(
                "{}: no [Profile] section",
                path.display()
            )));
        }

        let get = |section: &str, key: &str| doc.get(section, key).map(str::to_string);
        let get_i32 = |section: &str, key: &str, fallback: i32| {
            doc.get(section, key)
                .and_then(|v| v.parse().ok())
                .unwrap_or(fallback)
        };
        let get_f64 = |section: &str, key: &str, fallback: f64| {
            doc.get(section, key)
                .and_then(|v| v.parse().ok())
                .unwrap_or(fallback)
        };

        let mut monitor = Monitor::new(
            get_i32("Profile", "monitor_index", -1),
            get("Profile", "monitor_name").unwrap_or_default(),
            get_i32("Profile", "monitor_x", 0),
            get_i32("Profile", "monitor_y", 0),
            get_i32("Profile", "monitor_width", 0),
            get_i32("Profile", "monitor_height", 0),
        );
        monitor.rotation = Rotation::parse(
            &get("Profile", "monitor_rotation").unwrap_or_else(|| "normal".into()),
        );
        monitor.scale_x = get_f64("Profile", "monitor_scale_x", 1.0);
        monitor.scale_y = get_f64("Profile", "monitor_scale_y", 1.0);

        let tool_filters = get("Profile", "tool_filters")
            .map(|csv| parse_tool_filters(&csv))
            .unwrap_or_default();

        let mut ctm = identity_ctm();
        for (i, value) in ctm.iter_mut().enumerate() {
            *value = get_f64("CTM", &format!("m{i}"), *value);
        }

        Ok(Self {
            name: path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
            device_id: get_i32("Profile", "device_id", -1),
            device_name: get("Profile", "device_name").unwrap_or_default(),
            layout_hash: get("Profile", "layout_hash").unwrap_or_default(),
            monitor,
            include_related: doc.get("Profile", "include_related") != Some("0"),
            tool_filters,
            layout_origin: (
                get_i32("Layout", "origin_x", 0),
                get_i32("Layout", "origin_y", 0),
            ),
            layout_size: (
                get_i32("Layout", "width", 0),
                get_i32("Layout", "height", 0),
            ),
            ctm,
        })
    }

    /// Load `dir/<name>.ini`.
    pub fn load_named(dir: &Path, name: &str) -> Result<Self> {
        Self::load(&dir.join(format!("{name}.ini")))
    }
}

/// Split a comma-separated filter list into lower-case entries.
pub fn parse_tool_filters(csv: &str) -> Vec<String> {
    csv.split(',')
        .map(|item| item.trim().to_ascii_lowercase())
        .filter(|item| !item.is_empty())
        .collect()
}

/// List profiles in `dir`, skipping unreadable files.
pub fn list_profiles(dir: &Path) -> Result<Vec<Profile>> {
    let mut profiles = Vec::new();
    if !dir.exists() {
        return Ok(profiles);
    }
    for entry in fs::read_dir(dir)?.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("ini") {
            continue;
        }
        match Profile::load(&path) {
            Ok(profile) => profiles.push(profile),
            Err(e) => debug!(path = %path.display(), "skipping profile: {e}"),
        }
    }
    profiles.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(profiles)
}
