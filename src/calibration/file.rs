//! Calibration file persistence.
//!
//! The on-disk form is an INI document:
//!
//! ```ini
//! [Calibration]
//! mode=minmax
//! min_x=0.000000
//! ...
//! [Affine]       ; present iff mode=affine
//! m0=...
//! [Metadata]     ; optional
//! ```
//!
//! Numerics are C-locale decimal with six fractional digits. Keys missing
//! from the file keep their previous in-memory values; unknown keys survive
//! a load/save round-trip untouched. A legacy whitespace-separated
//! 8-integer format is still accepted on load.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::config::IniFile;

use super::{Calibration, CalibrationError, CalibrationMode, Result};

fn fmt(value: f64) -> String {
    format!("{value:.6}")
}

fn get_f64(doc: &IniFile, section: &str, key: &str, fallback: f64) -> f64 {
    doc.get(section, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(fallback)
}

fn get_i32(doc: &IniFile, section: &str, key: &str, fallback: i32) -> i32 {
    doc.get(section, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(fallback)
}

/// Parse the original plain format: eight whitespace-separated integers
/// `min_x max_x min_y max_y screen_w screen_h x_offset y_offset`.
fn parse_legacy(content: &str) -> Option<[i32; 8]> {
    let mut values = [0i32; 8];
    let mut fields = content.split_whitespace();
    for slot in values.iter_mut() {
        *slot = fields.next()?.parse().ok()?;
    }
    Some(values)
}

impl Calibration {
    /// Load calibration parameters from `path`, keeping current values for
    /// any keys the file does not carry.
    pub fn load_file(&mut self, path: &Path) -> Result<()> {
        let content = fs::read_to_string(path)?;
        let doc = IniFile::parse(&content);

        if !doc.has_section("Calibration") {
            if let Some([min_x, max_x, min_y, max_y, sw, sh, ox, oy]) = parse_legacy(&content) {
                debug!(path = %path.display(), "loaded legacy calibration format");
                self.set_minmax(
                    min_x as f64,
                    max_x as f64,
                    min_y as f64,
                    max_y as f64,
                    sw,
                    sh,
                );
                self.set_offset(ox, oy);
                return Ok(());
            }
            return Err(CalibrationError::Malformed(format!(
                "{}: no [Calibration] section",
                path.display()
            )));
        }

        let mode = match doc.get("Calibration", "mode") {
            Some("affine") => CalibrationMode::Affine,
            _ => CalibrationMode::MinMax,
        };

        self.screen_width = get_i32(&doc, "Calibration", "screen_width", self.screen_width);
        self.screen_height = get_i32(&doc, "Calibration", "screen_height", self.screen_height);
        self.x_offset = get_i32(&doc, "Calibration", "offset_x", self.x_offset);
        self.y_offset = get_i32(&doc, "Calibration", "offset_y", self.y_offset);
        self.margin_percent = get_f64(
            &doc,
            "Calibration",
            "margin_percent",
            self.margin_percent,
        );
        self.min_x = get_f64(&doc, "Calibration", "min_x", self.min_x);
        self.max_x = get_f64(&doc, "Calibration", "max_x", self.max_x);
        self.min_y = get_f64(&doc, "Calibration", "min_y", self.min_y);
        self.max_y = get_f64(&doc, "Calibration", "max_y", self.max_y);

        if mode == CalibrationMode::Affine {
            for (i, coeff) in self.affine.iter_mut().enumerate() {
                *coeff = doc
                    .get("Affine", &format!("m{i}"))
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(*coeff);
            }
        }
        self.mode = mode;
        debug!(path = %path.display(), mode = mode.as_str(), "calibration loaded");
        Ok(())
    }

    /// Save calibration parameters to `path`.
    pub fn save_file(&self, path: &Path) -> Result<()> {
        let mut doc = IniFile::new();
        doc.set("Calibration", "mode", self.mode.as_str());
        doc.set("Calibration", "min_x", fmt(self.min_x));
        doc.set("Calibration", "max_x", fmt(self.max_x));
        doc.set("Calibration", "min_y", fmt(self.min_y));
        doc.set("Calibration", "max_y", fmt(self.max_y));
        doc.set("Calibration", "screen_width", self.screen_width.to_string());
        doc.set(
            "Calibration",
            "screen_height",
            self.screen_height.to_string(),
        );
        doc.set("Calibration", "offset_x", self.x_offset.to_string());
        doc.set("Calibration", "offset_y", self.y_offset.to_string());
        doc.set("Calibration", "margin_percent", fmt(self.margin_percent));

        if self.mode == CalibrationMode::Affine {
            for (i, coeff) in self.affine.iter().enumerate() {
                doc.set("Affine", &format!("m{i}"), fmt(*coeff));
            }
        }

        doc.set("Metadata", "saved_with", env!("CARGO_PKG_NAME"));

        doc.save(path)
            .map_err(|e| match e {
                crate::config::ConfigError::Io(io) => CalibrationError::Io(io),
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minmax_round_trip_preserves_apply_results() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cal.ini");

        let mut cal = Calibration::minmax(100.0, 3995.5, 50.25, 3900.0, 1920, 1080);
        cal.set_offset(16, -8);
        cal.set_margin(0.5);
        cal.save_file(&path).unwrap();

        let mut loaded = Calibration::default();
        loaded.load_file(&path).unwrap();

        for raw_x in (0..=4200).step_by(37) {
            for raw_y in (0..=4200).step_by(211) {
                assert_eq!(cal.apply(raw_x, raw_y), loaded.apply(raw_x, raw_y));
            }
        }
    }

    #[test]
    fn affine_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cal.ini");

        let mut cal = Calibration::affine(
            [0.468750, 0.001953, -26.5, -0.002441, 0.351562, -15.25],
            1920,
            1080,
        );
        cal.set_offset(0, 0);
        cal.save_file(&path).unwrap();

        let mut loaded = Calibration::default();
        loaded.load_file(&path).unwrap();
        assert_eq!(loaded.mode, CalibrationMode::Affine);
        assert_eq!(loaded.affine, cal.affine);
        assert_eq!(loaded.apply(2000, 1500), cal.apply(2000, 1500));
    }

    #[test]
    fn missing_keys_keep_previous_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cal.ini");
        fs::write(&path, "[Calibration]\nmode=minmax\nmin_x=10.000000\n").unwrap();

        let mut cal = Calibration::minmax(0.0, 4000.0, 0.0, 3000.0, 800, 480);
        cal.set_offset(5, 7);
        cal.load_file(&path).unwrap();

        assert_eq!(cal.min_x, 10.0);
        assert_eq!(cal.max_x, 4000.0);
        assert_eq!(cal.screen_width, 800);
        assert_eq!(cal.x_offset, 5);
    }

    #[test]
    fn legacy_format_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cal.txt");
        fs::write(&path, "0 4095 0 4095 1920 1080 4 2\n").unwrap();

        let mut cal = Calibration::default();
        cal.load_file(&path).unwrap();
        assert_eq!(cal.mode, CalibrationMode::MinMax);
        assert_eq!(cal.max_x, 4095.0);
        assert_eq!(cal.screen_width, 1920);
        assert_eq!(cal.x_offset, 4);
        assert_eq!(cal.y_offset, 2);
    }

    #[test]
    fn garbage_file_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cal.txt");
        fs::write(&path, "this is not a calibration\n").unwrap();

        let mut cal = Calibration::default();
        let err = cal.load_file(&path).unwrap_err();
        assert!(matches!(err, CalibrationError::Malformed(_)));
    }
}
