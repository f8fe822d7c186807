//! Raw-to-screen coordinate calibration.
//!
//! Two models are supported:
//!
//! - **MinMax** — axis-aligned linear mapping from a raw `[min, max]` range
//!   onto `[0, screen-1]` per axis.
//! - **Affine** — six-parameter two-dimensional affine mapping fitted from
//!   four corner samples ([`fit_from_corners`]).
//!
//! Both models apply an additive pixel offset after mapping, clamp to the
//! `[offset, offset + screen_dim)` window on the final output (not on
//! intermediate math, which keeps the affine branch numerically stable), and
//! round half-to-even to the final integer coordinate.

mod file;
mod fit;

pub use fit::fit_from_corners;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for calibration operations.
pub type Result<T> = std::result::Result<T, CalibrationError>;

/// Calibration error types.
#[derive(Error, Debug)]
pub enum CalibrationError {
    /// A raw range collapsed to zero or negative width after processing.
    #[error("invalid calibration range: {axis} range is {range}")]
    InvalidRange {
        /// Axis name ("x" or "y").
        axis: &'static str,
        /// Computed range value.
        range: f64,
    },

    /// The normal-equation system of an affine fit was singular.
    #[error("affine fit failed: singular normal equations")]
    SingularFit,

    /// Screen dimensions were zero or negative.
    #[error("invalid screen dimensions: {0}x{1}")]
    InvalidDimensions(i32, i32),

    /// Calibration file was unreadable or unwritable.
    #[error("calibration file I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Calibration file was readable but not a calibration file.
    #[error("malformed calibration file: {0}")]
    Malformed(String),
}

/// Which mapping model is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalibrationMode {
    /// Axis-aligned linear mapping from `[min, max]` raw ranges.
    MinMax,
    /// Six-parameter affine mapping.
    Affine,
}

impl CalibrationMode {
    /// On-disk token for this mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            CalibrationMode::MinMax => "minmax",
            CalibrationMode::Affine => "affine",
        }
    }
}

/// Raw-device-to-screen coordinate mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Calibration {
    /// Active mapping model.
    pub mode: CalibrationMode,
    /// Raw X at the left screen edge (MinMax).
    pub min_x: f64,
    /// Raw X at the right screen edge (MinMax).
    pub max_x: f64,
    /// Raw Y at the top screen edge (MinMax).
    pub min_y: f64,
    /// Raw Y at the bottom screen edge (MinMax).
    pub max_y: f64,
    /// Affine coefficients `(a, b, c, d, e, f)`:
    /// `x = a·rx + b·ry + c`, `y = d·rx + e·ry + f`.
    pub affine: [f64; 6],
    /// Logical screen width in pixels.
    pub screen_width: i32,
    /// Logical screen height in pixels.
    pub screen_height: i32,
    /// Additive X offset applied after mapping.
    pub x_offset: i32,
    /// Additive Y offset applied after mapping.
    pub y_offset: i32,
    /// Dead-zone margin per side, percent of the raw range.
    pub margin_percent: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            mode: CalibrationMode::MinMax,
            min_x: 0.0,
            max_x: 4095.0,
            min_y: 0.0,
            max_y: 4095.0,
            affine: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            screen_width: 1920,
            screen_height: 1080,
            x_offset: 0,
            y_offset: 0,
            margin_percent: 0.0,
        }
    }
}

impl Calibration {
    /// Construct a MinMax calibration.
    pub fn minmax(
        min_x: f64,
        max_x: f64,
        min_y: f64,
        max_y: f64,
        screen_width: i32,
        screen_height: i32,
    ) -> Self {
        Self {
            mode: CalibrationMode::MinMax,
            min_x,
            max_x,
            min_y,
            max_y,
            screen_width,
            screen_height,
            ..Self::default()
        }
    }

    /// Construct an affine calibration from its six coefficients.
    pub fn affine(coeffs: [f64; 6], screen_width: i32, screen_height: i32) -> Self {
        Self {
            mode: CalibrationMode::Affine,
            affine: coeffs,
            screen_width,
            screen_height,
            ..Self::default()
        }
    }

    /// Replace the MinMax ranges and screen dimensions, switching to MinMax
    /// mode.
    pub fn set_minmax(
        &mut self,
        min_x: f64,
        max_x: f64,
        min_y: f64,
        max_y: f64,
        screen_width: i32,
        screen_height: i32,
    ) {
        self.mode = CalibrationMode::MinMax;
        self.min_x = min_x;
        self.max_x = max_x;
        self.min_y = min_y;
        self.max_y = max_y;
        self.screen_width = screen_width;
        self.screen_height = screen_height;
    }

    /// Replace the affine coefficients and screen dimensions, switching to
    /// affine mode.
    pub fn set_affine(&mut self, coeffs: [f64; 6], screen_width: i32, screen_height: i32) {
        self.mode = CalibrationMode::Affine;
        self.affine = coeffs;
        self.screen_width = screen_width;
        self.screen_height = screen_height;
    }

    /// Set the additive pixel offset applied after mapping.
    pub fn set_offset(&mut self, x_offset: i32, y_offset: i32) {
        self.x_offset = x_offset;
        self.y_offset = y_offset;
    }

    /// Set the dead-zone margin percentage used by corner fits.
    pub fn set_margin(&mut self, margin_percent: f64) {
        self.margin_percent = margin_percent;
    }

    /// Map raw device coordinates to logical screen coordinates.
    ///
    /// The output always satisfies
    /// `x_offset <= x <= x_offset + screen_width - 1` (same for Y).
    pub fn apply(&self, raw_x: i32, raw_y: i32) -> (i32, i32) {
        let rx = raw_x as f64;
        let ry = raw_y as f64;

        let (mapped_x, mapped_y) = match self.mode {
            CalibrationMode::Affine => {
                let [a, b, c, d, e, f] = self.affine;
                (a * rx + b * ry + c, d * rx + e * ry + f)
            }
            CalibrationMode::MinMax => {
                // Degenerate range falls back to a width of 1; no failure.
                let range_x = (self.max_x - self.min_x).max(1.0);
                let range_y = (self.max_y - self.min_y).max(1.0);
                let u = ((rx - self.min_x) / range_x).clamp(0.0, 1.0);
                let v = ((ry - self.min_y) / range_y).clamp(0.0, 1.0);
                (
                    u * (self.screen_width - 1).max(0) as f64,
                    v * (self.screen_height - 1).max(0) as f64,
                )
            }
        };

        let lo_x = self.x_offset as f64;
        let hi_x = lo_x + (self.screen_width - 1).max(0) as f64;
        let lo_y = self.y_offset as f64;
        let hi_y = lo_y + (self.screen_height - 1).max(0) as f64;

        let x = (mapped_x + self.x_offset as f64).clamp(lo_x, hi_x);
        let y = (mapped_y + self.y_offset as f64).clamp(lo_y, hi_y);

        (x.round_ties_even() as i32, y.round_ties_even() as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minmax_maps_endpoints_to_screen_edges() {
        let cal = Calibration::minmax(0.0, 4095.0, 0.0, 4095.0, 1920, 1080);
        assert_eq!(cal.apply(0, 0), (0, 0));
        assert_eq!(cal.apply(4095, 4095), (1919, 1079));
    }

    #[test]
    fn minmax_midpoint() {
        let cal = Calibration::minmax(0.0, 4095.0, 0.0, 4095.0, 1920, 1080);
        // 2048/4095 * 1919 = 959.73.., 1024/4095 * 1079 = 269.81..
        assert_eq!(cal.apply(2048, 1024), (960, 270));
    }

    #[test]
    fn minmax_clamps_out_of_range_raw_input() {
        let cal = Calibration::minmax(100.0, 3995.0, 100.0, 3995.0, 800, 480);
        assert_eq!(cal.apply(-50, 0), (0, 0));
        assert_eq!(cal.apply(5000, 5000), (799, 479));
    }

    #[test]
    fn zero_range_falls_back_without_failing() {
        let cal = Calibration::minmax(2048.0, 2048.0, 0.0, 4095.0, 1920, 1080);
        // Range collapses to 1; every input is clamped into [0, 1] progress.
        let (x, _) = cal.apply(2048, 0);
        assert_eq!(x, 0);
        let (x, _) = cal.apply(3000, 0);
        assert_eq!(x, 1919);
    }

    #[test]
    fn offset_shifts_and_bounds_output() {
        let mut cal = Calibration::minmax(0.0, 4095.0, 0.0, 4095.0, 1920, 1080);
        cal.set_offset(1920, 0);
        assert_eq!(cal.apply(0, 0), (1920, 0));
        assert_eq!(cal.apply(4095, 4095), (1920 + 1919, 1079));
    }

    #[test]
    fn affine_identity_with_offset() {
        let mut cal = Calibration::affine([1.0, 0.0, 0.0, 0.0, 1.0, 0.0], 1920, 1080);
        cal.set_offset(10, 20);
        assert_eq!(cal.apply(100, 200), (110, 220));
    }

    #[test]
    fn affine_clamps_final_output() {
        let cal = Calibration::affine([1.0, 0.0, 0.0, 0.0, 1.0, 0.0], 1920, 1080);
        assert_eq!(cal.apply(-500, 4000), (0, 1079));
    }

    #[test]
    fn affine_scales() {
        // Map a 4096-wide raw space onto 1024 px.
        let cal = Calibration::affine([0.25, 0.0, 0.0, 0.0, 0.25, 0.0], 1024, 1024);
        assert_eq!(cal.apply(4092, 2048), (1023, 512));
    }

    #[test]
    fn rounding_is_half_to_even() {
        // 0.5 raw maps exactly onto x.5 pixel boundaries with this setup.
        let cal = Calibration::affine([0.5, 0.0, 0.0, 0.0, 0.5, 0.0], 1920, 1080);
        assert_eq!(cal.apply(1, 1), (0, 0)); // 0.5 -> 0
        assert_eq!(cal.apply(3, 3), (2, 2)); // 1.5 -> 2
        assert_eq!(cal.apply(5, 5), (2, 2)); // 2.5 -> 2
    }

    #[test]
    fn output_always_within_window() {
        let mut cal = Calibration::minmax(0.0, 4095.0, 0.0, 4095.0, 800, 480);
        cal.set_offset(-100, 50);
        for raw in [-10_000, -1, 0, 1, 2048, 4095, 10_000] {
            let (x, y) = cal.apply(raw, raw);
            assert!(x >= -100 && x <= -100 + 799, "x={x} out of window");
            assert!(y >= 50 && y <= 50 + 479, "y={y} out of window");
        }
    }
}
