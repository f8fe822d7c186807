//! Four-corner calibration fitting.

use tracing::warn;

use super::{Calibration, CalibrationError, CalibrationMode, Result};

/// Solve a 3x3 linear system in place with Gauss-Jordan elimination and
/// partial pivoting. Fails when the best pivot falls below 1e-9.
fn solve_3x3(m: &mut [[f64; 3]; 3], v: &mut [f64; 3]) -> Option<[f64; 3]> {
    for i in 0..3 {
        let mut pivot = m[i][i].abs();
        let mut pivot_row = i;
        for r in i + 1..3 {
            if m[r][i].abs() > pivot {
                pivot = m[r][i].abs();
                pivot_row = r;
            }
        }
        if pivot < 1e-9 {
            return None;
        }
        if pivot_row != i {
            m.swap(i, pivot_row);
            v.swap(i, pivot_row);
        }
        let diag = m[i][i];
        for c in i..3 {
            m[i][c] /= diag;
        }
        v[i] /= diag;
        for r in 0..3 {
            if r == i {
                continue;
            }
            let factor = m[r][i];
            for c in i..3 {
                m[r][c] -= factor * m[i][c];
            }
            v[r] -= factor * v[i];
        }
    }
    Some(*v)
}

/// Least-squares affine fit of four raw samples onto four targets.
///
/// Builds one 3x3 normal-equation system per output axis and solves both.
fn solve_affine(raw: &[(f64, f64); 4], target: &[(f64, f64); 4]) -> Option<[f64; 6]> {
    let mut mx = [[0.0f64; 3]; 3];
    let mut my = [[0.0f64; 3]; 3];
    let mut bx = [0.0f64; 3];
    let mut by = [0.0f64; 3];

    for i in 0..4 {
        let v = [raw[i].0, raw[i].1, 1.0];
        for r in 0..3 {
            for c in 0..3 {
                mx[r][c] += v[r] * v[c];
                my[r][c] += v[r] * v[c];
            }
            bx[r] += v[r] * target[i].0;
            by[r] += v[r] * target[i].1;
        }
    }

    let ax = solve_3x3(&mut mx, &mut bx)?;
    let ay = solve_3x3(&mut my, &mut by)?;
    Some([ax[0], ax[1], ax[2], ay[0], ay[1], ay[2]])
}

/// Fit a calibration from four corner samples.
///
/// `samples` are raw device coordinates captured in the order top-left,
/// top-right, bottom-right, bottom-left; `targets` are the matching screen
/// points (conventionally the screen corners with a 20 px inset).
///
/// In [`CalibrationMode::Affine`] mode the six coefficients come from a
/// least-squares solve; a singular system falls back to MinMax with a
/// warning. In MinMax mode the raw ranges are edge averages:
/// `min_x = avg(TL.x, BL.x)`, `max_x = avg(TR.x, BR.x)`, and the symmetric
/// pair for Y. Each range is then shrunk by `margin_percent/100 · range` on
/// both sides to form a dead zone.
///
/// # Errors
///
/// [`CalibrationError::InvalidRange`] when a post-margin range is not
/// positive, [`CalibrationError::InvalidDimensions`] when the screen size is
/// degenerate.
pub fn fit_from_corners(
    samples: &[(f64, f64); 4],
    targets: &[(f64, f64); 4],
    mode: CalibrationMode,
    margin_percent: f64,
    screen_width: i32,
    screen_height: i32,
) -> Result<Calibration> {
    if screen_width <= 0 || screen_height <= 0 {
        return Err(CalibrationError::InvalidDimensions(
            screen_width,
            screen_height,
        ));
    }

    let [tl, tr, br, bl] = *samples;

    let mut min_x = (tl.0 + bl.0) / 2.0;
    let mut max_x = (tr.0 + br.0) / 2.0;
    let mut min_y = (tl.1 + tr.1) / 2.0;
    let mut max_y = (bl.1 + br.1) / 2.0;

    if margin_percent > 0.0 {
        let shrink_x = (max_x - min_x) * margin_percent / 100.0;
        let shrink_y = (max_y - min_y) * margin_percent / 100.0;
        min_x += shrink_x;
        max_x -= shrink_x;
        min_y += shrink_y;
        max_y -= shrink_y;
    }

    let range_x = max_x - min_x;
    if range_x <= 0.0 {
        return Err(CalibrationError::InvalidRange {
            axis: "x",
            range: range_x,
        });
    }
    let range_y = max_y - min_y;
    if range_y <= 0.0 {
        return Err(CalibrationError::InvalidRange {
            axis: "y",
            range: range_y,
        });
    }

    let mut cal = Calibration::minmax(min_x, max_x, min_y, max_y, screen_width, screen_height);
    cal.margin_percent = margin_percent;

    if mode == CalibrationMode::Affine {
        match solve_affine(samples, targets) {
            Some(coeffs) => {
                cal.mode = CalibrationMode::Affine;
                cal.affine = coeffs;
            }
            None => {
                warn!("affine fit is singular, falling back to min/max calibration");
            }
        }
    }

    Ok(cal)
}
