//! Textual monitor report parsers.
//!
//! These accept the display server's two report formats: a compact list
//! (one monitor per line with `W/physW x H/physH +X+Y` geometry and a
//! trailing output name) and a verbose dump (per-monitor rotation tokens, a
//! `Scale:` line, and an indented `EDID:` hex block). The parsers tolerate
//! reordering, extra whitespace, and missing optional fields; rotation
//! defaults to normal, scale to 1, EDID hash to empty.
//!
//! [`read_layout`](super::read_layout) queries RandR directly and is the
//! primary source; these parsers exist for captured reports and tests.

use super::{fnv1a_hex, DesktopLayout, Monitor, Result, Rotation};

/// Parse a geometry token of the form `1920/527x1080/296+0+0`.
///
/// Returns `(width, height, x, y)`.
fn parse_geometry(token: &str) -> Option<(i32, i32, i32, i32)> {
    let (w_part, rest) = token.split_once('/')?;
    let width: i32 = w_part.parse().ok()?;

    let (_phys_w, rest) = rest.split_once('x')?;
    let (h_part, rest) = rest.split_once('/')?;
    let height: i32 = h_part.parse().ok()?;

    // rest is now "<phys_h>[+-]X[+-]Y"; find the signed offsets.
    let offsets_at = rest.find(['+', '-'])?;
    let offsets = &rest[offsets_at..];
    let mut parts = Vec::new();
    let mut current = String::new();
    for ch in offsets.chars() {
        if (ch == '+' || ch == '-') && !current.is_empty() {
            parts.push(current.clone());
            current.clear();
        }
        if ch == '+' {
            continue;
        }
        current.push(ch);
    }
    if !current.is_empty() {
        parts.push(current);
    }
    if parts.len() != 2 {
        return None;
    }
    let x: i32 = parts[0].parse().ok()?;
    let y: i32 = parts[1].parse().ok()?;
    Some((width, height, x, y))
}

/// Parse the compact monitor list.
///
/// Each monitor line carries `index:`, an indicator token whose `*` marks
/// the primary monitor, a geometry token, and the output name as the last
/// token. Lines without a parsable geometry are skipped.
pub fn parse_monitor_list(list: &str) -> Vec<Monitor> {
    let mut monitors = Vec::new();

    for line in list.lines() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < 3 {
            continue;
        }

        let Some((width, height, x, y)) = tokens.iter().find_map(|t| parse_geometry(t)) else {
            continue;
        };

        let index = tokens[0]
            .trim_end_matches(':')
            .parse()
            .unwrap_or(monitors.len() as i32);
        let primary = tokens[1].contains('*');
        let name = tokens.last().copied().unwrap_or_default();

        let mut monitor = Monitor::new(index, name, x, y, width, height);
        monitor.primary = primary;
        monitors.push(monitor);
    }

    monitors
}

/// Extract the rotation token from a monitor header line.
///
/// The token appears bare between the geometry and the list of available
/// rotations; verbose dumps interleave a parenthesised mode id, so
/// parenthesised groups are skipped. As a fallback the first word of the
/// first parenthesised group is accepted.
fn header_rotation(line: &str) -> Option<Rotation> {
    let mut depth = 0usize;
    let mut outside = String::new();
    for ch in line.chars() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => outside.push(ch),
            _ => {}
        }
    }
    for token in outside.split_whitespace() {
        if matches!(token, "normal" | "inverted" | "left" | "right") {
            return Some(Rotation::parse(token));
        }
    }
    let group = line.split('(').nth(1)?.split(')').next()?;
    let first = group.split_whitespace().next()?;
    matches!(first, "normal" | "inverted" | "left" | "right").then(|| Rotation::parse(first))
}

/// Fold the verbose dump's rotation/scale/EDID data into `monitors`.
///
/// A non-indented line naming a known output opens that monitor's section;
/// indented `Scale:` and `EDID:` entries apply to the open section.
pub fn apply_verbose_report(monitors: &mut [Monitor], verbose: &str) {
    let mut current: Option<usize> = None;
    let mut lines = verbose.lines().peekable();

    while let Some(line) = lines.next() {
        if line.is_empty() {
            continue;
        }
        if !line.starts_with(char::is_whitespace) {
            let trimmed = line.trim();
            current = monitors.iter().position(|m| {
                trimmed == m.name || trimmed.starts_with(&format!("{} ", m.name))
            });
            if let Some(idx) = current {
                if let Some(rotation) = header_rotation(trimmed) {
                    monitors[idx].rotation = rotation;
                }
            }
            continue;
        }

        let Some(idx) = current else { continue };
        let trimmed = line.trim();

        if let Some(rest) = trimmed.strip_prefix("Scale:") {
            if let Some((sx, sy)) = rest.split_once('x') {
                if let Ok(sx) = sx.trim().parse::<f64>() {
                    if sx > 0.0 {
                        monitors[idx].scale_x = sx;
                    }
                }
                if let Ok(sy) = sy.trim().parse::<f64>() {
                    if sy > 0.0 {
                        monitors[idx].scale_y = sy;
                    }
                }
            }
        } else if trimmed == "EDID:" {
            let mut edid = String::new();
            while let Some(next) = lines.peek() {
                if next.is_empty() || !next.starts_with(char::is_whitespace) {
                    break;
                }
                edid.extend(next.chars().filter(|c| !c.is_whitespace()));
                lines.next();
            }
            if !edid.is_empty() {
                monitors[idx].edid_hash = fnv1a_hex(edid.as_bytes());
            }
        }
    }
}

/// Build a [`DesktopLayout`] from the two textual reports.
///
/// # Errors
///
/// [`super::LayoutError::NoMonitors`] when the list yields zero monitors.
pub fn parse_layout(list: &str, verbose: &str) -> Result<DesktopLayout> {
    let mut monitors = parse_monitor_list(list);
    apply_verbose_report(&mut monitors, verbose);
    DesktopLayout::from_monitors(monitors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::LayoutError;

    const LIST: &str = "Monitors: 2\n\
         0: +*DP-1 1920/527x1080/296+0+0  DP-1\n\
         1: +HDMI-1 1920/509x1080/286+1920+0  HDMI-1\n";

    #[test]
    fn parses_compact_list() {
        let monitors = parse_monitor_list(LIST);
        assert_eq!(monitors.len(), 2);

        assert_eq!(monitors[0].index, 0);
        assert_eq!(monitors[0].name, "DP-1");
        assert!(monitors[0].primary);
        assert_eq!(
            (monitors[0].x, monitors[0].y, monitors[0].width, monitors[0].height),
            (0, 0, 1920, 1080)
        );

        assert_eq!(monitors[1].name, "HDMI-1");
        assert!(!monitors[1].primary);
        assert_eq!(monitors[1].x, 1920);
    }

    #[test]
    fn parses_negative_offsets() {
        let monitors =
            parse_monitor_list(" 0: +eDP-1 2560/340x1440/190-2560-100  eDP-1\n");
        assert_eq!(monitors[0].x, -2560);
        assert_eq!(monitors[0].y, -100);
    }

    #[test]
    fn skips_header_and_garbage_lines() {
        let monitors = parse_monitor_list("Monitors: 1\nnoise here\n 0: +*X-1 800/100x600/80+0+0  X-1\n");
        assert_eq!(monitors.len(), 1);
    }

    #[test]
    fn geometry_token_parser() {
        assert_eq!(
            parse_geometry("1920/527x1080/296+0+0"),
            Some((1920, 1080, 0, 0))
        );
        assert_eq!(
            parse_geometry("1024/270x768/203+1920-64"),
            Some((1024, 768, 1920, -64))
        );
        assert_eq!(parse_geometry("1920x1080"), None);
        assert_eq!(parse_geometry("junk"), None);
    }

    #[test]
    fn verbose_rotation_and_scale() {
        let mut monitors = parse_monitor_list(LIST);
        let verbose = "\
DP-1 connected primary 1920x1080+0+0 (0x47) normal (normal left inverted right x axis y axis) 527mm x 296mm
\tScale: 1.0 x 1.0
HDMI-1 connected 1080x1920+1920+0 left (normal left inverted right x axis y axis) 509mm x 286mm
\tScale: 1.5 x 1.5
";
        apply_verbose_report(&mut monitors, verbose);
        assert_eq!(monitors[0].rotation, Rotation::Normal);
        assert_eq!(monitors[1].rotation, Rotation::Left);
        assert_eq!(monitors[1].scale_x, 1.5);
        assert_eq!(monitors[1].scale_y, 1.5);
    }

    #[test]
    fn verbose_rotation_after_mode_id() {
        // Verbose dumps interleave the mode id before the rotation token;
        // the availability list must not be mistaken for it.
        let mut monitors = parse_monitor_list(" 0: +*DP-1 1080/296x1920/527+0+0  DP-1\n");
        apply_verbose_report(
            &mut monitors,
            "DP-1 connected primary 1080x1920+0+0 (0x47) right (normal left inverted right x axis y axis) 296mm x 527mm\n",
        );
        assert_eq!(monitors[0].rotation, Rotation::Right);
    }

    #[test]
    fn verbose_rotation_inside_parenthesised_group() {
        let mut monitors = parse_monitor_list(" 0: +*DP-1 1920/527x1080/296+0+0  DP-1\n");
        apply_verbose_report(&mut monitors, "DP-1 connected 1920x1080+0+0 (inverted)\n");
        assert_eq!(monitors[0].rotation, Rotation::Inverted);
    }

    #[test]
    fn verbose_edid_hashes_hex_block() {
        let mut monitors = parse_monitor_list(" 0: +*DP-1 1920/527x1080/296+0+0  DP-1\n");
        let verbose = "\
DP-1 connected 1920x1080+0+0 normal
\tEDID:
\t\t00ffffffffffff004c2d0c0c00000000
\t\t2f1c0104a53c22783ace55a6564ea226
\tBrightness: 1.0
";
        apply_verbose_report(&mut monitors, verbose);
        let expected = fnv1a_hex(
            b"00ffffffffffff004c2d0c0c000000002f1c0104a53c22783ace55a6564ea226",
        );
        assert_eq!(monitors[0].edid_hash, expected);
    }

    #[test]
    fn unknown_sections_are_ignored() {
        let mut monitors = parse_monitor_list(LIST);
        let verbose = "VIRTUAL-9 disconnected (normal left inverted right)\n\tScale: 3.0 x 3.0\n";
        apply_verbose_report(&mut monitors, verbose);
        assert_eq!(monitors[0].scale_x, 1.0);
        assert_eq!(monitors[1].scale_x, 1.0);
    }

    #[test]
    fn layout_from_reports() {
        let layout = parse_layout(LIST, "").unwrap();
        assert_eq!(layout.width, 3840);
        assert_eq!(layout.height, 1080);
        assert!(!layout.hash.is_empty());
    }

    #[test]
    fn empty_list_fails() {
        assert!(matches!(
            parse_layout("Monitors: 0\n", ""),
            Err(LayoutError::NoMonitors)
        ));
    }
}
