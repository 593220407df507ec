//! Shared value types threaded through composition and control binding.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Runtime value of an interactive control or of a bound shader parameter.
///
/// Every value that can reach a shader uniform carries its shape explicitly;
/// setter dispatch is an exhaustive match on this enum, so a value can never
/// be silently routed to the wrong setter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlValue {
    Scalar(f64),
    Vec2([f64; 2]),
    Color([f64; 3]),
}

impl fmt::Display for ControlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlValue::Scalar(v) => write!(f, "{v}"),
            ControlValue::Vec2([x, y]) => write!(f, "({x}, {y})"),
            ControlValue::Color([r, g, b]) => write!(f, "({r}, {g}, {b})"),
        }
    }
}

/// Where a component was declared in the authoring document.
///
/// Errors raised while resolving a component's parameters carry this token so
/// the front end can point at the failing declaration instead of at the
/// composition internals.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceLocation {
    pub file: Option<String>,
    pub path: String,
}

impl SourceLocation {
    pub fn new(path: impl Into<String>) -> Self {
        SourceLocation {
            file: None,
            path: path.into(),
        }
    }

    pub fn in_file(file: impl Into<String>, path: impl Into<String>) -> Self {
        SourceLocation {
            file: Some(file.into()),
            path: path.into(),
        }
    }

    /// Location of a field nested under this one.
    pub fn child(&self, key: &str) -> Self {
        let path = if self.path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{key}", self.path)
        };
        SourceLocation {
            file: self.file.clone(),
            path,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.file, self.path.is_empty()) {
            (Some(file), false) => write!(f, "{file}: {}", self.path),
            (Some(file), true) => write!(f, "{file}"),
            (None, false) => write!(f, "{}", self.path),
            (None, true) => write!(f, "<unlocated>"),
        }
    }
}

/// Field geometry and timing of the owning sequence.
///
/// Components read these for unit conversion: gradient ends given as 'edge',
/// start positions in percent/pixel/electrode units, and warp tiling onto the
/// electrode grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceInfo {
    pub field_width_um: f64,
    pub field_height_um: f64,
    pub field_width_px: u32,
    pub field_height_px: u32,
    pub frame_interval_s: f64,
    pub electrode_distance_um: [f64; 2],
    pub electrode_offset_um: [f64; 2],
    pub electrode_zone1: [f64; 4],
    pub electrode_zone2: [f64; 4],
}

impl Default for SequenceInfo {
    fn default() -> Self {
        SequenceInfo {
            field_width_um: 2000.0,
            field_height_um: 2000.0,
            field_width_px: 1024,
            field_height_px: 1024,
            frame_interval_s: 1.0 / 60.0,
            electrode_distance_um: [100.0, 100.0],
            electrode_offset_um: [0.0, 0.0],
            // zone1 covers every tile, zone2 is empty
            electrode_zone1: [-1_000_000.0, -1_000_000.0, 1_000_000.0, 1_000_000.0],
            electrode_zone2: [1.0, 1.0, -1.0, -1.0],
        }
    }
}

impl SequenceInfo {
    /// Convert a duration in seconds to whole frames, rounding the way the
    /// playback engine does.
    pub fn duration_frames(&self, seconds: f64) -> u32 {
        (seconds / self.frame_interval_s).floor() as u32 + 1
    }
}

/// Sink for control-value announcements.
///
/// One line is recorded per control resolved at every refresh; the playback
/// front end displays the tail of this log next to the stimulus.
#[derive(Debug, Default)]
pub struct EventLog {
    entries: Vec<String>,
}

impl EventLog {
    pub fn put(&mut self, line: String) {
        log::debug!("{line}");
        self.entries.push(line);
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_child_joins_with_dot() {
        let at = SourceLocation::in_file("spot.json", "pass");
        let child = at.child("pattern");
        assert_eq!(child.path, "pass.pattern");
        assert_eq!(child.to_string(), "spot.json: pass.pattern");
    }

    #[test]
    fn duration_frames_rounds_up_by_one_frame() {
        let seq = SequenceInfo {
            frame_interval_s: 0.01,
            ..SequenceInfo::default()
        };
        assert_eq!(seq.duration_frames(1.0), 101);
        assert_eq!(seq.duration_frames(0.005), 1);
    }

    #[test]
    fn control_value_displays_tuples_in_parens() {
        assert_eq!(ControlValue::Scalar(0.5).to_string(), "0.5");
        assert_eq!(ControlValue::Color([1.0, 0.0, 1.0]).to_string(), "(1, 0, 1)");
    }
}
