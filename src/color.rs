//! Color parameter resolution and picker math.

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::types::SourceLocation;

/// An author-facing color: a name, a grey level to broadcast, or a triplet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColorSpec {
    Name(String),
    Grey(f64),
    Rgb([f64; 3]),
}

impl From<&str> for ColorSpec {
    fn from(name: &str) -> Self {
        ColorSpec::Name(name.to_string())
    }
}

impl From<f64> for ColorSpec {
    fn from(level: f64) -> Self {
        ColorSpec::Grey(level)
    }
}

impl From<[f64; 3]> for ColorSpec {
    fn from(rgb: [f64; 3]) -> Self {
        ColorSpec::Rgb(rgb)
    }
}

const NAMED: [(&str, [f64; 3]); 10] = [
    ("white", [1.0, 1.0, 1.0]),
    ("black", [0.0, 0.0, 0.0]),
    ("grey", [0.5, 0.5, 0.5]),
    ("gray", [0.5, 0.5, 0.5]),
    ("red", [1.0, 0.0, 0.0]),
    ("green", [0.0, 1.0, 0.0]),
    ("blue", [0.0, 0.0, 1.0]),
    ("cyan", [0.0, 1.0, 1.0]),
    ("magenta", [1.0, 0.0, 1.0]),
    ("yellow", [1.0, 1.0, 0.0]),
];

/// Resolve an author-facing color to an RGB triplet.
///
/// A scalar broadcasts to all three channels; an unknown name is an authoring
/// error reported at the component's declaration.
pub fn process_color(spec: &ColorSpec, at: &SourceLocation) -> Result<[f64; 3]> {
    match spec {
        ColorSpec::Name(name) => {
            let lower = name.to_ascii_lowercase();
            for (candidate, rgb) in NAMED {
                if candidate == lower {
                    return Ok(rgb);
                }
            }
            bail!("{at}: unknown color name '{name}'");
        }
        ColorSpec::Grey(level) => Ok([*level, *level, *level]),
        ColorSpec::Rgb(rgb) => Ok(*rgb),
    }
}

/// Whether a color stays on the intensity-only path.
///
/// The engine treats anything within a 3% channel spread as grey.
pub fn is_grey(rgb: [f64; 3]) -> bool {
    let max = rgb[0].max(rgb[1]).max(rgb[2]);
    let min = rgb[0].min(rgb[1]).min(rgb[2]);
    max - min <= 0.03
}

/// RGB to hue/lightness/saturation.
/// https://en.wikipedia.org/wiki/HSL_and_HSV#From_RGB
pub fn rgb_to_hls([r, g, b]: [f64; 3]) -> [f64; 3] {
    let maxc = r.max(g).max(b);
    let minc = r.min(g).min(b);
    let l = (minc + maxc) / 2.0;
    if maxc == minc {
        return [0.0, l, 0.0];
    }
    let spread = maxc - minc;
    let s = if l <= 0.5 {
        spread / (maxc + minc)
    } else {
        spread / (2.0 - maxc - minc)
    };
    let rc = (maxc - r) / spread;
    let gc = (maxc - g) / spread;
    let bc = (maxc - b) / spread;
    let h = if r == maxc {
        bc - gc
    } else if g == maxc {
        2.0 + rc - bc
    } else {
        4.0 + gc - rc
    };
    [(h / 6.0).rem_euclid(1.0), l, s]
}

/// Hue/lightness/saturation back to RGB.
pub fn hls_to_rgb([h, l, s]: [f64; 3]) -> [f64; 3] {
    if s == 0.0 {
        return [l, l, l];
    }
    let m2 = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let m1 = 2.0 * l - m2;
    [
        hue_channel(m1, m2, h + 1.0 / 3.0),
        hue_channel(m1, m2, h),
        hue_channel(m1, m2, h - 1.0 / 3.0),
    ]
}

fn hue_channel(m1: f64, m2: f64, hue: f64) -> f64 {
    let hue = hue.rem_euclid(1.0);
    if hue < 1.0 / 6.0 {
        m1 + (m2 - m1) * hue * 6.0
    } else if hue < 0.5 {
        m2
    } else if hue < 2.0 / 3.0 {
        m1 + (m2 - m1) * (2.0 / 3.0 - hue) * 6.0
    } else {
        m1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: [f64; 3], b: [f64; 3]) -> bool {
        a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-9)
    }

    #[test]
    fn magenta_resolves_to_triplet() {
        let rgb = process_color(&"magenta".into(), &SourceLocation::default()).unwrap();
        assert_eq!(rgb, [1.0, 0.0, 1.0]);
    }

    #[test]
    fn scalar_broadcasts_to_three_channels() {
        let rgb = process_color(&0.5.into(), &SourceLocation::default()).unwrap();
        assert_eq!(rgb, [0.5, 0.5, 0.5]);
    }

    #[test]
    fn unknown_name_reports_location() {
        let at = SourceLocation::new("pass.pattern.color1");
        let err = process_color(&"blurple".into(), &at).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("pass.pattern.color1"), "got: {msg}");
        assert!(msg.contains("blurple"), "got: {msg}");
    }

    #[test]
    fn grey_threshold_is_three_percent() {
        assert!(is_grey([0.5, 0.5, 0.53]));
        assert!(!is_grey([0.5, 0.5, 0.54]));
    }

    #[test]
    fn hls_round_trips_primaries() {
        for rgb in [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.3, 0.3, 0.3]] {
            assert!(approx(hls_to_rgb(rgb_to_hls(rgb)), rgb), "failed for {rgb:?}");
        }
    }

    #[test]
    fn red_hue_is_zero() {
        let [h, l, s] = rgb_to_hls([1.0, 0.0, 0.0]);
        assert_eq!(h, 0.0);
        assert!((l - 0.5).abs() < 1e-12);
        assert!((s - 1.0).abs() < 1e-12);
    }
}
