//! Direction parameter resolution.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::types::SourceLocation;

/// An author-facing direction: a compass name or an angle in radians.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DirectionSpec {
    Name(String),
    Radians(f64),
}

impl From<&str> for DirectionSpec {
    fn from(name: &str) -> Self {
        DirectionSpec::Name(name.to_string())
    }
}

impl From<f64> for DirectionSpec {
    fn from(radians: f64) -> Self {
        DirectionSpec::Radians(radians)
    }
}

const COMPASS: [(&str, f64); 8] = [
    ("east", 0.0),
    ("northeast", FRAC_PI_4),
    ("north", FRAC_PI_2),
    ("northwest", 3.0 * FRAC_PI_4),
    ("west", PI),
    ("southwest", PI + FRAC_PI_4),
    ("south", PI + FRAC_PI_2),
    ("southeast", PI + 3.0 * FRAC_PI_4),
];

/// Resolve an author-facing direction to radians (east is 0, counterclockwise).
pub fn process_direction(spec: &DirectionSpec, at: &SourceLocation) -> Result<f64> {
    match spec {
        DirectionSpec::Name(name) => {
            let lower = name.to_ascii_lowercase();
            for (candidate, radians) in COMPASS {
                if candidate == lower {
                    return Ok(radians);
                }
            }
            bail!(
                "{at}: unknown direction '{name}' (expected radians or one of \
                 east, northeast, north, northwest, west, southwest, south, southeast)"
            );
        }
        DirectionSpec::Radians(radians) => Ok(*radians),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn northeast_is_quarter_pi() {
        let d = process_direction(&"northeast".into(), &SourceLocation::default()).unwrap();
        assert!((d - PI * 0.25).abs() < 1e-12);
    }

    #[test]
    fn radians_pass_through() {
        let d = process_direction(&1.25.into(), &SourceLocation::default()).unwrap();
        assert_eq!(d, 1.25);
    }

    #[test]
    fn unknown_direction_is_descriptive() {
        let at = SourceLocation::new("pass.pattern.direction");
        let err = process_direction(&"up".into(), &at).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("pass.pattern.direction"), "got: {msg}");
        assert!(msg.contains("'up'"), "got: {msg}");
    }
}
