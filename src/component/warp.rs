//! Warp components: spatial warps remap screen position, `vec2 f(vec2 x)`;
//! time warps remap the clock, `float f(float time)`.

use anyhow::{bail, Result};

use crate::escape;
use crate::target::ShaderTarget;
use crate::types::SourceLocation;

const NOP_GLSL: &str = "\
vec2 @<X>@(vec2 x){
    return x;
}
";

const ON_ELECTRODES_GLSL: &str = "\
vec2 @<X>@(vec2 x){
    vec2 p = x - @<X>@_offset + @<X>@_period * 0.5;
    vec2 ip = floor(p / @<X>@_period);
    bool zone1 = ip.x >= @<X>@_zone1TopLeft.x && ip.y >= @<X>@_zone1TopLeft.y && ip.x <= @<X>@_zone1BottomRight.x && ip.y <= @<X>@_zone1BottomRight.y;
    bool zone2 = ip.x >= @<X>@_zone2TopLeft.x && ip.y >= @<X>@_zone2TopLeft.y && ip.x <= @<X>@_zone2BottomRight.x && ip.y <= @<X>@_zone2BottomRight.y;
    if (zone1 || zone2) {
        return mod(p, @<X>@_period) - @<X>@_period * 0.5;
    }
    return vec2(1000000.0, 1000000.0);
}
";

/// Tile the pattern onto the electrode grid, one copy per electrode inside
/// the active zones. Positions outside both zones are sent far off-pattern.
#[derive(Debug, Clone, Default)]
pub struct OnElectrodes {
    /// Grid period [um]; a zero component falls back to the sequence's
    /// electrode distance.
    pub period_um: [f64; 2],
}

impl OnElectrodes {
    fn apply(&self, target: &mut dyn ShaderTarget, name: &str) -> Result<()> {
        let seq = target.sequence();
        let period = [
            if self.period_um[0] == 0.0 {
                seq.electrode_distance_um[0]
            } else {
                self.period_um[0]
            },
            if self.period_um[1] == 0.0 {
                seq.electrode_distance_um[1]
            } else {
                self.period_um[1]
            },
        ];
        let offset = seq.electrode_offset_um;
        let zone1 = seq.electrode_zone1;
        let zone2 = seq.electrode_zone2;
        target.set_shader_vector(&format!("{name}_period"), period[0], period[1]);
        target.set_shader_vector(&format!("{name}_offset"), offset[0], offset[1]);
        target.set_shader_vector(&format!("{name}_zone1TopLeft"), zone1[0], zone1[1]);
        target.set_shader_vector(&format!("{name}_zone1BottomRight"), zone1[2], zone1[3]);
        target.set_shader_vector(&format!("{name}_zone2TopLeft"), zone2[0], zone2[1]);
        target.set_shader_vector(&format!("{name}_zone2BottomRight"), zone2[2], zone2[3]);
        target.set_shader_function(name, &escape::expand(ON_ELECTRODES_GLSL, name)?);
        Ok(())
    }
}

/// A spatial warp assigned to one warp slot of a composition.
#[derive(Debug, Clone, Default)]
pub enum Warp {
    /// Pass positions through unchanged.
    #[default]
    Nop,
    OnElectrodes(OnElectrodes),
}

impl Warp {
    pub fn apply(&self, target: &mut dyn ShaderTarget, name: &str) -> Result<()> {
        match self {
            Warp::Nop => {
                target.set_shader_function(name, &escape::expand(NOP_GLSL, name)?);
                Ok(())
            }
            Warp::OnElectrodes(warp) => warp.apply(target, name),
        }
    }
}

impl From<OnElectrodes> for Warp {
    fn from(warp: OnElectrodes) -> Warp {
        Warp::OnElectrodes(warp)
    }
}

const DELAY_GLSL: &str = "\
float @<X>@(float time){
    return max(time - `delay, 0.0);
}
";

const LOOP_GLSL: &str = "\
float @<X>@(float time){
    return mod(time, `period);
}
";

/// A clock remap assigned to the warp slot of a time-warped composition.
#[derive(Debug, Clone)]
pub enum TimeWarp {
    /// Hold the first frame for a while, then play normally.
    Delay { delay_s: f64 },
    /// Repeat the first stretch of the sequence.
    Loop { period_s: f64 },
}

impl TimeWarp {
    pub fn apply(
        &self,
        target: &mut dyn ShaderTarget,
        name: &str,
        at: &SourceLocation,
    ) -> Result<()> {
        match self {
            TimeWarp::Delay { delay_s } => {
                target.set_shader_variable(&format!("{name}_delay"), *delay_s);
                target.set_shader_function(name, &escape::expand(DELAY_GLSL, name)?);
                Ok(())
            }
            TimeWarp::Loop { period_s } => {
                if *period_s <= 0.0 {
                    bail!("{at}: loop period must be positive, got {period_s}");
                }
                target.set_shader_variable(&format!("{name}_period"), *period_s);
                target.set_shader_function(name, &escape::expand(LOOP_GLSL, name)?);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::PassProgram;
    use crate::types::SequenceInfo;

    #[test]
    fn electrode_period_falls_back_to_the_sequence_grid() {
        let seq = SequenceInfo {
            electrode_distance_um: [120.0, 80.0],
            ..SequenceInfo::default()
        };
        let mut program = PassProgram::new(&seq, 1.0);
        Warp::from(OnElectrodes {
            period_um: [0.0, 200.0],
        })
        .apply(&mut program, "fig_warp")
        .unwrap();
        assert_eq!(program.vectors()["fig_warp_period"], [120.0, 200.0]);
        assert_eq!(
            program.vectors()["fig_warp_zone1TopLeft"],
            [-1_000_000.0, -1_000_000.0]
        );
    }

    #[test]
    fn nop_warp_passes_positions_through() {
        let mut program = PassProgram::new(&SequenceInfo::default(), 1.0);
        Warp::Nop.apply(&mut program, "fig_warp").unwrap();
        assert_eq!(
            program.functions()["fig_warp"],
            "vec2 fig_warp(vec2 x){\n    return x;\n}\n"
        );
    }

    #[test]
    fn loop_rejects_a_zero_period() {
        let mut program = PassProgram::new(&SequenceInfo::default(), 1.0);
        let err = TimeWarp::Loop { period_s: 0.0 }
            .apply(&mut program, "fig_warp", &SourceLocation::new("timeWarp"))
            .unwrap_err()
            .to_string();
        assert!(err.contains("loop period must be positive"), "{err}");
    }
}
