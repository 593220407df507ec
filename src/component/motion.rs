//! Motion components: functions from time to an inverse pose transform,
//! `mat3x2 f(float time)` on the shader side.
//!
//! The matrix maps screen positions into the moving pattern's frame, so a
//! pattern at `startPosition` appears where the motion puts it.

use anyhow::{bail, Result};

use crate::binding::{BootContext, ParamBinding};
use crate::controls::ControlId;
use crate::direction::{self, DirectionSpec};
use crate::escape;
use crate::target::ShaderTarget;
use crate::types::{ControlValue, SourceLocation};

/// A start position with its unit of measurement.
#[derive(Debug, Clone)]
pub enum StartPosition {
    /// Micrometers from the field center.
    Um([f64; 2]),
    /// Fractions of the field size.
    Percent([f64; 2]),
    /// Pixels, scaled by the field resolution.
    Pixel([f64; 2]),
    /// A column letter and row index on the electrode grid. Column lettering
    /// skips 'I'.
    Electrode { column: char, row: f64 },
    /// Fed live by a pointer control, in micrometers.
    Control(ControlId),
}

impl Default for StartPosition {
    fn default() -> Self {
        StartPosition::Um([0.0, 0.0])
    }
}

impl StartPosition {
    /// This position as a registerable parameter. Fixed positions are
    /// converted to micrometers now; a control feeds micrometer pairs as-is.
    fn binding(&self, target: &dyn ShaderTarget, at: &SourceLocation) -> Result<ParamBinding> {
        if let StartPosition::Control(id) = self {
            return Ok(ParamBinding::Control(*id));
        }
        Ok(ParamBinding::Value(ControlValue::Vec2(
            self.resolve(target, at)?,
        )))
    }

    fn resolve(&self, target: &dyn ShaderTarget, at: &SourceLocation) -> Result<[f64; 2]> {
        let seq = target.sequence();
        match self {
            StartPosition::Um(p) => Ok(*p),
            StartPosition::Percent([x, y]) => {
                Ok([seq.field_width_um * x, seq.field_height_um * y])
            }
            StartPosition::Pixel([x, y]) => Ok([
                seq.field_width_um * x / seq.field_width_px as f64,
                seq.field_height_um * y / seq.field_height_px as f64,
            ]),
            StartPosition::Electrode { column, row } => {
                if !column.is_ascii_uppercase() || *column == 'I' {
                    bail!(
                        "{at}: '{column}' is not an electrode column (A-H, J-Z)"
                    );
                }
                let mut code = *column as u32;
                if code >= 'J' as u32 {
                    code -= 1;
                }
                let code = (code - 'A' as u32) as f64;
                Ok([
                    seq.electrode_offset_um[0] + code * seq.electrode_distance_um[0],
                    seq.electrode_offset_um[1] + row * seq.electrode_distance_um[1],
                ])
            }
            StartPosition::Control(_) => {
                bail!("{at}: a pointer-fed position has no fixed value")
            }
        }
    }
}

impl From<[f64; 2]> for StartPosition {
    fn from(um: [f64; 2]) -> Self {
        StartPosition::Um(um)
    }
}

impl From<ControlId> for StartPosition {
    fn from(id: ControlId) -> Self {
        StartPosition::Control(id)
    }
}

const TRANSLATION_GLSL: &str = "\
mat3x2 @<X>@ (float time){ return mat3x2(vec2(1.0, 0.0), vec2(0.0, 1.0), -`startPosition - `velocity * time); }
";

const SIMILARITY_GLSL: &str = "\
mat3x2 @<X>@ (float time){
    float angle = `angleInitialAndVelocity.x + `angleInitialAndVelocity.y * time;
    vec2 cs = vec2(cos(angle), sin(angle));
    vec2 scale = `startScale + `scaleVelocity * time;
    vec2 pos = `startPosition + `velocity * time;
    return mat3x2(cs / scale, cs.yx * vec2(-1.0, 1.0) / scale, vec2(dot(pos, cs * vec2(-1.0, 1.0)) / scale.x, -dot(pos, cs.yx) / scale.y));
}
";

const DISCRETE_GLSL: &str = "\
mat3x2 @<X>@ (float time){ return mat3x2(vec2(1.0, 0.0), vec2(0.0, 1.0), -`startPosition - `jump * floor(time / `tstep)); }
";

/// Straight-line motion, optionally rotating and scaling over time.
#[derive(Debug, Clone)]
pub struct Linear {
    pub start_position: StartPosition,
    /// Velocity [um/s].
    pub velocity: [f64; 2],
    /// Initial orientation [rad].
    pub start_angle: f64,
    /// Rotation velocity [rad/s].
    pub angular_velocity: f64,
    pub start_scale: [f64; 2],
    /// Scale factor change [1/s].
    pub scale_velocity: [f64; 2],
}

impl Default for Linear {
    fn default() -> Self {
        Linear {
            start_position: StartPosition::default(),
            velocity: [0.0, 0.0],
            start_angle: 0.0,
            angular_velocity: 0.0,
            start_scale: [1.0, 1.0],
            scale_velocity: [0.0, 0.0],
        }
    }
}

impl Linear {
    fn apply(
        &self,
        target: &mut dyn ShaderTarget,
        ctx: &mut BootContext,
        name: &str,
        at: &SourceLocation,
    ) -> Result<()> {
        let start = self
            .start_position
            .binding(target, &at.child("startPosition"))?;
        let velocity = ParamBinding::Value(ControlValue::Vec2(self.velocity));
        let translation_only = self.start_angle == 0.0
            && self.angular_velocity == 0.0
            && self.start_scale == [1.0, 1.0]
            && self.scale_velocity == [0.0, 0.0];
        if translation_only {
            ctx.register_controls(
                target,
                &format!("{name}_"),
                at,
                vec![("startPosition", start), ("velocity", velocity)],
            )?;
            target.set_shader_function(name, &escape::expand(TRANSLATION_GLSL, name)?);
        } else {
            ctx.register_controls(
                target,
                &format!("{name}_"),
                at,
                vec![
                    ("startPosition", start),
                    ("velocity", velocity),
                    (
                        "startScale",
                        ParamBinding::Value(ControlValue::Vec2(self.start_scale)),
                    ),
                    (
                        "scaleVelocity",
                        ParamBinding::Value(ControlValue::Vec2(self.scale_velocity)),
                    ),
                    (
                        "angleInitialAndVelocity",
                        ParamBinding::Value(ControlValue::Vec2([
                            self.start_angle,
                            self.angular_velocity,
                        ])),
                    ),
                ],
            )?;
            target.set_shader_function(name, &escape::expand(SIMILARITY_GLSL, name)?);
        }
        Ok(())
    }
}

/// Motion across the field: start outside one edge, finish outside the
/// opposite one, and size the sequence duration to the trip.
#[derive(Debug, Clone)]
pub struct Crossing {
    /// Speed along the path [um/s].
    pub velocity: f64,
    pub direction: DirectionSpec,
    /// Signed distance of the path from the origin, positive left [um].
    pub offset_um: f64,
    /// Margin outside the field edges where travel starts and ends [um].
    pub shape_length_um: f64,
    /// Total distance travelled; zero means span the whole field [um].
    pub travel_length_um: f64,
    /// Grow the sequence duration to cover the crossing.
    pub extend_duration: bool,
}

impl Default for Crossing {
    fn default() -> Self {
        Crossing {
            velocity: 100.0,
            direction: "east".into(),
            offset_um: 0.0,
            shape_length_um: 50.0,
            travel_length_um: 0.0,
            extend_duration: true,
        }
    }
}

impl Crossing {
    fn apply(&self, target: &mut dyn ShaderTarget, name: &str, at: &SourceLocation) -> Result<()> {
        if self.velocity <= 0.0 {
            bail!("{at}: crossing velocity must be positive, got {}", self.velocity);
        }
        let angle = direction::process_direction(&self.direction, &at.child("direction"))?;
        let (s, c) = angle.sin_cos();
        let travel = if self.travel_length_um == 0.0 {
            let seq = target.sequence();
            (seq.field_width_um * c).abs() + (seq.field_height_um * s).abs() + self.shape_length_um
        } else {
            self.travel_length_um
        };
        let frames =
            (travel / self.velocity / target.sequence().frame_interval_s + 1.0) as u32;
        if self.extend_duration {
            let frames = frames.max(target.duration_frames());
            target.set_duration_frames(frames);
        }
        target.set_shader_vector(
            &format!("{name}_startPosition"),
            -travel * 0.5 * c - self.offset_um * s,
            -travel * 0.5 * s + self.offset_um * c,
        );
        target.set_shader_vector(
            &format!("{name}_velocity"),
            self.velocity * c,
            self.velocity * s,
        );
        target.set_shader_function(name, &escape::expand(TRANSLATION_GLSL, name)?);
        Ok(())
    }
}

/// Stepwise motion: hold each position for a fixed timestep, then jump.
#[derive(Debug, Clone)]
pub struct DiscreteLinear {
    /// How long each position is held [s].
    pub timestep_s: f64,
    /// Displacement per step [um].
    pub jump: [f64; 2],
    pub start_position: StartPosition,
}

impl Default for DiscreteLinear {
    fn default() -> Self {
        DiscreteLinear {
            timestep_s: 1.0,
            jump: [50.0, 0.0],
            start_position: StartPosition::default(),
        }
    }
}

impl DiscreteLinear {
    fn apply(
        &self,
        target: &mut dyn ShaderTarget,
        ctx: &mut BootContext,
        name: &str,
        at: &SourceLocation,
    ) -> Result<()> {
        if self.timestep_s <= 0.0 {
            bail!("{at}: timestep must be positive, got {}", self.timestep_s);
        }
        let start = self
            .start_position
            .binding(target, &at.child("startPosition"))?;
        ctx.register_controls(
            target,
            &format!("{name}_"),
            at,
            vec![
                ("startPosition", start),
                ("jump", ParamBinding::Value(ControlValue::Vec2(self.jump))),
                (
                    "tstep",
                    ParamBinding::Value(ControlValue::Scalar(self.timestep_s)),
                ),
            ],
        )?;
        target.set_shader_function(name, &escape::expand(DISCRETE_GLSL, name)?);
        Ok(())
    }
}

/// A motion component assigned to one pose slot of a composition.
#[derive(Debug, Clone)]
pub enum Motion {
    /// Hold the pattern still.
    Still,
    Linear(Linear),
    Crossing(Crossing),
    DiscreteLinear(DiscreteLinear),
}

impl Default for Motion {
    fn default() -> Self {
        Motion::Still
    }
}

impl Motion {
    pub fn apply(
        &self,
        target: &mut dyn ShaderTarget,
        ctx: &mut BootContext,
        name: &str,
        at: &SourceLocation,
    ) -> Result<()> {
        match self {
            Motion::Still => Linear::default().apply(target, ctx, name, at),
            Motion::Linear(motion) => motion.apply(target, ctx, name, at),
            Motion::Crossing(motion) => motion.apply(target, name, at),
            Motion::DiscreteLinear(motion) => motion.apply(target, ctx, name, at),
        }
    }
}

impl From<Linear> for Motion {
    fn from(motion: Linear) -> Motion {
        Motion::Linear(motion)
    }
}

impl From<Crossing> for Motion {
    fn from(motion: Crossing) -> Motion {
        Motion::Crossing(motion)
    }
}

impl From<DiscreteLinear> for Motion {
    fn from(motion: DiscreteLinear) -> Motion {
        Motion::DiscreteLinear(motion)
    }
}
