//! Pattern-in-field components: functions from screen position and time to
//! an rgb value, `vec3 f(vec2 x, float time)` on the shader side.
//!
//! Position is measured in micrometers on the retina with the origin at the
//! field center. Leaves emit a self-contained function; composites apply
//! their children under suffixed names first and then emit a function that
//! calls them.

use anyhow::{Context, Result};

use crate::binding::{BootContext, ColorParam, DirectionParam, ElementBinding, ParamBinding, ScalarParam};
use crate::component::{compose, Modulation, Motion, Stage, TimeWarp, Warp};
use crate::direction::{self, DirectionSpec};
use crate::escape;
use crate::target::ShaderTarget;
use crate::types::SourceLocation;

/// A single flat color.
#[derive(Debug, Clone)]
pub struct Solid {
    pub color: ColorParam,
}

impl Default for Solid {
    fn default() -> Self {
        Solid {
            color: "white".into(),
        }
    }
}

const SOLID_GLSL: &str = "\
vec3 @<X>@ (vec2 x, float time){
    return `color;
}
";

impl Solid {
    fn apply(
        &self,
        target: &mut dyn ShaderTarget,
        ctx: &mut BootContext,
        name: &str,
        at: &SourceLocation,
    ) -> Result<()> {
        let (color, non_grey) = self.color.binding(ctx.controls, &at.child("color"))?;
        if non_grey {
            target.enable_color_mode();
        }
        ctx.register_controls(target, &format!("{name}_"), at, vec![("color", color)])?;
        target.set_shader_function(name, &escape::expand(SOLID_GLSL, name)?);
        Ok(())
    }
}

/// A sinusoidal grating between two colors.
#[derive(Debug, Clone)]
pub struct SineGrating {
    pub color1: ColorParam,
    pub color2: ColorParam,
    pub direction: DirectionParam,
    /// Distance between wave crests [um].
    pub wavelength_um: ScalarParam,
}

impl Default for SineGrating {
    fn default() -> Self {
        SineGrating {
            color1: "white".into(),
            color2: "black".into(),
            direction: "east".into(),
            wavelength_um: 100.0.into(),
        }
    }
}

const SINE_GRATING_GLSL: &str = "\
vec3 @<X>@ (vec2 x, float time){
    float t = dot(x, `span);
    return mix(`color1, `color2, 0.5 - 0.5 * cos(t / `sineGratingWavelength * 6.283185307179586476925286766559));
}
";

impl SineGrating {
    fn apply(
        &self,
        target: &mut dyn ShaderTarget,
        ctx: &mut BootContext,
        name: &str,
        at: &SourceLocation,
    ) -> Result<()> {
        let (color1, non_grey1) = self.color1.binding(ctx.controls, &at.child("color1"))?;
        let (color2, non_grey2) = self.color2.binding(ctx.controls, &at.child("color2"))?;
        if non_grey1 || non_grey2 {
            target.enable_color_mode();
        }
        ctx.register_controls(
            target,
            &format!("{name}_"),
            at,
            vec![
                ("color1", color1),
                ("color2", color2),
                ("sineGratingWavelength", self.wavelength_um.binding()),
                ("span", self.direction.span_binding(&at.child("direction"))?),
            ],
        )?;
        target.set_shader_function(name, &escape::expand(SINE_GRATING_GLSL, name)?);
        Ok(())
    }
}

/// One end of a gradient ramp.
#[derive(Debug, Clone)]
pub enum GradientEnd {
    /// Signed distance from the field center along the gradient direction.
    Um(ScalarParam),
    /// Snap to the field edge (or corner) along the gradient direction.
    Edge,
}

impl From<f64> for GradientEnd {
    fn from(um: f64) -> Self {
        GradientEnd::Um(um.into())
    }
}

impl From<crate::controls::ControlId> for GradientEnd {
    fn from(id: crate::controls::ControlId) -> Self {
        GradientEnd::Um(id.into())
    }
}

/// A linear ramp between two colors.
#[derive(Debug, Clone)]
pub struct Gradient {
    pub color1: ColorParam,
    pub color2: ColorParam,
    pub direction: DirectionParam,
    pub start: GradientEnd,
    pub end: GradientEnd,
}

impl Default for Gradient {
    fn default() -> Self {
        Gradient {
            color1: "white".into(),
            color2: "black".into(),
            direction: "east".into(),
            start: GradientEnd::Edge,
            end: GradientEnd::Edge,
        }
    }
}

const GRADIENT_GLSL: &str = "\
vec3 @<X>@(vec2 x, float time){
    float t = dot(x, @<X>@_span);
    t = clamp((t - @<X>@_gradientEnds.x) / (@<X>@_gradientEnds.y - @<X>@_gradientEnds.x), 0.0, 1.0);
    return mix(@<X>@_color1, @<X>@_color2, t);
}
";

impl Gradient {
    fn apply(
        &self,
        target: &mut dyn ShaderTarget,
        ctx: &mut BootContext,
        name: &str,
        at: &SourceLocation,
    ) -> Result<()> {
        let (color1, non_grey1) = self.color1.binding(ctx.controls, &at.child("color1"))?;
        let (color2, non_grey2) = self.color2.binding(ctx.controls, &at.child("color2"))?;
        if non_grey1 || non_grey2 {
            target.enable_color_mode();
        }
        // The ramp spans the field projection onto the initial direction;
        // 'edge' ends stay fixed even when a control later turns the span.
        let angle = self.direction.angle(ctx.controls, &at.child("direction"))?;
        let pattern_length = {
            let seq = target.sequence();
            (seq.field_width_um * angle.cos()).abs() + (seq.field_height_um * angle.sin()).abs()
        };
        let start = match &self.start {
            GradientEnd::Um(p) => p.element(),
            GradientEnd::Edge => ElementBinding::Literal(-pattern_length / 2.0),
        };
        let end = match &self.end {
            GradientEnd::Um(p) => p.element(),
            GradientEnd::Edge => ElementBinding::Literal(pattern_length / 2.0),
        };
        ctx.register_controls(
            target,
            &format!("{name}_"),
            at,
            vec![
                ("span", self.direction.span_binding(&at.child("direction"))?),
                ("color1", color1),
                ("color2", color2),
                ("gradientEnds", ParamBinding::Elements(vec![start, end])),
            ],
        )?;
        target.set_shader_function(name, &escape::expand(GRADIENT_GLSL, name)?);
        Ok(())
    }
}

/// A rectangle mask, optionally repeated on a grid.
#[derive(Debug, Clone)]
pub struct Rect {
    /// Width and height of the rectangle [um].
    pub size_um: [f64; 2],
    pub facing: DirectionSpec,
    /// Distance between repeated instances along the width axis [um].
    pub follow_distance_um: f64,
    /// Distance between repeated instances along the height axis [um].
    pub wingmen_distance_um: f64,
    /// Antialiasing filter size [um].
    pub filter_radius_um: f64,
}

impl Default for Rect {
    fn default() -> Self {
        Rect {
            size_um: [200.0, 200.0],
            facing: "east".into(),
            follow_distance_um: 100_000_000.0,
            wingmen_distance_um: 100_000_000.0,
            filter_radius_um: 0.1,
        }
    }
}

const RECT_GLSL: &str = "\
vec3 @<X>@ (vec2 x, float time){
    vec2 rotatedX = vec2(x.x * `facing.x + x.y * `facing.y, x.x * `facing.y - x.y * `facing.x);
    rotatedX = mod(rotatedX + `repetitionDistance * 0.5, `repetitionDistance) - `repetitionDistance * 0.5;
    float xDiff = abs(rotatedX.x) - `rect.x * 0.5;
    float yDiff = abs(rotatedX.y) - `rect.y * 0.5;
    float inOrOut = (1.0 - smoothstep(-`filterRadius, `filterRadius, xDiff)) * (1.0 - smoothstep(-`filterRadius, `filterRadius, yDiff));
    return vec3(inOrOut, inOrOut, inOrOut);
}
";

impl Rect {
    fn apply(&self, target: &mut dyn ShaderTarget, name: &str, at: &SourceLocation) -> Result<()> {
        let facing = direction::process_direction(&self.facing, &at.child("facing"))?;
        let (s, c) = facing.sin_cos();
        target.set_shader_vector(&format!("{name}_rect"), self.size_um[0], self.size_um[1]);
        target.set_shader_vector(&format!("{name}_facing"), c, s);
        target.set_shader_vector(
            &format!("{name}_repetitionDistance"),
            self.follow_distance_um,
            self.wingmen_distance_um,
        );
        target.set_shader_variable(&format!("{name}_filterRadius"), self.filter_radius_um);
        target.set_shader_function(name, &escape::expand(RECT_GLSL, name)?);
        Ok(())
    }
}

/// A disc or annulus mask centered on the origin.
#[derive(Debug, Clone)]
pub struct Spot {
    pub radius_um: ScalarParam,
    /// Annulus hole radius [um]; negative for a solid disc.
    pub inner_radius_um: ScalarParam,
    /// Antialiasing filter size [um].
    pub filter_radius_um: f64,
}

impl Default for Spot {
    fn default() -> Self {
        Spot {
            radius_um: 200.0.into(),
            inner_radius_um: (-1000.0).into(),
            filter_radius_um: 0.1,
        }
    }
}

const SPOT_GLSL: &str = "\
vec3 @<X>@ (vec2 x, float time){
    float dist = length(x);
    float inOrOut = (1.0 - smoothstep(-`filterRadius, `filterRadius, dist - `spotRadius.x)) * (1.0 - smoothstep(-`filterRadius, `filterRadius, `spotRadius.y - dist));
    return vec3(inOrOut, inOrOut, inOrOut);
}
";

impl Spot {
    fn apply(
        &self,
        target: &mut dyn ShaderTarget,
        ctx: &mut BootContext,
        name: &str,
        at: &SourceLocation,
    ) -> Result<()> {
        target.set_shader_variable(&format!("{name}_filterRadius"), self.filter_radius_um);
        ctx.register_controls(
            target,
            &format!("{name}_"),
            at,
            vec![(
                "spotRadius",
                ParamBinding::Elements(vec![
                    self.radius_um.element(),
                    self.inner_radius_um.element(),
                ]),
            )],
        )?;
        target.set_shader_function(name, &escape::expand(SPOT_GLSL, name)?);
        Ok(())
    }
}

/// A still image stretched over the field.
#[derive(Debug, Clone)]
pub struct Image {
    pub image_path: String,
}

impl Image {
    pub fn new(image_path: impl Into<String>) -> Self {
        Image {
            image_path: image_path.into(),
        }
    }
}

const IMAGE_GLSL: &str = "\
vec3 @<X>@ (vec2 x, float time){
    vec2 uv = x / patternSizeOnRetina + vec2(0.5, 0.5);
    return texture(`image, uv).rgb;
}
";

impl Image {
    fn apply(&self, target: &mut dyn ShaderTarget, name: &str, at: &SourceLocation) -> Result<()> {
        // Probe the header now so a bad path fails at boot with the author's
        // location instead of at GPU upload.
        image::image_dimensions(&self.image_path)
            .with_context(|| format!("{at}: cannot read image '{}'", self.image_path))?;
        target.enable_color_mode();
        target.set_shader_image(&format!("{name}_image"), &self.image_path);
        target.set_shader_function(name, &escape::expand(IMAGE_GLSL, name)?);
        Ok(())
    }
}

const MIX_GLSL: &str = "\
vec3 @<X>@ (vec2 x, float time){
    return mix(`background(x, time), `foreground(x, time), `shape(x, time));
}
";

const ADD_GLSL: &str = "\
vec3 @<X>@ (vec2 x, float time){
    return `op1(x, time) + `op2(x, time);
}
";

const SUB_GLSL: &str = "\
vec3 @<X>@ (vec2 x, float time){
    return `op1(x, time) - `op2(x, time);
}
";

const MUL_GLSL: &str = "\
vec3 @<X>@ (vec2 x, float time){
    return `op1(x, time) * `op2(x, time);
}
";

const MOVE_GLSL: &str = "\
vec3 @<X>@ (vec2 x, float time){
    return `moved(`pose(time) * vec3(x, 1.0), time);
}
";

const WARPED_GLSL: &str = "\
vec3 @<X>@ (vec2 x, float time){
    return `warped(`warp(x), time);
}
";

const MODULATE_GLSL: &str = "\
vec3 @<X>@ (vec2 x, float time){
    return `modulated(x, time) * `modulator(time);
}
";

const TIME_WARPED_GLSL: &str = "\
vec3 @<X>@ (vec2 x, float time){
    return `warped(x, `warp(time));
}
";

/// A pattern-in-field node: a leaf primitive or a composite over child pifs.
#[derive(Debug, Clone)]
pub enum Pif {
    Solid(Solid),
    SineGrating(SineGrating),
    Gradient(Gradient),
    Rect(Rect),
    Spot(Spot),
    Image(Image),
    /// Blend `background` into `foreground` by the `shape` mask.
    Mix {
        shape: Box<Pif>,
        foreground: Box<Pif>,
        background: Box<Pif>,
    },
    Add {
        op1: Box<Pif>,
        op2: Box<Pif>,
    },
    Sub {
        op1: Box<Pif>,
        op2: Box<Pif>,
    },
    Mul {
        op1: Box<Pif>,
        op2: Box<Pif>,
    },
    /// Sample `moved` through a time-dependent similarity transform.
    Move {
        moved: Box<Pif>,
        pose: Motion,
    },
    /// Sample `warped` through a spatial distortion.
    Warped {
        warped: Box<Pif>,
        warp: Warp,
    },
    /// Scale `modulated` by a time-dependent intensity.
    Modulate {
        modulated: Box<Pif>,
        modulator: Modulation,
    },
    /// Sample `warped` on a remapped clock.
    TimeWarped {
        warped: Box<Pif>,
        warp: TimeWarp,
    },
}

impl Pif {
    /// Use `self` as the mask blending `foreground` over `background`.
    pub fn mix(self, foreground: impl Into<Pif>, background: impl Into<Pif>) -> Pif {
        Pif::Mix {
            shape: Box::new(self),
            foreground: Box::new(foreground.into()),
            background: Box::new(background.into()),
        }
    }

    pub fn moved(self, pose: Motion) -> Pif {
        Pif::Move {
            moved: Box::new(self),
            pose,
        }
    }

    pub fn warped(self, warp: Warp) -> Pif {
        Pif::Warped {
            warped: Box::new(self),
            warp,
        }
    }

    pub fn modulated(self, modulator: Modulation) -> Pif {
        Pif::Modulate {
            modulated: Box::new(self),
            modulator,
        }
    }

    pub fn time_warped(self, warp: TimeWarp) -> Pif {
        Pif::TimeWarped {
            warped: Box::new(self),
            warp,
        }
    }

    /// Emit this node and its children into `target` under `name`.
    ///
    /// Children are applied before the parent function is set, so the
    /// emitted program defines every function before its first caller.
    pub fn apply(
        &self,
        target: &mut dyn ShaderTarget,
        ctx: &mut BootContext,
        name: &str,
        at: &SourceLocation,
    ) -> Result<()> {
        match self {
            Pif::Solid(leaf) => leaf.apply(target, ctx, name, at),
            Pif::SineGrating(leaf) => leaf.apply(target, ctx, name, at),
            Pif::Gradient(leaf) => leaf.apply(target, ctx, name, at),
            Pif::Rect(leaf) => leaf.apply(target, name, at),
            Pif::Spot(leaf) => leaf.apply(target, ctx, name, at),
            Pif::Image(leaf) => leaf.apply(target, name, at),
            Pif::Mix {
                shape,
                foreground,
                background,
            } => {
                shape.apply(target, ctx, &compose(name, Stage::Shape), &at.child("shape"))?;
                foreground.apply(
                    target,
                    ctx,
                    &compose(name, Stage::Foreground),
                    &at.child("foreground"),
                )?;
                background.apply(
                    target,
                    ctx,
                    &compose(name, Stage::Background),
                    &at.child("background"),
                )?;
                target.set_shader_function(name, &escape::expand(MIX_GLSL, name)?);
                Ok(())
            }
            Pif::Add { op1, op2 } => {
                op1.apply(target, ctx, &compose(name, Stage::Op1), &at.child("op1"))?;
                op2.apply(target, ctx, &compose(name, Stage::Op2), &at.child("op2"))?;
                target.set_shader_function(name, &escape::expand(ADD_GLSL, name)?);
                Ok(())
            }
            Pif::Sub { op1, op2 } => {
                op1.apply(target, ctx, &compose(name, Stage::Op1), &at.child("op1"))?;
                op2.apply(target, ctx, &compose(name, Stage::Op2), &at.child("op2"))?;
                target.set_shader_function(name, &escape::expand(SUB_GLSL, name)?);
                Ok(())
            }
            Pif::Mul { op1, op2 } => {
                op1.apply(target, ctx, &compose(name, Stage::Op1), &at.child("op1"))?;
                op2.apply(target, ctx, &compose(name, Stage::Op2), &at.child("op2"))?;
                target.set_shader_function(name, &escape::expand(MUL_GLSL, name)?);
                Ok(())
            }
            Pif::Move { moved, pose } => {
                moved.apply(target, ctx, &compose(name, Stage::Moved), &at.child("moved"))?;
                pose.apply(target, ctx, &compose(name, Stage::Pose), &at.child("motion"))?;
                target.set_shader_function(name, &escape::expand(MOVE_GLSL, name)?);
                Ok(())
            }
            Pif::Warped { warped, warp } => {
                warped.apply(
                    target,
                    ctx,
                    &compose(name, Stage::Warped),
                    &at.child("warped"),
                )?;
                warp.apply(target, &compose(name, Stage::Warp))?;
                target.set_shader_function(name, &escape::expand(WARPED_GLSL, name)?);
                Ok(())
            }
            Pif::Modulate {
                modulated,
                modulator,
            } => {
                modulated.apply(
                    target,
                    ctx,
                    &compose(name, Stage::Modulated),
                    &at.child("modulated"),
                )?;
                modulator.apply(
                    target,
                    ctx,
                    &compose(name, Stage::Modulator),
                    &at.child("modulation"),
                )?;
                target.set_shader_function(name, &escape::expand(MODULATE_GLSL, name)?);
                Ok(())
            }
            Pif::TimeWarped { warped, warp } => {
                warped.apply(
                    target,
                    ctx,
                    &compose(name, Stage::Warped),
                    &at.child("warped"),
                )?;
                warp.apply(target, &compose(name, Stage::Warp), &at.child("timeWarp"))?;
                target.set_shader_function(name, &escape::expand(TIME_WARPED_GLSL, name)?);
                Ok(())
            }
        }
    }
}

impl From<Solid> for Pif {
    fn from(leaf: Solid) -> Pif {
        Pif::Solid(leaf)
    }
}

impl From<SineGrating> for Pif {
    fn from(leaf: SineGrating) -> Pif {
        Pif::SineGrating(leaf)
    }
}

impl From<Gradient> for Pif {
    fn from(leaf: Gradient) -> Pif {
        Pif::Gradient(leaf)
    }
}

impl From<Rect> for Pif {
    fn from(leaf: Rect) -> Pif {
        Pif::Rect(leaf)
    }
}

impl From<Spot> for Pif {
    fn from(leaf: Spot) -> Pif {
        Pif::Spot(leaf)
    }
}

impl From<Image> for Pif {
    fn from(leaf: Image) -> Pif {
        Pif::Image(leaf)
    }
}

impl std::ops::Add for Pif {
    type Output = Pif;

    fn add(self, rhs: Pif) -> Pif {
        Pif::Add {
            op1: Box::new(self),
            op2: Box::new(rhs),
        }
    }
}

impl std::ops::Sub for Pif {
    type Output = Pif;

    fn sub(self, rhs: Pif) -> Pif {
        Pif::Sub {
            op1: Box::new(self),
            op2: Box::new(rhs),
        }
    }
}

impl std::ops::Mul for Pif {
    type Output = Pif;

    fn mul(self, rhs: Pif) -> Pif {
        Pif::Mul {
            op1: Box::new(self),
            op2: Box::new(rhs),
        }
    }
}
