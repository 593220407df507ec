//! Modulation components: functions from time to an rgb intensity factor,
//! `vec3 f(float time)` on the shader side.

use anyhow::{bail, Result};

use crate::binding::{BootContext, ColorParam, ScalarParam};
use crate::escape;
use crate::target::ShaderTarget;
use crate::types::SourceLocation;

/// How the intensity of a linear modulation moves over the sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IntensitySlope {
    /// Stay at the base intensity.
    Hold,
    /// Ramp from full to zero over the sequence duration.
    Down,
    /// Ramp from zero to full over the sequence duration.
    Up,
    /// An explicit rate [1/s].
    PerSecond(f64),
}

const LINEAR_GLSL: &str = "\
vec3 @<X>@(float time){ return mix(@<X>@_darkColor, @<X>@_brightColor, @<X>@_intensityLinearFactors.x + time * @<X>@_intensityLinearFactors.y); }
";

/// Intensity changing linearly between two colors.
#[derive(Debug, Clone)]
pub struct Linear {
    pub bright_color: ColorParam,
    pub dark_color: ColorParam,
    /// Base intensity in [0,1]; defaults to whatever the slope implies.
    pub intensity: Option<f64>,
    pub slope: IntensitySlope,
}

impl Default for Linear {
    fn default() -> Self {
        Linear {
            bright_color: "white".into(),
            dark_color: "black".into(),
            intensity: None,
            slope: IntensitySlope::Hold,
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
        let (bright, non_grey_bright) =
            self.bright_color.binding(ctx.controls, &at.child("brightColor"))?;
        let (dark, non_grey_dark) =
            self.dark_color.binding(ctx.controls, &at.child("darkColor"))?;
        if non_grey_bright || non_grey_dark {
            target.enable_color_mode();
        }
        ctx.register_controls(
            target,
            &format!("{name}_"),
            at,
            vec![("brightColor", bright), ("darkColor", dark)],
        )?;
        let duration_s = target.duration_s();
        let (slope, default_base) = match self.slope {
            IntensitySlope::Hold => (0.0, 1.0),
            IntensitySlope::Down => {
                if duration_s <= 0.0 {
                    bail!("{at}: a ramp needs a positive sequence duration");
                }
                (-1.0 / duration_s, 1.0)
            }
            IntensitySlope::Up => {
                if duration_s <= 0.0 {
                    bail!("{at}: a ramp needs a positive sequence duration");
                }
                (1.0 / duration_s, 0.0)
            }
            IntensitySlope::PerSecond(rate) => (rate, 1.0),
        };
        let base = self.intensity.unwrap_or(default_base);
        target.set_shader_vector(&format!("{name}_intensityLinearFactors"), base, slope);
        target.set_shader_function(name, &escape::expand(LINEAR_GLSL, name)?);
        Ok(())
    }
}

const COSINE_GLSL: &str = "\
vec3 @<X>@(float time){
    float t = time / `duration_s;
    float q = log(-`wavelength.x * t + `wavelength.x + `wavelength.y * t) / (`wavelength.x + `wavelength.y);
    q -= log(`wavelength.x) / (`wavelength.x + `wavelength.y);
    if (abs(`wavelength.x - `wavelength.y) < 0.000001) {
        q = time / `wavelength.x / `duration_s;
    }
    float currentAmplitude = `amplitude.x + time * `amplitude.y;
    float s = cos(q * 6.283185307179586476925286766559 + `phase);
    if (s < 0.0) {
        s = -pow(-s, `exponent);
    } else {
        s = pow(s, `exponent);
    }
    return mix(`darkColor, `brightColor, -s * currentAmplitude + `offset);
}
";

const COSINE_CHIRP_GLSL: &str = "\
vec3 @<X>@(float time){
    float t = time / `duration_s;
    float q = log(-`wavelength.x * t + `wavelength.x + `wavelength.y * t) / (`wavelength.x + `wavelength.y);
    q -= log(`wavelength.x) / (`wavelength.x + `wavelength.y);
    if (abs(`wavelength.x - `wavelength.y) < 0.000001) {
        q = time / `wavelength.x / `duration_s;
    }
    float currentAmplitude = `amplitude.x + time * `amplitude.y;
    float s = cos(q * q * 6.283185307179586476925286766559 * 0.5 + `phase);
    if (s < 0.0) {
        s = -pow(-s, `exponent);
    } else {
        s = pow(s, `exponent);
    }
    return mix(`darkColor, `brightColor, -s * currentAmplitude + `offset);
}
";

/// Sinusoidal intensity, optionally sweeping its wavelength over the
/// sequence. Starts at the minimum: the cosine is subtracted from the base.
#[derive(Debug, Clone)]
pub struct Cosine {
    pub bright_color: ColorParam,
    pub dark_color: ColorParam,
    /// Base intensity before modulation.
    pub intensity: ScalarParam,
    /// Starting wavelength [s].
    pub wavelength_s: f64,
    /// Ending wavelength [s]; the wavelength is swept when set.
    pub end_wavelength_s: Option<f64>,
    /// Cosine exponent; 1 for a cosine, small values approach a square wave.
    pub exponent: ScalarParam,
    /// Phase shift [rad].
    pub phase: ScalarParam,
    pub amplitude: f64,
    /// Ending amplitude; interpolated linearly over the sequence when set.
    pub end_amplitude: Option<f64>,
    /// Sweep frequency linearly instead of wavelength.
    pub linear_frequency_change: bool,
}

impl Default for Cosine {
    fn default() -> Self {
        Cosine {
            bright_color: "white".into(),
            dark_color: "black".into(),
            intensity: 0.5.into(),
            wavelength_s: 1.0,
            end_wavelength_s: None,
            exponent: 1.0.into(),
            phase: 0.0.into(),
            amplitude: 0.5,
            end_amplitude: None,
            linear_frequency_change: false,
        }
    }
}

impl Cosine {
    fn apply(
        &self,
        target: &mut dyn ShaderTarget,
        ctx: &mut BootContext,
        name: &str,
        at: &SourceLocation,
    ) -> Result<()> {
        if self.wavelength_s <= 0.0 {
            bail!(
                "{at}: wavelength must be positive, got {}",
                self.wavelength_s
            );
        }
        let (bright, non_grey_bright) =
            self.bright_color.binding(ctx.controls, &at.child("brightColor"))?;
        let (dark, non_grey_dark) =
            self.dark_color.binding(ctx.controls, &at.child("darkColor"))?;
        if non_grey_bright || non_grey_dark {
            target.enable_color_mode();
        }
        let duration_s = target.duration_s();
        if duration_s <= 0.0 {
            bail!("{at}: cosine modulation needs a positive sequence duration");
        }
        target.set_shader_variable(&format!("{name}_duration_s"), duration_s);
        ctx.register_controls(
            target,
            &format!("{name}_"),
            at,
            vec![
                ("exponent", self.exponent.binding()),
                ("offset", self.intensity.binding()),
                ("phase", self.phase.binding()),
                ("brightColor", bright),
                ("darkColor", dark),
            ],
        )?;
        let wavelength = self.wavelength_s / duration_s;
        let end_wavelength = match self.end_wavelength_s {
            Some(end) if end > 0.0 => end / duration_s,
            _ => wavelength,
        };
        target.set_shader_vector(&format!("{name}_wavelength"), wavelength, end_wavelength);
        let amplitude_slope = match self.end_amplitude {
            Some(end) => (end - self.amplitude) / duration_s,
            None => 0.0,
        };
        target.set_shader_vector(&format!("{name}_amplitude"), self.amplitude, amplitude_slope);
        let template = if self.linear_frequency_change {
            COSINE_CHIRP_GLSL
        } else {
            COSINE_GLSL
        };
        target.set_shader_function(name, &escape::expand(template, name)?);
        Ok(())
    }
}

/// A modulation component assigned to the modulator slot of a composition.
#[derive(Debug, Clone)]
pub enum Modulation {
    Linear(Linear),
    Cosine(Cosine),
}

impl Default for Modulation {
    fn default() -> Self {
        Modulation::Linear(Linear::default())
    }
}

impl Modulation {
    pub fn apply(
        &self,
        target: &mut dyn ShaderTarget,
        ctx: &mut BootContext,
        name: &str,
        at: &SourceLocation,
    ) -> Result<()> {
        match self {
            Modulation::Linear(modulation) => modulation.apply(target, ctx, name, at),
            Modulation::Cosine(modulation) => modulation.apply(target, ctx, name, at),
        }
    }
}

impl From<Linear> for Modulation {
    fn from(modulation: Linear) -> Modulation {
        Modulation::Linear(modulation)
    }
}

impl From<Cosine> for Modulation {
    fn from(modulation: Cosine) -> Modulation {
        Modulation::Cosine(modulation)
    }
}
