//! JSON stimulus documents.
//!
//! A document names a stimulus, optionally overrides the sequence geometry,
//! declares interactive controls, and describes the pass as a tree of
//! components. Every component is an object with a `kind` tag and its
//! parameters; a parameter that a control feeds is written as
//! `{"control": "<label>"}` referencing a declared control by label.
//! Parameter keys follow the authoring surface of the sequence scripts:
//! lower camel case with `_um`/`_s` unit suffixes where a unit applies.

use std::collections::HashMap;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::binding::{ColorParam, DirectionParam, ScalarParam};
use crate::color::{self, ColorSpec};
use crate::component::modulation::{self, Cosine, IntensitySlope};
use crate::component::motion::{self, Crossing, DiscreteLinear, StartPosition};
use crate::component::pif::{Gradient, GradientEnd, Image, Rect, SineGrating, Solid, Spot};
use crate::component::warp::OnElectrodes;
use crate::component::{Modulation, Motion, Pif, TimeWarp, Warp};
use crate::controls::{ControlId, ControlSet};
use crate::direction::{self, DirectionSpec};
use crate::stimulus::{Duration, Generic, SingleShape, Stimulus};
use crate::types::{SequenceInfo, SourceLocation};

/// A full stimulus description.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StimulusDSL {
    pub name: String,
    /// Playback length in frames. Exclusive with `duration_s`.
    #[serde(default)]
    pub duration: Option<u32>,
    /// Playback length in seconds, rounded up to whole frames. Exclusive
    /// with `duration`.
    #[serde(default)]
    pub duration_s: Option<f64>,
    #[serde(default)]
    pub sequence: SequenceInfo,
    #[serde(default)]
    pub controls: Vec<ControlDSL>,
    pub pass: ComponentDSL,
}

/// One component in a document: a kind tag plus its parameters. Parameters
/// that are themselves components stay as raw JSON here and are decoded
/// while the tree is built.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ComponentDSL {
    pub kind: String,
    #[serde(flatten)]
    pub params: HashMap<String, serde_json::Value>,
}

/// An interactive control declaration. Defaults mirror the authoring
/// surface: wheels run 0..1 from 1 on key 'X', pickers start white on 'C'.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(tag = "kind")]
pub enum ControlDSL {
    #[serde(rename = "wheel")]
    Wheel {
        #[serde(default = "default_label")]
        label: String,
        #[serde(default = "default_key")]
        key: char,
        #[serde(default = "default_wheel_initial", rename = "initialValue")]
        initial_value: f64,
        #[serde(default)]
        minimum: f64,
        #[serde(default = "default_wheel_maximum")]
        maximum: f64,
        #[serde(default)]
        step: f64,
    },
    #[serde(rename = "directionWheel")]
    DirectionWheel {
        #[serde(default = "default_label")]
        label: String,
        #[serde(default = "default_key")]
        key: char,
        #[serde(default = "default_direction_initial", rename = "initialValue")]
        initial_value: DirectionSpec,
        #[serde(default)]
        minimum: f64,
        #[serde(default = "default_wheel_maximum")]
        maximum: f64,
        #[serde(default)]
        step: f64,
    },
    #[serde(rename = "mouseMotion")]
    MouseMotion {
        #[serde(default = "default_label")]
        label: String,
        #[serde(default = "default_key")]
        key: char,
        #[serde(default = "default_motion_initial", rename = "initialValue")]
        initial_value: [f64; 2],
        #[serde(default)]
        minimum: [f64; 2],
        #[serde(default = "default_motion_maximum")]
        maximum: [f64; 2],
    },
    #[serde(rename = "colorPicker")]
    ColorPicker {
        #[serde(default = "default_label")]
        label: String,
        #[serde(default = "default_picker_key")]
        key: char,
        #[serde(default = "default_picker_initial", rename = "initialValue")]
        initial_value: ColorSpec,
    },
}

fn default_label() -> String {
    "Interactive setting".to_string()
}

fn default_key() -> char {
    'X'
}

fn default_picker_key() -> char {
    'C'
}

fn default_wheel_initial() -> f64 {
    1.0
}

fn default_wheel_maximum() -> f64 {
    1.0
}

fn default_direction_initial() -> DirectionSpec {
    DirectionSpec::Radians(1.0)
}

fn default_motion_initial() -> [f64; 2] {
    [100.0, 100.0]
}

fn default_motion_maximum() -> [f64; 2] {
    [1000.0, 1000.0]
}

fn default_picker_initial() -> ColorSpec {
    ColorSpec::Name("white".to_string())
}

pub fn load_stimulus_from_path(path: impl AsRef<std::path::Path>) -> Result<StimulusDSL> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read stimulus json at {}", path.display()))?;
    serde_json::from_str(&text).context("failed to parse stimulus json")
}

/// Build the document's controls and component tree and boot the stimulus.
pub fn boot_document(doc: &StimulusDSL) -> Result<Stimulus> {
    let (controls, labels) = build_controls(doc)?;
    let duration = build_duration(doc)?;
    let at = SourceLocation::new("pass");
    let p = Params::new(&doc.pass.params, &at, &labels);
    match doc.pass.kind.as_str() {
        "singleShape" => {
            p.expect_keys(
                "singleShape",
                &[
                    "shape",
                    "shapeMotion",
                    "pattern",
                    "patternMotion",
                    "background",
                    "backgroundMotion",
                    "modulation",
                    "warp",
                ],
            )?;
            let mut pass = SingleShape {
                name: doc.name.clone(),
                duration,
                ..SingleShape::default()
            };
            if let Some(desc) = p.component("shape")? {
                pass.shape = build_pif(&desc, &labels, &at.child("shape"))?;
            }
            if let Some(desc) = p.component("shapeMotion")? {
                pass.shape_motion = build_motion(&desc, &labels, &at.child("shapeMotion"))?;
            }
            if let Some(desc) = p.component("pattern")? {
                pass.pattern = build_pif(&desc, &labels, &at.child("pattern"))?;
            }
            if let Some(desc) = p.component("patternMotion")? {
                pass.pattern_motion = build_motion(&desc, &labels, &at.child("patternMotion"))?;
            }
            if let Some(desc) = p.component("background")? {
                pass.background = build_pif(&desc, &labels, &at.child("background"))?;
            }
            if let Some(desc) = p.component("backgroundMotion")? {
                pass.background_motion =
                    build_motion(&desc, &labels, &at.child("backgroundMotion"))?;
            }
            if let Some(desc) = p.component("modulation")? {
                pass.modulation = build_modulation(&desc, &labels, &at.child("modulation"))?;
            }
            if let Some(desc) = p.component("warp")? {
                pass.warp = build_warp(&desc, &labels, &at.child("warp"))?;
            }
            pass.boot(&doc.sequence, controls, &at)
        }
        "generic" => {
            p.expect_keys("generic", &["pif", "alphaMask"])?;
            let mut pass = Generic {
                name: doc.name.clone(),
                duration,
                ..Generic::default()
            };
            if let Some(desc) = p.component("pif")? {
                pass.pif = build_pif(&desc, &labels, &at.child("pif"))?;
            }
            if let Some(desc) = p.component("alphaMask")? {
                pass.alpha_mask = build_pif(&desc, &labels, &at.child("alphaMask"))?;
            }
            pass.boot(&doc.sequence, controls, &at)
        }
        other => bail!("pass: unknown pass kind '{other}'"),
    }
}

fn build_duration(doc: &StimulusDSL) -> Result<Duration> {
    match (doc.duration, doc.duration_s) {
        (Some(_), Some(_)) => {
            bail!("give the duration in frames or in seconds, not both")
        }
        (Some(frames), None) => Ok(Duration::Frames(frames)),
        (None, Some(seconds)) => Ok(Duration::Seconds(seconds)),
        (None, None) => Ok(Duration::default()),
    }
}

fn build_controls(doc: &StimulusDSL) -> Result<(ControlSet, HashMap<String, ControlId>)> {
    let mut set = ControlSet::new();
    let mut labels: HashMap<String, ControlId> = HashMap::new();
    for (index, control) in doc.controls.iter().enumerate() {
        let at = SourceLocation::new(format!("controls[{index}]"));
        let (label, id) = match control {
            ControlDSL::Wheel {
                label,
                key,
                initial_value,
                minimum,
                maximum,
                step,
            } => (
                label,
                set.wheel(label.clone(), *key, *initial_value, *minimum, *maximum, *step),
            ),
            ControlDSL::DirectionWheel {
                label,
                key,
                initial_value,
                minimum,
                maximum,
                step,
            } => {
                direction::process_direction(initial_value, &at.child("initialValue"))?;
                (
                    label,
                    set.direction_wheel(
                        label.clone(),
                        *key,
                        initial_value,
                        *minimum,
                        *maximum,
                        *step,
                    )?,
                )
            }
            ControlDSL::MouseMotion {
                label,
                key,
                initial_value,
                minimum,
                maximum,
            } => (
                label,
                set.mouse_motion(label.clone(), *key, *initial_value, *minimum, *maximum),
            ),
            ControlDSL::ColorPicker {
                label,
                key,
                initial_value,
            } => {
                color::process_color(initial_value, &at.child("initialValue"))?;
                (label, set.color_picker(label.clone(), *key, initial_value)?)
            }
        };
        if labels.insert(label.clone(), id).is_some() {
            bail!("{at}: duplicate control label '{label}'");
        }
    }
    Ok((set, labels))
}

fn build_pif(
    desc: &ComponentDSL,
    labels: &HashMap<String, ControlId>,
    at: &SourceLocation,
) -> Result<Pif> {
    let p = Params::new(&desc.params, at, labels);
    match desc.kind.as_str() {
        "solid" => {
            p.expect_keys("solid", &["color"])?;
            let mut pif = Solid::default();
            if let Some(color) = p.color("color")? {
                pif.color = color;
            }
            Ok(pif.into())
        }
        "sineGrating" => {
            p.expect_keys("sineGrating", &["color1", "color2", "direction", "wavelength"])?;
            let mut pif = SineGrating::default();
            if let Some(color) = p.color("color1")? {
                pif.color1 = color;
            }
            if let Some(color) = p.color("color2")? {
                pif.color2 = color;
            }
            if let Some(direction) = p.direction("direction")? {
                pif.direction = direction;
            }
            if let Some(wavelength) = p.scalar("wavelength")? {
                pif.wavelength_um = wavelength;
            }
            Ok(pif.into())
        }
        "gradient" => {
            p.expect_keys("gradient", &["color1", "color2", "direction", "start", "end"])?;
            let mut pif = Gradient::default();
            if let Some(color) = p.color("color1")? {
                pif.color1 = color;
            }
            if let Some(color) = p.color("color2")? {
                pif.color2 = color;
            }
            if let Some(direction) = p.direction("direction")? {
                pif.direction = direction;
            }
            if let Some(end) = p.gradient_end("start")? {
                pif.start = end;
            }
            if let Some(end) = p.gradient_end("end")? {
                pif.end = end;
            }
            Ok(pif.into())
        }
        "rect" => {
            p.expect_keys(
                "rect",
                &[
                    "size_um",
                    "facing",
                    "follow_distance_um",
                    "wingmen_distance_um",
                    "filterRadius_um",
                ],
            )?;
            let mut pif = Rect::default();
            if let Some(size) = p.pair("size_um")? {
                pif.size_um = size;
            }
            if let Some(facing) = p.direction_spec("facing")? {
                pif.facing = facing;
            }
            if let Some(distance) = p.number("follow_distance_um")? {
                pif.follow_distance_um = distance;
            }
            if let Some(distance) = p.number("wingmen_distance_um")? {
                pif.wingmen_distance_um = distance;
            }
            if let Some(radius) = p.number("filterRadius_um")? {
                pif.filter_radius_um = radius;
            }
            Ok(pif.into())
        }
        "spot" => {
            p.expect_keys("spot", &["radius", "innerRadius", "filterRadius_um"])?;
            let mut pif = Spot::default();
            if let Some(radius) = p.scalar("radius")? {
                pif.radius_um = radius;
            }
            if let Some(radius) = p.scalar("innerRadius")? {
                pif.inner_radius_um = radius;
            }
            if let Some(radius) = p.number("filterRadius_um")? {
                pif.filter_radius_um = radius;
            }
            Ok(pif.into())
        }
        "image" => {
            p.expect_keys("image", &["imagePath"])?;
            Ok(Image::new(p.required_string("imagePath")?).into())
        }
        "mix" => {
            p.expect_keys("mix", &["shape", "foreground", "background"])?;
            let shape = build_pif(&p.required_component("shape")?, labels, &at.child("shape"))?;
            let foreground = build_pif(
                &p.required_component("foreground")?,
                labels,
                &at.child("foreground"),
            )?;
            let background = build_pif(
                &p.required_component("background")?,
                labels,
                &at.child("background"),
            )?;
            Ok(shape.mix(foreground, background))
        }
        "add" | "sub" | "mul" => {
            p.expect_keys(desc.kind.as_str(), &["op1", "op2"])?;
            let op1 = build_pif(&p.required_component("op1")?, labels, &at.child("op1"))?;
            let op2 = build_pif(&p.required_component("op2")?, labels, &at.child("op2"))?;
            Ok(match desc.kind.as_str() {
                "add" => op1 + op2,
                "sub" => op1 - op2,
                _ => op1 * op2,
            })
        }
        "move" => {
            p.expect_keys("move", &["moved", "motion"])?;
            let moved = build_pif(&p.required_component("moved")?, labels, &at.child("moved"))?;
            let motion = match p.component("motion")? {
                Some(desc) => build_motion(&desc, labels, &at.child("motion"))?,
                None => Motion::default(),
            };
            Ok(moved.moved(motion))
        }
        "warp" => {
            p.expect_keys("warp", &["warped", "warp"])?;
            let warped = build_pif(&p.required_component("warped")?, labels, &at.child("warped"))?;
            let warp = match p.component("warp")? {
                Some(desc) => build_warp(&desc, labels, &at.child("warp"))?,
                None => Warp::default(),
            };
            Ok(warped.warped(warp))
        }
        "modulate" => {
            p.expect_keys("modulate", &["modulated", "modulation"])?;
            let modulated = build_pif(
                &p.required_component("modulated")?,
                labels,
                &at.child("modulated"),
            )?;
            let modulation = match p.component("modulation")? {
                Some(desc) => build_modulation(&desc, labels, &at.child("modulation"))?,
                None => Modulation::default(),
            };
            Ok(modulated.modulated(modulation))
        }
        "timeWarp" => {
            p.expect_keys("timeWarp", &["warped", "timeWarp"])?;
            let warped = build_pif(&p.required_component("warped")?, labels, &at.child("warped"))?;
            let warp = build_time_warp(
                &p.required_component("timeWarp")?,
                labels,
                &at.child("timeWarp"),
            )?;
            Ok(warped.time_warped(warp))
        }
        other => bail!("{at}: unknown pif kind '{other}'"),
    }
}

fn build_motion(
    desc: &ComponentDSL,
    labels: &HashMap<String, ControlId>,
    at: &SourceLocation,
) -> Result<Motion> {
    let p = Params::new(&desc.params, at, labels);
    match desc.kind.as_str() {
        "still" => {
            p.expect_keys("still", &[])?;
            Ok(Motion::Still)
        }
        "linear" => {
            p.expect_keys(
                "linear",
                &[
                    "velocity",
                    "positionUnits",
                    "startPosition",
                    "angularVelocity",
                    "startAngle",
                    "scaleVelocity",
                    "startScale",
                ],
            )?;
            let mut linear = motion::Linear::default();
            if let Some(velocity) = p.pair("velocity")? {
                linear.velocity = velocity;
            }
            if let Some(start) = p.start_position()? {
                linear.start_position = start;
            }
            if let Some(velocity) = p.number("angularVelocity")? {
                linear.angular_velocity = velocity;
            }
            if let Some(angle) = p.number("startAngle")? {
                linear.start_angle = angle;
            }
            if let Some(velocity) = p.pair("scaleVelocity")? {
                linear.scale_velocity = velocity;
            }
            if let Some(scale) = p.pair("startScale")? {
                linear.start_scale = scale;
            }
            Ok(linear.into())
        }
        "crossing" => {
            p.expect_keys(
                "crossing",
                &[
                    "velocity",
                    "direction",
                    "offset_um",
                    "shapeLength_um",
                    "travelLength_um",
                    "extendStimulusDurationToCrossingDuration",
                ],
            )?;
            let mut crossing = Crossing::default();
            if let Some(velocity) = p.number("velocity")? {
                crossing.velocity = velocity;
            }
            if let Some(direction) = p.direction_spec("direction")? {
                crossing.direction = direction;
            }
            if let Some(offset) = p.number("offset_um")? {
                crossing.offset_um = offset;
            }
            if let Some(length) = p.number("shapeLength_um")? {
                crossing.shape_length_um = length;
            }
            if let Some(length) = p.number("travelLength_um")? {
                crossing.travel_length_um = length;
            }
            if let Some(extend) = p.boolean("extendStimulusDurationToCrossingDuration")? {
                crossing.extend_duration = extend;
            }
            Ok(crossing.into())
        }
        "discreteLinear" => {
            p.expect_keys(
                "discreteLinear",
                &["timestep", "jump", "startPosition", "positionUnits"],
            )?;
            let mut discrete = DiscreteLinear::default();
            if let Some(timestep) = p.number("timestep")? {
                discrete.timestep_s = timestep;
            }
            if let Some(jump) = p.pair("jump")? {
                discrete.jump = jump;
            }
            if let Some(start) = p.start_position()? {
                discrete.start_position = start;
            }
            Ok(discrete.into())
        }
        other => bail!("{at}: unknown motion kind '{other}'"),
    }
}

fn build_modulation(
    desc: &ComponentDSL,
    labels: &HashMap<String, ControlId>,
    at: &SourceLocation,
) -> Result<Modulation> {
    let p = Params::new(&desc.params, at, labels);
    match desc.kind.as_str() {
        "linear" => {
            p.expect_keys(
                "linear",
                &["brightColor", "darkColor", "intensity", "intensitySlope"],
            )?;
            let mut linear = modulation::Linear::default();
            if let Some(color) = p.color("brightColor")? {
                linear.bright_color = color;
            }
            if let Some(color) = p.color("darkColor")? {
                linear.dark_color = color;
            }
            if let Some(intensity) = p.number("intensity")? {
                linear.intensity = Some(intensity);
            }
            if let Some(value) = desc.params.get("intensitySlope") {
                linear.slope = match (value.as_str(), value.as_f64()) {
                    (Some("hold"), _) => IntensitySlope::Hold,
                    (Some("down"), _) => IntensitySlope::Down,
                    (Some("up"), _) => IntensitySlope::Up,
                    (None, Some(slope)) => IntensitySlope::PerSecond(slope),
                    _ => bail!(
                        "{}: expected \"hold\", \"down\", \"up\", or a slope [1/s]",
                        at.child("intensitySlope")
                    ),
                };
            }
            Ok(linear.into())
        }
        "cosine" => {
            p.expect_keys(
                "cosine",
                &[
                    "brightColor",
                    "darkColor",
                    "intensity",
                    "wavelength_s",
                    "endWavelength_s",
                    "exponent",
                    "phase",
                    "amplitude",
                    "endAmplitude",
                    "linearFrequencyChange",
                ],
            )?;
            let mut cosine = Cosine::default();
            if let Some(color) = p.color("brightColor")? {
                cosine.bright_color = color;
            }
            if let Some(color) = p.color("darkColor")? {
                cosine.dark_color = color;
            }
            if let Some(intensity) = p.scalar("intensity")? {
                cosine.intensity = intensity;
            }
            if let Some(wavelength) = p.number("wavelength_s")? {
                cosine.wavelength_s = wavelength;
            }
            if let Some(wavelength) = p.number("endWavelength_s")? {
                cosine.end_wavelength_s = Some(wavelength);
            }
            if let Some(exponent) = p.scalar("exponent")? {
                cosine.exponent = exponent;
            }
            if let Some(phase) = p.scalar("phase")? {
                cosine.phase = phase;
            }
            if let Some(amplitude) = p.number("amplitude")? {
                cosine.amplitude = amplitude;
            }
            if let Some(amplitude) = p.number("endAmplitude")? {
                cosine.end_amplitude = Some(amplitude);
            }
            if let Some(chirp) = p.boolean("linearFrequencyChange")? {
                cosine.linear_frequency_change = chirp;
            }
            Ok(cosine.into())
        }
        other => bail!("{at}: unknown modulation kind '{other}'"),
    }
}

fn build_warp(
    desc: &ComponentDSL,
    labels: &HashMap<String, ControlId>,
    at: &SourceLocation,
) -> Result<Warp> {
    let p = Params::new(&desc.params, at, labels);
    match desc.kind.as_str() {
        "nop" => {
            p.expect_keys("nop", &[])?;
            Ok(Warp::Nop)
        }
        "onElectrodes" => {
            p.expect_keys("onElectrodes", &["period"])?;
            let mut warp = OnElectrodes::default();
            if let Some(period) = p.pair("period")? {
                warp.period_um = period;
            }
            Ok(Warp::OnElectrodes(warp))
        }
        other => bail!("{at}: unknown warp kind '{other}'"),
    }
}

fn build_time_warp(
    desc: &ComponentDSL,
    labels: &HashMap<String, ControlId>,
    at: &SourceLocation,
) -> Result<TimeWarp> {
    let p = Params::new(&desc.params, at, labels);
    match desc.kind.as_str() {
        "delay" => {
            p.expect_keys("delay", &["delay_s"])?;
            Ok(TimeWarp::Delay {
                delay_s: p.required_number("delay_s")?,
            })
        }
        "loop" => {
            p.expect_keys("loop", &["period_s"])?;
            Ok(TimeWarp::Loop {
                period_s: p.required_number("period_s")?,
            })
        }
        other => bail!("{at}: unknown time warp kind '{other}'"),
    }
}

/// One component's parameter map, read with the document path for errors.
struct Params<'a> {
    map: &'a HashMap<String, serde_json::Value>,
    at: SourceLocation,
    labels: &'a HashMap<String, ControlId>,
}

impl<'a> Params<'a> {
    fn new(
        map: &'a HashMap<String, serde_json::Value>,
        at: &SourceLocation,
        labels: &'a HashMap<String, ControlId>,
    ) -> Self {
        Params {
            map,
            at: at.clone(),
            labels,
        }
    }

    fn expect_keys(&self, kind: &str, known: &[&str]) -> Result<()> {
        for key in self.map.keys() {
            if !known.contains(&key.as_str()) {
                bail!("{}: unknown parameter '{key}' for kind '{kind}'", self.at);
            }
        }
        Ok(())
    }

    /// Decode a `{"control": "<label>"}` reference, if the value is one.
    fn control_ref(&self, key: &str, value: &serde_json::Value) -> Result<Option<ControlId>> {
        let Some(label) = value.get("control").and_then(|v| v.as_str()) else {
            return Ok(None);
        };
        match self.labels.get(label) {
            Some(id) => Ok(Some(*id)),
            None => bail!("{}: unknown control '{label}'", self.at.child(key)),
        }
    }

    fn number(&self, key: &str) -> Result<Option<f64>> {
        let Some(value) = self.map.get(key) else {
            return Ok(None);
        };
        match value.as_f64() {
            Some(number) => Ok(Some(number)),
            None => bail!("{}: expected a number", self.at.child(key)),
        }
    }

    fn required_number(&self, key: &str) -> Result<f64> {
        match self.number(key)? {
            Some(number) => Ok(number),
            None => bail!("{}: missing required parameter '{key}'", self.at),
        }
    }

    fn boolean(&self, key: &str) -> Result<Option<bool>> {
        let Some(value) = self.map.get(key) else {
            return Ok(None);
        };
        match value.as_bool() {
            Some(flag) => Ok(Some(flag)),
            None => bail!("{}: expected true or false", self.at.child(key)),
        }
    }

    fn pair(&self, key: &str) -> Result<Option<[f64; 2]>> {
        let Some(value) = self.map.get(key) else {
            return Ok(None);
        };
        match as_pair(value) {
            Some(pair) => Ok(Some(pair)),
            None => bail!("{}: expected an [x, y] pair", self.at.child(key)),
        }
    }

    fn required_string(&self, key: &str) -> Result<String> {
        match self.string(key)? {
            Some(text) => Ok(text),
            None => bail!("{}: missing required parameter '{key}'", self.at),
        }
    }

    fn string(&self, key: &str) -> Result<Option<String>> {
        let Some(value) = self.map.get(key) else {
            return Ok(None);
        };
        match value.as_str() {
            Some(text) => Ok(Some(text.to_string())),
            None => bail!("{}: expected a string", self.at.child(key)),
        }
    }

    fn scalar(&self, key: &str) -> Result<Option<ScalarParam>> {
        let Some(value) = self.map.get(key) else {
            return Ok(None);
        };
        if let Some(id) = self.control_ref(key, value)? {
            return Ok(Some(id.into()));
        }
        match value.as_f64() {
            Some(number) => Ok(Some(number.into())),
            None => bail!(
                "{}: expected a number or a control reference",
                self.at.child(key)
            ),
        }
    }

    fn color(&self, key: &str) -> Result<Option<ColorParam>> {
        let Some(value) = self.map.get(key) else {
            return Ok(None);
        };
        if let Some(id) = self.control_ref(key, value)? {
            return Ok(Some(id.into()));
        }
        let spec: ColorSpec = serde_json::from_value(value.clone()).map_err(|_| {
            anyhow!(
                "{}: expected a color name, grey level, [r, g, b] triplet, or control reference",
                self.at.child(key)
            )
        })?;
        // Catch name typos here, where the document path is still known.
        color::process_color(&spec, &self.at.child(key))?;
        Ok(Some(spec.into()))
    }

    fn direction(&self, key: &str) -> Result<Option<DirectionParam>> {
        let Some(value) = self.map.get(key) else {
            return Ok(None);
        };
        if let Some(id) = self.control_ref(key, value)? {
            return Ok(Some(id.into()));
        }
        Ok(Some(self.decode_direction(key, value)?.into()))
    }

    fn direction_spec(&self, key: &str) -> Result<Option<DirectionSpec>> {
        let Some(value) = self.map.get(key) else {
            return Ok(None);
        };
        Ok(Some(self.decode_direction(key, value)?))
    }

    fn decode_direction(&self, key: &str, value: &serde_json::Value) -> Result<DirectionSpec> {
        let spec: DirectionSpec = serde_json::from_value(value.clone()).map_err(|_| {
            anyhow!(
                "{}: expected a compass name or an angle in radians",
                self.at.child(key)
            )
        })?;
        direction::process_direction(&spec, &self.at.child(key))?;
        Ok(spec)
    }

    fn gradient_end(&self, key: &str) -> Result<Option<GradientEnd>> {
        let Some(value) = self.map.get(key) else {
            return Ok(None);
        };
        if value.as_str() == Some("edge") {
            return Ok(Some(GradientEnd::Edge));
        }
        if let Some(id) = self.control_ref(key, value)? {
            return Ok(Some(id.into()));
        }
        match value.as_f64() {
            Some(distance) => Ok(Some(distance.into())),
            None => bail!(
                "{}: expected a distance [um], \"edge\", or a control reference",
                self.at.child(key)
            ),
        }
    }

    /// Read `startPosition` together with its `positionUnits` neighbor. An
    /// electrode address spells the column as a letter, like `["B", 3]`.
    fn start_position(&self) -> Result<Option<StartPosition>> {
        let units = self.string("positionUnits")?;
        let Some(value) = self.map.get("startPosition") else {
            return Ok(None);
        };
        let at = self.at.child("startPosition");
        if let Some(id) = self.control_ref("startPosition", value)? {
            return Ok(Some(StartPosition::Control(id)));
        }
        let Some(items) = value.as_array().filter(|items| items.len() == 2) else {
            bail!("{at}: expected an [x, y] pair or a control reference");
        };
        if let Some(column) = items[0].as_str() {
            let mut chars = column.chars();
            let (Some(column), None) = (chars.next(), chars.next()) else {
                bail!("{at}: electrode column must be a single letter");
            };
            let Some(row) = items[1].as_f64() else {
                bail!("{at}: electrode row must be a number");
            };
            return Ok(Some(StartPosition::Electrode { column, row }));
        }
        let (Some(x), Some(y)) = (items[0].as_f64(), items[1].as_f64()) else {
            bail!("{at}: expected an [x, y] pair");
        };
        match units.as_deref().unwrap_or("um") {
            "um" => Ok(Some(StartPosition::Um([x, y]))),
            "percent" => Ok(Some(StartPosition::Percent([x, y]))),
            "pixel" => Ok(Some(StartPosition::Pixel([x, y]))),
            "electrodeIndex" => bail!(
                "{}: electrode positions spell the column as a letter, like [\"B\", 3]",
                self.at.child("positionUnits")
            ),
            other => bail!(
                "{}: unknown position units '{other}'",
                self.at.child("positionUnits")
            ),
        }
    }

    fn component(&self, key: &str) -> Result<Option<ComponentDSL>> {
        let Some(value) = self.map.get(key) else {
            return Ok(None);
        };
        match serde_json::from_value(value.clone()) {
            Ok(component) => Ok(Some(component)),
            Err(e) => bail!("{}: {e}", self.at.child(key)),
        }
    }

    fn required_component(&self, key: &str) -> Result<ComponentDSL> {
        match self.component(key)? {
            Some(component) => Ok(component),
            None => bail!("{}: missing required component '{key}'", self.at),
        }
    }
}

fn as_pair(value: &serde_json::Value) -> Option<[f64; 2]> {
    let items = value.as_array()?;
    if items.len() != 2 {
        return None;
    }
    Some([items[0].as_f64()?, items[1].as_f64()?])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controls::InputEvent;

    fn parse(text: &str) -> StimulusDSL {
        serde_json::from_str(text).unwrap()
    }

    #[test]
    fn a_minimal_document_boots_with_defaults() {
        let doc = parse(r#"{"name": "blank", "pass": {"kind": "singleShape"}}"#);
        let stimulus = boot_document(&doc).unwrap();
        assert_eq!(stimulus.program.duration_frames(), 1);
        assert!(stimulus.program.functions().contains_key("fig"));
        assert!(!stimulus.is_interactive());
    }

    #[test]
    fn parameters_reach_the_uniforms() {
        let doc = parse(
            r#"{
                "name": "spot",
                "duration_s": 2.0,
                "sequence": {"frame_interval_s": 0.1},
                "pass": {
                    "kind": "singleShape",
                    "shape": {"kind": "spot", "radius": 300, "innerRadius": 120}
                }
            }"#,
        );
        let stimulus = boot_document(&doc).unwrap();
        assert_eq!(stimulus.program.duration_frames(), 21);
        assert_eq!(
            stimulus.program.vectors()["fig_modulated_shape_moved_warped_spotRadius"],
            [300.0, 120.0]
        );
    }

    #[test]
    fn a_control_reference_feeds_the_shape() {
        let doc = parse(
            r#"{
                "name": "spot",
                "controls": [
                    {"kind": "wheel", "label": "Radius", "key": "R",
                     "initialValue": 300, "minimum": 0, "maximum": 1000}
                ],
                "pass": {
                    "kind": "singleShape",
                    "shape": {"kind": "spot", "radius": {"control": "Radius"}}
                }
            }"#,
        );
        let mut stimulus = boot_document(&doc).unwrap();
        assert!(stimulus.is_interactive());
        let radius = "fig_modulated_shape_moved_warped_spotRadius";
        assert_eq!(stimulus.program.vectors()[radius], [300.0, -1000.0]);

        stimulus.handle_event(InputEvent::KeyDown('R'), 1.0).unwrap();
        stimulus
            .handle_event(InputEvent::Wheel { delta_y: 120.0 }, 1.5)
            .unwrap();
        // default step is a hundredth of the range
        assert_eq!(stimulus.program.vectors()[radius], [310.0, -1000.0]);
        assert_eq!(
            stimulus.log.entries().last().map(String::as_str),
            Some("@1.5 s: Radius = 310")
        );
    }

    #[test]
    fn an_unknown_color_reports_the_document_path() {
        let doc = parse(
            r#"{
                "name": "bad",
                "pass": {
                    "kind": "singleShape",
                    "pattern": {"kind": "sineGrating", "color1": "blurple"}
                }
            }"#,
        );
        let err = boot_document(&doc).unwrap_err().to_string();
        assert!(err.contains("pass.pattern.color1"), "{err}");
        assert!(err.contains("unknown color name 'blurple'"), "{err}");
    }

    #[test]
    fn an_unknown_parameter_is_rejected() {
        let doc = parse(
            r#"{
                "name": "bad",
                "pass": {
                    "kind": "singleShape",
                    "shape": {"kind": "spot", "radius_um": 300}
                }
            }"#,
        );
        let err = boot_document(&doc).unwrap_err().to_string();
        assert!(err.contains("unknown parameter 'radius_um'"), "{err}");
        assert!(err.contains("pass.shape"), "{err}");
    }

    #[test]
    fn duplicate_control_labels_are_rejected() {
        let doc = parse(
            r#"{
                "name": "bad",
                "controls": [
                    {"kind": "wheel", "label": "Radius"},
                    {"kind": "wheel", "label": "Radius"}
                ],
                "pass": {"kind": "singleShape"}
            }"#,
        );
        let err = boot_document(&doc).unwrap_err().to_string();
        assert!(err.contains("duplicate control label 'Radius'"), "{err}");
    }

    #[test]
    fn frame_and_second_durations_are_exclusive() {
        let doc = parse(
            r#"{
                "name": "bad",
                "duration": 120,
                "duration_s": 2.0,
                "pass": {"kind": "singleShape"}
            }"#,
        );
        let err = boot_document(&doc).unwrap_err().to_string();
        assert!(err.contains("not both"), "{err}");
    }

    #[test]
    fn electrode_positions_spell_the_column() {
        let doc = parse(
            r#"{
                "name": "hop",
                "pass": {
                    "kind": "singleShape",
                    "shapeMotion": {
                        "kind": "linear",
                        "positionUnits": "electrodeIndex",
                        "startPosition": ["B", 3]
                    }
                }
            }"#,
        );
        let stimulus = boot_document(&doc).unwrap();
        assert_eq!(
            stimulus.program.vectors()["fig_modulated_shape_pose_startPosition"],
            [100.0, 300.0]
        );
    }
}
