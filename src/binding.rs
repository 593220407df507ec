//! Bindings between component parameters and shader uniforms.
//!
//! Components declare their parameters as [`ScalarParam`], [`ColorParam`],
//! or [`DirectionParam`]; each resolves to a [`ParamBinding`].
//! A component registers its interactive-capable parameters as one group
//! under its uniform-name prefix; the group is resolved and pushed once at
//! boot and re-resolved as a whole whenever any control feeding it changes,
//! with every involved control announced on the event log.

use anyhow::{bail, Result};

use crate::color::{self, ColorSpec};
use crate::controls::{ControlId, ControlSet};
use crate::direction::{self, DirectionSpec};
use crate::target::ShaderTarget;
use crate::types::{ControlValue, EventLog, SourceLocation};

/// One element of a vector or color assembled from scalars.
#[derive(Debug, Clone, Copy)]
pub enum ElementBinding {
    Literal(f64),
    Control(ControlId),
}

/// How a uniform gets its value.
#[derive(Debug, Clone)]
pub enum ParamBinding {
    /// Fixed at boot.
    Value(ControlValue),
    /// Mirrors one control.
    Control(ControlId),
    /// Assembled elementwise; two elements make a vector, three a color.
    Elements(Vec<ElementBinding>),
}

impl ParamBinding {
    pub fn resolve(&self, controls: &ControlSet, at: &SourceLocation) -> Result<ControlValue> {
        match self {
            ParamBinding::Value(value) => Ok(*value),
            ParamBinding::Control(id) => Ok(controls.value(*id)),
            ParamBinding::Elements(elements) => {
                let mut parts = Vec::with_capacity(elements.len());
                for element in elements {
                    parts.push(match element {
                        ElementBinding::Literal(v) => *v,
                        ElementBinding::Control(id) => match controls.value(*id) {
                            ControlValue::Scalar(v) => v,
                            other => bail!(
                                "{at}: control '{}' used as a tuple element holds {other}, expected a scalar",
                                controls.label(*id)
                            ),
                        },
                    });
                }
                match parts.as_slice() {
                    [x, y] => Ok(ControlValue::Vec2([*x, *y])),
                    [r, g, b] => Ok(ControlValue::Color([*r, *g, *b])),
                    other => bail!("{at}: expected 2 or 3 elements, got {}", other.len()),
                }
            }
        }
    }

    fn is_interactive(&self) -> bool {
        !self.referenced().is_empty()
    }

    fn references(&self, id: ControlId) -> bool {
        self.referenced().contains(&id)
    }

    /// The controls this binding reads, in element order.
    fn referenced(&self) -> Vec<ControlId> {
        match self {
            ParamBinding::Value(_) => Vec::new(),
            ParamBinding::Control(id) => vec![*id],
            ParamBinding::Elements(elements) => elements
                .iter()
                .filter_map(|e| match e {
                    ElementBinding::Control(id) => Some(*id),
                    ElementBinding::Literal(_) => None,
                })
                .collect(),
        }
    }
}

/// Route a value to the setter matching its shape. The match is exhaustive,
/// so a value can never drift to the wrong uniform type.
pub fn set_value(target: &mut dyn ShaderTarget, name: &str, value: ControlValue) {
    match value {
        ControlValue::Scalar(v) => target.set_shader_variable(name, v),
        ControlValue::Vec2([x, y]) => target.set_shader_vector(name, x, y),
        ControlValue::Color(rgb) => target.set_shader_color(name, rgb),
    }
}

#[derive(Debug)]
struct Binding {
    name: String,
    param: ParamBinding,
    at: SourceLocation,
}

/// One component's registered parameter set. A change to any control feeding
/// the group refreshes the whole group, announcing every control it reads.
#[derive(Debug)]
struct Group {
    bindings: Vec<Binding>,
}

fn announce(group: &[Binding], controls: &ControlSet, log: &mut EventLog, time_s: f64) {
    for binding in group {
        for id in binding.param.referenced() {
            log.put(format!(
                "@{time_s} s: {} = {}",
                controls.label(id),
                controls.value(id)
            ));
        }
    }
}

/// Parameter groups that stay live after boot because controls feed them.
#[derive(Debug, Default)]
pub struct Bindings {
    groups: Vec<Group>,
}

impl Bindings {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Refresh every group fed by one of the `changed` controls.
    pub fn refresh_changed(
        &self,
        target: &mut dyn ShaderTarget,
        controls: &ControlSet,
        log: &mut EventLog,
        time_s: f64,
        changed: &[ControlId],
    ) -> Result<()> {
        for group in &self.groups {
            let hit = group
                .bindings
                .iter()
                .any(|b| changed.iter().any(|id| b.param.references(*id)));
            if !hit {
                continue;
            }
            announce(&group.bindings, controls, log, time_s);
            for binding in &group.bindings {
                let value = binding.param.resolve(controls, &binding.at)?;
                set_value(target, &binding.name, value);
            }
        }
        Ok(())
    }
}

/// Mutable state threaded through a composition pass.
pub struct BootContext<'a> {
    pub controls: &'a ControlSet,
    pub bindings: &'a mut Bindings,
    pub log: &'a mut EventLog,
    pub time_s: f64,
}

impl BootContext<'_> {
    /// Register one component's parameter set.
    ///
    /// Each `(key, binding)` pair becomes the uniform `prefix` + `key`. All
    /// values are resolved and pushed now; the set stays registered for
    /// refresh when any parameter is fed by a control.
    pub fn register_controls(
        &mut self,
        target: &mut dyn ShaderTarget,
        prefix: &str,
        at: &SourceLocation,
        params: Vec<(&str, ParamBinding)>,
    ) -> Result<()> {
        let mut group = Vec::with_capacity(params.len());
        for (key, param) in params {
            group.push(Binding {
                name: format!("{prefix}{key}"),
                param,
                at: at.child(key),
            });
        }
        announce(&group, self.controls, self.log, self.time_s);
        for binding in &group {
            let value = binding.param.resolve(self.controls, &binding.at)?;
            set_value(target, &binding.name, value);
        }
        if group.iter().any(|b| b.param.is_interactive()) {
            self.bindings.groups.push(Group { bindings: group });
        }
        Ok(())
    }
}

/// A scalar parameter: a number or a wheel control.
#[derive(Debug, Clone)]
pub enum ScalarParam {
    Value(f64),
    Control(ControlId),
}

impl ScalarParam {
    pub fn binding(&self) -> ParamBinding {
        match self {
            ScalarParam::Value(v) => ParamBinding::Value(ControlValue::Scalar(*v)),
            ScalarParam::Control(id) => ParamBinding::Control(*id),
        }
    }

    /// This parameter as one element of an assembled vector or color.
    pub fn element(&self) -> ElementBinding {
        match self {
            ScalarParam::Value(v) => ElementBinding::Literal(*v),
            ScalarParam::Control(id) => ElementBinding::Control(*id),
        }
    }
}

impl From<f64> for ScalarParam {
    fn from(v: f64) -> Self {
        ScalarParam::Value(v)
    }
}

impl From<ControlId> for ScalarParam {
    fn from(id: ControlId) -> Self {
        ScalarParam::Control(id)
    }
}

/// A color parameter: a fixed specification or a picker control.
#[derive(Debug, Clone)]
pub enum ColorParam {
    Spec(ColorSpec),
    Control(ControlId),
}

impl ColorParam {
    /// Binding plus whether the starting color leaves greyscale.
    pub fn binding(
        &self,
        controls: &ControlSet,
        at: &SourceLocation,
    ) -> Result<(ParamBinding, bool)> {
        match self {
            ColorParam::Spec(spec) => {
                let rgb = color::process_color(spec, at)?;
                Ok((
                    ParamBinding::Value(ControlValue::Color(rgb)),
                    !color::is_grey(rgb),
                ))
            }
            ColorParam::Control(id) => {
                let rgb = match controls.value(*id) {
                    ControlValue::Color(rgb) => rgb,
                    other => bail!(
                        "{at}: control '{}' bound as a color holds {other}",
                        controls.label(*id)
                    ),
                };
                Ok((ParamBinding::Control(*id), !color::is_grey(rgb)))
            }
        }
    }
}

impl From<&str> for ColorParam {
    fn from(name: &str) -> Self {
        ColorParam::Spec(name.into())
    }
}

impl From<f64> for ColorParam {
    fn from(grey: f64) -> Self {
        ColorParam::Spec(grey.into())
    }
}

impl From<[f64; 3]> for ColorParam {
    fn from(rgb: [f64; 3]) -> Self {
        ColorParam::Spec(rgb.into())
    }
}

impl From<ColorSpec> for ColorParam {
    fn from(spec: ColorSpec) -> Self {
        ColorParam::Spec(spec)
    }
}

impl From<ControlId> for ColorParam {
    fn from(id: ControlId) -> Self {
        ColorParam::Control(id)
    }
}

/// A direction parameter: a compass name, radians, or a direction wheel.
#[derive(Debug, Clone)]
pub enum DirectionParam {
    Spec(DirectionSpec),
    Control(ControlId),
}

impl DirectionParam {
    /// Binding for the unit vector pointing along the direction.
    pub fn span_binding(&self, at: &SourceLocation) -> Result<ParamBinding> {
        match self {
            DirectionParam::Spec(spec) => {
                let angle = direction::process_direction(spec, at)?;
                Ok(ParamBinding::Value(ControlValue::Vec2([
                    angle.cos(),
                    angle.sin(),
                ])))
            }
            DirectionParam::Control(id) => Ok(ParamBinding::Control(*id)),
        }
    }

    /// The angle in radians; a control reports its current state.
    pub fn angle(&self, controls: &ControlSet, at: &SourceLocation) -> Result<f64> {
        match self {
            DirectionParam::Spec(spec) => direction::process_direction(spec, at),
            DirectionParam::Control(id) => match controls.value(*id) {
                ControlValue::Vec2([x, y]) => Ok(y.atan2(x)),
                other => bail!(
                    "{at}: control '{}' bound as a direction holds {other}",
                    controls.label(*id)
                ),
            },
        }
    }
}

impl From<&str> for DirectionParam {
    fn from(name: &str) -> Self {
        DirectionParam::Spec(name.into())
    }
}

impl From<f64> for DirectionParam {
    fn from(radians: f64) -> Self {
        DirectionParam::Spec(radians.into())
    }
}

impl From<DirectionSpec> for DirectionParam {
    fn from(spec: DirectionSpec) -> Self {
        DirectionParam::Spec(spec)
    }
}

impl From<ControlId> for DirectionParam {
    fn from(id: ControlId) -> Self {
        DirectionParam::Control(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controls::InputEvent;
    use crate::program::PassProgram;
    use crate::types::SequenceInfo;

    #[test]
    fn elements_assemble_by_length() {
        let controls = ControlSet::new();
        let at = SourceLocation::new("pass.shape");
        let pair = ParamBinding::Elements(vec![
            ElementBinding::Literal(1.0),
            ElementBinding::Literal(2.0),
        ]);
        assert_eq!(
            pair.resolve(&controls, &at).unwrap(),
            ControlValue::Vec2([1.0, 2.0])
        );

        let quad = ParamBinding::Elements(vec![ElementBinding::Literal(0.0); 4]);
        let err = quad.resolve(&controls, &at).unwrap_err().to_string();
        assert!(err.contains("pass.shape"), "{err}");
        assert!(err.contains("expected 2 or 3 elements, got 4"), "{err}");
    }

    #[test]
    fn non_scalar_control_cannot_be_an_element() {
        let mut controls = ControlSet::new();
        let id = controls.mouse_motion("Position", 'P', [0.0, 0.0], [0.0, 0.0], [1.0, 1.0]);
        let binding = ParamBinding::Elements(vec![
            ElementBinding::Control(id),
            ElementBinding::Literal(0.0),
        ]);
        let err = binding
            .resolve(&controls, &SourceLocation::new("pass"))
            .unwrap_err()
            .to_string();
        assert!(err.contains("Position"), "{err}");
        assert!(err.contains("expected a scalar"), "{err}");
    }

    #[test]
    fn registration_announces_and_pushes_initial_values() {
        let mut controls = ControlSet::new();
        let id = controls.wheel("Radius", 'R', 0.5, 0.0, 1.0, 0.0);
        let mut program = PassProgram::new(&SequenceInfo::default(), 1.0);
        let mut bindings = Bindings::default();
        let mut log = EventLog::default();
        let mut ctx = BootContext {
            controls: &controls,
            bindings: &mut bindings,
            log: &mut log,
            time_s: 0.0,
        };
        ctx.register_controls(
            &mut program,
            "fig_shape_",
            &SourceLocation::new("pass.shape"),
            vec![
                ("spotRadius", ParamBinding::Control(id)),
                (
                    "filterRadius",
                    ParamBinding::Value(ControlValue::Scalar(0.1)),
                ),
            ],
        )
        .unwrap();
        assert_eq!(program.variables()["fig_shape_spotRadius"], 0.5);
        assert_eq!(program.variables()["fig_shape_filterRadius"], 0.1);
        assert_eq!(log.entries(), ["@0 s: Radius = 0.5"]);
    }

    #[test]
    fn group_refresh_reannounces_every_control_it_reads() {
        let mut controls = ControlSet::new();
        let radius = controls.wheel("Radius", 'R', 0.5, 0.0, 1.0, 0.0);
        let inner = controls.wheel("Inner radius", 'I', 0.2, 0.0, 1.0, 0.0);
        let mut program = PassProgram::new(&SequenceInfo::default(), 1.0);
        let mut bindings = Bindings::default();
        let mut log = EventLog::default();
        let mut ctx = BootContext {
            controls: &controls,
            bindings: &mut bindings,
            log: &mut log,
            time_s: 0.0,
        };
        ctx.register_controls(
            &mut program,
            "fig_shape_",
            &SourceLocation::new("pass.shape"),
            vec![(
                "spotRadius",
                ParamBinding::Elements(vec![
                    ElementBinding::Control(radius),
                    ElementBinding::Control(inner),
                ]),
            )],
        )
        .unwrap();
        assert_eq!(
            program.vectors()["fig_shape_spotRadius"],
            [0.5, 0.2]
        );

        controls.dispatch(InputEvent::KeyDown('R'));
        let changed = controls.dispatch(InputEvent::Wheel { delta_y: 120.0 });
        log = EventLog::default();
        bindings
            .refresh_changed(&mut program, &controls, &mut log, 2.0, &changed)
            .unwrap();
        assert_eq!(program.vectors()["fig_shape_spotRadius"], [0.51, 0.2]);
        assert_eq!(
            log.entries(),
            ["@2 s: Radius = 0.51", "@2 s: Inner radius = 0.2"]
        );
    }
}
