//! Interactive controls: named runtime values driven by mouse, wheel, and
//! keyboard input while the owning stimulus plays.
//!
//! Each control is gated on its activation key being held. A matching input
//! event mutates the control's value; the caller then refreshes the bindings
//! that reference it so the new value reaches the shader uniforms.

use anyhow::Result;

use crate::color::{self, ColorSpec};
use crate::direction::{self, DirectionSpec};
use crate::types::{ControlValue, SourceLocation};

/// Handle of a control inside a [`ControlSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlId(usize);

/// One input event delivered by the window system between frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    KeyDown(char),
    KeyUp(char),
    /// Pointer position as a fraction of the screen, 0..1 per axis.
    MouseMove { percent_x: f64, percent_y: f64 },
    /// Wheel rotation in eighths of a degree; one detent is 120.
    Wheel { delta_y: f64 },
}

#[derive(Debug)]
enum ControlKind {
    Wheel {
        minimum: f64,
        maximum: f64,
        step: f64,
        /// In direction mode the wheel turns an angle and the value is the
        /// unit vector along it.
        angle: Option<f64>,
    },
    MouseMotion {
        minimum: [f64; 2],
        maximum: [f64; 2],
    },
    ColorPicker,
}

#[derive(Debug)]
struct Control {
    label: String,
    key: char,
    key_down: bool,
    kind: ControlKind,
    value: ControlValue,
}

/// All interactive controls of one stimulus.
#[derive(Debug, Default)]
pub struct ControlSet {
    controls: Vec<Control>,
}

impl ControlSet {
    pub fn new() -> Self {
        ControlSet::default()
    }

    fn push(&mut self, control: Control) -> ControlId {
        self.controls.push(control);
        ControlId(self.controls.len() - 1)
    }

    /// A scalar adjusted by the mouse wheel while `key` is held.
    ///
    /// A zero `step` defaults to one hundredth of the value range.
    pub fn wheel(
        &mut self,
        label: impl Into<String>,
        key: char,
        initial: f64,
        minimum: f64,
        maximum: f64,
        step: f64,
    ) -> ControlId {
        let step = if step == 0.0 {
            (maximum - minimum) / 100.0
        } else {
            step
        };
        self.push(Control {
            label: label.into(),
            key,
            key_down: false,
            kind: ControlKind::Wheel {
                minimum,
                maximum,
                step,
                angle: None,
            },
            value: ControlValue::Scalar(initial),
        })
    }

    /// A wheel that turns a direction; the value is the span unit vector.
    pub fn direction_wheel(
        &mut self,
        label: impl Into<String>,
        key: char,
        initial: &DirectionSpec,
        minimum: f64,
        maximum: f64,
        step: f64,
    ) -> Result<ControlId> {
        let angle = direction::process_direction(initial, &SourceLocation::default())?;
        let step = if step == 0.0 {
            (maximum - minimum) / 100.0
        } else {
            step
        };
        Ok(self.push(Control {
            label: label.into(),
            key,
            key_down: false,
            kind: ControlKind::Wheel {
                minimum,
                maximum,
                step,
                angle: Some(angle),
            },
            value: ControlValue::Vec2([angle.cos(), angle.sin()]),
        }))
    }

    /// A 2-vector following the pointer while `key` is held, mapped per axis
    /// from screen fraction into `minimum..maximum`.
    pub fn mouse_motion(
        &mut self,
        label: impl Into<String>,
        key: char,
        initial: [f64; 2],
        minimum: [f64; 2],
        maximum: [f64; 2],
    ) -> ControlId {
        self.push(Control {
            label: label.into(),
            key,
            key_down: false,
            kind: ControlKind::MouseMotion { minimum, maximum },
            value: ControlValue::Vec2(initial),
        })
    }

    /// A color picked with the pointer: hue from x, saturation from y, and
    /// lightness turned by the wheel.
    pub fn color_picker(
        &mut self,
        label: impl Into<String>,
        key: char,
        initial: &ColorSpec,
    ) -> Result<ControlId> {
        let rgb = color::process_color(initial, &SourceLocation::default())?;
        Ok(self.push(Control {
            label: label.into(),
            key,
            key_down: false,
            kind: ControlKind::ColorPicker,
            value: ControlValue::Color(rgb),
        }))
    }

    pub fn value(&self, id: ControlId) -> ControlValue {
        self.controls[id.0].value
    }

    pub fn label(&self, id: ControlId) -> &str {
        &self.controls[id.0].label
    }

    /// Feed one event to every control. Returns the controls whose value
    /// changed; their bindings need a refresh.
    pub fn dispatch(&mut self, event: InputEvent) -> Vec<ControlId> {
        let mut changed = Vec::new();
        for (index, control) in self.controls.iter_mut().enumerate() {
            if control.handle(event) {
                changed.push(ControlId(index));
            }
        }
        changed
    }
}

impl Control {
    fn handle(&mut self, event: InputEvent) -> bool {
        match event {
            InputEvent::KeyDown(key) => {
                if key == self.key {
                    self.key_down = true;
                }
                false
            }
            InputEvent::KeyUp(key) => {
                if key == self.key {
                    self.key_down = false;
                }
                false
            }
            InputEvent::MouseMove {
                percent_x,
                percent_y,
            } => {
                if !self.key_down {
                    return false;
                }
                match &self.kind {
                    ControlKind::MouseMotion { minimum, maximum } => {
                        let value = ControlValue::Vec2([
                            percent_x * (maximum[0] - minimum[0]) + minimum[0],
                            percent_y * (maximum[1] - minimum[1]) + minimum[1],
                        ]);
                        self.replace(value)
                    }
                    ControlKind::ColorPicker => {
                        let ControlValue::Color(rgb) = self.value else {
                            return false;
                        };
                        let [_, l, _] = color::rgb_to_hls(rgb);
                        let value =
                            ControlValue::Color(color::hls_to_rgb([percent_x, l, percent_y]));
                        self.replace(value)
                    }
                    ControlKind::Wheel { .. } => false,
                }
            }
            InputEvent::Wheel { delta_y } => {
                if !self.key_down {
                    return false;
                }
                match &mut self.kind {
                    ControlKind::Wheel {
                        minimum,
                        maximum,
                        step,
                        angle,
                    } => match angle {
                        Some(angle) => {
                            let turned =
                                (*angle + delta_y * *step / 120.0).clamp(*minimum, *maximum);
                            *angle = turned;
                            let value = ControlValue::Vec2([turned.cos(), turned.sin()]);
                            self.replace(value)
                        }
                        None => {
                            let ControlValue::Scalar(current) = self.value else {
                                return false;
                            };
                            let value = ControlValue::Scalar(
                                (current + delta_y * *step / 120.0).clamp(*minimum, *maximum),
                            );
                            self.replace(value)
                        }
                    },
                    ControlKind::ColorPicker => {
                        let ControlValue::Color(rgb) = self.value else {
                            return false;
                        };
                        let [h, l, s] = color::rgb_to_hls(rgb);
                        let value = ControlValue::Color(color::hls_to_rgb([
                            h,
                            l + delta_y * 0.01 / 120.0,
                            s,
                        ]));
                        self.replace(value)
                    }
                    ControlKind::MouseMotion { .. } => false,
                }
            }
        }
    }

    fn replace(&mut self, value: ControlValue) -> bool {
        if self.value == value {
            return false;
        }
        self.value = value;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wheel_step_defaults_to_a_hundredth_of_range() {
        let mut controls = ControlSet::new();
        let id = controls.wheel("Radius", 'R', 0.5, 0.0, 1.0, 0.0);
        controls.dispatch(InputEvent::KeyDown('R'));
        controls.dispatch(InputEvent::Wheel { delta_y: 120.0 });
        assert_eq!(controls.value(id), ControlValue::Scalar(0.51));
    }

    #[test]
    fn events_are_ignored_while_key_is_up() {
        let mut controls = ControlSet::new();
        let id = controls.wheel("Radius", 'R', 0.5, 0.0, 1.0, 0.0);
        let changed = controls.dispatch(InputEvent::Wheel { delta_y: 120.0 });
        assert!(changed.is_empty());
        assert_eq!(controls.value(id), ControlValue::Scalar(0.5));

        controls.dispatch(InputEvent::KeyDown('R'));
        controls.dispatch(InputEvent::KeyUp('R'));
        let changed = controls.dispatch(InputEvent::Wheel { delta_y: 120.0 });
        assert!(changed.is_empty());
    }

    #[test]
    fn wheel_clamps_at_bounds() {
        let mut controls = ControlSet::new();
        let id = controls.wheel("Radius", 'R', 0.99, 0.0, 1.0, 0.0);
        controls.dispatch(InputEvent::KeyDown('R'));
        controls.dispatch(InputEvent::Wheel { delta_y: 600.0 });
        assert_eq!(controls.value(id), ControlValue::Scalar(1.0));
    }

    #[test]
    fn direction_wheel_exposes_the_span_vector() {
        let mut controls = ControlSet::new();
        let id = controls
            .direction_wheel("Motion direction", 'D', &"east".into(), 0.0, 7.0, 0.0)
            .unwrap();
        assert_eq!(controls.value(id), ControlValue::Vec2([1.0, 0.0]));

        controls.dispatch(InputEvent::KeyDown('D'));
        controls.dispatch(InputEvent::Wheel { delta_y: 120.0 });
        let ControlValue::Vec2([c, s]) = controls.value(id) else {
            panic!("direction wheel should stay a vector");
        };
        assert!((c - 0.07f64.cos()).abs() < 1e-12);
        assert!((s - 0.07f64.sin()).abs() < 1e-12);
    }

    #[test]
    fn mouse_motion_maps_screen_fractions() {
        let mut controls = ControlSet::new();
        let id = controls.mouse_motion("Position", 'P', [0.0, 0.0], [0.0, 0.0], [1000.0, 2000.0]);
        controls.dispatch(InputEvent::KeyDown('P'));
        controls.dispatch(InputEvent::MouseMove {
            percent_x: 0.5,
            percent_y: 0.25,
        });
        assert_eq!(controls.value(id), ControlValue::Vec2([500.0, 500.0]));
    }

    #[test]
    fn color_picker_maps_hue_and_saturation() {
        let mut controls = ControlSet::new();
        let id = controls.color_picker("Spot color", 'C', &"red".into()).unwrap();
        controls.dispatch(InputEvent::KeyDown('C'));
        // One third around the hue circle at full saturation lands on green.
        controls.dispatch(InputEvent::MouseMove {
            percent_x: 1.0 / 3.0,
            percent_y: 1.0,
        });
        let ControlValue::Color([r, g, b]) = controls.value(id) else {
            panic!("picker should hold a color");
        };
        assert!(r.abs() < 1e-9 && (g - 1.0).abs() < 1e-9 && b.abs() < 1e-9);
    }

    #[test]
    fn color_picker_wheel_adjusts_lightness() {
        let mut controls = ControlSet::new();
        let id = controls.color_picker("Spot color", 'C', &0.5.into()).unwrap();
        controls.dispatch(InputEvent::KeyDown('C'));
        controls.dispatch(InputEvent::Wheel { delta_y: 1200.0 });
        let ControlValue::Color([r, g, b]) = controls.value(id) else {
            panic!("picker should hold a color");
        };
        assert!((r - 0.6).abs() < 1e-9, "lightness should rise by 0.1, got {r}");
        assert_eq!(r, g);
        assert_eq!(g, b);
    }
}
