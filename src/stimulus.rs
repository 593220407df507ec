//! Stimulus recipes: turn a component tree into a booted, playable pass.
//!
//! [`Generic`] takes an arbitrary pif for the image and one for the alpha
//! mask. [`SingleShape`] is the common arrangement, a shape over a pattern
//! over a background with per-slot motion, one warp, and a temporal
//! modulation; it builds the composite tree and delegates to [`Generic`].

use anyhow::Result;

use crate::binding::{Bindings, BootContext};
use crate::component::pif::Solid;
use crate::component::{Modulation, Motion, Pif, Warp};
use crate::controls::{ControlSet, InputEvent};
use crate::program::PassProgram;
use crate::target::ShaderTarget;
use crate::types::{EventLog, SequenceInfo, SourceLocation};

/// Play length of a stimulus.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Duration {
    Frames(u32),
    Seconds(f64),
}

impl Default for Duration {
    fn default() -> Self {
        Duration::Frames(1)
    }
}

const FRAGMENT_MAIN: &str = "\
layout (location = 0) in vec2 pos;
layout (location = 0) out vec4 outColor;

void main(){
    outColor = vec4(fig(pos, time), alphaMask(pos, time).x);
}
";

/// A booted stimulus: the assembled program plus the live control state
/// driving it.
#[derive(Debug)]
pub struct Stimulus {
    pub program: PassProgram,
    pub controls: ControlSet,
    pub bindings: Bindings,
    pub log: EventLog,
}

impl Stimulus {
    /// Feed one input event at playback time `time_s`. Any control the event
    /// moves has its whole owning parameter group re-resolved and pushed.
    pub fn handle_event(&mut self, event: InputEvent, time_s: f64) -> Result<()> {
        let changed = self.controls.dispatch(event);
        if changed.is_empty() {
            return Ok(());
        }
        self.bindings
            .refresh_changed(&mut self.program, &self.controls, &mut self.log, time_s, &changed)
    }

    pub fn is_interactive(&self) -> bool {
        !self.bindings.is_empty()
    }
}

/// An arbitrary pif rendered over the whole field, with a second pif
/// supplying opacity for pass compositing.
#[derive(Debug, Clone)]
pub struct Generic {
    pub name: String,
    pub duration: Duration,
    pub pif: Pif,
    pub alpha_mask: Pif,
}

impl Default for Generic {
    fn default() -> Self {
        Generic {
            name: "stimulus".into(),
            duration: Duration::default(),
            pif: Solid::default().into(),
            alpha_mask: Solid { color: 0.5.into() }.into(),
        }
    }
}

impl Generic {
    pub fn boot(
        &self,
        sequence: &SequenceInfo,
        controls: ControlSet,
        at: &SourceLocation,
    ) -> Result<Stimulus> {
        log::info!("booting stimulus '{}'", self.name);
        let mut program = match self.duration {
            Duration::Seconds(s) => PassProgram::new(sequence, s),
            Duration::Frames(frames) => {
                let mut program = PassProgram::new(sequence, 0.0);
                program.set_duration_frames(frames);
                program
            }
        };
        let mut bindings = Bindings::default();
        let mut log = EventLog::default();
        {
            let mut ctx = BootContext {
                controls: &controls,
                bindings: &mut bindings,
                log: &mut log,
                time_s: 0.0,
            };
            self.pif
                .apply(&mut program, &mut ctx, "fig", &at.child("pif"))?;
            self.alpha_mask
                .apply(&mut program, &mut ctx, "alphaMask", &at.child("alphaMask"))?;
        }
        program.set_main_source(FRAGMENT_MAIN);
        Ok(Stimulus {
            program,
            controls,
            bindings,
            log,
        })
    }
}

/// A shape blending a pattern over a background, each slot warped and moved
/// on its own, the whole thing modulated over time.
#[derive(Debug, Clone)]
pub struct SingleShape {
    pub name: String,
    pub duration: Duration,
    pub shape: Pif,
    pub shape_motion: Motion,
    pub pattern: Pif,
    pub pattern_motion: Motion,
    pub background: Pif,
    pub background_motion: Motion,
    pub modulation: Modulation,
    pub warp: Warp,
}

impl Default for SingleShape {
    fn default() -> Self {
        SingleShape {
            name: "stimulus".into(),
            duration: Duration::default(),
            shape: Solid::default().into(),
            shape_motion: Motion::default(),
            pattern: Solid::default().into(),
            pattern_motion: Motion::default(),
            background: Solid {
                color: "black".into(),
            }
            .into(),
            background_motion: Motion::default(),
            modulation: Modulation::default(),
            warp: Warp::default(),
        }
    }
}

impl SingleShape {
    pub fn boot(
        &self,
        sequence: &SequenceInfo,
        controls: ControlSet,
        at: &SourceLocation,
    ) -> Result<Stimulus> {
        let pif = self
            .shape
            .clone()
            .warped(self.warp.clone())
            .moved(self.shape_motion.clone())
            .mix(
                self.pattern
                    .clone()
                    .warped(self.warp.clone())
                    .moved(self.pattern_motion.clone()),
                self.background
                    .clone()
                    .warped(self.warp.clone())
                    .moved(self.background_motion.clone()),
            )
            .modulated(self.modulation.clone());
        Generic {
            name: self.name.clone(),
            duration: self.duration,
            pif,
            alpha_mask: Solid { color: 0.5.into() }.into(),
        }
        .boot(sequence, controls, at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::pif::Spot;
    use std::collections::HashSet;

    #[test]
    fn single_shape_builds_one_function_per_tree_node() {
        let stimulus = SingleShape::default()
            .boot(
                &SequenceInfo::default(),
                ControlSet::new(),
                &SourceLocation::new("stimulus"),
            )
            .unwrap();
        let order = stimulus.program.function_order();
        assert_eq!(
            order,
            [
                "fig_modulated_shape_moved_warped",
                "fig_modulated_shape_moved_warp",
                "fig_modulated_shape_moved",
                "fig_modulated_shape_pose",
                "fig_modulated_shape",
                "fig_modulated_foreground_moved_warped",
                "fig_modulated_foreground_moved_warp",
                "fig_modulated_foreground_moved",
                "fig_modulated_foreground_pose",
                "fig_modulated_foreground",
                "fig_modulated_background_moved_warped",
                "fig_modulated_background_moved_warp",
                "fig_modulated_background_moved",
                "fig_modulated_background_pose",
                "fig_modulated_background",
                "fig_modulated",
                "fig_modulator",
                "fig",
                "alphaMask",
            ]
        );
        let unique: HashSet<&String> = order.iter().collect();
        assert_eq!(unique.len(), order.len());
        assert!(stimulus.program.fragment_source().contains("void main()"));
    }

    #[test]
    fn the_root_function_multiplies_image_by_modulator() {
        let stimulus = SingleShape::default()
            .boot(
                &SequenceInfo::default(),
                ControlSet::new(),
                &SourceLocation::new("stimulus"),
            )
            .unwrap();
        assert_eq!(
            stimulus.program.functions()["fig"],
            "vec3 fig (vec2 x, float time){\n    return fig_modulated(x, time) * fig_modulator(time);\n}\n"
        );
    }

    #[test]
    fn wheel_input_refreshes_the_owning_parameter_group() {
        let mut controls = ControlSet::new();
        let radius = controls.wheel("Radius", 'R', 300.0, 0.0, 1000.0, 0.0);
        let recipe = SingleShape {
            shape: Spot {
                radius_um: radius.into(),
                ..Spot::default()
            }
            .into(),
            ..SingleShape::default()
        };
        let mut stimulus = recipe
            .boot(
                &SequenceInfo::default(),
                controls,
                &SourceLocation::new("stimulus"),
            )
            .unwrap();
        assert!(stimulus.is_interactive());
        assert!(stimulus
            .log
            .entries()
            .contains(&"@0 s: Radius = 300".to_string()));
        assert_eq!(
            stimulus.program.vectors()["fig_modulated_shape_moved_warped_spotRadius"],
            [300.0, -1000.0]
        );

        stimulus.handle_event(InputEvent::KeyDown('R'), 1.0).unwrap();
        stimulus
            .handle_event(InputEvent::Wheel { delta_y: 120.0 }, 1.5)
            .unwrap();
        assert_eq!(
            stimulus.program.vectors()["fig_modulated_shape_moved_warped_spotRadius"],
            [310.0, -1000.0]
        );
        assert!(stimulus
            .log
            .entries()
            .contains(&"@1.5 s: Radius = 310".to_string()));
    }

    #[test]
    fn duration_in_frames_is_used_verbatim() {
        let recipe = Generic {
            duration: Duration::Frames(250),
            ..Generic::default()
        };
        let stimulus = recipe
            .boot(
                &SequenceInfo::default(),
                ControlSet::new(),
                &SourceLocation::new("stimulus"),
            )
            .unwrap();
        assert_eq!(stimulus.program.duration_frames(), 250);
    }
}
