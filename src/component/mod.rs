//! Shader-graph components.
//!
//! A stimulus is a tree of components. Applying the root walks the tree
//! children first, so every helper function is already emitted when the
//! source calling it arrives at the target. Child functions are named by
//! composing the parent's function name with the child's [`Stage`] suffix;
//! suffixes differ between siblings, so two distinct tree positions can
//! never produce the same name.

pub mod modulation;
pub mod motion;
pub mod pif;
pub mod warp;

pub use modulation::Modulation;
pub use motion::Motion;
pub use pif::Pif;
pub use warp::{TimeWarp, Warp};

/// Role of a child inside its parent composite. Closed set; every composite
/// names its children with these and nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Op1,
    Op2,
    Shape,
    Background,
    Foreground,
    Moved,
    Pose,
    Warp,
    Warped,
    Modulated,
    Modulator,
}

impl Stage {
    pub fn suffix(self) -> &'static str {
        match self {
            Stage::Op1 => "_op1",
            Stage::Op2 => "_op2",
            Stage::Shape => "_shape",
            Stage::Background => "_background",
            Stage::Foreground => "_foreground",
            Stage::Moved => "_moved",
            Stage::Pose => "_pose",
            Stage::Warp => "_warp",
            Stage::Warped => "_warped",
            Stage::Modulated => "_modulated",
            Stage::Modulator => "_modulator",
        }
    }
}

/// GLSL function name for the `stage` child of the function named `parent`.
pub fn compose(parent: &str, stage: Stage) -> String {
    format!("{parent}{}", stage.suffix())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_names_nest() {
        let moved = compose("fig", Stage::Moved);
        assert_eq!(moved, "fig_moved");
        assert_eq!(compose(&moved, Stage::Shape), "fig_moved_shape");
    }
}
