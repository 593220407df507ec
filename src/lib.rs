//! Composable visual-stimulus programs for vision research rigs.
//!
//! A stimulus is a tree of components: patterns-in-field ([`component::Pif`])
//! composed with motions, temporal modulations, and spatial warps. Booting
//! walks the tree once, children first, and each node contributes exactly one
//! GLSL function plus its uniform parameters to a [`program::PassProgram`].
//! The assembled fragment program is validated with naga before anything
//! reaches a GPU.
//!
//! Parameters may reference interactive controls ([`controls`]) instead of
//! literal values; the [`binding`] layer re-resolves and re-pushes an owning
//! parameter group whenever one of its controls moves.
//!
//! Stimuli are authored either directly against the builders (see
//! [`stimulus::SingleShape`]) or as JSON documents loaded by [`dsl`].

pub mod binding;
pub mod color;
pub mod component;
pub mod controls;
pub mod direction;
pub mod dsl;
pub mod escape;
pub mod program;
pub mod stimulus;
pub mod target;
pub mod types;
pub mod validation;
