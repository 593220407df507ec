//! Sink interface for generated shader fragments and uniform values.

use crate::types::SequenceInfo;

/// Receiver of the shader functions, uniform values, and playback settings
/// produced while a component tree is applied.
///
/// The composition protocol guarantees that every child function arrives
/// before the function whose source calls it, and that each function name
/// arrives at most once per program.
pub trait ShaderTarget {
    fn set_shader_function(&mut self, name: &str, src: &str);
    fn set_shader_variable(&mut self, name: &str, value: f64);
    fn set_shader_vector(&mut self, name: &str, x: f64, y: f64);
    fn set_shader_color(&mut self, name: &str, color: [f64; 3]);
    fn set_shader_image(&mut self, name: &str, path: &str);

    /// Switch the output from greyscale to full color. Targets that only
    /// render greyscale may ignore this.
    fn enable_color_mode(&mut self) {}

    /// Geometry and timing of the owning sequence.
    fn sequence(&self) -> &SequenceInfo;

    fn duration_frames(&self) -> u32;

    /// Components that derive their own play time may adjust the duration.
    fn set_duration_frames(&mut self, _frames: u32) {}

    /// Play time in seconds.
    fn duration_s(&self) -> f64 {
        f64::from(self.duration_frames()) * self.sequence().frame_interval_s
    }
}
