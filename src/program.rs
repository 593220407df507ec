//! Accumulates one render pass worth of shader state and assembles the
//! final GLSL sources.
//!
//! Components never concatenate program text themselves; they call the
//! [`ShaderTarget`] setters and this type owns layout: one uniform block at
//! binding 1 holding every scalar, vector, and color parameter, samplers
//! from binding 2 up, function definitions in application order, then the
//! pass's main source.

use std::collections::{BTreeMap, HashMap};

use crate::target::ShaderTarget;
use crate::types::SequenceInfo;

/// A texture registered for sampling, with its eventual binding slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderImage {
    pub name: String,
    pub path: String,
}

const VERTEX_MAIN: &str = "\
layout (location = 0) out vec2 pos;

void main(){
    vec2 corner = vec2(float(gl_VertexIndex & 1), float(gl_VertexIndex / 2)) * 2.0 - vec2(1.0, 1.0);
    gl_Position = vec4(corner, 0.5, 1.0);
    pos = corner * (patternSizeOnRetina / 2.0);
}
";

/// Shader state for one fullscreen pass.
#[derive(Debug)]
pub struct PassProgram {
    sequence: SequenceInfo,
    duration_frames: u32,
    functions: HashMap<String, String>,
    function_order: Vec<String>,
    // BTreeMaps so the uniform block layout is stable across runs
    variables: BTreeMap<String, f64>,
    vectors: BTreeMap<String, [f64; 2]>,
    colors: BTreeMap<String, [f64; 3]>,
    images: Vec<ShaderImage>,
    main_source: String,
    color_mode: bool,
}

impl PassProgram {
    pub fn new(sequence: &SequenceInfo, duration_s: f64) -> Self {
        PassProgram {
            sequence: sequence.clone(),
            duration_frames: sequence.duration_frames(duration_s),
            functions: HashMap::new(),
            function_order: Vec::new(),
            variables: BTreeMap::new(),
            vectors: BTreeMap::new(),
            colors: BTreeMap::new(),
            images: Vec::new(),
            main_source: String::new(),
            color_mode: false,
        }
    }

    /// The `main` entry point source, appended verbatim after the generated
    /// functions. Set by the pass recipe once the component tree is applied.
    pub fn set_main_source(&mut self, src: impl Into<String>) {
        self.main_source = src.into();
    }

    pub fn functions(&self) -> &HashMap<String, String> {
        &self.functions
    }

    /// Function names in first-application order.
    pub fn function_order(&self) -> &[String] {
        &self.function_order
    }

    pub fn variables(&self) -> &BTreeMap<String, f64> {
        &self.variables
    }

    pub fn vectors(&self) -> &BTreeMap<String, [f64; 2]> {
        &self.vectors
    }

    pub fn colors(&self) -> &BTreeMap<String, [f64; 3]> {
        &self.colors
    }

    pub fn images(&self) -> &[ShaderImage] {
        &self.images
    }

    /// True once any component registered a non-greyscale color or an image.
    pub fn color_mode(&self) -> bool {
        self.color_mode
    }

    pub fn duration_frames(&self) -> u32 {
        self.duration_frames
    }

    pub fn duration_s(&self) -> f64 {
        self.duration_frames as f64 * self.sequence.frame_interval_s
    }

    fn uniform_block(&self) -> String {
        let mut block = String::from("layout (binding = 1) uniform commonUniformBlock {\n");
        block.push_str("    vec2 patternSizeOnRetina;\n");
        block.push_str("    int frame;\n");
        block.push_str("    float time;\n");
        for name in self.colors.keys() {
            block.push_str(&format!("    vec3 {name};\n"));
        }
        for name in self.vectors.keys() {
            block.push_str(&format!("    vec2 {name};\n"));
        }
        for name in self.variables.keys() {
            block.push_str(&format!("    float {name};\n"));
        }
        block.push_str("};\n");
        block
    }

    fn sampler_declarations(&self) -> String {
        let mut decls = String::new();
        for (slot, image) in self.images.iter().enumerate() {
            decls.push_str(&format!(
                "layout (binding = {}) uniform sampler2D {};\n",
                slot + 2,
                image.name
            ));
        }
        decls
    }

    /// The complete fragment shader for this pass.
    pub fn fragment_source(&self) -> String {
        let mut source = String::from("#version 450\n");
        source.push_str(&self.uniform_block());
        source.push_str(&self.sampler_declarations());
        source.push('\n');
        for name in &self.function_order {
            source.push_str(&self.functions[name]);
            source.push('\n');
        }
        source.push_str(&self.main_source);
        source
    }

    /// The matching fullscreen vertex shader: a 4-vertex triangle strip with
    /// positions handed to the fragment stage in retinal micrometers.
    pub fn vertex_source(&self) -> String {
        let mut source = String::from("#version 450\n");
        source.push_str(&self.uniform_block());
        source.push('\n');
        source.push_str(VERTEX_MAIN);
        source
    }
}

impl ShaderTarget for PassProgram {
    fn set_shader_function(&mut self, name: &str, src: &str) {
        if !self.functions.contains_key(name) {
            self.function_order.push(name.to_string());
        }
        self.functions.insert(name.to_string(), src.to_string());
    }

    fn set_shader_variable(&mut self, name: &str, value: f64) {
        self.variables.insert(name.to_string(), value);
    }

    fn set_shader_vector(&mut self, name: &str, x: f64, y: f64) {
        self.vectors.insert(name.to_string(), [x, y]);
    }

    fn set_shader_color(&mut self, name: &str, rgb: [f64; 3]) {
        self.colors.insert(name.to_string(), rgb);
    }

    fn set_shader_image(&mut self, name: &str, path: &str) {
        if let Some(existing) = self.images.iter_mut().find(|i| i.name == name) {
            existing.path = path.to_string();
            return;
        }
        self.images.push(ShaderImage {
            name: name.to_string(),
            path: path.to_string(),
        });
    }

    fn enable_color_mode(&mut self) {
        self.color_mode = true;
    }

    fn sequence(&self) -> &SequenceInfo {
        &self.sequence
    }

    fn duration_frames(&self) -> u32 {
        self.duration_frames
    }

    fn set_duration_frames(&mut self, frames: u32) {
        self.duration_frames = frames;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_block_members_are_grouped_and_sorted() {
        let mut program = PassProgram::new(&SequenceInfo::default(), 1.0);
        program.set_shader_variable("b_value", 1.0);
        program.set_shader_variable("a_value", 2.0);
        program.set_shader_vector("span", 1.0, 0.0);
        program.set_shader_color("tint", [1.0, 0.0, 1.0]);
        let block = program.uniform_block();
        let members: Vec<&str> = block.lines().map(str::trim).collect();
        assert_eq!(
            members,
            [
                "layout (binding = 1) uniform commonUniformBlock {",
                "vec2 patternSizeOnRetina;",
                "int frame;",
                "float time;",
                "vec3 tint;",
                "vec2 span;",
                "float a_value;",
                "float b_value;",
                "};",
            ]
        );
    }

    #[test]
    fn functions_are_emitted_in_first_set_order() {
        let mut program = PassProgram::new(&SequenceInfo::default(), 1.0);
        program.set_shader_function("fig_shape", "vec3 fig_shape(vec2 x, float time){ return vec3(1.0, 1.0, 1.0); }\n");
        program.set_shader_function("fig", "vec3 fig(vec2 x, float time){ return fig_shape(x, time); }\n");
        // redefinition keeps the original slot
        program.set_shader_function("fig_shape", "vec3 fig_shape(vec2 x, float time){ return vec3(0.0, 0.0, 0.0); }\n");
        assert_eq!(program.function_order(), ["fig_shape", "fig"]);
        let source = program.fragment_source();
        let shape_at = source.find("vec3 fig_shape").unwrap();
        let fig_at = source.find("vec3 fig(").unwrap();
        assert!(shape_at < fig_at, "{source}");
        assert!(source.contains("return vec3(0.0, 0.0, 0.0);"));
    }

    #[test]
    fn samplers_take_bindings_above_the_uniform_block() {
        let mut program = PassProgram::new(&SequenceInfo::default(), 1.0);
        program.set_shader_image("fig_image", "scene.png");
        program.set_shader_image("alphaMask_image", "mask.png");
        let source = program.fragment_source();
        assert!(source.contains("layout (binding = 2) uniform sampler2D fig_image;"));
        assert!(source.contains("layout (binding = 3) uniform sampler2D alphaMask_image;"));
    }

    #[test]
    fn duration_rounds_to_whole_frames() {
        let seq = SequenceInfo {
            frame_interval_s: 0.1,
            ..SequenceInfo::default()
        };
        let program = PassProgram::new(&seq, 2.0);
        assert_eq!(program.duration_frames(), 21);
        assert_eq!(program.duration_s(), 2.1);
    }
}
