//! GLSL validation using the naga library.
//!
//! Generated programs are checked here at boot instead of at GPU compile
//! time, so a bad template or a name collision surfaces with the assembled
//! source attached rather than as a driver error during playback.

use anyhow::{anyhow, Context, Result};

#[derive(Debug, Clone, Copy)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

/// Parse and validate one GLSL shader.
///
/// # Arguments
/// * `source` - The GLSL source code to validate
/// * `stage` - Which pipeline stage the source targets
///
/// # Returns
/// The parsed naga Module on success, or an error carrying the numbered
/// source on failure.
pub fn validate_glsl(source: &str, stage: ShaderStage) -> Result<naga::Module> {
    let shader_stage = match stage {
        ShaderStage::Vertex => naga::ShaderStage::Vertex,
        ShaderStage::Fragment => naga::ShaderStage::Fragment,
    };

    let mut parser = naga::front::glsl::Frontend::default();
    let options = naga::front::glsl::Options {
        stage: shader_stage,
        defines: Default::default(),
    };

    let module = parser
        .parse(&options, source)
        .map_err(|e| anyhow!("GLSL parse failed:\n{}", format_shader_error(source, &format!("{e:?}"))))?;

    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|e| anyhow!("GLSL validation failed:\n{}", format_shader_error(source, &format!("{e:?}"))))?;

    Ok(module)
}

/// Validate GLSL and say which stimulus generated it on failure.
pub fn validate_glsl_with_context(
    source: &str,
    stage: ShaderStage,
    context: &str,
) -> Result<naga::Module> {
    validate_glsl(source, stage).with_context(|| format!("{context} generated invalid GLSL"))
}

/// Format a shader error with the numbered source for easier debugging.
fn format_shader_error(source: &str, error: &str) -> String {
    let mut output = String::new();

    output.push_str(&format!("  {error}\n"));
    output.push_str("\nGenerated GLSL:\n");
    output.push_str("---\n");

    for (line_num, line) in source.lines().enumerate() {
        output.push_str(&format!("{:4} | {}\n", line_num + 1, line));
    }
    output.push_str("---\n");

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_fragment() {
        let source = r#"#version 450
layout (location = 0) in vec2 pos;
layout (location = 0) out vec4 outColor;

vec3 fig(vec2 x, float time){
    return vec3(x, time);
}

void main(){
    outColor = vec4(fig(pos, 0.0), 1.0);
}
"#;
        assert!(validate_glsl(source, ShaderStage::Fragment).is_ok());
    }

    #[test]
    fn test_invalid_syntax() {
        let source = "#version 450\nvoid main({ return; }\n";
        assert!(validate_glsl(source, ShaderStage::Fragment).is_err());
    }

    #[test]
    fn test_error_carries_numbered_source() {
        let source = "#version 450\nbad source\n";
        let err = format!(
            "{:#}",
            validate_glsl(source, ShaderStage::Fragment).unwrap_err()
        );
        assert!(err.contains("   2 | bad source"), "{err}");
    }

    #[test]
    fn test_validate_with_context() {
        let source = "not glsl";
        let result = validate_glsl_with_context(source, ShaderStage::Fragment, "stimulus 'spot'");
        assert!(result.is_err());
        let err_msg = format!("{:#}", result.unwrap_err());
        assert!(err_msg.contains("stimulus 'spot'"));
    }
}
