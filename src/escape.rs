//! Template escaping for GLSL shader fragments.
//!
//! Shader templates are authored with GLSL's own braces left intact, `@<...>@`
//! marking structural substitution, and a backtick prefixing uniform names
//! that belong to the emitted function. A single escaping pass rewrites a
//! template into `{name}`-substitution form without the two brace uses
//! colliding.

use anyhow::{Result, bail};

/// The rewrite table. All patterns are matched simultaneously in one
/// left-to-right pass; replacements are never rescanned, so the `{` produced
/// from `@<` stays a substitution brace while literal braces get doubled.
const PATTERNS: [(&str, &str); 5] = [
    ("{", "{{"),
    ("}", "}}"),
    ("@<", "{"),
    (">@", "}"),
    ("`", "{X}_"),
];

/// Rewrite a GLSL template into `{name}`-substitution form.
///
/// No validation happens here: an unbalanced `@<` yields malformed GLSL that
/// surfaces at shader validation, not at escaping time.
pub fn glsl_esc(template: &str) -> String {
    let mut out = String::with_capacity(template.len() + 16);
    let mut rest = template;
    'scan: while !rest.is_empty() {
        for (pat, rep) in PATTERNS {
            if let Some(tail) = rest.strip_prefix(pat) {
                out.push_str(rep);
                rest = tail;
                continue 'scan;
            }
        }
        let mut chars = rest.chars();
        if let Some(ch) = chars.next() {
            out.push(ch);
            rest = chars.as_str();
        }
    }
    out
}

/// Substitute `{name}` placeholders and collapse doubled braces.
pub fn render(template: &str, vars: &[(&str, &str)]) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    loop {
        let Some(pos) = rest.find(['{', '}']) else {
            out.push_str(rest);
            return Ok(out);
        };
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if let Some(t) = tail.strip_prefix("{{") {
            out.push('{');
            rest = t;
        } else if let Some(t) = tail.strip_prefix("}}") {
            out.push('}');
            rest = t;
        } else if let Some(t) = tail.strip_prefix('{') {
            let Some(end) = t.find('}') else {
                bail!("unterminated placeholder in template");
            };
            let name = &t[..end];
            let Some((_, value)) = vars.iter().find(|(k, _)| *k == name) else {
                bail!("template references unknown placeholder {{{name}}}");
            };
            out.push_str(value);
            rest = &t[end + 1..];
        } else {
            bail!("unmatched '}}' in template");
        }
    }
}

/// Escape a template and bind its function-name placeholder in one step.
///
/// This is what component emitters call: `@<X>@` becomes the function name
/// and `` `param `` becomes `name_param`.
pub fn expand(template: &str, function_name: &str) -> Result<String> {
    render(&glsl_esc(template), &[("X", function_name)])
}
