use proptest::prelude::*;

use stimforge::escape::{expand, glsl_esc, render};

proptest! {
    // Text containing none of the rewrite patterns passes through untouched.
    #[test]
    fn pattern_free_text_is_a_fixed_point(src in "[a-zA-Z0-9_ ();.,*+=/-]{0,64}") {
        prop_assert_eq!(glsl_esc(&src), src);
    }

    // Literal braces get doubled and collapse back, balanced or not.
    #[test]
    fn braces_survive_escape_then_render(src in "[a-z{} ();=.]{0,64}") {
        prop_assert_eq!(render(&glsl_esc(&src), &[]).unwrap(), src.clone());
    }

    // The function-name marker resolves wherever it sits in the template.
    #[test]
    fn the_function_name_marker_resolves_anywhere(
        head in "[a-z ();=.]{0,16}",
        tail in "[a-z ();=.]{0,16}",
        name in "[a-z][a-z0-9_]{0,12}",
    ) {
        let template = format!("{head}@<X>@{tail}");
        prop_assert_eq!(expand(&template, &name).unwrap(), format!("{head}{name}{tail}"));
    }

    // Backticked parameters always pick up the function-name prefix.
    #[test]
    fn backticks_prefix_the_function_name(
        name in "[a-z][a-zA-Z0-9_]{0,12}",
        param in "[a-z][a-zA-Z0-9]{0,8}",
    ) {
        prop_assert_eq!(
            expand(&format!("`{param}"), &name).unwrap(),
            format!("{name}_{param}")
        );
    }
}

#[test]
fn the_escape_pass_never_rescans_replacements() {
    // A substitution brace born from "@<" sits next to a literal one; only
    // the literal brace may double.
    assert_eq!(glsl_esc("{@<X>@}"), "{{{X}}}");
    assert_eq!(render(&glsl_esc("{@<X>@}"), &[("X", "fig")]).unwrap(), "{fig}");
}
