//! Prompt module for LLM-based operations.
//!
//! Templates use `{name}` placeholders filled by [`render`].

pub mod eligibility;
pub mod profile;
pub mod ranking;
pub mod transcript;

pub use profile::{format_patient_profile, format_patient_profile_as_of};

/// Fill `{name}` placeholders in one pass over the template, so braces inside
/// substituted values are never expanded again.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len() + vars.iter().map(|(_, v)| v.len()).sum::<usize>());
    let mut rest = template;

    loop {
        let next = vars
            .iter()
            .filter_map(|(name, value)| {
                let placeholder = format!("{{{}}}", name);
                rest.find(&placeholder).map(|pos| (pos, placeholder.len(), *value))
            })
            .min_by_key(|(pos, _, _)| *pos);

        match next {
            Some((pos, len, value)) => {
                out.push_str(&rest[..pos]);
                out.push_str(value);
                rest = &rest[pos + len..];
            }
            None => {
                out.push_str(rest);
                return out;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_single_pass() {
        let out = render("A={a} B={b} A={a}", &[("a", "{b}"), ("b", "2")]);
        assert_eq!(out, "A={b} B=2 A={b}");
    }

    #[test]
    fn test_render_leaves_unknown_braces() {
        assert_eq!(render("{\"x\": {y}}", &[("y", "1")]), "{\"x\": 1}");
    }
}
