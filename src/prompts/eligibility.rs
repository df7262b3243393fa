//! Eligibility screening prompt.
//!
//! The model sees only trial ids, titles and eligibility criteria, so the
//! judgment stays on inclusion/exclusion logic rather than relevance.

use super::render;

/// Placeholders: {patient_profile}, {trials_json}
pub const ELIGIBILITY_PROMPT_TEMPLATE: &str = r#"You are a clinical trial eligibility screener. Decide, for each trial below, whether the patient meets its eligibility criteria.

Rules you MUST follow:
- Judge ONLY against the eligibility criteria text of each trial and the patient information given.
- Do NOT invent patient facts. Missing information is not evidence of ineligibility.
- "eligible": the patient clearly satisfies the inclusion criteria and no exclusion criterion applies.
- "uncertain": eligibility depends on information the patient data does not contain, or criteria are ambiguous.
- Leave a trial out of both lists when the patient clearly fails an inclusion criterion or meets an exclusion criterion.
- A trial id may appear in at most one list. Use the ids exactly as given.

{patient_profile}

CANDIDATE TRIALS (JSON):
{trials_json}

Output strict JSON only (no markdown code blocks, no extra text):
{
  "eligible_trial_ids": ["NCT..."],
  "uncertain_trial_ids": ["NCT..."]
}"#;

pub fn build_eligibility_prompt(patient_profile: &str, trials_json: &str) -> String {
    render(
        ELIGIBILITY_PROMPT_TEMPLATE,
        &[("patient_profile", patient_profile), ("trials_json", trials_json)],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_eligibility_prompt() {
        let prompt = build_eligibility_prompt("PATIENT PROFILE:\n- Age: 44", r#"[{"id": "NCT1"}]"#);
        assert!(prompt.contains("- Age: 44"));
        assert!(prompt.contains(r#"[{"id": "NCT1"}]"#));
        assert!(prompt.contains("\"eligible_trial_ids\""));
        assert!(prompt.contains("\"uncertain_trial_ids\""));
        assert!(!prompt.contains("{patient_profile}"));
    }
}
