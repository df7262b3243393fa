//! Relevance ranking prompt, issued once per non-empty partition.

use super::render;

/// Placeholders: {label}, {patient_profile}, {trials_json}
pub const RANKING_PROMPT_TEMPLATE: &str = r#"You are a clinical research coordinator. The trials below were screened as "{label}" for this patient. Order them by how relevant each trial is to the patient's conditions, treatment history and clinical picture.

Rules you MUST follow:
- Return the given trial ids only, most relevant first, each at most once.
- You MAY omit a trial that is clearly irrelevant to the patient.
- Use the ids exactly as given.

{patient_profile}

TRIALS TO RANK (JSON):
{trials_json}

Output strict JSON only (no markdown code blocks, no extra text):
{
  "ranked_trial_ids": ["NCT..."]
}"#;

pub fn build_ranking_prompt(label: &str, patient_profile: &str, trials_json: &str) -> String {
    render(
        RANKING_PROMPT_TEMPLATE,
        &[
            ("label", label),
            ("patient_profile", patient_profile),
            ("trials_json", trials_json),
        ],
    )
}
