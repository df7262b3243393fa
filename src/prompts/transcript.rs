//! Transcript extraction prompt.

use super::render;

/// Placeholder: {raw_transcript}
pub const TRANSCRIPT_PROMPT_TEMPLATE: &str = r#"You are a medical transcript analyzer. Extract structured information from the clinical transcript below.

Rules you MUST follow:
- conditions: only diagnoses explicitly confirmed by the provider or patient; no suspected or possible diagnoses.
- medications: only medications actually prescribed, administered or recommended; names only, no dosages.
- procedures: only procedures actually performed or recommended.
- age: integer years if stated. sex: "MALE" or "FEMALE" if stated.
- Positive symptoms are experienced; negative symptoms are denied. Positive lab/imaging results are abnormal; negative ones are normal.
- Use empty arrays or null for anything not mentioned. Do not guess.

Output strict JSON only (no markdown code blocks, no extra text):
{
  "conditions": [], "medications": [], "procedures": [],
  "age": null, "sex": null,
  "location": {"city": null, "state": null, "country": null, "zip_code": null},
  "positive_symptoms": [], "negative_symptoms": [],
  "positive_lab_results": [], "negative_lab_results": [],
  "positive_imaging_results": [], "negative_imaging_results": [],
  "past_diagnoses": [], "past_surgeries": [], "family_history": [],
  "positive_lifestyle_factors": [], "negative_lifestyle_factors": [],
  "extraction_notes": []
}

TRANSCRIPT:
{raw_transcript}"#;

pub fn build_transcript_prompt(raw_transcript: &str) -> String {
    render(TRANSCRIPT_PROMPT_TEMPLATE, &[("raw_transcript", raw_transcript)])
}
