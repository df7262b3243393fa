//! Patient summary embedded in the eligibility and ranking prompts.
//!
//! Output is deterministic for a given patient, transcript and date: fixed
//! section order, list entries de-duplicated case-insensitively with the first
//! spelling kept. Patient record fields win over values the transcript states.

use crate::domain::{PatientProfile, StructuredTranscript};
use chrono::{NaiveDate, Utc};
use std::collections::HashSet;

const NONE_REPORTED: &str = "- None reported";

/// Summary as of today (UTC).
pub fn format_patient_profile(patient: &PatientProfile, transcript: &StructuredTranscript) -> String {
    format_patient_profile_as_of(patient, transcript, Utc::now().date_naive())
}

pub fn format_patient_profile_as_of(
    patient: &PatientProfile,
    transcript: &StructuredTranscript,
    as_of: NaiveDate,
) -> String {
    let mut sections = Vec::with_capacity(6);

    let age = patient.age_on(as_of).or(transcript.age);
    let sex = patient.sex.as_deref().or(transcript.sex.as_deref());
    let location = if patient.location.is_empty() {
        transcript.location.as_ref().map(|l| l.summary())
    } else {
        Some(patient.location.summary())
    };
    let name = patient.full_name();

    let mut profile = Vec::new();
    if !name.is_empty() {
        profile.push(format!("- Name: {}", name));
    }
    if let Some(age) = age {
        profile.push(format!("- Age: {}", age));
    }
    if let Some(sex) = sex {
        profile.push(format!("- Sex: {}", sex));
    }
    if let Some(location) = location.filter(|l| !l.is_empty()) {
        profile.push(format!("- Location: {}", location));
    }
    sections.push(section("PATIENT PROFILE:", profile));

    let conditions = dedup(&transcript.conditions, &[]);
    let past_diagnoses = dedup(&transcript.past_diagnoses, &conditions);
    sections.push(section(
        "MEDICAL INFORMATION:",
        vec![
            line("Current conditions", &conditions),
            line("Current medications", &dedup(&transcript.medications, &[])),
            line("Procedures", &dedup(&transcript.procedures, &[])),
            line("Past diagnoses", &past_diagnoses),
            line("Past surgeries", &dedup(&transcript.past_surgeries, &[])),
            line("Family history", &dedup(&transcript.family_history, &[])),
        ]
        .into_iter()
        .flatten()
        .collect(),
    ));

    sections.push(section(
        "SYMPTOMS:",
        vec![
            line("Reported symptoms", &dedup(&transcript.positive_symptoms, &[])),
            line("Denied symptoms", &dedup(&transcript.negative_symptoms, &[])),
        ]
        .into_iter()
        .flatten()
        .collect(),
    ));

    sections.push(section(
        "LAB & IMAGING RESULTS:",
        vec![
            line("Abnormal lab results", &dedup(&transcript.positive_lab_results, &[])),
            line("Normal lab results", &dedup(&transcript.negative_lab_results, &[])),
            line("Abnormal imaging", &dedup(&transcript.positive_imaging_results, &[])),
            line("Normal imaging", &dedup(&transcript.negative_imaging_results, &[])),
        ]
        .into_iter()
        .flatten()
        .collect(),
    ));

    sections.push(section(
        "LIFESTYLE FACTORS:",
        vec![
            line("Protective factors", &dedup(&transcript.positive_lifestyle_factors, &[])),
            line("Risk factors", &dedup(&transcript.negative_lifestyle_factors, &[])),
        ]
        .into_iter()
        .flatten()
        .collect(),
    ));

    sections.push(section(
        "EXTRACTION NOTES:",
        dedup(&transcript.extraction_notes, &[])
            .into_iter()
            .map(|note| format!("- {}", note))
            .collect(),
    ));

    sections.join("\n\n")
}

fn section(title: &str, lines: Vec<String>) -> String {
    if lines.is_empty() {
        format!("{}\n{}", title, NONE_REPORTED)
    } else {
        format!("{}\n{}", title, lines.join("\n"))
    }
}

fn line(label: &str, items: &[String]) -> Option<String> {
    (!items.is_empty()).then(|| format!("- {}: {}", label, items.join(", ")))
}

/// Case-insensitive de-duplication, also dropping anything in `already_listed`.
fn dedup(items: &[String], already_listed: &[String]) -> Vec<String> {
    let mut seen: HashSet<String> = already_listed.iter().map(|s| s.to_lowercase()).collect();
    items
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.to_lowercase()))
        .map(str::to_string)
        .collect()
}
