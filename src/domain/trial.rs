//! Clinical trial records and their list/detail projections.

use serde::{Deserialize, Serialize};

/// Registry a trial record came from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceRegistry {
    #[default]
    ClinicaltrialsGov,
}

/// One recruiting site
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrialLocation {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub facility: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub zip_code: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl TrialLocation {
    /// "City, State", falling back to whichever part exists.
    fn short(&self) -> String {
        [&self.city, &self.state]
            .iter()
            .filter_map(|f| f.as_deref())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Intervention {
    pub intervention_type: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// One external trial record. Identity is `external_id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateTrial {
    pub external_id: String,
    #[serde(default)]
    pub brief_title: String,
    #[serde(default)]
    pub official_title: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub sponsor_name: Option<String>,
    #[serde(default)]
    pub phases: Vec<String>,
    #[serde(default)]
    pub minimum_age: Option<String>,
    #[serde(default)]
    pub maximum_age: Option<String>,
    #[serde(default)]
    pub locations: Vec<TrialLocation>,
    #[serde(default)]
    pub brief_summary: Option<String>,
    #[serde(default)]
    pub interventions: Vec<Intervention>,
    #[serde(default)]
    pub enrollment_count: Option<u32>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub completion_date: Option<String>,
    #[serde(default)]
    pub detailed_description: Option<String>,
    #[serde(default)]
    pub study_type: Option<String>,
    #[serde(default)]
    pub primary_purpose: Option<String>,
    #[serde(default)]
    pub eligibility_criteria: Option<String>,
    #[serde(default)]
    pub sex: Option<String>,
    #[serde(default)]
    pub healthy_volunteers: Option<bool>,
    #[serde(default)]
    pub standard_ages: Vec<String>,
    #[serde(default)]
    pub source_registry: SourceRegistry,
    #[serde(default)]
    pub registry_version: Option<String>,
    #[serde(default)]
    pub last_updated: Option<String>,
}

impl CandidateTrial {
    /// Minimal record, mostly for fixtures and tests.
    pub fn new(external_id: impl Into<String>, brief_title: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            brief_title: brief_title.into(),
            ..Default::default()
        }
    }

    /// Age window as shown in trial lists.
    pub fn age_range(&self) -> Option<String> {
        match (self.minimum_age.as_deref(), self.maximum_age.as_deref()) {
            (Some(min), Some(max)) => Some(format!("{} - {}", min, max)),
            (Some(min), None) => Some(format!("{}+", min)),
            (None, Some(max)) => Some(format!("Up to {}", max)),
            (None, None) => None,
        }
    }

    pub fn locations_preview(&self) -> String {
        match self.locations.as_slice() {
            [] => "No locations specified".to_string(),
            [only] => only.short(),
            few if few.len() <= 3 => few.iter().map(TrialLocation::short).collect::<Vec<_>>().join(" and "),
            [first, rest @ ..] => format!("{} and {} more", first.short(), rest.len()),
        }
    }

    pub fn preview(&self) -> TrialPreview {
        TrialPreview {
            external_id: self.external_id.clone(),
            title: self.brief_title.clone(),
            status: self.status.clone(),
            conditions: self.conditions.clone(),
            sponsor: self.sponsor_name.clone(),
            phases: self.phases.clone(),
            age_range: self.age_range(),
            locations: self.locations_preview(),
            summary: self.brief_summary.clone(),
            interventions: self.interventions.iter().map(|i| i.name.clone()).collect(),
            enrollment_size: self.enrollment_count,
            start_date: self.start_date.clone(),
        }
    }
}

/// List-view projection of a trial
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialPreview {
    pub external_id: String,
    pub title: String,
    pub status: String,
    pub conditions: Vec<String>,
    pub sponsor: Option<String>,
    pub phases: Vec<String>,
    pub age_range: Option<String>,
    pub locations: String,
    pub summary: Option<String>,
    pub interventions: Vec<String>,
    pub enrollment_size: Option<u32>,
    pub start_date: Option<String>,
}
