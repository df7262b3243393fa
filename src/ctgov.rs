//! ClinicalTrials.gov API v2 client
//!
//! Implements [`TrialSearch`] against `https://clinicaltrials.gov/api/v2`.
//!
//! Search builds one `/studies` query from the patient record and the
//! structured transcript:
//! - `query.term` ORs every condition (`AREA[Condition]`) and medication
//!   (`AREA[InterventionName]`)
//! - only recruiting or not-yet-recruiting studies
//! - age and sex restrict the study's eligibility window when known
//! - `query.locn` narrows by location when one is known
//!
//! Patient fields win over transcript fields. Response modules may be missing
//! entirely; everything maps to defaults.

use crate::config::RegistryConfig;
use crate::domain::{
    Address, CandidateTrial, Intervention, PatientProfile, SourceRegistry, StructuredTranscript, TrialLocation,
};
use crate::error::{Result, TrialMatchError};
use crate::search::TrialSearch;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

/// ClinicalTrials.gov API base URL
pub const CTGOV_API_BASE: &str = "https://clinicaltrials.gov/api/v2";

/// API version the response mapping targets
pub const VERSION: &str = "2.0.4";

/// Statuses a patient can still enroll in
const RECRUITING_STATUSES: &str = "RECRUITING|NOT_YET_RECRUITING";

/// Fields requested from `/studies`
const SEARCH_FIELDS: &str = "NCTId,BriefTitle,OfficialTitle,OverallStatus,Condition,LeadSponsorName,Phase,\
MinimumAge,MaximumAge,Sex,HealthyVolunteers,StdAge,EligibilityCriteria,BriefSummary,DetailedDescription,\
InterventionType,InterventionName,InterventionDescription,EnrollmentCount,StartDate,CompletionDate,\
StudyType,DesignPrimaryPurpose,LocationStatus,LocationFacility,LocationCity,LocationState,LocationZip,\
LocationCountry,LocationGeoPoint,LastUpdatePostDate";

/// Search response
#[derive(Debug, Deserialize)]
struct StudiesResponse {
    #[serde(default)]
    studies: Vec<Study>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Study {
    #[serde(default)]
    protocol_section: ProtocolSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ProtocolSection {
    identification_module: IdentificationModule,
    status_module: StatusModule,
    sponsor_collaborators_module: SponsorModule,
    description_module: DescriptionModule,
    conditions_module: ConditionsModule,
    design_module: DesignModule,
    arms_interventions_module: ArmsInterventionsModule,
    eligibility_module: EligibilityModule,
    contacts_locations_module: ContactsLocationsModule,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct IdentificationModule {
    nct_id: Option<String>,
    brief_title: Option<String>,
    official_title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct StatusModule {
    overall_status: Option<String>,
    start_date_struct: Option<DateStruct>,
    completion_date_struct: Option<DateStruct>,
    last_update_post_date_struct: Option<DateStruct>,
}

#[derive(Debug, Default, Deserialize)]
struct DateStruct {
    date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SponsorModule {
    lead_sponsor: Option<LeadSponsor>,
}

#[derive(Debug, Default, Deserialize)]
struct LeadSponsor {
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct DescriptionModule {
    brief_summary: Option<String>,
    detailed_description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConditionsModule {
    conditions: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct DesignModule {
    study_type: Option<String>,
    phases: Vec<String>,
    design_info: Option<DesignInfo>,
    enrollment_info: Option<EnrollmentInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DesignInfo {
    primary_purpose: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct EnrollmentInfo {
    #[serde(default, deserialize_with = "lenient_u32")]
    count: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ArmsInterventionsModule {
    interventions: Vec<ApiIntervention>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiIntervention {
    #[serde(rename = "type")]
    intervention_type: Option<String>,
    name: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct EligibilityModule {
    eligibility_criteria: Option<String>,
    #[serde(deserialize_with = "yes_no")]
    healthy_volunteers: Option<bool>,
    sex: Option<String>,
    minimum_age: Option<String>,
    maximum_age: Option<String>,
    std_ages: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ContactsLocationsModule {
    locations: Vec<ApiLocation>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiLocation {
    status: Option<String>,
    facility: Option<String>,
    city: Option<String>,
    state: Option<String>,
    zip: Option<String>,
    country: Option<String>,
    geo_point: Option<GeoPoint>,
}

#[derive(Debug, Default, Deserialize)]
struct GeoPoint {
    lat: Option<f64>,
    lon: Option<f64>,
}

/// `true`/`false` or `"Yes"`/`"No"`
fn yes_no<'de, D>(deserializer: D) -> std::result::Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => Some(b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "yes" | "true" => Some(true),
            "no" | "false" => Some(false),
            _ => None,
        },
        _ => None,
    })
}

fn lenient_u32<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn study_to_trial(study: Study) -> CandidateTrial {
    let p = study.protocol_section;
    let design = p.design_module;
    let eligibility = p.eligibility_module;

    CandidateTrial {
        external_id: p.identification_module.nct_id.unwrap_or_default(),
        brief_title: p.identification_module.brief_title.unwrap_or_default(),
        official_title: non_empty(p.identification_module.official_title),
        status: p.status_module.overall_status.unwrap_or_default(),
        conditions: p.conditions_module.conditions,
        sponsor_name: non_empty(p.sponsor_collaborators_module.lead_sponsor.and_then(|s| s.name)),
        phases: design.phases,
        minimum_age: non_empty(eligibility.minimum_age),
        maximum_age: non_empty(eligibility.maximum_age),
        locations: p
            .contacts_locations_module
            .locations
            .into_iter()
            .map(|l| TrialLocation {
                status: l.status,
                facility: l.facility,
                city: l.city,
                state: l.state,
                country: l.country,
                zip_code: l.zip,
                latitude: l.geo_point.as_ref().and_then(|g| g.lat),
                longitude: l.geo_point.as_ref().and_then(|g| g.lon),
            })
            .collect(),
        brief_summary: non_empty(p.description_module.brief_summary),
        interventions: p
            .arms_interventions_module
            .interventions
            .into_iter()
            .map(|i| Intervention {
                intervention_type: i.intervention_type.unwrap_or_default(),
                name: i.name.unwrap_or_default(),
                description: non_empty(i.description),
            })
            .collect(),
        enrollment_count: design.enrollment_info.and_then(|e| e.count),
        start_date: p.status_module.start_date_struct.and_then(|d| d.date),
        completion_date: p.status_module.completion_date_struct.and_then(|d| d.date),
        detailed_description: non_empty(p.description_module.detailed_description),
        study_type: design.study_type,
        primary_purpose: design.design_info.and_then(|d| d.primary_purpose),
        eligibility_criteria: non_empty(eligibility.eligibility_criteria),
        sex: eligibility.sex,
        healthy_volunteers: eligibility.healthy_volunteers,
        standard_ages: eligibility.std_ages,
        source_registry: SourceRegistry::ClinicaltrialsGov,
        registry_version: Some(VERSION.to_string()),
        last_updated: p.status_module.last_update_post_date_struct.and_then(|d| d.date),
    }
}

/// Longest wait between rate-limited attempts, before jitter
const MAX_BACKOFF_SECS: u64 = 60;

/// `2^retries` seconds, capped at [`MAX_BACKOFF_SECS`]
fn backoff_base(retries: u32) -> Duration {
    let secs = 2u64.checked_pow(retries).unwrap_or(u64::MAX).min(MAX_BACKOFF_SECS);
    Duration::from_secs(secs)
}

/// Map a `/studies` response. Studies without an NCT id are skipped.
fn parse_search_response(json_str: &str) -> Result<Vec<CandidateTrial>> {
    let response: StudiesResponse = serde_json::from_str(json_str)
        .map_err(|e| TrialMatchError::Parse(format!("Failed to parse ClinicalTrials.gov response: {}", e)))?;

    let total = response.studies.len();
    let trials: Vec<CandidateTrial> = response
        .studies
        .into_iter()
        .map(study_to_trial)
        .filter(|t| !t.external_id.is_empty())
        .collect();

    if trials.len() < total {
        warn!(skipped = total - trials.len(), "Skipped studies without an NCT id");
    }
    Ok(trials)
}

/// Map a `/studies/{id}` response.
fn parse_study(json_str: &str) -> Result<CandidateTrial> {
    let study: Study = serde_json::from_str(json_str)
        .map_err(|e| TrialMatchError::Parse(format!("Failed to parse ClinicalTrials.gov study: {}", e)))?;
    Ok(study_to_trial(study))
}

/// Normalize a sex value to the registry's `MALE`/`FEMALE`.
fn registry_sex(sex: &str) -> Option<&'static str> {
    match sex.trim().to_ascii_uppercase().as_str() {
        "MALE" | "M" => Some("MALE"),
        "FEMALE" | "F" => Some("FEMALE"),
        _ => None,
    }
}

fn quoted_terms(area: &str, values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim().replace('"', ""))
        .filter(|v| !v.is_empty())
        .map(|v| format!("AREA[{}]\"{}\"", area, v))
        .collect()
}

/// Query parameters for `/studies`. `query.term` is absent when the transcript
/// names no condition or medication.
pub fn build_search_params(
    patient: &PatientProfile,
    transcript: &StructuredTranscript,
    as_of: NaiveDate,
    page_size: usize,
) -> Vec<(String, String)> {
    let mut params = vec![
        ("format".to_string(), "json".to_string()),
        ("pageSize".to_string(), page_size.to_string()),
        ("fields".to_string(), SEARCH_FIELDS.to_string()),
    ];

    let mut terms = quoted_terms("Condition", &transcript.conditions);
    terms.extend(quoted_terms("InterventionName", &transcript.medications));
    if !terms.is_empty() {
        params.push(("query.term".to_string(), terms.join(" OR ")));
    }

    params.push(("filter.overallStatus".to_string(), RECRUITING_STATUSES.to_string()));

    let mut advanced = Vec::new();
    if let Some(age) = patient.age_on(as_of).or(transcript.age) {
        advanced.push(format!(
            "AREA[MinimumAge]RANGE[MIN, {age} years] AND AREA[MaximumAge]RANGE[{age} years, MAX]"
        ));
    }
    let sex = patient
        .sex
        .as_deref()
        .and_then(registry_sex)
        .or_else(|| transcript.sex.as_deref().and_then(registry_sex));
    if let Some(sex) = sex {
        advanced.push(format!("(AREA[Sex]ALL OR AREA[Sex]{})", sex));
    }
    if !advanced.is_empty() {
        params.push(("filter.advanced".to_string(), advanced.join(" AND ")));
    }

    let location = if !patient.location.is_empty() {
        Some(&patient.location)
    } else {
        transcript.location.as_ref()
    };
    if let Some(locn) = location.map(Address::summary).filter(|s| !s.is_empty()) {
        params.push(("query.locn".to_string(), locn));
    }

    params
}

fn encode_query(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// ClinicalTrials.gov client
pub struct ClinicalTrialsGovClient {
    client: Client,
    config: RegistryConfig,
    nct_id: Regex,
}

impl ClinicalTrialsGovClient {
    pub fn new(config: RegistryConfig) -> Result<Self> {
        url::Url::parse(&config.base_url).map_err(|e| {
            TrialMatchError::Config(format!("Invalid ClinicalTrials.gov base URL {:?}: {}", config.base_url, e))
        })?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TrialMatchError::Config(format!("Failed to build HTTP client: {}", e)))?;
        let nct_id = Regex::new(r"^NCT\d{8}$").map_err(|e| TrialMatchError::Config(e.to_string()))?;

        Ok(Self { client, config, nct_id })
    }

    fn base(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    /// GET with exponential backoff on 429. A 404 is returned as `Ok(None)`.
    async fn fetch(&self, url: &str) -> Result<Option<String>> {
        let mut retries = 0;

        loop {
            let response = self.client.get(url).send().await?;
            let status = response.status();

            if status.is_success() {
                return Ok(Some(response.text().await?));
            }

            if status == reqwest::StatusCode::NOT_FOUND {
                return Ok(None);
            }

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                if retries < self.config.max_retries {
                    let jitter = rand::random::<u64>() % 500;
                    let backoff = backoff_base(retries) + Duration::from_millis(jitter);
                    warn!(retries = retries, backoff_ms = backoff.as_millis() as u64, "Rate limited, backing off");
                    tokio::time::sleep(backoff).await;
                    retries += 1;
                    continue;
                }
                return Err(TrialMatchError::RateLimited(60));
            }

            return Err(TrialMatchError::Api {
                code: status.as_u16() as i32,
                message: format!("ClinicalTrials.gov API error: {}", status),
            });
        }
    }

    /// `GET /version`; true when the registry answers.
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/version", self.base());
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                warn!(error = %e, "ClinicalTrials.gov health check failed");
                false
            }
        }
    }
}

#[async_trait]
impl TrialSearch for ClinicalTrialsGovClient {
    async fn search(&self, patient: &PatientProfile, transcript: &StructuredTranscript) -> Result<Vec<CandidateTrial>> {
        let params = build_search_params(patient, transcript, Utc::now().date_naive(), self.config.page_size);
        if !params.iter().any(|(k, _)| k == "query.term") {
            info!("No conditions or medications to search for");
            return Ok(Vec::new());
        }

        let url = format!("{}/studies?{}", self.base(), encode_query(&params));
        debug!(url = %url, "Searching ClinicalTrials.gov");

        let body = self.fetch(&url).await?.ok_or_else(|| TrialMatchError::Api {
            code: 404,
            message: "ClinicalTrials.gov studies endpoint not found".to_string(),
        })?;
        let trials = parse_search_response(&body)?;
        info!(count = trials.len(), "ClinicalTrials.gov search complete");
        Ok(trials)
    }

    async fn get_by_id(&self, external_id: &str) -> Result<CandidateTrial> {
        let nct_id = external_id.trim().to_ascii_uppercase();
        if !self.nct_id.is_match(&nct_id) {
            return Err(TrialMatchError::Validation(format!("Invalid NCT id: {:?}", external_id)));
        }

        let url = format!("{}/studies/{}?format=json", self.base(), nct_id);
        debug!(url = %url, "Fetching trial");

        match self.fetch(&url).await? {
            Some(body) => parse_study(&body),
            None => Err(TrialMatchError::TrialNotFound(nct_id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STUDY_JSON: &str = r#"{
        "protocolSection": {
            "identificationModule": {
                "nctId": "NCT12345678",
                "briefTitle": "Test Clinical Trial",
                "officialTitle": "A Phase 3 Study of Test Drug in Patients"
            },
            "statusModule": {
                "overallStatus": "RECRUITING",
                "startDateStruct": {"date": "2023-01-15"},
                "lastUpdatePostDateStruct": {"date": "2024-02-01"}
            },
            "sponsorCollaboratorsModule": {"leadSponsor": {"name": "Test Pharmaceutical Company"}},
            "descriptionModule": {
                "briefSummary": "This is a test clinical trial",
                "detailedDescription": "Detailed description of the trial"
            },
            "conditionsModule": {"conditions": ["Diabetes", "Hypertension"]},
            "designModule": {
                "studyType": "INTERVENTIONAL",
                "phases": ["PHASE3"],
                "designInfo": {"primaryPurpose": "TREATMENT"},
                "enrollmentInfo": {"count": "100"}
            },
            "armsInterventionsModule": {
                "interventions": [{"type": "DRUG", "name": "Test Drug", "description": "Experimental drug"}]
            },
            "eligibilityModule": {
                "eligibilityCriteria": "Inclusion criteria...",
                "healthyVolunteers": "No",
                "sex": "ALL",
                "minimumAge": "18 Years",
                "maximumAge": "75 Years",
                "stdAges": ["ADULT", "OLDER_ADULT"]
            },
            "contactsLocationsModule": {
                "locations": [{
                    "status": "RECRUITING",
                    "facility": "Test Hospital",
                    "city": "New York",
                    "state": "NY",
                    "zip": "10001",
                    "country": "United States",
                    "geoPoint": {"lat": 40.71, "lon": -74.0}
                }]
            }
        }
    }"#;

    fn transcript() -> StructuredTranscript {
        StructuredTranscript {
            conditions: vec!["Diabetes".to_string(), "Hypertension".to_string()],
            medications: vec!["Metformin".to_string()],
            age: Some(45),
            sex: Some("MALE".to_string()),
            ..Default::default()
        }
    }

    fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
        params.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap_or_default()
    }

    #[test]
    fn test_backoff_is_capped() {
        assert_eq!(backoff_base(0), Duration::from_secs(1));
        assert_eq!(backoff_base(3), Duration::from_secs(8));
        assert_eq!(backoff_base(10), Duration::from_secs(MAX_BACKOFF_SECS));
        assert_eq!(backoff_base(64), Duration::from_secs(MAX_BACKOFF_SECS));
        assert_eq!(backoff_base(u32::MAX), Duration::from_secs(MAX_BACKOFF_SECS));
    }

    #[test]
    fn test_parse_study() {
        let trial = parse_study(STUDY_JSON).expect("study parses");
        assert_eq!(trial.external_id, "NCT12345678");
        assert_eq!(trial.brief_title, "Test Clinical Trial");
        assert_eq!(trial.status, "RECRUITING");
        assert_eq!(trial.conditions, vec!["Diabetes".to_string(), "Hypertension".to_string()]);
        assert_eq!(trial.sponsor_name.as_deref(), Some("Test Pharmaceutical Company"));
        assert_eq!(trial.phases, vec!["PHASE3".to_string()]);
        assert_eq!(trial.enrollment_count, Some(100));
        assert_eq!(trial.healthy_volunteers, Some(false));
        assert_eq!(trial.primary_purpose.as_deref(), Some("TREATMENT"));
        assert_eq!(trial.locations[0].zip_code.as_deref(), Some("10001"));
        assert_eq!(trial.locations[0].latitude, Some(40.71));
        assert_eq!(trial.interventions[0].name, "Test Drug");
        assert_eq!(trial.registry_version.as_deref(), Some(VERSION));
        assert_eq!(trial.source_registry, SourceRegistry::ClinicaltrialsGov);
    }

    #[test]
    fn test_parse_tolerates_missing_modules() {
        let trials = parse_search_response(
            r#"{"studies": [
                {"protocolSection": {"identificationModule": {"nctId": "NCT00000001", "briefTitle": "Bare"}}},
                {"protocolSection": {}},
                {}
            ], "nextPageToken": "abc"}"#,
        )
        .expect("response parses");
        assert_eq!(trials.len(), 1);
        assert_eq!(trials[0].external_id, "NCT00000001");
        assert!(trials[0].locations.is_empty());
        assert_eq!(trials[0].healthy_volunteers, None);

        assert!(parse_search_response(r#"{}"#).expect("empty object parses").is_empty());
        assert!(parse_search_response("not json").is_err());
    }

    #[test]
    fn test_healthy_volunteers_as_bool() {
        let trial = parse_study(r#"{"protocolSection": {"eligibilityModule": {"healthyVolunteers": true}}}"#)
            .expect("study parses");
        assert_eq!(trial.healthy_volunteers, Some(true));
    }

    #[test]
    fn test_build_search_params() {
        let params = build_search_params(&PatientProfile::default(), &transcript(), today(), 50);

        assert_eq!(param(&params, "format"), Some("json"));
        assert_eq!(param(&params, "pageSize"), Some("50"));
        assert_eq!(
            param(&params, "query.term"),
            Some(r#"AREA[Condition]"Diabetes" OR AREA[Condition]"Hypertension" OR AREA[InterventionName]"Metformin""#)
        );
        assert_eq!(param(&params, "filter.overallStatus"), Some("RECRUITING|NOT_YET_RECRUITING"));
        assert_eq!(
            param(&params, "filter.advanced"),
            Some("AREA[MinimumAge]RANGE[MIN, 45 years] AND AREA[MaximumAge]RANGE[45 years, MAX] AND (AREA[Sex]ALL OR AREA[Sex]MALE)")
        );
        assert_eq!(param(&params, "query.locn"), None);
    }

    #[test]
    fn test_patient_fields_win() {
        let patient = PatientProfile {
            date_of_birth: NaiveDate::from_ymd_opt(1990, 1, 1),
            sex: Some("f".to_string()),
            location: Address {
                city: Some("Boston".to_string()),
                state: Some("MA".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let mut transcript = transcript();
        transcript.location = Some(Address {
            city: Some("Denver".to_string()),
            ..Default::default()
        });

        let params = build_search_params(&patient, &transcript, today(), 10);
        let advanced = param(&params, "filter.advanced").unwrap_or_default();
        assert!(advanced.contains("RANGE[MIN, 34 years]"));
        assert!(advanced.contains("AREA[Sex]FEMALE"));
        assert_eq!(param(&params, "query.locn"), Some("Boston, MA"));
    }

    #[test]
    fn test_no_terms_without_conditions_or_medications() {
        let params = build_search_params(&PatientProfile::default(), &StructuredTranscript::default(), today(), 50);
        assert_eq!(param(&params, "query.term"), None);
        assert_eq!(param(&params, "filter.advanced"), None);
    }

    #[test]
    fn test_encode_query() {
        let params = vec![("query.term".to_string(), "AREA[Condition]\"A B\"".to_string())];
        assert_eq!(encode_query(&params), "query.term=AREA%5BCondition%5D%22A%20B%22");
    }

    #[tokio::test]
    async fn test_get_by_id_rejects_malformed_ids() {
        let client = ClinicalTrialsGovClient::new(RegistryConfig::default()).expect("client builds");
        for id in ["", "NCT123", "XYZ12345678", "NCT1234567890"] {
            assert!(matches!(client.get_by_id(id).await, Err(TrialMatchError::Validation(_))));
        }
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        let config = RegistryConfig {
            base_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(matches!(ClinicalTrialsGovClient::new(config), Err(TrialMatchError::Config(_))));
    }
}
