//! Structured transcript extracted from a clinical conversation.
//!
//! Every list field is a `Vec<String>` that deserializes `null`, a missing key,
//! or a non-array value to an empty list, so nothing downstream has to
//! null-check. Non-string entries and blank strings are skipped.

use super::patient::Address;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredTranscript {
    #[serde(default, deserialize_with = "lenient_list")]
    pub conditions: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub medications: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub procedures: Vec<String>,

    #[serde(default, deserialize_with = "lenient_age")]
    pub age: Option<u32>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub sex: Option<String>,
    #[serde(default, deserialize_with = "lenient_address")]
    pub location: Option<Address>,

    #[serde(default, deserialize_with = "lenient_list")]
    pub positive_symptoms: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub negative_symptoms: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub positive_lab_results: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub negative_lab_results: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub positive_imaging_results: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub negative_imaging_results: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub past_diagnoses: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub past_surgeries: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub family_history: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub positive_lifestyle_factors: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub negative_lifestyle_factors: Vec<String>,

    #[serde(default, deserialize_with = "lenient_list")]
    pub extraction_notes: Vec<String>,
}

impl StructuredTranscript {
    /// Build from an arbitrary JSON value. Anything that is not an object
    /// yields the empty transcript.
    pub fn from_value(value: &Value) -> Self {
        if !value.is_object() {
            return Self::default();
        }
        serde_json::from_value(value.clone()).unwrap_or_default()
    }
}

fn lenient_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let items = match value {
        Value::Array(items) => items,
        _ => return Ok(Vec::new()),
    };
    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.trim().to_string()),
            _ => None,
        })
        .filter(|s| !s.is_empty())
        .collect())
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    })
}

fn lenient_age<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_address<'de, D>(deserializer: D) -> Result<Option<Address>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    if !value.is_object() {
        return Ok(None);
    }
    let address: Address = serde_json::from_value(value).unwrap_or_default();
    Ok((!address.is_empty()).then_some(address))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_and_missing_lists_become_empty() {
        let value = json!({
            "conditions": ["Diabetes", null, 3, "  "],
            "medications": null,
            "procedures": "not a list",
            "age": "45",
            "sex": "MALE"
        });
        let transcript = StructuredTranscript::from_value(&value);
        assert_eq!(transcript.conditions, vec!["Diabetes".to_string()]);
        assert!(transcript.medications.is_empty());
        assert!(transcript.procedures.is_empty());
        assert!(transcript.family_history.is_empty());
        assert_eq!(transcript.age, Some(45));
        assert_eq!(transcript.sex.as_deref(), Some("MALE"));
    }

    #[test]
    fn test_location_object() {
        let value = json!({
            "location": {"city": "Boston", "state": "MA", "zip_code": null},
            "age": -3
        });
        let transcript = StructuredTranscript::from_value(&value);
        let location = transcript.location.expect("location parsed");
        assert_eq!(location.city.as_deref(), Some("Boston"));
        assert_eq!(location.zip_code, None);
        assert_eq!(transcript.age, None);

        let empty_location = StructuredTranscript::from_value(&json!({"location": {}}));
        assert_eq!(empty_location.location, None);
    }

    #[test]
    fn test_non_object_is_empty_transcript() {
        assert_eq!(StructuredTranscript::from_value(&json!([1, 2])), StructuredTranscript::default());
        assert_eq!(StructuredTranscript::from_value(&Value::Null), StructuredTranscript::default());
    }
}
