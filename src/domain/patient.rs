//! Patient profile and postal address.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Postal address; every field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub zip_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

impl Address {
    pub fn is_empty(&self) -> bool {
        [&self.street, &self.city, &self.state, &self.zip_code, &self.country]
            .iter()
            .all(|f| f.as_deref().map(str::trim).unwrap_or_default().is_empty())
    }

    /// "City, State, Zip, Country" with absent parts skipped.
    pub fn summary(&self) -> String {
        [&self.city, &self.state, &self.zip_code, &self.country]
            .iter()
            .filter_map(|f| f.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Patient record as stored; used only to build prompt text and search filters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientProfile {
    /// Blank until stored
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    /// Stated age, for records without a date of birth
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub sex: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub location: Address,
}

impl PatientProfile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }

    /// Age in whole years on `as_of`. Date of birth wins over the stated age.
    pub fn age_on(&self, as_of: NaiveDate) -> Option<u32> {
        match self.date_of_birth {
            Some(dob) => {
                let mut years = as_of.year() - dob.year();
                if (as_of.month(), as_of.day()) < (dob.month(), dob.day()) {
                    years -= 1;
                }
                u32::try_from(years).ok()
            }
            None => self.age,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
    }

    #[test]
    fn test_age_from_date_of_birth() {
        let patient = PatientProfile {
            date_of_birth: Some(date(1980, 6, 15)),
            age: Some(99),
            ..Default::default()
        };
        assert_eq!(patient.age_on(date(2024, 6, 14)), Some(43));
        assert_eq!(patient.age_on(date(2024, 6, 15)), Some(44));
    }

    #[test]
    fn test_age_falls_back_to_stated_age() {
        let patient = PatientProfile { age: Some(52), ..Default::default() };
        assert_eq!(patient.age_on(date(2024, 1, 1)), Some(52));
        assert_eq!(PatientProfile::default().age_on(date(2024, 1, 1)), None);
    }

    #[test]
    fn test_address_summary_skips_blanks() {
        let address = Address {
            city: Some("New York".to_string()),
            state: Some(" ".to_string()),
            country: Some("USA".to_string()),
            ..Default::default()
        };
        assert_eq!(address.summary(), "New York, USA");
        assert!(!address.is_empty());
        assert!(Address::default().is_empty());
    }

    #[test]
    fn test_full_name_trims() {
        let patient = PatientProfile {
            first_name: "John".to_string(),
            last_name: String::new(),
            ..Default::default()
        };
        assert_eq!(patient.full_name(), "John");
    }
}
