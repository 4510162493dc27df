//! Raw student attributes as submitted for prediction
//!
//! Every field is optional. Missing, null, non-numeric or non-finite values
//! fall back to the documented defaults when features are computed.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const DEFAULT_GRADE: f64 = 3.0;
pub const DEFAULT_RATING: f64 = 3.0;
pub const DEFAULT_AGE: f64 = 21.0;
pub const DEFAULT_ATTENDANCE_RATE: f64 = 0.85;
pub const DEFAULT_EXTRACURRICULAR_LEVEL: f64 = 3.0;
pub const DEFAULT_STUDENT_NAME: &str = "Unknown";

const ETHNIC_GROUP_DOTTED: &str = "ethnic.group";

/// Raw prediction input
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawInput {
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "lenient_number")]
    pub english_grade: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub math_grade: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub sciences_grade: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub language_grade: Option<f64>,

    #[serde(default, deserialize_with = "lenient_number")]
    pub portfolio_rating: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub coverletter_rating: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub refletter_rating: Option<f64>,

    #[serde(default, deserialize_with = "lenient_number")]
    pub age: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub attendance_rate: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub extracurricular_level: Option<f64>,

    #[serde(default, deserialize_with = "lenient_text")]
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub nationality: Option<String>,
    #[serde(default, alias = "ethnic.group", deserialize_with = "lenient_text")]
    pub ethnic_group: Option<String>,
}

impl RawInput {
    /// Parse from a JSON document; a non-object document yields all defaults
    pub fn from_json_str(json: &str) -> crate::Result<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| crate::PredictorError::Parse(format!("Invalid input JSON: {}", e)))?;
        Ok(Self::from_json(value))
    }

    pub fn from_json(value: Value) -> Self {
        let mut fields = match value {
            Value::Object(fields) => fields,
            _ => {
                log::warn!("Prediction input is not a JSON object, using defaults");
                return Self::default();
            }
        };
        // Both spellings of the ethnic group would be a duplicate field
        if fields.contains_key("ethnic_group") {
            fields.remove(ETHNIC_GROUP_DOTTED);
        }
        // Field-level problems are absorbed by the lenient deserializers
        match serde_json::from_value(Value::Object(fields)) {
            Ok(input) => input,
            Err(e) => {
                log::warn!("Unreadable prediction input ({}), using defaults", e);
                Self::default()
            }
        }
    }

    /// Subject grades in english, math, sciences, language order
    pub fn grades(&self) -> [f64; 4] {
        [
            valid_or(self.english_grade, DEFAULT_GRADE),
            valid_or(self.math_grade, DEFAULT_GRADE),
            valid_or(self.sciences_grade, DEFAULT_GRADE),
            valid_or(self.language_grade, DEFAULT_GRADE),
        ]
    }

    /// Application ratings in portfolio, cover letter, reference letter order
    pub fn ratings(&self) -> [f64; 3] {
        [
            valid_or(self.portfolio_rating, DEFAULT_RATING),
            valid_or(self.coverletter_rating, DEFAULT_RATING),
            valid_or(self.refletter_rating, DEFAULT_RATING),
        ]
    }

    pub fn age_or_default(&self) -> f64 {
        valid_or(self.age, DEFAULT_AGE)
    }

    pub fn attendance_rate_or_default(&self) -> f64 {
        valid_or(self.attendance_rate, DEFAULT_ATTENDANCE_RATE)
    }

    pub fn extracurricular_level_or_default(&self) -> f64 {
        valid_or(self.extracurricular_level, DEFAULT_EXTRACURRICULAR_LEVEL)
    }

    pub fn name_or_default(&self) -> &str {
        self.name.as_deref().unwrap_or(DEFAULT_STUDENT_NAME)
    }

    pub fn gender_or_empty(&self) -> &str {
        self.gender.as_deref().unwrap_or("")
    }

    pub fn nationality_or_empty(&self) -> &str {
        self.nationality.as_deref().unwrap_or("")
    }

    pub fn ethnic_group_or_empty(&self) -> &str {
        self.ethnic_group.as_deref().unwrap_or("")
    }
}

fn valid_or(value: Option<f64>, default: f64) -> f64 {
    match value {
        Some(v) if v.is_finite() => v,
        _ => default,
    }
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        Value::Bool(b) => Some(if b { 1.0 } else { 0.0 }),
        _ => None,
    })
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_uses_defaults() {
        let input = RawInput::from_json_str("{}").unwrap();
        assert_eq!(input.grades(), [3.0; 4]);
        assert_eq!(input.ratings(), [3.0; 3]);
        assert_eq!(input.age_or_default(), 21.0);
        assert_eq!(input.attendance_rate_or_default(), 0.85);
        assert_eq!(input.extracurricular_level_or_default(), 3.0);
        assert_eq!(input.name_or_default(), "Unknown");
    }

    #[test]
    fn test_invalid_fields_fall_back_individually() {
        let input = RawInput::from_json_str(
            r#"{
                "english_grade": "not a number",
                "math_grade": "4.5",
                "sciences_grade": null,
                "language_grade": 2,
                "attendance_rate": [0.5],
                "age": 19
            }"#,
        )
        .unwrap();

        assert_eq!(input.grades(), [3.0, 4.5, 3.0, 2.0]);
        assert_eq!(input.attendance_rate_or_default(), 0.85);
        assert_eq!(input.age_or_default(), 19.0);
    }

    #[test]
    fn test_ethnic_group_accepts_dotted_key() {
        let input = RawInput::from_json_str(r#"{"ethnic.group": "Asian", "gender": "F"}"#).unwrap();
        assert_eq!(input.ethnic_group_or_empty(), "Asian");
        assert_eq!(input.gender_or_empty(), "F");
        assert_eq!(input.nationality_or_empty(), "");
    }

    #[test]
    fn test_both_ethnic_group_spellings() {
        let input = RawInput::from_json_str(
            r#"{"math_grade": 5, "ethnic_group": "A", "ethnic.group": "B", "gender": "M"}"#,
        )
        .unwrap();
        assert_eq!(input.math_grade, Some(5.0));
        assert_eq!(input.ethnic_group_or_empty(), "A");
        assert_eq!(input.gender_or_empty(), "M");
    }

    #[test]
    fn test_non_object_document() {
        let input = RawInput::from_json_str("[1, 2, 3]").unwrap();
        assert_eq!(input, RawInput::default());
        assert!(RawInput::from_json_str("{not json").is_err());
    }

    #[test]
    fn test_non_finite_values_rejected() {
        let input = RawInput {
            english_grade: Some(f64::NAN),
            attendance_rate: Some(f64::INFINITY),
            ..RawInput::default()
        };
        assert_eq!(input.grades()[0], 3.0);
        assert_eq!(input.attendance_rate_or_default(), 0.85);
    }
}
