//! Application settings stored in the single-row `settings` table.
//!
//! Every section and field is optional so that partial documents written by
//! older clients still load, but unknown sections or fields are rejected.

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::DomainError;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SettingsDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<ProfileSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notifications: Option<NotificationSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<DataSettings>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProfileSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ModelSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction_model: Option<String>,
    /// Forecast horizon in days.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_period: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Percent; kept as the client's number so `85` and `85.5` round-trip unchanged.
    pub confidence_threshold: Option<serde_json::Number>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NotificationSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekly: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low_accuracy: Option<bool>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DataSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_update: Option<bool>,
    /// Stored only; nothing prunes predictions based on it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_years: Option<RetentionPolicy>,
}

/// Retention window: a number of years, or keep forever.
///
/// Accepts `2`, `"2"`, and `"forever"` on input; always writes a number or
/// `"forever"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetentionPolicy {
    Years(u32),
    Forever,
}

impl Serialize for RetentionPolicy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Years(years) => serializer.serialize_u32(*years),
            Self::Forever => serializer.serialize_str("forever"),
        }
    }
}

impl<'de> Deserialize<'de> for RetentionPolicy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RetentionVisitor;

        impl Visitor<'_> for RetentionVisitor {
            type Value = RetentionPolicy;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a whole number of years or \"forever\"")
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
                u32::try_from(value)
                    .map(RetentionPolicy::Years)
                    .map_err(|_| E::custom(format!("retention of {value} years is out of range")))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
                u64::try_from(value)
                    .map_err(|_| E::custom("retention years must not be negative"))
                    .and_then(|value| self.visit_u64(value))
            }

            fn visit_f64<E: de::Error>(self, value: f64) -> Result<Self::Value, E> {
                if value.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(&value) {
                    Ok(RetentionPolicy::Years(value as u32))
                } else {
                    Err(E::custom("retention years must be a whole number"))
                }
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
                let trimmed = value.trim();
                if trimmed.eq_ignore_ascii_case("forever") {
                    return Ok(RetentionPolicy::Forever);
                }
                trimmed
                    .parse::<u32>()
                    .map(RetentionPolicy::Years)
                    .map_err(|_| E::custom(format!("unsupported retention value `{value}`")))
            }
        }

        deserializer.deserialize_any(RetentionVisitor)
    }
}

impl SettingsDocument {
    /// The document seeded on first start.
    pub fn defaults() -> Self {
        Self {
            profile: Some(ProfileSettings {
                first_name: Some("John".to_string()),
                last_name: Some("Doe".to_string()),
                email: Some("john.doe@example.com".to_string()),
                company: Some("Example Co".to_string()),
            }),
            model: Some(ModelSettings {
                prediction_model: Some("advanced".to_string()),
                default_period: Some(30),
                confidence_threshold: Some(serde_json::Number::from(85)),
            }),
            notifications: Some(NotificationSettings {
                email: Some(true),
                weekly: Some(true),
                low_accuracy: Some(true),
            }),
            data: Some(DataSettings {
                auto_update: Some(true),
                retention_years: Some(RetentionPolicy::Years(2)),
            }),
        }
    }

    /// Parses a client payload, accepting either `{"payload": {...}}` or the bare document.
    pub fn from_payload(value: serde_json::Value) -> Result<Self, DomainError> {
        let document = match value {
            serde_json::Value::Object(mut map) if map.contains_key("payload") => {
                map.remove("payload").unwrap_or_default()
            }
            other => other,
        };

        let settings: Self = serde_json::from_value(document)
            .map_err(|error| DomainError::InvalidRequest(format!("invalid settings: {error}")))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if let Some(model) = &self.model {
            if model.default_period == Some(0) {
                return Err(DomainError::InvalidRequest(
                    "model.defaultPeriod must be greater than zero".to_string(),
                ));
            }
            if let Some(threshold) = &model.confidence_threshold {
                let in_range =
                    threshold.as_f64().is_some_and(|value| (0.0..=100.0).contains(&value));
                if !in_range {
                    return Err(DomainError::InvalidRequest(
                        "model.confidenceThreshold must be in range 0..=100".to_string(),
                    ));
                }
            }
        }

        if let Some(email) = self.profile.as_ref().and_then(|profile| profile.email.as_deref()) {
            let email = email.trim();
            if !email.is_empty() && !email.contains('@') {
                return Err(DomainError::InvalidRequest(
                    "profile.email must be an email address".to_string(),
                ));
            }
        }

        if let Some(RetentionPolicy::Years(0)) =
            self.data.as_ref().and_then(|data| data.retention_years)
        {
            return Err(DomainError::InvalidRequest(
                "data.retentionYears must be at least one year".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{RetentionPolicy, SettingsDocument};

    #[test]
    fn defaults_serialize_to_the_seeded_document() {
        let value = serde_json::to_value(SettingsDocument::defaults()).expect("serialize");
        assert_eq!(
            value,
            json!({
                "profile": {
                    "firstName": "John",
                    "lastName": "Doe",
                    "email": "john.doe@example.com",
                    "company": "Example Co"
                },
                "model": {
                    "predictionModel": "advanced",
                    "defaultPeriod": 30,
                    "confidenceThreshold": 85
                },
                "notifications": { "email": true, "weekly": true, "lowAccuracy": true },
                "data": { "autoUpdate": true, "retentionYears": 2 }
            })
        );
    }

    #[test]
    fn payload_wrapper_and_bare_document_are_both_accepted() {
        let wrapped = SettingsDocument::from_payload(json!({
            "payload": { "notifications": { "weekly": false } }
        }))
        .expect("wrapped payload");
        let bare = SettingsDocument::from_payload(json!({ "notifications": { "weekly": false } }))
            .expect("bare payload");

        assert_eq!(wrapped, bare);
        assert_eq!(serde_json::to_value(&bare).expect("serialize"), json!({
            "notifications": { "weekly": false }
        }));
    }

    #[test]
    fn unknown_sections_and_fields_are_rejected() {
        let section = SettingsDocument::from_payload(json!({ "billing": {} }));
        assert!(section.is_err());

        let field = SettingsDocument::from_payload(json!({ "profile": { "nickname": "JD" } }));
        let message = field.expect_err("unknown field should fail").to_string();
        assert!(message.contains("nickname"), "unexpected message: {message}");
    }

    #[test]
    fn retention_accepts_numbers_numeric_strings_and_forever() {
        let parse = |value: serde_json::Value| {
            SettingsDocument::from_payload(json!({ "data": { "retentionYears": value } }))
                .map(|doc| doc.data.and_then(|data| data.retention_years))
        };

        assert_eq!(parse(json!(5)).expect("number"), Some(RetentionPolicy::Years(5)));
        assert_eq!(parse(json!("1")).expect("string"), Some(RetentionPolicy::Years(1)));
        assert_eq!(parse(json!("forever")).expect("forever"), Some(RetentionPolicy::Forever));
        assert!(parse(json!("someday")).is_err());
        assert!(parse(json!(0)).is_err());
    }

    #[test]
    fn confidence_threshold_keeps_the_submitted_number_form() {
        for threshold in [json!(85), json!(72.5)] {
            let document = json!({ "model": { "confidenceThreshold": threshold } });
            let parsed = SettingsDocument::from_payload(document.clone()).expect("threshold");
            assert_eq!(serde_json::to_value(&parsed).expect("serialize"), document);
        }
    }

    #[test]
    fn validation_rejects_out_of_range_model_settings() {
        let threshold =
            SettingsDocument::from_payload(json!({ "model": { "confidenceThreshold": 140 } }));
        assert!(threshold.is_err());

        let period = SettingsDocument::from_payload(json!({ "model": { "defaultPeriod": 0 } }));
        assert!(period.is_err());

        let email =
            SettingsDocument::from_payload(json!({ "profile": { "email": "not-an-address" } }));
        assert!(email.is_err());
    }
}
