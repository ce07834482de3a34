//! Startup profile extraction.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;

use super::{RecordError, normalize_cin, string_at};

/// Startup location as reported by the profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub country: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
}

/// Timestamp as the API reports it: epoch milliseconds or a date string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    Epoch(i64),
    Text(String),
}

impl Timestamp {
    fn from_value(value: Option<&Value>) -> Option<Self> {
        match value? {
            Value::Number(n) => n.as_i64().map(Self::Epoch),
            Value::String(s) if !s.trim().is_empty() => Some(Self::Text(s.trim().to_string())),
            _ => None,
        }
    }
}

/// Profile fields fetched for one startup.
///
/// Every field except `id` may be absent. `id` is always the listing id that
/// was requested, so it stays a stable key across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartupDetail {
    pub id: String,
    pub name: Option<String>,
    pub legal_name: Option<String>,
    pub role: Option<String>,
    pub cin: Option<String>,
    pub pan: Option<String>,
    pub dipp_number: Option<String>,
    pub dipp_recognition_status: Option<String>,
    pub dipp_certified: Option<bool>,
    pub stage: Option<String>,
    pub funded: Option<bool>,
    pub idea_brief: Option<String>,
    pub website: Option<String>,
    pub linked_in_url: Option<String>,
    #[serde(default)]
    pub location: Location,
    pub industry: Option<String>,
    #[serde(default)]
    pub sectors: Vec<String>,
    /// Passed through as-is; the API mixes strings and objects here.
    #[serde(default)]
    pub looking_to_connect_to: Vec<Value>,
    /// Passed through as-is; the API mixes strings and objects here.
    #[serde(default)]
    pub badges: Vec<Value>,
    pub created_on: Option<Timestamp>,
    pub published_on: Option<Timestamp>,
}

impl StartupDetail {
    /// Extracts the known field set from a profile response body.
    ///
    /// Fields are read from `user.*`, `user.startup.*`,
    /// `user.startup.location.*` and `user.startup.focusArea.*`.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::NotAnObject`] when `body` is not a JSON object.
    pub fn from_profile(id: &str, body: &Value) -> Result<Self, RecordError> {
        if !body.is_object() {
            return Err(RecordError::NotAnObject { id: id.to_string() });
        }

        let user = |field: &str| string_at(body, &format!("/user/{field}"));
        let startup = |field: &str| string_at(body, &format!("/user/startup/{field}"));

        let detail = Self {
            id: id.to_string(),
            name: user("name"),
            legal_name: startup("legalName"),
            role: user("role"),
            cin: startup("cin").as_deref().and_then(normalize_cin),
            pan: startup("pan"),
            dipp_number: startup("dippNumber"),
            dipp_recognition_status: startup("dippRecognitionStatus"),
            dipp_certified: flag_at(body, "/user/startup/dippCertified"),
            stage: startup("stage"),
            funded: flag_at(body, "/user/startup/funded"),
            idea_brief: startup("ideaBrief"),
            website: startup("website"),
            linked_in_url: startup("linkedInUrl"),
            location: Location {
                country: startup("location/country/countryName"),
                state: startup("location/state/stateName"),
                city: startup("location/city/districtName"),
            },
            industry: startup("focusArea/industry/industryName"),
            sectors: sectors_at(body),
            looking_to_connect_to: list_at(body, "/user/startup/lookingToConnectTo"),
            badges: list_at(body, "/user/badges"),
            created_on: Timestamp::from_value(body.pointer("/user/createdOn")),
            published_on: Timestamp::from_value(body.pointer("/user/lastPublishedOn")),
        };
        trace!(id, cin = ?detail.cin, "extracted profile");
        Ok(detail)
    }
}

/// Reads a yes/no flag that the API sends either as a bool or as text.
fn flag_at(body: &Value, pointer: &str) -> Option<bool> {
    match body.pointer(pointer)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" => Some(true),
            "false" | "no" | "n" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn list_at(body: &Value, pointer: &str) -> Vec<Value> {
    body.pointer(pointer)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter(|v| !v.is_null()).cloned().collect())
        .unwrap_or_default()
}

fn sectors_at(body: &Value) -> Vec<String> {
    body.pointer("/user/startup/focusArea/sectors")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|sector| string_at(sector, "/sectionName"))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_profile() -> Value {
        json!({
            "user": {
                "uniqueId": "abc",
                "name": "Acme Robotics",
                "role": "Startup",
                "badges": ["Recognised", null],
                "createdOn": 1_600_000_000_000_i64,
                "lastPublishedOn": "2021-03-04",
                "startup": {
                    "legalName": "Acme Robotics Private Limited",
                    "cin": "U72900CT2020PTC010000",
                    "pan": "ABCDE1234F",
                    "dippNumber": "DIPP1234",
                    "dippRecognitionStatus": "RECOGNISED",
                    "dippCertified": true,
                    "stage": "Validation",
                    "funded": "No",
                    "ideaBrief": "Warehouse robots",
                    "website": "https://acme.example",
                    "linkedInUrl": null,
                    "lookingToConnectTo": ["Investors"],
                    "location": {
                        "country": {"countryName": "India"},
                        "state": {"stateName": "Chhattisgarh"},
                        "city": {"districtName": "Raipur"}
                    },
                    "focusArea": {
                        "industry": {"industryName": "Robotics"},
                        "sectors": [{"sectionName": "Automation"}, {"other": 1}]
                    }
                }
            }
        })
    }

    #[test]
    fn test_from_profile_extracts_known_fields() {
        let detail = StartupDetail::from_profile("abc", &full_profile()).unwrap();
        assert_eq!(detail.id, "abc");
        assert_eq!(detail.name.as_deref(), Some("Acme Robotics"));
        assert_eq!(
            detail.legal_name.as_deref(),
            Some("Acme Robotics Private Limited")
        );
        assert_eq!(detail.cin.as_deref(), Some("U72900CT2020PTC010000"));
        assert_eq!(detail.dipp_certified, Some(true));
        assert_eq!(detail.funded, Some(false));
        assert_eq!(detail.linked_in_url, None);
        assert_eq!(detail.location.city.as_deref(), Some("Raipur"));
        assert_eq!(detail.industry.as_deref(), Some("Robotics"));
        assert_eq!(detail.sectors, vec!["Automation".to_string()]);
        assert_eq!(detail.badges, vec![json!("Recognised")]);
        assert_eq!(detail.created_on, Some(Timestamp::Epoch(1_600_000_000_000)));
        assert_eq!(
            detail.published_on,
            Some(Timestamp::Text("2021-03-04".into()))
        );
    }

    #[test]
    fn test_from_profile_missing_fields_become_none() {
        let detail = StartupDetail::from_profile("xyz", &json!({"user": {}})).unwrap();
        assert_eq!(
            detail,
            StartupDetail {
                id: "xyz".into(),
                ..StartupDetail::default()
            }
        );
    }

    #[test]
    fn test_from_profile_without_user_key_keeps_record() {
        let detail = StartupDetail::from_profile("xyz", &json!({})).unwrap();
        assert_eq!(detail.id, "xyz");
        assert!(detail.name.is_none());
    }

    #[test]
    fn test_from_profile_normalizes_cin() {
        let literal_null = json!({"user": {"startup": {"cin": "null"}}});
        assert_eq!(StartupDetail::from_profile("x", &literal_null).unwrap().cin, None);

        let lower = json!({"user": {"startup": {"cin": " u72900ct2020ptc010000 "}}});
        assert_eq!(
            StartupDetail::from_profile("x", &lower).unwrap().cin.as_deref(),
            Some("U72900CT2020PTC010000")
        );

        let malformed = json!({"user": {"startup": {"cin": "U729"}}});
        assert_eq!(
            StartupDetail::from_profile("x", &malformed).unwrap().cin.as_deref(),
            Some("U729")
        );
    }

    #[test]
    fn test_from_profile_rejects_non_object() {
        for body in [json!(null), json!([]), json!("oops")] {
            let err = StartupDetail::from_profile("bad", &body).unwrap_err();
            assert_eq!(err, RecordError::NotAnObject { id: "bad".into() });
        }
    }

    #[test]
    fn test_serialized_keys_are_camel_case() {
        let detail = StartupDetail::from_profile("abc", &full_profile()).unwrap();
        let value = serde_json::to_value(&detail).unwrap();
        assert!(value.get("legalName").is_some());
        assert!(value.get("dippRecognitionStatus").is_some());
        assert!(value.get("linkedInUrl").is_some());
        assert!(value.get("lookingToConnectTo").is_some());
    }

    #[test]
    fn test_flag_at_unrecognized_text_is_none() {
        let body = json!({"f": "maybe"});
        assert_eq!(flag_at(&body, "/f"), None);
    }
}
