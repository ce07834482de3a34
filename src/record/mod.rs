//! Typed records extracted from Startup India API payloads.
//!
//! Every entity here is built through an explicit optional-field extraction:
//! a missing or null field becomes `None` (or an empty list), never an error.
//! The only per-record data error is a profile body that is not a JSON object
//! at all.
//!
//! - [`StartupRef`] - id (plus display name) discovered by the listing phase
//! - [`StartupDetail`] - profile fields fetched in the detail phase
//! - [`ContactInfo`] - registry contact fields fetched by CIN
//! - [`MergedRecord`] - final output unit produced by [`merge`]

mod contact;
mod detail;
mod merge;

pub use contact::{ContactInfo, is_valid_cin, normalize_cin};
pub use detail::{Location, StartupDetail, Timestamp};
pub use merge::{Contact, MergedRecord, merge};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An id discovered by the listing phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartupRef {
    /// Opaque startup id.
    pub id: String,
    /// Display name from the listing summary, when present.
    #[serde(default)]
    pub name: Option<String>,
}

impl StartupRef {
    /// Creates a reference with an optional display name.
    pub fn new(id: impl Into<String>, name: Option<String>) -> Self {
        Self {
            id: id.into(),
            name,
        }
    }

    /// Returns the name for log lines, falling back to the id.
    #[must_use]
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// Per-record data errors. These skip the affected item, never the run.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    /// The profile body was not a JSON object (null, array, scalar).
    #[error("profile for {id} is not a JSON object")]
    NotAnObject {
        /// Startup id whose profile was malformed.
        id: String,
    },
}

/// Reads a string field, treating blank strings as absent.
pub(crate) fn string_at(value: &serde_json::Value, pointer: &str) -> Option<String> {
    value
        .pointer(pointer)
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_startup_ref_label_falls_back_to_id() {
        assert_eq!(StartupRef::new("abc", None).label(), "abc");
        assert_eq!(
            StartupRef::new("abc", Some("Acme".into())).label(),
            "Acme"
        );
    }

    #[test]
    fn test_startup_ref_deserializes_without_name() {
        let parsed: StartupRef = serde_json::from_value(json!({"id": "x1"})).unwrap();
        assert_eq!(parsed, StartupRef::new("x1", None));
    }

    #[test]
    fn test_string_at_blank_is_none() {
        let value = json!({"a": {"b": "  "}, "c": 5});
        assert_eq!(string_at(&value, "/a/b"), None);
        assert_eq!(string_at(&value, "/c"), None);
        assert_eq!(string_at(&value, "/missing"), None);
    }
}
