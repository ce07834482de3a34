//! CIN validation and registry contact extraction.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;

use super::string_at;

/// Corporate Identification Number: listing status, industry code, state,
/// year of incorporation, ownership class, registration number.
#[allow(clippy::expect_used)]
static CIN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[LU]\d{5}[A-Z]{2}\d{4}[A-Z]{3}\d{6}$").expect("CIN regex is valid") // Static pattern, safe to panic
});

/// Trims and upper-cases a raw CIN; `None` for blank values and the literal `"null"`.
#[must_use]
pub fn normalize_cin(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") {
        return None;
    }
    Some(trimmed.to_ascii_uppercase())
}

/// Returns true when `raw` normalizes to a well-formed 21-character CIN.
///
/// ```
/// use harvester_core::is_valid_cin;
///
/// assert!(is_valid_cin("u72900ct2020ptc010000"));
/// assert!(!is_valid_cin("null"));
/// assert!(!is_valid_cin("U729"));
/// ```
#[must_use]
pub fn is_valid_cin(raw: &str) -> bool {
    normalize_cin(raw).is_some_and(|cin| CIN_PATTERN.is_match(&cin))
}

/// Contact and registry fields returned by the CIN lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInfo {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub registered_address: Option<String>,
    pub company_status: Option<String>,
    pub incorporation_date: Option<String>,
}

impl ContactInfo {
    /// Extracts contact info from a CIN lookup body.
    ///
    /// Returns `None` when the lookup reports no match (`status` not `true`,
    /// `data` missing) or when every field is empty. That is an expected
    /// outcome, not an error.
    #[must_use]
    pub fn from_cin_response(body: &Value) -> Option<Self> {
        if body.get("status").and_then(Value::as_bool) != Some(true) {
            trace!("CIN lookup reported no match");
            return None;
        }
        let data = body.get("data").filter(|data| data.is_object())?;

        let info = Self {
            email: string_at(data, "/email"),
            phone: string_at(data, "/registeredContactNo"),
            registered_address: string_at(data, "/registeredAddress"),
            company_status: string_at(data, "/companyStatus"),
            incorporation_date: string_at(data, "/incorpdate"),
        };
        (!info.is_empty()).then_some(info)
    }

    /// True when none of email, phone or registered address is set.
    #[must_use]
    pub fn has_no_contact(&self) -> bool {
        self.email.is_none() && self.phone.is_none() && self.registered_address.is_none()
    }

    fn is_empty(&self) -> bool {
        self.has_no_contact() && self.company_status.is_none() && self.incorporation_date.is_none()
    }
}
