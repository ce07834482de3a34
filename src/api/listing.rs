//! Listing search request body and response page.

use serde_json::{Value, json};

use crate::config::StateFilter;
use crate::record::{StartupRef, string_at};

/// Builds the search body for `page`: DPIIT-recognised startups, newest first.
#[must_use]
pub fn listing_payload(page: u32, states: &StateFilter) -> Value {
    json!({
        "query": "",
        "focusSector": false,
        "industries": [],
        "sectors": [],
        "states": states.payload_states(),
        "cities": [],
        "stages": [],
        "badges": [],
        "roles": ["Startup"],
        "page": page,
        "sort": {
            "orders": [{"field": "registeredOn", "direction": "DESC"}]
        },
        "dpiitRecogniseUser": true,
        "internationalUser": false
    })
}

/// One page of listing results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    pub refs: Vec<StartupRef>,
    pub total_pages: Option<u32>,
    pub total_elements: Option<u64>,
}

impl ListingPage {
    /// Extracts refs from a search response. Entries without an id are
    /// dropped; a body without `content` is an empty page.
    #[must_use]
    pub fn from_body(body: &Value) -> Self {
        let refs = body
            .get("content")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| {
                        let id = string_at(item, "/id")?;
                        Some(StartupRef::new(id, string_at(item, "/name")))
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            refs,
            total_pages: body
                .get("totalPages")
                .and_then(Value::as_u64)
                .and_then(|n| u32::try_from(n).ok()),
            total_elements: body.get("totalElements").and_then(Value::as_u64),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_for_single_state() {
        let states = StateFilter::States(vec!["5f48ce592a9bb065cdf9fb25".into()]);
        let payload = listing_payload(3, &states);
        assert_eq!(payload["page"], 3);
        assert_eq!(payload["states"], json!(["5f48ce592a9bb065cdf9fb25"]));
        assert_eq!(payload["roles"], json!(["Startup"]));
        assert_eq!(payload["dpiitRecogniseUser"], true);
        assert_eq!(payload["sort"]["orders"][0]["field"], "registeredOn");
    }

    #[test]
    fn test_payload_for_all_states_is_empty_array() {
        let payload = listing_payload(0, &StateFilter::All);
        assert_eq!(payload["states"], json!([]));
    }

    #[test]
    fn test_from_body_extracts_refs_and_totals() {
        let body = json!({
            "content": [
                {"id": "a1", "name": "Acme"},
                {"id": "b2"},
                {"name": "no id"},
                {"id": "  "}
            ],
            "totalPages": 4,
            "totalElements": 37
        });
        let page = ListingPage::from_body(&body);
        assert_eq!(
            page.refs,
            vec![
                StartupRef::new("a1", Some("Acme".into())),
                StartupRef::new("b2", None)
            ]
        );
        assert_eq!(page.total_pages, Some(4));
        assert_eq!(page.total_elements, Some(37));
    }

    #[test]
    fn test_from_body_without_content_is_empty() {
        let page = ListingPage::from_body(&json!({"message": "nothing"}));
        assert!(page.is_empty());
        assert_eq!(page.total_pages, None);
    }
}
