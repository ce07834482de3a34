//! Record merger: profile detail + optional contact lookup → output record.

use serde::{Deserialize, Serialize};

use super::{ContactInfo, StartupDetail};

/// The `contact` sub-object of an output record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub registered_address: Option<String>,
}

/// One row of the output collection.
///
/// Serializes as the flattened [`StartupDetail`] fields, an optional
/// `contact` object and the registry extras from the CIN lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedRecord {
    #[serde(flatten)]
    pub detail: StartupDetail,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<Contact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incorporation_date: Option<String>,
}

impl MergedRecord {
    /// The record's unique key.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.detail.id
    }

    /// True when the record carries a contact email.
    #[must_use]
    pub fn has_email(&self) -> bool {
        self.contact.as_ref().is_some_and(|c| c.email.is_some())
    }
}

/// Combines a profile with an optional contact lookup result.
///
/// Pure: every detail field is kept; `contact` is attached only when the
/// lookup returned at least one of email, phone or registered address.
/// Registry extras are copied whenever a lookup payload was present.
#[must_use]
pub fn merge(detail: StartupDetail, contact: Option<ContactInfo>) -> MergedRecord {
    let Some(info) = contact else {
        return MergedRecord {
            detail,
            contact: None,
            company_status: None,
            incorporation_date: None,
        };
    };

    let sub_object = (!info.has_no_contact()).then(|| Contact {
        email: info.email,
        phone: info.phone,
        registered_address: info.registered_address,
    });

    MergedRecord {
        detail,
        contact: sub_object,
        company_status: info.company_status,
        incorporation_date: info.incorporation_date,
    }
}
