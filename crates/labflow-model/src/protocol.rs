//! Protocols and audit metadata

use crate::definition::SectionDefinition;
use crate::timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Creation and last-update metadata, maintained by the store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Audit {
    #[serde(
        default,
        with = "timestamp::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_on: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(
        default,
        with = "timestamp::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_on: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

impl Audit {
    /// Stamp a write by `actor` at `at`, filling creation fields on first write
    pub fn touch(&mut self, actor: Option<&str>, at: DateTime<Utc>) {
        if self.created_on.is_none() {
            self.created_on = Some(at);
            self.created_by = actor.map(str::to_string);
        }
        self.updated_on = Some(at);
        self.updated_by = actor.map(str::to_string);
    }
}

/// Authored template: an ordered list of section templates
///
/// Once signed or witnessed a protocol is locked; editors must not change
/// its structure. The lock is a caller contract, see [`Protocol::is_locked`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Protocol {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub sections: Vec<SectionDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub witness: Option<String>,
    #[serde(
        default,
        with = "timestamp::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub signed_on: Option<DateTime<Utc>>,
    #[serde(
        default,
        with = "timestamp::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub witnessed_on: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub audit: Audit,
}

impl Protocol {
    /// Create unnamed protocol
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With display name
    #[inline]
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// With an appended section template
    #[inline]
    #[must_use]
    pub fn with_section(mut self, section: SectionDefinition) -> Self {
        self.sections.push(section);
        self
    }

    /// Whether structural edits are closed
    #[inline]
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.signed_on.is_some() || self.witnessed_on.is_some()
    }

    /// Section template by id
    #[must_use]
    pub fn section(&self, id: &str) -> Option<&SectionDefinition> {
        self.sections.iter().find(|s| s.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn audit_fields_stay_snake_case() {
        let mut protocol = Protocol::new().with_name("PCR");
        protocol
            .audit
            .touch(Some("alice"), Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap());
        let json = serde_json::to_value(&protocol).unwrap();
        assert_eq!(json["created_by"], "alice");
        assert!(json.get("signedOn").is_none());
    }

    #[test]
    fn touch_keeps_creation_fields() {
        let mut audit = Audit::default();
        let first = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();
        let second = Utc.with_ymd_and_hms(2021, 2, 1, 0, 0, 0).unwrap();
        audit.touch(Some("alice"), first);
        audit.touch(Some("bob"), second);
        assert_eq!(audit.created_on, Some(first));
        assert_eq!(audit.created_by.as_deref(), Some("alice"));
        assert_eq!(audit.updated_by.as_deref(), Some("bob"));
    }

    #[test]
    fn cleared_signature_unlocks() {
        let protocol: Protocol =
            serde_json::from_str(r#"{"name": "PCR", "signedOn": "", "witnessedOn": ""}"#).unwrap();
        assert!(!protocol.is_locked());

        let signed: Protocol =
            serde_json::from_str(r#"{"signedOn": "2021-01-01T00:00:00Z"}"#).unwrap();
        assert!(signed.is_locked());
    }
}
