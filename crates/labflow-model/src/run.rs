//! Runs and their sections

use crate::block::Block;
use crate::definition::SectionDefinition;
use crate::protocol::{Audit, Protocol};
use crate::sample::SampleResult;
use crate::timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Overall progress of a run, derived from section sign-offs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunStatus {
    /// No section touched yet
    #[default]
    Todo,
    /// Some section touched, some touched-or-later section still open
    InProgress,
    /// Every section from the first touched one onwards is closed
    Completed,
}

impl RunStatus {
    /// Wire tag
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Todo => "todo",
            RunStatus::InProgress => "in-progress",
            RunStatus::Completed => "completed",
        }
    }
}

impl Display for RunStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runtime section: template copy, block instances and sign-off state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub definition: SectionDefinition,
    #[serde(default)]
    pub blocks: Vec<Block>,
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
}

impl Section {
    /// Join key back to the section template
    #[inline]
    #[must_use]
    pub fn id(&self) -> &str {
        &self.definition.id
    }

    /// Signed or witnessed
    #[inline]
    #[must_use]
    pub fn is_touched(&self) -> bool {
        self.signed_on.is_some() || self.witnessed_on.is_some()
    }

    /// Signed and witnessed
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.signed_on.is_some() && self.witnessed_on.is_some()
    }

    /// Block instance by template id
    #[must_use]
    pub fn block(&self, definition_id: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.definition_id() == definition_id)
    }
}

/// One concrete execution of a protocol
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub status: RunStatus,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sample_overrides: Vec<SampleResult>,
    /// Snapshot of the protocol at materialization time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<Protocol>,
    #[serde(flatten)]
    pub audit: Audit,
}

impl Run {
    /// Section by template id
    #[must_use]
    pub fn section(&self, id: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.id() == id)
    }

    /// All blocks in document order
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.sections.iter().flat_map(|s| s.blocks.iter())
    }

    /// Name for display: the explicit name, else one derived from the protocol
    #[must_use]
    pub fn display_name(&self) -> String {
        if let Some(name) = self.name.as_deref().filter(|n| !n.trim().is_empty()) {
            return name.to_string();
        }
        let protocol = self
            .protocol
            .as_ref()
            .and_then(|p| p.name.as_deref())
            .unwrap_or("Untitled Protocol");
        match self.id.as_deref() {
            Some(id) => format!("{protocol} Run {id}"),
            None => format!("{protocol} Run"),
        }
    }
}
