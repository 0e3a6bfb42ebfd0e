//! Block and section templates
//!
//! A [`BlockDefinition`] is an immutable step template authored in the
//! protocol editor. Its `id` is the join key between the template and every
//! runtime [`Block`](crate::Block) materialized from it.

use crate::plate::PlateMarkerEntry;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Discriminator shared by block definitions and block instances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockKind {
    /// Free-text question
    TextQuestion,
    /// Choice among fixed options
    OptionsQuestion,
    /// Formula over named variables
    Calculator,
    /// Samples transferred from input plates into an output plate
    PlateSampler,
    /// Reagent added to a plate
    PlateAddReagent,
    /// Reagent added outside a plate
    AddReagent,
    /// Plates loaded into the sequencer
    StartPlateSequencer,
    /// Sequencer output collected
    EndPlateSequencer,
    /// Start-of-step timestamp
    StartTimestamp,
    /// End-of-step timestamp
    EndTimestamp,
}

impl BlockKind {
    /// Every kind, in declaration order
    pub const ALL: [BlockKind; 10] = [
        BlockKind::TextQuestion,
        BlockKind::OptionsQuestion,
        BlockKind::Calculator,
        BlockKind::PlateSampler,
        BlockKind::PlateAddReagent,
        BlockKind::AddReagent,
        BlockKind::StartPlateSequencer,
        BlockKind::EndPlateSequencer,
        BlockKind::StartTimestamp,
        BlockKind::EndTimestamp,
    ];

    /// Wire tag
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::TextQuestion => "text-question",
            BlockKind::OptionsQuestion => "options-question",
            BlockKind::Calculator => "calculator",
            BlockKind::PlateSampler => "plate-sampler",
            BlockKind::PlateAddReagent => "plate-add-reagent",
            BlockKind::AddReagent => "add-reagent",
            BlockKind::StartPlateSequencer => "start-plate-sequencer",
            BlockKind::EndPlateSequencer => "end-plate-sequencer",
            BlockKind::StartTimestamp => "start-timestamp",
            BlockKind::EndTimestamp => "end-timestamp",
        }
    }

    /// Whether blocks of this kind carry plate identifiers
    #[inline]
    #[must_use]
    pub fn is_plate_step(&self) -> bool {
        matches!(
            self,
            BlockKind::PlateSampler
                | BlockKind::PlateAddReagent
                | BlockKind::StartPlateSequencer
                | BlockKind::EndPlateSequencer
        )
    }
}

impl Display for BlockKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for unrecognised block tags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownBlockKind(pub String);

impl Display for UnknownBlockKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "unknown block type: '{}'", self.0)
    }
}

impl std::error::Error for UnknownBlockKind {}

impl FromStr for BlockKind {
    type Err = UnknownBlockKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BlockKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownBlockKind(s.to_string()))
    }
}

/// One selectable option of an options question
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockOption {
    pub id: String,
    pub option: String,
}

/// Primer label offered by a plate sampler
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockPrimer {
    pub id: String,
    pub primer: String,
}

/// Named formula input with an optional default
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockVariable {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<f64>,
}

/// Plate slot: a named plate of a given well count
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockPlate {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
}

/// Rendering hint for options questions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OptionType {
    Switch,
    Checkbox,
    Radio,
    MenuItem,
    User,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextQuestionDefinition {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionsQuestionDefinition {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option_type: Option<OptionType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<BlockOption>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalculatorDefinition {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<BlockVariable>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlateSamplerDefinition {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Input plate slots
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plates: Vec<BlockPlate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plate_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_plate: Option<BlockPlate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plate_primers: Vec<BlockPrimer>,
}

impl PlateSamplerDefinition {
    /// Number of input plate slots
    #[inline]
    #[must_use]
    pub fn input_count(&self) -> usize {
        self.plate_count.unwrap_or(self.plates.len())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlateAddReagentDefinition {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plate_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plate_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reagent_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<BlockVariable>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddReagentDefinition {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reagent_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<BlockVariable>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartPlateSequencerDefinition {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plates: Vec<BlockPlate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plate_count: Option<usize>,
}

impl StartPlateSequencerDefinition {
    /// Number of plate slots
    #[inline]
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.plate_count.unwrap_or(self.plates.len())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndPlateSequencerDefinition {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plates: Vec<BlockPlate>,
    /// Uploaded marker pair to well table, keyed by concatenated markers
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub plate_markers: IndexMap<String, PlateMarkerEntry>,
    /// Importer settings and any other fields kept as written
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampDefinition {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Step template, tagged by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum BlockDefinition {
    TextQuestion(TextQuestionDefinition),
    OptionsQuestion(OptionsQuestionDefinition),
    Calculator(CalculatorDefinition),
    PlateSampler(PlateSamplerDefinition),
    PlateAddReagent(PlateAddReagentDefinition),
    AddReagent(AddReagentDefinition),
    StartPlateSequencer(StartPlateSequencerDefinition),
    EndPlateSequencer(EndPlateSequencerDefinition),
    StartTimestamp(TimestampDefinition),
    EndTimestamp(TimestampDefinition),
}

impl BlockDefinition {
    /// Blank definition of the given kind
    #[must_use]
    pub fn empty(kind: BlockKind, id: impl Into<String>) -> Self {
        let id = id.into();
        match kind {
            BlockKind::TextQuestion => Self::TextQuestion(TextQuestionDefinition {
                id,
                ..Default::default()
            }),
            BlockKind::OptionsQuestion => Self::OptionsQuestion(OptionsQuestionDefinition {
                id,
                ..Default::default()
            }),
            BlockKind::Calculator => Self::Calculator(CalculatorDefinition {
                id,
                ..Default::default()
            }),
            BlockKind::PlateSampler => Self::PlateSampler(PlateSamplerDefinition {
                id,
                ..Default::default()
            }),
            BlockKind::PlateAddReagent => Self::PlateAddReagent(PlateAddReagentDefinition {
                id,
                ..Default::default()
            }),
            BlockKind::AddReagent => Self::AddReagent(AddReagentDefinition {
                id,
                ..Default::default()
            }),
            BlockKind::StartPlateSequencer => {
                Self::StartPlateSequencer(StartPlateSequencerDefinition {
                    id,
                    ..Default::default()
                })
            }
            BlockKind::EndPlateSequencer => Self::EndPlateSequencer(EndPlateSequencerDefinition {
                id,
                ..Default::default()
            }),
            BlockKind::StartTimestamp => Self::StartTimestamp(TimestampDefinition {
                id,
                ..Default::default()
            }),
            BlockKind::EndTimestamp => Self::EndTimestamp(TimestampDefinition {
                id,
                ..Default::default()
            }),
        }
    }

    /// Discriminator
    #[must_use]
    pub fn kind(&self) -> BlockKind {
        match self {
            Self::TextQuestion(_) => BlockKind::TextQuestion,
            Self::OptionsQuestion(_) => BlockKind::OptionsQuestion,
            Self::Calculator(_) => BlockKind::Calculator,
            Self::PlateSampler(_) => BlockKind::PlateSampler,
            Self::PlateAddReagent(_) => BlockKind::PlateAddReagent,
            Self::AddReagent(_) => BlockKind::AddReagent,
            Self::StartPlateSequencer(_) => BlockKind::StartPlateSequencer,
            Self::EndPlateSequencer(_) => BlockKind::EndPlateSequencer,
            Self::StartTimestamp(_) => BlockKind::StartTimestamp,
            Self::EndTimestamp(_) => BlockKind::EndTimestamp,
        }
    }

    /// Join key
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::TextQuestion(d) => &d.id,
            Self::OptionsQuestion(d) => &d.id,
            Self::Calculator(d) => &d.id,
            Self::PlateSampler(d) => &d.id,
            Self::PlateAddReagent(d) => &d.id,
            Self::AddReagent(d) => &d.id,
            Self::StartPlateSequencer(d) => &d.id,
            Self::EndPlateSequencer(d) => &d.id,
            Self::StartTimestamp(d) | Self::EndTimestamp(d) => &d.id,
        }
    }

    /// Display name
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::TextQuestion(d) => d.name.as_deref(),
            Self::OptionsQuestion(d) => d.name.as_deref(),
            Self::Calculator(d) => d.name.as_deref(),
            Self::PlateSampler(d) => d.name.as_deref(),
            Self::PlateAddReagent(d) => d.name.as_deref(),
            Self::AddReagent(d) => d.name.as_deref(),
            Self::StartPlateSequencer(d) => d.name.as_deref(),
            Self::EndPlateSequencer(d) => d.name.as_deref(),
            Self::StartTimestamp(d) | Self::EndTimestamp(d) => d.name.as_deref(),
        }
    }

    /// Reagent label, for reagent steps
    #[must_use]
    pub fn reagent_label(&self) -> Option<&str> {
        match self {
            Self::PlateAddReagent(d) => d.reagent_label.as_deref(),
            Self::AddReagent(d) => d.reagent_label.as_deref(),
            _ => None,
        }
    }
}

/// Section template: an ordered, signable group of block templates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionDefinition {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub blocks: Vec<BlockDefinition>,
    /// Absent means required
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_signature: Option<bool>,
    /// Absent means required
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_witness: Option<bool>,
}

impl SectionDefinition {
    /// Create empty section template
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// With display name
    #[inline]
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// With an appended block template
    #[inline]
    #[must_use]
    pub fn with_block(mut self, block: BlockDefinition) -> Self {
        self.blocks.push(block);
        self
    }

    /// With explicit sign-off requirements
    #[inline]
    #[must_use]
    pub fn with_requirements(mut self, signature: bool, witness: bool) -> Self {
        self.requires_signature = Some(signature);
        self.requires_witness = Some(witness);
        self
    }

    /// Whether the section takes part in sign-off
    ///
    /// Only a section that explicitly opts out of both signature and witness
    /// is unsignable.
    #[inline]
    #[must_use]
    pub fn is_signable(&self) -> bool {
        self.requires_signature != Some(false) || self.requires_witness != Some(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn kind_tags_round_trip_through_from_str() {
        for kind in BlockKind::ALL {
            assert_eq!(kind.as_str().parse::<BlockKind>().unwrap(), kind);
        }
        assert!("plate-sequencer".parse::<BlockKind>().is_err());
    }

    #[test]
    fn empty_definition_has_requested_kind_and_id() {
        for kind in BlockKind::ALL {
            let def = BlockDefinition::empty(kind, "b1");
            assert_eq!(def.kind(), kind);
            assert_eq!(def.id(), "b1");
        }
    }

    #[test]
    fn definition_wire_format() {
        let def: BlockDefinition = serde_json::from_str(
            r#"{"type": "options-question", "id": "q1", "optionType": "radio",
                "options": [{"id": "o1", "option": "Yes"}]}"#,
        )
        .unwrap();
        let BlockDefinition::OptionsQuestion(q) = &def else {
            panic!("wrong variant: {def:?}");
        };
        assert_eq!(q.option_type, Some(OptionType::Radio));
        assert_eq!(q.options.len(), 1);

        let json = serde_json::to_value(&def).unwrap();
        assert_eq!(json["type"], "options-question");
        assert_eq!(json["id"], "q1");
    }

    #[test]
    fn sequencer_importer_settings_survive_rewrite() {
        let json = serde_json::json!({
            "type": "end-plate-sequencer",
            "id": "seq-end",
            "importerType": "http",
            "importerUrl": "https://sequencer.local/runs",
            "importerParams": {"lane": 2},
            "plateMarkers": {"i701i501": {"marker1": "i701", "marker2": "i501"}}
        });
        let def: BlockDefinition = serde_json::from_value(json.clone()).unwrap();
        let BlockDefinition::EndPlateSequencer(seq) = &def else {
            panic!("wrong variant: {def:?}");
        };
        assert_eq!(seq.plate_markers.len(), 1);
        assert_eq!(seq.extra["importerType"], "http");
        assert!(!seq.extra.contains_key("type"));
        assert_eq!(serde_json::to_value(&def).unwrap(), json);
    }

    #[test]
    fn missing_id_reads_as_empty() {
        let def: BlockDefinition = serde_json::from_str(r#"{"type": "start-timestamp"}"#).unwrap();
        assert_eq!(def.id(), "");
    }

    #[test]
    fn sections_are_signable_unless_both_flags_opt_out() {
        assert!(SectionDefinition::new("s").is_signable());
        assert!(SectionDefinition::new("s").with_requirements(true, false).is_signable());
        assert!(!SectionDefinition::new("s").with_requirements(false, false).is_signable());
    }

    #[test]
    fn sampler_slot_count_falls_back_to_plates() {
        let def = PlateSamplerDefinition {
            plates: vec![BlockPlate::default(), BlockPlate::default()],
            ..Default::default()
        };
        assert_eq!(def.input_count(), 2);
    }
}
