//! Runtime block instances
//!
//! Each [`Block`] embeds a copy of the template it was materialized from plus
//! the answers and results entered during the run. The block's `type` tag and
//! its definition's kind are one and the same enum variant, so they cannot
//! disagree.

use crate::definition::{
    AddReagentDefinition, BlockDefinition, BlockKind, CalculatorDefinition,
    EndPlateSequencerDefinition, OptionsQuestionDefinition, PlateAddReagentDefinition,
    PlateSamplerDefinition, StartPlateSequencerDefinition, TextQuestionDefinition,
    TimestampDefinition,
};
use crate::plate::{PlateCoordinate, PlateResult};
use crate::timestamp;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Plate label to resolved wells
pub type PlateMappings = IndexMap<String, Vec<PlateCoordinate>>;

/// Variable name to entered value
pub type VariableValues = IndexMap<String, f64>;

/// Embedded definitions written with their block's `type` tag
///
/// On read the tag is optional, but when present it must name the block's
/// own kind.
mod tagged {
    use crate::definition::BlockKind;
    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize)]
    struct Tagged<'a, T> {
        #[serde(rename = "type")]
        kind: BlockKind,
        #[serde(flatten)]
        definition: &'a T,
    }

    #[derive(Deserialize)]
    struct MaybeTagged<T> {
        #[serde(rename = "type", default)]
        kind: Option<BlockKind>,
        #[serde(flatten)]
        definition: T,
    }

    fn write<T, S>(kind: BlockKind, definition: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize,
        S: Serializer,
    {
        Tagged { kind, definition }.serialize(serializer)
    }

    fn read<'de, T, D>(kind: BlockKind, deserializer: D) -> Result<T, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        let MaybeTagged { kind: found, definition } = MaybeTagged::<T>::deserialize(deserializer)?;
        match found {
            Some(found) if found != kind => Err(de::Error::custom(format!(
                "definition type '{found}' inside a '{kind}' block"
            ))),
            _ => Ok(definition),
        }
    }

    macro_rules! tagged_kinds {
        ($($module:ident => $kind:ident),* $(,)?) => {
            $(
                pub(super) mod $module {
                    use super::{read, write, BlockKind, Deserialize, Deserializer, Serialize, Serializer};

                    pub(crate) fn serialize<T, S>(definition: &T, serializer: S) -> Result<S::Ok, S::Error>
                    where
                        T: Serialize,
                        S: Serializer,
                    {
                        write(BlockKind::$kind, definition, serializer)
                    }

                    pub(crate) fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
                    where
                        T: Deserialize<'de>,
                        D: Deserializer<'de>,
                    {
                        read(BlockKind::$kind, deserializer)
                    }
                }
            )*
        };
    }

    tagged_kinds! {
        text_question => TextQuestion,
        options_question => OptionsQuestion,
        calculator => Calculator,
        plate_sampler => PlateSampler,
        plate_add_reagent => PlateAddReagent,
        add_reagent => AddReagent,
        start_plate_sequencer => StartPlateSequencer,
        end_plate_sequencer => EndPlateSequencer,
        start_timestamp => StartTimestamp,
        end_timestamp => EndTimestamp,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextQuestionBlock {
    #[serde(with = "tagged::text_question")]
    pub definition: TextQuestionDefinition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionsQuestionBlock {
    #[serde(with = "tagged::options_question")]
    pub definition: OptionsQuestionDefinition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalculatorBlock {
    #[serde(with = "tagged::calculator")]
    pub definition: CalculatorDefinition,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub values: VariableValues,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlateSamplerBlock {
    #[serde(with = "tagged::plate_sampler")]
    pub definition: PlateSamplerDefinition,
    /// Input plate barcodes, one per slot
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plate_labels: Vec<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub plate_mappings: PlateMappings,
    /// Plate label to chosen primer
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub plate_primers: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_plate_label: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlateAddReagentBlock {
    #[serde(with = "tagged::plate_add_reagent")]
    pub definition: PlateAddReagentDefinition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plate_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plate_lot: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub values: VariableValues,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddReagentBlock {
    #[serde(with = "tagged::add_reagent")]
    pub definition: AddReagentDefinition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reagent_lot: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub values: VariableValues,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartPlateSequencerBlock {
    #[serde(with = "tagged::start_plate_sequencer")]
    pub definition: StartPlateSequencerDefinition,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plate_labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_label: Option<String>,
    #[serde(
        default,
        with = "timestamp::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub started_on: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndPlateSequencerBlock {
    #[serde(with = "tagged::end_plate_sequencer")]
    pub definition: EndPlateSequencerDefinition,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plate_sequencing_results: Vec<PlateResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_label: Option<String>,
    #[serde(
        default,
        with = "timestamp::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub ended_on: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartTimestampBlock {
    #[serde(with = "tagged::start_timestamp")]
    pub definition: TimestampDefinition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_label: Option<String>,
    #[serde(
        default,
        with = "timestamp::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub started_on: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndTimestampBlock {
    #[serde(with = "tagged::end_timestamp")]
    pub definition: TimestampDefinition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_label: Option<String>,
    #[serde(
        default,
        with = "timestamp::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub ended_on: Option<DateTime<Utc>>,
}

/// Runtime step instance, tagged by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Block {
    TextQuestion(TextQuestionBlock),
    OptionsQuestion(OptionsQuestionBlock),
    Calculator(CalculatorBlock),
    PlateSampler(PlateSamplerBlock),
    PlateAddReagent(PlateAddReagentBlock),
    AddReagent(AddReagentBlock),
    StartPlateSequencer(StartPlateSequencerBlock),
    EndPlateSequencer(EndPlateSequencerBlock),
    StartTimestamp(StartTimestampBlock),
    EndTimestamp(EndTimestampBlock),
}

impl Block {
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

    /// Join key back to the originating template
    #[must_use]
    pub fn definition_id(&self) -> &str {
        match self {
            Self::TextQuestion(b) => &b.definition.id,
            Self::OptionsQuestion(b) => &b.definition.id,
            Self::Calculator(b) => &b.definition.id,
            Self::PlateSampler(b) => &b.definition.id,
            Self::PlateAddReagent(b) => &b.definition.id,
            Self::AddReagent(b) => &b.definition.id,
            Self::StartPlateSequencer(b) => &b.definition.id,
            Self::EndPlateSequencer(b) => &b.definition.id,
            Self::StartTimestamp(b) => &b.definition.id,
            Self::EndTimestamp(b) => &b.definition.id,
        }
    }

    /// Copy of the embedded template
    #[must_use]
    pub fn definition(&self) -> BlockDefinition {
        match self {
            Self::TextQuestion(b) => BlockDefinition::TextQuestion(b.definition.clone()),
            Self::OptionsQuestion(b) => BlockDefinition::OptionsQuestion(b.definition.clone()),
            Self::Calculator(b) => BlockDefinition::Calculator(b.definition.clone()),
            Self::PlateSampler(b) => BlockDefinition::PlateSampler(b.definition.clone()),
            Self::PlateAddReagent(b) => BlockDefinition::PlateAddReagent(b.definition.clone()),
            Self::AddReagent(b) => BlockDefinition::AddReagent(b.definition.clone()),
            Self::StartPlateSequencer(b) => {
                BlockDefinition::StartPlateSequencer(b.definition.clone())
            }
            Self::EndPlateSequencer(b) => BlockDefinition::EndPlateSequencer(b.definition.clone()),
            Self::StartTimestamp(b) => BlockDefinition::StartTimestamp(b.definition.clone()),
            Self::EndTimestamp(b) => BlockDefinition::EndTimestamp(b.definition.clone()),
        }
    }

    /// Reagent label of the embedded template, for reagent steps
    #[must_use]
    pub fn reagent_label(&self) -> Option<&str> {
        match self {
            Self::PlateAddReagent(b) => b.definition.reagent_label.as_deref(),
            Self::AddReagent(b) => b.definition.reagent_label.as_deref(),
            Self::TextQuestion(_)
            | Self::OptionsQuestion(_)
            | Self::Calculator(_)
            | Self::PlateSampler(_)
            | Self::StartPlateSequencer(_)
            | Self::EndPlateSequencer(_)
            | Self::StartTimestamp(_)
            | Self::EndTimestamp(_) => None,
        }
    }

    /// Whether any answer or result has been entered
    #[must_use]
    pub fn has_entries(&self) -> bool {
        match self {
            Self::TextQuestion(b) => b.answer.is_some(),
            Self::OptionsQuestion(b) => b.answer.is_some(),
            Self::Calculator(b) => !b.values.is_empty(),
            Self::PlateSampler(b) => {
                !b.plate_labels.is_empty()
                    || !b.plate_mappings.is_empty()
                    || !b.plate_primers.is_empty()
                    || b.output_plate_label.is_some()
            }
            Self::PlateAddReagent(b) => {
                b.plate_label.is_some() || b.plate_lot.is_some() || !b.values.is_empty()
            }
            Self::AddReagent(b) => b.reagent_lot.is_some() || !b.values.is_empty(),
            Self::StartPlateSequencer(b) => {
                !b.plate_labels.is_empty() || b.timestamp_label.is_some() || b.started_on.is_some()
            }
            Self::EndPlateSequencer(b) => {
                !b.plate_sequencing_results.is_empty()
                    || b.timestamp_label.is_some()
                    || b.ended_on.is_some()
            }
            Self::StartTimestamp(b) => b.timestamp_label.is_some() || b.started_on.is_some(),
            Self::EndTimestamp(b) => b.timestamp_label.is_some() || b.ended_on.is_some(),
        }
    }

    /// Every plate label this block refers to, in field order
    #[must_use]
    pub fn plate_labels(&self) -> Vec<&str> {
        match self {
            Self::PlateSampler(b) => b
                .plate_labels
                .iter()
                .map(String::as_str)
                .chain(b.plate_mappings.keys().map(String::as_str))
                .chain(b.output_plate_label.as_deref())
                .collect(),
            Self::PlateAddReagent(b) => b.plate_label.iter().map(String::as_str).collect(),
            Self::StartPlateSequencer(b) => b.plate_labels.iter().map(String::as_str).collect(),
            Self::EndPlateSequencer(b) => b
                .plate_sequencing_results
                .iter()
                .filter_map(|r| r.plate_label.as_deref())
                .collect(),
            Self::TextQuestion(_)
            | Self::OptionsQuestion(_)
            | Self::Calculator(_)
            | Self::AddReagent(_)
            | Self::StartTimestamp(_)
            | Self::EndTimestamp(_) => Vec::new(),
        }
    }
}
