//! Run Materializer
//!
//! Builds a fresh [`Run`] from a [`Protocol`]. Each section template becomes a
//! [`Section`] and each block template a blank [`Block`] of the same kind that
//! embeds its own copy of the template.
//!
//! Materialization is deterministic: the same protocol always yields the same
//! run. Identifiers are assigned later by the store.

use labflow_model::{
    AddReagentBlock, Block, BlockDefinition, CalculatorBlock, EndPlateSequencerBlock,
    EndTimestampBlock, OptionsQuestionBlock, PlateAddReagentBlock, PlateSamplerBlock, Protocol,
    Run, RunStatus, Section, SectionDefinition, StartPlateSequencerBlock, StartTimestampBlock,
    TextQuestionBlock,
};

/// Materialize a run from a protocol
///
/// The run keeps its own snapshot of the protocol so later protocol edits do
/// not reach in-flight runs. A protocol without sections yields a run without
/// sections.
#[must_use]
pub fn materialize(protocol: &Protocol) -> Run {
    let sections: Vec<Section> = protocol.sections.iter().map(materialize_section).collect();

    tracing::info!(
        protocol = protocol.id.as_deref().unwrap_or("<unsaved>"),
        sections = sections.len(),
        blocks = sections.iter().map(|s| s.blocks.len()).sum::<usize>(),
        "materialized run"
    );

    Run {
        status: RunStatus::Todo,
        sections,
        protocol: Some(protocol.clone()),
        ..Default::default()
    }
}

/// Materialize one section with no sign-offs
#[must_use]
pub fn materialize_section(definition: &SectionDefinition) -> Section {
    Section {
        definition: definition.clone(),
        blocks: definition.blocks.iter().map(materialize_block).collect(),
        ..Default::default()
    }
}

/// Blank block instance for a template
#[must_use]
pub fn materialize_block(definition: &BlockDefinition) -> Block {
    match definition {
        BlockDefinition::TextQuestion(d) => Block::TextQuestion(TextQuestionBlock {
            definition: d.clone(),
            ..Default::default()
        }),
        BlockDefinition::OptionsQuestion(d) => Block::OptionsQuestion(OptionsQuestionBlock {
            definition: d.clone(),
            ..Default::default()
        }),
        BlockDefinition::Calculator(d) => Block::Calculator(CalculatorBlock {
            definition: d.clone(),
            ..Default::default()
        }),
        BlockDefinition::PlateSampler(d) => Block::PlateSampler(PlateSamplerBlock {
            definition: d.clone(),
            ..Default::default()
        }),
        BlockDefinition::PlateAddReagent(d) => Block::PlateAddReagent(PlateAddReagentBlock {
            definition: d.clone(),
            ..Default::default()
        }),
        BlockDefinition::AddReagent(d) => Block::AddReagent(AddReagentBlock {
            definition: d.clone(),
            ..Default::default()
        }),
        BlockDefinition::StartPlateSequencer(d) => {
            Block::StartPlateSequencer(StartPlateSequencerBlock {
                definition: d.clone(),
                ..Default::default()
            })
        }
        BlockDefinition::EndPlateSequencer(d) => Block::EndPlateSequencer(EndPlateSequencerBlock {
            definition: d.clone(),
            ..Default::default()
        }),
        BlockDefinition::StartTimestamp(d) => Block::StartTimestamp(StartTimestampBlock {
            definition: d.clone(),
            ..Default::default()
        }),
        BlockDefinition::EndTimestamp(d) => Block::EndTimestamp(EndTimestampBlock {
            definition: d.clone(),
            ..Default::default()
        }),
    }
}
