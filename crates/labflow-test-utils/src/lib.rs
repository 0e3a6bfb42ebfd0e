//! Testing utilities for the labflow workspace
//!
//! Shared protocol fixtures, sign-off helpers and upload rows.

#![allow(missing_docs)]

use chrono::{DateTime, TimeZone, Utc};
use indexmap::IndexMap;
use labflow_model::{
    AddReagentDefinition, BlockDefinition, BlockKind, BlockOption, BlockPlate, BlockVariable,
    CalculatorDefinition, CellValue, OptionType, OptionsQuestionDefinition,
    PlateAddReagentDefinition, PlateSamplerDefinition, Protocol, Run, Section, SectionDefinition,
    StartPlateSequencerDefinition,
};

pub const PROTOCOL_ID: &str = "protocol-1";
pub const SIGNER: &str = "alice";
pub const WITNESS: &str = "bob";

/// Fixed instant used for sign-offs and audit stamps
pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 5, 1, 9, 0, 0).unwrap()
}

pub fn plate(id: &str, size: u32) -> BlockPlate {
    BlockPlate {
        id: id.to_string(),
        name: Some(format!("Plate {id}")),
        size: Some(size),
    }
}

pub fn variable(name: &str, default_value: Option<f64>) -> BlockVariable {
    BlockVariable {
        id: format!("var-{name}"),
        name: name.to_string(),
        default_value,
    }
}

/// Four-section protocol covering every plate step
///
/// Sections in order: `prep`, `sampling`, `sequencing`, and `notes`, which
/// opts out of sign-off.
pub fn sample_protocol() -> Protocol {
    let prep = SectionDefinition::new("prep")
        .with_name("Preparation")
        .with_block(BlockDefinition::empty(BlockKind::TextQuestion, "operator"))
        .with_block(BlockDefinition::OptionsQuestion(OptionsQuestionDefinition {
            id: "instrument".into(),
            name: Some("Instrument".into()),
            option_type: Some(OptionType::Radio),
            options: vec![
                BlockOption {
                    id: "opt-1".into(),
                    option: "NovaSeq".into(),
                },
                BlockOption {
                    id: "opt-2".into(),
                    option: "MiSeq".into(),
                },
            ],
        }))
        .with_block(BlockDefinition::Calculator(CalculatorDefinition {
            id: "dilution".into(),
            name: Some("Dilution factor".into()),
            formula: Some("stock / target".into()),
            variables: vec![variable("stock", Some(10.0)), variable("target", Some(2.0))],
        }));

    let sampling = SectionDefinition::new("sampling")
        .with_name("Sampling")
        .with_block(BlockDefinition::PlateSampler(PlateSamplerDefinition {
            id: "sampler".into(),
            plates: vec![plate("in-1", 96)],
            plate_count: Some(1),
            output_plate: Some(plate("out", 384)),
            ..Default::default()
        }))
        .with_block(BlockDefinition::PlateAddReagent(PlateAddReagentDefinition {
            id: "pcr-mix".into(),
            plate_size: Some(384),
            reagent_label: Some("MM-7".into()),
            ..Default::default()
        }))
        .with_block(BlockDefinition::AddReagent(AddReagentDefinition {
            id: "buffer".into(),
            reagent_label: Some("TE".into()),
            ..Default::default()
        }));

    let sequencing = SectionDefinition::new("sequencing")
        .with_name("Sequencing")
        .with_block(BlockDefinition::StartPlateSequencer(
            StartPlateSequencerDefinition {
                id: "seq-start".into(),
                plates: vec![plate("seq-1", 384)],
                plate_count: Some(1),
                ..Default::default()
            },
        ))
        .with_block(BlockDefinition::empty(BlockKind::EndPlateSequencer, "seq-end"));

    let notes = SectionDefinition::new("notes")
        .with_name("Notes")
        .with_requirements(false, false)
        .with_block(BlockDefinition::empty(BlockKind::EndTimestamp, "done"));

    let mut protocol = Protocol::new()
        .with_name("Extraction QC")
        .with_section(prep)
        .with_section(sampling)
        .with_section(sequencing)
        .with_section(notes);
    protocol.id = Some(PROTOCOL_ID.to_string());
    protocol
}

/// Section with the requested sign-off state and no blocks
pub fn signed_section(id: &str, signed: bool, witnessed: bool) -> Section {
    Section {
        definition: SectionDefinition::new(id),
        signature: signed.then(|| SIGNER.to_string()),
        witness: witnessed.then(|| WITNESS.to_string()),
        signed_on: signed.then(fixed_time),
        witnessed_on: witnessed.then(fixed_time),
        ..Default::default()
    }
}

/// Run whose sections carry the given `(signed, witnessed)` states, in order
pub fn run_with_signoffs(states: &[(bool, bool)]) -> Run {
    Run {
        sections: states
            .iter()
            .enumerate()
            .map(|(i, (signed, witnessed))| signed_section(&format!("s{i}"), *signed, *witnessed))
            .collect(),
        ..Default::default()
    }
}

/// Canonical upload row from column/value pairs
pub fn row(pairs: &[(&str, CellValue)]) -> IndexMap<String, CellValue> {
    pairs
        .iter()
        .map(|(column, value)| ((*column).to_string(), value.clone()))
        .collect()
}

/// Plate mapping upload row
pub fn mapping_row(plate: &str, cell: &str, sample: f64) -> IndexMap<String, CellValue> {
    row(&[
        ("plate", plate.into()),
        ("cell", cell.into()),
        ("sample", sample.into()),
    ])
}

/// Sequencer upload row
pub fn sequencer_row(plate: &str, cell: &str, classification: &str) -> IndexMap<String, CellValue> {
    row(&[
        ("plateLabel", plate.into()),
        ("plateCell", cell.into()),
        ("classification", classification.into()),
    ])
}
