//! Labflow Model
//!
//! Data contracts for protocol templates and the runs materialized from them.
//!
//! # Core Concepts
//!
//! - [`Protocol`]: authored template, an ordered list of [`SectionDefinition`]s
//! - [`BlockDefinition`]: one step template, tagged by [`BlockKind`]
//! - [`Run`]: one fillable execution of a protocol
//! - [`Section`] / [`Block`]: runtime instances that embed their templates
//! - [`PlateCoordinate`] / [`PlateResult`]: resolved plate data stored in blocks
//!
//! Templates and instances are joined by the template `id`. Sections and
//! blocks are kept in ordered `Vec`s because run status derivation depends
//! on section order.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod block;
pub mod definition;
pub mod plate;
pub mod protocol;
pub mod run;
pub mod sample;
pub mod timestamp;

// Re-exports
pub use block::{
    AddReagentBlock, Block, CalculatorBlock, EndPlateSequencerBlock, EndTimestampBlock,
    OptionsQuestionBlock, PlateAddReagentBlock, PlateMappings, PlateSamplerBlock,
    StartPlateSequencerBlock, StartTimestampBlock, TextQuestionBlock, VariableValues,
};
pub use definition::{
    AddReagentDefinition, BlockDefinition, BlockKind, BlockOption, BlockPlate, BlockPrimer,
    BlockVariable, CalculatorDefinition, EndPlateSequencerDefinition, OptionType,
    OptionsQuestionDefinition, PlateAddReagentDefinition, PlateSamplerDefinition,
    SectionDefinition, StartPlateSequencerDefinition, TextQuestionDefinition,
    TimestampDefinition, UnknownBlockKind,
};
pub use plate::{CellValue, PlateCoordinate, PlateMarkerEntry, PlateResult};
pub use protocol::{Audit, Protocol};
pub use run::{Run, RunStatus, Section};
pub use sample::SampleResult;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;

    #[test]
    fn run_document_round_trip() {
        let json = r#"{
            "id": "3",
            "status": "in-progress",
            "sections": [{
                "definition": {"id": "s1", "name": "Prep", "blocks": [
                    {"type": "start-timestamp", "id": "b1"}
                ]},
                "blocks": [{"type": "start-timestamp", "definition": {"id": "b1"},
                            "startedOn": "2021-05-01T08:00:00Z"}],
                "signature": "Alice",
                "signedOn": "2021-05-01T09:00:00Z",
                "witnessedOn": ""
            }],
            "protocol": {"id": "9", "name": "Prep protocol", "sections": []},
            "created_by": "alice"
        }"#;

        let run: Run = serde_json::from_str(json).unwrap();
        assert_eq!(run.status, RunStatus::InProgress);
        assert_eq!(run.sections.len(), 1);
        assert!(run.sections[0].is_touched());
        assert!(!run.sections[0].is_closed());
        assert_eq!(run.audit.created_by.as_deref(), Some("alice"));

        let again: Run = serde_json::from_value(serde_json::to_value(&run).unwrap()).unwrap();
        assert_eq!(again, run);
    }
}
