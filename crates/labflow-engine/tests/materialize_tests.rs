use labflow_engine::{apply_plate_mapping, apply_sequencer_results, materialize, EngineError};
use labflow_model::{Block, BlockDefinition, BlockKind, Protocol, RunStatus, SectionDefinition};
use labflow_test_utils::{mapping_row, sample_protocol, sequencer_row};
use pretty_assertions::assert_eq;

#[test]
fn test_two_section_protocol() {
    let protocol = Protocol::new()
        .with_section(
            SectionDefinition::new("S1")
                .with_block(BlockDefinition::empty(BlockKind::TextQuestion, "B1")),
        )
        .with_section(SectionDefinition::new("S2"));

    let run = materialize(&protocol);

    assert_eq!(run.status, RunStatus::Todo);
    assert_eq!(run.sections.len(), 2);
    assert_eq!(run.sections[0].id(), "S1");
    assert_eq!(run.sections[1].id(), "S2");
    assert_eq!(run.sections[0].blocks.len(), 1);
    assert!(run.sections[1].blocks.is_empty());

    let Block::TextQuestion(block) = &run.sections[0].blocks[0] else {
        panic!("expected a text question");
    };
    assert_eq!(block.definition.id, "B1");
    assert!(block.answer.is_none());
}

#[test]
fn test_stored_blocks_keep_definition_tag() {
    let section = BlockKind::ALL
        .into_iter()
        .enumerate()
        .fold(SectionDefinition::new("all"), |section, (i, kind)| {
            section.with_block(BlockDefinition::empty(kind, format!("b{i}")))
        });
    let run = materialize(&Protocol::new().with_section(section));

    for block in &run.sections[0].blocks {
        let json = serde_json::to_value(block).unwrap();
        assert_eq!(json["definition"]["type"], json["type"], "{json}");
        assert_eq!(json["type"], block.kind().as_str());

        let back: Block = serde_json::from_value(json).unwrap();
        assert_eq!(&back, block);
    }
}

#[test]
fn test_blocks_mirror_definitions() {
    let protocol = sample_protocol();
    let run = materialize(&protocol);

    for (section, definition) in run.sections.iter().zip(&protocol.sections) {
        assert_eq!(&section.definition, definition);
        assert_eq!(section.blocks.len(), definition.blocks.len());
        for (block, block_definition) in section.blocks.iter().zip(&definition.blocks) {
            assert_eq!(block.kind(), block_definition.kind());
            assert_eq!(&block.definition(), block_definition);
            assert!(!block.has_entries());
        }
        assert!(!section.is_touched());
    }
}

#[test]
fn test_materialize_is_deterministic() {
    let protocol = sample_protocol();
    assert_eq!(materialize(&protocol), materialize(&protocol));
}

#[test]
fn test_run_keeps_protocol_snapshot() {
    let mut protocol = sample_protocol();
    let run = materialize(&protocol);

    protocol.sections.clear();
    protocol.name = Some("Renamed".into());

    let snapshot = run.protocol.as_ref().unwrap();
    assert_eq!(snapshot.sections.len(), 4);
    assert_eq!(snapshot.name.as_deref(), Some("Extraction QC"));
    assert_eq!(run.display_name(), "Extraction QC Run");
}

#[test]
fn test_uploads_land_in_materialized_blocks() {
    let mut run = materialize(&sample_protocol());

    apply_plate_mapping(
        &mut run,
        "sampling",
        "sampler",
        &[mapping_row("IN-1", "A1", 1001.0), mapping_row("IN-1", "B1", 1002.0)],
    )
    .unwrap();
    apply_sequencer_results(
        &mut run,
        "sequencing",
        "seq-end",
        &[sequencer_row("IN-1", "A1", "positive")],
    )
    .unwrap();

    let sampler = run.section("sampling").unwrap().block("sampler").unwrap();
    assert_eq!(sampler.plate_labels(), vec!["IN-1"]);
    let end = run.section("sequencing").unwrap().block("seq-end").unwrap();
    assert!(end.has_entries());
}

#[test]
fn test_upload_to_missing_block() {
    let mut run = materialize(&sample_protocol());
    let err = apply_plate_mapping(&mut run, "sampling", "nope", &[]).unwrap_err();
    assert_eq!(err, EngineError::block_not_found("sampling", "nope"));
}
