//! Join-by-id editing
//!
//! Sections and blocks live in ordered `Vec`s because status derivation
//! depends on their order. Updates address them by template id and replace
//! them in place, so order never changes through an edit.
//!
//! Blocks of a signed or witnessed section are read-only. Uploads are
//! normalized in full before anything is written, so a rejected upload
//! leaves the target block exactly as it was.

use crate::error::EngineError;
use crate::signoff::check_signoff;
use labflow_model::{Block, BlockDefinition, BlockKind, Protocol, Run, Section};
use labflow_plate::{plate_mapping, plate_markers, sequencer_results, Row};

/// Section by template id
pub fn section_mut<'a>(
    run: &'a mut Run,
    section_id: &str,
) -> Result<&'a mut Section, EngineError> {
    run.sections
        .iter_mut()
        .find(|s| s.id() == section_id)
        .ok_or_else(|| EngineError::SectionNotFound(section_id.to_string()))
}

/// Editable block by template id
///
/// Fails with [`EngineError::SectionLocked`] once the section is signed or
/// witnessed.
pub fn block_mut<'a>(
    section: &'a mut Section,
    block_id: &str,
) -> Result<&'a mut Block, EngineError> {
    if section.is_touched() {
        return Err(EngineError::SectionLocked(section.id().to_string()));
    }
    let section_id = section.id().to_string();
    section
        .blocks
        .iter_mut()
        .find(|b| b.definition_id() == block_id)
        .ok_or_else(|| EngineError::block_not_found(section_id, block_id))
}

/// Replace the section with the same template id
///
/// The incoming sign-off fields must obey the same rules as
/// [`sign`](crate::sign) and [`witness`](crate::witness). Block changes are
/// refused while the stored section is signed or witnessed.
pub fn replace_section(run: &mut Run, mut section: Section) -> Result<(), EngineError> {
    check_signoff(&mut section)?;
    let current = section_mut(run, section.id())?;
    if current.is_touched() && current.blocks != section.blocks {
        return Err(EngineError::SectionLocked(section.id().to_string()));
    }
    *current = section;
    Ok(())
}

/// Replace the block with the same template id in a section
pub fn replace_block(run: &mut Run, section_id: &str, block: Block) -> Result<(), EngineError> {
    let current = block_mut(section_mut(run, section_id)?, block.definition_id())?;
    if current.kind() != block.kind() {
        return Err(EngineError::KindMismatch {
            block: block.definition_id().to_string(),
            expected: current.kind(),
            found: block.kind(),
        });
    }
    *current = block;
    Ok(())
}

/// Normalize a plate mapping upload into a plate sampler block
///
/// The uploaded plate's wells replace any earlier mapping for the same plate;
/// mappings for other plates are kept.
pub fn apply_plate_mapping(
    run: &mut Run,
    section_id: &str,
    block_id: &str,
    rows: &[Row],
) -> Result<(), EngineError> {
    let block = block_mut(section_mut(run, section_id)?, block_id)?;
    let found = block.kind();
    let Block::PlateSampler(sampler) = block else {
        return Err(mismatch(block_id, BlockKind::PlateSampler, found));
    };

    let mappings = plate_mapping(rows)?;
    tracing::info!(
        block = block_id,
        plates = ?mappings.keys().collect::<Vec<_>>(),
        "applied plate mapping"
    );
    sampler.plate_mappings.extend(mappings);
    Ok(())
}

/// Normalize a sequencer upload into an end-plate-sequencer block
///
/// Results replace whatever was uploaded before.
pub fn apply_sequencer_results(
    run: &mut Run,
    section_id: &str,
    block_id: &str,
    rows: &[Row],
) -> Result<(), EngineError> {
    let block = block_mut(section_mut(run, section_id)?, block_id)?;
    let found = block.kind();
    let Block::EndPlateSequencer(sequencer) = block else {
        return Err(mismatch(block_id, BlockKind::EndPlateSequencer, found));
    };

    let results = sequencer_results(rows)?;
    tracing::info!(block = block_id, results = results.len(), "applied sequencer results");
    sequencer.plate_sequencing_results = results;
    Ok(())
}

/// Normalize a marker upload into an end-plate-sequencer template
///
/// Markers belong to the protocol, so a locked protocol refuses them.
pub fn apply_plate_markers(
    protocol: &mut Protocol,
    section_id: &str,
    block_id: &str,
    rows: &[Row],
) -> Result<(), EngineError> {
    if protocol.is_locked() {
        return Err(EngineError::ProtocolLocked);
    }
    let section = protocol
        .sections
        .iter_mut()
        .find(|s| s.id == section_id)
        .ok_or_else(|| EngineError::SectionNotFound(section_id.to_string()))?;
    let definition = section
        .blocks
        .iter_mut()
        .find(|b| b.id() == block_id)
        .ok_or_else(|| EngineError::block_not_found(section_id, block_id))?;
    let found = definition.kind();
    let BlockDefinition::EndPlateSequencer(sequencer) = definition else {
        return Err(mismatch(block_id, BlockKind::EndPlateSequencer, found));
    };

    let markers = plate_markers(rows)?;
    tracing::info!(block = block_id, markers = markers.len(), "applied plate markers");
    sequencer.plate_markers = markers;
    Ok(())
}

fn mismatch(block: &str, expected: BlockKind, found: BlockKind) -> EngineError {
    EngineError::KindMismatch {
        block: block.to_string(),
        expected,
        found,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materialize::materialize;
    use crate::signoff::sign;
    use chrono::Utc;
    use labflow_model::{CellValue, SectionDefinition, TextQuestionBlock};

    fn protocol() -> Protocol {
        Protocol::new().with_section(
            SectionDefinition::new("s1")
                .with_block(BlockDefinition::empty(BlockKind::TextQuestion, "q1"))
                .with_block(BlockDefinition::empty(BlockKind::PlateSampler, "ps"))
                .with_block(BlockDefinition::empty(BlockKind::EndPlateSequencer, "end")),
        )
    }

    fn answer(text: &str) -> Block {
        let mut block = TextQuestionBlock::default();
        block.definition.id = "q1".into();
        block.answer = Some(text.into());
        Block::TextQuestion(block)
    }

    fn mapping_row(plate: &str, cell: &str) -> Row {
        [
            ("plate".to_string(), CellValue::from(plate)),
            ("cell".to_string(), CellValue::from(cell)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn replaces_block_in_place() {
        let mut run = materialize(&protocol());
        replace_block(&mut run, "s1", answer("42")).unwrap();
        assert_eq!(run.sections[0].blocks[0], answer("42"));
        assert_eq!(run.sections[0].blocks.len(), 3);
    }

    #[test]
    fn unknown_ids_are_reported() {
        let mut run = materialize(&protocol());
        assert_eq!(
            replace_block(&mut run, "nope", answer("x")),
            Err(EngineError::SectionNotFound("nope".into()))
        );
        let mut stray = TextQuestionBlock::default();
        stray.definition.id = "q9".into();
        assert_eq!(
            replace_block(&mut run, "s1", Block::TextQuestion(stray)),
            Err(EngineError::block_not_found("s1", "q9"))
        );
    }

    #[test]
    fn signed_section_is_read_only() {
        let mut run = materialize(&protocol());
        sign(&mut run.sections[0], "alice", Utc::now()).unwrap();
        let err = replace_block(&mut run, "s1", answer("late")).unwrap_err();
        assert!(err.is_locked());

        let mut edited = run.sections[0].clone();
        edited.blocks[0] = answer("late");
        assert!(replace_section(&mut run, edited).unwrap_err().is_locked());

        let mut unsigned = run.sections[0].clone();
        crate::signoff::unsign(&mut unsigned);
        replace_section(&mut run, unsigned).unwrap();
        assert!(!run.sections[0].is_touched());
    }

    #[test]
    fn replaced_section_obeys_signoff_rules() {
        let mut run = materialize(&protocol());

        let mut witnessed_only = run.sections[0].clone();
        witnessed_only.witness = Some("bob".into());
        witnessed_only.witnessed_on = Some(Utc::now());
        assert_eq!(
            replace_section(&mut run, witnessed_only),
            Err(EngineError::NotSigned("s1".into()))
        );

        let mut opted_out = run.sections[0].clone();
        opted_out.definition = opted_out.definition.clone().with_requirements(false, false);
        opted_out.signed_on = Some(Utc::now());
        assert_eq!(
            replace_section(&mut run, opted_out),
            Err(EngineError::NotSignable("s1".into()))
        );
        assert!(!run.sections[0].is_touched());
    }

    #[test]
    fn rejected_upload_leaves_block_untouched() {
        let mut run = materialize(&protocol());
        apply_plate_mapping(&mut run, "s1", "ps", &[mapping_row("P1", "A1")]).unwrap();
        let before = run.clone();

        let err =
            apply_plate_mapping(&mut run, "s1", "ps", &[mapping_row("P1", "1A")]).unwrap_err();
        assert!(matches!(err, EngineError::Upload(_)));
        assert_eq!(run, before);

        let err = apply_plate_mapping(&mut run, "s1", "ps", &[]).unwrap_err();
        assert!(err.is_empty_upload());
        assert_eq!(run, before);
    }

    #[test]
    fn upload_to_wrong_block_kind() {
        let mut run = materialize(&protocol());
        assert_eq!(
            apply_plate_mapping(&mut run, "s1", "q1", &[mapping_row("P1", "A1")]),
            Err(mismatch("q1", BlockKind::PlateSampler, BlockKind::TextQuestion))
        );
    }

    #[test]
    fn locked_protocol_refuses_markers() {
        let mut protocol = protocol();
        sign(&mut protocol, "alice", Utc::now()).unwrap();
        assert_eq!(
            apply_plate_markers(&mut protocol, "s1", "end", &[]),
            Err(EngineError::ProtocolLocked)
        );
    }
}
