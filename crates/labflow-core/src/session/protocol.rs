//! Protocol editing session

use super::{move_where, new_id, upload_outcome};
use crate::error::CoreError;
use chrono::{DateTime, Utc};
use labflow_engine::{self as engine, EngineError};
use labflow_model::{
    BlockDefinition, BlockKind, BlockOption, Protocol, SectionDefinition,
};
use labflow_plate::Row;
use labflow_store::{DocumentStore, StoreError};
use std::sync::Arc;

/// Edits one protocol and saves it to a store
///
/// Structural edits are refused once the protocol is signed or witnessed.
#[derive(Debug)]
pub struct ProtocolSession<S> {
    store: Arc<S>,
    protocol: Protocol,
    errors: Vec<StoreError>,
}

impl<S: DocumentStore> ProtocolSession<S> {
    /// Start editing `protocol`
    #[inline]
    #[must_use]
    pub fn new(store: Arc<S>, protocol: Protocol) -> Self {
        Self {
            store,
            protocol,
            errors: Vec::new(),
        }
    }

    /// Fetch a stored protocol for editing
    pub async fn open(store: Arc<S>, id: &str) -> Result<Self, CoreError> {
        let protocol = store.protocol(id).await?;
        Ok(Self::new(store, protocol))
    }

    /// Document being edited
    #[inline]
    #[must_use]
    pub fn protocol(&self) -> &Protocol {
        &self.protocol
    }

    /// Store failures since the last [`clear_errors`](Self::clear_errors)
    #[inline]
    #[must_use]
    pub fn errors(&self) -> &[StoreError] {
        &self.errors
    }

    /// Dismiss recorded store failures
    #[inline]
    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }

    fn ensure_unlocked(&self) -> Result<(), CoreError> {
        if self.protocol.is_locked() {
            return Err(EngineError::ProtocolLocked.into());
        }
        Ok(())
    }

    fn section_mut(&mut self, section_id: &str) -> Result<&mut SectionDefinition, CoreError> {
        self.ensure_unlocked()?;
        self.protocol
            .sections
            .iter_mut()
            .find(|s| s.id == section_id)
            .ok_or_else(|| EngineError::SectionNotFound(section_id.to_string()).into())
    }

    fn block_mut(
        &mut self,
        section_id: &str,
        block_id: &str,
    ) -> Result<&mut BlockDefinition, CoreError> {
        self.section_mut(section_id)?
            .blocks
            .iter_mut()
            .find(|b| b.id() == block_id)
            .ok_or_else(|| EngineError::block_not_found(section_id, block_id).into())
    }

    /// Rename the protocol
    pub fn set_name(&mut self, name: impl Into<String>) -> Result<(), CoreError> {
        self.ensure_unlocked()?;
        self.protocol.name = Some(name.into());
        Ok(())
    }

    /// Append an empty section, returning its new id
    pub fn add_section(&mut self, name: impl Into<String>) -> Result<String, CoreError> {
        self.ensure_unlocked()?;
        let id = new_id();
        self.protocol
            .sections
            .push(SectionDefinition::new(id.clone()).with_name(name));
        tracing::debug!(section = %id, "added section");
        Ok(id)
    }

    /// Remove a section and its blocks
    pub fn remove_section(&mut self, section_id: &str) -> Result<SectionDefinition, CoreError> {
        self.ensure_unlocked()?;
        let index = self
            .protocol
            .sections
            .iter()
            .position(|s| s.id == section_id)
            .ok_or_else(|| EngineError::SectionNotFound(section_id.to_string()))?;
        Ok(self.protocol.sections.remove(index))
    }

    /// Move a section to `to`; past-the-end positions move it last
    pub fn move_section(&mut self, section_id: &str, to: usize) -> Result<(), CoreError> {
        self.ensure_unlocked()?;
        if !move_where(&mut self.protocol.sections, |s| s.id == section_id, to) {
            return Err(EngineError::SectionNotFound(section_id.to_string()).into());
        }
        Ok(())
    }

    /// Set whether a section takes a signature and a witness
    pub fn set_requirements(
        &mut self,
        section_id: &str,
        signature: bool,
        witness: bool,
    ) -> Result<(), CoreError> {
        let section = self.section_mut(section_id)?;
        section.requires_signature = Some(signature);
        section.requires_witness = Some(witness);
        Ok(())
    }

    /// Append an empty block of `kind`, returning its new id
    pub fn add_block(&mut self, section_id: &str, kind: BlockKind) -> Result<String, CoreError> {
        let id = new_id();
        self.section_mut(section_id)?
            .blocks
            .push(BlockDefinition::empty(kind, id.clone()));
        tracing::debug!(section = section_id, block = %id, %kind, "added block");
        Ok(id)
    }

    /// Remove a block from a section
    pub fn remove_block(
        &mut self,
        section_id: &str,
        block_id: &str,
    ) -> Result<BlockDefinition, CoreError> {
        let section = self.section_mut(section_id)?;
        let index = section
            .blocks
            .iter()
            .position(|b| b.id() == block_id)
            .ok_or_else(|| EngineError::block_not_found(section_id, block_id))?;
        Ok(section.blocks.remove(index))
    }

    /// Move a block within its section
    pub fn move_block(&mut self, section_id: &str, block_id: &str, to: usize) -> Result<(), CoreError> {
        let section = self.section_mut(section_id)?;
        if !move_where(&mut section.blocks, |b| b.id() == block_id, to) {
            return Err(EngineError::block_not_found(section_id, block_id).into());
        }
        Ok(())
    }

    /// Replace the block template with the same id; the kind must not change
    pub fn update_block(
        &mut self,
        section_id: &str,
        definition: BlockDefinition,
    ) -> Result<(), CoreError> {
        let current = self.block_mut(section_id, definition.id())?;
        if current.kind() != definition.kind() {
            return Err(EngineError::KindMismatch {
                block: definition.id().to_string(),
                expected: current.kind(),
                found: definition.kind(),
            }
            .into());
        }
        *current = definition;
        Ok(())
    }

    /// Append an option to an options question, returning the option id
    pub fn add_option(
        &mut self,
        section_id: &str,
        block_id: &str,
        option: impl Into<String>,
    ) -> Result<String, CoreError> {
        let block = self.block_mut(section_id, block_id)?;
        let found = block.kind();
        let BlockDefinition::OptionsQuestion(question) = block else {
            return Err(EngineError::KindMismatch {
                block: block_id.to_string(),
                expected: BlockKind::OptionsQuestion,
                found,
            }
            .into());
        };
        let id = new_id();
        question.options.push(BlockOption {
            id: id.clone(),
            option: option.into(),
        });
        Ok(id)
    }

    /// Change the number of plate slots on a block template
    ///
    /// New slots get fresh ids. Returns `false` for kinds without plates.
    pub fn set_plate_count(
        &mut self,
        section_id: &str,
        block_id: &str,
        count: usize,
    ) -> Result<bool, CoreError> {
        let definition = self.block_mut(section_id, block_id)?;
        if !engine::set_plate_count(definition, count) {
            return Ok(false);
        }
        let plates = match definition {
            BlockDefinition::PlateSampler(d) => &mut d.plates,
            BlockDefinition::StartPlateSequencer(d) => &mut d.plates,
            BlockDefinition::EndPlateSequencer(d) => &mut d.plates,
            _ => return Ok(true),
        };
        for plate in plates.iter_mut().filter(|p| p.id.is_empty()) {
            plate.id = new_id();
        }
        Ok(true)
    }

    /// Normalize a marker upload into an end-plate-sequencer template
    ///
    /// Returns `false` when the upload had no usable rows.
    pub fn import_plate_markers(
        &mut self,
        section_id: &str,
        block_id: &str,
        rows: &[Row],
    ) -> Result<bool, CoreError> {
        upload_outcome(engine::apply_plate_markers(
            &mut self.protocol,
            section_id,
            block_id,
            rows,
        ))
    }

    /// Sign the protocol, locking its structure
    pub fn sign(&mut self, signer: impl Into<String>, at: DateTime<Utc>) -> Result<(), CoreError> {
        Ok(engine::sign(&mut self.protocol, signer, at)?)
    }

    /// Witness the signed protocol
    pub fn witness(&mut self, witness: impl Into<String>, at: DateTime<Utc>) -> Result<(), CoreError> {
        Ok(engine::witness(&mut self.protocol, witness, at)?)
    }

    /// Remove signature and witness, unlocking the protocol
    pub fn unsign(&mut self) {
        engine::unsign(&mut self.protocol);
    }

    /// Remove the witness only
    pub fn unwitness(&mut self) {
        engine::unwitness(&mut self.protocol);
    }

    /// Validate, then send the whole protocol to the store
    ///
    /// Validation problems are returned. A store failure is recorded in
    /// [`errors`](Self::errors) and reported as `Ok(false)`; the local
    /// document is kept as it was.
    pub async fn save(&mut self) -> Result<bool, CoreError> {
        engine::ensure_valid(&self.protocol)?;
        match self.store.upsert_protocol(self.protocol.clone()).await {
            Ok(saved) => {
                tracing::info!(protocol = ?saved.id, "saved protocol");
                self.protocol = saved;
                Ok(true)
            }
            Err(err) => {
                tracing::error!(error = %err, "protocol save failed");
                self.errors.push(err);
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use labflow_store::InMemoryStore;

    fn session() -> ProtocolSession<InMemoryStore> {
        ProtocolSession::new(Arc::new(InMemoryStore::new()), Protocol::new().with_name("PCR"))
    }

    #[test]
    fn builds_structure_with_fresh_ids() {
        let mut session = session();
        let first = session.add_section("Prep").unwrap();
        let second = session.add_section("Run").unwrap();
        assert_ne!(first, second);

        let block = session.add_block(&first, BlockKind::OptionsQuestion).unwrap();
        let option = session.add_option(&first, &block, "NovaSeq").unwrap();
        assert_eq!(option.len(), 26);

        session.move_section(&second, 0).unwrap();
        let ids: Vec<_> = session.protocol().sections.iter().map(|s| s.id.clone()).collect();
        assert_eq!(ids, vec![second, first]);
    }

    #[test]
    fn options_only_on_options_questions() {
        let mut session = session();
        let section = session.add_section("Prep").unwrap();
        let block = session.add_block(&section, BlockKind::Calculator).unwrap();
        let err = session.add_option(&section, &block, "x").unwrap_err();
        assert!(matches!(err, CoreError::Engine(EngineError::KindMismatch { .. })));
    }

    #[test]
    fn plate_slots_get_ids() {
        let mut session = session();
        let section = session.add_section("Sampling").unwrap();
        let block = session.add_block(&section, BlockKind::PlateSampler).unwrap();
        assert!(session.set_plate_count(&section, &block, 3).unwrap());

        let BlockDefinition::PlateSampler(sampler) = &session.protocol().sections[0].blocks[0]
        else {
            panic!("expected sampler");
        };
        assert_eq!(sampler.plates.len(), 3);
        assert!(sampler.plates.iter().all(|p| !p.id.is_empty()));

        let timestamp = session.add_block(&section, BlockKind::EndTimestamp).unwrap();
        assert!(!session.set_plate_count(&section, &timestamp, 2).unwrap());
    }

    #[test]
    fn update_keeps_kind() {
        let mut session = session();
        let section = session.add_section("Prep").unwrap();
        let block = session.add_block(&section, BlockKind::TextQuestion).unwrap();

        let err = session
            .update_block(&section, BlockDefinition::empty(BlockKind::Calculator, block.clone()))
            .unwrap_err();
        assert!(matches!(err, CoreError::Engine(EngineError::KindMismatch { .. })));

        session
            .update_block(&section, BlockDefinition::empty(BlockKind::TextQuestion, block.clone()))
            .unwrap();
        session.remove_block(&section, &block).unwrap();
        assert!(session.protocol().sections[0].blocks.is_empty());
    }

    #[test]
    fn signed_protocol_is_locked() {
        let mut session = session();
        let section = session.add_section("Prep").unwrap();
        session.sign("alice", Utc::now()).unwrap();

        assert!(session.add_section("Late").unwrap_err().is_locked());
        assert!(session.remove_section(&section).unwrap_err().is_locked());
        assert!(session.set_name("Renamed").unwrap_err().is_locked());

        session.unsign();
        session.remove_section(&section).unwrap();
    }
}
