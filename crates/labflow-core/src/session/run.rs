//! Run editing session

use super::upload_outcome;
use crate::error::CoreError;
use crate::formula::{calculate_block, CalculationOutcome, FormulaEvaluator};
use crate::samples::collect_sample_results;
use chrono::{DateTime, Utc};
use labflow_engine::{self as engine, EngineError};
use labflow_model::{Block, Protocol, Run, RunStatus, SampleResult, Section};
use labflow_plate::Row;
use labflow_store::{DocumentStore, StoreError};
use std::sync::Arc;

/// Edits one run and saves it to a store
///
/// Every sign-off change re-derives the run status immediately; `save`
/// derives it once more before sending the document.
#[derive(Debug)]
pub struct RunSession<S> {
    store: Arc<S>,
    run: Run,
    errors: Vec<StoreError>,
}

impl<S: DocumentStore> RunSession<S> {
    /// Edit an existing run document
    #[inline]
    #[must_use]
    pub fn new(store: Arc<S>, run: Run) -> Self {
        Self {
            store,
            run,
            errors: Vec::new(),
        }
    }

    /// Materialize a run from `protocol` and store it
    ///
    /// There is no session to hold a failure yet, so a store error is
    /// returned directly.
    pub async fn start_run(store: Arc<S>, protocol: &Protocol) -> Result<Self, CoreError> {
        let run = engine::materialize(protocol);
        let run = store.upsert_run(run).await?;
        tracing::info!(run = ?run.id, protocol = ?protocol.id, "started run");
        Ok(Self::new(store, run))
    }

    /// Fetch a stored run for editing
    pub async fn open(store: Arc<S>, id: &str) -> Result<Self, CoreError> {
        let run = store.run(id).await?;
        Ok(Self::new(store, run))
    }

    /// Document being edited
    #[inline]
    #[must_use]
    pub fn run(&self) -> &Run {
        &self.run
    }

    /// Give up the session, keeping the document
    #[inline]
    #[must_use]
    pub fn into_run(self) -> Run {
        self.run
    }

    /// Current derived status
    #[inline]
    #[must_use]
    pub fn status(&self) -> RunStatus {
        self.run.status
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

    /// Set the run name and notes
    pub fn set_details(&mut self, name: Option<String>, notes: impl Into<String>) {
        self.run.name = name;
        self.run.notes = notes.into();
    }

    /// Replace a block by template id
    ///
    /// Plate label slots are resized to the template's slot count first.
    pub fn update_block(&mut self, section_id: &str, mut block: Block) -> Result<(), CoreError> {
        engine::sync_plate_labels(&mut block);
        engine::replace_block(&mut self.run, section_id, block)?;
        Ok(())
    }

    /// Replace a section by template id, then re-derive status
    ///
    /// Sign-off fields on the incoming section follow the same rules as
    /// [`sign_section`](Self::sign_section) and
    /// [`witness_section`](Self::witness_section).
    pub fn update_section(&mut self, section: Section) -> Result<RunStatus, CoreError> {
        engine::replace_section(&mut self.run, section)?;
        Ok(self.refresh())
    }

    /// Sign a section
    pub fn sign_section(
        &mut self,
        section_id: &str,
        signer: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Result<RunStatus, CoreError> {
        engine::sign(engine::section_mut(&mut self.run, section_id)?, signer, at)?;
        Ok(self.refresh())
    }

    /// Witness a signed section
    pub fn witness_section(
        &mut self,
        section_id: &str,
        witness: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Result<RunStatus, CoreError> {
        engine::witness(engine::section_mut(&mut self.run, section_id)?, witness, at)?;
        Ok(self.refresh())
    }

    /// Remove a section's signature and witness
    pub fn unsign_section(&mut self, section_id: &str) -> Result<RunStatus, CoreError> {
        engine::unsign(engine::section_mut(&mut self.run, section_id)?);
        Ok(self.refresh())
    }

    /// Remove a section's witness
    pub fn unwitness_section(&mut self, section_id: &str) -> Result<RunStatus, CoreError> {
        engine::unwitness(engine::section_mut(&mut self.run, section_id)?);
        Ok(self.refresh())
    }

    /// Apply a plate mapping upload; `false` when it had no usable rows
    pub fn import_plate_mapping(
        &mut self,
        section_id: &str,
        block_id: &str,
        rows: &[Row],
    ) -> Result<bool, CoreError> {
        upload_outcome(engine::apply_plate_mapping(
            &mut self.run,
            section_id,
            block_id,
            rows,
        ))
    }

    /// Apply a sequencer upload; `false` when it had no usable rows
    pub fn import_sequencer_results(
        &mut self,
        section_id: &str,
        block_id: &str,
        rows: &[Row],
    ) -> Result<bool, CoreError> {
        upload_outcome(engine::apply_sequencer_results(
            &mut self.run,
            section_id,
            block_id,
            rows,
        ))
    }

    /// Evaluate a block's formula with its entered values
    ///
    /// `None` for blocks without a formula.
    pub fn calculate(
        &self,
        section_id: &str,
        block_id: &str,
        evaluator: &dyn FormulaEvaluator,
    ) -> Result<Option<CalculationOutcome>, CoreError> {
        let section = self
            .run
            .section(section_id)
            .ok_or_else(|| EngineError::SectionNotFound(section_id.to_string()))?;
        let block = section
            .block(block_id)
            .ok_or_else(|| EngineError::block_not_found(section_id, block_id))?;
        Ok(calculate_block(evaluator, block))
    }

    /// Sample results reported by this run
    #[must_use]
    pub fn sample_results(&self) -> Vec<SampleResult> {
        collect_sample_results(&self.run)
    }

    /// Derive status, then send the whole run to the store
    ///
    /// A store failure is recorded in [`errors`](Self::errors) and the local
    /// document is kept. Returns whether the save went through.
    pub async fn save(&mut self) -> bool {
        self.refresh();
        match self.store.upsert_run(self.run.clone()).await {
            Ok(saved) => {
                tracing::info!(run = ?saved.id, status = %saved.status, "saved run");
                self.run = saved;
                true
            }
            Err(err) => {
                tracing::error!(error = %err, "run save failed");
                self.errors.push(err);
                false
            }
        }
    }

    fn refresh(&mut self) -> RunStatus {
        engine::refresh_status(&mut self.run);
        self.run.status
    }
}
