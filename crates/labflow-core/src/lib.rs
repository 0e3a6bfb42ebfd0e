//! Labflow Core
//!
//! The application layer over the engine and the store:
//! - **Sessions**: edit a protocol or a run, save the whole document, keep
//!   store failures in a visible error list
//! - **Formulas**: bind calculator variables and evaluate through an
//!   injected [`FormulaEvaluator`]
//! - **Samples**: join plate mappings with sequencer results into
//!   [`SampleResult`](labflow_model::SampleResult)s
//! - **Export**: sample results as CSV
//! - **Configuration**: [`LabflowConfig`] from an optional TOML file
//!
//! # Example
//!
//! ```rust,ignore
//! use labflow_core::prelude::*;
//!
//! let store = Arc::new(InMemoryStore::new());
//! let mut session = RunSession::start_run(store, &protocol).await?;
//! session.sign_section("prep", "alice", Utc::now())?;
//! if !session.save().await {
//!     eprintln!("{:?}", session.errors());
//! }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod config;
pub mod error;
pub mod export;
pub mod formula;
pub mod samples;
pub mod session;

// Re-exports
pub use config::{ExportConfig, LabflowConfig};
pub use error::{CoreError, FormulaError};
pub use export::{
    export_sample_results, objects_to_csv, sample_result_row, SAMPLE_RESULT_HEADER,
};
pub use formula::{bind_variables, calculate, calculate_block, CalculationOutcome, FormulaEvaluator};
pub use samples::{apply_overrides, collect_sample_results};
pub use session::{ProtocolSession, RunSession};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with Labflow Core
    pub use crate::{
        CalculationOutcome, CoreError, FormulaEvaluator, LabflowConfig, ProtocolSession,
        RunSession,
    };
    pub use labflow_store::{DocumentStore, InMemoryStore};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use labflow_model::RunStatus;
    use labflow_store::{DocumentStore, InMemoryStore};
    use labflow_test_utils::{fixed_time, mapping_row, sample_protocol, sequencer_row, SIGNER, WITNESS};
    use std::sync::Arc;

    #[tokio::test]
    async fn run_to_csv() {
        let store = Arc::new(InMemoryStore::new());
        let mut session = RunSession::start_run(Arc::clone(&store), &sample_protocol())
            .await
            .unwrap();

        assert!(session
            .import_plate_mapping("sampling", "sampler", &[mapping_row("P1", "A1", 1001.0)])
            .unwrap());
        assert!(session
            .import_sequencer_results("sequencing", "seq-end", &[sequencer_row("P1", "A1", "positive")])
            .unwrap());
        for section in ["prep", "sampling", "sequencing"] {
            session.sign_section(section, SIGNER, fixed_time()).unwrap();
            session.witness_section(section, WITNESS, fixed_time()).unwrap();
        }
        assert!(session.save().await);

        let stored = store.run(session.run().id.as_deref().unwrap()).await.unwrap();
        assert_eq!(stored.status, RunStatus::Completed);

        let csv = export_sample_results(&session.sample_results(), &ExportConfig::default());
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines[0], SAMPLE_RESULT_HEADER);
        assert!(lines[1].starts_with("1001,"));
        assert!(lines[1].contains(",positive,alice,bob,Saturday, May 1, 2021 9:00 AM"));
    }
}
