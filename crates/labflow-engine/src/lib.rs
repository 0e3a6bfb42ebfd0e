//! Labflow Engine
//!
//! Turns protocol templates into runs and tracks their execution state:
//! - **Materialization**: protocol to blank run, one block per template
//! - **Status**: `todo` / `in-progress` / `completed`, derived from section
//!   sign-offs in document order
//! - **Sign-off**: sign, witness, unsign and unwitness for sections and
//!   protocols
//! - **Editing**: join-by-id updates guarded by sign-off locks, atomic upload
//!   application
//! - **Validation** and **search** over protocol and run documents
//!
//! Every operation here is synchronous and performs no I/O.
//!
//! # Example
//!
//! ```rust,ignore
//! use labflow_engine::prelude::*;
//!
//! let mut run = materialize(&protocol);
//! sign(&mut run.sections[0], "alice", Utc::now())?;
//! assert_eq!(derive_status(&run), RunStatus::InProgress);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod editing;
pub mod error;
pub mod materialize;
pub mod resize;
pub mod search;
pub mod signoff;
pub mod status;
pub mod validation;

// Re-exports
pub use editing::{
    apply_plate_mapping, apply_plate_markers, apply_sequencer_results, block_mut, replace_block,
    replace_section, section_mut,
};
pub use error::EngineError;
pub use materialize::{materialize, materialize_block, materialize_section};
pub use resize::{resize, set_plate_count, sync_plate_labels, trim_empty};
pub use search::{strip_large_fields, strip_protocol, RunFilter};
pub use signoff::{check_signoff, sign, unsign, unwitness, witness, Signable, SignoffFields};
pub use status::{derive_from_sections, derive_status, refresh_status};
pub use validation::{ensure_valid, validate_protocol, ValidationIssue};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with runs
    pub use crate::{
        derive_status, ensure_valid, materialize, refresh_status, replace_block,
        replace_section, sign, unsign, unwitness, witness, EngineError, RunFilter,
    };
    pub use labflow_model::{Block, Protocol, Run, RunStatus, Section};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
