//! Run Status State Machine
//!
//! Run status is never stored as an independent fact. It is recomputed from
//! the sections on every save:
//!
//! ```text
//!   todo ──(any section signed or witnessed)──▶ in-progress
//!   in-progress ──(every section from the first touched one is closed)──▶ completed
//! ```
//!
//! Sections are evaluated in document order. Once any section has been
//! touched, every later section must also be signed and witnessed before the
//! run counts as completed. Sections that opt out of both signature and
//! witness are skipped.

use labflow_model::{Run, RunStatus, Section};

/// Derive the status of a run from its sections
#[must_use]
pub fn derive_status(run: &Run) -> RunStatus {
    derive_from_sections(&run.sections)
}

/// Derive a status from an ordered list of sections
#[must_use]
pub fn derive_from_sections(sections: &[Section]) -> RunStatus {
    let mut in_progress = false;

    for section in sections.iter().filter(|s| s.definition.is_signable()) {
        if section.is_touched() {
            in_progress = true;
        }
        if in_progress && !section.is_closed() {
            tracing::debug!(section = section.id(), "open section keeps run in progress");
            return RunStatus::InProgress;
        }
    }

    if in_progress {
        RunStatus::Completed
    } else {
        RunStatus::Todo
    }
}

/// Recompute and store the status, returning whether it changed
pub fn refresh_status(run: &mut Run) -> bool {
    let status = derive_status(run);
    if status == run.status {
        return false;
    }
    tracing::info!(
        run = run.id.as_deref().unwrap_or("<unsaved>"),
        from = %run.status,
        to = %status,
        "run status changed"
    );
    run.status = status;
    true
}
