//! Editing sessions
//!
//! A session owns one document being edited plus a handle to the store it
//! is saved to. Edits are applied locally through the engine; `save` sends
//! the whole document and records store failures in [`errors`] instead of
//! returning them, so an editor can keep working and show them.
//!
//! [`errors`]: RunSession::errors

mod protocol;
mod run;

pub use protocol::ProtocolSession;
pub use run::RunSession;

use crate::error::CoreError;
use labflow_engine::EngineError;
use ulid::Ulid;

/// Fresh id for a section, block, option or plate slot
pub(crate) fn new_id() -> String {
    Ulid::new().to_string()
}

/// Move the element matching `pred` to `to`, clamped to the end
pub(crate) fn move_where<T>(items: &mut Vec<T>, pred: impl Fn(&T) -> bool, to: usize) -> bool {
    let Some(from) = items.iter().position(pred) else {
        return false;
    };
    let item = items.remove(from);
    let to = to.min(items.len());
    items.insert(to, item);
    true
}

/// Map an upload outcome: an empty upload is a warning and applies nothing
pub(crate) fn upload_outcome(result: Result<(), EngineError>) -> Result<bool, CoreError> {
    match result {
        Ok(()) => Ok(true),
        Err(err) if err.is_empty_upload() => {
            tracing::warn!(error = %err, "upload ignored");
            Ok(false)
        }
        Err(err) => Err(err.into()),
    }
}
