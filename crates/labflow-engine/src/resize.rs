//! Plate-count driven list resizing
//!
//! When a plate count changes, per-slot lists are resized so entries at
//! retained slots survive, new slots start blank and trailing slots are
//! dropped.

use labflow_model::{Block, BlockDefinition, BlockPlate};

/// List of exactly `size` elements, copied from `original` where it has them
///
/// `original` is never modified.
#[must_use]
pub fn resize<T: Clone>(size: usize, fill: T, original: Option<&[T]>) -> Vec<T> {
    let original = original.unwrap_or_default();
    let mut resized = Vec::with_capacity(size);
    resized.extend(original.iter().take(size).cloned());
    resized.resize(size, fill);
    resized
}

/// Drop blank entries
#[must_use]
pub fn trim_empty<S: AsRef<str>>(values: &[S]) -> Vec<String> {
    values
        .iter()
        .filter(|v| !v.as_ref().trim().is_empty())
        .map(|v| v.as_ref().to_string())
        .collect()
}

/// Change the number of plate slots on a template
///
/// Returns `false` for block kinds without plate slots.
pub fn set_plate_count(definition: &mut BlockDefinition, count: usize) -> bool {
    let plates = match definition {
        BlockDefinition::PlateSampler(d) => {
            d.plate_count = Some(count);
            &mut d.plates
        }
        BlockDefinition::StartPlateSequencer(d) => {
            d.plate_count = Some(count);
            &mut d.plates
        }
        BlockDefinition::EndPlateSequencer(d) => &mut d.plates,
        _ => return false,
    };
    *plates = resize(count, BlockPlate::default(), Some(plates.as_slice()));
    tracing::debug!(block = definition.id(), count, "resized plate slots");
    true
}

/// Resize an instance's plate labels to its template's slot count
///
/// Returns `false` for block kinds without per-slot plate labels.
pub fn sync_plate_labels(block: &mut Block) -> bool {
    let (labels, count) = match block {
        Block::PlateSampler(b) => (&mut b.plate_labels, b.definition.input_count()),
        Block::StartPlateSequencer(b) => (&mut b.plate_labels, b.definition.slot_count()),
        _ => return false,
    };
    *labels = resize(count, String::new(), Some(labels.as_slice()));
    true
}
