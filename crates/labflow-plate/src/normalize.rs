//! Table mapping normalization
//!
//! Turns canonical upload [`Row`]s into the plate records stored in run
//! blocks:
//! - [`plate_mapping`]: plate barcode to resolved wells
//! - [`plate_markers`]: marker pair to well table
//! - [`sequencer_results`]: sequencer output rows with resolved wells
//!
//! Each function either returns a complete result or an error. Nothing is
//! partially produced, so a caller that only applies `Ok` values never
//! leaves a block half-updated.

use crate::coordinate::cell_to_coordinate;
use crate::error::NormalizeError;
use crate::table::{columns, Row, TableKind};
use indexmap::IndexMap;
use labflow_model::{CellValue, PlateCoordinate, PlateMappings, PlateMarkerEntry, PlateResult};

/// Group rows by plate barcode into resolved wells
///
/// Every row must name its plate. The `sample` column is kept only when it
/// is numeric; text sample values are dropped so free text is never taken
/// for a barcode.
///
/// Only the first plate encountered is kept. Rows for any other plate are
/// discarded with a warning; multi-plate sheets must be split before upload.
pub fn plate_mapping(rows: &[Row]) -> Result<PlateMappings, NormalizeError> {
    let mut first_plate: Option<String> = None;
    let mut coordinates = Vec::new();
    let mut dropped: IndexMap<String, usize> = IndexMap::new();

    for (index, row) in rows.iter().enumerate() {
        let plate = text_field(row, columns::PLATE).ok_or_else(|| {
            tracing::warn!(row = index, "plate mapping row has no plate label");
            NormalizeError::missing(index, columns::PLATE)
        })?;

        match &first_plate {
            Some(first) if *first != plate => {
                *dropped.entry(plate).or_default() += 1;
                continue;
            }
            Some(_) => {}
            None => first_plate = Some(plate),
        }

        let mut coordinate = resolve(index, row, columns::CELL)?;
        if let Some(CellValue::Number(sample)) = row.get(columns::SAMPLE) {
            coordinate.sample_label = Some(*sample);
        }
        coordinates.push(coordinate);
    }

    let Some(plate) = first_plate else {
        tracing::warn!("plate mapping upload has no rows");
        return Err(NormalizeError::Empty(TableKind::PlateMapping));
    };

    if !dropped.is_empty() {
        tracing::warn!(
            kept = %plate,
            dropped = ?dropped.keys().collect::<Vec<_>>(),
            "plate mapping upload spans several plates; only the first is kept"
        );
    }
    tracing::debug!(plate = %plate, wells = coordinates.len(), "normalized plate mapping");

    let mut mappings = PlateMappings::new();
    mappings.insert(plate, coordinates);
    Ok(mappings)
}

/// Key marker rows by their concatenated marker pair
///
/// Rows with neither marker are skipped. A well may be given either as a
/// `plateCell` label or as numeric `plateRow`/`plateColumn`. Later rows with
/// the same marker pair replace earlier ones.
pub fn plate_markers(rows: &[Row]) -> Result<IndexMap<String, PlateMarkerEntry>, NormalizeError> {
    let mut entries = IndexMap::new();
    let mut skipped = 0usize;

    for (index, row) in rows.iter().enumerate() {
        let marker1 = text_field(row, columns::MARKER1);
        let marker2 = text_field(row, columns::MARKER2);
        if marker1.is_none() && marker2.is_none() {
            skipped += 1;
            continue;
        }

        let (plate_row, plate_column) = if row.contains_key(columns::PLATE_CELL) {
            let coordinate = resolve(index, row, columns::PLATE_CELL)?;
            (coordinate.row, coordinate.col)
        } else {
            (
                index_field(index, row, columns::PLATE_ROW)?,
                index_field(index, row, columns::PLATE_COLUMN)?,
            )
        };

        let entry = PlateMarkerEntry {
            marker1,
            marker2,
            plate_index: index_field(index, row, columns::PLATE_INDEX)?,
            plate_row,
            plate_column,
        };
        entries.insert(entry.key(), entry);
    }

    if skipped > 0 {
        tracing::warn!(skipped, "skipped marker rows without markers");
    }
    if entries.is_empty() {
        tracing::warn!("plate marker upload has no usable rows");
        return Err(NormalizeError::Empty(TableKind::PlateMarkers));
    }
    Ok(entries)
}

/// Resolve sequencer output rows
///
/// Each row's `plateCell` becomes `plateRow`/`plateCol`; every other column
/// is carried through. Rows without a `plateCell` are skipped.
pub fn sequencer_results(rows: &[Row]) -> Result<Vec<PlateResult>, NormalizeError> {
    let mut results = Vec::with_capacity(rows.len());
    let mut skipped = 0usize;

    for (index, row) in rows.iter().enumerate() {
        if text_field(row, columns::PLATE_CELL).is_none() {
            skipped += 1;
            continue;
        }
        let coordinate = resolve(index, row, columns::PLATE_CELL)?;

        let mut result = PlateResult {
            plate_row: coordinate.row,
            plate_col: coordinate.col,
            ..Default::default()
        };
        for (column, value) in row {
            match column.as_str() {
                columns::PLATE_CELL => {}
                columns::PLATE_LABEL => result.plate_label = non_blank(value),
                columns::MARKER1 => result.marker1 = non_blank(value),
                columns::MARKER2 => result.marker2 = non_blank(value),
                columns::CLASSIFICATION => result.classification = non_blank(value),
                columns::PLATE_INDEX => {
                    result.plate_index = index_field(index, row, columns::PLATE_INDEX)?;
                }
                _ => {
                    result.extra.insert(column.clone(), value.clone());
                }
            }
        }
        results.push(result);
    }

    if skipped > 0 {
        tracing::warn!(skipped, "skipped sequencer rows without a plate cell");
    }
    if results.is_empty() {
        tracing::warn!("sequencer upload has no usable rows");
        return Err(NormalizeError::Empty(TableKind::SequencerResults));
    }
    Ok(results)
}

fn resolve(index: usize, row: &Row, column: &'static str) -> Result<PlateCoordinate, NormalizeError> {
    let label = row.get(column).map(CellValue::to_text);
    cell_to_coordinate(label.as_deref()).map_err(|source| {
        tracing::warn!(row = index, %source, "rejecting upload");
        NormalizeError::MalformedCell { row: index, source }
    })
}

fn non_blank(value: &CellValue) -> Option<String> {
    if value.is_blank() {
        None
    } else {
        Some(value.to_text().trim().to_string())
    }
}

fn text_field(row: &Row, column: &str) -> Option<String> {
    row.get(column).and_then(non_blank)
}

fn index_field(index: usize, row: &Row, column: &'static str) -> Result<Option<u32>, NormalizeError> {
    let Some(value) = row.get(column).filter(|v| !v.is_blank()) else {
        return Ok(None);
    };
    let parsed = match value {
        CellValue::Number(n) if n.fract() == 0.0 && *n >= 0.0 && *n <= f64::from(u32::MAX) => {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            Some(*n as u32)
        }
        CellValue::Number(_) => None,
        CellValue::Text(text) => text.trim().parse::<u32>().ok(),
    };
    parsed
        .map(Some)
        .ok_or_else(|| NormalizeError::invalid(index, column, value.to_text()))
}
