//! Uploaded tabular rows
//!
//! Spreadsheet decoding happens outside this crate. What arrives here is an
//! ordered sequence of rows, either keyed by header ([`RawRow::Object`]) or
//! positional for headerless sheets ([`RawRow::Array`]). [`remap_upload`]
//! turns them into canonical [`Row`]s keyed by the column names the
//! normalizers expect.

use indexmap::IndexMap;
use labflow_model::CellValue;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Canonical row: column name to cell value
pub type Row = IndexMap<String, CellValue>;

/// Column names read by the normalizers
pub mod columns {
    /// Plate barcode (plate mapping uploads)
    pub const PLATE: &str = "plate";
    /// Well label (plate mapping uploads)
    pub const CELL: &str = "cell";
    /// Sample barcode (plate mapping uploads)
    pub const SAMPLE: &str = "sample";
    /// First index marker
    pub const MARKER1: &str = "marker1";
    /// Second index marker
    pub const MARKER2: &str = "marker2";
    /// Plate position within a sequencing batch
    pub const PLATE_INDEX: &str = "plateIndex";
    /// Well label (marker and sequencer uploads)
    pub const PLATE_CELL: &str = "plateCell";
    /// Resolved row (marker uploads)
    pub const PLATE_ROW: &str = "plateRow";
    /// Resolved column (marker uploads)
    pub const PLATE_COLUMN: &str = "plateColumn";
    /// Plate barcode (sequencer uploads)
    pub const PLATE_LABEL: &str = "plateLabel";
    /// Result call (sequencer uploads)
    pub const CLASSIFICATION: &str = "classification";
}

/// Which normalization an upload is destined for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TableKind {
    /// Plate barcode to well mapping
    PlateMapping,
    /// Marker pair to well table
    PlateMarkers,
    /// Sequencer output rows
    SequencerResults,
}

impl TableKind {
    /// Canonical columns this kind of upload reads
    #[must_use]
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            TableKind::PlateMapping => &[columns::PLATE, columns::CELL, columns::SAMPLE],
            TableKind::PlateMarkers => &[
                columns::MARKER1,
                columns::MARKER2,
                columns::PLATE_INDEX,
                columns::PLATE_CELL,
                columns::PLATE_ROW,
                columns::PLATE_COLUMN,
            ],
            TableKind::SequencerResults => &[
                columns::PLATE_LABEL,
                columns::PLATE_INDEX,
                columns::PLATE_CELL,
                columns::MARKER1,
                columns::MARKER2,
                columns::CLASSIFICATION,
            ],
        }
    }

    /// Whether source columns outside [`columns`](Self::columns) travel with the row
    #[must_use]
    pub fn carries_extra_columns(&self) -> bool {
        matches!(self, TableKind::SequencerResults)
    }
}

impl Display for TableKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TableKind::PlateMapping => "plate mapping",
            TableKind::PlateMarkers => "plate marker",
            TableKind::SequencerResults => "sequencer result",
        })
    }
}

/// Row as produced by the upload source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawRow {
    /// Header-keyed row
    Object(IndexMap<String, CellValue>),
    /// Positional row from a headerless sheet
    Array(Vec<CellValue>),
}

impl RawRow {
    /// Cell under a header or at a 1-based position
    #[must_use]
    pub fn get(&self, source: &ColumnSource) -> Option<&CellValue> {
        match (self, source) {
            (RawRow::Object(map), ColumnSource::Header(name)) => map.get(name),
            (RawRow::Array(cells), ColumnSource::Position(pos)) => {
                pos.checked_sub(1).and_then(|i| cells.get(i))
            }
            _ => None,
        }
    }

    /// Every cell with the source it is read from
    #[must_use]
    pub fn cells(&self) -> Vec<(ColumnSource, &CellValue)> {
        match self {
            RawRow::Object(map) => map
                .iter()
                .map(|(name, value)| (ColumnSource::Header(name.clone()), value))
                .collect(),
            RawRow::Array(cells) => cells
                .iter()
                .enumerate()
                .map(|(i, value)| (ColumnSource::Position(i + 1), value))
                .collect(),
        }
    }
}

/// Where a canonical column is read from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnSource {
    /// 1-based position in a headerless row
    Position(usize),
    /// Header name
    Header(String),
}

impl Display for ColumnSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ColumnSource::Position(pos) => write!(f, "{pos}"),
            ColumnSource::Header(name) => f.write_str(name),
        }
    }
}

/// Column choices offered for an upload, taken from its first row
#[must_use]
pub fn available_columns(rows: &[RawRow]) -> Vec<ColumnSource> {
    match rows.first() {
        None => Vec::new(),
        Some(RawRow::Object(map)) => map.keys().cloned().map(ColumnSource::Header).collect(),
        Some(RawRow::Array(cells)) => (1..=cells.len()).map(ColumnSource::Position).collect(),
    }
}

/// Identity mapping: each canonical column read from the header of the same name
#[must_use]
pub fn default_mapping(kind: TableKind) -> IndexMap<String, ColumnSource> {
    kind.columns()
        .iter()
        .map(|c| ((*c).to_string(), ColumnSource::Header((*c).to_string())))
        .collect()
}

/// Project raw rows onto canonical column names
///
/// Canonical columns with no source, or whose source cell is missing, are
/// left out of the row rather than filled with a placeholder.
#[must_use]
pub fn remap_columns(rows: &[RawRow], mapping: &IndexMap<String, ColumnSource>) -> Vec<Row> {
    rows.iter()
        .map(|raw| {
            mapping
                .iter()
                .filter_map(|(column, source)| {
                    raw.get(source).map(|value| (column.clone(), value.clone()))
                })
                .collect::<Row>()
        })
        .collect()
}

/// Remap an upload destined for `kind`
///
/// Sequencer uploads also keep every source column the mapping does not
/// read: header-keyed cells under their header, positional cells under their
/// 1-based position. A leftover column named like a canonical one is dropped
/// so it cannot stand in for a column the mapping reads elsewhere.
#[must_use]
pub fn remap_upload(
    kind: TableKind,
    rows: &[RawRow],
    mapping: &IndexMap<String, ColumnSource>,
) -> Vec<Row> {
    let mut remapped = remap_columns(rows, mapping);
    if !kind.carries_extra_columns() {
        return remapped;
    }
    for (row, raw) in remapped.iter_mut().zip(rows) {
        for (source, value) in raw.cells() {
            if mapping.values().any(|mapped| *mapped == source) {
                continue;
            }
            let key = source.to_string();
            if kind.columns().contains(&key.as_str()) {
                continue;
            }
            row.entry(key).or_insert_with(|| value.clone());
        }
    }
    remapped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(pairs: &[(&str, CellValue)]) -> RawRow {
        RawRow::Object(pairs.iter().map(|(k, v)| ((*k).to_string(), v.clone())).collect())
    }

    #[test]
    fn raw_rows_deserialize_both_shapes() {
        let rows: Vec<RawRow> =
            serde_json::from_str(r#"[{"Barcode": "P1", "Well": "A1"}, ["P1", "A2", 7]]"#).unwrap();
        assert!(matches!(rows[0], RawRow::Object(_)));
        assert!(matches!(rows[1], RawRow::Array(ref c) if c.len() == 3));
    }

    #[test]
    fn remap_by_header() {
        let rows = vec![object(&[
            ("Barcode", "P1".into()),
            ("Well", "B3".into()),
            ("Ignored", 1.0.into()),
        ])];
        let mut mapping = IndexMap::new();
        mapping.insert("plate".to_string(), ColumnSource::Header("Barcode".to_string()));
        mapping.insert("cell".to_string(), ColumnSource::Header("Well".to_string()));
        mapping.insert("sample".to_string(), ColumnSource::Header("Sample".to_string()));

        let remapped = remap_columns(&rows, &mapping);
        assert_eq!(remapped[0].len(), 2);
        assert_eq!(remapped[0]["plate"], CellValue::from("P1"));
        assert!(!remapped[0].contains_key("sample"));
    }

    #[test]
    fn remap_by_position_is_one_based() {
        let rows = vec![RawRow::Array(vec!["P1".into(), "C4".into(), 55.0.into()])];
        let mut mapping = IndexMap::new();
        mapping.insert("cell".to_string(), ColumnSource::Position(2));
        mapping.insert("sample".to_string(), ColumnSource::Position(3));
        mapping.insert("plate".to_string(), ColumnSource::Position(0));

        let remapped = remap_columns(&rows, &mapping);
        assert_eq!(remapped[0]["cell"], CellValue::from("C4"));
        assert_eq!(remapped[0]["sample"], CellValue::Number(55.0));
        assert!(!remapped[0].contains_key("plate"));
    }

    #[test]
    fn available_columns_follow_row_shape() {
        assert!(available_columns(&[]).is_empty());
        let headerless = vec![RawRow::Array(vec![1.0.into(), 2.0.into()])];
        assert_eq!(
            available_columns(&headerless),
            vec![ColumnSource::Position(1), ColumnSource::Position(2)]
        );
    }

    #[test]
    fn sequencer_uploads_keep_unmapped_columns() {
        let rows = vec![
            object(&[
                ("Well", "B2".into()),
                ("plateCell", "Z9".into()),
                ("reads", 1520.0.into()),
            ]),
            RawRow::Array(vec!["C3".into(), 0.97.into()]),
        ];
        let mut mapping = default_mapping(TableKind::SequencerResults);
        mapping.insert(columns::PLATE_CELL.to_string(), ColumnSource::Header("Well".to_string()));
        let remapped = remap_upload(TableKind::SequencerResults, &rows[..1], &mapping);
        assert_eq!(remapped[0][columns::PLATE_CELL], CellValue::from("B2"));
        assert_eq!(remapped[0]["reads"], CellValue::Number(1520.0));
        assert!(!remapped[0].contains_key("Well"));

        mapping.insert(columns::PLATE_CELL.to_string(), ColumnSource::Position(1));
        let remapped = remap_upload(TableKind::SequencerResults, &rows[1..], &mapping);
        assert_eq!(remapped[0][columns::PLATE_CELL], CellValue::from("C3"));
        assert_eq!(remapped[0]["2"], CellValue::Number(0.97));
        assert_eq!(remapped[0].len(), 2);
    }

    #[test]
    fn other_uploads_stay_canonical() {
        let rows = vec![object(&[
            ("plate", "P1".into()),
            ("cell", "A1".into()),
            ("operator", "alice".into()),
        ])];
        let mapping = default_mapping(TableKind::PlateMapping);
        assert_eq!(
            remap_upload(TableKind::PlateMapping, &rows, &mapping),
            remap_columns(&rows, &mapping)
        );
        assert!(!remap_upload(TableKind::PlateMapping, &rows, &mapping)[0].contains_key("operator"));
    }

    #[test]
    fn default_mapping_covers_kind_columns() {
        let mapping = default_mapping(TableKind::PlateMapping);
        assert_eq!(mapping.len(), 3);
        assert_eq!(mapping["cell"], ColumnSource::Header("cell".to_string()));
    }
}
