//! Labflow Plate
//!
//! Resolves human-entered plate data into the numeric records stored in run
//! blocks:
//! - Well labels (`"A1"`, `"AB12"`) to [`PlateCoordinate`]s
//! - Uploaded rows, header-keyed or positional, remapped to canonical columns
//! - Canonical rows normalized into plate mappings, marker tables and
//!   sequencer results
//!
//! Everything here is synchronous and pure. Spreadsheet decoding happens
//! before rows reach this crate.
//!
//! # Example
//!
//! ```rust,ignore
//! use labflow_plate::prelude::*;
//!
//! let rows = remap_columns(&raw_rows, &default_mapping(TableKind::PlateMapping));
//! let mappings = plate_mapping(&rows)?;
//! ```
//!
//! [`PlateCoordinate`]: labflow_model::PlateCoordinate

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod coordinate;
pub mod error;
pub mod normalize;
pub mod table;

// Re-exports
pub use coordinate::{cell_to_coordinate, coordinate_to_cell, row_from_letters, row_label};
pub use error::{CoordinateError, NormalizeError};
pub use normalize::{plate_mapping, plate_markers, sequencer_results};
pub use table::{
    available_columns, columns, default_mapping, remap_columns, remap_upload, ColumnSource,
    RawRow, Row, TableKind,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with uploaded plate data
    pub use crate::{
        cell_to_coordinate, default_mapping, plate_mapping, plate_markers, remap_columns,
        remap_upload, sequencer_results, ColumnSource, NormalizeError, RawRow, Row, TableKind,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
