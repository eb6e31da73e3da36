//! md-core: Core library for loading and merging versioned master data
//!
//! This library provides functionality to:
//! - Read and write BOM-prefixed CSV/TSV files with comment rows and
//!   marked columns
//! - Convert a loaded grid into values keyed by (record id, column)
//! - Merge a version directory's delete/update/insert files into a table
//! - Order version directories by their numeric segments

pub mod batch;
pub mod error;
pub mod master;
pub mod paths;
pub mod table;
pub mod tabular;
pub mod version;

pub use batch::{BatchFile, TableSpec};
pub use error::{Error, Result};
pub use master::{EditKind, MasterTable, MergeSummary, NameMatch};
pub use paths::{
    base_name_with_extension, base_name_without_extension, directory_exists, discover_files,
    path_exists,
};
pub use table::{
    first_duplicate, has_duplicates, pluck_column, pluck_ids, CellKey, ColumnFilter, EditSet,
    RecordId, ID_COLUMN,
};
pub use tabular::{
    convert_grid, load_edit_set, load_grid, load_keyed_map, parse_grid_str, write_grid, Grid,
    LoadOptions,
};
pub use version::{find_previous, list_versions, max_version, slice_versions, sort_versions};
