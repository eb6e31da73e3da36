//! Delimited-text (CSV/TSV) reading and writing, and conversion of a loaded
//! grid into cell-keyed values.

use crate::error::{Error, Result};
use crate::paths::path_exists;
use crate::table::{CellKey, ColumnFilter, EditSet, RecordId, ID_COLUMN};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// UTF-8 byte-order mark
pub const BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Leading character of a comment row
pub const COMMENT_MARKER: u8 = b'#';

/// Header cell marking a column to drop
pub const EXCLUDED_COLUMN_MARKER: &str = "#";

/// Rows of string cells; row 0 is the header
pub type Grid = Vec<Vec<String>>;

/// Field separator, chosen from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Comma,
    Tab,
}

impl Delimiter {
    /// Tab for `.tsv` files, comma for everything else
    pub fn for_path(path: &Path) -> Self {
        if path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("tsv"))
        {
            Delimiter::Tab
        } else {
            Delimiter::Comma
        }
    }

    fn byte(self) -> u8 {
        match self {
            Delimiter::Comma => b',',
            Delimiter::Tab => b'\t',
        }
    }
}

/// Which marked rows and columns to drop while loading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Drop rows whose first field starts with `#`
    pub exclude_comment_rows: bool,
    /// Drop columns whose header cell is exactly `#`
    pub exclude_marked_columns: bool,
}

impl LoadOptions {
    /// Keep every row and column
    pub fn raw() -> Self {
        Self {
            exclude_comment_rows: false,
            exclude_marked_columns: false,
        }
    }
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            exclude_comment_rows: true,
            exclude_marked_columns: true,
        }
    }
}

/// Load a delimited file into a grid
pub fn load_grid<P: AsRef<Path>>(path: P, options: LoadOptions) -> Result<Grid> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    parse_grid(&bytes, path, Delimiter::for_path(path), options)
}

/// Parse delimited text from a string (useful for testing)
pub fn parse_grid_str(content: &str, source_name: &str, options: LoadOptions) -> Result<Grid> {
    let path = Path::new(source_name);
    parse_grid(content.as_bytes(), path, Delimiter::for_path(path), options)
}

fn parse_grid(bytes: &[u8], source: &Path, delimiter: Delimiter, options: LoadOptions) -> Result<Grid> {
    let body = bytes.strip_prefix(&BOM[..]).unwrap_or(bytes);

    let mut builder = csv::ReaderBuilder::new();
    builder.has_headers(false).delimiter(delimiter.byte());
    if options.exclude_comment_rows {
        builder.comment(Some(COMMENT_MARKER));
    }
    let mut reader = builder.from_reader(body);

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| Error::Csv {
            path: source.to_path_buf(),
            source: e,
        })?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    if options.exclude_marked_columns {
        rows = exclude_marked_columns(rows);
    }

    Ok(rows)
}

/// Remove every column whose header cell is the exclusion marker
fn exclude_marked_columns(rows: Grid) -> Grid {
    let Some(header) = rows.first() else {
        return rows;
    };

    let marked: Vec<usize> = header
        .iter()
        .enumerate()
        .filter(|(_, cell)| cell.as_str() == EXCLUDED_COLUMN_MARKER)
        .map(|(i, _)| i)
        .collect();

    if marked.is_empty() {
        return rows;
    }

    rows.into_iter()
        .map(|row| {
            row.into_iter()
                .enumerate()
                .filter(|(i, _)| !marked.contains(i))
                .map(|(_, cell)| cell)
                .collect()
        })
        .collect()
}

/// Write a grid as a BOM-prefixed delimited file, replacing any existing file
pub fn write_grid<P: AsRef<Path>>(path: P, rows: &[Vec<String>]) -> Result<()> {
    let path = path.as_ref();
    let write_err = |e: std::io::Error| Error::FileWrite {
        path: path.to_path_buf(),
        source: e,
    };
    let csv_err = |e: csv::Error| Error::Csv {
        path: path.to_path_buf(),
        source: e,
    };

    let file = File::create(path).map_err(write_err)?;
    let mut out = BufWriter::new(file);
    out.write_all(&BOM).map_err(write_err)?;

    let mut writer = csv::WriterBuilder::new()
        .delimiter(Delimiter::for_path(path).byte())
        .flexible(true)
        .from_writer(out);

    for row in rows {
        writer.write_record(row).map_err(csv_err)?;
    }
    writer.flush().map_err(write_err)?;

    Ok(())
}

/// Convert a grid into cell-keyed values.
///
/// Row 0 names the columns and must contain `id`. Every kept cell of every
/// data row becomes one entry; blank cells and repeated (id, column) pairs
/// are errors. `source` is only used in error messages.
pub fn convert_grid(rows: &[Vec<String>], source: &Path, filter: &ColumnFilter) -> Result<EditSet> {
    let missing_id = || Error::MissingIdColumn {
        path: source.to_path_buf(),
    };

    let (header, data) = rows.split_first().ok_or_else(missing_id)?;
    let id_index = header
        .iter()
        .position(|name| name == ID_COLUMN)
        .ok_or_else(missing_id)?;

    let mut converted = EditSet::new();
    for (offset, row) in data.iter().enumerate() {
        let row_number = offset + 1;
        let id = parse_id(row.get(id_index), source, row_number)?;

        for (column, value) in header.iter().zip(row) {
            if !filter.keeps(column) {
                continue;
            }

            let key = CellKey::new(id, column.as_str());
            if converted.contains_key(&key) {
                return Err(Error::DuplicateKey {
                    path: source.to_path_buf(),
                    row: row_number,
                    id,
                    column: column.clone(),
                });
            }
            if value.is_empty() {
                return Err(Error::EmptyValue {
                    path: source.to_path_buf(),
                    row: row_number,
                    column: column.clone(),
                });
            }
            converted.insert(key, value.clone());
        }
    }

    Ok(converted)
}

fn parse_id(cell: Option<&String>, source: &Path, row: usize) -> Result<RecordId> {
    match cell.map(String::as_str) {
        None | Some("") => Err(Error::EmptyValue {
            path: source.to_path_buf(),
            row,
            column: ID_COLUMN.to_string(),
        }),
        Some(value) => value.parse().map_err(|_| Error::InvalidId {
            path: source.to_path_buf(),
            row,
            value: value.to_string(),
        }),
    }
}

/// Load one file as an edit set, dropping comment rows and marked columns
pub fn load_edit_set<P: AsRef<Path>>(path: P, filter: &ColumnFilter) -> Result<EditSet> {
    let path = path.as_ref();
    let rows = load_grid(path, LoadOptions::default())?;
    convert_grid(&rows, path, filter)
}

/// Like [`load_edit_set`], but a missing file yields an empty map
pub fn load_keyed_map<P: AsRef<Path>>(path: P, filter: &ColumnFilter) -> Result<EditSet> {
    let path = path.as_ref();
    if !path_exists(path) {
        return Ok(EditSet::new());
    }
    load_edit_set(path, filter)
}
