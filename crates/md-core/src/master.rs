//! Master table and the version-directory merge engine
//!
//! A version directory holds up to three subdirectories, `delete`, `update`
//! and `insert`. Each contains (at any depth) files whose base name selects
//! the table they apply to. [`MasterTable::merge_directory`] applies them in
//! that fixed order and enforces the id invariants of each kind.

use crate::error::{Error, Result};
use crate::paths::{base_name_without_extension, directory_exists, discover_files};
use crate::table::{first_duplicate, pluck_ids, CellKey, ColumnFilter, EditSet, RecordId, ID_COLUMN};
use crate::tabular::{load_edit_set, Grid};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// How a table's name selects edit files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NameMatch {
    /// Base file name must equal the table name
    #[default]
    Exact,
    /// Base file name must start with the table name
    Prefix,
}

impl NameMatch {
    /// Whether a file's base name (without extension) selects `table`
    pub fn matches(self, table: &str, base_name: &str) -> bool {
        match self {
            NameMatch::Exact => base_name == table,
            NameMatch::Prefix => base_name.starts_with(table),
        }
    }
}

/// The three kinds of edit subdirectory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditKind {
    Delete,
    Update,
    Insert,
}

impl EditKind {
    /// Order in which a version directory is applied.
    ///
    /// Deletes free ids first; inserts come last so an update in the same
    /// version can never land on a freshly inserted record.
    pub const MERGE_ORDER: [EditKind; 3] = [EditKind::Delete, EditKind::Update, EditKind::Insert];

    /// Subdirectory name for this kind
    pub fn dir_name(self) -> &'static str {
        match self {
            EditKind::Delete => "delete",
            EditKind::Update => "update",
            EditKind::Insert => "insert",
        }
    }
}

impl fmt::Display for EditKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// What one [`MasterTable::merge_directory`] call applied
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeSummary {
    /// Edit files applied, in application order
    pub files: Vec<(EditKind, PathBuf)>,
    /// Ids removed by delete files
    pub deleted: usize,
    /// Ids rewritten by update files
    pub updated: usize,
    /// Ids added by insert files
    pub inserted: usize,
}

impl MergeSummary {
    fn record(&mut self, kind: EditKind, path: PathBuf, ids: usize) {
        match kind {
            EditKind::Delete => self.deleted += ids,
            EditKind::Update => self.updated += ids,
            EditKind::Insert => self.inserted += ids,
        }
        self.files.push((kind, path));
    }

    /// Whether no edit file matched the table
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// One logical table of master data, keyed by (id, column).
///
/// Not synchronized: callers merge versions into a table from a single
/// thread, one directory at a time.
#[derive(Debug, Clone, PartialEq)]
pub struct MasterTable {
    name: String,
    extension: String,
    name_match: NameMatch,
    columns: ColumnFilter,
    cells: EditSet,
}

impl MasterTable {
    /// Create a table matching files `<name>.<extension>` exactly, keeping
    /// every column. `extension` may be given with or without its dot.
    pub fn new(name: impl Into<String>, extension: &str, cells: EditSet) -> Self {
        Self {
            name: name.into(),
            extension: extension.trim_start_matches('.').to_string(),
            name_match: NameMatch::Exact,
            columns: ColumnFilter::all(),
            cells,
        }
    }

    /// Set how file names select this table
    pub fn with_match(mut self, name_match: NameMatch) -> Self {
        self.name_match = name_match;
        self
    }

    /// Restrict which columns edit files contribute
    pub fn with_columns(mut self, columns: ColumnFilter) -> Self {
        self.columns = columns;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn name_match(&self) -> NameMatch {
        self.name_match
    }

    pub fn columns(&self) -> &ColumnFilter {
        &self.columns
    }

    /// Current cell values
    pub fn cells(&self) -> &EditSet {
        &self.cells
    }

    /// Consume the table, returning its cell values
    pub fn into_cells(self) -> EditSet {
        self.cells
    }

    /// Look up one cell
    pub fn get(&self, id: RecordId, column: &str) -> Option<&str> {
        self.cells
            .get(&CellKey::new(id, column))
            .map(String::as_str)
    }

    /// Whether a record with this id is present
    pub fn contains_id(&self, id: RecordId) -> bool {
        self.cells.contains_key(&CellKey::new(id, ID_COLUMN))
    }

    /// Ids of all records, ascending
    pub fn ids(&self) -> BTreeSet<RecordId> {
        self.cells.keys().filter(|k| k.is_id()).map(|k| k.id).collect()
    }

    /// Number of records
    pub fn record_count(&self) -> usize {
        self.cells.keys().filter(|k| k.is_id()).count()
    }

    /// Files under `dir` that apply to this table
    pub fn matching_files<P: AsRef<Path>>(&self, dir: P) -> Result<Vec<PathBuf>> {
        let files = discover_files(dir, &[self.extension.as_str()])?;
        Ok(files
            .into_iter()
            .filter(|path| {
                self.name_match
                    .matches(&self.name, &base_name_without_extension(path))
            })
            .collect())
    }

    /// Apply one version directory's delete, update and insert files.
    ///
    /// Fails if none of the three subdirectories exist, if any file is
    /// malformed, if an edit violates its kind's id rule, or if an id is
    /// touched by more than one insert/update edit in this directory. The
    /// table is not rolled back on failure; merge into a clone when the
    /// previous state must survive.
    pub fn merge_directory<P: AsRef<Path>>(&mut self, dir: P) -> Result<MergeSummary> {
        let dir = dir.as_ref();

        let present: Vec<EditKind> = EditKind::MERGE_ORDER
            .into_iter()
            .filter(|kind| directory_exists(dir.join(kind.dir_name())))
            .collect();

        if present.is_empty() {
            return Err(Error::NoEditDirectories {
                dir: dir.to_path_buf(),
                table: self.name.clone(),
            });
        }

        let mut summary = MergeSummary::default();
        let mut edited_ids: Vec<RecordId> = Vec::new();

        for kind in present {
            for path in self.matching_files(dir.join(kind.dir_name()))? {
                let edits = load_edit_set(&path, &self.columns)?;
                let ids = pluck_ids(&edits);

                tracing::debug!(
                    table = %self.name,
                    kind = %kind,
                    path = %path.display(),
                    ids = ids.len(),
                    "applying edit file"
                );

                match kind {
                    EditKind::Delete => self.apply_delete(&edits, &path)?,
                    EditKind::Update => self.apply_update(&edits, &ids, &path)?,
                    EditKind::Insert => self.apply_insert(edits, &ids, &path)?,
                }

                // Deleted ids may be reused by an insert of the same version.
                if kind != EditKind::Delete {
                    edited_ids.extend(&ids);
                }
                summary.record(kind, path, ids.len());
            }
        }

        // Per-file id rule failures take precedence over this check.
        if let Some(id) = first_duplicate(edited_ids.iter().copied()) {
            return Err(Error::IdNotUnique {
                dir: dir.to_path_buf(),
                table: self.name.clone(),
                id,
            });
        }

        tracing::info!(
            table = %self.name,
            dir = %dir.display(),
            files = summary.files.len(),
            deleted = summary.deleted,
            updated = summary.updated,
            inserted = summary.inserted,
            "merged version directory"
        );

        Ok(summary)
    }

    fn apply_delete(&mut self, edits: &EditSet, path: &Path) -> Result<()> {
        if let Some(key) = edits.keys().find(|k| k.is_id() && !self.contains_id(k.id)) {
            return Err(Error::DeleteMissingId {
                id: key.id,
                path: path.to_path_buf(),
            });
        }

        self.remove_keys(edits);
        Ok(())
    }

    fn apply_insert(&mut self, edits: EditSet, ids: &[RecordId], path: &Path) -> Result<()> {
        if let Some(&id) = ids.iter().find(|id| self.contains_id(**id)) {
            return Err(Error::InsertExistingId {
                id,
                path: path.to_path_buf(),
            });
        }

        self.cells.extend(edits);
        Ok(())
    }

    fn apply_update(&mut self, edits: &EditSet, ids: &[RecordId], path: &Path) -> Result<()> {
        if let Some(&id) = ids.iter().find(|id| !self.contains_id(**id)) {
            return Err(Error::UpdateMissingId {
                id,
                path: path.to_path_buf(),
            });
        }

        // Only keys named in the file change; other columns of the record stay.
        self.remove_keys(edits);
        self.cells
            .extend(edits.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(())
    }

    fn remove_keys(&mut self, edits: &EditSet) {
        for key in edits.keys() {
            self.cells.remove(key);
        }
    }

    /// Render the table as a grid: `id` first, remaining columns sorted,
    /// one row per record in id order.
    ///
    /// Fails with [`Error::MissingCell`] when a record lacks a column some
    /// other record carries; a blank cell would not load back.
    pub fn to_grid(&self) -> Result<Grid> {
        let columns: BTreeSet<&str> = self
            .cells
            .keys()
            .filter(|k| !k.is_id())
            .map(|k| k.column.as_str())
            .collect();

        let mut header = vec![ID_COLUMN.to_string()];
        header.extend(columns.iter().map(|c| c.to_string()));

        let mut rows = vec![header];
        for id in self.ids() {
            let mut row = vec![id.to_string()];
            for column in &columns {
                let value = self.get(id, column).ok_or_else(|| Error::MissingCell {
                    table: self.name.clone(),
                    id,
                    column: column.to_string(),
                })?;
                row.push(value.to_string());
            }
            rows.push(row);
        }
        Ok(rows)
    }
}
