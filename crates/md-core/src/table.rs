//! Core types for representing keyed master data

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::hash::Hash;

/// Record identifier taken from the `id` column
pub type RecordId = u64;

/// Name of the column every source file must carry
pub const ID_COLUMN: &str = "id";

/// Address of a single cell: record id plus column name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellKey {
    /// Record id
    pub id: RecordId,
    /// Column name
    pub column: String,
}

impl CellKey {
    /// Create a new cell key
    pub fn new(id: RecordId, column: impl Into<String>) -> Self {
        Self {
            id,
            column: column.into(),
        }
    }

    /// True if this key addresses the `id` column
    pub fn is_id(&self) -> bool {
        self.column == ID_COLUMN
    }
}

/// Cell values keyed by (id, column).
///
/// Used both for a table's full state and for the edits read from one file.
pub type EditSet = HashMap<CellKey, String>;

/// Allow-list of column names to keep; empty keeps every column
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnFilter(BTreeSet<String>);

impl ColumnFilter {
    /// Filter that keeps every column
    pub fn all() -> Self {
        Self::default()
    }

    /// Filter that keeps only the named columns (plus `id`)
    pub fn only<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(columns.into_iter().map(Into::into).collect())
    }

    /// Whether the filter keeps every column
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether a column survives the filter. The `id` column always does.
    pub fn keeps(&self, column: &str) -> bool {
        self.0.is_empty() || column == ID_COLUMN || self.0.contains(column)
    }
}

/// Collect the ids of every `id` key in the map, sorted ascending
pub fn pluck_ids(map: &EditSet) -> Vec<RecordId> {
    let mut ids: Vec<RecordId> = map.keys().filter(|k| k.is_id()).map(|k| k.id).collect();
    ids.sort_unstable();
    ids
}

/// Collect every value of one column, ordered by record id
pub fn pluck_column<'a>(map: &'a EditSet, column: &str) -> Vec<&'a str> {
    let mut values: Vec<(RecordId, &str)> = map
        .iter()
        .filter(|(k, _)| k.column == column)
        .map(|(k, v)| (k.id, v.as_str()))
        .collect();
    values.sort_unstable_by_key(|(id, _)| *id);
    values.into_iter().map(|(_, v)| v).collect()
}

/// Return the first value that appears more than once, if any
pub fn first_duplicate<T, I>(values: I) -> Option<T>
where
    T: Eq + Hash + Clone,
    I: IntoIterator<Item = T>,
{
    let mut seen = HashSet::new();
    values.into_iter().find(|v| !seen.insert(v.clone()))
}

/// Check whether a sequence contains any repeated value
pub fn has_duplicates<T, I>(values: I) -> bool
where
    T: Eq + Hash + Clone,
    I: IntoIterator<Item = T>,
{
    first_duplicate(values).is_some()
}
