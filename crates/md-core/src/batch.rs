//! Batch file describing several tables to merge from one version root

use crate::error::{Error, Result};
use crate::master::{MasterTable, NameMatch};
use crate::table::ColumnFilter;
use crate::tabular::load_keyed_map;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

fn default_extension() -> String {
    "csv".to_string()
}

/// One table to build from a version root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSpec {
    /// Table name, matched against edit file base names
    pub name: String,
    /// File extension of the edit files
    #[serde(default = "default_extension")]
    pub extension: String,
    /// How edit file base names select the table
    #[serde(default)]
    pub name_match: NameMatch,
    /// Columns to keep; empty keeps all
    #[serde(default)]
    pub columns: Vec<String>,
    /// Snapshot to start from; a missing file starts empty
    #[serde(default)]
    pub base: Option<PathBuf>,
}

impl TableSpec {
    /// Build the table, seeded from `base` when given
    pub fn build(&self) -> Result<MasterTable> {
        let columns = ColumnFilter::only(self.columns.iter().cloned());
        let cells = match &self.base {
            Some(path) => load_keyed_map(path, &columns)?,
            None => Default::default(),
        };
        Ok(MasterTable::new(self.name.clone(), &self.extension, cells)
            .with_match(self.name_match)
            .with_columns(columns))
    }

    /// Output file name, e.g. `items.csv`
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.name, self.extension.trim_start_matches('.'))
    }
}

/// A batch file listing tables to merge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchFile {
    /// Directory holding the version directories
    pub root: PathBuf,
    /// Output directory for merged tables
    pub output_dir: PathBuf,
    /// First version to apply (inclusive)
    #[serde(default)]
    pub from: Option<String>,
    /// Last version to apply (inclusive)
    #[serde(default)]
    pub to: Option<String>,
    /// Tables to build
    pub tables: Vec<TableSpec>,
}

impl BatchFile {
    /// Load a batch file from JSON
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| Error::FileRead {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(Error::Json)
    }

    /// Save the batch file to JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), content).map_err(|e| Error::FileWrite {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_batch_defaults() {
        let json = r#"{
            "root": "versions",
            "output_dir": "out",
            "tables": [{ "name": "items" }]
        }"#;
        let batch: BatchFile = serde_json::from_str(json).unwrap();

        assert_eq!(batch.from, None);
        assert_eq!(batch.tables[0].extension, "csv");
        assert_eq!(batch.tables[0].name_match, NameMatch::Exact);
        assert!(batch.tables[0].columns.is_empty());
        assert_eq!(batch.tables[0].file_name(), "items.csv");
    }

    #[test]
    fn test_batch_save_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("batch.json");
        let batch = BatchFile {
            root: PathBuf::from("versions"),
            output_dir: PathBuf::from("out"),
            from: Some("1_0".to_string()),
            to: None,
            tables: vec![TableSpec {
                name: "enemies".to_string(),
                extension: "tsv".to_string(),
                name_match: NameMatch::Prefix,
                columns: vec!["hp".to_string()],
                base: None,
            }],
        };

        batch.save(&path).unwrap();
        assert_eq!(BatchFile::load(&path).unwrap(), batch);
    }

    #[test]
    fn test_table_spec_build() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("items.csv");
        fs::write(&base, "id,name,#\n1,sword,x\n").unwrap();

        let spec = TableSpec {
            name: "items".to_string(),
            extension: ".csv".to_string(),
            name_match: NameMatch::Prefix,
            columns: Vec::new(),
            base: Some(base),
        };
        let table = spec.build().unwrap();

        assert_eq!(table.extension(), "csv");
        assert_eq!(table.name_match(), NameMatch::Prefix);
        assert_eq!(table.get(1, "name"), Some("sword"));
        assert_eq!(table.record_count(), 1);
    }

    #[test]
    fn test_batch_name_match_from_json() {
        let json = r#"{
            "root": "versions",
            "output_dir": "out",
            "tables": [
                { "name": "items", "name_match": "prefix" },
                { "name": "enemies", "name_match": "exact" }
            ]
        }"#;
        let batch: BatchFile = serde_json::from_str(json).unwrap();

        assert_eq!(batch.tables[0].name_match, NameMatch::Prefix);
        assert_eq!(batch.tables[1].name_match, NameMatch::Exact);
        assert!(serde_json::from_str::<BatchFile>(&json.replace("\"prefix\"", "\"fuzzy\"")).is_err());
    }

    #[test]
    fn test_batch_save_error_names_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("batch.json");
        let batch = BatchFile {
            root: PathBuf::from("versions"),
            output_dir: PathBuf::from("out"),
            from: None,
            to: None,
            tables: Vec::new(),
        };

        match batch.save(&path) {
            Err(Error::FileWrite { path: failed, .. }) => assert_eq!(failed, path),
            other => panic!("expected FileWrite, got {:?}", other),
        }
    }
}
