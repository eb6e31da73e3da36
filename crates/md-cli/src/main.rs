//! Master data merge CLI
//!
//! Command-line tool for inspecting delimited master data files and merging
//! versioned insert/update/delete directories into full tables.

use clap::{Parser, Subcommand};
use md_core::{
    list_versions, load_grid, slice_versions, write_grid, BatchFile, Error, LoadOptions,
    MasterTable, NameMatch, TableSpec,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "md-cli")]
#[command(about = "Versioned master data merge tool", long_about = None)]
#[command(version)]
struct Cli {
    /// Log merge progress (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and display a single CSV/TSV file
    Parse {
        /// Path to the file
        #[arg(short, long)]
        file: PathBuf,

        /// Keep rows starting with '#'
        #[arg(long)]
        keep_comments: bool,

        /// Keep columns headed '#'
        #[arg(long)]
        keep_marked: bool,

        /// Maximum number of rows to display
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },

    /// List version directories in merge order
    Versions {
        /// Directory holding the version directories
        #[arg(short, long)]
        root: PathBuf,
    },

    /// Merge version directories into one table
    Merge {
        /// Directory holding the version directories
        #[arg(short, long)]
        root: PathBuf,

        /// Table name (edit file base name)
        #[arg(short, long)]
        table: String,

        /// Edit file extension
        #[arg(long, default_value = "csv")]
        ext: String,

        /// Match file names by prefix instead of exactly
        #[arg(long)]
        prefix: bool,

        /// Columns to keep (comma-separated)
        #[arg(short, long)]
        columns: Option<String>,

        /// Snapshot to start from
        #[arg(short, long)]
        base: Option<PathBuf>,

        /// First version to apply
        #[arg(long)]
        from: Option<String>,

        /// Last version to apply
        #[arg(long)]
        to: Option<String>,

        /// Output file; prints the table when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Maximum number of rows to print
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Merge every table listed in a batch file
    Batch {
        /// Path to batch file (JSON)
        #[arg(short, long)]
        batch: PathBuf,
    },

    /// Create a batch file template
    CreateBatch {
        /// Output path for the batch file
        #[arg(short, long)]
        output: PathBuf,

        /// Directory holding the version directories
        #[arg(short, long)]
        root: PathBuf,

        /// Output directory for merged tables
        #[arg(long)]
        export_dir: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(command: Commands) -> md_core::Result<()> {
    match command {
        Commands::Parse {
            file,
            keep_comments,
            keep_marked,
            limit,
        } => cmd_parse(&file, keep_comments, keep_marked, limit),
        Commands::Versions { root } => cmd_versions(&root),
        Commands::Merge {
            root,
            table,
            ext,
            prefix,
            columns,
            base,
            from,
            to,
            output,
            limit,
        } => {
            let spec = TableSpec {
                name: table,
                extension: ext,
                name_match: if prefix { NameMatch::Prefix } else { NameMatch::Exact },
                columns: split_columns(columns.as_deref()),
                base,
            };
            cmd_merge(&root, &spec, from.as_deref(), to.as_deref(), output.as_deref(), limit)
        }
        Commands::Batch { batch } => cmd_batch(&batch),
        Commands::CreateBatch {
            output,
            root,
            export_dir,
        } => cmd_create_batch(&output, &root, &export_dir),
    }
}

fn split_columns(columns: Option<&str>) -> Vec<String> {
    columns
        .map(|c| {
            c.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn cmd_parse(file: &Path, keep_comments: bool, keep_marked: bool, limit: usize) -> md_core::Result<()> {
    let options = LoadOptions {
        exclude_comment_rows: !keep_comments,
        exclude_marked_columns: !keep_marked,
    };
    let rows = load_grid(file, options)?;

    println!("File: {}", file.display());
    println!("Columns: {}", rows.first().map_or(0, Vec::len));
    println!("Rows: {}", rows.len().saturating_sub(1));
    println!();

    print_grid(&rows, Some(limit));

    Ok(())
}

fn cmd_versions(root: &Path) -> md_core::Result<()> {
    let versions = list_versions(root)?;

    println!("Versions under {} ({}):", root.display(), versions.len());
    for version in &versions {
        println!("  {}", version);
    }

    Ok(())
}

/// Apply the selected versions in order. Each version merges into a copy
/// that replaces the table only when the whole directory succeeds.
fn merge_versions(
    mut table: MasterTable,
    root: &Path,
    from: Option<&str>,
    to: Option<&str>,
) -> md_core::Result<MasterTable> {
    let versions = list_versions(root)?;
    let selected = slice_versions(&versions, from, to)?;

    for version in &selected {
        let mut next = table.clone();
        let summary = next.merge_directory(root.join(version))?;

        if summary.is_empty() {
            tracing::warn!(table = %table.name(), version = %version, "no edit files for table");
        }
        println!(
            "  {} {}: -{} ~{} +{} ({} files)",
            table.name(),
            version,
            summary.deleted,
            summary.updated,
            summary.inserted,
            summary.files.len()
        );

        table = next;
    }

    Ok(table)
}

fn cmd_merge(
    root: &Path,
    spec: &TableSpec,
    from: Option<&str>,
    to: Option<&str>,
    output: Option<&Path>,
    limit: Option<usize>,
) -> md_core::Result<()> {
    let table = merge_versions(spec.build()?, root, from, to)?;
    let grid = table.to_grid()?;

    match output {
        Some(path) => {
            write_grid(path, &grid)?;
            println!("Wrote {} records to {}", table.record_count(), path.display());
        }
        None => {
            println!();
            print_grid(&grid, limit);
        }
    }

    Ok(())
}

fn cmd_batch(batch_path: &Path) -> md_core::Result<()> {
    let batch = BatchFile::load(batch_path)?;

    println!("Running batch with {} tables", batch.tables.len());
    println!("Root: {}", batch.root.display());
    println!("Output: {}", batch.output_dir.display());
    println!();

    std::fs::create_dir_all(&batch.output_dir).map_err(|e| Error::FileWrite {
        path: batch.output_dir.clone(),
        source: e,
    })?;

    for spec in &batch.tables {
        let table = merge_versions(
            spec.build()?,
            &batch.root,
            batch.from.as_deref(),
            batch.to.as_deref(),
        )?;

        let path = batch.output_dir.join(spec.file_name());
        write_grid(&path, &table.to_grid()?)?;
        println!("Wrote {} records to {}", table.record_count(), path.display());
    }

    Ok(())
}

fn cmd_create_batch(output: &Path, root: &Path, export_dir: &Path) -> md_core::Result<()> {
    let batch = BatchFile {
        root: root.to_path_buf(),
        output_dir: export_dir.to_path_buf(),
        from: None,
        to: None,
        tables: vec![TableSpec {
            name: "items".to_string(),
            extension: "csv".to_string(),
            name_match: NameMatch::Exact,
            columns: Vec::new(),
            base: None,
        }],
    };

    batch.save(output)?;
    println!("Created batch file: {}", output.display());
    println!();
    println!("Edit the file to configure your batch, then run:");
    println!("  md-cli batch --batch {}", output.display());

    Ok(())
}

fn print_grid(rows: &[Vec<String>], limit: Option<usize>) {
    let Some((header, data)) = rows.split_first() else {
        return;
    };

    println!("{}", header.join("\t"));
    println!("{}", "-".repeat(header.len() * 12));

    let row_limit = limit.unwrap_or(data.len());
    for row in data.iter().take(row_limit) {
        println!("{}", row.join("\t"));
    }

    if data.len() > row_limit {
        println!("... ({} more rows)", data.len() - row_limit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use md_core::EditSet;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, body: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    #[test]
    fn test_split_columns() {
        assert_eq!(split_columns(Some("a, b,,c")), vec!["a", "b", "c"]);
        assert!(split_columns(None).is_empty());
    }

    #[test]
    fn test_merge_versions_in_numeric_order() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "1_2/insert/items.csv", "id,name\n1,sword\n");
        write(dir.path(), "1_10/update/items.csv", "id,name\n1,axe\n");
        write(dir.path(), "1_9/insert/items.csv", "id,name\n2,bow\n");

        let table = MasterTable::new("items", "csv", EditSet::new());
        let merged = merge_versions(table, dir.path(), None, None).unwrap();

        assert_eq!(merged.get(1, "name"), Some("axe"));
        assert_eq!(merged.get(2, "name"), Some("bow"));
    }

    #[test]
    fn test_merge_versions_range() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "1/insert/items.csv", "id,name\n1,sword\n");
        write(dir.path(), "2/insert/items.csv", "id,name\n2,bow\n");
        write(dir.path(), "3/delete/items.csv", "id,name\n2,bow\n");

        let table = MasterTable::new("items", "csv", EditSet::new());
        let merged = merge_versions(table, dir.path(), None, Some("2")).unwrap();
        assert_eq!(merged.record_count(), 2);

        let table = MasterTable::new("items", "csv", EditSet::new());
        let merged = merge_versions(table, dir.path(), Some("2"), None).unwrap();
        assert_eq!(merged.record_count(), 0);
    }

    #[test]
    fn test_merge_versions_stops_on_failure() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "1/insert/items.csv", "id,name\n1,sword\n");
        write(dir.path(), "2/insert/items.csv", "id,name\n1,again\n");

        let table = MasterTable::new("items", "csv", EditSet::new());
        assert!(merge_versions(table, dir.path(), None, None).is_err());
    }

    #[test]
    fn test_cmd_merge_writes_output() {
        let dir = TempDir::new().unwrap();
        let versions = dir.path().join("versions");
        write(&versions, "1/insert/items.csv", "id,name,#\n#0,skip,x\n1,sword,x\n");
        let output = dir.path().join("items.csv");

        let spec = TableSpec {
            name: "items".to_string(),
            extension: "csv".to_string(),
            name_match: NameMatch::Exact,
            columns: Vec::new(),
            base: None,
        };
        cmd_merge(&versions, &spec, None, None, Some(&output), None).unwrap();

        let rows = load_grid(&output, LoadOptions::raw()).unwrap();
        assert_eq!(rows, vec![vec!["id", "name"], vec!["1", "sword"]]);
    }

    #[test]
    fn test_cmd_batch() {
        let dir = TempDir::new().unwrap();
        let versions = dir.path().join("versions");
        write(&versions, "1/insert/items.csv", "id,name\n1,sword\n");
        write(&versions, "1/insert/enemies.tsv", "id\thp\n7\t30\n");
        let batch_path = dir.path().join("batch.json");

        let batch = BatchFile {
            root: versions,
            output_dir: dir.path().join("out"),
            from: None,
            to: None,
            tables: vec![
                TableSpec {
                    name: "items".to_string(),
                    extension: "csv".to_string(),
                    name_match: NameMatch::Exact,
                    columns: Vec::new(),
                    base: None,
                },
                TableSpec {
                    name: "enemies".to_string(),
                    extension: "tsv".to_string(),
                    name_match: NameMatch::Exact,
                    columns: Vec::new(),
                    base: None,
                },
            ],
        };
        batch.save(&batch_path).unwrap();

        cmd_batch(&batch_path).unwrap();

        let enemies = load_grid(dir.path().join("out").join("enemies.tsv"), LoadOptions::raw()).unwrap();
        assert_eq!(enemies, vec![vec!["id", "hp"], vec!["7", "30"]]);
        assert!(dir.path().join("out").join("items.csv").exists());
    }

    #[test]
    fn test_cmd_merge_rejects_sparse_table() {
        let dir = TempDir::new().unwrap();
        let versions = dir.path().join("versions");
        write(&versions, "1/insert/items.csv", "id,name\n1,sword\n");
        write(&versions, "1/insert/items_ep1.csv", "id,price\n2,10\n");
        let output = dir.path().join("items.csv");

        let spec = TableSpec {
            name: "items".to_string(),
            extension: "csv".to_string(),
            name_match: NameMatch::Prefix,
            columns: Vec::new(),
            base: None,
        };
        let result = cmd_merge(&versions, &spec, None, None, Some(&output), None);

        assert!(matches!(result, Err(Error::MissingCell { id: 1, .. })));
        assert!(!output.exists());
    }

    #[test]
    fn test_cmd_batch_output_dir_error_names_path() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();
        let batch_path = dir.path().join("batch.json");

        let batch = BatchFile {
            root: dir.path().join("versions"),
            output_dir: blocker.join("out"),
            from: None,
            to: None,
            tables: Vec::new(),
        };
        batch.save(&batch_path).unwrap();

        match cmd_batch(&batch_path) {
            Err(Error::FileWrite { path, .. }) => assert_eq!(path, blocker.join("out")),
            other => panic!("expected FileWrite, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_parses_merge() {
        let cli = Cli::try_parse_from([
            "md-cli", "merge", "--root", "v", "--table", "items", "--prefix", "--to", "1_2",
        ])
        .unwrap();

        match cli.command {
            Commands::Merge {
                table, prefix, to, ext, ..
            } => {
                assert_eq!(table, "items");
                assert!(prefix);
                assert_eq!(to.as_deref(), Some("1_2"));
                assert_eq!(ext, "csv");
            }
            _ => panic!("expected merge command"),
        }
    }
}
