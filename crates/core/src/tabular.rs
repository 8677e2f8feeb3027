//! Tabular alias input
//!
//! Alias and template definitions are comma-delimited text: lines starting
//! with `#` are comments, the first data row is the header, and column
//! order is irrelevant - cells are matched to fields by header name. A
//! blank cell is meaningfully different from any value: it leaves the field
//! unset.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors from loading a tabular file
#[derive(Debug, Error)]
pub enum TabularError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// One parsed file: the header row and every data row.
#[derive(Debug, Default)]
pub struct TabularFile {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Load and split one file. A file with no data rows parses to an empty
/// table rather than an error.
pub fn load_file(path: &Path) -> Result<TabularFile, TabularError> {
    let content = std::fs::read_to_string(path).map_err(|source| TabularError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut table = TabularFile::default();

    for line in content.lines() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            continue;
        }

        let cells: Vec<String> = line.split(',').map(|cell| cell.trim().to_string()).collect();
        if table.header.is_empty() {
            table.header = cells;
        } else {
            table.rows.push(cells);
        }
    }

    Ok(table)
}

/// Recursively collect every tabular file under `root`, sorted for
/// deterministic parse order. A missing root yields nothing.
pub fn find_tabular_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    collect(root, &mut files);
    files.sort();
    files
}

fn collect(dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect(&path, files);
        } else if is_tabular(&path) {
            files.push(path);
        }
    }
}

/// Whether a path has the tabular extension (case-insensitive).
pub fn is_tabular(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_temp(name: &str, content: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("cadence-tabular-tests");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn parses_header_rows_and_comments() {
        let path = write_temp(
            "basic.csv",
            "# comment up top\nName,VolMin,Bus\nshot,10,BUS_FX\n\n# trailing comment\nloop,,\n",
        );
        let table = load_file(&path).unwrap();

        assert_eq!(table.header, vec!["Name", "VolMin", "Bus"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0], vec!["shot", "10", "BUS_FX"]);
        assert_eq!(table.rows[1], vec!["loop", "", ""]);
    }

    #[test]
    fn empty_file_is_an_empty_table() {
        let path = write_temp("empty.csv", "# nothing but comments\n");
        let table = load_file(&path).unwrap();
        assert!(table.header.is_empty());
        assert!(table.rows.is_empty());
    }

    #[test]
    fn crlf_input_is_handled() {
        let path = write_temp("crlf.csv", "Name,VolMin\r\nshot,5\r\n");
        let table = load_file(&path).unwrap();
        assert_eq!(table.rows[0], vec!["shot", "5"]);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_file(Path::new("/definitely/not/here.csv")).is_err());
    }

    #[test]
    fn extension_check_is_case_insensitive() {
        assert!(is_tabular(Path::new("a.csv")));
        assert!(is_tabular(Path::new("a.CSV")));
        assert!(!is_tabular(Path::new("a.txt")));
        assert!(!is_tabular(Path::new("csv")));
    }

    #[test]
    fn recursive_enumeration_is_sorted() {
        let dir = std::env::temp_dir().join("cadence-tabular-walk");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(dir.join("sub")).unwrap();
        std::fs::write(dir.join("b.csv"), "").unwrap();
        std::fs::write(dir.join("sub/a.csv"), "").unwrap();
        std::fs::write(dir.join("ignore.txt"), "").unwrap();

        let files = find_tabular_files(&dir);
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("b.csv"));
        assert!(files[1].ends_with("sub/a.csv"));

        assert!(find_tabular_files(Path::new("/no/such/root")).is_empty());
    }
}
