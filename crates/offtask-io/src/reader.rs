//! CSV table reader with full input validation.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::{Column, Table};

/// Reads a headed CSV file into a [`Table`], inferring each column's kind.
///
/// Cells are trimmed before use. Every row must have as many fields as the
/// header and no cell may be empty.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::DuplicateColumn`] | Header repeats a column name |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
/// | [`IoError::InconsistentRowLength`] | Row has different column count than header |
/// | [`IoError::MissingValue`] | A cell is empty |
pub struct TableReader {
    path: PathBuf,
}

impl TableReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    fn csv_error(&self, e: csv::Error) -> IoError {
        IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }

    /// Read and validate the CSV file, returning a [`Table`].
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<Table, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) so ragged rows surface as InconsistentRowLength
        // rather than a generic CsvParse error.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let header = rdr.headers().map_err(|e| self.csv_error(e))?.clone();
        let names: Vec<String> = header.iter().map(String::from).collect();
        let mut seen = HashSet::new();
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(IoError::DuplicateColumn {
                    path: self.path.clone(),
                    name: name.clone(),
                });
            }
        }
        debug!(n_columns = names.len(), "read CSV header");

        let mut cells: Vec<Vec<String>> = vec![Vec::new(); names.len()];
        let mut n_rows = 0;
        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| self.csv_error(e))?;
            if record.len() != names.len() {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected: names.len(),
                    got: record.len(),
                });
            }
            for (col_index, cell) in record.iter().enumerate() {
                if cell.is_empty() {
                    return Err(IoError::MissingValue {
                        path: self.path.clone(),
                        row_index,
                        column: names[col_index].clone(),
                    });
                }
                cells[col_index].push(cell.to_string());
            }
            n_rows += 1;
        }

        if n_rows == 0 {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        let columns: Vec<Column> = names
            .into_iter()
            .zip(cells)
            .map(|(name, raw)| Column::from_cells(name, raw))
            .collect();
        let n_numeric = columns.iter().filter(|c| c.kind().is_numeric()).count();

        info!(n_rows, n_columns = columns.len(), n_numeric, "dataset loaded");

        Ok(Table::new(columns, n_rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ColumnKind;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn read_valid_table() {
        let csv = "Unique-id,namea,OffTask,Avg-RightToLeft\n1,ann,N,0.25\n2,bob,Y,0.5\n3,ann,N,1\n";
        let f = write_csv(csv);
        let table = TableReader::new(f.path()).read().unwrap();
        assert_eq!(table.n_rows(), 3);
        assert_eq!(table.n_columns(), 4);
        assert_eq!(table.column_names(), vec!["Unique-id", "namea", "OffTask", "Avg-RightToLeft"]);
        assert_eq!(table.column("Unique-id").unwrap().kind(), ColumnKind::Integer);
        assert_eq!(table.column("namea").unwrap().kind(), ColumnKind::Categorical);
        assert_eq!(table.column("Avg-RightToLeft").unwrap().kind(), ColumnKind::Continuous);
        assert_eq!(table.numeric_columns().count(), 2);
    }

    #[test]
    fn trims_cells() {
        let f = write_csv("a, b\n 1 , x \n");
        let table = TableReader::new(f.path()).read().unwrap();
        assert_eq!(table.column("b").unwrap().raw(), &["x".to_string()]);
        assert_eq!(table.column("a").unwrap().as_f64(), Some(&[1.0][..]));
    }

    #[test]
    fn empty_dataset_error() {
        let f = write_csv("a,b\n");
        let err = TableReader::new(f.path()).read().unwrap_err();
        assert!(matches!(err, IoError::EmptyDataset { .. }));
    }

    #[test]
    fn inconsistent_row_length_error() {
        let f = write_csv("a,b,c\n1,2,3\n4,5\n");
        let err = TableReader::new(f.path()).read().unwrap_err();
        assert!(matches!(err, IoError::InconsistentRowLength { row_index: 1, expected: 3, got: 2, .. }));
    }

    #[test]
    fn missing_value_error() {
        let f = write_csv("a,b\n1,2\n3,\n");
        let err = TableReader::new(f.path()).read().unwrap_err();
        match err {
            IoError::MissingValue { row_index, column, .. } => {
                assert_eq!(row_index, 1);
                assert_eq!(column, "b");
            }
            other => panic!("expected MissingValue, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_column_error() {
        let f = write_csv("a,a\n1,2\n");
        let err = TableReader::new(f.path()).read().unwrap_err();
        assert!(matches!(err, IoError::DuplicateColumn { ref name, .. } if name == "a"));
    }

    #[test]
    fn missing_file_error() {
        let err = TableReader::new(Path::new("/nonexistent/offtask.csv")).read().unwrap_err();
        assert!(matches!(err, IoError::FileNotFound { .. }));
    }
}
