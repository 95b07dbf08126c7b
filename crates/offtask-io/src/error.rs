//! I/O error types for offtask-io.

use std::path::PathBuf;

/// Errors from CSV loading, feature extraction, and result serialization.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Returned when the input file does not exist or is unreadable.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the CSV parser encounters a malformed record.
    #[error("CSV parse error in {path} at byte offset {offset}")]
    CsvParse {
        /// Path to the CSV file.
        path: PathBuf,
        /// Byte offset where the error occurred.
        offset: u64,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when the CSV file contains a header but zero data rows.
    #[error("empty dataset (no data rows) in {path}")]
    EmptyDataset {
        /// Path to the CSV file.
        path: PathBuf,
    },

    /// Returned when a data row has a different number of columns than the header.
    #[error("inconsistent row length in {path}: row {row_index} has {got} columns, expected {expected}")]
    InconsistentRowLength {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Expected number of columns (from header).
        expected: usize,
        /// Actual number of columns in this row.
        got: usize,
    },

    /// Returned when a cell is empty.
    #[error("missing value in {path}: row {row_index}, column \"{column}\"")]
    MissingValue {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Header name of the column.
        column: String,
    },

    /// Returned when the header names the same column twice.
    #[error("duplicate column \"{name}\" in {path}")]
    DuplicateColumn {
        /// Path to the CSV file.
        path: PathBuf,
        /// The repeated header name.
        name: String,
    },

    /// Returned when a required column is absent from the table.
    #[error("required column \"{name}\" not found")]
    MissingColumn {
        /// The column that was looked up.
        name: String,
    },

    /// Returned when the id, group and label column names are not distinct.
    #[error("id, group and label columns must be distinct, \"{name}\" is used twice")]
    OverlappingRoles {
        /// The name given to more than one role.
        name: String,
    },

    /// Returned when a column left in the feature matrix is not numeric.
    #[error("feature column \"{column}\" is not numeric")]
    NonNumericFeature {
        /// Header name of the column.
        column: String,
    },

    /// Returned when a label encoding has fewer than two or repeated classes.
    #[error("label encoding needs at least two distinct classes, got {classes:?}")]
    InvalidLabelEncoding {
        /// The classes that were supplied.
        classes: Vec<String>,
    },

    /// Returned when a label value is outside the encoding.
    #[error("unknown label \"{value}\" at row {row_index}")]
    UnknownLabel {
        /// Zero-based row index.
        row_index: usize,
        /// The raw label value.
        value: String,
    },

    /// Returned when one of the encoded classes never occurs.
    #[error("label class \"{class}\" does not occur in the data")]
    MissingLabelClass {
        /// The absent class.
        class: String,
    },

    /// Returned when parallel feature-set vectors have different lengths.
    #[error("{what} has {got} entries, expected {expected}")]
    LengthMismatch {
        /// Which vector is misaligned.
        what: &'static str,
        /// The number of feature rows.
        expected: usize,
        /// The number of entries provided.
        got: usize,
    },

    /// Returned when the experiment name contains characters outside `[a-zA-Z0-9_-]`.
    #[error("invalid experiment name \"{name}\": must match [a-zA-Z0-9_-]+")]
    InvalidExperimentName {
        /// The invalid name.
        name: String,
    },

    /// Returned when the output directory cannot be created.
    #[error("cannot create output directory {path}")]
    OutputDirCreate {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when an artifact cannot be serialized.
    #[error("cannot serialize {path}")]
    Serialize {
        /// Destination of the artifact.
        path: PathBuf,
        /// Underlying serializer error.
        source: serde_json::Error,
    },

    /// Returned when a result file cannot be written.
    #[error("cannot write file {path}")]
    WriteFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}
