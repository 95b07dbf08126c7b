//! Domain types for offtask-io.

use serde::Serialize;

use crate::IoError;

/// A validated experiment name for output file naming.
///
/// Must match `[a-zA-Z0-9_-]+`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentName(String);

impl ExperimentName {
    /// Parse and validate an experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidExperimentName`] if the name is empty or
    /// contains characters outside `[a-zA-Z0-9_-]`.
    pub fn new(name: String) -> Result<Self, IoError> {
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(IoError::InvalidExperimentName { name });
        }
        Ok(Self(name))
    }

    /// Return the experiment name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExperimentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Storage kind inferred for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Every cell is a finite number and at least one is fractional.
    Continuous,
    /// Every cell is a finite, integral number.
    Integer,
    /// At least one cell is not a finite number.
    Categorical,
}

impl ColumnKind {
    /// Whether values of this kind are available as `f64`.
    #[must_use]
    pub fn is_numeric(self) -> bool {
        !matches!(self, Self::Categorical)
    }
}

/// One named column of the input table.
///
/// Raw cell text is always kept; numeric columns additionally carry their
/// parsed values.
#[derive(Debug, Clone)]
pub struct Column {
    name: String,
    kind: ColumnKind,
    raw: Vec<String>,
    numeric: Option<Vec<f64>>,
}

impl Column {
    /// Build a column from its cells, inferring the kind.
    #[must_use]
    pub fn from_cells(name: String, raw: Vec<String>) -> Self {
        let parsed: Option<Vec<f64>> = raw
            .iter()
            .map(|cell| cell.parse::<f64>().ok().filter(|v| v.is_finite()))
            .collect();
        let kind = match &parsed {
            None => ColumnKind::Categorical,
            Some(values) if values.iter().all(|v| v.fract() == 0.0) => ColumnKind::Integer,
            Some(_) => ColumnKind::Continuous,
        };
        Self {
            name,
            kind,
            raw,
            numeric: parsed,
        }
    }

    /// Return the header name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the inferred kind.
    #[must_use]
    pub fn kind(&self) -> ColumnKind {
        self.kind
    }

    /// Return the raw cell text.
    #[must_use]
    pub fn raw(&self) -> &[String] {
        &self.raw
    }

    /// Return parsed values, or `None` for a categorical column.
    #[must_use]
    pub fn as_f64(&self) -> Option<&[f64]> {
        self.numeric.as_deref()
    }

    /// Return the number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    /// Whether the column has no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}

/// An in-memory table of equally long, uniquely named columns.
///
/// Produced by [`TableReader`](crate::TableReader).
#[derive(Debug, Clone)]
pub struct Table {
    columns: Vec<Column>,
    n_rows: usize,
}

impl Table {
    pub(crate) fn new(columns: Vec<Column>, n_rows: usize) -> Self {
        debug_assert!(columns.iter().all(|c| c.len() == n_rows));
        Self { columns, n_rows }
    }

    /// Look up a column by header name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Return every column in header order.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Return the number of data rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Return the number of columns.
    #[must_use]
    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// Return the header names in order.
    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Iterate over the numeric columns in header order.
    pub fn numeric_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.kind.is_numeric())
    }
}
