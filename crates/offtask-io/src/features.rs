//! Feature matrix, label vector and group vector extraction.

use tracing::{info, instrument, warn};

use crate::IoError;
use crate::domain::Table;

/// Fixed mapping from label text to class index.
///
/// Class `i` is `classes[i]`. Encoding is a bijection between the listed
/// strings and `0..n_classes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelEncoding {
    classes: Vec<String>,
}

impl LabelEncoding {
    /// Create an encoding from class names in index order.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidLabelEncoding`] for fewer than two classes
    /// or a repeated class name.
    pub fn new(classes: Vec<String>) -> Result<Self, IoError> {
        let distinct = classes
            .iter()
            .enumerate()
            .all(|(i, c)| !classes[..i].contains(c));
        if classes.len() < 2 || !distinct {
            return Err(IoError::InvalidLabelEncoding { classes });
        }
        Ok(Self { classes })
    }

    /// The off-task encoding: `"N" -> 0`, `"Y" -> 1`.
    #[must_use]
    pub fn off_task() -> Self {
        Self {
            classes: vec!["N".to_string(), "Y".to_string()],
        }
    }

    /// Return class names in index order.
    #[must_use]
    pub fn class_names(&self) -> &[String] {
        &self.classes
    }

    /// Return the number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    /// Return the class name for an index.
    #[must_use]
    pub fn decode(&self, label: usize) -> Option<&str> {
        self.classes.get(label).map(String::as_str)
    }

    /// Encode raw label values.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::UnknownLabel`] | A value outside the encoding |
    /// | [`IoError::MissingLabelClass`] | An encoded class never occurs |
    pub fn encode(&self, values: &[String]) -> Result<Vec<usize>, IoError> {
        let mut seen = vec![false; self.classes.len()];
        let labels = values
            .iter()
            .enumerate()
            .map(|(row_index, value)| {
                let label = self
                    .classes
                    .iter()
                    .position(|c| c == value)
                    .ok_or_else(|| IoError::UnknownLabel {
                        row_index,
                        value: value.clone(),
                    })?;
                seen[label] = true;
                Ok(label)
            })
            .collect::<Result<Vec<_>, IoError>>()?;

        if let Some(missing) = seen.iter().position(|&s| !s) {
            return Err(IoError::MissingLabelClass {
                class: self.classes[missing].clone(),
            });
        }
        Ok(labels)
    }
}

/// Which columns play the identifier, group and label roles.
///
/// # Defaults
///
/// | Role     | Column      |
/// |----------|-------------|
/// | id       | `Unique-id` |
/// | group    | `namea`     |
/// | label    | `OffTask`   |
/// | encoding | `N`→0, `Y`→1 |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSpec {
    id_column: String,
    group_column: String,
    label_column: String,
    encoding: LabelEncoding,
}

impl FeatureSpec {
    /// Name the three role columns.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OverlappingRoles`] if two roles share a column.
    pub fn new(
        id_column: impl Into<String>,
        group_column: impl Into<String>,
        label_column: impl Into<String>,
    ) -> Result<Self, IoError> {
        let (id_column, group_column, label_column) = (id_column.into(), group_column.into(), label_column.into());
        for (a, b) in [(&id_column, &group_column), (&id_column, &label_column), (&group_column, &label_column)] {
            if a == b {
                return Err(IoError::OverlappingRoles { name: a.clone() });
            }
        }
        Ok(Self {
            id_column,
            group_column,
            label_column,
            encoding: LabelEncoding::off_task(),
        })
    }

    /// Replace the label encoding.
    #[must_use]
    pub fn with_label_encoding(mut self, encoding: LabelEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Return the label encoding.
    #[must_use]
    pub fn label_encoding(&self) -> &LabelEncoding {
        &self.encoding
    }

    /// Split a table into features, labels and groups.
    ///
    /// Every column other than the three role columns becomes a feature;
    /// all-zero feature columns are then dropped.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::MissingColumn`] | A role column is absent |
    /// | [`IoError::NonNumericFeature`] | A feature column is categorical |
    /// | [`IoError::UnknownLabel`] / [`IoError::MissingLabelClass`] | See [`LabelEncoding::encode`] |
    #[instrument(skip_all, fields(label = %self.label_column, group = %self.group_column))]
    pub fn split(&self, table: &Table) -> Result<FeatureSet, IoError> {
        let lookup = |name: &str| {
            table
                .column(name)
                .ok_or_else(|| IoError::MissingColumn { name: name.to_string() })
        };
        let ids = lookup(&self.id_column)?.raw().to_vec();
        let groups = lookup(&self.group_column)?.raw().to_vec();
        let labels = self.encoding.encode(lookup(&self.label_column)?.raw())?;

        let mut names = Vec::new();
        let mut columns = Vec::new();
        for column in table.columns() {
            let name = column.name();
            if name == self.id_column || name == self.group_column || name == self.label_column {
                continue;
            }
            let values = column.as_f64().ok_or_else(|| IoError::NonNumericFeature {
                column: name.to_string(),
            })?;
            names.push(name.to_string());
            columns.push(values);
        }
        let rows: Vec<Vec<f64>> = (0..table.n_rows())
            .map(|r| columns.iter().map(|col| col[r]).collect())
            .collect();

        let (feature_names, features, dropped) = drop_all_zero_columns(names, rows);
        if !dropped.is_empty() {
            warn!(?dropped, "dropped all-zero feature columns");
        }

        let set = FeatureSet {
            features,
            labels,
            groups,
            ids,
            feature_names,
            dropped_columns: dropped,
            class_names: self.encoding.class_names().to_vec(),
        };
        info!(
            n_samples = set.n_samples(),
            n_features = set.n_features(),
            class_counts = ?set.class_counts(),
            "features extracted"
        );
        Ok(set)
    }
}

impl Default for FeatureSpec {
    fn default() -> Self {
        Self {
            id_column: "Unique-id".to_string(),
            group_column: "namea".to_string(),
            label_column: "OffTask".to_string(),
            encoding: LabelEncoding::off_task(),
        }
    }
}

/// Remove feature columns whose every value is exactly zero.
///
/// Returns the kept names, the narrowed rows and the dropped names. With
/// zero rows nothing is dropped. Applying it twice equals applying it once.
#[must_use]
pub fn drop_all_zero_columns(
    names: Vec<String>,
    rows: Vec<Vec<f64>>,
) -> (Vec<String>, Vec<Vec<f64>>, Vec<String>) {
    if rows.is_empty() {
        return (names, rows, Vec::new());
    }
    let keep: Vec<bool> = (0..names.len())
        .map(|c| rows.iter().any(|row| row[c] != 0.0))
        .collect();

    let mut kept = Vec::new();
    let mut dropped = Vec::new();
    for (name, &k) in names.into_iter().zip(&keep) {
        if k {
            kept.push(name);
        } else {
            dropped.push(name);
        }
    }
    let rows = rows
        .into_iter()
        .map(|row| row.into_iter().zip(&keep).filter(|&(_, &k)| k).map(|(v, _)| v).collect())
        .collect();
    (kept, rows, dropped)
}

/// Model-ready data: row-major features plus parallel label, group and
/// identifier vectors.
#[derive(Debug, Clone)]
pub struct FeatureSet {
    features: Vec<Vec<f64>>,
    labels: Vec<usize>,
    groups: Vec<String>,
    ids: Vec<String>,
    feature_names: Vec<String>,
    dropped_columns: Vec<String>,
    class_names: Vec<String>,
}

impl FeatureSet {
    /// Assemble a feature set from already-prepared parts. Identifiers are
    /// the row positions.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::LengthMismatch`] when labels, groups or any row
    /// width disagree with the features.
    pub fn new(
        features: Vec<Vec<f64>>,
        labels: Vec<usize>,
        groups: Vec<String>,
        feature_names: Vec<String>,
        class_names: Vec<String>,
    ) -> Result<Self, IoError> {
        let n = features.len();
        for (what, got) in [("labels", labels.len()), ("groups", groups.len())] {
            if got != n {
                return Err(IoError::LengthMismatch { what, expected: n, got });
            }
        }
        if let Some(row) = features.iter().find(|row| row.len() != feature_names.len()) {
            return Err(IoError::LengthMismatch {
                what: "feature row",
                expected: feature_names.len(),
                got: row.len(),
            });
        }
        Ok(Self {
            features,
            labels,
            groups,
            ids: (0..n).map(|i| i.to_string()).collect(),
            feature_names,
            dropped_columns: Vec::new(),
            class_names,
        })
    }

    /// Return the feature matrix (row-major).
    #[must_use]
    pub fn features(&self) -> &[Vec<f64>] {
        &self.features
    }

    /// Return the encoded labels.
    #[must_use]
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Return the group value of each row.
    #[must_use]
    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    /// Return the identifier of each row.
    #[must_use]
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Return the retained feature column names.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Return the names of all-zero columns that were removed.
    #[must_use]
    pub fn dropped_columns(&self) -> &[String] {
        &self.dropped_columns
    }

    /// Return class names in label order.
    #[must_use]
    pub fn class_names(&self) -> &[String] {
        &self.class_names
    }

    /// Return the number of rows.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.features.len()
    }

    /// Return the number of retained feature columns.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Return the number of rows per class, indexed by label.
    #[must_use]
    pub fn class_counts(&self) -> Vec<usize> {
        let n_classes = self
            .labels
            .iter()
            .max()
            .map_or(0, |&m| m + 1)
            .max(self.class_names.len());
        let mut counts = vec![0; n_classes];
        for &l in &self.labels {
            counts[l] += 1;
        }
        counts
    }
}
