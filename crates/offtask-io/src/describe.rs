//! Exploratory summaries: per-column statistics, kind counts, Pearson
//! correlations and value counts.

use serde::Serialize;

use crate::domain::{Column, ColumnKind, Table};

/// Summary statistics of one numeric column.
///
/// `std` is the sample standard deviation (n - 1 denominator), reported as
/// 0.0 for a single row. Quartiles use linear interpolation between the
/// closest ranks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    /// Column name.
    pub name: String,
    /// Number of values.
    pub count: usize,
    /// Arithmetic mean.
    pub mean: f64,
    /// Sample standard deviation.
    pub std: f64,
    /// Minimum.
    pub min: f64,
    /// 25th percentile.
    pub q25: f64,
    /// Median.
    pub median: f64,
    /// 75th percentile.
    pub q75: f64,
    /// Maximum.
    pub max: f64,
}

/// Number of columns of each kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KindCounts {
    /// Fractional numeric columns.
    pub continuous: usize,
    /// Integral numeric columns.
    pub integer: usize,
    /// Text columns.
    pub categorical: usize,
}

/// Pearson correlation between every pair of numeric columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    /// Column names, in matrix order.
    pub names: Vec<String>,
    /// `values[i][j]` is the correlation between columns `i` and `j`.
    pub values: Vec<Vec<f64>>,
}

/// Summarize every numeric column of the table, in header order.
#[must_use]
pub fn describe(table: &Table) -> Vec<ColumnSummary> {
    table
        .numeric_columns()
        .filter_map(|c| c.as_f64().map(|v| summarize(c.name(), v)))
        .collect()
}

fn summarize(name: &str, values: &[f64]) -> ColumnSummary {
    let count = values.len();
    let mean = values.iter().sum::<f64>() / count as f64;
    let std = if count > 1 {
        (values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / (count - 1) as f64).sqrt()
    } else {
        0.0
    };
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    ColumnSummary {
        name: name.to_string(),
        count,
        mean,
        std,
        min: sorted[0],
        q25: quantile(&sorted, 0.25),
        median: quantile(&sorted, 0.5),
        q75: quantile(&sorted, 0.75),
        max: sorted[count - 1],
    }
}

/// Linear-interpolation quantile of an ascending, non-empty slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Count columns by inferred kind.
#[must_use]
pub fn kind_counts(table: &Table) -> KindCounts {
    let mut counts = KindCounts::default();
    for column in table.columns() {
        match column.kind() {
            ColumnKind::Continuous => counts.continuous += 1,
            ColumnKind::Integer => counts.integer += 1,
            ColumnKind::Categorical => counts.categorical += 1,
        }
    }
    counts
}

/// Pearson correlation matrix over the numeric columns.
///
/// The diagonal is 1.0. A constant column has zero correlation with every
/// other column.
#[must_use]
pub fn correlation_matrix(table: &Table) -> CorrelationMatrix {
    let columns: Vec<(&str, &[f64])> = table
        .numeric_columns()
        .filter_map(|c| c.as_f64().map(|v| (c.name(), v)))
        .collect();

    let centered: Vec<(Vec<f64>, f64)> = columns
        .iter()
        .map(|(_, values)| {
            let mean = values.iter().sum::<f64>() / values.len() as f64;
            let dev: Vec<f64> = values.iter().map(|v| v - mean).collect();
            let norm = dev.iter().map(|d| d * d).sum::<f64>().sqrt();
            (dev, norm)
        })
        .collect();

    let n = columns.len();
    let mut values = vec![vec![0.0; n]; n];
    for i in 0..n {
        values[i][i] = 1.0;
        for j in (i + 1)..n {
            let (di, ni) = &centered[i];
            let (dj, nj) = &centered[j];
            let r = if *ni > 0.0 && *nj > 0.0 {
                (di.iter().zip(dj).map(|(a, b)| a * b).sum::<f64>() / (ni * nj)).clamp(-1.0, 1.0)
            } else {
                0.0
            };
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    CorrelationMatrix {
        names: columns.iter().map(|(name, _)| name.to_string()).collect(),
        values,
    }
}

/// Count occurrences of each distinct raw value, most frequent first, ties
/// broken by value.
#[must_use]
pub fn value_counts(column: &Column) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for value in column.raw() {
        match counts.iter_mut().find(|(v, _)| v == value) {
            Some((_, n)) => *n += 1,
            None => counts.push((value.clone(), 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str, values: &[&str]) -> Column {
        Column::from_cells(name.into(), values.iter().map(|s| s.to_string()).collect())
    }

    fn table() -> Table {
        Table::new(
            vec![
                column("x", &["1", "2", "3", "4"]),
                column("y", &["2", "4", "6", "8.5"]),
                column("z", &["4", "3", "2", "1"]),
                column("k", &["7", "7", "7", "7"]),
                column("label", &["Y", "N", "N", "N"]),
            ],
            4,
        )
    }

    #[test]
    fn describe_matches_hand_computation() {
        let summaries = describe(&table());
        assert_eq!(summaries.len(), 4);
        let x = &summaries[0];
        assert_eq!(x.count, 4);
        assert!((x.mean - 2.5).abs() < 1e-12);
        // sample variance of 1..4 is 5/3
        assert!((x.std - (5.0f64 / 3.0).sqrt()).abs() < 1e-12);
        assert_eq!(x.min, 1.0);
        assert!((x.q25 - 1.75).abs() < 1e-12);
        assert!((x.median - 2.5).abs() < 1e-12);
        assert!((x.q75 - 3.25).abs() < 1e-12);
        assert_eq!(x.max, 4.0);
    }

    #[test]
    fn kinds_are_counted() {
        assert_eq!(
            kind_counts(&table()),
            KindCounts {
                continuous: 1,
                integer: 3,
                categorical: 1
            }
        );
    }

    #[test]
    fn correlation_signs_and_constant_column() {
        let corr = correlation_matrix(&table());
        assert_eq!(corr.names, vec!["x", "y", "z", "k"]);
        assert!(corr.values[0][1] > 0.99);
        assert!((corr.values[0][2] + 1.0).abs() < 1e-12);
        assert_eq!(corr.values[0][3], 0.0);
        assert_eq!(corr.values[3][3], 1.0);
        assert_eq!(corr.values[1][0], corr.values[0][1]);
    }

    #[test]
    fn value_counts_orders_by_frequency() {
        let counts = value_counts(&column("label", &["Y", "N", "N", "N"]));
        assert_eq!(counts, vec![("N".to_string(), 3), ("Y".to_string(), 1)]);
    }
}
