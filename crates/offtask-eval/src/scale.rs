//! Per-column z-normalization fitted on training rows.

use crate::error::EvalError;

/// Column means and population standard deviations learned from training
/// rows. Constant columns keep a scale of 1.0 so they map to zero.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl StandardScaler {
    /// Learn column statistics. An empty input yields an empty scaler.
    #[must_use]
    pub fn fit(rows: &[Vec<f64>]) -> Self {
        let n_features = rows.first().map_or(0, Vec::len);
        let n = rows.len() as f64;
        let means: Vec<f64> = (0..n_features)
            .map(|c| rows.iter().map(|r| r[c]).sum::<f64>() / n)
            .collect();
        let scales = (0..n_features)
            .map(|c| {
                let var = rows.iter().map(|r| (r[c] - means[c]).powi(2)).sum::<f64>() / n;
                let std = var.sqrt();
                if std > 0.0 { std } else { 1.0 }
            })
            .collect();
        Self { means, scales }
    }

    /// Scale one row.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`EvalError::LengthMismatch`] | The row width differs from the fitted width |
    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>, EvalError> {
        if row.len() != self.means.len() {
            return Err(EvalError::LengthMismatch {
                what: "feature row",
                expected: self.means.len(),
                got: row.len(),
            });
        }
        Ok(row
            .iter()
            .zip(self.means.iter().zip(&self.scales))
            .map(|(x, (m, s))| (x - m) / s)
            .collect())
    }

    /// Scale many rows.
    ///
    /// # Errors
    ///
    /// Fails on the first row whose width differs from the fitted width.
    pub fn transform(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, EvalError> {
        rows.iter().map(|r| self.transform_row(r)).collect()
    }
}
