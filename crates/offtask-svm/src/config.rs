//! Configuration builder for the support vector classifier.

use tracing::{info, instrument};

use crate::error::SvmError;
use crate::kernel::{GramMatrix, Kernel};
use crate::model::SvmModel;
use crate::smo;

/// Configuration for C-support vector classification.
///
/// # Defaults
///
/// | Parameter   | Default                   |
/// |-------------|---------------------------|
/// | `c`         | 1.0                       |
/// | `kernel`    | RBF, data-derived gamma   |
/// | `tolerance` | 1e-3                      |
/// | `max_iter`  | `max(10_000, 100 · n)`    |
#[derive(Debug, Clone, PartialEq)]
pub struct SvmConfig {
    c: f64,
    kernel: Kernel,
    tolerance: f64,
    max_iter: Option<usize>,
}

impl SvmConfig {
    /// Create a config with the default hyperparameters.
    #[must_use]
    pub fn new() -> Self {
        Self {
            c: 1.0,
            kernel: Kernel::rbf(),
            tolerance: 1e-3,
            max_iter: None,
        }
    }

    /// Set the box constraint.
    #[must_use]
    pub fn with_c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    /// Set the kernel.
    #[must_use]
    pub fn with_kernel(mut self, kernel: Kernel) -> Self {
        self.kernel = kernel;
        self
    }

    /// Set the KKT violation tolerance used as the stopping criterion.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Cap the number of SMO iterations. `None` derives the cap from the
    /// training size.
    #[must_use]
    pub fn with_max_iter(mut self, max_iter: Option<usize>) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Return the box constraint.
    #[must_use]
    pub fn c(&self) -> f64 {
        self.c
    }

    /// Return the configured kernel.
    #[must_use]
    pub fn kernel(&self) -> Kernel {
        self.kernel
    }

    /// Fit with every sample weighted 1.0.
    ///
    /// # Errors
    ///
    /// See [`SvmConfig::fit_weighted`].
    pub fn fit(&self, features: &[Vec<f64>], labels: &[usize]) -> Result<SvmModel, SvmError> {
        let weights = vec![1.0; features.len()];
        self.fit_weighted(features, labels, &weights)
    }

    /// Fit a binary classifier. Sample `i` gets box constraint `C · w_i`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`SvmError::InvalidC`] / [`SvmError::InvalidGamma`] / [`SvmError::InvalidTolerance`] | Bad hyperparameters |
    /// | [`SvmError::EmptyDataset`] | Zero samples |
    /// | [`SvmError::FeatureCountMismatch`] | Ragged rows |
    /// | [`SvmError::LengthMismatch`] | Labels/weights misaligned |
    /// | [`SvmError::NonBinaryLabel`] | A label outside {0, 1} |
    /// | [`SvmError::SingleClass`] | Only one class present |
    /// | [`SvmError::NonFiniteValue`] | NaN/Inf feature, or a weight that is not positive and finite |
    #[instrument(skip_all, fields(n_samples = features.len(), kernel = self.kernel.name(), c = self.c))]
    pub fn fit_weighted(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
        sample_weights: &[f64],
    ) -> Result<SvmModel, SvmError> {
        self.validate()?;
        let n_features = validate_inputs(features, labels, sample_weights)?;

        let kernel = self.kernel.resolve(features);
        let y: Vec<f64> = labels.iter().map(|&l| if l == 1 { 1.0 } else { -1.0 }).collect();
        let upper: Vec<f64> = sample_weights.iter().map(|w| self.c * w).collect();
        let max_iter = self.max_iter.unwrap_or_else(|| (100 * features.len()).max(10_000));

        let gram = GramMatrix::compute(&kernel, features);
        let out = smo::solve(&gram, &y, &upper, self.tolerance, max_iter);

        let mut support_vectors = Vec::new();
        let mut dual_coef = Vec::new();
        for (t, &a) in out.alpha.iter().enumerate() {
            if a > 0.0 {
                support_vectors.push(features[t].clone());
                dual_coef.push(a * y[t]);
            }
        }
        info!(
            n_support = support_vectors.len(),
            iterations = out.iterations,
            converged = out.converged,
            "SVM trained"
        );

        Ok(SvmModel::new(
            kernel,
            support_vectors,
            dual_coef,
            out.rho,
            n_features,
            out.converged,
        ))
    }

    fn validate(&self) -> Result<(), SvmError> {
        if !(self.c.is_finite() && self.c > 0.0) {
            return Err(SvmError::InvalidC { c: self.c });
        }
        if let Kernel::Rbf { gamma: Some(gamma) } = self.kernel {
            if !(gamma.is_finite() && gamma > 0.0) {
                return Err(SvmError::InvalidGamma { gamma });
            }
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(SvmError::InvalidTolerance {
                tolerance: self.tolerance,
            });
        }
        Ok(())
    }
}

impl Default for SvmConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_inputs(features: &[Vec<f64>], labels: &[usize], weights: &[f64]) -> Result<usize, SvmError> {
    if features.is_empty() {
        return Err(SvmError::EmptyDataset);
    }
    let n = features.len();
    let n_features = features[0].len();
    if labels.len() != n {
        return Err(SvmError::LengthMismatch {
            what: "labels",
            expected: n,
            got: labels.len(),
        });
    }
    if weights.len() != n {
        return Err(SvmError::LengthMismatch {
            what: "sample_weights",
            expected: n,
            got: weights.len(),
        });
    }
    for (i, row) in features.iter().enumerate() {
        if row.len() != n_features {
            return Err(SvmError::FeatureCountMismatch {
                expected: n_features,
                got: row.len(),
                sample_index: i,
            });
        }
        if row.iter().any(|v| !v.is_finite()) || !(weights[i].is_finite() && weights[i] > 0.0) {
            return Err(SvmError::NonFiniteValue { sample_index: i });
        }
        if labels[i] > 1 {
            return Err(SvmError::NonBinaryLabel {
                sample_index: i,
                label: labels[i],
            });
        }
    }
    if labels.iter().all(|&l| l == labels[0]) {
        return Err(SvmError::SingleClass { class: labels[0] });
    }
    Ok(n_features)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_single_class() {
        let err = SvmConfig::new().fit(&[vec![0.0], vec![1.0]], &[1, 1]).unwrap_err();
        assert!(matches!(err, SvmError::SingleClass { class: 1 }));
    }

    #[test]
    fn rejects_explicit_zero_gamma() {
        let err = SvmConfig::new()
            .with_kernel(Kernel::Rbf { gamma: Some(0.0) })
            .fit(&[vec![0.0], vec![1.0]], &[0, 1])
            .unwrap_err();
        assert!(matches!(err, SvmError::InvalidGamma { .. }));
    }

    #[test]
    fn rejects_zero_weight() {
        let err = SvmConfig::new()
            .fit_weighted(&[vec![0.0], vec![1.0]], &[0, 1], &[1.0, 0.0])
            .unwrap_err();
        assert!(matches!(err, SvmError::NonFiniteValue { sample_index: 1 }));
    }

    #[test]
    fn rejects_label_length_mismatch() {
        let err = SvmConfig::new().fit(&[vec![0.0], vec![1.0]], &[0]).unwrap_err();
        assert!(matches!(err, SvmError::LengthMismatch { what: "labels", .. }));
    }
}
