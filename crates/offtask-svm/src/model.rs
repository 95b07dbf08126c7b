//! Fitted support vector model.

use rayon::prelude::*;

use crate::error::SvmError;
use crate::kernel::Kernel;

/// A trained binary support vector classifier.
///
/// The decision function is `Σ_s coef_s · K(sv_s, x) - rho`; positive
/// values predict class 1.
#[derive(Debug, Clone)]
pub struct SvmModel {
    kernel: Kernel,
    support_vectors: Vec<Vec<f64>>,
    dual_coef: Vec<f64>,
    rho: f64,
    n_features: usize,
    converged: bool,
}

impl SvmModel {
    pub(crate) fn new(
        kernel: Kernel,
        support_vectors: Vec<Vec<f64>>,
        dual_coef: Vec<f64>,
        rho: f64,
        n_features: usize,
        converged: bool,
    ) -> Self {
        Self {
            kernel,
            support_vectors,
            dual_coef,
            rho,
            n_features,
            converged,
        }
    }

    /// Return the signed distance-like score for one sample.
    ///
    /// # Errors
    ///
    /// Returns [`SvmError::PredictionFeatureMismatch`] when the sample width
    /// differs from the training width.
    pub fn decision_function(&self, sample: &[f64]) -> Result<f64, SvmError> {
        if sample.len() != self.n_features {
            return Err(SvmError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        let sum: f64 = self
            .support_vectors
            .iter()
            .zip(&self.dual_coef)
            .map(|(sv, coef)| coef * self.kernel.eval(sv, sample))
            .sum();
        Ok(sum - self.rho)
    }

    /// Score many samples in parallel.
    ///
    /// # Errors
    ///
    /// See [`SvmModel::decision_function`].
    pub fn decision_function_batch(&self, samples: &[Vec<f64>]) -> Result<Vec<f64>, SvmError> {
        samples.par_iter().map(|s| self.decision_function(s)).collect()
    }

    /// Predict the class of one sample.
    ///
    /// # Errors
    ///
    /// See [`SvmModel::decision_function`].
    pub fn predict(&self, sample: &[f64]) -> Result<usize, SvmError> {
        self.decision_function(sample).map(|d| usize::from(d > 0.0))
    }

    /// Return the kernel with any data-derived gamma resolved.
    #[must_use]
    pub fn kernel(&self) -> Kernel {
        self.kernel
    }

    /// Return the number of support vectors.
    #[must_use]
    pub fn n_support(&self) -> usize {
        self.support_vectors.len()
    }

    /// Return the bias term subtracted from the kernel expansion.
    #[must_use]
    pub fn rho(&self) -> f64 {
        self.rho
    }

    /// Whether SMO met its tolerance before the iteration cap.
    #[must_use]
    pub fn converged(&self) -> bool {
        self.converged
    }
}

#[cfg(test)]
mod tests {
    use crate::{Kernel, SvmConfig, SvmError};

    fn blobs() -> (Vec<Vec<f64>>, Vec<usize>) {
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for i in 0..30 {
            let jitter = (i % 7) as f64 * 0.1;
            features.push(vec![-2.0 + jitter, -2.0 - jitter]);
            labels.push(0);
            features.push(vec![2.0 - jitter, 2.0 + jitter]);
            labels.push(1);
        }
        (features, labels)
    }

    #[test]
    fn rbf_separates_blobs() {
        let (features, labels) = blobs();
        let model = SvmConfig::new().fit(&features, &labels).unwrap();
        assert!(model.converged());
        for (row, &y) in features.iter().zip(&labels) {
            assert_eq!(model.predict(row).unwrap(), y);
        }
    }

    #[test]
    fn linear_kernel_separates_blobs() {
        let (features, labels) = blobs();
        let model = SvmConfig::new().with_kernel(Kernel::Linear).fit(&features, &labels).unwrap();
        assert!(model.decision_function(&[3.0, 3.0]).unwrap() > 0.0);
        assert!(model.decision_function(&[-3.0, -3.0]).unwrap() < 0.0);
        assert!(model.n_support() < features.len());
    }

    #[test]
    fn resolves_scale_gamma() {
        let (features, labels) = blobs();
        let model = SvmConfig::new().fit(&features, &labels).unwrap();
        assert!(matches!(model.kernel(), Kernel::Rbf { gamma: Some(g) } if g > 0.0));
    }

    #[test]
    fn heavier_positive_weight_moves_boundary() {
        // Overlapping 1-D classes: positives around 0.6, negatives around 0.4.
        let features: Vec<Vec<f64>> = (0..40).map(|i| vec![(i % 10) as f64 / 10.0]).collect();
        let labels: Vec<usize> = (0..40).map(|i| usize::from(i % 10 >= 6 || i % 4 == 0)).collect();
        let plain = SvmConfig::new().with_kernel(Kernel::Linear).fit(&features, &labels).unwrap();
        let weights: Vec<f64> = labels.iter().map(|&y| if y == 1 { 5.0 } else { 1.0 }).collect();
        let weighted = SvmConfig::new()
            .with_kernel(Kernel::Linear)
            .fit_weighted(&features, &labels, &weights)
            .unwrap();
        let probe = [0.5];
        assert!(weighted.decision_function(&probe).unwrap() > plain.decision_function(&probe).unwrap());
    }

    #[test]
    fn batch_matches_single() {
        let (features, labels) = blobs();
        let model = SvmConfig::new().fit(&features, &labels).unwrap();
        let batch = model.decision_function_batch(&features).unwrap();
        for (row, score) in features.iter().zip(batch) {
            assert_eq!(model.decision_function(row).unwrap(), score);
        }
    }

    #[test]
    fn rejects_wrong_prediction_width() {
        let (features, labels) = blobs();
        let model = SvmConfig::new().fit(&features, &labels).unwrap();
        assert!(matches!(
            model.predict(&[1.0]),
            Err(SvmError::PredictionFeatureMismatch { expected: 2, got: 1 })
        ));
    }
}
