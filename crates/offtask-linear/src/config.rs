//! Configuration builder for logistic regression.

use crate::error::LinearError;
use crate::model::{LogisticRegression, train};

/// Configuration for logistic regression training.
///
/// The objective is the sample-weighted mean log-loss plus
/// `||w||² / (2 · C · n_samples)`, so `C` plays the same role as the
/// inverse regularization strength of common statistical toolkits. The
/// intercept is not penalized.
///
/// # Defaults
///
/// | Parameter         | Default |
/// |-------------------|---------|
/// | `c`               | 1.0     |
/// | `learning_rate`   | 0.1     |
/// | `max_epochs`      | 2000    |
/// | `tolerance`       | 1e-7    |
#[derive(Debug, Clone, PartialEq)]
pub struct LogisticConfig {
    pub(crate) c: f64,
    pub(crate) learning_rate: f64,
    pub(crate) max_epochs: usize,
    pub(crate) tolerance: f64,
}

impl LogisticConfig {
    /// Create a config with the default hyperparameters.
    #[must_use]
    pub fn new() -> Self {
        Self {
            c: 1.0,
            learning_rate: 0.1,
            max_epochs: 2000,
            tolerance: 1e-7,
        }
    }

    /// Set the inverse regularization strength.
    #[must_use]
    pub fn with_c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    /// Set the gradient descent step size.
    #[must_use]
    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Set the maximum number of full-batch epochs.
    #[must_use]
    pub fn with_max_epochs(mut self, max_epochs: usize) -> Self {
        self.max_epochs = max_epochs;
        self
    }

    /// Stop once the objective changes by less than this between epochs.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Return the inverse regularization strength.
    #[must_use]
    pub fn c(&self) -> f64 {
        self.c
    }

    /// Return the maximum number of epochs.
    #[must_use]
    pub fn max_epochs(&self) -> usize {
        self.max_epochs
    }

    /// Fit with every sample weighted 1.0.
    ///
    /// # Errors
    ///
    /// See [`LogisticConfig::fit_weighted`].
    pub fn fit(&self, features: &[Vec<f64>], labels: &[usize]) -> Result<LogisticRegression, LinearError> {
        let weights = vec![1.0; features.len()];
        self.fit_weighted(features, labels, &weights)
    }

    /// Fit a binary logistic regression with per-sample weights.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`LinearError::InvalidC`] / [`LinearError::InvalidLearningRate`] / [`LinearError::InvalidMaxEpochs`] | Bad hyperparameters |
    /// | [`LinearError::EmptyDataset`] | Zero samples |
    /// | [`LinearError::FeatureCountMismatch`] | Ragged rows |
    /// | [`LinearError::LengthMismatch`] | Labels/weights misaligned |
    /// | [`LinearError::NonBinaryLabel`] | A label outside {0, 1} |
    /// | [`LinearError::NonFiniteValue`] | NaN/Inf feature, or a negative/non-finite weight |
    pub fn fit_weighted(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
        sample_weights: &[f64],
    ) -> Result<LogisticRegression, LinearError> {
        self.validate()?;
        train(self, features, labels, sample_weights)
    }

    fn validate(&self) -> Result<(), LinearError> {
        if !(self.c.is_finite() && self.c > 0.0) {
            return Err(LinearError::InvalidC { c: self.c });
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(LinearError::InvalidLearningRate {
                learning_rate: self.learning_rate,
            });
        }
        if self.max_epochs == 0 {
            return Err(LinearError::InvalidMaxEpochs);
        }
        Ok(())
    }
}

impl Default for LogisticConfig {
    fn default() -> Self {
        Self::new()
    }
}
