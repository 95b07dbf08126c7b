//! Fitted logistic regression model and its gradient descent trainer.

use tracing::{debug, instrument, warn};

use crate::config::LogisticConfig;
use crate::error::LinearError;

/// Numerically safe logistic function.
#[must_use]
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// A fitted binary logistic regression model.
#[derive(Debug, Clone)]
pub struct LogisticRegression {
    coefficients: Vec<f64>,
    intercept: f64,
    n_epochs: usize,
    converged: bool,
}

impl LogisticRegression {
    /// Return the learned coefficients, one per feature.
    #[must_use]
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Return the learned intercept.
    #[must_use]
    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Return the number of epochs actually run.
    #[must_use]
    pub fn n_epochs(&self) -> usize {
        self.n_epochs
    }

    /// Whether the objective settled within tolerance before `max_epochs`.
    #[must_use]
    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Return the linear score `w·x + b` for one sample.
    ///
    /// # Errors
    ///
    /// Returns [`LinearError::PredictionFeatureMismatch`] when the sample
    /// width differs from the training width.
    pub fn decision_function(&self, sample: &[f64]) -> Result<f64, LinearError> {
        if sample.len() != self.coefficients.len() {
            return Err(LinearError::PredictionFeatureMismatch {
                expected: self.coefficients.len(),
                got: sample.len(),
            });
        }
        Ok(linear(&self.coefficients, self.intercept, sample))
    }

    /// Return P(class = 1) for one sample.
    ///
    /// # Errors
    ///
    /// See [`LogisticRegression::decision_function`].
    pub fn predict_proba(&self, sample: &[f64]) -> Result<f64, LinearError> {
        self.decision_function(sample).map(sigmoid)
    }

    /// Return the predicted class (1 when P(class = 1) >= 0.5).
    ///
    /// # Errors
    ///
    /// See [`LogisticRegression::decision_function`].
    pub fn predict(&self, sample: &[f64]) -> Result<usize, LinearError> {
        self.decision_function(sample).map(|z| usize::from(z >= 0.0))
    }
}

fn linear(coefficients: &[f64], intercept: f64, sample: &[f64]) -> f64 {
    coefficients.iter().zip(sample).map(|(w, x)| w * x).sum::<f64>() + intercept
}

fn validate_inputs(features: &[Vec<f64>], labels: &[usize], weights: &[f64]) -> Result<usize, LinearError> {
    if features.is_empty() {
        return Err(LinearError::EmptyDataset);
    }
    let n_features = features[0].len();
    let n = features.len();
    if labels.len() != n {
        return Err(LinearError::LengthMismatch {
            what: "labels",
            expected: n,
            got: labels.len(),
        });
    }
    if weights.len() != n {
        return Err(LinearError::LengthMismatch {
            what: "sample_weights",
            expected: n,
            got: weights.len(),
        });
    }
    for (i, row) in features.iter().enumerate() {
        if row.len() != n_features {
            return Err(LinearError::FeatureCountMismatch {
                expected: n_features,
                got: row.len(),
                sample_index: i,
            });
        }
        if row.iter().any(|v| !v.is_finite()) || !weights[i].is_finite() || weights[i] < 0.0 {
            return Err(LinearError::NonFiniteValue { sample_index: i });
        }
        if labels[i] > 1 {
            return Err(LinearError::NonBinaryLabel {
                sample_index: i,
                label: labels[i],
            });
        }
    }
    Ok(n_features)
}

/// Weighted mean log-loss plus the L2 term.
fn objective(
    features: &[Vec<f64>],
    labels: &[usize],
    weights: &[f64],
    coefficients: &[f64],
    intercept: f64,
    l2: f64,
) -> f64 {
    let n = features.len() as f64;
    let loss: f64 = features
        .iter()
        .zip(labels)
        .zip(weights)
        .map(|((row, &y), &w)| {
            let z = linear(coefficients, intercept, row);
            // log(1 + e^z) - y*z, written to avoid overflow
            let softplus = if z > 0.0 { z + (-z).exp().ln_1p() } else { z.exp().ln_1p() };
            w * (softplus - y as f64 * z)
        })
        .sum();
    let penalty: f64 = coefficients.iter().map(|c| c * c).sum();
    loss / n + 0.5 * l2 * penalty
}

#[instrument(skip_all, fields(n_samples = features.len(), c = config.c))]
pub(crate) fn train(
    config: &LogisticConfig,
    features: &[Vec<f64>],
    labels: &[usize],
    sample_weights: &[f64],
) -> Result<LogisticRegression, LinearError> {
    let n_features = validate_inputs(features, labels, sample_weights)?;
    let n = features.len() as f64;
    let l2 = 1.0 / (config.c * n);

    let mut coefficients = vec![0.0; n_features];
    let mut intercept = 0.0;
    let mut previous = objective(features, labels, sample_weights, &coefficients, intercept, l2);
    let mut converged = false;
    let mut n_epochs = 0;

    for epoch in 0..config.max_epochs {
        n_epochs = epoch + 1;
        let mut grad_w = vec![0.0; n_features];
        let mut grad_b = 0.0;
        for ((row, &y), &w) in features.iter().zip(labels).zip(sample_weights) {
            let residual = w * (sigmoid(linear(&coefficients, intercept, row)) - y as f64);
            for (g, x) in grad_w.iter_mut().zip(row) {
                *g += residual * x;
            }
            grad_b += residual;
        }
        for (c, g) in coefficients.iter_mut().zip(&grad_w) {
            *c -= config.learning_rate * (g / n + l2 * *c);
        }
        intercept -= config.learning_rate * grad_b / n;

        let current = objective(features, labels, sample_weights, &coefficients, intercept, l2);
        if (previous - current).abs() < config.tolerance {
            converged = true;
            break;
        }
        previous = current;
    }

    if converged {
        debug!(n_epochs, loss = previous, "logistic regression converged");
    } else {
        warn!(max_epochs = config.max_epochs, "logistic regression did not converge");
    }

    Ok(LogisticRegression {
        coefficients,
        intercept,
        n_epochs,
        converged,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable() -> (Vec<Vec<f64>>, Vec<usize>) {
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for i in 0..40 {
            let x = i as f64 / 10.0 - 2.0;
            features.push(vec![x, 0.5]);
            labels.push(usize::from(x > 0.0));
        }
        (features, labels)
    }

    #[test]
    fn sigmoid_is_stable_at_extremes() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-12);
        assert!(sigmoid(800.0) <= 1.0);
        assert!(sigmoid(-800.0) >= 0.0);
        assert!(sigmoid(-800.0).is_finite());
    }

    #[test]
    fn learns_separable_direction() {
        let (features, labels) = separable();
        let model = LogisticConfig::new().fit(&features, &labels).unwrap();
        assert!(model.coefficients()[0] > 0.0);
        let correct = features
            .iter()
            .zip(&labels)
            .filter(|(row, y)| model.predict(row).unwrap() == **y)
            .count();
        assert!(correct >= 38, "correct = {correct}");
    }

    #[test]
    fn upweighting_positives_raises_their_probability() {
        let features: Vec<Vec<f64>> = (0..50).map(|i| vec![(i % 10) as f64 / 10.0]).collect();
        let labels: Vec<usize> = (0..50).map(|i| usize::from(i % 5 == 0)).collect();
        let plain = LogisticConfig::new().fit(&features, &labels).unwrap();
        let weights: Vec<f64> = labels.iter().map(|&y| if y == 1 { 4.0 } else { 1.0 }).collect();
        let weighted = LogisticConfig::new().fit_weighted(&features, &labels, &weights).unwrap();
        let probe = [0.5];
        assert!(weighted.predict_proba(&probe).unwrap() > plain.predict_proba(&probe).unwrap());
    }

    #[test]
    fn stronger_regularization_shrinks_coefficients() {
        let (features, labels) = separable();
        let loose = LogisticConfig::new().with_c(10.0).fit(&features, &labels).unwrap();
        let tight = LogisticConfig::new().with_c(0.01).fit(&features, &labels).unwrap();
        assert!(tight.coefficients()[0].abs() < loose.coefficients()[0].abs());
    }

    #[test]
    fn rejects_non_binary_label() {
        let err = LogisticConfig::new().fit(&[vec![0.0], vec![1.0]], &[0, 2]).unwrap_err();
        assert!(matches!(err, LinearError::NonBinaryLabel { sample_index: 1, label: 2 }));
    }

    #[test]
    fn rejects_bad_c() {
        let err = LogisticConfig::new().with_c(0.0).fit(&[vec![0.0]], &[0]).unwrap_err();
        assert!(matches!(err, LinearError::InvalidC { .. }));
    }

    #[test]
    fn rejects_wrong_prediction_width() {
        let (features, labels) = separable();
        let model = LogisticConfig::new().with_max_epochs(5).fit(&features, &labels).unwrap();
        assert!(matches!(
            model.predict(&[1.0]),
            Err(LinearError::PredictionFeatureMismatch { expected: 2, got: 1 })
        ));
    }
}
