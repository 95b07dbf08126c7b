//! Classifier families behind one interface: configuration, class
//! balancing, fitting and scoring.

use std::collections::BTreeMap;
use std::fmt;

use offtask_linear::{LogisticConfig, LogisticRegression};
use offtask_rf::{RandomForest, RandomForestConfig};
use offtask_svm::{Kernel, SvmConfig, SvmModel};
use tracing::debug;

use crate::error::EvalError;
use crate::scale::StandardScaler;

/// The three classifier families compared by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKind {
    /// Bootstrap ensemble of CART trees.
    RandomForest,
    /// L2-regularised logistic regression on standardized features.
    LogisticRegression,
    /// RBF-kernel C-SVC on standardized features.
    Svm,
}

impl ModelKind {
    /// All families in report order.
    pub const ALL: [ModelKind; 3] = [Self::RandomForest, Self::LogisticRegression, Self::Svm];

    /// Short name used in file names and on the command line.
    #[must_use]
    pub fn short_name(self) -> &'static str {
        match self {
            Self::RandomForest => "rf",
            Self::LogisticRegression => "lr",
            Self::Svm => "svm",
        }
    }

    /// Parse a short name.
    #[must_use]
    pub fn from_short_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.short_name() == name)
    }

    /// Configuration with every hyperparameter at its default.
    ///
    /// # Errors
    ///
    /// Propagates [`offtask_rf::RfError`] from the forest builder.
    pub fn default_config(self, seed: u64) -> Result<ModelConfig, EvalError> {
        Ok(match self {
            Self::RandomForest => ModelConfig::RandomForest(RandomForestConfig::new(100)?.with_seed(seed)),
            Self::LogisticRegression => ModelConfig::LogisticRegression(LogisticConfig::new()),
            Self::Svm => ModelConfig::Svm(SvmConfig::new()),
        })
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::RandomForest => "Random Forest",
            Self::LogisticRegression => "Logistic Regression",
            Self::Svm => "SVM",
        })
    }
}

/// Per-sample weights `n / (n_classes · count[label])`, so every class
/// carries the same total weight.
#[must_use]
pub fn balanced_sample_weights(labels: &[usize]) -> Vec<f64> {
    let n_classes = labels.iter().max().map_or(0, |&m| m + 1);
    let mut counts = vec![0usize; n_classes];
    for &l in labels {
        counts[l] += 1;
    }
    let present = counts.iter().filter(|&&c| c > 0).count() as f64;
    let n = labels.len() as f64;
    labels.iter().map(|&l| n / (present * counts[l] as f64)).collect()
}

/// Unfitted hyperparameters for one classifier family.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelConfig {
    /// Random forest hyperparameters.
    RandomForest(RandomForestConfig),
    /// Logistic regression hyperparameters.
    LogisticRegression(LogisticConfig),
    /// Support vector hyperparameters.
    Svm(SvmConfig),
}

impl ModelConfig {
    /// Return the family.
    #[must_use]
    pub fn kind(&self) -> ModelKind {
        match self {
            Self::RandomForest(_) => ModelKind::RandomForest,
            Self::LogisticRegression(_) => ModelKind::LogisticRegression,
            Self::Svm(_) => ModelKind::Svm,
        }
    }

    /// Describe the hyperparameters as name/value text pairs.
    #[must_use]
    pub fn params(&self) -> BTreeMap<String, String> {
        let pairs: Vec<(&str, String)> = match self {
            Self::RandomForest(c) => vec![
                ("n_trees", c.n_trees().to_string()),
                ("max_depth", c.max_depth().map_or_else(|| "none".to_string(), |d| d.to_string())),
                ("max_features", format!("{:?}", c.max_features()).to_lowercase()),
                ("criterion", format!("{:?}", c.criterion()).to_lowercase()),
            ],
            Self::LogisticRegression(c) => vec![("C", c.c().to_string()), ("max_epochs", c.max_epochs().to_string())],
            Self::Svm(c) => {
                let gamma = match c.kernel() {
                    Kernel::Rbf { gamma: Some(g) } => g.to_string(),
                    Kernel::Rbf { gamma: None } => "scale".to_string(),
                    Kernel::Linear => "n/a".to_string(),
                };
                vec![("C", c.c().to_string()), ("kernel", c.kernel().name().to_string()), ("gamma", gamma)]
            }
        };
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    /// Return a copy whose seed is shifted by `offset`, so repeated fits
    /// (one per outer fold) draw different randomness. Deterministic
    /// families are returned unchanged.
    #[must_use]
    pub fn with_seed_offset(&self, offset: u64) -> Self {
        match self {
            Self::RandomForest(c) => Self::RandomForest(c.clone().with_seed(c.seed().wrapping_add(offset))),
            other => other.clone(),
        }
    }

    /// Fit on the given rows with balanced class weights. Logistic
    /// regression and SVM see standardized features.
    ///
    /// # Errors
    ///
    /// Propagates the underlying model error.
    pub fn fit(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
        feature_names: &[String],
    ) -> Result<FittedModel, EvalError> {
        let weights = balanced_sample_weights(labels);
        debug!(kind = %self.kind(), n_samples = features.len(), "fitting model");
        Ok(match self {
            Self::RandomForest(c) => {
                let result = c.fit_weighted(features, labels, &weights, feature_names)?;
                let summary = result.summary();
                debug!(
                    class_weights = ?summary.class_weight_totals,
                    mean_depth = summary.mean_depth,
                    "forest fitted"
                );
                FittedModel::RandomForest(result.into_forest())
            }
            Self::LogisticRegression(c) => {
                let scaler = StandardScaler::fit(features);
                let model = c.fit_weighted(&scaler.transform(features)?, labels, &weights)?;
                FittedModel::LogisticRegression { scaler, model }
            }
            Self::Svm(c) => {
                let scaler = StandardScaler::fit(features);
                let model = c.fit_weighted(&scaler.transform(features)?, labels, &weights)?;
                FittedModel::Svm { scaler, model }
            }
        })
    }
}

/// A trained classifier from any family.
#[derive(Debug, Clone)]
pub enum FittedModel {
    /// Trained forest.
    RandomForest(RandomForest),
    /// Trained logistic regression and the scaler fitted with it.
    LogisticRegression {
        /// Training-set standardization.
        scaler: StandardScaler,
        /// The fitted model.
        model: LogisticRegression,
    },
    /// Trained SVM and the scaler fitted with it.
    Svm {
        /// Training-set standardization.
        scaler: StandardScaler,
        /// The fitted model.
        model: SvmModel,
    },
}

impl FittedModel {
    /// Predict a class for each row.
    ///
    /// # Errors
    ///
    /// Returns a width mismatch when a row differs from the training width.
    pub fn predict_batch(&self, features: &[Vec<f64>]) -> Result<Vec<usize>, EvalError> {
        Ok(match self {
            Self::RandomForest(forest) => forest.predict_batch(features)?,
            Self::LogisticRegression { scaler, model } => scaler
                .transform(features)?
                .iter()
                .map(|row| model.predict(row))
                .collect::<Result<_, _>>()?,
            Self::Svm { scaler, model } => model
                .decision_function_batch(&scaler.transform(features)?)?
                .into_iter()
                .map(|d| usize::from(d > 0.0))
                .collect(),
        })
    }

    /// Return a score for each row that increases with confidence in
    /// class 1: the forest's vote share, the logistic probability, or the
    /// SVM decision value.
    ///
    /// # Errors
    ///
    /// Returns a width mismatch when a row differs from the training width.
    pub fn score_batch(&self, features: &[Vec<f64>]) -> Result<Vec<f64>, EvalError> {
        Ok(match self {
            Self::RandomForest(forest) => forest
                .predict_proba_batch(features)?
                .iter()
                .map(|d| d.probability(1))
                .collect(),
            Self::LogisticRegression { scaler, model } => scaler
                .transform(features)?
                .iter()
                .map(|row| model.predict_proba(row))
                .collect::<Result<_, _>>()?,
            Self::Svm { scaler, model } => model.decision_function_batch(&scaler.transform(features)?)?,
        })
    }

    /// Per-tree impurity importances, for forests only.
    #[must_use]
    pub fn tree_importances(&self) -> Option<Vec<Vec<f64>>> {
        match self {
            Self::RandomForest(forest) => Some(forest.trees().iter().map(|t| t.feature_importances()).collect()),
            _ => None,
        }
    }
}
