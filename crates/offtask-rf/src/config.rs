//! Configuration builder for Random Forest training.

use crate::error::RfError;
use crate::result::RandomForestResult;
use crate::split::SplitCriterion;

/// Strategy for determining the number of features to consider at each split.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MaxFeatures {
    /// Square root of total features.
    Sqrt,
    /// Log base 2 of total features.
    Log2,
    /// A fraction of total features (must be in (0.0, 1.0]).
    Fraction(f64),
    /// A fixed count.
    Fixed(usize),
    /// All features (no subsampling).
    All,
}

/// Configuration for Random Forest training.
///
/// Construct via [`RandomForestConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter           | Default |
/// |---------------------|---------|
/// | `max_features`      | `Sqrt`  |
/// | `max_depth`         | `None`  |
/// | `min_samples_split` | 2       |
/// | `min_samples_leaf`  | 1       |
/// | `criterion`         | `Gini`  |
/// | `bootstrap`         | `true`  |
/// | `seed`              | 42      |
#[derive(Debug, Clone, PartialEq)]
pub struct RandomForestConfig {
    pub(crate) n_trees: usize,
    pub(crate) max_features: MaxFeatures,
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) criterion: SplitCriterion,
    pub(crate) bootstrap: bool,
    pub(crate) seed: u64,
}

impl RandomForestConfig {
    /// Create a new config with the given number of trees.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::InvalidTreeCount`] if `n_trees` is zero.
    pub fn new(n_trees: usize) -> Result<Self, RfError> {
        if n_trees == 0 {
            return Err(RfError::InvalidTreeCount { n_trees });
        }
        Ok(Self {
            n_trees,
            max_features: MaxFeatures::Sqrt,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            criterion: SplitCriterion::Gini,
            bootstrap: true,
            seed: 42,
        })
    }

    /// Set the max features strategy.
    #[must_use]
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set the maximum tree depth. `None` means unlimited.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the minimum number of samples required to attempt a split.
    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    /// Set the minimum number of samples required in each leaf after a split.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Set the split quality criterion.
    #[must_use]
    pub fn with_criterion(mut self, criterion: SplitCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Draw a bootstrap sample per tree (`true`) or train every tree on all rows.
    #[must_use]
    pub fn with_bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    /// Set the random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Return the number of trees.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.n_trees
    }

    /// Return the max features strategy.
    #[must_use]
    pub fn max_features(&self) -> MaxFeatures {
        self.max_features
    }

    /// Return the maximum depth limit, if any.
    #[must_use]
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Return the split criterion.
    #[must_use]
    pub fn criterion(&self) -> SplitCriterion {
        self.criterion
    }

    /// Return whether trees are grown on bootstrap samples.
    #[must_use]
    pub fn bootstrap(&self) -> bool {
        self.bootstrap
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Train a Random Forest with every sample weighted 1.0.
    ///
    /// # Errors
    ///
    /// See [`RandomForestConfig::fit_weighted`].
    pub fn fit(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
        feature_names: &[String],
    ) -> Result<RandomForestResult, RfError> {
        let weights = vec![1.0; features.len()];
        self.fit_weighted(features, labels, &weights, feature_names)
    }

    /// Train a Random Forest with per-sample weights.
    ///
    /// `features[sample_idx][feature_idx]`: row-major layout.
    /// `labels[sample_idx]`: class labels (zero-based).
    /// `sample_weights[sample_idx]`: non-negative weights, e.g. inverse
    /// class frequencies for class balancing.
    /// `feature_names`: names for each feature column.
    ///
    /// # Errors
    ///
    /// | Variant                           | When                                             |
    /// |-----------------------------------|--------------------------------------------------|
    /// | [`RfError::EmptyDataset`]         | `features` is empty                              |
    /// | [`RfError::ZeroFeatures`]         | rows have zero feature columns                   |
    /// | [`RfError::FeatureCountMismatch`] | rows have inconsistent lengths                   |
    /// | [`RfError::LengthMismatch`]       | labels/weights not one per row                   |
    /// | [`RfError::NonFiniteValue`]       | any value is NaN or infinite                     |
    /// | [`RfError::InvalidSampleWeight`]  | a weight is negative or non-finite               |
    /// | [`RfError::InvalidMaxFeatures`]   | resolved max_features is outside [1, n_features] |
    /// | tree config errors                | invalid depth / split / leaf limits              |
    pub fn fit_weighted(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
        sample_weights: &[f64],
        feature_names: &[String],
    ) -> Result<RandomForestResult, RfError> {
        crate::forest::train(self, features, labels, sample_weights, feature_names)
    }
}
