//! Training result types for Random Forest.

use crate::forest::RandomForest;
use crate::importance::RankedFeature;

/// What a training run saw and produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSummary {
    /// Number of training samples.
    pub n_samples: usize,
    /// Total sample weight per class. Equal entries mean the weights
    /// balanced the classes.
    pub class_weight_totals: Vec<f64>,
    /// Features tried at each split.
    pub max_features_resolved: usize,
    /// Mean depth over the trees.
    pub mean_depth: f64,
}

/// A fitted forest with its ranked importances and a training summary.
#[derive(Debug)]
pub struct RandomForestResult {
    forest: RandomForest,
    importances: Vec<RankedFeature>,
    summary: TrainingSummary,
}

impl RandomForestResult {
    pub(crate) fn new(
        forest: RandomForest,
        importances: Vec<RankedFeature>,
        summary: TrainingSummary,
    ) -> Self {
        Self {
            forest,
            importances,
            summary,
        }
    }

    /// Borrow the fitted forest.
    #[must_use]
    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }

    /// Consume the result and return the fitted forest.
    #[must_use]
    pub fn into_forest(self) -> RandomForest {
        self.forest
    }

    /// Return the ranked feature importances.
    #[must_use]
    pub fn importances(&self) -> &[RankedFeature] {
        &self.importances
    }

    /// Return the training summary.
    #[must_use]
    pub fn summary(&self) -> &TrainingSummary {
        &self.summary
    }
}
