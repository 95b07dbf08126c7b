//! Nested cross-validation with group-disjoint outer folds.

use std::collections::BTreeMap;

use offtask_io::FeatureSet;
use offtask_rf::{RankedFeature, aggregate_importances};
use tracing::{info, instrument, warn};

use crate::error::EvalError;
use crate::folds::StratifiedGroupKFold;
use crate::grid::ParamGrid;
use crate::metrics::{ClassificationReport, ConfusionMatrix};
use crate::model::ModelKind;
use crate::search::{GridSearch, Scoring};
use crate::smote::Smote;

/// Nested cross-validation configuration.
///
/// Outer folds come from [`StratifiedGroupKFold`], so no group is split
/// between training and held-out rows. Inside each outer training split a
/// [`GridSearch`] picks hyperparameters on stratified inner folds and
/// refits; the refit predicts the held-out rows.
///
/// # Defaults
///
/// | Parameter     | Default            |
/// |---------------|--------------------|
/// | `inner_folds` | 3                  |
/// | `scoring`     | `Accuracy`         |
/// | `smote`       | `Smote::default()` |
/// | `seed`        | 42                 |
#[derive(Debug, Clone)]
pub struct NestedCrossValidation {
    outer_folds: usize,
    inner_folds: usize,
    scoring: Scoring,
    smote: Option<Smote>,
    seed: u64,
}

/// Outcome of one outer fold.
#[derive(Debug, Clone)]
pub struct FoldResult {
    /// Zero-based outer fold index.
    pub fold: usize,
    /// Hyperparameters chosen by the inner search.
    pub params: BTreeMap<String, String>,
    /// Mean inner score of the chosen hyperparameters.
    pub inner_score: f64,
    /// Held-out row indices, ascending.
    pub test_indices: Vec<usize>,
    /// Predictions aligned with `test_indices`.
    pub predictions: Vec<usize>,
    /// Cohen's Kappa on the held-out rows.
    pub kappa: f64,
    /// Outer training rows before oversampling.
    pub n_train: usize,
    /// Outer training rows after oversampling.
    pub n_train_resampled: usize,
}

/// Aggregated nested cross-validation results for one model family.
#[derive(Debug, Clone)]
pub struct EvaluationResult {
    /// The evaluated family.
    pub kind: ModelKind,
    /// Inner ranking score.
    pub scoring: Scoring,
    /// Per-fold outcomes in fold order.
    pub folds: Vec<FoldResult>,
    /// Out-of-fold prediction for every row, in row order.
    pub predictions: Vec<usize>,
    /// Kappa over all out-of-fold predictions.
    pub pooled_kappa: f64,
    /// Mean of fold Kappas.
    pub mean_kappa: f64,
    /// Population standard deviation of fold Kappas.
    pub std_kappa: f64,
    /// Confusion matrix over all out-of-fold predictions.
    pub confusion_matrix: ConfusionMatrix,
    /// Per-class report over all out-of-fold predictions.
    pub report: ClassificationReport,
    /// Forest importances averaged over every tree of every fold; empty for
    /// other families.
    pub feature_importances: Vec<RankedFeature>,
    /// Number of rows evaluated.
    pub n_samples: usize,
}

impl NestedCrossValidation {
    /// Create a configuration with `outer_folds` group-disjoint folds.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::InvalidFoldCount`] if `outer_folds` < 2.
    pub fn new(outer_folds: usize) -> Result<Self, EvalError> {
        if outer_folds < 2 {
            return Err(EvalError::InvalidFoldCount { n_folds: outer_folds });
        }
        Ok(Self {
            outer_folds,
            inner_folds: 3,
            scoring: Scoring::default(),
            smote: Some(Smote::default()),
            seed: 42,
        })
    }

    /// Set the inner fold count.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::InvalidFoldCount`] if `inner_folds` < 2.
    pub fn with_inner_folds(mut self, inner_folds: usize) -> Result<Self, EvalError> {
        if inner_folds < 2 {
            return Err(EvalError::InvalidFoldCount { n_folds: inner_folds });
        }
        self.inner_folds = inner_folds;
        Ok(self)
    }

    /// Set the seed for fold construction.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the oversampler, or disable oversampling with `None`.
    #[must_use]
    pub fn with_smote(mut self, smote: Option<Smote>) -> Self {
        self.smote = smote;
        self
    }

    /// Set the inner ranking score.
    #[must_use]
    pub fn with_scoring(mut self, scoring: Scoring) -> Self {
        self.scoring = scoring;
        self
    }

    /// Return the outer fold count.
    #[must_use]
    pub fn outer_folds(&self) -> usize {
        self.outer_folds
    }

    /// Return the inner fold count.
    #[must_use]
    pub fn inner_folds(&self) -> usize {
        self.inner_folds
    }

    /// Run nested cross-validation of `grid` on `data`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`EvalError::EmptyDataset`] | No rows |
    /// | [`EvalError::TooFewGroups`] | Fewer groups than outer folds |
    /// | [`EvalError::EmptyFold`] | An outer fold received no rows |
    /// | search errors | Propagated from [`GridSearch::fit`] |
    #[instrument(skip_all, fields(kind = %grid.kind(), outer = self.outer_folds, inner = self.inner_folds, n_samples = data.n_samples()))]
    pub fn evaluate(&self, grid: &ParamGrid, data: &FeatureSet) -> Result<EvaluationResult, EvalError> {
        if data.n_samples() == 0 {
            return Err(EvalError::EmptyDataset);
        }
        let features = data.features();
        let labels = data.labels();
        let n_classes = data.class_names().len().max(2);

        let outer = StratifiedGroupKFold::new(self.outer_folds)?
            .with_seed(self.seed)
            .split(labels, data.groups())?;

        let mut folds = Vec::with_capacity(outer.len());
        let mut predictions = vec![0usize; data.n_samples()];
        let mut all_importances: Vec<Vec<f64>> = Vec::new();

        for (fold, split) in outer.iter().enumerate() {
            let offset = fold as u64;
            let search = GridSearch::new(grid.with_seed_offset(offset), self.inner_folds)?
                .with_scoring(self.scoring)
                .with_smote(self.smote.clone().map(|s| {
                    let seed = s.seed().wrapping_add(offset);
                    s.with_seed(seed)
                }))
                .with_seed(self.seed.wrapping_add(offset));

            let train_x: Vec<Vec<f64>> = split.train.iter().map(|&i| features[i].clone()).collect();
            let train_y: Vec<usize> = split.train.iter().map(|&i| labels[i]).collect();
            let test_x: Vec<Vec<f64>> = split.test.iter().map(|&i| features[i].clone()).collect();
            let test_y: Vec<usize> = split.test.iter().map(|&i| labels[i]).collect();

            let searched = search.fit(&train_x, &train_y, data.feature_names())?;
            let fold_predictions = searched.model.predict_batch(&test_x)?;
            let kappa = ConfusionMatrix::from_labels(&test_y, &fold_predictions, n_classes)?.kappa();

            for (&row, &p) in split.test.iter().zip(&fold_predictions) {
                predictions[row] = p;
            }
            if let Some(per_tree) = searched.model.tree_importances() {
                all_importances.extend(per_tree);
            }

            let params = searched.best.params();
            info!(fold, kappa, n_test = split.test.len(), params = ?params, "outer fold completed");
            if test_y.iter().all(|&l| l == test_y[0]) {
                warn!(fold, "held-out fold contains a single class; its kappa is degenerate");
            }

            folds.push(FoldResult {
                fold,
                params,
                inner_score: searched.best_score,
                test_indices: split.test.clone(),
                predictions: fold_predictions,
                kappa,
                n_train: searched.n_train,
                n_train_resampled: searched.n_train_resampled,
            });
        }

        let fold_kappas: Vec<f64> = folds.iter().map(|f| f.kappa).collect();
        let mean_kappa = fold_kappas.iter().sum::<f64>() / fold_kappas.len() as f64;
        let std_kappa = (fold_kappas.iter().map(|k| (k - mean_kappa).powi(2)).sum::<f64>()
            / fold_kappas.len() as f64)
            .sqrt();

        let confusion_matrix = ConfusionMatrix::from_labels(labels, &predictions, n_classes)?;
        let pooled_kappa = confusion_matrix.kappa();
        let report = ClassificationReport::from_confusion(&confusion_matrix, data.class_names());
        let feature_importances = if all_importances.is_empty() {
            Vec::new()
        } else {
            aggregate_importances(&all_importances, data.feature_names())
        };

        info!(pooled_kappa, mean_kappa, std_kappa, "nested cross-validation complete");

        Ok(EvaluationResult {
            kind: grid.kind(),
            scoring: self.scoring,
            folds,
            predictions,
            pooled_kappa,
            mean_kappa,
            std_kappa,
            confusion_matrix,
            report,
            feature_importances,
            n_samples: data.n_samples(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelConfig;

    fn grouped_data() -> FeatureSet {
        let mut features = Vec::new();
        let mut labels = Vec::new();
        let mut groups = Vec::new();
        for student in 0..20 {
            for step in 0..6 {
                let class = usize::from((step == 0 && student % 2 == 0) || step == 1);
                let signal = if class == 1 { 3.0 } else { 0.0 };
                features.push(vec![signal + (step as f64) * 0.05, (student % 5) as f64]);
                labels.push(class);
                groups.push(format!("s{student}"));
            }
        }
        FeatureSet::new(
            features,
            labels,
            groups,
            vec!["signal".into(), "noise".into()],
            vec!["N".into(), "Y".into()],
        )
        .unwrap()
    }

    #[test]
    fn folds_cover_every_row_once() {
        let data = grouped_data();
        let grid = ParamGrid::for_kind(ModelKind::LogisticRegression, 0).unwrap();
        let result = NestedCrossValidation::new(4).unwrap().evaluate(&grid, &data).unwrap();
        assert_eq!(result.folds.len(), 4);
        let mut seen: Vec<usize> = result.folds.iter().flat_map(|f| f.test_indices.clone()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..data.n_samples()).collect::<Vec<_>>());
        assert_eq!(result.predictions.len(), data.n_samples());
    }

    #[test]
    fn pooled_metrics_match_predictions() {
        let data = grouped_data();
        let grid = ParamGrid::for_kind(ModelKind::LogisticRegression, 0).unwrap();
        let result = NestedCrossValidation::new(4).unwrap().evaluate(&grid, &data).unwrap();
        let cm = ConfusionMatrix::from_labels(data.labels(), &result.predictions, 2).unwrap();
        assert_eq!(cm, result.confusion_matrix);
        assert!((result.pooled_kappa - cm.kappa()).abs() < 1e-12);
        assert!(result.pooled_kappa > 0.9, "kappa = {}", result.pooled_kappa);
        assert!(result.feature_importances.is_empty());
    }

    #[test]
    fn forest_folds_report_importances() {
        let data = grouped_data();
        let grid = ParamGrid::from_candidates(vec![ModelConfig::RandomForest(
            offtask_rf::RandomForestConfig::new(8).unwrap(),
        )])
        .unwrap();
        let result = NestedCrossValidation::new(3)
            .unwrap()
            .with_inner_folds(2)
            .unwrap()
            .evaluate(&grid, &data)
            .unwrap();
        assert_eq!(result.feature_importances.len(), 2);
        assert_eq!(result.feature_importances[0].name, "signal");
    }

    #[test]
    fn smote_inflates_training_rows_only() {
        let data = grouped_data();
        let grid = ParamGrid::for_kind(ModelKind::LogisticRegression, 0).unwrap();
        let with = NestedCrossValidation::new(4).unwrap().evaluate(&grid, &data).unwrap();
        let without = NestedCrossValidation::new(4)
            .unwrap()
            .with_smote(None)
            .evaluate(&grid, &data)
            .unwrap();
        for (a, b) in with.folds.iter().zip(&without.folds) {
            assert_eq!(a.test_indices, b.test_indices);
            assert!(a.n_train_resampled > a.n_train);
            assert_eq!(b.n_train_resampled, b.n_train);
        }
    }

    #[test]
    fn invalid_fold_counts() {
        assert!(matches!(NestedCrossValidation::new(1), Err(EvalError::InvalidFoldCount { n_folds: 1 })));
        assert!(NestedCrossValidation::new(5).unwrap().with_inner_folds(0).is_err());
    }
}
