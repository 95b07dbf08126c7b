//! Inner-loop model selection: k-fold grid search with optional SMOTE.

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, info, instrument};

use crate::error::EvalError;
use crate::folds::StratifiedKFold;
use crate::grid::ParamGrid;
use crate::metrics::ConfusionMatrix;
use crate::model::{FittedModel, ModelConfig};
use crate::smote::Smote;

/// Score used to rank grid candidates on inner folds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scoring {
    /// Fraction of rows classified correctly.
    #[default]
    Accuracy,
    /// Cohen's Kappa.
    Kappa,
}

impl Scoring {
    /// Short name used on the command line and in artifacts.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Accuracy => "accuracy",
            Self::Kappa => "kappa",
        }
    }

    /// Score predictions against true labels.
    ///
    /// # Errors
    ///
    /// Propagates [`ConfusionMatrix::from_labels`] errors.
    pub fn score(self, true_labels: &[usize], predicted: &[usize], n_classes: usize) -> Result<f64, EvalError> {
        let cm = ConfusionMatrix::from_labels(true_labels, predicted, n_classes)?;
        Ok(match self {
            Self::Accuracy => cm.accuracy(),
            Self::Kappa => cm.kappa(),
        })
    }
}

impl fmt::Display for Scoring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Inner-fold scores of one candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateScore {
    /// Hyperparameters of the candidate.
    pub params: BTreeMap<String, String>,
    /// Score on each inner fold.
    pub fold_scores: Vec<f64>,
    /// Mean of `fold_scores`.
    pub mean_score: f64,
}

/// Outcome of a grid search.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// Position of the winner in the grid.
    pub best_index: usize,
    /// Winning configuration.
    pub best: ModelConfig,
    /// Mean inner score of the winner.
    pub best_score: f64,
    /// Every candidate in grid order.
    pub candidate_scores: Vec<CandidateScore>,
    /// The winner refitted on all training rows.
    pub model: FittedModel,
    /// Training rows before oversampling.
    pub n_train: usize,
    /// Training rows seen by the refit, after oversampling.
    pub n_train_resampled: usize,
}

/// Grid search over one family with stratified inner folds.
///
/// Each candidate is scored by the mean of its inner-fold scores; the
/// highest mean wins and the first candidate wins ties. When SMOTE is set,
/// every inner training fold and the final refit are oversampled; held-out
/// inner folds never are.
///
/// # Defaults
///
/// | Parameter | Default    |
/// |-----------|------------|
/// | `scoring` | `Accuracy` |
/// | `smote`   | `None`     |
/// | `seed`    | 42         |
#[derive(Debug, Clone)]
pub struct GridSearch {
    grid: ParamGrid,
    inner_folds: usize,
    scoring: Scoring,
    smote: Option<Smote>,
    seed: u64,
}

impl GridSearch {
    /// Create a search over `grid` with `inner_folds` stratified folds.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::InvalidFoldCount`] if `inner_folds` < 2.
    pub fn new(grid: ParamGrid, inner_folds: usize) -> Result<Self, EvalError> {
        if inner_folds < 2 {
            return Err(EvalError::InvalidFoldCount { n_folds: inner_folds });
        }
        Ok(Self {
            grid,
            inner_folds,
            scoring: Scoring::default(),
            smote: None,
            seed: 42,
        })
    }

    /// Set the ranking score.
    #[must_use]
    pub fn with_scoring(mut self, scoring: Scoring) -> Self {
        self.scoring = scoring;
        self
    }

    /// Oversample training partitions with `smote`, or not at all.
    #[must_use]
    pub fn with_smote(mut self, smote: Option<Smote>) -> Self {
        self.smote = smote;
        self
    }

    /// Set the seed for inner fold shuffling.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Return the grid.
    #[must_use]
    pub fn grid(&self) -> &ParamGrid {
        &self.grid
    }

    /// Return the ranking score.
    #[must_use]
    pub fn scoring(&self) -> Scoring {
        self.scoring
    }

    /// Run the search on training rows and refit the winner.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`EvalError::EmptyDataset`] | No rows |
    /// | [`EvalError::LengthMismatch`] | Labels misaligned with rows |
    /// | [`EvalError::TooFewSamplesForFolds`] | A class has fewer rows than inner folds |
    /// | [`EvalError::TooFewMinoritySamples`] | SMOTE cannot oversample a training partition |
    /// | model errors | Propagated from fitting or prediction |
    #[instrument(skip_all, fields(kind = %self.grid.kind(), n_candidates = self.grid.len(), n_samples = features.len()))]
    pub fn fit(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
        feature_names: &[String],
    ) -> Result<SearchResult, EvalError> {
        if features.is_empty() {
            return Err(EvalError::EmptyDataset);
        }
        if labels.len() != features.len() {
            return Err(EvalError::LengthMismatch {
                what: "labels",
                expected: features.len(),
                got: labels.len(),
            });
        }
        let n_classes = labels.iter().max().map_or(0, |&m| m + 1).max(2);
        let folds = StratifiedKFold::new(self.inner_folds)?
            .with_seed(self.seed)
            .split(labels)?;

        // Inner partitions are shared by every candidate.
        let mut partitions = Vec::with_capacity(folds.len());
        for fold in &folds {
            let train_x: Vec<Vec<f64>> = fold.train.iter().map(|&i| features[i].clone()).collect();
            let train_y: Vec<usize> = fold.train.iter().map(|&i| labels[i]).collect();
            let (train_x, train_y) = self.oversample(train_x, train_y)?;
            let test_x: Vec<Vec<f64>> = fold.test.iter().map(|&i| features[i].clone()).collect();
            let test_y: Vec<usize> = fold.test.iter().map(|&i| labels[i]).collect();
            partitions.push((train_x, train_y, test_x, test_y));
        }

        let mut candidate_scores = Vec::with_capacity(self.grid.len());
        let mut best_index = 0;
        let mut best_score = f64::NEG_INFINITY;
        for (index, candidate) in self.grid.candidates().iter().enumerate() {
            let mut fold_scores = Vec::with_capacity(partitions.len());
            for (train_x, train_y, test_x, test_y) in &partitions {
                let model = candidate.fit(train_x, train_y, feature_names)?;
                let predicted = model.predict_batch(test_x)?;
                fold_scores.push(self.scoring.score(test_y, &predicted, n_classes)?);
            }
            let mean_score = fold_scores.iter().sum::<f64>() / fold_scores.len() as f64;
            debug!(index, mean_score, "candidate scored");
            if mean_score > best_score {
                best_index = index;
                best_score = mean_score;
            }
            candidate_scores.push(CandidateScore {
                params: candidate.params(),
                fold_scores,
                mean_score,
            });
        }

        let best = self.grid.candidates()[best_index].clone();
        let (train_x, train_y) = self.oversample(features.to_vec(), labels.to_vec())?;
        let n_train_resampled = train_x.len();
        let model = best.fit(&train_x, &train_y, feature_names)?;

        info!(
            best = ?candidate_scores[best_index].params,
            best_score,
            scoring = %self.scoring,
            "grid search complete"
        );

        Ok(SearchResult {
            best_index,
            best,
            best_score,
            candidate_scores,
            model,
            n_train: features.len(),
            n_train_resampled,
        })
    }

    fn oversample(&self, features: Vec<Vec<f64>>, labels: Vec<usize>) -> Result<(Vec<Vec<f64>>, Vec<usize>), EvalError> {
        match &self.smote {
            Some(smote) => {
                let out = smote.resample(&features, &labels)?;
                Ok((out.features, out.labels))
            }
            None => Ok((features, labels)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelKind;

    fn noisy_blobs() -> (Vec<Vec<f64>>, Vec<usize>, Vec<String>) {
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for i in 0..60 {
            let class = usize::from(i % 3 == 0);
            let centre = if class == 1 { 2.0 } else { -2.0 };
            features.push(vec![centre + ((i * 7) % 11) as f64 * 0.1, ((i * 5) % 13) as f64 * 0.1]);
            labels.push(class);
        }
        (features, labels, vec!["x".into(), "y".into()])
    }

    #[test]
    fn scores_every_candidate() {
        let (features, labels, names) = noisy_blobs();
        let grid = ParamGrid::from_candidates(vec![
            ModelConfig::RandomForest(offtask_rf::RandomForestConfig::new(10).unwrap()),
            ModelConfig::RandomForest(offtask_rf::RandomForestConfig::new(10).unwrap().with_max_depth(Some(1))),
        ])
        .unwrap();
        let result = GridSearch::new(grid, 3).unwrap().fit(&features, &labels, &names).unwrap();
        assert_eq!(result.candidate_scores.len(), 2);
        assert!(result.candidate_scores.iter().all(|c| c.fold_scores.len() == 3));
        assert!(result.best_score >= 0.9);
        assert_eq!(result.n_train, 60);
        assert_eq!(result.n_train_resampled, 60);
    }

    #[test]
    fn first_candidate_wins_ties() {
        let (features, labels, names) = noisy_blobs();
        let lr = ModelKind::LogisticRegression.default_config(0).unwrap();
        let grid = ParamGrid::from_candidates(vec![lr.clone(), lr]).unwrap();
        let result = GridSearch::new(grid, 3).unwrap().fit(&features, &labels, &names).unwrap();
        assert_eq!(result.candidate_scores[0].mean_score, result.candidate_scores[1].mean_score);
        assert_eq!(result.best_index, 0);
    }

    #[test]
    fn smote_balances_refit() {
        let (features, labels, names) = noisy_blobs();
        let grid = ParamGrid::for_kind(ModelKind::LogisticRegression, 0).unwrap();
        let result = GridSearch::new(grid, 3)
            .unwrap()
            .with_smote(Some(Smote::default()))
            .fit(&features, &labels, &names)
            .unwrap();
        // 40 majority rows, 20 minority topped up to 40.
        assert_eq!(result.n_train_resampled, 80);
    }

    #[test]
    fn kappa_scoring_is_selectable() {
        let (features, labels, names) = noisy_blobs();
        let grid = ParamGrid::for_kind(ModelKind::Svm, 0).unwrap();
        let search = GridSearch::new(grid, 3).unwrap().with_scoring(Scoring::Kappa);
        assert_eq!(search.scoring(), Scoring::Kappa);
        let result = search.fit(&features, &labels, &names).unwrap();
        assert!(result.best_score <= 1.0);
    }

    #[test]
    fn one_inner_fold_rejected() {
        let grid = ParamGrid::for_kind(ModelKind::Svm, 0).unwrap();
        assert!(matches!(GridSearch::new(grid, 1), Err(EvalError::InvalidFoldCount { n_folds: 1 })));
    }
}
