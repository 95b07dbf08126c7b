//! Hyperparameter candidates per classifier family.

use crate::error::EvalError;
use crate::model::{ModelConfig, ModelKind};

/// Forest tree counts searched by [`ParamGrid::for_kind`].
pub const RF_TREE_COUNTS: [usize; 2] = [100, 200];

/// Forest depth limits searched by [`ParamGrid::for_kind`].
pub const RF_MAX_DEPTHS: [Option<usize>; 2] = [None, Some(10)];

/// An ordered, non-empty list of candidate configurations of one family.
///
/// Order matters: grid search keeps the first candidate among equal scores.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamGrid {
    kind: ModelKind,
    candidates: Vec<ModelConfig>,
}

impl ParamGrid {
    /// The standard grid for a family.
    ///
    /// The forest grid is the cartesian product of [`RF_TREE_COUNTS`] and
    /// [`RF_MAX_DEPTHS`]; logistic regression and SVM use their defaults
    /// only.
    ///
    /// # Errors
    ///
    /// Propagates forest config errors.
    pub fn for_kind(kind: ModelKind, seed: u64) -> Result<Self, EvalError> {
        let candidates = match kind {
            ModelKind::RandomForest => {
                let mut out = Vec::with_capacity(RF_TREE_COUNTS.len() * RF_MAX_DEPTHS.len());
                for n_trees in RF_TREE_COUNTS {
                    for max_depth in RF_MAX_DEPTHS {
                        let config = offtask_rf::RandomForestConfig::new(n_trees)?
                            .with_max_depth(max_depth)
                            .with_seed(seed);
                        out.push(ModelConfig::RandomForest(config));
                    }
                }
                out
            }
            other => vec![other.default_config(seed)?],
        };
        Ok(Self { kind, candidates })
    }

    /// Build a grid from explicit candidates.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`EvalError::EmptyGrid`] | No candidates |
    /// | [`EvalError::MixedGrid`] | Candidates from more than one family |
    pub fn from_candidates(candidates: Vec<ModelConfig>) -> Result<Self, EvalError> {
        let kind = candidates.first().ok_or(EvalError::EmptyGrid)?.kind();
        if let Some(index) = candidates.iter().position(|c| c.kind() != kind) {
            return Err(EvalError::MixedGrid { index });
        }
        Ok(Self { kind, candidates })
    }

    /// Shift every candidate's seed by `offset`.
    #[must_use]
    pub fn with_seed_offset(&self, offset: u64) -> Self {
        Self {
            kind: self.kind,
            candidates: self.candidates.iter().map(|c| c.with_seed_offset(offset)).collect(),
        }
    }

    /// Return the family.
    #[must_use]
    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    /// Return the candidates in search order.
    #[must_use]
    pub fn candidates(&self) -> &[ModelConfig] {
        &self.candidates
    }

    /// Number of candidates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Always false for a constructed grid.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forest_grid_is_cartesian_product() {
        let grid = ParamGrid::for_kind(ModelKind::RandomForest, 7).unwrap();
        assert_eq!(grid.len(), 4);
        let described: Vec<(String, String)> = grid
            .candidates()
            .iter()
            .map(|c| {
                let p = c.params();
                (p["n_trees"].clone(), p["max_depth"].clone())
            })
            .collect();
        assert_eq!(
            described,
            vec![
                ("100".to_string(), "none".to_string()),
                ("100".to_string(), "10".to_string()),
                ("200".to_string(), "none".to_string()),
                ("200".to_string(), "10".to_string()),
            ]
        );
    }

    #[test]
    fn default_only_grids() {
        for kind in [ModelKind::LogisticRegression, ModelKind::Svm] {
            let grid = ParamGrid::for_kind(kind, 0).unwrap();
            assert_eq!(grid.len(), 1);
            assert_eq!(grid.kind(), kind);
        }
    }

    #[test]
    fn explicit_grids_are_validated() {
        assert!(matches!(ParamGrid::from_candidates(vec![]), Err(EvalError::EmptyGrid)));
        let mixed = vec![
            ModelKind::Svm.default_config(0).unwrap(),
            ModelKind::LogisticRegression.default_config(0).unwrap(),
        ];
        assert!(matches!(ParamGrid::from_candidates(mixed), Err(EvalError::MixedGrid { index: 1 })));
    }
}
