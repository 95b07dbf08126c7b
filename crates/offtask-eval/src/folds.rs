//! Fold construction: stratified k-fold, group-stratified k-fold, and a
//! single stratified train/test split.

use std::collections::BTreeMap;

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::error::EvalError;

/// Row indices of one train/test partition. Both lists are ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    /// Training rows.
    pub train: Vec<usize>,
    /// Held-out rows.
    pub test: Vec<usize>,
}

fn folds_from_assignment(assignment: &[usize], n_folds: usize) -> Result<Vec<Fold>, EvalError> {
    let folds: Vec<Fold> = (0..n_folds)
        .map(|fold| {
            let (test, train): (Vec<usize>, Vec<usize>) = (0..assignment.len()).partition(|&i| assignment[i] == fold);
            Fold { train, test }
        })
        .collect();
    if let Some(fold) = folds.iter().position(|f| f.test.is_empty()) {
        return Err(EvalError::EmptyFold { fold });
    }
    Ok(folds)
}

fn class_count(labels: &[usize]) -> usize {
    labels.iter().max().map_or(0, |&m| m + 1)
}

/// Stratified k-fold: each class is shuffled and dealt round-robin across
/// folds, so every fold receives about the same class proportions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StratifiedKFold {
    n_folds: usize,
    seed: u64,
}

impl StratifiedKFold {
    /// Create a splitter with `n_folds` folds.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::InvalidFoldCount`] if `n_folds` < 2.
    pub fn new(n_folds: usize) -> Result<Self, EvalError> {
        if n_folds < 2 {
            return Err(EvalError::InvalidFoldCount { n_folds });
        }
        Ok(Self { n_folds, seed: 42 })
    }

    /// Set the random seed for within-class shuffling.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Return the fold count.
    #[must_use]
    pub fn n_folds(&self) -> usize {
        self.n_folds
    }

    /// Split rows into folds.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`EvalError::EmptyDataset`] | No labels |
    /// | [`EvalError::TooFewSamplesForFolds`] | A present class has fewer rows than folds |
    pub fn split(&self, labels: &[usize]) -> Result<Vec<Fold>, EvalError> {
        if labels.is_empty() {
            return Err(EvalError::EmptyDataset);
        }
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);

        let mut class_indices: Vec<Vec<usize>> = vec![vec![]; class_count(labels)];
        for (i, &label) in labels.iter().enumerate() {
            class_indices[label].push(i);
        }

        for (class, indices) in class_indices.iter().enumerate() {
            if !indices.is_empty() && indices.len() < self.n_folds {
                return Err(EvalError::TooFewSamplesForFolds {
                    class,
                    count: indices.len(),
                    n_folds: self.n_folds,
                });
            }
        }

        // Continue the round-robin across classes so fold sizes stay even.
        let mut assignment = vec![0usize; labels.len()];
        let mut next = 0;
        for indices in &mut class_indices {
            indices.shuffle(&mut rng);
            for &idx in indices.iter() {
                assignment[idx] = next % self.n_folds;
                next += 1;
            }
        }

        folds_from_assignment(&assignment, self.n_folds)
    }
}

/// Group-stratified k-fold.
///
/// Every row of a group lands in the same fold. Groups are shuffled, then
/// visited in order of decreasing spread of their class counts; each goes
/// to the fold that keeps the per-class share of rows most even across
/// folds (mean over classes of the standard deviation of
/// `fold_count[c] / total_count[c]`), ties going to the smaller fold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StratifiedGroupKFold {
    n_folds: usize,
    seed: u64,
}

impl StratifiedGroupKFold {
    /// Create a splitter with `n_folds` folds.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::InvalidFoldCount`] if `n_folds` < 2.
    pub fn new(n_folds: usize) -> Result<Self, EvalError> {
        if n_folds < 2 {
            return Err(EvalError::InvalidFoldCount { n_folds });
        }
        Ok(Self { n_folds, seed: 42 })
    }

    /// Set the random seed for group shuffling.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Return the fold count.
    #[must_use]
    pub fn n_folds(&self) -> usize {
        self.n_folds
    }

    /// Split rows into folds that never divide a group.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`EvalError::EmptyDataset`] | No labels |
    /// | [`EvalError::LengthMismatch`] | Groups misaligned with labels |
    /// | [`EvalError::TooFewGroups`] | Fewer distinct groups than folds |
    /// | [`EvalError::EmptyFold`] | Greedy assignment left a fold empty |
    pub fn split<G: Ord>(&self, labels: &[usize], groups: &[G]) -> Result<Vec<Fold>, EvalError> {
        if labels.is_empty() {
            return Err(EvalError::EmptyDataset);
        }
        if groups.len() != labels.len() {
            return Err(EvalError::LengthMismatch {
                what: "groups",
                expected: labels.len(),
                got: groups.len(),
            });
        }

        let n_classes = class_count(labels);
        let mut group_ids: BTreeMap<&G, usize> = BTreeMap::new();
        for g in groups {
            let next = group_ids.len();
            group_ids.entry(g).or_insert(next);
        }
        let n_groups = group_ids.len();
        if n_groups < self.n_folds {
            return Err(EvalError::TooFewGroups {
                n_groups,
                n_folds: self.n_folds,
            });
        }

        let row_group: Vec<usize> = groups.iter().map(|g| group_ids[g]).collect();
        let mut group_counts = vec![vec![0usize; n_classes]; n_groups];
        for (&g, &l) in row_group.iter().zip(labels) {
            group_counts[g][l] += 1;
        }
        let mut class_totals = vec![0usize; n_classes];
        for &l in labels {
            class_totals[l] += 1;
        }

        let mut order: Vec<usize> = (0..n_groups).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        order.shuffle(&mut rng);
        // Stable sort keeps the shuffled order among equal spreads.
        order.sort_by(|&a, &b| population_std(&group_counts[b]).total_cmp(&population_std(&group_counts[a])));

        let mut fold_counts = vec![vec![0usize; n_classes]; self.n_folds];
        let mut group_fold = vec![0usize; n_groups];
        for &g in &order {
            let best = best_fold(&mut fold_counts, &class_totals, &group_counts[g]);
            for (c, &n) in group_counts[g].iter().enumerate() {
                fold_counts[best][c] += n;
            }
            group_fold[g] = best;
        }
        debug!(n_groups, n_folds = self.n_folds, ?fold_counts, "groups assigned to folds");

        let assignment: Vec<usize> = row_group.iter().map(|&g| group_fold[g]).collect();
        folds_from_assignment(&assignment, self.n_folds)
    }
}

fn population_std(values: &[usize]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<usize>() as f64 / n;
    (values.iter().map(|&v| (v as f64 - mean).powi(2)).sum::<f64>() / n).sqrt()
}

/// Fold whose class shares stay most even after taking `group`.
fn best_fold(fold_counts: &mut [Vec<usize>], class_totals: &[usize], group: &[usize]) -> usize {
    let n_folds = fold_counts.len();
    let mut best = 0;
    let mut min_eval = f64::INFINITY;
    let mut min_size = usize::MAX;
    for i in 0..n_folds {
        for (c, &n) in group.iter().enumerate() {
            fold_counts[i][c] += n;
        }
        let eval = class_totals
            .iter()
            .enumerate()
            .map(|(c, &total)| {
                let shares: Vec<f64> = fold_counts
                    .iter()
                    .map(|f| if total == 0 { 0.0 } else { f[c] as f64 / total as f64 })
                    .collect();
                let mean = shares.iter().sum::<f64>() / n_folds as f64;
                (shares.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n_folds as f64).sqrt()
            })
            .sum::<f64>()
            / class_totals.len() as f64;
        for (c, &n) in group.iter().enumerate() {
            fold_counts[i][c] -= n;
        }
        let size: usize = fold_counts[i].iter().sum();
        let tied = (eval - min_eval).abs() <= 1e-8 + 1e-5 * min_eval.abs();
        if eval < min_eval || (tied && size < min_size) {
            min_eval = eval;
            min_size = size;
            best = i;
        }
    }
    best
}

/// A single stratified train/test partition.
///
/// Each class contributes `round(count · test_fraction)` rows to the test
/// side, clamped so both sides keep at least one row of the class.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`EvalError::InvalidTestFraction`] | Fraction outside (0, 1) |
/// | [`EvalError::EmptyDataset`] | No labels |
/// | [`EvalError::TooFewSamplesForSplit`] | A present class has a single row |
pub fn train_test_split(labels: &[usize], test_fraction: f64, seed: u64) -> Result<Fold, EvalError> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(EvalError::InvalidTestFraction {
            fraction: test_fraction,
        });
    }
    if labels.is_empty() {
        return Err(EvalError::EmptyDataset);
    }

    let mut class_indices: Vec<Vec<usize>> = vec![vec![]; class_count(labels)];
    for (i, &label) in labels.iter().enumerate() {
        class_indices[label].push(i);
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();
    for (class, indices) in class_indices.iter_mut().enumerate() {
        if indices.is_empty() {
            continue;
        }
        if indices.len() < 2 {
            return Err(EvalError::TooFewSamplesForSplit {
                class,
                count: indices.len(),
            });
        }
        indices.shuffle(&mut rng);
        let n_test = ((indices.len() as f64 * test_fraction).round() as usize).clamp(1, indices.len() - 1);
        test.extend_from_slice(&indices[..n_test]);
        train.extend_from_slice(&indices[n_test..]);
    }
    train.sort_unstable();
    test.sort_unstable();
    Ok(Fold { train, test })
}
