//! Synthetic minority oversampling (SMOTE).

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::error::EvalError;

/// SMOTE configuration.
///
/// Every class with fewer rows than the largest class is topped up to the
/// largest count. A synthetic row is `x + u · (x_nn - x)` where `x` is a
/// uniformly drawn row of the class, `x_nn` one of its `k_neighbors` nearest
/// same-class rows (Euclidean), and `u ~ U[0, 1)`.
///
/// # Defaults
///
/// | Parameter     | Default |
/// |---------------|---------|
/// | `k_neighbors` | 5       |
/// | `seed`        | 42      |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Smote {
    k_neighbors: usize,
    seed: u64,
}

/// Oversampled training data. Rows `0..n_original` are the input rows,
/// unchanged and in order; synthetic rows follow.
#[derive(Debug, Clone)]
pub struct Resampled {
    /// Original rows followed by synthetic rows.
    pub features: Vec<Vec<f64>>,
    /// Labels aligned with `features`.
    pub labels: Vec<usize>,
    /// Number of original rows at the front.
    pub n_original: usize,
}

impl Resampled {
    /// Number of synthetic rows appended.
    #[must_use]
    pub fn n_synthetic(&self) -> usize {
        self.features.len() - self.n_original
    }
}

impl Smote {
    /// Create a SMOTE resampler.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::InvalidNeighborCount`] if `k_neighbors` is zero.
    pub fn new(k_neighbors: usize) -> Result<Self, EvalError> {
        if k_neighbors == 0 {
            return Err(EvalError::InvalidNeighborCount);
        }
        Ok(Self { k_neighbors, seed: 42 })
    }

    /// Set the random seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Return the neighbour count.
    #[must_use]
    pub fn k_neighbors(&self) -> usize {
        self.k_neighbors
    }

    /// Oversample every minority class up to the majority count.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`EvalError::EmptyDataset`] | Zero rows |
    /// | [`EvalError::LengthMismatch`] | Labels misaligned with rows |
    /// | [`EvalError::TooFewMinoritySamples`] | A class needing synthetic rows has `<= k_neighbors` rows |
    #[instrument(skip_all, fields(n_samples = features.len(), k = self.k_neighbors))]
    pub fn resample(&self, features: &[Vec<f64>], labels: &[usize]) -> Result<Resampled, EvalError> {
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

        let n_classes = labels.iter().max().map_or(0, |&m| m + 1);
        let mut by_class: Vec<Vec<usize>> = vec![Vec::new(); n_classes];
        for (i, &l) in labels.iter().enumerate() {
            by_class[l].push(i);
        }
        let majority = by_class.iter().map(Vec::len).max().unwrap_or(0);

        let mut out_features = features.to_vec();
        let mut out_labels = labels.to_vec();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);

        for (class, members) in by_class.iter().enumerate() {
            // Absent classes stay absent.
            if members.is_empty() || members.len() == majority {
                continue;
            }
            if members.len() <= self.k_neighbors {
                return Err(EvalError::TooFewMinoritySamples {
                    class,
                    count: members.len(),
                    required: self.k_neighbors + 1,
                });
            }
            let neighbors = nearest_neighbors(features, members, self.k_neighbors);
            let n_new = majority - members.len();
            for _ in 0..n_new {
                let r = rng.gen_range(0..members.len());
                let nn = neighbors[r][rng.gen_range(0..self.k_neighbors)];
                let gap: f64 = rng.r#gen();
                let base = &features[members[r]];
                let other = &features[nn];
                out_features.push(base.iter().zip(other).map(|(a, b)| a + gap * (b - a)).collect());
                out_labels.push(class);
            }
            debug!(class, n_new, "synthetic rows generated");
        }

        Ok(Resampled {
            features: out_features,
            labels: out_labels,
            n_original: features.len(),
        })
    }
}

impl Default for Smote {
    fn default() -> Self {
        Self { k_neighbors: 5, seed: 42 }
    }
}

/// For each member, the row indices of its `k` nearest other members.
/// Ties in distance resolve to the lower row index.
fn nearest_neighbors(features: &[Vec<f64>], members: &[usize], k: usize) -> Vec<Vec<usize>> {
    members
        .par_iter()
        .map(|&i| {
            let mut dists: Vec<(f64, usize)> = members
                .iter()
                .filter(|&&j| j != i)
                .map(|&j| {
                    let d: f64 = features[i].iter().zip(&features[j]).map(|(a, b)| (a - b) * (a - b)).sum();
                    (d, j)
                })
                .collect();
            dists.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
            dists.into_iter().take(k).map(|(_, j)| j).collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn imbalanced() -> (Vec<Vec<f64>>, Vec<usize>) {
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for i in 0..20 {
            features.push(vec![i as f64, 0.0]);
            labels.push(0);
        }
        for i in 0..7 {
            features.push(vec![100.0 + i as f64, 10.0 + i as f64]);
            labels.push(1);
        }
        (features, labels)
    }

    #[test]
    fn balances_classes() {
        let (features, labels) = imbalanced();
        let out = Smote::default().resample(&features, &labels).unwrap();
        assert_eq!(out.features.len(), 40);
        assert_eq!(out.labels.iter().filter(|&&l| l == 1).count(), 20);
        assert_eq!(out.n_synthetic(), 13);
    }

    #[test]
    fn originals_come_first_unchanged() {
        let (features, labels) = imbalanced();
        let out = Smote::default().resample(&features, &labels).unwrap();
        assert_eq!(out.n_original, features.len());
        assert_eq!(&out.features[..features.len()], &features[..]);
        assert_eq!(&out.labels[..labels.len()], &labels[..]);
    }

    #[test]
    fn synthetic_rows_lie_within_class_hull() {
        let (features, labels) = imbalanced();
        let out = Smote::default().resample(&features, &labels).unwrap();
        for row in &out.features[out.n_original..] {
            assert!((100.0..=106.0).contains(&row[0]), "row {row:?}");
            assert!((10.0..=16.0).contains(&row[1]), "row {row:?}");
        }
        assert!(out.labels[out.n_original..].iter().all(|&l| l == 1));
    }

    #[test]
    fn deterministic_for_seed() {
        let (features, labels) = imbalanced();
        let a = Smote::default().with_seed(3).resample(&features, &labels).unwrap();
        let b = Smote::default().with_seed(3).resample(&features, &labels).unwrap();
        assert_eq!(a.features, b.features);
    }

    #[test]
    fn balanced_input_is_untouched() {
        let features = vec![vec![0.0], vec![1.0]];
        let out = Smote::new(1).unwrap().resample(&features, &[0, 1]).unwrap();
        assert_eq!(out.n_synthetic(), 0);
    }

    #[test]
    fn too_few_minority_samples() {
        let (mut features, mut labels) = imbalanced();
        features.truncate(25);
        labels.truncate(25);
        // class 1 now has 5 rows, k = 5 needs 6
        let err = Smote::default().resample(&features, &labels).unwrap_err();
        assert!(matches!(err, EvalError::TooFewMinoritySamples { class: 1, count: 5, required: 6 }));
    }

    #[test]
    fn zero_neighbors_rejected() {
        assert!(matches!(Smote::new(0), Err(EvalError::InvalidNeighborCount)));
    }

    #[test]
    fn neighbors_exclude_self() {
        let features = vec![vec![0.0], vec![1.0], vec![3.0], vec![10.0]];
        let nn = nearest_neighbors(&features, &[0, 1, 2, 3], 2);
        assert_eq!(nn[0], vec![1, 2]);
        assert_eq!(nn[3], vec![2, 1]);
    }
}
