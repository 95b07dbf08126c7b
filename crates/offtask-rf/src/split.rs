use rand::Rng;

use crate::node::{FeatureIndex, Impurity};

/// Criterion for measuring the quality of a split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitCriterion {
    /// Gini impurity: 1 - Σ(p_i²)
    Gini,
    /// Information entropy: -Σ(p_i · ln(p_i))
    Entropy,
}

impl SplitCriterion {
    /// Compute the impurity of a node from its weighted class totals.
    ///
    /// `class_weights[c]` is the summed sample weight of class `c` at the
    /// node and `total` their sum. Returns zero for an empty node.
    #[must_use]
    pub fn impurity(&self, class_weights: &[f64], total: f64) -> Impurity {
        if total <= 0.0 {
            return Impurity::new(0.0);
        }
        let value = match self {
            SplitCriterion::Gini => {
                let sum_sq: f64 = class_weights
                    .iter()
                    .map(|&w| {
                        let p = w / total;
                        p * p
                    })
                    .sum();
                1.0 - sum_sq
            }
            SplitCriterion::Entropy => -class_weights
                .iter()
                .filter(|&&w| w > 0.0)
                .map(|&w| {
                    let p = w / total;
                    p * p.ln()
                })
                .sum::<f64>(),
        };
        Impurity::new(value.max(0.0))
    }
}

/// Result of finding the best split for a node.
#[derive(Debug, Clone)]
pub(crate) struct SplitResult {
    pub(crate) feature: FeatureIndex,
    pub(crate) threshold: f64,
    /// Weighted impurity decrease (MDI numerator, in units of sample weight).
    pub(crate) impurity_decrease: f64,
    pub(crate) left_indices: Vec<usize>,
    pub(crate) right_indices: Vec<usize>,
}

/// Inputs shared by every split search within one tree.
pub(crate) struct SplitContext<'a> {
    /// Column-major features: `features[feature_idx][sample_idx]`.
    pub(crate) features: &'a [Vec<f64>],
    pub(crate) labels: &'a [usize],
    pub(crate) weights: &'a [f64],
    pub(crate) n_classes: usize,
    pub(crate) criterion: SplitCriterion,
    pub(crate) max_features: usize,
    pub(crate) min_samples_leaf: usize,
}

/// Find the best split among a random subset of features.
///
/// For each of `max_features` randomly chosen features, sorts the samples
/// by value, scans left-to-right with incremental weighted class totals,
/// and keeps the split with the largest weighted impurity decrease.
///
/// Returns `None` when no valid split exists (all values identical,
/// or every boundary would violate `min_samples_leaf`).
pub(crate) fn find_best_split(
    ctx: &SplitContext<'_>,
    sample_indices: &[usize],
    rng: &mut impl Rng,
) -> Option<SplitResult> {
    let n_features = ctx.features.len();
    let n_samples = sample_indices.len();

    if n_samples < 2 || n_features == 0 {
        return None;
    }

    let mut parent = vec![0.0f64; ctx.n_classes];
    for &si in sample_indices {
        parent[ctx.labels[si]] += ctx.weights[si];
    }
    let parent_total: f64 = parent.iter().sum();
    let parent_impurity = ctx.criterion.impurity(&parent, parent_total);

    // Partial Fisher-Yates: shuffle only the first `max_features` positions.
    let mut feature_order: Vec<usize> = (0..n_features).collect();
    let take = ctx.max_features.min(n_features);
    for i in 0..take {
        let j = rng.gen_range(i..n_features);
        feature_order.swap(i, j);
    }

    let mut best_decrease = f64::NEG_INFINITY;
    let mut best: Option<(FeatureIndex, f64)> = None;

    for &feat_idx in &feature_order[..take] {
        let column = &ctx.features[feat_idx];

        let mut sorted: Vec<(f64, usize)> =
            sample_indices.iter().map(|&si| (column[si], si)).collect();
        sorted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

        let mut left = vec![0.0f64; ctx.n_classes];
        let mut right = parent.clone();
        let mut left_total = 0.0f64;

        for i in 0..(n_samples - 1) {
            let (value, si) = sorted[i];
            let class = ctx.labels[si];
            let w = ctx.weights[si];
            left[class] += w;
            right[class] -= w;
            left_total += w;

            let next_value = sorted[i + 1].0;
            if value == next_value {
                continue;
            }

            let n_left = i + 1;
            let n_right = n_samples - n_left;
            if n_left < ctx.min_samples_leaf || n_right < ctx.min_samples_leaf {
                continue;
            }

            let right_total = parent_total - left_total;
            let left_impurity = ctx.criterion.impurity(&left, left_total);
            let right_impurity = ctx.criterion.impurity(&right, right_total);

            let decrease = parent_total * parent_impurity.value()
                - left_total * left_impurity.value()
                - right_total * right_impurity.value();

            if decrease > best_decrease {
                // The midpoint of adjacent floats can round up to `next_value`.
                let mut threshold = (value + next_value) / 2.0;
                if threshold >= next_value {
                    threshold = value;
                }
                best_decrease = decrease;
                best = Some((FeatureIndex::new(feat_idx), threshold));
            }
        }
    }

    let (feature, threshold) = best?;

    let column = &ctx.features[feature.index()];
    let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = sample_indices
        .iter()
        .copied()
        .partition(|&si| column[si] <= threshold);
    if left_indices.is_empty() || right_indices.is_empty() {
        return None;
    }

    Some(SplitResult {
        feature,
        threshold,
        impurity_decrease: best_decrease.max(0.0),
        left_indices,
        right_indices,
    })
}
