use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, instrument};

use crate::{
    RfError,
    node::{Impurity, Node, NodeIndex},
    split::{SplitContext, SplitCriterion, find_best_split},
};

/// Configuration for a single CART decision tree.
///
/// Construct via [`DecisionTreeConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter           | Default               |
/// |---------------------|-----------------------|
/// | `criterion`         | `Gini`                |
/// | `max_depth`         | `None` (unlimited)    |
/// | `min_samples_split` | 2                     |
/// | `min_samples_leaf`  | 1                     |
/// | `max_features`      | `None` (all features) |
/// | `n_classes`         | `None` (max label + 1)|
/// | `seed`              | 42                    |
#[derive(Debug, Clone)]
pub struct DecisionTreeConfig {
    pub(crate) criterion: SplitCriterion,
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) max_features: Option<usize>,
    pub(crate) n_classes: Option<usize>,
    pub(crate) seed: u64,
}

impl DecisionTreeConfig {
    /// Create a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            criterion: SplitCriterion::Gini,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            n_classes: None,
            seed: 42,
        }
    }

    /// Set the split quality criterion.
    #[must_use]
    pub fn with_criterion(mut self, criterion: SplitCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Set the maximum tree depth (root is depth 0). `None` means unlimited.
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

    /// Set the maximum number of features to consider at each split.
    #[must_use]
    pub fn with_max_features(mut self, max_features: Option<usize>) -> Self {
        self.max_features = max_features;
        self
    }

    /// Fix the number of classes instead of inferring it from the labels.
    ///
    /// Forests set this so every tree emits distributions of equal length,
    /// even when a bootstrap sample misses a class.
    #[must_use]
    pub fn with_n_classes(mut self, n_classes: Option<usize>) -> Self {
        self.n_classes = n_classes;
        self
    }

    /// Set the random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Train a tree with every sample weighted 1.0.
    ///
    /// # Errors
    ///
    /// See [`DecisionTreeConfig::fit_weighted`].
    pub fn fit(&self, features: &[Vec<f64>], labels: &[usize]) -> Result<DecisionTree, RfError> {
        let weights = vec![1.0; features.len()];
        self.fit_weighted(features, labels, &weights)
    }

    /// Train a decision tree on a row-major dataset with per-sample weights.
    ///
    /// `features[sample_idx][feature_idx]`, `labels[sample_idx]` (zero-based
    /// classes), `sample_weights[sample_idx]` (non-negative).
    ///
    /// # Errors
    ///
    /// | Variant                             | When                                              |
    /// |-------------------------------------|---------------------------------------------------|
    /// | [`RfError::EmptyDataset`]           | `features` is empty                               |
    /// | [`RfError::ZeroFeatures`]           | rows have zero feature columns                    |
    /// | [`RfError::FeatureCountMismatch`]   | rows have inconsistent lengths                    |
    /// | [`RfError::LengthMismatch`]         | labels/weights not one per row                    |
    /// | [`RfError::NonFiniteValue`]         | any value is NaN or infinite                      |
    /// | [`RfError::InvalidSampleWeight`]    | a weight is negative or non-finite                |
    /// | [`RfError::LabelOutOfRange`]        | a label is `>= n_classes`                         |
    /// | [`RfError::InvalidMaxFeatures`]     | `max_features` resolves outside [1, n_features]   |
    /// | [`RfError::InvalidMaxDepth`]        | `max_depth` is `Some(0)`                          |
    /// | [`RfError::InvalidMinSamplesSplit`] | `min_samples_split` < 2                           |
    /// | [`RfError::InvalidMinSamplesLeaf`]  | `min_samples_leaf` < 1                            |
    #[instrument(skip_all, fields(n_samples = features.len()))]
    pub fn fit_weighted(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
        sample_weights: &[f64],
    ) -> Result<DecisionTree, RfError> {
        let n_features = validate_inputs(features, labels, sample_weights)?;
        self.validate()?;

        let max_features = self.max_features.unwrap_or(n_features);
        if max_features == 0 || max_features > n_features {
            return Err(RfError::InvalidMaxFeatures {
                max_features,
                n_features,
            });
        }

        let n_classes = resolve_n_classes(labels, self.n_classes)?;

        // Column-major copy for cache-friendly per-feature scans.
        let columns: Vec<Vec<f64>> = (0..n_features)
            .map(|f| features.iter().map(|row| row[f]).collect())
            .collect();

        let ctx = SplitContext {
            features: &columns,
            labels,
            weights: sample_weights,
            n_classes,
            criterion: self.criterion,
            max_features,
            min_samples_leaf: self.min_samples_leaf,
        };

        let sample_indices: Vec<usize> = (0..features.len()).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut arena: Vec<Node> = Vec::new();

        build_tree(&ctx, self, &sample_indices, 0, &mut rng, &mut arena);

        debug!(n_nodes = arena.len(), n_classes, "decision tree built");

        Ok(DecisionTree {
            nodes: arena,
            n_features,
            n_classes,
        })
    }

    pub(crate) fn validate(&self) -> Result<(), RfError> {
        if self.max_depth == Some(0) {
            return Err(RfError::InvalidMaxDepth { max_depth: 0 });
        }
        if self.min_samples_split < 2 {
            return Err(RfError::InvalidMinSamplesSplit {
                min_samples_split: self.min_samples_split,
            });
        }
        if self.min_samples_leaf < 1 {
            return Err(RfError::InvalidMinSamplesLeaf {
                min_samples_leaf: self.min_samples_leaf,
            });
        }
        Ok(())
    }
}

impl Default for DecisionTreeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Check shape, finiteness and weights; return the feature count.
pub(crate) fn validate_inputs(
    features: &[Vec<f64>],
    labels: &[usize],
    sample_weights: &[f64],
) -> Result<usize, RfError> {
    if features.is_empty() {
        return Err(RfError::EmptyDataset);
    }
    let n_samples = features.len();
    let n_features = features[0].len();
    if n_features == 0 {
        return Err(RfError::ZeroFeatures);
    }
    if labels.len() != n_samples {
        return Err(RfError::LengthMismatch {
            what: "labels",
            expected: n_samples,
            got: labels.len(),
        });
    }
    if sample_weights.len() != n_samples {
        return Err(RfError::LengthMismatch {
            what: "sample_weights",
            expected: n_samples,
            got: sample_weights.len(),
        });
    }
    for (sample_index, row) in features.iter().enumerate() {
        if row.len() != n_features {
            return Err(RfError::FeatureCountMismatch {
                expected: n_features,
                got: row.len(),
                sample_index,
            });
        }
        if let Some(feature_index) = row.iter().position(|v| !v.is_finite()) {
            return Err(RfError::NonFiniteValue {
                sample_index,
                feature_index,
            });
        }
    }
    if let Some((sample_index, &weight)) = sample_weights
        .iter()
        .enumerate()
        .find(|&(_, &w)| !w.is_finite() || w < 0.0)
    {
        return Err(RfError::InvalidSampleWeight {
            sample_index,
            weight,
        });
    }
    Ok(n_features)
}

/// Use the declared class count, or infer it as `max(label) + 1`.
pub(crate) fn resolve_n_classes(labels: &[usize], declared: Option<usize>) -> Result<usize, RfError> {
    let inferred = labels.iter().max().copied().unwrap_or(0) + 1;
    match declared {
        None => Ok(inferred),
        Some(n_classes) => {
            if let Some((sample_index, &label)) =
                labels.iter().enumerate().find(|&(_, &l)| l >= n_classes)
            {
                return Err(RfError::LabelOutOfRange {
                    sample_index,
                    label,
                    n_classes,
                });
            }
            Ok(n_classes)
        }
    }
}

/// Recursively build the arena-based decision tree.
///
/// Returns the [`NodeIndex`] of the node just created in `arena`.
fn build_tree(
    ctx: &SplitContext<'_>,
    config: &DecisionTreeConfig,
    sample_indices: &[usize],
    depth: usize,
    rng: &mut ChaCha8Rng,
    arena: &mut Vec<Node>,
) -> NodeIndex {
    let mut class_weights = vec![0.0f64; ctx.n_classes];
    for &si in sample_indices {
        class_weights[ctx.labels[si]] += ctx.weights[si];
    }
    let weight: f64 = class_weights.iter().sum();
    let impurity = ctx.criterion.impurity(&class_weights, weight);

    let depth_exceeded = config.max_depth.is_some_and(|max_d| depth >= max_d);
    let too_few = sample_indices.len() < config.min_samples_split;
    let pure = impurity.value() <= 0.0;

    let split = if too_few || pure || depth_exceeded {
        None
    } else {
        find_best_split(ctx, sample_indices, rng)
    };

    let Some(split) = split else {
        return push_leaf(arena, &class_weights, weight, impurity);
    };

    // Reserve the parent slot so children receive higher indices.
    let node_idx = arena.len();
    arena.push(Node::Leaf {
        prediction: 0,
        distribution: Vec::new(),
        impurity,
        weight,
    });

    let left = build_tree(ctx, config, &split.left_indices, depth + 1, rng, arena);
    let right = build_tree(ctx, config, &split.right_indices, depth + 1, rng, arena);

    arena[node_idx] = Node::Split {
        feature: split.feature,
        threshold: split.threshold,
        left,
        right,
        impurity,
        weight,
        impurity_decrease: split.impurity_decrease,
    };

    NodeIndex::new(node_idx)
}

fn push_leaf(arena: &mut Vec<Node>, class_weights: &[f64], weight: f64, impurity: Impurity) -> NodeIndex {
    let distribution: Vec<f64> = if weight > 0.0 {
        class_weights.iter().map(|&w| w / weight).collect()
    } else {
        vec![1.0 / class_weights.len() as f64; class_weights.len()]
    };
    let prediction = argmax(&distribution);
    let idx = arena.len();
    arena.push(Node::Leaf {
        prediction,
        distribution,
        impurity,
        weight,
    });
    NodeIndex::new(idx)
}

/// Index of the largest value; the first one wins ties.
pub(crate) fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

/// A fitted CART decision tree.
///
/// Stored as an arena-based `Vec<Node>`; the root is at index 0.
#[derive(Debug, Clone)]
pub struct DecisionTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) n_features: usize,
    pub(crate) n_classes: usize,
}

impl DecisionTree {
    /// Predict the class label for a single sample.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict(&self, sample: &[f64]) -> Result<usize, RfError> {
        match self.leaf(sample)? {
            Node::Leaf { prediction, .. } => Ok(*prediction),
            Node::Split { .. } => unreachable!("traverse always ends at a leaf"),
        }
    }

    /// Return the class probability distribution for a single sample.
    ///
    /// The returned `Vec` has length `n_classes`, summing to 1.0.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict_proba(&self, sample: &[f64]) -> Result<&[f64], RfError> {
        match self.leaf(sample)? {
            Node::Leaf { distribution, .. } => Ok(distribution),
            Node::Split { .. } => unreachable!("traverse always ends at a leaf"),
        }
    }

    /// Mean Decrease in Impurity (MDI) importances, normalized to sum to 1.0.
    ///
    /// All zeros when the tree is a single leaf.
    #[must_use]
    pub fn feature_importances(&self) -> Vec<f64> {
        let mut totals = vec![0.0f64; self.n_features];
        for node in &self.nodes {
            if let Node::Split {
                feature,
                impurity_decrease,
                ..
            } = node
            {
                totals[feature.index()] += impurity_decrease;
            }
        }
        let sum: f64 = totals.iter().sum();
        if sum > 0.0 {
            totals.iter_mut().for_each(|v| *v /= sum);
        }
        totals
    }

    /// Return the total number of nodes in the tree (both splits and leaves).
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of classes this tree predicts over.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Return the maximum depth of the tree (a lone root leaf has depth 0).
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut max_depth = 0usize;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((idx, d)) = stack.pop() {
            match &self.nodes[idx] {
                Node::Leaf { .. } => max_depth = max_depth.max(d),
                Node::Split { left, right, .. } => {
                    stack.push((left.index(), d + 1));
                    stack.push((right.index(), d + 1));
                }
            }
        }
        max_depth
    }

    fn leaf(&self, sample: &[f64]) -> Result<&Node, RfError> {
        if sample.len() != self.n_features {
            return Err(RfError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        let mut idx = 0usize;
        loop {
            match &self.nodes[idx] {
                leaf @ Node::Leaf { .. } => return Ok(leaf),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    idx = if sample[feature.index()] <= *threshold {
                        left.index()
                    } else {
                        right.index()
                    };
                }
            }
        }
    }
}
