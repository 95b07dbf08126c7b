//! Random Forest training with parallel tree construction.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use crate::config::{MaxFeatures, RandomForestConfig};
use crate::error::RfError;
use crate::importance::aggregate_importances;
use crate::result::{RandomForestResult, TrainingSummary};
use crate::tree::{DecisionTree, DecisionTreeConfig, resolve_n_classes, validate_inputs};

/// A fitted Random Forest ensemble.
#[derive(Debug, Clone)]
pub struct RandomForest {
    pub(crate) trees: Vec<DecisionTree>,
    pub(crate) n_features: usize,
    pub(crate) n_classes: usize,
    pub(crate) feature_names: Vec<String>,
}

/// Resolve `MaxFeatures` to a concrete count.
pub(crate) fn resolve_max_features(
    max_features: MaxFeatures,
    n_features: usize,
) -> Result<usize, RfError> {
    let resolved = match max_features {
        MaxFeatures::Sqrt => (n_features as f64).sqrt().ceil() as usize,
        MaxFeatures::Log2 => (n_features as f64).log2().ceil().max(1.0) as usize,
        MaxFeatures::Fraction(f) => (n_features as f64 * f).ceil() as usize,
        MaxFeatures::Fixed(n) => n,
        MaxFeatures::All => n_features,
    };
    if resolved == 0 || resolved > n_features {
        return Err(RfError::InvalidMaxFeatures {
            max_features: resolved,
            n_features,
        });
    }
    Ok(resolved)
}

/// Draw `n_samples` row indices with replacement.
fn bootstrap_indices(n_samples: usize, rng: &mut impl Rng) -> Vec<usize> {
    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
}

/// Train the Random Forest ensemble.
#[instrument(skip_all, fields(n_trees = config.n_trees, n_samples = features.len()))]
pub(crate) fn train(
    config: &RandomForestConfig,
    features: &[Vec<f64>],
    labels: &[usize],
    sample_weights: &[f64],
    feature_names: &[String],
) -> Result<RandomForestResult, RfError> {
    let n_features = validate_inputs(features, labels, sample_weights)?;
    let n_samples = features.len();
    let max_features_resolved = resolve_max_features(config.max_features, n_features)?;
    let n_classes = resolve_n_classes(labels, None)?;

    let tree_template = DecisionTreeConfig::new()
        .with_criterion(config.criterion)
        .with_max_depth(config.max_depth)
        .with_min_samples_split(config.min_samples_split)
        .with_min_samples_leaf(config.min_samples_leaf)
        .with_max_features(Some(max_features_resolved))
        .with_n_classes(Some(n_classes));

    tree_template.validate()?;

    debug!(
        n_samples,
        n_features,
        n_classes,
        max_features = max_features_resolved,
        "training random forest"
    );

    let mut master_rng = ChaCha8Rng::seed_from_u64(config.seed);
    let tree_seeds: Vec<u64> = (0..config.n_trees).map(|_| master_rng.r#gen()).collect();
    let bootstrap = config.bootstrap;

    let trees: Vec<DecisionTree> = tree_seeds
        .into_par_iter()
        .map(|seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let tree_config = tree_template.clone().with_seed(rng.r#gen());
            if !bootstrap {
                return tree_config.fit_weighted(features, labels, sample_weights);
            }
            let drawn = bootstrap_indices(n_samples, &mut rng);
            let boot_features: Vec<Vec<f64>> = drawn.iter().map(|&i| features[i].clone()).collect();
            let boot_labels: Vec<usize> = drawn.iter().map(|&i| labels[i]).collect();
            let boot_weights: Vec<f64> = drawn.iter().map(|&i| sample_weights[i]).collect();
            tree_config.fit_weighted(&boot_features, &boot_labels, &boot_weights)
        })
        .collect::<Result<_, _>>()?;

    let per_tree: Vec<Vec<f64>> = trees.iter().map(DecisionTree::feature_importances).collect();
    let importances = aggregate_importances(&per_tree, feature_names);

    let forest = RandomForest {
        trees,
        n_features,
        n_classes,
        feature_names: feature_names.to_vec(),
    };

    let mut class_weight_totals = vec![0.0; n_classes];
    for (&label, &w) in labels.iter().zip(sample_weights) {
        class_weight_totals[label] += w;
    }
    let mean_depth = forest.trees.iter().map(|t| t.depth() as f64).sum::<f64>() / forest.trees.len() as f64;
    let summary = TrainingSummary {
        n_samples,
        class_weight_totals,
        max_features_resolved,
        mean_depth,
    };

    info!(n_trees = config.n_trees, n_samples, mean_depth, "random forest trained");

    Ok(RandomForestResult::new(forest, importances, summary))
}

#[cfg(test)]
mod tests {
    use crate::config::{MaxFeatures, RandomForestConfig};

    /// Two well separated classes, the second four times smaller.
    fn make_imbalanced_data() -> (Vec<Vec<f64>>, Vec<usize>, Vec<String>) {
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for i in 0..40 {
            features.push(vec![i as f64 * 0.1, 0.5]);
            labels.push(0);
        }
        for i in 0..10 {
            features.push(vec![10.0 + i as f64 * 0.1, 0.5]);
            labels.push(1);
        }
        let names = vec!["x".to_string(), "y".to_string()];
        (features, labels, names)
    }

    #[test]
    fn separable_accuracy() {
        let (features, labels, names) = make_imbalanced_data();
        let result = RandomForestConfig::new(30)
            .unwrap()
            .with_max_features(MaxFeatures::All)
            .fit(&features, &labels, &names)
            .unwrap();
        let predictions = result.forest().predict_batch(&features).unwrap();
        let correct = predictions.iter().zip(&labels).filter(|&(p, l)| p == l).count();
        assert!(correct as f64 / labels.len() as f64 > 0.95);
    }

    #[test]
    fn feature_importances_sum_to_one() {
        let (features, labels, names) = make_imbalanced_data();
        let result = RandomForestConfig::new(20).unwrap().fit(&features, &labels, &names).unwrap();
        let total: f64 = result.importances().iter().map(|f| f.importance).sum();
        assert!((total - 1.0).abs() < 1e-10, "total = {total}");
        assert_eq!(result.importances()[0].rank, 1);
    }

    #[test]
    fn deterministic_with_same_seed() {
        let (features, labels, names) = make_imbalanced_data();
        let fit = || {
            RandomForestConfig::new(10)
                .unwrap()
                .with_seed(99)
                .fit(&features, &labels, &names)
                .unwrap()
                .forest()
                .predict_proba_batch(&features)
                .unwrap()
                .into_iter()
                .map(|d| d.as_slice().to_vec())
                .collect::<Vec<_>>()
        };
        assert_eq!(fit(), fit());
    }

    #[test]
    fn every_tree_reports_all_classes() {
        // Class 1 has a single row, so many bootstraps miss it entirely.
        let features: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64]).collect();
        let mut labels = vec![0; 20];
        labels[19] = 1;
        let names = vec!["x".to_string()];
        let result = RandomForestConfig::new(25).unwrap().fit(&features, &labels, &names).unwrap();
        for tree in &result.forest().trees {
            assert_eq!(tree.n_classes(), 2);
        }
    }

    #[test]
    fn invalid_depth_surfaces_before_training() {
        let (features, labels, names) = make_imbalanced_data();
        let err = RandomForestConfig::new(5)
            .unwrap()
            .with_max_depth(Some(0))
            .fit(&features, &labels, &names)
            .unwrap_err();
        assert!(matches!(err, crate::RfError::InvalidMaxDepth { .. }));
    }

    #[test]
    fn summary_reports_class_weight_totals() {
        let (features, labels, names) = make_imbalanced_data();
        // 40 rows of class 0, 10 of class 1: inverse-frequency weights.
        let weights: Vec<f64> = labels.iter().map(|&l| if l == 0 { 0.625 } else { 2.5 }).collect();
        let result = RandomForestConfig::new(5)
            .unwrap()
            .with_max_depth(Some(3))
            .fit_weighted(&features, &labels, &weights, &names)
            .unwrap();
        let summary = result.summary();
        assert_eq!(summary.n_samples, 50);
        assert_eq!(summary.class_weight_totals, vec![25.0, 25.0]);
        assert!(summary.mean_depth <= 3.0);
    }

    #[test]
    fn empty_dataset_error() {
        let err = RandomForestConfig::new(10).unwrap().fit(&[], &[], &[]).unwrap_err();
        assert!(matches!(err, crate::RfError::EmptyDataset));
    }
}
