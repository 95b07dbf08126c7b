//! End-to-end nested cross-validation on a generated classroom log:
//! CSV -> feature set -> group-disjoint outer folds -> pooled Kappa.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::fs;

use offtask_eval::{
    ModelConfig, ModelKind, NestedCrossValidation, ParamGrid, Scoring, full_data_roc, holdout_confusion,
};
use offtask_io::{FeatureSet, FeatureSpec, TableReader};
use offtask_rf::RandomForestConfig;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tempfile::TempDir;

const N_ROWS: usize = 763;
const N_STUDENTS: usize = 60;

/// Write a CSV shaped like the classroom dataset and load it back.
fn classroom() -> FeatureSet {
    let mut rng = ChaCha8Rng::seed_from_u64(2024);
    let mut csv = String::from("Unique-id,namea,OffTask,Avg-Pressure,Avg-RightToLeft,Count-Help,Sum-Zero\n");
    for row in 0..N_ROWS {
        let student = row % N_STUDENTS;
        let propensity = 0.05 + 0.3 * (student % 4) as f64 / 3.0;
        let off_task = rng.r#gen::<f64>() < propensity;
        let pressure = (if off_task { 1.5 } else { 0.0 }) + rng.gen_range(-1.0..1.0);
        let right_to_left: f64 = rng.gen_range(0.0..1.0);
        let help: u32 = rng.gen_range(0..4);
        writeln!(
            csv,
            "{},s{student:02},{},{pressure:.4},{right_to_left:.4},{help},0",
            row + 1,
            if off_task { "Y" } else { "N" }
        )
        .unwrap();
    }

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("classroom.csv");
    fs::write(&path, csv).unwrap();
    let table = TableReader::new(&path).read().unwrap();
    FeatureSpec::default().split(&table).unwrap()
}

fn small_forest_grid() -> ParamGrid {
    ParamGrid::from_candidates(vec![
        ModelConfig::RandomForest(RandomForestConfig::new(10).unwrap()),
        ModelConfig::RandomForest(RandomForestConfig::new(10).unwrap().with_max_depth(Some(4))),
    ])
    .unwrap()
}

#[test]
fn outer_folds_never_split_a_student() {
    let data = classroom();
    assert_eq!(data.n_samples(), N_ROWS);
    assert_eq!(data.dropped_columns(), &["Sum-Zero".to_string()]);

    let result = NestedCrossValidation::new(5)
        .unwrap()
        .evaluate(&small_forest_grid(), &data)
        .unwrap();

    assert_eq!(result.folds.len(), 5);
    assert_eq!(result.predictions.len(), N_ROWS);
    let pooled: usize = result.folds.iter().map(|f| f.predictions.len()).sum();
    assert_eq!(pooled, N_ROWS);

    for fold in &result.folds {
        let held_out: BTreeSet<&str> = fold.test_indices.iter().map(|&i| data.groups()[i].as_str()).collect();
        let trained: BTreeSet<&str> = (0..N_ROWS)
            .filter(|i| fold.test_indices.binary_search(i).is_err())
            .map(|i| data.groups()[i].as_str())
            .collect();
        assert!(held_out.is_disjoint(&trained), "fold {} shares a student", fold.fold);
        assert!(fold.n_train_resampled > fold.n_train);
        assert!((-1.0..=1.0).contains(&fold.kappa));
    }

    assert!((-1.0..=1.0).contains(&result.pooled_kappa));
    assert!(result.pooled_kappa > 0.0, "pressure carries signal, kappa = {}", result.pooled_kappa);
    assert_eq!(result.report.classes().len(), 2);
    assert_eq!(result.feature_importances[0].name, "Avg-Pressure");
}

#[test]
fn same_seed_same_predictions() {
    let data = classroom();
    let run = || {
        NestedCrossValidation::new(3)
            .unwrap()
            .with_seed(9)
            .evaluate(&small_forest_grid(), &data)
            .unwrap()
    };
    let (a, b) = (run(), run());
    assert_eq!(a.predictions, b.predictions);
    assert_eq!(a.pooled_kappa, b.pooled_kappa);
}

#[test]
fn linear_models_under_kappa_scoring() {
    let data = classroom();
    let cv = NestedCrossValidation::new(5).unwrap().with_scoring(Scoring::Kappa);
    for kind in [ModelKind::LogisticRegression, ModelKind::Svm] {
        let grid = ParamGrid::for_kind(kind, 42).unwrap();
        let result = cv.evaluate(&grid, &data).unwrap();
        assert_eq!(result.scoring, Scoring::Kappa);
        assert!(result.feature_importances.is_empty());
        assert!(result.folds.iter().all(|f| (-1.0..=1.0).contains(&f.inner_score)));
    }
}

#[test]
fn plot_data_for_the_classroom() {
    let data = classroom();
    let curves = full_data_roc(&data, &ModelKind::ALL, 42).unwrap();
    assert_eq!(curves.len(), 3);
    for roc in &curves {
        assert!(roc.curve.auc > 0.5, "{}: auc = {}", roc.kind, roc.curve.auc);
        assert_eq!(roc.curve.fpr.len(), roc.curve.tpr.len());
    }

    let holdout = holdout_confusion(&data, ModelKind::RandomForest, 0.25, None, 42).unwrap();
    assert_eq!(holdout.n_train + holdout.n_test, N_ROWS);
}
