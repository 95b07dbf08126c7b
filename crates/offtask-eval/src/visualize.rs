//! Data behind the ROC and confusion-matrix plots.

use offtask_io::FeatureSet;
use tracing::{info, instrument};

use crate::error::EvalError;
use crate::folds::train_test_split;
use crate::metrics::ConfusionMatrix;
use crate::model::ModelKind;
use crate::roc::{RocCurve, roc_curve};
use crate::smote::Smote;

/// ROC curve of one family.
#[derive(Debug, Clone)]
pub struct ModelRoc {
    /// The scored family.
    pub kind: ModelKind,
    /// Curve points and area.
    pub curve: RocCurve,
}

/// Fit each family with default hyperparameters on every row and build its
/// ROC curve from scores on those same rows.
///
/// The curves are optimistic: no row is held out. Oversampling is not
/// applied; balanced class weights are.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`EvalError::SingleClass`] | Labels contain one class |
/// | [`EvalError::LabelOutOfRange`] | Labels are not binary |
/// | model errors | Propagated from fitting or scoring |
#[instrument(skip_all, fields(n_models = kinds.len(), n_samples = data.n_samples()))]
pub fn full_data_roc(data: &FeatureSet, kinds: &[ModelKind], seed: u64) -> Result<Vec<ModelRoc>, EvalError> {
    kinds
        .iter()
        .map(|&kind| {
            let model = kind
                .default_config(seed)?
                .fit(data.features(), data.labels(), data.feature_names())?;
            let scores = model.score_batch(data.features())?;
            let curve = roc_curve(data.labels(), &scores)?;
            info!(model = kind.short_name(), auc = curve.auc, "roc curve computed");
            Ok(ModelRoc { kind, curve })
        })
        .collect()
}

/// Held-out confusion matrix of one family.
#[derive(Debug, Clone)]
pub struct HoldoutConfusion {
    /// The evaluated family.
    pub kind: ModelKind,
    /// Fraction of rows held out.
    pub test_fraction: f64,
    /// Training rows before oversampling.
    pub n_train: usize,
    /// Held-out rows.
    pub n_test: usize,
    /// Counts on the held-out rows.
    pub confusion_matrix: ConfusionMatrix,
}

/// Stratified train/test split, default-hyperparameter fit on the
/// (optionally oversampled) training rows, confusion matrix on the rest.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`EvalError::InvalidTestFraction`] | Fraction outside (0, 1) |
/// | [`EvalError::TooFewSamplesForSplit`] | A class has a single row |
/// | [`EvalError::TooFewMinoritySamples`] | SMOTE cannot oversample the training rows |
/// | model errors | Propagated from fitting or prediction |
#[instrument(skip_all, fields(model = kind.short_name(), test_fraction))]
pub fn holdout_confusion(
    data: &FeatureSet,
    kind: ModelKind,
    test_fraction: f64,
    smote: Option<&Smote>,
    seed: u64,
) -> Result<HoldoutConfusion, EvalError> {
    let split = train_test_split(data.labels(), test_fraction, seed)?;
    let features = data.features();
    let labels = data.labels();

    let mut train_x: Vec<Vec<f64>> = split.train.iter().map(|&i| features[i].clone()).collect();
    let mut train_y: Vec<usize> = split.train.iter().map(|&i| labels[i]).collect();
    if let Some(smote) = smote {
        let resampled = smote.resample(&train_x, &train_y)?;
        train_x = resampled.features;
        train_y = resampled.labels;
    }
    let test_x: Vec<Vec<f64>> = split.test.iter().map(|&i| features[i].clone()).collect();
    let test_y: Vec<usize> = split.test.iter().map(|&i| labels[i]).collect();

    let model = kind.default_config(seed)?.fit(&train_x, &train_y, data.feature_names())?;
    let predicted = model.predict_batch(&test_x)?;
    let confusion_matrix = ConfusionMatrix::from_labels(&test_y, &predicted, data.class_names().len().max(2))?;

    info!(
        accuracy = confusion_matrix.accuracy(),
        kappa = confusion_matrix.kappa(),
        "holdout confusion computed"
    );

    Ok(HoldoutConfusion {
        kind,
        test_fraction,
        n_train: split.train.len(),
        n_test: split.test.len(),
        confusion_matrix,
    })
}
