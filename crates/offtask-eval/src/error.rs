//! Error types for offtask-eval.

use offtask_linear::LinearError;
use offtask_rf::RfError;
use offtask_svm::SvmError;

/// Errors from resampling, fold construction, search and metrics.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    /// Returned when a fold count is below 2.
    #[error("fold count must be at least 2, got {n_folds}")]
    InvalidFoldCount {
        /// The rejected value.
        n_folds: usize,
    },

    /// Returned when the SMOTE neighbour count is zero.
    #[error("k_neighbors must be at least 1")]
    InvalidNeighborCount,

    /// Returned when the train/test split fraction is outside (0, 1).
    #[error("test fraction must lie strictly between 0 and 1, got {fraction}")]
    InvalidTestFraction {
        /// The rejected value.
        fraction: f64,
    },

    /// Returned when there are no samples to work with.
    #[error("dataset has zero samples")]
    EmptyDataset,

    /// Returned when a hyperparameter grid has no candidates.
    #[error("hyperparameter grid has no candidates")]
    EmptyGrid,

    /// Returned when grid candidates belong to different model families.
    #[error("grid candidate {index} belongs to a different model family than candidate 0")]
    MixedGrid {
        /// Position of the first mismatched candidate.
        index: usize,
    },

    /// Returned when parallel inputs have different lengths.
    #[error("{what} has {got} entries, expected {expected}")]
    LengthMismatch {
        /// Which input is misaligned.
        what: &'static str,
        /// The expected length.
        expected: usize,
        /// The length provided.
        got: usize,
    },

    /// Returned when a label is not below the class count.
    #[error("label {label} at index {index} is out of range for {n_classes} classes")]
    LabelOutOfRange {
        /// Position of the label.
        index: usize,
        /// The label found.
        label: usize,
        /// The number of classes.
        n_classes: usize,
    },

    /// Returned when fewer distinct groups exist than requested folds.
    #[error("{n_groups} groups cannot fill {n_folds} folds")]
    TooFewGroups {
        /// Distinct groups present.
        n_groups: usize,
        /// Folds requested.
        n_folds: usize,
    },

    /// Returned when a class has fewer samples than folds.
    #[error("class {class} has {count} samples, need at least {n_folds} for stratified folds")]
    TooFewSamplesForFolds {
        /// The class index.
        class: usize,
        /// Number of samples of this class.
        count: usize,
        /// Number of folds requested.
        n_folds: usize,
    },

    /// Returned when a class is too small to split into train and test.
    #[error("class {class} has {count} samples, need at least 2 for a stratified split")]
    TooFewSamplesForSplit {
        /// The class index.
        class: usize,
        /// Number of samples of this class.
        count: usize,
    },

    /// Returned when a class that needs synthetic rows has too few
    /// neighbours to interpolate between.
    #[error("class {class} has {count} samples, SMOTE needs at least {required} (k_neighbors + 1)")]
    TooFewMinoritySamples {
        /// The class index.
        class: usize,
        /// Number of samples of this class.
        count: usize,
        /// The minimum required.
        required: usize,
    },

    /// Returned when a fold ends up with no held-out rows.
    #[error("fold {fold} has no held-out rows")]
    EmptyFold {
        /// The fold index.
        fold: usize,
    },

    /// Returned when a binary metric receives a single class.
    #[error("ROC analysis needs both classes among the true labels")]
    SingleClass,

    /// Random forest failure.
    #[error(transparent)]
    Forest(#[from] RfError),

    /// Logistic regression failure.
    #[error(transparent)]
    Linear(#[from] LinearError),

    /// Support vector failure.
    #[error(transparent)]
    Svm(#[from] SvmError),
}
