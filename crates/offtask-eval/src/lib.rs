//! Model evaluation for off-task prediction.
//!
//! Provides oversampling (SMOTE), stratified and group-stratified folds,
//! grid search over classifier families, nested cross-validation scored
//! with Cohen's Kappa, classification reports, and the ROC and
//! confusion-matrix data behind the plots.

mod error;
mod folds;
mod grid;
mod metrics;
mod model;
mod nested;
mod roc;
mod scale;
mod search;
mod smote;
mod visualize;

pub use error::EvalError;
pub use folds::{Fold, StratifiedGroupKFold, StratifiedKFold, train_test_split};
pub use grid::{ParamGrid, RF_MAX_DEPTHS, RF_TREE_COUNTS};
pub use metrics::{AverageMetrics, ClassMetrics, ClassificationReport, ConfusionMatrix, cohen_kappa};
pub use model::{FittedModel, ModelConfig, ModelKind, balanced_sample_weights};
pub use nested::{EvaluationResult, FoldResult, NestedCrossValidation};
pub use roc::{RocCurve, roc_curve};
pub use scale::StandardScaler;
pub use search::{CandidateScore, GridSearch, Scoring, SearchResult};
pub use smote::{Resampled, Smote};
pub use visualize::{HoldoutConfusion, ModelRoc, full_data_roc, holdout_confusion};
