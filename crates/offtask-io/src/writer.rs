//! JSON result writer for exploration, evaluation and plot artifacts.
//!
//! The writer does not depend on the model crates. Callers fill the
//! borrowed record structs below from their own result types.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::describe::{ColumnSummary, CorrelationMatrix, KindCounts};
use crate::domain::ExperimentName;

/// Exploration output for `{experiment}_explore.json`.
#[derive(Debug, Serialize)]
pub struct ExploreRecord<'a> {
    /// Rows in the table.
    pub n_rows: usize,
    /// Columns in the table.
    pub n_columns: usize,
    /// Cells that were empty. The reader rejects missing values, so a
    /// written record always carries 0.
    pub missing_values: usize,
    /// Column kinds.
    pub kinds: KindCounts,
    /// Label value counts (bar chart data).
    pub class_distribution: &'a [(String, usize)],
    /// Per-column statistics.
    pub summaries: &'a [ColumnSummary],
    /// Correlation heatmap data.
    pub correlation: &'a CorrelationMatrix,
}

/// One outer fold of a nested cross-validation run.
#[derive(Debug, Serialize)]
pub struct FoldRecord<'a> {
    /// Zero-based fold index.
    pub fold: usize,
    /// Hyperparameters chosen by the inner search.
    pub params: &'a BTreeMap<String, String>,
    /// Mean inner-CV score of the chosen hyperparameters.
    pub inner_score: f64,
    /// Cohen's kappa on the held-out rows.
    pub kappa: f64,
    /// Training rows before oversampling.
    pub n_train: usize,
    /// Training rows after oversampling.
    pub n_train_resampled: usize,
    /// Held-out rows.
    pub n_test: usize,
}

/// Precision, recall, F1 and support of one class or one average.
#[derive(Debug, Serialize)]
pub struct ClassRecord<'a> {
    /// Class name, or `macro avg` / `weighted avg`.
    pub label: &'a str,
    /// Precision.
    pub precision: f64,
    /// Recall.
    pub recall: f64,
    /// F1 score.
    pub f1: f64,
    /// Number of true rows of the class (all rows for averages).
    pub support: usize,
}

/// A ranked feature importance.
#[derive(Debug, Serialize)]
pub struct FeatureRecord<'a> {
    /// Feature name.
    pub name: &'a str,
    /// Mean decrease in impurity, averaged over folds.
    pub importance: f64,
    /// 1-based rank.
    pub rank: usize,
}

/// Evaluation output for `{experiment}_{model}_evaluate.json`.
#[derive(Debug, Serialize)]
pub struct EvaluationRecord<'a> {
    /// Short model name.
    pub model: &'a str,
    /// Inner-CV selection metric.
    pub inner_scoring: &'a str,
    /// Rows evaluated.
    pub n_samples: usize,
    /// Per-fold details.
    pub folds: Vec<FoldRecord<'a>>,
    /// Kappa of the pooled out-of-fold predictions.
    pub pooled_kappa: f64,
    /// Mean of the per-fold kappas.
    pub mean_kappa: f64,
    /// Population standard deviation of the per-fold kappas.
    pub std_kappa: f64,
    /// Pooled accuracy.
    pub accuracy: f64,
    /// Pooled confusion matrix, `[actual][predicted]`.
    pub confusion_matrix: &'a [Vec<usize>],
    /// Per-class metrics followed by macro and weighted averages.
    pub report: Vec<ClassRecord<'a>>,
    /// Fold-averaged importances (random forest only, empty otherwise).
    pub feature_importances: Vec<FeatureRecord<'a>>,
}

/// One ROC curve for `{experiment}_roc.json`.
#[derive(Debug, Serialize)]
pub struct RocRecord<'a> {
    /// Short model name.
    pub model: &'a str,
    /// False positive rates.
    pub fpr: &'a [f64],
    /// True positive rates.
    pub tpr: &'a [f64],
    /// Score thresholds; the leading `+inf` serializes as `null`.
    pub thresholds: &'a [f64],
    /// Area under the curve.
    pub auc: f64,
}

/// Train/test confusion output for `{experiment}_confusion.json`.
#[derive(Debug, Serialize)]
pub struct ConfusionRecord<'a> {
    /// Short model name.
    pub model: &'a str,
    /// Class names in matrix order.
    pub class_names: &'a [String],
    /// Fraction of rows held out.
    pub test_fraction: f64,
    /// Training rows before oversampling.
    pub n_train: usize,
    /// Held-out rows.
    pub n_test: usize,
    /// `[actual][predicted]` counts on the held-out rows.
    pub matrix: &'a [Vec<usize>],
    /// Held-out accuracy.
    pub accuracy: f64,
    /// Held-out Cohen's kappa.
    pub kappa: f64,
}

/// Writes pipeline results to JSON files.
///
/// Creates the output directory on construction if it does not exist.
/// Output files are named `{experiment}_{artifact}.json`.
pub struct ResultWriter {
    output_dir: PathBuf,
    experiment: ExperimentName,
}

impl ResultWriter {
    /// Create a new writer targeting the given directory and experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), experiment = %experiment))]
    pub fn new(output_dir: &Path, experiment: ExperimentName) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            experiment,
        })
    }

    /// Write exploration results to `{experiment}_explore.json`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Serialize`] or [`IoError::WriteFile`].
    #[instrument(skip_all)]
    pub fn write_explore(&self, record: &ExploreRecord<'_>) -> Result<PathBuf, IoError> {
        self.write_artifact("explore", record)
    }

    /// Write one model's evaluation to `{experiment}_{model}_evaluate.json`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Serialize`] or [`IoError::WriteFile`].
    #[instrument(skip_all, fields(model = record.model))]
    pub fn write_evaluation(&self, record: &EvaluationRecord<'_>) -> Result<PathBuf, IoError> {
        self.write_artifact(&format!("{}_evaluate", record.model), record)
    }

    /// Write ROC curves to `{experiment}_roc.json`.
    ///
    /// The curves come from models scored on their own training rows, so
    /// the artifact is flagged `optimistic`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Serialize`] or [`IoError::WriteFile`].
    #[instrument(skip_all, fields(n_curves = curves.len()))]
    pub fn write_roc(&self, curves: &[RocRecord<'_>]) -> Result<PathBuf, IoError> {
        self.write_artifact(
            "roc",
            &RocArtifact {
                optimistic: true,
                curves,
            },
        )
    }

    /// Write a train/test confusion matrix to `{experiment}_confusion.json`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Serialize`] or [`IoError::WriteFile`].
    #[instrument(skip_all, fields(model = record.model))]
    pub fn write_confusion(&self, record: &ConfusionRecord<'_>) -> Result<PathBuf, IoError> {
        self.write_artifact("confusion", record)
    }

    fn write_artifact<T: Serialize>(&self, suffix: &str, body: &T) -> Result<PathBuf, IoError> {
        let path = self
            .output_dir
            .join(format!("{}_{suffix}.json", self.experiment.as_str()));
        let artifact = Artifact {
            experiment: self.experiment.as_str(),
            body,
        };
        let json = serde_json::to_string_pretty(&artifact).map_err(|e| IoError::Serialize {
            path: path.clone(),
            source: e,
        })?;
        fs::write(&path, &json).map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;
        info!(path = %path.display(), "{suffix} artifact written");
        Ok(path)
    }
}

// --- Envelope structs for JSON serialization ---

#[derive(Serialize)]
struct Artifact<'a, T: Serialize> {
    experiment: &'a str,
    #[serde(flatten)]
    body: &'a T,
}

#[derive(Serialize)]
struct RocArtifact<'a> {
    optimistic: bool,
    curves: &'a [RocRecord<'a>],
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn read_json(path: &Path) -> serde_json::Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn write_roc_json_structure() {
        let dir = TempDir::new().unwrap();
        let writer = ResultWriter::new(dir.path(), ExperimentName::new("roc_test".into()).unwrap()).unwrap();
        let curve = RocRecord {
            model: "rf",
            fpr: &[0.0, 0.0, 1.0],
            tpr: &[0.0, 1.0, 1.0],
            thresholds: &[f64::INFINITY, 0.8, 0.1],
            auc: 1.0,
        };
        let path = writer.write_roc(&[curve]).unwrap();
        assert_eq!(path, dir.path().join("roc_test_roc.json"));

        let content = read_json(&path);
        assert_eq!(content["experiment"], "roc_test");
        assert_eq!(content["optimistic"], true);
        let curves = content["curves"].as_array().unwrap();
        assert_eq!(curves.len(), 1);
        assert_eq!(curves[0]["model"], "rf");
        assert!(curves[0]["thresholds"][0].is_null());
        assert_eq!(curves[0]["auc"], 1.0);
    }

    #[test]
    fn write_evaluation_names_file_by_model() {
        let dir = TempDir::new().unwrap();
        let writer = ResultWriter::new(dir.path(), ExperimentName::new("ev".into()).unwrap()).unwrap();
        let params: BTreeMap<String, String> = [("n_trees".to_string(), "100".to_string())].into();
        let confusion = vec![vec![5, 1], vec![2, 3]];
        let record = EvaluationRecord {
            model: "rf",
            inner_scoring: "accuracy",
            n_samples: 11,
            folds: vec![FoldRecord {
                fold: 0,
                params: &params,
                inner_score: 0.8,
                kappa: 0.4,
                n_train: 8,
                n_train_resampled: 10,
                n_test: 11,
            }],
            pooled_kappa: 0.4,
            mean_kappa: 0.4,
            std_kappa: 0.0,
            accuracy: 8.0 / 11.0,
            confusion_matrix: &confusion,
            report: vec![ClassRecord {
                label: "N",
                precision: 5.0 / 7.0,
                recall: 5.0 / 6.0,
                f1: 0.77,
                support: 6,
            }],
            feature_importances: vec![FeatureRecord {
                name: "Avg-A",
                importance: 1.0,
                rank: 1,
            }],
        };
        let path = writer.write_evaluation(&record).unwrap();
        assert_eq!(path, dir.path().join("ev_rf_evaluate.json"));

        let content = read_json(&path);
        assert_eq!(content["experiment"], "ev");
        assert_eq!(content["folds"][0]["params"]["n_trees"], "100");
        assert_eq!(content["confusion_matrix"][1][0], 2);
        assert_eq!(content["report"][0]["label"], "N");
    }

    #[test]
    fn creates_nested_output_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("nested").join("deep");
        let writer = ResultWriter::new(&nested, ExperimentName::new("cm".into()).unwrap()).unwrap();
        let names = vec!["N".to_string(), "Y".to_string()];
        let matrix = vec![vec![3, 0], vec![1, 1]];
        writer
            .write_confusion(&ConfusionRecord {
                model: "lr",
                class_names: &names,
                test_fraction: 0.25,
                n_train: 15,
                n_test: 5,
                matrix: &matrix,
                accuracy: 0.8,
                kappa: 0.54,
            })
            .unwrap();
        assert!(nested.join("cm_confusion.json").exists());
    }
}
