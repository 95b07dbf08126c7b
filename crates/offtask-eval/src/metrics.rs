//! Confusion matrix, Cohen's kappa and the per-class classification report.

use std::fmt;

use crate::error::EvalError;

/// A confusion matrix for multi-class classification.
///
/// Entry `matrix[true_class][predicted_class]` counts how many samples
/// with true label `true_class` were predicted as `predicted_class`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfusionMatrix {
    matrix: Vec<Vec<usize>>,
    n_classes: usize,
}

/// Per-class precision, recall, and F1 score.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassMetrics {
    /// The class index.
    pub class: usize,
    /// Precision: TP / (TP + FP). 0.0 if no predictions for this class.
    pub precision: f64,
    /// Recall: TP / (TP + FN). 0.0 if no true samples for this class.
    pub recall: f64,
    /// F1: 2 * precision * recall / (precision + recall). 0.0 if both are zero.
    pub f1: f64,
    /// Number of true samples in this class.
    pub support: usize,
}

impl ConfusionMatrix {
    /// Build a confusion matrix from true and predicted labels.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`EvalError::EmptyDataset`] | Zero labels provided |
    /// | [`EvalError::LengthMismatch`] | Prediction count differs from label count |
    /// | [`EvalError::LabelOutOfRange`] | A label or prediction `>= n_classes` |
    pub fn from_labels(true_labels: &[usize], predicted: &[usize], n_classes: usize) -> Result<Self, EvalError> {
        if true_labels.is_empty() {
            return Err(EvalError::EmptyDataset);
        }
        if predicted.len() != true_labels.len() {
            return Err(EvalError::LengthMismatch {
                what: "predictions",
                expected: true_labels.len(),
                got: predicted.len(),
            });
        }
        let mut matrix = vec![vec![0usize; n_classes]; n_classes];
        for (index, (&t, &p)) in true_labels.iter().zip(predicted).enumerate() {
            if let Some(&label) = [t, p].iter().find(|&&l| l >= n_classes) {
                return Err(EvalError::LabelOutOfRange {
                    index,
                    label,
                    n_classes,
                });
            }
            matrix[t][p] += 1;
        }
        Ok(Self { matrix, n_classes })
    }

    fn total(&self) -> usize {
        self.matrix.iter().flatten().sum()
    }

    /// Overall accuracy: proportion of correct predictions.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        let correct: usize = (0..self.n_classes).map(|i| self.matrix[i][i]).sum();
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            correct as f64 / total as f64
        }
    }

    /// Cohen's kappa, `(p_o - p_e) / (1 - p_e)`.
    ///
    /// When chance agreement is already perfect (`p_e == 1`, every row and
    /// every prediction in one class) the statistic is undefined; 0.0 is
    /// returned.
    #[must_use]
    pub fn kappa(&self) -> f64 {
        let total = self.total() as f64;
        let observed = self.accuracy();
        let expected: f64 = (0..self.n_classes)
            .map(|c| {
                let actual: usize = self.matrix[c].iter().sum();
                let predicted: usize = self.matrix.iter().map(|row| row[c]).sum();
                (actual as f64 / total) * (predicted as f64 / total)
            })
            .sum();
        if (1.0 - expected).abs() < f64::EPSILON {
            0.0
        } else {
            (observed - expected) / (1.0 - expected)
        }
    }

    /// Per-class precision, recall, F1, and support.
    #[must_use]
    pub fn class_metrics(&self) -> Vec<ClassMetrics> {
        (0..self.n_classes)
            .map(|c| {
                let tp = self.matrix[c][c];
                let fp: usize = (0..self.n_classes)
                    .filter(|&i| i != c)
                    .map(|i| self.matrix[i][c])
                    .sum();
                let fn_: usize = (0..self.n_classes)
                    .filter(|&j| j != c)
                    .map(|j| self.matrix[c][j])
                    .sum();
                let support = tp + fn_;
                let precision = if tp + fp == 0 {
                    0.0
                } else {
                    tp as f64 / (tp + fp) as f64
                };
                let recall = if support == 0 {
                    0.0
                } else {
                    tp as f64 / support as f64
                };
                let f1 = if precision + recall == 0.0 {
                    0.0
                } else {
                    2.0 * precision * recall / (precision + recall)
                };
                ClassMetrics {
                    class: c,
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect()
    }

    /// Return the underlying matrix rows.
    #[must_use]
    pub fn as_rows(&self) -> &[Vec<usize>] {
        &self.matrix
    }

    /// Return the number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>8}", "")?;
        for j in 0..self.n_classes {
            write!(f, " pred_{j:>3}")?;
        }
        writeln!(f)?;

        for (i, row) in self.matrix.iter().enumerate() {
            write!(f, "true_{i:>3}")?;
            for val in row {
                write!(f, " {val:>7}")?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

/// Cohen's kappa between two label sequences.
///
/// # Errors
///
/// See [`ConfusionMatrix::from_labels`].
pub fn cohen_kappa(true_labels: &[usize], predicted: &[usize], n_classes: usize) -> Result<f64, EvalError> {
    ConfusionMatrix::from_labels(true_labels, predicted, n_classes).map(|cm| cm.kappa())
}

/// Unweighted or support-weighted mean of the per-class metrics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AverageMetrics {
    /// Mean precision.
    pub precision: f64,
    /// Mean recall.
    pub recall: f64,
    /// Mean F1.
    pub f1: f64,
    /// Total support.
    pub support: usize,
}

/// Per-class precision/recall/F1/support with accuracy and the macro and
/// support-weighted averages.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationReport {
    class_names: Vec<String>,
    classes: Vec<ClassMetrics>,
    accuracy: f64,
    macro_avg: AverageMetrics,
    weighted_avg: AverageMetrics,
}

impl ClassificationReport {
    /// Build a report from a confusion matrix. Missing class names fall
    /// back to the class index.
    #[must_use]
    pub fn from_confusion(cm: &ConfusionMatrix, class_names: &[String]) -> Self {
        let classes = cm.class_metrics();
        let total: usize = classes.iter().map(|m| m.support).sum();
        let n = classes.len() as f64;
        let macro_avg = AverageMetrics {
            precision: classes.iter().map(|m| m.precision).sum::<f64>() / n,
            recall: classes.iter().map(|m| m.recall).sum::<f64>() / n,
            f1: classes.iter().map(|m| m.f1).sum::<f64>() / n,
            support: total,
        };
        let weight = |m: &ClassMetrics| m.support as f64 / total.max(1) as f64;
        let weighted_avg = AverageMetrics {
            precision: classes.iter().map(|m| m.precision * weight(m)).sum(),
            recall: classes.iter().map(|m| m.recall * weight(m)).sum(),
            f1: classes.iter().map(|m| m.f1 * weight(m)).sum(),
            support: total,
        };
        let class_names = (0..classes.len())
            .map(|c| class_names.get(c).cloned().unwrap_or_else(|| c.to_string()))
            .collect();
        Self {
            class_names,
            classes,
            accuracy: cm.accuracy(),
            macro_avg,
            weighted_avg,
        }
    }

    /// Return the class names, one per row of [`ClassificationReport::classes`].
    #[must_use]
    pub fn class_names(&self) -> &[String] {
        &self.class_names
    }

    /// Return the per-class rows.
    #[must_use]
    pub fn classes(&self) -> &[ClassMetrics] {
        &self.classes
    }

    /// Return the overall accuracy.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        self.accuracy
    }

    /// Return the unweighted class average.
    #[must_use]
    pub fn macro_avg(&self) -> AverageMetrics {
        self.macro_avg
    }

    /// Return the support-weighted class average.
    #[must_use]
    pub fn weighted_avg(&self) -> AverageMetrics {
        self.weighted_avg
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>14} {:>9} {:>9} {:>9} {:>9}", "", "precision", "recall", "f1-score", "support")?;
        writeln!(f)?;
        for (name, m) in self.class_names.iter().zip(&self.classes) {
            writeln!(
                f,
                "{name:>14} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                m.precision, m.recall, m.f1, m.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>14} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.macro_avg.support
        )?;
        for (label, avg) in [("macro avg", self.macro_avg), ("weighted avg", self.weighted_avg)] {
            writeln!(
                f,
                "{label:>14} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                avg.precision, avg.recall, avg.f1, avg.support
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_predictions() {
        let true_labels = vec![0, 0, 1, 1, 2, 2];
        let predicted = vec![0, 0, 1, 1, 2, 2];
        let cm = ConfusionMatrix::from_labels(&true_labels, &predicted, 3).unwrap();
        assert!((cm.accuracy() - 1.0).abs() < f64::EPSILON);
        assert!((cm.kappa() - 1.0).abs() < 1e-12);

        for m in cm.class_metrics() {
            assert!((m.precision - 1.0).abs() < f64::EPSILON);
            assert!((m.recall - 1.0).abs() < f64::EPSILON);
            assert!((m.f1 - 1.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn known_confusion_matrix() {
        let true_labels = vec![0, 0, 0, 1, 1, 1, 2, 2, 2];
        let predicted = vec![0, 0, 1, 1, 1, 2, 2, 2, 0];
        let cm = ConfusionMatrix::from_labels(&true_labels, &predicted, 3).unwrap();
        let metrics = cm.class_metrics();
        assert!((metrics[0].precision - 2.0 / 3.0).abs() < 1e-10);
        assert!((metrics[0].recall - 2.0 / 3.0).abs() < 1e-10);
        assert_eq!(metrics[0].support, 3);
        assert!((cm.accuracy() - 6.0 / 9.0).abs() < 1e-10);
        // p_o = 2/3, p_e = 1/3 -> kappa = 0.5
        assert!((cm.kappa() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn kappa_hand_computed_binary() {
        // [[20, 5], [10, 15]]: p_o = 0.7, p_e = 0.5*0.6 + 0.5*0.4 = 0.5
        let mut t = vec![0; 25];
        t.extend(vec![1; 25]);
        let mut p = vec![0; 20];
        p.extend(vec![1; 5]);
        p.extend(vec![0; 10]);
        p.extend(vec![1; 15]);
        let kappa = cohen_kappa(&t, &p, 2).unwrap();
        assert!((kappa - 0.4).abs() < 1e-12, "kappa = {kappa}");
    }

    #[test]
    fn majority_predictor_scores_zero() {
        let t: Vec<usize> = (0..100).map(|i| usize::from(i % 5 == 0)).collect();
        let p = vec![0; 100];
        assert_eq!(cohen_kappa(&t, &p, 2).unwrap(), 0.0);
    }

    #[test]
    fn all_one_class_kappa_is_zero() {
        assert_eq!(cohen_kappa(&[1, 1, 1], &[1, 1, 1], 2).unwrap(), 0.0);
    }

    #[test]
    fn inverted_predictions_score_minus_one() {
        let kappa = cohen_kappa(&[0, 1, 0, 1], &[1, 0, 1, 0], 2).unwrap();
        assert!((kappa + 1.0).abs() < 1e-12);
    }

    #[test]
    fn empty_labels_error() {
        let err = ConfusionMatrix::from_labels(&[], &[], 3).unwrap_err();
        assert!(matches!(err, EvalError::EmptyDataset));
    }

    #[test]
    fn out_of_range_prediction_error() {
        let err = ConfusionMatrix::from_labels(&[0, 1], &[0, 2], 2).unwrap_err();
        assert!(matches!(err, EvalError::LabelOutOfRange { index: 1, label: 2, n_classes: 2 }));
    }

    #[test]
    fn display_formatting() {
        let cm = ConfusionMatrix::from_labels(&[0, 1], &[0, 1], 2).unwrap();
        let output = format!("{cm}");
        assert!(output.contains("pred_"));
        assert!(output.contains("true_"));
    }

    #[test]
    fn report_averages() {
        // class 0: P=2/3 R=1 support 2; class 1: P=1 R=1/2 support 2
        let cm = ConfusionMatrix::from_labels(&[0, 0, 1, 1], &[0, 0, 0, 1], 2).unwrap();
        let report = ClassificationReport::from_confusion(&cm, &["N".to_string(), "Y".to_string()]);
        assert_eq!(report.class_names(), &["N".to_string(), "Y".to_string()]);
        assert!((report.accuracy() - 0.75).abs() < 1e-12);
        let macro_avg = report.macro_avg();
        assert!((macro_avg.precision - (2.0 / 3.0 + 1.0) / 2.0).abs() < 1e-12);
        assert!((macro_avg.recall - 0.75).abs() < 1e-12);
        assert_eq!(macro_avg.support, 4);
        // equal supports make the weighted average match the macro one
        assert!((report.weighted_avg().f1 - macro_avg.f1).abs() < 1e-12);

        let text = report.to_string();
        assert!(text.contains("precision"));
        assert!(text.contains("weighted avg"));
        assert!(text.contains("accuracy"));
    }
}
