//! Receiver operating characteristic curve and its area.

use crate::error::EvalError;

/// ROC curve points for a binary scorer.
///
/// Points run from `(0, 0)` to `(1, 1)`. `thresholds[i]` is the lowest
/// score predicted positive at point `i`; the first threshold is `+inf`.
#[derive(Debug, Clone, PartialEq)]
pub struct RocCurve {
    /// False positive rate at each threshold.
    pub fpr: Vec<f64>,
    /// True positive rate at each threshold.
    pub tpr: Vec<f64>,
    /// Decreasing score thresholds.
    pub thresholds: Vec<f64>,
    /// Area under the curve by the trapezoidal rule.
    pub auc: f64,
}

/// Build the ROC curve of `scores` against binary `labels` (1 = positive).
///
/// One point is emitted per distinct score, so tied scores move both rates
/// at once.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`EvalError::EmptyDataset`] | No labels |
/// | [`EvalError::LengthMismatch`] | Score count differs from label count |
/// | [`EvalError::LabelOutOfRange`] | A label other than 0 or 1 |
/// | [`EvalError::SingleClass`] | Only one class among the labels |
pub fn roc_curve(labels: &[usize], scores: &[f64]) -> Result<RocCurve, EvalError> {
    if labels.is_empty() {
        return Err(EvalError::EmptyDataset);
    }
    if scores.len() != labels.len() {
        return Err(EvalError::LengthMismatch {
            what: "scores",
            expected: labels.len(),
            got: scores.len(),
        });
    }
    if let Some(index) = labels.iter().position(|&l| l > 1) {
        return Err(EvalError::LabelOutOfRange {
            index,
            label: labels[index],
            n_classes: 2,
        });
    }
    let positives = labels.iter().filter(|&&l| l == 1).count();
    let negatives = labels.len() - positives;
    if positives == 0 || negatives == 0 {
        return Err(EvalError::SingleClass);
    }

    let mut order: Vec<usize> = (0..labels.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    let mut fpr = vec![0.0];
    let mut tpr = vec![0.0];
    let mut thresholds = vec![f64::INFINITY];
    let (mut tp, mut fp) = (0usize, 0usize);
    for (pos, &i) in order.iter().enumerate() {
        if labels[i] == 1 {
            tp += 1;
        } else {
            fp += 1;
        }
        let last_of_tie = order.get(pos + 1).is_none_or(|&next| scores[next] != scores[i]);
        if last_of_tie {
            fpr.push(fp as f64 / negatives as f64);
            tpr.push(tp as f64 / positives as f64);
            thresholds.push(scores[i]);
        }
    }

    let auc = fpr
        .windows(2)
        .zip(tpr.windows(2))
        .map(|(x, y)| (x[1] - x[0]) * (y[1] + y[0]) / 2.0)
        .sum();

    Ok(RocCurve {
        fpr,
        tpr,
        thresholds,
        auc,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_ranking_has_unit_area() {
        let curve = roc_curve(&[0, 0, 1, 1], &[0.1, 0.2, 0.8, 0.9]).unwrap();
        assert!((curve.auc - 1.0).abs() < 1e-12);
        assert_eq!(curve.fpr.first(), Some(&0.0));
        assert_eq!(curve.tpr.last(), Some(&1.0));
        assert_eq!(curve.fpr.last(), Some(&1.0));
        assert!(curve.thresholds[0].is_infinite());
    }

    #[test]
    fn reversed_ranking_has_zero_area() {
        let curve = roc_curve(&[1, 1, 0, 0], &[0.1, 0.2, 0.8, 0.9]).unwrap();
        assert!(curve.auc.abs() < 1e-12);
    }

    #[test]
    fn known_area() {
        // Ranking: 0.9(+) 0.8(-) 0.7(+) 0.6(-) -> AUC = 0.75
        let curve = roc_curve(&[1, 0, 1, 0], &[0.9, 0.8, 0.7, 0.6]).unwrap();
        assert!((curve.auc - 0.75).abs() < 1e-12, "auc = {}", curve.auc);
        assert_eq!(curve.fpr.len(), 5);
    }

    #[test]
    fn ties_collapse_into_one_point() {
        let curve = roc_curve(&[0, 1, 0, 1], &[0.5, 0.5, 0.5, 0.5]).unwrap();
        assert_eq!(curve.fpr, vec![0.0, 1.0]);
        assert!((curve.auc - 0.5).abs() < 1e-12);
    }

    #[test]
    fn thresholds_are_decreasing() {
        let curve = roc_curve(&[0, 1, 1, 0, 1], &[0.3, 0.9, 0.4, 0.2, 0.9]).unwrap();
        assert!(curve.thresholds.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn single_class_error() {
        assert!(matches!(roc_curve(&[1, 1], &[0.2, 0.3]), Err(EvalError::SingleClass)));
    }
}
