//! Feature importance aggregation across trees (and across folds).

/// A ranked feature with name, importance score, and rank.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedFeature {
    /// Feature name.
    pub name: String,
    /// Normalized importance score (sums to 1.0 across all features).
    pub importance: f64,
    /// 1-based rank (1 = most important).
    pub rank: usize,
}

/// Aggregate per-model importance vectors into ranked features.
///
/// Sums the vectors, normalizes to 1.0, sorts descending and assigns
/// 1-based ranks. Entries beyond `names.len()` are ignored.
#[must_use]
pub fn aggregate_importances(per_model: &[Vec<f64>], names: &[String]) -> Vec<RankedFeature> {
    if per_model.is_empty() || names.is_empty() {
        return vec![];
    }

    let mut totals = vec![0.0f64; names.len()];
    for importances in per_model {
        for (total, &val) in totals.iter_mut().zip(importances) {
            *total += val;
        }
    }

    let sum: f64 = totals.iter().sum();
    if sum > 0.0 {
        totals.iter_mut().for_each(|v| *v /= sum);
    }

    let mut features: Vec<RankedFeature> = names
        .iter()
        .zip(totals)
        .map(|(name, importance)| RankedFeature {
            name: name.clone(),
            importance,
            rank: 0,
        })
        .collect();

    features.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    for (i, feature) in features.iter_mut().enumerate() {
        feature.rank = i + 1;
    }

    features
}

#[cfg(test)]
mod tests {
    use super::aggregate_importances;

    #[test]
    fn ranks_follow_summed_importance() {
        let names = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let ranked = aggregate_importances(&[vec![0.1, 0.6, 0.3], vec![0.1, 0.2, 0.7]], &names);
        assert_eq!(ranked[0].name, "c");
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[2].name, "a");
        let total: f64 = ranked.iter().map(|f| f.importance).sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn empty_inputs_yield_nothing() {
        assert!(aggregate_importances(&[], &["a".to_string()]).is_empty());
    }
}
