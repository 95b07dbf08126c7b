//! Kernel functions and the precomputed Gram matrix.

use rayon::prelude::*;

/// Kernel used by the support vector classifier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Kernel {
    /// `exp(-gamma · ||x - z||²)`. `None` resolves gamma from the training
    /// data as `1 / (n_features · var(X))`.
    Rbf {
        /// Explicit gamma, or `None` for the data-derived scale.
        gamma: Option<f64>,
    },
    /// Plain dot product.
    Linear,
}

impl Kernel {
    /// Return the default RBF kernel with data-derived gamma.
    #[must_use]
    pub fn rbf() -> Self {
        Self::Rbf { gamma: None }
    }

    /// Short name used in logs and reports.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Rbf { .. } => "rbf",
            Self::Linear => "linear",
        }
    }

    /// Replace a data-derived gamma with its concrete value for `features`.
    pub(crate) fn resolve(self, features: &[Vec<f64>]) -> Self {
        match self {
            Self::Rbf { gamma: None } => Self::Rbf {
                gamma: Some(scale_gamma(features)),
            },
            other => other,
        }
    }

    /// Evaluate the kernel. A still-unresolved RBF gamma counts as 1.0.
    pub(crate) fn eval(&self, a: &[f64], b: &[f64]) -> f64 {
        match self {
            Self::Rbf { gamma } => {
                let g = gamma.unwrap_or(1.0);
                let sq: f64 = a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum();
                (-g * sq).exp()
            }
            Self::Linear => a.iter().zip(b).map(|(x, y)| x * y).sum(),
        }
    }
}

/// `1 / (n_features · var(X))` over every entry of `X`, or 1.0 when the
/// variance is zero.
pub(crate) fn scale_gamma(features: &[Vec<f64>]) -> f64 {
    let n_features = features.first().map_or(0, Vec::len);
    let count = (features.len() * n_features) as f64;
    if count == 0.0 {
        return 1.0;
    }
    let mean = features.iter().flatten().sum::<f64>() / count;
    let var = features.iter().flatten().map(|v| (v - mean) * (v - mean)).sum::<f64>() / count;
    if var > 0.0 {
        1.0 / (n_features as f64 * var)
    } else {
        1.0
    }
}

/// Dense symmetric kernel matrix, stored row-major.
pub(crate) struct GramMatrix {
    n: usize,
    values: Vec<f64>,
}

impl GramMatrix {
    pub(crate) fn compute(kernel: &Kernel, features: &[Vec<f64>]) -> Self {
        let n = features.len();
        let values: Vec<f64> = (0..n)
            .into_par_iter()
            .flat_map_iter(|i| features.iter().map(move |xj| kernel.eval(&features[i], xj)))
            .collect();
        Self { n, values }
    }

    pub(crate) fn row(&self, i: usize) -> &[f64] {
        &self.values[i * self.n..(i + 1) * self.n]
    }

    pub(crate) fn diag(&self, i: usize) -> f64 {
        self.values[i * self.n + i]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rbf_is_one_on_identical_points() {
        let k = Kernel::Rbf { gamma: Some(0.5) };
        assert!((k.eval(&[1.0, 2.0], &[1.0, 2.0]) - 1.0).abs() < 1e-12);
        assert!(k.eval(&[0.0, 0.0], &[3.0, 4.0]) < 1e-5);
    }

    #[test]
    fn scale_gamma_matches_formula() {
        // entries 0, 2, 0, 2 -> mean 1, var 1, two features -> gamma 0.5
        let x = vec![vec![0.0, 2.0], vec![0.0, 2.0]];
        assert!((scale_gamma(&x) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn scale_gamma_on_constant_data_is_one() {
        let x = vec![vec![3.0, 3.0], vec![3.0, 3.0]];
        assert_eq!(scale_gamma(&x), 1.0);
    }

    #[test]
    fn gram_matrix_is_symmetric() {
        let x = vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![2.0, 2.0]];
        let gram = GramMatrix::compute(&Kernel::Linear, &x);
        for i in 0..3 {
            for j in 0..3 {
                assert_eq!(gram.row(i)[j], gram.row(j)[i]);
            }
        }
        assert_eq!(gram.diag(2), 8.0);
    }
}
