//! Sequential minimal optimization for the C-SVC dual.
//!
//! Minimizes `½ αᵀQα - eᵀα` subject to `yᵀα = 0` and `0 <= α_i <= C_i`,
//! where `Q_ij = y_i y_j K(x_i, x_j)`. Each iteration picks the maximal
//! violating index `i`, pairs it with the `j` that gives the largest
//! second-order decrease of the objective, and solves the two-variable
//! subproblem analytically.

use tracing::{debug, warn};

use crate::kernel::GramMatrix;

/// Floor for a non-positive curvature along the chosen direction.
const TAU: f64 = 1e-12;

pub(crate) struct SmoOutput {
    pub(crate) alpha: Vec<f64>,
    pub(crate) rho: f64,
    pub(crate) iterations: usize,
    pub(crate) converged: bool,
}

struct Solver<'a> {
    gram: &'a GramMatrix,
    y: &'a [f64],
    upper: &'a [f64],
    alpha: Vec<f64>,
    gradient: Vec<f64>,
}

impl Solver<'_> {
    fn is_upper(&self, t: usize) -> bool {
        self.alpha[t] >= self.upper[t]
    }

    fn is_lower(&self, t: usize) -> bool {
        self.alpha[t] <= 0.0
    }

    fn q(&self, i: usize, j: usize) -> f64 {
        self.y[i] * self.y[j] * self.gram.row(i)[j]
    }

    /// Return the working pair, or `None` once the maximal violation is
    /// below `tolerance`.
    fn select_working_set(&self, tolerance: f64) -> Option<(usize, usize)> {
        let n = self.y.len();
        let mut g_max = f64::NEG_INFINITY;
        let mut i_sel = None;
        for t in 0..n {
            if self.y[t] > 0.0 {
                if !self.is_upper(t) && -self.gradient[t] >= g_max {
                    g_max = -self.gradient[t];
                    i_sel = Some(t);
                }
            } else if !self.is_lower(t) && self.gradient[t] >= g_max {
                g_max = self.gradient[t];
                i_sel = Some(t);
            }
        }
        let i = i_sel?;

        let k_i = self.gram.row(i);
        let mut g_max2 = f64::NEG_INFINITY;
        let mut obj_diff_min = f64::INFINITY;
        let mut j_sel = None;
        for j in 0..n {
            let candidate = if self.y[j] > 0.0 {
                if self.is_lower(j) {
                    None
                } else {
                    g_max2 = g_max2.max(self.gradient[j]);
                    Some(g_max + self.gradient[j])
                }
            } else if self.is_upper(j) {
                None
            } else {
                g_max2 = g_max2.max(-self.gradient[j]);
                Some(g_max - self.gradient[j])
            };
            let Some(grad_diff) = candidate else { continue };
            if grad_diff > 0.0 {
                let quad = self.gram.diag(i) + self.gram.diag(j) - 2.0 * k_i[j];
                let quad = if quad > 0.0 { quad } else { TAU };
                let obj_diff = -(grad_diff * grad_diff) / quad;
                if obj_diff <= obj_diff_min {
                    obj_diff_min = obj_diff;
                    j_sel = Some(j);
                }
            }
        }

        if g_max + g_max2 < tolerance {
            return None;
        }
        j_sel.map(|j| (i, j))
    }

    fn update_pair(&mut self, i: usize, j: usize) {
        let (c_i, c_j) = (self.upper[i], self.upper[j]);
        let (old_i, old_j) = (self.alpha[i], self.alpha[j]);
        let q_ii = self.gram.diag(i);
        let q_jj = self.gram.diag(j);
        let q_ij = self.q(i, j);
        let (mut a_i, mut a_j) = (old_i, old_j);

        if self.y[i] != self.y[j] {
            let quad = q_ii + q_jj + 2.0 * q_ij;
            let quad = if quad > 0.0 { quad } else { TAU };
            let delta = (-self.gradient[i] - self.gradient[j]) / quad;
            let diff = a_i - a_j;
            a_i += delta;
            a_j += delta;
            if diff > 0.0 {
                if a_j < 0.0 {
                    a_j = 0.0;
                    a_i = diff;
                }
            } else if a_i < 0.0 {
                a_i = 0.0;
                a_j = -diff;
            }
            if diff > c_i - c_j {
                if a_i > c_i {
                    a_i = c_i;
                    a_j = c_i - diff;
                }
            } else if a_j > c_j {
                a_j = c_j;
                a_i = c_j + diff;
            }
        } else {
            let quad = q_ii + q_jj - 2.0 * q_ij;
            let quad = if quad > 0.0 { quad } else { TAU };
            let delta = (self.gradient[i] - self.gradient[j]) / quad;
            let sum = a_i + a_j;
            a_i -= delta;
            a_j += delta;
            if sum > c_i {
                if a_i > c_i {
                    a_i = c_i;
                    a_j = sum - c_i;
                }
            } else if a_j < 0.0 {
                a_j = 0.0;
                a_i = sum;
            }
            if sum > c_j {
                if a_j > c_j {
                    a_j = c_j;
                    a_i = sum - c_j;
                }
            } else if a_i < 0.0 {
                a_i = 0.0;
                a_j = sum;
            }
        }

        self.alpha[i] = a_i;
        self.alpha[j] = a_j;
        let delta_i = a_i - old_i;
        let delta_j = a_j - old_j;
        let (k_i, k_j) = (self.gram.row(i), self.gram.row(j));
        let (y_i, y_j) = (self.y[i], self.y[j]);
        for (t, g) in self.gradient.iter_mut().enumerate() {
            *g += self.y[t] * (y_i * k_i[t] * delta_i + y_j * k_j[t] * delta_j);
        }
    }

    /// Bias term: mean of `y_t G_t` over free vectors, or the midpoint of
    /// the feasible interval when every vector sits at a bound.
    fn rho(&self) -> f64 {
        let mut upper_bound = f64::INFINITY;
        let mut lower_bound = f64::NEG_INFINITY;
        let mut n_free = 0usize;
        let mut sum_free = 0.0;
        for t in 0..self.y.len() {
            let yg = self.y[t] * self.gradient[t];
            let positive = self.y[t] > 0.0;
            if self.is_upper(t) {
                if positive {
                    lower_bound = lower_bound.max(yg);
                } else {
                    upper_bound = upper_bound.min(yg);
                }
            } else if self.is_lower(t) {
                if positive {
                    upper_bound = upper_bound.min(yg);
                } else {
                    lower_bound = lower_bound.max(yg);
                }
            } else {
                n_free += 1;
                sum_free += yg;
            }
        }
        if n_free > 0 {
            sum_free / n_free as f64
        } else {
            (upper_bound + lower_bound) / 2.0
        }
    }
}

/// Solve the dual. `y` holds ±1 targets, `upper` the per-sample `C_i`.
pub(crate) fn solve(gram: &GramMatrix, y: &[f64], upper: &[f64], tolerance: f64, max_iter: usize) -> SmoOutput {
    let n = y.len();
    let mut solver = Solver {
        gram,
        y,
        upper,
        alpha: vec![0.0; n],
        gradient: vec![-1.0; n],
    };

    let mut iterations = 0;
    let mut converged = false;
    while iterations < max_iter {
        match solver.select_working_set(tolerance) {
            Some((i, j)) => solver.update_pair(i, j),
            None => {
                converged = true;
                break;
            }
        }
        iterations += 1;
    }

    if converged {
        debug!(iterations, "SMO converged");
    } else {
        warn!(max_iter, "SMO reached the iteration limit before converging");
    }

    let rho = solver.rho();
    SmoOutput {
        alpha: solver.alpha,
        rho,
        iterations,
        converged,
    }
}
