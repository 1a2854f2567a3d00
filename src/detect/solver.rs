//! Bounded derivative-free minimization
//!
//! Nelder-Mead direct search over three variables with every trial point
//! clamped into a rectangular search box. This is the localizer's swappable
//! seam: any bounded direct-search method that reports non-convergence
//! explicitly can replace it.

use thiserror::Error;

/// Number of optimization variables (lat, lon, emission time)
pub const DIM: usize = 3;

/// Rectangular search box
#[derive(Debug, Clone)]
pub struct Bounds {
    pub lower: [f64; DIM],
    pub upper: [f64; DIM],
}

impl Bounds {
    fn clamp(&self, mut x: [f64; DIM]) -> [f64; DIM] {
        for i in 0..DIM {
            x[i] = x[i].clamp(self.lower[i], self.upper[i]);
        }
        x
    }

    fn span(&self, i: usize) -> f64 {
        self.upper[i] - self.lower[i]
    }
}

/// Search options
#[derive(Debug, Clone)]
pub struct Options {
    pub max_iters: usize,
    /// Convergence tolerance on the simplex's function-value spread
    pub f_tol: f64,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            max_iters: 2000,
            f_tol: 1e-12,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SolveError {
    #[error("direct search did not converge within {0} iterations")]
    DidNotConverge(usize),
}

// Standard Nelder-Mead coefficients
const REFLECT: f64 = 1.0;
const EXPAND: f64 = 2.0;
const CONTRACT: f64 = 0.5;
const SHRINK: f64 = 0.5;

/// Minimize `f` inside `bounds`, starting from `start`.
///
/// Returns the best point found once the simplex's function-value spread
/// falls below `f_tol`, or [`SolveError::DidNotConverge`] after
/// `max_iters` iterations.
pub fn minimize<F>(
    f: F,
    start: [f64; DIM],
    bounds: &Bounds,
    opts: &Options,
) -> Result<[f64; DIM], SolveError>
where
    F: Fn(&[f64; DIM]) -> f64,
{
    let mut simplex: Vec<[f64; DIM]> = Vec::with_capacity(DIM + 1);
    simplex.push(bounds.clamp(start));
    for i in 0..DIM {
        let span = bounds.span(i);
        // 5% of the box span per axis; a small absolute step when the box
        // is flat along an axis
        let step = if span > 0.0 { 0.05 * span } else { 1e-6 };
        let mut vertex = simplex[0];
        vertex[i] = if vertex[i] + step <= bounds.upper[i] {
            vertex[i] + step
        } else {
            vertex[i] - step
        };
        simplex.push(bounds.clamp(vertex));
    }

    let mut values: Vec<f64> = simplex.iter().map(|x| f(x)).collect();

    for _ in 0..opts.max_iters {
        // Order vertices best-first
        let mut order: Vec<usize> = (0..=DIM).collect();
        order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
        let best = order[0];
        let second_worst = order[DIM - 1];
        let worst = order[DIM];

        if (values[worst] - values[best]).abs() <= opts.f_tol * (1.0 + values[best].abs()) {
            return Ok(simplex[best]);
        }

        // Centroid of all vertices except the worst
        let mut centroid = [0.0; DIM];
        for (idx, vertex) in simplex.iter().enumerate() {
            if idx == worst {
                continue;
            }
            for i in 0..DIM {
                centroid[i] += vertex[i] / DIM as f64;
            }
        }

        let worst_vertex = simplex[worst];
        let shifted = |coeff: f64| -> [f64; DIM] {
            let mut x = [0.0; DIM];
            for i in 0..DIM {
                x[i] = centroid[i] + coeff * (centroid[i] - worst_vertex[i]);
            }
            bounds.clamp(x)
        };

        let reflected = shifted(REFLECT);
        let f_reflected = f(&reflected);

        if f_reflected < values[best] {
            // Try expanding past the reflection
            let expanded = shifted(EXPAND);
            let f_expanded = f(&expanded);
            if f_expanded < f_reflected {
                simplex[worst] = expanded;
                values[worst] = f_expanded;
            } else {
                simplex[worst] = reflected;
                values[worst] = f_reflected;
            }
        } else if f_reflected < values[second_worst] {
            simplex[worst] = reflected;
            values[worst] = f_reflected;
        } else {
            // Contract toward the centroid
            let contracted = shifted(-CONTRACT);
            let f_contracted = f(&contracted);
            if f_contracted < values[worst] {
                simplex[worst] = contracted;
                values[worst] = f_contracted;
            } else {
                // Shrink everything toward the best vertex
                let anchor = simplex[best];
                for (idx, vertex) in simplex.iter_mut().enumerate() {
                    if idx == best {
                        continue;
                    }
                    for i in 0..DIM {
                        vertex[i] = anchor[i] + SHRINK * (vertex[i] - anchor[i]);
                    }
                    *vertex = bounds.clamp(*vertex);
                    values[idx] = f(vertex);
                }
            }
        }
    }

    Err(SolveError::DidNotConverge(opts.max_iters))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn unit_box() -> Bounds {
        Bounds {
            lower: [-1.0; DIM],
            upper: [1.0; DIM],
        }
    }

    #[test]
    fn finds_interior_quadratic_minimum() {
        let target = [0.3, -0.2, 0.5];
        let f = |x: &[f64; DIM]| {
            (0..DIM).map(|i| (x[i] - target[i]).powi(2)).sum::<f64>()
        };
        let result = minimize(f, [0.0; DIM], &unit_box(), &Options::default()).unwrap();
        for i in 0..DIM {
            assert_abs_diff_eq!(result[i], target[i], epsilon = 1e-5);
        }
    }

    #[test]
    fn converges_onto_a_box_boundary() {
        // Unconstrained minimum at 2.0 on each axis, outside the box
        let f = |x: &[f64; DIM]| (0..DIM).map(|i| (x[i] - 2.0).powi(2)).sum::<f64>();
        let result = minimize(f, [0.0; DIM], &unit_box(), &Options::default()).unwrap();
        for value in result {
            assert_abs_diff_eq!(value, 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn flat_axis_does_not_break_the_search() {
        let bounds = Bounds {
            lower: [-1.0, 0.0, -1.0],
            upper: [1.0, 0.0, 1.0],
        };
        let f = |x: &[f64; DIM]| x[0].powi(2) + x[1].powi(2) + x[2].powi(2);
        let result = minimize(f, [0.5, 0.0, -0.5], &bounds, &Options::default()).unwrap();
        assert_abs_diff_eq!(result[0], 0.0, epsilon = 1e-5);
        assert_abs_diff_eq!(result[1], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(result[2], 0.0, epsilon = 1e-5);
    }

    #[test]
    fn reports_non_convergence_explicitly() {
        let f = |x: &[f64; DIM]| x[0].powi(2) + x[1].powi(2) + x[2].powi(2);
        let opts = Options {
            max_iters: 1,
            f_tol: 0.0,
        };
        assert_eq!(
            minimize(f, [0.9, 0.9, 0.9], &unit_box(), &opts),
            Err(SolveError::DidNotConverge(1))
        );
    }
}
