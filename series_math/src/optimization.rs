//! Derivative-free minimization (Nelder-Mead simplex)

/// Outcome of a simplex search
#[derive(Debug, Clone)]
pub struct SimplexResult {
    /// Best point found
    pub point: Vec<f64>,
    /// Objective value at `point`
    pub value: f64,
    /// Iterations performed
    pub iterations: usize,
    /// Whether the simplex met the tolerance before `max_iter`
    pub converged: bool,
    /// Whether the stop predicate ended the search early
    pub interrupted: bool,
}

/// Tuning knobs for [`nelder_mead`]
#[derive(Debug, Clone)]
pub struct SimplexConfig {
    /// Maximum number of iterations
    pub max_iter: usize,
    /// Relative spread of vertex values at which the search stops
    pub tolerance: f64,
    /// Reflection coefficient
    pub alpha: f64,
    /// Expansion coefficient
    pub gamma: f64,
    /// Contraction coefficient
    pub rho: f64,
    /// Shrink coefficient
    pub sigma: f64,
    /// Initial simplex step (relative for non-zero coordinates)
    pub initial_step: f64,
}

impl Default for SimplexConfig {
    fn default() -> Self {
        Self {
            max_iter: 1000,
            tolerance: 1e-9,
            alpha: 1.0,
            gamma: 2.0,
            rho: 0.5,
            sigma: 0.5,
            initial_step: 0.1,
        }
    }
}

/// Minimize `objective` starting at `initial`, clamping every vertex to `bounds`.
///
/// The search is deterministic: identical inputs always produce identical
/// outputs.
pub fn nelder_mead<F>(
    objective: F,
    initial: &[f64],
    bounds: Option<&[(f64, f64)]>,
    config: &SimplexConfig,
) -> SimplexResult
where
    F: Fn(&[f64]) -> f64,
{
    nelder_mead_until(objective, initial, bounds, config, || false)
}

/// [`nelder_mead`] that polls `stop` before every iteration and returns
/// the best vertex so far, flagged `interrupted`, once it answers true.
pub fn nelder_mead_until<F, S>(
    objective: F,
    initial: &[f64],
    bounds: Option<&[(f64, f64)]>,
    config: &SimplexConfig,
    stop: S,
) -> SimplexResult
where
    F: Fn(&[f64]) -> f64,
    S: Fn() -> bool,
{
    let n = initial.len();
    if n == 0 {
        return SimplexResult {
            point: Vec::new(),
            value: objective(&[]),
            iterations: 0,
            converged: true,
            interrupted: false,
        };
    }

    let start = clamp(initial, bounds);
    let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
    simplex.push(start.clone());
    for i in 0..n {
        let mut vertex = start.clone();
        let step = if vertex[i].abs() > 1e-8 {
            config.initial_step * vertex[i].abs()
        } else {
            config.initial_step
        };
        vertex[i] += step;
        let vertex = clamp(&vertex, bounds);
        // A bound can swallow the step; push the other way instead
        if vertex[i] == start[i] {
            let mut back = start.clone();
            back[i] -= step;
            simplex.push(clamp(&back, bounds));
        } else {
            simplex.push(vertex);
        }
    }

    let mut values: Vec<f64> = simplex.iter().map(|v| sanitize(objective(v))).collect();
    let mut iterations = 0;
    let mut converged = false;
    let mut interrupted = false;

    while iterations < config.max_iter {
        if stop() {
            interrupted = true;
            break;
        }
        iterations += 1;

        let mut order: Vec<usize> = (0..=n).collect();
        order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
        let best = order[0];
        let worst = order[n];
        let second_worst = order[n - 1];

        let spread = (values[worst] - values[best]).abs();
        if spread <= config.tolerance * (values[best].abs() + config.tolerance) {
            converged = true;
            break;
        }

        let centroid = centroid_excluding(&simplex, worst);

        let reflected = clamp(
            &combine(&centroid, &simplex[worst], 1.0 + config.alpha, -config.alpha),
            bounds,
        );
        let reflected_value = sanitize(objective(&reflected));

        if reflected_value < values[best] {
            let expanded = clamp(
                &combine(&centroid, &reflected, 1.0 - config.gamma, config.gamma),
                bounds,
            );
            let expanded_value = sanitize(objective(&expanded));
            if expanded_value < reflected_value {
                simplex[worst] = expanded;
                values[worst] = expanded_value;
            } else {
                simplex[worst] = reflected;
                values[worst] = reflected_value;
            }
            continue;
        }

        if reflected_value < values[second_worst] {
            simplex[worst] = reflected;
            values[worst] = reflected_value;
            continue;
        }

        // Contract toward the better of the reflected and worst vertex
        let (toward, toward_value) = if reflected_value < values[worst] {
            (reflected, reflected_value)
        } else {
            (simplex[worst].clone(), values[worst])
        };
        let contracted = clamp(
            &combine(&centroid, &toward, 1.0 - config.rho, config.rho),
            bounds,
        );
        let contracted_value = sanitize(objective(&contracted));
        if contracted_value < toward_value {
            simplex[worst] = contracted;
            values[worst] = contracted_value;
            continue;
        }

        // Shrink everything toward the best vertex
        let anchor = simplex[best].clone();
        for idx in 0..=n {
            if idx == best {
                continue;
            }
            simplex[idx] = clamp(
                &combine(&anchor, &simplex[idx], 1.0 - config.sigma, config.sigma),
                bounds,
            );
            values[idx] = sanitize(objective(&simplex[idx]));
        }
    }

    let best = (0..=n)
        .min_by(|&a, &b| values[a].total_cmp(&values[b]))
        .unwrap_or(0);

    SimplexResult {
        point: simplex[best].clone(),
        value: values[best],
        iterations,
        converged,
        interrupted,
    }
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        f64::MAX
    }
}

fn clamp(point: &[f64], bounds: Option<&[(f64, f64)]>) -> Vec<f64> {
    match bounds {
        Some(bounds) => point
            .iter()
            .zip(bounds.iter())
            .map(|(&x, &(lo, hi))| x.clamp(lo, hi))
            .collect(),
        None => point.to_vec(),
    }
}

fn centroid_excluding(simplex: &[Vec<f64>], skip: usize) -> Vec<f64> {
    let dims = simplex[0].len();
    let count = (simplex.len() - 1) as f64;
    let mut centroid = vec![0.0; dims];
    for (idx, vertex) in simplex.iter().enumerate() {
        if idx == skip {
            continue;
        }
        for (c, v) in centroid.iter_mut().zip(vertex) {
            *c += v;
        }
    }
    centroid.iter_mut().for_each(|c| *c /= count);
    centroid
}

/// `a * wa + b * wb`, element-wise
fn combine(a: &[f64], b: &[f64], wa: f64, wb: f64) -> Vec<f64> {
    a.iter().zip(b).map(|(x, y)| wa * x + wb * y).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_quadratic_minimum() {
        let result = nelder_mead(
            |x| (x[0] - 2.0).powi(2) + (x[1] + 1.0).powi(2) + 3.0,
            &[0.0, 0.0],
            None,
            &SimplexConfig::default(),
        );
        assert!(result.converged);
        assert_relative_eq!(result.point[0], 2.0, epsilon = 1e-3);
        assert_relative_eq!(result.point[1], -1.0, epsilon = 1e-3);
        assert_relative_eq!(result.value, 3.0, epsilon = 1e-6);
    }

    #[test]
    fn test_bounds_are_respected() {
        let bounds = [(-0.5, 0.5)];
        let result = nelder_mead(
            |x| (x[0] - 3.0).powi(2),
            &[0.0],
            Some(&bounds),
            &SimplexConfig::default(),
        );
        assert!(result.point[0] <= 0.5);
        assert_relative_eq!(result.point[0], 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_non_finite_objective_is_avoided() {
        let result = nelder_mead(
            |x| if x[0] < 0.0 { f64::NAN } else { (x[0] - 1.0).powi(2) },
            &[0.2],
            None,
            &SimplexConfig::default(),
        );
        assert!(result.value.is_finite());
        assert_relative_eq!(result.point[0], 1.0, epsilon = 1e-3);
    }

    #[test]
    fn test_stop_predicate_ends_search() {
        use std::cell::Cell;

        let polls = Cell::new(0);
        let result = nelder_mead_until(
            |x| (x[0] - 2.0).powi(2) + (x[1] + 1.0).powi(2),
            &[0.0, 0.0],
            None,
            &SimplexConfig::default(),
            || {
                polls.set(polls.get() + 1);
                polls.get() > 5
            },
        );
        assert!(result.interrupted);
        assert!(!result.converged);
        assert_eq!(result.iterations, 5);
        assert!(result.value.is_finite());
    }
}
