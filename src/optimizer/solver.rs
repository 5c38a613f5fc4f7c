use crate::error::{AnalyticsError, Result};
use crate::optimizer::{Constraints, WEIGHT_SUM_EPSILON};
use argmin::core::{CostFunction, Executor, Gradient, State};
use argmin::solver::gradientdescent::SteepestDescent;
use argmin::solver::linesearch::{BacktrackingLineSearch, condition::ArmijoCondition};
use log::debug;
use ndarray::Array1;

/// Penalty weight for the sum-to-one and box-bound violations.
const PENALTY_WEIGHT: f64 = 1000.0;
/// Step size for central-difference gradients.
const GRADIENT_STEP: f64 = 1e-6;

/// A smooth objective wrapped with quadratic penalties for the weight
/// constraints, suitable for an unconstrained gradient solver.
struct PenalizedProblem<F> {
    objective: F,
    constraints: Constraints,
}

impl<F> PenalizedProblem<F>
where
    F: Fn(&Array1<f64>) -> f64,
{
    fn penalized_cost(&self, weights: &[f64]) -> f64 {
        let w = Array1::from_vec(weights.to_vec());

        let sum_penalty = PENALTY_WEIGHT * (w.sum() - 1.0).powi(2);
        let bound_penalty = PENALTY_WEIGHT
            * w.iter()
                .map(|&wi| {
                    if wi < self.constraints.min_weight {
                        (self.constraints.min_weight - wi).powi(2)
                    } else if wi > self.constraints.max_weight {
                        (wi - self.constraints.max_weight).powi(2)
                    } else {
                        0.0
                    }
                })
                .sum::<f64>();

        (self.objective)(&w) + sum_penalty + bound_penalty
    }
}

impl<F> CostFunction for PenalizedProblem<F>
where
    F: Fn(&Array1<f64>) -> f64,
{
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, weights: &Self::Param) -> std::result::Result<Self::Output, argmin::core::Error> {
        Ok(self.penalized_cost(weights))
    }
}

impl<F> Gradient for PenalizedProblem<F>
where
    F: Fn(&Array1<f64>) -> f64,
{
    type Param = Vec<f64>;
    type Gradient = Vec<f64>;

    fn gradient(
        &self,
        weights: &Self::Param,
    ) -> std::result::Result<Self::Gradient, argmin::core::Error> {
        // Central differences keep the solver uniform across objectives.
        let mut gradient = vec![0.0; weights.len()];
        let mut probe = weights.clone();
        for i in 0..weights.len() {
            probe[i] = weights[i] + GRADIENT_STEP;
            let up = self.penalized_cost(&probe);
            probe[i] = weights[i] - GRADIENT_STEP;
            let down = self.penalized_cost(&probe);
            probe[i] = weights[i];
            gradient[i] = (up - down) / (2.0 * GRADIENT_STEP);
        }
        Ok(gradient)
    }
}

/// Minimize `objective` over weight vectors subject to the sum-to-one and
/// box constraints, starting from equal weights.
///
/// The constraints are enforced softly during the solve and exactly
/// afterwards by projecting the solution into the box and renormalizing.
/// Any solver fault, non-finite output, or unprojectable solution becomes
/// a `Convergence` error tagged with `label`.
pub fn solve_weights<F>(
    label: &str,
    objective: F,
    n_assets: usize,
    constraints: &Constraints,
    max_iterations: u64,
) -> Result<Array1<f64>>
where
    F: Fn(&Array1<f64>) -> f64,
{
    let initial = vec![1.0 / n_assets as f64; n_assets];
    let problem = PenalizedProblem {
        objective,
        constraints: *constraints,
    };

    let armijo = ArmijoCondition::new(1e-4).map_err(|e| AnalyticsError::Convergence {
        method: label.to_string(),
        reason: e.to_string(),
    })?;
    let linesearch = BacktrackingLineSearch::new(armijo);
    let solver = SteepestDescent::new(linesearch);

    let outcome = Executor::new(problem, solver)
        .configure(|state| state.param(initial.clone()).max_iters(max_iterations))
        .run()
        .map_err(|e| AnalyticsError::Convergence {
            method: label.to_string(),
            reason: e.to_string(),
        })?;

    let solution = outcome
        .state()
        .get_best_param()
        .cloned()
        .unwrap_or(initial);

    if solution.iter().any(|w| !w.is_finite()) {
        return Err(AnalyticsError::Convergence {
            method: label.to_string(),
            reason: "solver produced non-finite weights".to_string(),
        });
    }

    let weights = project_to_constraints(Array1::from_vec(solution), constraints);
    debug!("{} solved weights: {:?}", label, weights.to_vec());

    let sum = weights.sum();
    let in_bounds = weights.iter().all(|&w| {
        w >= constraints.min_weight - WEIGHT_SUM_EPSILON
            && w <= constraints.max_weight + WEIGHT_SUM_EPSILON
    });
    if (sum - 1.0).abs() > WEIGHT_SUM_EPSILON || !in_bounds {
        return Err(AnalyticsError::Convergence {
            method: label.to_string(),
            reason: format!(
                "solution violates constraints (sum {:.6}, bounds [{:.2}, {:.2}])",
                sum, constraints.min_weight, constraints.max_weight
            ),
        });
    }

    Ok(weights)
}

/// Alternate clamping into the box with renormalization until both hold.
/// Converges whenever the box admits a sum-to-one point, which the 2-20
/// asset range with default bounds always does.
fn project_to_constraints(mut weights: Array1<f64>, constraints: &Constraints) -> Array1<f64> {
    for _ in 0..100 {
        weights.mapv_inplace(|w| w.clamp(constraints.min_weight, constraints.max_weight));
        let sum = weights.sum();
        if sum > 0.0 {
            weights.mapv_inplace(|w| w / sum);
        }
        let clamped_again = weights.iter().all(|&w| {
            w >= constraints.min_weight - WEIGHT_SUM_EPSILON
                && w <= constraints.max_weight + WEIGHT_SUM_EPSILON
        });
        if clamped_again && (weights.sum() - 1.0).abs() <= WEIGHT_SUM_EPSILON {
            break;
        }
    }
    weights
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr1;

    #[test]
    fn test_quadratic_objective_converges_to_feasible_point() {
        // Minimize distance to an interior target; solution is the target.
        let target = arr1(&[0.3, 0.7]);
        let objective = move |w: &Array1<f64>| {
            w.iter()
                .zip(target.iter())
                .map(|(a, b)| (a - b).powi(2))
                .sum()
        };
        let weights = solve_weights("test", objective, 2, &Constraints::default(), 500).unwrap();
        assert!((weights.sum() - 1.0).abs() < 1e-6);
        assert!((weights[0] - 0.3).abs() < 0.05);
    }

    #[test]
    fn test_projection_respects_bounds() {
        let constraints = Constraints {
            min_weight: 0.01,
            max_weight: 0.50,
        };
        let projected = project_to_constraints(arr1(&[0.9, 0.05, 0.05]), &constraints);
        assert!((projected.sum() - 1.0).abs() < 1e-9);
        for &w in projected.iter() {
            assert!(w >= 0.01 - 1e-9 && w <= 0.50 + 1e-9);
        }
    }

    #[test]
    fn test_variance_objective_prefers_low_variance_asset() {
        // Uncorrelated assets with 4x variance difference; minimum variance
        // overweights the quieter one.
        let objective = |w: &Array1<f64>| 0.04 * w[0] * w[0] + 0.16 * w[1] * w[1];
        let weights =
            solve_weights("min_var", objective, 2, &Constraints::default(), 500).unwrap();
        assert!((weights.sum() - 1.0).abs() < 1e-6);
        assert!(weights[0] > weights[1]);
    }
}
