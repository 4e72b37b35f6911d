use crate::model::{PlacementModel, Sense, VarKind};
use good_lp::{default_solver, variable, variables, Expression, ResolutionError, Solution,
    SolverModel};
use log::{debug, warn};
use std::time::{Duration, Instant};

/// Terminal states of one solve, surfaced verbatim to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    Optimal,
    Infeasible,
    Unbounded,
    InfeasibleOrUnbounded,
    Error,
}

/**
 * Everything a solve run reports back. `objective` and `values` are only
 * present on [`SolveStatus::Optimal`]; `values` is indexed by
 * [`crate::model::VarId::index`]. `message` carries backend detail for
 * the failure states.
 */
#[derive(Debug, Clone)]
pub struct SolveOutcome {
    pub status: SolveStatus,
    pub objective: Option<f64>,
    pub values: Option<Vec<f64>>,
    pub runtime: Duration,
    pub message: Option<String>,
}

/**
 * Strategy boundary around the integer-programming engine. The core
 * never looks inside the search: it hands over a finished model, waits
 * as long as the engine takes, and consumes whatever status comes back.
 * Tests substitute stub implementations that return crafted outcomes.
 */
pub trait Solver {
    fn solve(&self, model: &PlacementModel) -> SolveOutcome;
}

/// The real engine: `good_lp` over its bundled MILP backend.
#[derive(Debug, Clone)]
pub struct MilpSolver {
    threads: usize,
}

impl MilpSolver {
    /// One worker thread, for reproducible runs and bounded resource use.
    pub fn single_threaded() -> Self {
        Self { threads: 1 }
    }
}

impl Default for MilpSolver {
    fn default() -> Self {
        Self::single_threaded()
    }
}

impl Solver for MilpSolver {
    fn solve(&self, model: &PlacementModel) -> SolveOutcome {
        let mut vars = variables!();
        let mut handles = Vec::with_capacity(model.var_count());
        for kind in model.var_kinds() {
            let spec = match *kind {
                VarKind::Binary => variable().binary(),
                VarKind::Continuous { lower, upper } => {
                    variable().min(lower).max(upper)
                }
            };
            handles.push(vars.add(spec));
        }

        let mut objective = Expression::with_capacity(model.objective().len());
        for &(var, coeff) in model.objective() {
            objective.add_mul(coeff, handles[var.index()]);
        }

        let mut problem = vars.minimise(objective).using(default_solver);
        #[cfg(feature = "coin_cbc")]
        problem.set_parameter("threads", &self.threads.to_string());

        for constraint in model.constraints() {
            let mut expr = Expression::with_capacity(constraint.terms.len());
            for &(var, coeff) in &constraint.terms {
                expr.add_mul(coeff, handles[var.index()]);
            }
            problem = problem.with(match constraint.sense {
                Sense::Le => expr.leq(constraint.rhs),
                Sense::Ge => expr.geq(constraint.rhs),
                Sense::Eq => expr.eq(constraint.rhs),
            });
        }

        debug!(
            "solving: {} vars, {} constraints, {} thread(s)",
            model.var_count(),
            model.constraints().len(),
            self.threads
        );

        let started = Instant::now();
        match problem.solve() {
            Ok(solution) => {
                let runtime = started.elapsed();
                let values: Vec<f64> =
                    handles.iter().map(|v| solution.value(*v)).collect();
                let objective = model
                    .objective()
                    .iter()
                    .map(|&(var, coeff)| coeff * values[var.index()])
                    .sum();
                debug!("optimal after {:.3?}, objective {}", runtime, objective);
                SolveOutcome {
                    status: SolveStatus::Optimal,
                    objective: Some(objective),
                    values: Some(values),
                    runtime,
                    message: None,
                }
            }
            Err(err) => {
                let runtime = started.elapsed();
                let status = match err {
                    ResolutionError::Infeasible => SolveStatus::Infeasible,
                    ResolutionError::Unbounded => SolveStatus::Unbounded,
                    _ => SolveStatus::Error,
                };
                warn!("solve failed after {:.3?}: {}", runtime, err);
                SolveOutcome {
                    status,
                    objective: None,
                    values: None,
                    runtime,
                    message: Some(err.to_string()),
                }
            }
        }
    }
}
