use crate::error::PlacementError;
use crate::grid::Grid;
use crate::loads::LoadMatrix;
use crate::model::PlacementModel;
use crate::solver::{SolveOutcome, SolveStatus};
use log::debug;
use serde::Serialize;
use std::time::Duration;

/// A solved binary must land this close to 0 or 1 to be believed.
pub const INTEGRALITY_TOL: f64 = 1e-6;

/**
 * The interpreted result of one optimization run: which node owns each
 * partition, the node-to-node traffic needed to realize that ownership,
 * and the derived metrics. Built once from the solver's variable values;
 * never mutated afterwards.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    owners: Vec<usize>,
    comm: Grid<u64>,
    bottleneck: f64,
    total: u64,
    retained: u64,
    runtime: Duration,
}

/// Flat, serializable summary of a [`Placement`] for the YAML report.
#[derive(Debug, Clone, Serialize)]
pub struct PlacementReport {
    pub nodes: usize,
    pub partitions: usize,
    pub total: u64,
    pub retained: u64,
    pub moved: u64,
    pub locality: f64,
    pub bottleneck: f64,
    pub solve_secs: f64,
    pub owners: Vec<usize>,
}

/**
 * Turns solved variable values back into a placement.
 *
 * Only an optimal outcome is interpreted; every other status aborts with
 * the status attached. Each partition must have exactly one node whose
 * assignment variable sits within [`INTEGRALITY_TOL`] of 1 while the
 * rest sit near 0; anything else is a defect in the solver's
 * integrality guarantee and is reported, never patched up.
 */
pub fn interpret(
    loads: &LoadMatrix,
    model: &PlacementModel,
    outcome: &SolveOutcome,
) -> Result<Placement, PlacementError> {
    if outcome.status != SolveStatus::Optimal {
        return Err(PlacementError::NotOptimal {
            status: outcome.status,
        });
    }
    let values = outcome
        .values
        .as_ref()
        .ok_or(PlacementError::MissingValues)?;
    let bottleneck = outcome.objective.ok_or(PlacementError::MissingValues)?;

    let nodes = loads.nodes();
    let partitions = loads.partitions();

    let mut owners = Vec::with_capacity(partitions);
    for p in 0..partitions {
        let mut found: Option<usize> = None;
        let mut count = 0usize;
        for n in 0..nodes {
            let value = values[model.assign_var(n, p).index()];
            if (value - 1.0).abs() <= INTEGRALITY_TOL {
                found = Some(n);
                count += 1;
            } else if value.abs() > INTEGRALITY_TOL {
                return Err(PlacementError::NonIntegral {
                    node: n,
                    partition: p,
                    value,
                });
            }
        }
        match (found, count) {
            (Some(n), 1) => owners.push(n),
            _ => {
                return Err(PlacementError::OwnershipViolation {
                    partition: p,
                    owners: count,
                })
            }
        }
    }

    let mut comm = Grid::new(nodes, nodes);
    let mut retained = 0u64;
    for (p, &des) in owners.iter().enumerate() {
        retained += loads.load(des, p);
        for n in 0..nodes {
            let h = loads.load(n, p);
            if n != des && h > 0 {
                comm[n][des] += h;
            }
        }
    }

    debug!(
        "interpreted placement: retained {}/{}, bottleneck {}",
        retained,
        loads.total(),
        bottleneck
    );

    Ok(Placement {
        owners,
        comm,
        bottleneck,
        total: loads.total(),
        retained,
        runtime: outcome.runtime,
    })
}

impl Placement {
    // -- PUBLIC QUERY FUNCTIONS -- //

    pub fn nodes(&self) -> usize {
        self.comm.rows()
    }

    pub fn partitions(&self) -> usize {
        self.owners.len()
    }

    /// The node that owns partition `p` after the rebalance.
    pub fn owner(&self, p: usize) -> usize {
        self.owners[p]
    }

    pub fn owners(&self) -> &[usize] {
        &self.owners
    }

    /// Directed node-to-node transfer volumes; the diagonal is always 0.
    pub fn comm(&self) -> &Grid<u64> {
        &self.comm
    }

    /// The optimal max-sent-or-received objective.
    pub fn bottleneck(&self) -> f64 {
        self.bottleneck
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Volume that stays on the node already holding it.
    pub fn retained(&self) -> u64 {
        self.retained
    }

    /// Volume that has to cross the network.
    pub fn moved(&self) -> u64 {
        self.total - self.retained
    }

    /// Fraction of data that does not move; an empty matrix counts as
    /// fully local.
    pub fn locality(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.retained as f64 / self.total as f64
        }
    }

    pub fn runtime(&self) -> Duration {
        self.runtime
    }

    /// The ownership as a 0/1 grid, nodes down, partitions across.
    pub fn assignment_grid(&self) -> Grid<u8> {
        let mut grid = Grid::new(self.nodes(), self.partitions());
        for (p, &n) in self.owners.iter().enumerate() {
            grid.set(n, p, 1);
        }
        grid
    }

    pub fn report(&self) -> PlacementReport {
        PlacementReport {
            nodes: self.nodes(),
            partitions: self.partitions(),
            total: self.total,
            retained: self.retained,
            moved: self.moved(),
            locality: self.locality(),
            bottleneck: self.bottleneck,
            solve_secs: self.runtime.as_secs_f64(),
            owners: self.owners.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{interpret, Placement, INTEGRALITY_TOL};
    use crate::error::PlacementError;
    use crate::loads::LoadMatrix;
    use crate::model::PlacementModel;
    use crate::solver::{MilpSolver, SolveOutcome, SolveStatus, Solver};
    use proptest::prelude::*;
    use rstest::rstest;
    use std::time::Duration;

    /// Crafts the outcome a correct solver would return for `owners`.
    fn outcome_for(
        model: &PlacementModel,
        owners: &[usize],
        bottleneck: f64,
    ) -> SolveOutcome {
        let mut values = vec![0.0; model.var_count()];
        for (p, &n) in owners.iter().enumerate() {
            values[model.assign_var(n, p).index()] = 1.0;
        }
        values[model.bottleneck_var().index()] = bottleneck;
        SolveOutcome {
            status: SolveStatus::Optimal,
            objective: Some(bottleneck),
            values: Some(values),
            runtime: Duration::ZERO,
            message: None,
        }
    }

    fn solve_and_interpret(rows: Vec<Vec<u64>>) -> (LoadMatrix, Placement) {
        let loads = LoadMatrix::from_rows(rows).unwrap();
        let model = PlacementModel::build(&loads);
        let outcome = MilpSolver::single_threaded().solve(&model);
        let placement = interpret(&loads, &model, &outcome).unwrap();
        (loads, placement)
    }

    /// Volume node `n` ships out under `owners`, straight from the matrix.
    fn sent(loads: &LoadMatrix, owners: &[usize], n: usize) -> u64 {
        owners
            .iter()
            .enumerate()
            .filter(|&(_, &des)| des != n)
            .map(|(p, _)| loads[n][p])
            .sum()
    }

    /// Volume node `n` pulls in under `owners`.
    fn received(loads: &LoadMatrix, owners: &[usize], n: usize) -> u64 {
        owners
            .iter()
            .enumerate()
            .filter(|&(_, &des)| des == n)
            .map(|(p, _)| loads.remote_load(n, p))
            .sum()
    }

    fn worst_traffic(loads: &LoadMatrix, owners: &[usize]) -> u64 {
        (0..loads.nodes())
            .map(|n| sent(loads, owners, n).max(received(loads, owners, n)))
            .max()
            .unwrap()
    }

    /// Exhaustive minimum of the bottleneck over every assignment.
    fn brute_force_bottleneck(loads: &LoadMatrix) -> u64 {
        let nodes = loads.nodes();
        let partitions = loads.partitions();
        let mut owners = vec![0usize; partitions];
        let mut best = u64::MAX;
        loop {
            best = best.min(worst_traffic(loads, &owners));
            let mut p = 0;
            loop {
                if p == partitions {
                    return best;
                }
                owners[p] += 1;
                if owners[p] < nodes {
                    break;
                }
                owners[p] = 0;
                p += 1;
            }
        }
    }

    #[test]
    fn rejects_non_optimal_status() {
        let loads = LoadMatrix::from_rows(vec![vec![5], vec![3]]).unwrap();
        let model = PlacementModel::build(&loads);
        let outcome = SolveOutcome {
            status: SolveStatus::Infeasible,
            objective: None,
            values: None,
            runtime: Duration::ZERO,
            message: None,
        };
        assert!(matches!(
            interpret(&loads, &model, &outcome),
            Err(PlacementError::NotOptimal {
                status: SolveStatus::Infeasible
            })
        ));
    }

    #[test]
    fn rejects_optimal_outcome_without_values() {
        let loads = LoadMatrix::from_rows(vec![vec![5], vec![3]]).unwrap();
        let model = PlacementModel::build(&loads);
        let outcome = SolveOutcome {
            status: SolveStatus::Optimal,
            objective: Some(3.0),
            values: None,
            runtime: Duration::ZERO,
            message: None,
        };
        assert!(matches!(
            interpret(&loads, &model, &outcome),
            Err(PlacementError::MissingValues)
        ));
    }

    #[test]
    fn rejects_fractional_assignment_variables() {
        let loads = LoadMatrix::from_rows(vec![vec![5], vec![3]]).unwrap();
        let model = PlacementModel::build(&loads);
        let mut outcome = outcome_for(&model, &[0], 3.0);
        outcome.values.as_mut().unwrap()[model.assign_var(1, 0).index()] = 0.5;
        assert!(matches!(
            interpret(&loads, &model, &outcome),
            Err(PlacementError::NonIntegral {
                node: 1,
                partition: 0,
                ..
            })
        ));
    }

    #[test]
    fn rejects_doubly_owned_partition() {
        let loads = LoadMatrix::from_rows(vec![vec![5], vec![3]]).unwrap();
        let model = PlacementModel::build(&loads);
        let mut outcome = outcome_for(&model, &[0], 3.0);
        outcome.values.as_mut().unwrap()[model.assign_var(1, 0).index()] = 1.0;
        assert!(matches!(
            interpret(&loads, &model, &outcome),
            Err(PlacementError::OwnershipViolation {
                partition: 0,
                owners: 2
            })
        ));
    }

    #[test]
    fn rejects_unowned_partition() {
        let loads = LoadMatrix::from_rows(vec![vec![5, 1], vec![3, 2]]).unwrap();
        let model = PlacementModel::build(&loads);
        let mut outcome = outcome_for(&model, &[0, 1], 3.0);
        outcome.values.as_mut().unwrap()[model.assign_var(1, 1).index()] = 0.0;
        assert!(matches!(
            interpret(&loads, &model, &outcome),
            Err(PlacementError::OwnershipViolation {
                partition: 1,
                owners: 0
            })
        ));
    }

    #[test]
    fn tolerates_near_integral_values() {
        let loads = LoadMatrix::from_rows(vec![vec![5], vec![3]]).unwrap();
        let model = PlacementModel::build(&loads);
        let mut outcome = outcome_for(&model, &[0], 3.0);
        let values = outcome.values.as_mut().unwrap();
        values[model.assign_var(0, 0).index()] = 1.0 - INTEGRALITY_TOL / 2.0;
        values[model.assign_var(1, 0).index()] = INTEGRALITY_TOL / 2.0;
        let placement = interpret(&loads, &model, &outcome).unwrap();
        assert_eq!(placement.owner(0), 0);
    }

    #[rstest]
    #[case::identity_is_free(vec![vec![10, 0], vec![0, 10]], 0.0, 1.0)]
    #[case::swap_is_free(vec![vec![0, 10], vec![10, 0]], 0.0, 1.0)]
    #[case::single_partition(vec![vec![5], vec![3]], 3.0, 5.0 / 8.0)]
    #[case::single_node(vec![vec![7, 0, 2]], 0.0, 1.0)]
    fn scenario_bottleneck_and_locality(
        #[case] rows: Vec<Vec<u64>>,
        #[case] expected_w: f64,
        #[case] expected_locality: f64,
    ) {
        let (_, placement) = solve_and_interpret(rows);
        assert!((placement.bottleneck() - expected_w).abs() < 1e-6);
        assert!((placement.locality() - expected_locality).abs() < 1e-9);
    }

    #[test]
    fn identity_scenario_keeps_data_in_place() {
        let (_, placement) = solve_and_interpret(vec![vec![10, 0], vec![0, 10]]);
        assert_eq!(placement.owners(), &[0, 1]);
        assert_eq!(placement.moved(), 0);
        for row in placement.comm().iter_rows() {
            assert!(row.iter().all(|&v| v == 0));
        }
    }

    #[test]
    fn swap_scenario_moves_ownership_but_no_data() {
        let (_, placement) = solve_and_interpret(vec![vec![0, 10], vec![10, 0]]);
        assert_eq!(placement.owners(), &[1, 0]);
        assert_eq!(placement.moved(), 0);
        for row in placement.comm().iter_rows() {
            assert!(row.iter().all(|&v| v == 0));
        }
    }

    #[test]
    fn lone_partition_goes_to_the_heavier_holder() {
        let (_, placement) = solve_and_interpret(vec![vec![5], vec![3]]);
        assert_eq!(placement.owners(), &[0]);
        assert_eq!(*placement.comm().get(1, 0), 3);
        assert_eq!(*placement.comm().get(0, 1), 0);
        assert_eq!(placement.moved(), 3);
    }

    #[test]
    fn single_node_never_pays_traffic() {
        let (_, placement) = solve_and_interpret(vec![vec![9, 4, 0]]);
        assert_eq!(placement.owners(), &[0, 0, 0]);
        assert!(placement.bottleneck().abs() < 1e-6);
        assert_eq!(placement.moved(), 0);
    }

    #[test]
    fn empty_matrix_is_fully_local() {
        let (_, placement) = solve_and_interpret(vec![vec![0, 0], vec![0, 0]]);
        assert!((placement.locality() - 1.0).abs() < f64::EPSILON);
        assert!(placement.bottleneck().abs() < 1e-6);
    }

    #[test]
    fn assignment_grid_marks_each_owner_once() {
        let (_, placement) = solve_and_interpret(vec![vec![10, 0], vec![0, 10]]);
        let grid = placement.assignment_grid();
        assert_eq!(grid.to_string(), "1,0\n0,1\n");
    }

    #[test]
    fn report_mirrors_the_placement() {
        let (_, placement) = solve_and_interpret(vec![vec![5], vec![3]]);
        let report = placement.report();
        assert_eq!(report.nodes, 2);
        assert_eq!(report.partitions, 1);
        assert_eq!(report.total, 8);
        assert_eq!(report.retained, 5);
        assert_eq!(report.moved, 3);
        assert_eq!(report.owners, vec![0]);
        assert!((report.bottleneck - 3.0).abs() < 1e-6);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn solved_placements_satisfy_the_model(
            nodes in 1usize..=3,
            partitions in 1usize..=4,
            cells in prop::collection::vec(0u64..=20, 12),
        ) {
            let rows: Vec<Vec<u64>> = (0..nodes)
                .map(|n| (0..partitions).map(|p| cells[n * 4 + p]).collect())
                .collect();
            let loads = LoadMatrix::from_rows(rows).unwrap();
            let model = PlacementModel::build(&loads);
            let outcome = MilpSolver::single_threaded().solve(&model);
            prop_assert_eq!(outcome.status, SolveStatus::Optimal);
            let placement = interpret(&loads, &model, &outcome).unwrap();

            let w = placement.bottleneck();
            prop_assert!(placement.locality() >= 0.0);
            prop_assert!(placement.locality() <= 1.0);

            // w bounds both directions on every node, re-derived from the
            // matrix rather than the solver's bookkeeping
            for n in 0..loads.nodes() {
                let s = sent(&loads, placement.owners(), n) as f64;
                let r = received(&loads, placement.owners(), n) as f64;
                prop_assert!(w >= s - 1e-6);
                prop_assert!(w >= r - 1e-6);
            }

            // and is tight: the worst node attains it
            let worst = worst_traffic(&loads, placement.owners()) as f64;
            prop_assert!((w - worst).abs() < 1e-6);

            // the solver found a true optimum
            let best = brute_force_bottleneck(&loads) as f64;
            prop_assert!((w - best).abs() < 1e-6);

            // conservation: traffic sums to exactly the moved volume
            let mut shipped = 0u64;
            for (i, row) in placement.comm().iter_rows().enumerate() {
                prop_assert_eq!(row[i], 0);
                shipped += row.iter().sum::<u64>();
            }
            prop_assert_eq!(shipped, placement.moved());
        }
    }
}
