use crate::grid::Grid;
use crate::loads::LoadMatrix;
use log::debug;

/// Opaque handle to one decision variable inside a [`PlacementModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VarId(usize);

impl VarId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VarKind {
    Binary,
    Continuous { lower: f64, upper: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    Le,
    Ge,
    Eq,
}

/// One named linear constraint: `Σ coeff·var  (≤ | ≥ | =)  rhs`.
#[derive(Debug, Clone)]
pub struct Constraint {
    pub name: String,
    pub terms: Vec<(VarId, f64)>,
    pub sense: Sense,
    pub rhs: f64,
}

/**
 * The min-max placement program built from a load matrix.
 *
 * Variables: a binary `x[n][p]` for every node/partition pair (1 iff
 * partition `p` lands on node `n`), plus one continuous bottleneck
 * variable `w` in `[0, total]`. The objective minimizes `w`.
 *
 * Constraints, for every node `n`:
 *
 *   sent_n:      w ≥ Σ_p h[n][p]·(1 − x[n][p])
 *   received_n:  w ≥ Σ_p x[n][p]·(Σ_{k≠n} h[k][p])
 *
 * and for every partition `p` the uniqueness row `Σ_n x[n][p] = 1`.
 * The sent row is stored in moved form, `w + Σ_p h[n][p]·x[n][p] ≥ Σ_p
 * h[n][p]`, so every constraint is a plain term-list against a constant.
 *
 * The model owns nothing but these definitions; solving is somebody
 * else's job.
 */
#[derive(Debug, Clone)]
pub struct PlacementModel {
    nodes: usize,
    partitions: usize,
    total: u64,
    vars: Vec<VarKind>,
    assign: Grid<VarId>,
    bottleneck: VarId,
    objective: Vec<(VarId, f64)>,
    constraints: Vec<Constraint>,
}

impl PlacementModel {
    /**
     * Builds the complete program for `loads`. The matrix is already
     * shape-checked by its constructors, so building cannot fail; a zero
     * total simply collapses `w`'s domain to `[0, 0]`.
     */
    pub fn build(loads: &LoadMatrix) -> Self {
        let nodes = loads.nodes();
        let partitions = loads.partitions();
        let total = loads.total();

        let mut vars = Vec::with_capacity(nodes * partitions + 1);
        let mut assign = Grid::new(nodes, partitions);
        for n in 0..nodes {
            for p in 0..partitions {
                assign.set(n, p, VarId(vars.len()));
                vars.push(VarKind::Binary);
            }
        }
        let bottleneck = VarId(vars.len());
        vars.push(VarKind::Continuous {
            lower: 0.0,
            upper: total as f64,
        });

        let mut constraints = Vec::with_capacity(2 * nodes + partitions);
        for n in 0..nodes {
            // w + Σ_p h[n][p]·x[n][p] ≥ Σ_p h[n][p]
            let mut sent = vec![(bottleneck, 1.0)];
            let mut held = 0u64;
            for p in 0..partitions {
                let h = loads.load(n, p);
                if h > 0 {
                    sent.push((*assign.get(n, p), h as f64));
                    held += h;
                }
            }
            constraints.push(Constraint {
                name: format!("sent_{}", n),
                terms: sent,
                sense: Sense::Ge,
                rhs: held as f64,
            });

            // w − Σ_p (Σ_{k≠n} h[k][p])·x[n][p] ≥ 0
            let mut received = vec![(bottleneck, 1.0)];
            for p in 0..partitions {
                let remote = loads.remote_load(n, p);
                if remote > 0 {
                    received.push((*assign.get(n, p), -(remote as f64)));
                }
            }
            constraints.push(Constraint {
                name: format!("received_{}", n),
                terms: received,
                sense: Sense::Ge,
                rhs: 0.0,
            });
        }

        for p in 0..partitions {
            let terms = (0..nodes).map(|n| (*assign.get(n, p), 1.0)).collect();
            constraints.push(Constraint {
                name: format!("unique_{}", p),
                terms,
                sense: Sense::Eq,
                rhs: 1.0,
            });
        }

        debug!(
            "built placement model: {} vars, {} constraints, total volume {}",
            vars.len(),
            constraints.len(),
            total
        );

        Self {
            nodes,
            partitions,
            total,
            vars,
            assign,
            bottleneck,
            objective: vec![(bottleneck, 1.0)],
            constraints,
        }
    }

    // -- PUBLIC QUERY FUNCTIONS -- //

    pub fn nodes(&self) -> usize {
        self.nodes
    }

    pub fn partitions(&self) -> usize {
        self.partitions
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn var_kinds(&self) -> &[VarKind] {
        &self.vars
    }

    pub fn var_count(&self) -> usize {
        self.vars.len()
    }

    /// The binary assignment variable for node `n`, partition `p`.
    pub fn assign_var(&self, n: usize, p: usize) -> VarId {
        *self.assign.get(n, p)
    }

    /// The continuous bottleneck variable `w`.
    pub fn bottleneck_var(&self) -> VarId {
        self.bottleneck
    }

    /// Objective terms, to be minimized.
    pub fn objective(&self) -> &[(VarId, f64)] {
        &self.objective
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }
}
