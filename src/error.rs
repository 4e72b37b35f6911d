use crate::solver::SolveStatus;
use thiserror::Error;

/// Failure classes for the placement pipeline. Configuration problems are
/// raised before any model is built; solver and integrality problems are
/// reported as-is, never repaired.
#[derive(Debug, Error)]
pub enum PlacementError {
    #[error("failed to read load matrix {path}: {source}")]
    MatrixRead {
        path: String,
        source: std::io::Error,
    },

    #[error("node and partition counts must both be at least 1 (nodes={nodes}, partitions={partitions})")]
    EmptyDimensions { nodes: usize, partitions: usize },

    #[error("load matrix row {row} has {found} fields, expected {expected}")]
    RaggedRow {
        row: usize,
        found: usize,
        expected: usize,
    },

    #[error("load matrix has {found} rows, expected {expected}")]
    RowCountMismatch { found: usize, expected: usize },

    #[error("load matrix field at row {row}, column {col} is not numeric: {field:?}")]
    BadField {
        row: usize,
        col: usize,
        field: String,
    },

    #[error("negative load at row {row}, column {col}")]
    NegativeLoad { row: usize, col: usize },

    #[error("solver finished with status {status:?}, no placement produced")]
    NotOptimal { status: SolveStatus },

    #[error("solver returned no variable values despite an optimal status")]
    MissingValues,

    #[error("assignment variable for node {node}, partition {partition} is {value}, neither 0 nor 1")]
    NonIntegral {
        node: usize,
        partition: usize,
        value: f64,
    },

    #[error("partition {partition} resolved to {owners} owning nodes, expected exactly 1")]
    OwnershipViolation { partition: usize, owners: usize },
}
