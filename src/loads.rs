use crate::error::PlacementError;
use crate::grid::Grid;
use log::debug;
use std::fmt;
use std::fs;
use std::path::Path;

/**
 * The input volume matrix: `h[n][p]` is the amount of data node `n`
 * currently holds for partition `p`.
 *
 * Construction validates the shape (N ≥ 1, P ≥ 1, no ragged rows, no
 * negative fields), so any `LoadMatrix` that exists is rectangular and
 * fully populated. The grand total and per-partition column totals are
 * computed once, up front.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadMatrix {
    grid: Grid<u64>,
    total: u64,
    col_totals: Vec<u64>,
}

impl LoadMatrix {
    /// Builds a matrix from per-node rows. Fails on empty or ragged input.
    pub fn from_rows(rows: Vec<Vec<u64>>) -> Result<Self, PlacementError> {
        let nodes = rows.len();
        let partitions = rows.first().map(|r| r.len()).unwrap_or(0);
        if nodes < 1 || partitions < 1 {
            return Err(PlacementError::EmptyDimensions { nodes, partitions });
        }
        for (n, row) in rows.iter().enumerate() {
            if row.len() != partitions {
                return Err(PlacementError::RaggedRow {
                    row: n,
                    found: row.len(),
                    expected: partitions,
                });
            }
        }

        let grid = Grid::from_rows(rows).expect("rows checked rectangular");
        let mut col_totals = vec![0u64; partitions];
        let mut total = 0u64;
        for row in grid.iter_rows() {
            for (p, &h) in row.iter().enumerate() {
                col_totals[p] += h;
                total += h;
            }
        }

        Ok(Self {
            grid,
            total,
            col_totals,
        })
    }

    /**
     * Reads a comma-separated matrix file: one line per node, one field
     * per partition. Fields parse as numeric and fractional values are
     * truncated to integer loads. The declared `nodes` x `partitions`
     * shape must match the file contents exactly.
     */
    pub fn from_csv(
        path: &Path,
        nodes: usize,
        partitions: usize,
    ) -> Result<Self, PlacementError> {
        if nodes < 1 || partitions < 1 {
            return Err(PlacementError::EmptyDimensions { nodes, partitions });
        }
        let text = fs::read_to_string(path).map_err(|source| PlacementError::MatrixRead {
            path: path.display().to_string(),
            source,
        })?;

        let mut rows: Vec<Vec<u64>> = Vec::with_capacity(nodes);
        for (n, line) in text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .enumerate()
        {
            let mut row = Vec::with_capacity(partitions);
            for (p, field) in line.split(',').enumerate() {
                let value: f64 =
                    field
                        .trim()
                        .parse()
                        .map_err(|_| PlacementError::BadField {
                            row: n,
                            col: p,
                            field: field.trim().to_string(),
                        })?;
                if !value.is_finite() {
                    return Err(PlacementError::BadField {
                        row: n,
                        col: p,
                        field: field.trim().to_string(),
                    });
                }
                if value < 0.0 {
                    return Err(PlacementError::NegativeLoad { row: n, col: p });
                }
                row.push(value.trunc() as u64);
            }
            if row.len() != partitions {
                return Err(PlacementError::RaggedRow {
                    row: n,
                    found: row.len(),
                    expected: partitions,
                });
            }
            rows.push(row);
        }
        if rows.len() != nodes {
            return Err(PlacementError::RowCountMismatch {
                found: rows.len(),
                expected: nodes,
            });
        }

        let loads = Self::from_rows(rows)?;
        debug!(
            "read load matrix from {}: {} nodes, {} partitions, total volume {}",
            path.display(),
            loads.nodes(),
            loads.partitions(),
            loads.total()
        );
        Ok(loads)
    }

    // -- PUBLIC QUERY FUNCTIONS -- //

    pub fn nodes(&self) -> usize {
        self.grid.rows()
    }

    pub fn partitions(&self) -> usize {
        self.grid.cols()
    }

    /// Volume node `n` holds for partition `p`.
    pub fn load(&self, n: usize, p: usize) -> u64 {
        *self.grid.get(n, p)
    }

    /// Sum of all loads across the matrix.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Sum of partition `p`'s load across every node.
    pub fn partition_total(&self, p: usize) -> u64 {
        self.col_totals[p]
    }

    /// Partition `p`'s load on every node other than `n`.
    pub fn remote_load(&self, n: usize, p: usize) -> u64 {
        self.col_totals[p] - self.load(n, p)
    }
}

impl core::ops::Index<usize> for LoadMatrix {
    type Output = [u64];

    fn index(&self, node: usize) -> &Self::Output {
        &self.grid[node]
    }
}

impl fmt::Display for LoadMatrix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.grid)
    }
}
