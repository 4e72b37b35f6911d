use std::fmt;

/**
 * Row-major 2D container with runtime-checked dimensions.
 *
 * Backs both the input load matrix and the derived communication matrix,
 * so the cells stay in one flat allocation and every access is bounds-
 * checked against the declared shape.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid<T> {
    rows: usize,
    cols: usize,
    cells: Vec<T>,
}

impl<T: Default + Clone> Grid<T> {
    pub fn new(rows: usize, cols: usize) -> Self {
        if rows < 1 || cols < 1 {
            panic!("empty grid! (rows: {}, cols: {})", rows, cols);
        }
        Self {
            rows,
            cols,
            cells: vec![T::default(); rows * cols],
        }
    }

    /// Builds a grid from row vectors, or `None` if any row is ragged.
    pub fn from_rows(rows: Vec<Vec<T>>) -> Option<Self> {
        let num_rows = rows.len();
        let num_cols = rows.first().map(|r| r.len())?;
        if num_rows < 1 || num_cols < 1 {
            return None;
        }
        let mut cells = Vec::with_capacity(num_rows * num_cols);
        for row in rows {
            if row.len() != num_cols {
                return None;
            }
            cells.extend(row);
        }
        Some(Self {
            rows: num_rows,
            cols: num_cols,
            cells,
        })
    }

    // -- PUBLIC QUERY FUNCTIONS -- //

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> &T {
        &self[row][col]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[T]> {
        self.cells.chunks(self.cols)
    }

    // -- PUBLIC MODIFIER FUNCTIONS -- //

    pub fn set(&mut self, row: usize, col: usize, value: T) {
        self[row][col] = value;
    }
}

impl<T> core::ops::Index<usize> for Grid<T> {
    type Output = [T];

    fn index(&self, index: usize) -> &Self::Output {
        if index >= self.rows {
            panic!("Out of bounds! (row: {} > rows: {})", index, self.rows);
        }
        let p = index * self.cols;
        &self.cells[p..p + self.cols]
    }
}

impl<T> core::ops::IndexMut<usize> for Grid<T> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        if index >= self.rows {
            panic!("Out of bounds! (row: {} > rows: {})", index, self.rows);
        }
        let p = index * self.cols;
        &mut self.cells[p..p + self.cols]
    }
}

/**
 * CSV-style rendering: one line per row, comma-separated fields, a
 * trailing newline after every row.
 */
impl<T: fmt::Display> fmt::Display for Grid<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for r in 0..self.rows {
            let base = r * self.cols;
            for c in 0..self.cols - 1 {
                write!(f, "{},", self.cells[base + c])?;
            }
            writeln!(f, "{}", self.cells[base + self.cols - 1])?;
        }
        Ok(())
    }
}
