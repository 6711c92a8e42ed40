//! Dense simplex tableau.
//!
//! Stores `B^-1 [A | slacks | artificials]` row-major together with the
//! transformed right-hand side `B^-1 b` and the basic column of each row.

/// Dense tableau with basis bookkeeping.
#[derive(Debug, Clone)]
pub(crate) struct Tableau {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
    rhs: Vec<f64>,
    basis: Vec<usize>,
    scratch: Vec<f64>,
}

impl Tableau {
    /// All-zero tableau of the given shape; basis entries are placeholders.
    pub(crate) fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
            rhs: vec![0.0; rows],
            basis: vec![0; rows],
            scratch: vec![0.0; cols],
        }
    }

    pub(crate) fn num_rows(&self) -> usize {
        self.rows
    }

    pub(crate) fn num_cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub(crate) fn get(&self, r: usize, c: usize) -> f64 {
        self.data[r * self.cols + c]
    }

    #[inline]
    pub(crate) fn add(&mut self, r: usize, c: usize, v: f64) {
        self.data[r * self.cols + c] += v;
    }

    #[inline]
    pub(crate) fn row(&self, r: usize) -> &[f64] {
        &self.data[r * self.cols..(r + 1) * self.cols]
    }

    /// Multiply row `r` (including its rhs) by `factor`.
    pub(crate) fn scale_row(&mut self, r: usize, factor: f64) {
        for v in &mut self.data[r * self.cols..(r + 1) * self.cols] {
            *v *= factor;
        }
        self.rhs[r] *= factor;
    }

    pub(crate) fn rhs(&self) -> &[f64] {
        &self.rhs
    }

    pub(crate) fn rhs_mut(&mut self) -> &mut [f64] {
        &mut self.rhs
    }

    pub(crate) fn basis(&self) -> &[usize] {
        &self.basis
    }

    pub(crate) fn set_basic(&mut self, r: usize, c: usize) {
        self.basis[r] = c;
    }

    /// Append `extra` all-zero columns on the right.
    pub(crate) fn add_columns(&mut self, extra: usize) {
        if extra == 0 {
            return;
        }
        let cols = self.cols + extra;
        let mut data = vec![0.0; self.rows * cols];
        for r in 0..self.rows {
            data[r * cols..r * cols + self.cols].copy_from_slice(self.row(r));
        }
        self.data = data;
        self.cols = cols;
        self.scratch = vec![0.0; cols];
    }

    /// Append a row that is already expressed in the current basis, with
    /// `basic` as its basic column.
    pub(crate) fn push_row(&mut self, row: &[f64], rhs: f64, basic: usize) {
        debug_assert_eq!(row.len(), self.cols);
        self.data.extend_from_slice(row);
        self.rhs.push(rhs);
        self.basis.push(basic);
        self.rows += 1;
    }

    /// Pivot on element `(pr, pc)`: column `pc` becomes basic in row `pr`.
    pub(crate) fn pivot(&mut self, pr: usize, pc: usize) {
        let cols = self.cols;
        let p = self.data[pr * cols + pc];
        debug_assert!(p != 0.0, "pivot on zero element");

        self.scale_row(pr, 1.0 / p);
        self.data[pr * cols + pc] = 1.0;

        self.scratch
            .copy_from_slice(&self.data[pr * cols..(pr + 1) * cols]);
        let pivot_rhs = self.rhs[pr];

        for r in 0..self.rows {
            if r == pr {
                continue;
            }
            let f = self.data[r * cols + pc];
            if f == 0.0 {
                continue;
            }
            let row = &mut self.data[r * cols..(r + 1) * cols];
            for (v, &pv) in row.iter_mut().zip(&self.scratch) {
                *v -= f * pv;
            }
            row[pc] = 0.0;
            self.rhs[r] -= f * pivot_rhs;
        }

        self.basis[pr] = pc;
    }
}
