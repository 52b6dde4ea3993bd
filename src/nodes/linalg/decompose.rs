//! Gaussian elimination kernels shared by the linear algebra nodes

use ndarray::{Array2, Axis};

use crate::error::{NodeError, NodeResult};

/// LU factorisation with partial pivoting, `P A = L U`.
///
/// `L` (unit diagonal) and `U` share one matrix; `permutation[i]` is the
/// source row of row `i`. Only an exactly zero or non-finite pivot makes the
/// factorisation singular, so badly scaled but invertible matrices still solve.
#[derive(Debug, Clone)]
pub struct LuDecomposition {
    lu: Array2<f64>,
    permutation: Vec<usize>,
    swaps: usize,
    singular: bool,
}

impl LuDecomposition {
    pub fn new(matrix: &Array2<f64>) -> NodeResult<Self> {
        let n = matrix.nrows();
        if n != matrix.ncols() {
            return Err(NodeError::InvalidShape(format!(
                "expected a square matrix, got shape ({}, {})",
                n,
                matrix.ncols()
            )));
        }

        let mut lu = matrix.clone();
        let mut permutation: Vec<usize> = (0..n).collect();
        let mut swaps = 0;
        let mut singular = false;

        for k in 0..n {
            let (pivot_row, pivot) = pivot_in_column(&lu, k, k);
            if pivot == 0.0 || !pivot.is_finite() {
                singular = true;
                continue;
            }
            if pivot_row != k {
                swap_rows(&mut lu, k, pivot_row);
                permutation.swap(k, pivot_row);
                swaps += 1;
            }
            for r in k + 1..n {
                let factor = lu[[r, k]] / lu[[k, k]];
                lu[[r, k]] = factor;
                for c in k + 1..n {
                    lu[[r, c]] -= factor * lu[[k, c]];
                }
            }
        }

        Ok(Self {
            lu,
            permutation,
            swaps,
            singular,
        })
    }

    pub fn is_singular(&self) -> bool {
        self.singular
    }

    /// Product of the pivots, signed by the row swaps
    pub fn determinant(&self) -> f64 {
        let sign = if self.swaps % 2 == 0 { 1.0 } else { -1.0 };
        sign * self.lu.diag().iter().product::<f64>()
    }

    /// Solve `A X = B` column by column
    pub fn solve(&self, rhs: &Array2<f64>) -> NodeResult<Array2<f64>> {
        let n = self.lu.nrows();
        if rhs.nrows() != n {
            return Err(NodeError::ShapeMismatch(format!(
                "right-hand side has {} rows, matrix has {}",
                rhs.nrows(),
                n
            )));
        }
        if self.singular {
            return Err(NodeError::SingularMatrix);
        }

        let mut solution = rhs.select(Axis(0), &self.permutation);
        for mut column in solution.columns_mut() {
            for i in 0..n {
                let mut sum = column[i];
                for j in 0..i {
                    sum -= self.lu[[i, j]] * column[j];
                }
                column[i] = sum;
            }
            for i in (0..n).rev() {
                let mut sum = column[i];
                for j in i + 1..n {
                    sum -= self.lu[[i, j]] * column[j];
                }
                column[i] = sum / self.lu[[i, i]];
            }
        }
        Ok(solution)
    }

    pub fn inverse(&self) -> NodeResult<Array2<f64>> {
        self.solve(&Array2::eye(self.lu.nrows()))
    }
}

/// Row at or below `start` with the largest magnitude in `col`
fn pivot_in_column(matrix: &Array2<f64>, start: usize, col: usize) -> (usize, f64) {
    (start..matrix.nrows())
        .map(|r| (r, matrix[[r, col]].abs()))
        .fold((start, f64::NEG_INFINITY), |best, candidate| {
            if candidate.1 > best.1 {
                candidate
            } else {
                best
            }
        })
}

fn swap_rows(matrix: &mut Array2<f64>, a: usize, b: usize) {
    if a == b {
        return;
    }
    for c in 0..matrix.ncols() {
        matrix.swap([a, c], [b, c]);
    }
}
