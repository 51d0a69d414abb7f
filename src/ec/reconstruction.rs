//! Recovery planning and data reconstruction
//!
//! Given the liveness flags on the generator matrix, the planner picks
//! N surviving rows (a failed data row is replaced by the surviving row
//! with the highest unused index), inverts the resulting N x N
//! submatrix by Gauss-Jordan elimination over the field, and records
//! which shard each surviving row came from. Applying the plan to any
//! stripe rewrites the failed data rows from the survivors; live rows
//! pass through untouched.

use crate::diag;
use crate::ec::field::galois;
use crate::ec::matrix::GeneratorMatrix;
use crate::ec::stripe::StripeBuffer;
use crate::error::{Error, Result};

/// The N x (N+1) recovery plan.
///
/// Columns [0, N) hold the inverse of the survivor submatrix; column N
/// holds, per row, the index of the shard that surviving row came from.
/// For a live data row i the plan row is e_i with provenance i.
#[derive(Debug)]
pub struct RecoveryPlan {
    num_data: usize,
    /// row-major, num_data * (num_data + 1)
    cells: Vec<u8>,
}

impl RecoveryPlan {
    /// Build the plan for the current liveness state of `matrix`.
    ///
    /// # Errors
    ///
    /// `MissingShards` when fewer than N rows are alive,
    /// `MatrixSingular` on a zero pivot, `InternalInvariant` when the
    /// inversion fails its verification.
    pub fn build(matrix: &GeneratorMatrix) -> Result<Self> {
        let n = matrix.num_data();
        let alive = matrix.alive_rows();
        if alive < n {
            return Err(Error::MissingShards {
                available: alive,
                required: n,
            });
        }

        let stride = n + 1;
        let mut cells = vec![0u8; n * stride];
        for i in 0..n {
            cells[i * stride + i] = 1;
        }

        // Survivor submatrix. Replacements for failed rows are drawn
        // from the end of the matrix backward; the scan pointer
        // persists so each surviving row is used at most once.
        let mut tmp = vec![0u8; n * n];
        let mut scan = matrix.total_rows();
        for row in 0..n {
            let source = if matrix.failed(row) {
                loop {
                    if scan == 0 {
                        return Err(Error::InternalInvariant(
                            "replacement scan ran out of surviving rows".to_string(),
                        ));
                    }
                    scan -= 1;
                    if !matrix.failed(scan) {
                        break scan;
                    }
                }
            } else {
                row
            };
            tmp[row * n..(row + 1) * n].copy_from_slice(matrix.row(source));
            cells[row * stride + n] = source as u8;
        }

        if diag::enabled() {
            diag::dump_matrix("Recovery", n, n, &|r, c| tmp[r * n + c]);
        }

        // Lower-triangular elimination: zero everything below the
        // diagonal, working on tmp and the plan in lockstep.
        for col in 0..n.saturating_sub(1) {
            let pivot = tmp[col * n + col];
            if pivot == 0 {
                return Err(Error::MatrixSingular(col));
            }
            for row in col + 1..n {
                let value = tmp[row * n + col];
                if value == 0 {
                    continue;
                }
                let k = galois().div(pivot, value)?;
                scale_row(&mut tmp, n, row, n, k);
                scale_row(&mut cells, stride, row, n, k);
                xor_row(&mut tmp, n, row, col, n);
                xor_row(&mut cells, stride, row, col, n);
            }
        }

        if diag::enabled() {
            diag::dump_matrix("MCO", n, stride, &|r, c| cells[r * stride + c]);
        }

        // Upper-triangular elimination
        for col in 1..n {
            let pivot = tmp[col * n + col];
            if pivot == 0 {
                return Err(Error::MatrixSingular(col));
            }
            for row in 0..col {
                let value = tmp[row * n + col];
                if value == 0 {
                    continue;
                }
                let k = galois().div(pivot, value)?;
                scale_row(&mut tmp, n, row, n, k);
                scale_row(&mut cells, stride, row, n, k);
                xor_row(&mut tmp, n, row, col, n);
                xor_row(&mut cells, stride, row, col, n);
            }
        }

        if diag::enabled() {
            diag::dump_matrix("UT", n, stride, &|r, c| cells[r * stride + c]);
        }

        // Normalize the diagonal to ones
        for row in 0..n {
            let diagonal = tmp[row * n + row];
            if diagonal == 0 {
                return Err(Error::MatrixSingular(row));
            }
            let k = galois().div(1, diagonal)?;
            scale_row(&mut tmp, n, row, n, k);
            scale_row(&mut cells, stride, row, n, k);
        }

        if diag::enabled() {
            diag::dump_matrix("Norm", n, stride, &|r, c| cells[r * stride + c]);
        }

        let plan = RecoveryPlan { num_data: n, cells };
        plan.verify(matrix, &tmp)?;
        Ok(plan)
    }

    /// Number of data rows the plan reconstructs.
    pub fn num_data(&self) -> usize {
        self.num_data
    }

    /// Original shard index the surviving row in position `row` came from.
    #[inline]
    pub fn source(&self, row: usize) -> usize {
        self.cells[row * (self.num_data + 1) + self.num_data] as usize
    }

    #[inline]
    fn coef(&self, row: usize, col: usize) -> u8 {
        self.cells[row * (self.num_data + 1) + col]
    }

    /// Rewrite the failed data rows of `stripe` from the surviving rows.
    pub fn recover_block(&self, stripe: &mut StripeBuffer) {
        let gf = galois();
        let n = self.num_data;
        let mut acc = vec![0u8; stripe.row_len()];

        for row in 0..n {
            if self.source(row) == row {
                continue;
            }
            acc.fill(0);
            for col in 0..n {
                let coef = self.coef(row, col);
                if coef == 0 {
                    continue;
                }
                let src = stripe.row(self.source(col));
                for (a, &byte) in acc.iter_mut().zip(src) {
                    *a ^= gf.mult(coef, byte);
                }
            }
            stripe.row_mut(row).copy_from_slice(&acc);
        }
    }

    /// Single-stripe variant: `column` holds one byte per shard; the
    /// first N entries are rewritten with the recovered data bytes.
    pub fn recover_column(&self, column: &mut [u8]) {
        let gf = galois();
        let n = self.num_data;
        let mut out = vec![0u8; n];
        for (row, cell) in out.iter_mut().enumerate() {
            let mut acc = 0u8;
            for col in 0..n {
                acc ^= gf.mult(self.coef(row, col), column[self.source(col)]);
            }
            *cell = acc;
        }
        column[..n].copy_from_slice(&out);
    }

    /// Sanity check on the finished inversion: tmp and the plan must
    /// commute, and live rows must multiply out to identity rows.
    /// Failed rows carry arbitrary combinations and are exempt.
    fn verify(&self, matrix: &GeneratorMatrix, tmp: &[u8]) -> Result<()> {
        let gf = galois();
        let n = self.num_data;
        for row in 0..n {
            let exempt = matrix.failed(row);
            for col in 0..n {
                let mut a = 0u8;
                let mut b = 0u8;
                for i in 0..n {
                    a ^= gf.mult(tmp[row * n + i], self.coef(i, col));
                    b ^= gf.mult(self.coef(row, i), tmp[i * n + col]);
                }
                if a != b {
                    return Err(Error::InternalInvariant(format!(
                        "recovery products disagree at ({row}, {col})"
                    )));
                }
                if !exempt && a != u8::from(row == col) {
                    return Err(Error::InternalInvariant(format!(
                        "recovery product is not the identity at ({row}, {col})"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Multiply row `row` of a row-major table by `k` across `width` columns.
fn scale_row(cells: &mut [u8], stride: usize, row: usize, width: usize, k: u8) {
    let gf = galois();
    for col in 0..width {
        let i = row * stride + col;
        cells[i] = gf.mult(cells[i], k);
    }
}

/// XOR row `src` into row `dst` across `width` columns.
fn xor_row(cells: &mut [u8], stride: usize, dst: usize, src: usize, width: usize) {
    for col in 0..width {
        cells[dst * stride + col] ^= cells[src * stride + col];
    }
}
