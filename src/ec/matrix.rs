//! Generator matrix construction
//!
//! The generator matrix D has N+M rows of N coefficients: the top N
//! rows form the identity (data shards carry the input verbatim) and
//! the bottom M rows are full-rank parity combinations with the
//! property that any N rows drawn from D stay linearly independent.
//!
//! Construction starts from a Vandermonde-like base, which has the
//! independence property but not a systematic top, and reduces the top
//! into the identity with elementary column operations applied to all
//! N+M rows. The reduction order is fixed (ascending pivot scan, lowest
//! candidate column on a swap) so that two runs over the same shape
//! produce identical coefficients and therefore identical shard bytes.

use crate::diag;
use crate::ec::field::galois;
use crate::error::{Error, Result};

/// Hard cap on data + parity rows. The field would allow 255; 250
/// keeps two hex digits per shard suffix with headroom.
pub const MAX_TOTAL_SHARDS: usize = 250;

/// Per-kind cap implied by the total and the 1-minimum of the other kind.
pub const MAX_DATA_SHARDS: usize = MAX_TOTAL_SHARDS - 1;
pub const MAX_PARITY_SHARDS: usize = MAX_TOTAL_SHARDS - 1;

/// The (N+M) x N generator matrix with per-row liveness flags.
///
/// Rows are marked failed as shards turn out to be missing or invalid;
/// the recovery planner consults [`GeneratorMatrix::failed`] when it
/// assembles the survivor submatrix.
#[derive(Debug)]
pub struct GeneratorMatrix {
    num_data: usize,
    num_parity: usize,
    /// row-major, total_rows() * num_data coefficients
    cells: Vec<u8>,
    alive: Vec<bool>,
}

impl GeneratorMatrix {
    /// Build the systematic generator matrix for `num_data` + `num_parity`
    /// shards.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when either count is out of [1, 249] or the sum
    /// exceeds 250; `InternalInvariant` if the reduced matrix fails its
    /// post-conditions.
    pub fn new(num_data: usize, num_parity: usize) -> Result<Self> {
        if num_data == 0 || num_data > MAX_DATA_SHARDS {
            return Err(Error::InvalidArgument(format!(
                "number of data files must be between 1 and {MAX_DATA_SHARDS}, got {num_data}"
            )));
        }
        if num_parity == 0 || num_parity > MAX_PARITY_SHARDS {
            return Err(Error::InvalidArgument(format!(
                "number of parity files must be between 1 and {MAX_PARITY_SHARDS}, got {num_parity}"
            )));
        }
        let rows = num_data + num_parity;
        if rows > MAX_TOTAL_SHARDS {
            return Err(Error::InvalidArgument(format!(
                "data + parity files must not exceed {MAX_TOTAL_SHARDS}, got {rows}"
            )));
        }

        let mut matrix = GeneratorMatrix {
            num_data,
            num_parity,
            cells: vec![0u8; rows * num_data],
            alive: vec![true; rows],
        };
        matrix.fill_vandermonde();
        if diag::enabled() {
            diag::dump_matrix("Vandermonde", rows, num_data, &|r, c| matrix.coef(r, c));
        }
        matrix.reduce_systematic()?;
        if diag::enabled() {
            diag::dump_matrix("Parity", rows, num_data, &|r, c| matrix.coef(r, c));
        }
        matrix.check_systematic()?;
        Ok(matrix)
    }

    /// Number of data rows (N).
    pub fn num_data(&self) -> usize {
        self.num_data
    }

    /// Number of parity rows (M).
    pub fn num_parity(&self) -> usize {
        self.num_parity
    }

    /// Total rows (N+M).
    pub fn total_rows(&self) -> usize {
        self.num_data + self.num_parity
    }

    /// Coefficient at (row, col).
    #[inline]
    pub fn coef(&self, row: usize, col: usize) -> u8 {
        self.cells[row * self.num_data + col]
    }

    /// One full row of coefficients.
    pub fn row(&self, row: usize) -> &[u8] {
        &self.cells[row * self.num_data..(row + 1) * self.num_data]
    }

    /// Mark a shard row (data or parity) as failed.
    pub fn mark_failed(&mut self, row: usize) {
        self.alive[row] = false;
    }

    /// Liveness of a row; the authoritative input to recovery planning.
    pub fn failed(&self, row: usize) -> bool {
        !self.alive[row]
    }

    /// Count of rows still alive.
    pub fn alive_rows(&self) -> usize {
        self.alive.iter().filter(|&&a| a).count()
    }

    #[inline]
    fn set(&mut self, row: usize, col: usize, value: u8) {
        self.cells[row * self.num_data + col] = value;
    }

    /// The Vandermonde-like base: row 0 is e_0, row 1 is all ones, row
    /// r >= 2 holds the powers 1, r, r^2, ...
    fn fill_vandermonde(&mut self) {
        let gf = galois();
        let rows = self.total_rows();
        self.set(0, 0, 1);
        for col in 0..self.num_data {
            self.set(1, col, 1);
        }
        for row in 2..rows {
            self.set(row, 0, 1);
            if self.num_data > 1 {
                self.set(row, 1, row as u8);
                for col in 2..self.num_data {
                    let value = gf.mult(self.coef(row, col - 1), row as u8);
                    self.set(row, col, value);
                }
            }
        }
    }

    /// Reduce the top N x N into the identity with column operations
    /// applied across all rows, preserving the independence of every
    /// N-row subselection.
    fn reduce_systematic(&mut self) -> Result<()> {
        let gf = galois();
        let n = self.num_data;
        let rows = self.total_rows();

        for row in 1..n {
            // A zero diagonal means the pivot sits in a later column;
            // swap it in. Lowest candidate column wins.
            if self.coef(row, row) == 0 {
                let pivot = (row + 1..n)
                    .find(|&col| self.coef(row, col) != 0)
                    .ok_or_else(|| {
                        Error::InternalInvariant(format!(
                            "no pivot column available for row {row}"
                        ))
                    })?;
                for idx in row..rows {
                    let a = idx * n + row;
                    let b = idx * n + pivot;
                    self.cells.swap(a, b);
                }
            }

            // Scale the row so the diagonal becomes 1
            let diagonal = self.coef(row, row);
            if diagonal != 1 {
                let inv = gf.div(1, diagonal)?;
                for col in 0..n {
                    let value = gf.mult(inv, self.coef(row, col));
                    self.set(row, col, value);
                }
            }

            // Clear the rest of the row by subtracting multiples of the
            // pivot column from every other column. Rows above `row`
            // already have zeros in the pivot column, so starting the
            // sweep at `row` changes nothing they hold.
            for col in 0..n {
                if col == row {
                    continue;
                }
                let factor = self.coef(row, col);
                if factor == 0 {
                    continue;
                }
                for idx in row..rows {
                    let value = self.coef(idx, col) ^ gf.mult(factor, self.coef(idx, row));
                    self.set(idx, col, value);
                }
            }
        }
        Ok(())
    }

    /// Post-conditions: identity on top, no zero coefficient below.
    fn check_systematic(&self) -> Result<()> {
        let n = self.num_data;
        for row in 0..n {
            for col in 0..n {
                let expected = u8::from(row == col);
                if self.coef(row, col) != expected {
                    return Err(Error::InternalInvariant(format!(
                        "top of generator matrix is not the identity at ({row}, {col})"
                    )));
                }
            }
        }
        for row in n..self.total_rows() {
            for col in 0..n {
                if self.coef(row, col) == 0 {
                    return Err(Error::InternalInvariant(format!(
                        "zero parity coefficient at ({row}, {col})"
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_shape_limits() {
        assert_matches!(
            GeneratorMatrix::new(0, 1),
            Err(Error::InvalidArgument(_))
        );
        assert_matches!(
            GeneratorMatrix::new(1, 0),
            Err(Error::InvalidArgument(_))
        );
        assert_matches!(
            GeneratorMatrix::new(250, 1),
            Err(Error::InvalidArgument(_))
        );
        assert_matches!(
            GeneratorMatrix::new(125, 126),
            Err(Error::InvalidArgument(_))
        );
        assert!(GeneratorMatrix::new(125, 125).is_ok());
        assert!(GeneratorMatrix::new(249, 1).is_ok());
        assert!(GeneratorMatrix::new(1, 249).is_ok());
    }

    #[test]
    fn test_single_data_row_parity_is_identity() {
        // With one data row every parity row reduces to [1], so all
        // shards carry the data verbatim.
        let matrix = GeneratorMatrix::new(1, 4).unwrap();
        for row in 0..matrix.total_rows() {
            assert_eq!(matrix.row(row), &[1]);
        }
    }

    #[test]
    fn test_two_data_rows_pinned_coefficients() {
        // Hand-reduced over 0x1d: base rows [1,0],[1,1],[1,2],[1,3]
        // eliminate column 0 against column 1 and become
        // [1,0],[0,1],[3,2],[2,3].
        let matrix = GeneratorMatrix::new(2, 2).unwrap();
        assert_eq!(matrix.row(0), &[1, 0]);
        assert_eq!(matrix.row(1), &[0, 1]);
        assert_eq!(matrix.row(2), &[3, 2]);
        assert_eq!(matrix.row(3), &[2, 3]);
    }

    #[test]
    fn test_systematic_invariants_across_shapes() {
        for (n, m) in [(1, 1), (2, 1), (3, 2), (5, 5), (25, 25), (40, 10)] {
            let matrix = GeneratorMatrix::new(n, m).unwrap();
            for row in 0..n {
                for col in 0..n {
                    assert_eq!(matrix.coef(row, col), u8::from(row == col));
                }
            }
            for row in n..n + m {
                for col in 0..n {
                    assert_ne!(matrix.coef(row, col), 0, "zero at ({row}, {col})");
                }
            }
        }
    }

    #[test]
    fn test_liveness_flags() {
        let mut matrix = GeneratorMatrix::new(3, 2).unwrap();
        assert_eq!(matrix.alive_rows(), 5);
        assert!(!matrix.failed(4));
        matrix.mark_failed(4);
        matrix.mark_failed(0);
        assert!(matrix.failed(0));
        assert!(matrix.failed(4));
        assert!(!matrix.failed(2));
        assert_eq!(matrix.alive_rows(), 3);
    }
}
