//! Parity encoder
//!
//! Applies the bottom M rows of the generator matrix to the data rows
//! of a stripe. The inner loop is a byte-wise XOR against one hoisted
//! coefficient per (parity row, data row) pair, which the compiler can
//! vectorize freely.

use crate::ec::field::galois;
use crate::ec::matrix::GeneratorMatrix;
use crate::ec::stripe::StripeBuffer;

/// Computes parity rows for stripes encoded with a given matrix.
pub struct ParityEncoder<'a> {
    matrix: &'a GeneratorMatrix,
}

impl<'a> ParityEncoder<'a> {
    pub fn new(matrix: &'a GeneratorMatrix) -> Self {
        ParityEncoder { matrix }
    }

    /// Fill the parity rows of `stripe` from its data rows.
    pub fn encode_block(&self, stripe: &mut StripeBuffer) {
        let gf = galois();
        let num_data = self.matrix.num_data();
        let row_len = stripe.row_len();
        let (data, parity) = stripe.split_data_mut(num_data);

        for p in 0..self.matrix.num_parity() {
            let out = &mut parity[p * row_len..(p + 1) * row_len];
            out.fill(0);
            for col in 0..num_data {
                let coef = self.matrix.coef(num_data + p, col);
                let src = &data[col * row_len..(col + 1) * row_len];
                for (acc, &byte) in out.iter_mut().zip(src) {
                    *acc ^= gf.mult(byte, coef);
                }
            }
        }
    }

    /// Single-stripe variant: `column` holds one byte per shard, the
    /// first N entries are data and the last M receive parity.
    pub fn encode_column(&self, column: &mut [u8]) {
        let gf = galois();
        let num_data = self.matrix.num_data();
        let (data, parity) = column.split_at_mut(num_data);

        for (p, out) in parity.iter_mut().enumerate() {
            let mut acc = 0u8;
            for (col, &byte) in data.iter().enumerate() {
                acc ^= gf.mult(byte, self.matrix.coef(num_data + p, col));
            }
            *out = acc;
        }
    }
}
