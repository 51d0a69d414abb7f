//! Built-in test
//!
//! Run before normal operation when the `BIT` environment variable is
//! set. Sweeps the field laws over every byte pair, then exercises a
//! 25+25 shard set over 64 KiB blocks: encode, fail eight data rows,
//! rebuild, and compare against the deterministic generator pattern.

use crate::ec::encoder::ParityEncoder;
use crate::ec::field::galois;
use crate::ec::matrix::GeneratorMatrix;
use crate::ec::reconstruction::RecoveryPlan;
use crate::ec::stripe::StripeBuffer;
use crate::error::{Error, Result};

const NUM_DATA: usize = 25;
const NUM_PARITY: usize = 25;
const BLOCK: usize = 64 * 1024;
const FAILED_ROWS: [usize; 8] = [9, 1, 2, 3, 4, 5, 6, 7];

/// Field laws plus the matrix round-trip scenario.
pub fn run() -> Result<()> {
    galois().self_test()?;
    matrix_roundtrip()?;
    Ok(())
}

fn generator_byte(row: usize, idx: usize) -> u8 {
    (idx * (row ^ idx)) as u8
}

fn matrix_roundtrip() -> Result<()> {
    let mut matrix = GeneratorMatrix::new(NUM_DATA, NUM_PARITY)?;
    let encoder = ParityEncoder::new(&matrix);

    // Single-column stripe
    let mut column = vec![0u8; NUM_DATA + NUM_PARITY];
    column[0] = 55;
    column[1] = 42;
    column[2] = 69;
    encoder.encode_column(&mut column);
    let reference = column.clone();

    // Block stripe filled with deterministic junk
    let mut stripe = StripeBuffer::new(NUM_DATA + NUM_PARITY, BLOCK);
    for row in 0..NUM_DATA {
        for (idx, cell) in stripe.row_mut(row).iter_mut().enumerate() {
            *cell = generator_byte(row, idx);
        }
    }
    encoder.encode_block(&mut stripe);

    for &row in &FAILED_ROWS {
        matrix.mark_failed(row);
        column[row] = 0xfe;
        stripe.row_mut(row).fill(0xfe);
    }

    let plan = RecoveryPlan::build(&matrix)?;
    plan.recover_column(&mut column);
    plan.recover_block(&mut stripe);

    for row in 0..NUM_DATA {
        if column[row] != reference[row] {
            return Err(Error::InternalInvariant(format!(
                "column recovery mismatch at row {row}"
            )));
        }
        for (idx, &byte) in stripe.row(row).iter().enumerate() {
            if byte != generator_byte(row, idx) {
                return Err(Error::InternalInvariant(format!(
                    "block recovery mismatch at row {row}, offset {idx}"
                )));
            }
        }
    }
    Ok(())
}
