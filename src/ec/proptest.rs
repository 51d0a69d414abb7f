//! Property-Based Tests for the Erasure Coding Engine
//!
//! Systematically verifies the field laws, round-trip recovery across
//! random failure sets, and padding behavior across random residues.

#![cfg(test)]

use proptest::prelude::*;

use super::encoder::ParityEncoder;
use super::field::galois;
use super::matrix::GeneratorMatrix;
use super::reconstruction::RecoveryPlan;
use super::stripe::{apply_padding, strip_padding, StripeBuffer};

// =============================================================================
// Strategies
// =============================================================================

/// Valid small (N, M) shapes; big shapes only slow the sweep down.
fn shard_config() -> impl Strategy<Value = (usize, usize)> {
    (1usize..=6, 1usize..=4)
}

/// Indices to fail, deduplicated and capped at `max_failures`.
fn failure_set(total: usize, max_failures: usize) -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(0..total, 0..=max_failures).prop_map(|mut v| {
        v.sort();
        v.dedup();
        v
    })
}

// =============================================================================
// Field laws
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    #[test]
    fn prop_field_laws(a: u8, b: u8, c: u8) {
        let gf = galois();
        prop_assert_eq!(gf.mult(a, b), gf.mult(b, a));
        prop_assert_eq!(gf.mult(a, gf.mult(b, c)), gf.mult(gf.mult(a, b), c));
        prop_assert_eq!(gf.mult(a, b ^ c), gf.mult(a, b) ^ gf.mult(a, c));
        if b != 0 {
            prop_assert_eq!(gf.div(gf.mult(a, b), b).unwrap(), a);
        }
    }
}

// =============================================================================
// Round-trip recovery
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(96))]

    /// Any failure set no larger than M reconstructs a column exactly.
    #[test]
    fn prop_column_roundtrip(
        (num_data, num_parity) in shard_config(),
        data in prop::collection::vec(any::<u8>(), 6),
        failures in failure_set(10, 4),
    ) {
        let total = num_data + num_parity;
        let failures: Vec<usize> = failures
            .into_iter()
            .filter(|&f| f < total)
            .take(num_parity)
            .collect();

        let mut matrix = GeneratorMatrix::new(num_data, num_parity).unwrap();
        let mut column = vec![0u8; total];
        column[..num_data].copy_from_slice(&data[..num_data]);
        ParityEncoder::new(&matrix).encode_column(&mut column);
        let reference = column.clone();

        for &f in &failures {
            matrix.mark_failed(f);
            column[f] = !column[f];
        }

        let plan = RecoveryPlan::build(&matrix).unwrap();
        plan.recover_column(&mut column);
        prop_assert_eq!(&column[..num_data], &reference[..num_data]);
    }

    /// Block recovery reconstructs every failed data row byte for byte.
    #[test]
    fn prop_block_roundtrip(
        (num_data, num_parity) in shard_config(),
        row_len in 1usize..64,
        seed in any::<u8>(),
        failures in failure_set(10, 4),
    ) {
        let total = num_data + num_parity;
        let failures: Vec<usize> = failures
            .into_iter()
            .filter(|&f| f < total)
            .take(num_parity)
            .collect();

        let mut matrix = GeneratorMatrix::new(num_data, num_parity).unwrap();
        let mut stripe = StripeBuffer::new(total, row_len);
        for row in 0..num_data {
            for (i, cell) in stripe.row_mut(row).iter_mut().enumerate() {
                *cell = (i as u8).wrapping_mul(row as u8 ^ seed).wrapping_add(seed);
            }
        }
        ParityEncoder::new(&matrix).encode_block(&mut stripe);
        let reference: Vec<Vec<u8>> = (0..total).map(|r| stripe.row(r).to_vec()).collect();

        for &f in &failures {
            matrix.mark_failed(f);
            stripe.row_mut(f).fill(0xfe);
        }

        let plan = RecoveryPlan::build(&matrix).unwrap();
        plan.recover_block(&mut stripe);
        for row in 0..num_data {
            prop_assert_eq!(stripe.row(row), &reference[row][..]);
        }
    }

    /// Losing more rows than there is parity is always rejected.
    #[test]
    fn prop_excess_failures_rejected(
        (num_data, num_parity) in shard_config(),
        extra in 1usize..3,
    ) {
        let total = num_data + num_parity;
        let mut matrix = GeneratorMatrix::new(num_data, num_parity).unwrap();
        for f in 0..(num_parity + extra).min(total) {
            matrix.mark_failed(f);
        }
        let is_missing_shards = matches!(
            RecoveryPlan::build(&matrix),
            Err(crate::error::Error::MissingShards { .. })
        );
        prop_assert!(is_missing_shards);
    }
}

// =============================================================================
// Determinism and padding
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Two matrices of the same shape hold identical coefficients, so
    /// two encodes of the same stream produce identical shard bytes.
    #[test]
    fn prop_generator_deterministic((num_data, num_parity) in shard_config()) {
        let a = GeneratorMatrix::new(num_data, num_parity).unwrap();
        let b = GeneratorMatrix::new(num_data, num_parity).unwrap();
        for row in 0..a.total_rows() {
            prop_assert_eq!(a.row(row), b.row(row));
        }
    }

    /// Every residue of the data area round-trips through the padding
    /// descriptor.
    #[test]
    fn prop_padding_roundtrip(
        num_data in 1usize..4,
        bytes_read in 0usize..(3 * 4096),
    ) {
        let area_len = num_data * 4096;
        let bytes_read = bytes_read.min(area_len - 1);
        let mut area = vec![0u8; area_len];
        for (i, cell) in area.iter_mut().take(bytes_read).enumerate() {
            *cell = i as u8;
        }
        apply_padding(&mut area, bytes_read);
        prop_assert_eq!(strip_padding(&area), bytes_read);
    }
}
