//! Erasure Coding Engine
//!
//! Linear algebra over GF(2^8) for systematic Reed-Solomon style
//! erasure coding.
//!
//! # Components
//!
//! - **Field** (`field.rs`): precomputed log/antilog/multiplication
//!   tables for GF(2^8) over the 0x1d primitive polynomial.
//!
//! - **Generator matrix** (`matrix.rs`): the (N+M) x N matrix D in
//!   systematic form (identity on top, full-rank parity rows below),
//!   plus per-row liveness flags.
//!
//! - **Parity encoder** (`encoder.rs`): applies D's bottom M rows to a
//!   stripe's data rows.
//!
//! - **Reconstruction** (`reconstruction.rs`): inverts the submatrix of
//!   N surviving rows and rewrites failed data rows from the survivors.
//!
//! - **Stripe buffer** (`stripe.rs`): contiguous (N+M) x B byte buffer
//!   and the end-of-stream padding descriptor.
//!
//! # Usage
//!
//! ```rust,ignore
//! use gfm::ec::matrix::GeneratorMatrix;
//! use gfm::ec::encoder::ParityEncoder;
//! use gfm::ec::reconstruction::RecoveryPlan;
//!
//! let mut matrix = GeneratorMatrix::new(3, 2)?;
//! let mut column = [1u8, 2, 3, 0, 0];
//! ParityEncoder::new(&matrix).encode_column(&mut column);
//!
//! matrix.mark_failed(0);
//! matrix.mark_failed(4);
//! let plan = RecoveryPlan::build(&matrix)?;
//! plan.recover_column(&mut column);
//! assert_eq!(&column[..3], &[1, 2, 3]);
//! ```

pub mod encoder;
pub mod field;
pub mod matrix;
pub mod reconstruction;
pub mod stripe;

#[cfg(test)]
mod proptest;

pub use encoder::ParityEncoder;
pub use field::{galois, GaloisField};
pub use matrix::{GeneratorMatrix, MAX_TOTAL_SHARDS};
pub use reconstruction::RecoveryPlan;
pub use stripe::{apply_padding, strip_padding, StripeBuffer};
