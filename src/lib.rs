//! gfm - Galois-Field erasure coding for split-file archives
//!
//! Splits a byte stream into N data shard files plus M parity shard
//! files such that any N of the N+M files rebuild the stream exactly.
//! All arithmetic happens in GF(2^8); parity rows come from a
//! Vandermonde-derived generator matrix reduced to systematic form, so
//! data shards carry the input verbatim and reconstruction is a single
//! matrix inversion over the field.
//!
//! # Architecture
//!
//! ```text
//! stdin ──► stripe buffer ──► ParityEncoder ──► N+M shard files + STUB.md5
//!                                  ▲
//!                           GeneratorMatrix
//!                                  │
//! shard files ──► header probe ──► RecoveryPlan ──► stdout
//! ```
//!
//! # Modules
//!
//! - [`ec`] - the erasure-coding engine: field tables, generator matrix,
//!   parity encoder, recovery planner, stripe buffer
//! - [`shard`] - the on-disk format: headers, embedded payload,
//!   encode/decode sessions, MD5 manifest
//! - [`error`] - error types
//! - [`selftest`] - built-in test, run when the `BIT` environment
//!   variable is set
//! - [`diag`] - diagnostic dumps, enabled by the `DMP` environment
//!   variable

pub mod diag;
pub mod ec;
pub mod error;
pub mod selftest;
pub mod shard;

// Re-export commonly used types
pub use ec::encoder::ParityEncoder;
pub use ec::field::galois;
pub use ec::matrix::GeneratorMatrix;
pub use ec::reconstruction::RecoveryPlan;
pub use ec::stripe::StripeBuffer;
pub use error::{Error, Result};
pub use shard::{BLOCK_SIZE, BLOCK_SIZE_PO2};
