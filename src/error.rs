//! Error types for the erasure coding tool

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while splitting or rebuilding a shard set.
///
/// Every variant is fatal: the binary reports it once on standard error
/// and exits non-zero. The only soft failure is an individual shard that
/// cannot be opened or validated during decoding, which marks the
/// corresponding matrix row as failed instead of surfacing here.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Bad CLI shape, shard counts out of range, or division by zero
    /// in the field arithmetic
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Fewer shards opened than data rows needed for reconstruction
    #[error("insufficient shards for reconstruction: have {available}, need {required}")]
    MissingShards { available: usize, required: usize },

    /// Two opened shards disagree on the encoding parameters
    #[error("shard signature mismatch: {0}")]
    SignatureMismatch(String),

    /// Gauss-Jordan elimination hit a zero pivot
    #[error("recovery matrix is singular: zero in major diagonal [{0}]")]
    MatrixSingular(usize),

    /// An algorithmic invariant did not hold
    #[error("internal invariant violated: {0}")]
    InternalInvariant(String),
}
