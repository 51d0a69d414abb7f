//! Embedded payload archive
//!
//! Every shard header starts with a small tar archive baked into the
//! binary. Its contents are opaque to the coding engine; the contract
//! is placement only, plus one behavior: decoding a stub that matches
//! no shard files writes the archived file out instead, so a bare
//! binary and no data still bootstraps a recovery.
//!
//! The blob length is self-describing: a tar header stores the octal
//! file size at a fixed offset, and the blob is that size plus the
//! 512-byte header block. The decoder reads the same field from the
//! shard file itself, so shards written by a binary with a different
//! payload still open.

use crate::error::{Error, Result};
use once_cell::sync::OnceCell;

/// One tar header block.
pub(crate) const TAR_HEADER_LEN: usize = 512;

/// Offset of the 11-digit octal size field inside a tar header.
pub(crate) const TAR_SIZE_OFFSET: usize = 124;

static RAW: &[u8] = include_bytes!("../../assets/payload.tar");

static BLOB_LEN: OnceCell<usize> = OnceCell::new();

/// The bytes written ahead of every shard signature: the tar header
/// plus the archived file, without the archive's trailing padding.
pub fn blob() -> Result<&'static [u8]> {
    let len = BLOB_LEN.get_or_try_init(|| {
        let size = parse_octal(&RAW[TAR_SIZE_OFFSET..TAR_SIZE_OFFSET + 12]).ok_or_else(|| {
            Error::InternalInvariant(
                "embedded payload has no decodable tar size field".to_string(),
            )
        })?;
        let len = TAR_HEADER_LEN + size;
        if len > RAW.len() {
            return Err(Error::InternalInvariant(format!(
                "embedded payload size field ({size}) exceeds the archive"
            )));
        }
        Ok(len)
    })?;
    Ok(&RAW[..*len])
}

/// The archived file itself, as emitted when no shards are found.
pub fn archived_file() -> Result<&'static [u8]> {
    Ok(&blob()?[TAR_HEADER_LEN..])
}

/// Parse a NUL- or space-terminated octal field.
pub(crate) fn parse_octal(field: &[u8]) -> Option<usize> {
    let digits = match field.iter().position(|&b| b == 0 || b == b' ') {
        Some(0) => return None,
        Some(end) => &field[..end],
        None => field,
    };
    let mut value = 0usize;
    for &b in digits {
        if !(b'0'..=b'7').contains(&b) {
            return None;
        }
        value = value.checked_mul(8)?.checked_add((b - b'0') as usize)?;
    }
    Some(value)
}
