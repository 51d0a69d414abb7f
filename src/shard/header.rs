//! Shard headers
//!
//! Layout of a shard file's prefix:
//!
//! ```text
//! +--------------------------+----------------+---------------+----------
//! | embedded payload archive | 4-byte         | zero pad to   | body
//! | (tar header + file)      | signature      | next block    | blocks...
//! +--------------------------+----------------+---------------+----------
//! ```
//!
//! The signature records the shard-set shape and this file's position
//! in it. Opening a shard re-derives the signature offset from the tar
//! size field inside the file, validates the per-file invariants, and
//! leaves the handle positioned at the first body block.

use crate::error::Result;
use crate::shard::payload::{self, TAR_HEADER_LEN, TAR_SIZE_OFFSET};
use crate::shard::{BLOCK_SIZE, BLOCK_SIZE_PO2};
use md5::{Digest, Md5};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::debug;

/// Length of the encoded signature.
pub const SIGNATURE_LEN: usize = 4;

/// Per-shard header signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub num_data: u8,
    pub num_parity: u8,
    pub file_num: u8,
    pub blocksize_po2: u8,
}

impl Signature {
    pub fn to_bytes(self) -> [u8; SIGNATURE_LEN] {
        [
            self.num_data,
            self.num_parity,
            self.file_num,
            self.blocksize_po2,
        ]
    }

    pub fn from_bytes(raw: [u8; SIGNATURE_LEN]) -> Self {
        Signature {
            num_data: raw[0],
            num_parity: raw[1],
            file_num: raw[2],
            blocksize_po2: raw[3],
        }
    }
}

/// Round `used` up to the next block boundary.
fn block_align(used: usize) -> usize {
    (used + BLOCK_SIZE - 1) & !(BLOCK_SIZE - 1)
}

/// Write the full header (payload, signature, zero pad) and feed the
/// same bytes to the shard's digest.
pub fn write_header<W: Write>(out: &mut W, digest: &mut Md5, sig: Signature) -> Result<()> {
    let blob = payload::blob()?;
    out.write_all(blob)?;
    digest.update(blob);

    let sig_bytes = sig.to_bytes();
    out.write_all(&sig_bytes)?;
    digest.update(sig_bytes);

    let used = blob.len() + SIGNATURE_LEN;
    let pad = vec![0u8; block_align(used) - used];
    out.write_all(&pad)?;
    digest.update(&pad);
    Ok(())
}

/// Open a candidate shard and validate its header.
///
/// Returns the open handle positioned at the first body block together
/// with the decoded signature. Any failure (file absent, unreadable or
/// undecodable header, wrong file number, wrong block-size exponent)
/// returns `None`: to the recovery planner those cases are all the
/// same missing shard.
pub fn probe(path: &Path, file_num: u8) -> Option<(File, Signature)> {
    let mut file = File::open(path).ok()?;

    file.seek(SeekFrom::Start(TAR_SIZE_OFFSET as u64)).ok()?;
    let mut size_field = [0u8; 11];
    file.read_exact(&mut size_field).ok()?;
    let archived_len = payload::parse_octal(&size_field)?;
    let blob_len = TAR_HEADER_LEN + archived_len;

    file.seek(SeekFrom::Start(blob_len as u64)).ok()?;
    let mut sig_bytes = [0u8; SIGNATURE_LEN];
    file.read_exact(&mut sig_bytes).ok()?;
    let sig = Signature::from_bytes(sig_bytes);

    if sig.file_num != file_num || sig.blocksize_po2 != BLOCK_SIZE_PO2 {
        debug!(
            path = %path.display(),
            file_num = sig.file_num,
            blocksize_po2 = sig.blocksize_po2,
            "shard header rejected"
        );
        return None;
    }

    let body = block_align(blob_len + SIGNATURE_LEN);
    file.seek(SeekFrom::Start(body as u64)).ok()?;
    Some((file, sig))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn sig() -> Signature {
        Signature {
            num_data: 3,
            num_parity: 2,
            file_num: 1,
            blocksize_po2: BLOCK_SIZE_PO2,
        }
    }

    fn write_shard(path: &Path, sig: Signature, body: &[u8]) {
        let mut file = File::create(path).unwrap();
        let mut digest = Md5::new();
        write_header(&mut file, &mut digest, sig).unwrap();
        file.write_all(body).unwrap();
    }

    #[test]
    fn test_signature_round_trip() {
        let s = sig();
        assert_eq!(Signature::from_bytes(s.to_bytes()), s);
    }

    #[test]
    fn test_header_is_block_aligned() {
        let mut buf = Vec::new();
        let mut digest = Md5::new();
        write_header(&mut buf, &mut digest, sig()).unwrap();
        assert_eq!(buf.len() % BLOCK_SIZE, 0);
        // payload first, then the signature right behind it
        let blob = payload::blob().unwrap();
        assert_eq!(&buf[..blob.len()], blob);
        assert_eq!(&buf[blob.len()..blob.len() + 4], &sig().to_bytes());
        assert!(buf[blob.len() + 4..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_probe_positions_at_body() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("set01");
        let body = vec![0xabu8; BLOCK_SIZE];
        write_shard(&path, sig(), &body);

        let (mut file, parsed) = probe(&path, 1).unwrap();
        assert_eq!(parsed, sig());
        let mut block = vec![0u8; BLOCK_SIZE];
        file.read_exact(&mut block).unwrap();
        assert_eq!(block, body);
    }

    #[test]
    fn test_probe_rejects_wrong_file_num() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("set01");
        write_shard(&path, sig(), &[]);
        assert!(probe(&path, 2).is_none());
    }

    #[test]
    fn test_probe_rejects_wrong_blocksize() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("set01");
        let mut bad = sig();
        bad.blocksize_po2 = 9;
        write_shard(&path, bad, &[]);
        assert!(probe(&path, 1).is_none());
    }

    #[test]
    fn test_probe_rejects_garbage_and_truncation() {
        let dir = tempfile::tempdir().unwrap();

        let missing = dir.path().join("nope00");
        assert!(probe(&missing, 0).is_none());

        let garbage = dir.path().join("junk00");
        fs::write(&garbage, vec![0xffu8; 2048]).unwrap();
        assert!(probe(&garbage, 0).is_none());

        let truncated = dir.path().join("short00");
        fs::write(&truncated, &payload::blob().unwrap()[..64]).unwrap();
        assert!(probe(&truncated, 0).is_none());
    }
}
