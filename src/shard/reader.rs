//! Decode session
//!
//! Probes candidate shard files in index order, adopts the shard-set
//! shape from the first header that validates, and stops opening once
//! enough shards are in hand. Rows without an open shard are marked
//! failed; the recovery plan then rebuilds the data rows stripe by
//! stripe and the stream goes out with padding stripped.
//!
//! A stub that matches no shard file at all is not an error: the
//! embedded payload archive is written out instead, which is how a
//! bare binary bootstraps its own recovery tooling.

use crate::ec::matrix::{GeneratorMatrix, MAX_TOTAL_SHARDS};
use crate::ec::reconstruction::RecoveryPlan;
use crate::ec::stripe::{strip_padding, StripeBuffer};
use crate::error::{Error, Result};
use crate::shard::{header, payload, read_fully, shard_filename, BLOCK_SIZE};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use tracing::{debug, info};

/// How a decode session ended.
#[derive(Debug)]
pub enum DecodeOutcome {
    /// The original stream was reconstructed and written out.
    Stream { bytes_written: u64 },
    /// No shards were found; the embedded payload was written instead.
    PayloadWritten { dest: String, bytes: usize },
}

/// Rebuild the stream behind `stub` and write it to `out`.
pub fn decode_stream<W: Write>(stub: &str, out: &mut W) -> Result<DecodeOutcome> {
    // =========================================================================
    // Probe shard files
    // =========================================================================

    let mut handles: Vec<Option<File>> = Vec::new();
    handles.resize_with(MAX_TOTAL_SHARDS, || None);
    let mut adopted: Option<header::Signature> = None;
    let mut opened = 0usize;

    for index in 0..MAX_TOTAL_SHARDS {
        let name = shard_filename(stub, index);
        let Some((file, sig)) = header::probe(Path::new(&name), index as u8) else {
            continue;
        };
        match adopted {
            None => {
                let num_data = sig.num_data as usize;
                let num_parity = sig.num_parity as usize;
                if num_data == 0 || num_parity == 0 || num_data + num_parity > MAX_TOTAL_SHARDS
                {
                    return Err(Error::InvalidArgument(format!(
                        "shard header in '{name}' declares an unusable shape: \
                         {num_data} data + {num_parity} parity files"
                    )));
                }
                debug!(name = %name, num_data, num_parity, "adopted shard-set shape");
                adopted = Some(sig);
            }
            Some(first) => {
                if (first.num_data, first.num_parity, first.blocksize_po2)
                    != (sig.num_data, sig.num_parity, sig.blocksize_po2)
                {
                    return Err(Error::SignatureMismatch(format!(
                        "'{name}' declares {}+{} (blocksize 2^{}), earlier shards declare \
                         {}+{} (blocksize 2^{})",
                        sig.num_data,
                        sig.num_parity,
                        sig.blocksize_po2,
                        first.num_data,
                        first.num_parity,
                        first.blocksize_po2,
                    )));
                }
            }
        }
        handles[index] = Some(file);
        opened += 1;
        // Enough survivors; leave the rest unopened
        if let Some(sig) = adopted {
            if opened >= sig.num_data as usize {
                break;
            }
        }
    }

    let Some(sig) = adopted else {
        return write_payload(stub, out);
    };
    let num_data = sig.num_data as usize;
    let num_parity = sig.num_parity as usize;
    if opened < num_data {
        return Err(Error::MissingShards {
            available: opened,
            required: num_data,
        });
    }

    // =========================================================================
    // Recovery plan
    // =========================================================================

    let mut matrix = GeneratorMatrix::new(num_data, num_parity)?;
    for index in 0..matrix.total_rows() {
        if handles[index].is_none() {
            matrix.mark_failed(index);
        }
    }
    let plan = RecoveryPlan::build(&matrix)?;
    info!(
        num_data,
        num_parity,
        opened,
        failed = matrix.total_rows() - matrix.alive_rows(),
        "recovery plan ready"
    );

    // =========================================================================
    // Stripe loop
    // =========================================================================

    let mut stripe = StripeBuffer::new(matrix.total_rows(), BLOCK_SIZE);
    let mut bytes_written = 0u64;

    loop {
        stripe.fill_zero();
        let mut got = 0usize;
        for index in 0..matrix.total_rows() {
            if let Some(file) = handles[index].as_mut() {
                let n = read_fully(file, stripe.row_mut(index))?;
                if n != 0 && n != BLOCK_SIZE {
                    return Err(Error::Io(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("short block read from shard {index:02x} ({n} bytes)"),
                    )));
                }
                got += n;
            }
        }
        if got == 0 {
            break;
        }

        plan.recover_block(&mut stripe);
        let data = stripe.data_area(num_data);
        let keep = strip_padding(data);
        out.write_all(&data[..keep])?;
        bytes_written += keep as u64;
    }

    out.flush()?;
    Ok(DecodeOutcome::Stream { bytes_written })
}

/// No shards found: emit the archived file to `stub`, or to `out` for
/// the `-` stub. Refuses to overwrite an existing file.
fn write_payload<W: Write>(stub: &str, out: &mut W) -> Result<DecodeOutcome> {
    let content = payload::archived_file()?;
    if stub == "-" {
        out.write_all(content)?;
        out.flush()?;
    } else {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(stub)?;
        file.write_all(content)?;
    }
    Ok(DecodeOutcome::PayloadWritten {
        dest: stub.to_string(),
        bytes: content.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shard::writer::encode_stream;
    use assert_matches::assert_matches;
    use std::fs;

    fn stub_in(dir: &tempfile::TempDir) -> String {
        dir.path().join("set.").to_str().unwrap().to_string()
    }

    fn decode_to_vec(stub: &str) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        match decode_stream(stub, &mut out)? {
            DecodeOutcome::Stream { .. } => Ok(out),
            DecodeOutcome::PayloadWritten { .. } => panic!("unexpected payload fallback"),
        }
    }

    #[test]
    fn test_roundtrip_intact_set() {
        let dir = tempfile::tempdir().unwrap();
        let stub = stub_in(&dir);
        let data: Vec<u8> = (0..20_000u32).map(|i| (i * 7 + (i >> 5)) as u8).collect();
        encode_stream(&mut &data[..], &stub, 3, 2).unwrap();
        assert_eq!(decode_to_vec(&stub).unwrap(), data);
    }

    #[test]
    fn test_roundtrip_with_all_parity_substituted() {
        let dir = tempfile::tempdir().unwrap();
        let stub = stub_in(&dir);
        let data = vec![0x42u8; 10_000];
        encode_stream(&mut &data[..], &stub, 2, 2).unwrap();
        fs::remove_file(shard_filename(&stub, 0)).unwrap();
        fs::remove_file(shard_filename(&stub, 1)).unwrap();
        assert_eq!(decode_to_vec(&stub).unwrap(), data);
    }

    #[test]
    fn test_missing_shards_reported() {
        let dir = tempfile::tempdir().unwrap();
        let stub = stub_in(&dir);
        encode_stream(&mut &b"payload"[..], &stub, 2, 1).unwrap();
        fs::remove_file(shard_filename(&stub, 1)).unwrap();
        fs::remove_file(shard_filename(&stub, 2)).unwrap();

        let mut out = Vec::new();
        assert_matches!(
            decode_stream(&stub, &mut out),
            Err(Error::MissingShards {
                available: 1,
                required: 2
            })
        );
    }

    #[test]
    fn test_corrupt_header_counts_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let stub = stub_in(&dir);
        let data = vec![0x17u8; 3000];
        encode_stream(&mut &data[..], &stub, 2, 1).unwrap();
        // Wreck one header; parity must cover for it
        fs::write(shard_filename(&stub, 0), b"not a shard").unwrap();
        assert_eq!(decode_to_vec(&stub).unwrap(), data);
    }

    #[test]
    fn test_signature_mismatch_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let stub_a = dir.path().join("a.").to_str().unwrap().to_string();
        let stub_b = dir.path().join("b.").to_str().unwrap().to_string();
        encode_stream(&mut &b"one"[..], &stub_a, 2, 1).unwrap();
        encode_stream(&mut &b"two"[..], &stub_b, 3, 1).unwrap();
        fs::copy(shard_filename(&stub_b, 1), shard_filename(&stub_a, 1)).unwrap();

        let mut out = Vec::new();
        assert_matches!(
            decode_stream(&stub_a, &mut out),
            Err(Error::SignatureMismatch(_))
        );
    }

    #[test]
    fn test_no_shards_dumps_payload_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("rescue").to_str().unwrap().to_string();
        let mut out = Vec::new();
        let outcome = decode_stream(&dest, &mut out).unwrap();
        assert_matches!(outcome, DecodeOutcome::PayloadWritten { .. });
        assert!(out.is_empty());
        assert_eq!(
            fs::read(&dest).unwrap(),
            payload::archived_file().unwrap()
        );
        // Second run refuses to clobber the file it just wrote
        let mut out = Vec::new();
        assert_matches!(decode_stream(&dest, &mut out), Err(Error::Io(_)));
    }

    #[test]
    fn test_dash_stub_dumps_payload_to_writer() {
        let mut out = Vec::new();
        let outcome = decode_stream("-", &mut out).unwrap();
        assert_matches!(outcome, DecodeOutcome::PayloadWritten { .. });
        assert_eq!(out, payload::archived_file().unwrap());
    }
}
