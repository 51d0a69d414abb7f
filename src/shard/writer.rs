//! Encode session
//!
//! Streams stdin into an erasure-coded shard set. Each iteration fills
//! the data area of one stripe (its capacity is one byte short of
//! N blocks, the last byte being the padding flag), computes parity,
//! and appends one block to every shard file. The loop ends after the
//! first short read, so a stream that exactly fills its final stripe
//! gets one extra all-padding stripe behind it.

use crate::ec::encoder::ParityEncoder;
use crate::ec::matrix::GeneratorMatrix;
use crate::ec::stripe::{apply_padding, StripeBuffer};
use crate::error::Result;
use crate::shard::manifest::Manifest;
use crate::shard::{header, read_fully, shard_filename, BLOCK_SIZE, BLOCK_SIZE_PO2};
use md5::{Digest, Md5};
use std::fs::File;
use std::io::{Read, Write};
use tracing::{debug, info};

/// What an encode session produced.
#[derive(Debug)]
pub struct EncodeReport {
    pub bytes_read: u64,
    pub stripes: u64,
    pub shard_files: usize,
}

/// Split `input` into `num_data` + `num_parity` shard files named from
/// `stub`, plus the `STUB.md5` manifest.
pub fn encode_stream<R: Read>(
    input: &mut R,
    stub: &str,
    num_data: usize,
    num_parity: usize,
) -> Result<EncodeReport> {
    let matrix = GeneratorMatrix::new(num_data, num_parity)?;
    let encoder = ParityEncoder::new(&matrix);
    let total = matrix.total_rows();

    let mut manifest = Manifest::create(stub)?;

    // =========================================================================
    // Shard files and headers
    // =========================================================================

    let mut names = Vec::with_capacity(total);
    let mut files = Vec::with_capacity(total);
    let mut digests = Vec::with_capacity(total);
    for index in 0..total {
        let name = shard_filename(stub, index);
        let mut file = File::create(&name)?;
        let mut digest = Md5::new();
        header::write_header(
            &mut file,
            &mut digest,
            header::Signature {
                num_data: num_data as u8,
                num_parity: num_parity as u8,
                file_num: index as u8,
                blocksize_po2: BLOCK_SIZE_PO2,
            },
        )?;
        names.push(name);
        files.push(file);
        digests.push(digest);
    }
    debug!(total, "shard headers written");

    // =========================================================================
    // Stripe loop
    // =========================================================================

    let mut stream_digest = Md5::new();
    let mut stripe = StripeBuffer::new(total, BLOCK_SIZE);
    let capacity = num_data * BLOCK_SIZE - 1;
    let mut bytes_read = 0u64;
    let mut stripes = 0u64;

    loop {
        stripe.data_area_mut(num_data).fill(0);
        let got = read_fully(input, &mut stripe.data_area_mut(num_data)[..capacity])?;
        apply_padding(stripe.data_area_mut(num_data), got);
        stream_digest.update(&stripe.data_area(num_data)[..got]);

        encoder.encode_block(&mut stripe);

        for index in 0..total {
            files[index].write_all(stripe.row(index))?;
            digests[index].update(stripe.row(index));
        }

        bytes_read += got as u64;
        stripes += 1;
        if got != capacity {
            break;
        }
    }

    // =========================================================================
    // Manifest
    // =========================================================================

    for ((name, file), digest) in names.iter().zip(files).zip(digests) {
        drop(file);
        manifest.record(name, digest.finalize())?;
    }
    manifest.record("-", stream_digest.finalize())?;
    manifest.finish()?;

    info!(bytes_read, stripes, shard_files = total, "encode complete");
    Ok(EncodeReport {
        bytes_read,
        stripes,
        shard_files: total,
    })
}
