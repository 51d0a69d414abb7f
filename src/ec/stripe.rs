//! Stripe buffers and padding
//!
//! A stripe is one block from every shard: N data blocks followed by M
//! parity blocks. The buffer is a single contiguous row-major
//! allocation so the data area (the first N rows) can be filled from
//! the input stream with one read loop and scanned for padding as one
//! flat byte range.
//!
//! # Padding
//!
//! Each stripe's data area holds one byte less than its capacity: the
//! final byte is a flag describing how much of the area is padding.
//!
//! - flag 0: the area is full, no padding
//! - flag in [1, 127]: that many trailing bytes are padding
//! - flag 0x80: the shortfall is 128 or more and is stored as a 32-bit
//!   little-endian integer 12 bytes before the end of the area
//!
//! Non-final stripes are always full, so their flag is 0; the decoder
//! strips padding on every stripe symmetrically.

/// Byte offset back from the end of the data area where the 32-bit
/// shortfall lives for flag 0x80.
const WIDE_SHORTFALL_BACKSET: usize = 12;

/// Contiguous (rows x row_len) byte buffer holding one stripe.
pub struct StripeBuffer {
    rows: usize,
    row_len: usize,
    cells: Vec<u8>,
}

impl StripeBuffer {
    pub fn new(rows: usize, row_len: usize) -> Self {
        StripeBuffer {
            rows,
            row_len,
            cells: vec![0u8; rows * row_len],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn row_len(&self) -> usize {
        self.row_len
    }

    pub fn row(&self, row: usize) -> &[u8] {
        &self.cells[row * self.row_len..(row + 1) * self.row_len]
    }

    pub fn row_mut(&mut self, row: usize) -> &mut [u8] {
        &mut self.cells[row * self.row_len..(row + 1) * self.row_len]
    }

    /// The first `num_data` rows as one flat slice.
    pub fn data_area(&self, num_data: usize) -> &[u8] {
        &self.cells[..num_data * self.row_len]
    }

    pub fn data_area_mut(&mut self, num_data: usize) -> &mut [u8] {
        &mut self.cells[..num_data * self.row_len]
    }

    /// Split into (data area, parity area) for simultaneous access.
    pub fn split_data_mut(&mut self, num_data: usize) -> (&mut [u8], &mut [u8]) {
        self.cells.split_at_mut(num_data * self.row_len)
    }

    pub fn fill_zero(&mut self) {
        self.cells.fill(0);
    }
}

/// Record in the data area that only `bytes_read` of its capacity
/// (length minus the flag byte) were filled. The unfilled remainder
/// must already be zero.
pub fn apply_padding(data_area: &mut [u8], bytes_read: usize) {
    let capacity = data_area.len() - 1;
    debug_assert!(bytes_read <= capacity);
    debug_assert!(data_area.len() % 4 == 0 && data_area.len() >= 16);

    let missing = capacity - bytes_read;
    if missing == 0 {
        data_area[capacity] = 0;
    } else if missing < 0x80 {
        data_area[capacity] = missing as u8;
    } else {
        data_area[capacity] = 0x80;
        let offset = data_area.len() - WIDE_SHORTFALL_BACKSET;
        data_area[offset..offset + 4].copy_from_slice(&(missing as u32).to_le_bytes());
    }
}

/// Number of payload bytes in the data area, after removing padding.
pub fn strip_padding(data_area: &[u8]) -> usize {
    let capacity = data_area.len() - 1;
    let flag = data_area[capacity];
    if flag == 0 {
        return capacity;
    }
    if flag < 0x80 {
        return capacity - flag as usize;
    }
    let offset = data_area.len() - WIDE_SHORTFALL_BACKSET;
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&data_area[offset..offset + 4]);
    let missing = u32::from_le_bytes(raw) as usize;
    capacity.saturating_sub(missing)
}
