// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Typed accessors for fixed-layout command and status blocks.
//
// Multi-byte fields are big-endian and between one and eight bytes wide.
// Bitfields are addressed as (mask, shift) within a single byte. Callers pass
// offsets from the layout tables in `command` and `status`; an offset past the
// end of the block is a programming error and panics like any slice index.

use byteorder::{BigEndian, ByteOrder};

fn width_mask(n: usize) -> u64 {
    if n >= 8 { u64::MAX } else { (1u64 << (n * 8)) - 1 }
}

/// Read an `n`-byte big-endian unsigned integer at `offset`.
pub fn get_be(buf: &[u8], offset: usize, n: usize) -> u64 {
    BigEndian::read_uint(&buf[offset..offset + n], n)
}

/// Write the low `n` bytes of `value` big-endian at `offset`.
///
/// Higher bits are discarded, which is how inverted fields such as the
/// upper-left Y of some devices are carried.
pub fn put_be(buf: &mut [u8], offset: usize, n: usize, value: u64) {
    BigEndian::write_uint(&mut buf[offset..offset + n], value & width_mask(n), n);
}

/// Extract `(byte >> shift) & mask`.
pub fn get_bits(byte: u8, mask: u8, shift: u8) -> u8 {
    (byte >> shift) & mask
}

/// Replace the bits selected by `mask << shift` with `value`.
pub fn set_bits(byte: &mut u8, mask: u8, shift: u8, value: u8) {
    *byte = (*byte & !(mask << shift)) | ((value & mask) << shift);
}

/// Read a space-padded ASCII field, trimmed.
pub fn get_ascii(buf: &[u8], offset: usize, len: usize) -> String {
    let end = (offset + len).min(buf.len());
    let start = offset.min(end);
    String::from_utf8_lossy(&buf[start..end])
        .trim_end_matches(['\0', ' '])
        .to_string()
}
