/*
 * Copyright (c) 2026.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT or Apache License
 */

//! Huffman encoding tables.
//!
//! The encode side works with the same canonical `BITS`/`HUFFVAL` wire
//! form as the decoder and derives a per-symbol `(code, length)` view
//! from it. It also houses the optimal code builder used by the
//! statistics gather pass: a least-frequency merge over a 257 bin
//! histogram followed by the Annex K.2 procedure that limits code
//! lengths to 16 bits.

use std::sync::OnceLock;

use crate::errors::JpegError;

/// Symbol frequencies for one codebook.
///
/// Bin 256 is reserved, it is given a frequency of one before building
/// so the longest code is never assigned to a real symbol and no code
/// of all ones ever appears in the stream.
pub(crate) type Frequencies = [u32; 257];

/// A Huffman encoding table.
#[derive(Clone)]
pub(crate) struct HuffmanEncodeTable {
    /// Code bits per symbol, valid when `sizes[sym] != 0`.
    codes: [u16; 256],
    /// Code length per symbol, zero when the symbol has no code.
    sizes: [u8; 256],
    /// Wire form: count of codes per length, index 0 unused.
    pub(crate) bits: [u8; 17],
    /// Wire form: symbols in length-then-definition order.
    pub(crate) values: Vec<u8>
}

impl HuffmanEncodeTable {
    /// Build the per-symbol view from the canonical wire form.
    pub fn from_spec(bits: &[u8; 17], values: &[u8]) -> Result<HuffmanEncodeTable, JpegError> {
        let total: usize = bits[1..].iter().map(|x| usize::from(*x)).sum();

        if total > 256 || total != values.len() {
            return Err(JpegError::invalid(
                0,
                "Huffman table length counts do not match the symbol list"
            ));
        }

        let mut codes = [0_u16; 256];
        let mut sizes = [0_u8; 256];

        // canonical assignment, lexicographic within a length,
        // doubling between lengths
        let mut code = 0_u32;
        let mut k = 0;

        for length in 1..=16_u8 {
            for _ in 0..bits[usize::from(length)] {
                if code >= (1 << length) {
                    return Err(JpegError::invalid(0, "invalid Huffman code lengths"));
                }

                let symbol = usize::from(values[k]);

                codes[symbol] = code as u16;
                sizes[symbol] = length;

                code += 1;
                k += 1;
            }
            code <<= 1;
        }

        Ok(HuffmanEncodeTable {
            codes,
            sizes,
            bits: *bits,
            values: values.to_vec()
        })
    }

    /// Build an optimal table for the given symbol frequencies.
    pub fn build_optimal(freq: &Frequencies) -> Result<HuffmanEncodeTable, JpegError> {
        let (bits, values) = build_optimal_lengths(freq);

        HuffmanEncodeTable::from_spec(&bits, &values)
    }

    /// `(code, length)` for a symbol. The caller guarantees the symbol
    /// was counted when the table was built.
    #[inline(always)]
    pub fn code(&self, symbol: u8) -> (u16, u8) {
        (self.codes[usize::from(symbol)], self.sizes[usize::from(symbol)])
    }

    /// True if `symbol` was assigned a code.
    pub fn has_code(&self, symbol: u8) -> bool {
        self.sizes[usize::from(symbol)] != 0
    }
}

/// Derive length-limited canonical code lengths from frequencies.
///
/// This is the procedure of Annex K.2: repeatedly merge the two least
/// frequent entries (tracking chains so every member of a merged tree
/// grows by one bit), then fold lengths deeper than 16 upwards by
/// moving symbol pairs, finally drop the reserved sentinel.
fn build_optimal_lengths(frequencies: &Frequencies) -> ([u8; 17], Vec<u8>) {
    let mut freq = *frequencies;
    // the reserved bin, guaranteed nonzero so it ends up with the
    // deepest code
    freq[256] = 1;

    let mut codesize = [0_usize; 257];
    let mut others = [-1_i32; 257];

    loop {
        // find the two smallest nonzero frequencies, ties resolve to
        // the higher bin
        let mut c1: i32 = -1;
        let mut v = u32::MAX;

        for (i, f) in freq.iter().enumerate() {
            if *f != 0 && *f <= v {
                v = *f;
                c1 = i as i32;
            }
        }

        let mut c2: i32 = -1;
        v = u32::MAX;

        for (i, f) in freq.iter().enumerate() {
            if *f != 0 && *f <= v && i as i32 != c1 {
                v = *f;
                c2 = i as i32;
            }
        }

        // only one tree left, done
        if c2 < 0 {
            break;
        }

        let (c1, mut c2) = (c1 as usize, c2 as usize);

        freq[c1] += freq[c2];
        freq[c2] = 0;

        // everything chained to c1 gains a bit
        let mut c1_walk = c1;
        codesize[c1_walk] += 1;
        while others[c1_walk] >= 0 {
            c1_walk = others[c1_walk] as usize;
            codesize[c1_walk] += 1;
        }

        // chain c2's tree onto c1's
        others[c1_walk] = c2 as i32;

        codesize[c2] += 1;
        while others[c2] >= 0 {
            c2 = others[c2] as usize;
            codesize[c2] += 1;
        }
    }

    // nothing was counted at all, the table stays empty
    if codesize.iter().all(|size| *size == 0) {
        return ([0; 17], Vec::new());
    }

    // count how many codes exist at each length
    let mut bits_long = [0_u8; 33];

    for size in codesize.iter().filter(|x| **x != 0) {
        bits_long[(*size).min(32)] += 1;
    }

    // Annex K.2: fold lengths beyond 16 upwards. Take two symbols off
    // the deepest over-long level, one becomes a prefix one level up,
    // the pair reappears at the first shallower level with room.
    for i in (17..=32_usize).rev() {
        while bits_long[i] > 0 {
            let mut j = i - 2;
            while bits_long[j] == 0 {
                j -= 1;
            }

            bits_long[i] -= 2;
            bits_long[i - 1] += 1;
            bits_long[j + 1] += 2;
            bits_long[j] -= 1;
        }
    }

    // remove the reserved sentinel from the deepest used level
    let mut i = 16;
    while bits_long[i] == 0 {
        i -= 1;
    }
    bits_long[i] -= 1;

    let mut bits = [0_u8; 17];
    bits[..17].copy_from_slice(&bits_long[..17]);

    // symbols sorted by code length, definition order within a length,
    // the sentinel (256) is omitted
    let mut values = Vec::with_capacity(257);

    for length in 1..=32_usize {
        for symbol in 0..=255_usize {
            if codesize[symbol].min(32) == length {
                values.push(symbol as u8);
            }
        }
    }

    (bits, values)
}

/// Standard luminance DC table, Annex K.3.1.
pub(crate) static STD_DC_LUMINANCE_BITS: [u8; 17] =
    [0, 0, 1, 5, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0];
pub(crate) static STD_DC_LUMINANCE_VALUES: [u8; 12] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11];

/// Standard chrominance DC table, Annex K.3.1.
pub(crate) static STD_DC_CHROMINANCE_BITS: [u8; 17] =
    [0, 0, 3, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0];
pub(crate) static STD_DC_CHROMINANCE_VALUES: [u8; 12] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11];

/// Standard luminance AC table, Annex K.3.2.
pub(crate) static STD_AC_LUMINANCE_BITS: [u8; 17] =
    [0, 0, 2, 1, 3, 3, 2, 4, 3, 5, 5, 4, 4, 0, 0, 1, 0x7D];
#[rustfmt::skip]
pub(crate) static STD_AC_LUMINANCE_VALUES: [u8; 162] = [
    0x01, 0x02, 0x03, 0x00, 0x04, 0x11, 0x05, 0x12,
    0x21, 0x31, 0x41, 0x06, 0x13, 0x51, 0x61, 0x07,
    0x22, 0x71, 0x14, 0x32, 0x81, 0x91, 0xA1, 0x08,
    0x23, 0x42, 0xB1, 0xC1, 0x15, 0x52, 0xD1, 0xF0,
    0x24, 0x33, 0x62, 0x72, 0x82, 0x09, 0x0A, 0x16,
    0x17, 0x18, 0x19, 0x1A, 0x25, 0x26, 0x27, 0x28,
    0x29, 0x2A, 0x34, 0x35, 0x36, 0x37, 0x38, 0x39,
    0x3A, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48, 0x49,
    0x4A, 0x53, 0x54, 0x55, 0x56, 0x57, 0x58, 0x59,
    0x5A, 0x63, 0x64, 0x65, 0x66, 0x67, 0x68, 0x69,
    0x6A, 0x73, 0x74, 0x75, 0x76, 0x77, 0x78, 0x79,
    0x7A, 0x83, 0x84, 0x85, 0x86, 0x87, 0x88, 0x89,
    0x8A, 0x92, 0x93, 0x94, 0x95, 0x96, 0x97, 0x98,
    0x99, 0x9A, 0xA2, 0xA3, 0xA4, 0xA5, 0xA6, 0xA7,
    0xA8, 0xA9, 0xAA, 0xB2, 0xB3, 0xB4, 0xB5, 0xB6,
    0xB7, 0xB8, 0xB9, 0xBA, 0xC2, 0xC3, 0xC4, 0xC5,
    0xC6, 0xC7, 0xC8, 0xC9, 0xCA, 0xD2, 0xD3, 0xD4,
    0xD5, 0xD6, 0xD7, 0xD8, 0xD9, 0xDA, 0xE1, 0xE2,
    0xE3, 0xE4, 0xE5, 0xE6, 0xE7, 0xE8, 0xE9, 0xEA,
    0xF1, 0xF2, 0xF3, 0xF4, 0xF5, 0xF6, 0xF7, 0xF8,
    0xF9, 0xFA
];

/// Standard chrominance AC table, Annex K.3.2.
pub(crate) static STD_AC_CHROMINANCE_BITS: [u8; 17] =
    [0, 0, 2, 1, 2, 4, 4, 3, 4, 7, 5, 4, 4, 0, 1, 2, 0x77];
#[rustfmt::skip]
pub(crate) static STD_AC_CHROMINANCE_VALUES: [u8; 162] = [
    0x00, 0x01, 0x02, 0x03, 0x11, 0x04, 0x05, 0x21,
    0x31, 0x06, 0x12, 0x41, 0x51, 0x07, 0x61, 0x71,
    0x13, 0x22, 0x32, 0x81, 0x08, 0x14, 0x42, 0x91,
    0xA1, 0xB1, 0xC1, 0x09, 0x23, 0x33, 0x52, 0xF0,
    0x15, 0x62, 0x72, 0xD1, 0x0A, 0x16, 0x24, 0x34,
    0xE1, 0x25, 0xF1, 0x17, 0x18, 0x19, 0x1A, 0x26,
    0x27, 0x28, 0x29, 0x2A, 0x35, 0x36, 0x37, 0x38,
    0x39, 0x3A, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48,
    0x49, 0x4A, 0x53, 0x54, 0x55, 0x56, 0x57, 0x58,
    0x59, 0x5A, 0x63, 0x64, 0x65, 0x66, 0x67, 0x68,
    0x69, 0x6A, 0x73, 0x74, 0x75, 0x76, 0x77, 0x78,
    0x79, 0x7A, 0x82, 0x83, 0x84, 0x85, 0x86, 0x87,
    0x88, 0x89, 0x8A, 0x92, 0x93, 0x94, 0x95, 0x96,
    0x97, 0x98, 0x99, 0x9A, 0xA2, 0xA3, 0xA4, 0xA5,
    0xA6, 0xA7, 0xA8, 0xA9, 0xAA, 0xB2, 0xB3, 0xB4,
    0xB5, 0xB6, 0xB7, 0xB8, 0xB9, 0xBA, 0xC2, 0xC3,
    0xC4, 0xC5, 0xC6, 0xC7, 0xC8, 0xC9, 0xCA, 0xD2,
    0xD3, 0xD4, 0xD5, 0xD6, 0xD7, 0xD8, 0xD9, 0xDA,
    0xE2, 0xE3, 0xE4, 0xE5, 0xE6, 0xE7, 0xE8, 0xE9,
    0xEA, 0xF2, 0xF3, 0xF4, 0xF5, 0xF6, 0xF7, 0xF8,
    0xF9, 0xFA
];

/// The four standard tables as encode tables, each derived once per
/// process and handed out as clones of the shared instance.
macro_rules! standard_table {
    ($name:ident, $bits:expr, $values:expr) => {
        pub(crate) fn $name() -> HuffmanEncodeTable {
            static TABLE: OnceLock<HuffmanEncodeTable> = OnceLock::new();

            TABLE
                .get_or_init(|| {
                    HuffmanEncodeTable::from_spec($bits, $values)
                        .expect("the Annex K tables are well formed")
                })
                .clone()
        }
    };
}

standard_table!(standard_dc_luminance, &STD_DC_LUMINANCE_BITS, &STD_DC_LUMINANCE_VALUES);
standard_table!(standard_dc_chrominance, &STD_DC_CHROMINANCE_BITS, &STD_DC_CHROMINANCE_VALUES);
standard_table!(standard_ac_luminance, &STD_AC_LUMINANCE_BITS, &STD_AC_LUMINANCE_VALUES);
standard_table!(standard_ac_chrominance, &STD_AC_CHROMINANCE_BITS, &STD_AC_CHROMINANCE_VALUES);

/// Magnitude category and the raw bits that encode `value`, shared by
/// the DC and AC symbol emitters. Negative values are sent as their
/// ones complement.
#[inline]
pub(crate) fn encode_magnitude(value: i32) -> (u8, u16) {
    let temp = value - i32::from(value < 0);
    let magnitude = value.unsigned_abs();

    let num_bits = 32 - magnitude.leading_zeros();

    let raw_bits = (temp & ((1_i32 << num_bits) - 1)) as u16;

    (num_bits as u8, raw_bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magnitude_categories() {
        assert_eq!(encode_magnitude(0), (0, 0));
        assert_eq!(encode_magnitude(1), (1, 1));
        assert_eq!(encode_magnitude(-1), (1, 0));
        assert_eq!(encode_magnitude(3), (2, 3));
        assert_eq!(encode_magnitude(-3), (2, 0));
        assert_eq!(encode_magnitude(255), (8, 255));
        assert_eq!(encode_magnitude(-255), (8, 0));
        assert_eq!(encode_magnitude(-2), (2, 1));
        assert_eq!(encode_magnitude(1023), (10, 1023));
    }

    #[test]
    fn standard_tables_are_well_formed() {
        let tables = [
            standard_dc_luminance(),
            standard_dc_chrominance(),
            standard_ac_luminance(),
            standard_ac_chrominance()
        ];

        for table in &tables {
            let count: usize = table.bits[1..].iter().map(|x| usize::from(*x)).sum();
            assert_eq!(count, table.values.len());
        }

        // every run/size symbol the sequential encoder can emit has a
        // code in the standard AC tables
        let ac = standard_ac_luminance();
        for run in 0..=15_u8 {
            for size in 1..=10_u8 {
                assert!(ac.has_code((run << 4) | size), "missing {run}/{size}");
            }
        }
        assert!(ac.has_code(0x00));
        assert!(ac.has_code(0xF0));
    }

    #[test]
    fn optimal_table_is_canonical_and_complete() {
        let mut freq: Frequencies = [0; 257];
        // skewed histogram over a handful of symbols
        freq[0] = 1000;
        freq[1] = 500;
        freq[2] = 250;
        freq[16] = 100;
        freq[0xF0] = 10;
        freq[32] = 1;

        let table = HuffmanEncodeTable::build_optimal(&freq).unwrap();

        // every counted symbol got a code, the reserved bin did not
        // surface as a symbol
        for symbol in [0_u8, 1, 2, 16, 0xF0, 32] {
            assert!(table.has_code(symbol), "symbol {symbol} missing");
        }
        assert_eq!(
            table.values.len(),
            6,
            "exactly the counted symbols get codes"
        );

        // more frequent symbols never get longer codes
        let (_, len_frequent) = table.code(0);
        let (_, len_rare) = table.code(32);
        assert!(len_frequent <= len_rare);

        // no code is all ones at its length (the sentinel absorbed it)
        for symbol in [0_u8, 1, 2, 16, 0xF0, 32] {
            let (code, len) = table.code(symbol);
            assert_ne!(u32::from(code), (1_u32 << len) - 1, "symbol {symbol}");
        }
    }

    #[test]
    fn optimal_handles_single_symbol() {
        let mut freq: Frequencies = [0; 257];
        freq[42] = 10;

        let table = HuffmanEncodeTable::build_optimal(&freq).unwrap();
        let (code, len) = table.code(42);

        assert_eq!(len, 1);
        assert_eq!(code, 0);
    }

    /// Resolve a left-justified 16 bit window through the decode-side
    /// table, the same descent the bit reader performs.
    fn decode_window(table: &crate::huffman::HuffmanTable, window: i32) -> (u8, u8) {
        use crate::huffman::HUFF_LOOKAHEAD;

        let probe = table.lookup[(window >> (16 - HUFF_LOOKAHEAD)) as usize];
        let mut length = probe >> HUFF_LOOKAHEAD;

        if length <= i32::from(HUFF_LOOKAHEAD) {
            return ((probe & 0xFF) as u8, length as u8);
        }

        while length < 17 && window >= table.maxcode[length as usize] {
            length += 1;
        }
        assert!(length < 17, "window 0x{window:04X} did not resolve");

        let index = (window >> (16 - length)) + table.offset[length as usize];

        (table.values[(index & 0xFF) as usize], length as u8)
    }

    /// The encoder's canonical codes and the decoder's derived tables
    /// must agree symbol for symbol when built from the same wire
    /// form.
    #[test]
    fn optimal_tables_decode_their_own_codes() {
        let histograms: [&[(usize, u32)]; 3] = [
            // DC-ish: a few small categories
            &[(0, 500), (1, 200), (2, 100), (3, 40), (4, 5)],
            // AC-ish: EOB heavy with scattered run/size symbols
            &[
                (0x00, 900),
                (0x01, 400),
                (0x02, 200),
                (0x11, 150),
                (0x21, 80),
                (0x12, 60),
                (0xF0, 20),
                (0x31, 10),
                (0x04, 3),
                (0x81, 1)
            ],
            // adversarial: steep frequency cliff
            &[(10, 1 << 20), (20, 1), (30, 1), (40, 1), (50, 1)]
        ];

        for histogram in histograms {
            let mut freq: Frequencies = [0; 257];
            for &(symbol, count) in histogram {
                freq[symbol] = count;
            }

            let encode_table = HuffmanEncodeTable::build_optimal(&freq).unwrap();

            let mut bits17 = [0_u8; 17];
            bits17.copy_from_slice(&encode_table.bits);

            let mut values = [0_u8; 256];
            values[..encode_table.values.len()].copy_from_slice(&encode_table.values);

            let decode_table =
                crate::huffman::HuffmanTable::new(&bits17, values, false, false).unwrap();

            for &(symbol, _) in histogram {
                let (code, length) = encode_table.code(symbol as u8);

                // left-justify the code and fill the tail with ones,
                // the worst case for prefix confusion
                let window = (i32::from(code) << (16 - length)) | ((1 << (16 - length)) - 1);

                let (decoded, decoded_length) = decode_window(&decode_table, window);

                assert_eq!(decoded, symbol as u8, "symbol {symbol:#x}");
                assert_eq!(decoded_length, length, "symbol {symbol:#x} length");
            }
        }
    }

    #[test]
    fn optimal_clamps_to_sixteen_bits() {
        // fibonacci-ish frequencies force very deep trees
        let mut freq: Frequencies = [0; 257];
        let mut a = 1_u32;
        let mut b = 1_u32;

        for i in 0..40 {
            freq[i] = a;
            let next = a.saturating_add(b);
            a = b;
            b = next;
        }

        let table = HuffmanEncodeTable::build_optimal(&freq).unwrap();

        for i in 0..40_u8 {
            let (_, len) = table.code(i);
            assert!(len >= 1 && len <= 16, "symbol {i} got length {len}");
        }
    }
}
