/*
 * Copyright (c) 2026.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT or Apache License
 */

//! Miscellaneous shared constants and small helpers.

use std::fmt;

/// Number of coefficients in a data unit.
pub const DCT_BLOCK: usize = 64;

/// Maximum number of table slots (quantization, Huffman, conditioning).
pub const MAX_TABLES: usize = 4;

/// Maximum number of components in a frame we support.
pub const MAX_COMPONENTS: usize = 4;

/// Stream (zig-zag) index -> natural (raster) index.
///
/// Padded by 16 entries so that a run pointing past the last AC
/// coefficient cannot index out of bounds.
#[rustfmt::skip]
pub const UN_ZIGZAG: [usize; 64 + 16] = [
     0,  1,  8, 16,  9,  2,  3, 10,
    17, 24, 32, 25, 18, 11,  4,  5,
    12, 19, 26, 33, 40, 48, 41, 34,
    27, 20, 13,  6,  7, 14, 21, 28,
    35, 42, 49, 56, 57, 50, 43, 36,
    29, 22, 15, 23, 30, 37, 44, 51,
    58, 59, 52, 45, 38, 31, 39, 46,
    53, 60, 61, 54, 47, 55, 62, 63,
    // Prevent overflowing
    63, 63, 63, 63, 63, 63, 63, 63,
    63, 63, 63, 63, 63, 63, 63, 63
];

/// Natural (raster) index -> stream (zig-zag) index, the inverse of
/// [`UN_ZIGZAG`], used on the encode side.
#[rustfmt::skip]
pub const ZIGZAG: [usize; 64] = [
     0,  1,  5,  6, 14, 15, 27, 28,
     2,  4,  7, 13, 16, 26, 29, 42,
     3,  8, 12, 17, 25, 30, 41, 43,
     9, 11, 18, 24, 31, 40, 44, 53,
    10, 19, 23, 32, 39, 45, 52, 54,
    20, 22, 33, 38, 46, 51, 55, 60,
    21, 34, 37, 47, 50, 56, 59, 61,
    35, 36, 48, 49, 57, 58, 62, 63
];

/// The coding process selected by a start of frame marker.
#[derive(Eq, PartialEq, Copy, Clone)]
pub enum SofMarker {
    /// SOF0, baseline DCT
    BaselineDct,
    /// SOF1, extended sequential DCT, Huffman coding
    ExtendedSequentialHuffman,
    /// SOF2, progressive DCT, Huffman coding
    ProgressiveDctHuffman,
    /// SOF3, lossless (sequential), Huffman coding
    LosslessHuffman,
    /// SOF9, extended sequential DCT, arithmetic coding
    ExtendedSequentialArithmetic,
    /// SOF10, progressive DCT, arithmetic coding
    ProgressiveDctArithmetic,
    /// SOF11, lossless (sequential), arithmetic coding.
    ///
    /// Recognised so it can be rejected by name, never decoded.
    LosslessArithmetic
}

impl Default for SofMarker {
    fn default() -> Self {
        Self::BaselineDct
    }
}

impl SofMarker {
    /// Create from the `n` of an `SOF(n)` marker.
    pub fn from_sof(n: u8) -> Option<SofMarker> {
        match n {
            0 => Some(Self::BaselineDct),
            1 => Some(Self::ExtendedSequentialHuffman),
            2 => Some(Self::ProgressiveDctHuffman),
            3 => Some(Self::LosslessHuffman),
            9 => Some(Self::ExtendedSequentialArithmetic),
            10 => Some(Self::ProgressiveDctArithmetic),
            11 => Some(Self::LosslessArithmetic),
            _ => None
        }
    }

    /// Check if a marker is sequential DCT.
    pub fn is_sequential_dct(self) -> bool {
        matches!(
            self,
            Self::BaselineDct
                | Self::ExtendedSequentialHuffman
                | Self::ExtendedSequentialArithmetic
        )
    }

    /// Check if a marker is a lossless type.
    pub fn is_lossless(self) -> bool {
        matches!(self, Self::LosslessHuffman | Self::LosslessArithmetic)
    }

    /// Check whether a marker is progressive.
    pub fn is_progressive(self) -> bool {
        matches!(
            self,
            Self::ProgressiveDctHuffman | Self::ProgressiveDctArithmetic
        )
    }

    /// Check whether a marker selects arithmetic entropy coding.
    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            Self::ExtendedSequentialArithmetic
                | Self::ProgressiveDctArithmetic
                | Self::LosslessArithmetic
        )
    }
}

impl fmt::Debug for SofMarker {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self {
            Self::BaselineDct => write!(f, "Baseline DCT"),
            Self::ExtendedSequentialHuffman => {
                write!(f, "Extended sequential DCT, Huffman coding")
            }
            Self::ProgressiveDctHuffman => write!(f, "Progressive DCT, Huffman coding"),
            Self::LosslessHuffman => write!(f, "Lossless (sequential), Huffman coding"),
            Self::ExtendedSequentialArithmetic => {
                write!(f, "Extended sequential DCT, arithmetic coding")
            }
            Self::ProgressiveDctArithmetic => write!(f, "Progressive DCT, arithmetic coding"),
            Self::LosslessArithmetic => write!(f, "Lossless (sequential), arithmetic coding")
        }
    }
}

/// Ceiling division without overflow for the small values used in MCU
/// geometry.
#[inline]
pub(crate) const fn div_ceil(a: usize, b: usize) -> usize {
    (a + b - 1) / b
}

#[cfg(test)]
mod tests {
    use super::{UN_ZIGZAG, ZIGZAG};

    #[test]
    fn zigzag_tables_are_inverses() {
        for stream_pos in 0..64 {
            assert_eq!(ZIGZAG[UN_ZIGZAG[stream_pos]], stream_pos);
        }
    }

    #[test]
    fn zigzag_padding_clamps() {
        for i in 64..80 {
            assert_eq!(UN_ZIGZAG[i], 63);
        }
    }
}
