/*
 * Copyright (c) 2026.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT or Apache License
 */

//! Errors possible during encoding and decoding

use std::fmt;

use mizu_core::bytestream::EndOfStream;

/// Coding processes the decoder recognises but does not handle.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum UnsupportedSchemes {
    /// SOF5 / SOF13, differential sequential DCT
    DifferentialSequential,
    /// SOF6 / SOF14, differential progressive DCT
    DifferentialProgressive,
    /// SOF7 / SOF15, differential lossless
    DifferentialLossless,
    /// SOF11, lossless with arithmetic coding
    LosslessArithmetic
}

impl UnsupportedSchemes {
    /// Map the `n` of an `SOF(n)` marker to the scheme it selects,
    /// `None` when the scheme is one we support.
    #[must_use]
    pub fn from_int(n: u8) -> Option<Self> {
        match n {
            5 | 13 => Some(Self::DifferentialSequential),
            6 | 14 => Some(Self::DifferentialProgressive),
            7 | 15 => Some(Self::DifferentialLossless),
            11 => Some(Self::LosslessArithmetic),
            _ => None
        }
    }
}

/// All errors a codec operation can fail with.
///
/// Every operation either completes fully or fails with one of these,
/// leaving any output sink in whatever state it had reached.
pub enum JpegError {
    /// The stream was truncated, at a segment parser or inside the
    /// entropy coded data.
    UnexpectedEof,
    /// A malformed marker sequence outside an entropy coded segment,
    /// carries the offending code byte.
    InvalidMarker(u8),
    /// A header or table field violates a constraint. Carries the
    /// absolute stream offset where parsing failed and a message.
    InvalidData(usize, String),
    /// The frame type is recognised but not handled.
    Unsupported(UnsupportedSchemes),
    /// The API was misused, e.g. encoding without components.
    InvalidOperation(&'static str),
    /// An output area is too small to hold what would be written to it.
    BufferTooSmall { expected: usize, found: usize }
}

impl fmt::Debug for JpegError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEof => write!(f, "unexpected end of stream"),
            Self::InvalidMarker(code) => {
                write!(f, "invalid marker sequence, offending byte 0xFF{code:02X}")
            }
            Self::InvalidData(offset, reason) => {
                write!(f, "invalid data at offset {offset}: {reason}")
            }
            Self::Unsupported(sof) => {
                write!(f, "unsupported frame type: {sof:?}")
            }
            Self::InvalidOperation(reason) => {
                write!(f, "invalid operation: {reason}")
            }
            Self::BufferTooSmall { expected, found } => {
                write!(
                    f,
                    "buffer too small, expected at least {expected} entries but found {found}"
                )
            }
        }
    }
}

impl fmt::Display for JpegError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl std::error::Error for JpegError {}

impl From<EndOfStream> for JpegError {
    fn from(_: EndOfStream) -> Self {
        JpegError::UnexpectedEof
    }
}

impl JpegError {
    /// Shorthand for an [`InvalidData`](Self::InvalidData) with a
    /// static message.
    pub(crate) fn invalid(offset: usize, reason: impl Into<String>) -> JpegError {
        JpegError::InvalidData(offset, reason.into())
    }
}
