//! This crate implements a codec for ITU-T T.81 (JPEG-1) bitstreams.
//!
//! # Features
//!  - Decoding of baseline and extended sequential Huffman frames
//!    (SOF0/SOF1, 8 and 12 bit), progressive Huffman (SOF2), lossless
//!    Huffman (SOF3, 2..=16 bit) and sequential/progressive arithmetic
//!    frames (SOF9/SOF10)
//!  - A baseline Huffman encoder with an optional optimal-codebook
//!    statistics pass
//!  - A lossless optimizer that re-emits an existing sequential stream
//!    with image specific Huffman tables
//!  - Quality estimation from quantization tables
//!
//! The codec works on planar samples: decoded 8x8 blocks are pushed
//! into a [`SampleSink`], encoder input is pulled from a
//! [`SampleSource`]. Colorspace conversion (YCbCr to RGB and friends)
//! is deliberately out of scope, as are file I/O and container
//! specific metadata, the bundled [`PlanarSink`]/[`PlanarSource`]
//! adapters cover the common planar case.
//!
//! # Examples
//!
//! ## Decode a JPEG stream into planes
//! ```no_run
//! use mizu_jpeg::{JpegDecoder, PlanarSink};
//!
//! let data = std::fs::read("image.jpg").unwrap();
//!
//! let mut decoder = JpegDecoder::new(&data);
//! decoder.decode_headers().unwrap();
//!
//! let info = decoder.info().unwrap();
//! let mut sink = PlanarSink::new(
//!     usize::from(info.width),
//!     usize::from(info.height),
//!     &decoder.components()
//! );
//!
//! decoder.decode(&mut sink).unwrap();
//! println!("first luma sample: {}", sink.plane(0)[0]);
//! ```
//!
//! ## Encode planar samples to a baseline JPEG
//! ```
//! use mizu_core::options::EncoderOptions;
//! use mizu_jpeg::{JpegEncoder, PlanarSource};
//!
//! let source = PlanarSource::uniform(64, 64, 1, 128);
//! let mut encoder = JpegEncoder::luma(EncoderOptions::default());
//!
//! let mut sink = Vec::new();
//! encoder.encode(&source, &mut sink).unwrap();
//! assert_eq!(&sink[..2], &[0xFF, 0xD8]);
//! ```
#![warn(
    clippy::correctness,
    clippy::perf,
    clippy::missing_errors_doc,
    clippy::panic
)]
#![allow(clippy::needless_return, clippy::similar_names)]

mod arith;
mod bitstream;
mod cache;
mod components;
mod decoder;
mod encoder;
mod errors;
mod fdct;
mod headers;
mod huffenc;
mod huffman;
mod idct;
mod marker;
mod mcu;
mod mcu_arith;
mod mcu_lossless;
mod mcu_prog;
mod misc;
mod optimizer;
mod quantization;
mod sample;
mod writer;

pub use crate::components::ComponentInfo;
pub use crate::decoder::{ImageInfo, JpegDecoder};
pub use crate::encoder::{ChromaSampling, CodingClass, JpegEncoder};
pub use crate::errors::{JpegError, UnsupportedSchemes};
pub use crate::marker::Marker;
pub use crate::misc::SofMarker;
pub use crate::optimizer::JpegOptimizer;
pub use crate::quantization::{
    estimate_quality, scale_quantization_table, STD_CHROMINANCE_QT, STD_LUMINANCE_QT
};
pub use crate::sample::{PlanarSink, PlanarSource, SampleSink, SampleSource};
