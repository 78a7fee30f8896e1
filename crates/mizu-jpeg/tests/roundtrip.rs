/*
 * Copyright (c) 2026.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT or Apache License
 */

//! Baseline encode-then-decode round trips.

use mizu_core::options::EncoderOptions;
use mizu_jpeg::{
    ChromaSampling, JpegDecoder, JpegEncoder, PlanarSink, PlanarSource, SofMarker
};

const SIZES: [u16; 9] = [1, 7, 8, 9, 16, 64, 127, 128, 129];

fn decode_to_planes(data: &[u8]) -> (PlanarSink, mizu_jpeg::ImageInfo) {
    let mut decoder = JpegDecoder::new(data);
    decoder.decode_headers().expect("headers should parse");

    let info = decoder.info().unwrap();

    let mut sink = PlanarSink::new(
        usize::from(info.width),
        usize::from(info.height),
        &decoder.components()
    );

    decoder.decode(&mut sink).expect("decode should succeed");

    (sink, info)
}

#[test]
fn uniform_gray_roundtrip_all_sizes_and_layouts() {
    let layouts = [
        ChromaSampling::Ratio444,
        ChromaSampling::Ratio422,
        ChromaSampling::Ratio420
    ];

    for &width in &SIZES {
        for &height in &SIZES {
            for layout in layouts {
                let source = PlanarSource::uniform(width, height, 3, 128);

                let mut encoder = JpegEncoder::ycbcr(EncoderOptions::default(), layout);
                let mut stream = Vec::new();

                encoder.encode(&source, &mut stream).expect("encode");

                let (sink, info) = decode_to_planes(&stream);

                assert_eq!(info.width, width);
                assert_eq!(info.height, height);
                assert_eq!(info.components, 3);
                assert_eq!(info.sof, SofMarker::BaselineDct);

                for plane_idx in 0..3 {
                    for (i, &sample) in sink.plane(plane_idx).iter().enumerate() {
                        let diff = (i32::from(sample) - 128).abs();
                        assert!(
                            diff <= 2,
                            "{width}x{height} {layout:?}: plane {plane_idx} sample {i} is {sample}"
                        );
                    }
                }
            }
        }
    }
}

#[test]
fn uniform_grayscale_roundtrip() {
    for &size in &SIZES {
        let source = PlanarSource::uniform(size, size, 1, 200);

        let mut encoder = JpegEncoder::luma(EncoderOptions::default());
        let mut stream = Vec::new();

        encoder.encode(&source, &mut stream).expect("encode");

        let (sink, info) = decode_to_planes(&stream);

        assert_eq!(info.components, 1);

        for &sample in sink.plane(0) {
            assert!((i32::from(sample) - 200).abs() <= 2, "sample {sample}");
        }
    }
}

/// A gradient at quality 100 must survive nearly unharmed, the
/// quantizer steps are all one.
#[test]
fn gradient_roundtrip_at_quality_100() {
    let width = 40_u16;
    let height = 24_u16;

    let mut plane = vec![0_u16; usize::from(width) * usize::from(height)];

    for y in 0..usize::from(height) {
        for x in 0..usize::from(width) {
            plane[y * usize::from(width) + x] = ((x * 4 + y * 2) % 256) as u16;
        }
    }

    let source = PlanarSource::new(width, height, vec![plane.clone()]).unwrap();

    let options = EncoderOptions::default().set_quality(100);
    let mut encoder = JpegEncoder::luma(options);
    let mut stream = Vec::new();

    encoder.encode(&source, &mut stream).expect("encode");

    let (sink, _) = decode_to_planes(&stream);

    for (i, (&orig, &dec)) in plane.iter().zip(sink.plane(0).iter()).enumerate() {
        let diff = (i32::from(orig) - i32::from(dec)).abs();
        assert!(diff <= 2, "sample {i}: {orig} vs {dec}");
    }
}

/// Encoding is deterministic: identical input produces identical
/// bytes.
#[test]
fn encoding_is_deterministic() {
    let source = PlanarSource::uniform(33, 17, 3, 90);

    let mut first = Vec::new();
    let mut second = Vec::new();

    JpegEncoder::ycbcr(EncoderOptions::default(), ChromaSampling::Ratio420)
        .encode(&source, &mut first)
        .unwrap();
    JpegEncoder::ycbcr(EncoderOptions::default(), ChromaSampling::Ratio420)
        .encode(&source, &mut second)
        .unwrap();

    assert_eq!(first, second);
}

/// Decoding is deterministic too, via a checksum over the planes.
#[test]
fn decoding_is_deterministic() {
    let source = PlanarSource::uniform(64, 64, 3, 77);

    let mut stream = Vec::new();
    JpegEncoder::ycbcr(EncoderOptions::default(), ChromaSampling::Ratio422)
        .encode(&source, &mut stream)
        .unwrap();

    let checksum = |data: &[u8]| -> u64 {
        let (sink, _) = decode_to_planes(data);

        let mut bytes = Vec::new();
        for plane_idx in 0..sink.num_planes() {
            for &sample in sink.plane(plane_idx) {
                bytes.extend_from_slice(&sample.to_le_bytes());
            }
        }

        xxhash_rust::xxh3::xxh3_64(&bytes)
    };

    assert_eq!(checksum(&stream), checksum(&stream));
}
