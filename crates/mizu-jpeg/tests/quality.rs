/*
 * Copyright (c) 2026.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT or Apache License
 */

//! Quality estimation against our own encoder output.

use mizu_core::options::EncoderOptions;
use mizu_jpeg::{ChromaSampling, JpegDecoder, JpegEncoder, PlanarSource};

fn encode_at_quality(quality: u8) -> Vec<u8> {
    let source = PlanarSource::uniform(48, 48, 3, 128);

    let options = EncoderOptions::default().set_quality(quality);
    let mut encoder = JpegEncoder::ycbcr(options, ChromaSampling::Ratio444);

    let mut stream = Vec::new();
    encoder.encode(&source, &mut stream).unwrap();

    stream
}

fn estimated(data: &[u8]) -> f32 {
    let mut decoder = JpegDecoder::new(data);
    decoder.decode_headers().unwrap();
    decoder.estimate_quality().unwrap()
}

#[test]
fn estimation_is_monotonic_in_the_target() {
    let mut last = -1.0_f32;

    for quality in [20_u8, 35, 50, 65, 80, 90, 95] {
        let estimate = estimated(&encode_at_quality(quality));

        assert!(
            estimate > last,
            "quality {quality} estimated {estimate}, previous {last}"
        );

        last = estimate;
    }
}

#[test]
fn estimation_recovers_the_target_closely() {
    for quality in [30_u8, 50, 75, 90] {
        let estimate = estimated(&encode_at_quality(quality));

        assert!(
            (estimate - f32::from(quality)).abs() < 3.0,
            "quality {quality} estimated as {estimate}"
        );
    }
}

#[test]
fn all_ones_tables_estimate_as_100() {
    let estimate = estimated(&encode_at_quality(100));

    assert!((estimate - 100.0).abs() < 0.5);
}
