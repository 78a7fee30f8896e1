/*
 * Copyright (c) 2026.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT or Apache License
 */

//! Restart marker robustness: restart intervals must not change the
//! decoded output at all, the coefficients are identical.

use mizu_core::options::EncoderOptions;
use mizu_jpeg::{ChromaSampling, JpegDecoder, JpegEncoder, PlanarSink, PlanarSource};

fn textured_source(width: u16, height: u16, components: usize) -> PlanarSource {
    let len = usize::from(width) * usize::from(height);

    let planes = (0..components)
        .map(|c| {
            (0..len)
                .map(|i| (((i * 7 + c * 31) % 251) + c) as u16)
                .collect()
        })
        .collect();

    PlanarSource::new(width, height, planes).unwrap()
}

fn decode_planes(data: &[u8]) -> Vec<Vec<u16>> {
    let mut decoder = JpegDecoder::new(data);
    decoder.decode_headers().unwrap();

    let info = decoder.info().unwrap();
    let mut sink = PlanarSink::new(
        usize::from(info.width),
        usize::from(info.height),
        &decoder.components()
    );

    decoder.decode(&mut sink).unwrap();

    (0..sink.num_planes())
        .map(|i| sink.plane(i).to_vec())
        .collect()
}

fn encode(source: &PlanarSource, restart_interval: u16) -> Vec<u8> {
    let options = EncoderOptions::default().set_restart_interval(restart_interval);

    let mut encoder = JpegEncoder::ycbcr(options, ChromaSampling::Ratio420);
    let mut stream = Vec::new();

    encoder.encode(source, &mut stream).unwrap();

    stream
}

#[test]
fn restart_intervals_do_not_change_the_image() {
    let source = textured_source(133, 67, 3);

    let baseline = decode_planes(&encode(&source, 0));

    for interval in [1_u16, 7, 64] {
        let stream = encode(&source, interval);

        // the restarted stream really contains restart markers
        // (unless the interval exceeds the MCU count)
        let rst_count = stream
            .windows(2)
            .filter(|w| w[0] == 0xFF && (0xD0..=0xD7).contains(&w[1]))
            .count();

        if interval == 1 {
            assert!(rst_count > 0, "no restart markers emitted");
        }

        let decoded = decode_planes(&stream);

        assert_eq!(baseline, decoded, "interval {interval} changed the pixels");
    }
}

#[test]
fn restart_markers_cycle_through_all_eight() {
    // enough MCUs that the RST index wraps
    let source = textured_source(129, 129, 1);

    let options = EncoderOptions::default().set_restart_interval(1);
    let mut encoder = JpegEncoder::luma(options);
    let mut stream = Vec::new();
    encoder.encode(&source, &mut stream).unwrap();

    for n in 0..8_u8 {
        let marker = [0xFF, 0xD0 + n];
        assert!(
            stream.windows(2).any(|w| w == marker),
            "RST{n} never appears"
        );
    }

    // and the stream still decodes
    let _ = decode_planes(&stream);
}

#[test]
fn out_of_sequence_restart_is_rejected() {
    let source = textured_source(64, 16, 1);

    let stream = encode_luma_with_restarts(&source);

    // find the first restart marker and bump its index
    let mut corrupt = stream.clone();
    let pos = corrupt
        .windows(2)
        .position(|w| w[0] == 0xFF && (0xD0..=0xD7).contains(&w[1]))
        .expect("stream should contain restarts");

    corrupt[pos + 1] = 0xD0 + ((corrupt[pos + 1] - 0xD0 + 1) % 8);

    let mut decoder = JpegDecoder::new(&corrupt);
    decoder.decode_headers().unwrap();

    let info = decoder.info().unwrap();
    let mut sink = PlanarSink::new(
        usize::from(info.width),
        usize::from(info.height),
        &decoder.components()
    );

    assert!(decoder.decode(&mut sink).is_err());
}

fn encode_luma_with_restarts(source: &PlanarSource) -> Vec<u8> {
    let options = EncoderOptions::default().set_restart_interval(2);
    let mut encoder = JpegEncoder::luma(options);
    let mut stream = Vec::new();
    encoder.encode(source, &mut stream).unwrap();
    stream
}
