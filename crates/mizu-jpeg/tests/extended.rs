/*
 * Copyright (c) 2026.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT or Apache License
 */

//! Extended sequential (SOF1) decoding, including 12 bit precision.

use mizu_jpeg::{JpegDecoder, PlanarSink, SofMarker};

/// A hand-assembled 8x8 single component 12 bit frame whose only
/// block has DC = 512 and no AC coefficients.
fn twelve_bit_stream() -> Vec<u8> {
    let mut stream = vec![0xFF, 0xD8];

    // DQT, all elements 1
    stream.extend([0xFF, 0xDB, 0x00, 0x43, 0x00]);
    stream.extend(std::iter::repeat(1).take(64));

    // SOF1, precision 12, 8x8, one component
    stream.extend([
        0xFF, 0xC1, 0x00, 0x0B, 0x0C, 0x00, 0x08, 0x00, 0x08, 0x01, 0x01, 0x11, 0x00,
    ]);

    // DC table: category 10 gets the 1-bit code `0`
    stream.extend([0xFF, 0xC4, 0x00, 0x14, 0x00, 0x01]);
    stream.extend(std::iter::repeat(0).take(15));
    stream.push(10);

    // AC table: symbol 0x00 (EOB) gets the 1-bit code `0`
    stream.extend([0xFF, 0xC4, 0x00, 0x14, 0x10, 0x01]);
    stream.extend(std::iter::repeat(0).take(15));
    stream.push(0x00);

    // SOS, sequential band
    stream.extend([0xFF, 0xDA, 0x00, 0x08, 0x01, 0x01, 0x00, 0x00, 0x3F, 0x00]);

    // DC: code `0` + ten raw bits 1000000000 (512), AC: EOB `0`,
    // padded with ones: 0100 0000 0000 1111
    stream.extend([0x40, 0x0F]);

    stream.extend([0xFF, 0xD9]);

    stream
}

#[test]
fn decodes_a_twelve_bit_frame() {
    let data = twelve_bit_stream();

    let mut decoder = JpegDecoder::new(&data);
    decoder.decode_headers().unwrap();

    let info = decoder.info().unwrap();
    assert_eq!(info.sof, SofMarker::ExtendedSequentialHuffman);
    assert_eq!(info.precision, 12);

    let mut sink = PlanarSink::new(8, 8, &decoder.components());
    decoder.decode(&mut sink).unwrap();

    // DC 512 at quantizer 1: 512 / 8 + 2048 = 2112, well within the
    // 12 bit sample range
    for &sample in sink.plane(0) {
        assert_eq!(sample, 2112);
        assert!(sample < (1 << 12));
    }
}

#[test]
fn baseline_frames_reject_precision_12() {
    let mut data = twelve_bit_stream();

    // downgrade SOF1 to SOF0, keeping the 12 bit precision byte
    let pos = data.windows(2).position(|w| w == [0xFF, 0xC1]).unwrap();
    data[pos + 1] = 0xC0;

    let mut decoder = JpegDecoder::new(&data);
    assert!(decoder.decode_headers().is_err());
}
