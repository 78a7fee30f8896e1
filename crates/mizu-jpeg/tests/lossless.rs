/*
 * Copyright (c) 2026.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT or Apache License
 */

//! Lossless (SOF3) decoding over hand-assembled streams.

use mizu_jpeg::{JpegDecoder, PlanarSink, SofMarker};

/// SOF3 for a `width` x `height` single component frame at
/// `precision` bits.
fn sof3_segment(width: u8, height: u8, precision: u8) -> Vec<u8> {
    vec![
        0xFF, 0xC3, 0x00, 0x0B, precision, 0x00, height, 0x00, width, 0x01, 0x01, 0x11, 0x00,
    ]
}

/// DHT (DC class) from explicit code length counts and symbols.
fn dht_segment(bits: &[u8; 16], symbols: &[u8]) -> Vec<u8> {
    let length = (2 + 1 + 16 + symbols.len()) as u16;

    let mut out = vec![0xFF, 0xC4];
    out.extend(length.to_be_bytes());
    out.push(0x00);
    out.extend_from_slice(bits);
    out.extend_from_slice(symbols);
    out
}

/// SOS selecting predictor `predictor` with point transform `pt`.
fn sos_segment(predictor: u8, pt: u8) -> Vec<u8> {
    vec![0xFF, 0xDA, 0x00, 0x08, 0x01, 0x01, 0x00, predictor, 0x00, pt]
}

fn decode(data: &[u8]) -> (Vec<u16>, mizu_jpeg::ImageInfo) {
    let mut decoder = JpegDecoder::new(data);
    decoder.decode_headers().unwrap();

    let info = decoder.info().unwrap();
    let mut sink = PlanarSink::new(
        usize::from(info.width),
        usize::from(info.height),
        &decoder.components()
    );

    decoder.decode(&mut sink).expect("lossless decode");

    (sink.plane(0).to_vec(), info)
}

/// All-zero differences: every sample equals the initial prediction,
/// the midpoint of the sample range.
#[test]
fn zero_differences_yield_the_midpoint() {
    let mut stream = vec![0xFF, 0xD8];

    stream.extend(sof3_segment(2, 2, 8));

    // one code: category 0 (no difference bits)
    let mut bits = [0_u8; 16];
    bits[0] = 1;
    stream.extend(dht_segment(&bits, &[0]));

    stream.extend(sos_segment(1, 0));

    // four samples, each one `0` bit, padded with ones
    stream.push(0x0F);

    stream.extend([0xFF, 0xD9]);

    let (plane, info) = decode(&stream);

    assert_eq!(info.sof, SofMarker::LosslessHuffman);
    assert_eq!(info.precision, 8);
    assert_eq!(plane, vec![128, 128, 128, 128]);
}

/// Mixed difference categories across a 2x2 frame, predictor 1.
///
/// Sample walk: 128 - 28 = 100, then left + 1 = 101, first column
/// predicts from above 100 - 1 = 99, and the last sample predicts
/// from its left neighbour, 99 + 1 = 100.
#[test]
fn predictor_one_reconstructs_the_plane() {
    let mut stream = vec![0xFF, 0xD8];

    stream.extend(sof3_segment(2, 2, 8));

    // category 1 gets the code `0`, category 5 the code `10`
    let mut bits = [0_u8; 16];
    bits[0] = 1;
    bits[1] = 1;
    stream.extend(dht_segment(&bits, &[1, 5]));

    stream.extend(sos_segment(1, 0));

    // payload, worked out by hand:
    //   s00: `10` + 00011 (-28)   s01: `0` + 1 (+1)
    //   s10: `0` + 0 (-1)         s11: `0` + 1 (+1)
    // = 10 00011 01 00 01 + three padding ones
    stream.extend([0b1000_0110, 0b1000_1111]);

    stream.extend([0xFF, 0xD9]);

    let (plane, _) = decode(&stream);

    assert_eq!(plane, vec![100, 101, 99, 100]);
}

/// 16 bit precision: the initial prediction is the midpoint of the
/// 16 bit range and the samples pass through unclamped.
#[test]
fn sixteen_bit_precision_midpoint() {
    let mut stream = vec![0xFF, 0xD8];

    stream.extend(sof3_segment(1, 1, 16));

    let mut bits = [0_u8; 16];
    bits[0] = 1;
    stream.extend(dht_segment(&bits, &[0]));

    stream.extend(sos_segment(1, 0));
    stream.push(0x7F);

    stream.extend([0xFF, 0xD9]);

    let (plane, info) = decode(&stream);

    assert_eq!(info.precision, 16);
    assert_eq!(plane, vec![1 << 15]);
}

/// A point transform shifts the decoded samples back up.
#[test]
fn point_transform_scales_the_output() {
    let mut stream = vec![0xFF, 0xD8];

    stream.extend(sof3_segment(1, 1, 8));

    let mut bits = [0_u8; 16];
    bits[0] = 1;
    stream.extend(dht_segment(&bits, &[0]));

    // Pt = 1: predictions run at 7 bits, output is shifted left once
    stream.extend(sos_segment(1, 1));
    stream.push(0x7F);

    stream.extend([0xFF, 0xD9]);

    let (plane, _) = decode(&stream);

    // midpoint of the 7 bit domain is 64, shifted out as 128
    assert_eq!(plane, vec![128]);
}
