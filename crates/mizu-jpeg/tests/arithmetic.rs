/*
 * Copyright (c) 2026.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT or Apache License
 */

//! Arithmetic frame handling at the stream level.
//!
//! The centerpiece is a known-answer decode of a real entropy coded
//! payload: the four bytes were produced by running the coefficient
//! decision sequence below through a reference QM encoder (T.81
//! Annex D, big-integer code register, Qe table identical to the
//! decoder's) and the expected samples were cross-checked decision by
//! decision against the decoding procedures of F.2.4. The remaining
//! tests cover headers, the conditioning segment and the degenerate
//! zero-fed scan the marker rule mandates.

use mizu_jpeg::{JpegDecoder, PlanarSink, SofMarker};

/// SOI, DQT (all 16s), optional DAC, SOF9 for a `width` x 8 single
/// component frame, SOS, `payload`, EOI.
fn arithmetic_stream(width: u8, with_dac: bool, payload: &[u8]) -> Vec<u8> {
    let mut stream = vec![0xFF, 0xD8];

    stream.extend([0xFF, 0xDB, 0x00, 0x43, 0x00]);
    stream.extend(std::iter::repeat(16).take(64));

    if with_dac {
        // DC table 0: L=0 U=2, AC table 0: Kx=4
        stream.extend([0xFF, 0xCC, 0x00, 0x06, 0x00, 0x20, 0x10, 0x04]);
    }

    stream.extend([
        0xFF, 0xC9, 0x00, 0x0B, 0x08, 0x00, 0x08, 0x00, width, 0x01, 0x01, 0x11, 0x00,
    ]);

    stream.extend([0xFF, 0xDA, 0x00, 0x08, 0x01, 0x01, 0x00, 0x00, 0x3F, 0x00]);

    stream.extend_from_slice(payload);

    stream.extend([0xFF, 0xD9]);

    stream
}

/// Decode a sequential arithmetic scan whose payload was produced by
/// a reference QM encoder, and compare every reconstructed sample.
///
/// The scan is 16x8, one component, quantizer 16 everywhere, default
/// conditioning (L=0, U=1, Kx=5), two data units:
///
///   block 1: DC difference +6, EOB
///     decisions: nonzero=1, sign=0, magnitude tree 1,1,1,0 under
///     bins 2/20/21/22 (category 4), magnitude bits 0,1 under bin 36
///     (so v-1 = 0b101), AC EOB=1; leaves the large-positive DC
///     context (12) behind
///   block 2: DC difference -3, AC at zig-zag 1 = +2, EOB
///     decisions under the shifted context: nonzero=1, sign=1,
///     magnitude 1,1,0 under bins 15/20/21, magnitude bit 0 under
///     bin 35; AC: eob=0, nonzero=1, sign=0 on the fixed bin,
///     magnitude 1,0 under bin 2, EOB at k=2
///
/// Coefficients after dequantization: block 1 is DC-only (48),
/// every sample 48/8 + 128 = 140; block 2 has DC 3*16 = 48 plus one
/// horizontal AC basis coefficient 2*16 = 32, which reconstructs the
/// same cosine ramp on every row.
#[test]
fn decodes_a_reference_encoded_sequential_stream() {
    let data = arithmetic_stream(16, false, &[0xCE, 0x8A, 0x6E, 0x40]);

    let mut decoder = JpegDecoder::new(&data);
    decoder.decode_headers().unwrap();

    let info = decoder.info().unwrap();
    assert_eq!(info.sof, SofMarker::ExtendedSequentialArithmetic);
    assert_eq!((info.width, info.height), (16, 8));

    let mut sink = PlanarSink::new(16, 8, &decoder.components());
    decoder.decode(&mut sink).expect("arithmetic decode");

    // one ramp row of the right-hand block, DC 3 plus AC 2 at the
    // (1, 0) frequency
    let ramp = [140_u16, 139, 137, 135, 133, 131, 129, 128];

    let plane = sink.plane(0);

    for y in 0..8 {
        for x in 0..8 {
            assert_eq!(plane[y * 16 + x], 140, "left block at ({x},{y})");
        }
        for x in 8..16 {
            assert_eq!(plane[y * 16 + x], ramp[x - 8], "right block at ({x},{y})");
        }
    }
}

#[test]
fn arithmetic_headers_parse() {
    let data = arithmetic_stream(8, true, &[]);

    let mut decoder = JpegDecoder::new(&data);
    decoder.decode_headers().expect("headers should parse");

    let info = decoder.info().unwrap();
    assert_eq!(info.sof, SofMarker::ExtendedSequentialArithmetic);
    assert_eq!((info.width, info.height), (8, 8));
}

/// An empty entropy segment synthesizes zero bytes per the marker
/// rule. The decoder must terminate (either with a decoded block or a
/// corrupt-stream error), never hang or panic, and must not read past
/// EOI.
#[test]
fn zero_fed_arithmetic_scan_terminates() {
    for with_dac in [false, true] {
        let data = arithmetic_stream(8, with_dac, &[]);

        let mut decoder = JpegDecoder::new(&data);
        decoder.decode_headers().unwrap();

        let mut sink = PlanarSink::new(8, 8, &decoder.components());

        // both outcomes are acceptable for a degenerate stream, the
        // property under test is bounded, graceful termination
        let _ = decoder.decode(&mut sink);
    }
}

#[test]
fn identify_handles_arithmetic_streams() {
    let data = arithmetic_stream(16, true, &[0xCE, 0x8A, 0x6E, 0x40]);

    let mut decoder = JpegDecoder::new(&data);
    assert_eq!(decoder.identify().unwrap(), data.len());

    let info = decoder.info().unwrap();
    assert_eq!(info.sof, SofMarker::ExtendedSequentialArithmetic);
}

#[test]
fn bad_conditioning_bounds_are_rejected() {
    let mut stream = vec![0xFF, 0xD8];

    // DC conditioning with L > U
    stream.extend([0xFF, 0xCC, 0x00, 0x04, 0x00, 0x13]);

    let mut decoder = JpegDecoder::new(&stream);
    assert!(decoder.decode_headers().is_err());
}

#[test]
fn bad_kx_is_rejected() {
    let mut stream = vec![0xFF, 0xD8];

    // AC conditioning with Kx = 0
    stream.extend([0xFF, 0xCC, 0x00, 0x04, 0x10, 0x00]);

    let mut decoder = JpegDecoder::new(&stream);
    assert!(decoder.decode_headers().is_err());
}
