/*
 * Copyright (c) 2026.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT or Apache License
 */

//! Floating point inverse DCT.
//!
//! The scaled AAN factorization: the usual cosine scale factors are
//! folded into the dequantization multipliers so the butterfly passes
//! themselves are multiplication-light. Output samples are rounded,
//! level shifted by half the sample range and clamped to the range of
//! the frame's precision.
#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::excessive_precision)]

/// The AAN scale factor of each frequency, `cos(k*pi/16) * sqrt(2)`
/// for k nonzero.
pub(crate) static AAN_SCALE_FACTORS: [f32; 8] = [
    1.0,
    1.387039845,
    1.306562965,
    1.175875602,
    1.0,
    0.785694958,
    0.541196100,
    0.275899379
];

/// Build the dequantization multipliers for one table: quantizer step
/// times the folded AAN scale of both frequencies times 1/8.
pub(crate) fn dequant_multipliers(qt: &[u16; 64]) -> [f32; 64] {
    let mut out = [0.0_f32; 64];

    for v in 0..8 {
        for u in 0..8 {
            out[v * 8 + u] = f32::from(qt[v * 8 + u])
                * AAN_SCALE_FACTORS[u]
                * AAN_SCALE_FACTORS[v]
                * 0.125;
        }
    }

    out
}

/// Dequantize a natural-order coefficient block, run the inverse DCT
/// and write level shifted samples clamped to `precision` bits.
pub(crate) fn dequantize_and_idct_block(
    coeffs: &[i16; 64], multipliers: &[f32; 64], precision: u8, out: &mut [u16; 64]
) {
    let center = 1_i32 << (precision - 1);
    let max_sample = (1_i32 << precision) - 1;

    // DC only block: the transform is flat
    if coeffs[1..] == [0; 63] {
        let value = f32::from(coeffs[0]) * multipliers[0];
        let sample = ((value + 0.5).floor() as i32 + center).clamp(0, max_sample) as u16;

        out.fill(sample);
        return;
    }

    let mut tmp = [0.0_f32; 64];

    // column pass
    for ptr in 0..8 {
        // even part
        let tmp0 = f32::from(coeffs[ptr]) * multipliers[ptr];
        let tmp1 = f32::from(coeffs[ptr + 16]) * multipliers[ptr + 16];
        let tmp2 = f32::from(coeffs[ptr + 32]) * multipliers[ptr + 32];
        let tmp3 = f32::from(coeffs[ptr + 48]) * multipliers[ptr + 48];

        let tmp10 = tmp0 + tmp2;
        let tmp11 = tmp0 - tmp2;

        let tmp13 = tmp1 + tmp3;
        let tmp12 = (tmp1 - tmp3) * 1.414213562 - tmp13;

        let tmp0 = tmp10 + tmp13;
        let tmp3 = tmp10 - tmp13;
        let tmp1 = tmp11 + tmp12;
        let tmp2 = tmp11 - tmp12;

        // odd part
        let tmp4 = f32::from(coeffs[ptr + 8]) * multipliers[ptr + 8];
        let tmp5 = f32::from(coeffs[ptr + 24]) * multipliers[ptr + 24];
        let tmp6 = f32::from(coeffs[ptr + 40]) * multipliers[ptr + 40];
        let tmp7 = f32::from(coeffs[ptr + 56]) * multipliers[ptr + 56];

        let z13 = tmp6 + tmp5;
        let z10 = tmp6 - tmp5;
        let z11 = tmp4 + tmp7;
        let z12 = tmp4 - tmp7;

        let tmp7 = z11 + z13;
        let tmp11_odd = (z11 - z13) * 1.414213562;

        let z5 = (z10 + z12) * 1.847759065;
        let tmp10_odd = 1.082392200 * z12 - z5;
        let tmp12_odd = -2.613125930 * z10 + z5;

        let tmp6 = tmp12_odd - tmp7;
        let tmp5 = tmp11_odd - tmp6;
        let tmp4 = tmp10_odd + tmp5;

        tmp[ptr] = tmp0 + tmp7;
        tmp[ptr + 56] = tmp0 - tmp7;
        tmp[ptr + 8] = tmp1 + tmp6;
        tmp[ptr + 48] = tmp1 - tmp6;
        tmp[ptr + 16] = tmp2 + tmp5;
        tmp[ptr + 40] = tmp2 - tmp5;
        tmp[ptr + 32] = tmp3 + tmp4;
        tmp[ptr + 24] = tmp3 - tmp4;
    }

    // row pass
    for row in 0..8 {
        let i = row * 8;

        // even part
        let tmp10 = tmp[i] + tmp[i + 4];
        let tmp11 = tmp[i] - tmp[i + 4];

        let tmp13 = tmp[i + 2] + tmp[i + 6];
        let tmp12 = (tmp[i + 2] - tmp[i + 6]) * 1.414213562 - tmp13;

        let tmp0 = tmp10 + tmp13;
        let tmp3 = tmp10 - tmp13;
        let tmp1 = tmp11 + tmp12;
        let tmp2 = tmp11 - tmp12;

        // odd part
        let z13 = tmp[i + 5] + tmp[i + 3];
        let z10 = tmp[i + 5] - tmp[i + 3];
        let z11 = tmp[i + 1] + tmp[i + 7];
        let z12 = tmp[i + 1] - tmp[i + 7];

        let tmp7 = z11 + z13;
        let tmp11_odd = (z11 - z13) * 1.414213562;

        let z5 = (z10 + z12) * 1.847759065;
        let tmp10_odd = 1.082392200 * z12 - z5;
        let tmp12_odd = -2.613125930 * z10 + z5;

        let tmp6 = tmp12_odd - tmp7;
        let tmp5 = tmp11_odd - tmp6;
        let tmp4 = tmp10_odd + tmp5;

        let results = [
            tmp0 + tmp7,
            tmp1 + tmp6,
            tmp2 + tmp5,
            tmp3 - tmp4,
            tmp3 + tmp4,
            tmp2 - tmp5,
            tmp1 - tmp6,
            tmp0 - tmp7
        ];

        for (col, value) in results.iter().enumerate() {
            let sample = ((value + 0.5).floor() as i32 + center).clamp(0, max_sample);

            out[i + col] = sample as u16;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_idct(coeffs: &[f32; 64]) -> [f32; 64] {
        let mut out = [0.0_f32; 64];

        for y in 0..8 {
            for x in 0..8 {
                let mut acc = 0.0_f64;

                for v in 0..8 {
                    for u in 0..8 {
                        let cu = if u == 0 { 1.0 / 2.0_f64.sqrt() } else { 1.0 };
                        let cv = if v == 0 { 1.0 / 2.0_f64.sqrt() } else { 1.0 };

                        acc += cu
                            * cv
                            * f64::from(coeffs[v * 8 + u])
                            * ((2 * x + 1) as f64 * u as f64 * std::f64::consts::PI / 16.0).cos()
                            * ((2 * y + 1) as f64 * v as f64 * std::f64::consts::PI / 16.0).cos();
                    }
                }

                out[y * 8 + x] = (acc / 4.0) as f32;
            }
        }

        out
    }

    #[test]
    fn dc_only_block_is_flat() {
        let mut coeffs = [0_i16; 64];
        coeffs[0] = 64;

        let qt = [1_u16; 64];
        let multipliers = dequant_multipliers(&qt);
        let mut out = [0_u16; 64];

        dequantize_and_idct_block(&coeffs, &multipliers, 8, &mut out);

        // 64 / 8 + 128
        assert!(out.iter().all(|x| *x == 136));
    }

    #[test]
    fn matches_reference_transform() {
        // a handful of deterministic pseudo random blocks
        let mut state = 0x1234_5678_u32;
        let mut next = move || {
            state = state.wrapping_mul(1664525).wrapping_add(1013904223);
            ((state >> 16) as i32 % 256) - 128
        };

        for _ in 0..8 {
            let mut coeffs = [0_i16; 64];
            for c in coeffs.iter_mut() {
                *c = next() as i16;
            }

            let qt = [1_u16; 64];
            let multipliers = dequant_multipliers(&qt);
            let mut out = [0_u16; 64];

            dequantize_and_idct_block(&coeffs, &multipliers, 8, &mut out);

            let mut floats = [0.0_f32; 64];
            for (f, c) in floats.iter_mut().zip(coeffs.iter()) {
                *f = f32::from(*c);
            }
            let reference = reference_idct(&floats);

            for i in 0..64 {
                let expected = (reference[i] + 0.5).floor() as i32 + 128;
                let expected = expected.clamp(0, 255);

                let diff = (i32::from(out[i]) - expected).abs();
                assert!(diff <= 1, "position {i}: got {} expected {expected}", out[i]);
            }
        }
    }
}
