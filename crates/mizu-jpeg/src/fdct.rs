/*
 * Copyright (c) 2026.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT or Apache License
 */

//! Floating point forward DCT and quantization.
//!
//! Same AAN factorization as the inverse transform: the outputs come
//! out scaled by `8 * aan[u] * aan[v]`, the scale is divided out
//! together with the quantizer step in one rounded multiply by a
//! precomputed reciprocal.
#![allow(clippy::cast_possible_truncation)]

use crate::idct::AAN_SCALE_FACTORS;

/// Build the combined descale and quantization reciprocals for one
/// table. Zero quantizer steps are treated as one.
pub(crate) fn quant_reciprocals(qt: &[u16; 64]) -> [f32; 64] {
    let mut out = [0.0_f32; 64];

    for v in 0..8 {
        for u in 0..8 {
            let step = f32::from(qt[v * 8 + u].max(1));

            out[v * 8 + u] =
                1.0 / (step * AAN_SCALE_FACTORS[u] * AAN_SCALE_FACTORS[v] * 8.0);
        }
    }

    out
}

/// Level shift `samples`, run the forward DCT and quantize into
/// natural-order coefficients.
pub(crate) fn forward_dct_quantize(
    samples: &[i16; 64], precision: u8, reciprocals: &[f32; 64], out: &mut [i16; 64]
) {
    let center = f32::from(1_i16 << (precision - 1));

    let mut data = [0.0_f32; 64];

    for (d, s) in data.iter_mut().zip(samples.iter()) {
        *d = f32::from(*s) - center;
    }

    // row pass
    for row in 0..8 {
        let i = row * 8;

        let tmp0 = data[i] + data[i + 7];
        let tmp7 = data[i] - data[i + 7];
        let tmp1 = data[i + 1] + data[i + 6];
        let tmp6 = data[i + 1] - data[i + 6];
        let tmp2 = data[i + 2] + data[i + 5];
        let tmp5 = data[i + 2] - data[i + 5];
        let tmp3 = data[i + 3] + data[i + 4];
        let tmp4 = data[i + 3] - data[i + 4];

        // even part
        let tmp10 = tmp0 + tmp3;
        let tmp13 = tmp0 - tmp3;
        let tmp11 = tmp1 + tmp2;
        let tmp12 = tmp1 - tmp2;

        data[i] = tmp10 + tmp11;
        data[i + 4] = tmp10 - tmp11;

        let z1 = (tmp12 + tmp13) * 0.707106781;
        data[i + 2] = tmp13 + z1;
        data[i + 6] = tmp13 - z1;

        // odd part
        let tmp10 = tmp4 + tmp5;
        let tmp11 = tmp5 + tmp6;
        let tmp12 = tmp6 + tmp7;

        let z5 = (tmp10 - tmp12) * 0.382683433;
        let z2 = 0.541196100 * tmp10 + z5;
        let z4 = 1.306562965 * tmp12 + z5;
        let z3 = tmp11 * 0.707106781;

        let z11 = tmp7 + z3;
        let z13 = tmp7 - z3;

        data[i + 5] = z13 + z2;
        data[i + 3] = z13 - z2;
        data[i + 1] = z11 + z4;
        data[i + 7] = z11 - z4;
    }

    // column pass
    for col in 0..8 {
        let tmp0 = data[col] + data[col + 56];
        let tmp7 = data[col] - data[col + 56];
        let tmp1 = data[col + 8] + data[col + 48];
        let tmp6 = data[col + 8] - data[col + 48];
        let tmp2 = data[col + 16] + data[col + 40];
        let tmp5 = data[col + 16] - data[col + 40];
        let tmp3 = data[col + 24] + data[col + 32];
        let tmp4 = data[col + 24] - data[col + 32];

        // even part
        let tmp10 = tmp0 + tmp3;
        let tmp13 = tmp0 - tmp3;
        let tmp11 = tmp1 + tmp2;
        let tmp12 = tmp1 - tmp2;

        data[col] = tmp10 + tmp11;
        data[col + 32] = tmp10 - tmp11;

        let z1 = (tmp12 + tmp13) * 0.707106781;
        data[col + 16] = tmp13 + z1;
        data[col + 48] = tmp13 - z1;

        // odd part
        let tmp10 = tmp4 + tmp5;
        let tmp11 = tmp5 + tmp6;
        let tmp12 = tmp6 + tmp7;

        let z5 = (tmp10 - tmp12) * 0.382683433;
        let z2 = 0.541196100 * tmp10 + z5;
        let z4 = 1.306562965 * tmp12 + z5;
        let z3 = tmp11 * 0.707106781;

        let z11 = tmp7 + z3;
        let z13 = tmp7 - z3;

        data[col + 40] = z13 + z2;
        data[col + 24] = z13 - z2;
        data[col + 8] = z11 + z4;
        data[col + 56] = z11 - z4;
    }

    // descale and quantize in one rounded multiply
    for k in 0..64 {
        let scaled = data[k] * reciprocals[k];

        out[k] = scaled.round() as i16;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::idct::{dequant_multipliers, dequantize_and_idct_block};

    #[test]
    fn flat_block_has_dc_only() {
        let samples = [200_i16; 64];
        let qt = [1_u16; 64];
        let reciprocals = quant_reciprocals(&qt);
        let mut coeffs = [0_i16; 64];

        forward_dct_quantize(&samples, 8, &reciprocals, &mut coeffs);

        // (200 - 128) * 8
        assert_eq!(coeffs[0], 576);
        assert!(coeffs[1..].iter().all(|x| *x == 0));
    }

    #[test]
    fn transform_roundtrip_is_tight() {
        let mut state = 0xDEAD_BEEF_u32;
        let mut next = move || {
            state = state.wrapping_mul(1664525).wrapping_add(1013904223);
            ((state >> 20) & 0xFF) as i16
        };

        let qt = [1_u16; 64];
        let reciprocals = quant_reciprocals(&qt);
        let multipliers = dequant_multipliers(&qt);

        for _ in 0..8 {
            let mut samples = [0_i16; 64];
            for s in samples.iter_mut() {
                *s = next();
            }

            let mut coeffs = [0_i16; 64];
            forward_dct_quantize(&samples, 8, &reciprocals, &mut coeffs);

            let mut decoded = [0_u16; 64];
            dequantize_and_idct_block(&coeffs, &multipliers, 8, &mut decoded);

            for (orig, dec) in samples.iter().zip(decoded.iter()) {
                let diff = (i32::from(*orig) - i32::from(*dec)).abs();
                assert!(diff <= 1, "roundtrip error {diff} at quality 100");
            }
        }
    }
}
