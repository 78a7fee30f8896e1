/*
 * Copyright (c) 2026.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT or Apache License
 */

//! Quantization tables.
//!
//! Tables travel in zig-zag order on the wire and are stored in
//! natural order in memory. Elements are `u16` so that both the 8-bit
//! and the 16-bit wire precision fit in one representation.

use crate::misc::UN_ZIGZAG;

/// The reference luminance table of Annex K.1, natural order,
/// corresponding to quality 50.
#[rustfmt::skip]
pub static STD_LUMINANCE_QT: [u16; 64] = [
    16,  11,  10,  16,  24,  40,  51,  61,
    12,  12,  14,  19,  26,  58,  60,  55,
    14,  13,  16,  24,  40,  57,  69,  56,
    14,  17,  22,  29,  51,  87,  80,  62,
    18,  22,  37,  56,  68, 109, 103,  77,
    24,  35,  55,  64,  81, 104, 113,  92,
    49,  64,  78,  87, 103, 121, 120, 101,
    72,  92,  95,  98, 112, 100, 103,  99
];

/// The reference chrominance table of Annex K.1, natural order.
#[rustfmt::skip]
pub static STD_CHROMINANCE_QT: [u16; 64] = [
    17,  18,  24,  47,  99,  99,  99,  99,
    18,  21,  26,  66,  99,  99,  99,  99,
    24,  26,  56,  99,  99,  99,  99,  99,
    47,  66,  99,  99,  99,  99,  99,  99,
    99,  99,  99,  99,  99,  99,  99,  99,
    99,  99,  99,  99,  99,  99,  99,  99,
    99,  99,  99,  99,  99,  99,  99,  99,
    99,  99,  99,  99,  99,  99,  99,  99
];

/// Convert a zig-zag ordered wire table into natural order.
pub(crate) fn un_zig_zag<T>(a: &[T]) -> [u16; 64]
where
    T: Copy,
    u16: From<T>
{
    let mut output = [0_u16; 64];

    for i in 0..64 {
        output[UN_ZIGZAG[i]] = u16::from(a[i]);
    }

    output
}

/// Scale a reference table to a quality in 1..=100, the IJG recipe.
///
/// Quality 50 returns the table unchanged, higher halves it towards
/// all-ones, lower multiplies it up. Every element is kept nonzero.
pub fn scale_quantization_table(base: &[u16; 64], quality: u8) -> [u16; 64] {
    let quality = i32::from(quality.clamp(1, 100));

    let scale = if quality < 50 {
        5000 / quality
    } else {
        200 - quality * 2
    };

    let mut out = [0_u16; 64];

    for (o, b) in out.iter_mut().zip(base.iter()) {
        let v = (i32::from(*b) * scale + 50) / 100;
        // baseline tables are 8 bit on the wire
        *o = v.clamp(1, 255) as u16;
    }

    out
}

/// Estimate the quality a table pair was produced with.
///
/// Computes the mean percentage scale of each table against the Annex
/// K.1 reference at quality 50 and inverts the IJG scaling formula.
/// With both tables present the lower of the two estimates is
/// reported, clamped to `[0, 100]`.
pub fn estimate_quality(luma: &[u16; 64], chroma: Option<&[u16; 64]>) -> f32 {
    let luma_q = estimate_single(luma, &STD_LUMINANCE_QT);

    let quality = match chroma {
        Some(chroma) => luma_q.min(estimate_single(chroma, &STD_CHROMINANCE_QT)),
        None => luma_q
    };

    quality.clamp(0.0, 100.0)
}

fn estimate_single(table: &[u16; 64], base: &[u16; 64]) -> f32 {
    if table.iter().all(|x| *x == 1) {
        return 100.0;
    }

    let mut sum = 0.0_f64;

    for (t, b) in table.iter().zip(base.iter()) {
        sum += 100.0 * f64::from(*t) / f64::from(*b);
    }
    // mean scale factor in percent
    let m = sum / 64.0;

    let quality = if m <= 100.0 { (200.0 - m) / 2.0 } else { 5000.0 / m };

    quality as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_50_is_identity() {
        assert_eq!(scale_quantization_table(&STD_LUMINANCE_QT, 50), STD_LUMINANCE_QT);
    }

    #[test]
    fn quality_100_is_all_ones_for_reference() {
        let t = scale_quantization_table(&STD_LUMINANCE_QT, 100);
        assert!(t.iter().all(|x| *x == 1));
    }

    #[test]
    fn estimate_inverts_scaling() {
        // below ~quality 12 the 255 clamp starts to distort the mean,
        // the estimate is then only an upper bound
        for quality in [25_u8, 50, 75, 90] {
            let luma = scale_quantization_table(&STD_LUMINANCE_QT, quality);
            let chroma = scale_quantization_table(&STD_CHROMINANCE_QT, quality);

            let estimate = estimate_quality(&luma, Some(&chroma));

            assert!(
                (estimate - f32::from(quality)).abs() < 2.5,
                "quality {quality} estimated as {estimate}"
            );
        }
    }

    #[test]
    fn estimate_is_monotonic() {
        let mut last = -1.0;

        for quality in (5..=100).step_by(5) {
            let luma = scale_quantization_table(&STD_LUMINANCE_QT, quality as u8);
            let estimate = estimate_quality(&luma, None);

            assert!(estimate > last, "quality {quality} broke monotonicity");
            last = estimate;
        }
    }
}
