/*
 * Copyright (c) 2026.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT or Apache License
 */

//! A component, as described by the frame header, plus the scan-local
//! state the drivers thread through it.

use crate::errors::JpegError;
use crate::misc::{div_ceil, MAX_TABLES};

/// Represents a single component in a frame.
pub(crate) struct Components {
    /// Component identifier, unique within the frame.
    pub id: u8,
    /// Horizontal sampling factor, 1..=4
    pub horizontal_sample: usize,
    /// Vertical sampling factor, 1..=4
    pub vertical_sample: usize,
    /// Quantization table selector from the frame header.
    pub quantization_table_id: usize,
    /// Dequantization values, natural order. Bound from the table list
    /// when the first scan starts.
    pub quantization_table: [u16; 64],
    /// DC entropy table selector from the scan header. Doubles as the
    /// DC conditioning selector for arithmetic scans.
    pub dc_huff_table: usize,
    /// AC entropy table selector from the scan header.
    pub ac_huff_table: usize,
    /// DC prediction for the current scan, reset at scan start and on
    /// restart markers.
    pub dc_pred: i32,
    /// DC conditioning context for arithmetic scans.
    pub dc_context: u8,
    /// Width of this component's sample array, `ceil(W * H_i / Hmax)`.
    pub width: usize,
    /// Height of this component's sample array.
    pub height: usize,
    /// Data units per row covering [`width`](Self::width).
    pub blocks_w: usize,
    /// Data unit rows covering [`height`](Self::height).
    pub blocks_h: usize,
    /// Horizontal up-shift to full resolution, `Hmax / H_i`.
    pub scale_x: usize,
    /// Vertical up-shift to full resolution, `Vmax / V_i`.
    pub scale_y: usize
}

impl Components {
    /// Create a component from the three bytes of its frame header
    /// record.
    pub fn from(value: [u8; 3], pos: u8) -> Result<Components, JpegError> {
        let [id, sampling, qt_id] = value;

        let horizontal_sample = usize::from(sampling >> 4);
        let vertical_sample = usize::from(sampling & 0x0F);

        if !(1..=4).contains(&horizontal_sample) || !(1..=4).contains(&vertical_sample) {
            return Err(JpegError::invalid(
                0,
                format!(
                    "component {pos} has invalid sampling factors ({horizontal_sample},{vertical_sample}), expected 1..=4"
                )
            ));
        }

        if usize::from(qt_id) >= MAX_TABLES {
            return Err(JpegError::invalid(
                0,
                format!("component {pos} selects quantization table {qt_id}, expected 0..=3")
            ));
        }

        Ok(Components {
            id,
            horizontal_sample,
            vertical_sample,
            quantization_table_id: usize::from(qt_id),
            quantization_table: [0; 64],
            dc_huff_table: 0,
            ac_huff_table: 0,
            dc_pred: 0,
            dc_context: 0,
            width: 0,
            height: 0,
            blocks_w: 0,
            blocks_h: 0,
            scale_x: 1,
            scale_y: 1
        })
    }

    /// Derive the sample array geometry once the frame-wide maxima are
    /// known.
    pub fn setup_geometry(&mut self, width: usize, height: usize, h_max: usize, v_max: usize) {
        self.width = div_ceil(width * self.horizontal_sample, h_max);
        self.height = div_ceil(height * self.vertical_sample, v_max);
        self.blocks_w = div_ceil(self.width, 8);
        self.blocks_h = div_ceil(self.height, 8);
        self.scale_x = h_max / self.horizontal_sample;
        self.scale_y = v_max / self.vertical_sample;
    }
}

/// Public per-component description, handed out by
/// [`JpegDecoder::components`](crate::JpegDecoder::components).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ComponentInfo {
    /// Component identifier from the frame header.
    pub id: u8,
    /// Horizontal sampling factor.
    pub horizontal_sample: u8,
    /// Vertical sampling factor.
    pub vertical_sample: u8,
    /// Quantization table selector.
    pub quantization_table_id: u8,
    /// Width of the component's own sample array.
    pub width: usize,
    /// Height of the component's own sample array.
    pub height: usize
}
