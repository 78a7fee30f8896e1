/*
 * Copyright (c) 2026.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT or Apache License
 */

//! Lossless (SOF3) scan decoding.
//!
//! No transform: every sample is a Huffman-coded difference against a
//! prediction computed from its left, upper and upper-left neighbours.
//! The scan header's `Ss` field selects one of seven predictors, `Al`
//! is the point transform. Differences accumulate modulo 2^16.
//!
//! Decoded planes are handed to the sink in 8x8 tiles so the output
//! seam stays the same as for the DCT paths.

use log::trace;

use crate::bitstream::BitStream;
use crate::decoder::JpegDecoder;
use crate::errors::JpegError;
use crate::misc::{div_ceil, MAX_TABLES};
use crate::sample::SampleSink;

/// Per-component plane state while a lossless scan runs.
struct LosslessPlane {
    samples: Vec<u16>,
    /// Plane width, padded to whole MCUs for interleaved scans.
    width: usize
}

impl LosslessPlane {
    fn at(&self, x: usize, y: usize) -> i32 {
        i32::from(self.samples[y * self.width + x])
    }
}

impl<'a> JpegDecoder<'a> {
    /// Decode a lossless Huffman frame into `sink`.
    pub(crate) fn decode_lossless<S: SampleSink>(&mut self, sink: &mut S) -> Result<(), JpegError> {
        let mut stream = BitStream::new();

        // padded plane dimensions, interleaved scans advance in MCUs
        // of h*v samples per component
        let mcus_x = div_ceil(usize::from(self.info.width), self.h_max);
        let mcus_y = div_ceil(usize::from(self.info.height), self.v_max);

        let mut planes: Vec<LosslessPlane> = self
            .components
            .iter()
            .map(|c| {
                let width = mcus_x * c.horizontal_sample;
                let height = mcus_y * c.vertical_sample;

                LosslessPlane {
                    samples: vec![0; width * height],
                    width
                }
            })
            .collect();

        loop {
            self.decode_lossless_scan(&mut stream, &mut planes, mcus_x, mcus_y)?;

            if stream.overread_by > 0 {
                return Err(JpegError::UnexpectedEof);
            }

            if !self.advance_between_scans(stream.marker.take())? {
                break;
            }
        }

        self.write_lossless_planes(sink, &planes)
    }

    fn decode_lossless_scan(
        &mut self, stream: &mut BitStream, planes: &mut [LosslessPlane], mcus_x: usize,
        mcus_y: usize
    ) -> Result<(), JpegError> {
        self.check_tables(false)?;

        let predictor = self.spec_start;
        let point_transform = self.succ_low;
        let precision = self.info.precision;

        trace!(
            "lossless scan: predictor {predictor}, point transform {point_transform}, {} components",
            self.num_scan_components
        );

        self.todo = if self.restart_interval == 0 {
            usize::MAX
        } else {
            self.restart_interval
        };

        let mut restart_index = 0_usize;
        // samples decoded since scan start or restart, per component,
        // drives the reduced boundary predictors
        let mut restarted = true;

        let interleaved = self.num_scan_components > 1;

        let (cols, rows) = if interleaved {
            (mcus_x, mcus_y)
        } else {
            let k = self.z_order[0];
            let component = &self.components[k];
            // a non-interleaved lossless scan advances sample by
            // sample over the unpadded component array
            (component.width, component.height)
        };

        for row in 0..rows {
            for col in 0..cols {
                let is_last = row == rows - 1 && col == cols - 1;

                for scan_pos in 0..self.num_scan_components {
                    let k = self.z_order[scan_pos];

                    let table = self.dc_huffman_tables
                        [self.components[k].dc_huff_table % MAX_TABLES]
                        .as_ref()
                        .ok_or(JpegError::InvalidOperation("DC table not bound"))?;

                    let component = &self.components[k];
                    let (h_samp, v_samp) = if interleaved {
                        (component.horizontal_sample, component.vertical_sample)
                    } else {
                        (1, 1)
                    };

                    let plane = &mut planes[k];

                    for v in 0..v_samp {
                        for h in 0..h_samp {
                            let x = col * h_samp + h;
                            let y = row * v_samp + v;

                            let diff =
                                stream.decode_lossless_diff(&mut self.stream, table)?;

                            let prediction = predict(
                                plane,
                                x,
                                y,
                                predictor,
                                precision,
                                point_transform,
                                restarted
                            );

                            let value = (prediction.wrapping_add(diff) & 0xFFFF) as u16;

                            plane.samples[y * plane.width + x] = value;
                        }
                    }
                }

                restarted = false;

                self.todo -= 1;

                if self.todo == 0 && !is_last {
                    if !self.handle_restart(stream, &mut restart_index)? {
                        return Ok(());
                    }
                    // prediction restarts like at the top of a scan
                    restarted = true;
                }
            }
        }

        Ok(())
    }

    /// Tile the finished planes into 8x8 blocks for the sink, applying
    /// the point transform on the way out.
    fn write_lossless_planes<S: SampleSink>(
        &mut self, sink: &mut S, planes: &[LosslessPlane]
    ) -> Result<(), JpegError> {
        let point_transform = self.succ_low;

        for (k, component) in self.components.iter().enumerate() {
            let plane = &planes[k];

            let tiles_x = div_ceil(component.width, 8);
            let tiles_y = div_ceil(component.height, 8);

            let mut block = [0_u16; 64];

            for ty in 0..tiles_y {
                for tx in 0..tiles_x {
                    for sy in 0..8 {
                        let py = (ty * 8 + sy).min(component.height - 1);

                        for sx in 0..8 {
                            let px = (tx * 8 + sx).min(component.width - 1);

                            block[sy * 8 + sx] =
                                plane.samples[py * plane.width + px] << point_transform;
                        }
                    }

                    sink.write_block(
                        &block,
                        k,
                        tx * 8 * component.scale_x,
                        ty * 8 * component.scale_y
                    )?;
                }
            }
        }

        Ok(())
    }
}

/// H.1.2.1: prediction of one sample from its causal neighbourhood.
///
/// The first sample after a scan start or restart uses the midpoint of
/// the (point transformed) sample range, the rest of the first line
/// predicts from the left, the first column from above.
fn predict(
    plane: &LosslessPlane, x: usize, y: usize, predictor: u8, precision: u8, point_transform: u8,
    restarted: bool
) -> i32 {
    if restarted {
        return 1 << (precision - point_transform - 1);
    }

    if y == 0 && x == 0 {
        return 1 << (precision - point_transform - 1);
    }

    if y == 0 {
        // first line, only the left neighbour exists
        return plane.at(x - 1, y);
    }

    if x == 0 {
        // first column, only the upper neighbour exists
        return plane.at(x, y - 1);
    }

    let a = plane.at(x - 1, y);
    let b = plane.at(x, y - 1);
    let c = plane.at(x - 1, y - 1);

    match predictor {
        1 => a,
        2 => b,
        3 => c,
        4 => a + b - c,
        5 => a + ((b - c) >> 1),
        6 => b + ((a - c) >> 1),
        _ => (a + b) >> 1
    }
}
