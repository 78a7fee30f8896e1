/*
 * Copyright (c) 2026.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT or Apache License
 */

//! Sample input and output seams.
//!
//! The decoder hands finished 8x8 sample blocks to a [`SampleSink`],
//! the encoder pulls 8x8 sample blocks from a [`SampleSource`]. Both
//! work in full resolution coordinates: for a sub-sampled component
//! the decoder multiplies block positions up by the sampling ratio, so
//! the sink decides the up-sampling policy (the bundled [`PlanarSink`]
//! replicates nearest-neighbor); the encoder reads full resolution
//! blocks and box-filters them down itself.
//!
//! Colorspace handling is entirely outside this crate, planes are
//! whatever the stream says they are, usually Y/Cb/Cr.

use crate::components::ComponentInfo;
use crate::errors::JpegError;

/// Receiver for decoded sample blocks.
pub trait SampleSink {
    /// Accept one decoded block of `component` in natural order.
    ///
    /// `x`/`y` are the block's top-left corner in full resolution
    /// pixels; for a sub-sampled component each sample covers
    /// `scale_x * scale_y` full resolution pixels.
    fn write_block(
        &mut self, block: &[u16; 64], component: usize, x: usize, y: usize
    ) -> Result<(), JpegError>;
}

/// Provider of source sample blocks for encoding.
pub trait SampleSource {
    /// Full resolution image width.
    fn width(&self) -> u16;

    /// Full resolution image height.
    fn height(&self) -> u16;

    /// Fill `block` with the 8x8 samples of `component` whose top-left
    /// corner is at full resolution pixel `(x, y)`, replicating edge
    /// samples past the image boundary.
    fn read_block(&self, block: &mut [i16; 64], component: usize, x: usize, y: usize);
}

/// A sink collecting each component into a full resolution plane,
/// up-sampling by sample replication.
pub struct PlanarSink {
    width: usize,
    height: usize,
    planes: Vec<Vec<u16>>,
    scales: Vec<(usize, usize)>
}

impl PlanarSink {
    /// Create a sink for the frame described by `components`, sized
    /// `width` by `height`.
    pub fn new(width: usize, height: usize, components: &[ComponentInfo]) -> PlanarSink {
        let h_max = components
            .iter()
            .map(|c| usize::from(c.horizontal_sample))
            .max()
            .unwrap_or(1);
        let v_max = components
            .iter()
            .map(|c| usize::from(c.vertical_sample))
            .max()
            .unwrap_or(1);

        let scales = components
            .iter()
            .map(|c| {
                (
                    h_max / usize::from(c.horizontal_sample),
                    v_max / usize::from(c.vertical_sample)
                )
            })
            .collect();

        PlanarSink {
            width,
            height,
            planes: vec![vec![0; width * height]; components.len()],
            scales
        }
    }

    /// Borrow the finished plane of one component.
    pub fn plane(&self, component: usize) -> &[u16] {
        &self.planes[component]
    }

    /// The finished plane of one component narrowed to bytes, for
    /// 8-bit frames.
    pub fn plane_u8(&self, component: usize) -> Vec<u8> {
        self.planes[component].iter().map(|x| *x as u8).collect()
    }

    /// Number of planes.
    pub fn num_planes(&self) -> usize {
        self.planes.len()
    }
}

impl SampleSink for PlanarSink {
    fn write_block(
        &mut self, block: &[u16; 64], component: usize, x: usize, y: usize
    ) -> Result<(), JpegError> {
        let (scale_x, scale_y) = *self
            .scales
            .get(component)
            .ok_or(JpegError::InvalidOperation("block for an unknown component"))?;

        let plane = &mut self.planes[component];

        for sy in 0..8 {
            for sx in 0..8 {
                let sample = block[sy * 8 + sx];

                // replicate into the scale_x * scale_y footprint,
                // clipping at the image edge
                for ry in 0..scale_y {
                    let py = y + sy * scale_y + ry;

                    if py >= self.height {
                        break;
                    }

                    for rx in 0..scale_x {
                        let px = x + sx * scale_x + rx;

                        if px >= self.width {
                            break;
                        }

                        plane[py * self.width + px] = sample;
                    }
                }
            }
        }

        Ok(())
    }
}

/// A source reading from caller-provided full resolution planes.
pub struct PlanarSource {
    width: u16,
    height: u16,
    planes: Vec<Vec<u16>>
}

impl PlanarSource {
    /// Wrap full resolution planes, one per component, each
    /// `width * height` samples in raster order.
    pub fn new(width: u16, height: u16, planes: Vec<Vec<u16>>) -> Result<PlanarSource, JpegError> {
        let expected = usize::from(width) * usize::from(height);

        for plane in &planes {
            if plane.len() < expected {
                return Err(JpegError::BufferTooSmall {
                    expected,
                    found: plane.len()
                });
            }
        }

        Ok(PlanarSource {
            width,
            height,
            planes
        })
    }

    /// A single-plane source where every sample has the same value,
    /// handy for tests.
    pub fn uniform(width: u16, height: u16, components: usize, value: u16) -> PlanarSource {
        let len = usize::from(width) * usize::from(height);

        PlanarSource {
            width,
            height,
            planes: vec![vec![value; len]; components]
        }
    }
}

impl SampleSource for PlanarSource {
    fn width(&self) -> u16 {
        self.width
    }

    fn height(&self) -> u16 {
        self.height
    }

    fn read_block(&self, block: &mut [i16; 64], component: usize, x: usize, y: usize) {
        let plane = &self.planes[component];

        let w = usize::from(self.width);
        let h = usize::from(self.height);

        for sy in 0..8 {
            // replicate the last row / column past the edge
            let py = (y + sy).min(h - 1);

            for sx in 0..8 {
                let px = (x + sx).min(w - 1);

                block[sy * 8 + sx] = plane[py * w + px] as i16;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn luma_info(h: u8, v: u8) -> ComponentInfo {
        ComponentInfo {
            id: 1,
            horizontal_sample: h,
            vertical_sample: v,
            quantization_table_id: 0,
            width: 0,
            height: 0
        }
    }

    #[test]
    fn sink_replicates_subsampled_blocks() {
        // luma 2x2, chroma 1x1 -> chroma scale (2, 2)
        let components = [luma_info(2, 2), luma_info(1, 1)];
        let mut sink = PlanarSink::new(16, 16, &components);

        let block = [77_u16; 64];
        sink.write_block(&block, 1, 0, 0).unwrap();

        // one 8x8 chroma block covers the whole 16x16 plane
        assert!(sink.plane(1).iter().all(|x| *x == 77));
    }

    #[test]
    fn sink_clips_at_the_edge() {
        let components = [luma_info(1, 1)];
        let mut sink = PlanarSink::new(10, 10, &components);

        let block = [5_u16; 64];
        sink.write_block(&block, 0, 8, 8).unwrap();

        assert_eq!(sink.plane(0)[9 * 10 + 9], 5);
        assert_eq!(sink.plane(0)[0], 0);
    }

    #[test]
    fn source_replicates_past_the_edge() {
        let mut plane = vec![0_u16; 100];
        plane[99] = 42;

        let source = PlanarSource::new(10, 10, vec![plane]).unwrap();

        let mut block = [0_i16; 64];
        source.read_block(&mut block, 0, 8, 8);

        // bottom-right corner replicated across the out-of-bounds area
        assert_eq!(block[1 * 8 + 1], 42);
        assert_eq!(block[7 * 8 + 7], 42);
    }
}
