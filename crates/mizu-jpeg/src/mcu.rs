/*
 * Copyright (c) 2026.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT or Apache License
 */

//! Sequential Huffman scan decoding.
//!
//! The MCU loop is shared between two consumers: normal decoding
//! (dequantize, inverse transform, hand samples to the sink) and the
//! optimizer's coefficient pass which stores the raw blocks in a
//! [`BlockCache`] without touching them.

use log::trace;

use crate::bitstream::BitStream;
use crate::cache::BlockCache;
use crate::components::Components;
use crate::decoder::{get_marker, JpegDecoder};
use crate::errors::JpegError;
use crate::idct::{dequant_multipliers, dequantize_and_idct_block};
use crate::marker::Marker;
use crate::misc::{MAX_COMPONENTS, MAX_TABLES};
use crate::sample::SampleSink;

/// Where decoded coefficient blocks of a sequential scan go.
pub(crate) trait BlockConsumer {
    /// Take one decoded block of `component` at block position
    /// `(bx, by)` in the component's own grid.
    fn consume(
        &mut self, component: &Components, component_idx: usize, bx: usize, by: usize,
        block: &[i16; 64]
    ) -> Result<(), JpegError>;
}

/// Dequantize, inverse transform and forward to the sample sink.
pub(crate) struct SinkConsumer<'a, S> {
    sink: &'a mut S,
    multipliers: [[f32; 64]; MAX_COMPONENTS],
    precision: u8
}

impl<'a, S: SampleSink> SinkConsumer<'a, S> {
    pub(crate) fn new(sink: &'a mut S, components: &[Components], precision: u8) -> Self {
        let mut multipliers = [[0.0_f32; 64]; MAX_COMPONENTS];

        for (m, component) in multipliers.iter_mut().zip(components.iter()) {
            *m = dequant_multipliers(&component.quantization_table);
        }

        SinkConsumer {
            sink,
            multipliers,
            precision
        }
    }
}

impl<S: SampleSink> BlockConsumer for SinkConsumer<'_, S> {
    fn consume(
        &mut self, component: &Components, component_idx: usize, bx: usize, by: usize,
        block: &[i16; 64]
    ) -> Result<(), JpegError> {
        // blocks in the MCU padding area are decoded but not emitted
        if bx >= component.blocks_w || by >= component.blocks_h {
            return Ok(());
        }

        let mut samples = [0_u16; 64];

        dequantize_and_idct_block(
            block,
            &self.multipliers[component_idx],
            self.precision,
            &mut samples
        );

        self.sink.write_block(
            &samples,
            component_idx,
            bx * 8 * component.scale_x,
            by * 8 * component.scale_y
        )
    }
}

/// Store raw coefficients for transcoding.
struct CacheConsumer<'a> {
    cache: &'a mut BlockCache
}

impl BlockConsumer for CacheConsumer<'_> {
    fn consume(
        &mut self, _component: &Components, component_idx: usize, bx: usize, by: usize,
        block: &[i16; 64]
    ) -> Result<(), JpegError> {
        *self.cache.block_mut(component_idx, bx, by) = *block;
        Ok(())
    }
}

impl<'a> JpegDecoder<'a> {
    /// Decode a sequential Huffman frame into `sink`.
    pub(crate) fn decode_sequential<S: SampleSink>(
        &mut self, sink: &mut S
    ) -> Result<(), JpegError> {
        self.setup_component_tables()?;

        let mut consumer = SinkConsumer::new(sink, &self.components, self.info.precision);

        self.decode_sequential_scans(&mut consumer)
    }

    /// Decode the entropy coded data of a sequential Huffman frame
    /// into a coefficient cache, no dequantization, no transform.
    pub(crate) fn read_coefficients(&mut self) -> Result<BlockCache, JpegError> {
        let mut cache = BlockCache::for_frame(&self.components, self.mcu_x, self.mcu_y);

        let mut consumer = CacheConsumer { cache: &mut cache };

        self.decode_sequential_scans(&mut consumer)?;

        Ok(cache)
    }

    /// Run every scan of the frame through `consumer`.
    ///
    /// The first scan header was already parsed by the header loop,
    /// further scans (non-interleaved streams carry one per
    /// component) are handled as they come.
    fn decode_sequential_scans<C: BlockConsumer>(
        &mut self, consumer: &mut C
    ) -> Result<(), JpegError> {
        let mut stream = BitStream::new();

        loop {
            self.check_tables(true)?;

            for component in self.components.iter_mut() {
                component.dc_pred = 0;
            }
            self.todo = if self.restart_interval == 0 {
                usize::MAX
            } else {
                self.restart_interval
            };

            if self.num_scan_components > 1 {
                self.decode_interleaved_scan(&mut stream, consumer)?;
            } else {
                self.decode_noninterleaved_scan(&mut stream, consumer)?;
            }

            if stream.overread_by > 0 {
                return Err(JpegError::UnexpectedEof);
            }

            // the scan ended on a marker: EOI finishes the frame, SOS
            // starts the next scan, table definitions may sit between
            // the two
            if !self.advance_between_scans(stream.marker.take())? {
                return Ok(());
            }

            stream.reset();
        }
    }

    /// One interleaved scan: MCUs iterate all selected components.
    fn decode_interleaved_scan<C: BlockConsumer>(
        &mut self, stream: &mut BitStream, consumer: &mut C
    ) -> Result<(), JpegError> {
        trace!(
            "decoding interleaved scan over {} MCUs",
            self.mcu_x * self.mcu_y
        );

        let mut restart_index = 0_usize;
        let mut block = [0_i16; 64];

        for mcu_row in 0..self.mcu_y {
            for mcu_col in 0..self.mcu_x {
                let is_last = mcu_row == self.mcu_y - 1 && mcu_col == self.mcu_x - 1;

                for scan_pos in 0..self.num_scan_components {
                    let k = self.z_order[scan_pos];

                    let dc_table = self.dc_huffman_tables
                        [self.components[k].dc_huff_table % MAX_TABLES]
                        .as_ref()
                        .ok_or(JpegError::InvalidOperation("DC table not bound"))?;
                    let ac_table = self.ac_huffman_tables
                        [self.components[k].ac_huff_table % MAX_TABLES]
                        .as_ref()
                        .ok_or(JpegError::InvalidOperation("AC table not bound"))?;

                    let component = &mut self.components[k];

                    for v in 0..component.vertical_sample {
                        for h in 0..component.horizontal_sample {
                            block.fill(0);

                            stream.decode_block(
                                &mut self.stream,
                                dc_table,
                                ac_table,
                                &mut block,
                                &mut component.dc_pred
                            )?;

                            let bx = mcu_col * component.horizontal_sample + h;
                            let by = mcu_row * component.vertical_sample + v;

                            consumer.consume(component, k, bx, by, &block)?;
                        }
                    }
                }

                self.todo -= 1;

                if self.todo == 0 && !is_last {
                    if !self.handle_restart(stream, &mut restart_index)? {
                        // EOI at a restart boundary ends the scan
                        return Ok(());
                    }
                }
            }
        }

        Ok(())
    }

    /// One non-interleaved scan: a single component advances through
    /// its own block grid, an MCU is a single data unit.
    fn decode_noninterleaved_scan<C: BlockConsumer>(
        &mut self, stream: &mut BitStream, consumer: &mut C
    ) -> Result<(), JpegError> {
        let k = self.z_order[0];

        let (blocks_w, blocks_h) = {
            let component = &self.components[k];
            (component.blocks_w, component.blocks_h)
        };

        trace!("decoding non-interleaved scan, {blocks_w}x{blocks_h} blocks");

        let mut restart_index = 0_usize;
        let mut block = [0_i16; 64];

        for by in 0..blocks_h {
            for bx in 0..blocks_w {
                let is_last = by == blocks_h - 1 && bx == blocks_w - 1;

                let dc_table = self.dc_huffman_tables
                    [self.components[k].dc_huff_table % MAX_TABLES]
                    .as_ref()
                    .ok_or(JpegError::InvalidOperation("DC table not bound"))?;
                let ac_table = self.ac_huffman_tables
                    [self.components[k].ac_huff_table % MAX_TABLES]
                    .as_ref()
                    .ok_or(JpegError::InvalidOperation("AC table not bound"))?;

                let component = &mut self.components[k];

                block.fill(0);

                stream.decode_block(
                    &mut self.stream,
                    dc_table,
                    ac_table,
                    &mut block,
                    &mut component.dc_pred
                )?;

                consumer.consume(component, k, bx, by, &block)?;

                self.todo -= 1;

                if self.todo == 0 && !is_last {
                    if !self.handle_restart(stream, &mut restart_index)? {
                        return Ok(());
                    }
                }
            }
        }

        Ok(())
    }

    /// Verify and consume one restart marker.
    ///
    /// Returns `false` when EOI sits at the restart boundary, which
    /// terminates the scan cleanly.
    #[cold]
    pub(crate) fn handle_restart(
        &mut self, stream: &mut BitStream, restart_index: &mut usize
    ) -> Result<bool, JpegError> {
        self.todo = self.restart_interval;

        let marker = get_marker(&mut self.stream, stream)?;

        match marker {
            Marker::RST(n) => {
                if usize::from(n) != *restart_index % 8 {
                    return Err(JpegError::invalid(
                        self.stream.position(),
                        format!(
                            "restart marker RST{n} out of sequence, expected RST{}",
                            *restart_index % 8
                        )
                    ));
                }

                *restart_index += 1;

                stream.reset();

                for component in self.components.iter_mut() {
                    component.dc_pred = 0;
                    component.dc_context = 0;
                }

                Ok(true)
            }
            Marker::EOI => {
                // hand it back for the scan epilogue
                stream.marker = Some(Marker::EOI);
                Ok(false)
            }
            other => Err(JpegError::invalid(
                self.stream.position(),
                format!("marker {other:?} found inside entropy data, corrupt stream")
            ))
        }
    }
}
