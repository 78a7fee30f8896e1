/*
 * Copyright (c) 2026.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT or Apache License
 */

//! Progressive Huffman scan decoding.
//!
//! Every scan refines the frame's coefficient blocks in place, so the
//! whole frame is materialized in a [`BlockCache`] and the sample
//! writeback happens once, after the last scan.
//!
//! Scan shapes the format allows here: interleaved scans carry DC
//! coefficients only, AC scans are always non-interleaved and touch
//! one spectral band of one component at one bit position.

use log::trace;

use crate::bitstream::BitStream;
use crate::cache::BlockCache;
use crate::decoder::JpegDecoder;
use crate::errors::JpegError;
use crate::idct::{dequant_multipliers, dequantize_and_idct_block};
use crate::misc::MAX_TABLES;
use crate::sample::SampleSink;

impl<'a> JpegDecoder<'a> {
    /// Decode a progressive Huffman frame into `sink`.
    pub(crate) fn decode_progressive<S: SampleSink>(
        &mut self, sink: &mut S
    ) -> Result<(), JpegError> {
        self.setup_component_tables()?;

        let mut cache = BlockCache::for_frame(&self.components, self.mcu_x, self.mcu_y);
        let mut stream = BitStream::new();

        let mut seen_scans = 1_usize;

        loop {
            self.decode_progressive_scan(&mut stream, &mut cache)?;

            if stream.overread_by > 0 {
                return Err(JpegError::UnexpectedEof);
            }

            if !self.advance_between_scans(stream.marker.take())? {
                break;
            }

            seen_scans += 1;

            if seen_scans > self.options.max_scans() {
                return Err(JpegError::invalid(
                    self.stream.position(),
                    format!("too many scans, exceeded limit of {}", self.options.max_scans())
                ));
            }
        }

        self.finish_frame(sink, &cache)
    }

    /// Decode one progressive scan into the cache.
    fn decode_progressive_scan(
        &mut self, stream: &mut BitStream, cache: &mut BlockCache
    ) -> Result<(), JpegError> {
        stream.reset();
        stream.set_scan_params(self.succ_high, self.succ_low, self.spec_start, self.spec_end);

        for component in self.components.iter_mut() {
            component.dc_pred = 0;
        }
        self.todo = if self.restart_interval == 0 {
            usize::MAX
        } else {
            self.restart_interval
        };

        trace!(
            "progressive scan: components={}, band={}..={}, Ah={}, Al={}",
            self.num_scan_components,
            self.spec_start,
            self.spec_end,
            self.succ_high,
            self.succ_low
        );

        // a DC scan needs DC tables in its first pass only, an AC
        // scan needs AC tables unless it is a refinement driven purely
        // by EOB runs (the table is still required by the header)
        if self.spec_start == 0 && self.succ_high == 0 {
            self.check_tables(false)?;
        }

        if self.num_scan_components == 1 {
            self.decode_progressive_noninterleaved(stream, cache)
        } else {
            self.decode_progressive_interleaved(stream, cache)
        }
    }

    /// Interleaved progressive scan, DC coefficients only.
    fn decode_progressive_interleaved(
        &mut self, stream: &mut BitStream, cache: &mut BlockCache
    ) -> Result<(), JpegError> {
        if self.spec_start != 0 {
            return Err(JpegError::invalid(
                self.stream.position(),
                "interleaved progressive scans must be DC scans"
            ));
        }

        let mut restart_index = 0_usize;

        for mcu_row in 0..self.mcu_y {
            for mcu_col in 0..self.mcu_x {
                let is_last = mcu_row == self.mcu_y - 1 && mcu_col == self.mcu_x - 1;

                for scan_pos in 0..self.num_scan_components {
                    let k = self.z_order[scan_pos];

                    let dc_table = self.dc_huffman_tables
                        [self.components[k].dc_huff_table % MAX_TABLES]
                        .as_ref();

                    let component = &mut self.components[k];

                    for v in 0..component.vertical_sample {
                        for h in 0..component.horizontal_sample {
                            let bx = mcu_col * component.horizontal_sample + h;
                            let by = mcu_row * component.vertical_sample + v;

                            let block = cache.block_mut(k, bx, by);

                            if self.succ_high == 0 {
                                let table = dc_table.ok_or(JpegError::InvalidOperation(
                                    "DC table not bound"
                                ))?;

                                stream.decode_prog_dc_first(
                                    &mut self.stream,
                                    table,
                                    &mut block[0],
                                    &mut component.dc_pred
                                )?;
                            } else {
                                stream.decode_prog_dc_refine(&mut self.stream, &mut block[0])?;
                            }
                        }
                    }
                }

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

    /// Non-interleaved progressive scan over one component's grid.
    fn decode_progressive_noninterleaved(
        &mut self, stream: &mut BitStream, cache: &mut BlockCache
    ) -> Result<(), JpegError> {
        let k = self.z_order[0];

        let (blocks_w, blocks_h) = {
            let component = &self.components[k];
            (component.blocks_w, component.blocks_h)
        };

        let is_dc_scan = self.spec_start == 0;

        let mut restart_index = 0_usize;

        for by in 0..blocks_h {
            for bx in 0..blocks_w {
                let is_last = by == blocks_h - 1 && bx == blocks_w - 1;

                if is_dc_scan {
                    let dc_table = self.dc_huffman_tables
                        [self.components[k].dc_huff_table % MAX_TABLES]
                        .as_ref();

                    let component = &mut self.components[k];
                    let block = cache.block_mut(k, bx, by);

                    if self.succ_high == 0 {
                        let table =
                            dc_table.ok_or(JpegError::InvalidOperation("DC table not bound"))?;

                        stream.decode_prog_dc_first(
                            &mut self.stream,
                            table,
                            &mut block[0],
                            &mut component.dc_pred
                        )?;
                    } else {
                        stream.decode_prog_dc_refine(&mut self.stream, &mut block[0])?;
                    }
                } else {
                    let ac_table = self.ac_huffman_tables
                        [self.components[k].ac_huff_table % MAX_TABLES]
                        .as_ref()
                        .ok_or(JpegError::InvalidOperation("AC table not bound"))?;

                    let block = cache.block_mut(k, bx, by);

                    if self.succ_high == 0 {
                        if stream.eob_run > 0 {
                            // still inside a cross-block zero run
                            stream.eob_run -= 1;
                        } else {
                            stream.decode_prog_ac_first(&mut self.stream, ac_table, block)?;
                        }
                    } else {
                        stream.decode_prog_ac_refine(&mut self.stream, ac_table, block)?;
                    }
                }

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

    /// The final pass over a fully accumulated coefficient cache:
    /// dequantize, inverse transform, level shift and hand every
    /// in-image block to the sink.
    pub(crate) fn finish_frame<S: SampleSink>(
        &mut self, sink: &mut S, cache: &BlockCache
    ) -> Result<(), JpegError> {
        let precision = self.info.precision;

        for (k, component) in self.components.iter().enumerate() {
            let multipliers = dequant_multipliers(&component.quantization_table);

            let mut samples = [0_u16; 64];

            for by in 0..component.blocks_h {
                for bx in 0..component.blocks_w {
                    dequantize_and_idct_block(
                        cache.block(k, bx, by),
                        &multipliers,
                        precision,
                        &mut samples
                    );

                    sink.write_block(
                        &samples,
                        k,
                        bx * 8 * component.scale_x,
                        by * 8 * component.scale_y
                    )?;
                }
            }
        }

        trace!("finished decoding frame");

        Ok(())
    }
}
