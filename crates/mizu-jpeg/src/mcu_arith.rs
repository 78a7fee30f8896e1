/*
 * Copyright (c) 2026.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT or Apache License
 */

//! Arithmetic scan decoding, sequential (SOF9) and progressive
//! (SOF10).
//!
//! The MCU geometry is identical to the Huffman paths, only the
//! symbol decoding differs: every decision comes out of the QM coder
//! in `arith.rs` under a context selected per F.2.4. The decoded DC
//! deltas and AC run structure feed the same downstream block
//! processing as the Huffman decoders.

use log::trace;

use mizu_core::bytestream::ByteReader;

use crate::arith::{decode_ac_value, decode_dc_diff, ArithDecoder, ArithStatistics, AC_STAT_BINS};
use crate::cache::BlockCache;
use crate::decoder::JpegDecoder;
use crate::errors::JpegError;
use crate::marker::Marker;
use crate::mcu::{BlockConsumer, SinkConsumer};
use crate::misc::{MAX_TABLES, UN_ZIGZAG};
use crate::sample::SampleSink;

impl<'a> JpegDecoder<'a> {
    /// Decode a sequential arithmetic frame into `sink`.
    pub(crate) fn decode_arith_sequential<S: SampleSink>(
        &mut self, sink: &mut S
    ) -> Result<(), JpegError> {
        self.setup_component_tables()?;

        let mut consumer = SinkConsumer::new(sink, &self.components, self.info.precision);

        let mut latched;

        loop {
            latched = self.decode_arith_sequential_scan(&mut consumer)?;

            if !self.advance_between_scans(latched)? {
                return Ok(());
            }
        }
    }

    /// One sequential arithmetic scan. Returns the marker that ended
    /// it, if the restart handler already pulled it out.
    fn decode_arith_sequential_scan<C: BlockConsumer>(
        &mut self, consumer: &mut C
    ) -> Result<Option<Marker>, JpegError> {
        let mut decoder = ArithDecoder::new(&mut self.stream);
        let mut stats = ArithStatistics::new();

        for component in self.components.iter_mut() {
            component.dc_pred = 0;
            component.dc_context = 0;
        }
        self.todo = if self.restart_interval == 0 {
            usize::MAX
        } else {
            self.restart_interval
        };

        let interleaved = self.num_scan_components > 1;

        trace!(
            "sequential arithmetic scan, {} components",
            self.num_scan_components
        );

        let (cols, rows) = if interleaved {
            (self.mcu_x, self.mcu_y)
        } else {
            let component = &self.components[self.z_order[0]];
            (component.blocks_w, component.blocks_h)
        };

        let mut restart_index = 0_usize;
        let mut block = [0_i16; 64];

        for row in 0..rows {
            for col in 0..cols {
                let is_last = row == rows - 1 && col == cols - 1;

                for scan_pos in 0..self.num_scan_components {
                    let k = self.z_order[scan_pos];

                    let dc_tbl = self.components[k].dc_huff_table % MAX_TABLES;
                    let ac_tbl = self.components[k].ac_huff_table % MAX_TABLES;
                    let (lower, upper) = self.dc_conditioning[dc_tbl];
                    let kx = self.ac_conditioning[ac_tbl];

                    let component = &mut self.components[k];

                    let (h_samp, v_samp) = if interleaved {
                        (component.horizontal_sample, component.vertical_sample)
                    } else {
                        (1, 1)
                    };

                    for v in 0..v_samp {
                        for h in 0..h_samp {
                            block.fill(0);

                            // DC difference, F.2.4.1
                            let diff = decode_dc_diff(
                                &mut decoder,
                                &mut self.stream,
                                &mut stats.dc_stats[dc_tbl],
                                &mut component.dc_context,
                                lower,
                                upper
                            )?;

                            component.dc_pred = component.dc_pred.wrapping_add(diff);
                            block[0] = component.dc_pred as i16;

                            // AC coefficients, F.2.4.2
                            decode_arith_ac_block(
                                &mut decoder,
                                &mut self.stream,
                                &mut stats.ac_stats[ac_tbl],
                                kx,
                                &mut block
                            )?;

                            let bx = col * h_samp + h;
                            let by = row * v_samp + v;

                            consumer.consume(component, k, bx, by, &block)?;
                        }
                    }
                }

                self.todo -= 1;

                if self.todo == 0 && !is_last {
                    if let Some(marker) =
                        self.handle_arith_restart(&mut decoder, &mut stats, &mut restart_index)?
                    {
                        return Ok(Some(marker));
                    }
                }
            }
        }

        Ok(None)
    }

    /// Decode a progressive arithmetic frame into `sink`.
    pub(crate) fn decode_arith_progressive<S: SampleSink>(
        &mut self, sink: &mut S
    ) -> Result<(), JpegError> {
        self.setup_component_tables()?;

        let mut cache = BlockCache::for_frame(&self.components, self.mcu_x, self.mcu_y);

        let mut seen_scans = 1_usize;

        loop {
            let latched = self.decode_arith_progressive_scan(&mut cache)?;

            if !self.advance_between_scans(latched)? {
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

    /// One progressive arithmetic scan over the coefficient cache.
    fn decode_arith_progressive_scan(
        &mut self, cache: &mut BlockCache
    ) -> Result<Option<Marker>, JpegError> {
        let mut decoder = ArithDecoder::new(&mut self.stream);
        let mut stats = ArithStatistics::new();

        for component in self.components.iter_mut() {
            component.dc_pred = 0;
            component.dc_context = 0;
        }
        self.todo = if self.restart_interval == 0 {
            usize::MAX
        } else {
            self.restart_interval
        };

        trace!(
            "progressive arithmetic scan: components={}, band={}..={}, Ah={}, Al={}",
            self.num_scan_components,
            self.spec_start,
            self.spec_end,
            self.succ_high,
            self.succ_low
        );

        if self.num_scan_components > 1 && self.spec_start != 0 {
            return Err(JpegError::invalid(
                self.stream.position(),
                "interleaved progressive scans must be DC scans"
            ));
        }

        let interleaved = self.num_scan_components > 1;

        let (cols, rows) = if interleaved {
            (self.mcu_x, self.mcu_y)
        } else {
            let component = &self.components[self.z_order[0]];
            (component.blocks_w, component.blocks_h)
        };

        let mut restart_index = 0_usize;

        for row in 0..rows {
            for col in 0..cols {
                let is_last = row == rows - 1 && col == cols - 1;

                for scan_pos in 0..self.num_scan_components {
                    let k = self.z_order[scan_pos];

                    let dc_tbl = self.components[k].dc_huff_table % MAX_TABLES;
                    let ac_tbl = self.components[k].ac_huff_table % MAX_TABLES;
                    let (lower, upper) = self.dc_conditioning[dc_tbl];
                    let kx = self.ac_conditioning[ac_tbl];

                    let spec_start = self.spec_start;
                    let spec_end = self.spec_end;
                    let succ_high = self.succ_high;
                    let succ_low = self.succ_low;

                    let component = &mut self.components[k];

                    let (h_samp, v_samp) = if interleaved {
                        (component.horizontal_sample, component.vertical_sample)
                    } else {
                        (1, 1)
                    };

                    for v in 0..v_samp {
                        for h in 0..h_samp {
                            let bx = col * h_samp + h;
                            let by = row * v_samp + v;

                            let block = cache.block_mut(k, bx, by);

                            if spec_start == 0 {
                                if succ_high == 0 {
                                    // G.2.1: DC first scan
                                    let diff = decode_dc_diff(
                                        &mut decoder,
                                        &mut self.stream,
                                        &mut stats.dc_stats[dc_tbl],
                                        &mut component.dc_context,
                                        lower,
                                        upper
                                    )?;

                                    component.dc_pred = component.dc_pred.wrapping_add(diff);
                                    block[0] = (component.dc_pred << succ_low) as i16;
                                } else {
                                    // DC refinement rides the fixed bin
                                    if decoder.decode_fixed(&mut self.stream) == 1 {
                                        block[0] |= 1 << succ_low;
                                    }
                                }
                            } else if succ_high == 0 {
                                decode_arith_ac_first(
                                    &mut decoder,
                                    &mut self.stream,
                                    &mut stats.ac_stats[ac_tbl],
                                    kx,
                                    spec_start,
                                    spec_end,
                                    succ_low,
                                    block
                                )?;
                            } else {
                                decode_arith_ac_refine(
                                    &mut decoder,
                                    &mut self.stream,
                                    &mut stats.ac_stats[ac_tbl],
                                    spec_start,
                                    spec_end,
                                    succ_low,
                                    block
                                )?;
                            }
                        }
                    }
                }

                self.todo -= 1;

                if self.todo == 0 && !is_last {
                    if let Some(marker) =
                        self.handle_arith_restart(&mut decoder, &mut stats, &mut restart_index)?
                    {
                        return Ok(Some(marker));
                    }
                }
            }
        }

        Ok(None)
    }

    /// Restart inside an arithmetic scan: verify the marker sequence,
    /// reset statistics and predictions and re-initialize the coder
    /// after the marker.
    ///
    /// Returns `Some(EOI)` when the image ends at the restart
    /// boundary.
    #[cold]
    fn handle_arith_restart(
        &mut self, decoder: &mut ArithDecoder, stats: &mut ArithStatistics,
        restart_index: &mut usize
    ) -> Result<Option<Marker>, JpegError> {
        self.todo = self.restart_interval;

        let marker = self.next_marker()?;

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

                stats.reset();

                for component in self.components.iter_mut() {
                    component.dc_pred = 0;
                    component.dc_context = 0;
                }

                decoder.restart(&mut self.stream);

                Ok(None)
            }
            Marker::EOI => Ok(Some(Marker::EOI)),
            other => Err(JpegError::invalid(
                self.stream.position(),
                format!("marker {other:?} found inside entropy data, corrupt stream")
            ))
        }
    }
}

/// AC coefficients of one sequential block, F.2.4.2.
fn decode_arith_ac_block(
    decoder: &mut ArithDecoder, reader: &mut ByteReader,
    ac_stats: &mut [u8; AC_STAT_BINS], kx: u8, block: &mut [i16; 64]
) -> Result<(), JpegError> {
    let mut k = 1_usize;

    while k <= 63 {
        let mut base = 3 * (k - 1);

        // end of block decision
        if decoder.decode(reader, &mut ac_stats[base]) == 1 {
            break;
        }

        // zero run: walk forward while the coefficient is zero
        while decoder.decode(reader, &mut ac_stats[base + 1]) == 0 {
            base += 3;
            k += 1;

            if k > 63 {
                return Err(JpegError::invalid(
                    reader.position(),
                    "arithmetic AC run past the block end, corrupt stream"
                ));
            }
        }

        let sign = decoder.decode_fixed(reader);
        let value = decode_ac_value(decoder, reader, ac_stats, base, k, kx, sign)?;

        block[UN_ZIGZAG[k] & 63] = value as i16;

        k += 1;
    }

    Ok(())
}

/// First AC scan of one progressive block, G.2.2.
#[allow(clippy::too_many_arguments)]
fn decode_arith_ac_first(
    decoder: &mut ArithDecoder, reader: &mut ByteReader,
    ac_stats: &mut [u8; AC_STAT_BINS], kx: u8, spec_start: u8, spec_end: u8,
    succ_low: u8, block: &mut [i16; 64]
) -> Result<(), JpegError> {
    let mut k = usize::from(spec_start);
    let end = usize::from(spec_end);

    while k <= end {
        let mut base = 3 * (k - 1);

        if decoder.decode(reader, &mut ac_stats[base]) == 1 {
            break;
        }

        while decoder.decode(reader, &mut ac_stats[base + 1]) == 0 {
            base += 3;
            k += 1;

            if k > end {
                return Err(JpegError::invalid(
                    reader.position(),
                    "arithmetic AC run past the band end, corrupt stream"
                ));
            }
        }

        let sign = decoder.decode_fixed(reader);
        let value = decode_ac_value(decoder, reader, ac_stats, base, k, kx, sign)?;

        block[UN_ZIGZAG[k] & 63] = (value << succ_low) as i16;

        k += 1;
    }

    Ok(())
}

/// AC refinement of one progressive block, G.2.3.
fn decode_arith_ac_refine(
    decoder: &mut ArithDecoder, reader: &mut ByteReader,
    ac_stats: &mut [u8; AC_STAT_BINS], spec_start: u8, spec_end: u8, succ_low: u8,
    block: &mut [i16; 64]
) -> Result<(), JpegError> {
    let p1 = 1_i16 << succ_low;
    let m1 = -1_i16 << succ_low;

    let start = usize::from(spec_start);
    let end = usize::from(spec_end);

    // EOBx: where the previous scans' nonzero coefficients stop
    let mut kex = end;
    loop {
        if block[UN_ZIGZAG[kex] & 63] != 0 {
            break;
        }
        if kex <= start {
            kex = 0;
            break;
        }
        kex -= 1;
    }

    let mut k = start;

    while k <= end {
        let mut base = 3 * (k - 1);

        if k > kex && decoder.decode(reader, &mut ac_stats[base]) == 1 {
            // EOB: no further coefficients become nonzero
            break;
        }

        loop {
            let coefficient = &mut block[UN_ZIGZAG[k] & 63];

            if *coefficient != 0 {
                // correction bit for an already nonzero coefficient
                if decoder.decode(reader, &mut ac_stats[base + 2]) == 1 {
                    if *coefficient < 0 {
                        *coefficient += m1;
                    } else {
                        *coefficient += p1;
                    }
                }
                break;
            }

            if decoder.decode(reader, &mut ac_stats[base + 1]) == 1 {
                // newly nonzero coefficient, sign on the fixed bin
                *coefficient = if decoder.decode_fixed(reader) == 1 { m1 } else { p1 };
                break;
            }

            base += 3;
            k += 1;

            if k > end {
                return Err(JpegError::invalid(
                    reader.position(),
                    "arithmetic refinement ran past the band end, corrupt stream"
                ));
            }
        }

        k += 1;
    }

    Ok(())
}
