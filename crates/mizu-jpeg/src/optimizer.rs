/*
 * Copyright (c) 2026.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT or Apache License
 */

//! The lossless Huffman optimizer.
//!
//! Parses a sequential Huffman stream into its raw coefficient blocks
//! (no dequantization, no transform), gathers symbol statistics over
//! them and re-emits the identical coefficients as one scan with
//! freshly built optimal codebooks. Restart markers are dropped on the
//! way, application and comment segments are preserved verbatim unless
//! stripping is requested.

use log::trace;
use mizu_core::options::DecoderOptions;

use crate::decoder::JpegDecoder;
use crate::encoder::{emit_entropy, gather_statistics};
use crate::errors::JpegError;
use crate::huffenc::{Frequencies, HuffmanEncodeTable};
use crate::marker::Marker;
use crate::misc::{SofMarker, MAX_TABLES};
use crate::writer::BitWriter;

/// Re-encodes baseline streams with image specific Huffman tables.
pub struct JpegOptimizer {
    options: DecoderOptions
}

impl Default for JpegOptimizer {
    fn default() -> Self {
        Self::new()
    }
}

impl JpegOptimizer {
    #[must_use]
    pub fn new() -> JpegOptimizer {
        JpegOptimizer {
            options: DecoderOptions::default()
        }
    }

    #[must_use]
    pub fn new_with_options(options: DecoderOptions) -> JpegOptimizer {
        JpegOptimizer { options }
    }

    /// Losslessly re-emit `data` into `sink` with optimized Huffman
    /// tables. `strip` drops APPn and COM segments instead of copying
    /// them.
    ///
    /// # Errors
    /// [`InvalidOperation`](JpegError::InvalidOperation) when the
    /// stream is not sequential Huffman, otherwise see [`JpegError`].
    pub fn optimize(
        &self, data: &[u8], sink: &mut Vec<u8>, strip: bool
    ) -> Result<(), JpegError> {
        let mut decoder = JpegDecoder::new_with_options(self.options, data);

        decoder.decode_headers()?;

        let sof = decoder.info.sof;

        if !matches!(
            sof,
            SofMarker::BaselineDct | SofMarker::ExtendedSequentialHuffman
        ) {
            return Err(JpegError::InvalidOperation(
                "the optimizer accepts sequential Huffman streams only"
            ));
        }

        // round-trip the coefficient stream, still quantized
        let cache = decoder.read_coefficients()?;

        // the re-emitted scan uses slot 0 for the first component and
        // slot 1 for the rest, the conventional layout
        for (pos, component) in decoder.components.iter_mut().enumerate() {
            let slot = usize::from(pos != 0);
            component.dc_huff_table = slot;
            component.ac_huff_table = slot;
        }

        let components = &decoder.components;

        let mut dc_freq = [[0_u32; 257]; MAX_TABLES];
        let mut ac_freq = [[0_u32; 257]; MAX_TABLES];

        gather_statistics(
            &cache,
            components,
            decoder.mcu_x,
            decoder.mcu_y,
            0,
            &mut dc_freq,
            &mut ac_freq
        );

        let mut dc_tables: [Option<HuffmanEncodeTable>; MAX_TABLES] = [None, None, None, None];
        let mut ac_tables: [Option<HuffmanEncodeTable>; MAX_TABLES] = [None, None, None, None];

        for component in components.iter() {
            let slot = component.dc_huff_table;

            if dc_tables[slot].is_none() {
                dc_tables[slot] = Some(build_table(&dc_freq[slot])?);
                ac_tables[slot] = Some(build_table(&ac_freq[slot])?);
            }
        }

        trace!(
            "optimizing {}x{} stream, {} components, strip={strip}",
            decoder.info.width,
            decoder.info.height,
            components.len()
        );

        // assemble the output stream
        let mut writer = BitWriter::new();

        writer.write_marker(Marker::SOI);

        if !strip {
            for (marker, body) in &decoder.extra_segments {
                writer.write_segment(*marker, body);
            }
        }

        let mut qt_written = [false; MAX_TABLES];
        for component in components.iter() {
            let slot = component.quantization_table_id;
            if !qt_written[slot] {
                let table = decoder.qt_tables[slot]
                    .as_ref()
                    .ok_or(JpegError::InvalidOperation("quantization table vanished"))?;
                writer.write_dqt(slot as u8, table);
                qt_written[slot] = true;
            }
        }

        writer.write_frame_header(
            sof,
            decoder.info.precision,
            decoder.info.width,
            decoder.info.height,
            components
        );

        let mut dht_written = [false; MAX_TABLES];
        for component in components.iter() {
            let slot = component.dc_huff_table;
            if !dht_written[slot] {
                writer.write_dht(0, slot as u8, dc_tables[slot].as_ref().unwrap());
                writer.write_dht(1, slot as u8, ac_tables[slot].as_ref().unwrap());
                dht_written[slot] = true;
            }
        }

        {
            let selected: Vec<&crate::components::Components> = components.iter().collect();
            writer.write_scan_header(&selected, (0, 63));
        }

        emit_entropy(
            &mut writer,
            &cache,
            components,
            decoder.mcu_x,
            decoder.mcu_y,
            // restart markers are never re-emitted
            0,
            &dc_tables,
            &ac_tables
        )?;

        writer.write_marker(Marker::EOI);

        sink.extend_from_slice(&writer.into_inner());

        Ok(())
    }
}

fn build_table(freq: &Frequencies) -> Result<HuffmanEncodeTable, JpegError> {
    HuffmanEncodeTable::build_optimal(freq)
}
