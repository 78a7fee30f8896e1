/*
 * Copyright (c) 2026.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT or Apache License
 */

//! The baseline encoder.
//!
//! Samples come in through a [`SampleSource`], run through level
//! shift, forward DCT and quantization into a coefficient cache, and
//! go out as one interleaved baseline scan. Huffman table selectors
//! the caller leaves unset are filled by a statistics pass over the
//! cached coefficients that builds image specific codebooks.

use log::trace;
use mizu_core::options::EncoderOptions;

use crate::cache::BlockCache;
use crate::components::Components;
use crate::errors::JpegError;
use crate::fdct::{forward_dct_quantize, quant_reciprocals};
use crate::huffenc::{
    encode_magnitude, standard_ac_chrominance, standard_ac_luminance, standard_dc_chrominance,
    standard_dc_luminance, Frequencies, HuffmanEncodeTable
};
use crate::marker::Marker;
use crate::misc::{div_ceil, SofMarker, UN_ZIGZAG, MAX_COMPONENTS, MAX_TABLES};
use crate::quantization::{
    scale_quantization_table, STD_CHROMINANCE_QT, STD_LUMINANCE_QT
};
use crate::sample::SampleSource;
use crate::writer::BitWriter;

/// Table class selector for [`JpegEncoder::set_huffman_table`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CodingClass {
    /// DC difference codes
    Dc = 0,
    /// AC run/size codes
    Ac = 1
}

/// Chroma layout for the [`JpegEncoder::ycbcr`] convenience
/// constructor.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ChromaSampling {
    /// No chroma subsampling (1x1 luma sampling factors).
    Ratio444,
    /// Chroma halved horizontally (2x1 luma).
    Ratio422,
    /// Chroma halved in both directions (2x2 luma).
    Ratio420
}

/// One configured output component.
struct EncoderComponent {
    id: u8,
    horizontal_sample: u8,
    vertical_sample: u8,
    quantization_table: u8,
    dc_huffman_table: Option<u8>,
    ac_huffman_table: Option<u8>
}

/// A baseline JPEG encoder instance.
pub struct JpegEncoder {
    options: EncoderOptions,
    components: Vec<EncoderComponent>,
    qt_tables: [Option<[u16; 64]>; MAX_TABLES],
    dc_tables: [Option<HuffmanEncodeTable>; MAX_TABLES],
    ac_tables: [Option<HuffmanEncodeTable>; MAX_TABLES]
}

impl Default for JpegEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl JpegEncoder {
    /// An encoder with no components configured yet.
    #[must_use]
    pub fn new() -> JpegEncoder {
        JpegEncoder::new_with_options(EncoderOptions::default())
    }

    /// An encoder with explicit options and no components.
    #[must_use]
    pub fn new_with_options(options: EncoderOptions) -> JpegEncoder {
        JpegEncoder {
            options,
            components: vec![],
            qt_tables: [None; MAX_TABLES],
            dc_tables: [None, None, None, None],
            ac_tables: [None, None, None, None]
        }
    }

    /// A single component (grayscale) encoder at the option's quality.
    #[must_use]
    pub fn luma(options: EncoderOptions) -> JpegEncoder {
        let mut encoder = JpegEncoder::new_with_options(options);

        encoder.qt_tables[0] = Some(scale_quantization_table(
            &STD_LUMINANCE_QT,
            options.quality()
        ));

        encoder
            .add_component(1, 0, None, None, 1, 1)
            .expect("static configuration is valid");

        encoder
    }

    /// A three component YCbCr encoder at the option's quality.
    #[must_use]
    pub fn ycbcr(options: EncoderOptions, sampling: ChromaSampling) -> JpegEncoder {
        let mut encoder = JpegEncoder::new_with_options(options);

        encoder.qt_tables[0] = Some(scale_quantization_table(
            &STD_LUMINANCE_QT,
            options.quality()
        ));
        encoder.qt_tables[1] = Some(scale_quantization_table(
            &STD_CHROMINANCE_QT,
            options.quality()
        ));

        let (luma_h, luma_v) = match sampling {
            ChromaSampling::Ratio444 => (1, 1),
            ChromaSampling::Ratio422 => (2, 1),
            ChromaSampling::Ratio420 => (2, 2)
        };

        encoder
            .add_component(1, 0, None, None, luma_h, luma_v)
            .expect("static configuration is valid");
        encoder
            .add_component(2, 1, None, None, 1, 1)
            .expect("static configuration is valid");
        encoder
            .add_component(3, 1, None, None, 1, 1)
            .expect("static configuration is valid");

        encoder
    }

    /// Add an output component.
    ///
    /// `dc_table` / `ac_table` select fixed Huffman table slots; left
    /// as `None` the encoder assigns slot 0 to the first component and
    /// slot 1 to the rest and fills those slots itself (optimal pass
    /// or standard tables, per the options).
    pub fn add_component(
        &mut self, id: u8, quantization_table: u8, dc_table: Option<u8>, ac_table: Option<u8>,
        horizontal_sample: u8, vertical_sample: u8
    ) -> Result<(), JpegError> {
        if self.components.len() >= MAX_COMPONENTS {
            return Err(JpegError::InvalidOperation("too many components"));
        }

        if !(1..=4).contains(&horizontal_sample) || !(1..=4).contains(&vertical_sample) {
            return Err(JpegError::InvalidOperation("sampling factors must be in 1..=4"));
        }

        if usize::from(quantization_table) >= MAX_TABLES {
            return Err(JpegError::InvalidOperation("quantization table slot out of range"));
        }

        for slot in [dc_table, ac_table].into_iter().flatten() {
            if usize::from(slot) >= MAX_TABLES {
                return Err(JpegError::InvalidOperation("Huffman table slot out of range"));
            }
        }

        if self.components.iter().any(|c| c.id == id) {
            return Err(JpegError::InvalidOperation("duplicate component identifier"));
        }

        self.components.push(EncoderComponent {
            id,
            horizontal_sample,
            vertical_sample,
            quantization_table,
            dc_huffman_table: dc_table,
            ac_huffman_table: ac_table
        });

        Ok(())
    }

    /// Install a quantization table (natural order) into a slot.
    pub fn set_quantization_table(
        &mut self, slot: u8, table: [u16; 64]
    ) -> Result<(), JpegError> {
        if usize::from(slot) >= MAX_TABLES {
            return Err(JpegError::InvalidOperation("quantization table slot out of range"));
        }

        self.qt_tables[usize::from(slot)] = Some(table);

        Ok(())
    }

    /// Install a fixed Huffman table into a slot from its canonical
    /// wire form.
    pub fn set_huffman_table(
        &mut self, class: CodingClass, slot: u8, bits: &[u8; 17], values: &[u8]
    ) -> Result<(), JpegError> {
        if usize::from(slot) >= MAX_TABLES {
            return Err(JpegError::InvalidOperation("Huffman table slot out of range"));
        }

        let table = HuffmanEncodeTable::from_spec(bits, values)?;

        match class {
            CodingClass::Dc => self.dc_tables[usize::from(slot)] = Some(table),
            CodingClass::Ac => self.ac_tables[usize::from(slot)] = Some(table)
        }

        Ok(())
    }

    /// Encode `source` into `sink` as a baseline JPEG.
    ///
    /// # Errors
    /// [`InvalidOperation`](JpegError::InvalidOperation) on a
    /// configuration the format cannot express, otherwise see
    /// [`JpegError`].
    pub fn encode<S: SampleSource>(
        &mut self, source: &S, sink: &mut Vec<u8>
    ) -> Result<(), JpegError> {
        let width = source.width();
        let height = source.height();

        if width == 0 || height == 0 {
            return Err(JpegError::InvalidOperation("cannot encode an empty image"));
        }

        if self.components.is_empty() {
            return Err(JpegError::InvalidOperation("no components configured"));
        }

        let mcu_units: usize = self
            .components
            .iter()
            .map(|c| usize::from(c.horizontal_sample) * usize::from(c.vertical_sample))
            .sum();

        if self.components.len() > 1 && mcu_units > 10 {
            return Err(JpegError::InvalidOperation(
                "interleaved MCUs cannot hold more than 10 data units"
            ));
        }

        // materialize the internal component records
        let mut components = Vec::with_capacity(self.components.len());

        for (pos, ec) in self.components.iter().enumerate() {
            let sampling = (ec.horizontal_sample << 4) | ec.vertical_sample;
            let mut component =
                Components::from([ec.id, sampling, ec.quantization_table], pos as u8)?;

            component.quantization_table = self.qt_tables
                [usize::from(ec.quantization_table)]
                .ok_or(JpegError::InvalidOperation(
                    "component selects an unset quantization table"
                ))?;

            // selectors left unset default to 0 for the first
            // component and 1 for the chroma-style rest
            let default_slot = usize::from(pos != 0);
            component.dc_huff_table =
                ec.dc_huffman_table.map_or(default_slot, usize::from);
            component.ac_huff_table =
                ec.ac_huffman_table.map_or(default_slot, usize::from);

            components.push(component);
        }

        if components.len() == 1 {
            // single component streams are never interleaved, their
            // sampling factors carry no meaning
            components[0].horizontal_sample = 1;
            components[0].vertical_sample = 1;
        }

        let h_max = components.iter().map(|c| c.horizontal_sample).max().unwrap();
        let v_max = components.iter().map(|c| c.vertical_sample).max().unwrap();

        let (mcu_x, mcu_y) = (
            div_ceil(usize::from(width), 8 * h_max),
            div_ceil(usize::from(height), 8 * v_max)
        );

        for component in components.iter_mut() {
            component.setup_geometry(usize::from(width), usize::from(height), h_max, v_max);
        }

        trace!(
            "encoding {}x{} with {} components, {}x{} MCUs",
            width,
            height,
            components.len(),
            mcu_x,
            mcu_y
        );

        // forward transform the whole frame into a coefficient cache
        let cache = self.transform_frame(source, &components, mcu_x, mcu_y);

        // fill the Huffman slots the caller left empty
        self.assign_huffman_tables(&components, &cache, mcu_x, mcu_y)?;

        // assemble the stream
        let mut writer = BitWriter::new();

        writer.write_marker(Marker::SOI);

        self.write_jfif_header(&mut writer);

        let mut qt_written = [false; MAX_TABLES];
        for component in &components {
            let slot = component.quantization_table_id;
            if !qt_written[slot] {
                writer.write_dqt(slot as u8, &component.quantization_table);
                qt_written[slot] = true;
            }
        }

        writer.write_frame_header(
            SofMarker::BaselineDct,
            8,
            width,
            height,
            &components
        );

        let mut dc_written = [false; MAX_TABLES];
        let mut ac_written = [false; MAX_TABLES];

        for component in &components {
            let dc_slot = component.dc_huff_table;
            if !dc_written[dc_slot] {
                let table = self.dc_tables[dc_slot]
                    .as_ref()
                    .ok_or(JpegError::InvalidOperation("DC table slot left unset"))?;
                writer.write_dht(0, dc_slot as u8, table);
                dc_written[dc_slot] = true;
            }

            let ac_slot = component.ac_huff_table;
            if !ac_written[ac_slot] {
                let table = self.ac_tables[ac_slot]
                    .as_ref()
                    .ok_or(JpegError::InvalidOperation("AC table slot left unset"))?;
                writer.write_dht(1, ac_slot as u8, table);
                ac_written[ac_slot] = true;
            }
        }

        let restart_interval = self.options.restart_interval();

        if restart_interval > 0 {
            writer.write_dri(restart_interval);
        }

        {
            let selected: Vec<&Components> = components.iter().collect();
            writer.write_scan_header(&selected, (0, 63));
        }

        emit_entropy(
            &mut writer,
            &cache,
            &components,
            mcu_x,
            mcu_y,
            usize::from(restart_interval),
            &self.dc_tables,
            &self.ac_tables
        )?;

        writer.write_marker(Marker::EOI);

        sink.extend_from_slice(&writer.into_inner());

        Ok(())
    }

    /// Level shift, forward DCT and quantize every block of the frame.
    fn transform_frame<S: SampleSource>(
        &self, source: &S, components: &[Components], mcu_x: usize, mcu_y: usize
    ) -> BlockCache {
        let mut cache = BlockCache::for_frame(components, mcu_x, mcu_y);

        let mut samples = [0_i16; 64];

        for (k, component) in components.iter().enumerate() {
            let reciprocals = quant_reciprocals(&component.quantization_table);

            let blocks_w = cache.blocks_w(k);
            let blocks_h = cache.blocks_h(k);

            for by in 0..blocks_h {
                for bx in 0..blocks_w {
                    fetch_block(source, component, k, bx, by, &mut samples);

                    forward_dct_quantize(
                        &samples,
                        8,
                        &reciprocals,
                        cache.block_mut(k, bx, by)
                    );
                }
            }
        }

        cache
    }

    /// Fill every Huffman slot the scan needs: fixed tables stay, the
    /// rest comes from the optimal pass or the standard tables.
    fn assign_huffman_tables(
        &mut self, components: &[Components], cache: &BlockCache, mcu_x: usize, mcu_y: usize
    ) -> Result<(), JpegError> {
        let needs_build = components.iter().any(|c| {
            self.dc_tables[c.dc_huff_table].is_none() || self.ac_tables[c.ac_huff_table].is_none()
        });

        if !needs_build {
            return Ok(());
        }

        if self.options.optimize_huffman() {
            let mut dc_freq = [[0_u32; 257]; MAX_TABLES];
            let mut ac_freq = [[0_u32; 257]; MAX_TABLES];

            gather_statistics(
                cache,
                components,
                mcu_x,
                mcu_y,
                usize::from(self.options.restart_interval()),
                &mut dc_freq,
                &mut ac_freq
            );

            for component in components {
                let dc_slot = component.dc_huff_table;
                if self.dc_tables[dc_slot].is_none() {
                    self.dc_tables[dc_slot] =
                        Some(HuffmanEncodeTable::build_optimal(&dc_freq[dc_slot])?);
                }

                let ac_slot = component.ac_huff_table;
                if self.ac_tables[ac_slot].is_none() {
                    self.ac_tables[ac_slot] =
                        Some(HuffmanEncodeTable::build_optimal(&ac_freq[ac_slot])?);
                }
            }
        } else {
            for component in components {
                let dc_slot = component.dc_huff_table;
                if self.dc_tables[dc_slot].is_none() {
                    self.dc_tables[dc_slot] = Some(if dc_slot == 0 {
                        standard_dc_luminance()
                    } else {
                        standard_dc_chrominance()
                    });
                }

                let ac_slot = component.ac_huff_table;
                if self.ac_tables[ac_slot].is_none() {
                    self.ac_tables[ac_slot] = Some(if ac_slot == 0 {
                        standard_ac_luminance()
                    } else {
                        standard_ac_chrominance()
                    });
                }
            }
        }

        Ok(())
    }

    /// The JFIF APP0 header with a square pixel aspect ratio.
    fn write_jfif_header(&self, writer: &mut BitWriter) {
        writer.write_marker(Marker::APP(0));
        writer.write_u16(16);
        writer.write(b"JFIF\0");
        // version 1.2, no density, no thumbnail
        writer.write(&[0x01, 0x02, 0x00]);
        writer.write_u16(1);
        writer.write_u16(1);
        writer.write(&[0x00, 0x00]);
    }
}

/// Read one 8x8 block of `component`, box-filtering the source down
/// when the component is sub-sampled relative to the frame.
fn fetch_block<S: SampleSource>(
    source: &S, component: &Components, k: usize, bx: usize, by: usize, out: &mut [i16; 64]
) {
    let scale_x = component.scale_x;
    let scale_y = component.scale_y;

    if scale_x == 1 && scale_y == 1 {
        source.read_block(out, k, bx * 8, by * 8);
        return;
    }

    let mut acc = [0_i32; 64];
    let mut tmp = [0_i16; 64];

    // the target block covers scale_x * scale_y source blocks
    for dy in 0..scale_y {
        for dx in 0..scale_x {
            source.read_block(
                &mut tmp,
                k,
                (bx * scale_x + dx) * 8,
                (by * scale_y + dy) * 8
            );

            for py in 0..8 {
                let ty = (dy * 8 + py) / scale_y;

                for px in 0..8 {
                    let tx = (dx * 8 + px) / scale_x;

                    acc[ty * 8 + tx] += i32::from(tmp[py * 8 + px]);
                }
            }
        }
    }

    let area = (scale_x * scale_y) as i32;

    for (o, a) in out.iter_mut().zip(acc.iter()) {
        // rounded average
        *o = ((*a + area / 2) / area) as i16;
    }
}

/// Count every symbol one emission pass would produce, mirroring
/// [`emit_entropy`] including the restart prediction resets.
pub(crate) fn gather_statistics(
    cache: &BlockCache, components: &[Components], mcu_x: usize, mcu_y: usize,
    restart_interval: usize, dc_freq: &mut [Frequencies; MAX_TABLES],
    ac_freq: &mut [Frequencies; MAX_TABLES]
) {
    let mut dc_preds = [0_i32; MAX_COMPONENTS];

    let (cols, rows) = mcu_grid(components, mcu_x, mcu_y);

    let mut mcus_done = 0_usize;

    for row in 0..rows {
        for col in 0..cols {
            if restart_interval > 0 && mcus_done > 0 && mcus_done % restart_interval == 0 {
                dc_preds = [0; MAX_COMPONENTS];
            }

            for (k, component) in components.iter().enumerate() {
                let (h_samp, v_samp) = sampling_steps(components.len(), component);

                for v in 0..v_samp {
                    for h in 0..h_samp {
                        let bx = col * h_samp + h;
                        let by = row * v_samp + v;

                        gather_block(
                            cache.block(k, bx, by),
                            &mut dc_preds[k],
                            &mut dc_freq[component.dc_huff_table],
                            &mut ac_freq[component.ac_huff_table]
                        );
                    }
                }
            }

            mcus_done += 1;
        }
    }
}

/// Emit the entropy coded segment, restart markers included.
#[allow(clippy::too_many_arguments)]
pub(crate) fn emit_entropy(
    writer: &mut BitWriter, cache: &BlockCache, components: &[Components], mcu_x: usize,
    mcu_y: usize, restart_interval: usize,
    dc_tables: &[Option<HuffmanEncodeTable>; MAX_TABLES],
    ac_tables: &[Option<HuffmanEncodeTable>; MAX_TABLES]
) -> Result<(), JpegError> {
    let mut dc_preds = [0_i32; MAX_COMPONENTS];

    let (cols, rows) = mcu_grid(components, mcu_x, mcu_y);

    let mut mcus_done = 0_usize;
    let mut restart_index = 0_usize;

    for row in 0..rows {
        for col in 0..cols {
            if restart_interval > 0 && mcus_done > 0 && mcus_done % restart_interval == 0 {
                writer.finalize_bit_buffer();
                writer.write_marker(Marker::RST((restart_index % 8) as u8));
                restart_index += 1;
                dc_preds = [0; MAX_COMPONENTS];
            }

            for (k, component) in components.iter().enumerate() {
                let dc_table = dc_tables[component.dc_huff_table]
                    .as_ref()
                    .ok_or(JpegError::InvalidOperation("DC table slot left unset"))?;
                let ac_table = ac_tables[component.ac_huff_table]
                    .as_ref()
                    .ok_or(JpegError::InvalidOperation("AC table slot left unset"))?;

                let (h_samp, v_samp) = sampling_steps(components.len(), component);

                for v in 0..v_samp {
                    for h in 0..h_samp {
                        let bx = col * h_samp + h;
                        let by = row * v_samp + v;

                        let block = cache.block(k, bx, by);

                        dc_preds[k] = writer.write_block(block, dc_preds[k], dc_table, ac_table);
                    }
                }
            }

            mcus_done += 1;
        }
    }

    writer.finalize_bit_buffer();

    Ok(())
}

/// Data units per MCU cell: the frame's sampling factors when
/// interleaved, exactly one for a non-interleaved single component
/// pass.
fn sampling_steps(num_components: usize, component: &Components) -> (usize, usize) {
    if num_components == 1 {
        (1, 1)
    } else {
        (component.horizontal_sample, component.vertical_sample)
    }
}

/// The MCU grid of an emission pass. Single component frames are
/// never interleaved, they advance one (unpadded) data unit at a
/// time whatever their nominal sampling factors say.
fn mcu_grid(components: &[Components], mcu_x: usize, mcu_y: usize) -> (usize, usize) {
    if components.len() == 1 {
        (components[0].blocks_w, components[0].blocks_h)
    } else {
        (mcu_x, mcu_y)
    }
}

/// Count the symbols of one block into the frequency histograms,
/// mirroring [`BitWriter::write_block`] exactly.
fn gather_block(
    block: &[i16; 64], dc_pred: &mut i32, dc_freq: &mut Frequencies, ac_freq: &mut Frequencies
) {
    let dc = i32::from(block[0]);
    let (dc_size, _) = encode_magnitude(dc - *dc_pred);

    dc_freq[usize::from(dc_size)] += 1;
    *dc_pred = dc;

    let mut zero_run = 0_u32;

    for &natural_index in &UN_ZIGZAG[1..64] {
        let value = i32::from(block[natural_index]);

        if value == 0 {
            zero_run += 1;
        } else {
            while zero_run > 15 {
                ac_freq[0xF0] += 1;
                zero_run -= 16;
            }

            let (size, _) = encode_magnitude(value);
            let symbol = ((zero_run as u8) << 4) | size;

            ac_freq[usize::from(symbol)] += 1;

            zero_run = 0;
        }
    }

    if zero_run > 0 {
        ac_freq[0x00] += 1;
    }
}
