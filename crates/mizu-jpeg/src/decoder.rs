/*
 * Copyright (c) 2026.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT or Apache License
 */

//! The decoder instance and its marker loop.

use log::{trace, warn};
use mizu_core::bytestream::ByteReader;
use mizu_core::options::DecoderOptions;

use crate::bitstream::BitStream;
use crate::components::{ComponentInfo, Components};
use crate::errors::{JpegError, UnsupportedSchemes};
use crate::headers::{parse_dac, parse_dqt, parse_huffman, parse_sos, parse_start_of_frame};
use crate::huffman::HuffmanTable;
use crate::marker::Marker;
use crate::misc::{SofMarker, MAX_COMPONENTS, MAX_TABLES};
use crate::quantization::estimate_quality;
use crate::sample::SampleSink;

/// Frame information extracted from the headers.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ImageInfo {
    /// Width of the image.
    pub width: u16,
    /// Height of the image.
    pub height: u16,
    /// Sample precision in bits, 8 for baseline, up to 16 for
    /// lossless frames.
    pub precision: u8,
    /// The coding process of the frame.
    pub sof: SofMarker,
    /// Number of components.
    pub components: u8
}

/// A JPEG decoder instance over an in-memory stream.
pub struct JpegDecoder<'a> {
    pub(crate) stream: ByteReader<'a>,
    pub(crate) options: DecoderOptions,
    pub(crate) info: ImageInfo,

    /// Quantization tables in natural order, keyed by destination.
    pub(crate) qt_tables: [Option<[u16; 64]>; MAX_TABLES],
    /// DC Huffman tables keyed by destination.
    pub(crate) dc_huffman_tables: [Option<HuffmanTable>; MAX_TABLES],
    /// AC Huffman tables keyed by destination.
    pub(crate) ac_huffman_tables: [Option<HuffmanTable>; MAX_TABLES],
    /// DC arithmetic conditioning (L, U) keyed by destination.
    pub(crate) dc_conditioning: [(u8, u8); MAX_TABLES],
    /// AC arithmetic conditioning Kx keyed by destination.
    pub(crate) ac_conditioning: [u8; MAX_TABLES],

    pub(crate) components: Vec<Components>,
    /// Scan position -> component index, filled by the scan header.
    pub(crate) z_order: [usize; MAX_COMPONENTS],
    pub(crate) num_scan_components: usize,

    /// Maximum sampling factors over the frame.
    pub(crate) h_max: usize,
    pub(crate) v_max: usize,
    /// MCU grid of the frame.
    pub(crate) mcu_x: usize,
    pub(crate) mcu_y: usize,

    /// Restart interval in MCUs, zero when disabled.
    pub(crate) restart_interval: usize,
    /// MCUs left until the next expected restart marker.
    pub(crate) todo: usize,

    /// Spectral selection and successive approximation of the current
    /// scan. Sequential scans keep the 0/63/0/0 defaults; lossless
    /// scans reuse `spec_start` as the predictor selector and
    /// `succ_low` as the point transform.
    pub(crate) spec_start: u8,
    pub(crate) spec_end: u8,
    pub(crate) succ_high: u8,
    pub(crate) succ_low: u8,

    /// APPn and COM segments in stream order, kept so the optimizer
    /// can re-emit them verbatim.
    pub(crate) extra_segments: Vec<(Marker, Vec<u8>)>,

    pub(crate) seen_sof: bool,
    pub(crate) headers_decoded: bool
}

impl<'a> JpegDecoder<'a> {
    /// Create a new decoder over an in-memory JPEG stream.
    #[must_use]
    pub fn new(stream: &'a [u8]) -> JpegDecoder<'a> {
        JpegDecoder::new_with_options(DecoderOptions::default(), stream)
    }

    /// Create a new decoder with explicit options.
    #[must_use]
    pub fn new_with_options(options: DecoderOptions, stream: &'a [u8]) -> JpegDecoder<'a> {
        JpegDecoder {
            stream: ByteReader::new(stream),
            options,
            info: ImageInfo::default(),
            qt_tables: [None; MAX_TABLES],
            dc_huffman_tables: [None, None, None, None],
            ac_huffman_tables: [None, None, None, None],
            // T.81 defaults: L=0, U=1, Kx=5
            dc_conditioning: [(0, 1); MAX_TABLES],
            ac_conditioning: [5; MAX_TABLES],
            components: vec![],
            z_order: [0; MAX_COMPONENTS],
            num_scan_components: 0,
            h_max: 1,
            v_max: 1,
            mcu_x: 0,
            mcu_y: 0,
            restart_interval: 0,
            todo: usize::MAX,
            spec_start: 0,
            spec_end: 0,
            succ_high: 0,
            succ_low: 0,
            extra_segments: vec![],
            seen_sof: false,
            headers_decoded: false
        }
    }

    /// Frame information, `None` until the headers were decoded.
    #[must_use]
    pub fn info(&self) -> Option<ImageInfo> {
        if !self.headers_decoded {
            return None;
        }

        Some(self.info.clone())
    }

    /// Image width, zero until the headers were decoded.
    #[must_use]
    pub fn width(&self) -> u16 {
        self.info.width
    }

    /// Image height, zero until the headers were decoded.
    #[must_use]
    pub fn height(&self) -> u16 {
        self.info.height
    }

    /// Per-component descriptions, empty until the headers were
    /// decoded.
    #[must_use]
    pub fn components(&self) -> Vec<ComponentInfo> {
        self.components
            .iter()
            .map(|c| ComponentInfo {
                id: c.id,
                horizontal_sample: c.horizontal_sample as u8,
                vertical_sample: c.vertical_sample as u8,
                quantization_table_id: c.quantization_table_id as u8,
                width: c.width,
                height: c.height
            })
            .collect()
    }

    /// Estimate the quality setting the stream was encoded with, from
    /// its quantization tables. `None` before the headers were parsed.
    #[must_use]
    pub fn estimate_quality(&self) -> Option<f32> {
        let first = self.components.first()?;
        let luma = self.qt_tables[first.quantization_table_id].as_ref()?;

        let chroma = self
            .components
            .get(1)
            .and_then(|c| self.qt_tables[c.quantization_table_id].as_ref());

        Some(estimate_quality(luma, chroma))
    }

    /// Parse all headers up to the first start of scan.
    ///
    /// # Errors
    /// See [`JpegError`] for the failure modes.
    pub fn decode_headers(&mut self) -> Result<(), JpegError> {
        self.decode_headers_internal()
    }

    fn decode_headers_internal(&mut self) -> Result<(), JpegError> {
        if self.headers_decoded {
            return Ok(());
        }

        let magic_bytes = self.stream.get_u16_be_err()?;

        if magic_bytes != 0xFFD8 {
            return Err(JpegError::invalid(0, "no SOI marker, not a JPEG stream"));
        }

        let mut last_byte = 0_u8;
        let mut bytes_before_marker = 0_usize;

        loop {
            let byte = self.stream.get_u8_err()?;

            if last_byte == 0xFF {
                if let Some(marker) = Marker::from_u8(byte) {
                    if bytes_before_marker > 3 {
                        if self.options.strict_mode() {
                            return Err(JpegError::invalid(
                                self.stream.position(),
                                "extra bytes between headers"
                            ));
                        }

                        warn!(
                            "{} extra bytes before marker 0xFF{byte:02X}",
                            bytes_before_marker - 3
                        );
                    }

                    bytes_before_marker = 0;

                    self.parse_marker_inner(marker)?;

                    if marker == Marker::SOS {
                        self.headers_decoded = true;
                        return Ok(());
                    }

                    last_byte = 0;
                    continue;
                } else if byte != 0x00 && byte != 0xFF {
                    return Err(JpegError::InvalidMarker(byte));
                }
            }

            last_byte = byte;
            bytes_before_marker += 1;
        }
    }

    /// Dispatch a single marker segment.
    pub(crate) fn parse_marker_inner(&mut self, marker: Marker) -> Result<(), JpegError> {
        match marker {
            Marker::SOF(n) => {
                let sof = SofMarker::from_sof(n);

                match sof {
                    Some(SofMarker::LosslessArithmetic) => {
                        return Err(JpegError::Unsupported(UnsupportedSchemes::LosslessArithmetic));
                    }
                    Some(sof) => {
                        trace!("image coding scheme: {sof:?}");
                        parse_start_of_frame(sof, self)?;
                    }
                    None => {
                        return match UnsupportedSchemes::from_int(n) {
                            Some(scheme) => Err(JpegError::Unsupported(scheme)),
                            None => Err(JpegError::invalid(
                                self.stream.position(),
                                format!("unknown frame marker SOF{n}")
                            ))
                        };
                    }
                }
            }
            Marker::DQT => parse_dqt(self)?,
            Marker::DHT => parse_huffman(self)?,
            Marker::DAC => parse_dac(self)?,
            Marker::SOS => parse_sos(self)?,
            Marker::DRI => {
                trace!("DRI marker present");

                if self.stream.get_u16_be_err()? != 4 {
                    return Err(JpegError::invalid(
                        self.stream.position(),
                        "bad DRI length, corrupt stream"
                    ));
                }

                self.restart_interval = usize::from(self.stream.get_u16_be_err()?);
                self.todo = if self.restart_interval == 0 {
                    usize::MAX
                } else {
                    self.restart_interval
                };
            }
            Marker::EOI => {
                return Err(JpegError::invalid(
                    self.stream.position(),
                    "premature end of image"
                ));
            }
            Marker::DNL => {
                return Err(JpegError::invalid(
                    self.stream.position(),
                    "DNL streams are not supported"
                ));
            }
            Marker::APP(_) | Marker::COM => {
                let length = self.length_checked()?;
                let body = self.stream.peek_at(0, length)?.to_vec();

                self.stream.skip(length);
                // kept verbatim so the optimizer can re-emit them
                self.extra_segments.push((marker, body));
            }
            _ => {
                warn!("skipping unhandled marker {marker:?}");

                let length = self.length_checked()?;
                self.stream.skip(length);
            }
        }

        Ok(())
    }

    /// Read a segment length and return the payload byte count.
    fn length_checked(&mut self) -> Result<usize, JpegError> {
        let length = self.stream.get_u16_be_err()?;

        if length < 2 {
            return Err(JpegError::invalid(
                self.stream.position(),
                format!("marker with invalid length {length}")
            ));
        }

        Ok(usize::from(length - 2))
    }

    /// Decode the image, writing every finished sample block to
    /// `sink`.
    ///
    /// # Errors
    /// See [`JpegError`] for the failure modes.
    pub fn decode<S: SampleSink>(&mut self, sink: &mut S) -> Result<(), JpegError> {
        self.decode_headers_internal()?;

        match self.info.sof {
            SofMarker::BaselineDct | SofMarker::ExtendedSequentialHuffman => {
                self.decode_sequential(sink)
            }
            SofMarker::ProgressiveDctHuffman => self.decode_progressive(sink),
            SofMarker::LosslessHuffman => self.decode_lossless(sink),
            SofMarker::ExtendedSequentialArithmetic => self.decode_arith_sequential(sink),
            SofMarker::ProgressiveDctArithmetic => self.decode_arith_progressive(sink),
            // rejected while parsing the frame header
            SofMarker::LosslessArithmetic => {
                Err(JpegError::Unsupported(UnsupportedSchemes::LosslessArithmetic))
            }
        }
    }

    /// Scan the stream without decoding entropy data.
    ///
    /// Records the frame header and quantization tables (so
    /// [`info`](Self::info) and [`estimate_quality`](Self::estimate_quality)
    /// work afterwards), length-skips everything else and walks over
    /// the entropy coded segments by marker scanning. Returns the
    /// offset of the byte following EOI; no byte past it is read.
    ///
    /// # Errors
    /// A second frame header is rejected with
    /// [`InvalidData`](JpegError::InvalidData); truncation yields
    /// [`UnexpectedEof`](JpegError::UnexpectedEof).
    pub fn identify(&mut self) -> Result<usize, JpegError> {
        let magic_bytes = self.stream.get_u16_be_err()?;

        if magic_bytes != 0xFFD8 {
            return Err(JpegError::invalid(0, "no SOI marker, not a JPEG stream"));
        }

        loop {
            let marker = self.next_marker()?;

            match marker {
                Marker::EOI => {
                    self.headers_decoded = self.seen_sof;
                    return Ok(self.stream.position());
                }
                Marker::SOF(n) => {
                    let sof = SofMarker::from_sof(n)
                        .ok_or(JpegError::invalid(
                            self.stream.position(),
                            format!("unsupported frame marker SOF{n}")
                        ))?;

                    // rejects a second SOF with InvalidData
                    parse_start_of_frame(sof, self)?;
                }
                Marker::DQT => parse_dqt(self)?,
                Marker::SOS => {
                    let length = self.length_checked()?;
                    self.stream.skip(length);

                    self.skip_entropy_data()?;
                }
                Marker::SOI => {
                    return Err(JpegError::invalid(
                        self.stream.position(),
                        "second SOI inside the image"
                    ));
                }
                Marker::RST(_) => {
                    // stray restart outside a scan, tolerate
                }
                _ => {
                    let length = self.length_checked()?;
                    self.stream.skip(length);
                }
            }
        }
    }

    /// Advance to the next marker, collapsing `0xFF` runs.
    pub(crate) fn next_marker(&mut self) -> Result<Marker, JpegError> {
        loop {
            let byte = self.stream.get_u8_err()?;

            if byte != 0xFF {
                // garbage between segments, skip it
                continue;
            }

            let mut code = self.stream.get_u8_err()?;

            while code == 0xFF {
                code = self.stream.get_u8_err()?;
            }

            if code == 0x00 {
                continue;
            }

            return Marker::from_u8(code).ok_or(JpegError::InvalidMarker(code));
        }
    }

    /// Skip entropy coded data up to the next non-restart marker,
    /// leaving the reader right after that marker so the identify
    /// loop handles it.
    fn skip_entropy_data(&mut self) -> Result<(), JpegError> {
        loop {
            let byte = self.stream.get_u8_err()?;

            if byte != 0xFF {
                continue;
            }

            let mut code = self.stream.get_u8_err()?;

            while code == 0xFF {
                code = self.stream.get_u8_err()?;
            }

            if code == 0x00 {
                // stuffed data byte
                continue;
            }

            match Marker::from_u8(code) {
                Some(Marker::RST(_)) => continue,
                Some(marker) => {
                    // hand the marker back to the identify loop
                    self.stream.rewind(2);
                    trace!("entropy data ends at marker {marker:?}");
                    return Ok(());
                }
                None => return Err(JpegError::InvalidMarker(code))
            }
        }
    }

    /// Bind every component's quantization table before the first
    /// scan is decoded.
    pub(crate) fn setup_component_tables(&mut self) -> Result<(), JpegError> {
        let offset = self.stream.position();

        for component in self.components.iter_mut() {
            let table = self.qt_tables[component.quantization_table_id]
                .as_ref()
                .ok_or_else(|| {
                    JpegError::invalid(
                        offset,
                        format!(
                            "component {} selects undefined quantization table {}",
                            component.id, component.quantization_table_id
                        )
                    )
                })?;

            component.quantization_table = *table;
        }

        Ok(())
    }

    /// Handle the markers between the end of one scan and the next.
    ///
    /// `latched` is a marker the entropy decoder already pulled out of
    /// the stream, if any. Table definitions are parsed as they come;
    /// returns `true` once the next scan header was parsed, `false`
    /// on EOI.
    pub(crate) fn advance_between_scans(
        &mut self, latched: Option<Marker>
    ) -> Result<bool, JpegError> {
        let mut marker = match latched {
            Some(marker) => marker,
            None => self.next_marker()?
        };

        loop {
            match marker {
                Marker::EOI => {
                    trace!("found EOI marker");
                    return Ok(false);
                }
                Marker::SOS => {
                    self.parse_marker_inner(Marker::SOS)?;
                    return Ok(true);
                }
                Marker::DHT | Marker::DQT | Marker::DRI | Marker::DAC | Marker::COM
                | Marker::APP(_) => {
                    trace!("parsing inter-scan marker {marker:?}");
                    self.parse_marker_inner(marker)?;
                }
                Marker::RST(_) => {
                    warn!("unexpected restart marker between scans");
                }
                other => {
                    if self.options.strict_mode() {
                        return Err(JpegError::invalid(
                            self.stream.position(),
                            format!("marker {other:?} found where not expected")
                        ));
                    }

                    warn!("marker {other:?} between scans, skipping its segment");
                    self.parse_marker_inner(other)?;
                }
            }

            marker = self.next_marker()?;
        }
    }

    /// Check the Huffman tables the current scan selects exist.
    pub(crate) fn check_tables(&self, needs_ac: bool) -> Result<(), JpegError> {
        let offset = self.stream.position();

        for &k in &self.z_order[..self.num_scan_components] {
            let component = &self.components[k];

            if self.dc_huffman_tables[component.dc_huff_table % MAX_TABLES].is_none() {
                return Err(JpegError::invalid(
                    offset,
                    format!("no DC Huffman table {} for component {}", component.dc_huff_table, component.id)
                ));
            }

            if needs_ac && self.ac_huffman_tables[component.ac_huff_table % MAX_TABLES].is_none() {
                return Err(JpegError::invalid(
                    offset,
                    format!("no AC Huffman table {} for component {}", component.ac_huff_table, component.id)
                ));
            }
        }

        Ok(())
    }
}

/// Extract the next marker after the entropy coded data, either one
/// the bit reader latched or one found by scanning forward.
pub(crate) fn get_marker(
    reader: &mut ByteReader, stream: &mut BitStream
) -> Result<Marker, JpegError> {
    if let Some(marker) = stream.marker.take() {
        return Ok(marker);
    }

    while reader.has(1) {
        let byte = reader.get_u8();

        if byte == 0xFF {
            let mut code = reader.get_u8_err()?;

            while code == 0xFF {
                code = reader.get_u8_err()?;
            }

            if code != 0x00 {
                return Marker::from_u8(code).ok_or(JpegError::InvalidMarker(code));
            }
        }
    }

    Err(JpegError::UnexpectedEof)
}
