/*
 * Copyright (c) 2026.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT or Apache License
 */

//! Parsing of marker segments.
//!
//! Every parser consumes exactly its segment, validates the invariants
//! the scan drivers rely on and stores the result on the decoder.

use log::{trace, warn};

use crate::components::Components;
use crate::decoder::JpegDecoder;
use crate::errors::JpegError;
use crate::huffman::HuffmanTable;
use crate::misc::{div_ceil, SofMarker, MAX_COMPONENTS, MAX_TABLES};
use crate::quantization::un_zig_zag;

/// B.2.4.2, Huffman table specification.
///
/// One DHT segment may define several tables.
pub(crate) fn parse_huffman(decoder: &mut JpegDecoder) -> Result<(), JpegError> {
    let offset = decoder.stream.position();

    let mut dht_length = i32::from(
        decoder
            .stream
            .get_u16_be_err()?
            .checked_sub(2)
            .ok_or_else(|| JpegError::invalid(offset, "invalid DHT length"))?
    );

    while dht_length > 16 {
        let ht_info = decoder.stream.get_u8_err()?;

        // top four bits pick the class, bottom four the destination
        let dc_or_ac = (ht_info >> 4) & 0xF;
        let index = usize::from(ht_info & 0xF);

        if index >= MAX_TABLES {
            return Err(JpegError::invalid(
                decoder.stream.position(),
                format!("invalid DHT destination {index}, expected 0..=3")
            ));
        }

        if dc_or_ac > 1 {
            return Err(JpegError::invalid(
                decoder.stream.position(),
                format!("invalid DHT class {dc_or_ac}, expected 0 or 1")
            ));
        }

        let mut num_symbols = [0_u8; 17];
        decoder.stream.read_exact_bytes(&mut num_symbols[1..17])?;

        dht_length -= 1 + 16;

        let symbols_sum: i32 = num_symbols.iter().map(|f| i32::from(*f)).sum();

        if symbols_sum > 256 {
            return Err(JpegError::invalid(
                decoder.stream.position(),
                "DHT code length counts sum beyond 256"
            ));
        }

        if symbols_sum > dht_length {
            return Err(JpegError::invalid(
                decoder.stream.position(),
                format!(
                    "DHT table of {symbols_sum} symbols does not fit the remaining {dht_length} segment bytes"
                )
            ));
        }
        dht_length -= symbols_sum;

        let mut symbols = [0_u8; 256];
        decoder
            .stream
            .read_exact_bytes(&mut symbols[..symbols_sum as usize])?;

        trace!("DHT: class {dc_or_ac}, destination {index}, {symbols_sum} symbols");

        let position_err = |e: JpegError| match e {
            // rebase table construction errors onto the stream
            JpegError::InvalidData(_, msg) => JpegError::InvalidData(offset, msg),
            other => other
        };

        if dc_or_ac == 0 {
            decoder.dc_huffman_tables[index] =
                Some(HuffmanTable::new(&num_symbols, symbols, true, false).map_err(position_err)?);
        } else {
            decoder.ac_huffman_tables[index] =
                Some(HuffmanTable::new(&num_symbols, symbols, false, true).map_err(position_err)?);
        }
    }

    if dht_length > 0 {
        return Err(JpegError::invalid(offset, "bogus Huffman table definition"));
    }

    Ok(())
}

/// B.2.4.1, quantization table specification.
pub(crate) fn parse_dqt(decoder: &mut JpegDecoder) -> Result<(), JpegError> {
    let offset = decoder.stream.position();

    let mut qt_length = decoder
        .stream
        .get_u16_be_err()?
        .checked_sub(2)
        .ok_or_else(|| JpegError::invalid(offset, "invalid DQT length"))?;

    // a single DQT segment may carry multiple tables
    while qt_length > 0 {
        let qt_info = decoder.stream.get_u8_err()?;

        // 0 is 8 bit elements, 1 is 16 bit
        let precision = usize::from(qt_info >> 4);
        let table_position = usize::from(qt_info & 0x0F);

        let precision_bytes = 64 * (precision + 1);

        if (precision_bytes + 1) as u16 > qt_length {
            return Err(JpegError::invalid(
                decoder.stream.position(),
                format!(
                    "invalid DQT: {qt_length} bytes left, a table of precision {precision} needs {}",
                    precision_bytes + 1
                )
            ));
        }

        let table = match precision {
            0 => {
                let mut qt_values = [0_u8; 64];

                decoder.stream.read_exact_bytes(&mut qt_values)?;
                qt_length -= (precision_bytes as u16) + 1;

                un_zig_zag(&qt_values)
            }
            1 => {
                let mut qt_values = [0_u16; 64];

                for value in qt_values.iter_mut() {
                    *value = decoder.stream.get_u16_be_err()?;
                }
                qt_length -= (precision_bytes as u16) + 1;

                un_zig_zag(&qt_values)
            }
            _ => {
                return Err(JpegError::invalid(
                    decoder.stream.position(),
                    format!("unknown DQT precision {precision}, expected 0 or 1")
                ));
            }
        };

        if table_position >= MAX_TABLES {
            return Err(JpegError::invalid(
                decoder.stream.position(),
                format!("invalid DQT destination {table_position}, expected 0..=3")
            ));
        }

        if table.contains(&0) {
            // all elements should be nonzero in practice, tolerate it
            // since decode only ever multiplies by the element
            warn!("DQT table {table_position} contains zero elements");
        }

        trace!("DQT: destination {table_position}, precision {precision}");
        decoder.qt_tables[table_position] = Some(table);
    }

    Ok(())
}

/// B.2.4.3, arithmetic conditioning specification.
pub(crate) fn parse_dac(decoder: &mut JpegDecoder) -> Result<(), JpegError> {
    let offset = decoder.stream.position();

    let mut dac_length = decoder
        .stream
        .get_u16_be_err()?
        .checked_sub(2)
        .ok_or_else(|| JpegError::invalid(offset, "invalid DAC length"))?;

    while dac_length >= 2 {
        let tc_tb = decoder.stream.get_u8_err()?;
        let value = decoder.stream.get_u8_err()?;
        dac_length -= 2;

        let class = tc_tb >> 4;
        let index = usize::from(tc_tb & 0xF);

        if index >= MAX_TABLES {
            return Err(JpegError::invalid(
                decoder.stream.position(),
                format!("invalid DAC destination {index}, expected 0..=3")
            ));
        }

        match class {
            0 => {
                // DC conditioning: low nibble L, high nibble U, with
                // the constraint L <= U
                let lower = value & 0x0F;
                let upper = value >> 4;

                if lower > upper {
                    return Err(JpegError::invalid(
                        decoder.stream.position(),
                        format!("invalid DC conditioning bounds L={lower} U={upper}")
                    ));
                }

                trace!("DAC: DC table {index}, L={lower} U={upper}");
                decoder.dc_conditioning[index] = (lower, upper);
            }
            1 => {
                // AC conditioning: Kx in 1..=63
                if !(1..=63).contains(&value) {
                    return Err(JpegError::invalid(
                        decoder.stream.position(),
                        format!("invalid AC conditioning Kx={value}, expected 1..=63")
                    ));
                }

                trace!("DAC: AC table {index}, Kx={value}");
                decoder.ac_conditioning[index] = value;
            }
            _ => {
                return Err(JpegError::invalid(
                    decoder.stream.position(),
                    format!("invalid DAC class {class}, expected 0 or 1")
                ));
            }
        }
    }

    if dac_length != 0 {
        return Err(JpegError::invalid(offset, "bogus arithmetic conditioning definition"));
    }

    Ok(())
}

/// B.2.2, frame header.
pub(crate) fn parse_start_of_frame(
    sof: SofMarker, decoder: &mut JpegDecoder
) -> Result<(), JpegError> {
    let offset = decoder.stream.position();

    if decoder.seen_sof {
        return Err(JpegError::invalid(offset, "two start of frame markers"));
    }

    let length = decoder.stream.get_u16_be_err()?;

    let precision = decoder.stream.get_u8_err()?;

    // DCT processes allow 8 (and 12 for non-baseline), lossless
    // allows anything in 2..=16
    let precision_ok = if sof.is_lossless() {
        (2..=16).contains(&precision)
    } else if sof == SofMarker::BaselineDct {
        precision == 8
    } else {
        precision == 8 || precision == 12
    };

    if !precision_ok {
        return Err(JpegError::invalid(
            decoder.stream.position(),
            format!("invalid sample precision {precision} for {sof:?}")
        ));
    }

    let height = decoder.stream.get_u16_be_err()?;
    let width = decoder.stream.get_u16_be_err()?;

    trace!("image width  :{width}");
    trace!("image height :{height}");

    if width == 0 || height == 0 {
        return Err(JpegError::invalid(
            decoder.stream.position(),
            "zero width or height, DNL streams are not supported"
        ));
    }

    if usize::from(width) > decoder.options.max_width() {
        return Err(JpegError::invalid(
            decoder.stream.position(),
            format!(
                "image width {width} exceeds the configured limit {}",
                decoder.options.max_width()
            )
        ));
    }

    if usize::from(height) > decoder.options.max_height() {
        return Err(JpegError::invalid(
            decoder.stream.position(),
            format!(
                "image height {height} exceeds the configured limit {}",
                decoder.options.max_height()
            )
        ));
    }

    let num_components = decoder.stream.get_u8_err()?;

    if num_components == 0 || usize::from(num_components) > MAX_COMPONENTS {
        return Err(JpegError::invalid(
            decoder.stream.position(),
            format!("invalid component count {num_components}, expected 1..=4")
        ));
    }

    let expected = 8 + 3 * u16::from(num_components);
    if length != expected {
        return Err(JpegError::invalid(
            offset,
            format!("frame header length {length} differs from expected {expected}")
        ));
    }

    trace!("image components : {num_components}");

    let mut components = Vec::with_capacity(usize::from(num_components));
    let mut temp = [0_u8; 3];

    for pos in 0..num_components {
        decoder.stream.read_exact_bytes(&mut temp)?;

        let component = Components::from(temp, pos).map_err(|e| match e {
            JpegError::InvalidData(_, msg) => JpegError::InvalidData(offset, msg),
            other => other
        })?;

        // identifiers must be distinct within the frame
        if components.iter().any(|c: &Components| c.id == component.id) {
            return Err(JpegError::invalid(
                offset,
                format!("duplicate component identifier {}", component.id)
            ));
        }

        components.push(component);
    }

    let h_max = components.iter().map(|c| c.horizontal_sample).max().unwrap();
    let v_max = components.iter().map(|c| c.vertical_sample).max().unwrap();

    for component in components.iter_mut() {
        component.setup_geometry(usize::from(width), usize::from(height), h_max, v_max);
    }

    decoder.h_max = h_max;
    decoder.v_max = v_max;
    decoder.mcu_x = div_ceil(usize::from(width), 8 * h_max);
    decoder.mcu_y = div_ceil(usize::from(height), 8 * v_max);

    decoder.info.width = width;
    decoder.info.height = height;
    decoder.info.precision = precision;
    decoder.info.sof = sof;
    decoder.info.components = num_components;

    decoder.components = components;
    decoder.seen_sof = true;

    Ok(())
}

/// B.2.3, scan header.
pub(crate) fn parse_sos(decoder: &mut JpegDecoder) -> Result<(), JpegError> {
    let offset = decoder.stream.position();

    if !decoder.seen_sof {
        return Err(JpegError::invalid(offset, "start of scan before start of frame"));
    }

    let ls = usize::from(decoder.stream.get_u16_be_err()?);
    let ns = decoder.stream.get_u8_err()?;

    let expected = 6 + 2 * usize::from(ns);

    if ls != expected {
        return Err(JpegError::invalid(
            offset,
            format!("bad SOS length {ls}, expected {expected}")
        ));
    }

    if !(1..=4).contains(&ns) {
        return Err(JpegError::invalid(
            offset,
            format!("invalid number of scan components {ns}, expected 1..=4")
        ));
    }

    decoder.num_scan_components = usize::from(ns);

    let mut seen = [-1_i32; MAX_COMPONENTS];

    for i in 0..usize::from(ns) {
        let id = decoder.stream.get_u8_err()?;

        if seen.contains(&i32::from(id)) {
            return Err(JpegError::invalid(
                decoder.stream.position(),
                format!("component {id} selected twice in one scan")
            ));
        }
        seen[i] = i32::from(id);

        // top four bits DC table, bottom four AC table
        let tables = decoder.stream.get_u8_err()?;

        let j = decoder
            .components
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| {
                JpegError::invalid(
                    decoder.stream.position(),
                    format!("scan selects component {id} which the frame does not define")
                )
            })?;

        let component = &mut decoder.components[j];
        component.dc_huff_table = usize::from((tables >> 4) & 0xF);
        component.ac_huff_table = usize::from(tables & 0xF);

        decoder.z_order[i] = j;

        trace!(
            "assigned entropy tables {}/{} to component {j}, id={id}",
            component.dc_huff_table,
            component.ac_huff_table
        );
    }

    // B.2.3: the data units of an interleaved scan must fit one MCU
    if ns > 1 {
        let mcu_units: usize = decoder.z_order[..usize::from(ns)]
            .iter()
            .map(|&j| {
                decoder.components[j].horizontal_sample * decoder.components[j].vertical_sample
            })
            .sum();

        if mcu_units > 10 {
            return Err(JpegError::invalid(
                offset,
                format!("interleaved scan has {mcu_units} data units per MCU, limit is 10")
            ));
        }
    }

    // spectral selection and successive approximation
    let spec_start = decoder.stream.get_u8_err()?;
    let spec_end = decoder.stream.get_u8_err()?;
    let approx = decoder.stream.get_u8_err()?;

    let succ_high = approx >> 4;
    let succ_low = approx & 0xF;

    let sof = decoder.info.sof;

    if sof.is_progressive() {
        if spec_start > 63 || spec_end > 63 || spec_end < spec_start {
            return Err(JpegError::invalid(
                offset,
                format!("invalid spectral selection {spec_start}..{spec_end}")
            ));
        }
        if spec_start == 0 && spec_end != 0 {
            return Err(JpegError::invalid(
                offset,
                "progressive scans cannot mix DC and AC coefficients"
            ));
        }
        if spec_start != 0 && ns != 1 {
            return Err(JpegError::invalid(
                offset,
                "progressive AC scans must be non-interleaved"
            ));
        }
        if succ_high > 13 || succ_low > 13 {
            return Err(JpegError::invalid(
                offset,
                format!("invalid successive approximation {succ_high}/{succ_low}")
            ));
        }
        if succ_high != 0 && succ_high != succ_low + 1 {
            return Err(JpegError::invalid(
                offset,
                "refinement scans must advance one bit plane at a time"
            ));
        }
    } else if sof.is_lossless() {
        // Ss selects the predictor, Al the point transform
        if !(1..=7).contains(&spec_start) {
            return Err(JpegError::invalid(
                offset,
                format!("invalid lossless predictor {spec_start}, expected 1..=7")
            ));
        }
        if spec_end != 0 {
            return Err(JpegError::invalid(offset, "invalid lossless scan header"));
        }
        if u16::from(succ_low) >= u16::from(decoder.info.precision) {
            return Err(JpegError::invalid(
                offset,
                format!("point transform {succ_low} does not fit the sample precision")
            ));
        }
    } else {
        // sequential DCT scans always cover the whole block
        if spec_start != 0 || spec_end != 63 || succ_high != 0 || succ_low != 0 {
            return Err(JpegError::invalid(
                offset,
                "sequential scans require Ss=0 Se=63 Ah=0 Al=0"
            ));
        }
    }

    decoder.spec_start = spec_start;
    decoder.spec_end = spec_end;
    decoder.succ_high = succ_high;
    decoder.succ_low = succ_low;

    trace!("Ss={spec_start}, Se={spec_end}, Ah={succ_high}, Al={succ_low}");

    Ok(())
}
