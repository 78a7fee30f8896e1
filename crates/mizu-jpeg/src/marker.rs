/*
 * Copyright (c) 2026.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT or Apache License
 */

//! Marker segment codes.
//!
//! A marker occupies two bytes on the wire, a `0xFF` sentinel followed
//! by a non-zero, non-`0xFF` code byte. Runs of `0xFF` collapse into a
//! single sentinel.

/// Markers that can occur in a JPEG stream.
#[derive(Eq, PartialEq, Copy, Clone, Debug)]
pub enum Marker {
    /// Start of image
    SOI,
    /// End of image
    EOI,
    /// Start of frame, the payload selects the coding process.
    ///
    /// `SOF(n)` corresponds to the code byte `0xC0 + n`, skipping the
    /// codes claimed by DHT (0xC4), JPG (0xC8) and DAC (0xCC).
    SOF(u8),
    /// Restart marker, `RST(n)` for n in 0..=7
    RST(u8),
    /// Define Huffman table(s)
    DHT,
    /// Define arithmetic coding conditioning(s)
    DAC,
    /// Define quantization table(s)
    DQT,
    /// Define number of lines
    DNL,
    /// Define restart interval
    DRI,
    /// Start of scan
    SOS,
    /// Application segments, `APP(n)` for n in 0..=15
    APP(u8),
    /// Comment
    COM,
    /// Reserved JPG extensions and temporary markers, kept so that the
    /// skip-by-length path can report them by name.
    JPG(u8)
}

impl Marker {
    /// Map a code byte to a marker.
    ///
    /// Returns `None` for `0x00` (a stuffing byte), `0xFF` (fill) and
    /// code points the standard leaves unassigned.
    pub fn from_u8(code: u8) -> Option<Marker> {
        use Marker::{APP, COM, DAC, DHT, DNL, DQT, DRI, EOI, JPG, RST, SOF, SOI, SOS};

        match code {
            0xC0..=0xC3 | 0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF => {
                // SOFn, with the holes for DHT/JPG/DAC removed
                Some(SOF(code - 0xC0))
            }
            0xC4 => Some(DHT),
            0xC8 => Some(JPG(0xC8)),
            0xCC => Some(DAC),
            0xD0..=0xD7 => Some(RST(code - 0xD0)),
            0xD8 => Some(SOI),
            0xD9 => Some(EOI),
            0xDA => Some(SOS),
            0xDB => Some(DQT),
            0xDC => Some(DNL),
            0xDD => Some(DRI),
            0xE0..=0xEF => Some(APP(code - 0xE0)),
            0xF0..=0xFD => Some(JPG(code)),
            0xFE => Some(COM),
            _ => None
        }
    }

    /// The code byte this marker is written as.
    pub fn to_u8(self) -> u8 {
        use Marker::{APP, COM, DAC, DHT, DNL, DQT, DRI, EOI, JPG, RST, SOF, SOI, SOS};

        match self {
            SOF(v) => 0xC0 + v,
            DHT => 0xC4,
            DAC => 0xCC,
            RST(v) => 0xD0 + v,
            SOI => 0xD8,
            EOI => 0xD9,
            SOS => 0xDA,
            DQT => 0xDB,
            DNL => 0xDC,
            DRI => 0xDD,
            APP(v) => 0xE0 + v,
            JPG(v) => v,
            COM => 0xFE
        }
    }

    /// True for markers that are standalone on the wire, i.e. carry no
    /// length-prefixed payload.
    pub fn is_standalone(self) -> bool {
        matches!(self, Marker::SOI | Marker::EOI | Marker::RST(_))
    }
}

#[cfg(test)]
mod tests {
    use super::Marker;

    #[test]
    fn roundtrips_every_assigned_code() {
        for code in 1..=0xFE_u8 {
            if let Some(marker) = Marker::from_u8(code) {
                assert_eq!(marker.to_u8(), code, "marker 0xFF{code:02X}");
            }
        }
    }

    #[test]
    fn stuffing_and_fill_are_not_markers() {
        assert_eq!(Marker::from_u8(0x00), None);
        assert_eq!(Marker::from_u8(0xFF), None);
    }

    #[test]
    fn sof_codes_skip_table_markers() {
        assert_eq!(Marker::from_u8(0xC4), Some(Marker::DHT));
        assert_eq!(Marker::from_u8(0xCC), Some(Marker::DAC));
        assert_eq!(Marker::from_u8(0xC2), Some(Marker::SOF(2)));
        assert_eq!(Marker::from_u8(0xCA), Some(Marker::SOF(10)));
    }
}
