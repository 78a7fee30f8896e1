/*
 * Copyright (c) 2026.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT or Apache License
 */

//! Decoder and encoder options
//!
//! Options are plain structs with builder style setters, a codec keeps
//! a copy of the struct it was created with for its whole lifetime.

/// Decoder options.
///
/// Controls limits and strictness of a decoder, the defaults are
/// permissive enough for almost all real-world files.
#[derive(Debug, Copy, Clone)]
pub struct DecoderOptions {
    /// Maximum width the decoder accepts before erroring out.
    max_width:   usize,
    /// Maximum height the decoder accepts before erroring out.
    max_height:  usize,
    /// Maximum number of scans in a single frame, a progressive image
    /// with more scans than this is treated as malicious.
    max_scans:   usize,
    /// Whether minor non-conformance should be a hard error instead of
    /// a logged warning.
    strict_mode: bool
}

impl Default for DecoderOptions {
    fn default() -> Self {
        DecoderOptions {
            max_width:   1 << 15,
            max_height:  1 << 15,
            max_scans:   128,
            strict_mode: false
        }
    }
}

impl DecoderOptions {
    /// Return the maximum width the decoder will accept.
    pub const fn max_width(&self) -> usize {
        self.max_width
    }

    /// Return the maximum height the decoder will accept.
    pub const fn max_height(&self) -> usize {
        self.max_height
    }

    /// Return the maximum number of scans in a progressive frame.
    pub const fn max_scans(&self) -> usize {
        self.max_scans
    }

    /// Return true if the decoder errors out on minor non-conformance.
    pub const fn strict_mode(&self) -> bool {
        self.strict_mode
    }

    /// Set the maximum image width.
    #[must_use]
    pub const fn set_max_width(mut self, width: usize) -> Self {
        self.max_width = width;
        self
    }

    /// Set the maximum image height.
    #[must_use]
    pub const fn set_max_height(mut self, height: usize) -> Self {
        self.max_height = height;
        self
    }

    /// Set the maximum number of scans in a progressive frame.
    #[must_use]
    pub const fn set_max_scans(mut self, scans: usize) -> Self {
        self.max_scans = scans;
        self
    }

    /// Set whether the decoder should treat minor non-conformance as a
    /// hard error.
    #[must_use]
    pub const fn set_strict_mode(mut self, strict: bool) -> Self {
        self.strict_mode = strict;
        self
    }
}

/// Encoder options.
#[derive(Debug, Copy, Clone)]
pub struct EncoderOptions {
    /// Quality used to scale the standard quantization tables when the
    /// caller supplies none, 1..=100.
    quality:          u8,
    /// Restart interval in MCUs, 0 disables restart markers.
    restart_interval: u16,
    /// Whether a statistics pass builds image specific Huffman tables
    /// for every table selector the caller left unset.
    optimize_huffman: bool
}

impl Default for EncoderOptions {
    fn default() -> Self {
        EncoderOptions {
            quality:          85,
            restart_interval: 0,
            optimize_huffman: true
        }
    }
}

impl EncoderOptions {
    /// Return the configured quality.
    pub const fn quality(&self) -> u8 {
        self.quality
    }

    /// Return the restart interval in MCU units, 0 means no restarts.
    pub const fn restart_interval(&self) -> u16 {
        self.restart_interval
    }

    /// Return true if unset Huffman selectors get image specific tables.
    pub const fn optimize_huffman(&self) -> bool {
        self.optimize_huffman
    }

    /// Set the quality, clamped to 1..=100.
    #[must_use]
    pub const fn set_quality(mut self, quality: u8) -> Self {
        self.quality = if quality == 0 {
            1
        } else if quality > 100 {
            100
        } else {
            quality
        };
        self
    }

    /// Set the restart interval in MCU units.
    #[must_use]
    pub const fn set_restart_interval(mut self, interval: u16) -> Self {
        self.restart_interval = interval;
        self
    }

    /// Choose between the optimal-Huffman gather pass and the standard
    /// tables for selectors the caller left unset.
    #[must_use]
    pub const fn set_optimize_huffman(mut self, yes: bool) -> Self {
        self.optimize_huffman = yes;
        self
    }
}
