/*
 * Copyright (c) 2026.
 *
 * This software is free software; You can redistribute it or modify it under terms of the MIT or Apache License
 */

//! Core routines shared by the mizu codecs
//!
//! This crate provides the small set of utilities the codec crates
//! have in common
//!
//! - A bytestream reader over in-memory buffers with endian aware reads
//! - A growable bytestream writer
//! - Decoder and encoder option structs
//!
//! Nothing in here is JPEG specific, the types are meant to be reusable
//! by any bitstream format.
pub mod bytestream;
pub mod options;
