//! Codec layer for block payloads.
//!
//! # Submodules
//!
//! - [`compression`][]: zlib inflation with exact-length validation

pub mod compression;
