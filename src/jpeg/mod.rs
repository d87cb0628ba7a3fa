//! JPEG parsing, entropy decoding/encoding, and re-assembly.
//!
//! This module only concerns itself with turning a JPEG file into DCT
//! coefficients and back. It has no notion of payloads, archives, or
//! containers — those live above it, in [`crate::container`] and
//! [`crate::archive`], which walk the coefficients this module exposes.

pub mod huffman;
pub mod marker;
pub mod parser;
pub mod scan;
pub mod writer;

#[cfg(test)]
pub(crate) mod testutil;

pub use marker::Marker;
pub use parser::{parse_jpeg, parse_jpeg_reader, parse_quantization_tables, Component, FrameInfo, JpegSegments, QuantizationTable};
pub use scan::{decode_scan, encode_scan, ScanCoefficients};
pub use writer::write_jpeg;
