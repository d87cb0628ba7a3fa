//! DCT coefficient scan data: decoding from and encoding to entropy-coded bytes.

mod baseline;

pub(crate) use baseline::calculate_mcu_info;

use crate::error::{ArchiveError, Result};
use crate::jpeg::parser::JpegSegments;

/// Decoded DCT coefficients for every block of every component, in scan
/// order (component-interleaved per MCU, each block in zigzag order).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanCoefficients {
    pub data: Vec<i16>,
    pub blocks_per_component: Vec<usize>,
    pub total_blocks: usize,
    pub width: u16,
    pub height: u16,
}

impl ScanCoefficients {
    /// The 64 zigzag-order coefficients of the given block.
    pub fn block(&self, block_idx: usize) -> &[i16] {
        let start = block_idx * 64;
        &self.data[start..start + 64]
    }

    /// Mutable view of the 64 zigzag-order coefficients of the given block.
    pub fn block_mut(&mut self, block_idx: usize) -> &mut [i16] {
        let start = block_idx * 64;
        &mut self.data[start..start + 64]
    }

    /// All coefficients belonging to the first (luminance) component, as a
    /// flat slice of `blocks_per_component[0] * 64` zigzag-order values.
    pub fn as_slice(&self) -> &[i16] {
        let blocks = self.blocks_per_component.first().copied().unwrap_or(0);
        &self.data[..blocks * 64]
    }

    /// Mutable view of [`ScanCoefficients::as_slice`].
    pub fn as_mut_slice(&mut self) -> &mut [i16] {
        let blocks = self.blocks_per_component.first().copied().unwrap_or(0);
        &mut self.data[..blocks * 64]
    }
}

/// Decode scan data into DCT coefficients. Dispatches on the frame's SOF
/// marker; only baseline (SOF0) frames are supported.
pub fn decode_scan(segments: &JpegSegments) -> Result<ScanCoefficients> {
    let frame = segments.frame.as_ref().ok_or_else(|| ArchiveError::JpegCodec {
        reason: "missing frame info (SOF)".to_string(),
    })?;

    match frame.sof_type {
        0 => baseline::decode_scan_baseline(segments),
        other => Err(ArchiveError::JpegCodec {
            reason: format!("unsupported JPEG frame type SOF{}: only baseline (SOF0) is supported", other),
        }),
    }
}

/// Encode DCT coefficients into scan data, using the Huffman tables carried
/// by `segments`. Inverse of [`decode_scan`].
pub fn encode_scan(coefficients: &ScanCoefficients, segments: &JpegSegments) -> Result<Vec<u8>> {
    let frame = segments.frame.as_ref().ok_or_else(|| ArchiveError::JpegCodec {
        reason: "missing frame info (SOF)".to_string(),
    })?;

    match frame.sof_type {
        0 => baseline::encode_scan_baseline(coefficients, segments),
        other => Err(ArchiveError::JpegCodec {
            reason: format!("unsupported JPEG frame type SOF{}: only baseline (SOF0) is supported", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jpeg::testutil::single_block_jpeg;

    #[test]
    fn test_decode_scan_dispatches_to_baseline() {
        let segments = single_block_jpeg(&[1, 0, 1]);
        let coefficients = decode_scan(&segments).expect("decode");
        assert_eq!(coefficients.total_blocks, 1);
    }

    #[test]
    fn test_decode_scan_rejects_progressive() {
        let mut segments = single_block_jpeg(&[1, 0, 1]);
        if let Some(frame) = segments.frame.as_mut() {
            frame.sof_type = 2; // SOF2, progressive
        }

        let result = decode_scan(&segments);
        assert!(matches!(result, Err(ArchiveError::JpegCodec { .. })));
    }

    #[test]
    fn test_block_accessors() {
        let segments = single_block_jpeg(&[2, 1, 0, 3]);
        let coefficients = decode_scan(&segments).expect("decode");

        assert_eq!(coefficients.block(0)[0], 2);
        assert_eq!(coefficients.as_slice().len(), 64);
    }
}
