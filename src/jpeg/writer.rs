//! JPEG file writer for reassembling modified scan data.
//!
//! Takes parsed JPEG segments and new scan data to produce a complete JPEG file.
//!
//! Adapted from [jpeg-encoder](https://github.com/vstroebel/jpeg-encoder).

use super::marker::Marker;
use super::parser::JpegSegments;

/// Write a complete JPEG file from parsed segments and new scan data.
///
/// Preserves all original segments (APP markers, comments, quantization
/// tables, Huffman tables, etc.) and replaces only the scan data.
pub fn write_jpeg(segments: &JpegSegments, new_scan_data: &[u8]) -> Vec<u8> {
    let estimated_size = segments.segments.iter().map(|s| s.data.len() + 4).sum::<usize>()
        + new_scan_data.len()
        + 100;

    let mut output = Vec::with_capacity(estimated_size);

    output.push(0xFF);
    output.push(Marker::SOI.to_u8());

    for segment in &segments.segments {
        if segment.marker == Marker::SOS {
            continue;
        }

        write_marker(&mut output, segment.marker);

        if segment.marker.has_length() {
            let length = (segment.data.len() + 2) as u16;
            output.push((length >> 8) as u8);
            output.push(length as u8);
        }

        output.extend_from_slice(&segment.data);
    }

    write_sos_header(&mut output, segments);
    output.extend_from_slice(new_scan_data);

    output.push(0xFF);
    output.push(Marker::EOI.to_u8());

    output
}

fn write_marker(output: &mut Vec<u8>, marker: Marker) {
    output.push(0xFF);
    output.push(marker.to_u8());
}

/// Reconstruct the SOS (Start of Scan) header from the frame and component data.
fn write_sos_header(output: &mut Vec<u8>, segments: &JpegSegments) {
    write_marker(output, Marker::SOS);

    let frame = match &segments.frame {
        Some(f) => f,
        None => return,
    };

    let num_components = frame.components.len() as u8;
    let length = 6 + 2 * num_components as u16;

    output.push((length >> 8) as u8);
    output.push(length as u8);
    output.push(num_components);

    for component in &frame.components {
        output.push(component.id);
        output.push((component.dc_table_id << 4) | component.ac_table_id);
    }

    output.push(0); // Spectral selection start (Ss)
    output.push(63); // Spectral selection end (Se)
    output.push(0); // Successive approximation (Ah, Al)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jpeg::{decode_scan, encode_scan};

    #[test]
    fn test_write_jpeg_structure() {
        let segments = crate::jpeg::testutil::single_block_jpeg(&[1, 0, 0, 0]);
        let coefficients = decode_scan(&segments).expect("decode");
        let new_scan_data = encode_scan(&coefficients, &segments).expect("encode");
        let output_jpeg = write_jpeg(&segments, &new_scan_data);

        assert!(output_jpeg.starts_with(&[0xFF, 0xD8]));
        assert!(output_jpeg.ends_with(&[0xFF, 0xD9]));

        let mut marker_count = 0;
        let mut i = 0;
        while i < output_jpeg.len() - 1 {
            if output_jpeg[i] == 0xFF && output_jpeg[i + 1] != 0x00 && output_jpeg[i + 1] != 0xFF {
                marker_count += 1;
            }
            i += 1;
        }
        assert!(marker_count >= 4, "expected at least SOI, DQT, SOF, SOS, EOI markers");
    }

    #[test]
    fn test_write_jpeg_roundtrip() {
        let segments = crate::jpeg::testutil::single_block_jpeg(&[1, 0, 0, 0]);
        let coefficients = decode_scan(&segments).expect("decode");
        let new_scan_data = encode_scan(&coefficients, &segments).expect("encode");
        let output_jpeg = write_jpeg(&segments, &new_scan_data);

        let segments2 = crate::jpeg::parse_jpeg(&output_jpeg).expect("reparse");
        let coefficients2 = decode_scan(&segments2).expect("redecode");

        assert_eq!(coefficients.total_blocks, coefficients2.total_blocks);
        assert_eq!(coefficients.data, coefficients2.data);
    }
}
