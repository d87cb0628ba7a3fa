//! Synthetic single-block JPEG fixtures for unit tests.
//!
//! No real-world JPEG file ships with this crate, so tests that need a
//! parseable/encodable scan build one from scratch: a minimal DC table
//! (sizes 0-3) and a minimal AC table (a handful of run/size symbols plus
//! EOB and ZRL), each assigned equal-length codes so the Kraft sum is
//! exactly 1 and `derive_huffman_codes` never overflows.

use super::parser::{Component, FrameInfo, HuffmanTable, JpegSegments, QuantizationTable, Segment};
use super::scan::{encode_scan, ScanCoefficients};
use super::Marker;

const DC_VALUES: [u8; 4] = [0, 1, 2, 3];
const AC_VALUES: [u8; 8] = [0x00, 0x01, 0x02, 0x03, 0x11, 0x12, 0x21, 0xF0];

fn dc_table() -> HuffmanTable {
    let mut code_lengths = [0u8; 16];
    code_lengths[1] = DC_VALUES.len() as u8; // 4 symbols of length 2
    HuffmanTable { class: 0, id: 0, code_lengths, values: DC_VALUES.to_vec() }
}

fn ac_table() -> HuffmanTable {
    let mut code_lengths = [0u8; 16];
    code_lengths[2] = AC_VALUES.len() as u8; // 8 symbols of length 3
    HuffmanTable { class: 1, id: 0, code_lengths, values: AC_VALUES.to_vec() }
}

fn dqt_segment_bytes() -> Vec<u8> {
    let mut data = vec![0x00u8];
    data.extend(std::iter::repeat(1u8).take(64));
    data
}

fn dht_segment_bytes(table: &HuffmanTable) -> Vec<u8> {
    let mut data = vec![(table.class << 4) | table.id];
    data.extend_from_slice(&table.code_lengths);
    data.extend_from_slice(&table.values);
    data
}

fn sof_segment_bytes() -> Vec<u8> {
    vec![8, 0x00, 0x08, 0x00, 0x08, 0x01, 1, 0x11, 0x00]
}

/// Build a single-component, single-8x8-block baseline JPEG whose scan data
/// encodes `block` (a zigzag-order coefficient slice, zero-padded to 64 and
/// clamped to this fixture's Huffman table: |DC diff| <= 7, |AC value| <= 7,
/// zero-run between nonzero AC coefficients <= 2).
pub fn single_block_jpeg(block: &[i16]) -> JpegSegments {
    let mut data = [0i16; 64];
    data[..block.len().min(64)].copy_from_slice(&block[..block.len().min(64)]);

    let dc = dc_table();
    let ac = ac_table();

    let mut segments = JpegSegments {
        quant_tables: [
            Some(QuantizationTable { id: 0, precision: 0, values: [1u16; 64] }),
            None,
            None,
            None,
        ],
        dc_huff_tables: [Some(dc.clone()), None, None, None],
        ac_huff_tables: [Some(ac.clone()), None, None, None],
        frame: Some(FrameInfo {
            sof_type: 0,
            precision: 8,
            height: 8,
            width: 8,
            components: vec![Component {
                id: 1,
                h_sampling: 1,
                v_sampling: 1,
                quant_table_id: 0,
                dc_table_id: 0,
                ac_table_id: 0,
            }],
        }),
        ..JpegSegments::default()
    };

    segments.segments.push(Segment { marker: Marker::DQT, data: dqt_segment_bytes() });
    segments.segments.push(Segment { marker: Marker::DHT, data: dht_segment_bytes(&dc) });
    segments.segments.push(Segment { marker: Marker::DHT, data: dht_segment_bytes(&ac) });
    segments.segments.push(Segment { marker: Marker::SOF(0), data: sof_segment_bytes() });

    let coefficients = ScanCoefficients {
        data: data.to_vec(),
        blocks_per_component: vec![1],
        total_blocks: 1,
        width: 8,
        height: 8,
    };
    segments.scan_data = encode_scan(&coefficients, &segments).expect("fixture must encode");

    segments
}
