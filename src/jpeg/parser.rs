//! JPEG parsing for F5 steganography.
//!
//! Extracts the components needed for coefficient-level manipulation:
//! - Quantization tables (DQT)
//! - Huffman tables (DHT)
//! - Frame info (SOF)
//! - Scan data (after SOS)
//!
//! Adapted from [jpeg-decoder](https://github.com/image-rs/jpeg-decoder).

use super::marker::Marker;
use crate::error::{ArchiveError, Result};
use std::io::{Read, Seek};

/// Zigzag order to natural (row-major) order mapping.
/// JPEG stores quantization/coefficient values in zigzag order.
pub const ZIGZAG_TO_NATURAL: [usize; 64] = [
    0, 1, 8, 16, 9, 2, 3, 10, 17, 24, 32, 25, 18, 11, 4, 5, 12, 19, 26, 33, 40, 48, 41, 34, 27, 20,
    13, 6, 7, 14, 21, 28, 35, 42, 49, 56, 57, 50, 43, 36, 29, 22, 15, 23, 30, 37, 44, 51, 58, 59,
    52, 45, 38, 31, 39, 46, 53, 60, 61, 54, 47, 55, 62, 63,
];

/// Natural (row-major) order to zigzag order mapping.
pub const NATURAL_TO_ZIGZAG: [usize; 64] = [
    0, 1, 5, 6, 14, 15, 27, 28, 2, 4, 7, 13, 16, 26, 29, 42, 3, 8, 12, 17, 25, 30, 41, 43, 9, 11,
    18, 24, 31, 40, 44, 53, 10, 19, 23, 32, 39, 45, 52, 54, 20, 22, 33, 38, 46, 51, 55, 60, 21, 34,
    37, 47, 50, 56, 59, 61, 35, 36, 48, 49, 57, 58, 62, 63,
];

/// A JPEG quantization table (8x8 = 64 values).
#[derive(Debug, Clone)]
pub struct QuantizationTable {
    /// Table ID (0-3).
    pub id: u8,
    /// Precision: 0 = 8-bit, 1 = 16-bit.
    pub precision: u8,
    /// Table values in zigzag order (as stored in JPEG).
    pub values: [u16; 64],
}

impl QuantizationTable {
    /// Get value at zigzag index.
    #[inline]
    pub fn get_zigzag(&self, index: usize) -> u16 {
        self.values[index]
    }

    /// Get value at natural (row, col) position.
    #[inline]
    pub fn get_natural(&self, row: usize, col: usize) -> u16 {
        self.values[NATURAL_TO_ZIGZAG[row * 8 + col]]
    }
}

/// Huffman table for encoding/decoding.
#[derive(Debug, Clone)]
pub struct HuffmanTable {
    /// Table class: 0 = DC, 1 = AC.
    pub class: u8,
    /// Table ID (0-3).
    pub id: u8,
    /// Number of codes of each length (1-16 bits).
    pub code_lengths: [u8; 16],
    /// Symbol values (up to 256).
    pub values: Vec<u8>,
}

/// JPEG component information.
#[derive(Debug, Clone)]
pub struct Component {
    /// Component ID.
    pub id: u8,
    /// Horizontal sampling factor.
    pub h_sampling: u8,
    /// Vertical sampling factor.
    pub v_sampling: u8,
    /// Quantization table ID to use.
    pub quant_table_id: u8,
    /// DC Huffman table ID (set during SOS parsing).
    pub dc_table_id: u8,
    /// AC Huffman table ID (set during SOS parsing).
    pub ac_table_id: u8,
}

/// Frame information from SOF marker.
#[derive(Debug, Clone)]
pub struct FrameInfo {
    /// SOF type (0 = baseline, 2 = progressive, etc.).
    pub sof_type: u8,
    /// Sample precision (usually 8 bits).
    pub precision: u8,
    /// Image height in pixels.
    pub height: u16,
    /// Image width in pixels.
    pub width: u16,
    /// Components (Y, Cb, Cr for color JPEG). Index 0 is the component the
    /// archive embeds into.
    pub components: Vec<Component>,
}

impl FrameInfo {
    /// Check if this is a baseline DCT image (SOF0).
    pub fn is_baseline(&self) -> bool {
        self.sof_type == 0
    }

    /// Check if this is a progressive DCT image (SOF2).
    pub fn is_progressive(&self) -> bool {
        self.sof_type == 2
    }

    /// Width of the first component, in 8x8 blocks (rounded up).
    pub fn width_in_blocks(&self) -> usize {
        let h_max = self.components.iter().map(|c| c.h_sampling as usize).max().unwrap_or(1);
        let comp = &self.components[0];
        let scale = comp.h_sampling as usize;
        ((self.width as usize * scale + 8 * h_max - 1) / (8 * h_max)).max(1)
    }

    /// Height of the first component, in 8x8 blocks (rounded up).
    pub fn height_in_blocks(&self) -> usize {
        let v_max = self.components.iter().map(|c| c.v_sampling as usize).max().unwrap_or(1);
        let comp = &self.components[0];
        let scale = comp.v_sampling as usize;
        ((self.height as usize * scale + 8 * v_max - 1) / (8 * v_max)).max(1)
    }
}

/// Raw segment data with its marker.
#[derive(Debug, Clone)]
pub struct Segment {
    /// The marker type.
    pub marker: Marker,
    /// Raw segment data (excluding marker and length bytes).
    pub data: Vec<u8>,
}

/// Parsed JPEG structure containing all segments needed for transcoding.
#[derive(Debug, Clone)]
pub struct JpegSegments {
    /// All segments in order (for reconstruction).
    pub segments: Vec<Segment>,
    /// Parsed quantization tables (indexed by ID).
    pub quant_tables: [Option<QuantizationTable>; 4],
    /// Parsed DC Huffman tables (indexed by ID).
    pub dc_huff_tables: [Option<HuffmanTable>; 4],
    /// Parsed AC Huffman tables (indexed by ID).
    pub ac_huff_tables: [Option<HuffmanTable>; 4],
    /// Frame info from SOF marker.
    pub frame: Option<FrameInfo>,
    /// Restart interval (0 if not set).
    pub restart_interval: u16,
    /// Raw scan data (entropy-coded, after SOS header).
    pub scan_data: Vec<u8>,
    /// SOS header data (needed for reconstruction).
    pub sos_header: Vec<u8>,
}

impl Default for JpegSegments {
    fn default() -> Self {
        JpegSegments {
            segments: Vec::new(),
            quant_tables: [None, None, None, None],
            dc_huff_tables: [None, None, None, None],
            ac_huff_tables: [None, None, None, None],
            frame: None,
            restart_interval: 0,
            scan_data: Vec::new(),
            sos_header: Vec::new(),
        }
    }
}

/// Parse a JPEG file into its constituent segments.
pub fn parse_jpeg(data: &[u8]) -> Result<JpegSegments> {
    let mut cursor = std::io::Cursor::new(data);
    parse_jpeg_reader(&mut cursor)
}

/// Parse a JPEG from a reader.
pub fn parse_jpeg_reader<R: Read + Seek>(reader: &mut R) -> Result<JpegSegments> {
    let mut segments = JpegSegments::default();

    let mut marker_bytes = [0u8; 2];
    reader.read_exact(&mut marker_bytes)?;
    if marker_bytes != [0xFF, 0xD8] {
        return Err(ArchiveError::JpegCodec {
            reason: "not a JPEG file (missing SOI marker)".to_string(),
        });
    }

    loop {
        let marker = read_marker(reader)?;

        match marker {
            Marker::EOI => break,

            Marker::SOS => {
                let length = read_length(reader)?;
                let mut header = vec![0u8; length];
                reader.read_exact(&mut header)?;

                parse_sos_header(&header, &mut segments)?;
                segments.sos_header = header;

                segments.scan_data = read_scan_data(reader)?;
                break;
            }

            Marker::DQT => {
                let length = read_length(reader)?;
                let mut data = vec![0u8; length];
                reader.read_exact(&mut data)?;

                parse_dqt(&data, &mut segments)?;
                segments.segments.push(Segment { marker, data });
            }

            Marker::DHT => {
                let length = read_length(reader)?;
                let mut data = vec![0u8; length];
                reader.read_exact(&mut data)?;

                parse_dht(&data, &mut segments)?;
                segments.segments.push(Segment { marker, data });
            }

            Marker::SOF(n) => {
                let length = read_length(reader)?;
                let mut data = vec![0u8; length];
                reader.read_exact(&mut data)?;

                segments.frame = Some(parse_sof(n, &data)?);
                segments.segments.push(Segment { marker, data });
            }

            Marker::DRI => {
                let length = read_length(reader)?;
                let mut data = vec![0u8; length];
                reader.read_exact(&mut data)?;

                if data.len() >= 2 {
                    segments.restart_interval = u16::from_be_bytes([data[0], data[1]]);
                }

                segments.segments.push(Segment { marker, data });
            }

            _ if marker.has_length() => {
                let length = read_length(reader)?;
                let mut data = vec![0u8; length];
                reader.read_exact(&mut data)?;

                segments.segments.push(Segment { marker, data });
            }

            _ => {
                // Markers without length (RST, etc.) shouldn't appear before SOS.
            }
        }
    }

    Ok(segments)
}

/// Parse quantization tables from a JPEG file, without needing the rest of
/// the segment tree. Useful for capacity pre-checks on a reader that hasn't
/// been fully decoded yet.
pub fn parse_quantization_tables<R: Read + Seek>(reader: &mut R) -> Result<Vec<QuantizationTable>> {
    let segments = parse_jpeg_reader(reader)?;
    Ok(segments.quant_tables.into_iter().flatten().collect())
}

fn read_marker<R: Read>(reader: &mut R) -> Result<Marker> {
    let mut buf = [0u8; 1];

    loop {
        reader.read_exact(&mut buf)?;
        if buf[0] == 0xFF {
            break;
        }
    }

    loop {
        reader.read_exact(&mut buf)?;
        if buf[0] != 0xFF {
            break;
        }
    }

    Marker::from_u8(buf[0]).ok_or_else(|| ArchiveError::JpegCodec {
        reason: format!("invalid marker byte: 0x{:02X}", buf[0]),
    })
}

/// Read segment length (2 bytes, big-endian, includes the 2 length bytes).
fn read_length<R: Read>(reader: &mut R) -> Result<usize> {
    let mut buf = [0u8; 2];
    reader.read_exact(&mut buf)?;
    let length = u16::from_be_bytes(buf) as usize;
    if length < 2 {
        return Err(ArchiveError::JpegCodec {
            reason: "segment length too small".to_string(),
        });
    }
    Ok(length - 2)
}

/// Read entropy-coded scan data. Preserves byte stuffing (0xFF 0x00) and
/// restart markers; the BitReader de-stuffs while decoding.
fn read_scan_data<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    let mut buf = [0u8; 1];

    loop {
        if reader.read_exact(&mut buf).is_err() {
            break;
        }

        if buf[0] == 0xFF {
            data.push(0xFF);

            if reader.read_exact(&mut buf).is_err() {
                break;
            }

            match buf[0] {
                0x00 => data.push(0x00),
                0xD0..=0xD7 => data.push(buf[0]),
                0xD9 => {
                    data.pop();
                    break;
                }
                0xFF => continue,
                _ => {
                    data.pop();
                    break;
                }
            }
        } else {
            data.push(buf[0]);
        }
    }

    Ok(data)
}

/// Parse DQT (Define Quantization Table) segment.
fn parse_dqt(data: &[u8], segments: &mut JpegSegments) -> Result<()> {
    let mut pos = 0;

    while pos < data.len() {
        let pq_tq = data[pos];
        let precision = (pq_tq >> 4) & 0x0F;
        let id = pq_tq & 0x0F;
        pos += 1;

        if id > 3 {
            return Err(ArchiveError::JpegCodec {
                reason: format!("invalid quantization table ID: {}", id),
            });
        }

        let mut values = [0u16; 64];
        if precision == 0 {
            for v in values.iter_mut() {
                if pos >= data.len() {
                    return Err(ArchiveError::JpegCodec {
                        reason: "DQT segment too short".to_string(),
                    });
                }
                *v = data[pos] as u16;
                pos += 1;
            }
        } else {
            for v in values.iter_mut() {
                if pos + 1 >= data.len() {
                    return Err(ArchiveError::JpegCodec {
                        reason: "DQT segment too short".to_string(),
                    });
                }
                *v = u16::from_be_bytes([data[pos], data[pos + 1]]);
                pos += 2;
            }
        }

        segments.quant_tables[id as usize] = Some(QuantizationTable { id, precision, values });
    }

    Ok(())
}

/// Parse DHT (Define Huffman Table) segment.
fn parse_dht(data: &[u8], segments: &mut JpegSegments) -> Result<()> {
    let mut pos = 0;

    while pos < data.len() {
        let tc_th = data[pos];
        let class = (tc_th >> 4) & 0x0F;
        let id = tc_th & 0x0F;
        pos += 1;

        if class > 1 || id > 3 {
            return Err(ArchiveError::JpegCodec {
                reason: format!("invalid Huffman table: class={}, id={}", class, id),
            });
        }

        let mut code_lengths = [0u8; 16];
        if pos + 16 > data.len() {
            return Err(ArchiveError::JpegCodec {
                reason: "DHT segment too short for code lengths".to_string(),
            });
        }
        code_lengths.copy_from_slice(&data[pos..pos + 16]);
        pos += 16;

        let total_codes: usize = code_lengths.iter().map(|&n| n as usize).sum();

        if pos + total_codes > data.len() {
            return Err(ArchiveError::JpegCodec {
                reason: "DHT segment too short for symbol values".to_string(),
            });
        }
        let values = data[pos..pos + total_codes].to_vec();
        pos += total_codes;

        let table = HuffmanTable { class, id, code_lengths, values };

        if class == 0 {
            segments.dc_huff_tables[id as usize] = Some(table);
        } else {
            segments.ac_huff_tables[id as usize] = Some(table);
        }
    }

    Ok(())
}

/// Parse SOF (Start of Frame) segment.
fn parse_sof(sof_type: u8, data: &[u8]) -> Result<FrameInfo> {
    if data.len() < 6 {
        return Err(ArchiveError::JpegCodec {
            reason: "SOF segment too short".to_string(),
        });
    }

    let precision = data[0];
    let height = u16::from_be_bytes([data[1], data[2]]);
    let width = u16::from_be_bytes([data[3], data[4]]);
    let num_components = data[5] as usize;

    if data.len() < 6 + num_components * 3 {
        return Err(ArchiveError::JpegCodec {
            reason: "SOF segment too short for components".to_string(),
        });
    }

    let mut components = Vec::with_capacity(num_components);
    for i in 0..num_components {
        let offset = 6 + i * 3;
        let id = data[offset];
        let sampling = data[offset + 1];
        let quant_table_id = data[offset + 2];

        components.push(Component {
            id,
            h_sampling: (sampling >> 4) & 0x0F,
            v_sampling: sampling & 0x0F,
            quant_table_id,
            dc_table_id: 0,
            ac_table_id: 0,
        });
    }

    Ok(FrameInfo { sof_type, precision, height, width, components })
}

/// Parse SOS (Start of Scan) header to get table assignments.
fn parse_sos_header(data: &[u8], segments: &mut JpegSegments) -> Result<()> {
    if data.is_empty() {
        return Err(ArchiveError::JpegCodec {
            reason: "SOS header empty".to_string(),
        });
    }

    let num_components = data[0] as usize;
    if data.len() < 1 + num_components * 2 + 3 {
        return Err(ArchiveError::JpegCodec {
            reason: "SOS header too short".to_string(),
        });
    }

    if let Some(ref mut frame) = segments.frame {
        for i in 0..num_components {
            let offset = 1 + i * 2;
            let component_id = data[offset];
            let table_ids = data[offset + 1];
            let dc_table = (table_ids >> 4) & 0x0F;
            let ac_table = table_ids & 0x0F;

            for comp in frame.components.iter_mut() {
                if comp.id == component_id {
                    comp.dc_table_id = dc_table;
                    comp.ac_table_id = ac_table;
                    break;
                }
            }
        }
    }

    Ok(())
}
