//! Baseline (sequential) JPEG scan encoding and decoding.
//!
//! Handles the standard sequential JPEG format (SOF0). Coefficients are
//! encoded in a single scan with full spectral range.

use super::ScanCoefficients;
use crate::error::{ArchiveError, Result};
use crate::jpeg::huffman::{encode_coefficient, BitReader, BitWriter, HuffmanEncoder, HuffmanLookup};
use crate::jpeg::parser::{FrameInfo, JpegSegments};

/// Decode scan data from a baseline JPEG into DCT coefficients (scan order).
pub fn decode_scan_baseline(segments: &JpegSegments) -> Result<ScanCoefficients> {
    let frame = segments.frame.as_ref().ok_or_else(|| ArchiveError::JpegCodec {
        reason: "missing frame info (SOF)".to_string(),
    })?;

    let mut dc_tables: [Option<HuffmanLookup>; 4] = [None, None, None, None];
    let mut ac_tables: [Option<HuffmanLookup>; 4] = [None, None, None, None];

    for (i, table) in segments.dc_huff_tables.iter().enumerate() {
        if let Some(t) = table {
            dc_tables[i] = Some(HuffmanLookup::from_table(t)?);
        }
    }
    for (i, table) in segments.ac_huff_tables.iter().enumerate() {
        if let Some(t) = table {
            ac_tables[i] = Some(HuffmanLookup::from_table(t)?);
        }
    }

    let (mcu_width, mcu_height, _blocks_per_mcu, blocks_per_component) = calculate_mcu_info(frame)?;

    let mcu_cols = (frame.width as usize + mcu_width - 1) / mcu_width;
    let mcu_rows = (frame.height as usize + mcu_height - 1) / mcu_height;
    let total_mcus = mcu_cols * mcu_rows;

    let total_blocks: usize = blocks_per_component.iter().sum();

    let mut coefficients = ScanCoefficients {
        data: vec![0i16; total_blocks * 64],
        blocks_per_component: blocks_per_component.clone(),
        total_blocks,
        width: frame.width,
        height: frame.height,
    };

    let mut reader = BitReader::new(&segments.scan_data);
    let mut dc_predictors = vec![0i16; frame.components.len()];
    let mut block_idx = 0;

    let restart_interval = segments.restart_interval as usize;
    let mut restart_count = 0;

    for _mcu in 0..total_mcus {
        if restart_interval > 0 && restart_count == restart_interval {
            dc_predictors.fill(0);
            restart_count = 0;
        }

        for (comp_idx, component) in frame.components.iter().enumerate() {
            let h_blocks = component.h_sampling as usize;
            let v_blocks = component.v_sampling as usize;
            let num_blocks = h_blocks * v_blocks;

            let dc_table = dc_tables[component.dc_table_id as usize].as_ref().ok_or_else(|| {
                ArchiveError::JpegCodec { reason: format!("missing DC Huffman table {}", component.dc_table_id) }
            })?;
            let ac_table = ac_tables[component.ac_table_id as usize].as_ref().ok_or_else(|| {
                ArchiveError::JpegCodec { reason: format!("missing AC Huffman table {}", component.ac_table_id) }
            })?;

            for _ in 0..num_blocks {
                if block_idx >= coefficients.total_blocks {
                    break;
                }

                let block = coefficients.block_mut(block_idx);
                decode_block(&mut reader, block, dc_table, ac_table, &mut dc_predictors[comp_idx])?;
                block_idx += 1;
            }
        }

        restart_count += 1;
    }

    Ok(coefficients)
}

/// Re-encode DCT coefficients as scan data, using the Huffman tables from
/// the original JPEG. Inverse of [`decode_scan_baseline`].
pub fn encode_scan_baseline(coefficients: &ScanCoefficients, segments: &JpegSegments) -> Result<Vec<u8>> {
    let frame = segments.frame.as_ref().ok_or_else(|| ArchiveError::JpegCodec {
        reason: "missing frame info (SOF)".to_string(),
    })?;

    let mut dc_encoders: [Option<HuffmanEncoder>; 4] = [None, None, None, None];
    let mut ac_encoders: [Option<HuffmanEncoder>; 4] = [None, None, None, None];

    for (i, table) in segments.dc_huff_tables.iter().enumerate() {
        if let Some(t) = table {
            dc_encoders[i] = Some(HuffmanEncoder::from_table(t)?);
        }
    }
    for (i, table) in segments.ac_huff_tables.iter().enumerate() {
        if let Some(t) = table {
            ac_encoders[i] = Some(HuffmanEncoder::from_table(t)?);
        }
    }

    let (mcu_width, mcu_height, _blocks_per_mcu, _blocks_per_component) = calculate_mcu_info(frame)?;

    let mcu_cols = (frame.width as usize + mcu_width - 1) / mcu_width;
    let mcu_rows = (frame.height as usize + mcu_height - 1) / mcu_height;
    let total_mcus = mcu_cols * mcu_rows;

    let mut writer = BitWriter::with_capacity(segments.scan_data.len());
    let mut dc_predictors = vec![0i16; frame.components.len()];
    let mut block_idx = 0;

    let restart_interval = segments.restart_interval as usize;
    let mut restart_count = 0;

    for _mcu in 0..total_mcus {
        if restart_interval > 0 && restart_count == restart_interval {
            dc_predictors.fill(0);
            restart_count = 0;
            // Restart marker writing is not implemented: archive covers are
            // only ever read back by this same codec.
        }

        for (comp_idx, component) in frame.components.iter().enumerate() {
            let h_blocks = component.h_sampling as usize;
            let v_blocks = component.v_sampling as usize;
            let num_blocks = h_blocks * v_blocks;

            let dc_encoder = dc_encoders[component.dc_table_id as usize].as_ref().ok_or_else(|| {
                ArchiveError::JpegCodec { reason: format!("missing DC Huffman table {}", component.dc_table_id) }
            })?;
            let ac_encoder = ac_encoders[component.ac_table_id as usize].as_ref().ok_or_else(|| {
                ArchiveError::JpegCodec { reason: format!("missing AC Huffman table {}", component.ac_table_id) }
            })?;

            for _ in 0..num_blocks {
                if block_idx >= coefficients.total_blocks {
                    break;
                }

                let block = coefficients.block(block_idx);
                encode_block(&mut writer, block, dc_encoder, ac_encoder, &mut dc_predictors[comp_idx])?;
                block_idx += 1;
            }
        }

        restart_count += 1;
    }

    Ok(writer.into_bytes())
}

fn encode_block(
    writer: &mut BitWriter,
    block: &[i16],
    dc_encoder: &HuffmanEncoder,
    ac_encoder: &HuffmanEncoder,
    dc_predictor: &mut i16,
) -> Result<()> {
    let dc_value = block[0];
    let dc_diff = dc_value.wrapping_sub(*dc_predictor);
    *dc_predictor = dc_value;

    let (dc_size, dc_bits) = encode_coefficient(dc_diff);
    writer.write_huffman(dc_size, dc_encoder)?;
    if dc_size > 0 {
        writer.write_bits(dc_bits, dc_size);
    }

    let mut zero_run = 0u8;

    for k in 1..64 {
        let coeff = block[k];

        if coeff == 0 {
            zero_run += 1;
        } else {
            while zero_run >= 16 {
                writer.write_huffman(0xF0, ac_encoder)?; // ZRL
                zero_run -= 16;
            }

            let (size, bits) = encode_coefficient(coeff);
            let symbol = (zero_run << 4) | size;
            writer.write_huffman(symbol, ac_encoder)?;
            writer.write_bits(bits, size);

            zero_run = 0;
        }
    }

    if zero_run > 0 {
        writer.write_huffman(0x00, ac_encoder)?; // EOB
    }

    Ok(())
}

fn decode_block(
    reader: &mut BitReader,
    block: &mut [i16],
    dc_table: &HuffmanLookup,
    ac_table: &HuffmanLookup,
    dc_predictor: &mut i16,
) -> Result<()> {
    block.fill(0);

    let dc_size = reader.decode_huffman(dc_table)?;
    if dc_size > 11 {
        return Err(ArchiveError::JpegCodec { reason: format!("invalid DC coefficient size: {}", dc_size) });
    }

    let dc_diff = reader.receive_extend(dc_size)?;
    *dc_predictor = dc_predictor.wrapping_add(dc_diff);
    block[0] = *dc_predictor;

    let mut k = 1;
    while k < 64 {
        let symbol = reader.decode_huffman(ac_table)?;
        let run = symbol >> 4;
        let size = symbol & 0x0F;

        if size == 0 {
            if run == 0 {
                break; // EOB
            } else if run == 0x0F {
                k += 16; // ZRL
            } else {
                return Err(ArchiveError::JpegCodec { reason: format!("invalid AC run/size: {:02X}", symbol) });
            }
        } else {
            k += run as usize;
            if k >= 64 {
                return Err(ArchiveError::JpegCodec { reason: "AC coefficient index out of bounds".to_string() });
            }

            block[k] = reader.receive_extend(size)?;
            k += 1;
        }
    }

    Ok(())
}

/// Calculate MCU (Minimum Coded Unit) information.
pub(crate) fn calculate_mcu_info(frame: &FrameInfo) -> Result<(usize, usize, Vec<usize>, Vec<usize>)> {
    let h_max = frame.components.iter().map(|c| c.h_sampling as usize).max().unwrap_or(1);
    let v_max = frame.components.iter().map(|c| c.v_sampling as usize).max().unwrap_or(1);

    let mcu_width = h_max * 8;
    let mcu_height = v_max * 8;

    let blocks_per_mcu: Vec<usize> =
        frame.components.iter().map(|c| (c.h_sampling as usize) * (c.v_sampling as usize)).collect();

    let mcu_cols = (frame.width as usize + mcu_width - 1) / mcu_width;
    let mcu_rows = (frame.height as usize + mcu_height - 1) / mcu_height;
    let total_mcus = mcu_cols * mcu_rows;

    let blocks_per_component: Vec<usize> = blocks_per_mcu.iter().map(|&blocks| blocks * total_mcus).collect();

    Ok((mcu_width, mcu_height, blocks_per_mcu, blocks_per_component))
}
