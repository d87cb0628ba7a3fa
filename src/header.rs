//! On-disk archive header framing.
//!
//! Layout: `u8 k`, `u64 msg_size`, `u64 order_size`, then `order_size` bytes
//! of concatenated 16-byte MD5 fingerprints. Always little-endian: the
//! original C implementation `fwrite`d these fields in host byte order,
//! which is not portable across machines. This crate fixes little-endian as
//! the one canonical layout instead, documented as a deliberate break from
//! byte-for-byte compatibility with that implementation.

use crate::error::{ArchiveError, Result};

const FINGERPRINT_LEN: usize = 16;
const HEADER_PREFIX_LEN: usize = 1 + 8 + 8;

/// A parsed archive header: rate, payload length, and the cover-order
/// manifest (concatenated fingerprints) that followed it on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveHeader {
    pub k: u8,
    pub msg_size: u64,
    pub order: Vec<u8>,
}

impl ArchiveHeader {
    pub fn new(k: u8, msg_size: u64, order: Vec<u8>) -> Self {
        ArchiveHeader { k, msg_size, order }
    }

    /// Number of fingerprints carried in `order`.
    pub fn container_count(&self) -> usize {
        self.order.len() / FINGERPRINT_LEN
    }

    /// Serialize to the on-disk layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_PREFIX_LEN + self.order.len());
        out.push(self.k);
        out.extend_from_slice(&self.msg_size.to_le_bytes());
        out.extend_from_slice(&(self.order.len() as u64).to_le_bytes());
        out.extend_from_slice(&self.order);
        out
    }

    /// Parse from the on-disk layout.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_PREFIX_LEN {
            return Err(ArchiveError::WrongArgs { reason: "archive header shorter than the fixed prefix".to_string() });
        }

        let k = data[0];
        let msg_size = u64::from_le_bytes(data[1..9].try_into().expect("9-byte slice"));
        let order_size = u64::from_le_bytes(data[9..17].try_into().expect("8-byte slice")) as usize;

        if order_size % FINGERPRINT_LEN != 0 {
            return Err(ArchiveError::WrongArgs { reason: format!("order_size {} is not a multiple of 16", order_size) });
        }

        let end = HEADER_PREFIX_LEN + order_size;
        if data.len() < end {
            return Err(ArchiveError::WrongArgs {
                reason: format!("archive header declares {} order bytes but only {} remain", order_size, data.len() - HEADER_PREFIX_LEN),
            });
        }

        Ok(ArchiveHeader { k, msg_size, order: data[HEADER_PREFIX_LEN..end].to_vec() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_roundtrip() {
        let order: Vec<u8> = (0..32u8).collect(); // two fake fingerprints
        let header = ArchiveHeader::new(5, 1234, order.clone());

        let bytes = header.to_bytes();
        let parsed = ArchiveHeader::from_bytes(&bytes).unwrap();

        assert_eq!(parsed, header);
        assert_eq!(parsed.container_count(), 2);
    }

    #[test]
    fn test_header_layout_is_little_endian() {
        let header = ArchiveHeader::new(3, 0x0102030405060708, Vec::new());
        let bytes = header.to_bytes();

        assert_eq!(bytes[0], 3);
        assert_eq!(&bytes[1..9], &[0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01]);
        assert_eq!(&bytes[9..17], &[0, 0, 0, 0, 0, 0, 0, 0]); // order_size = 0
    }

    #[test]
    fn test_header_rejects_truncated_order() {
        let mut bytes = ArchiveHeader::new(1, 0, vec![0u8; 16]).to_bytes();
        bytes.truncate(bytes.len() - 1);

        assert!(ArchiveHeader::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_header_empty_order() {
        let header = ArchiveHeader::new(2, 0, Vec::new());
        let bytes = header.to_bytes();
        let parsed = ArchiveHeader::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.container_count(), 0);
    }
}
