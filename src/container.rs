//! Container lifecycle: one JPEG cover, owning its decode state while active.

use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use crate::error::{ArchiveError, Result};
use crate::iterator::CoefficientCursor;
use crate::jpeg::{decode_scan, encode_scan, parse_jpeg, write_jpeg, JpegSegments, ScanCoefficients};

/// Where a container's bytes live: a file path the container owns exclusively
/// while active, or a buffer the caller and the container share. The shared
/// buffer stands in for the original design's `(pointer, externally owned
/// size cell)` pair — `close_keep` rewrites it in place and the caller's own
/// `Rc` clone observes the result once the container releases its borrow.
#[derive(Debug, Clone)]
pub enum Source {
    File(PathBuf),
    Memory(Rc<RefCell<Vec<u8>>>),
}

/// One cover JPEG and its decode state.
pub struct Container {
    source: Source,
    /// Whether `source` points at real bytes. A container produced by
    /// `from_fingerprint` starts unbound; `fill_by_hash` binds it.
    bound: bool,
    active: bool,
    segments: Option<JpegSegments>,
    coefficients: Option<ScanCoefficients>,
    cursor: Option<CoefficientCursor>,
    fingerprint: Option<[u8; 16]>,
}

impl Container {
    /// A container bound to a file path, not yet opened.
    pub fn from_file<P: Into<PathBuf>>(path: P) -> Self {
        Container {
            source: Source::File(path.into()),
            bound: true,
            active: false,
            segments: None,
            coefficients: None,
            cursor: None,
            fingerprint: None,
        }
    }

    /// A container bound to a shared in-memory buffer, not yet opened.
    pub fn from_memory(buffer: Rc<RefCell<Vec<u8>>>) -> Self {
        Container {
            source: Source::Memory(buffer),
            bound: true,
            active: false,
            segments: None,
            coefficients: None,
            cursor: None,
            fingerprint: None,
        }
    }

    /// A container carrying only a known fingerprint, as produced by
    /// [`crate::archive::Archive::import_order`]. Not yet bound to a source.
    pub fn from_fingerprint(fingerprint: [u8; 16]) -> Self {
        Container {
            // Placeholder; replaced once `bind` attaches a real source.
            source: Source::File(PathBuf::new()),
            bound: false,
            active: false,
            segments: None,
            coefficients: None,
            cursor: None,
            fingerprint: Some(fingerprint),
        }
    }

    /// Bind a source to a fingerprint-only container (from `fill_by_hash`).
    pub(crate) fn bind(&mut self, source: Source) {
        self.source = source;
        self.bound = true;
    }

    pub fn is_bound(&self) -> bool {
        self.bound
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn fingerprint(&self) -> Option<[u8; 16]> {
        self.fingerprint
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    /// First-component coefficients, while active.
    pub fn coefficients(&self) -> Option<&ScanCoefficients> {
        self.coefficients.as_ref()
    }

    pub fn coefficients_mut(&mut self) -> Option<&mut ScanCoefficients> {
        self.coefficients.as_mut()
    }

    pub fn cursor(&self) -> Option<&CoefficientCursor> {
        self.cursor.as_ref()
    }

    pub fn cursor_mut(&mut self) -> Option<&mut CoefficientCursor> {
        self.cursor.as_mut()
    }

    fn read_source_bytes(&self) -> Result<Vec<u8>> {
        match &self.source {
            Source::File(path) => Ok(fs::read(path)?),
            Source::Memory(buffer) => Ok(buffer.borrow().clone()),
        }
    }

    /// Attach the JPEG decoder, decode the first component's coefficients,
    /// and initialize the cursor at `(0,0,0,0)`. A no-op if already active.
    pub fn open(&mut self) -> Result<()> {
        if self.active {
            return Ok(());
        }

        let bytes = self.read_source_bytes()?;
        let segments = parse_jpeg(&bytes)?;
        let coefficients = decode_scan(&segments)?;

        let frame = segments.frame.as_ref().ok_or_else(|| ArchiveError::JpegCodec {
            reason: "JPEG has no frame header".to_string(),
        })?;
        let cursor = CoefficientCursor::new(frame.width_in_blocks(), frame.height_in_blocks());

        log::trace!("container open: {} coefficients", coefficients.total_blocks * 64);

        self.segments = Some(segments);
        self.coefficients = Some(coefficients);
        self.cursor = Some(cursor);
        self.active = true;

        Ok(())
    }

    /// Finish decoding without writing. No mutation is persisted.
    pub fn close_discard(&mut self) -> Result<()> {
        self.segments = None;
        self.coefficients = None;
        self.cursor = None;
        self.active = false;

        log::trace!("container close-discard");

        Ok(())
    }

    /// Recompress the (possibly mutated) coefficients to the same sink, then
    /// re-fingerprint the finalized bytes.
    pub fn close_keep(&mut self) -> Result<()> {
        if !self.active {
            return Err(ArchiveError::NotInitialized);
        }

        let segments = self.segments.take().expect("active container has segments");
        let coefficients = self.coefficients.take().expect("active container has coefficients");

        let new_scan_data = encode_scan(&coefficients, &segments)?;
        let bytes = write_jpeg(&segments, &new_scan_data);

        match &self.source {
            Source::File(path) => {
                log::debug!("container close-keep: rewriting {}", path.display());
                fs::write(path, &bytes)?;
            }
            Source::Memory(buffer) => {
                *buffer.borrow_mut() = bytes.clone();
            }
        }

        self.fingerprint = Some(md5::compute(&bytes).0);
        self.cursor = None;
        self.active = false;

        log::trace!("container close-keep: fingerprint {}", hex_fingerprint(&self.fingerprint.unwrap()));

        Ok(())
    }
}

fn hex_fingerprint(fp: &[u8; 16]) -> String {
    fp.iter().map(|b| format!("{:02x}", b)).collect()
}
