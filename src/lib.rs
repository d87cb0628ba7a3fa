//! Archival steganography: hide a payload across an ordered set of JPEG
//! covers using matrix-embedded F5.
//!
//! [`jpeg`] is the entropy-coding collaborator (parses JPEGs down to DCT
//! coefficients and back); [`iterator`] walks one container's coefficients;
//! [`container`] owns a single cover's decode/recompress lifecycle;
//! [`matrix`] is the F5 check-matrix arithmetic; [`archive`] ties an ordered
//! cover set, rate selection, and `pack`/`unpack` together; [`header`] is the
//! on-disk framing for `(k, msg_size, manifest)`.

pub mod archive;
pub mod container;
pub mod error;
pub mod header;
pub mod iterator;
pub mod jpeg;
pub mod matrix;

pub use archive::{calc_k, Archive, ArchiveCapacity, ArchiveMeta};
pub use container::{Container, Source};
pub use error::{ArchiveError, FillOutcome, Result};
pub use header::ArchiveHeader;
pub use iterator::CoefficientCursor;
pub use matrix::CheckMatrix;
