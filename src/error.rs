//! Error types shared across the crate.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Errors produced while building, filling, packing, or unpacking an archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JPEG codec error: {reason}")]
    JpegCodec { reason: String },

    #[error("archive has not been initialized")]
    NotInitialized,

    #[error("archive is not fully filled: {filled} of {size} slots")]
    NotComplete { filled: usize, size: usize },

    #[error("invalid arguments: {reason}")]
    WrongArgs { reason: String },

    #[error("payload does not fit: needs {required} bits, cover set holds {available}")]
    CapacityExceeded { required: usize, available: usize },

    #[error("embedding failed: {reason} (wrote {bytes_written} bytes before failure)")]
    EmbeddingFailed { reason: String, bytes_written: usize },
}

/// Outcome of matching a container's fingerprint against the manifest.
/// A non-match is not an error: the caller keeps trying candidates until
/// the manifest is filled or the candidates run out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillOutcome {
    /// All manifest slots are now filled.
    Complete,
    /// This candidate filled a slot, but the manifest has more to fill.
    Filled,
    /// This candidate's fingerprint does not match any open slot.
    NotFound,
}

/// Process exit codes, matching the original codec's status vocabulary so
/// scripts depending on specific integers keep working.
pub mod exit_code {
    pub const OK: i32 = 0;
    pub const OK_COMPLETE: i32 = 1;
    pub const NOT_FOUND: i32 = 2;
    pub const MALLOC_ERR: i32 = -1;
    pub const FILEIO_ERR: i32 = -2;
    pub const NOT_INITIALIZED: i32 = -3;
    pub const NOT_COMPLETE: i32 = -5;
    pub const FAILURE: i32 = -6;
    pub const IO_ERR: i32 = -7;
    pub const WRONG_ARGS: i32 = -8;
}

impl ArchiveError {
    /// Map an error to the exit code a CLI should return for it.
    pub fn exit_code(&self) -> i32 {
        match self {
            ArchiveError::Io(_) => exit_code::IO_ERR,
            ArchiveError::JpegCodec { .. } => exit_code::FAILURE,
            ArchiveError::NotInitialized => exit_code::NOT_INITIALIZED,
            ArchiveError::NotComplete { .. } => exit_code::NOT_COMPLETE,
            ArchiveError::WrongArgs { .. } => exit_code::WRONG_ARGS,
            ArchiveError::CapacityExceeded { .. } => exit_code::FAILURE,
            ArchiveError::EmbeddingFailed { .. } => exit_code::FAILURE,
        }
    }
}
