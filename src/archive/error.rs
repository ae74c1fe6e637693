#![forbid(unsafe_code)]

use std::path::PathBuf;
use thiserror::Error;

/// Failures while building an archive. Every variant aborts the pack.
#[derive(Debug, Error)]
pub enum PackError {
    #[error("couldn't create archive {}: {source}", path.display())]
    CreateFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("couldn't open {}: {source}", path.display())]
    OpenFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("couldn't read {}: {source}", path.display())]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("couldn't write archive {}: {source}", path.display())]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Only on platforms that cannot store raw path bytes.
    #[error("path is not valid utf-8: {}", .0.display())]
    NonUtf8Path(PathBuf),

    #[error("archive {} would overwrite its own source", .0.display())]
    ArchiveOverlapsSource(PathBuf),
}

/// Failures while reading or restoring an archive.
#[derive(Debug, Error)]
pub enum UnpackError {
    #[error("couldn't open {}: {source}", path.display())]
    OpenFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("couldn't read archive: {source}")]
    ReadFailed { source: std::io::Error },

    #[error("not an archive (bad magic header)")]
    NotAnArchive,

    #[error("archive truncated at offset {offset} while reading {field}")]
    Truncated { offset: u64, field: &'static str },

    #[error("{} already exists", .0.display())]
    PathExists(PathBuf),

    #[error("couldn't create {}: {source}", path.display())]
    CreateFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("couldn't write {}: {source}", path.display())]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("couldn't allocate {len} bytes for a record field")]
    AllocationFailed { len: u64 },

    #[error("unknown record kind {kind} at offset {offset}")]
    UnknownKind { offset: u64, kind: u8 },

    #[error("invalid record path: {0}")]
    InvalidPath(String),

    #[error("record path escapes the output root: {0}")]
    UnsafePath(String),

    #[error("destination {} holds the archive being unpacked", .0.display())]
    DestinationHoldsArchive(PathBuf),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Pack(#[from] PackError),

    #[error(transparent)]
    Unpack(#[from] UnpackError),

    #[error("{} does not exist", .0.display())]
    Missing(PathBuf),

    #[error("prompt: {0}")]
    Prompt(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type PackResult<T> = std::result::Result<T, PackError>;
pub type UnpackResult<T> = std::result::Result<T, UnpackError>;
pub type Result<T> = std::result::Result<T, Error>;
