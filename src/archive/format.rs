#![forbid(unsafe_code)]

use std::path::Path;

/// Archive header magic: 23 ASCII bytes plus a NUL.
pub const MAGIC: [u8; 24] = *b"...DENCHIK..ARCHIVER...\0";

/// Magic plus the u64 root name length.
pub const HEADER_LEN: u64 = 24 + 8;

/// Record type tag, the first byte of every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordKind {
    File = 0,
    Directory = 1,
}

impl RecordKind {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(RecordKind::File),
            1 => Some(RecordKind::Directory),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RecordKind::File => "file",
            RecordKind::Directory => "dir",
        }
    }
}

/// Header fields that follow the magic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Byte length of the stored root path.
    pub root_name_length: u64,
}

/// Public view of an archive record (for listing and inspectors).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    /// Stored path, lossily decoded for display.
    pub path: String,
    /// Stored path exactly as written.
    pub raw_path: Vec<u8>,
    pub kind: RecordKind,
    /// Zero for directories.
    pub content_len: u64,
    /// Blake3 hash (hex) of the content, when requested. Always `None` for directories.
    pub content_hash_hex: Option<String>,
}

/// Progress event, emitted once per record packed or unpacked.
#[derive(Debug, Clone, Copy)]
pub struct Progress<'a> {
    pub path: &'a Path,
    pub kind: RecordKind,
    /// Content bytes moved for this record.
    pub bytes: u64,
}
