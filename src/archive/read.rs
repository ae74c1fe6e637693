#![forbid(unsafe_code)]

use blake3::Hasher;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};

use crate::archive::error::{UnpackError, UnpackResult};
use crate::archive::format::{Header, RecordKind, HEADER_LEN, MAGIC};
use crate::archive::io::{
    copy_exact, read_full, u64_from_bytes, CopyError, CountingReader, COPY_BUF_LEN,
};
use crate::archive::path::{bytes_to_path, display_bytes};

/// One record as read from the stream, minus its content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordHeader {
    pub kind: RecordKind,
    /// Stored path bytes, root prefix included.
    pub path: Vec<u8>,
    /// Zero for directories.
    pub content_len: u64,
}

/// Sequential, single-pass reader over an archive's records.
///
/// Content of a file record must be consumed with one of the `*_content` methods before the
/// next call to [`next_record`](Self::next_record); unconsumed content is skipped.
pub struct ArchiveReader<R> {
    r: CountingReader<R>,
    header: Header,
    pending: u64,
    buf: Vec<u8>,
}

impl ArchiveReader<BufReader<File>> {
    pub fn open(path: &Path) -> UnpackResult<Self> {
        let f = File::open(path).map_err(|e| UnpackError::OpenFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::new(BufReader::new(f))
    }
}

impl<R: Read> ArchiveReader<R> {
    /// Validate the magic and read the header.
    pub fn new(inner: R) -> UnpackResult<Self> {
        let mut r = CountingReader::new(inner);

        let mut head = [0u8; HEADER_LEN as usize];
        let n = read_full(&mut r, &mut head).map_err(read_failed)?;
        if n < MAGIC.len() || head[..MAGIC.len()] != MAGIC {
            return Err(UnpackError::NotAnArchive);
        }
        if n < head.len() {
            return Err(UnpackError::Truncated {
                offset: n as u64,
                field: "root name length",
            });
        }

        let mut len = [0u8; 8];
        len.copy_from_slice(&head[MAGIC.len()..]);
        Ok(Self {
            r,
            header: Header {
                root_name_length: u64_from_bytes(len),
            },
            pending: 0,
            buf: vec![0u8; COPY_BUF_LEN],
        })
    }

    pub fn header(&self) -> Header {
        self.header
    }

    /// Byte offset of the next unread byte.
    pub fn offset(&self) -> u64 {
        self.r.pos()
    }

    /// Read the next record header. `Ok(None)` only on a clean end of stream at a record boundary.
    pub fn next_record(&mut self) -> UnpackResult<Option<RecordHeader>> {
        if self.pending > 0 {
            self.skip_content()?;
        }

        let offset = self.r.pos();
        let mut tag = [0u8; 1];
        if read_full(&mut self.r, &mut tag).map_err(read_failed)? == 0 {
            return Ok(None);
        }
        let kind = RecordKind::from_byte(tag[0]).ok_or(UnpackError::UnknownKind {
            offset,
            kind: tag[0],
        })?;

        let path_len = self.u64_field("path length")?;
        let path = self.path_field(path_len)?;
        let content_len = match kind {
            RecordKind::File => self.u64_field("content length")?,
            RecordKind::Directory => 0,
        };
        self.pending = content_len;

        Ok(Some(RecordHeader {
            kind,
            path,
            content_len,
        }))
    }

    /// Stream the current record's content into `w`; `dest` names `w` in errors.
    pub fn copy_content(&mut self, w: &mut dyn Write, dest: &Path) -> UnpackResult<()> {
        self.drain(w).map_err(|e| match e {
            Drain::Write(e) => UnpackError::WriteFailed {
                path: dest.to_path_buf(),
                source: e,
            },
            Drain::Other(e) => e,
        })
    }

    pub fn skip_content(&mut self) -> UnpackResult<()> {
        self.drain(&mut std::io::sink()).map_err(Drain::into_error)
    }

    /// Consume the current record's content, returning its blake3 hash.
    pub fn hash_content(&mut self) -> UnpackResult<[u8; 32]> {
        let mut hasher = Hasher::new();
        self.drain(&mut hasher).map_err(Drain::into_error)?;
        Ok(hasher.finalize().into())
    }

    fn drain(&mut self, w: &mut dyn Write) -> Result<(), Drain> {
        let len = std::mem::take(&mut self.pending);
        match copy_exact(&mut self.r, w, len, &mut self.buf) {
            Ok(()) => Ok(()),
            Err(CopyError::Read(e)) => Err(Drain::Other(read_failed(e))),
            Err(CopyError::Write(e)) => Err(Drain::Write(e)),
            Err(CopyError::Short { .. }) => Err(Drain::Other(UnpackError::Truncated {
                offset: self.r.pos(),
                field: "content",
            })),
        }
    }

    fn u64_field(&mut self, field: &'static str) -> UnpackResult<u64> {
        let mut b = [0u8; 8];
        if read_full(&mut self.r, &mut b).map_err(read_failed)? < b.len() {
            return Err(UnpackError::Truncated {
                offset: self.r.pos(),
                field,
            });
        }
        Ok(u64_from_bytes(b))
    }

    fn path_field(&mut self, len: u64) -> UnpackResult<Vec<u8>> {
        let n = usize::try_from(len).map_err(|_| UnpackError::AllocationFailed { len })?;

        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(n)
            .map_err(|_| UnpackError::AllocationFailed { len })?;

        let got = (&mut self.r)
            .take(len)
            .read_to_end(&mut bytes)
            .map_err(read_failed)?;
        if got < n {
            return Err(UnpackError::Truncated {
                offset: self.r.pos(),
                field: "path",
            });
        }
        Ok(bytes)
    }
}

enum Drain {
    Write(std::io::Error),
    Other(UnpackError),
}

impl Drain {
    fn into_error(self) -> UnpackError {
        match self {
            Drain::Write(e) => UnpackError::ReadFailed { source: e },
            Drain::Other(e) => e,
        }
    }
}

fn read_failed(e: std::io::Error) -> UnpackError {
    UnpackError::ReadFailed { source: e }
}

/// The stored root path (first record), read without touching anything else.
pub fn root_path(archive: &Path) -> UnpackResult<PathBuf> {
    let mut reader = ArchiveReader::open(archive)?;
    let rec = reader
        .next_record()?
        .ok_or_else(|| UnpackError::InvalidPath("archive has no records".into()))?;
    bytes_to_path(&rec.path).ok_or_else(|| {
        UnpackError::InvalidPath(format!(
            "{} cannot be named on this platform",
            display_bytes(&rec.path)
        ))
    })
}
