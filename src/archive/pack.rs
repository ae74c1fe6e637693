#![forbid(unsafe_code)]

use std::fs::File;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::archive::error::{PackError, PackResult};
use crate::archive::format::{Progress, RecordKind, MAGIC};
use crate::archive::io::{copy_exact, write_u64, write_u8, CopyError, COPY_BUF_LEN};
use crate::archive::path::{
    bytes_to_path, display_bytes, join_stored, normalize_slash_bytes, os_bytes,
};

/// Archive layout:
/// - [MAGIC 24]
/// - [u64 root_name_length]
/// - records, pre-order, until EOF:
///   - [u8 kind] (0 = file, 1 = directory)
///   - [u64 path_len][raw path bytes, no terminator]
///   - file only: [u64 content_len][content bytes]
///
/// Tree structure lives only in the path strings. Entries appear in the order the
/// filesystem enumerates them; nothing is sorted.
pub fn pack(source: &Path, archive: &Path) -> PackResult<()> {
    pack_with_progress(source, archive, &mut |_: &Progress<'_>| {})
}

/// Like [`pack`], calling `on_progress` after each record is written.
pub fn pack_with_progress(
    source: &Path,
    archive: &Path,
    on_progress: &mut dyn FnMut(&Progress<'_>),
) -> PackResult<()> {
    let root = os_bytes(source.as_os_str())
        .map(normalize_slash_bytes)
        .ok_or_else(|| PackError::NonUtf8Path(source.to_path_buf()))?;

    let meta = std::fs::metadata(source).map_err(|e| PackError::OpenFailed {
        path: source.to_path_buf(),
        source: e,
    })?;
    if !meta.is_dir() && !meta.is_file() {
        return Err(PackError::OpenFailed {
            path: source.to_path_buf(),
            source: std::io::Error::new(
                ErrorKind::InvalidInput,
                "not a directory or regular file",
            ),
        });
    }
    if archive_overlaps_source(source, archive) {
        return Err(PackError::ArchiveOverlapsSource(archive.to_path_buf()));
    }

    let file = File::create(archive).map_err(|e| PackError::CreateFailed {
        path: archive.to_path_buf(),
        source: e,
    })?;
    let archive_abs = std::fs::canonicalize(archive).ok();
    let mut w = ArchiveWriter::new(BufWriter::new(file), archive);

    info!("packing {} into {}", display_bytes(&root), archive.display());
    w.header(root.len() as u64)?;

    if meta.is_file() {
        // A bare file degrades to a one-record archive.
        w.file(&root, source, on_progress)?;
        return w.finish();
    }

    for ent in WalkDir::new(source).follow_links(false) {
        let ent = ent.map_err(|e| {
            let path = e
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| source.to_path_buf());
            let msg = e.to_string();
            let io = e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::new(ErrorKind::Other, msg));
            PackError::OpenFailed { path, source: io }
        })?;

        let stored = join_stored(&root, source, ent.path())?;
        let ft = ent.file_type();

        if ft.is_dir() {
            w.directory(&stored)?;
            on_progress(&Progress {
                path: &shown_path(&stored, ent.path()),
                kind: RecordKind::Directory,
                bytes: 0,
            });
            continue;
        }

        if !ft.is_file() {
            warn!("skipping {}: not a regular file or directory", ent.path().display());
            continue;
        }

        if archive_abs.is_some() && std::fs::canonicalize(ent.path()).ok() == archive_abs {
            debug!("skipping {}: it is the archive being written", ent.path().display());
            continue;
        }

        w.file(&stored, ent.path(), on_progress)?;
    }

    w.finish()
}

/// True when writing `archive` would clobber `source`: the same file, or a directory that
/// holds the source tree. A not-yet-existing archive never overlaps.
pub fn archive_overlaps_source(source: &Path, archive: &Path) -> bool {
    match (std::fs::canonicalize(source), std::fs::canonicalize(archive)) {
        (Ok(src), Ok(arc)) => src.starts_with(arc),
        _ => false,
    }
}

/// Path reported to progress callbacks: the stored path when this platform can name it.
fn shown_path(stored: &[u8], physical: &Path) -> PathBuf {
    bytes_to_path(stored).unwrap_or_else(|| physical.to_path_buf())
}

struct ArchiveWriter<'p, W: Write> {
    out: W,
    path: &'p Path,
    buf: Vec<u8>,
}

impl<'p, W: Write> ArchiveWriter<'p, W> {
    fn new(out: W, path: &'p Path) -> Self {
        Self {
            out,
            path,
            buf: vec![0u8; COPY_BUF_LEN],
        }
    }

    fn write_err(&self, e: std::io::Error) -> PackError {
        PackError::WriteFailed {
            path: self.path.to_path_buf(),
            source: e,
        }
    }

    fn header(&mut self, root_name_length: u64) -> PackResult<()> {
        self.out.write_all(&MAGIC).map_err(|e| self.write_err(e))?;
        write_u64(&mut self.out, root_name_length).map_err(|e| self.write_err(e))
    }

    fn record_head(&mut self, kind: RecordKind, stored: &[u8]) -> PackResult<()> {
        let res = write_u8(&mut self.out, kind as u8)
            .and_then(|_| write_u64(&mut self.out, stored.len() as u64))
            .and_then(|_| self.out.write_all(stored));
        res.map_err(|e| self.write_err(e))
    }

    fn directory(&mut self, stored: &[u8]) -> PackResult<()> {
        self.record_head(RecordKind::Directory, stored)?;
        debug!("packed dir {}", display_bytes(stored));
        Ok(())
    }

    fn file(
        &mut self,
        stored: &[u8],
        physical: &Path,
        on_progress: &mut dyn FnMut(&Progress<'_>),
    ) -> PackResult<()> {
        let read_err = |e: std::io::Error| PackError::ReadFailed {
            path: physical.to_path_buf(),
            source: e,
        };

        let mut src = File::open(physical).map_err(read_err)?;
        let len = src.metadata().map_err(read_err)?.len();

        self.record_head(RecordKind::File, stored)?;
        write_u64(&mut self.out, len).map_err(|e| self.write_err(e))?;

        match copy_exact(&mut src, &mut self.out, len, &mut self.buf) {
            Ok(()) => {}
            Err(CopyError::Read(e)) => return Err(read_err(e)),
            Err(CopyError::Write(e)) => return Err(self.write_err(e)),
            Err(CopyError::Short { copied }) => {
                return Err(read_err(std::io::Error::new(
                    ErrorKind::UnexpectedEof,
                    format!("file shrank to {copied} of {len} bytes while packing"),
                )))
            }
        }

        info!("packed {} ({} bytes)", display_bytes(stored), len);
        on_progress(&Progress {
            path: &shown_path(stored, physical),
            kind: RecordKind::File,
            bytes: len,
        });
        Ok(())
    }

    fn finish(mut self) -> PackResult<()> {
        self.out.flush().map_err(|e| self.write_err(e))
    }
}
