#![forbid(unsafe_code)]

use std::fs::OpenOptions;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::archive::error::{UnpackError, UnpackResult};
use crate::archive::format::{Progress, RecordKind};
use crate::archive::path::{
    bytes_to_path, display_bytes, is_contained, os_bytes, path_exists, rewrite_root,
};
use crate::archive::read::ArchiveReader;

/// Restore the tree in `archive`, optionally renaming its root to `output_root`.
///
/// Records are materialized in archive order. A failure leaves every entry created so far
/// on disk; nothing is rolled back.
pub fn unpack(archive: &Path, output_root: Option<&Path>) -> UnpackResult<()> {
    let mut unpacker = Unpacker::new(archive);
    if let Some(root) = output_root {
        unpacker = unpacker.output_root(root);
    }
    unpacker.run()
}

/// Configurable form of [`unpack`].
pub struct Unpacker<'a> {
    archive: PathBuf,
    output_root: Option<PathBuf>,
    reject_unsafe: bool,
    on_progress: Option<&'a mut dyn FnMut(&Progress<'_>)>,
}

impl<'a> Unpacker<'a> {
    pub fn new(archive: &Path) -> Self {
        Self {
            archive: archive.to_path_buf(),
            output_root: None,
            reject_unsafe: false,
            on_progress: None,
        }
    }

    /// Replace the stored root with `root`. An empty path keeps the stored root.
    pub fn output_root(mut self, root: &Path) -> Self {
        self.output_root = Some(root.to_path_buf());
        self
    }

    /// Reject records that would land outside the restored root (`..` segments, foreign
    /// prefixes). Off by default: historical archives are trusted as written.
    pub fn reject_unsafe_paths(mut self, on: bool) -> Self {
        self.reject_unsafe = on;
        self
    }

    pub fn on_progress(mut self, f: &'a mut dyn FnMut(&Progress<'_>)) -> Self {
        self.on_progress = Some(f);
        self
    }

    pub fn run(self) -> UnpackResult<()> {
        let output_root = match &self.output_root {
            Some(p) => Some(os_bytes(p.as_os_str()).ok_or_else(|| {
                UnpackError::InvalidPath(format!("output root is not utf-8: {}", p.display()))
            })?),
            None => None,
        };
        let mut on_progress = self.on_progress;

        // Magic is checked here, before anything touches the filesystem.
        let mut reader = ArchiveReader::open(&self.archive)?;
        let root_len = reader.header().root_name_length;
        let root_len = usize::try_from(root_len).map_err(|_| {
            UnpackError::InvalidPath(format!("root name length {root_len} is out of range"))
        })?;

        info!("unpacking {}", self.archive.display());

        let mut root_prefix: Option<Vec<u8>> = None;
        while let Some(rec) = reader.next_record()? {
            let shown = display_bytes(&rec.path);
            let effective = rewrite_root(&rec.path, root_len, output_root).ok_or_else(|| {
                UnpackError::InvalidPath(format!("{shown} does not start with a {root_len}-byte root"))
            })?;

            if self.reject_unsafe {
                let prefix = root_prefix
                    .get_or_insert_with(|| rec.path.get(..root_len).unwrap_or_default().to_vec());
                if !is_contained(&rec.path, prefix) {
                    return Err(UnpackError::UnsafePath(shown));
                }
            }

            let dest = bytes_to_path(&effective).ok_or_else(|| {
                UnpackError::InvalidPath(format!(
                    "{} cannot be named on this platform",
                    display_bytes(&effective)
                ))
            })?;
            if path_exists(&dest) {
                return Err(UnpackError::PathExists(dest));
            }

            match rec.kind {
                RecordKind::Directory => {
                    std::fs::create_dir(&dest).map_err(|e| create_failed(&dest, e))?;
                    info!("unpacked dir {}", dest.display());
                }
                RecordKind::File => {
                    let f = OpenOptions::new()
                        .write(true)
                        .create_new(true)
                        .open(&dest)
                        .map_err(|e| create_failed(&dest, e))?;
                    let mut w = BufWriter::new(f);
                    reader.copy_content(&mut w, &dest)?;
                    w.flush().map_err(|e| UnpackError::WriteFailed {
                        path: dest.clone(),
                        source: e,
                    })?;
                    info!("unpacked {} ({} bytes)", dest.display(), rec.content_len);
                }
            }

            if let Some(cb) = on_progress.as_mut() {
                cb(&Progress {
                    path: &dest,
                    kind: rec.kind,
                    bytes: rec.content_len,
                });
            }
        }

        Ok(())
    }
}

fn create_failed(dest: &Path, e: std::io::Error) -> UnpackError {
    if e.kind() == ErrorKind::AlreadyExists {
        return UnpackError::PathExists(dest.to_path_buf());
    }
    UnpackError::CreateFailed {
        path: dest.to_path_buf(),
        source: e,
    }
}
