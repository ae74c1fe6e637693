#![forbid(unsafe_code)]

use std::path::Path;
use tracing::info;

use crate::archive::error::{PackError, Result, UnpackError, UnpackResult};
use crate::archive::format::{EntryInfo, RecordKind};
use crate::archive::io::hex32;
use crate::archive::pack::archive_overlaps_source;
use crate::archive::path::{display_bytes, path_exists};
use crate::archive::read::ArchiveReader;
use crate::prompt::OverwritePrompt;

/// Read every record header (without restoring anything). Content is hashed only when
/// `with_hashes` is set.
pub fn entries(archive: &Path, with_hashes: bool) -> UnpackResult<Vec<EntryInfo>> {
    let mut reader = ArchiveReader::open(archive)?;
    let mut out = Vec::new();

    while let Some(rec) = reader.next_record()? {
        let content_hash_hex = match rec.kind {
            RecordKind::File if with_hashes => Some(hex32(&reader.hash_content()?)),
            _ => None,
        };
        out.push(EntryInfo {
            path: display_bytes(&rec.path),
            raw_path: rec.path,
            kind: rec.kind,
            content_len: rec.content_len,
            content_hash_hex,
        });
    }
    Ok(out)
}

pub fn list(archive: &Path, verbose: bool) -> UnpackResult<()> {
    for e in entries(archive, verbose)? {
        if verbose {
            println!(
                "{:<4} {:>12} {}  {}",
                e.kind.as_str(),
                e.content_len,
                e.content_hash_hex.as_deref().unwrap_or("-"),
                e.path
            );
        } else {
            println!("{}", e.path);
        }
    }
    Ok(())
}

/// Totals gathered by [`verify`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VerifyReport {
    pub directories: u64,
    pub files: u64,
    pub content_bytes: u64,
}

impl VerifyReport {
    pub fn entries(&self) -> u64 {
        self.directories + self.files
    }
}

/// Walk the whole archive without writing anything: magic, complete records, known kinds,
/// and a shared root prefix of `root_name_length` bytes on every path.
pub fn verify(archive: &Path) -> UnpackResult<VerifyReport> {
    let mut reader = ArchiveReader::open(archive)?;
    let root_len = reader.header().root_name_length;
    let root_len = usize::try_from(root_len)
        .map_err(|_| UnpackError::InvalidPath(format!("root name length {root_len} is out of range")))?;

    let mut report = VerifyReport::default();
    let mut root: Option<Vec<u8>> = None;

    while let Some(rec) = reader.next_record()? {
        let prefix = rec.path.get(..root_len).ok_or_else(|| {
            UnpackError::InvalidPath(format!(
                "{} does not start with a {root_len}-byte root",
                display_bytes(&rec.path)
            ))
        })?;
        let r = root.get_or_insert_with(|| prefix.to_vec());
        if r.as_slice() != prefix {
            return Err(UnpackError::InvalidPath(format!(
                "{} is not under root {}",
                display_bytes(&rec.path),
                display_bytes(r)
            )));
        }

        match rec.kind {
            RecordKind::Directory => report.directories += 1,
            RecordKind::File => {
                report.files += 1;
                report.content_bytes += rec.content_len;
                reader.skip_content()?;
            }
        }
    }

    if root.is_none() {
        return Err(UnpackError::InvalidPath("archive has no records".into()));
    }
    Ok(report)
}

/// Clear the way for `pack(source, archive)`.
///
/// Refuses before prompting when `archive` is the source itself or a directory holding it,
/// since clearing it would delete what is about to be packed.
pub fn prepare_pack_destination(
    source: &Path,
    archive: &Path,
    prompt: &mut dyn OverwritePrompt,
) -> Result<bool> {
    if archive_overlaps_source(source, archive) {
        return Err(PackError::ArchiveOverlapsSource(archive.to_path_buf()).into());
    }
    clear_destination(archive, prompt)
}

/// Clear the way for unpacking `archive` into `dest`.
///
/// Refuses before prompting when `dest` is the archive or a directory holding it.
pub fn prepare_unpack_destination(
    archive: &Path,
    dest: &Path,
    prompt: &mut dyn OverwritePrompt,
) -> Result<bool> {
    if archive_overlaps_source(archive, dest) {
        return Err(UnpackError::DestinationHoldsArchive(dest.to_path_buf()).into());
    }
    clear_destination(dest, prompt)
}

/// Make room at `dest` for a pack or unpack.
///
/// Returns `true` when `dest` is free (or was freed after the prompt agreed), `false` when
/// the prompt declined and `dest` was left untouched.
pub fn clear_destination(dest: &Path, prompt: &mut dyn OverwritePrompt) -> Result<bool> {
    if !path_exists(dest) {
        return Ok(true);
    }
    if !prompt.confirm_overwrite(dest)? {
        info!("keeping existing {}", dest.display());
        return Ok(false);
    }

    if dest.symlink_metadata()?.is_dir() {
        std::fs::remove_dir_all(dest)?;
    } else {
        std::fs::remove_file(dest)?;
    }
    info!("removed existing {}", dest.display());
    Ok(true)
}
