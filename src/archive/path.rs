#![forbid(unsafe_code)]

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::archive::error::{PackError, PackResult};

/// Raw bytes of an OS string as stored in an archive.
///
/// On unix every name is representable. Elsewhere only UTF-8 names are.
#[cfg(unix)]
pub fn os_bytes(s: &OsStr) -> Option<&[u8]> {
    use std::os::unix::ffi::OsStrExt;
    Some(s.as_bytes())
}

#[cfg(not(unix))]
pub fn os_bytes(s: &OsStr) -> Option<&[u8]> {
    s.to_str().map(str::as_bytes)
}

/// Filesystem path for stored bytes, or `None` if this platform can't name it.
#[cfg(unix)]
pub fn bytes_to_path(b: &[u8]) -> Option<PathBuf> {
    use std::os::unix::ffi::OsStrExt;
    Some(PathBuf::from(OsStr::from_bytes(b)))
}

#[cfg(not(unix))]
pub fn bytes_to_path(b: &[u8]) -> Option<PathBuf> {
    std::str::from_utf8(b).ok().map(PathBuf::from)
}

/// Lossy rendering of stored bytes for logs and messages.
pub fn display_bytes(b: &[u8]) -> String {
    String::from_utf8_lossy(b).into_owned()
}

/// Collapse every run of `/` into a single `/`. Idempotent.
pub fn normalize_slashes(p: &str) -> String {
    let mut out = String::with_capacity(p.len());
    let mut prev_slash = false;
    for c in p.chars() {
        if c == '/' {
            if prev_slash {
                continue;
            }
            prev_slash = true;
        } else {
            prev_slash = false;
        }
        out.push(c);
    }
    out
}

/// [`normalize_slashes`] over raw path bytes.
pub fn normalize_slash_bytes(p: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(p.len());
    for &b in p {
        if b == b'/' && out.last() == Some(&b'/') {
            continue;
        }
        out.push(b);
    }
    out
}

/// Path bytes stored for `entry`, found while walking `root_path` (stored as `root`).
pub fn join_stored(root: &[u8], root_path: &Path, entry: &Path) -> PackResult<Vec<u8>> {
    let rel = entry
        .strip_prefix(root_path)
        .map_err(|_| PackError::OpenFailed {
            path: entry.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "outside the source tree"),
        })?;

    let mut out = root.to_vec();
    for comp in rel.components() {
        let name = os_bytes(comp.as_os_str())
            .ok_or_else(|| PackError::NonUtf8Path(entry.to_path_buf()))?;
        out.push(b'/');
        out.extend_from_slice(name);
    }
    Ok(normalize_slash_bytes(&out))
}

/// Replace the first `root_len` bytes of `stored` with `output_root`.
///
/// With no (or an empty) output root the stored path is used as is. A stored path that is
/// exactly the root prefix maps onto the output root itself. Returns `None` when `stored` is
/// shorter than `root_len`.
pub fn rewrite_root(stored: &[u8], root_len: usize, output_root: Option<&[u8]>) -> Option<Vec<u8>> {
    let output_root = match output_root {
        Some(r) if !r.is_empty() => r,
        _ => return Some(normalize_slash_bytes(stored)),
    };

    let rest = stored.get(root_len..)?;
    if rest.is_empty() {
        let mut root = normalize_slash_bytes(output_root);
        while root.len() > 1 && root.ends_with(b"/") {
            root.pop();
        }
        return Some(root);
    }

    let mut joined = Vec::with_capacity(output_root.len() + 1 + rest.len());
    joined.extend_from_slice(output_root);
    joined.push(b'/');
    joined.extend_from_slice(rest);
    Some(normalize_slash_bytes(&joined))
}

/// True when anything, including a dangling symlink, sits at `p`.
pub fn path_exists(p: &Path) -> bool {
    p.symlink_metadata().is_ok()
}

/// Traversal check for untrusted archives.
///
/// `root_prefix` is the stored root (the first record's path). A contained record starts with
/// that exact prefix, continues at a separator boundary, and never steps up with `..`.
pub fn is_contained(stored: &[u8], root_prefix: &[u8]) -> bool {
    let has_parent = |p: &[u8]| p.split(|&b| b == b'/').any(|c| c == b"..");

    if root_prefix.is_empty() || has_parent(root_prefix) {
        return false;
    }
    let rest = match stored.strip_prefix(root_prefix) {
        Some(r) => r,
        None => return false,
    };
    if !rest.is_empty() && !rest.starts_with(b"/") && !root_prefix.ends_with(b"/") {
        return false;
    }
    !has_parent(rest)
}
