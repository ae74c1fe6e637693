//! Helpers shared by the integration tests.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::Path;
use walkdir::WalkDir;

use dirpack::archive::{RecordKind, MAGIC};

/// Relative path -> `Some(content)` for files, `None` for directories.
pub type Snapshot = BTreeMap<String, Option<Vec<u8>>>;

pub fn snapshot(root: &Path) -> Snapshot {
    let mut out = Snapshot::new();
    for ent in WalkDir::new(root) {
        let ent = ent.unwrap();
        let rel = ent
            .path()
            .strip_prefix(root)
            .unwrap()
            .to_string_lossy()
            .into_owned();
        if ent.file_type().is_dir() {
            out.insert(rel, None);
        } else {
            out.insert(rel, Some(std::fs::read(ent.path()).unwrap()));
        }
    }
    out
}

/// Build a small tree with nested, empty and binary entries.
pub fn sample_tree(root: &Path) {
    std::fs::create_dir_all(root.join("sub/deeper")).unwrap();
    std::fs::create_dir_all(root.join("empty")).unwrap();
    std::fs::write(root.join("a.txt"), b"hello archive\n").unwrap();
    std::fs::write(root.join("sub/b.bin"), [0u8, 1, 2, 0, 255, 0]).unwrap();
    std::fs::write(root.join("sub/deeper/c"), vec![b'z'; 100_000]).unwrap();
    std::fs::write(root.join("sub/zero"), b"").unwrap();
}

pub fn utf8(p: &Path) -> &str {
    p.to_str().expect("temp paths are utf-8")
}

/// Hand-assembled archive bytes.
pub struct RawArchive(pub Vec<u8>);

impl RawArchive {
    pub fn new(root_len: u64) -> Self {
        let mut v = MAGIC.to_vec();
        v.extend_from_slice(&root_len.to_ne_bytes());
        Self(v)
    }

    pub fn dir(mut self, path: &[u8]) -> Self {
        self.head(RecordKind::Directory, path);
        self
    }

    pub fn file(mut self, path: &[u8], content: &[u8]) -> Self {
        self.head(RecordKind::File, path);
        self.0.extend_from_slice(&(content.len() as u64).to_ne_bytes());
        self.0.extend_from_slice(content);
        self
    }

    fn head(&mut self, kind: RecordKind, path: &[u8]) {
        self.0.push(kind as u8);
        self.0.extend_from_slice(&(path.len() as u64).to_ne_bytes());
        self.0.extend_from_slice(path);
    }

    pub fn write_to(&self, p: &Path) {
        std::fs::write(p, &self.0).unwrap();
    }
}
