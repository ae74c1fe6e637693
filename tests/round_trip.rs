mod common;

use common::{sample_tree, snapshot, utf8, RawArchive};
use dirpack::archive::{self, PackError, Progress, RecordKind, HEADER_LEN, MAGIC};
use std::path::{Path, PathBuf};

#[test]
fn test_round_trip_under_new_root() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    let dst = tmp.path().join("dst");
    let arc = tmp.path().join("tree.arc");
    sample_tree(&src);

    archive::pack(&src, &arc).unwrap();
    archive::unpack(&arc, Some(&dst)).unwrap();

    assert_eq!(snapshot(&src), snapshot(&dst));
}

#[test]
fn test_round_trip_to_stored_root() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    let moved = tmp.path().join("moved");
    let arc = tmp.path().join("tree.arc");
    sample_tree(&src);

    archive::pack(&src, &arc).unwrap();
    std::fs::rename(&src, &moved).unwrap();

    archive::unpack(&arc, None).unwrap();
    assert_eq!(snapshot(&moved), snapshot(&src));
}

#[test]
fn test_empty_output_root_keeps_stored_root() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    let arc = tmp.path().join("tree.arc");
    std::fs::create_dir(&src).unwrap();
    std::fs::write(src.join("f"), b"x").unwrap();

    archive::pack(&src, &arc).unwrap();
    std::fs::remove_dir_all(&src).unwrap();

    archive::unpack(&arc, Some(Path::new(""))).unwrap();
    assert_eq!(std::fs::read(src.join("f")).unwrap(), b"x");
}

#[test]
fn test_empty_directory_is_one_record() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("empty");
    let dst = tmp.path().join("restored");
    let arc = tmp.path().join("empty.arc");
    std::fs::create_dir(&src).unwrap();

    archive::pack(&src, &arc).unwrap();

    let root = utf8(&src);
    let expected = RawArchive::new(root.len() as u64).dir(root.as_bytes()).0;
    assert_eq!(std::fs::read(&arc).unwrap(), expected);

    archive::unpack(&arc, Some(&dst)).unwrap();
    assert!(dst.is_dir());
    assert_eq!(std::fs::read_dir(&dst).unwrap().count(), 0);
}

#[test]
fn test_byte_layout_of_single_file_tree() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("s");
    let arc = tmp.path().join("s.arc");
    std::fs::create_dir(&src).unwrap();
    std::fs::write(src.join("f.txt"), b"abc").unwrap();

    archive::pack(&src, &arc).unwrap();
    let bytes = std::fs::read(&arc).unwrap();

    let root = utf8(&src);
    let file = format!("{root}/f.txt");
    let expected = RawArchive::new(root.len() as u64)
        .dir(root.as_bytes())
        .file(file.as_bytes(), b"abc")
        .0;
    assert_eq!(bytes, expected);
    assert_eq!(&bytes[..24], &MAGIC);
    // Exact content length, no terminator.
    assert_eq!(bytes.len() as u64, HEADER_LEN + (1 + 8 + root.len() as u64) + (1 + 8 + file.len() as u64 + 8 + 3));
}

#[test]
fn test_root_rewrite_leaves_no_double_slashes() {
    let tmp = tempfile::tempdir().unwrap();
    let base = utf8(tmp.path()).to_string();
    let src = PathBuf::from(format!("{base}/src/"));
    let dst = PathBuf::from(format!("{base}//dst/"));
    let arc = tmp.path().join("t.arc");
    sample_tree(&src);

    archive::pack(&src, &arc).unwrap();

    let mut seen = Vec::new();
    let mut record = |p: &Progress<'_>| seen.push(p.path.to_string_lossy().into_owned());
    archive::Unpacker::new(&arc)
        .output_root(&dst)
        .on_progress(&mut record)
        .run()
        .unwrap();

    assert!(!seen.is_empty());
    for p in &seen {
        assert!(!p.contains("//"), "double slash in {p}");
        assert!(p.starts_with(&format!("{base}/dst")), "{p} not under dst");
        assert!(!p.contains("/src"), "{p} kept the old root");
    }
    assert_eq!(snapshot(&src), snapshot(&tmp.path().join("dst")));
}

#[test]
fn test_stored_root_is_normalized() {
    let tmp = tempfile::tempdir().unwrap();
    let base = utf8(tmp.path()).to_string();
    std::fs::create_dir(tmp.path().join("src")).unwrap();
    std::fs::write(tmp.path().join("src/f"), b"1").unwrap();
    let arc = tmp.path().join("t.arc");

    archive::pack(Path::new(&format!("{base}//src")), &arc).unwrap();

    let reader = archive::ArchiveReader::open(&arc).unwrap();
    assert_eq!(
        reader.header().root_name_length,
        format!("{base}/src").len() as u64
    );
    assert_eq!(
        archive::root_path(&arc).unwrap(),
        PathBuf::from(format!("{base}/src"))
    );
}

#[test]
fn test_file_root_is_single_record_archive() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("notes.txt");
    let arc = tmp.path().join("notes.arc");
    let out = tmp.path().join("restored.txt");
    std::fs::write(&src, b"just one file").unwrap();

    archive::pack(&src, &arc).unwrap();

    let list = archive::entries(&arc, false).unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].kind, RecordKind::File);
    assert_eq!(list[0].path, utf8(&src));

    archive::unpack(&arc, Some(&out)).unwrap();
    assert_eq!(std::fs::read(&out).unwrap(), b"just one file");
}

#[test]
fn test_archive_inside_source_is_skipped() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    sample_tree(&src);
    let arc = src.join("self.arc");

    archive::pack(&src, &arc).unwrap();

    let paths: Vec<String> = archive::entries(&arc, false)
        .unwrap()
        .into_iter()
        .map(|e| e.path)
        .collect();
    assert!(!paths.iter().any(|p| p.ends_with("self.arc")));
    assert!(paths.iter().any(|p| p.ends_with("sub/deeper/c")));
}

#[test]
fn test_pre_order_parents_before_children() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    let arc = tmp.path().join("t.arc");
    sample_tree(&src);

    archive::pack(&src, &arc).unwrap();

    let list = archive::entries(&arc, false).unwrap();
    assert_eq!(list[0].path, utf8(&src));
    assert_eq!(list[0].kind, RecordKind::Directory);
    for (i, e) in list.iter().enumerate() {
        if let Some((parent, _)) = e.path.rsplit_once('/') {
            if parent.len() >= utf8(&src).len() {
                let pos = list.iter().position(|p| p.path == parent).unwrap();
                assert!(pos < i, "{} listed before its parent", e.path);
            }
        }
    }
}

#[test]
fn test_missing_source_is_open_failed() {
    let tmp = tempfile::tempdir().unwrap();
    let err = archive::pack(&tmp.path().join("nope"), &tmp.path().join("a.arc")).unwrap_err();
    assert!(matches!(err, PackError::OpenFailed { .. }), "{err:?}");
    assert!(!tmp.path().join("a.arc").exists());
}

#[test]
fn test_uncreatable_archive_is_create_failed() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    sample_tree(&src);
    let err = archive::pack(&src, &tmp.path().join("no/such/dir/a.arc")).unwrap_err();
    assert!(matches!(err, PackError::CreateFailed { .. }), "{err:?}");
}

#[test]
fn test_file_root_cannot_be_its_own_archive() {
    let tmp = tempfile::tempdir().unwrap();
    let f = tmp.path().join("f");
    std::fs::write(&f, b"keep me").unwrap();
    let err = archive::pack(&f, &f).unwrap_err();
    assert!(matches!(err, PackError::ArchiveOverlapsSource(_)), "{err:?}");
    assert_eq!(std::fs::read(&f).unwrap(), b"keep me");
}

#[test]
fn test_directory_holding_source_is_not_an_archive_target() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    sample_tree(&src);

    let err = archive::pack(&src, tmp.path()).unwrap_err();
    assert!(matches!(err, PackError::ArchiveOverlapsSource(_)), "{err:?}");
    let err = archive::pack(&src, &src).unwrap_err();
    assert!(matches!(err, PackError::ArchiveOverlapsSource(_)), "{err:?}");
    assert!(src.join("sub/deeper/c").exists());
}

#[cfg(unix)]
#[test]
fn test_non_utf8_names_round_trip() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    let dst = tmp.path().join("dst");
    let arc = tmp.path().join("t.arc");
    let latin1 = OsStr::from_bytes(b"caf\xe9.txt");
    let latin1_dir = OsStr::from_bytes(b"r\xe9sum\xe9");

    std::fs::create_dir_all(src.join(latin1_dir)).unwrap();
    std::fs::write(src.join(latin1), b"latin-1 name").unwrap();
    std::fs::write(src.join(latin1_dir).join("inner"), b"nested").unwrap();

    archive::pack(&src, &arc).unwrap();

    let stored: Vec<Vec<u8>> = archive::entries(&arc, false)
        .unwrap()
        .into_iter()
        .map(|e| e.raw_path)
        .collect();
    let mut want = utf8(&src).as_bytes().to_vec();
    want.extend_from_slice(b"/caf\xe9.txt");
    assert!(stored.contains(&want));

    archive::unpack(&arc, Some(&dst)).unwrap();
    assert_eq!(std::fs::read(dst.join(latin1)).unwrap(), b"latin-1 name");
    assert_eq!(
        std::fs::read(dst.join(latin1_dir).join("inner")).unwrap(),
        b"nested"
    );
}

#[cfg(target_os = "linux")]
#[test]
fn test_full_disk_is_write_failed() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    sample_tree(&src);

    let err = archive::pack(&src, Path::new("/dev/full")).unwrap_err();
    match err {
        PackError::WriteFailed { path, .. } => assert_eq!(path, Path::new("/dev/full")),
        other => panic!("unexpected {other:?}"),
    }
}

#[cfg(unix)]
#[test]
fn test_unreadable_file_is_read_failed() {
    use std::os::unix::fs::PermissionsExt;

    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    let locked = src.join("locked");
    sample_tree(&src);
    std::fs::write(&locked, b"secret").unwrap();
    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();

    // Privileged users bypass file modes; there is nothing to observe then.
    if std::fs::File::open(&locked).is_ok() {
        return;
    }

    let err = archive::pack(&src, &tmp.path().join("t.arc")).unwrap_err();
    match err {
        PackError::ReadFailed { path, .. } => assert_eq!(path, locked),
        other => panic!("unexpected {other:?}"),
    }
}

#[cfg(unix)]
#[test]
fn test_symlinks_are_skipped() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    sample_tree(&src);
    std::os::unix::fs::symlink(src.join("a.txt"), src.join("link")).unwrap();
    let arc = tmp.path().join("t.arc");

    archive::pack(&src, &arc).unwrap();

    let list = archive::entries(&arc, false).unwrap();
    assert!(!list.iter().any(|e| e.path.ends_with("/link")));
}
