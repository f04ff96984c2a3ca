//! One behavioral suite executed against both filesystem backends: the
//! engine relies on them being observably identical, including error kinds.

use slipway::{DirFs, MapFs, WritableFs};
use std::io::{Read, Write};

fn write_file(fs: &dyn WritableFs, path: &str, contents: &[u8]) {
    let mut tmp = fs.create_temp("", "seed").unwrap();
    tmp.write_all(contents).unwrap();
    let tmp_path = tmp.path().to_string();
    tmp.close().unwrap();
    fs.rename(&tmp_path, path).unwrap();
}

fn conformance(fs: &dyn WritableFs) {
    // not-found is a distinguishable error kind
    assert!(fs.stat("missing").unwrap_err().is_not_found());
    assert!(fs.read_file("missing").unwrap_err().is_not_found());
    assert!(fs.open("missing").unwrap_err().is_not_found());

    // mkdir creates exactly one level and reports collisions
    fs.mkdir("a", 0o755).unwrap();
    assert!(fs.mkdir("a", 0o755).unwrap_err().is_already_exists());
    assert!(fs.mkdir("missing/child", 0o755).unwrap_err().is_not_found());
    fs.mkdir("a/b", 0o755).unwrap();
    assert!(fs.stat("a").unwrap().is_dir);

    // the root always exists
    assert!(fs.stat(".").unwrap().is_dir);

    // temp files become real files only on rename
    write_file(fs, "a/one.txt", b"one");
    assert_eq!(fs.read_file("a/one.txt").unwrap(), b"one");
    assert!(!fs.stat("a/one.txt").unwrap().is_dir);

    // open streams the same bytes read_file returns
    let mut buffer = Vec::new();
    fs.open("a/one.txt")
        .unwrap()
        .read_to_end(&mut buffer)
        .unwrap();
    assert_eq!(buffer, b"one");

    // rename replaces existing content as a single step
    write_file(fs, "a/two.txt", b"two");
    fs.rename("a/two.txt", "a/one.txt").unwrap();
    assert_eq!(fs.read_file("a/one.txt").unwrap(), b"two");
    assert!(fs.stat("a/two.txt").unwrap_err().is_not_found());

    // read_dir lists direct children sorted by name
    write_file(fs, "a/zz.txt", b"");
    let entries = fs.read_dir("a").unwrap();
    let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["b", "one.txt", "zz.txt"]);
    assert!(entries[0].is_dir);
    assert!(!entries[1].is_dir);

    // glob wildcards stay within a path segment
    assert_eq!(fs.glob("a/*.txt").unwrap(), vec!["a/one.txt", "a/zz.txt"]);
    assert!(fs.glob("*.txt").unwrap().is_empty());

    // remove takes one entry, remove_all tolerates absence
    assert!(fs.remove("missing").unwrap_err().is_not_found());
    fs.remove("a/zz.txt").unwrap();
    fs.remove_all("missing").unwrap();
    fs.remove_all("a").unwrap();
    assert!(fs.stat("a").unwrap_err().is_not_found());
}

#[test]
fn map_fs_conforms() {
    conformance(&MapFs::new());
}

#[test]
fn dir_fs_conforms() {
    let tmpdir = tempfile::tempdir().unwrap();
    conformance(&DirFs::new(tmpdir.path()));
}
