// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde::Deserialize;
use tempfile::tempdir;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Doc {
    value: u32,
}

#[test]
fn round_trips_through_write_and_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("doc.json");

    write_json_atomic(&path, &Doc { value: 7 }).unwrap();
    let loaded: Doc = load_json_with_backup(&path).unwrap().unwrap();

    assert_eq!(loaded, Doc { value: 7 });
}

#[test]
fn missing_file_loads_as_none() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("missing.json");

    let loaded: Option<Doc> = load_json_with_backup(&path).unwrap();
    assert!(loaded.is_none());
}

#[test]
fn corrupt_file_is_rotated_to_bak_and_loads_as_none() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("doc.json");
    fs::write(&path, b"{not json").unwrap();

    let loaded: Option<Doc> = load_json_with_backup(&path).unwrap();
    assert!(loaded.is_none());
    assert!(path.with_extension("bak").exists());
    assert!(!path.exists());
}

#[test]
fn no_tmp_file_left_behind_after_write() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("doc.json");

    write_json_atomic(&path, &Doc { value: 1 }).unwrap();
    assert!(!path.with_extension("tmp").exists());
}

#[test]
fn bak_rotation_keeps_bounded_history() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("doc.json");

    for _ in 0..5 {
        fs::write(&path, b"{bad").unwrap();
        let _: Option<Doc> = load_json_with_backup(&path).unwrap();
    }

    assert!(path.with_extension("bak").exists());
    assert!(path.with_extension("bak.2").exists());
    assert!(path.with_extension("bak.3").exists());
    assert!(!path.with_extension("bak.4").exists());
}
