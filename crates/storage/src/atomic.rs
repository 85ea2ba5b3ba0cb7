// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atomic JSON file persistence shared by the data store, tracking index,
//! and activity log.
//!
//! Every durable write in this crate goes through [`write_json_atomic`]:
//! serialize to a `.tmp` sibling, `fsync`, then rename over the target. A
//! crash between the write and the rename leaves the previous file intact;
//! a crash mid-write leaves only the `.tmp` file, never a half-written
//! target.

use serde::{de::DeserializeOwned, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum AtomicIoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serialize `value` to `path` atomically (write `.tmp`, fsync, rename).
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), AtomicIoError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("tmp");
    {
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, value)?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// The `.backup` sibling path for `path` (`data.json` -> `data.json.backup`).
/// Distinct from the `.bak`/`.bak.N` rotation [`rotate_bak_path`] performs on
/// a corrupt *load* — this is the pre-save snapshot of the document as it
/// stood immediately before a save replaces it.
pub fn backup_sibling_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".backup");
    PathBuf::from(name)
}

/// Copies `path` to its `.backup` sibling if `path` currently exists. A
/// no-op on the very first save, when there is nothing yet to back up.
pub fn backup_before_write(path: &Path) -> Result<(), AtomicIoError> {
    if path.exists() {
        fs::copy(path, backup_sibling_path(path))?;
    }
    Ok(())
}

/// Load and deserialize `path`, returning `None` if it does not exist.
///
/// A corrupt file is rotated to `.bak` (see [`rotate_bak_path`]) rather than
/// returned as an error, so the caller can fall back to a fresh default —
/// matching the store's "never fails on missing file" contract for
/// `data.json`. Callers that must distinguish "absent" from "corrupt"
/// should check `path.exists()` themselves before calling this.
pub fn load_json_with_backup<T: DeserializeOwned>(
    path: &Path,
) -> Result<Option<T>, AtomicIoError> {
    if !path.exists() {
        return Ok(None);
    }

    let file = File::open(path)?;
    let reader = BufReader::new(file);
    match serde_json::from_reader(reader) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            let bak_path = rotate_bak_path(path);
            warn!(
                error = %e,
                path = %path.display(),
                bak = %bak_path.display(),
                "corrupt JSON store file, rotating to .bak",
            );
            fs::rename(path, &bak_path)?;
            Ok(None)
        }
    }
}

/// Load and deserialize `path`, returning `None` if it does not exist and
/// propagating a parse failure as-is rather than rotating the file aside.
///
/// Used by stores that must distinguish "absent" (fall back to a default)
/// from "corrupt" (fail the caller outright) instead of silently discarding
/// a malformed snapshot.
pub fn load_json_strict<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, AtomicIoError> {
    if !path.exists() {
        return Ok(None);
    }
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let value = serde_json::from_reader(reader)?;
    Ok(Some(value))
}

const MAX_BAK_FILES: u32 = 3;

/// Pick the next `.bak` / `.bak.N` path, rotating older backups out.
///
/// Keeps up to [`MAX_BAK_FILES`] backups: `.bak`, `.bak.2`, `.bak.3`. The
/// oldest backup is removed when the limit is reached.
pub fn rotate_bak_path(path: &Path) -> PathBuf {
    let bak = |n: u32| {
        if n == 1 {
            path.with_extension("bak")
        } else {
            path.with_extension(format!("bak.{n}"))
        }
    };

    let oldest = bak(MAX_BAK_FILES);
    if oldest.exists() {
        let _ = fs::remove_file(&oldest);
    }

    for n in (1..MAX_BAK_FILES).rev() {
        let src = bak(n);
        if src.exists() {
            let _ = fs::rename(&src, bak(n + 1));
        }
    }

    bak(1)
}

#[cfg(test)]
#[path = "atomic_tests.rs"]
mod tests;
