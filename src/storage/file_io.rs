//! File I/O utilities with atomic writes
//!
//! Provides safe file operations that won't corrupt data on failure. Every
//! write lands in a temp file next to its destination, is flushed and synced,
//! then renamed into place.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::VaultError;

/// Suffixes SQLite uses for files that travel with a database
const SQLITE_SIDECAR_SUFFIXES: [&str; 3] = ["-journal", "-wal", "-shm"];

/// Appended to a sidecar's name while a swap is in progress
const SIDECAR_ASIDE_SUFFIX: &str = ".aside";

/// Temp path used while writing `path`: same directory, `.tmp` appended
pub fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("file"));
    name.push(".tmp");
    path.with_file_name(name)
}

/// Read JSON from a file, returning an error if file doesn't exist
pub fn read_json_required<T, P>(path: P) -> Result<T, VaultError>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();

    if !path.exists() {
        return Err(VaultError::Io(format!(
            "File not found: {}",
            path.display()
        )));
    }

    let file = File::open(path)
        .map_err(|e| VaultError::Io(format!("Failed to open {}: {}", path.display(), e)))?;

    let reader = BufReader::new(file);
    serde_json::from_reader(reader)
        .map_err(|e| VaultError::Json(format!("Failed to parse {}: {}", path.display(), e)))
}

/// Write JSON to a file atomically (write to temp, then rename)
///
/// This ensures that the file is either completely written or not modified at all,
/// preventing corruption on crashes or power failures.
pub fn write_json_atomic<T, P>(path: P, data: &T) -> Result<(), VaultError>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    ensure_parent(path)?;

    let temp_path = temp_path_for(path);

    let file = File::create(&temp_path).map_err(|e| {
        VaultError::Io(format!(
            "Failed to create temp file {}: {}",
            temp_path.display(),
            e
        ))
    })?;

    let mut writer = BufWriter::new(file);
    let written = serde_json::to_writer_pretty(&mut writer, data)
        .map_err(|e| VaultError::Json(format!("Failed to serialize data: {}", e)))
        .and_then(|_| finish_writer(writer, &temp_path));

    if let Err(e) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    commit_staged(&temp_path, path)
}

/// Copy `src` to a temp file beside `dst` and sync it, without touching `dst`
///
/// Returns the temp path. The caller finishes with [`commit_staged`] or
/// discards the temp file.
pub fn stage_copy(src: &Path, dst: &Path) -> Result<PathBuf, VaultError> {
    ensure_parent(dst)?;

    let mut reader = File::open(src)
        .map(BufReader::new)
        .map_err(|e| VaultError::Io(format!("Failed to open {}: {}", src.display(), e)))?;

    let temp_path = temp_path_for(dst);
    let file = File::create(&temp_path).map_err(|e| {
        VaultError::Io(format!(
            "Failed to create temp file {}: {}",
            temp_path.display(),
            e
        ))
    })?;

    let mut writer = BufWriter::new(file);
    let copied = io::copy(&mut reader, &mut writer)
        .map_err(|e| {
            VaultError::Io(format!(
                "Failed to copy {} to {}: {}",
                src.display(),
                temp_path.display(),
                e
            ))
        })
        .and_then(|_| finish_writer(writer, &temp_path));

    if let Err(e) = copied {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    Ok(temp_path)
}

/// Atomically move a staged temp file onto its destination
pub fn commit_staged(temp_path: &Path, dst: &Path) -> Result<(), VaultError> {
    fs::rename(temp_path, dst).map_err(|e| {
        let _ = fs::remove_file(temp_path);
        VaultError::Io(format!(
            "Failed to move {} into place at {}: {}",
            temp_path.display(),
            dst.display(),
            e
        ))
    })?;

    if let Some(parent) = dst.parent() {
        sync_dir(parent);
    }

    Ok(())
}

/// Whole-file copy that is durable before it becomes visible at `dst`
pub fn copy_file_atomic(src: &Path, dst: &Path) -> Result<u64, VaultError> {
    let temp_path = stage_copy(src, dst)?;
    commit_staged(&temp_path, dst)?;

    let size = fs::metadata(dst)
        .map_err(|e| VaultError::Io(format!("Failed to stat {}: {}", dst.display(), e)))?
        .len();
    Ok(size)
}

/// Journal files moved out of the way of a database swap
///
/// Finish with [`SetAsideSidecars::put_back`] if the swap failed, or
/// [`SetAsideSidecars::discard`] once the new database is in place.
#[derive(Debug, Default)]
#[must_use]
pub struct SetAsideSidecars {
    moved: Vec<(PathBuf, PathBuf)>,
}

impl SetAsideSidecars {
    pub fn is_empty(&self) -> bool {
        self.moved.is_empty()
    }

    /// Move every sidecar back under its original name
    pub fn put_back(mut self) -> Result<(), VaultError> {
        let mut first_error = None;
        while let Some((original, aside)) = self.moved.pop() {
            if let Err(e) = fs::rename(&aside, &original) {
                tracing::error!(path = %aside.display(), error = %e, "could not put sidecar back");
                first_error.get_or_insert_with(|| {
                    VaultError::Io(format!(
                        "Failed to move {} back to {}: {}",
                        aside.display(),
                        original.display(),
                        e
                    ))
                });
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Delete the moved sidecars; they belong to the replaced database
    pub fn discard(self) {
        for (_, aside) in self.moved {
            match fs::remove_file(&aside) {
                Ok(()) => tracing::debug!(path = %aside.display(), "removed stale sidecar"),
                Err(e) => tracing::warn!(path = %aside.display(), error = %e, "could not remove stale sidecar"),
            }
        }
    }
}

/// Rename journal/WAL files next to a SQLite database out of the way
///
/// Only safe while no connection to `db_path` is open. On error every
/// sidecar already moved is put back.
pub fn set_aside_sqlite_sidecars(db_path: &Path) -> Result<SetAsideSidecars, VaultError> {
    let mut set_aside = SetAsideSidecars::default();

    for suffix in SQLITE_SIDECAR_SUFFIXES {
        let mut name = db_path.as_os_str().to_os_string();
        name.push(suffix);
        let sidecar = PathBuf::from(name);
        if !sidecar.exists() {
            continue;
        }

        let mut aside_name = sidecar.as_os_str().to_os_string();
        aside_name.push(SIDECAR_ASIDE_SUFFIX);
        let aside = PathBuf::from(aside_name);

        if let Err(e) = fs::rename(&sidecar, &aside) {
            let err = VaultError::Io(format!(
                "Failed to move {} aside: {}",
                sidecar.display(),
                e
            ));
            if let Err(put_back) = set_aside.put_back() {
                tracing::error!(error = %put_back, "sidecar left under its aside name");
            }
            return Err(err);
        }
        set_aside.moved.push((sidecar, aside));
    }

    Ok(set_aside)
}

fn ensure_parent(path: &Path) -> Result<(), VaultError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            VaultError::Io(format!(
                "Failed to create directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }
    Ok(())
}

fn finish_writer(mut writer: BufWriter<File>, path: &Path) -> Result<(), VaultError> {
    writer
        .flush()
        .map_err(|e| VaultError::Io(format!("Failed to flush {}: {}", path.display(), e)))?;

    // Sync to disk before rename
    writer
        .get_ref()
        .sync_all()
        .map_err(|e| VaultError::Io(format!("Failed to sync {}: {}", path.display(), e)))
}

/// Persist a rename on filesystems that need the directory synced too
#[cfg(unix)]
fn sync_dir(dir: &Path) {
    if let Ok(handle) = File::open(dir) {
        let _ = handle.sync_all();
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}
