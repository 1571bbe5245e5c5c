// src/fs.rs

//! Crash-safe JSON persistence helpers.
//!
//! Every persisted document in this crate (state snapshot, task graph) is
//! written with the same pattern: serialize to a sibling temp file in the
//! target's directory, then atomically rename over the target. A crash
//! mid-write leaves the previous valid document intact.

use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::errors::Result;

/// Atomically replace `path` with the JSON serialization of `value`.
///
/// The temp file is created in the same directory as `path` so that the
/// final rename stays on one filesystem and is atomic.
pub fn atomic_write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => std::path::PathBuf::from("."),
    };
    fs::create_dir_all(&parent)
        .with_context(|| format!("creating directory {}", parent.display()))?;

    let tmp = NamedTempFile::new_in(&parent)
        .with_context(|| format!("creating temp file in {}", parent.display()))?;
    serde_json::to_writer_pretty(tmp.as_file(), value)?;
    tmp.as_file()
        .sync_all()
        .with_context(|| format!("syncing temp file for {}", path.display()))?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("replacing {}", path.display()))?;

    Ok(())
}

/// Read and deserialize a JSON document.
///
/// Missing files and parse failures both surface as errors; callers that
/// want a default on corruption (the state store) handle that themselves.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let value = serde_json::from_str(&contents)?;
    Ok(value)
}
