//! Source tree fingerprinting
//!
//! A scan walks `src/games/` and records one fingerprint per regular file:
//! its last-modified timestamp in milliseconds. File contents are never read
//! here; the diff engine decides what changed purely from these maps.

use std::path::Path;
use std::time::UNIX_EPOCH;

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::BuildError;
use crate::paths;
use crate::state::FingerprintMap;

/// Milliseconds since the Unix epoch for a file's mtime; pre-epoch
/// timestamps clamp to zero.
fn mtime_millis(metadata: &std::fs::Metadata, path: &Path) -> Result<u64, BuildError> {
    let modified = metadata
        .modified()
        .map_err(|error| BuildError::io(path.display().to_string(), error))?;
    Ok(modified
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as u64)
        .unwrap_or(0))
}

/// Walks the game source tree under `root` and fingerprints every regular
/// file found. Keys are normalized relative paths (`src/games/...`).
///
/// A missing source tree yields an empty map; everything then diffs as
/// deleted. Entries that are neither files nor directories are skipped with
/// a warning.
pub fn scan(root: &Path) -> Result<FingerprintMap, BuildError> {
    let games_dir = root.join(paths::SRC).join("games");
    let mut fingerprints = FingerprintMap::new();
    if !games_dir.exists() {
        warn!(dir = %games_dir.display(), "source tree does not exist");
        return Ok(fingerprints);
    }

    for entry in WalkDir::new(&games_dir).follow_links(false) {
        let entry = entry.map_err(|error| {
            let path = error
                .path()
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| games_dir.display().to_string());
            match error.into_io_error() {
                Some(io_error) => BuildError::io(path.clone(), io_error),
                None => BuildError::MalformedPath {
                    path,
                    reason: "filesystem loop while scanning".to_owned(),
                },
            }
        })?;

        let file_type = entry.file_type();
        if file_type.is_dir() {
            continue;
        }
        if !file_type.is_file() {
            warn!(path = %entry.path().display(), "skipping non-regular file");
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|_| BuildError::MalformedPath {
                path: entry.path().display().to_string(),
                reason: "scanned entry escapes the project root".to_owned(),
            })?;
        let key = paths::join(&[&relative.to_string_lossy()]);
        let millis = mtime_millis(
            &entry
                .metadata()
                .map_err(|error| match error.into_io_error() {
                    Some(io_error) => {
                        BuildError::io(entry.path().display().to_string(), io_error)
                    }
                    None => BuildError::MalformedPath {
                        path: entry.path().display().to_string(),
                        reason: "filesystem loop while scanning".to_owned(),
                    },
                })?,
            entry.path(),
        )?;
        debug!(path = %key, mtime = millis, "fingerprinted");
        fingerprints.insert(key, millis);
    }
    Ok(fingerprints)
}
