//! Persisted build state and the crash-recovery protocol
//!
//! The state file is the sole proof that a prior build completed: it is
//! deleted at the *start* of a run (before any mutation) and rewritten only
//! at the *end*, after every entity has finished. A crash in between leaves
//! no valid state file, forcing the next run to distrust the working and
//! output trees and rebuild from scratch. There is no journal of partial
//! progress.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::BuildError;
use crate::metadata::TitleMetadata;

/// Normalized source path -> last-modified timestamp in milliseconds.
///
/// Two files are "the same" iff their timestamps are equal; content hashing
/// is deliberately not used. A `BTreeMap` keeps the serialized state file
/// deterministic between runs.
pub type FingerprintMap = BTreeMap<String, u64>;

/// Bumped whenever the state layout or the artifact format changes; a
/// mismatch forces a full rebuild.
pub const STATE_VERSION: u32 = 9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitleState {
    pub metadata: TitleMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildState {
    #[serde(rename = "formatVersion")]
    pub version: u32,
    pub paths: FingerprintMap,
    pub games: BTreeMap<String, TitleState>,
}

impl Default for BuildState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            paths: FingerprintMap::new(),
            games: BTreeMap::new(),
        }
    }
}

/// Owns the state file inside one profile's working directory.
pub struct StateStore {
    temp_dir: PathBuf,
    state_path: PathBuf,
}

impl StateStore {
    /// `temp_dir` is the profile's working directory (e.g. `temp/one-off`).
    pub fn new(temp_dir: impl Into<PathBuf>) -> Self {
        let temp_dir = temp_dir.into();
        let state_path = temp_dir.join("state.json");
        Self {
            temp_dir,
            state_path,
        }
    }

    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    /// Reads the persisted state.
    ///
    /// Returns `(default, false)` when no prior build exists or its version
    /// does not match the current one; the two cases are logged distinctly
    /// but both force a full rebuild. Any other read or parse failure is
    /// fatal.
    pub fn load(&self) -> Result<(BuildState, bool), BuildError> {
        let text = match fs::read_to_string(&self.state_path) {
            Ok(text) => text,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                info!("there is no existing build, or it was interrupted");
                return Ok((BuildState::default(), false));
            }
            Err(error) => {
                return Err(BuildError::io(self.state_path.display().to_string(), error))
            }
        };

        let state: BuildState =
            serde_json::from_str(&text).map_err(|source| BuildError::State {
                path: self.state_path.display().to_string(),
                source,
            })?;

        if state.version != STATE_VERSION {
            warn!(
                found = state.version,
                expected = STATE_VERSION,
                "state file version does not match; forcing a full rebuild"
            );
            return Ok((BuildState::default(), false));
        }

        info!("an existing build was found and its version matches");
        Ok((state, true))
    }

    /// Deletes the state file to mark the build as in progress. Idempotent;
    /// a missing file is not an error.
    pub fn begin_build(&self) -> Result<(), BuildError> {
        match fs::remove_file(&self.state_path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(BuildError::io(self.state_path.display().to_string(), error)),
        }
    }

    /// Restores a trustworthy starting point when no valid prior state
    /// exists: the working directory is erased and recreated; the output
    /// directory, if present and non-empty, has its contents deleted (it is
    /// not recreated wholesale, since unrelated data may live beside it).
    pub fn recover(&self, dist_dir: &Path) -> Result<(), BuildError> {
        info!(dir = %self.temp_dir.display(), "erasing the working directory");
        match fs::remove_dir_all(&self.temp_dir) {
            Ok(()) => {}
            Err(error) if error.kind() == io::ErrorKind::NotFound => {}
            Err(error) => {
                return Err(BuildError::io(self.temp_dir.display().to_string(), error))
            }
        }
        fs::create_dir_all(&self.temp_dir)
            .map_err(|error| BuildError::io(self.temp_dir.display().to_string(), error))?;

        let entries = match fs::read_dir(dist_dir) {
            Ok(entries) => entries,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                info!(dir = %dist_dir.display(), "no output directory yet");
                return Ok(());
            }
            Err(error) => return Err(BuildError::io(dist_dir.display().to_string(), error)),
        };

        for entry in entries {
            let entry =
                entry.map_err(|error| BuildError::io(dist_dir.display().to_string(), error))?;
            let path = entry.path();
            info!(path = %path.display(), "deleting stale output");
            let result = if entry
                .file_type()
                .map_err(|error| BuildError::io(path.display().to_string(), error))?
                .is_dir()
            {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            result.map_err(|error| BuildError::io(path.display().to_string(), error))?;
        }
        Ok(())
    }

    /// Writes the new state file, marking the build as committed. Must only
    /// be called after every entity at every level has finished processing.
    pub fn commit(&self, state: &BuildState) -> Result<(), BuildError> {
        let text = serde_json::to_string(state).map_err(|source| BuildError::State {
            path: self.state_path.display().to_string(),
            source,
        })?;
        fs::write(&self.state_path, text)
            .map_err(|error| BuildError::io(self.state_path.display().to_string(), error))?;
        info!(path = %self.state_path.display(), "build state committed");
        Ok(())
    }
}
