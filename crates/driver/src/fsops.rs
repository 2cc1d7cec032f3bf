//! Small async filesystem helpers shared by the build handlers
//!
//! Deletions tolerate already-missing targets; every failure carries the
//! path it happened at.

use std::io;
use std::path::Path;

use pp_core::BuildError;

pub(crate) async fn create_dir_all(path: &Path) -> Result<(), BuildError> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|error| BuildError::io(path.display().to_string(), error))
}

pub(crate) async fn remove_dir_all(path: &Path) -> Result<(), BuildError> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(error) => Err(BuildError::io(path.display().to_string(), error)),
    }
}

pub(crate) async fn remove_file(path: &Path) -> Result<(), BuildError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(error) => Err(BuildError::io(path.display().to_string(), error)),
    }
}

pub(crate) async fn write(path: &Path, contents: impl AsRef<[u8]>) -> Result<(), BuildError> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent).await?;
    }
    tokio::fs::write(path, contents)
        .await
        .map_err(|error| BuildError::io(path.display().to_string(), error))
}

pub(crate) async fn read_to_string(path: &Path) -> Result<String, BuildError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|error| BuildError::io(path.display().to_string(), error))
}

pub(crate) async fn copy(from: &Path, to: &Path) -> Result<(), BuildError> {
    if let Some(parent) = to.parent() {
        create_dir_all(parent).await?;
    }
    tokio::fs::copy(from, to)
        .await
        .map(|_| ())
        .map_err(|error| BuildError::io(from.display().to_string(), error))
}
