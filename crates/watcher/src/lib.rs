//! Source tree watching
//!
//! Wraps a recursive filesystem watcher and turns raw notification events
//! into debounced rebuild triggers: a trigger fires once the tree has been
//! quiet for the debounce interval. Events that arrive while a build is
//! running are not lost; [`Watcher::take_dirty`] reports them so the caller
//! can schedule exactly one follow-up build.

use std::path::Path;
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as _};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("failed to watch \"{path}\"")]
    Watch {
        path: String,
        #[source]
        source: notify::Error,
    },
}

/// A debounced watcher over one directory tree.
pub struct Watcher {
    // Dropping the notify watcher stops the event stream.
    _watcher: RecommendedWatcher,
    events: mpsc::Receiver<()>,
}

impl Watcher {
    /// Starts watching `root` recursively.
    pub fn new(root: &Path) -> Result<Self, WatchError> {
        let (tx, events) = mpsc::channel(256);

        let mut watcher = notify::recommended_watcher(
            move |result: Result<Event, notify::Error>| match result {
                Ok(event) => {
                    if matches!(event.kind, EventKind::Access(_)) {
                        return;
                    }
                    debug!(kind = ?event.kind, paths = ?event.paths, "filesystem event");
                    // A full channel already guarantees a pending trigger.
                    let _ = tx.try_send(());
                }
                Err(error) => warn!(%error, "watch error"),
            },
        )
        .map_err(|source| WatchError::Watch {
            path: root.display().to_string(),
            source,
        })?;

        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(|source| WatchError::Watch {
                path: root.display().to_string(),
                source,
            })?;

        Ok(Self {
            _watcher: watcher,
            events,
        })
    }

    /// Waits for the next rebuild trigger: the first event starts a quiet
    /// timer, and every further event restarts it. Returns `None` when the
    /// event stream has closed.
    pub async fn next_trigger(&mut self, quiet: Duration) -> Option<()> {
        self.events.recv().await?;
        loop {
            match timeout(quiet, self.events.recv()).await {
                Ok(Some(())) => continue,
                Ok(None) => return None,
                Err(_) => return Some(()),
            }
        }
    }

    /// Drains any events that arrived since the last trigger and reports
    /// whether there were any. Called after a build finishes to decide
    /// whether the tree changed mid-build.
    pub fn take_dirty(&mut self) -> bool {
        let mut dirty = false;
        while self.events.try_recv().is_ok() {
            dirty = true;
        }
        dirty
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const QUIET: Duration = Duration::from_millis(200);
    const WAIT: Duration = Duration::from_secs(10);

    #[tokio::test]
    async fn a_write_produces_a_trigger() {
        let dir = tempfile::tempdir().unwrap();
        let mut watcher = Watcher::new(dir.path()).unwrap();

        fs::write(dir.path().join("a.txt"), "x").unwrap();

        let trigger = timeout(WAIT, watcher.next_trigger(QUIET)).await;
        assert_eq!(trigger.expect("timed out waiting for a trigger"), Some(()));
    }

    #[tokio::test]
    async fn a_burst_of_writes_coalesces_into_one_trigger() {
        let dir = tempfile::tempdir().unwrap();
        let mut watcher = Watcher::new(dir.path()).unwrap();

        for index in 0..10 {
            fs::write(dir.path().join(format!("{index}.txt")), "x").unwrap();
        }

        let trigger = timeout(WAIT, watcher.next_trigger(QUIET)).await;
        assert_eq!(trigger.expect("timed out waiting for a trigger"), Some(()));
        // The burst was consumed by the debounce; nothing is left over.
        assert!(!watcher.take_dirty());
    }

    #[tokio::test]
    async fn events_during_a_build_mark_the_watcher_dirty() {
        let dir = tempfile::tempdir().unwrap();
        let mut watcher = Watcher::new(dir.path()).unwrap();
        assert!(!watcher.take_dirty());

        fs::write(dir.path().join("a.txt"), "x").unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert!(watcher.take_dirty());
        assert!(!watcher.take_dirty());
    }
}
