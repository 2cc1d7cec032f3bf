//! Build driver
//!
//! One invocation runs the full state machine: load (or recover) the
//! persisted state, diff the scanned source tree against it, fan out work
//! per title, fold the surviving subtrees' deltas into the new state, and
//! commit. The state file is deleted before the first mutation and written
//! back only after every subtree has joined, so an interrupted run is
//! indistinguishable from no run at all.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;

use pp_core::{
    diff, paths, scan, BuildError, BuildState, FingerprintMap, StateStore, TitleState,
};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::options::BuildOptions;
use crate::report::{BuildReport, Failure};
use crate::title;

/// The state contribution of one successfully built subtree. Failed
/// entities contribute nothing, which is exactly what makes the next run
/// pick them up again.
#[derive(Debug, Default)]
pub(crate) struct StateDelta {
    pub paths: FingerprintMap,
    pub games: BTreeMap<String, TitleState>,
}

/// Immutable inputs shared by every task of one build run.
pub(crate) struct BuildContext {
    pub options: BuildOptions,
    pub old_state: BuildState,
    pub new_paths: FingerprintMap,
    /// Bounds simultaneously in-flight file operations.
    pub file_permits: Semaphore,
}

impl BuildContext {
    pub fn abs(&self, logical: &str) -> PathBuf {
        self.options.root.join(logical)
    }
}

/// What one title subtree hands back to the driver.
#[derive(Debug, Default)]
pub(crate) struct TitleOutcome {
    pub delta: StateDelta,
    pub failures: Vec<Failure>,
}

impl TitleOutcome {
    pub fn failed(entity: impl Into<String>, error: BuildError) -> Self {
        Self {
            delta: StateDelta::default(),
            failures: vec![Failure::new(entity, error)],
        }
    }
}

/// Runs one complete build.
///
/// The returned report lists per-entity failures; an `Err` is reserved for
/// infrastructure problems (unreadable state, unscannable source tree) that
/// prevent the run from happening at all.
pub async fn run_build(options: BuildOptions) -> Result<BuildReport, BuildError> {
    info!(profile = %options.profile, root = %options.root.display(), "starting build");

    let new_paths = scan(&options.root)?;
    let store = StateStore::new(options.root.join(paths::temp_build(options.profile)));

    let (old_state, found) = store.load()?;
    store.begin_build()?;
    if !found {
        store.recover(&options.root.join(paths::dist_build(options.profile)))?;
    }

    let title_diff = diff::diff_titles(&old_state.paths, &new_paths);

    // A surviving title without a metadata snapshot failed last run; rebuild
    // it even though its fingerprints are unchanged.
    let old_titles: BTreeSet<String> = old_state
        .paths
        .keys()
        .filter_map(|path| paths::title_of(path))
        .map(str::to_owned)
        .collect();
    let new_titles: BTreeSet<String> = new_paths
        .keys()
        .filter_map(|path| paths::title_of(path))
        .map(str::to_owned)
        .collect();
    let mut updated = title_diff.updated.clone();
    for name in old_titles.intersection(&new_titles) {
        if !old_state.games.contains_key(name) && !updated.contains(name) {
            info!(title = %name, "no snapshot from the previous build; rebuilding");
            updated.push(name.clone());
        }
    }

    let mut touched: BTreeSet<String> = BTreeSet::new();
    touched.extend(title_diff.created.iter().cloned());
    touched.extend(updated.iter().cloned());
    touched.extend(title_diff.deleted.iter().cloned());
    info!(
        created = title_diff.created.len(),
        updated = updated.len(),
        deleted = title_diff.deleted.len(),
        "title diff"
    );

    let ctx = Arc::new(BuildContext {
        file_permits: Semaphore::new(options.jobs.max(1)),
        options,
        old_state,
        new_paths,
    });

    let mut tasks: JoinSet<TitleOutcome> = JoinSet::new();
    for name in title_diff.created {
        let ctx = Arc::clone(&ctx);
        tasks.spawn(async move { title::created(ctx, name).await });
    }
    for name in updated {
        let ctx = Arc::clone(&ctx);
        tasks.spawn(async move { title::updated(ctx, name).await });
    }
    for name in title_diff.deleted {
        let ctx = Arc::clone(&ctx);
        tasks.spawn(async move { title::deleted(ctx, name).await });
    }

    let mut state = BuildState::default();
    let mut report = BuildReport::default();

    // Paths outside any title, and untouched titles, carry over wholesale.
    for (path, fingerprint) in &ctx.new_paths {
        match paths::title_of(path) {
            None => {
                state.paths.insert(path.clone(), *fingerprint);
            }
            Some(name) if !touched.contains(name) => {
                state.paths.insert(path.clone(), *fingerprint);
            }
            Some(_) => {}
        }
    }
    for (name, snapshot) in &ctx.old_state.games {
        if new_titles.contains(name) && !touched.contains(name) {
            state.games.insert(name.clone(), snapshot.clone());
        }
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(outcome) => {
                state.paths.extend(outcome.delta.paths);
                state.games.extend(outcome.delta.games);
                report.failures.extend(outcome.failures);
            }
            Err(error) => {
                report.failures.push(Failure::new(
                    "build",
                    BuildError::processor("build", format!("a build task panicked: {error}")),
                ));
            }
        }
    }

    store.commit(&state)?;

    if report.is_success() {
        info!("build finished");
    } else {
        warn!(failures = report.failures.len(), "build finished with failures");
    }
    Ok(report)
}
