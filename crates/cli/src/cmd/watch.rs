//! `playpack watch` command

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use pp_core::{paths, Profile};
use pp_driver::run_build;
use pp_watcher::Watcher;
use tracing::error;

use crate::cmd;
use crate::config::Config;

const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

pub async fn run(
    root: &Path,
    jobs: Option<usize>,
    audio_formats: Option<Vec<String>>,
    debounce_ms: Option<u64>,
) -> Result<()> {
    let config = Config::load(root)?;
    let options = cmd::resolve_options(root, Profile::Watch, &config, jobs, audio_formats)?;
    let debounce = debounce_ms
        .or(config.watch.debounce_ms)
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_DEBOUNCE);

    // The watched directory has to exist before the watcher attaches.
    let src = root.join(paths::SRC);
    tokio::fs::create_dir_all(&src)
        .await
        .with_context(|| format!("failed to create {}", src.display()))?;
    let mut watcher = Watcher::new(&src).context("failed to start the filesystem watcher")?;

    println!(
        "{} {}",
        "Watching".cyan().bold(),
        src.display().cyan().bold()
    );

    loop {
        // A failed run leaves no committed state for the entities that
        // broke, so the next trigger retries them. Never exit the loop.
        match run_build(options.clone()).await {
            Ok(report) => cmd::print_report(&report),
            Err(err) => error!(error = %err, "build aborted"),
        }

        // Changes that landed mid-build start the next run immediately.
        if watcher.take_dirty() {
            continue;
        }
        if watcher.next_trigger(debounce).await.is_none() {
            break;
        }
    }
    Ok(())
}
