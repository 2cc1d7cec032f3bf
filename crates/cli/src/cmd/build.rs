//! `playpack build` command

use std::path::Path;

use anyhow::{bail, Context, Result};
use pp_core::Profile;
use pp_driver::run_build;

use crate::cmd;
use crate::config::Config;

pub async fn run(
    root: &Path,
    jobs: Option<usize>,
    audio_formats: Option<Vec<String>>,
) -> Result<()> {
    let config = Config::load(root)?;
    let options = cmd::resolve_options(root, Profile::OneOff, &config, jobs, audio_formats)?;

    let report = run_build(options).await.context("build failed")?;
    cmd::print_report(&report);

    if !report.is_success() {
        bail!("{} entities failed to build", report.failures.len());
    }
    Ok(())
}
