//! Command implementations

pub mod build;
pub mod watch;

use std::path::Path;

use anyhow::Result;
use owo_colors::OwoColorize;
use pp_core::Profile;
use pp_driver::{BuildOptions, BuildReport};

use crate::config::{self, Config};

/// Merges command-line flags over the configuration file over the
/// profile's defaults.
pub(crate) fn resolve_options(
    root: &Path,
    profile: Profile,
    config: &Config,
    jobs: Option<usize>,
    audio_formats: Option<Vec<String>>,
) -> Result<BuildOptions> {
    let mut options = BuildOptions::new(root, profile);

    if let Some(jobs) = jobs.or(config.build.jobs) {
        options.jobs = jobs;
    }

    let names = audio_formats
        .as_deref()
        .or_else(|| config.audio_formats(profile).map(Vec::as_slice));
    if let Some(names) = names {
        options.audio_formats = config::parse_formats(names)?;
    }

    Ok(options)
}

/// Prints one build's outcome to the terminal.
pub(crate) fn print_report(report: &BuildReport) {
    if report.is_success() {
        println!("{}", "Build succeeded".green().bold());
        return;
    }

    println!(
        "{} {} {}",
        "Build finished with".red().bold(),
        report.failures.len().red().bold(),
        if report.failures.len() == 1 {
            "failure".red().bold().to_string()
        } else {
            "failures".red().bold().to_string()
        }
    );
    for failure in &report.failures {
        println!("  {}: {}", failure.entity.yellow(), failure.error);
        let mut source = std::error::Error::source(&failure.error);
        while let Some(cause) = source {
            println!("    caused by: {cause}");
            source = cause.source();
        }
    }
}
