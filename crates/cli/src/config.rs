//! Project configuration
//!
//! Optional `playpack.toml` at the project root. Every field is optional;
//! command-line flags override whatever the file provides.

use std::path::Path;

use anyhow::{Context, Result};
use pp_core::{AudioFormat, Profile};
use serde::Deserialize;

pub const FILE_NAME: &str = "playpack.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub build: BuildSection,
    #[serde(default)]
    pub audio: AudioSection,
    #[serde(default)]
    pub watch: WatchSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildSection {
    pub jobs: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AudioSection {
    /// Formats for the distributable build.
    #[serde(rename = "one-off")]
    pub one_off: Option<Vec<String>>,
    /// Formats for the development build.
    pub watch: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchSection {
    #[serde(rename = "debounce-ms")]
    pub debounce_ms: Option<u64>,
}

impl Config {
    /// Loads `playpack.toml` from `root`, or the defaults when it is absent.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(FILE_NAME);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(error) => {
                return Err(error)
                    .with_context(|| format!("failed to read {}", path.display()));
            }
        };
        toml::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// The configured audio formats for `profile`, if any.
    pub fn audio_formats(&self, profile: Profile) -> Option<&Vec<String>> {
        match profile {
            Profile::OneOff => self.audio.one_off.as_ref(),
            Profile::Watch => self.audio.watch.as_ref(),
        }
    }
}

/// Parses format names from a flag or the configuration file.
pub fn parse_formats(names: &[String]) -> Result<Vec<AudioFormat>> {
    names
        .iter()
        .map(|name| {
            AudioFormat::parse(name)
                .with_context(|| format!("unknown audio format \"{name}\""))
        })
        .collect()
}
