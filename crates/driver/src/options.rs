//! Build options

use std::path::PathBuf;

use pp_core::{AudioFormat, Profile};

/// Everything one build invocation needs to know up front.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Project root; `src/`, `temp/` and `dist/` live directly under it.
    pub root: PathBuf,
    pub profile: Profile,
    /// Audio formats to encode and pack, in artifact order.
    pub audio_formats: Vec<AudioFormat>,
    /// Upper bound on simultaneously in-flight file operations.
    pub jobs: usize,
}

pub const DEFAULT_JOBS: usize = 64;

impl BuildOptions {
    /// Options with the profile's default audio formats and job bound.
    pub fn new(root: impl Into<PathBuf>, profile: Profile) -> Self {
        Self {
            root: root.into(),
            profile,
            audio_formats: profile.default_audio_formats(),
            jobs: DEFAULT_JOBS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_defaults() {
        let one_off = BuildOptions::new("/tmp/project", Profile::OneOff);
        assert_eq!(
            one_off.audio_formats,
            vec![AudioFormat::Wav, AudioFormat::Mp3, AudioFormat::Ogg]
        );

        let watch = BuildOptions::new("/tmp/project", Profile::Watch);
        assert_eq!(watch.audio_formats, vec![AudioFormat::Wav]);
        assert_eq!(watch.jobs, DEFAULT_JOBS);
    }
}
