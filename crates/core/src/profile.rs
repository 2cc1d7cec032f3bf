//! Build profiles
//!
//! A profile selects a working/output directory pair and the default set of
//! audio encoding targets. `OneOff` is the distributable build; `Watch` is
//! the fast development build driven by the filesystem watcher.

use crate::content::AudioFormat;

/// The build profile a run operates under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Profile {
    /// One-shot distributable build.
    OneOff,
    /// Development build used by watch mode.
    Watch,
}

impl Profile {
    /// Directory name used under `temp/` and `dist/`.
    pub fn dir_name(self) -> &'static str {
        match self {
            Profile::OneOff => "one-off",
            Profile::Watch => "watch",
        }
    }

    /// Audio formats encoded when no configuration overrides them.
    ///
    /// Watch builds keep only WAV to stay fast; one-off builds encode the
    /// formats the runtime actually ships with.
    pub fn default_audio_formats(self) -> Vec<AudioFormat> {
        match self {
            Profile::OneOff => vec![AudioFormat::Wav, AudioFormat::Mp3, AudioFormat::Ogg],
            Profile::Watch => vec![AudioFormat::Wav],
        }
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}
