//! Content processors
//!
//! A processor turns one package source file into content items. Dispatch is
//! by file extension; the set of supported extensions is closed. Processors
//! never touch the working or output directories themselves; they hand their
//! items back to the driver, which caches and packs them.

pub mod audio;
pub mod svg;

use std::path::Path;

use pp_core::{AudioFormat, BuildError, GeneratedItems};

/// The processors the pipeline knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorKind {
    Svg,
    Wav,
}

impl ProcessorKind {
    /// Extension dispatch, case-insensitive. `None` means the file has no
    /// processor; the driver decides what that means.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "svg" => Some(ProcessorKind::Svg),
            "wav" => Some(ProcessorKind::Wav),
            _ => None,
        }
    }
}

/// Everything a processor needs to know about one source file.
pub struct ProcessContext<'a> {
    /// Absolute filesystem path to read.
    pub source_path: &'a Path,
    /// Normalized project-relative path, used in diagnostics.
    pub logical_path: &'a str,
    /// File name without extension; the base of every generated item key.
    pub stem: &'a str,
    /// Audio formats to encode; ignored by non-audio processors.
    pub audio_formats: &'a [AudioFormat],
}

/// Runs one processor against one source file.
pub async fn process(
    kind: ProcessorKind,
    ctx: &ProcessContext<'_>,
) -> Result<GeneratedItems, BuildError> {
    match kind {
        ProcessorKind::Svg => svg::process(ctx).await,
        ProcessorKind::Wav => audio::process(ctx).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_dispatch_is_case_insensitive() {
        assert_eq!(ProcessorKind::from_extension("svg"), Some(ProcessorKind::Svg));
        assert_eq!(ProcessorKind::from_extension("SVG"), Some(ProcessorKind::Svg));
        assert_eq!(ProcessorKind::from_extension("wav"), Some(ProcessorKind::Wav));
        assert_eq!(ProcessorKind::from_extension("png"), None);
        assert_eq!(ProcessorKind::from_extension(""), None);
    }
}
