//! Error taxonomy for the build pipeline
//!
//! Each variant maps to one isolation level: configuration errors are fatal
//! for their title, naming conflicts for their pack operation, processor
//! errors for their file, and I/O errors for the smallest enclosing entity.
//! A state-file version mismatch is deliberately not an error; the state
//! store reports it as "no prior build".

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    /// A title is missing required metadata/icon inputs or its metadata
    /// cannot be parsed.
    #[error("configuration error for title \"{title}\": {reason}")]
    Config { title: String, reason: String },

    /// Two content items produced ambiguous packed keys.
    #[error("naming conflict in package \"{package}\": {reason}")]
    NamingConflict { package: String, reason: String },

    /// A content processor rejected its input.
    #[error("processing \"{path}\" failed: {reason}")]
    Processor { path: String, reason: String },

    /// Filesystem access failed.
    #[error("I/O error at \"{path}\"")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The persisted state file exists but cannot be parsed. Distinct from
    /// version mismatch, which is a recognized full-rebuild trigger.
    #[error("invalid state file \"{path}\"")]
    State {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// A path handed to an extract function did not match the grammar.
    /// Programming-error class; diff results only contain recognized paths.
    #[error("malformed path \"{path}\": {reason}")]
    MalformedPath { path: String, reason: String },
}

impl BuildError {
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        BuildError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn processor(path: impl Into<String>, reason: impl Into<String>) -> Self {
        BuildError::Processor {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn config(title: impl Into<String>, reason: impl Into<String>) -> Self {
        BuildError::Config {
            title: title.into(),
            reason: reason.into(),
        }
    }
}
