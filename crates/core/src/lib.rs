//! Core data model for the playpack build pipeline
//!
//! This crate holds everything the build driver reasons about without doing
//! any content processing itself:
//! - the path grammar mapping source paths to titles/packages/files
//! - the fingerprint scanner (path -> mtime)
//! - the persisted build state and its crash-recovery protocol
//! - the hierarchical diff engine
//! - the content-item model shared with processors and the packer

pub mod content;
pub mod diff;
pub mod error;
pub mod metadata;
pub mod paths;
pub mod profile;
pub mod scan;
pub mod state;

pub use content::{AudioFormat, ContentItem, GeneratedItems};
pub use diff::EntityDiff;
pub use error::BuildError;
pub use metadata::{Developer, LocalizationMetadata, TitleMetadata};
pub use profile::Profile;
pub use scan::scan;
pub use state::{BuildState, FingerprintMap, StateStore, TitleState, STATE_VERSION};
