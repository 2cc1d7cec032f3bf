//! Build outcome reporting
//!
//! Failures are isolated per entity: a broken file, package, or title is
//! reported here while its siblings build normally. The report is what the
//! CLI prints and what decides the process exit status.

use pp_core::BuildError;

/// One entity that failed to build.
#[derive(Debug)]
pub struct Failure {
    /// Human-readable entity description, e.g. `package "pond/sprites"`.
    pub entity: String,
    pub error: BuildError,
}

impl Failure {
    pub fn new(entity: impl Into<String>, error: BuildError) -> Self {
        Self {
            entity: entity.into(),
            error,
        }
    }
}

/// The aggregate outcome of one build run.
#[derive(Debug, Default)]
pub struct BuildReport {
    pub failures: Vec<Failure>,
}

impl BuildReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}
