//! Build orchestration
//!
//! Ties the scanner, diff engine, processors and packer together into one
//! incremental build: diff the source tree against the last committed
//! state, fan work out per title / package / file, and commit the new state
//! only once every subtree has joined. Failures are isolated per entity and
//! surfaced in the returned [`BuildReport`].

mod build;
mod file;
mod fsops;
mod html;
mod options;
mod package;
mod report;
mod title;

pub use build::run_build;
pub use options::{BuildOptions, DEFAULT_JOBS};
pub use report::{BuildReport, Failure};
