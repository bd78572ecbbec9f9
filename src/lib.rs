//! release-packages - Release automation for the Zulip API packages.
//!
//! # Overview
//!
//! release-packages stamps a version into the `zulip`, `zulip_bots` and
//! `zulip_botserver` packages, builds their source and wheel distributions,
//! tags and pushes the release, uploads the distributions with twine, and
//! moves the main repo's requirement pins to the new release on a fresh
//! branch.

pub mod error;
pub mod layout;
pub mod release;
pub mod tool;
pub mod version;

// Re-export commonly used types
pub use error::{ReleaseError, ToolError, VersionFileError};
pub use layout::{Package, RepoLayout};
pub use release::{ReleaseConfig, run_release};
pub use tool::{Invocation, SystemRunner, ToolOutput, ToolRunner};
pub use version::{CommitHash, GitRef, ReleaseVersion};
