//! Core library for relver.
//!
//! Computes the next semantic version for a project, rewrites every file
//! that records it, and merges fresh release notes into the changelog.
//!
//! # Modules
//!
//! - [`version`] - Version model and next-version resolution
//! - [`files`] - Per-format version extraction and rewriting
//! - [`update`] - Current-version discovery and bump-set rewriting
//! - [`changelog`] - Changelog merging
//! - [`git`] - Tag listing, commit and tag
//! - [`hooks`] - Lifecycle hook commands
//! - [`notes`] - Release-notes generation
//! - [`release`] - Plan/execute orchestration
//! - [`config`] - Configuration loading and management
//! - [`error`] - Configuration errors
//!
//! # Quick Start
//!
//! ```
//! use relver_core::version::{BumpRequest, SemanticVersion, resolve};
//!
//! let current = SemanticVersion::parse("1.0.0").unwrap();
//! let request = BumpRequest::ReleaseType {
//!     release_type: "minor".into(),
//!     prerelease: Some("rc".into()),
//! };
//! assert_eq!(resolve(&current, &request).unwrap().to_string(), "1.1.0-rc.0");
//! ```
#![deny(unsafe_code)]

pub mod changelog;

pub mod config;

pub mod error;

pub mod files;

pub mod git;

pub mod hooks;

pub mod notes;

pub mod release;

pub mod update;

pub mod version;

pub use config::{Config, ConfigLoader, LogLevel};

pub use error::{ConfigError, ConfigResult};

pub use release::{Collaborators, ReleaseError, ReleaseOptions, ReleaseOutcome, ReleasePlan, plan_release};

pub use version::{BumpRequest, ReleaseType, SemanticVersion, VersionError};

// Re-export semver so downstream crates don't need a direct dependency.
pub use semver;
