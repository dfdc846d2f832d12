//! Release-notes generation.
//!
//! What the notes say is left to an external tool. The pipeline asks a
//! [`NotesGenerator`] for text chunks and concatenates them; the default
//! implementation shells out to `git-cliff`, which also supplies the
//! release-type hint for automatic bumps.

use std::process::Command;
use std::sync::LazyLock;

use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::version::{ReleaseType, SemanticVersion};

const GIT_CLIFF: &str = "git-cliff";

/// Errors from the notes generator.
#[derive(Error, Debug)]
pub enum NotesError {
    /// The generator binary is not on `PATH`.
    #[error("{0} is not installed or not on PATH")]
    Unavailable(&'static str),

    /// The generator could not be started.
    #[error("failed to run {tool}: {source}")]
    Exec {
        /// Binary name.
        tool: &'static str,
        /// The spawn error.
        source: std::io::Error,
    },

    /// The generator exited with a failure status.
    #[error("{tool} exited with {status}: {stderr}")]
    Failed {
        /// Binary name.
        tool: &'static str,
        /// Exit status as displayed by the OS.
        status: String,
        /// Captured stderr.
        stderr: String,
    },

    /// The generator's commit context could not be read.
    #[error("unreadable {tool} context: {source}")]
    Context {
        /// Binary name.
        tool: &'static str,
        /// The JSON error.
        source: serde_json::Error,
    },
}

/// Result alias for notes operations.
pub type NotesResult<T> = Result<T, NotesError>;

/// What the notes are being generated for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotesRequest {
    /// The version being released.
    pub version: SemanticVersion,
    /// The tag that will point at the release commit.
    pub tag: String,
}

/// Produces release notes for the unreleased changes.
pub trait NotesGenerator {
    /// Render notes as one or more text chunks.
    fn render(&self, request: &NotesRequest) -> NotesResult<Vec<String>>;

    /// Suggest a release type from the unreleased changes.
    ///
    /// `None` means the generator saw nothing that warrants a release.
    fn bump_hint(&self) -> NotesResult<Option<ReleaseType>> {
        Ok(None)
    }
}

/// Join generator chunks into the text merged into the changelog.
pub fn concat(chunks: &[String]) -> String {
    chunks.concat()
}

/// Notes from `git-cliff`.
#[derive(Debug, Clone)]
pub struct GitCliff {
    root: Utf8PathBuf,
    config: Option<Utf8PathBuf>,
}

impl GitCliff {
    /// Run `git-cliff` in `root` with its default config discovery.
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            root: root.into(),
            config: None,
        }
    }

    /// Use an explicit `git-cliff` config file.
    pub fn with_config(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.config = Some(path.into());
        self
    }

    /// Whether `git-cliff` can be found on `PATH`.
    pub fn is_available() -> bool {
        which::which(GIT_CLIFF).is_ok()
    }

    fn run(&self, args: &[&str]) -> NotesResult<String> {
        if !Self::is_available() {
            return Err(NotesError::Unavailable(GIT_CLIFF));
        }

        let mut command = Command::new(GIT_CLIFF);
        if let Some(config) = &self.config {
            command.args(["--config", config.as_str()]);
        }
        let output = command
            .args(args)
            .current_dir(self.root.as_std_path())
            .output()
            .map_err(|source| NotesError::Exec {
                tool: GIT_CLIFF,
                source,
            })?;

        if !output.status.success() {
            return Err(NotesError::Failed {
                tool: GIT_CLIFF,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// The directory `git-cliff` runs in.
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// The explicit config file, if one was set.
    pub fn config(&self) -> Option<&Utf8Path> {
        self.config.as_deref()
    }
}

impl NotesGenerator for GitCliff {
    #[instrument(skip(self), fields(tag = %request.tag))]
    fn render(&self, request: &NotesRequest) -> NotesResult<Vec<String>> {
        let raw = self.run(&["--unreleased", "--tag", &request.tag, "--strip", "all"])?;
        if raw.trim().is_empty() {
            warn!("git-cliff rendered empty notes");
            return Ok(Vec::new());
        }
        // One blank line between these notes and the previous release.
        let notes = format!("{}\n\n", raw.trim_end());
        debug!(bytes = notes.len(), "notes rendered");
        Ok(vec![notes])
    }

    #[instrument(skip(self))]
    fn bump_hint(&self) -> NotesResult<Option<ReleaseType>> {
        let raw = self.run(&["--unreleased", "--context"])?;
        let hint = hint_from_context(&raw)?;
        debug!(?hint, "bump hint");
        Ok(hint)
    }
}

/// One release in `git-cliff --context` output.
#[derive(Debug, Deserialize)]
struct ContextRelease {
    #[serde(default)]
    commits: Vec<ContextCommit>,
}

/// The commit fields the hint looks at.
#[derive(Debug, Deserialize)]
struct ContextCommit {
    #[serde(default)]
    message: String,
    #[serde(default)]
    raw_message: Option<String>,
    #[serde(default)]
    breaking: bool,
}

static CONVENTIONAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?<type>[A-Za-z]+)(?:\([^)]*\))?(?<bang>!)?:").expect("conventional header regex")
});

impl ContextCommit {
    /// Breaking changes are major, features minor, anything else a patch.
    fn level(&self) -> ReleaseType {
        let text = self.raw_message.as_deref().unwrap_or(&self.message);
        if self.breaking
            || text.contains("BREAKING CHANGE:")
            || text.contains("BREAKING-CHANGE:")
        {
            return ReleaseType::Major;
        }
        let header = text.lines().next().unwrap_or_default().trim();
        match CONVENTIONAL.captures(header) {
            Some(caps) if caps.name("bang").is_some() => ReleaseType::Major,
            Some(caps) if caps["type"].eq_ignore_ascii_case("feat") => ReleaseType::Minor,
            _ => ReleaseType::Patch,
        }
    }
}

/// The highest level across every unreleased commit; `None` when there are none.
fn hint_from_context(raw: &str) -> NotesResult<Option<ReleaseType>> {
    let releases: Vec<ContextRelease> =
        serde_json::from_str(raw).map_err(|source| NotesError::Context {
            tool: GIT_CLIFF,
            source,
        })?;
    Ok(releases
        .iter()
        .flat_map(|release| &release.commits)
        .map(ContextCommit::level)
        .max())
}
