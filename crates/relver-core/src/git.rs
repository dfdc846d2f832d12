//! Git operations for the release commit and tag.
//!
//! Shells out to `git` so the user's signing keys, hooks and config apply.
//! The pipeline only sees the [`TagLister`] and [`ProcessExecutor`] traits;
//! [`GitCli`] is the implementation backed by the real binary.

use std::process::Command;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::version::SemanticVersion;

/// Errors from git operations.
#[derive(Error, Debug)]
pub enum GitError {
    /// Failed to execute the `git` command.
    #[error("failed to run git: {0}")]
    Exec(#[from] std::io::Error),

    /// `git` returned a non-zero exit code.
    #[error("git {command} failed: {stderr}")]
    Command {
        /// The git subcommand that failed (e.g., "commit").
        command: String,
        /// Captured stderr.
        stderr: String,
    },

    /// Not inside a git repository.
    #[error("not a git repository (or any parent up to mount point)")]
    NotARepo,
}

/// Result alias for git operations.
pub type GitResult<T> = Result<T, GitError>;

/// Source of existing release tags.
pub trait TagLister {
    /// Every tag name in the repository, in no particular order.
    fn version_tags(&self) -> GitResult<Vec<String>>;
}

/// Options for the release commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitRequest {
    /// Commit message, already interpolated.
    pub message: String,
    /// Paths to commit. Ignored when `all` is set.
    pub paths: Vec<Utf8PathBuf>,
    /// Commit everything staged instead of only `paths`.
    pub all: bool,
    /// GPG-sign (`-S`).
    pub sign: bool,
    /// Skip commit hooks (`--no-verify`).
    pub no_verify: bool,
}

/// Options for the release tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagRequest {
    /// Tag name, e.g. `v1.2.3`.
    pub name: String,
    /// Annotation message.
    pub message: String,
    /// Create a signed tag (`-s`) instead of an annotated one (`-a`).
    pub sign: bool,
}

/// Side-effecting repository operations used after files are written.
pub trait ProcessExecutor {
    /// Stage paths for commit.
    fn stage(&self, paths: &[Utf8PathBuf]) -> GitResult<()>;
    /// Create the release commit.
    fn commit(&self, request: &CommitRequest) -> GitResult<()>;
    /// Create the release tag.
    fn tag(&self, request: &TagRequest) -> GitResult<()>;
}

/// `git` binary rooted at a working directory.
#[derive(Debug, Clone)]
pub struct GitCli {
    root: Utf8PathBuf,
}

impl GitCli {
    /// Run git commands in `root`.
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The working directory commands run in.
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn git(&self, args: &[&str]) -> GitResult<String> {
        let output = Command::new("git")
            .arg("-C")
            .arg(self.root.as_std_path())
            .args(args)
            .output()?;

        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if stderr.contains("not a git repository") {
            return Err(GitError::NotARepo);
        }
        Err(GitError::Command {
            command: args.first().copied().unwrap_or_default().to_string(),
            stderr,
        })
    }
}

impl TagLister for GitCli {
    #[instrument(skip(self), fields(root = %self.root))]
    fn version_tags(&self) -> GitResult<Vec<String>> {
        let output = self.git(&["tag", "--list"])?;
        let tags: Vec<String> = output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        debug!(count = tags.len(), "listed tags");
        Ok(tags)
    }
}

impl ProcessExecutor for GitCli {
    #[instrument(skip(self), fields(root = %self.root))]
    fn stage(&self, paths: &[Utf8PathBuf]) -> GitResult<()> {
        if paths.is_empty() {
            return Ok(());
        }
        let mut args = vec!["add", "--"];
        args.extend(paths.iter().map(|p| p.as_str()));
        self.git(&args)?;
        Ok(())
    }

    #[instrument(skip(self), fields(root = %self.root, message = %request.message))]
    fn commit(&self, request: &CommitRequest) -> GitResult<()> {
        let mut args = vec!["commit"];
        if request.no_verify {
            args.push("--no-verify");
        }
        if request.sign {
            args.push("-S");
        }
        args.extend(["-m", request.message.as_str()]);
        if !request.all {
            args.push("--");
            args.extend(request.paths.iter().map(|p| p.as_str()));
        }
        self.git(&args)?;
        debug!("release commit created");
        Ok(())
    }

    #[instrument(skip(self), fields(root = %self.root, tag = %request.name))]
    fn tag(&self, request: &TagRequest) -> GitResult<()> {
        let kind = if request.sign { "-s" } else { "-a" };
        self.git(&["tag", kind, &request.name, "-m", &request.message])?;
        debug!("release tag created");
        Ok(())
    }
}

/// The highest version among tags carrying `prefix`.
///
/// Tags that are not valid versions once the prefix is removed are skipped.
pub fn highest_version_tag(tags: &[String], prefix: &str) -> Option<SemanticVersion> {
    tags.iter()
        .filter_map(|tag| tag.strip_prefix(prefix))
        .filter_map(|rest| SemanticVersion::parse(rest).ok())
        .max()
}
