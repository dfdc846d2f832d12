//! Lifecycle hook runner.
//!
//! Hooks are user-configured shell commands that run at fixed points of the
//! release pipeline. Each command runs through `sh -c` in the project root,
//! one after another; the first failure stops the list.
//!
//! # Variables
//!
//! `{version}`, `{prev_version}`, `{tag}` and `{changelog_path}` are replaced
//! before the command is handed to the shell.

use std::process::Command;
use std::time::{Duration, Instant};

use camino::Utf8Path;
use thiserror::Error;
use tracing::{debug, instrument};

/// Errors from hook execution.
#[derive(Error, Debug)]
pub enum HookError {
    /// A hook command exited with a non-zero status.
    #[error("{phase} hook failed: {command}{}", stderr_suffix(.stderr))]
    CommandFailed {
        /// Lifecycle point the hook belongs to.
        phase: HookPhase,
        /// The command as configured.
        command: String,
        /// The exit code, if the process was not killed by a signal.
        exit_code: Option<i32>,
        /// Captured stderr.
        stderr: String,
    },

    /// Failed to spawn a hook command.
    #[error("failed to execute {phase} hook: {source}")]
    Exec {
        /// Lifecycle point the hook belongs to.
        phase: HookPhase,
        /// The spawn error.
        source: std::io::Error,
    },
}

fn stderr_suffix(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {stderr}")
    }
}

/// Result alias for hook operations.
pub type HookResult<T> = Result<T, HookError>;

/// Points in the pipeline where hooks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPhase {
    /// Before the current version is read.
    PreBump,
    /// After the next version is resolved.
    PostVersion,
    /// After version files are written.
    PostBump,
    /// After the changelog is merged.
    PostChangelog,
    /// After the release commit.
    PostCommit,
    /// After the release tag.
    PostTag,
}

impl HookPhase {
    /// The config key for this phase.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PreBump => "pre_bump",
            Self::PostVersion => "post_version",
            Self::PostBump => "post_bump",
            Self::PostChangelog => "post_changelog",
            Self::PostCommit => "post_commit",
            Self::PostTag => "post_tag",
        }
    }
}

impl std::fmt::Display for HookPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Values substituted into hook commands.
#[derive(Debug, Clone, Default)]
pub struct HookContext {
    /// The version being released (e.g., `1.2.3`). Empty before resolution.
    pub version: String,
    /// The version before this release.
    pub prev_version: String,
    /// The release tag (e.g., `v1.2.3`).
    pub tag: String,
    /// Path to the changelog file.
    pub changelog_path: String,
}

/// Outcome of one hook command.
#[derive(Debug, Clone)]
pub struct HookOutput {
    /// The command as configured, before interpolation.
    pub command: String,
    /// Captured stdout.
    pub stdout: String,
    /// How long the command took.
    pub duration: Duration,
}

/// Runs hook commands.
///
/// The pipeline calls hooks through this trait so tests can observe them
/// without spawning processes.
pub trait HookRunner {
    /// Run `commands` in order for `phase`, stopping at the first failure.
    fn run(
        &self,
        phase: HookPhase,
        commands: &[String],
        context: &HookContext,
    ) -> HookResult<Vec<HookOutput>>;
}

/// Runs hooks through `sh -c` in a fixed directory.
#[derive(Debug, Clone)]
pub struct ShellHooks<'a> {
    root: &'a Utf8Path,
}

impl<'a> ShellHooks<'a> {
    /// Run hooks with `root` as the working directory.
    pub const fn new(root: &'a Utf8Path) -> Self {
        Self { root }
    }
}

impl HookRunner for ShellHooks<'_> {
    #[instrument(skip_all, fields(%phase, count = commands.len()))]
    fn run(
        &self,
        phase: HookPhase,
        commands: &[String],
        context: &HookContext,
    ) -> HookResult<Vec<HookOutput>> {
        commands
            .iter()
            .map(|command| run_single(phase, command, context, self.root))
            .collect()
    }
}

fn run_single(
    phase: HookPhase,
    command: &str,
    context: &HookContext,
    root: &Utf8Path,
) -> HookResult<HookOutput> {
    let interpolated = interpolate(command, context);
    debug!(%interpolated, "running hook");

    let start = Instant::now();
    let output = Command::new("sh")
        .args(["-c", &interpolated])
        .current_dir(root.as_std_path())
        .output()
        .map_err(|source| HookError::Exec { phase, source })?;
    let duration = start.elapsed();

    if !output.status.success() {
        return Err(HookError::CommandFailed {
            phase,
            command: command.to_string(),
            exit_code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    debug!(?duration, "hook finished");
    Ok(HookOutput {
        command: command.to_string(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        duration,
    })
}

/// Replace `{var}` placeholders with values from the context.
///
/// Unknown placeholders are left alone.
pub fn interpolate(command: &str, context: &HookContext) -> String {
    command
        .replace("{version}", &context.version)
        .replace("{prev_version}", &context.prev_version)
        .replace("{tag}", &context.tag)
        .replace("{changelog_path}", &context.changelog_path)
}

/// The last non-empty stdout line across `outputs`, trimmed.
///
/// This is what a `post_version` hook uses to replace the resolved version.
pub fn last_stdout_line(outputs: &[HookOutput]) -> Option<&str> {
    outputs
        .iter()
        .rev()
        .flat_map(|output| output.stdout.lines().rev())
        .map(str::trim)
        .find(|line| !line.is_empty())
}
