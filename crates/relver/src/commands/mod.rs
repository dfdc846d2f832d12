//! Command implementations

pub mod next;

pub mod release;

pub mod status;

use std::time::Duration;

use camino::Utf8Path;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use relver_core::notes::{GitCliff, NotesGenerator, NotesRequest, NotesResult};
use relver_core::version::{BumpRequest, ReleaseType, is_release_keyword};

/// Identifier used when `--prerelease` is given without a value.
pub const DEFAULT_PRERELEASE_ID: &str = "rc";

/// Version-selection flags shared by `release` and `next`.
#[derive(Args, Debug, Default, Clone)]
pub struct VersionArgs {
    /// Release type (major, minor, patch) or an explicit version
    #[arg(short = 'r', long, value_name = "TYPE|VERSION")]
    pub release_as: Option<String>,

    /// Release as a prerelease under ID (default: rc)
    #[arg(
        short = 'p',
        long,
        value_name = "ID",
        num_args = 0..=1,
        default_missing_value = DEFAULT_PRERELEASE_ID
    )]
    pub prerelease: Option<String>,

    /// Release the current version without bumping it
    #[arg(short = 'f', long, conflicts_with = "release_as")]
    pub first_release: bool,
}

impl VersionArgs {
    /// Turn the flags into a bump request.
    ///
    /// A `--release-as` keyword is a release type; anything else is taken as
    /// a literal version. `--prerelease` alone continues (or starts) a
    /// prerelease train.
    pub fn to_request(&self) -> BumpRequest {
        let prerelease = self.prerelease.clone();
        match (self.release_as.as_deref(), prerelease) {
            (Some(text), prerelease) if is_release_keyword(text) => BumpRequest::ReleaseType {
                release_type: text.to_string(),
                prerelease,
            },
            (Some(text), prerelease) => BumpRequest::Version {
                version: text.to_string(),
                prerelease,
            },
            (None, Some(identifier)) => BumpRequest::ContinuePrerelease {
                identifier,
                hint: None,
            },
            (None, None) => BumpRequest::Automatic {
                hint: None,
                prerelease: None,
            },
        }
    }
}

/// Tell the user there is nothing to release. Not an error.
pub(crate) fn report_no_release(global_json: bool) -> anyhow::Result<()> {
    if global_json {
        let report = serde_json::json!({
            "released": false,
            "reason": "no release necessary",
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "{} {}",
            "○".yellow(),
            "No release necessary: no changes warrant a new version.".dimmed()
        );
    }
    Ok(())
}

/// Spinner on stderr, hidden when output is for machines or silenced.
pub(crate) fn spinner(message: &str, hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        spinner.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", " "]));
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

/// `git-cliff` with a progress spinner around each invocation.
pub(crate) struct SpinningNotes {
    inner: GitCliff,
    hidden: bool,
}

impl SpinningNotes {
    /// `cliff_config` is resolved against `root` when relative.
    pub(crate) fn new(root: &Utf8Path, cliff_config: Option<&Utf8Path>, hidden: bool) -> Self {
        let mut inner = GitCliff::new(root);
        if let Some(path) = cliff_config {
            inner = inner.with_config(root.join(path));
        }
        Self { inner, hidden }
    }
}

impl NotesGenerator for SpinningNotes {
    fn render(&self, request: &NotesRequest) -> NotesResult<Vec<String>> {
        let spinner = spinner("Generating release notes...", self.hidden);
        let result = self.inner.render(request);
        spinner.finish_and_clear();
        result
    }

    fn bump_hint(&self) -> NotesResult<Option<ReleaseType>> {
        let spinner = spinner("Analyzing commits...", self.hidden);
        let result = self.inner.bump_hint();
        spinner.finish_and_clear();
        result
    }
}
