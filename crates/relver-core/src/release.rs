//! Release planning and execution.
//!
//! All orchestration lives here; the CLI only gathers options and renders
//! the outcome.
//!
//! # Two-phase workflow
//!
//! 1. **Plan** ([`plan_release`]): validate the changelog header, run
//!    `pre_bump` hooks, read the current version, resolve the next one and
//!    let `post_version` hooks override it.
//! 2. **Execute** ([`ReleasePlan::execute`]): rewrite version files, merge
//!    the changelog, commit and tag, running the matching hooks after each
//!    step.
//!
//! Nothing is rolled back: a failure part-way through leaves earlier writes
//! in place.

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::changelog::{self, ChangelogError};
use crate::config::Config;
use crate::git::{CommitRequest, GitError, ProcessExecutor, TagLister, TagRequest};
use crate::hooks::{self, HookContext, HookError, HookPhase, HookRunner};
use crate::notes::{self, NotesError, NotesGenerator, NotesRequest};
use crate::update::{self, CurrentVersion, FileUpdate, UpdateError};
use crate::version::{self, BumpRequest, SemanticVersion, VersionError};

// ──────────────────────────────────────────────
// Errors
// ──────────────────────────────────────────────

/// Errors from the release pipeline.
#[derive(Error, Debug)]
pub enum ReleaseError {
    /// Version resolution failed, or there is nothing to release.
    #[error(transparent)]
    Version(#[from] VersionError),

    /// Reading or rewriting version files failed.
    #[error(transparent)]
    Update(#[from] UpdateError),

    /// The changelog could not be merged.
    #[error(transparent)]
    Changelog(#[from] ChangelogError),

    /// A lifecycle hook failed.
    #[error(transparent)]
    Hook(#[from] HookError),

    /// Committing or tagging failed.
    #[error(transparent)]
    Git(#[from] GitError),

    /// The notes generator failed.
    #[error(transparent)]
    Notes(#[from] NotesError),
}

impl ReleaseError {
    /// Whether this is the "nothing to release" outcome rather than a failure.
    pub const fn is_no_release(&self) -> bool {
        matches!(self, Self::Version(e) if e.is_no_release())
    }
}

/// Result alias for release operations.
pub type ReleaseResult<T> = Result<T, ReleaseError>;

// ──────────────────────────────────────────────
// Inputs
// ──────────────────────────────────────────────

/// Per-run options that are not part of the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseOptions {
    /// What kind of bump was asked for.
    pub request: BumpRequest,
    /// Release the current version as-is (no file bump).
    pub first_release: bool,
    /// Compute everything, write nothing.
    pub dry_run: bool,
}

/// External collaborators the pipeline talks to.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    /// Existing tags, for the current-version fallback.
    pub tags: &'a dyn TagLister,
    /// Release notes and the automatic bump hint.
    pub notes: &'a dyn NotesGenerator,
    /// Lifecycle hooks.
    pub hooks: &'a dyn HookRunner,
    /// Staging, committing and tagging.
    pub executor: &'a dyn ProcessExecutor,
}

// ──────────────────────────────────────────────
// Plan
// ──────────────────────────────────────────────

/// A resolved release, ready to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleasePlan {
    /// Project root.
    pub root: Utf8PathBuf,
    /// The version before this release and where it came from.
    pub current: CurrentVersion,
    /// The version being released.
    pub next: SemanticVersion,
    /// Tag name for `next`.
    pub tag: String,
    /// Release `current` as-is.
    pub first_release: bool,
    /// Nothing is written when set.
    pub dry_run: bool,
}

impl ReleasePlan {
    fn hook_context(&self, config: &Config) -> HookContext {
        HookContext {
            version: self.next.to_string(),
            prev_version: self.current.version.to_string(),
            tag: self.tag.clone(),
            changelog_path: config.changelog.path.to_string(),
        }
    }
}

/// Fill in a missing release-type hint from the notes generator.
fn with_hint(
    request: &BumpRequest,
    current: &SemanticVersion,
    notes: &dyn NotesGenerator,
) -> ReleaseResult<BumpRequest> {
    let needs_hint = match request {
        BumpRequest::Automatic { hint: None, .. } => true,
        BumpRequest::ContinuePrerelease {
            identifier,
            hint: None,
        } => current.prerelease_identifier() != Some(identifier.as_str()),
        _ => false,
    };
    if !needs_hint {
        return Ok(request.clone());
    }

    let hint = notes.bump_hint()?;
    debug!(?hint, "release type hint");
    Ok(match request.clone() {
        BumpRequest::Automatic { prerelease, .. } => BumpRequest::Automatic { hint, prerelease },
        BumpRequest::ContinuePrerelease { identifier, .. } => {
            BumpRequest::ContinuePrerelease { identifier, hint }
        }
        other => other,
    })
}

/// Work out what to release.
///
/// Validation happens before anything runs: a bad changelog header fails
/// here without touching disk. Version-phase hooks (`pre_bump`,
/// `post_version`) run even in dry runs because they can change the version.
#[instrument(skip_all, fields(%root, dry_run = options.dry_run, first_release = options.first_release))]
pub fn plan_release(
    root: &Utf8Path,
    config: &Config,
    options: &ReleaseOptions,
    collab: Collaborators<'_>,
) -> ReleaseResult<ReleasePlan> {
    if !config.skip.changelog {
        changelog::validate_header(&config.changelog.header)?;
    }

    let base = HookContext {
        changelog_path: config.changelog.path.to_string(),
        ..HookContext::default()
    };
    collab
        .hooks
        .run(HookPhase::PreBump, &config.hooks.pre_bump, &base)?;

    let current = update::current_version(root, config, collab.tags)?;
    info!(current = %current.version, source = ?current.source, "current version");

    let resolved = if options.first_release {
        current.version.clone()
    } else {
        let request = with_hint(&options.request, &current.version, collab.notes)?;
        version::resolve(&current.version, &request)?
    };

    let resolved_tag = format!("{}{resolved}", config.git.tag_prefix);
    let outputs = collab.hooks.run(
        HookPhase::PostVersion,
        &config.hooks.post_version,
        &HookContext {
            version: resolved.to_string(),
            prev_version: current.version.to_string(),
            tag: resolved_tag,
            ..base
        },
    )?;
    let next = version::apply_override(resolved, hooks::last_stdout_line(&outputs))?;
    let tag = format!("{}{next}", config.git.tag_prefix);

    info!(%next, %tag, "release planned");
    Ok(ReleasePlan {
        root: root.to_path_buf(),
        current,
        next,
        tag,
        first_release: options.first_release,
        dry_run: options.dry_run,
    })
}

// ──────────────────────────────────────────────
// Execute
// ──────────────────────────────────────────────

/// What a release did (or, in a dry run, would do).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseOutcome {
    /// Version before the release.
    pub previous: SemanticVersion,
    /// Version released.
    pub version: SemanticVersion,
    /// Tag name.
    pub tag: String,
    /// Per-file results of the version bump.
    pub files: Vec<FileUpdate>,
    /// Changelog path, when it was merged.
    pub changelog: Option<Utf8PathBuf>,
    /// Commit message, when a commit was made.
    pub commit: Option<String>,
    /// Whether the tag was created.
    pub tagged: bool,
    /// Nothing was written.
    pub dry_run: bool,
}

impl ReleasePlan {
    /// Carry out the plan.
    ///
    /// Steps run in order (bump, changelog, commit, tag), each followed by
    /// its hooks. Skipped steps are governed by `config.skip`. A dry run
    /// computes file and changelog changes but writes nothing, runs no hooks
    /// and touches no git state.
    #[instrument(skip_all, fields(next = %self.next, dry_run = self.dry_run))]
    pub fn execute(&self, config: &Config, collab: Collaborators<'_>) -> ReleaseResult<ReleaseOutcome> {
        let context = self.hook_context(config);
        let run_hooks = |phase: HookPhase, commands: &[String]| -> ReleaseResult<()> {
            if !self.dry_run {
                collab.hooks.run(phase, commands, &context)?;
            }
            Ok(())
        };

        // Version files
        let files = if config.skip.bump || self.first_release {
            debug!("version files left alone");
            Vec::new()
        } else {
            let set = update::bump_set_for(&self.root, config)?;
            update::apply_bump_set(&self.root, &set, &self.next, self.dry_run)?
        };
        run_hooks(HookPhase::PostBump, &config.hooks.post_bump)?;

        // Changelog
        let changelog = if config.skip.changelog {
            None
        } else {
            let chunks = collab.notes.render(&NotesRequest {
                version: self.next.clone(),
                tag: self.tag.clone(),
            })?;
            let path = self.root.join(&config.changelog.path);
            changelog::update_changelog(
                &path,
                &config.changelog.header,
                &notes::concat(&chunks),
                &self.next,
                self.dry_run,
            )?;
            run_hooks(HookPhase::PostChangelog, &config.hooks.post_changelog)?;
            Some(config.changelog.path.clone())
        };

        // Commit
        let message = hooks::interpolate(&config.git.commit_message, &context);
        let mut paths: Vec<Utf8PathBuf> = files
            .iter()
            .filter(|update| update.changed)
            .map(|update| update.path.clone())
            .collect();
        paths.extend(changelog.iter().cloned());

        let commit = if config.skip.commit {
            None
        } else if paths.is_empty() && !config.git.commit_all {
            warn!("nothing changed, skipping commit");
            None
        } else {
            if !self.dry_run {
                collab.executor.stage(&paths)?;
                collab.executor.commit(&CommitRequest {
                    message: message.clone(),
                    paths,
                    all: config.git.commit_all,
                    sign: config.git.sign,
                    no_verify: config.git.no_verify,
                })?;
            }
            run_hooks(HookPhase::PostCommit, &config.hooks.post_commit)?;
            Some(message.clone())
        };

        // Tag
        let tagged = !config.skip.tag;
        if tagged {
            if !self.dry_run {
                collab.executor.tag(&TagRequest {
                    name: self.tag.clone(),
                    message,
                    sign: config.git.sign,
                })?;
            }
            run_hooks(HookPhase::PostTag, &config.hooks.post_tag)?;
        }

        info!(
            previous = %self.current.version,
            version = %self.next,
            files = files.len(),
            tagged,
            "release complete"
        );

        Ok(ReleaseOutcome {
            previous: self.current.version.clone(),
            version: self.next.clone(),
            tag: self.tag.clone(),
            files,
            changelog,
            commit,
            tagged,
            dry_run: self.dry_run,
        })
    }
}
