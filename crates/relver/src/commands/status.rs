//! Status command: show where the version comes from and what a bump touches.

use anyhow::Context;
use camino::Utf8Path;
use clap::Args;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use relver_core::config::{self, Config};
use relver_core::files::FileDescriptor;
use relver_core::git::GitCli;
use relver_core::notes::GitCliff;
use relver_core::update::{self, VersionSource};

/// Arguments for the `status` subcommand.
#[derive(Args, Debug, Default)]
pub struct StatusArgs {
    // No subcommand-specific arguments; uses global --json flag
}

#[derive(Serialize)]
struct CurrentInfo {
    version: String,
    source: VersionSource,
}

#[derive(Serialize)]
struct BumpFileInfo {
    path: String,
    kind: String,
    version: Option<String>,
}

#[derive(Serialize)]
struct StatusReport {
    config_file: Option<String>,
    current: Option<CurrentInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    current_error: Option<String>,
    bump_files: Vec<BumpFileInfo>,
    changelog: String,
    changelog_exists: bool,
    tag_prefix: String,
    git_cliff: bool,
}

fn describe(root: &Utf8Path, descriptor: &FileDescriptor) -> BumpFileInfo {
    let version = std::fs::read_to_string(root.join(&descriptor.path))
        .ok()
        .and_then(|contents| match descriptor.kind.extract(&contents) {
            Ok(found) => found,
            Err(e) => {
                warn!(path = %descriptor.path, error = %e, "unreadable version file");
                None
            }
        });
    BumpFileInfo {
        path: descriptor.path.to_string(),
        kind: descriptor.kind.to_string(),
        version,
    }
}

impl StatusReport {
    fn gather(config: &Config, cwd: &Utf8Path) -> anyhow::Result<Self> {
        let git = GitCli::new(cwd);
        let (current, current_error) = match update::current_version(cwd, config, &git) {
            Ok(found) => (
                Some(CurrentInfo {
                    version: found.version.to_string(),
                    source: found.source,
                }),
                None,
            ),
            Err(e) => (None, Some(e.to_string())),
        };

        let set = update::bump_set_for(cwd, config).context("failed to resolve the bump set")?;
        let bump_files = set.iter().map(|d| describe(cwd, d)).collect();

        Ok(Self {
            config_file: config::find_project_config(cwd).map(|p| p.to_string()),
            current,
            current_error,
            bump_files,
            changelog: config.changelog.path.to_string(),
            changelog_exists: cwd.join(&config.changelog.path).is_file(),
            tag_prefix: config.git.tag_prefix.clone(),
            git_cliff: GitCliff::is_available(),
        })
    }
}

/// Print the release status of the project in `cwd`.
#[instrument(name = "cmd_status", skip_all, fields(json_output = global_json))]
pub fn cmd_status(
    _args: StatusArgs,
    global_json: bool,
    config: &Config,
    cwd: &Utf8Path,
) -> anyhow::Result<()> {
    debug!("executing status command");
    let report = StatusReport::gather(config, cwd)?;

    if global_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", "Version".bold().underline());
    match (&report.current, &report.current_error) {
        (Some(current), _) => {
            let source = match &current.source {
                VersionSource::PackageFile { path } => path.to_string(),
                VersionSource::Tag { name } => format!("tag {name}"),
                VersionSource::Initial => "no package file or tags".to_string(),
            };
            println!(
                "  {} {} {}",
                "✓".green(),
                current.version.green().bold(),
                format!("({source})").dimmed()
            );
        }
        (None, Some(err)) => println!("  {} {}", "✗".red(), err),
        (None, None) => {}
    }

    println!();
    println!("{}", "Bump files".bold().underline());
    if report.bump_files.is_empty() {
        println!("  {} {}", "○".yellow(), "none found".yellow());
    }
    for file in &report.bump_files {
        println!(
            "  {} {} {}",
            file.path.cyan(),
            file.version.as_deref().unwrap_or("-"),
            format!("[{}]", file.kind).dimmed()
        );
    }

    println!();
    println!("{}", "Release".bold().underline());
    let changelog_state = if report.changelog_exists { "" } else { " (will be created)" };
    println!(
        "{}: {}{}",
        "Changelog".dimmed(),
        report.changelog.cyan(),
        changelog_state.dimmed()
    );
    println!("{}: {}", "Tag prefix".dimmed(), report.tag_prefix);
    if let Some(ref path) = report.config_file {
        println!("{}: {}", "Config file".dimmed(), path.cyan());
    } else {
        println!("{}: {}", "Config file".dimmed(), "none found".yellow());
    }
    if report.git_cliff {
        println!("{}: {}", "Notes".dimmed(), "git-cliff".green());
    } else {
        println!(
            "{}: {}",
            "Notes".dimmed(),
            "git-cliff not found (use --skip-changelog or --release-as)".yellow()
        );
    }

    Ok(())
}
