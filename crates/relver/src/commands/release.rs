//! Release command: thin CLI layer over `relver_core::release`.

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use clap::Args;
use owo_colors::OwoColorize;
use tracing::{debug, info, instrument};

use relver_core::git::GitCli;
use relver_core::hooks::ShellHooks;
use relver_core::release::{Collaborators, ReleaseOptions, ReleaseOutcome, plan_release};
use relver_core::Config;

use super::{SpinningNotes, VersionArgs};

/// Arguments for the `release` subcommand.
#[derive(Args, Debug, Default)]
pub struct ReleaseArgs {
    #[command(flatten)]
    pub version: VersionArgs,

    /// Show what would happen without writing files or touching git
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Leave version files untouched
    #[arg(long)]
    pub skip_bump: bool,

    /// Leave the changelog untouched
    #[arg(long)]
    pub skip_changelog: bool,

    /// Do not create the release commit
    #[arg(long)]
    pub skip_commit: bool,

    /// Do not create the release tag
    #[arg(long)]
    pub skip_tag: bool,

    /// GPG-sign the release commit and tag
    #[arg(short = 's', long)]
    pub sign: bool,

    /// Bypass git commit hooks
    #[arg(long)]
    pub no_verify: bool,

    /// Commit all staged changes, not only the files relver touched
    #[arg(short = 'a', long)]
    pub commit_all: bool,

    /// Prefix for the tag name (default: v)
    #[arg(short = 't', long, value_name = "PREFIX")]
    pub tag_prefix: Option<String>,

    /// Changelog file to update (default: CHANGELOG.md)
    #[arg(short = 'i', long, value_name = "PATH")]
    pub infile: Option<Utf8PathBuf>,
}

impl ReleaseArgs {
    /// Layer the flags over the loaded configuration.
    ///
    /// Flags only ever switch things on; a `false` flag leaves the
    /// configured value alone.
    pub fn merge_into(&self, config: &Config) -> Config {
        let mut config = config.clone();
        config.skip.bump |= self.skip_bump;
        config.skip.changelog |= self.skip_changelog;
        config.skip.commit |= self.skip_commit;
        config.skip.tag |= self.skip_tag;
        config.git.sign |= self.sign;
        config.git.no_verify |= self.no_verify;
        config.git.commit_all |= self.commit_all;
        if let Some(prefix) = &self.tag_prefix {
            config.git.tag_prefix.clone_from(prefix);
        }
        if let Some(infile) = &self.infile {
            config.changelog.path.clone_from(infile);
        }
        config
    }
}

/// Execute the release command.
#[instrument(name = "cmd_release", skip_all, fields(json_output = global_json, dry_run = args.dry_run))]
pub fn cmd_release(
    args: ReleaseArgs,
    global_json: bool,
    quiet: bool,
    config: &Config,
    cwd: &Utf8Path,
) -> anyhow::Result<()> {
    debug!("executing release command");
    let config = args.merge_into(config);

    let git = GitCli::new(cwd);
    let notes = SpinningNotes::new(
        cwd,
        config.changelog.cliff_config.as_deref(),
        global_json || quiet,
    );
    let hooks = ShellHooks::new(cwd);
    let collab = Collaborators {
        tags: &git,
        notes: &notes,
        hooks: &hooks,
        executor: &git,
    };
    let options = ReleaseOptions {
        request: args.version.to_request(),
        first_release: args.version.first_release,
        dry_run: args.dry_run,
    };

    let plan = match plan_release(cwd, &config, &options, collab) {
        Ok(plan) => plan,
        Err(e) if e.is_no_release() => {
            info!("no release necessary");
            super::report_no_release(global_json)?;
            return Ok(());
        }
        Err(e) => return Err(e).context("release planning failed"),
    };

    if !global_json {
        println!(
            "{}: {} → {}",
            "Version".bold(),
            plan.current.version.to_string().dimmed(),
            plan.next.to_string().green().bold()
        );
    }

    let outcome = plan.execute(&config, collab).context("release failed")?;

    if global_json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&outcome);
    }
    Ok(())
}

fn print_outcome(outcome: &ReleaseOutcome) {
    let mark = if outcome.dry_run { "○" } else { "✓" };

    for file in &outcome.files {
        if file.changed {
            println!(
                "  {} {} {} → {}",
                mark.green(),
                file.path.cyan(),
                file.previous.as_deref().unwrap_or("?").dimmed(),
                file.new
            );
        } else {
            println!("  {} {} {}", "–".yellow(), file.path.cyan(), "(unchanged)".dimmed());
        }
    }
    if let Some(path) = &outcome.changelog {
        println!("  {} Changelog {}", mark.green(), path.cyan());
    }
    if let Some(message) = &outcome.commit {
        println!("  {} Committed {}", mark.green(), message.dimmed());
    }
    if outcome.tagged {
        println!("  {} Tagged {}", mark.green(), outcome.tag.cyan());
    }

    println!();
    if outcome.dry_run {
        println!("{}", "Dry run, no changes made.".yellow());
    } else if outcome.tagged {
        println!(
            "{} {}",
            "Publish with:".dimmed(),
            "git push --follow-tags".bold()
        );
    }
}
