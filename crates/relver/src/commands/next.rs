//! Next command: print the version the next release would get.

use anyhow::Context;
use camino::Utf8Path;
use clap::Args;
use tracing::{debug, instrument};

use relver_core::git::GitCli;
use relver_core::hooks::ShellHooks;
use relver_core::release::{Collaborators, ReleaseOptions, plan_release};
use relver_core::Config;

use super::{SpinningNotes, VersionArgs};

/// Arguments for the `next` subcommand.
#[derive(Args, Debug, Default)]
pub struct NextArgs {
    #[command(flatten)]
    pub version: VersionArgs,

    /// Prefix for the tag name (default: v)
    #[arg(short = 't', long, value_name = "PREFIX")]
    pub tag_prefix: Option<String>,
}

/// Execute the next command.
///
/// Planning runs the `pre_bump` and `post_version` hooks, since they can
/// change the answer. Nothing else is run or written.
#[instrument(name = "cmd_next", skip_all, fields(json_output = global_json))]
pub fn cmd_next(
    args: NextArgs,
    global_json: bool,
    quiet: bool,
    config: &Config,
    cwd: &Utf8Path,
) -> anyhow::Result<()> {
    debug!("executing next command");
    let mut config = config.clone();
    if let Some(prefix) = args.tag_prefix {
        config.git.tag_prefix = prefix;
    }

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
        dry_run: true,
    };

    let plan = match plan_release(cwd, &config, &options, collab) {
        Ok(plan) => plan,
        Err(e) if e.is_no_release() => return super::report_no_release(global_json),
        Err(e) => return Err(e).context("failed to determine the next version"),
    };

    if global_json {
        let report = serde_json::json!({
            "current": plan.current.version,
            "source": plan.current.source,
            "next": plan.next,
            "tag": plan.tag,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", plan.next);
    }
    Ok(())
}
