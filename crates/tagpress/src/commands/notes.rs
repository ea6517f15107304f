//! Notes command: print the release notes a publish run would use.

use anyhow::Context;
use camino::Utf8PathBuf;
use clap::Args;
use serde::Serialize;
use tracing::{debug, instrument};

use tagpress_core::config::Config;
use tagpress_core::context;
use tagpress_core::notes::{self, FileChangelog};
use tagpress_core::publish::PublishError;

use super::{env_var, release_root};

/// Arguments for the `notes` subcommand.
#[derive(Args, Debug, Default)]
pub struct NotesArgs {
    /// Version to look up (default: the tag in GITHUB_REF)
    #[arg(long, value_name = "VERSION")]
    pub version: Option<String>,

    /// Changelog to read (overrides configuration)
    #[arg(long, value_name = "FILE")]
    pub file: Option<Utf8PathBuf>,
}

#[derive(Debug, Serialize)]
struct NotesOutput {
    version: String,
    changelog: Option<Utf8PathBuf>,
    notes: String,
}

/// Execute the notes command.
#[instrument(name = "cmd_notes", skip_all)]
pub fn cmd_notes(
    args: NotesArgs,
    global_json: bool,
    config: &Config,
    cwd: &camino::Utf8Path,
) -> anyhow::Result<()> {
    let version = resolve_version(args.version.as_deref(), env_var, config.allow_tag_prefix)?;

    let root = release_root(cwd);
    let changelog = match args.file {
        Some(file) => Some(cwd.join(file)),
        None => config.changelog_path(&root),
    };
    debug!(%version, ?changelog, "looking up release notes");

    let body = match changelog {
        Some(ref path) => notes::extract(&FileChangelog::new(path), &version, config.allow_tag_prefix)
            .context("failed to read release notes")?,
        None => String::new(),
    };

    if body.is_empty() && !config.allow_empty_changelog {
        return Err(PublishError::EmptyChangelog { tag: version }.into());
    }

    if global_json {
        return super::print_json(&NotesOutput {
            version,
            changelog,
            notes: body,
        });
    }

    println!("{body}");
    Ok(())
}

/// The explicit `--version`, or the version of the tag in `GITHUB_REF`.
fn resolve_version<F>(
    explicit: Option<&str>,
    lookup: F,
    allow_tag_prefix: bool,
) -> anyhow::Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(version) = explicit {
        return Ok(normalize(version).to_string());
    }
    let (_, version) = context::tag_from_lookup(lookup, allow_tag_prefix)
        .context("no --version given and GITHUB_REF is not usable")?;
    Ok(version)
}

/// Drop a leading `v` from an explicit version (`v1.2.3` → `1.2.3`).
fn normalize(version: &str) -> &str {
    let version = version.trim();
    match version.strip_prefix('v') {
        Some(rest) if rest.starts_with(|c: char| c.is_ascii_digit()) => rest,
        _ => version,
    }
}
