//! Publish command: thin CLI layer over `tagpress_core::publish`.

use std::time::Duration;

use anyhow::bail;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tracing::{debug, instrument};

use tagpress_core::config::Config;
use tagpress_core::context::RepositoryContext;
use tagpress_core::github::GhClient;
use tagpress_core::notes::FileChangelog;
use tagpress_core::publish::{PublishEvent, PublishOutcome, ReleasePublisher};
use tagpress_core::release::ReleaseRecord;
use tagpress_core::{LocalFs, plan_release};

use super::{format_bytes, print_json, release_root};

/// Arguments for the `publish` subcommand.
#[derive(Args, Debug, Default)]
pub struct PublishArgs {
    /// Extra files or glob patterns to attach, after the configured ones
    #[arg(value_name = "PATTERN")]
    pub patterns: Vec<String>,

    /// Create the release as a draft (overrides config)
    #[arg(long)]
    pub draft: bool,

    /// Mark the release as a pre-release (overrides config)
    #[arg(long)]
    pub prerelease: bool,
}

/// Execute the publish command.
#[instrument(name = "cmd_publish", skip_all)]
pub fn cmd_publish(
    args: PublishArgs,
    global_json: bool,
    config: &Config,
    cwd: &camino::Utf8Path,
) -> anyhow::Result<()> {
    let mut config = config.clone();
    config.draft_release |= args.draft;
    config.pre_release |= args.prerelease;

    let context = RepositoryContext::from_env(config.allow_tag_prefix)?;
    let root = release_root(cwd);
    debug!(%root, repository = %context.repository(), "publishing");

    let changelog = FileChangelog::new(root.join(config.changelog_file.trim()));
    let record = plan_release(
        &config,
        &context,
        &changelog,
        &LocalFs::new(&root),
        &args.patterns,
    )?;

    if !global_json {
        print_header(&record, &context);
    }

    let client = GhClient::new(&context)?;
    let publisher = ReleasePublisher::new(config.allow_empty_changelog);

    let mut spinner: Option<ProgressBar> = None;
    let outcome = publisher.publish(record, &client, |event| {
        if !global_json {
            handle_event(event, &mut spinner);
        }
    })?;

    if global_json {
        print_json(&outcome)?;
    } else {
        print_summary(&outcome);
    }

    if !outcome.is_success() {
        bail!(
            "{} of {} assets failed to upload",
            outcome.failed.len(),
            outcome.assets.len()
        );
    }
    Ok(())
}

fn print_header(record: &ReleaseRecord, context: &RepositoryContext) {
    println!(
        "\n{}: {} → {}",
        "Publish".bold(),
        record.name.green().bold(),
        context.repository(),
    );
    let mut flags = Vec::new();
    if record.draft {
        flags.push("draft");
    }
    if record.pre_release {
        flags.push("pre-release");
    }
    println!(
        "{}: {} | {}: {}{}",
        "Tag".dimmed(),
        record.tag,
        "Assets".dimmed(),
        record.assets.len(),
        if flags.is_empty() {
            String::new()
        } else {
            format!(" | {}", flags.join(", ").yellow())
        },
    );
    println!();
}

/// Draw progress for a publish event.
fn handle_event(event: PublishEvent, spinner: &mut Option<ProgressBar>) {
    match event {
        PublishEvent::ReleaseCreated(release) => {
            println!(
                "  {} {} {}",
                "✓".green(),
                "release created".bold(),
                release.url.unwrap_or_default().dimmed(),
            );
        }
        PublishEvent::UploadStarted {
            index,
            total,
            asset,
        } => {
            let bar = ProgressBar::new_spinner();
            bar.set_style(
                ProgressStyle::with_template("  {spinner:.cyan} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner())
                    .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
            bar.set_message(format!("[{}/{total}] uploading {}...", index + 1, asset.name));
            bar.enable_steady_tick(Duration::from_millis(80));
            *spinner = Some(bar);
        }
        PublishEvent::UploadFinished { asset, error, .. } => {
            if let Some(bar) = spinner.take() {
                bar.finish_and_clear();
            }
            match error {
                None => println!(
                    "  {} {} {}",
                    "✓".green(),
                    asset.name.bold(),
                    format_bytes(asset.size_bytes).dimmed(),
                ),
                Some(err) => println!(
                    "  {} {} {}",
                    "✗".red(),
                    asset.name.bold(),
                    err.source.to_string().dimmed(),
                ),
            }
        }
    }
}

/// One summary line, plus the per-asset breakdown when anything failed.
fn print_summary(outcome: &PublishOutcome) {
    println!();
    if outcome.is_success() {
        println!(
            "{} Published {} with {} asset{}",
            "✓".green().bold(),
            outcome.tag.green().bold(),
            outcome.assets.len(),
            if outcome.assets.len() == 1 { "" } else { "s" },
        );
        if let Some(ref url) = outcome.release_url {
            println!("  {}", url.dimmed());
        }
        return;
    }

    println!(
        "{} Published {} but {} of {} assets failed ({})",
        "✗".red().bold(),
        outcome.tag.bold(),
        outcome.failed.len(),
        outcome.assets.len(),
        outcome.state,
    );
    for asset in outcome.uploaded() {
        println!("  {} {}", "uploaded".green(), asset.name);
    }
    for failure in &outcome.failed {
        println!(
            "  {} {}: {}",
            "failed".red(),
            failure.asset.name,
            failure.error.source
        );
    }
}
