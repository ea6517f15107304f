//! Assets command: resolve the asset set without contacting the remote.

use anyhow::Context;
use clap::Args;
use owo_colors::OwoColorize;
use tracing::{debug, instrument};

use tagpress_core::assets::{AssetSet, LocalFs};
use tagpress_core::config::Config;

use super::{format_bytes, print_json, release_root};

/// Arguments for the `assets` subcommand.
#[derive(Args, Debug, Default)]
pub struct AssetsArgs {
    /// Extra files or glob patterns, appended after the configured ones
    #[arg(value_name = "PATTERN")]
    pub patterns: Vec<String>,
}

/// Execute the assets command.
#[instrument(name = "cmd_assets", skip_all)]
pub fn cmd_assets(
    args: AssetsArgs,
    global_json: bool,
    config: &Config,
    cwd: &camino::Utf8Path,
) -> anyhow::Result<()> {
    let patterns: Vec<&str> = config
        .assets
        .iter()
        .chain(&args.patterns)
        .map(String::as_str)
        .collect();
    let root = release_root(cwd);
    debug!(%root, ?patterns, "resolving assets");

    let set = AssetSet::resolve(&patterns, &LocalFs::new(&root))
        .context("failed to resolve release assets")?;

    if global_json {
        return print_json(&set);
    }

    if set.is_empty() {
        println!("{}", "No assets to attach.".dimmed());
        return Ok(());
    }

    for asset in set.assets() {
        let shown = asset.path.strip_prefix(&root).unwrap_or(asset.path.as_path());
        println!(
            "  {} {} {}",
            asset.name.bold(),
            shown.to_string().dimmed(),
            format_bytes(asset.size_bytes).dimmed(),
        );
    }
    println!(
        "{} {} asset{} ({})",
        "✓".green(),
        set.len(),
        if set.len() == 1 { "" } else { "s" },
        format_bytes(set.total_bytes()),
    );
    Ok(())
}
