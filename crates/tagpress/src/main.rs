//! Entry point for the `tagpress` binary.

use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use tagpress::{Cli, Commands, commands};
use tagpress_core::config::{Config, ConfigLoader};
use tracing::debug;

mod observability;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    cli.color.apply();

    let cwd = working_dir(cli.chdir.as_deref())?;
    let config = load_config(cli.config.as_deref(), &cwd)?;

    let logging = observability::ObservabilityConfig::from_env_with_overrides(
        config.log_dir.clone().map(Utf8PathBuf::into_std_path_buf),
        cli.color.stderr_ansi(),
    );
    let filter = observability::env_filter(cli.quiet, cli.verbose, config.log_level.as_str());
    let _guard = observability::init_observability(&logging, filter)
        .context("failed to initialize logging")?;
    debug!(%cwd, json = cli.json, verbose = cli.verbose, "starting");

    run(cli.command, cli.json, &config, &cwd)
        .inspect_err(|err| debug!(error = %err, "command failed"))
}

fn run(command: Commands, json: bool, config: &Config, cwd: &Utf8Path) -> anyhow::Result<()> {
    match command {
        Commands::Publish(args) => commands::publish::cmd_publish(args, json, config, cwd),
        Commands::Notes(args) => commands::notes::cmd_notes(args, json, config, cwd),
        Commands::Assets(args) => commands::assets::cmd_assets(args, json, config, cwd),
    }
}

/// Apply `-C` and return the directory the command runs in.
fn working_dir(chdir: Option<&Path>) -> anyhow::Result<Utf8PathBuf> {
    if let Some(dir) = chdir {
        std::env::set_current_dir(dir)
            .with_context(|| format!("failed to change directory to {}", dir.display()))?;
    }
    let cwd = std::env::current_dir().context("failed to determine current directory")?;
    utf8(cwd, "current directory")
}

/// Project config discovered from `cwd`, with `--config` layered on top.
fn load_config(explicit: Option<&Path>, cwd: &Utf8Path) -> anyhow::Result<Config> {
    let mut loader = ConfigLoader::new().with_project_search(cwd);
    if let Some(path) = explicit {
        loader = loader.with_file(utf8(path.to_path_buf(), "config path")?);
    }
    loader.load().context("failed to load configuration")
}

fn utf8(path: PathBuf, what: &str) -> anyhow::Result<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(path)
        .map_err(|path| anyhow!("{what} is not valid UTF-8: {}", path.display()))
}
