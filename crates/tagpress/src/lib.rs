//! Library interface for the `tagpress` CLI.
//!
//! This crate exposes the CLI's argument parser and command structure as a library,
//! primarily for documentation generation and testing. The actual entry point is
//! in `main.rs`.
//!
//! # Structure
//!
//! - [`Cli`] - The root argument parser (clap derive)
//! - [`Commands`] - Available subcommands
//! - [`commands`] - Command implementations
//!
//! # Documentation Generation
//!
//! The [`command()`] function returns the clap `Command` for generating man pages
//! and shell completions via `xtask`.

pub mod commands;

use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

/// Color output preference.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum ColorChoice {
    /// Detect terminal capabilities automatically.
    #[default]
    Auto,
    /// Always emit colors.
    Always,
    /// Never emit colors.
    Never,
}

impl ColorChoice {
    /// Configure global color output based on this choice.
    ///
    /// Call this once at startup to set the color mode.
    pub fn apply(self) {
        match self {
            Self::Auto => {} // owo-colors auto-detects by default
            Self::Always => owo_colors::set_override(true),
            Self::Never => owo_colors::set_override(false),
        }
    }

    /// Whether ANSI colors should be used on stderr.
    pub fn stderr_ansi(self) -> bool {
        match self {
            Self::Auto => std::io::IsTerminal::is_terminal(&std::io::stderr()),
            Self::Always => true,
            Self::Never => false,
        }
    }
}

const ENV_HELP: &str = "\
ENVIRONMENT VARIABLES:
    GITHUB_TOKEN            Token used to create the release (required for publish)
    GITHUB_REF              Tag being released, as refs/tags/<tag>
    GITHUB_SHA              Commit the release points at
    GITHUB_REPOSITORY       Target repository as owner/name
    GITHUB_WORKSPACE        Directory asset paths and the changelog are relative to
    GITHUB_SERVER_URL       Hosting service URL (enterprise hosts)

    ALLOW_EMPTY_CHANGELOG   Publish even without notes for the version
    ALLOW_TAG_PREFIX        Accept any tag prefix, not just 'v'
    CHANGELOG_FILE          Changelog path, or 'none' to skip it
    DRAFT_RELEASE           Create the release as a draft
    PRE_RELEASE             Mark the release as a pre-release
    RELEASE_NAME            Release title
    RELEASE_NAME_PREFIX     Text before the tag in the release title
    RELEASE_NAME_SUFFIX     Text after the tag in the release title
    (each also read with an INPUT_ prefix, which takes precedence)

    RUST_LOG                Log filter (e.g., debug, tagpress_core=trace)
    TAGPRESS_LOG_PATH       Write JSON logs to this file
    TAGPRESS_LOG_DIR        Write JSON logs to tagpress.jsonl in this directory
";
/// Command-line interface definition for tagpress.
#[derive(Parser)]
#[command(name = "tagpress")]
#[command(about = "Publish a tagged release with changelog notes and build artifacts", long_about = None)]
#[command(version)]
#[command(after_long_help = ENV_HELP)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file (overrides discovery)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Run as if started in DIR
    #[arg(short = 'C', long, global = true)]
    pub chdir: Option<PathBuf>,

    /// Only print errors (suppresses warnings/info)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// More detail (repeatable; e.g. -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Colorize output
    #[arg(long, global = true, value_enum, default_value_t)]
    pub color: ColorChoice,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,
}

/// Available subcommands for the CLI.
#[derive(Subcommand)]
pub enum Commands {
    /// Create the release for the current tag and upload its assets
    Publish(commands::publish::PublishArgs),

    /// Print the release notes for a version
    Notes(commands::notes::NotesArgs),

    /// List the files that would be attached to the release
    Assets(commands::assets::AssetsArgs),
}

/// Returns the clap command for documentation generation
pub fn command() -> clap::Command {
    Cli::command()
}
