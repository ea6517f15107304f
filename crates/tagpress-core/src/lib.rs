//! Core library for tagpress.
//!
//! This crate turns a pushed tag into a published release: it extracts the
//! tag's section from the changelog, resolves the files to attach, and
//! drives the hosting service through a [`RemoteReleaseClient`].
//!
//! # Modules
//!
//! - [`assets`] - Asset pattern resolution and deduplication
//! - [`changelog`] - Changelog parsing and version lookup
//! - [`client`] - The remote release client contract
//! - [`config`] - Configuration loading and management
//! - [`context`] - Repository metadata from the CI environment
//! - [`error`] - Configuration error types and result aliases
//! - [`github`] - `gh`-backed client implementation
//! - [`notes`] - Release notes from a changelog source
//! - [`publish`] - Release creation and asset upload
//! - [`release`] - Release record assembly
//!
//! # Quick Start
//!
//! ```no_run
//! use camino::Utf8PathBuf;
//! use tagpress_core::{
//!     ConfigLoader, FileChangelog, GhClient, LocalFs, ReleasePublisher, RepositoryContext,
//!     plan_release,
//! };
//!
//! let config = ConfigLoader::new().load()?;
//! let context = RepositoryContext::from_env(config.allow_tag_prefix)?;
//! let root = context.workspace.clone().unwrap_or_else(|| Utf8PathBuf::from("."));
//!
//! let changelog = FileChangelog::new(root.join(&config.changelog_file));
//! let record = plan_release(&config, &context, &changelog, &LocalFs::new(&root), &[])?;
//!
//! let client = GhClient::new(&context)?;
//! let outcome = ReleasePublisher::new(config.allow_empty_changelog)
//!     .publish(record, &client, |_| {})?;
//! println!("uploaded {} assets", outcome.uploaded().count());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
#![deny(unsafe_code)]

pub mod assets;

pub mod changelog;

pub mod client;

pub mod config;

pub mod context;

pub mod error;

pub mod github;

pub mod notes;

pub mod publish;

pub mod release;

pub use assets::{Asset, AssetError, AssetSet, AssetSource, LocalFs, UploadState};

pub use changelog::{ChangelogDocument, ParseError, VersionSection};

pub use client::{ClientError, RemoteAsset, RemoteRelease, RemoteReleaseClient};

pub use config::{Config, ConfigLoader, LogLevel};

pub use context::RepositoryContext;

pub use error::{ConfigError, ConfigResult};

pub use github::GhClient;

pub use notes::{ChangelogSource, FileChangelog, NotesError};

pub use publish::{
    PublishError, PublishEvent, PublishOutcome, PublishState, ReleasePublisher, UploadError,
    UploadFailure,
};

pub use release::{PlanError, ReleaseRecord, plan_release};
