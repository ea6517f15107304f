//! Assembling the desired release from configuration and the changelog.

use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument};

use crate::assets::{Asset, AssetError, AssetSet, AssetSource};
use crate::config::Config;
use crate::context::RepositoryContext;
use crate::notes::{self, ChangelogSource, NotesError};

/// Errors from planning a release.
#[derive(Error, Debug)]
pub enum PlanError {
    /// Release notes could not be produced.
    #[error(transparent)]
    Notes(#[from] NotesError),

    /// A required asset is missing.
    #[error(transparent)]
    Assets(#[from] AssetError),
}

/// Result alias for planning.
pub type PlanResult<T> = Result<T, PlanError>;

/// The release as it should exist on the remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseRecord {
    /// The tag being released (e.g. `v1.2.3`).
    pub tag: String,
    /// Commit the release points at.
    pub target: String,
    /// Release title.
    pub name: String,
    /// Release notes; may be empty.
    pub body: String,
    /// Create as a draft.
    pub draft: bool,
    /// Mark as a pre-release.
    pub pre_release: bool,
    /// Files to attach, in upload order.
    pub assets: Vec<Asset>,
}

/// Release title for `tag`.
///
/// An explicit `release_name` wins. Otherwise the tag is wrapped in the
/// configured prefix and suffix.
pub fn release_name(config: &Config, tag: &str) -> String {
    if let Some(name) = config.release_name.as_deref().filter(|n| !n.is_empty()) {
        return name.to_string();
    }
    format!(
        "{}{tag}{}",
        config.release_name_prefix.as_deref().unwrap_or_default(),
        config.release_name_suffix.as_deref().unwrap_or_default(),
    )
}

/// Build the [`ReleaseRecord`] for the tag in `context`.
///
/// Asset patterns from the configuration come first, followed by
/// `extra_patterns`. The changelog is not read at all when changelog
/// processing is disabled.
///
/// # Errors
///
/// Fails when the changelog cannot be read or parsed, or when a literal
/// asset path does not exist.
#[instrument(skip_all, fields(tag = %context.tag))]
pub fn plan_release(
    config: &Config,
    context: &RepositoryContext,
    changelog: &impl ChangelogSource,
    source: &impl AssetSource,
    extra_patterns: &[String],
) -> PlanResult<ReleaseRecord> {
    let body = if config.changelog_disabled() {
        info!("changelog processing disabled");
        String::new()
    } else {
        notes::extract(changelog, &context.version, config.allow_tag_prefix)?
    };

    let patterns: Vec<&str> = config
        .assets
        .iter()
        .chain(extra_patterns)
        .map(String::as_str)
        .collect();
    let assets = AssetSet::resolve(&patterns, source)?;

    let record = ReleaseRecord {
        tag: context.tag.clone(),
        target: context.commit.clone(),
        name: release_name(config, &context.tag),
        body,
        draft: config.draft_release,
        pre_release: config.pre_release,
        assets: assets.into_vec(),
    };
    info!(
        name = %record.name,
        assets = record.assets.len(),
        notes_bytes = record.body.len(),
        "release planned"
    );
    Ok(record)
}
