//! Release publishing.
//!
//! [`ReleasePublisher::publish`] drives a release through
//! `NotCreated → Created → Uploading → Done | PartiallyFailed`:
//!
//! 1. Refuse an empty body unless empty changelogs are allowed. This
//!    happens before the client is touched.
//! 2. Create the release. An existing release for the tag is fatal.
//! 3. Upload every asset in order. A failed upload is recorded and the
//!    loop moves on; the release is never rolled back.

use serde::{Serialize, Serializer};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::assets::{Asset, UploadState};
use crate::client::{ClientError, RemoteRelease, RemoteReleaseClient};
use crate::release::ReleaseRecord;

// ──────────────────────────────────────────────
// Errors
// ──────────────────────────────────────────────

/// Fatal publishing errors. Per-asset failures are not errors; they are
/// collected in [`PublishOutcome::failed`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    /// The release notes are empty and empty changelogs are not allowed.
    #[error("changelog does not contain changes for requested project version ({tag})")]
    EmptyChangelog {
        /// The tag being published.
        tag: String,
    },

    /// The remote already has a release for the tag.
    #[error("a release for tag '{tag}' already exists; refusing to modify it")]
    DuplicateRelease {
        /// The conflicting tag.
        tag: String,
    },

    /// The release could not be created.
    #[error("failed to create release: {0}")]
    Create(#[source] ClientError),
}

/// Result alias for publishing.
pub type PublishResult<T> = Result<T, PublishError>;

/// A single asset that failed to upload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to upload {asset}: {source}")]
pub struct UploadError {
    /// Name of the asset.
    pub asset: String,
    /// What the client reported.
    #[source]
    pub source: ClientError,
}

// ──────────────────────────────────────────────
// State and events
// ──────────────────────────────────────────────

/// Where a publish run ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishState {
    /// No release was created.
    NotCreated,
    /// The release exists; uploads have not started.
    Created,
    /// Assets are being uploaded.
    Uploading,
    /// Every asset was uploaded.
    Done,
    /// The release exists but at least one asset failed.
    PartiallyFailed,
}

impl std::fmt::Display for PublishState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotCreated => write!(f, "not created"),
            Self::Created => write!(f, "created"),
            Self::Uploading => write!(f, "uploading"),
            Self::Done => write!(f, "done"),
            Self::PartiallyFailed => write!(f, "partially failed"),
        }
    }
}

/// Progress notifications emitted while publishing.
#[derive(Debug, Clone)]
pub enum PublishEvent {
    /// The release exists on the remote.
    ReleaseCreated(RemoteRelease),
    /// An upload is about to start.
    UploadStarted {
        /// Position in the upload order (zero-based).
        index: usize,
        /// Number of assets in total.
        total: usize,
        /// The asset being uploaded.
        asset: Asset,
    },
    /// An upload finished, successfully or not.
    UploadFinished {
        /// Position in the upload order (zero-based).
        index: usize,
        /// The asset with its final upload state.
        asset: Asset,
        /// The failure, if any.
        error: Option<UploadError>,
    },
}

// ──────────────────────────────────────────────
// Outcome
// ──────────────────────────────────────────────

/// A failed asset together with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadFailure {
    /// The asset, in state [`UploadState::Failed`].
    pub asset: Asset,
    /// Why it failed.
    #[serde(serialize_with = "display")]
    pub error: UploadError,
}

fn display<T: std::fmt::Display, S: Serializer>(value: &T, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(value)
}

/// The result of a publish run that got as far as creating the release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishOutcome {
    /// The published tag.
    pub tag: String,
    /// Whether this run created the release.
    pub release_created: bool,
    /// Browser URL of the release, if known.
    pub release_url: Option<String>,
    /// Terminal state: [`PublishState::Done`] or
    /// [`PublishState::PartiallyFailed`].
    pub state: PublishState,
    /// Every asset in input order with its final upload state.
    pub assets: Vec<Asset>,
    /// Assets that failed, in input order.
    pub failed: Vec<UploadFailure>,
}

impl PublishOutcome {
    /// Assets that were uploaded, in input order.
    pub fn uploaded(&self) -> impl Iterator<Item = &Asset> {
        self.assets
            .iter()
            .filter(|a| a.upload_state == UploadState::Uploaded)
    }

    /// Whether everything was published.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

// ──────────────────────────────────────────────
// Publisher
// ──────────────────────────────────────────────

/// Publishes a [`ReleaseRecord`] through a [`RemoteReleaseClient`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ReleasePublisher {
    /// Publish even when the release body is empty.
    pub allow_empty_changelog: bool,
}

impl ReleasePublisher {
    /// Create a publisher with the given empty-changelog policy.
    pub const fn new(allow_empty_changelog: bool) -> Self {
        Self {
            allow_empty_changelog,
        }
    }

    /// Create the release and upload its assets.
    ///
    /// Calls `on_event` as the release moves through its states so callers
    /// can report progress.
    ///
    /// # Errors
    ///
    /// Returns an error only when the release could not be created (or was
    /// refused before creation). Upload failures are reported through
    /// [`PublishOutcome::failed`].
    #[instrument(skip_all, fields(tag = %record.tag, assets = record.assets.len()))]
    pub fn publish(
        &self,
        record: ReleaseRecord,
        client: &impl RemoteReleaseClient,
        mut on_event: impl FnMut(PublishEvent),
    ) -> PublishResult<PublishOutcome> {
        if record.body.trim().is_empty() {
            if !self.allow_empty_changelog {
                return Err(PublishError::EmptyChangelog { tag: record.tag });
            }
            warn!("publishing with empty release notes");
        }

        let release = client.create_release(&record).map_err(|e| match e {
            ClientError::ReleaseExists { tag } => PublishError::DuplicateRelease { tag },
            other => PublishError::Create(other),
        })?;
        let mut state = PublishState::Created;
        info!(id = %release.id, url = ?release.url, %state, "release created");
        on_event(PublishEvent::ReleaseCreated(release.clone()));

        let total = record.assets.len();
        let mut assets = record.assets;
        let mut failed = Vec::new();
        if total > 0 {
            state = PublishState::Uploading;
            debug!(total, %state, "uploading assets");
        }

        for (index, asset) in assets.iter_mut().enumerate() {
            on_event(PublishEvent::UploadStarted {
                index,
                total,
                asset: asset.clone(),
            });

            let error = match client.upload_asset(&release, asset) {
                Ok(()) => {
                    asset.upload_state = UploadState::Uploaded;
                    info!(name = %asset.name, bytes = asset.size_bytes, "asset uploaded");
                    None
                }
                Err(source) => {
                    asset.upload_state = UploadState::Failed;
                    warn!(name = %asset.name, error = %source, "asset upload failed");
                    remove_partial_upload(client, &release, &asset.name);
                    Some(UploadError {
                        asset: asset.name.clone(),
                        source,
                    })
                }
            };

            on_event(PublishEvent::UploadFinished {
                index,
                asset: asset.clone(),
                error: error.clone(),
            });
            if let Some(error) = error {
                failed.push(UploadFailure {
                    asset: asset.clone(),
                    error,
                });
            }
        }

        state = if failed.is_empty() {
            PublishState::Done
        } else {
            PublishState::PartiallyFailed
        };
        info!(%state, failed = failed.len(), "publish finished");

        Ok(PublishOutcome {
            tag: record.tag,
            release_created: true,
            release_url: release.url,
            state,
            assets,
            failed,
        })
    }
}

/// Delete a half-uploaded asset left behind by a failed upload.
///
/// Best effort: failures are logged and otherwise ignored.
fn remove_partial_upload(client: &impl RemoteReleaseClient, release: &RemoteRelease, name: &str) {
    let attached = match client.list_assets(release) {
        Ok(attached) => attached,
        Err(e) => {
            warn!(name, error = %e, "could not list release assets after failed upload");
            return;
        }
    };
    if !attached.iter().any(|a| a.name == name) {
        return;
    }
    match client.delete_asset(release, name) {
        Ok(()) => info!(name, "removed partially uploaded asset"),
        Err(e) => warn!(name, error = %e, "could not remove partially uploaded asset"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::{Call, MockClient};

    fn record(body: &str, assets: &[&str]) -> ReleaseRecord {
        ReleaseRecord {
            tag: "v1.0.0".into(),
            target: "abc123".into(),
            name: "v1.0.0".into(),
            body: body.into(),
            draft: false,
            pre_release: false,
            assets: assets
                .iter()
                .map(|name| Asset::new(format!("dist/{name}"), 10))
                .collect(),
        }
    }

    fn names<'a>(assets: impl Iterator<Item = &'a Asset>) -> Vec<&'a str> {
        assets.map(|a| a.name.as_str()).collect()
    }

    #[test]
    fn uploads_everything_in_order() {
        let client = MockClient::default();
        let outcome = ReleasePublisher::new(false)
            .publish(record("notes", &["a", "b", "c"]), &client, |_| {})
            .unwrap();

        assert!(outcome.is_success());
        assert!(outcome.release_created);
        assert_eq!(outcome.state, PublishState::Done);
        assert_eq!(names(outcome.uploaded()), ["a", "b", "c"]);
        assert_eq!(
            client.calls(),
            [
                Call::Create("v1.0.0".into()),
                Call::Upload("a".into()),
                Call::Upload("b".into()),
                Call::Upload("c".into()),
            ]
        );
    }

    #[test]
    fn continues_past_a_failed_upload() {
        let client = MockClient::failing_on(&["b"]);
        let outcome = ReleasePublisher::new(false)
            .publish(record("notes", &["a", "b", "c"]), &client, |_| {})
            .unwrap();

        assert_eq!(outcome.state, PublishState::PartiallyFailed);
        assert!(!outcome.is_success());
        assert_eq!(names(outcome.uploaded()), ["a", "c"]);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].asset.name, "b");
        assert_eq!(outcome.failed[0].asset.upload_state, UploadState::Failed);
        assert_eq!(outcome.failed[0].error.asset, "b");
        assert_eq!(client.count(|c| matches!(c, Call::Upload(_))), 3);
        assert_eq!(client.attached(), ["a", "c"]);
    }

    #[test]
    fn partial_upload_is_cleaned_up() {
        let client = MockClient::failing_on(&["b"]).with_partial_uploads();
        let outcome = ReleasePublisher::new(false)
            .publish(record("notes", &["a", "b"]), &client, |_| {})
            .unwrap();

        assert_eq!(outcome.failed.len(), 1);
        assert!(client.calls().contains(&Call::Delete("b".into())));
        assert_eq!(client.attached(), ["a"]);
    }

    #[test]
    fn cleanup_only_deletes_leftovers() {
        let client = MockClient::failing_on(&["b"]);
        ReleasePublisher::new(false)
            .publish(record("notes", &["a", "b"]), &client, |_| {})
            .unwrap();

        assert_eq!(client.count(|c| *c == Call::List), 1);
        assert_eq!(client.count(|c| matches!(c, Call::Delete(_))), 0);
    }

    #[test]
    fn failed_cleanup_is_not_escalated() {
        let client = MockClient::failing_on(&["a"])
            .with_partial_uploads()
            .with_failing_cleanup();
        let outcome = ReleasePublisher::new(false)
            .publish(record("notes", &["a", "b"]), &client, |_| {})
            .unwrap();

        assert_eq!(names(outcome.uploaded()), ["b"]);
        assert_eq!(outcome.failed[0].error.asset, "a");
    }

    #[test]
    fn existing_release_is_fatal_and_uploads_nothing() {
        let client = MockClient::default().with_existing_release();
        let err = ReleasePublisher::new(false)
            .publish(record("notes", &["a", "b"]), &client, |_| {})
            .unwrap_err();

        assert_eq!(
            err,
            PublishError::DuplicateRelease {
                tag: "v1.0.0".into()
            }
        );
        assert_eq!(client.count(|c| matches!(c, Call::Upload(_))), 0);
        assert_eq!(client.calls().len(), 1);
    }

    #[test]
    fn empty_body_aborts_before_any_call() {
        let client = MockClient::default();
        let err = ReleasePublisher::new(false)
            .publish(record("  \n", &["a"]), &client, |_| {})
            .unwrap_err();

        assert!(matches!(err, PublishError::EmptyChangelog { .. }));
        assert!(client.calls().is_empty());
    }

    #[test]
    fn empty_body_allowed_when_configured() {
        let client = MockClient::default();
        let outcome = ReleasePublisher::new(true)
            .publish(record("", &[]), &client, |_| {})
            .unwrap();

        assert!(outcome.is_success());
        assert_eq!(outcome.state, PublishState::Done);
        assert_eq!(client.calls(), [Call::Create("v1.0.0".into())]);
    }

    #[test]
    fn emits_events_in_order() {
        let client = MockClient::failing_on(&["b"]);
        let mut events = Vec::new();
        ReleasePublisher::new(false)
            .publish(record("notes", &["a", "b"]), &client, |e| events.push(e))
            .unwrap();

        assert_eq!(events.len(), 5);
        assert!(matches!(events[0], PublishEvent::ReleaseCreated(_)));
        assert!(matches!(
            events[1],
            PublishEvent::UploadStarted {
                index: 0,
                total: 2,
                ..
            }
        ));
        match &events[4] {
            PublishEvent::UploadFinished {
                index: 1,
                asset,
                error: Some(error),
            } => {
                assert_eq!(asset.upload_state, UploadState::Failed);
                assert!(error.to_string().starts_with("failed to upload b"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn outcome_serializes_errors_as_text() {
        let client = MockClient::failing_on(&["b"]);
        let outcome = ReleasePublisher::new(false)
            .publish(record("notes", &["b"]), &client, |_| {})
            .unwrap();

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["state"], "partially_failed");
        assert_eq!(json["release_created"], true);
        assert_eq!(json["failed"][0]["asset"]["name"], "b");
        assert_eq!(
            json["failed"][0]["error"],
            "failed to upload b: release upload failed: upload of b rejected"
        );
    }

    #[test]
    fn empty_changelog_message() {
        let err = PublishError::EmptyChangelog {
            tag: "v1.0.0".into(),
        };
        assert_eq!(
            err.to_string(),
            "changelog does not contain changes for requested project version (v1.0.0)"
        );
    }
}
