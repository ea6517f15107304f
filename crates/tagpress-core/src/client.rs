//! The boundary between the publisher and the hosting service.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::assets::Asset;
use crate::release::ReleaseRecord;

/// Errors reported by a [`RemoteReleaseClient`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The remote already holds a release for this tag.
    #[error("a release for tag '{tag}' already exists")]
    ReleaseExists {
        /// The conflicting tag.
        tag: String,
    },

    /// The client could not be started (missing executable, I/O failure).
    #[error("failed to run {program}: {message}")]
    Exec {
        /// The program that could not be run.
        program: String,
        /// Why it failed.
        message: String,
    },

    /// The remote rejected the request.
    #[error("{operation} failed: {message}")]
    Remote {
        /// What was being attempted (e.g. "release upload").
        operation: String,
        /// The remote's explanation.
        message: String,
    },

    /// The remote answered with something that could not be understood.
    #[error("unexpected response from {operation}: {message}")]
    Response {
        /// What was being attempted.
        operation: String,
        /// Decoding failure details.
        message: String,
    },
}

/// Result alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Handle to a release that exists on the remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteRelease {
    /// Identifier the client uses for follow-up calls.
    pub id: String,
    /// The release tag.
    pub tag: String,
    /// Browser URL, when the remote reports one.
    pub url: Option<String>,
}

/// An asset already attached to a remote release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteAsset {
    /// Asset file name.
    pub name: String,
    /// Size in bytes as reported by the remote.
    #[serde(default)]
    pub size: u64,
}

/// Operations the publisher needs from a hosting service.
///
/// Implementations are expected to be synchronous; the publisher issues
/// every call strictly in sequence.
pub trait RemoteReleaseClient {
    /// Create the release described by `record` (without its assets).
    ///
    /// Must return [`ClientError::ReleaseExists`] when the tag already has
    /// a release.
    fn create_release(&self, record: &ReleaseRecord) -> ClientResult<RemoteRelease>;

    /// Attach one local file to the release under `asset.name`.
    fn upload_asset(&self, release: &RemoteRelease, asset: &Asset) -> ClientResult<()>;

    /// Assets currently attached to the release.
    fn list_assets(&self, release: &RemoteRelease) -> ClientResult<Vec<RemoteAsset>>;

    /// Remove an attached asset by name.
    fn delete_asset(&self, release: &RemoteRelease, name: &str) -> ClientResult<()>;
}

impl<C: RemoteReleaseClient + ?Sized> RemoteReleaseClient for &C {
    fn create_release(&self, record: &ReleaseRecord) -> ClientResult<RemoteRelease> {
        (**self).create_release(record)
    }

    fn upload_asset(&self, release: &RemoteRelease, asset: &Asset) -> ClientResult<()> {
        (**self).upload_asset(release, asset)
    }

    fn list_assets(&self, release: &RemoteRelease) -> ClientResult<Vec<RemoteAsset>> {
        (**self).list_assets(release)
    }

    fn delete_asset(&self, release: &RemoteRelease, name: &str) -> ClientResult<()> {
        (**self).delete_asset(release, name)
    }
}
