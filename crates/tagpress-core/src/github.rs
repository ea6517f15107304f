//! GitHub releases through the `gh` CLI.
//!
//! Shells out to `gh` for every call, authenticating with the token from
//! the repository context. Enterprise hosts are selected with `GH_HOST`.

use std::fmt;
use std::path::PathBuf;
use std::process::{Command, Output};

use serde::Deserialize;
use tracing::{debug, instrument};

use crate::assets::Asset;
use crate::client::{ClientError, ClientResult, RemoteAsset, RemoteRelease, RemoteReleaseClient};
use crate::context::RepositoryContext;
use crate::release::ReleaseRecord;

const GH: &str = "gh";

/// [`RemoteReleaseClient`] backed by the GitHub CLI.
#[derive(Clone)]
pub struct GhClient {
    program: PathBuf,
    repository: String,
    token: String,
    host: Option<String>,
}

impl fmt::Debug for GhClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GhClient")
            .field("program", &self.program)
            .field("repository", &self.repository)
            .field("token", &"<redacted>")
            .field("host", &self.host)
            .finish()
    }
}

#[derive(Deserialize)]
struct AssetList {
    #[serde(default)]
    assets: Vec<RemoteAsset>,
}

impl GhClient {
    /// Locate `gh` on `PATH` and target the repository in `context`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Exec`] when `gh` is not installed.
    pub fn new(context: &RepositoryContext) -> ClientResult<Self> {
        let program = which::which(GH).map_err(|e| ClientError::Exec {
            program: GH.into(),
            message: e.to_string(),
        })?;
        debug!(program = %program.display(), "found gh");
        Ok(Self::with_program(program, context))
    }

    /// Use a specific `gh` executable.
    pub fn with_program(program: impl Into<PathBuf>, context: &RepositoryContext) -> Self {
        Self {
            program: program.into(),
            repository: context.repository(),
            token: context.token.clone(),
            host: context.host(),
        }
    }

    fn gh(&self, args: &[&str]) -> ClientResult<Output> {
        debug!(?args, "running gh");
        let mut cmd = Command::new(&self.program);
        cmd.args(args)
            .args(["--repo", self.repository.as_str()])
            .env("GH_TOKEN", &self.token)
            .env("GH_PROMPT_DISABLED", "1");
        if let Some(ref host) = self.host {
            cmd.env("GH_HOST", host);
        }
        cmd.output().map_err(|e| ClientError::Exec {
            program: self.program.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Run `gh` and return stdout, mapping a non-zero exit to an error.
    fn gh_checked(&self, operation: &str, args: &[&str]) -> ClientResult<String> {
        let output = self.gh(args)?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            Err(ClientError::Remote {
                operation: format!("gh {operation}"),
                message: stderr(&output),
            })
        }
    }

    fn release_exists(&self, tag: &str) -> ClientResult<bool> {
        let output = self.gh(&["release", "view", tag, "--json", "url"])?;
        Ok(output.status.success())
    }
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}

impl RemoteReleaseClient for GhClient {
    #[instrument(skip_all, fields(tag = %record.tag))]
    fn create_release(&self, record: &ReleaseRecord) -> ClientResult<RemoteRelease> {
        if self.release_exists(&record.tag)? {
            return Err(ClientError::ReleaseExists {
                tag: record.tag.clone(),
            });
        }

        let mut args = vec![
            "release",
            "create",
            record.tag.as_str(),
            "--title",
            record.name.as_str(),
            "--notes",
            record.body.as_str(),
            "--target",
            record.target.as_str(),
        ];
        if record.draft {
            args.push("--draft");
        }
        if record.pre_release {
            args.push("--prerelease");
        }

        let output = self.gh(&args)?;
        if !output.status.success() {
            let message = stderr(&output);
            if message.contains("already exists") {
                return Err(ClientError::ReleaseExists {
                    tag: record.tag.clone(),
                });
            }
            return Err(ClientError::Remote {
                operation: "gh release create".into(),
                message,
            });
        }

        let url = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(RemoteRelease {
            id: record.tag.clone(),
            tag: record.tag.clone(),
            url: (!url.is_empty()).then_some(url),
        })
    }

    #[instrument(skip_all, fields(tag = %release.tag, name = %asset.name))]
    fn upload_asset(&self, release: &RemoteRelease, asset: &Asset) -> ClientResult<()> {
        self.gh_checked(
            "release upload",
            &["release", "upload", &release.id, asset.path.as_str()],
        )?;
        Ok(())
    }

    fn list_assets(&self, release: &RemoteRelease) -> ClientResult<Vec<RemoteAsset>> {
        let json = self.gh_checked(
            "release view",
            &["release", "view", &release.id, "--json", "assets"],
        )?;
        let list: AssetList = serde_json::from_str(&json).map_err(|e| ClientError::Response {
            operation: "gh release view".into(),
            message: e.to_string(),
        })?;
        Ok(list.assets)
    }

    fn delete_asset(&self, release: &RemoteRelease, name: &str) -> ClientResult<()> {
        self.gh_checked(
            "release delete-asset",
            &["release", "delete-asset", &release.id, name, "--yes"],
        )?;
        Ok(())
    }
}
