use std::path::{Path, PathBuf};

use chrono::Utc;
use git2::build::RepoBuilder;
use git2::{Cred, FetchOptions, RemoteCallbacks, Repository};
use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, info};

/// SSH key pair used for clone and push. When absent, the ssh-agent is
/// tried first and libgit2's default credentials after that.
#[derive(Debug, Clone)]
pub struct SshKeyAuth {
    pub private_key: PathBuf,
    pub public_key: Option<PathBuf>,
}

#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error("failed to create workspace directory")]
    Scratch(#[source] std::io::Error),
    #[error("failed to clone '{url}'")]
    Clone {
        url: String,
        #[source]
        source: git2::Error,
    },
    #[error("failed to commit uploaded files")]
    Commit(#[source] git2::Error),
    #[error("failed to push branch '{branch}'")]
    Push {
        branch: String,
        #[source]
        source: git2::Error,
    },
    #[error("failed to remove workspace directory")]
    Cleanup(#[source] std::io::Error),
}

/// An isolated clone of the target repository.
///
/// Mutating operations take `&mut self`, so a second in-flight action on
/// the same workspace cannot compile, and `destroy` consumes the value, so
/// nothing can touch a workspace after teardown. The scratch directory is
/// removed when the workspace is dropped on any path that skips `destroy`.
pub struct Workspace {
    dir: TempDir,
    repo: Repository,
    auth: Option<SshKeyAuth>,
}

impl Workspace {
    /// Bare-clone `remote_url` into a fresh, uniquely named directory under
    /// `scratch_root`.
    pub fn acquire(
        remote_url: &str,
        scratch_root: &Path,
        auth: Option<SshKeyAuth>,
    ) -> Result<Self, WorkspaceError> {
        std::fs::create_dir_all(scratch_root).map_err(WorkspaceError::Scratch)?;

        let prefix = format!("git-inbox-{}-", Utc::now().format("%Y%m%d-%H%M%S"));
        let dir = TempDir::with_prefix_in(prefix, scratch_root).map_err(WorkspaceError::Scratch)?;

        let mut fetch = FetchOptions::new();
        fetch.remote_callbacks(credential_callbacks(auth.clone()));
        fetch.prune(git2::FetchPrune::On);

        let repo = RepoBuilder::new()
            .bare(true)
            .fetch_options(fetch)
            .clone(remote_url, dir.path())
            .map_err(|source| WorkspaceError::Clone {
                url: remote_url.to_string(),
                source,
            })?;

        info!(url = remote_url, dir = %dir.path().display(), "cloned workspace");

        Ok(Self { dir, repo, auth })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub(crate) fn repo(&self) -> &Repository {
        &self.repo
    }

    pub(crate) fn remote_callbacks(&self) -> RemoteCallbacks<'static> {
        credential_callbacks(self.auth.clone())
    }

    /// Tear the workspace down: release the repository handle and remove
    /// the scratch directory. Dropping a workspace removes the directory
    /// too; this is the explicit variant that surfaces removal errors.
    pub fn destroy(self) -> Result<(), WorkspaceError> {
        let Workspace { dir, repo, auth: _ } = self;

        debug!(dir = %dir.path().display(), "destroying workspace");
        drop(repo);

        dir.close().map_err(WorkspaceError::Cleanup)
    }
}

fn credential_callbacks(auth: Option<SshKeyAuth>) -> RemoteCallbacks<'static> {
    let mut callbacks = RemoteCallbacks::new();

    callbacks.credentials(move |_url, username, _allowed| {
        let user = username.unwrap_or("git");

        match &auth {
            Some(key) => Cred::ssh_key(user, key.public_key.as_deref(), &key.private_key, None),
            None => Cred::ssh_key_from_agent(user).or_else(|_| Cred::default()),
        }
    });

    callbacks
}
