//! One upload, end to end: route, commit, push, review request.
//!
//! Each run is independent and owns its workspace; within a run the steps
//! are strictly sequential. The workspace is acquired only after the
//! pipeline produced a non-empty FileSet, so irrelevant uploads cost
//! neither a content fetch nor a clone.

use std::path::PathBuf;

use anyhow::Context as _;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Config;
use crate::github::{ApiError, ReviewApi};
use crate::pipeline::{ContentSource, FileSet, PipelineError};
use crate::workspace::{Workspace, WorkspaceError};

/// A file-share notification from the chat transport.
#[derive(Debug, Clone)]
pub struct UploadEvent {
    pub file_name: String,
    pub user_id: String,
}

/// What one run produced. The notification text is rendered by the caller.
#[derive(Debug)]
pub enum RunOutcome {
    /// No rule matched; nothing was fetched or cloned.
    Ignored,
    /// Commit pushed directly onto a branch.
    Pushed {
        branch: String,
        commit: String,
        files: usize,
    },
    /// Commit pushed to a throwaway branch and a review request opened.
    ReviewRequested {
        branch: String,
        commit: String,
        request_url: String,
    },
}

#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
    /// The commit and push already landed; the branch is left on the remote
    /// for manual recovery.
    #[error("review request failed for pushed branch '{branch}'")]
    Api {
        branch: String,
        #[source]
        source: ApiError,
    },
}

pub async fn run_upload(
    config: &Config,
    event: &UploadEvent,
    source: &dyn ContentSource,
    review_api: &dyn ReviewApi,
) -> Result<RunOutcome, RunError> {
    info!(file = %event.file_name, user = %event.user_id, "processing upload");

    let files = config
        .pipeline
        .build_file_set(&event.file_name, source)
        .await?;

    if files.is_empty() {
        info!(file = %event.file_name, "no rules matched, ignoring upload");
        return Ok(RunOutcome::Ignored);
    }

    let mut workspace =
        Workspace::acquire(&config.repo_url, &config.scratch_dir, config.auth.clone())?;

    let outcome = land_commit(config, event, &files, &mut workspace, review_api).await;

    // Tear down on success and failure alike. A failed removal on the error
    // path is only logged so the original error stays visible.
    match outcome {
        Ok(outcome) => {
            workspace.destroy()?;
            Ok(outcome)
        }
        Err(err) => {
            if let Err(cleanup) = workspace.destroy() {
                warn!(error = %cleanup, "workspace cleanup failed");
            }
            Err(err)
        }
    }
}

async fn land_commit(
    config: &Config,
    event: &UploadEvent,
    files: &FileSet,
    workspace: &mut Workspace,
    review_api: &dyn ReviewApi,
) -> Result<RunOutcome, RunError> {
    let commit = workspace.commit_files(files, &commit_message(event))?;

    let target = config.policy.resolve(&event.user_id);
    let pushed = workspace.push(&target.branch)?;

    match target.review_base {
        None => Ok(RunOutcome::Pushed {
            branch: pushed.branch,
            commit: commit.hash,
            files: files.len(),
        }),
        Some(base) => {
            let title = format!("File drop from {}", event.user_id);
            let request_url = review_api
                .create_request(&config.repo_url, &base, &pushed.branch, &title)
                .await
                .map_err(|source| RunError::Api {
                    branch: pushed.branch.clone(),
                    source,
                })?;

            Ok(RunOutcome::ReviewRequested {
                branch: pushed.branch,
                commit: commit.hash,
                request_url,
            })
        }
    }
}

/// Fixed-identity commits carry the uploader in the message body.
fn commit_message(event: &UploadEvent) -> String {
    format!(
        "Import {}\n\nUploaded by: {}",
        event.file_name, event.user_id
    )
}

/// Content source backed by a file on disk, standing in for the chat
/// transport's download when a drop is replayed from the command line.
pub struct LocalFileSource {
    path: PathBuf,
}

impl LocalFileSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait::async_trait]
impl ContentSource for LocalFileSource {
    async fn fetch_raw(&self) -> anyhow::Result<Vec<u8>> {
        tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("cannot read upload '{}'", self.path.display()))
    }
}
