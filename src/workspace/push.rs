use git2::PushOptions;
use tracing::info;

use super::core::{Workspace, WorkspaceError};

/// Outcome of one push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushResult {
    /// Branch the local HEAD now sits on remotely.
    pub branch: String,
}

impl Workspace {
    /// Push local HEAD to `refs/heads/<branch>` on origin, creating the
    /// branch if absent or fast-forwarding it if present. Never forces; a
    /// non-fast-forward rejection surfaces as an error.
    pub fn push(&mut self, branch: &str) -> Result<PushResult, WorkspaceError> {
        self.push_head(branch)
            .map_err(|source| WorkspaceError::Push {
                branch: branch.to_string(),
                source,
            })?;

        Ok(PushResult {
            branch: branch.to_string(),
        })
    }

    fn push_head(&self, branch: &str) -> Result<(), git2::Error> {
        let head = self.repo().head()?;
        let local_ref = head
            .name()
            .ok_or_else(|| git2::Error::from_str("HEAD is not a named reference"))?;

        let refspec = format!("{local_ref}:refs/heads/{branch}");

        let mut remote = self.repo().find_remote("origin")?;
        let mut options = PushOptions::new();
        options.remote_callbacks(self.remote_callbacks());

        remote.push(&[&refspec], Some(&mut options))?;

        info!(branch, "pushed local HEAD");
        Ok(())
    }
}
