//! Shared fixtures for workspace and orchestration tests.

use std::path::Path;

use git2::{Repository, Signature};

use crate::workspace::commit::blob_entry;

/// A bare repository standing in for the remote, seeded with one commit on
/// master. Pushes from a workspace land here and can be read back out.
pub struct RemoteFixture {
    dir: assert_fs::TempDir,
    repo: Repository,
}

impl RemoteFixture {
    pub fn seed(files: &[(&str, &str)]) -> Self {
        let dir = assert_fs::TempDir::new().unwrap();
        let repo = Repository::init_bare(dir.path()).unwrap();

        // Fixtures always live on master, whatever the host's
        // init.defaultBranch says.
        repo.set_head("refs/heads/master").unwrap();

        {
            let mut index = repo.index().unwrap();
            for (path, content) in files {
                index
                    .add_frombuffer(&blob_entry(path), content.as_bytes())
                    .unwrap();
            }
            let tree_id = index.write_tree().unwrap();
            let tree = repo.find_tree(tree_id).unwrap();

            let signature = Signature::now("Seed", "seed@example.com").unwrap();
            repo.commit(Some("HEAD"), &signature, &signature, "Seed commit", &tree, &[])
                .unwrap();
        }

        Self { dir, repo }
    }

    /// Clone/push URL for the fixture (a local path).
    pub fn url(&self) -> String {
        self.dir.path().to_str().unwrap().to_string()
    }

    /// Commit hash at the tip of `branch`, if the branch exists.
    pub fn branch_tip(&self, branch: &str) -> Option<String> {
        self.repo
            .find_reference(&format!("refs/heads/{branch}"))
            .ok()
            .and_then(|reference| reference.target())
            .map(|oid| oid.to_string())
    }

    /// Blob content at `path` on the tip of `branch`.
    pub fn blob(&self, branch: &str, path: &str) -> Option<String> {
        let reference = self
            .repo
            .find_reference(&format!("refs/heads/{branch}"))
            .ok()?;
        let tree = reference.peel_to_commit().ok()?.tree().ok()?;
        let entry = tree.get_path(Path::new(path)).ok()?;
        let blob = self.repo.find_blob(entry.id()).ok()?;

        Some(String::from_utf8_lossy(blob.content()).to_string())
    }

    /// (author name, full message, parent count) of a commit.
    pub fn commit_info(&self, hash: &str) -> (String, String, usize) {
        let oid = git2::Oid::from_str(hash).unwrap();
        let commit = self.repo.find_commit(oid).unwrap();

        let author = commit.author();
        let info = (
            author.name().unwrap_or("").to_string(),
            commit.message().unwrap_or("").to_string(),
            commit.parent_count(),
        );
        info
    }
}
