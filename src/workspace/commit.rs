use git2::{IndexEntry, IndexTime, Oid, Signature};
use tracing::info;

use crate::pipeline::FileSet;

use super::core::{Workspace, WorkspaceError};

/// Outcome of one overlay commit.
#[derive(Debug, Clone)]
pub struct CommitResult {
    /// Hash of the new commit.
    pub hash: String,
    /// Hash of the HEAD commit the overlay was staged against.
    pub parent_hash: String,
}

// Commits carry a fixed service identity; the uploading user is recorded in
// the commit message body instead.
const SERVICE_NAME: &str = "git-inbox";
const SERVICE_EMAIL: &str = "git-inbox@localhost";

impl Workspace {
    /// Stage `files` on top of the current HEAD tree and commit the result
    /// as a single-parent child of HEAD. Every file HEAD carries that is
    /// not named in `files` is preserved untouched.
    pub fn commit_files(
        &mut self,
        files: &FileSet,
        message: &str,
    ) -> Result<CommitResult, WorkspaceError> {
        self.overlay_commit(files, message)
            .map_err(WorkspaceError::Commit)
    }

    fn overlay_commit(&self, files: &FileSet, message: &str) -> Result<CommitResult, git2::Error> {
        let head_commit = self.repo().head()?.peel_to_commit()?;
        let head_tree = head_commit.tree()?;

        let mut index = self.repo().index()?;
        index.read_tree(&head_tree)?;

        for (path, bytes) in files {
            index.add_frombuffer(&blob_entry(path), bytes)?;
        }

        let tree_id = index.write_tree()?;
        let tree = self.repo().find_tree(tree_id)?;

        let signature = Signature::now(SERVICE_NAME, SERVICE_EMAIL)?;
        let commit_id = self.repo().commit(
            Some("HEAD"),
            &signature,
            &signature,
            message,
            &tree,
            &[&head_commit],
        )?;

        info!(commit = %commit_id, files = files.len(), "created overlay commit");

        Ok(CommitResult {
            hash: commit_id.to_string(),
            parent_hash: head_commit.id().to_string(),
        })
    }
}

/// Index entry for a regular-file blob at `path`. The id is filled in when
/// the buffer is added; everything else stays zeroed.
pub(crate) fn blob_entry(path: &str) -> IndexEntry {
    IndexEntry {
        ctime: IndexTime::new(0, 0),
        mtime: IndexTime::new(0, 0),
        dev: 0,
        ino: 0,
        mode: 0o100644,
        uid: 0,
        gid: 0,
        file_size: 0,
        id: Oid::zero(),
        flags: 0,
        flags_extended: 0,
        path: path.as_bytes().to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::RemoteFixture;

    fn file_set(entries: &[(&str, &str)]) -> FileSet {
        entries
            .iter()
            .map(|(path, content)| (path.to_string(), content.as_bytes().to_vec()))
            .collect()
    }

    #[test]
    fn commit_overlays_files_onto_head() {
        let remote = RemoteFixture::seed(&[("README.md", "original"), ("keep.txt", "keep")]);
        let scratch = assert_fs::TempDir::new().unwrap();
        let mut workspace = Workspace::acquire(&remote.url(), scratch.path(), None).unwrap();

        let files = file_set(&[("README.md", "replaced"), ("data/new.yml", "a: 1\n")]);
        let result = workspace
            .commit_files(&files, "Import report.xlsx")
            .unwrap();
        workspace.push("master").unwrap();

        // Replaced, added and untouched paths all land as expected.
        assert_eq!(remote.blob("master", "README.md").unwrap(), "replaced");
        assert_eq!(remote.blob("master", "data/new.yml").unwrap(), "a: 1\n");
        assert_eq!(remote.blob("master", "keep.txt").unwrap(), "keep");
        assert_eq!(remote.branch_tip("master").unwrap(), result.hash);
    }

    #[test]
    fn commit_parent_is_the_previous_head() {
        let remote = RemoteFixture::seed(&[("README.md", "original")]);
        let scratch = assert_fs::TempDir::new().unwrap();
        let mut workspace = Workspace::acquire(&remote.url(), scratch.path(), None).unwrap();

        let before = remote.branch_tip("master").unwrap();
        let result = workspace
            .commit_files(&file_set(&[("a.txt", "a")]), "Import a.txt")
            .unwrap();
        workspace.push("master").unwrap();

        assert_eq!(result.parent_hash, before);

        let (_, _, parent_count) = remote.commit_info(&result.hash);
        assert_eq!(parent_count, 1);
    }

    #[test]
    fn commit_uses_the_service_identity_and_keeps_the_message() {
        let remote = RemoteFixture::seed(&[("README.md", "original")]);
        let scratch = assert_fs::TempDir::new().unwrap();
        let mut workspace = Workspace::acquire(&remote.url(), scratch.path(), None).unwrap();

        let message = "Import report.xlsx\n\nUploaded by: alice";
        let result = workspace
            .commit_files(&file_set(&[("a.txt", "a")]), message)
            .unwrap();
        workspace.push("master").unwrap();

        let (author, recorded, _) = remote.commit_info(&result.hash);
        assert_eq!(author, "git-inbox");
        assert!(recorded.contains("Uploaded by: alice"));
    }

    #[test]
    fn successive_commits_stack_on_the_new_head() {
        let remote = RemoteFixture::seed(&[("README.md", "original")]);
        let scratch = assert_fs::TempDir::new().unwrap();
        let mut workspace = Workspace::acquire(&remote.url(), scratch.path(), None).unwrap();

        let first = workspace
            .commit_files(&file_set(&[("a.txt", "a")]), "Import a.txt")
            .unwrap();
        let second = workspace
            .commit_files(&file_set(&[("b.txt", "b")]), "Import b.txt")
            .unwrap();

        assert_eq!(second.parent_hash, first.hash);
    }
}
