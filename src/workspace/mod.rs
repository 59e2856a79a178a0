//! Repository workspace lifecycle
//!
//! One `Workspace` is an isolated, disposable clone of the target
//! repository, used for exactly one commit/push cycle:
//!
//! - `core`: acquire (clone into a scratch directory) and destroy
//! - `commit`: overlay a FileSet onto HEAD as a single-parent commit
//! - `push`: send local HEAD to a branch on the remote

pub mod commit;
pub mod core;
pub mod push;

pub use commit::CommitResult;
pub use core::{SshKeyAuth, Workspace, WorkspaceError};
pub use push::PushResult;
