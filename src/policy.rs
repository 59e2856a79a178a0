//! Push policy: where a finished commit leaves the workspace, and whether a
//! review request follows.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

/// Selected once at configuration load; never renegotiated per run.
#[derive(Debug, Clone)]
pub enum PushPolicy {
    /// Push straight onto a fixed branch.
    Branch { name: String },
    /// Push a freshly named throwaway branch, then open a review request
    /// against `base`.
    GithubRequest { base: String },
}

/// Resolved target for a single run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushTarget {
    /// Branch the commit is pushed to.
    pub branch: String,
    /// Base branch to open a review request against, when the policy asks
    /// for one.
    pub review_base: Option<String>,
}

// Keeps branch names apart when the same user uploads twice within one
// timestamp tick.
static BRANCH_SEQ: AtomicU64 = AtomicU64::new(0);

impl PushPolicy {
    pub fn resolve(&self, user_id: &str) -> PushTarget {
        match self {
            PushPolicy::Branch { name } => PushTarget {
                branch: name.clone(),
                review_base: None,
            },
            PushPolicy::GithubRequest { base } => PushTarget {
                branch: request_branch_name(user_id),
                review_base: Some(base.clone()),
            },
        }
    }
}

/// Unique, ref-safe branch name for one review-request run.
fn request_branch_name(user_id: &str) -> String {
    let stamp = Utc::now().format("%Y%m%d-%H%M%S-%3f");
    let seq = BRANCH_SEQ.fetch_add(1, Ordering::Relaxed);

    format!("git-inbox/{}-{stamp}-{seq}", ref_component(user_id))
}

/// Squash a raw user identity into characters git accepts in a ref name.
fn ref_component(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect();

    if cleaned.is_empty() {
        "anonymous".to_string()
    } else {
        cleaned
    }
}
