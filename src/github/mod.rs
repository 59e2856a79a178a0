pub mod client;

pub use client::{ApiError, GithubReviewApi, ReviewApi};

#[cfg(test)]
pub use client::MockReviewApi;
