mod cli;
mod config;
mod github;
mod pipeline;
mod policy;
mod run;
#[cfg(test)]
mod test_utils;
mod workspace;

use std::path::Path;

use anyhow::Context as _;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use run::{LocalFileSource, RunOutcome, UploadEvent};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Ingest { file, user } => ingest(&cli.config, file, user).await,
    };

    match result {
        Ok(line) => println!("{line}"),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    }
}

async fn ingest(config_path: &Path, file: &Path, user: &str) -> anyhow::Result<String> {
    let config = config::load(config_path)?;

    let file_name = file
        .file_name()
        .and_then(|name| name.to_str())
        .context("upload path has no file name")?
        .to_string();

    let event = UploadEvent {
        file_name,
        user_id: user.to_string(),
    };

    let source = LocalFileSource::new(file.to_path_buf());
    let review_api = github::GithubReviewApi::new()?;

    let outcome = run::run_upload(&config, &event, &source, &review_api)
        .await
        .with_context(|| {
            format!(
                "error processing '{}' uploaded by {}",
                event.file_name, event.user_id
            )
        })?;

    Ok(status_line(&event, &outcome))
}

/// The human-readable notification line for a finished run.
fn status_line(event: &UploadEvent, outcome: &RunOutcome) -> String {
    match outcome {
        RunOutcome::Ignored => {
            format!("ignored '{}': no matching rule", event.file_name)
        }
        RunOutcome::Pushed {
            branch,
            commit,
            files,
        } => format!(
            "processed '{}': {files} file(s) committed as {} on '{branch}'",
            event.file_name,
            &commit[..7],
        ),
        RunOutcome::ReviewRequested { request_url, .. } => {
            format!(
                "processed '{}': review requested at {request_url}",
                event.file_name
            )
        }
    }
}
