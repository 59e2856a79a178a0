use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "git-inbox")]
#[command(about = "Lands dropped files as commits in a git repository")]
pub struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "git-inbox.yml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a single file through the pipeline, as if dropped in the channel
    Ingest {
        /// File to ingest
        file: PathBuf,
        /// Identity of the uploader, recorded in the commit message
        #[arg(short, long, default_value = "local")]
        user: String,
    },
}
