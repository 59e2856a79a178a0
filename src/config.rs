//! Configuration loading.
//!
//! The config document allows shorthand at two levels: a match rule may be
//! a bare string (just the output path, with a derived input matcher and
//! auto-detected format), and the push policy may be a bare string (the
//! branch name). Everything is normalized here, once, into canonical
//! structs; anything that does not normalize is a fatal [`ConfigError`].
//!
//! ```yaml
//! repo_url: git@github.com:example/content.git
//! match:
//!   - data.yml
//!   - in: "*.xlsx"
//!     out:
//!       path: records/people.yml
//!       format: yaml
//! push:
//!   type: github-request
//!   base: master
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::pipeline::matcher::PatternError;
use crate::pipeline::{Format, MatchRule, Pipeline};
use crate::policy::PushPolicy;
use crate::workspace::SshKeyAuth;

pub const DEFAULT_BRANCH: &str = "master";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse config file")]
    Parse(#[from] serde_yaml::Error),
    #[error("set up at least one upload match rule")]
    NoRules,
    #[error("unknown format '{0}' (expected 'yaml' or 'copy')")]
    UnknownFormat(String),
    #[error("unknown push type '{0}' (expected 'branch' or 'github-request')")]
    UnknownPushType(String),
    #[error(transparent)]
    Pattern(#[from] PatternError),
}

pub struct Config {
    pub repo_url: String,
    pub pipeline: Pipeline,
    pub policy: PushPolicy,
    pub auth: Option<SshKeyAuth>,
    pub scratch_dir: PathBuf,
}

#[derive(Deserialize)]
struct RawConfig {
    repo_url: String,
    #[serde(rename = "match")]
    rules: Vec<RawRule>,
    #[serde(default)]
    push: Option<RawPush>,
    #[serde(default)]
    auth: Option<RawAuth>,
    #[serde(default)]
    scratch_dir: Option<PathBuf>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawRule {
    /// Bare output path
    Path(String),
    Full {
        #[serde(rename = "in", default)]
        input: Option<String>,
        out: RawOut,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawOut {
    /// Bare output path with auto-detected format
    Path(String),
    Full {
        path: String,
        #[serde(default)]
        format: Option<String>,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPush {
    /// Bare branch name
    Branch(String),
    Full {
        #[serde(rename = "type")]
        kind: String,
        #[serde(default)]
        branch: Option<String>,
        #[serde(default)]
        base: Option<String>,
    },
}

#[derive(Deserialize)]
struct RawAuth {
    ssh_key: PathBuf,
    #[serde(default)]
    ssh_public_key: Option<PathBuf>,
}

pub fn load(path: &Path) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let config = from_yaml(&content)?;
    info!(
        config_path = %path.display(),
        rules = config.pipeline.len(),
        "configuration loaded"
    );

    Ok(config)
}

pub fn from_yaml(content: &str) -> Result<Config, ConfigError> {
    let raw: RawConfig = serde_yaml::from_str(content)?;

    if raw.rules.is_empty() {
        return Err(ConfigError::NoRules);
    }

    let rules = raw
        .rules
        .into_iter()
        .map(resolve_rule)
        .collect::<Result<Vec<_>, _>>()?;

    let policy = match raw.push {
        None => PushPolicy::Branch {
            name: DEFAULT_BRANCH.to_string(),
        },
        Some(push) => resolve_push(push)?,
    };

    let auth = raw.auth.map(|auth| SshKeyAuth {
        private_key: auth.ssh_key,
        public_key: auth.ssh_public_key,
    });

    Ok(Config {
        repo_url: raw.repo_url,
        pipeline: Pipeline::new(rules),
        policy,
        auth,
        scratch_dir: raw.scratch_dir.unwrap_or_else(std::env::temp_dir),
    })
}

fn resolve_rule(raw: RawRule) -> Result<MatchRule, ConfigError> {
    let (input, out) = match raw {
        RawRule::Path(path) => (None, RawOut::Path(path)),
        RawRule::Full { input, out } => (input, out),
    };

    let (path, format) = match out {
        RawOut::Path(path) => (path, None),
        RawOut::Full { path, format } => {
            let format = format.map(|name| resolve_format(&name)).transpose()?;
            (path, format)
        }
    };

    Ok(MatchRule::new(input.as_deref(), path, format)?)
}

fn resolve_format(name: &str) -> Result<Format, ConfigError> {
    match name {
        "yaml" => Ok(Format::Yaml),
        "copy" => Ok(Format::Copy),
        other => Err(ConfigError::UnknownFormat(other.to_string())),
    }
}

fn resolve_push(raw: RawPush) -> Result<PushPolicy, ConfigError> {
    match raw {
        RawPush::Branch(name) => Ok(PushPolicy::Branch { name }),
        RawPush::Full { kind, branch, base } => match kind.as_str() {
            "branch" => Ok(PushPolicy::Branch {
                name: branch.unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
            }),
            "github-request" => Ok(PushPolicy::GithubRequest {
                base: base.unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
            }),
            other => Err(ConfigError::UnknownPushType(other.to_string())),
        },
    }
}
