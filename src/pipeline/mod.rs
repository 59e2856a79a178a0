//! Routing/formatting pipeline
//!
//! Maps an uploaded file name to zero or more repository outputs:
//!
//! - `matcher`: glob and derived matchers over the uploaded file name
//! - `sheet`: the structured-table formatter (workbook to YAML mapping)
//!
//! Every rule that matches fires; a single upload may populate several
//! output paths. Content is fetched at most once per run, and only when at
//! least one rule matched.

pub mod matcher;
pub mod sheet;

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};

use matcher::{Matcher, PatternError};
use sheet::sheet_to_yaml;

/// The path -> bytes result of one pipeline run. Keys are unique; when two
/// matched rules name the same output path, the later rule wins.
pub type FileSet = BTreeMap<String, Vec<u8>>;

/// How a matched upload is encoded at its output path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Structured-table-to-YAML-mapping
    Yaml,
    /// Byte-for-byte copy
    Copy,
}

impl Format {
    /// Pick a format from the output path's extension.
    pub fn detect(output_path: &str) -> Format {
        let ext = Path::new(output_path).extension().and_then(|e| e.to_str());

        match ext {
            Some(ext) if ext.eq_ignore_ascii_case("yml") || ext.eq_ignore_ascii_case("yaml") => {
                Format::Yaml
            }
            _ => Format::Copy,
        }
    }
}

#[derive(Error, Debug)]
pub enum FormatError {
    #[error("cannot read workbook")]
    Workbook(#[from] calamine::XlsxError),
    #[error("workbook has no worksheets")]
    NoWorksheet,
    #[error("duplicate header label '{0}'")]
    DuplicateHeader(String),
    #[error("duplicate key '{0}'")]
    DuplicateKey(String),
    #[error("cannot encode YAML output")]
    Encode(#[from] serde_yaml::Error),
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("cannot fetch upload content")]
    Fetch(#[source] anyhow::Error),
    #[error(transparent)]
    Format(#[from] FormatError),
}

/// Deferred access to the uploaded file's bytes, typically a chat-transport
/// download. Invoked at most once per pipeline run.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn fetch_raw(&self) -> anyhow::Result<Vec<u8>>;
}

/// One configured routing entry: which uploads it claims, where the output
/// lands, and how it is encoded. Built once at configuration load.
pub struct MatchRule {
    matcher: Matcher,
    pub output_path: String,
    pub format: Format,
}

impl MatchRule {
    /// Resolve a rule from its configured parts. With no explicit input
    /// pattern the matcher is derived from the output path; with no
    /// explicit format it is detected from the output path's extension.
    pub fn new(
        input: Option<&str>,
        output_path: String,
        format: Option<Format>,
    ) -> Result<Self, PatternError> {
        let format = format.unwrap_or_else(|| Format::detect(&output_path));

        let matcher = match input {
            Some(pattern) => Matcher::glob(pattern)?,
            None => Matcher::derived(&output_path, format)?,
        };

        Ok(Self {
            matcher,
            output_path,
            format,
        })
    }

    fn matches(&self, file_name: &str) -> bool {
        self.matcher.matches(file_name)
    }
}

pub struct Pipeline {
    rules: Vec<MatchRule>,
}

impl Pipeline {
    pub fn new(rules: Vec<MatchRule>) -> Self {
        Self { rules }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Run every rule against `file_name` and build the resulting FileSet.
    ///
    /// Zero matches short-circuits to an empty set without touching
    /// `source`. Any formatter failure aborts the whole run; a partially
    /// built set is never returned.
    pub async fn build_file_set(
        &self,
        file_name: &str,
        source: &dyn ContentSource,
    ) -> Result<FileSet, PipelineError> {
        let matched: Vec<&MatchRule> = self
            .rules
            .iter()
            .filter(|rule| rule.matches(file_name))
            .collect();

        if matched.is_empty() {
            debug!(file_name, "no rules matched");
            return Ok(FileSet::new());
        }

        info!(file_name, matches = matched.len(), "fetching upload content");
        let raw = source.fetch_raw().await.map_err(PipelineError::Fetch)?;

        let mut files = FileSet::new();
        for rule in matched {
            let bytes = match rule.format {
                Format::Copy => raw.clone(),
                Format::Yaml => sheet_to_yaml(&raw)?,
            };

            debug!(path = %rule.output_path, bytes = bytes.len(), "formatted output");
            files.insert(rule.output_path.clone(), bytes);
        }

        Ok(files)
    }
}
